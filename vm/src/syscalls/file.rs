use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};

use object::HeapPointer;

use crate::interpreter::{pop_integer, pop_string};
use crate::{Vm, VmError};

enum OpenFile {
    Reader(BufReader<File>),
    Writer(BufWriter<File>),
}

/// Files opened by a program, addressed by integer handle.
///
/// Handles are positions in the table and are never reused.
#[derive(Default)]
pub struct FileTable {
    files: Vec<Option<OpenFile>>,
}

impl FileTable {
    fn insert(&mut self, file: OpenFile) -> i32 {
        self.files.push(Some(file));
        (self.files.len() - 1) as i32
    }

    fn slot(&mut self, handle: i32) -> Result<&mut Option<OpenFile>, VmError> {
        usize::try_from(handle)
            .ok()
            .and_then(|i| self.files.get_mut(i))
            .ok_or(VmError::UnknownFileHandle(handle))
    }

    fn reader(&mut self, handle: i32) -> Result<&mut BufReader<File>, VmError> {
        match self.slot(handle)? {
            Some(OpenFile::Reader(reader)) => Ok(reader),
            _ => Err(VmError::UnknownFileHandle(handle)),
        }
    }

    fn writer(&mut self, handle: i32) -> Result<&mut BufWriter<File>, VmError> {
        match self.slot(handle)? {
            Some(OpenFile::Writer(writer)) => Ok(writer),
            _ => Err(VmError::UnknownFileHandle(handle)),
        }
    }

    /// Number of files still open.
    pub fn open_count(&self) -> usize {
        self.files.iter().filter(|f| f.is_some()).count()
    }
}

fn pop_path(vm: &mut Vm) -> Result<String, VmError> {
    let path = pop_string(vm)?;
    Ok(String::from_utf8_lossy(&path).into_owned())
}

fn push_handle(vm: &mut Vm, handle: i32) -> Result<(), VmError> {
    let at = vm.new_integer(handle)?;
    vm.mm.push_pointer(at)?;
    Ok(())
}

pub fn open_file_r(vm: &mut Vm) -> Result<(), VmError> {
    let path = pop_path(vm)?;
    let file = File::open(&path)?;
    let handle = vm.files.insert(OpenFile::Reader(BufReader::new(file)));
    log::debug!("opened {path} for reading as {handle}");
    push_handle(vm, handle)
}

pub fn open_file_w(vm: &mut Vm) -> Result<(), VmError> {
    let path = pop_path(vm)?;
    let file = File::create(&path)?;
    let handle = vm.files.insert(OpenFile::Writer(BufWriter::new(file)));
    log::debug!("opened {path} for writing as {handle}");
    push_handle(vm, handle)
}

pub fn close_file_r(vm: &mut Vm) -> Result<(), VmError> {
    let handle = pop_integer(vm)?;
    vm.files.reader(handle)?;
    *vm.files.slot(handle)? = None;
    Ok(())
}

pub fn close_file_w(vm: &mut Vm) -> Result<(), VmError> {
    let handle = pop_integer(vm)?;
    vm.files.writer(handle)?.flush()?;
    *vm.files.slot(handle)? = None;
    Ok(())
}

/// Pop a handle and push the next line without its terminator, or NULL at
/// end of file.
pub fn read_line(vm: &mut Vm) -> Result<(), VmError> {
    let handle = pop_integer(vm)?;
    let mut line = String::new();
    if vm.files.reader(handle)?.read_line(&mut line)? == 0 {
        return Ok(vm.mm.push_pointer(HeapPointer::NULL)?);
    }
    let line = line.trim_end_matches(['\n', '\r']);
    let at = vm.new_string(line.as_bytes())?;
    vm.mm.push_pointer(at)?;
    Ok(())
}

/// Pop a String, then a handle, and write the string as one line.
pub fn write_line(vm: &mut Vm) -> Result<(), VmError> {
    let text = pop_string(vm)?;
    let handle = pop_integer(vm)?;
    let writer = vm.files.writer(handle)?;
    writer.write_all(&text)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}
