#![allow(dead_code)]

use std::cell::RefCell;
use std::io::{self, Write};
use std::rc::Rc;

use heap::MemorySettings;
use vm::{Vm, VmCreateInfo, VmError};

/// Output sink that can be read back after the run.
#[derive(Clone, Default)]
pub struct SharedOutput(Rc<RefCell<Vec<u8>>>);

impl SharedOutput {
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.0.borrow()).into_owned()
    }
}

impl Write for SharedOutput {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

pub fn vm_with(memory: MemorySettings) -> (Vm, SharedOutput) {
    let output = SharedOutput::default();
    let vm = Vm::new(VmCreateInfo {
        memory,
        output: Box::new(output.clone()),
        ..VmCreateInfo::default()
    })
    .unwrap();
    (vm, output)
}

pub fn vm() -> (Vm, SharedOutput) {
    vm_with(MemorySettings::default())
}

/// Assemble and run `source` with `locals` entry locals, returning what it
/// printed.
pub fn run(vm: &mut Vm, output: &SharedOutput, source: &str, locals: u32) -> Result<String, VmError> {
    let entry = vm.assemble(source)?;
    vm.run(entry, locals)?;
    Ok(output.text())
}

pub fn run_source(source: &str, locals: u32) -> Result<String, VmError> {
    let (mut vm, output) = vm();
    run(&mut vm, &output, source, locals)
}
