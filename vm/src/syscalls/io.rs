use std::io::Write;

use crate::interpreter::{pop_integer, pop_string};
use crate::{Vm, VmError};

/// Pop a String and write it on its own line.
pub fn print(vm: &mut Vm) -> Result<(), VmError> {
    let text = pop_string(vm)?;
    vm.output.write_all(&text)?;
    vm.output.write_all(b"\n")?;
    vm.output.flush()?;
    Ok(())
}

pub fn print_int(vm: &mut Vm) -> Result<(), VmError> {
    let value = pop_integer(vm)?;
    writeln!(vm.output, "{value}")?;
    vm.output.flush()?;
    Ok(())
}
