use crate::{Vm, VmError};

/// Pop an object and push its field count as an Integer.
pub fn arr_length(vm: &mut Vm) -> Result<(), VmError> {
    let at = vm.mm.pop_pointer()?;
    let view = vm.mm.view(at)?;
    if !view.is_pointer_indexed() {
        return Err(VmError::TypeMismatch { expected: "an Array", object: at });
    }
    let length = view.size() as i32;
    let length = vm.new_integer(length)?;
    vm.mm.push_pointer(length)?;
    Ok(())
}
