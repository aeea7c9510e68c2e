use bytecode::{Instruction, Op};
use heap::Constant;
use object::word::int_to_bytes;
use object::{CodePointer, HeapPointer, WORD_SIZE};

use crate::{Vm, VmError, syscalls};

/// Per-run bookkeeping.
#[derive(Debug)]
pub struct InterpreterState {
    /// Base pointer of the frame the run was entered with; returning out of
    /// it ends the run.
    entry_base: u32,
    /// Instructions executed so far.
    pub steps: u64,
}

enum Flow {
    Continue,
    Stop,
}

/// Open a frame with `num_locals` locals and execute from `entry` until a
/// `halt` or a return out of that frame.
pub fn interpret(vm: &mut Vm, entry: CodePointer, num_locals: u32) -> Result<(), VmError> {
    vm.mm.new_frame(num_locals)?;
    vm.mm.set_pc(entry);
    let mut state = InterpreterState {
        entry_base: vm.mm.base_pointer(),
        steps: 0,
    };
    run(vm, &mut state)
}

pub fn run(vm: &mut Vm, state: &mut InterpreterState) -> Result<(), VmError> {
    loop {
        let at = vm.mm.pc();
        let insn = fetch(vm)?;
        log::trace!("{at}: {insn}");
        state.steps += 1;
        if let Flow::Stop = step(vm, state, insn)? {
            log::debug!("stopped after {} instructions", state.steps);
            return Ok(());
        }
    }
}

fn fetch(vm: &mut Vm) -> Result<Instruction, VmError> {
    let at = vm.mm.pc();
    let byte = vm.mm.fetch_u8()?;
    let op = Op::try_from(byte).map_err(|byte| VmError::UnknownOpcode { byte, at })?;
    Ok(Instruction::read(op, || vm.mm.fetch_word())?)
}

fn step(vm: &mut Vm, state: &InterpreterState, insn: Instruction) -> Result<Flow, VmError> {
    match insn {
        Instruction::Halt => return Ok(Flow::Stop),
        Instruction::Syscall { id } => syscalls::invoke(vm, id)?,
        Instruction::Call { selector } => {
            let selector = string_constant(vm, selector)?;
            let receiver = vm.mm.pop_pointer()?;
            vm.call_method(receiver, &selector)?;
        }
        Instruction::Return => return leave(vm, state),
        Instruction::ReturnTop => {
            let value = vm.mm.pop_pointer()?;
            let flow = leave(vm, state)?;
            vm.mm.push_pointer(value)?;
            return Ok(flow);
        }

        // ── Objects ──
        Instruction::New { class } => {
            let id = heap::ClassId(class);
            let class = vm.mm.class(id)?;
            let size = vm
                .class_fields(class)
                .ok_or(VmError::TypeMismatch { expected: "a class", object: class })?;
            let obj = vm.new_object(id, size)?;
            vm.mm.push_pointer(obj)?;
        }
        Instruction::GetField => {
            let index = vm.mm.pop_word()?;
            let obj = vm.mm.pop_pointer()?;
            let value = vm
                .mm
                .view(obj)?
                .field(field_index(index)?)
                .ok_or(VmError::FieldOutOfBounds { object: obj, index })?;
            vm.mm.push_pointer(value)?;
        }
        Instruction::SetField => {
            let value = vm.mm.pop_pointer()?;
            let index = vm.mm.pop_word()?;
            let obj = vm.mm.pop_pointer()?;
            if !vm.mm.view_mut(obj)?.set_field(field_index(index)?, value) {
                return Err(VmError::FieldOutOfBounds { object: obj, index });
            }
        }
        Instruction::SetBytes { value } => {
            let obj = vm.mm.pop_pointer()?;
            let mut view = vm.mm.view_mut(obj)?;
            let bytes = view.bytes_mut();
            if bytes.len() < WORD_SIZE {
                return Err(VmError::TypeMismatch { expected: "an Integer", object: obj });
            }
            bytes[..WORD_SIZE].copy_from_slice(&int_to_bytes(value));
        }

        // ── Stack ──
        Instruction::PushRef { ptr } => vm.mm.push_pointer(HeapPointer::new(ptr))?,
        Instruction::PopRef => {
            vm.mm.pop_pointer()?;
        }
        Instruction::PushInt { value } => vm.mm.push_word(value)?,
        Instruction::PopInt => {
            vm.mm.pop_word()?;
        }
        Instruction::PushLocal { index } => {
            let value = vm.mm.pop_pointer()?;
            vm.mm.set_local(index, value)?;
        }
        Instruction::PopLocal { index } => {
            let value = vm.mm.local(index)?;
            vm.mm.push_pointer(value)?;
        }
        Instruction::PushArg { index, ptr } => vm.mm.set_arg(index, HeapPointer::new(ptr))?,
        Instruction::PopArg { index } => {
            let value = vm.mm.arg(index)?;
            vm.mm.push_pointer(value)?;
        }

        // ── Arithmetic ──
        Instruction::AddInt => arithmetic(vm, |a, b| Ok(a.wrapping_add(b)))?,
        Instruction::SubInt => arithmetic(vm, |a, b| Ok(a.wrapping_sub(b)))?,
        Instruction::MulInt => arithmetic(vm, |a, b| Ok(a.wrapping_mul(b)))?,
        Instruction::DivInt => arithmetic(vm, |a, b| match b {
            0 => Err(VmError::DivisionByZero),
            _ => Ok(a.wrapping_div(b)),
        })?,
        Instruction::ModInt => arithmetic(vm, |a, b| match b {
            0 => Err(VmError::DivisionByZero),
            _ => Ok(a.wrapping_rem(b)),
        })?,

        // ── Construction ──
        Instruction::NewInt { value } => {
            let at = vm.new_integer(value)?;
            vm.mm.push_pointer(at)?;
        }
        Instruction::NewStr { text } => {
            let text = string_constant(vm, text)?;
            let at = vm.new_string(text.as_bytes())?;
            vm.mm.push_pointer(at)?;
        }
        Instruction::NewArr { length } => {
            let length = match vm.mm.constant(length)? {
                Constant::Int(n) => *n,
                Constant::Str(_) => {
                    return Err(VmError::ConstantKind { index: length, expected: "an integer" });
                }
            };
            let length = u32::try_from(length).map_err(|_| VmError::NegativeLength(length))?;
            let at = vm.new_array(length)?;
            vm.mm.push_pointer(at)?;
        }

        // ── Jumps ──
        Instruction::Jmp { offset } => jump(vm, offset),
        Instruction::Branch { cond, offset } => {
            let right = pop_integer(vm)?;
            let left = pop_integer(vm)?;
            if cond.holds(left, right) {
                jump(vm, offset);
            }
        }
    }
    Ok(Flow::Continue)
}

/// Discard the current frame and continue at its return address, or stop
/// when it was the entry frame.
fn leave(vm: &mut Vm, state: &InterpreterState) -> Result<Flow, VmError> {
    let base = vm.mm.base_pointer();
    match vm.mm.discard_frame()? {
        Some(to) if base != state.entry_base => {
            vm.mm.set_pc(to);
            Ok(Flow::Continue)
        }
        _ => Ok(Flow::Stop),
    }
}

fn jump(vm: &mut Vm, offset: i32) {
    let to = vm.mm.pc().arith(offset);
    vm.mm.set_pc(to);
}

/// Pop the right operand, then the left, and push a new Integer.
fn arithmetic(
    vm: &mut Vm,
    f: impl FnOnce(i32, i32) -> Result<i32, VmError>,
) -> Result<(), VmError> {
    let right = pop_integer(vm)?;
    let left = pop_integer(vm)?;
    let at = vm.new_integer(f(left, right)?)?;
    vm.mm.push_pointer(at)?;
    Ok(())
}

fn field_index(index: i32) -> Result<u32, VmError> {
    u32::try_from(index).map_err(|_| VmError::FieldOutOfBounds {
        object: HeapPointer::NULL,
        index,
    })
}

fn string_constant(vm: &Vm, index: u32) -> Result<String, VmError> {
    match vm.mm.constant(index)? {
        Constant::Str(text) => Ok(text.clone()),
        Constant::Int(_) => Err(VmError::ConstantKind { index, expected: "a string" }),
    }
}

/// Value of the Integer at `at`.
pub(crate) fn integer_value(vm: &Vm, at: HeapPointer) -> Result<i32, VmError> {
    vm.mm
        .view(at)?
        .int_value()
        .ok_or(VmError::TypeMismatch { expected: "an Integer", object: at })
}

pub(crate) fn pop_integer(vm: &mut Vm) -> Result<i32, VmError> {
    let at = vm.mm.pop_pointer()?;
    integer_value(vm, at)
}

/// Pop a String and copy out its bytes.
pub(crate) fn pop_string(vm: &mut Vm) -> Result<Vec<u8>, VmError> {
    let at = vm.mm.pop_pointer()?;
    let view = vm.mm.view(at)?;
    if !view.is_byte_indexed() {
        return Err(VmError::TypeMismatch { expected: "a String", object: at });
    }
    Ok(view.bytes().to_vec())
}

impl Vm {
    /// Instance field count of the class at `class`.
    fn class_fields(&self, class: HeapPointer) -> Option<u32> {
        let view = self.mm.view(class).ok()?;
        object::ClassView::new(view).map(|c| c.object_size())
    }
}
