//! Bootstrap of the library classes.

use heap::ClassId;

use crate::{Vm, VmError};

/// Classes the VM itself allocates instances of.
///
/// A field is `None` until bootstrap has created that class; instances
/// made before then carry a NULL class.
#[derive(Debug, Default, Clone, Copy)]
pub struct SpecialClasses {
    pub metaclass: Option<ClassId>,
    pub object: Option<ClassId>,
    pub array: Option<ClassId>,
    pub integer: Option<ClassId>,
    pub string: Option<ClassId>,
    pub text_file_reader: Option<ClassId>,
    pub text_file_writer: Option<ClassId>,
}

struct MethodSource {
    selector: &'static str,
    num_locals: u32,
    body: &'static [&'static str],
}

const fn method(
    selector: &'static str,
    num_locals: u32,
    body: &'static [&'static str],
) -> MethodSource {
    MethodSource {
        selector,
        num_locals,
        body,
    }
}

// Arguments: 0 is the receiver, the caller pushes the others before it.

const OBJECT_METHODS: &[MethodSource] = &[
    // the receiver stays on the caller's stack
    method("getObjectID", 0, &["return"]),
];

const ARRAY_METHODS: &[MethodSource] = &[
    method(
        "length",
        0,
        &["pop-arg 0", "syscall arr-length", "return-top"],
    ),
    method(
        "get",
        0,
        &["pop-arg 0", "pop-arg 1", "get-field", "return-top"],
    ),
    method(
        "set",
        0,
        &["pop-arg 0", "pop-arg 1", "pop-arg 2", "set-field", "return"],
    ),
];

const INTEGER_METHODS: &[MethodSource] = &[
    method("add", 0, &["pop-arg 0", "pop-arg 1", "add-int", "return-top"]),
    method("subtract", 0, &["pop-arg 0", "pop-arg 1", "sub-int", "return-top"]),
    method("multiply", 0, &["pop-arg 0", "pop-arg 1", "mul-int", "return-top"]),
    method("divide", 0, &["pop-arg 0", "pop-arg 1", "div-int", "return-top"]),
    method("modulo", 0, &["pop-arg 0", "pop-arg 1", "mod-int", "return-top"]),
];

const STRING_METHODS: &[MethodSource] = &[
    method(
        "length",
        0,
        &["pop-arg 0", "syscall str-length", "return-top"],
    ),
    method(
        "append",
        0,
        &["pop-arg 1", "pop-arg 0", "syscall str-append", "return-top"],
    ),
];

const TEXT_FILE_READER_METHODS: &[MethodSource] = &[
    method(
        "open",
        1,
        &[
            "pop-arg 1",
            "syscall open-file-r",
            "push-local 0",
            "pop-arg 0",
            "push-int 0",
            "pop-local 0",
            "set-field",
            "return",
        ],
    ),
    method(
        "close",
        0,
        &["pop-arg 0", "push-int 0", "get-field", "syscall close-file-r", "return"],
    ),
    method(
        "readLine",
        0,
        &["pop-arg 0", "push-int 0", "get-field", "syscall read-line", "return-top"],
    ),
];

const TEXT_FILE_WRITER_METHODS: &[MethodSource] = &[
    method(
        "open",
        1,
        &[
            "pop-arg 1",
            "syscall open-file-w",
            "push-local 0",
            "pop-arg 0",
            "push-int 0",
            "pop-local 0",
            "set-field",
            "return",
        ],
    ),
    method(
        "close",
        0,
        &["pop-arg 0", "push-int 0", "get-field", "syscall close-file-w", "return"],
    ),
    method(
        "writeLine",
        0,
        &[
            "pop-arg 0",
            "push-int 0",
            "get-field",
            "pop-arg 1",
            "syscall write-line",
            "return",
        ],
    ),
];

/// Assemble `methods`, add them to the method table and install them as
/// the dictionary of `class`.
fn install(vm: &mut Vm, class: ClassId, methods: &[MethodSource]) -> Result<(), VmError> {
    let mut indices = Vec::with_capacity(methods.len());
    for m in methods {
        let entry = vm.assemble_lines(m.body)?;
        indices.push(vm.new_method(m.selector, entry, m.num_locals));
    }
    vm.set_methods(class, &indices)
}

/// Create the library classes and their methods.
///
/// Metaclass comes first so every later class can point at it; its own
/// superclass and metaclass are patched once Object exists.
pub fn bootstrap(vm: &mut Vm) -> Result<(), VmError> {
    let metaclass = vm.new_class("Metaclass", 0, None)?;
    vm.special.metaclass = Some(metaclass);

    let object = vm.new_class("Object", 0, None)?;
    vm.special.object = Some(object);
    vm.set_class_links(metaclass, object, metaclass)?;

    let array = vm.define_class("Array", 0)?;
    vm.special.array = Some(array);
    install(vm, array, ARRAY_METHODS)?;

    install(vm, object, OBJECT_METHODS)?;

    let integer = vm.define_class("Integer", 0)?;
    vm.special.integer = Some(integer);
    install(vm, integer, INTEGER_METHODS)?;

    let string = vm.define_class("String", 0)?;
    vm.special.string = Some(string);
    install(vm, string, STRING_METHODS)?;

    let reader = vm.define_class("TextFileReader", 1)?;
    vm.special.text_file_reader = Some(reader);
    install(vm, reader, TEXT_FILE_READER_METHODS)?;

    let writer = vm.define_class("TextFileWriter", 1)?;
    vm.special.text_file_writer = Some(writer);
    install(vm, writer, TEXT_FILE_WRITER_METHODS)?;

    log::debug!(
        "bootstrapped {} classes, {} methods, {} constants",
        vm.mm.class_ids().count(),
        vm.mm.method_count(),
        vm.mm.constant_count()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use object::ClassView;

    use super::*;
    use crate::VmCreateInfo;

    fn class(vm: &Vm, id: Option<ClassId>) -> ClassView<'_> {
        let at = vm.mm.class(id.unwrap()).unwrap();
        ClassView::new(vm.mm.view(at).unwrap()).unwrap()
    }

    #[test]
    fn metaclass_is_its_own_metaclass() {
        let vm = Vm::new(VmCreateInfo::default()).unwrap();
        let meta_at = vm.mm.class(vm.special.metaclass.unwrap()).unwrap();
        let object_at = vm.mm.class(vm.special.object.unwrap()).unwrap();

        let meta = class(&vm, vm.special.metaclass);
        assert_eq!(meta.metaclass(), Some(meta_at));
        assert_eq!(meta.superclass(), Some(object_at));
        assert_eq!(vm.mm.header(meta_at).unwrap().class(), Some(meta_at));

        let object = class(&vm, vm.special.object);
        assert_eq!(object.superclass(), None);
        assert_eq!(object.metaclass(), Some(meta_at));
    }

    #[test]
    fn library_classes_descend_from_object() {
        let vm = Vm::new(VmCreateInfo::default()).unwrap();
        let object_at = vm.mm.class(vm.special.object.unwrap()).unwrap();
        for id in [
            vm.special.array,
            vm.special.integer,
            vm.special.string,
            vm.special.text_file_reader,
            vm.special.text_file_writer,
        ] {
            let class = class(&vm, id);
            assert_eq!(class.superclass(), Some(object_at));
            assert!(class.methods().is_some());
        }
        assert_eq!(class(&vm, vm.special.text_file_reader).object_size(), 1);
        assert_eq!(vm.class_named("Integer"), vm.special.integer);
    }

    #[test]
    fn every_class_reaches_get_object_id() {
        let mut vm = Vm::new(VmCreateInfo::default()).unwrap();
        let n = vm.new_integer(5).unwrap();
        assert_eq!(vm.lookup(n, "getObjectID").unwrap().num_locals, 0);
        assert!(vm.lookup(n, "add").is_ok());
        assert!(matches!(
            vm.lookup(n, "readLine"),
            Err(VmError::MethodNotFound { .. })
        ));
    }
}
