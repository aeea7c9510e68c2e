//! Construction of heap objects, classes, methods and method dictionaries.
//!
//! Classes are always referred to by [`ClassId`], the index of their slot in
//! the class root table, so a collection triggered by any allocation here
//! cannot leave a caller holding a stale class address.

use heap::{ClassId, Constant};
use object::class::{self, CLASS_SIZE};
use object::word::int_to_bytes;
use object::{CodePointer, HeapPointer, Method, ObjectKind, WORD_SIZE};

use crate::{Vm, VmError};

impl Vm {
    /// Pointer-indexed instance of `class` with `size` NULL fields.
    pub fn new_object(&mut self, class: ClassId, size: u32) -> Result<HeapPointer, VmError> {
        let at = self
            .mm
            .allocate_object(ObjectKind::PointerIndexed, size, Some(class))?;
        log::debug!("new object {at} of {}", self.class_name_of_id(class));
        Ok(at)
    }

    pub fn new_integer(&mut self, value: i32) -> Result<HeapPointer, VmError> {
        let at = self.mm.allocate_object(
            ObjectKind::ByteIndexed,
            WORD_SIZE as u32,
            self.special.integer,
        )?;
        self.mm
            .view_mut(at)?
            .bytes_mut()
            .copy_from_slice(&int_to_bytes(value));
        log::debug!("new integer {at} = {value}");
        Ok(at)
    }

    pub fn new_string(&mut self, bytes: &[u8]) -> Result<HeapPointer, VmError> {
        let at = self.mm.allocate_object(
            ObjectKind::ByteIndexed,
            bytes.len() as u32,
            self.special.string,
        )?;
        self.mm.view_mut(at)?.bytes_mut().copy_from_slice(bytes);
        log::debug!("new string {at} {:?}", String::from_utf8_lossy(bytes));
        Ok(at)
    }

    /// Array with `length` NULL elements.
    pub fn new_array(&mut self, length: u32) -> Result<HeapPointer, VmError> {
        let at = self
            .mm
            .allocate_object(ObjectKind::PointerIndexed, length, self.special.array)?;
        log::debug!("new array {at} of {length}");
        Ok(at)
    }

    /// Create and register a class with `fields` instance fields.
    ///
    /// `None` creates a root class. The header class and the `metaclass`
    /// field point at Metaclass once it exists.
    pub fn new_class(
        &mut self,
        name: &str,
        fields: u32,
        superclass: Option<ClassId>,
    ) -> Result<ClassId, VmError> {
        let name_index = self.mm.add_constant(Constant::Str(name.to_string()));
        let metaclass = self.special.metaclass;
        let at = self
            .mm
            .allocate_object(ObjectKind::PointerIndexed, CLASS_SIZE, metaclass)?;

        let superclass = match superclass {
            Some(id) => self.mm.class(id)?,
            None => HeapPointer::NULL,
        };
        let metaclass = match metaclass {
            Some(id) => self.mm.class(id)?,
            None => HeapPointer::NULL,
        };
        let mut view = self.mm.view_mut(at)?;
        view.set_field_word(class::NAME, name_index as i32);
        view.set_field(class::SUPERCLASS, superclass);
        view.set_field(class::METACLASS, metaclass);
        view.set_field_word(class::OBJECT_SIZE, fields as i32);
        view.set_field(class::METHODS, HeapPointer::NULL);

        let id = self.mm.register_class(at);
        log::debug!("new class {name} ({id}) at {at}");
        Ok(id)
    }

    /// A class whose superclass is Object.
    pub fn define_class(&mut self, name: &str, fields: u32) -> Result<ClassId, VmError> {
        let object = self.special.object;
        self.new_class(name, fields, object)
    }

    /// Add a method to the method table and return its index.
    pub fn new_method(&mut self, selector: &str, entry: CodePointer, num_locals: u32) -> u32 {
        self.mm.add_method(Method::new(selector, entry, num_locals))
    }

    /// An Array whose fields hold the given method-table indices, registered
    /// as a collector root.
    pub fn new_method_dictionary(&mut self, methods: &[u32]) -> Result<HeapPointer, VmError> {
        let at = self.new_array(methods.len() as u32)?;
        let mut view = self.mm.view_mut(at)?;
        for (i, method) in methods.iter().enumerate() {
            view.set_field_word(i as u32, *method as i32);
        }
        self.mm.register_dictionary(at);
        Ok(at)
    }

    /// Install a method dictionary built from `methods` on `class`.
    pub fn set_methods(&mut self, class: ClassId, methods: &[u32]) -> Result<(), VmError> {
        let dictionary = self.new_method_dictionary(methods)?;
        let at = self.mm.class(class)?;
        self.mm.view_mut(at)?.set_field(class::METHODS, dictionary);
        Ok(())
    }

    /// Overwrite the superclass and metaclass fields of `class`.
    pub fn set_class_links(
        &mut self,
        class: ClassId,
        superclass: ClassId,
        metaclass: ClassId,
    ) -> Result<(), VmError> {
        let superclass = self.mm.class(superclass)?;
        let metaclass = self.mm.class(metaclass)?;
        let at = self.mm.class(class)?;
        let mut view = self.mm.view_mut(at)?;
        view.set_field(class::SUPERCLASS, superclass);
        view.set_field(class::METACLASS, metaclass);
        view.set_class(metaclass);
        Ok(())
    }

    /// Keep `at` on the operand stack while `f` runs and return its
    /// possibly moved address alongside the result.
    pub fn with_rooted<T>(
        &mut self,
        at: HeapPointer,
        f: impl FnOnce(&mut Vm) -> Result<T, VmError>,
    ) -> Result<(T, HeapPointer), VmError> {
        self.mm.push_pointer(at)?;
        let result = f(self);
        let at = self.mm.pop_pointer()?;
        Ok((result?, at))
    }
}

#[cfg(test)]
mod tests {
    use object::ClassView;

    use super::*;
    use crate::VmCreateInfo;

    fn bare() -> Vm {
        Vm::bare(VmCreateInfo::default()).unwrap()
    }

    #[test]
    fn integer_payload_is_big_endian() {
        let mut vm = bare();
        let at = vm.new_integer(-2).unwrap();
        let view = vm.mm.view(at).unwrap();
        assert_eq!(view.bytes(), &[0xFF, 0xFF, 0xFF, 0xFE]);
        assert_eq!(view.int_value(), Some(-2));
        assert_eq!(view.class(), Some(HeapPointer::NULL));
    }

    #[test]
    fn class_fields() {
        let mut vm = bare();
        let root = vm.new_class("Root", 0, None).unwrap();
        let leaf = vm.new_class("Leaf", 3, Some(root)).unwrap();

        let root_at = vm.mm.class(root).unwrap();
        let view = vm.mm.view(vm.mm.class(leaf).unwrap()).unwrap();
        let class = ClassView::new(view).unwrap();
        assert_eq!(class.superclass(), Some(root_at));
        assert_eq!(class.object_size(), 3);
        assert_eq!(class.methods(), None);
        assert_eq!(
            vm.mm.constant(class.name_index()).unwrap(),
            &Constant::Str("Leaf".into())
        );
    }

    #[test]
    fn dictionary_holds_raw_indices() {
        let mut vm = bare();
        let class = vm.new_class("A", 0, None).unwrap();
        let m0 = vm.new_method("f", CodePointer::new(0), 0);
        let m1 = vm.new_method("g", CodePointer::new(4), 2);
        vm.set_methods(class, &[m0, m1]).unwrap();

        let dictionary = vm.mm.dictionaries()[0];
        let view = vm.mm.view(dictionary).unwrap();
        assert_eq!(view.field_word(0), Some(0));
        assert_eq!(view.field_word(1), Some(1));
        let class = ClassView::new(vm.mm.view(vm.mm.class(class).unwrap()).unwrap()).unwrap();
        assert_eq!(class.methods(), Some(dictionary));
    }

    #[test]
    fn rooted_pointer_follows_collection() {
        let mut vm = bare();
        vm.mm.new_frame(0).unwrap();
        let text = vm.new_string(b"kept").unwrap();
        let ((), text) = vm
            .with_rooted(text, |vm| {
                vm.mm.collect();
                Ok(())
            })
            .unwrap();
        assert_eq!(vm.mm.view(text).unwrap().bytes(), b"kept");
    }
}
