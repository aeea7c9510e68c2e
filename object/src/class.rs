use crate::pointer::CodePointer;
use crate::view::ObjectView;
use crate::HeapPointer;

/// Constant-pool index of the class name (raw int).
pub const NAME: u32 = 0;
pub const SUPERCLASS: u32 = 1;
pub const METACLASS: u32 = 2;
/// Instance field count used by `new` (raw int).
pub const OBJECT_SIZE: u32 = 3;
/// Method dictionary, or NULL.
pub const METHODS: u32 = 4;

/// Number of fields every class object carries.
pub const CLASS_SIZE: u32 = 5;

/// Fields of a class object that hold heap references. `NAME` and
/// `OBJECT_SIZE` are raw integers and must not be traced.
pub const REFERENCE_FIELDS: [u32; 3] = [SUPERCLASS, METACLASS, METHODS];

/// Read-only accessor over a class object.
#[derive(Debug, Clone, Copy)]
pub struct ClassView<'a>(ObjectView<'a>);

impl<'a> ClassView<'a> {
    /// `None` unless the object is pointer-indexed with the class layout.
    pub fn new(view: ObjectView<'a>) -> Option<Self> {
        (view.is_pointer_indexed() && view.size() >= CLASS_SIZE).then_some(Self(view))
    }

    pub fn address(&self) -> HeapPointer {
        self.0.address()
    }

    pub fn name_index(&self) -> u32 {
        self.raw(NAME) as u32
    }

    pub fn superclass(&self) -> Option<HeapPointer> {
        self.pointer(SUPERCLASS).non_null()
    }

    pub fn metaclass(&self) -> Option<HeapPointer> {
        self.pointer(METACLASS).non_null()
    }

    pub fn object_size(&self) -> u32 {
        self.raw(OBJECT_SIZE) as u32
    }

    pub fn methods(&self) -> Option<HeapPointer> {
        self.pointer(METHODS).non_null()
    }

    fn raw(&self, index: u32) -> i32 {
        // Presence of the first CLASS_SIZE fields is checked in `new`.
        self.0.field_word(index).unwrap_or(HeapPointer::NULL.as_word())
    }

    fn pointer(&self, index: u32) -> HeapPointer {
        HeapPointer::from_word(self.raw(index))
    }
}

/// An entry of the out-of-heap method table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Method {
    pub selector: String,
    pub entry: CodePointer,
    pub num_locals: u32,
}

impl Method {
    pub fn new(selector: impl Into<String>, entry: CodePointer, num_locals: u32) -> Self {
        Self {
            selector: selector.into(),
            entry,
            num_locals,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::{Header, ObjectKind};
    use crate::view::ObjectViewMut;

    #[test]
    fn class_fields() {
        let mut heap = vec![0u8; 64];
        let at = HeapPointer::new(0);
        Header::new(ObjectKind::PointerIndexed, CLASS_SIZE, HeapPointer::NULL).write(&mut heap, at);
        let mut view = ObjectViewMut::new(&mut heap, at).unwrap();
        view.set_field_word(NAME, 3);
        view.set_field(SUPERCLASS, HeapPointer::NULL);
        view.set_field(METACLASS, HeapPointer::new(31));
        view.set_field_word(OBJECT_SIZE, 2);
        view.set_field(METHODS, HeapPointer::NULL);

        let class = ClassView::new(ObjectView::new(&heap, at).unwrap()).unwrap();
        assert_eq!(class.name_index(), 3);
        assert_eq!(class.superclass(), None);
        assert_eq!(class.metaclass(), Some(HeapPointer::new(31)));
        assert_eq!(class.object_size(), 2);
        assert_eq!(class.methods(), None);
    }

    #[test]
    fn small_object_is_not_a_class() {
        let mut heap = vec![0u8; 32];
        let at = HeapPointer::new(0);
        Header::new(ObjectKind::PointerIndexed, 2, HeapPointer::NULL).write(&mut heap, at);
        assert!(ClassView::new(ObjectView::new(&heap, at).unwrap()).is_none());
    }
}
