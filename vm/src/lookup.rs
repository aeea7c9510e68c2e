//! Class names and method lookup along the superclass chain.

use heap::{ClassId, Constant};
use object::{ClassView, HeapPointer, Method};

use crate::{Vm, VmError};

impl Vm {
    fn class_view(&self, at: HeapPointer) -> Result<ClassView<'_>, VmError> {
        let view = self.mm.view(at)?;
        ClassView::new(view).ok_or(VmError::TypeMismatch {
            expected: "a class",
            object: at,
        })
    }

    /// Name of the class at `at`, or a placeholder when it has none.
    pub fn class_name(&self, at: HeapPointer) -> String {
        let Ok(class) = self.class_view(at) else {
            return format!("<{at}>");
        };
        match self.mm.constant(class.name_index()) {
            Ok(Constant::Str(name)) => name.clone(),
            _ => format!("<{at}>"),
        }
    }

    pub(crate) fn class_name_of_id(&self, id: ClassId) -> String {
        match self.mm.class(id) {
            Ok(at) => self.class_name(at),
            Err(_) => id.to_string(),
        }
    }

    /// Registered class called `name`.
    pub fn class_named(&self, name: &str) -> Option<ClassId> {
        self.mm
            .class_ids()
            .find(|id| matches!(self.mm.class(*id), Ok(at) if self.class_name(at) == name))
    }

    /// Find `selector` starting at the class of `receiver`.
    ///
    /// Only each class's own dictionary is searched, so the walk visits
    /// every ancestor in turn and stops at the first match.
    pub fn lookup(&self, receiver: HeapPointer, selector: &str) -> Result<&Method, VmError> {
        let header = self.mm.header(receiver)?;
        let receiver_class = header.class().unwrap_or(HeapPointer::NULL);
        let mut class = receiver_class;
        // a well-formed chain is no longer than the class table
        let mut budget = self.mm.class_ids().count() + 1;

        while !class.is_null() && budget > 0 {
            let view = self.class_view(class)?;
            if let Some(dictionary) = view.methods() {
                let dictionary = self.mm.view(dictionary)?;
                for index in (0..dictionary.size()).filter_map(|i| dictionary.field_word(i)) {
                    let method = self.mm.method(index as u32)?;
                    if method.selector == selector {
                        return Ok(method);
                    }
                }
            }
            class = view.superclass().unwrap_or(HeapPointer::NULL);
            budget -= 1;
        }

        Err(VmError::MethodNotFound {
            selector: selector.to_string(),
            class: self.class_name(receiver_class),
        })
    }

    /// Send `selector` to `receiver`: push the receiver back as argument 0,
    /// open a frame for the method's locals and jump to its entry.
    pub fn call_method(&mut self, receiver: HeapPointer, selector: &str) -> Result<(), VmError> {
        let method = self.lookup(receiver, selector)?;
        let (entry, num_locals) = (method.entry, method.num_locals);
        log::trace!("send {selector:?} to {receiver} -> {entry}");
        self.mm.push_pointer(receiver)?;
        self.mm.new_frame(num_locals)?;
        self.mm.set_pc(entry);
        Ok(())
    }
}
