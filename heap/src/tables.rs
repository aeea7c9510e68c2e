//! Append-only side tables: constants, methods and the class /
//! method-dictionary root tables.

use std::collections::HashMap;
use std::fmt;

use object::{HeapPointer, Method};

use crate::MemoryError;

/// A literal in the constant pool.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Constant {
    Str(String),
    Int(i32),
}

impl fmt::Display for Constant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constant::Str(s) => write!(f, "{s:?}"),
            Constant::Int(n) => write!(f, "{n}"),
        }
    }
}

/// Interning constant pool. Equal literals share one index.
#[derive(Debug, Default)]
pub struct ConstantPool {
    entries: Vec<Constant>,
    index: HashMap<Constant, u32>,
}

impl ConstantPool {
    pub fn add(&mut self, constant: Constant) -> u32 {
        if let Some(&idx) = self.index.get(&constant) {
            return idx;
        }
        let idx = self.entries.len() as u32;
        self.entries.push(constant.clone());
        self.index.insert(constant, idx);
        idx
    }

    pub fn get(&self, idx: u32) -> Result<&Constant, MemoryError> {
        self.entries
            .get(idx as usize)
            .ok_or(MemoryError::ConstantOutOfRange(idx))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Index of a class in the class root table.
///
/// Classes move during collection; the table entry is kept current, so a
/// `ClassId` stays valid where a raw pointer would not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClassId(pub u32);

impl ClassId {
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "class#{}", self.0)
    }
}

/// Heap objects that are roots regardless of stack contents.
#[derive(Debug, Default)]
pub struct StaticRoots {
    pub classes: Vec<HeapPointer>,
    pub dictionaries: Vec<HeapPointer>,
}

#[derive(Debug, Default)]
pub struct MethodTable {
    methods: Vec<Method>,
}

impl MethodTable {
    pub fn add(&mut self, method: Method) -> u32 {
        self.methods.push(method);
        (self.methods.len() - 1) as u32
    }

    pub fn get(&self, idx: u32) -> Result<&Method, MemoryError> {
        self.methods
            .get(idx as usize)
            .ok_or(MemoryError::MethodOutOfRange(idx))
    }

    pub fn len(&self) -> usize {
        self.methods.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use object::CodePointer;

    #[test]
    fn constants_are_interned() {
        let mut pool = ConstantPool::default();
        let a = pool.add(Constant::Str("inc".into()));
        let b = pool.add(Constant::Int(3));
        let c = pool.add(Constant::Str("inc".into()));
        assert_eq!(a, c);
        assert_ne!(a, b);
        assert_eq!(pool.len(), 2);
        assert_eq!(pool.get(b), Ok(&Constant::Int(3)));
        assert_eq!(pool.get(9), Err(MemoryError::ConstantOutOfRange(9)));
    }

    #[test]
    fn methods_are_indexed() {
        let mut table = MethodTable::default();
        let idx = table.add(Method::new("length", CodePointer::new(10), 0));
        assert_eq!(table.get(idx).map(|m| m.selector.as_str()), Ok("length"));
        assert!(table.get(idx + 1).is_err());
    }
}
