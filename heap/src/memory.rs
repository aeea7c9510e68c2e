use std::io::{self, Write};

use object::{
    CodePointer, Header, HeapPointer, Method, ObjectKind, ObjectView, ObjectViewMut, WORD_SIZE,
};

use crate::code::CodeArena;
use crate::gc::{Collector, GcStats, RootKind, RootProvider};
use crate::space::SemiSpaces;
use crate::stack::Stack;
use crate::tables::{ClassId, Constant, ConstantPool, MethodTable, StaticRoots};
use crate::{MemoryError, MemorySettings};

/// Owner of the heap, stack and code arenas and the side tables.
///
/// Every heap pointer handed out is only valid until the next allocation:
/// allocating may collect, and the collector rewrites only the roots it
/// knows (stack words, class and method-dictionary tables).
pub struct MemoryManager {
    space: SemiSpaces,
    stack: Stack,
    code: CodeArena,
    pc: CodePointer,
    methods: MethodTable,
    constants: ConstantPool,
    roots: StaticRoots,
    collector: Collector,
}

struct Roots<'a> {
    statics: &'a mut StaticRoots,
    stack: &'a mut Stack,
}

impl RootProvider for Roots<'_> {
    fn visit_roots(&mut self, visitor: &mut dyn FnMut(RootKind, &mut HeapPointer)) {
        for class in &mut self.statics.classes {
            visitor(RootKind::Class, class);
        }
        for dictionary in &mut self.statics.dictionaries {
            visitor(RootKind::MethodDictionary, dictionary);
        }
        self.stack
            .visit_words(&mut |word| visitor(RootKind::Conservative, word));
    }
}

impl MemoryManager {
    pub fn new(settings: MemorySettings) -> Result<Self, MemoryError> {
        settings.validate()?;
        Ok(Self {
            space: SemiSpaces::new(settings.heap_size),
            stack: Stack::new(settings.stack_size),
            code: CodeArena::new(settings.code_size),
            pc: CodePointer::default(),
            methods: MethodTable::default(),
            constants: ConstantPool::default(),
            roots: StaticRoots::default(),
            collector: Collector::new(),
        })
    }

    // ── Allocation ─────────────────────────────────────────────────

    /// Bump-allocate `size` zeroed bytes, collecting once if the active
    /// semi-space is exhausted.
    pub fn allocate(&mut self, size: usize) -> Result<HeapPointer, MemoryError> {
        if let Some(at) = self.space.bump(size) {
            return Ok(at);
        }
        self.collect();
        self.space.bump(size).ok_or(MemoryError::OutOfMemory {
            requested: size,
            available: self.space.free(),
        })
    }

    /// Allocate an object and write its header. Pointer-indexed fields start
    /// out NULL. The class is resolved after allocation so a collection in
    /// between cannot leave a stale class pointer.
    pub fn allocate_object(
        &mut self,
        kind: ObjectKind,
        size: u32,
        class: Option<ClassId>,
    ) -> Result<HeapPointer, MemoryError> {
        if let Some(id) = class {
            self.class(id)?;
        }
        let at = self.allocate(kind.object_bytes(size))?;
        let class = match class {
            Some(id) => self.class(id)?,
            None => HeapPointer::NULL,
        };
        Header::new(kind, size, class).write(self.space.bytes_mut(), at);
        if kind == ObjectKind::PointerIndexed {
            let mut view = self.view_mut(at)?;
            for i in 0..size {
                view.set_field(i, HeapPointer::NULL);
            }
        }
        Ok(at)
    }

    /// Run a full collection now.
    pub fn collect(&mut self) {
        let mut roots = Roots {
            statics: &mut self.roots,
            stack: &mut self.stack,
        };
        self.collector.collect(&mut self.space, &mut roots);
    }

    pub fn gc_stats(&self) -> GcStats {
        self.collector.stats()
    }

    /// Bytes in use in the active semi-space.
    pub fn heap_used(&self) -> usize {
        self.space.used()
    }

    pub fn heap_free(&self) -> usize {
        self.space.free()
    }

    // ── Object access ──────────────────────────────────────────────

    fn check(&self, at: HeapPointer) -> Result<(), MemoryError> {
        if at.is_null() {
            return Err(MemoryError::NullDereference);
        }
        if !self.space.is_allocated(at, object::HEADER_SIZE) {
            return Err(MemoryError::InvalidObject(at));
        }
        Ok(())
    }

    pub fn header(&self, at: HeapPointer) -> Result<Header, MemoryError> {
        Ok(self.view(at)?.header())
    }

    pub fn view(&self, at: HeapPointer) -> Result<ObjectView<'_>, MemoryError> {
        self.check(at)?;
        ObjectView::new(self.space.bytes(), at).ok_or(MemoryError::InvalidObject(at))
    }

    pub fn view_mut(&mut self, at: HeapPointer) -> Result<ObjectViewMut<'_>, MemoryError> {
        self.check(at)?;
        ObjectViewMut::new(self.space.bytes_mut(), at).ok_or(MemoryError::InvalidObject(at))
    }

    /// Whether `at` addresses a live object in the active semi-space.
    pub fn is_object(&self, at: HeapPointer) -> bool {
        self.view(at).is_ok()
    }

    // ── Stack ──────────────────────────────────────────────────────

    pub fn push_word(&mut self, word: i32) -> Result<(), MemoryError> {
        self.stack.push_word(word)
    }

    pub fn pop_word(&mut self) -> Result<i32, MemoryError> {
        self.stack.pop_word()
    }

    pub fn push_pointer(&mut self, p: HeapPointer) -> Result<(), MemoryError> {
        self.stack.push_pointer(p)
    }

    pub fn pop_pointer(&mut self) -> Result<HeapPointer, MemoryError> {
        self.stack.pop_pointer()
    }

    pub fn peek_pointer(&self, depth: usize) -> Result<HeapPointer, MemoryError> {
        self.stack.peek_word(depth).map(HeapPointer::from_word)
    }

    /// Open a frame with `num_locals` NULL locals, recording the current
    /// program counter as the return address.
    pub fn new_frame(&mut self, num_locals: u32) -> Result<(), MemoryError> {
        self.stack.new_frame(num_locals, self.pc)
    }

    pub fn discard_frame(&mut self) -> Result<Option<CodePointer>, MemoryError> {
        self.stack.discard_frame()
    }

    pub fn arg(&self, index: u32) -> Result<HeapPointer, MemoryError> {
        self.stack.arg(index)
    }

    pub fn set_arg(&mut self, index: u32, value: HeapPointer) -> Result<(), MemoryError> {
        self.stack.set_arg(index, value)
    }

    pub fn local(&self, index: u32) -> Result<HeapPointer, MemoryError> {
        self.stack.local(index)
    }

    pub fn set_local(&mut self, index: u32, value: HeapPointer) -> Result<(), MemoryError> {
        self.stack.set_local(index, value)
    }

    pub fn stack_pointer(&self) -> usize {
        self.stack.sp()
    }

    pub fn base_pointer(&self) -> u32 {
        self.stack.bp()
    }

    // ── Code ───────────────────────────────────────────────────────

    pub fn store_code(&mut self, code: &[u8]) -> Result<CodePointer, MemoryError> {
        self.code.store(code)
    }

    pub fn code(&self) -> &[u8] {
        self.code.bytes()
    }

    #[inline]
    pub fn pc(&self) -> CodePointer {
        self.pc
    }

    #[inline]
    pub fn set_pc(&mut self, pc: CodePointer) {
        self.pc = pc;
    }

    /// Read the byte at the program counter and advance past it.
    pub fn fetch_u8(&mut self) -> Result<u8, MemoryError> {
        let byte = self.code.read_u8(self.pc)?;
        self.pc = self.pc.arith(1);
        Ok(byte)
    }

    /// Read the big-endian word at the program counter and advance past it.
    pub fn fetch_word(&mut self) -> Result<i32, MemoryError> {
        let word = self.code.read_word(self.pc)?;
        self.pc = self.pc.arith(WORD_SIZE as i32);
        Ok(word)
    }

    // ── Tables ─────────────────────────────────────────────────────

    pub fn add_method(&mut self, method: Method) -> u32 {
        self.methods.add(method)
    }

    pub fn method(&self, idx: u32) -> Result<&Method, MemoryError> {
        self.methods.get(idx)
    }

    pub fn add_constant(&mut self, constant: Constant) -> u32 {
        self.constants.add(constant)
    }

    pub fn constant(&self, idx: u32) -> Result<&Constant, MemoryError> {
        self.constants.get(idx)
    }

    pub fn method_count(&self) -> usize {
        self.methods.len()
    }

    pub fn constant_count(&self) -> usize {
        self.constants.len()
    }

    /// Add a class object to the class root table.
    pub fn register_class(&mut self, class: HeapPointer) -> ClassId {
        self.roots.classes.push(class);
        ClassId((self.roots.classes.len() - 1) as u32)
    }

    /// Current address of a registered class.
    pub fn class(&self, id: ClassId) -> Result<HeapPointer, MemoryError> {
        self.roots
            .classes
            .get(id.index())
            .copied()
            .ok_or(MemoryError::ClassOutOfRange(id.0))
    }

    pub fn class_ids(&self) -> impl Iterator<Item = ClassId> + use<> {
        (0..self.roots.classes.len() as u32).map(ClassId)
    }

    /// Add a method dictionary to the dictionary root table.
    pub fn register_dictionary(&mut self, dictionary: HeapPointer) -> usize {
        self.roots.dictionaries.push(dictionary);
        self.roots.dictionaries.len() - 1
    }

    pub fn dictionaries(&self) -> &[HeapPointer] {
        &self.roots.dictionaries
    }

    // ── Diagnostics ────────────────────────────────────────────────

    /// Hex dump of the allocated part of the active semi-space.
    pub fn dump(&self, out: &mut dyn Write) -> io::Result<()> {
        writeln!(out, "# MEMORY DUMP")?;
        writeln!(out, "addr: hex   dec")?;
        let bytes = self.space.bytes();
        for addr in self.space.active_start()..self.space.top() {
            let byte = bytes[addr];
            writeln!(out, "{addr:04}: {byte:02X}    {}", byte as i8)?;
        }
        writeln!(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small() -> MemoryManager {
        MemoryManager::new(MemorySettings {
            heap_size: 512,
            stack_size: 256,
            code_size: 64,
        })
        .unwrap()
    }

    fn new_int(mm: &mut MemoryManager, value: i32) -> HeapPointer {
        let at = mm.allocate_object(ObjectKind::ByteIndexed, 4, None).unwrap();
        mm.view_mut(at).unwrap().bytes_mut().copy_from_slice(&value.to_be_bytes());
        at
    }

    #[test]
    fn allocated_header_reads_back() {
        let mut mm = small();
        let class = mm.allocate_object(ObjectKind::PointerIndexed, 5, None).unwrap();
        let id = mm.register_class(class);
        let obj = mm.allocate_object(ObjectKind::PointerIndexed, 3, Some(id)).unwrap();

        let header = mm.header(obj).unwrap();
        assert_eq!(header.kind, ObjectKind::PointerIndexed);
        assert_eq!(header.size, 3);
        assert_eq!(header.class(), Some(class));
        assert_eq!(mm.view(obj).unwrap().field(2), Some(HeapPointer::NULL));
    }

    #[test]
    fn null_and_garbage_dereference() {
        let mm = small();
        assert_eq!(mm.header(HeapPointer::NULL), Err(MemoryError::NullDereference));
        assert_eq!(
            mm.header(HeapPointer::new(3)),
            Err(MemoryError::InvalidObject(HeapPointer::new(3)))
        );
    }

    #[test]
    fn exhaustion_collects_and_keeps_stack_roots() {
        let mut mm = small();
        mm.new_frame(0).unwrap();
        let kept = new_int(&mut mm, 42);
        mm.push_pointer(kept).unwrap();

        // 15 bytes per integer, 256 per semi-space
        for i in 0..100 {
            new_int(&mut mm, i);
        }
        assert!(mm.gc_stats().cycles > 0);

        let kept = mm.pop_pointer().unwrap();
        assert_eq!(mm.view(kept).unwrap().int_value(), Some(42));
    }

    #[test]
    fn out_of_memory_after_collection() {
        let mut mm = small();
        mm.new_frame(0).unwrap();
        let err = loop {
            match mm.allocate_object(ObjectKind::ByteIndexed, 4, None) {
                Ok(at) => mm.push_pointer(at).unwrap(),
                Err(e) => break e,
            }
        };
        assert!(matches!(err, MemoryError::OutOfMemory { requested: 15, .. }));
    }

    #[test]
    fn pc_fetch() {
        let mut mm = small();
        let start = mm.store_code(&[0x16, 0, 0, 1, 0, 0x00]).unwrap();
        mm.set_pc(start);
        assert_eq!(mm.fetch_u8(), Ok(0x16));
        assert_eq!(mm.fetch_word(), Ok(256));
        assert_eq!(mm.fetch_u8(), Ok(0x00));
        assert_eq!(mm.fetch_u8(), Err(MemoryError::PcOutOfBounds(CodePointer::new(6))));
    }

    #[test]
    fn frame_records_pc() {
        let mut mm = small();
        mm.new_frame(0).unwrap();
        mm.set_pc(CodePointer::new(33));
        let sp = mm.stack_pointer();
        mm.new_frame(2).unwrap();
        mm.set_pc(CodePointer::new(0));
        assert_eq!(mm.discard_frame(), Ok(Some(CodePointer::new(33))));
        assert_eq!(mm.stack_pointer(), sp);
        assert_eq!(mm.discard_frame(), Ok(None));
    }

    #[test]
    fn dump_lists_allocated_bytes() {
        let mut mm = small();
        new_int(&mut mm, 1);
        let mut out = Vec::new();
        mm.dump(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("# MEMORY DUMP"));
        assert!(text.contains(": F0    -16"));
        assert_eq!(text.lines().filter(|l| l.contains(": ")).count(), 16);
    }
}
