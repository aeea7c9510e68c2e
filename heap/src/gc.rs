//! Stop-the-world two-space copying collector (Cheney scan).
//!
//! Roots are copied first into the inactive semi-space, then a scan cursor
//! walks the copied region and forwards every reference it finds until it
//! catches up with the copy cursor. Finally the spaces are flipped.
//!
//! Objects reached through the class table are traced with the class layout
//! (`name` and `objectSize` are raw integers). Objects reached through the
//! method-dictionary table hold raw method indices and are not traced.

use std::collections::HashMap;

use object::class::{METHODS, REFERENCE_FIELDS};
use object::header::{forward, set_class};
use object::word::{read_i32, write_i32};
use object::{Header, HeapPointer, ObjectKind, field_offset};

use crate::space::SemiSpaces;

/// Where a root slot comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RootKind {
    Class,
    MethodDictionary,
    /// A stack word. Treated as a pointer only if it addresses a valid
    /// header, so it may be an integer that merely looks like one.
    Conservative,
}

/// Supplies the root set. The visitor may rewrite each slot in place.
pub trait RootProvider {
    fn visit_roots(&mut self, visitor: &mut dyn FnMut(RootKind, &mut HeapPointer));
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct GcStats {
    pub cycles: u64,
    pub last_copied_bytes: usize,
    pub last_reclaimed_bytes: usize,
    pub total_reclaimed_bytes: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Layout {
    Ordinary,
    Class,
    Dictionary,
}

impl From<RootKind> for Layout {
    fn from(kind: RootKind) -> Self {
        match kind {
            RootKind::Class => Layout::Class,
            RootKind::MethodDictionary => Layout::Dictionary,
            RootKind::Conservative => Layout::Ordinary,
        }
    }
}

#[derive(Debug, Default)]
pub struct Collector {
    stats: GcStats,
}

impl Collector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> GcStats {
        self.stats
    }

    pub fn collect(&mut self, space: &mut SemiSpaces, roots: &mut dyn RootProvider) {
        let used_before = space.used();
        let to_start = space.inactive_start();
        let mut copy = Evacuation {
            from_start: space.active_start(),
            from_top: space.top(),
            to_end: to_start + space.capacity(),
            free: to_start,
            layouts: HashMap::new(),
            space: &mut *space,
        };

        roots.visit_roots(&mut |kind, slot| {
            if slot.is_null() {
                return;
            }
            match copy.evacuate(*slot, kind.into()) {
                Some(to) => *slot = to,
                None if kind != RootKind::Conservative => {
                    log::warn!("{kind:?} root {slot} does not reference an object")
                }
                None => {}
            }
        });
        copy.scan(to_start);

        let top = copy.free;
        space.flip(top);

        let copied = top - to_start;
        let reclaimed = used_before.saturating_sub(copied);
        self.stats.cycles += 1;
        self.stats.last_copied_bytes = copied;
        self.stats.last_reclaimed_bytes = reclaimed;
        self.stats.total_reclaimed_bytes += reclaimed;
        log::info!(
            "gc #{}: copied {} bytes, reclaimed {} bytes",
            self.stats.cycles,
            copied,
            reclaimed
        );
    }
}

struct Evacuation<'a> {
    space: &'a mut SemiSpaces,
    from_start: usize,
    from_top: usize,
    to_end: usize,
    /// Copy cursor in to-space.
    free: usize,
    /// Non-ordinary layouts by to-space address.
    layouts: HashMap<usize, Layout>,
}

impl Evacuation<'_> {
    /// Header of a from-space object whose whole extent is allocated.
    fn from_space_header(&self, at: HeapPointer) -> Option<Header> {
        let start = at.offset(0);
        if at.is_null() || start < self.from_start || start >= self.from_top {
            return None;
        }
        let header = Header::read(self.space.bytes(), at)?;
        (start + header.object_bytes() <= self.from_top).then_some(header)
    }

    /// Copy the object at `at` unless it already was, and return its
    /// to-space address. `None` if `at` is not a from-space object.
    fn evacuate(&mut self, at: HeapPointer, layout: Layout) -> Option<HeapPointer> {
        let header = self.from_space_header(at)?;
        if let Some(to) = header.forwarding() {
            return Some(to);
        }

        let len = header.object_bytes();
        if self.free + len > self.to_end {
            log::warn!("to-space exhausted while copying {at}");
            return None;
        }
        let from = at.offset(0);
        let to = self.free;
        self.space.bytes_mut().copy_within(from..from + len, to);
        let new = HeapPointer::new(to as u32);
        forward(self.space.bytes_mut(), at, new);
        self.free += len;
        if layout != Layout::Ordinary {
            self.layouts.insert(to, layout);
        }
        Some(new)
    }

    fn forward_field(&mut self, obj: HeapPointer, index: u32, layout: Layout) {
        let at = field_offset(obj, index);
        let target = HeapPointer::from_word(read_i32(self.space.bytes(), at));
        if target.is_null() {
            return;
        }
        match self.evacuate(target, layout) {
            Some(to) => write_i32(self.space.bytes_mut(), at, to.as_word()),
            None => log::warn!("field {index} of {obj} holds {target}, not an object; left as is"),
        }
    }

    fn scan(&mut self, mut cursor: usize) {
        while cursor < self.free {
            let at = HeapPointer::new(cursor as u32);
            let Some(header) = Header::read(self.space.bytes(), at) else {
                log::warn!("scan hit an invalid header at {at}");
                break;
            };

            if let Some(class) = header.class().and_then(HeapPointer::non_null) {
                match self.evacuate(class, Layout::Class) {
                    Some(to) => set_class(self.space.bytes_mut(), at, to),
                    None => log::warn!("class of {at} is {class}, not an object; left as is"),
                }
            }

            if header.kind == ObjectKind::PointerIndexed {
                match self.layouts.get(&cursor).copied().unwrap_or(Layout::Ordinary) {
                    Layout::Dictionary => {}
                    Layout::Class => {
                        for index in REFERENCE_FIELDS {
                            let layout = if index == METHODS {
                                Layout::Dictionary
                            } else {
                                Layout::Class
                            };
                            self.forward_field(at, index, layout);
                        }
                    }
                    Layout::Ordinary => {
                        for index in 0..header.size {
                            self.forward_field(at, index, Layout::Ordinary);
                        }
                    }
                }
            }

            cursor += header.object_bytes();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use object::class::CLASS_SIZE;
    use object::{ObjectView, ObjectViewMut};

    #[derive(Default)]
    struct TestRoots {
        classes: Vec<HeapPointer>,
        dictionaries: Vec<HeapPointer>,
        stack: Vec<HeapPointer>,
    }

    impl RootProvider for TestRoots {
        fn visit_roots(&mut self, visitor: &mut dyn FnMut(RootKind, &mut HeapPointer)) {
            for slot in &mut self.classes {
                visitor(RootKind::Class, slot);
            }
            for slot in &mut self.dictionaries {
                visitor(RootKind::MethodDictionary, slot);
            }
            for slot in &mut self.stack {
                visitor(RootKind::Conservative, slot);
            }
        }
    }

    fn alloc(space: &mut SemiSpaces, kind: ObjectKind, size: u32, class: HeapPointer) -> HeapPointer {
        let at = space.bump(kind.object_bytes(size)).unwrap();
        Header::new(kind, size, class).write(space.bytes_mut(), at);
        if kind == ObjectKind::PointerIndexed {
            let mut view = ObjectViewMut::new(space.bytes_mut(), at).unwrap();
            for i in 0..size {
                view.set_field(i, HeapPointer::NULL);
            }
        }
        at
    }

    fn set_field(space: &mut SemiSpaces, obj: HeapPointer, index: u32, value: i32) {
        ObjectViewMut::new(space.bytes_mut(), obj)
            .unwrap()
            .set_field_word(index, value);
    }

    fn int(space: &mut SemiSpaces, value: i32) -> HeapPointer {
        let at = alloc(space, ObjectKind::ByteIndexed, 4, HeapPointer::NULL);
        ObjectViewMut::new(space.bytes_mut(), at)
            .unwrap()
            .bytes_mut()
            .copy_from_slice(&value.to_be_bytes());
        at
    }

    fn view(space: &SemiSpaces, at: HeapPointer) -> ObjectView<'_> {
        ObjectView::new(space.bytes(), at).unwrap()
    }

    #[test]
    fn reachable_graph_survives() {
        let mut space = SemiSpaces::new(1024);
        let garbage = int(&mut space, 99);
        let leaf = int(&mut space, 7);
        let node = alloc(&mut space, ObjectKind::PointerIndexed, 2, HeapPointer::NULL);
        set_field(&mut space, node, 0, leaf.as_word());
        set_field(&mut space, node, 1, node.as_word());

        let mut roots = TestRoots {
            stack: vec![node, HeapPointer::from_word(3)],
            ..Default::default()
        };
        let mut gc = Collector::new();
        gc.collect(&mut space, &mut roots);

        let node = roots.stack[0];
        assert!(space.is_allocated(node, 1));
        // the raw integer did not alias anything
        assert_eq!(roots.stack[1], HeapPointer::from_word(3));

        let obj = view(&space, node);
        assert_eq!(obj.field(1), Some(node));
        let leaf = obj.field(0).unwrap();
        assert_eq!(view(&space, leaf).int_value(), Some(7));
        assert_eq!(view(&space, leaf).header().forwarding(), None);

        let stats = gc.stats();
        assert_eq!(stats.cycles, 1);
        assert_eq!(stats.last_reclaimed_bytes, ObjectKind::ByteIndexed.object_bytes(4));
        assert!(!space.is_allocated(garbage, 1));
    }

    #[test]
    fn class_layout_keeps_raw_fields() {
        let mut space = SemiSpaces::new(1024);
        let dict = alloc(&mut space, ObjectKind::PointerIndexed, 2, HeapPointer::NULL);
        // method indices that look nothing like addresses
        set_field(&mut space, dict, 0, 0);
        set_field(&mut space, dict, 1, 1);

        let class = alloc(&mut space, ObjectKind::PointerIndexed, CLASS_SIZE, HeapPointer::NULL);
        set_field(&mut space, class, 0, 5);
        set_field(&mut space, class, 3, dict.as_word());
        set_field(&mut space, class, 4, dict.as_word());
        let instance = alloc(&mut space, ObjectKind::PointerIndexed, 1, class);

        let mut roots = TestRoots {
            classes: vec![class],
            dictionaries: vec![dict],
            stack: vec![instance],
        };
        Collector::new().collect(&mut space, &mut roots);

        let class = roots.classes[0];
        let dict = roots.dictionaries[0];
        let c = view(&space, class);
        assert_eq!(c.field_word(0), Some(5));
        // objectSize is raw even if it happens to equal an old address
        assert_ne!(c.field(3), Some(dict));
        assert_eq!(c.field(4), Some(dict));
        assert_eq!(view(&space, dict).field_word(0), Some(0));
        assert_eq!(view(&space, dict).field_word(1), Some(1));
        assert_eq!(view(&space, roots.stack[0]).class(), Some(class));
    }

    #[test]
    fn repeated_collections_are_stable() {
        let mut space = SemiSpaces::new(512);
        let leaf = int(&mut space, -5);
        let mut roots = TestRoots {
            stack: vec![leaf],
            ..Default::default()
        };
        let mut gc = Collector::new();
        for _ in 0..3 {
            int(&mut space, 1);
            gc.collect(&mut space, &mut roots);
        }
        assert_eq!(view(&space, roots.stack[0]).int_value(), Some(-5));
        assert_eq!(space.used(), ObjectKind::ByteIndexed.object_bytes(4));
        assert_eq!(gc.stats().cycles, 3);
    }
}
