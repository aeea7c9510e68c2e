//! In-heap object model: addresses, headers and typed views over the raw
//! heap buffer.

mod pointer;
pub mod word;
pub mod header;
mod view;
pub mod class;

pub use pointer::{CodePointer, HeapPointer};
pub use header::{GcState, HEADER_SIZE, Header, HeaderState, MARKER, ObjectKind};
pub use view::{ObjectView, ObjectViewMut, field_offset};
pub use class::{ClassView, Method};
pub use word::{REF_SIZE, WORD_SIZE};
