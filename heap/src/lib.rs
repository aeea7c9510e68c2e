//! Memory manager for the VM: a semi-space heap with a copying collector,
//! the operand/frame stack, the code arena and the side tables.

mod error;
mod settings;
mod space;
mod stack;
mod code;
mod tables;
mod gc;
mod memory;

pub use error::MemoryError;
pub use settings::{LOW_ADDRESS_GUARD, MemorySettings};
pub use space::SemiSpaces;
pub use stack::{NO_FRAME, Stack};
pub use tables::{ClassId, Constant};
pub use gc::{Collector, GcStats, RootKind, RootProvider};
pub use memory::MemoryManager;
