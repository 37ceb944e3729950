//! Storage layer - catalog and mapping stores

pub mod memory;
pub mod traits;

pub use memory::{InMemoryMappingStore, InMemoryTerminologyStore};
pub use traits::{MappingStore, TerminologyStore};
