//! Expression stores.

pub mod memory;
pub mod traits;

pub use memory::MemoryStore;
pub use traits::{ExpressionStore, StoreError};
