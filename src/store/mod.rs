//! Region store: entries, memory accounting and conditional writes.

pub mod cas;
pub mod catalog;
pub mod document;
pub mod entry;
pub mod locks;
pub mod memory;
pub mod region;

pub use cas::{CasCoordinator, Rejection, WriteMode, WriteOutcome, WriteRequest};
pub use catalog::Catalog;
pub use document::Document;
pub use entry::{Entry, Value};
pub use locks::KeyLockTable;
pub use memory::MemoryAccountant;
pub use region::{Region, RegionSpec};
