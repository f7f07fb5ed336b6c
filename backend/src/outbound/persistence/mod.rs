//! Store adapters implementing the domain's persistence ports.

mod memory;
mod postgres;

pub use memory::{MemoryStore, MemoryTxn};
pub use postgres::PgStore;
