//! Driven adapters: implementations of the domain's outbound ports.

pub mod identity;
pub mod persistence;
