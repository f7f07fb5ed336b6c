//! Bookstore backend.
//!
//! A small CRUD service for authors and books built around three seams:
//! a transactional [`domain::ports::Store`] abstraction with pluggable
//! adapters (PostgreSQL and in-memory), a unit-of-work layer that stages
//! changes and commits them atomically, and a JWT gateway that issues and
//! validates bearer tokens for the HTTP surface.

pub mod api;
pub mod domain;
pub mod middleware;
pub mod outbound;
pub mod server;
