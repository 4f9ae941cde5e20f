//! Repository layer.
//!
//! Each repository binds an entity to its live and audit tables so the
//! generic PostgreSQL backend can persist it.

pub mod todo_repo;

pub use todo_repo::TodoRepo;
