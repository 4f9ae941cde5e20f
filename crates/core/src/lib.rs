//! Domain types and rules shared by the store and the HTTP layer.
//!
//! Nothing in this crate performs I/O.

pub mod error;
pub mod todo;
pub mod types;
