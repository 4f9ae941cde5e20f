//! Domain services composed from store calls.

pub mod todo_service;

pub use todo_service::TodoService;
