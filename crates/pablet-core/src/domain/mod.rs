//! Domain entities and pure business logic.

pub mod connection;
pub mod endpoint;
pub mod gesture;
pub mod pointer;
