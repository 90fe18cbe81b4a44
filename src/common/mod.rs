pub mod actor;
pub mod error;
