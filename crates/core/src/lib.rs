//! Core business logic for PolicyAI.

pub mod services;

pub use services::*;
