//! # Quill Shared
//!
//! Wire types shared between the API server and its clients:
//! request bodies (with their validation rules) and response bodies.

pub mod dto;
pub mod response;

pub use response::{ErrorResponse, FieldError};
