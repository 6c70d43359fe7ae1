//! # Quill Core
//!
//! The domain layer of the Quill blog API.
//! This crate contains the blog entities, their read projections and the ports
//! that infrastructure has to implement. It has zero infrastructure dependencies.

pub mod domain;
pub mod error;
pub mod ports;

pub use error::{DomainError, RepoError};
