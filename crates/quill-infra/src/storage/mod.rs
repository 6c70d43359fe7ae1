//! Image storage implementations.

mod cloudinary;

pub use cloudinary::{CloudinaryConfig, CloudinaryImageStore};
