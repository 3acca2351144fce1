// src/config/mod.rs

//! Configuration loading and validation.

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::load_and_validate;
pub use model::BuildConfig;
