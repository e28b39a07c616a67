// src/config/mod.rs

//! Configuration loading and validation.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Validate values and merge file, defaults and CLI into a
//!   [`ServerConfig`] (`validate.rs`, `model.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{load_and_validate, load_from_path, load_server_config};
pub use model::{ConfigFile, ConfigOverrides, RawConfigFile, ServerConfig};
pub use validate::validate_server_config;
