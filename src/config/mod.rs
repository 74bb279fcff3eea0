//! Runner configuration.
//!
//! This module defines the Config struct read from `talkd.yaml`. It supports
//! forward-compatible YAML parsing (unknown fields are ignored), defaults
//! for every field, and validation of config values.

mod model;
mod operations;


pub use model::Config;
