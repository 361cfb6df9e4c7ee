pub mod action;
pub mod config;
pub mod duration;
pub mod error;
pub mod registry;
pub mod secret;

pub use error::{ExecapiError, Result};
