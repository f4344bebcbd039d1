//! # Hexwar Development Tools
//!
//! Command-line helpers for rule authors:
//! - Rules file validation
//! - Movement inspection on saved worlds
//! - Attack simulation (via the service crate)

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod error;
pub mod inspect;
pub mod validate;

pub use error::{Result, ToolError};
