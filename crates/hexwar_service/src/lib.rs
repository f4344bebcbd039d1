//! # Hexwar Game Service
//!
//! Stored games and the operations over them:
//! - [`storage`]: backend contracts plus in-memory and file backends
//! - [`service`]: move batches under an optimistic version lock, option
//!   queries, and bookkeeping writes
//! - [`attack`]: stateless attack previews
//! - [`protocol`]: the JSON envelope the binary speaks

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod attack;
pub mod config;
pub mod error;
pub mod protocol;
pub mod service;
pub mod storage;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::attack::{SimulateAttackRequest, SimulateAttackResponse};
    pub use crate::config::ServiceConfig;
    pub use crate::error::{Result, ServiceError};
    pub use crate::protocol::{ServiceRequest, ServiceResponse};
    pub use crate::service::{GamesService, ProcessMovesResponse};
    pub use crate::storage::{FileStorage, GameStateUpdater, GameStorageProvider, InMemoryStorage};
}
