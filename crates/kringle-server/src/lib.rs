//! Kringle room server.
//!
//! The server half of the draw plus the glue that runs it: a [`RoomManager`]
//! over pluggable [`Storage`], the production [`SystemEnv`], and the `kringle`
//! command-line binary that drives every party's side against a local
//! database.
//!
//! # Components
//!
//! - [`RoomManager`]: authentication, lifecycle and batch validation
//! - [`Storage`]: revisioned room persistence with check-and-set writes
//! - [`MemoryStorage`] / [`RedbStorage`]: in-memory and durable backends
//! - [`ChaoticStorage`]: fault injection wrapper for tests
//! - [`SystemEnv`]: production environment (system clock, OS RNG)

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod room_manager;
pub mod storage;
mod system_env;

pub use error::ServerError;
pub use room_manager::{RoomManager, RoomManagerConfig};
pub use storage::{ChaoticStorage, MemoryStorage, RedbStorage, Storage, StorageError};
pub use system_env::SystemEnv;
