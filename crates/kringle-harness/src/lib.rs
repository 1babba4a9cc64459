//! Deterministic simulation harness for Kringle testing.
//!
//! A seeded [`SimEnv`] replaces the OS RNG and wall clock so room ids, salts
//! and draws replay exactly from a seed.
//!
//! # Model-Based Testing
//!
//! The `model` module provides a reference implementation of the room
//! lifecycle. Operations are applied to both the model and a real
//! `RoomManager`, and their results and observable states are compared.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod model;
pub mod sim_env;

pub use fixtures::{FAST_PARAMS, client_keypair, fast_config};
pub use model::{
    ClientId, HOST_PASSWORD, ModelRoomId, ModelWorld, ObservableState, Operation, OperationError,
    OperationResult, RoomSnapshot, client_for, password_for, username_for,
};
pub use sim_env::SimEnv;
