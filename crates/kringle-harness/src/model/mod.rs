//! Reference model for model-based testing.
//!
//! A deliberately naive room lifecycle: no cryptography, no storage, no
//! revisions. It answers what every operation should return and what the
//! rooms should look like afterwards, and the real `RoomManager` is checked
//! against it.
//!
//! Simulated clients are numbered; their names and passwords are fixed
//! functions of the number so both sides agree without sharing state.

mod operation;
mod world;

pub use operation::{ClientId, ModelRoomId, Operation, OperationError, OperationResult};
pub use world::{ModelWorld, ObservableState, RoomSnapshot};

/// Number of distinct simulated clients.
pub const MAX_CLIENTS: ClientId = 6;

/// Number of distinct model rooms.
pub const MAX_ROOMS: ModelRoomId = 3;

/// Host password for every model room.
pub const HOST_PASSWORD: &str = "host-password";

/// Username of a simulated client.
pub fn username_for(client: ClientId) -> String {
    format!("client{client}")
}

/// Password of a simulated client.
pub fn password_for(client: ClientId) -> String {
    format!("password-{client}")
}

/// Inverse of [`username_for`].
pub fn client_for(username: &str) -> Option<ClientId> {
    username.strip_prefix("client")?.parse().ok()
}
