//! Model world - the oracle for room lifecycle behavior.
//!
//! Holds every model room and applies operations with the simplest possible
//! rules. The check order mirrors what a client observes: room lookup, then
//! credentials, then lifecycle.

use std::collections::BTreeMap;

use super::{
    MAX_CLIENTS,
    operation::{ClientId, ModelRoomId, Operation, OperationError, OperationResult},
};

/// Observable state of one room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomSnapshot {
    /// Model room id.
    pub room_id: ModelRoomId,
    /// Whether the draw has been sealed.
    pub started: bool,
    /// Participants and whether each has registered a key, sorted by client.
    pub participants: Vec<(ClientId, bool)>,
}

/// Observable state for oracle comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservableState {
    /// Every existing room, sorted by model id.
    pub rooms: Vec<RoomSnapshot>,
}

#[derive(Debug, Clone, Default)]
struct ModelRoom {
    started: bool,
    // Join order; registration flag per client.
    participants: Vec<(ClientId, bool)>,
}

impl ModelRoom {
    fn position(&self, client: ClientId) -> Option<usize> {
        self.participants.iter().position(|(c, _)| *c == client)
    }
}

/// Model world - the reference implementation.
#[derive(Debug, Clone, Default)]
pub struct ModelWorld {
    rooms: BTreeMap<ModelRoomId, ModelRoom>,
}

impl ModelWorld {
    /// Empty world.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a model room exists.
    pub fn room_exists(&self, room_id: ModelRoomId) -> bool {
        self.rooms.contains_key(&room_id)
    }

    /// Whether a model room has started.
    pub fn is_started(&self, room_id: ModelRoomId) -> bool {
        self.rooms.get(&room_id).is_some_and(|room| room.started)
    }

    /// Clients in a room, in join order.
    pub fn members(&self, room_id: ModelRoomId) -> Vec<ClientId> {
        self.rooms
            .get(&room_id)
            .map(|room| room.participants.iter().map(|(c, _)| *c).collect())
            .unwrap_or_default()
    }

    /// Apply an operation and return the result the real system must match.
    pub fn apply(&mut self, op: &Operation) -> OperationResult {
        let outcome = match op {
            Operation::CreateRoom { room_id } => self.create_room(*room_id),
            Operation::Join { client_id, room_id } => self.join(*client_id, *room_id),
            Operation::Register { client_id, room_id } => self.register(*client_id, *room_id),
            Operation::Remove { client_id, room_id } => self.remove(*client_id, *room_id),
            Operation::Start { room_id } => self.start(*room_id),
            Operation::WrongHostStart { room_id } => {
                self.room(*room_id).and(Err(OperationError::InvalidCredentials))
            },
            Operation::Login { client_id, room_id, correct_password } => {
                self.login(*client_id, *room_id, *correct_password)
            },
            // Model doesn't track time
            Operation::AdvanceTime { .. } => Ok(()),
        };

        match outcome {
            Ok(()) => OperationResult::Ok,
            Err(err) => OperationResult::Error(err),
        }
    }

    /// Extract observable state for comparison.
    pub fn observable_state(&self) -> ObservableState {
        let rooms = self
            .rooms
            .iter()
            .map(|(room_id, room)| {
                let mut participants = room.participants.clone();
                participants.sort_unstable();
                RoomSnapshot { room_id: *room_id, started: room.started, participants }
            })
            .collect();

        ObservableState { rooms }
    }

    fn room(&self, room_id: ModelRoomId) -> Result<&ModelRoom, OperationError> {
        self.rooms.get(&room_id).ok_or(OperationError::RoomNotFound)
    }

    fn room_mut(&mut self, room_id: ModelRoomId) -> Result<&mut ModelRoom, OperationError> {
        self.rooms.get_mut(&room_id).ok_or(OperationError::RoomNotFound)
    }

    fn create_room(&mut self, room_id: ModelRoomId) -> Result<(), OperationError> {
        if self.room_exists(room_id) {
            return Err(OperationError::RoomAlreadyExists);
        }
        self.rooms.insert(room_id, ModelRoom::default());
        Ok(())
    }

    fn join(&mut self, client: ClientId, room_id: ModelRoomId) -> Result<(), OperationError> {
        check_client(client)?;
        let room = self.room_mut(room_id)?;

        // Returning members get their salt back even after start.
        if room.position(client).is_some() {
            return Ok(());
        }
        if room.started {
            return Err(OperationError::AlreadyStarted);
        }

        room.participants.push((client, false));
        Ok(())
    }

    fn register(&mut self, client: ClientId, room_id: ModelRoomId) -> Result<(), OperationError> {
        check_client(client)?;
        let room = self.room_mut(room_id)?;

        let index = room.position(client).ok_or(OperationError::InvalidCredentials)?;
        if room.started {
            return Err(OperationError::AlreadyStarted);
        }

        room.participants[index].1 = true;
        Ok(())
    }

    fn remove(&mut self, client: ClientId, room_id: ModelRoomId) -> Result<(), OperationError> {
        check_client(client)?;
        let room = self.room_mut(room_id)?;

        if room.started {
            return Err(OperationError::AlreadyStarted);
        }
        let index = room.position(client).ok_or(OperationError::UnknownParticipant)?;

        room.participants.remove(index);
        Ok(())
    }

    fn start(&mut self, room_id: ModelRoomId) -> Result<(), OperationError> {
        let room = self.room_mut(room_id)?;

        if room.started {
            return Err(OperationError::AlreadyStarted);
        }
        if room.participants.len() < 2 {
            return Err(OperationError::TooFewParticipants);
        }
        if room.participants.iter().any(|(_, registered)| !registered) {
            return Err(OperationError::IncompleteRegistration);
        }

        room.started = true;
        Ok(())
    }

    fn login(
        &self,
        client: ClientId,
        room_id: ModelRoomId,
        correct_password: bool,
    ) -> Result<(), OperationError> {
        check_client(client)?;
        let room = self.room(room_id)?;

        if room.position(client).is_none() || !correct_password {
            return Err(OperationError::InvalidCredentials);
        }
        if !room.started {
            return Err(OperationError::NotStarted);
        }

        Ok(())
    }
}

fn check_client(client: ClientId) -> Result<(), OperationError> {
    if client < MAX_CLIENTS { Ok(()) } else { Err(OperationError::InvalidClient) }
}
