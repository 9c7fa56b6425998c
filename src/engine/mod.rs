mod availability;
mod conflict;
mod error;
mod mutations;
mod queries;
#[cfg(test)]
mod tests;

pub use availability::{booked_ranges, free_slots, merge_adjacent, subtract_ranges, timeline};
pub use error::StoreError;

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::RwLock;

use crate::model::*;

pub type SharedRoomState = Arc<RwLock<RoomState>>;

/// Single source of truth for committed reservations.
///
/// Each room's reservations sit behind their own lock, so bookings for
/// different rooms never contend. Inserts take the room's write lock for the
/// whole check-then-write sequence; reads take the read lock.
pub struct ReservationStore {
    pub(super) rooms: DashMap<RoomId, SharedRoomState>,
    /// Reverse lookup: reservation id → room id
    pub(super) reservation_to_room: DashMap<ReservationId, RoomId>,
}

impl Default for ReservationStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ReservationStore {
    pub fn new() -> Self {
        Self {
            rooms: DashMap::new(),
            reservation_to_room: DashMap::new(),
        }
    }

    /// Store with `rooms` registered and no reservations.
    pub fn with_rooms(rooms: impl IntoIterator<Item = Room>) -> Result<Self, StoreError> {
        let store = Self::new();
        for room in rooms {
            store.register_room(room)?;
        }
        Ok(store)
    }

    pub fn get_room_state(&self, id: &RoomId) -> Option<SharedRoomState> {
        self.rooms.get(id).map(|e| e.value().clone())
    }

    pub fn get_room_for_reservation(&self, id: &ReservationId) -> Option<RoomId> {
        self.reservation_to_room.get(id).map(|e| e.value().clone())
    }

    pub(super) fn require_room(&self, id: &RoomId) -> Result<SharedRoomState, StoreError> {
        self.get_room_state(id)
            .ok_or_else(|| StoreError::UnknownRoom(id.clone()))
    }

    /// Lookup reservation → room, get room, acquire write lock.
    pub(super) async fn resolve_reservation_write(
        &self,
        id: &ReservationId,
    ) -> Result<tokio::sync::OwnedRwLockWriteGuard<RoomState>, StoreError> {
        let room_id = self
            .get_room_for_reservation(id)
            .ok_or(StoreError::NotFound(*id))?;
        let rs = self.require_room(&room_id)?;
        Ok(rs.write_owned().await)
    }
}
