use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use tokio::sync::RwLock;
use tracing::debug;
use ulid::Ulid;

use crate::limits::*;
use crate::model::*;

use super::conflict::{check_no_conflict, check_room_limits, validate_room};
use super::{ReservationStore, StoreError};

impl ReservationStore {
    pub fn register_room(&self, room: Room) -> Result<(), StoreError> {
        validate_room(&room)?;
        if self.rooms.len() >= MAX_ROOMS {
            return Err(StoreError::LimitExceeded("too many rooms"));
        }
        match self.rooms.entry(room.id.clone()) {
            Entry::Occupied(_) => Err(StoreError::RoomExists(room.id)),
            Entry::Vacant(slot) => {
                debug!(room = %room.id, capacity = room.capacity, "registered room");
                slot.insert(Arc::new(RwLock::new(RoomState::new(room))));
                Ok(())
            }
        }
    }

    /// Assign an id and commit, unless the range overlaps an existing
    /// reservation of the same room. The availability check and the write
    /// happen under one write lock.
    pub async fn insert(&self, candidate: NewReservation) -> Result<Reservation, StoreError> {
        let id = Ulid::new();
        let rs = self.require_room(&candidate.room_id)?;
        let mut guard = rs.write().await;
        check_room_limits(&guard)?;
        check_no_conflict(&guard, &candidate.range)?;

        let reservation = candidate.into_reservation(id);
        guard.insert_reservation(reservation.clone());
        self.reservation_to_room
            .insert(id, reservation.room_id.clone());
        debug!(%id, room = %reservation.room_id, range = %reservation.range, "reservation committed");
        Ok(reservation)
    }

    /// Delete a reservation. Removal cannot break the no-overlap invariant,
    /// so nothing is re-checked.
    pub async fn remove(&self, id: ReservationId) -> Result<Reservation, StoreError> {
        let mut guard = self.resolve_reservation_write(&id).await?;
        // A concurrent remove may have won between lookup and lock.
        let removed = guard
            .remove_reservation(id)
            .ok_or(StoreError::NotFound(id))?;
        self.reservation_to_room.remove(&id);
        debug!(%id, room = %removed.room_id, "reservation removed");
        Ok(removed)
    }
}
