use chrono::NaiveDate;

use crate::model::*;

use super::availability;
use super::{ReservationStore, StoreError};

impl ReservationStore {
    pub async fn room(&self, id: &RoomId) -> Option<Room> {
        let rs = self.get_room_state(id)?;
        let guard = rs.read().await;
        Some(guard.room.clone())
    }

    /// All registered rooms, sorted by id.
    pub async fn list_rooms(&self) -> Vec<Room> {
        let states: Vec<_> = self.rooms.iter().map(|e| e.value().clone()).collect();
        let mut rooms = Vec::with_capacity(states.len());
        for rs in states {
            rooms.push(rs.read().await.room.clone());
        }
        rooms.sort_by(|a, b| a.id.cmp(&b.id));
        rooms
    }

    pub async fn booked_ranges(
        &self,
        room_id: &RoomId,
        date: NaiveDate,
    ) -> Result<Vec<TimeRange>, StoreError> {
        let rs = self.require_room(room_id)?;
        let guard = rs.read().await;
        Ok(availability::booked_ranges(&guard, date))
    }

    /// True iff nothing booked in the room overlaps `range`.
    pub async fn is_free(&self, room_id: &RoomId, range: &TimeRange) -> Result<bool, StoreError> {
        let rs = self.require_room(room_id)?;
        let guard = rs.read().await;
        Ok(guard.overlapping(range).next().is_none())
    }

    pub async fn free_slots(
        &self,
        room_id: &RoomId,
        date: NaiveDate,
        hours: &OperatingHours,
    ) -> Result<Vec<TimeRange>, StoreError> {
        let rs = self.require_room(room_id)?;
        let guard = rs.read().await;
        Ok(availability::free_slots(&guard, date, hours))
    }

    pub async fn timeline(
        &self,
        room_id: &RoomId,
        date: NaiveDate,
        hours: &OperatingHours,
    ) -> Result<Vec<SlotStatus>, StoreError> {
        let rs = self.require_room(room_id)?;
        let guard = rs.read().await;
        Ok(availability::timeline(&guard, date, hours))
    }

    /// Copies of the room's reservations on `date`, ascending by start.
    pub async fn by_room_and_date(
        &self,
        room_id: &RoomId,
        date: NaiveDate,
    ) -> Result<Vec<Reservation>, StoreError> {
        let rs = self.require_room(room_id)?;
        let guard = rs.read().await;
        Ok(guard.on_date(date).to_vec())
    }

    pub async fn get_reservation(&self, id: &ReservationId) -> Option<Reservation> {
        let room_id = self.get_room_for_reservation(id)?;
        let rs = self.get_room_state(&room_id)?;
        let guard = rs.read().await;
        guard.reservations.iter().find(|r| r.id == *id).cloned()
    }

    /// Every reservation held by `owner`, sorted by date, start, then room.
    pub async fn by_owner(&self, owner: &OwnerId) -> Vec<Reservation> {
        let states: Vec<_> = self.rooms.iter().map(|e| e.value().clone()).collect();
        let mut found = Vec::new();
        for rs in states {
            let guard = rs.read().await;
            found.extend(
                guard
                    .reservations
                    .iter()
                    .filter(|r| r.owner_id == *owner)
                    .cloned(),
            );
        }
        found.sort_by(|a, b| {
            (a.range.date(), a.range.start(), &a.room_id).cmp(&(
                b.range.date(),
                b.range.start(),
                &b.room_id,
            ))
        });
        found
    }

    pub fn reservation_count(&self) -> usize {
        self.reservation_to_room.len()
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }
}
