//! Externally callable booking operations.
//!
//! [`BookingService::book`] turns a raw request into a committed
//! [`Reservation`] or a typed rejection. Validation runs in a fixed order so
//! the reported error is deterministic when a request has several problems:
//! room, purpose, party size, time range, operating hours, then conflicts.

use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::engine::{ReservationStore, StoreError};
use crate::limits::*;
use crate::model::*;

/// Booking request as submitted by a UI collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingRequest {
    pub room_id: RoomId,
    /// `YYYY-MM-DD`
    pub date: String,
    /// `HH:MM`
    pub start_time: String,
    /// `HH:MM`
    pub end_time: String,
    pub purpose: String,
    pub party_size: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    Staff,
}

/// Who is calling. Passed explicitly; never inferred from request data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: OwnerId,
    pub role: Role,
}

impl Actor {
    pub fn student(id: impl Into<String>) -> Self {
        Self {
            id: OwnerId::new(id),
            role: Role::Student,
        }
    }

    pub fn staff(id: impl Into<String>) -> Self {
        Self {
            id: OwnerId::new(id),
            role: Role::Staff,
        }
    }

    /// Staff may cancel anything; everyone else only their own.
    pub fn may_cancel(&self, reservation: &Reservation) -> bool {
        self.role == Role::Staff || reservation.owner_id == self.id
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BookingError {
    #[error("unknown room: {0}")]
    UnknownRoom(RoomId),
    #[error("invalid purpose: {0}")]
    InvalidPurpose(&'static str),
    #[error("party size {party_size} must be between 1 and {capacity}")]
    CapacityExceeded { party_size: u32, capacity: u32 },
    #[error("invalid time range: {0}")]
    InvalidRange(#[from] RangeError),
    #[error("{range} is outside operating hours {hours}")]
    OutsideOperatingHours { range: TimeRange, hours: OperatingHours },
    #[error("conflict with reservation: {0}")]
    Conflict(ReservationId),
    #[error("reservation not found: {0}")]
    NotFound(ReservationId),
    #[error("not allowed to cancel reservation: {0}")]
    Forbidden(ReservationId),
    #[error("limit exceeded: {0}")]
    LimitExceeded(&'static str),
}

impl BookingError {
    /// Stable snake_case name for callers that branch on the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            BookingError::UnknownRoom(_) => "unknown_room",
            BookingError::InvalidPurpose(_) => "invalid_purpose",
            BookingError::CapacityExceeded { .. } => "capacity_exceeded",
            BookingError::InvalidRange(RangeError::InvalidAlignment { .. }) => "invalid_alignment",
            BookingError::InvalidRange(RangeError::InvalidOrder { .. }) => "invalid_order",
            BookingError::InvalidRange(RangeError::OutOfDayBounds { .. }) => "out_of_day_bounds",
            BookingError::InvalidRange(RangeError::Malformed { .. }) => "malformed",
            BookingError::OutsideOperatingHours { .. } => "outside_operating_hours",
            BookingError::Conflict(_) => "conflict",
            BookingError::NotFound(_) => "not_found",
            BookingError::Forbidden(_) => "forbidden",
            BookingError::LimitExceeded(_) => "limit_exceeded",
        }
    }
}

impl From<StoreError> for BookingError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::UnknownRoom(id) => BookingError::UnknownRoom(id),
            StoreError::Conflict(id) => BookingError::Conflict(id),
            StoreError::NotFound(id) => BookingError::NotFound(id),
            StoreError::LimitExceeded(msg) => BookingError::LimitExceeded(msg),
            // Room registration happens at setup, never through booking.
            StoreError::RoomExists(_) | StoreError::InvalidRoom { .. } => {
                BookingError::LimitExceeded("room registration rejected")
            }
        }
    }
}

pub struct BookingService {
    store: Arc<ReservationStore>,
    hours: OperatingHours,
}

impl BookingService {
    pub fn new(store: Arc<ReservationStore>, hours: OperatingHours) -> Self {
        Self { store, hours }
    }

    pub fn store(&self) -> &Arc<ReservationStore> {
        &self.store
    }

    pub fn hours(&self) -> OperatingHours {
        self.hours
    }

    pub async fn book(
        &self,
        actor: &Actor,
        request: BookingRequest,
    ) -> Result<Reservation, BookingError> {
        let room = self
            .store
            .room(&request.room_id)
            .await
            .ok_or_else(|| BookingError::UnknownRoom(request.room_id.clone()))?;

        let purpose = validate_purpose(&request.purpose)?;

        if request.party_size == 0 || request.party_size > room.capacity {
            return Err(BookingError::CapacityExceeded {
                party_size: request.party_size,
                capacity: room.capacity,
            });
        }

        let range = TimeRange::parse(&request.date, &request.start_time, &request.end_time)?;
        if !self.hours.contains(&range) {
            return Err(BookingError::OutsideOperatingHours {
                range,
                hours: self.hours,
            });
        }

        let candidate = NewReservation {
            room_id: room.id,
            range,
            purpose,
            party_size: request.party_size,
            owner_id: actor.id.clone(),
        };
        Ok(self.store.insert(candidate).await?)
    }

    /// Cancel a reservation on behalf of `actor`.
    pub async fn cancel(
        &self,
        actor: &Actor,
        id: ReservationId,
    ) -> Result<Reservation, BookingError> {
        let reservation = self
            .store
            .get_reservation(&id)
            .await
            .ok_or(BookingError::NotFound(id))?;
        if !actor.may_cancel(&reservation) {
            return Err(BookingError::Forbidden(id));
        }
        Ok(self.store.remove(id).await?)
    }

    /// Free ranges of a room within this service's operating hours.
    pub async fn free_slots(
        &self,
        room_id: &RoomId,
        date: NaiveDate,
    ) -> Result<Vec<TimeRange>, BookingError> {
        Ok(self.store.free_slots(room_id, date, &self.hours).await?)
    }

    pub async fn timeline(
        &self,
        room_id: &RoomId,
        date: NaiveDate,
    ) -> Result<Vec<SlotStatus>, BookingError> {
        Ok(self.store.timeline(room_id, date, &self.hours).await?)
    }

    pub async fn my_reservations(&self, actor: &Actor) -> Vec<Reservation> {
        self.store.by_owner(&actor.id).await
    }
}

/// Trimmed purpose, if it is non-empty and short enough.
fn validate_purpose(purpose: &str) -> Result<String, BookingError> {
    let trimmed = purpose.trim();
    if trimmed.is_empty() {
        return Err(BookingError::InvalidPurpose("must not be empty"));
    }
    if trimmed.chars().count() > MAX_PURPOSE_CHARS {
        return Err(BookingError::InvalidPurpose("longer than 100 characters"));
    }
    Ok(trimmed.to_string())
}
