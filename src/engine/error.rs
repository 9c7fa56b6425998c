use crate::model::{ReservationId, RoomId};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("unknown room: {0}")]
    UnknownRoom(RoomId),
    #[error("room already registered: {0}")]
    RoomExists(RoomId),
    #[error("invalid room {id}: {reason}")]
    InvalidRoom { id: RoomId, reason: &'static str },
    #[error("conflict with reservation: {0}")]
    Conflict(ReservationId),
    #[error("reservation not found: {0}")]
    NotFound(ReservationId),
    #[error("limit exceeded: {0}")]
    LimitExceeded(&'static str),
}
