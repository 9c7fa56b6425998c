use crate::limits::*;
use crate::model::*;

use super::StoreError;

/// Fails with the earliest reservation overlapping `range`.
/// Caller must hold the room's write lock for the result to stay true.
pub(crate) fn check_no_conflict(rs: &RoomState, range: &TimeRange) -> Result<(), StoreError> {
    match rs.overlapping(range).next() {
        Some(existing) => Err(StoreError::Conflict(existing.id)),
        None => Ok(()),
    }
}

pub(crate) fn check_room_limits(rs: &RoomState) -> Result<(), StoreError> {
    if rs.reservations.len() >= MAX_RESERVATIONS_PER_ROOM {
        return Err(StoreError::LimitExceeded("too many reservations on room"));
    }
    Ok(())
}

pub(crate) fn validate_room(room: &Room) -> Result<(), StoreError> {
    let invalid = |reason| StoreError::InvalidRoom {
        id: room.id.clone(),
        reason,
    };
    if room.id.as_str().is_empty() {
        return Err(invalid("empty id"));
    }
    if room.name.trim().is_empty() {
        return Err(invalid("empty name"));
    }
    if room.name.len() > MAX_ROOM_NAME_LEN {
        return Err(invalid("name too long"));
    }
    if room.capacity == 0 {
        return Err(invalid("capacity must be positive"));
    }
    Ok(())
}
