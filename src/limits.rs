use crate::model::Minutes;

/// Length of one bookable slot.
pub const SLOT_MINUTES: Minutes = 30;

pub const MINUTES_PER_DAY: Minutes = 24 * 60;

/// Default operating hours: 09:00 to 21:00.
pub const DEFAULT_DAY_START: Minutes = 9 * 60;
pub const DEFAULT_DAY_END: Minutes = 21 * 60;

/// Counted in characters, not bytes.
pub const MAX_PURPOSE_CHARS: usize = 100;

pub const MAX_ROOM_NAME_LEN: usize = 256;
pub const MAX_ROOMS: usize = 1_000;
pub const MAX_RESERVATIONS_PER_ROOM: usize = 100_000;
