use std::fmt;
use std::iter::FusedIterator;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::limits::*;

/// Minutes since local midnight. The only time-of-day type.
pub type Minutes = u32;

pub type ReservationId = Ulid;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(String);

impl RoomId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RoomId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Opaque identifier of whoever asked for a reservation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OwnerId(String);

impl OwnerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for OwnerId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Bookable room. Reference data: registered once, never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    pub id: RoomId,
    pub name: String,
    pub capacity: u32,
}

impl Room {
    pub fn new(id: impl Into<String>, name: impl Into<String>, capacity: u32) -> Self {
        Self {
            id: RoomId::new(id),
            name: name.into(),
            capacity,
        }
    }

    /// The rooms of the Agora floor.
    pub fn agora_defaults() -> Vec<Room> {
        vec![
            Room::new("A", "Group Study Room A", 6),
            Room::new("B", "Group Study Room B", 6),
            Room::new("C", "Multipurpose Room", 12),
        ]
    }
}

// ── Time ranges ─────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RangeError {
    #[error("minute {minutes} is not on a slot boundary")]
    InvalidAlignment { minutes: Minutes },
    #[error("start minute {start} must be before end minute {end}")]
    InvalidOrder { start: Minutes, end: Minutes },
    #[error("minute {minutes} is outside the day")]
    OutOfDayBounds { minutes: Minutes },
    #[error("malformed {field}: {value:?}")]
    Malformed { field: &'static str, value: String },
}

/// Half-open interval `[start, end)` on one calendar day, aligned to slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimeRange {
    date: NaiveDate,
    start: Minutes,
    end: Minutes,
}

impl TimeRange {
    pub fn new(date: NaiveDate, start: Minutes, end: Minutes) -> Result<Self, RangeError> {
        for minutes in [start, end] {
            if minutes % SLOT_MINUTES != 0 {
                return Err(RangeError::InvalidAlignment { minutes });
            }
        }
        if start >= end {
            return Err(RangeError::InvalidOrder { start, end });
        }
        for minutes in [start, end] {
            if minutes > MINUTES_PER_DAY {
                return Err(RangeError::OutOfDayBounds { minutes });
            }
        }
        Ok(Self { date, start, end })
    }

    /// Build from the request strings `YYYY-MM-DD`, `HH:MM`, `HH:MM`.
    pub fn parse(date: &str, start: &str, end: &str) -> Result<Self, RangeError> {
        let date = parse_date(date)?;
        let start = parse_hhmm(start)?;
        let end = parse_hhmm(end)?;
        Self::new(date, start, end)
    }

    /// For ranges derived from already-valid ones (gaps, slots).
    pub(crate) fn span(date: NaiveDate, start: Minutes, end: Minutes) -> Self {
        debug_assert!(start < end, "TimeRange start must be before end");
        debug_assert!(end <= MINUTES_PER_DAY, "TimeRange must stay within the day");
        Self { date, start, end }
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn start(&self) -> Minutes {
        self.start
    }

    pub fn end(&self) -> Minutes {
        self.end
    }

    pub fn duration(&self) -> Minutes {
        self.end - self.start
    }

    /// Same day and sharing any sub-interval. Abutting ranges do not overlap.
    pub fn overlaps(&self, other: &TimeRange) -> bool {
        self.date == other.date && self.start < other.end && other.start < self.end
    }

    /// Returns true if `self` fully contains `other`.
    pub fn contains(&self, other: &TimeRange) -> bool {
        self.date == other.date && self.start <= other.start && other.end <= self.end
    }

    /// The 30-minute slots making up this range, in order.
    pub fn slots(&self) -> Slots {
        Slots {
            date: self.date,
            next: self.start,
            end: self.end,
        }
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}-{}",
            self.date.format("%Y-%m-%d"),
            format_hhmm(self.start),
            format_hhmm(self.end)
        )
    }
}

/// Lazy slot sequence. Cloning restarts from the clone point.
#[derive(Debug, Clone)]
pub struct Slots {
    date: NaiveDate,
    next: Minutes,
    end: Minutes,
}

impl Iterator for Slots {
    type Item = TimeRange;

    fn next(&mut self) -> Option<TimeRange> {
        if self.next >= self.end {
            return None;
        }
        let start = self.next;
        self.next += SLOT_MINUTES;
        Some(TimeRange::span(self.date, start, start + SLOT_MINUTES))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = (self.end.saturating_sub(self.next) / SLOT_MINUTES) as usize;
        (n, Some(n))
    }
}

impl ExactSizeIterator for Slots {}

impl FusedIterator for Slots {}

/// Parse `HH:MM` into minutes since midnight. Range checking is left to
/// [`TimeRange::new`], so `25:00` parses and is later rejected as out of day.
pub fn parse_hhmm(s: &str) -> Result<Minutes, RangeError> {
    let malformed = || RangeError::Malformed {
        field: "time",
        value: s.to_string(),
    };
    let bytes = s.as_bytes();
    if bytes.len() != 5 || bytes[2] != b':' {
        return Err(malformed());
    }
    let digit = |b: u8| -> Result<Minutes, RangeError> {
        if b.is_ascii_digit() {
            Ok(Minutes::from(b - b'0'))
        } else {
            Err(malformed())
        }
    };
    let hours = digit(bytes[0])? * 10 + digit(bytes[1])?;
    let minutes = digit(bytes[3])? * 10 + digit(bytes[4])?;
    if minutes >= 60 {
        return Err(malformed());
    }
    Ok(hours * 60 + minutes)
}

pub fn format_hhmm(minutes: Minutes) -> String {
    format!("{:02}:{:02}", minutes / 60, minutes % 60)
}

pub fn parse_date(s: &str) -> Result<NaiveDate, RangeError> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|_| RangeError::Malformed {
        field: "date",
        value: s.to_string(),
    })
}

/// Daily window within which rooms may be booked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperatingHours {
    start: Minutes,
    end: Minutes,
}

impl Default for OperatingHours {
    fn default() -> Self {
        Self {
            start: DEFAULT_DAY_START,
            end: DEFAULT_DAY_END,
        }
    }
}

impl OperatingHours {
    pub fn new(start: Minutes, end: Minutes) -> Result<Self, RangeError> {
        // Same rules as any range; the date is irrelevant.
        TimeRange::new(NaiveDate::MIN, start, end)?;
        Ok(Self { start, end })
    }

    pub fn start(&self) -> Minutes {
        self.start
    }

    pub fn end(&self) -> Minutes {
        self.end
    }

    /// The whole bookable window of `date`.
    pub fn window(&self, date: NaiveDate) -> TimeRange {
        TimeRange::span(date, self.start, self.end)
    }

    pub fn contains(&self, range: &TimeRange) -> bool {
        self.start <= range.start() && range.end() <= self.end
    }
}

impl fmt::Display for OperatingHours {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", format_hhmm(self.start), format_hhmm(self.end))
    }
}

// ── Reservations ────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reservation {
    pub id: ReservationId,
    pub room_id: RoomId,
    pub range: TimeRange,
    pub purpose: String,
    pub party_size: u32,
    pub owner_id: OwnerId,
}

/// A reservation that has not been given an id yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewReservation {
    pub room_id: RoomId,
    pub range: TimeRange,
    pub purpose: String,
    pub party_size: u32,
    pub owner_id: OwnerId,
}

impl NewReservation {
    pub fn into_reservation(self, id: ReservationId) -> Reservation {
        Reservation {
            id,
            room_id: self.room_id,
            range: self.range,
            purpose: self.purpose,
            party_size: self.party_size,
            owner_id: self.owner_id,
        }
    }
}

/// One cell of a room's timeline for a day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotStatus {
    pub range: TimeRange,
    /// The reservation occupying this slot, if any.
    pub reservation: Option<ReservationId>,
}

impl SlotStatus {
    pub fn is_free(&self) -> bool {
        self.reservation.is_none()
    }
}

#[derive(Debug, Clone)]
pub struct RoomState {
    pub room: Room,
    /// Sorted by `(range.date, range.start)`.
    pub reservations: Vec<Reservation>,
}

impl RoomState {
    pub fn new(room: Room) -> Self {
        Self {
            room,
            reservations: Vec::new(),
        }
    }

    /// Insert maintaining sort order by date, then start.
    pub fn insert_reservation(&mut self, reservation: Reservation) {
        let key = (reservation.range.date, reservation.range.start);
        let pos = self
            .reservations
            .binary_search_by_key(&key, |r| (r.range.date, r.range.start))
            .unwrap_or_else(|e| e);
        self.reservations.insert(pos, reservation);
    }

    pub fn remove_reservation(&mut self, id: ReservationId) -> Option<Reservation> {
        let pos = self.reservations.iter().position(|r| r.id == id)?;
        Some(self.reservations.remove(pos))
    }

    /// All reservations on `date`, in start order.
    pub fn on_date(&self, date: NaiveDate) -> &[Reservation] {
        let lo = self.reservations.partition_point(|r| r.range.date < date);
        let hi = self.reservations.partition_point(|r| r.range.date <= date);
        &self.reservations[lo..hi]
    }

    /// Reservations whose range overlaps `query`.
    /// Binary search skips those starting at or after `query.end`.
    pub fn overlapping(&self, query: &TimeRange) -> impl Iterator<Item = &Reservation> {
        let day = self.on_date(query.date);
        let right_bound = day.partition_point(|r| r.range.start < query.end);
        day[..right_bound]
            .iter()
            .filter(move |r| r.range.end > query.start)
    }
}
