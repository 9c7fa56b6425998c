use chrono::NaiveDate;

use crate::model::*;

// ── Availability Algorithm ────────────────────────────────────────
//
// Every query scans the room's reservations for one day. Per-room, per-day
// counts stay in the low tens, so there is no secondary index.

/// Booked ranges of a room on `date`, ascending by start.
/// Equal starts cannot occur: the store never admits overlapping ranges.
pub fn booked_ranges(rs: &RoomState, date: NaiveDate) -> Vec<TimeRange> {
    rs.on_date(date).iter().map(|r| r.range).collect()
}

/// Maximal free ranges of a room on `date` within operating hours.
pub fn free_slots(rs: &RoomState, date: NaiveDate, hours: &OperatingHours) -> Vec<TimeRange> {
    let booked = merge_adjacent(&booked_ranges(rs, date));
    subtract_ranges(&[hours.window(date)], &booked)
}

/// Slot-by-slot view of the operating window, marking which reservation
/// occupies each slot.
pub fn timeline(rs: &RoomState, date: NaiveDate, hours: &OperatingHours) -> Vec<SlotStatus> {
    let day = rs.on_date(date);
    let mut cursor = 0;
    hours
        .window(date)
        .slots()
        .map(|slot| {
            while cursor < day.len() && day[cursor].range.end() <= slot.start() {
                cursor += 1;
            }
            let reservation = day
                .get(cursor)
                .filter(|r| r.range.overlaps(&slot))
                .map(|r| r.id);
            SlotStatus {
                range: slot,
                reservation,
            }
        })
        .collect()
}

/// Merge sorted same-day ranges that overlap or touch into disjoint ranges.
pub fn merge_adjacent(sorted: &[TimeRange]) -> Vec<TimeRange> {
    let mut merged: Vec<TimeRange> = Vec::new();
    for &range in sorted {
        if let Some(last) = merged.last_mut()
            && last.date() == range.date()
            && range.start() <= last.end()
        {
            *last = TimeRange::span(last.date(), last.start(), last.end().max(range.end()));
            continue;
        }
        merged.push(range);
    }
    merged
}

/// Remove `to_remove` from `base`. Both sorted by start and on the same day.
pub fn subtract_ranges(base: &[TimeRange], to_remove: &[TimeRange]) -> Vec<TimeRange> {
    let mut result = Vec::new();
    let mut ri = 0;

    for &b in base {
        let mut current_start = b.start();
        let current_end = b.end();

        while ri < to_remove.len() && to_remove[ri].end() <= current_start {
            ri += 1;
        }

        let mut j = ri;
        while j < to_remove.len() && to_remove[j].start() < current_end {
            let r = &to_remove[j];
            if r.start() > current_start {
                result.push(TimeRange::span(b.date(), current_start, r.start()));
            }
            current_start = current_start.max(r.end());
            j += 1;
        }

        if current_start < current_end {
            result.push(TimeRange::span(b.date(), current_start, current_end));
        }
    }

    result
}
