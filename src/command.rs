//! JSON command envelope over [`BookingService`].
//!
//! One command per line in, one reply per line out:
//!
//! ```text
//! {"op":"book","actor":{"id":"user123","role":"student"},"request":{"room_id":"A","date":"2024-05-20","start_time":"10:00","end_time":"11:00","purpose":"study","party_size":3}}
//! {"ok":true,"data":{"reservation":{"id":"01HY...","room_id":"A",...}}}
//! ```

use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::booking::{Actor, BookingError, BookingRequest, BookingService};
use crate::model::*;
use crate::observability::{self, COMMANDS_TOTAL, COMMAND_DURATION_SECONDS, RESERVATIONS_ACTIVE};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Command {
    ListRooms,
    Book {
        actor: Actor,
        request: BookingRequest,
    },
    Cancel {
        actor: Actor,
        reservation_id: ReservationId,
    },
    FreeSlots {
        room_id: RoomId,
        date: String,
    },
    Timeline {
        room_id: RoomId,
        date: String,
    },
    Reservations {
        room_id: RoomId,
        date: String,
    },
    MyReservations {
        actor: Actor,
    },
}

// ── Reply types ─────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reply {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Payload>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Payload {
    Rooms(Vec<Room>),
    Reservation(ReservationView),
    Reservations(Vec<ReservationView>),
    FreeSlots(Vec<RangeView>),
    Timeline(Vec<SlotView>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorBody {
    pub kind: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conflicting_id: Option<ReservationId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RangeView {
    pub date: String,
    pub start_time: String,
    pub end_time: String,
}

impl From<&TimeRange> for RangeView {
    fn from(r: &TimeRange) -> Self {
        Self {
            date: r.date().format("%Y-%m-%d").to_string(),
            start_time: format_hhmm(r.start()),
            end_time: format_hhmm(r.end()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReservationView {
    pub id: ReservationId,
    pub room_id: RoomId,
    #[serde(flatten)]
    pub range: RangeView,
    pub purpose: String,
    pub party_size: u32,
    pub owner_id: OwnerId,
}

impl From<&Reservation> for ReservationView {
    fn from(r: &Reservation) -> Self {
        Self {
            id: r.id,
            room_id: r.room_id.clone(),
            range: RangeView::from(&r.range),
            purpose: r.purpose.clone(),
            party_size: r.party_size,
            owner_id: r.owner_id.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SlotView {
    pub start_time: String,
    pub end_time: String,
    pub reservation_id: Option<ReservationId>,
}

impl From<&SlotStatus> for SlotView {
    fn from(s: &SlotStatus) -> Self {
        Self {
            start_time: format_hhmm(s.range.start()),
            end_time: format_hhmm(s.range.end()),
            reservation_id: s.reservation,
        }
    }
}

impl Reply {
    fn success(data: Payload) -> Self {
        Self {
            ok: true,
            data: Some(data),
            error: None,
        }
    }

    fn failure(error: ErrorBody) -> Self {
        Self {
            ok: false,
            data: None,
            error: Some(error),
        }
    }
}

impl From<&BookingError> for ErrorBody {
    fn from(e: &BookingError) -> Self {
        let conflicting_id = match e {
            BookingError::Conflict(id) => Some(*id),
            _ => None,
        };
        Self {
            kind: e.kind(),
            message: e.to_string(),
            conflicting_id,
        }
    }
}

// ── Dispatch ─────────────────────────────────────────────────────

pub async fn execute(service: &BookingService, cmd: Command) -> Result<Payload, BookingError> {
    match cmd {
        Command::ListRooms => Ok(Payload::Rooms(service.store().list_rooms().await)),
        Command::Book { actor, request } => {
            let res = service.book(&actor, request).await?;
            Ok(Payload::Reservation(ReservationView::from(&res)))
        }
        Command::Cancel {
            actor,
            reservation_id,
        } => {
            let res = service.cancel(&actor, reservation_id).await?;
            Ok(Payload::Reservation(ReservationView::from(&res)))
        }
        Command::FreeSlots { room_id, date } => {
            let date = parse_date(&date)?;
            let free = service.free_slots(&room_id, date).await?;
            Ok(Payload::FreeSlots(free.iter().map(RangeView::from).collect()))
        }
        Command::Timeline { room_id, date } => {
            let date = parse_date(&date)?;
            let cells = service.timeline(&room_id, date).await?;
            Ok(Payload::Timeline(cells.iter().map(SlotView::from).collect()))
        }
        Command::Reservations { room_id, date } => {
            let date = parse_date(&date)?;
            let list = service
                .store()
                .by_room_and_date(&room_id, date)
                .await
                .map_err(BookingError::from)?;
            Ok(Payload::Reservations(list.iter().map(ReservationView::from).collect()))
        }
        Command::MyReservations { actor } => {
            let list = service.my_reservations(&actor).await;
            Ok(Payload::Reservations(list.iter().map(ReservationView::from).collect()))
        }
    }
}

/// Parse one JSON command, run it, and build the reply.
pub async fn handle_line(service: &BookingService, line: &str) -> Reply {
    let cmd: Command = match serde_json::from_str(line) {
        Ok(cmd) => cmd,
        Err(e) => {
            debug!("rejected malformed command: {e}");
            metrics::counter!(COMMANDS_TOTAL, "command" => "unknown", "status" => "error")
                .increment(1);
            return Reply::failure(ErrorBody {
                kind: "bad_command",
                message: e.to_string(),
                conflicting_id: None,
            });
        }
    };

    let label = observability::command_label(&cmd);
    let started = Instant::now();
    let result = execute(service, cmd).await;
    metrics::histogram!(COMMAND_DURATION_SECONDS, "command" => label)
        .record(started.elapsed().as_secs_f64());
    metrics::gauge!(RESERVATIONS_ACTIVE).set(service.store().reservation_count() as f64);

    match result {
        Ok(data) => {
            metrics::counter!(COMMANDS_TOTAL, "command" => label, "status" => "ok").increment(1);
            Reply::success(data)
        }
        Err(e) => {
            debug!(command = label, "command rejected: {e}");
            metrics::counter!(COMMANDS_TOTAL, "command" => label, "status" => "error")
                .increment(1);
            Reply::failure(ErrorBody::from(&e))
        }
    }
}

/// [`handle_line`], serialized.
pub async fn handle_line_json(service: &BookingService, line: &str) -> String {
    let reply = handle_line(service, line).await;
    serde_json::to_string(&reply).unwrap_or_else(|e| {
        format!(r#"{{"ok":false,"error":{{"kind":"internal","message":"{e}"}}}}"#)
    })
}
