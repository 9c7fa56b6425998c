use super::*;
use super::conflict::check_no_conflict;
use crate::limits::*;

use chrono::NaiveDate;

const DAY: &str = "2024-05-20";

fn date() -> NaiveDate {
    parse_date(DAY).unwrap()
}

fn range(start: &str, end: &str) -> TimeRange {
    TimeRange::parse(DAY, start, end).unwrap()
}

fn candidate(room: &str, r: TimeRange) -> NewReservation {
    NewReservation {
        room_id: RoomId::new(room),
        range: r,
        purpose: "group study".into(),
        party_size: 3,
        owner_id: OwnerId::new("user123"),
    }
}

fn agora_store() -> ReservationStore {
    ReservationStore::with_rooms(Room::agora_defaults()).unwrap()
}

// ── Room registration ───────────────────────────────────

#[test]
fn register_rooms() {
    let store = agora_store();
    assert_eq!(store.room_count(), 3);
    assert!(store.get_room_state(&RoomId::new("C")).is_some());
    assert!(store.get_room_state(&RoomId::new("D")).is_none());
}

#[test]
fn duplicate_room_rejected() {
    let store = agora_store();
    let result = store.register_room(Room::new("A", "Another A", 4));
    assert_eq!(result, Err(StoreError::RoomExists(RoomId::new("A"))));
}

#[test]
fn invalid_rooms_rejected() {
    let store = ReservationStore::new();
    assert!(matches!(
        store.register_room(Room::new("X", "Broom cupboard", 0)),
        Err(StoreError::InvalidRoom { .. })
    ));
    assert!(matches!(
        store.register_room(Room::new("X", "  ", 2)),
        Err(StoreError::InvalidRoom { .. })
    ));
    assert!(matches!(
        store.register_room(Room::new("", "Nameless", 2)),
        Err(StoreError::InvalidRoom { .. })
    ));
    assert!(matches!(
        store.register_room(Room::new("X", "n".repeat(MAX_ROOM_NAME_LEN + 1), 2)),
        Err(StoreError::InvalidRoom { .. })
    ));
    assert_eq!(store.room_count(), 0);
}

#[tokio::test]
async fn list_rooms_sorted_by_id() {
    let store = ReservationStore::with_rooms([
        Room::new("C", "Multipurpose Room", 12),
        Room::new("A", "Group Study Room A", 6),
        Room::new("B", "Group Study Room B", 6),
    ])
    .unwrap();
    let ids: Vec<_> = store
        .list_rooms()
        .await
        .into_iter()
        .map(|r| r.id.to_string())
        .collect();
    assert_eq!(ids, vec!["A", "B", "C"]);
}

// ── Insert ───────────────────────────────────

#[tokio::test]
async fn insert_and_query() {
    let store = agora_store();
    let res = store.insert(candidate("A", range("10:00", "11:00"))).await.unwrap();

    assert_eq!(store.reservation_count(), 1);
    assert_eq!(store.get_room_for_reservation(&res.id), Some(RoomId::new("A")));
    assert_eq!(store.get_reservation(&res.id).await, Some(res.clone()));
    assert_eq!(
        store.by_room_and_date(&RoomId::new("A"), date()).await.unwrap(),
        vec![res]
    );
}

#[tokio::test]
async fn insert_unknown_room() {
    let store = agora_store();
    let result = store.insert(candidate("Z", range("10:00", "11:00"))).await;
    assert_eq!(result, Err(StoreError::UnknownRoom(RoomId::new("Z"))));
    assert_eq!(store.reservation_count(), 0);
}

#[tokio::test]
async fn insert_conflict_names_existing() {
    let store = agora_store();
    let existing = store.insert(candidate("A", range("10:00", "11:00"))).await.unwrap();

    let result = store.insert(candidate("A", range("10:30", "11:30"))).await;
    assert_eq!(result, Err(StoreError::Conflict(existing.id)));

    // Containing and contained ranges conflict too
    let result = store.insert(candidate("A", range("09:00", "12:00"))).await;
    assert_eq!(result, Err(StoreError::Conflict(existing.id)));
    let result = store.insert(candidate("A", range("10:00", "10:30"))).await;
    assert_eq!(result, Err(StoreError::Conflict(existing.id)));

    assert_eq!(store.reservation_count(), 1);
}

#[tokio::test]
async fn conflict_reports_earliest_overlap() {
    let store = agora_store();
    let first = store.insert(candidate("A", range("10:00", "11:00"))).await.unwrap();
    store.insert(candidate("A", range("11:00", "12:00"))).await.unwrap();

    let result = store.insert(candidate("A", range("10:30", "11:30"))).await;
    assert_eq!(result, Err(StoreError::Conflict(first.id)));
}

#[tokio::test]
async fn abutting_reservations_allowed() {
    let store = agora_store();
    store.insert(candidate("A", range("10:00", "11:00"))).await.unwrap();
    store.insert(candidate("A", range("11:00", "12:00"))).await.unwrap();
    store.insert(candidate("A", range("09:30", "10:00"))).await.unwrap();
    assert_eq!(store.reservation_count(), 3);
}

#[tokio::test]
async fn same_range_different_rooms_or_days() {
    let store = agora_store();
    store.insert(candidate("A", range("10:00", "11:00"))).await.unwrap();
    store.insert(candidate("B", range("10:00", "11:00"))).await.unwrap();
    let next_day = TimeRange::parse("2024-05-21", "10:00", "11:00").unwrap();
    store.insert(candidate("A", next_day)).await.unwrap();
    assert_eq!(store.reservation_count(), 3);
}

#[tokio::test]
async fn ids_are_unique() {
    let store = agora_store();
    let mut ids = std::collections::HashSet::new();
    for slot in range("09:00", "21:00").slots() {
        let res = store.insert(candidate("C", slot)).await.unwrap();
        assert!(ids.insert(res.id));
    }
    assert_eq!(ids.len(), 24);
}

// ── Remove ───────────────────────────────────

#[tokio::test]
async fn remove_frees_range() {
    let store = agora_store();
    let res = store.insert(candidate("A", range("10:00", "11:00"))).await.unwrap();
    let room = RoomId::new("A");
    assert!(!store.is_free(&room, &res.range).await.unwrap());

    let removed = store.remove(res.id).await.unwrap();
    assert_eq!(removed, res);
    assert!(store.is_free(&room, &res.range).await.unwrap());
    assert_eq!(store.reservation_count(), 0);
    assert!(store.get_reservation(&res.id).await.is_none());

    // The range can be booked again
    store.insert(candidate("A", range("10:00", "11:00"))).await.unwrap();
}

#[tokio::test]
async fn remove_unknown_id() {
    let store = agora_store();
    let id = ulid::Ulid::new();
    assert_eq!(store.remove(id).await, Err(StoreError::NotFound(id)));
}

#[tokio::test]
async fn remove_twice() {
    let store = agora_store();
    let res = store.insert(candidate("B", range("13:00", "14:00"))).await.unwrap();
    store.remove(res.id).await.unwrap();
    assert_eq!(store.remove(res.id).await, Err(StoreError::NotFound(res.id)));
}

// ── Queries ───────────────────────────────────

#[tokio::test]
async fn by_room_and_date_sorted() {
    let store = agora_store();
    for (s, e) in [("15:00", "16:00"), ("09:00", "10:00"), ("12:00", "13:30")] {
        store.insert(candidate("A", range(s, e))).await.unwrap();
    }
    let starts: Vec<_> = store
        .by_room_and_date(&RoomId::new("A"), date())
        .await
        .unwrap()
        .iter()
        .map(|r| r.range.start())
        .collect();
    assert_eq!(starts, vec![540, 720, 900]);
}

#[tokio::test]
async fn queries_on_unknown_room_fail() {
    let store = agora_store();
    let room = RoomId::new("Z");
    let hours = OperatingHours::default();
    assert!(matches!(
        store.booked_ranges(&room, date()).await,
        Err(StoreError::UnknownRoom(_))
    ));
    assert!(matches!(
        store.free_slots(&room, date(), &hours).await,
        Err(StoreError::UnknownRoom(_))
    ));
    assert!(matches!(
        store.is_free(&room, &range("10:00", "11:00")).await,
        Err(StoreError::UnknownRoom(_))
    ));
}

#[tokio::test]
async fn free_slots_idempotent() {
    let store = agora_store();
    store.insert(candidate("A", range("10:00", "11:00"))).await.unwrap();
    store.insert(candidate("A", range("13:30", "14:00"))).await.unwrap();
    let room = RoomId::new("A");
    let hours = OperatingHours::default();
    let first = store.free_slots(&room, date(), &hours).await.unwrap();
    let second = store.free_slots(&room, date(), &hours).await.unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn free_and_booked_tile_operating_hours() {
    let store = agora_store();
    for (s, e) in [("09:00", "09:30"), ("10:00", "11:00"), ("11:00", "12:00"), ("20:00", "21:00")] {
        store.insert(candidate("A", range(s, e))).await.unwrap();
    }
    let room = RoomId::new("A");
    let hours = OperatingHours::default();
    let mut pieces = store.free_slots(&room, date(), &hours).await.unwrap();
    pieces.extend(store.booked_ranges(&room, date()).await.unwrap());
    pieces.sort_by_key(|r| r.start());

    let mut cursor = DEFAULT_DAY_START;
    for piece in &pieces {
        assert_eq!(piece.start(), cursor, "gap or double coverage at {piece}");
        cursor = piece.end();
    }
    assert_eq!(cursor, DEFAULT_DAY_END);
}

#[tokio::test]
async fn by_owner_spans_rooms() {
    let store = agora_store();
    let mut mine = candidate("B", range("14:00", "15:00"));
    mine.owner_id = OwnerId::new("alice");
    store.insert(mine).await.unwrap();
    let mut also_mine = candidate("A", range("09:00", "10:00"));
    also_mine.owner_id = OwnerId::new("alice");
    store.insert(also_mine).await.unwrap();
    store.insert(candidate("C", range("09:00", "10:00"))).await.unwrap();

    let found = store.by_owner(&OwnerId::new("alice")).await;
    let rooms: Vec<_> = found.iter().map(|r| r.room_id.to_string()).collect();
    assert_eq!(rooms, vec!["A", "B"]);
}

#[tokio::test]
async fn timeline_reflects_store() {
    let store = agora_store();
    let res = store.insert(candidate("A", range("09:00", "10:00"))).await.unwrap();
    let cells = store
        .timeline(&RoomId::new("A"), date(), &OperatingHours::default())
        .await
        .unwrap();
    assert_eq!(cells[0].reservation, Some(res.id));
    assert_eq!(cells[1].reservation, Some(res.id));
    assert!(cells[2..].iter().all(|c| c.is_free()));
}

#[test]
fn conflict_check_pure() {
    let mut rs = RoomState::new(Room::new("A", "Group Study Room A", 6));
    let id = ulid::Ulid::new();
    rs.insert_reservation(candidate("A", range("10:00", "11:00")).into_reservation(id));
    assert_eq!(
        check_no_conflict(&rs, &range("10:30", "11:30")),
        Err(StoreError::Conflict(id))
    );
    assert!(check_no_conflict(&rs, &range("11:00", "11:30")).is_ok());
    assert!(check_no_conflict(&rs, &range("09:30", "10:00")).is_ok());
}

// ── Concurrency ───────────────────────────────────

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_identical_bookings_one_wins() {
    let store = Arc::new(agora_store());
    let mut handles = Vec::new();
    for _ in 0..2 {
        let store = store.clone();
        handles.push(tokio::spawn(async move {
            store.insert(candidate("A", range("10:00", "11:00"))).await
        }));
    }
    let results: Vec<_> = futures::future::join_all(handles)
        .await
        .into_iter()
        .map(|h| h.unwrap())
        .collect();

    let winners: Vec<_> = results.iter().filter_map(|r| r.as_ref().ok()).collect();
    assert_eq!(winners.len(), 1);
    let loser = results.iter().find_map(|r| r.as_ref().err()).unwrap();
    assert_eq!(*loser, StoreError::Conflict(winners[0].id));
    assert_eq!(store.reservation_count(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn concurrent_overlapping_bookings_never_double_book() {
    let store = Arc::new(agora_store());
    let mut handles = Vec::new();
    // 64 tasks racing for overlapping hour-long ranges starting every half hour
    for i in 0..64u32 {
        let store = store.clone();
        let start = DEFAULT_DAY_START + (i % 20) * SLOT_MINUTES;
        let r = TimeRange::new(date(), start, start + 60).unwrap();
        handles.push(tokio::spawn(async move { store.insert(candidate("B", r)).await }));
    }
    for h in futures::future::join_all(handles).await {
        match h.unwrap() {
            Ok(_) | Err(StoreError::Conflict(_)) => {}
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    let booked = store.by_room_and_date(&RoomId::new("B"), date()).await.unwrap();
    assert!(!booked.is_empty());
    for (i, a) in booked.iter().enumerate() {
        for b in &booked[i + 1..] {
            assert!(!a.range.overlaps(&b.range), "{} overlaps {}", a.range, b.range);
        }
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_rooms_do_not_block_each_other() {
    let store = Arc::new(agora_store());
    let mut handles = Vec::new();
    for room in ["A", "B", "C"] {
        for slot in range("09:00", "21:00").slots() {
            let store = store.clone();
            handles.push(tokio::spawn(async move { store.insert(candidate(room, slot)).await }));
        }
    }
    for h in futures::future::join_all(handles).await {
        h.unwrap().unwrap();
    }
    assert_eq!(store.reservation_count(), 72);
    for room in ["A", "B", "C"] {
        let free = store
            .free_slots(&RoomId::new(room), date(), &OperatingHours::default())
            .await
            .unwrap();
        assert!(free.is_empty());
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_remove_only_one_succeeds() {
    let store = Arc::new(agora_store());
    let id = store.insert(candidate("C", range("18:00", "19:00"))).await.unwrap().id;
    let mut handles = Vec::new();
    for _ in 0..4 {
        let store = store.clone();
        handles.push(tokio::spawn(async move { store.remove(id).await }));
    }
    let ok = futures::future::join_all(handles)
        .await
        .into_iter()
        .filter(|h| matches!(h, Ok(Ok(_))))
        .count();
    assert_eq!(ok, 1);
    assert_eq!(store.reservation_count(), 0);
}
