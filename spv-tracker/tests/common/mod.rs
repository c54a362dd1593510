//! Shared fixture: a small school on Monday 2024-03-04
//!
//! | Staff | Department | Head | Monday slot |
//! |---|---|---|---|
//! | Alice | Maths | no | 09:00-10:00 Room 1, Algebra |
//! | Hank | Maths | yes | 09:30-10:30 Room 2, Geometry |
//! | Bob | Science | no | none |
//!
//! Users: one per staff member, an admin and a principal.

#![allow(dead_code)]

use chrono::{NaiveDate, NaiveDateTime};
use spv_common::db::{init_memory_database, Notification, UserRole};
use spv_common::{CoverSelection, DayOfWeek, EngineConfig, NotificationKind};
use sqlx::SqlitePool;
use std::sync::Arc;

use spv_tracker::clock::FixedClock;
use spv_tracker::db::directory::{insert_classroom, insert_staff, insert_user, NewStaff};
use spv_tracker::db::notifications::notifications_for;
use spv_tracker::db::timetable::{insert_slot, NewSlot};
use spv_tracker::ingest::Sighting;
use spv_tracker::sinks::RecordingEmailSink;
use spv_tracker::{build_router, AppState, Engine};

pub const ROOM_1_SCANNER: &str = "esp32-room-1";
pub const ROOM_2_SCANNER: &str = "esp32-room-2";
pub const ALICE_BEACON: &str = "beacon-alice";
pub const HANK_BEACON: &str = "beacon-hank";
pub const BOB_BEACON: &str = "beacon-bob";

pub struct School {
    pub db: SqlitePool,
    pub clock: FixedClock,
    pub email: Arc<RecordingEmailSink>,
    pub engine: Arc<Engine>,
    pub room_1: i64,
    pub room_2: i64,
    pub alice: i64,
    pub hank: i64,
    pub bob: i64,
    pub alice_user: i64,
    pub hank_user: i64,
    pub bob_user: i64,
    pub admin_user: i64,
    pub principal_user: i64,
}

impl School {
    pub fn router(&self) -> axum::Router {
        build_router(AppState::new(self.engine.clone()))
    }

    /// Inbox of a user restricted to one kind
    pub async fn inbox(&self, user_id: i64, kind: NotificationKind) -> Vec<Notification> {
        notifications_for(&self.db, user_id)
            .await
            .unwrap()
            .into_iter()
            .filter(|n| n.kind == kind)
            .collect()
    }

    pub async fn alert_count(&self) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM alerts")
            .fetch_one(&self.db)
            .await
            .unwrap()
    }

    pub async fn session_count(&self) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM attendance")
            .fetch_one(&self.db)
            .await
            .unwrap()
    }
}

pub fn monday() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 4).unwrap()
}

/// Monday at "HH:MM" or "HH:MM:SS"
pub fn at(time: &str) -> NaiveDateTime {
    let time = if time.len() == 5 { format!("{}:00", time) } else { time.to_string() };
    NaiveDateTime::parse_from_str(&format!("2024-03-04 {}", time), "%Y-%m-%d %H:%M:%S").unwrap()
}

pub fn sighting(scanner: &str, beacon: &str, rssi: i32, observed_at: NaiveDateTime) -> Sighting {
    Sighting {
        scanner_id: scanner.to_string(),
        beacon_id: beacon.to_string(),
        rssi,
        observed_at,
    }
}

/// Defaults with deterministic cover selection
pub fn test_config() -> EngineConfig {
    EngineConfig {
        cover_selection: CoverSelection::First,
        ..EngineConfig::default()
    }
}

pub async fn school() -> School {
    school_with(test_config()).await
}

pub async fn school_with(config: EngineConfig) -> School {
    let db = init_memory_database().await.expect("in-memory database");
    school_on(db, config).await
}

/// Seed the fixture into an already initialized database
pub async fn school_on(db: SqlitePool, config: EngineConfig) -> School {
    let room_1 = insert_classroom(&db, "Room 1", ROOM_1_SCANNER).await.unwrap();
    let room_2 = insert_classroom(&db, "Room 2", ROOM_2_SCANNER).await.unwrap();

    let alice = insert_staff(
        &db,
        NewStaff { name: "Alice", beacon_id: ALICE_BEACON, department: Some("Maths"), is_department_head: false },
    )
    .await
    .unwrap();
    let hank = insert_staff(
        &db,
        NewStaff { name: "Hank", beacon_id: HANK_BEACON, department: Some("Maths"), is_department_head: true },
    )
    .await
    .unwrap();
    let bob = insert_staff(
        &db,
        NewStaff { name: "Bob", beacon_id: BOB_BEACON, department: Some("Science"), is_department_head: false },
    )
    .await
    .unwrap();

    let alice_user = insert_user(&db, "Alice", "alice@school.test", UserRole::Staff, Some(alice)).await.unwrap();
    let hank_user = insert_user(&db, "Hank", "hank@school.test", UserRole::Staff, Some(hank)).await.unwrap();
    let bob_user = insert_user(&db, "Bob", "bob@school.test", UserRole::Staff, Some(bob)).await.unwrap();
    let admin_user = insert_user(&db, "Office", "office@school.test", UserRole::Admin, None).await.unwrap();
    let principal_user =
        insert_user(&db, "Pat", "principal@school.test", UserRole::Principal, None).await.unwrap();

    insert_slot(
        &db,
        NewSlot {
            staff_id: alice,
            classroom_id: room_1,
            day_of_week: DayOfWeek::Monday,
            start: "09:00".parse().unwrap(),
            end: "10:00".parse().unwrap(),
            subject: Some("Algebra"),
        },
    )
    .await
    .unwrap();
    insert_slot(
        &db,
        NewSlot {
            staff_id: hank,
            classroom_id: room_2,
            day_of_week: DayOfWeek::Monday,
            start: "09:30".parse().unwrap(),
            end: "10:30".parse().unwrap(),
            subject: Some("Geometry"),
        },
    )
    .await
    .unwrap();

    let clock = FixedClock::new(at("08:00"));
    let email = Arc::new(RecordingEmailSink::new());
    let engine = Arc::new(Engine::new(db.clone(), config, Arc::new(clock.clone()), email.clone()));

    School {
        db,
        clock,
        email,
        engine,
        room_1,
        room_2,
        alice,
        hank,
        bob,
        alice_user,
        hank_user,
        bob_user,
        admin_user,
        principal_user,
    }
}
