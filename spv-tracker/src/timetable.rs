//! Timetable index
//!
//! Read-only view of the weekly schedule used by ingestion, the watchdog
//! sweeps and the coverage matcher.

use async_trait::async_trait;
use spv_common::db::TimetableSlot;
use spv_common::{ClockTime, DayOfWeek, Result};
use sqlx::{Pool, Sqlite};

use crate::db;

/// Lookup of scheduled slots
#[async_trait]
pub trait TimetableIndex: Send + Sync {
    /// Slot of a staff member in a room covering `time` (ends inclusive)
    async fn find_slot(
        &self,
        staff_id: i64,
        classroom_id: i64,
        day: DayOfWeek,
        time: ClockTime,
    ) -> Result<Option<TimetableSlot>>;

    /// Slot of a staff member in any room covering `time`
    async fn active_slot(
        &self,
        staff_id: i64,
        day: DayOfWeek,
        time: ClockTime,
    ) -> Result<Option<TimetableSlot>>;

    async fn slots_for_staff_on_day(&self, staff_id: i64, day: DayOfWeek) -> Result<Vec<TimetableSlot>>;

    /// Slots starting exactly at `time` on `day`
    async fn slots_starting_at(&self, day: DayOfWeek, time: ClockTime) -> Result<Vec<TimetableSlot>>;

    /// Every slot on `day` in a single read
    async fn slots_on_day(&self, day: DayOfWeek) -> Result<Vec<TimetableSlot>>;
}

/// [`TimetableIndex`] over the `timetable` table
#[derive(Clone)]
pub struct SqliteTimetable {
    db: Pool<Sqlite>,
}

impl SqliteTimetable {
    pub fn new(db: Pool<Sqlite>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl TimetableIndex for SqliteTimetable {
    async fn find_slot(
        &self,
        staff_id: i64,
        classroom_id: i64,
        day: DayOfWeek,
        time: ClockTime,
    ) -> Result<Option<TimetableSlot>> {
        db::timetable::find_slot(&self.db, staff_id, classroom_id, day, time).await
    }

    async fn active_slot(
        &self,
        staff_id: i64,
        day: DayOfWeek,
        time: ClockTime,
    ) -> Result<Option<TimetableSlot>> {
        db::timetable::active_slot_for_staff(&self.db, staff_id, day, time).await
    }

    async fn slots_for_staff_on_day(&self, staff_id: i64, day: DayOfWeek) -> Result<Vec<TimetableSlot>> {
        db::timetable::slots_for_staff_on_day(&self.db, staff_id, day).await
    }

    async fn slots_starting_at(&self, day: DayOfWeek, time: ClockTime) -> Result<Vec<TimetableSlot>> {
        db::timetable::slots_starting_at(&self.db, day, time).await
    }

    async fn slots_on_day(&self, day: DayOfWeek) -> Result<Vec<TimetableSlot>> {
        db::timetable::slots_on_day(&self.db, day).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::directory::{insert_classroom, insert_staff, NewStaff};
    use crate::db::timetable::{insert_slot, NewSlot};
    use spv_common::db::init_memory_database;

    fn t(s: &str) -> ClockTime {
        s.parse().unwrap()
    }

    #[tokio::test]
    async fn test_find_slot_bounds_are_inclusive() {
        let db = init_memory_database().await.unwrap();
        let staff = insert_staff(
            &db,
            NewStaff { name: "Ada", beacon_id: "b1", department: None, is_department_head: false },
        )
        .await
        .unwrap();
        let room = insert_classroom(&db, "Room 1", "esp-1").await.unwrap();
        let other_room = insert_classroom(&db, "Room 2", "esp-2").await.unwrap();
        insert_slot(
            &db,
            NewSlot {
                staff_id: staff,
                classroom_id: room,
                day_of_week: DayOfWeek::Monday,
                start: t("09:00"),
                end: t("10:00"),
                subject: Some("Algebra"),
            },
        )
        .await
        .unwrap();

        let index = SqliteTimetable::new(db);
        let monday = DayOfWeek::Monday;
        assert!(index.find_slot(staff, room, monday, t("09:00")).await.unwrap().is_some());
        assert!(index.find_slot(staff, room, monday, t("10:00")).await.unwrap().is_some());
        assert!(index.find_slot(staff, room, monday, t("10:01")).await.unwrap().is_none());
        assert!(index.find_slot(staff, other_room, monday, t("09:30")).await.unwrap().is_none());
        assert!(index.find_slot(staff, room, DayOfWeek::Tuesday, t("09:30")).await.unwrap().is_none());

        let active = index.active_slot(staff, monday, t("09:30")).await.unwrap().unwrap();
        assert_eq!(active.subject.as_deref(), Some("Algebra"));
        assert_eq!(index.slots_starting_at(monday, t("09:00")).await.unwrap().len(), 1);
        assert!(index.slots_starting_at(monday, t("09:01")).await.unwrap().is_empty());
    }
}
