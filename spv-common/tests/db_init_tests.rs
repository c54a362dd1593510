//! Database initialization tests

use spv_common::db::{create_schema, init_database, init_memory_database};

async fn table_names(pool: &sqlx::SqlitePool) -> Vec<String> {
    sqlx::query_scalar("SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name")
        .fetch_all(pool)
        .await
        .expect("Should list tables")
}

#[tokio::test]
async fn test_database_creation_when_missing() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("nested").join("spv.db");
    assert!(!db_path.exists());

    let pool = init_database(&db_path).await.expect("Database initialization failed");

    assert!(db_path.exists(), "Database file was not created");
    assert_eq!(
        table_names(&pool).await,
        vec![
            "alerts",
            "attendance",
            "classrooms",
            "leaves",
            "notifications",
            "staff",
            "timetable",
            "users"
        ]
    );
}

#[tokio::test]
async fn test_database_opens_existing() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("spv.db");

    let pool = init_database(&db_path).await.unwrap();
    sqlx::query("INSERT INTO classrooms (name, scanner_id) VALUES ('Room 1', 'ESP-1')")
        .execute(&pool)
        .await
        .unwrap();
    pool.close().await;

    let pool = init_database(&db_path).await.expect("Should reopen existing database");
    let rooms: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM classrooms")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(rooms, 1, "Existing rows survive re-initialization");
}

#[tokio::test]
async fn test_schema_is_idempotent() {
    let pool = init_memory_database().await.unwrap();
    create_schema(&pool).await.expect("Second schema pass should succeed");
    assert_eq!(table_names(&pool).await.len(), 8);
}

#[tokio::test]
async fn test_attendance_key_is_unique() {
    let pool = init_memory_database().await.unwrap();
    sqlx::query("INSERT INTO staff (name, beacon_id) VALUES ('Ada', 'B1')")
        .execute(&pool)
        .await
        .unwrap();
    sqlx::query("INSERT INTO classrooms (name, scanner_id) VALUES ('Room 1', 'ESP-1')")
        .execute(&pool)
        .await
        .unwrap();

    let insert = "INSERT INTO attendance (staff_id, classroom_id, date, check_in, last_seen, status) \
                  VALUES (1, 1, '2024-03-04', '2024-03-04 09:05:00', '2024-03-04 09:05:00', 'Tracking')";
    sqlx::query(insert).execute(&pool).await.unwrap();
    assert!(sqlx::query(insert).execute(&pool).await.is_err());
}

#[tokio::test]
async fn test_timetable_rejects_inverted_slot() {
    let pool = init_memory_database().await.unwrap();
    sqlx::query("INSERT INTO staff (name, beacon_id) VALUES ('Ada', 'B1')")
        .execute(&pool)
        .await
        .unwrap();
    sqlx::query("INSERT INTO classrooms (name, scanner_id) VALUES ('Room 1', 'ESP-1')")
        .execute(&pool)
        .await
        .unwrap();

    let result = sqlx::query(
        "INSERT INTO timetable (staff_id, classroom_id, day_of_week, start_minute, end_minute) \
         VALUES (1, 1, 'Monday', 600, 540)",
    )
    .execute(&pool)
    .await;
    assert!(result.is_err());
}
