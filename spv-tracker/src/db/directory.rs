//! Staff, classroom and user lookups
//!
//! Identity resolution for sightings and recipient resolution for notices.
//! The insert helpers exist for seeding and tests; general CRUD lives
//! elsewhere.

use spv_common::db::{Classroom, Staff, User, UserRole};
use spv_common::{Error, Result};
use sqlx::{Pool, Sqlite};

use super::normalize_hardware_id;

const STAFF_COLUMNS: &str = "id, name, beacon_id, department, is_department_head";
const USER_COLUMNS: &str = "u.id, u.name, u.email, u.role, u.staff_id, u.is_active";

/// Resolve a beacon identifier (case-insensitive) to its staff member
pub async fn find_staff_by_beacon(db: &Pool<Sqlite>, beacon_id: &str) -> Result<Option<Staff>> {
    let staff = sqlx::query_as::<_, Staff>(&format!(
        "SELECT {} FROM staff WHERE beacon_id = ?",
        STAFF_COLUMNS
    ))
    .bind(normalize_hardware_id(beacon_id))
    .fetch_optional(db)
    .await?;

    Ok(staff)
}

pub async fn get_staff(db: &Pool<Sqlite>, staff_id: i64) -> Result<Option<Staff>> {
    let staff = sqlx::query_as::<_, Staff>(&format!("SELECT {} FROM staff WHERE id = ?", STAFF_COLUMNS))
        .bind(staff_id)
        .fetch_optional(db)
        .await?;

    Ok(staff)
}

/// Every staff member, ordered by id
pub async fn list_staff(db: &Pool<Sqlite>) -> Result<Vec<Staff>> {
    let staff = sqlx::query_as::<_, Staff>(&format!("SELECT {} FROM staff ORDER BY id", STAFF_COLUMNS))
        .fetch_all(db)
        .await?;

    Ok(staff)
}

pub async fn count_staff(db: &Pool<Sqlite>) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM staff")
        .fetch_one(db)
        .await?;
    Ok(count)
}

pub async fn count_classrooms(db: &Pool<Sqlite>) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM classrooms")
        .fetch_one(db)
        .await?;
    Ok(count)
}

/// Resolve a scanner identifier (case-insensitive) to its classroom
pub async fn find_classroom_by_scanner(
    db: &Pool<Sqlite>,
    scanner_id: &str,
) -> Result<Option<Classroom>> {
    let room = sqlx::query_as::<_, Classroom>(
        "SELECT id, name, scanner_id FROM classrooms WHERE scanner_id = ?",
    )
    .bind(normalize_hardware_id(scanner_id))
    .fetch_optional(db)
    .await?;

    Ok(room)
}

pub async fn get_classroom(db: &Pool<Sqlite>, classroom_id: i64) -> Result<Option<Classroom>> {
    let room = sqlx::query_as::<_, Classroom>("SELECT id, name, scanner_id FROM classrooms WHERE id = ?")
        .bind(classroom_id)
        .fetch_optional(db)
        .await?;

    Ok(room)
}

/// Classroom name for messages, falling back to the id when the room is gone
pub async fn classroom_name(db: &Pool<Sqlite>, classroom_id: i64) -> Result<String> {
    Ok(get_classroom(db, classroom_id)
        .await?
        .map(|room| room.name)
        .unwrap_or_else(|| format!("room #{}", classroom_id)))
}

/// Active user account linked to a staff member
pub async fn user_for_staff(db: &Pool<Sqlite>, staff_id: i64) -> Result<Option<User>> {
    let user = sqlx::query_as::<_, User>(&format!(
        "SELECT {} FROM users u WHERE u.staff_id = ? AND u.is_active = 1 ORDER BY u.id LIMIT 1",
        USER_COLUMNS
    ))
    .bind(staff_id)
    .fetch_optional(db)
    .await?;

    Ok(user)
}

/// Active user accounts of the heads of `department`
pub async fn department_head_users(db: &Pool<Sqlite>, department: &str) -> Result<Vec<User>> {
    let users = sqlx::query_as::<_, User>(&format!(
        r#"
        SELECT {} FROM users u
        JOIN staff s ON s.id = u.staff_id
        WHERE s.department = ? AND s.is_department_head = 1 AND u.is_active = 1
        ORDER BY u.id
        "#,
        USER_COLUMNS
    ))
    .bind(department)
    .fetch_all(db)
    .await?;

    Ok(users)
}

pub async fn admin_users(db: &Pool<Sqlite>) -> Result<Vec<User>> {
    let users = sqlx::query_as::<_, User>(&format!(
        "SELECT {} FROM users u WHERE u.role = ? AND u.is_active = 1 ORDER BY u.id",
        USER_COLUMNS
    ))
    .bind(UserRole::Admin)
    .fetch_all(db)
    .await?;

    Ok(users)
}

/// Fields for a new staff member
#[derive(Debug, Clone)]
pub struct NewStaff<'a> {
    pub name: &'a str,
    pub beacon_id: &'a str,
    pub department: Option<&'a str>,
    pub is_department_head: bool,
}

pub async fn insert_staff(db: &Pool<Sqlite>, staff: NewStaff<'_>) -> Result<i64> {
    let beacon = normalize_hardware_id(staff.beacon_id);
    if beacon.is_empty() {
        return Err(Error::InvalidInput("beacon_id must not be empty".to_string()));
    }

    let result = sqlx::query(
        "INSERT INTO staff (name, beacon_id, department, is_department_head) VALUES (?, ?, ?, ?)",
    )
    .bind(staff.name.trim())
    .bind(beacon)
    .bind(staff.department.map(str::trim))
    .bind(staff.is_department_head)
    .execute(db)
    .await?;

    Ok(result.last_insert_rowid())
}

pub async fn insert_classroom(db: &Pool<Sqlite>, name: &str, scanner_id: &str) -> Result<i64> {
    let scanner = normalize_hardware_id(scanner_id);
    if scanner.is_empty() {
        return Err(Error::InvalidInput("scanner_id must not be empty".to_string()));
    }

    let result = sqlx::query("INSERT INTO classrooms (name, scanner_id) VALUES (?, ?)")
        .bind(name.trim())
        .bind(scanner)
        .execute(db)
        .await?;

    Ok(result.last_insert_rowid())
}

pub async fn insert_user(
    db: &Pool<Sqlite>,
    name: &str,
    email: &str,
    role: UserRole,
    staff_id: Option<i64>,
) -> Result<i64> {
    let result = sqlx::query("INSERT INTO users (name, email, role, staff_id) VALUES (?, ?, ?, ?)")
        .bind(name)
        .bind(email.trim().to_lowercase())
        .bind(role)
        .bind(staff_id)
        .execute(db)
        .await?;

    Ok(result.last_insert_rowid())
}

#[cfg(test)]
mod tests {
    use super::*;
    use spv_common::db::init_memory_database;

    #[tokio::test]
    async fn test_beacon_lookup_is_case_insensitive() {
        let db = init_memory_database().await.unwrap();
        let id = insert_staff(
            &db,
            NewStaff {
                name: "Ada",
                beacon_id: "fda50693-a4e2",
                department: Some("Maths"),
                is_department_head: false,
            },
        )
        .await
        .unwrap();

        let found = find_staff_by_beacon(&db, "FDA50693-A4E2").await.unwrap().unwrap();
        assert_eq!(found.id, id);
        assert_eq!(found.beacon_id, "FDA50693-A4E2");
        assert!(find_staff_by_beacon(&db, "unknown").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_department_heads_only_active_heads_of_that_department() {
        let db = init_memory_database().await.unwrap();
        let head = insert_staff(
            &db,
            NewStaff { name: "Head", beacon_id: "b1", department: Some("Maths"), is_department_head: true },
        )
        .await
        .unwrap();
        let other_head = insert_staff(
            &db,
            NewStaff { name: "Other", beacon_id: "b2", department: Some("Art"), is_department_head: true },
        )
        .await
        .unwrap();
        let member = insert_staff(
            &db,
            NewStaff { name: "Member", beacon_id: "b3", department: Some("Maths"), is_department_head: false },
        )
        .await
        .unwrap();
        insert_user(&db, "Head", "head@school.test", UserRole::Staff, Some(head)).await.unwrap();
        insert_user(&db, "Other", "other@school.test", UserRole::Staff, Some(other_head)).await.unwrap();
        insert_user(&db, "Member", "member@school.test", UserRole::Staff, Some(member)).await.unwrap();

        let heads = department_head_users(&db, "Maths").await.unwrap();
        assert_eq!(heads.len(), 1);
        assert_eq!(heads[0].staff_id, Some(head));
    }
}
