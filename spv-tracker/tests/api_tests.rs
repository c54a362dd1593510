//! Integration tests for the HTTP surface

mod common;

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use common::*;
use serde_json::{json, Value};
use tower::util::ServiceExt; // for `oneshot` method

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get_request(uri: &str) -> Request<Body> {
    Request::builder().method("GET").uri(uri).body(Body::empty()).unwrap()
}

async fn extract_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("Should read body");
    serde_json::from_slice(&bytes).expect("Should parse JSON")
}

async fn send(school: &School, request: Request<Body>) -> (StatusCode, Value) {
    let response = school.router().oneshot(request).await.unwrap();
    let status = response.status();
    (status, extract_json(response.into_body()).await)
}

fn ble(scanner: &str, beacon: &str, rssi: i32) -> Value {
    json!({ "esp32_id": scanner, "beacon_uuid": beacon, "rssi": rssi })
}

// =============================================================================
// Health
// =============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let school = school().await;

    let (status, body) = send(&school, get_request("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "spv-tracker");
    assert!(body["version"].is_string());

    let (status, body) = send(&school, get_request("/build_info")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["git_hash"].is_string());
}

// =============================================================================
// Ingestion
// =============================================================================

#[tokio::test]
async fn test_ble_weak_signal_is_ignored() {
    let school = school().await;
    school.clock.set(at("09:05"));

    let (status, body) = send(&school, json_request("POST", "/ble-data", ble(ROOM_1_SCANNER, ALICE_BEACON, -80))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ignored");
    assert_eq!(body["message"], "RSSI below threshold");
    assert!(body.get("attendance_status").is_none());
}

#[tokio::test]
async fn test_ble_tracking_lifecycle() {
    let school = school().await;

    school.clock.set(at("09:05"));
    let (status, body) =
        send(&school, json_request("POST", "/api/ble-data", ble(ROOM_1_SCANNER, ALICE_BEACON, -70))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "started");
    assert_eq!(body["attendance_status"], "Tracking");

    school.clock.set(at("09:20"));
    let (_, body) = send(&school, json_request("POST", "/ble-data", ble(ROOM_1_SCANNER, ALICE_BEACON, -70))).await;
    assert_eq!(body["status"], "updated");
    assert_eq!(body["message"], "Still tracking");
    assert_eq!(body["attendance_status"], "Tracking");

    school.clock.set(at("09:36"));
    let (_, body) = send(&school, json_request("POST", "/ble-data", ble(ROOM_1_SCANNER, ALICE_BEACON, -70))).await;
    assert_eq!(body["status"], "updated");
    assert_eq!(body["attendance_status"], "Present");

    school.clock.set(at("09:40"));
    let (_, body) = send(&school, json_request("POST", "/ble-data", ble(ROOM_1_SCANNER, ALICE_BEACON, -70))).await;
    assert_eq!(body["status"], "already_marked");
    assert_eq!(body["attendance_status"], "Present");
}

#[tokio::test]
async fn test_ble_no_class_is_ignored() {
    let school = school().await;
    school.clock.set(at("12:00"));

    let (status, body) = send(&school, json_request("POST", "/ble-data", ble(ROOM_1_SCANNER, ALICE_BEACON, -60))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ignored");
    assert_eq!(body["message"], "No scheduled class for this staff in this room at this time");
}

#[tokio::test]
async fn test_ble_unknown_hardware_is_404() {
    let school = school().await;
    school.clock.set(at("09:05"));

    let (status, body) = send(&school, json_request("POST", "/ble-data", ble(ROOM_1_SCANNER, "beacon-ghost", -60))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("beacon-ghost"));

    let (status, _) = send(&school, json_request("POST", "/ble-data", ble("esp32-attic", ALICE_BEACON, -60))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// =============================================================================
// Meeting
// =============================================================================

#[tokio::test]
async fn test_meet_endpoint() {
    let school = school().await;
    school.clock.set(at("09:10"));

    let body = json!({ "staff_id": school.alice, "requester_role": "principal", "requester_name": "Pat" });
    let (status, body) = send(&school, json_request("POST", "/api/meet", body)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Meeting request sent successfully.");
    assert_eq!(body["covered_by"], "Bob");
}

#[tokio::test]
async fn test_meet_rejects_non_executive() {
    let school = school().await;
    school.clock.set(at("09:10"));

    for role in ["staff", "admin", "janitor"] {
        let body = json!({ "staff_id": school.alice, "requester_role": role, "requester_name": "X" });
        let (status, body) = send(&school, json_request("POST", "/api/meet", body)).await;
        assert_eq!(status, StatusCode::FORBIDDEN, "role {}", role);
        assert!(body["error"].is_string());
    }

    let body = json!({ "staff_id": 4242, "requester_role": "director", "requester_name": "D" });
    let (status, _) = send(&school, json_request("POST", "/api/meet", body)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// =============================================================================
// Leaves
// =============================================================================

#[tokio::test]
async fn test_leave_submit_and_approve() {
    let school = school().await;

    let body = json!({
        "staff_id": school.alice,
        "start_date": "2024-03-04",
        "end_date": "2024-03-04",
        "reason": "Dentist",
        "leave_type": "sick"
    });
    let (status, body) = send(&school, json_request("POST", "/api/leaves", body)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["leave"]["status"], "pending");
    let leave_id = body["leave"]["id"].as_i64().unwrap();

    let uri = format!("/api/leaves/{}", leave_id);
    let (status, body) = send(&school, json_request("PUT", &uri, json!({ "status": "approved" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["leave"]["status"], "approved");
    assert_eq!(body["opportunities"].as_array().unwrap().len(), 1);

    let (status, _) = send(&school, json_request("PUT", &uri, json!({ "status": "rejected" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_leave_invalid_range_is_400() {
    let school = school().await;

    let body = json!({
        "staff_id": school.alice,
        "start_date": "2024-03-05",
        "end_date": "2024-03-04",
        "reason": "Oops"
    });
    let (status, _) = send(&school, json_request("POST", "/api/leaves", body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// =============================================================================
// Views
// =============================================================================

#[tokio::test]
async fn test_staff_status_view() {
    let school = school().await;
    school
        .engine
        .ingestor
        .ingest(sighting(ROOM_1_SCANNER, ALICE_BEACON, -60, at("09:05")))
        .await
        .unwrap();
    school.clock.set(at("09:07"));

    let (status, body) = send(&school, get_request("/api/staff-status")).await;
    assert_eq!(status, StatusCode::OK);
    let board = body.as_array().unwrap();
    assert_eq!(board.len(), 3);

    let alice = board.iter().find(|s| s["name"] == "Alice").unwrap();
    assert_eq!(alice["current_status"], "Tracking");
    assert_eq!(alice["current_location"], "Room 1");
    assert_eq!(alice["expected_location"], "Room 1");
    assert_eq!(alice["is_correct_location"], true);
    assert_eq!(alice["active_class"]["subject"], "Algebra");

    let bob = board.iter().find(|s| s["name"] == "Bob").unwrap();
    assert_eq!(bob["current_status"], "Absent");
    assert_eq!(bob["current_location"], "Not detected");
    assert_eq!(bob["expected_location"], "No Class Assigned");
    assert_eq!(bob["is_correct_location"], true);

    // Signal lost for longer than the stale window
    school.clock.set(at("09:11"));
    let (_, body) = send(&school, get_request("/api/staff-status")).await;
    let alice = body.as_array().unwrap().iter().find(|s| s["name"] == "Alice").cloned().unwrap();
    assert_eq!(alice["current_status"], "Left");
    assert_eq!(alice["current_location"], "Not detected");
    assert_eq!(alice["is_correct_location"], false);
}

#[tokio::test]
async fn test_staff_status_expected_room_until_slot_end() {
    let school = school().await;

    school.clock.set(at("10:00"));
    let (_, body) = send(&school, get_request("/api/staff-status")).await;
    let board = body.as_array().unwrap();
    let alice = board.iter().find(|s| s["name"] == "Alice").unwrap();
    assert_eq!(alice["expected_location"], "Room 1");
    assert_eq!(alice["is_correct_location"], false);
    let hank = board.iter().find(|s| s["name"] == "Hank").unwrap();
    assert_eq!(hank["expected_location"], "Room 2");

    school.clock.set(at("10:01"));
    let (_, body) = send(&school, get_request("/api/staff-status")).await;
    let alice = body.as_array().unwrap().iter().find(|s| s["name"] == "Alice").cloned().unwrap();
    assert_eq!(alice["expected_location"], "No Class Assigned");
    assert!(alice["active_class"].is_null());
}

#[tokio::test]
async fn test_alerts_and_dashboard() {
    let school = school().await;
    school.engine.watchdog.check_absences(at("09:15")).await.unwrap();
    school
        .engine
        .ingestor
        .ingest(sighting(ROOM_2_SCANNER, HANK_BEACON, -60, at("09:40")))
        .await
        .unwrap();
    school.clock.set(at("09:41"));

    let (status, body) = send(&school, get_request("/api/alerts")).await;
    assert_eq!(status, StatusCode::OK);
    let alerts = body.as_array().unwrap();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0]["staff_name"], "Alice");
    assert_eq!(alerts[0]["room_name"], "Room 1");

    let (status, body) = send(&school, get_request("/api/dashboard-stats")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_staff"], 3);
    assert_eq!(body["total_classrooms"], 2);
    assert_eq!(body["present_today"], 0);
    assert_eq!(body["late_today"], 0);
    assert_eq!(body["pending_leaves"], 0);
}
