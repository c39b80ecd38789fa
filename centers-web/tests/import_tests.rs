//! Integration tests for the CSV staged-import pipeline
//!
//! Tests cover:
//! - Preview annotation (valid/invalid rows, reasons)
//! - Commit accounting: created + skipped == total, matching audit entry
//! - Token lifecycle: single use, unknown token is a no-op error
//! - Re-validation at commit time against changed database state
//! - Template download

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use serde_json::{json, Value};
use sqlx::SqlitePool;
use tower::util::ServiceExt;
use uuid::Uuid;

use centers_web::{build_router, AppState};

const CSV_HEADER: &str =
    "center_code,participant_name,participant_id,sex,caregiver_name,house_latitude,house_longitude";

async fn setup() -> (axum::Router, SqlitePool) {
    let pool = centers_common::db::init_memory_database()
        .await
        .expect("Should create in-memory database");
    let app = build_router(AppState::new(pool.clone()));
    (app, pool)
}

async fn seed_center(pool: &SqlitePool, code: &str) -> String {
    let guid = Uuid::new_v4().to_string();
    sqlx::query(
        "INSERT INTO centers (guid, name, center_code, territory, cluster, \
         latitude, longitude, beneficiaries) \
         VALUES (?, ?, ?, 'North', 'A', 39.29, -76.61, 100)",
    )
    .bind(&guid)
    .bind(format!("Center {}", code))
    .bind(code)
    .execute(pool)
    .await
    .expect("Should insert center");
    guid
}

async fn seed_user(pool: &SqlitePool, username: &str, role: &str, center: Option<&str>) -> String {
    let token = format!("token-{}", username);
    sqlx::query(
        "INSERT INTO users (guid, username, email, api_token, role, center_id) \
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(Uuid::new_v4().to_string())
    .bind(username)
    .bind(format!("{}@example.org", username))
    .bind(&token)
    .bind(role)
    .bind(center)
    .execute(pool)
    .await
    .expect("Should insert user");
    token
}

fn csv_request(uri: &str, token: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("authorization", format!("Bearer {}", token))
        .header("content-type", "text/csv")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn json_request(method: &str, uri: &str, token: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("authorization", format!("Bearer {}", token))
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get_request(uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .header("authorization", format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap()
}

async fn extract_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("Should read body");
    serde_json::from_slice(&bytes).expect("Should parse JSON")
}

async fn extract_text(body: Body) -> String {
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("Should read body");
    String::from_utf8(bytes.to_vec()).expect("Should be UTF-8")
}

async fn preview(app: &axum::Router, token: &str, csv: &str) -> Value {
    let response = app
        .clone()
        .oneshot(csv_request("/api/import/preview", token, csv))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    extract_json(response.into_body()).await
}

async fn confirm(app: &axum::Router, token: &str, preview_token: &Value) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/import/confirm",
            token,
            json!({ "token": preview_token }),
        ))
        .await
        .unwrap();
    let status = response.status();
    (status, extract_json(response.into_body()).await)
}

// =============================================================================
// Preview
// =============================================================================

#[tokio::test]
async fn test_preview_requires_national_role() {
    let (app, pool) = setup().await;
    let center = seed_center(&pool, "MD1111").await;
    let staff = seed_user(&pool, "staff1", "staff", Some(&center)).await;

    let response = app
        .oneshot(csv_request("/api/import/preview", &staff, CSV_HEADER))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_preview_rejects_missing_columns() {
    let (app, pool) = setup().await;
    let national = seed_user(&pool, "nat", "national_office", None).await;

    let response = app
        .oneshot(csv_request(
            "/api/import/preview",
            &national,
            "center_code,participant_name\nMD1111,John\n",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = extract_json(response.into_body()).await;
    assert!(body["error"]["message"]
        .as_str()
        .unwrap()
        .contains("Missing columns"));
}

#[tokio::test]
async fn test_preview_tolerates_bom() {
    let (app, pool) = setup().await;
    seed_center(&pool, "MD1111").await;
    let national = seed_user(&pool, "nat", "national_office", None).await;

    let csv = format!("\u{feff}{CSV_HEADER}\nMD1111,John Doe,P-1,M,Jane Doe,39.29,-76.61\n");
    let body = preview(&app, &national, &csv).await;
    assert_eq!(body["summary"]["total"], 1);
    assert_eq!(body["summary"]["valid"], 1);
}

#[tokio::test]
async fn test_preview_flags_invalid_rows_with_reasons() {
    let (app, pool) = setup().await;
    seed_center(&pool, "MD1111").await;
    let national = seed_user(&pool, "nat", "national_office", None).await;

    let csv = format!(
        "{CSV_HEADER}\n\
         MD1111,John Doe,P-1,M,Jane Doe,39.29,-76.61\n\
         MD1111,Bad Coords,P-2,F,Jane Doe,95.0,-76.61\n\
         MD1111,Bad Sex,P-3,X,Jane Doe,39.29,-76.61\n\
         ,No Center,P-4,M,Jane Doe,39.29,-76.61\n"
    );

    let body = preview(&app, &national, &csv).await;
    assert_eq!(body["summary"]["total"], 4);
    assert_eq!(body["summary"]["valid"], 1);
    assert_eq!(body["summary"]["invalid"], 3);

    let rows = body["rows"].as_array().unwrap();
    assert_eq!(rows[0]["valid"], true);
    assert!(rows[1]["error"].as_str().unwrap().contains("house_latitude"));
    assert!(rows[2]["error"].as_str().unwrap().contains("sex"));
    assert!(rows[3]["error"].as_str().unwrap().contains("center_code is empty"));
}

#[tokio::test]
async fn test_preview_catches_duplicate_id_from_direct_create() {
    let (app, pool) = setup().await;
    let center = seed_center(&pool, "MD1111").await;
    let staff = seed_user(&pool, "staff1", "staff", Some(&center)).await;
    let national = seed_user(&pool, "nat", "national_office", None).await;

    // Direct-create P-1 first
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/participants",
            &staff,
            json!({
                "participant_name": "John Doe",
                "participant_id": "P-1",
                "sex": "M",
                "caregiver_name": "Jane Doe",
                "house_latitude": 39.29,
                "house_longitude": -76.61,
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let csv = format!("{CSV_HEADER}\nMD1111,Other,P-1,F,Someone,0,0\n");
    let body = preview(&app, &national, &csv).await;
    assert_eq!(body["summary"]["valid"], 0);
    assert!(body["rows"][0]["error"]
        .as_str()
        .unwrap()
        .contains("already exists"));
}

// =============================================================================
// Confirm
// =============================================================================

#[tokio::test]
async fn test_three_row_example_batch() {
    let (app, pool) = setup().await;
    let center = seed_center(&pool, "MD1111").await;
    let staff = seed_user(&pool, "staff1", "staff", Some(&center)).await;
    let national = seed_user(&pool, "nat", "national_office", None).await;

    // Existing participant so row 2 is a duplicate
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/participants",
            &staff,
            json!({
                "participant_name": "Existing",
                "participant_id": "P-DUP",
                "sex": "F",
                "caregiver_name": "Jane Doe",
                "house_latitude": 39.29,
                "house_longitude": -76.61,
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    // Row 1 valid, row 2 duplicate id, row 3 unknown center code
    let csv = format!(
        "{CSV_HEADER}\n\
         MD1111,John Doe,P-NEW,M,Jane Doe,39.29,-76.61\n\
         MD1111,Duplicate,P-DUP,M,Jane Doe,39.29,-76.61\n\
         ZZ9999,Unknown Center,P-OTHER,F,Jane Doe,39.29,-76.61\n"
    );

    let body = preview(&app, &national, &csv).await;
    assert_eq!(body["summary"]["total"], 3);
    assert_eq!(body["summary"]["valid"], 1);
    assert_eq!(body["summary"]["invalid"], 2);

    let (status, result) = confirm(&app, &national, &body["token"]).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(result["created"], 1);
    assert_eq!(result["skipped"], 2);
    assert_eq!(result["center_codes"], json!(["MD1111"]));

    // created + skipped == total rows
    assert_eq!(
        result["created"].as_i64().unwrap() + result["skipped"].as_i64().unwrap(),
        3
    );

    // Exactly one CSV_IMPORT audit entry, with matching counts
    let entries: Vec<(String,)> = sqlx::query_as(
        "SELECT details FROM audit_log WHERE action = 'CSV_IMPORT'",
    )
    .fetch_all(&pool)
    .await
    .unwrap();
    assert_eq!(entries.len(), 1);
    assert!(entries[0].0.contains("Created=1, Skipped=2"));
    assert!(entries[0].0.contains("MD1111"));

    // Exactly one new participant
    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM participants")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(total, 2);
}

#[tokio::test]
async fn test_confirm_with_unknown_token_creates_nothing() {
    let (app, pool) = setup().await;
    let national = seed_user(&pool, "nat", "national_office", None).await;

    let (status, body) = confirm(&app, &national, &json!(Uuid::new_v4())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"]["message"]
        .as_str()
        .unwrap()
        .contains("No preview data found"));

    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM participants")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(total, 0);

    let logs: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM audit_log")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(logs, 0);
}

#[tokio::test]
async fn test_confirm_token_is_single_use() {
    let (app, pool) = setup().await;
    seed_center(&pool, "MD1111").await;
    let national = seed_user(&pool, "nat", "national_office", None).await;

    let csv = format!("{CSV_HEADER}\nMD1111,John Doe,P-1,M,Jane Doe,39.29,-76.61\n");
    let body = preview(&app, &national, &csv).await;

    let (status, result) = confirm(&app, &national, &body["token"]).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(result["created"], 1);

    // Replaying the same token is an error and creates nothing further
    let (status, _) = confirm(&app, &national, &body["token"]).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM participants")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(total, 1);
}

#[tokio::test]
async fn test_commit_revalidates_against_current_state() {
    let (app, pool) = setup().await;
    let center_guid = seed_center(&pool, "MD1111").await;
    let national = seed_user(&pool, "nat", "national_office", None).await;

    let csv = format!("{CSV_HEADER}\nMD1111,John Doe,P-1,M,Jane Doe,39.29,-76.61\n");
    let body = preview(&app, &national, &csv).await;
    assert_eq!(body["summary"]["valid"], 1);

    // Center disappears between preview and confirm
    sqlx::query("DELETE FROM centers WHERE guid = ?")
        .bind(&center_guid)
        .execute(&pool)
        .await
        .unwrap();

    let (status, result) = confirm(&app, &national, &body["token"]).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(result["created"], 0);
    assert_eq!(result["skipped"], 1);
    assert!(result["errors"][0]
        .as_str()
        .unwrap()
        .contains("no longer exists"));
}

#[tokio::test]
async fn test_duplicate_ids_within_one_file_create_once() {
    let (app, pool) = setup().await;
    seed_center(&pool, "MD1111").await;
    let national = seed_user(&pool, "nat", "national_office", None).await;

    // Both rows validate at preview (the id is unused in the database);
    // commit re-checks and skips the second.
    let csv = format!(
        "{CSV_HEADER}\n\
         MD1111,John Doe,P-1,M,Jane Doe,39.29,-76.61\n\
         MD1111,John Again,P-1,M,Jane Doe,39.29,-76.61\n"
    );
    let body = preview(&app, &national, &csv).await;
    assert_eq!(body["summary"]["valid"], 2);

    let (status, result) = confirm(&app, &national, &body["token"]).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(result["created"], 1);
    assert_eq!(result["skipped"], 1);
}

// =============================================================================
// Template
// =============================================================================

#[tokio::test]
async fn test_template_download() {
    let (app, pool) = setup().await;
    let national = seed_user(&pool, "nat", "national_office", None).await;

    let response = app
        .oneshot(get_request("/api/import/template", &national))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["content-type"], "text/csv");
    assert!(response.headers()["content-disposition"]
        .to_str()
        .unwrap()
        .contains("participants_template.csv"));

    let text = extract_text(response.into_body()).await;
    assert!(text.starts_with(CSV_HEADER));
    assert!(text.contains("MD1111"));
}

#[tokio::test]
async fn test_template_requires_national_role() {
    let (app, pool) = setup().await;
    let center = seed_center(&pool, "MD1111").await;
    let staff = seed_user(&pool, "staff1", "staff", Some(&center)).await;

    let response = app
        .oneshot(get_request("/api/import/template", &staff))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}
