//! Integration tests for the ID card backend.

use std::io::Cursor;
use std::sync::Arc;

use base64::Engine;
use image::{GenericImageView, ImageFormat, Rgb, RgbImage};
use reqwest::Client;
use serde_json::{json, Value};
use tempfile::TempDir;

use crate::card::{qr, CARD_HEIGHT, CARD_WIDTH, PHOTO_HEIGHT, PHOTO_WIDTH, PHOTO_X, PHOTO_Y, QR_X, QR_Y};
use crate::config::Config;
use crate::db::{init_database, Repository};
use crate::roster::RosterStore;
use crate::{build_compositor, create_router, AppState};

const ADMIN_PASSWORD: &str = "test-admin-password";

/// Test fixture for integration tests.
struct TestFixture {
    client: Client,
    base_url: String,
    _temp_dir: TempDir,
}

impl TestFixture {
    async fn new() -> Self {
        Self::with_password(Some(ADMIN_PASSWORD.to_string())).await
    }

    async fn with_password(password: Option<String>) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("test.sqlite");

        let pool = init_database(&db_path).await.expect("Failed to init DB");

        let config = Config {
            admin_password: password,
            db_path,
            bind_addr: "127.0.0.1:0".parse().unwrap(),
            log_level: "warn".to_string(),
            id_prefix: "AT".to_string(),
            card_title: "ALPHA TECH EMPLOYEE CARD".to_string(),
            logo_path: None,
            font_path: None,
        };

        let state = AppState {
            roster: Arc::new(RosterStore::open(Repository::new(pool), "AT").await),
            compositor: Arc::new(build_compositor(&config)),
            config: Arc::new(config),
        };

        let app = create_router(state);

        // Bind to random port
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind");
        let addr = listener.local_addr().expect("Failed to get addr");
        let base_url = format!("http://{}", addr);

        // Spawn server
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        // Wait for server to start
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;

        TestFixture {
            client: Client::new(),
            base_url,
            _temp_dir: temp_dir,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn admin_get(&self, path: &str) -> reqwest::Response {
        self.client
            .get(self.url(path))
            .header("x-admin-key", ADMIN_PASSWORD)
            .send()
            .await
            .unwrap()
    }

    async fn create(&self, body: Value) -> reqwest::Response {
        self.client
            .post(self.url("/api/employees"))
            .json(&body)
            .send()
            .await
            .unwrap()
    }

    async fn mark(&self, employee_id: &str) -> reqwest::Response {
        self.client
            .post(self.url("/api/admin/attendance"))
            .header("x-admin-key", ADMIN_PASSWORD)
            .json(&json!({ "employeeId": employee_id }))
            .send()
            .await
            .unwrap()
    }
}

fn ali_khan() -> Value {
    json!({
        "name": "Ali Khan",
        "nationalIdNumber": "35202-1234567-1",
        "age": 30,
        "role": "Software Engineer",
        "city": "Karachi",
        "shift": "Night"
    })
}

fn red_photo_base64() -> String {
    let photo = RgbImage::from_pixel(30, 40, Rgb([200, 0, 0]));
    let mut bytes = Vec::new();
    photo
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .unwrap();
    base64::engine::general_purpose::STANDARD.encode(bytes)
}

#[tokio::test]
async fn test_health_check() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .get(fixture.url("/health"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.text().await.unwrap(), "OK");
}

#[tokio::test]
async fn test_admin_auth_missing_password() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .get(fixture.url("/api/admin/employees"))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 401);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn test_admin_auth_wrong_password() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .get(fixture.url("/api/admin/attendance"))
        .header("x-admin-key", "wrong-password")
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 401);
}

#[tokio::test]
async fn test_admin_auth_accepts_header_and_bearer() {
    let fixture = TestFixture::new().await;

    let resp = fixture.admin_get("/api/admin/employees").await;
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["data"], json!([]));

    let resp = fixture
        .client
        .get(fixture.url("/api/admin/attendance"))
        .bearer_auth(ADMIN_PASSWORD)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
}

#[tokio::test]
async fn test_admin_routes_open_without_configured_password() {
    let fixture = TestFixture::with_password(None).await;

    let resp = fixture
        .client
        .get(fixture.url("/api/admin/employees"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
}

#[tokio::test]
async fn test_card_routes_need_no_password() {
    let fixture = TestFixture::new().await;

    let resp = fixture.create(ali_khan()).await;
    assert_eq!(resp.status(), 200);
}

#[tokio::test]
async fn test_create_employee_assigns_sequential_ids() {
    let fixture = TestFixture::new().await;

    let resp = fixture.create(ali_khan()).await;
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["id"], "AT-001");
    assert_eq!(body["data"]["name"], "Ali Khan");
    assert_eq!(body["data"]["role"], "Software Engineer");
    assert_eq!(body["data"]["shift"], "Night");
    assert!(body.get("warnings").is_none());

    let mut second = ali_khan();
    second["name"] = json!("Sara Ahmed");
    let body: Value = fixture.create(second).await.json().await.unwrap();
    assert_eq!(body["data"]["id"], "AT-002");

    let list: Value = fixture
        .admin_get("/api/admin/employees")
        .await
        .json()
        .await
        .unwrap();
    let names: Vec<&str> = list["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Ali Khan", "Sara Ahmed"]);

    let one: Value = fixture
        .admin_get("/api/admin/employees/AT-002")
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(one["data"]["name"], "Sara Ahmed");
}

#[tokio::test]
async fn test_card_png_without_photo() {
    let fixture = TestFixture::new().await;
    fixture.create(ali_khan()).await;

    let resp = fixture
        .client
        .get(fixture.url("/api/employees/AT-001/card"))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 200);
    assert_eq!(resp.headers()["content-type"], "image/png");
    assert_eq!(
        resp.headers()["content-disposition"],
        "attachment; filename=\"AT-001_Ali_Khan_employee_card.png\""
    );
    assert!(resp.headers().get("x-card-warning").is_none());

    let bytes = resp.bytes().await.unwrap();
    let card = image::load_from_memory(&bytes).unwrap();
    assert_eq!(card.dimensions(), (CARD_WIDTH, CARD_HEIGHT));

    let rgb = card.to_rgb8();
    assert_eq!(*rgb.get_pixel(PHOTO_X + 20, PHOTO_Y + 200), Rgb([211, 211, 211]));

    let qr_block = card
        .crop_imm(QR_X, QR_Y, qr::QR_SIZE, qr::QR_SIZE)
        .to_luma8();
    assert_eq!(
        qr::tests::decode(&qr_block),
        "Name: Ali Khan\nCNIC: 35202-1234567-1\nAge: 30\nRole: Software Engineer\nUnique ID: AT-001\nCity: Karachi\nShift: Night"
    );
}

#[tokio::test]
async fn test_card_uses_uploaded_photo() {
    let fixture = TestFixture::new().await;

    let mut body = ali_khan();
    body["photo"] = json!(red_photo_base64());
    let created: Value = fixture.create(body).await.json().await.unwrap();
    assert!(created["data"]["photoRef"].is_string());

    let bytes = fixture
        .client
        .get(fixture.url("/api/employees/AT-001/card"))
        .send()
        .await
        .unwrap()
        .bytes()
        .await
        .unwrap();
    let card = image::load_from_memory(&bytes).unwrap().to_rgb8();

    let center = card.get_pixel(PHOTO_X + PHOTO_WIDTH / 2, PHOTO_Y + PHOTO_HEIGHT / 2);
    assert!(center[0] > 190 && center[1] < 10 && center[2] < 10);
}

#[tokio::test]
async fn test_undecodable_photo_degrades_with_warning() {
    let fixture = TestFixture::new().await;

    let mut body = ali_khan();
    body["photo"] = json!(base64::engine::general_purpose::STANDARD.encode(b"not an image"));
    let resp = fixture.create(body).await;

    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["id"], "AT-001");
    let warnings = body["warnings"].as_array().unwrap();
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].as_str().unwrap().starts_with("photo:"));

    let resp = fixture
        .client
        .get(fixture.url("/api/employees/AT-001/card"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert!(resp.headers()["x-card-warning"]
        .to_str()
        .unwrap()
        .starts_with("photo:"));

    let card = image::load_from_memory(&resp.bytes().await.unwrap())
        .unwrap()
        .to_rgb8();
    assert_eq!(*card.get_pixel(PHOTO_X + 20, PHOTO_Y + 200), Rgb([211, 211, 211]));
}

#[tokio::test]
async fn test_invalid_base64_is_rejected() {
    let fixture = TestFixture::new().await;

    let mut body = ali_khan();
    body["logo"] = json!("%%% not base64 %%%");
    let resp = fixture.create(body).await;

    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "BAD_REQUEST");

    let list: Value = fixture
        .admin_get("/api/admin/employees")
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(list["data"], json!([]));
}

#[tokio::test]
async fn test_validation_errors() {
    let fixture = TestFixture::new().await;

    let mut blank_name = ali_khan();
    blank_name["name"] = json!("   ");
    let resp = fixture.create(blank_name).await;
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

    let mut too_young = ali_khan();
    too_young["age"] = json!(17);
    assert_eq!(fixture.create(too_young).await.status(), 400);

    let mut bad_role = ali_khan();
    bad_role["role"] = json!("Astronaut");
    assert_eq!(fixture.create(bad_role).await.status(), 400);

    // Nothing was enrolled, so numbering starts fresh
    let body: Value = fixture.create(ali_khan()).await.json().await.unwrap();
    assert_eq!(body["data"]["id"], "AT-001");
}

#[tokio::test]
async fn test_oversized_payload_is_rejected_without_enrolling() {
    let fixture = TestFixture::new().await;

    let mut huge = ali_khan();
    huge["name"] = json!("N".repeat(3500));
    let resp = fixture.create(huge).await;

    assert_eq!(resp.status(), 422);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "ENCODING_CAPACITY_EXCEEDED");

    let body: Value = fixture.create(ali_khan()).await.json().await.unwrap();
    assert_eq!(body["data"]["id"], "AT-001");
}

#[tokio::test]
async fn test_attendance_flow() {
    let fixture = TestFixture::new().await;
    fixture.create(ali_khan()).await;

    let resp = fixture.mark("AT-001").await;
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["employeeId"], "AT-001");
    assert_eq!(body["data"]["name"], "Ali Khan");
    assert!(body["data"]["timestamp"].is_string());

    // Repeated scans are kept
    assert_eq!(fixture.mark("AT-001").await.status(), 200);

    let log: Value = fixture
        .admin_get("/api/admin/attendance")
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(log["data"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_attendance_for_unknown_employee() {
    let fixture = TestFixture::new().await;
    fixture.create(ali_khan()).await;

    let resp = fixture.mark("AT-999").await;
    assert_eq!(resp.status(), 404);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "EMPLOYEE_NOT_FOUND");

    let log: Value = fixture
        .admin_get("/api/admin/attendance")
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(log["data"], json!([]));
}

#[tokio::test]
async fn test_not_found_errors() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .get(fixture.url("/api/employees/AT-404/card"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "EMPLOYEE_NOT_FOUND");

    let resp = fixture.admin_get("/api/admin/employees/AT-404").await;
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn test_attendance_csv_export() {
    let fixture = TestFixture::new().await;

    let resp = fixture.admin_get("/api/admin/attendance/export").await;
    assert_eq!(resp.status(), 200);
    assert!(resp.headers()["content-type"]
        .to_str()
        .unwrap()
        .starts_with("text/csv"));
    assert_eq!(
        resp.headers()["content-disposition"],
        "attachment; filename=\"attendance_records.csv\""
    );
    assert_eq!(
        resp.text().await.unwrap(),
        "employeeId,name,date,time,timestamp\n"
    );

    fixture.create(ali_khan()).await;
    fixture.mark("AT-001").await;

    let csv = fixture
        .admin_get("/api/admin/attendance/export")
        .await
        .text()
        .await
        .unwrap();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[1].starts_with("AT-001,Ali Khan,"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_enrollments_with_photos() {
    let fixture = Arc::new(TestFixture::new().await);
    let photo = red_photo_base64();

    let handles: Vec<_> = (0..8)
        .map(|n| {
            let fixture = fixture.clone();
            let mut body = ali_khan();
            body["name"] = json!(format!("Employee {}", n));
            body["photo"] = json!(photo.clone());
            tokio::spawn(async move {
                let resp = fixture.create(body).await;
                assert_eq!(resp.status(), 200);
                let body: Value = resp.json().await.unwrap();
                body["data"]["id"].as_str().unwrap().to_string()
            })
        })
        .collect();

    let mut ids = Vec::new();
    for handle in handles {
        ids.push(handle.await.unwrap());
    }
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 8);

    for id in &ids {
        let resp = fixture
            .client
            .get(fixture.url(&format!("/api/employees/{}/card", id)))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
        assert!(resp.headers().get("x-card-warning").is_none());
    }
}
