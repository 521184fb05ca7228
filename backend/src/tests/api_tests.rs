use axum::http::StatusCode;
use serde_json::{Value, json};

use crate::tests::common::{TEST_PASSWORD, TestApp};

fn count_for(groups: &Value, label: &str) -> i64 {
    groups
        .as_array()
        .unwrap()
        .iter()
        .find(|group| group["label"] == label)
        .map_or(0, |group| group["count"].as_i64().unwrap())
}

#[tokio::test]
async fn test_api_requires_bearer_token() {
    let app = TestApp::new().await;

    app.server.get("/api/units").await.assert_status(StatusCode::UNAUTHORIZED);
    app.get("/api/units", "not-a-token").await.assert_status(StatusCode::UNAUTHORIZED);
    app.get("/api/units", &app.staff_token()).await.assert_status(StatusCode::OK);
}

#[tokio::test]
async fn test_manager_routes_reject_tenants() {
    let app = TestApp::new().await;
    let lease = app.leased_unit("tenant", 1_000_000).await;

    app.get("/api/admin/dashboard-statistics", &lease.token)
        .await
        .assert_status(StatusCode::FORBIDDEN);
    app.get("/api/tenants", &lease.token).await.assert_status(StatusCode::FORBIDDEN);

    let response = app
        .post("/api/units", &lease.token)
        .json(&json!({
            "unit_number": "X1", "building": "A", "floor": 1, "square_meters": 20.0,
            "room_type": "studio", "rent_price": 1, "deposit_amount": 0
        }))
        .await;
    response.assert_status(StatusCode::FORBIDDEN);
    let error: Value = response.json();
    assert_eq!(error["result"], "error");
}

#[tokio::test]
async fn test_unit_crud_and_soft_delete() {
    let app = TestApp::new().await;
    let token = app.admin_token();
    let unit_id = app.create_unit("101", 2_500_000).await;
    app.create_unit("102", 3_000_000).await;

    let unit: Value = app.get(&format!("/api/units/{unit_id}"), &token).await.json();
    assert_eq!(unit["unit_number"], "101");
    assert_eq!(unit["status"], "available");
    // stored sorted and de-duplicated
    assert_eq!(unit["amenities"], json!(["air-conditioner", "wifi"]));

    let updated = app
        .put(&format!("/api/units/{unit_id}"), &token)
        .json(&json!({
            "unit_number": "101", "building": "B", "floor": 3, "square_meters": 40.0,
            "room_type": "two-bedroom", "rent_price": 4_000_000, "deposit_amount": 8_000_000,
            "amenities": ["balcony"]
        }))
        .await;
    updated.assert_status(StatusCode::OK);
    let updated: Value = updated.json();
    assert_eq!(updated["building"], "B");
    assert_eq!(updated["rent_price"], 4_000_000);

    let page: Value = app.get("/api/units?room_type=two-bedroom", &token).await.json();
    assert_eq!(page["pagination"]["total"], 1);
    let page: Value = app.get("/api/units?limit=1&page=2", &token).await.json();
    assert_eq!(page["pagination"]["total"], 2);
    assert_eq!(page["items"].as_array().unwrap().len(), 1);

    app.delete(&format!("/api/units/{unit_id}"), &token).await.assert_status(StatusCode::OK);
    let unit: Value = app.get(&format!("/api/units/{unit_id}"), &token).await.json();
    assert_eq!(unit["status"], "maintenance");

    app.get("/api/units/9999", &token).await.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_unit_validation_and_duplicate_number() {
    let app = TestApp::new().await;
    let token = app.admin_token();
    app.create_unit("201", 1_000_000).await;

    let blank = app
        .post("/api/units", &token)
        .json(&json!({
            "unit_number": " ", "building": "A", "floor": 1, "square_meters": 20.0,
            "room_type": "studio", "rent_price": 1_000_000, "deposit_amount": 0
        }))
        .await;
    blank.assert_status(StatusCode::BAD_REQUEST);

    let duplicate = app
        .post("/api/units", &token)
        .json(&json!({
            "unit_number": "201", "building": "A", "floor": 1, "square_meters": 20.0,
            "room_type": "studio", "rent_price": 1_000_000, "deposit_amount": 0
        }))
        .await;
    duplicate.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_leased_unit_cannot_be_removed() {
    let app = TestApp::new().await;
    let lease = app.leased_unit("occupant", 1_000_000).await;

    app.delete(&format!("/api/units/{}", lease.unit_id), &app.admin_token())
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_create_tenant_account_and_login() {
    let app = TestApp::new().await;

    let response = app
        .post("/api/tenants", &app.admin_token())
        .json(&json!({
            "username": "phuong",
            "password": TEST_PASSWORD,
            "email": "phuong@example.com",
            "full_name": "Tran Phuong",
            "identity_card": "079123456789",
            "phone": "0912345678"
        }))
        .await;
    response.assert_status(StatusCode::CREATED);
    let body: Value = response.json();
    assert_eq!(body["user"]["role"], "tenant");
    assert!(body["user"].get("password_hash").is_none());
    assert_eq!(body["tenant"]["full_name"], "Tran Phuong");

    let login = app
        .server
        .post("/auth/login")
        .json(&json!({ "username": "phuong", "password": TEST_PASSWORD }))
        .await;
    login.assert_status(StatusCode::OK);
    let token = login.json::<Value>()["tokens"]["access_token"].as_str().unwrap().to_string();

    let me = app.get("/api/tenants/me", &token).await;
    me.assert_status(StatusCode::OK);
    assert_eq!(me.json::<Value>()["identity_card"], "079123456789");

    app.get("/api/tenants/me", &app.admin_token())
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_failed_tenant_creation_leaves_no_account() {
    let app = TestApp::new().await;
    app.create_tenant("first").await;

    // same identity card as the seeded tenant
    let response = app
        .post("/api/tenants", &app.admin_token())
        .json(&json!({
            "username": "second",
            "password": TEST_PASSWORD,
            "full_name": "Second Person",
            "identity_card": "ID-first",
            "phone": "0900000001"
        }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);

    let login = app
        .server
        .post("/auth/login")
        .json(&json!({ "username": "second", "password": TEST_PASSWORD }))
        .await;
    login.assert_status(StatusCode::UNAUTHORIZED);

    let weak = app
        .post("/api/tenants", &app.admin_token())
        .json(&json!({
            "username": "third", "password": "short",
            "full_name": "Third", "identity_card": "ID-3", "phone": "0900000003"
        }))
        .await;
    weak.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_contract_lifecycle_moves_unit_and_tenant() {
    let app = TestApp::new().await;
    let token = app.admin_token();
    let lease = app.leased_unit("khoa", 1_500_000).await;

    let unit: Value = app.get(&format!("/api/units/{}", lease.unit_id), &token).await.json();
    assert_eq!(unit["status"], "occupied");
    let tenant: Value = app.get(&format!("/api/tenants/{}", lease.tenant_id), &token).await.json();
    assert_eq!(tenant["current_unit_id"], lease.unit_id);
    assert_eq!(tenant["move_in_date"], "2025-01-01");

    let notifications = app.notifications(&lease.user).await;
    assert!(notifications.iter().any(|n| n["notification_type"] == "contract-activated"));

    // a second lease on an occupied unit cannot be activated
    let (_, other) = app.create_tenant("other").await;
    let draft = app
        .post("/api/contracts", &token)
        .json(&json!({
            "unit_id": lease.unit_id, "tenant_id": other.id,
            "start_date": "2025-02-01", "end_date": "2025-12-31"
        }))
        .await;
    draft.assert_status(StatusCode::CREATED);
    let draft: Value = draft.json();
    assert_eq!(draft["status"], "draft");
    assert_eq!(draft["rent_amount"], 1_500_000);
    app.post(&format!("/api/contracts/{}/activate", draft["id"]), &token)
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    let own: Value = app.get("/api/contracts", &lease.token).await.json();
    assert_eq!(own["pagination"]["total"], 1);

    let terminated = app
        .post(&format!("/api/contracts/{}/terminate", lease.contract_id), &token)
        .await;
    terminated.assert_status(StatusCode::OK);
    assert_eq!(terminated.json::<Value>()["status"], "terminated");

    let unit: Value = app.get(&format!("/api/units/{}", lease.unit_id), &token).await.json();
    assert_eq!(unit["status"], "available");
    let tenant: Value = app.get(&format!("/api/tenants/{}", lease.tenant_id), &token).await.json();
    assert_eq!(tenant["status"], "moved-out");
    assert!(tenant["current_unit_id"].is_null());

    app.post(&format!("/api/contracts/{}/terminate", lease.contract_id), &token)
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

async fn draft_contract(app: &TestApp, unit_id: i64, tenant_id: i64, start_date: &str, end_date: &str) -> i64 {
    let response = app
        .post("/api/contracts", &app.admin_token())
        .json(&json!({
            "unit_id": unit_id, "tenant_id": tenant_id,
            "start_date": start_date, "end_date": end_date
        }))
        .await;
    response.assert_status(StatusCode::CREATED);
    response.json::<Value>()["id"].as_i64().unwrap()
}

#[tokio::test]
async fn test_lapsed_contract_expires_and_frees_the_unit() {
    let app = TestApp::new().await;
    let token = app.admin_token();
    let unit_id = app.create_unit("401", 1_000_000).await;
    let (user, tenant) = app.create_tenant("lapsed").await;
    let contract_id = draft_contract(&app, unit_id, tenant.id, "2020-01-01", "2020-12-31").await;
    app.post(&format!("/api/contracts/{contract_id}/activate"), &token)
        .await
        .assert_status(StatusCode::OK);

    app.post(&format!("/api/contracts/{contract_id}/expire"), &app.token(&user))
        .await
        .assert_status(StatusCode::FORBIDDEN);

    let expired = app.post(&format!("/api/contracts/{contract_id}/expire"), &token).await;
    expired.assert_status(StatusCode::OK);
    assert_eq!(expired.json::<Value>()["status"], "expired");

    let unit: Value = app.get(&format!("/api/units/{unit_id}"), &token).await.json();
    assert_eq!(unit["status"], "available");
    let tenant: Value = app.get(&format!("/api/tenants/{}", tenant.id), &token).await.json();
    assert_eq!(tenant["status"], "moved-out");
    assert!(tenant["current_unit_id"].is_null());

    app.post(&format!("/api/contracts/{contract_id}/expire"), &token)
        .await
        .assert_status(StatusCode::BAD_REQUEST);
    app.post("/api/invoices", &token)
        .json(&json!({ "contract_id": contract_id, "month": 6, "year": 2020, "readings": [] }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_running_contract_cannot_expire() {
    let app = TestApp::new().await;
    let token = app.admin_token();
    let unit_id = app.create_unit("402", 1_000_000).await;
    let (_, tenant) = app.create_tenant("running").await;
    let contract_id = draft_contract(&app, unit_id, tenant.id, "2025-01-01", "2099-12-31").await;

    // drafts are not in force yet
    app.post(&format!("/api/contracts/{contract_id}/expire"), &token)
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    app.post(&format!("/api/contracts/{contract_id}/activate"), &token)
        .await
        .assert_status(StatusCode::OK);
    let response = app.post(&format!("/api/contracts/{contract_id}/expire"), &token).await;
    response.assert_status(StatusCode::BAD_REQUEST);
    assert!(response.json::<Value>()["message"].as_str().unwrap().contains("2099-12-31"));

    let contract: Value = app.get(&format!("/api/contracts/{contract_id}"), &token).await.json();
    assert_eq!(contract["status"], "active");
}

#[tokio::test]
async fn test_tenant_holds_one_active_contract_at_a_time() {
    let app = TestApp::new().await;
    let token = app.admin_token();
    let lease = app.leased_unit("mover", 1_000_000).await;
    let second_unit = app.create_unit("mover-second", 1_200_000).await;

    let contract_id = draft_contract(&app, second_unit, lease.tenant_id, "2025-02-01", "2025-12-31").await;
    let response = app.post(&format!("/api/contracts/{contract_id}/activate"), &token).await;
    response.assert_status(StatusCode::BAD_REQUEST);
    assert!(response.json::<Value>()["message"].as_str().unwrap().contains("already has active contract"));

    let unit: Value = app.get(&format!("/api/units/{second_unit}"), &token).await.json();
    assert_eq!(unit["status"], "available");

    // dropping the unused draft leaves the tenant where they live
    app.post(&format!("/api/contracts/{contract_id}/terminate"), &token)
        .await
        .assert_status(StatusCode::OK);
    let tenant: Value = app.get(&format!("/api/tenants/{}", lease.tenant_id), &token).await.json();
    assert_eq!(tenant["status"], "active");
    assert_eq!(tenant["current_unit_id"], lease.unit_id);
}

#[tokio::test]
async fn test_contract_dates_are_validated() {
    let app = TestApp::new().await;
    let unit_id = app.create_unit("301", 1_000_000).await;
    let (_, tenant) = app.create_tenant("dates").await;

    let response = app
        .post("/api/contracts", &app.admin_token())
        .json(&json!({
            "unit_id": unit_id, "tenant_id": tenant.id,
            "start_date": "2025-06-01", "end_date": "2025-01-01"
        }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_messages_between_tenant_and_management() {
    let app = TestApp::new().await;
    let lease = app.leased_unit("ly", 1_000_000).await;
    let neighbour = app.leased_unit("my", 1_000_000).await;

    let sent = app
        .post("/api/messages", &lease.token)
        .json(&json!({ "recipient_id": app.admin.id, "content": "The hallway light is out" }))
        .await;
    sent.assert_status(StatusCode::CREATED);
    let message_id = sent.json::<Value>()["id"].as_i64().unwrap();

    app.post("/api/messages", &lease.token)
        .json(&json!({ "recipient_id": neighbour.user.id, "content": "hello" }))
        .await
        .assert_status(StatusCode::FORBIDDEN);
    app.post("/api/messages", &lease.token)
        .json(&json!({ "recipient_id": app.admin.id, "content": "   " }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    let admin_token = app.admin_token();
    let conversations: Value = app.get("/api/messages/conversations", &admin_token).await.json();
    assert_eq!(conversations[0]["counterpart_id"], lease.user.id);
    assert_eq!(conversations[0]["unread_count"], 1);

    let thread: Value = app
        .get(&format!("/api/messages/conversations/{}", lease.user.id), &admin_token)
        .await
        .json();
    assert_eq!(thread[0]["content"], "The hallway light is out");

    // only the recipient can mark it read
    app.patch(&format!("/api/messages/{message_id}/read"), &lease.token)
        .await
        .assert_status(StatusCode::NOT_FOUND);
    app.patch(&format!("/api/messages/{message_id}/read"), &admin_token)
        .await
        .assert_status(StatusCode::OK);

    let conversations: Value = app.get("/api/messages/conversations", &admin_token).await.json();
    assert_eq!(conversations[0]["unread_count"], 0);

    let notifications = app.notifications(&app.admin).await;
    assert!(notifications.iter().any(|n| n["notification_type"] == "message-received"));
}

#[tokio::test]
async fn test_notifications_can_be_marked_read() {
    let app = TestApp::new().await;
    let lease = app.leased_unit("nga", 1_000_000).await;

    let unread: Vec<Value> = app.get("/api/notifications?unread_only=true", &lease.token).await.json();
    assert!(!unread.is_empty());
    let id = unread[0]["id"].as_i64().unwrap();

    app.patch(&format!("/api/notifications/{id}/read"), &app.staff_token())
        .await
        .assert_status(StatusCode::NOT_FOUND);
    app.patch(&format!("/api/notifications/{id}/read"), &lease.token)
        .await
        .assert_status(StatusCode::OK);

    let after: Vec<Value> = app.get("/api/notifications?unread_only=true", &lease.token).await.json();
    assert_eq!(after.len(), unread.len() - 1);
}

#[tokio::test]
async fn test_dashboard_statistics() {
    let app = TestApp::new().await;
    let token = app.admin_token();
    let lease = app.leased_unit("oanh", 1_000_000).await;
    app.create_unit("spare", 900_000).await;

    let invoice = app
        .post("/api/invoices", &token)
        .json(&json!({ "contract_id": lease.contract_id, "month": 7, "year": 2025, "readings": [] }))
        .await;
    invoice.assert_status(StatusCode::CREATED);
    let invoice_id = invoice.json::<Value>()["id"].as_i64().unwrap();
    app.post("/api/payments", &token)
        .json(&json!({ "invoice_id": invoice_id, "amount": 250_000, "method": "cash" }))
        .await
        .assert_status(StatusCode::CREATED);

    let response = app.get("/api/admin/dashboard-statistics", &app.staff_token()).await;
    response.assert_status(StatusCode::OK);
    let stats: Value = response.json();
    assert_eq!(count_for(&stats["units_by_status"], "occupied"), 1);
    assert_eq!(count_for(&stats["units_by_status"], "available"), 1);
    assert_eq!(stats["active_contracts"], 1);
    assert_eq!(stats["active_tenants"], 1);
    assert_eq!(count_for(&stats["invoices_by_status"], "issued"), 1);
    assert_eq!(stats["outstanding_amount"], 750_000);
    assert_eq!(stats["collected_amount"], 250_000);
    assert!(stats["average_resolution_hours"].is_null());
}
