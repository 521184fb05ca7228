use axum::http::StatusCode;
use serde_json::{Value, json};

use crate::db;
use crate::db::{InvoiceStatus, NewInvoice};
use crate::tests::common::{TestApp, date};

/// Stores an issued invoice with a due date in the past.
async fn seed_past_due_invoice(app: &TestApp, contract_id: i64, total_amount: i64) -> i64 {
    let invoice = db::create_invoice(
        &app.context.db,
        NewInvoice {
            contract_id,
            month: 1,
            year: 2020,
            rent_amount: total_amount,
            electricity_usage: 0,
            electricity_cost: 0,
            water_usage: 0,
            water_cost: 0,
            internet_usage: 0,
            internet_cost: 0,
            total_amount,
            status: InvoiceStatus::Issued,
            issue_date: date(2020, 1, 1),
            due_date: date(2020, 1, 11),
        },
    )
    .await
    .unwrap();
    invoice.id
}

#[tokio::test]
async fn test_generate_invoice_with_rent_and_utilities() {
    let app = TestApp::new().await;
    let lease = app.leased_unit("linh", 5_000_000).await;

    let response = app
        .post("/api/invoices", &app.admin_token())
        .json(&json!({
            "contract_id": lease.contract_id,
            "month": 3,
            "year": 2025,
            "readings": [
                { "utility_type": "electricity", "previous_reading": 1000, "current_reading": 1200 },
                { "utility_type": "water", "previous_reading": 300, "current_reading": 320 }
            ]
        }))
        .await;

    response.assert_status(StatusCode::CREATED);
    let invoice: Value = response.json();
    assert_eq!(invoice["rent_amount"], 5_000_000);
    assert_eq!(invoice["electricity_cost"], 700_000);
    assert_eq!(invoice["water_cost"], 500_000);
    assert_eq!(invoice["internet_cost"], 0);
    assert_eq!(invoice["total_amount"], 6_200_000);
    assert_eq!(invoice["status"], "issued");
    assert_eq!(invoice["amount_paid"], 0);
    assert_eq!(invoice["balance"], 6_200_000);

    let notifications = app.notifications(&lease.user).await;
    assert!(notifications.iter().any(|n| n["notification_type"] == "invoice-issued"));
}

#[tokio::test]
async fn test_second_invoice_for_same_period_is_rejected() {
    let app = TestApp::new().await;
    let lease = app.leased_unit("minh", 3_000_000).await;
    let body = json!({ "contract_id": lease.contract_id, "month": 4, "year": 2025, "readings": [] });

    app.post("/api/invoices", &app.admin_token())
        .json(&body)
        .await
        .assert_status(StatusCode::CREATED);

    let response = app.post("/api/invoices", &app.staff_token()).json(&body).await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let error: Value = response.json();
    assert_eq!(error["result"], "error");
    assert!(error["message"].as_str().unwrap().contains("already exists"));

    let list = app
        .get(&format!("/api/invoices?contract_id={}", lease.contract_id), &app.admin_token())
        .await;
    assert_eq!(list.json::<Value>()["pagination"]["total"], 1);
}

#[tokio::test]
async fn test_invoice_uses_stored_readings_when_none_given() {
    let app = TestApp::new().await;
    let lease = app.leased_unit("hoa", 2_000_000).await;
    let token = app.staff_token();

    let february = app
        .post("/api/utility-readings", &token)
        .json(&json!({
            "unit_id": lease.unit_id, "utility_type": "electricity",
            "month": 2, "year": 2025, "previous_reading": 100, "current_reading": 150
        }))
        .await;
    february.assert_status(StatusCode::CREATED);

    // previous reading defaults to February's current reading
    let march = app
        .post("/api/utility-readings", &token)
        .json(&json!({
            "unit_id": lease.unit_id, "utility_type": "electricity",
            "month": 3, "year": 2025, "current_reading": 210
        }))
        .await;
    march.assert_status(StatusCode::CREATED);
    assert_eq!(march.json::<Value>()["previous_reading"], 150);

    let response = app
        .post("/api/invoices", &token)
        .json(&json!({ "contract_id": lease.contract_id, "month": 3, "year": 2025 }))
        .await;
    response.assert_status(StatusCode::CREATED);
    let invoice: Value = response.json();
    assert_eq!(invoice["electricity_usage"], 60);
    assert_eq!(invoice["electricity_cost"], 210_000);
    assert_eq!(invoice["total_amount"], 2_210_000);
}

#[tokio::test]
async fn test_invoice_rejects_bad_input() {
    let app = TestApp::new().await;
    let lease = app.leased_unit("tuan", 1_000_000).await;
    let token = app.admin_token();

    let bad_month = app
        .post("/api/invoices", &token)
        .json(&json!({ "contract_id": lease.contract_id, "month": 13, "year": 2025, "readings": [] }))
        .await;
    bad_month.assert_status(StatusCode::BAD_REQUEST);

    let lower_reading = app
        .post("/api/invoices", &token)
        .json(&json!({
            "contract_id": lease.contract_id, "month": 5, "year": 2025,
            "readings": [{ "utility_type": "water", "previous_reading": 50, "current_reading": 40 }]
        }))
        .await;
    lower_reading.assert_status(StatusCode::BAD_REQUEST);
    assert!(lower_reading.json::<Value>()["message"].as_str().unwrap().contains("water"));

    let missing_previous = app
        .post("/api/invoices", &token)
        .json(&json!({
            "contract_id": lease.contract_id, "month": 5, "year": 2025,
            "readings": [{ "utility_type": "electricity", "current_reading": 40 }]
        }))
        .await;
    missing_previous.assert_status(StatusCode::BAD_REQUEST);

    // the lease runs through 2025 only
    let after_lease = app
        .post("/api/invoices", &token)
        .json(&json!({ "contract_id": lease.contract_id, "month": 6, "year": 2031, "readings": [] }))
        .await;
    after_lease.assert_status(StatusCode::BAD_REQUEST);
    assert!(after_lease.json::<Value>()["message"].as_str().unwrap().contains("outside contract"));

    let unknown_contract = app
        .post("/api/invoices", &token)
        .json(&json!({ "contract_id": 9_999, "month": 5, "year": 2025 }))
        .await;
    unknown_contract.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_invoice_requires_active_contract() {
    let app = TestApp::new().await;
    let unit_id = app.create_unit("draft-unit", 1_000_000).await;
    let (_, tenant) = app.create_tenant("draft").await;

    let draft = app
        .post("/api/contracts", &app.admin_token())
        .json(&json!({
            "unit_id": unit_id, "tenant_id": tenant.id,
            "start_date": "2025-01-01", "end_date": "2025-06-30"
        }))
        .await;
    draft.assert_status(StatusCode::CREATED);
    let contract_id = draft.json::<Value>()["id"].as_i64().unwrap();

    let response = app
        .post("/api/invoices", &app.admin_token())
        .json(&json!({ "contract_id": contract_id, "month": 1, "year": 2025, "readings": [] }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_tenant_cannot_generate_invoices() {
    let app = TestApp::new().await;
    let lease = app.leased_unit("an", 1_000_000).await;

    let response = app
        .post("/api/invoices", &lease.token)
        .json(&json!({ "contract_id": lease.contract_id, "month": 1, "year": 2025, "readings": [] }))
        .await;
    response.assert_status(StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_issued_invoice_past_due_reads_as_overdue() {
    let app = TestApp::new().await;
    let lease = app.leased_unit("bao", 800_000).await;
    let invoice_id = seed_past_due_invoice(&app, lease.contract_id, 800_000).await;
    let token = app.admin_token();

    let detail = app.get(&format!("/api/invoices/{invoice_id}"), &token).await;
    detail.assert_status(StatusCode::OK);
    let body: Value = detail.json();
    assert_eq!(body["status"], "overdue");
    assert_eq!(body["stored_status"], "issued");

    let overdue = app.get("/api/invoices?status=overdue", &token).await;
    let page: Value = overdue.json();
    assert_eq!(page["pagination"]["total"], 1);
    assert_eq!(page["items"][0]["id"], invoice_id);

    let issued = app.get("/api/invoices?status=issued", &token).await;
    assert_eq!(issued.json::<Value>()["pagination"]["total"], 0);

    // once paid it is never overdue again
    app.post("/api/payments", &token)
        .json(&json!({ "invoice_id": invoice_id, "amount": 800_000, "method": "cash" }))
        .await
        .assert_status(StatusCode::CREATED);

    let paid = app.get(&format!("/api/invoices/{invoice_id}"), &token).await;
    assert_eq!(paid.json::<Value>()["status"], "paid");
    let overdue = app.get("/api/invoices?status=overdue", &token).await;
    assert_eq!(overdue.json::<Value>()["pagination"]["total"], 0);
}

#[tokio::test]
async fn test_tenant_sees_only_own_invoices() {
    let app = TestApp::new().await;
    let mine = app.leased_unit("chi", 1_000_000).await;
    let theirs = app.leased_unit("dung", 2_000_000).await;
    let own_invoice = seed_past_due_invoice(&app, mine.contract_id, 1_000_000).await;
    let other_invoice = seed_past_due_invoice(&app, theirs.contract_id, 2_000_000).await;

    let list = app.get("/api/invoices", &mine.token).await;
    list.assert_status(StatusCode::OK);
    let page: Value = list.json();
    assert_eq!(page["pagination"]["total"], 1);
    assert_eq!(page["items"][0]["id"], own_invoice);

    app.get(&format!("/api/invoices/{own_invoice}"), &mine.token)
        .await
        .assert_status(StatusCode::OK);
    app.get(&format!("/api/invoices/{other_invoice}"), &mine.token)
        .await
        .assert_status(StatusCode::FORBIDDEN);
}
