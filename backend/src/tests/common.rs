use axum::http::StatusCode;
use axum::http::header;
use axum_test::{TestRequest, TestServer};
use chrono::NaiveDate;
use serde_json::{Value, json};

use crate::app;
use crate::auth;
use crate::cfg;
use crate::core;
use crate::db;
use crate::db::Role;

pub const TEST_PASSWORD: &str = "abcdefghijklmnopqrstuvwxyz";
pub const JWT_SECRET: &str = "test__secret__key__for__jwt__testing";

pub fn default_config() -> cfg::AppSettings {
    cfg::AppSettings {
        jwt: cfg::JwtSettings {
            access_token_expiry: 3600,
            refresh_token_expiry: 86400,
        },
        ..Default::default()
    }
}

/// A server over a fresh in-memory database with an admin and a staff account.
pub struct TestApp {
    pub server: TestServer,
    pub context: core::ArcContext,
    pub admin: db::User,
    pub staff: db::User,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_config(default_config()).await
    }

    pub async fn with_config(config: cfg::AppSettings) -> Self {
        let mut config = config;

        // One connection keeps every request on the same in-memory database
        config.database = cfg::DatabaseSettings {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
        };

        let db = app::create_db_context(&config.database).await.unwrap();
        app::run_migrations(&db).await.unwrap();

        let jwt = auth::JwtContext::new(&config.jwt, JWT_SECRET);
        let context = core::Context::new(db, jwt, config);

        let admin = create_user(&context, "admin", Role::Admin, None).await;
        let staff = create_user(&context, "staff", Role::Staff, None).await;

        let router = app::create_router(context.clone());
        let server = TestServer::new(router).unwrap();
        Self {
            server,
            context,
            admin,
            staff,
        }
    }

    pub fn token(&self, user: &db::User) -> String {
        auth::generate_access_token(&self.context.jwt, user.id, &user.username, user.role).unwrap()
    }

    pub fn admin_token(&self) -> String {
        self.token(&self.admin)
    }

    pub fn staff_token(&self) -> String {
        self.token(&self.staff)
    }

    pub fn get(&self, path: &str, token: &str) -> TestRequest {
        self.server.get(path).add_header(header::AUTHORIZATION, format!("Bearer {token}"))
    }

    pub fn post(&self, path: &str, token: &str) -> TestRequest {
        self.server.post(path).add_header(header::AUTHORIZATION, format!("Bearer {token}"))
    }

    pub fn put(&self, path: &str, token: &str) -> TestRequest {
        self.server.put(path).add_header(header::AUTHORIZATION, format!("Bearer {token}"))
    }

    pub fn patch(&self, path: &str, token: &str) -> TestRequest {
        self.server.patch(path).add_header(header::AUTHORIZATION, format!("Bearer {token}"))
    }

    pub fn delete(&self, path: &str, token: &str) -> TestRequest {
        self.server.delete(path).add_header(header::AUTHORIZATION, format!("Bearer {token}"))
    }

    /// Creates a unit through the API and returns its id.
    pub async fn create_unit(&self, unit_number: &str, rent_price: i64) -> i64 {
        let response = self
            .post("/api/units", &self.admin_token())
            .json(&json!({
                "unit_number": unit_number,
                "building": "A",
                "floor": 2,
                "square_meters": 32.5,
                "room_type": "one-bedroom",
                "rent_price": rent_price,
                "deposit_amount": rent_price * 2,
                "amenities": ["wifi", "air-conditioner"]
            }))
            .await;
        response.assert_status(StatusCode::CREATED);
        response.json::<Value>()["id"].as_i64().unwrap()
    }

    /// Seeds a tenant account and profile directly in the store.
    pub async fn create_tenant(&self, username: &str) -> (db::User, db::Tenant) {
        let user = create_user(&self.context, username, Role::Tenant, None).await;
        let tenant = db::create_tenant(
            &self.context.db,
            user.id,
            db::TenantFields {
                full_name: format!("{username} Nguyen"),
                identity_card: format!("ID-{username}"),
                phone: "0900000000".to_string(),
                status: db::TenantStatus::Active,
            },
        )
        .await
        .unwrap();
        (user, tenant)
    }

    /// Drafts and activates a contract through the API and returns its id.
    pub async fn create_active_contract(&self, unit_id: i64, tenant_id: i64, rent_amount: i64) -> i64 {
        let token = self.admin_token();
        let response = self
            .post("/api/contracts", &token)
            .json(&json!({
                "unit_id": unit_id,
                "tenant_id": tenant_id,
                "start_date": "2025-01-01",
                "end_date": "2025-12-31",
                "rent_amount": rent_amount,
                "deposit_amount": rent_amount
            }))
            .await;
        response.assert_status(StatusCode::CREATED);
        let contract_id = response.json::<Value>()["id"].as_i64().unwrap();

        self.post(&format!("/api/contracts/{contract_id}/activate"), &token)
            .await
            .assert_status(StatusCode::OK);
        contract_id
    }

    /// A unit, a tenant and an active contract on it.
    pub async fn leased_unit(&self, username: &str, rent_amount: i64) -> Lease {
        let unit_id = self.create_unit(&format!("{username}-unit"), rent_amount).await;
        let (user, tenant) = self.create_tenant(username).await;
        let contract_id = self.create_active_contract(unit_id, tenant.id, rent_amount).await;
        Lease {
            unit_id,
            tenant_id: tenant.id,
            contract_id,
            token: self.token(&user),
            user,
        }
    }

    pub async fn notifications(&self, user: &db::User) -> Vec<Value> {
        let response = self.get("/api/notifications", &self.token(user)).await;
        response.assert_status(StatusCode::OK);
        response.json::<Vec<Value>>()
    }
}

pub struct Lease {
    pub unit_id: i64,
    pub tenant_id: i64,
    pub contract_id: i64,
    pub user: db::User,
    pub token: String,
}

pub async fn create_user(context: &core::Context, username: &str, role: Role, password: Option<&str>) -> db::User {
    let password_hash = password.map(|p| auth::hash_password(p).unwrap());
    db::create_user(
        &context.db,
        db::NewUser {
            username: username.to_string(),
            password_hash,
            email: Some(format!("{username}@example.com")),
            role,
        },
    )
    .await
    .unwrap()
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}
