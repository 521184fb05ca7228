use axum::Router;
use axum::body::Body;
use axum::extract::State;
use axum::http::Request;
use axum::middleware;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, patch, post};
use tower::ServiceBuilder;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::TraceLayer;

use crate::auth;
use crate::auth::Session;
use crate::core;
use crate::routes;

/// Back end server built from routes that are either public or require a bearer token
pub fn create_router(context: core::ArcContext) -> Router {
    let api_routes = Router::new()
        .route("/api/me", get(routes::api::me))
        .route("/api/units", get(routes::units::list_units).post(routes::units::create_unit))
        .route(
            "/api/units/{id}",
            get(routes::units::get_unit)
                .put(routes::units::update_unit)
                .delete(routes::units::delete_unit),
        )
        .route("/api/tenants", get(routes::tenants::list_tenants).post(routes::tenants::create_tenant))
        .route("/api/tenants/me", get(routes::tenants::get_own_tenant))
        .route("/api/tenants/{id}", get(routes::tenants::get_tenant).put(routes::tenants::update_tenant))
        .route("/api/contracts", get(routes::contracts::list_contracts).post(routes::contracts::create_contract))
        .route("/api/contracts/{id}", get(routes::contracts::get_contract))
        .route("/api/contracts/{id}/activate", post(routes::contracts::activate_contract))
        .route("/api/contracts/{id}/terminate", post(routes::contracts::terminate_contract))
        .route("/api/contracts/{id}/expire", post(routes::contracts::expire_contract))
        .route(
            "/api/utility-readings",
            get(routes::utility_readings::list_readings).post(routes::utility_readings::create_reading),
        )
        .route("/api/invoices", get(routes::invoices::list_invoices).post(routes::invoices::generate_invoice))
        .route("/api/invoices/{id}", get(routes::invoices::get_invoice))
        .route("/api/payments", get(routes::payments::list_payments).post(routes::payments::record_payment))
        .route(
            "/api/maintenance-tickets",
            get(routes::maintenance_tickets::list_tickets).post(routes::maintenance_tickets::create_ticket),
        )
        .route("/api/maintenance-tickets/{id}", get(routes::maintenance_tickets::get_ticket))
        .route(
            "/api/maintenance-tickets/{id}/status",
            patch(routes::maintenance_tickets::update_ticket_status),
        )
        .route("/api/messages", post(routes::messages::send_message))
        .route("/api/messages/conversations", get(routes::messages::list_conversations))
        .route("/api/messages/conversations/{user_id}", get(routes::messages::get_conversation))
        .route("/api/messages/{id}/read", patch(routes::messages::mark_message_read))
        .route("/api/notifications", get(routes::notifications::list_notifications))
        .route("/api/notifications/{id}/read", patch(routes::notifications::mark_notification_read))
        .route("/api/admin/dashboard-statistics", get(routes::admin::dashboard_statistics))
        .layer(middleware::from_fn_with_state(context.clone(), auth_middleware))
        .with_state(context.clone());

    let auth_routes = Router::new()
        .route("/auth/login", post(routes::auth::login)) // returns JWT access and refresh tokens
        .route("/auth/logout", get(routes::auth::logout)) // revokes all refresh tokens of the caller
        .route("/auth/refresh", post(routes::auth::refresh_access_token)) // refresh access token
        .route("/auth/revoke", post(routes::auth::revoke_token)) // revoke refresh token
        .with_state(context.clone());

    let public_routes = Router::new()
        .route("/health", get(routes::health::health_check)) // Health check endpoint
        .with_state(context);

    Router::new()
        .merge(auth_routes)
        .merge(api_routes)
        .merge(public_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CatchPanicLayer::new()),
        )
}

/// Verifies the bearer token and makes the caller available to handlers as a `Session`
async fn auth_middleware(State(context): State<core::ArcContext>, mut req: Request<Body>, next: Next) -> Response {
    let session = auth::decode_access_token_from_headers(&context.jwt, req.headers())
        .and_then(|claims| Session::try_from(&claims));
    match session {
        Ok(session) => {
            tracing::debug!(
                user_id = session.user_id,
                username = session.username,
                role = session.role.as_str(),
                "Authenticated user accessing API"
            );
            req.extensions_mut().insert(session);
            next.run(req).await
        }
        Err(e) => {
            tracing::warn!("Unauthorized access attempt: {}", e);
            e.into_response()
        }
    }
}
