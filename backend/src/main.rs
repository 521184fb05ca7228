#![deny(clippy::all)]
#![warn(clippy::nursery)]
#![warn(clippy::pedantic)]
#![warn(clippy::todo)]
#![allow(missing_docs)]
#![allow(clippy::missing_errors_doc)]

#[tokio::main]
async fn main() {
    app::run().await;
}


pub mod cfg {
    mod app_settings;
    mod billing_settings;
    mod database_settings;
    mod jwt_settings;
    mod server_settings;

    pub use app_settings::*;
    pub use billing_settings::*;
    pub use database_settings::*;
    pub use jwt_settings::*;
    pub use server_settings::*;
}

pub mod core {
    mod context;
    mod dberror;

    pub use context::*;
    pub use dberror::*;
}

pub mod auth {
    mod jwt;
    mod password;
    mod session;

    pub use jwt::*;
    pub use password::*;
    pub use session::*;
}

pub mod db {
    mod contracts;
    mod invoices;
    mod maintenance_tickets;
    mod messages;
    mod notifications;
    mod page;
    mod payments;
    mod refresh_tokens;
    mod statistics;
    mod tenants;
    mod units;
    mod users;
    mod utility_readings;

    pub use contracts::*;
    pub use invoices::*;
    pub use maintenance_tickets::*;
    pub use messages::*;
    pub use notifications::*;
    pub use page::*;
    pub use payments::*;
    pub use refresh_tokens::*;
    pub use statistics::*;
    pub use tenants::*;
    pub use units::*;
    pub use users::*;
    pub use utility_readings::*;
}

pub mod services {
    pub mod audit;
    pub mod invoices;
    pub mod maintenance;
    pub mod notify;
    pub mod payments;
}

pub mod routes {
    pub mod access;
    pub mod admin;
    pub mod api;
    pub mod auth;
    pub mod contracts;
    pub mod error;
    pub mod health;
    pub mod invoices;
    pub mod maintenance_tickets;
    pub mod messages;
    pub mod notifications;
    pub mod payments;
    pub mod tenants;
    pub mod units;
    pub mod utility_readings;
}

pub mod app {
    mod cli;
    mod migrations;
    mod router;
    mod server;

    pub use cli::*;
    pub use migrations::*;
    pub use router::*;
    pub use server::*;
}
