//! Read-only dashboard API
//!
//! Stateless fetch-and-serialize endpoints over the warehouse tables.
//! No business logic lives here.

pub mod streams;

use actix_web::web;

/// Configure all API routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(web::scope("/api/streams").configure(streams::configure));
}
