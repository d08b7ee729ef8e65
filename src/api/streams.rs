//! Stream endpoints: latest warehouse rows for the dashboard

use actix_web::{get, web, HttpResponse, Responder};
use serde_json::json;

use crate::db::Warehouse;
use crate::serializers;

/// Each endpoint returns the 50 most-recently-processed rows
const LATEST_LIMIT: i64 = 50;

/// Shared state for the read API
pub struct ApiState {
    pub warehouse: Warehouse,
}

/// Configure stream routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(get_artist_streams)
        .service(get_playlists)
        .service(get_playlist_tracks);
}

/// GET /artists - latest artist stream rows
#[get("/artists")]
async fn get_artist_streams(state: web::Data<ApiState>) -> impl Responder {
    match state.warehouse.latest_artist_streams(LATEST_LIMIT).await {
        Ok(rows) => match serializers::serialize_artist_streams(rows) {
            Ok(out) => HttpResponse::Ok().json(out),
            Err(errors) => HttpResponse::BadRequest().json(json!({ "errors": errors })),
        },
        Err(e) => HttpResponse::InternalServerError().json(json!({ "error": e.to_string() })),
    }
}

/// GET /playlists - latest playlist rows
#[get("/playlists")]
async fn get_playlists(state: web::Data<ApiState>) -> impl Responder {
    match state.warehouse.latest_playlists(LATEST_LIMIT).await {
        Ok(rows) => match serializers::serialize_playlists(rows) {
            Ok(out) => HttpResponse::Ok().json(out),
            Err(errors) => HttpResponse::BadRequest().json(json!({ "errors": errors })),
        },
        Err(e) => HttpResponse::InternalServerError().json(json!({ "error": e.to_string() })),
    }
}

/// GET /playlist-tracks - latest playlist stream rows
#[get("/playlist-tracks")]
async fn get_playlist_tracks(state: web::Data<ApiState>) -> impl Responder {
    match state.warehouse.latest_playlist_streams(LATEST_LIMIT).await {
        Ok(rows) => match serializers::serialize_playlist_streams(rows) {
            Ok(out) => HttpResponse::Ok().json(out),
            Err(errors) => HttpResponse::BadRequest().json(json!({ "errors": errors })),
        },
        Err(e) => HttpResponse::InternalServerError().json(json!({ "error": e.to_string() })),
    }
}
