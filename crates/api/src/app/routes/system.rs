use axum::{response::IntoResponse, Json};
use serde_json::json;

pub const SERVICE_NAME: &str = "tingo-ventas-api";

pub async fn root() -> impl IntoResponse {
    Json(json!({
        "message": "Bienvenido a Tingo Ventas",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running",
    }))
}

pub async fn health() -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "service": SERVICE_NAME,
    }))
}
