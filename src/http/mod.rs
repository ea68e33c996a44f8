//! HTTP surface for the classifier.
//!
//! An Axum server exposing `POST /sentiment` for uploads and `GET /health`
//! for liveness. Built only with the `http` feature.

mod routes;

pub use routes::{build_router, run_http_server, AppState, HealthResponse, HttpServerError};
