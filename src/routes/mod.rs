use axum::{routing::get, Router};

use crate::state::AppState;

pub mod bookings;
pub mod calendar;
pub mod health;
pub mod public;

pub fn v1_router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .merge(calendar::router())
        .merge(bookings::router())
        .merge(public::router())
}
