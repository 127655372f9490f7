//! Root greeting

use axum::{routing::get, Router};

use crate::state::AppState;

async fn index() -> &'static str {
    "Hello,World!"
}

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(index))
}
