use axum::Router;

use crate::features::{health, workouts};
use crate::state::AppState;

/// Every public route, with state attached.
pub fn router(state: AppState) -> Router {
    Router::new()
        .merge(health::routes::routes())
        .merge(workouts::routes::routes(&state))
        .with_state(state)
}
