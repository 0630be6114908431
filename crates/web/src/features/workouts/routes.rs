use axum::{
    Router, middleware,
    routing::{MethodRouter, delete, get, post},
};

use super::handlers::{create_workout, delete_workout, get_workout, list_workouts};
use crate::middleware::rate_limit::{Budget, RouteLimit, RouteName, enforce_rate_limit};
use crate::state::AppState;

/// Workout routes, each wrapped in its own request budget.
///
/// The collection is served with and without the trailing slash; both
/// spellings share one budget.
pub fn routes(state: &AppState) -> Router<AppState> {
    let limits = state.rate_limits;
    let budgeted = |method_router: MethodRouter<AppState>,
                    route: RouteName,
                    per_minute: u32|
     -> MethodRouter<AppState> {
        let limit = RouteLimit::new(state.limiter.clone(), route, Budget::per_minute(per_minute));
        method_router.layer(middleware::from_fn_with_state(limit, enforce_rate_limit))
    };

    let collection = budgeted(post(create_workout), RouteName::CreateWorkout, limits.create)
        .merge(budgeted(get(list_workouts), RouteName::ListWorkouts, limits.list));

    let member = budgeted(get(get_workout), RouteName::FetchWorkout, limits.fetch)
        .merge(budgeted(delete(delete_workout), RouteName::DeleteWorkout, limits.delete));

    Router::new()
        .route("/workouts", collection.clone())
        .route("/workouts/", collection)
        .route("/workouts/:id", member)
}
