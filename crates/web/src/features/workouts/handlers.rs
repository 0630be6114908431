use axum::{
    Json,
    extract::{Path, Query, State},
};
use axum_extra::extract::WithRejection;
use chrono::Local;
use storage::{
    Database,
    dto::{
        common::ListParams,
        workout::{CreateWorkoutRequest, MessageResponse},
    },
    models::Workout,
    validation::validate_workout,
};

use crate::error::{WebError, WebResult};

use super::services;

#[utoipa::path(
    post,
    path = "/workouts/",
    request_body = CreateWorkoutRequest,
    responses(
        (status = 200, description = "Workout recorded", body = Workout),
        (status = 422, description = "Validation error"),
        (status = 429, description = "Too many requests")
    ),
    tag = "workouts"
)]
pub async fn create_workout(
    State(db): State<Database>,
    WithRejection(Json(req), _): WithRejection<Json<CreateWorkoutRequest>, WebError>,
) -> WebResult<Json<Workout>> {
    let workout = validate_workout(&req, Local::now().date_naive())?;

    let created = services::create_workout(db.pool(), &workout).await?;
    tracing::info!(workout_id = created.id, date = %created.date, "Workout recorded");

    Ok(Json(created))
}

#[utoipa::path(
    get,
    path = "/workouts/",
    params(ListParams),
    responses(
        (status = 200, description = "Workouts in insertion order", body = Vec<Workout>),
        (status = 429, description = "Too many requests")
    ),
    tag = "workouts"
)]
pub async fn list_workouts(
    State(db): State<Database>,
    WithRejection(Query(params), _): WithRejection<Query<ListParams>, WebError>,
) -> WebResult<Json<Vec<Workout>>> {
    let workouts = services::list_workouts(db.pool(), params).await?;

    Ok(Json(workouts))
}

#[utoipa::path(
    get,
    path = "/workouts/{id}",
    params(
        ("id" = i64, Path, description = "Workout id")
    ),
    responses(
        (status = 200, description = "Workout found", body = Workout),
        (status = 404, description = "Workout not found"),
        (status = 429, description = "Too many requests")
    ),
    tag = "workouts"
)]
pub async fn get_workout(
    State(db): State<Database>,
    WithRejection(Path(id), _): WithRejection<Path<i64>, WebError>,
) -> WebResult<Json<Workout>> {
    let workout = services::get_workout(db.pool(), id).await?;

    Ok(Json(workout))
}

#[utoipa::path(
    delete,
    path = "/workouts/{id}",
    params(
        ("id" = i64, Path, description = "Workout id")
    ),
    responses(
        (status = 200, description = "Workout deleted", body = MessageResponse),
        (status = 404, description = "Workout not found"),
        (status = 429, description = "Too many requests")
    ),
    tag = "workouts"
)]
pub async fn delete_workout(
    State(db): State<Database>,
    WithRejection(Path(id), _): WithRejection<Path<i64>, WebError>,
) -> WebResult<Json<MessageResponse>> {
    services::delete_workout(db.pool(), id).await?;
    tracing::info!(workout_id = id, "Workout deleted");

    Ok(Json(MessageResponse::new("Workout deleted successfully")))
}
