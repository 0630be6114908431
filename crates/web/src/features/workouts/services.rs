use sqlx::SqlitePool;
use storage::{
    dto::common::ListParams, error::Result, models::Workout,
    repository::workout::WorkoutRepository, validation::ValidWorkout,
};

/// Record a validated workout
pub async fn create_workout(pool: &SqlitePool, workout: &ValidWorkout) -> Result<Workout> {
    let repo = WorkoutRepository::new(pool);
    repo.create(workout).await
}

/// List workouts in insertion order
pub async fn list_workouts(pool: &SqlitePool, params: ListParams) -> Result<Vec<Workout>> {
    let repo = WorkoutRepository::new(pool);
    repo.list(params).await
}

/// Get a workout by id
pub async fn get_workout(pool: &SqlitePool, id: i64) -> Result<Workout> {
    let repo = WorkoutRepository::new(pool);
    repo.find_by_id(id).await
}

/// Delete a workout by id
pub async fn delete_workout(pool: &SqlitePool, id: i64) -> Result<()> {
    let repo = WorkoutRepository::new(pool);
    repo.delete(id).await
}
