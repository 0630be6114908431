use sqlx::SqlitePool;

use crate::dto::common::ListParams;
use crate::error::{Result, StorageError};
use crate::models::Workout;
use crate::validation::ValidWorkout;

const WORKOUT_COLUMNS: &str = "id, date, kettlebell_swings, turkish_get_ups, swing_weight_kg, \
     swing_style, swing_workout_type, getup_weight_1_kg, getup_reps_1, getup_weight_2_kg, \
     getup_reps_2, getup_workout_type";

pub struct WorkoutRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> WorkoutRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Persist a validated workout and return it with its assigned id.
    pub async fn create(&self, workout: &ValidWorkout) -> Result<Workout> {
        let mut tx = self.pool.begin().await?;

        let query = format!(
            r#"
            INSERT INTO workouts (
                date, kettlebell_swings, turkish_get_ups, swing_weight_kg,
                swing_style, swing_workout_type, getup_weight_1_kg, getup_reps_1,
                getup_weight_2_kg, getup_reps_2, getup_workout_type
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING {WORKOUT_COLUMNS}
            "#
        );

        let created = sqlx::query_as::<_, Workout>(&query)
            .bind(workout.date)
            .bind(workout.kettlebell_swings)
            .bind(workout.turkish_get_ups)
            .bind(workout.swing_weight_kg)
            .bind(workout.swing_style.as_str())
            .bind(workout.swing_workout_type.as_str())
            .bind(workout.getup_weight_1_kg)
            .bind(workout.getup_reps_1)
            .bind(workout.getup_weight_2_kg)
            .bind(workout.getup_reps_2)
            .bind(workout.getup_workout_type.as_str())
            .fetch_one(&mut *tx)
            .await
            .map_err(rejected_insert)?;

        tx.commit().await?;

        tracing::debug!(workout_id = created.id, "Workout created");
        Ok(created)
    }

    /// List workouts in insertion order
    pub async fn list(&self, params: ListParams) -> Result<Vec<Workout>> {
        let query = format!("SELECT {WORKOUT_COLUMNS} FROM workouts ORDER BY id LIMIT ? OFFSET ?");

        let workouts = sqlx::query_as::<_, Workout>(&query)
            .bind(params.limit())
            .bind(params.offset())
            .fetch_all(self.pool)
            .await?;

        Ok(workouts)
    }

    /// Find workout by ID
    pub async fn find_by_id(&self, id: i64) -> Result<Workout> {
        if id <= 0 {
            return Err(StorageError::NotFound);
        }

        let query = format!("SELECT {WORKOUT_COLUMNS} FROM workouts WHERE id = ?");

        let workout = sqlx::query_as::<_, Workout>(&query)
            .bind(id)
            .fetch_optional(self.pool)
            .await?
            .ok_or(StorageError::NotFound)?;

        Ok(workout)
    }

    /// Delete a workout by ID
    pub async fn delete(&self, id: i64) -> Result<()> {
        if id <= 0 {
            return Err(StorageError::NotFound);
        }

        let mut tx = self.pool.begin().await?;

        let result = sqlx::query("DELETE FROM workouts WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Err(StorageError::NotFound);
        }

        tx.commit().await?;

        tracing::debug!(workout_id = id, "Workout deleted");
        Ok(())
    }

    pub async fn count(&self) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM workouts")
            .fetch_one(self.pool)
            .await?;

        Ok(count)
    }
}

/// The store refusing the row (constraint or schema mismatch) is a rejected
/// write, not an opaque driver failure.
fn rejected_insert(error: sqlx::Error) -> StorageError {
    match error {
        sqlx::Error::Database(db) => StorageError::ConstraintViolation(db.message().to_string()),
        other => other.into(),
    }
}
