//! Forward-only schema evolution for the `workouts` table.
//!
//! The live column set decides which steps still need to run, so a store
//! touched by older tooling that never recorded a version is still brought
//! forward correctly. Each step is tagged with the version it reaches and the
//! final version is kept in `schema_meta`.
//!
//! Steps only ever add columns. When a step adds any column, every column of
//! that step gets a one-time historical backfill on rows still holding NULL
//! or the structural default (the value new inserts receive). Covering the
//! step's already-present columns repairs stores left half-migrated.

use std::collections::HashSet;

use sqlx::{Sqlite, SqlitePool, Transaction};

use crate::error::{Result, StorageError};

pub const WORKOUTS_TABLE: &str = "workouts";
pub const META_TABLE: &str = "schema_meta";
pub const CURRENT_SCHEMA_VERSION: i64 = 4;

const BASELINE_VERSION: i64 = 1;

#[derive(Debug, Clone, Copy)]
struct ColumnDef {
    name: &'static str,
    sql_type: &'static str,
    not_null: bool,
    /// SQL literal used as the structural default.
    default: Option<&'static str>,
}

impl ColumnDef {
    const fn new(
        name: &'static str,
        sql_type: &'static str,
        not_null: bool,
        default: Option<&'static str>,
    ) -> Self {
        Self {
            name,
            sql_type,
            not_null,
            default,
        }
    }

    fn ddl(&self) -> String {
        let mut ddl = format!("{} {}", self.name, self.sql_type);
        if self.not_null {
            ddl.push_str(" NOT NULL");
        }
        if let Some(default) = self.default {
            ddl.push_str(" DEFAULT ");
            ddl.push_str(default);
        }
        ddl
    }
}

#[derive(Debug, Clone, Copy)]
enum BackfillSource {
    Literal(&'static str),
    /// Copy from another column; skipped when that column is not live.
    Column(&'static str),
}

#[derive(Debug, Clone, Copy)]
struct Backfill {
    column: &'static str,
    source: BackfillSource,
    /// Extra row condition, ANDed with the NULL-or-default filter.
    guard: Option<&'static str>,
}

#[derive(Debug)]
struct MigrationStep {
    version: i64,
    name: &'static str,
    columns: &'static [ColumnDef],
    backfills: &'static [Backfill],
}

const BASELINE_COLUMNS: &[ColumnDef] = &[
    ColumnDef::new("date", "TEXT", true, None),
    ColumnDef::new("kettlebell_swings", "INTEGER", true, Some("0")),
    ColumnDef::new("turkish_get_ups", "INTEGER", true, Some("0")),
    ColumnDef::new("swing_weight_kg", "REAL", true, Some("16.0")),
];

const STEPS: &[MigrationStep] = &[
    MigrationStep {
        version: 2,
        name: "swing_style",
        columns: &[ColumnDef::new("swing_style", "TEXT", true, Some("'2-handed'"))],
        backfills: &[],
    },
    MigrationStep {
        version: 3,
        name: "dual_getup_weights",
        columns: &[
            ColumnDef::new("getup_weight_1_kg", "REAL", true, Some("16.0")),
            ColumnDef::new("getup_reps_1", "INTEGER", true, Some("0")),
            ColumnDef::new("getup_weight_2_kg", "REAL", false, None),
            ColumnDef::new("getup_reps_2", "INTEGER", true, Some("0")),
        ],
        backfills: &[
            // Single-weight sessions did all their reps at the first weight.
            Backfill {
                column: "getup_reps_1",
                source: BackfillSource::Column("turkish_get_ups"),
                guard: Some("COALESCE(getup_reps_2, 0) = 0"),
            },
            Backfill {
                column: "getup_weight_1_kg",
                source: BackfillSource::Column("getup_weight_kg"),
                guard: None,
            },
        ],
    },
    MigrationStep {
        version: 4,
        name: "workout_types",
        columns: &[
            ColumnDef::new("swing_workout_type", "TEXT", true, Some("'Standard'")),
            ColumnDef::new("getup_workout_type", "TEXT", true, Some("'Standard'")),
        ],
        backfills: &[
            // Historical assumption: sessions logged before workout types were
            // tracked were EMOM swing sessions. This cannot be verified from
            // the rows themselves.
            Backfill {
                column: "swing_workout_type",
                source: BackfillSource::Literal("'EMOM'"),
                guard: None,
            },
            Backfill {
                column: "getup_workout_type",
                source: BackfillSource::Literal("'Standard'"),
                guard: None,
            },
        ],
    },
];

/// Outcome of a migration run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationReport {
    /// Version the store was at before the run; 0 when the table was absent.
    pub from_version: i64,
    pub to_version: i64,
    pub applied_steps: Vec<&'static str>,
    pub columns_added: Vec<&'static str>,
    pub rows_backfilled: u64,
    pub version_recorded: bool,
}

impl MigrationReport {
    /// True when the run wrote nothing.
    pub fn is_noop(&self) -> bool {
        self.applied_steps.is_empty() && !self.version_recorded
    }
}

/// Bring the workout table up to [`CURRENT_SCHEMA_VERSION`].
///
/// Runs in a single transaction; against an already-current store it performs
/// no writes at all.
pub async fn migrate(pool: &SqlitePool) -> Result<MigrationReport> {
    let mut tx = pool.begin().await?;
    let mut report = MigrationReport {
        to_version: CURRENT_SCHEMA_VERSION,
        ..MigrationReport::default()
    };

    if table_exists(&mut tx, WORKOUTS_TABLE).await? {
        let mut live = live_columns(&mut tx).await?;
        report.from_version = infer_version(&live);

        for step in STEPS {
            apply_step(&mut tx, step, &mut live, &mut report).await?;
        }
    } else {
        create_workouts_table(&mut tx).await?;
        report.from_version = 0;
        report.applied_steps.push("baseline");
        tracing::info!("Created {} table at schema version {}", WORKOUTS_TABLE, CURRENT_SCHEMA_VERSION);
    }

    report.version_recorded = record_version(&mut tx).await?;

    tx.commit().await?;

    if report.is_noop() {
        tracing::info!("Database schema is up to date (version {})", CURRENT_SCHEMA_VERSION);
    } else {
        tracing::info!(
            from_version = report.from_version,
            to_version = report.to_version,
            steps = ?report.applied_steps,
            columns_added = ?report.columns_added,
            rows_backfilled = report.rows_backfilled,
            "Database migration completed"
        );
    }

    Ok(report)
}

/// Version implied by the live columns alone.
fn infer_version(live: &HashSet<String>) -> i64 {
    STEPS
        .iter()
        .take_while(|step| step.columns.iter().all(|c| live.contains(c.name)))
        .map(|step| step.version)
        .last()
        .unwrap_or(BASELINE_VERSION)
}

async fn apply_step(
    tx: &mut Transaction<'_, Sqlite>,
    step: &MigrationStep,
    live: &mut HashSet<String>,
    report: &mut MigrationReport,
) -> Result<()> {
    let missing: Vec<&ColumnDef> = step
        .columns
        .iter()
        .filter(|column| !live.contains(column.name))
        .collect();

    if missing.is_empty() {
        return Ok(());
    }

    let fail = |source: sqlx::Error| StorageError::Migration {
        step: step.name,
        source,
    };

    for column in &missing {
        tracing::info!("Adding {} column (step {})...", column.name, step.name);
        let ddl = format!("ALTER TABLE {WORKOUTS_TABLE} ADD COLUMN {}", column.ddl());
        sqlx::query(&ddl).execute(&mut **tx).await.map_err(fail)?;
        live.insert(column.name.to_string());
        report.columns_added.push(column.name);
    }

    for backfill in step.backfills {
        let Some(column) = step.columns.iter().find(|c| c.name == backfill.column) else {
            continue;
        };

        let value = match backfill.source {
            BackfillSource::Literal(literal) => literal.to_string(),
            BackfillSource::Column(source) if live.contains(source) => {
                format!("COALESCE({source}, {})", column.name)
            }
            BackfillSource::Column(_) => continue,
        };

        let mut filter = match column.default {
            Some(default) => format!("({0} IS NULL OR {0} = {1})", column.name, default),
            None => format!("{} IS NULL", column.name),
        };
        if let Some(guard) = backfill.guard {
            filter = format!("{filter} AND {guard}");
        }

        let update = format!("UPDATE {WORKOUTS_TABLE} SET {} = {value} WHERE {filter}", column.name);
        let result = sqlx::query(&update).execute(&mut **tx).await.map_err(fail)?;

        tracing::info!(
            "Backfilled {} on {} existing workouts",
            column.name,
            result.rows_affected()
        );
        report.rows_backfilled += result.rows_affected();
    }

    report.applied_steps.push(step.name);
    Ok(())
}

async fn create_workouts_table(tx: &mut Transaction<'_, Sqlite>) -> Result<()> {
    let columns: Vec<String> = BASELINE_COLUMNS
        .iter()
        .chain(STEPS.iter().flat_map(|step| step.columns.iter()))
        .map(ColumnDef::ddl)
        .collect();

    let create = format!(
        "CREATE TABLE {WORKOUTS_TABLE} (id INTEGER PRIMARY KEY AUTOINCREMENT, {})",
        columns.join(", ")
    );

    let fail = |source: sqlx::Error| StorageError::Migration {
        step: "baseline",
        source,
    };

    sqlx::query(&create).execute(&mut **tx).await.map_err(fail)?;
    sqlx::query(&format!(
        "CREATE INDEX IF NOT EXISTS idx_workouts_date ON {WORKOUTS_TABLE}(date)"
    ))
    .execute(&mut **tx)
    .await
    .map_err(fail)?;

    Ok(())
}

/// Store the current version unless it is already recorded. Returns whether
/// anything was written.
async fn record_version(tx: &mut Transaction<'_, Sqlite>) -> Result<bool> {
    let fail = |source: sqlx::Error| StorageError::Migration {
        step: "schema_version",
        source,
    };

    let stored = if table_exists(tx, META_TABLE).await? {
        sqlx::query_scalar::<_, Option<i64>>(&format!("SELECT MAX(version) FROM {META_TABLE}"))
            .fetch_one(&mut **tx)
            .await
            .map_err(fail)?
    } else {
        sqlx::query(&format!(
            "CREATE TABLE {META_TABLE} (version INTEGER NOT NULL)"
        ))
        .execute(&mut **tx)
        .await
        .map_err(fail)?;
        None
    };

    if stored == Some(CURRENT_SCHEMA_VERSION) {
        return Ok(false);
    }

    sqlx::query(&format!("DELETE FROM {META_TABLE}"))
        .execute(&mut **tx)
        .await
        .map_err(fail)?;
    sqlx::query(&format!("INSERT INTO {META_TABLE} (version) VALUES (?)"))
        .bind(CURRENT_SCHEMA_VERSION)
        .execute(&mut **tx)
        .await
        .map_err(fail)?;

    Ok(true)
}

async fn table_exists(tx: &mut Transaction<'_, Sqlite>, table: &str) -> Result<bool> {
    let name: Option<String> = sqlx::query_scalar(
        "SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?",
    )
    .bind(table)
    .fetch_optional(&mut **tx)
    .await?;

    Ok(name.is_some())
}

async fn live_columns(tx: &mut Transaction<'_, Sqlite>) -> Result<HashSet<String>> {
    let columns: Vec<String> = sqlx::query_scalar(&format!(
        "SELECT name FROM pragma_table_info('{WORKOUTS_TABLE}')"
    ))
    .fetch_all(&mut **tx)
    .await?;

    Ok(columns.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use sqlx::Row;

    use super::*;
    use crate::Database;
    use crate::models::{GetupWorkoutType, SwingStyle, SwingWorkoutType};
    use crate::repository::workout::WorkoutRepository;

    async fn total_changes(pool: &SqlitePool) -> i64 {
        sqlx::query_scalar("SELECT total_changes()")
            .fetch_one(pool)
            .await
            .unwrap()
    }

    async fn columns(pool: &SqlitePool) -> Vec<String> {
        sqlx::query_scalar("SELECT name FROM pragma_table_info('workouts') ORDER BY cid")
            .fetch_all(pool)
            .await
            .unwrap()
    }

    /// Table shape from before workout types were tracked.
    async fn seed_pre_workout_type_store(pool: &SqlitePool) {
        sqlx::query(
            "CREATE TABLE workouts (
                id INTEGER NOT NULL PRIMARY KEY,
                date DATE,
                kettlebell_swings INTEGER,
                turkish_get_ups INTEGER,
                swing_weight_kg FLOAT,
                getup_weight_1_kg FLOAT,
                getup_reps_1 INTEGER,
                getup_weight_2_kg FLOAT,
                getup_reps_2 INTEGER,
                swing_style VARCHAR
            )",
        )
        .execute(pool)
        .await
        .unwrap();

        sqlx::query(
            "INSERT INTO workouts (date, kettlebell_swings, turkish_get_ups, swing_weight_kg,
                getup_weight_1_kg, getup_reps_1, getup_weight_2_kg, getup_reps_2, swing_style)
             VALUES ('2024-01-10', 100, 10, 24.0, 24.0, 10, NULL, 0, '1-handed')",
        )
        .execute(pool)
        .await
        .unwrap();
    }

    /// Table shape from the single get-up weight era.
    async fn seed_single_weight_store(pool: &SqlitePool) {
        sqlx::query(
            "CREATE TABLE workouts (
                id INTEGER NOT NULL PRIMARY KEY,
                date DATE,
                kettlebell_swings INTEGER,
                turkish_get_ups INTEGER,
                swing_weight_kg FLOAT,
                getup_weight_kg FLOAT
            )",
        )
        .execute(pool)
        .await
        .unwrap();

        sqlx::query(
            "INSERT INTO workouts (date, kettlebell_swings, turkish_get_ups, swing_weight_kg, getup_weight_kg)
             VALUES ('2023-05-01', 100, 10, 32.0, 28.0)",
        )
        .execute(pool)
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_fresh_store_gets_full_schema() {
        let db = Database::in_memory().await.unwrap();

        let report = migrate(db.pool()).await.unwrap();
        assert_eq!(report.from_version, 0);
        assert_eq!(report.applied_steps, vec!["baseline"]);
        assert!(report.version_recorded);

        let cols = columns(db.pool()).await;
        for expected in [
            "id",
            "date",
            "swing_style",
            "getup_weight_2_kg",
            "swing_workout_type",
            "getup_workout_type",
        ] {
            assert!(cols.iter().any(|c| c == expected), "missing {expected}");
        }
        let version: i64 = sqlx::query_scalar("SELECT version FROM schema_meta")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(version, CURRENT_SCHEMA_VERSION);
    }

    #[tokio::test]
    async fn test_second_run_performs_no_writes() {
        let db = Database::in_memory().await.unwrap();
        seed_pre_workout_type_store(db.pool()).await;

        let first = migrate(db.pool()).await.unwrap();
        assert!(!first.is_noop());

        let cols_before = columns(db.pool()).await;
        let rows_before = WorkoutRepository::new(db.pool())
            .list(Default::default())
            .await
            .unwrap();
        let changes_before = total_changes(db.pool()).await;

        let second = migrate(db.pool()).await.unwrap();
        assert!(second.is_noop());
        assert_eq!(second.from_version, CURRENT_SCHEMA_VERSION);
        assert_eq!(second.rows_backfilled, 0);

        assert_eq!(total_changes(db.pool()).await, changes_before);
        assert_eq!(columns(db.pool()).await, cols_before);
        let rows_after = WorkoutRepository::new(db.pool())
            .list(Default::default())
            .await
            .unwrap();
        assert_eq!(rows_after, rows_before);
    }

    #[tokio::test]
    async fn test_pre_workout_type_rows_are_backfilled() {
        let db = Database::in_memory().await.unwrap();
        seed_pre_workout_type_store(db.pool()).await;

        let report = migrate(db.pool()).await.unwrap();
        assert_eq!(report.from_version, 3);
        assert_eq!(report.applied_steps, vec!["workout_types"]);
        assert_eq!(
            report.columns_added,
            vec!["swing_workout_type", "getup_workout_type"]
        );

        let workout = WorkoutRepository::new(db.pool()).find_by_id(1).await.unwrap();
        assert_eq!(workout.swing_workout_type, SwingWorkoutType::Emom);
        assert_eq!(workout.getup_workout_type, GetupWorkoutType::Standard);
        assert_eq!(workout.swing_style, SwingStyle::OneHanded);
    }

    #[tokio::test]
    async fn test_new_rows_get_structural_default_not_backfill() {
        let db = Database::in_memory().await.unwrap();
        seed_pre_workout_type_store(db.pool()).await;
        migrate(db.pool()).await.unwrap();

        sqlx::query(
            "INSERT INTO workouts (date, kettlebell_swings, turkish_get_ups, swing_weight_kg,
                getup_weight_1_kg, getup_reps_1, getup_reps_2, swing_style)
             VALUES ('2024-02-01', 50, 2, 16.0, 16.0, 2, 0, '2-handed')",
        )
        .execute(db.pool())
        .await
        .unwrap();

        let row = sqlx::query("SELECT swing_workout_type FROM workouts WHERE id = 2")
            .fetch_one(db.pool())
            .await
            .unwrap();
        let swing_type: String = row.get("swing_workout_type");
        assert_eq!(swing_type, "Standard");
    }

    #[tokio::test]
    async fn test_single_weight_rows_keep_getup_sum_identity() {
        let db = Database::in_memory().await.unwrap();
        seed_single_weight_store(db.pool()).await;

        let report = migrate(db.pool()).await.unwrap();
        assert_eq!(report.from_version, 1);
        assert_eq!(
            report.applied_steps,
            vec!["swing_style", "dual_getup_weights", "workout_types"]
        );

        let workout = WorkoutRepository::new(db.pool()).find_by_id(1).await.unwrap();
        assert_eq!(workout.getup_reps_1, 10);
        assert_eq!(workout.getup_reps_2, 0);
        assert_eq!(workout.turkish_get_ups, workout.getup_reps_1 + workout.getup_reps_2);
        assert_eq!(workout.getup_weight_1_kg, 28.0);
        assert_eq!(workout.getup_weight_2_kg, None);
        assert_eq!(workout.swing_style, SwingStyle::TwoHanded);
        assert_eq!(workout.swing_workout_type, SwingWorkoutType::Emom);
    }

    #[tokio::test]
    async fn test_half_added_workout_types_are_backfilled_together() {
        let db = Database::in_memory().await.unwrap();
        seed_pre_workout_type_store(db.pool()).await;
        sqlx::query("ALTER TABLE workouts ADD COLUMN swing_workout_type TEXT")
            .execute(db.pool())
            .await
            .unwrap();

        let report = migrate(db.pool()).await.unwrap();
        assert_eq!(report.columns_added, vec!["getup_workout_type"]);

        let repo = WorkoutRepository::new(db.pool());
        let workout = repo.find_by_id(1).await.unwrap();
        assert_eq!(workout.swing_workout_type, SwingWorkoutType::Emom);
        assert_eq!(workout.getup_workout_type, GetupWorkoutType::Standard);
        assert_eq!(repo.list(Default::default()).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_present_rep_split_is_not_overwritten() {
        let db = Database::in_memory().await.unwrap();
        sqlx::query(
            "CREATE TABLE workouts (
                id INTEGER NOT NULL PRIMARY KEY,
                date DATE,
                kettlebell_swings INTEGER,
                turkish_get_ups INTEGER,
                swing_weight_kg FLOAT,
                swing_style VARCHAR,
                getup_reps_1 INTEGER,
                getup_reps_2 INTEGER
            )",
        )
        .execute(db.pool())
        .await
        .unwrap();
        sqlx::query(
            "INSERT INTO workouts (date, kettlebell_swings, turkish_get_ups, swing_weight_kg,
                swing_style, getup_reps_1, getup_reps_2)
             VALUES ('2024-03-01', 100, 10, 24.0, '2-handed', 0, 10),
                    ('2024-03-02', 100, 10, 24.0, '2-handed', 0, 0)",
        )
        .execute(db.pool())
        .await
        .unwrap();

        migrate(db.pool()).await.unwrap();

        let repo = WorkoutRepository::new(db.pool());
        let split = repo.find_by_id(1).await.unwrap();
        assert_eq!((split.getup_reps_1, split.getup_reps_2), (0, 10));
        let single = repo.find_by_id(2).await.unwrap();
        assert_eq!((single.getup_reps_1, single.getup_reps_2), (10, 0));
    }

    #[tokio::test]
    async fn test_current_columns_without_version_row_record_it_once() {
        let db = Database::in_memory().await.unwrap();
        migrate(db.pool()).await.unwrap();
        sqlx::query("DROP TABLE schema_meta")
            .execute(db.pool())
            .await
            .unwrap();

        let report = migrate(db.pool()).await.unwrap();
        assert!(report.applied_steps.is_empty());
        assert!(report.version_recorded);

        let report = migrate(db.pool()).await.unwrap();
        assert!(report.is_noop());
    }

    #[tokio::test]
    async fn test_closed_pool_reports_error() {
        let db = Database::in_memory().await.unwrap();
        db.pool().close().await;

        let err = migrate(db.pool()).await.unwrap_err();
        assert!(err.is_unavailable());
    }
}
