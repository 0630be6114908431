//! Admission rules for candidate workouts.
//!
//! Everything here is a pure function of the request and the caller-supplied
//! `today`; no store access, no shared state.

use std::borrow::Cow;
use std::str::FromStr;

use chrono::{Months, NaiveDate};
use validator::{Validate, ValidationError, ValidationErrors};

use crate::dto::workout::CreateWorkoutRequest;
use crate::models::{GetupWorkoutType, SwingStyle, SwingWorkoutType, UnknownVariant};

const MAX_AGE_MONTHS: u32 = 10 * 12;
const MAX_LEAD_MONTHS: u32 = 12;

/// A workout that passed every admission rule.
///
/// Only [`validate_workout`] builds one, so anything holding a `ValidWorkout`
/// can rely on the ranges, labels and get-up sum identity.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidWorkout {
    pub(crate) date: NaiveDate,
    pub(crate) kettlebell_swings: i64,
    pub(crate) turkish_get_ups: i64,
    pub(crate) swing_weight_kg: f64,
    pub(crate) swing_style: SwingStyle,
    pub(crate) swing_workout_type: SwingWorkoutType,
    pub(crate) getup_weight_1_kg: f64,
    pub(crate) getup_reps_1: i64,
    pub(crate) getup_weight_2_kg: Option<f64>,
    pub(crate) getup_reps_2: i64,
    pub(crate) getup_workout_type: GetupWorkoutType,
}

impl ValidWorkout {
    pub fn turkish_get_ups(&self) -> i64 {
        self.turkish_get_ups
    }
}

/// Accepted window for a workout date relative to `today`.
pub fn date_window(today: NaiveDate) -> (NaiveDate, NaiveDate) {
    let earliest = today
        .checked_sub_months(Months::new(MAX_AGE_MONTHS))
        .unwrap_or(NaiveDate::MIN);
    let latest = today
        .checked_add_months(Months::new(MAX_LEAD_MONTHS))
        .unwrap_or(NaiveDate::MAX);
    (earliest, latest)
}

/// Checks `req` against every field and cross-field rule.
///
/// All violations are collected; each one is keyed by the failing field.
pub fn validate_workout(
    req: &CreateWorkoutRequest,
    today: NaiveDate,
) -> Result<ValidWorkout, ValidationErrors> {
    let mut errors = match req.validate() {
        Ok(()) => ValidationErrors::new(),
        Err(errors) => errors,
    };

    let (earliest, latest) = date_window(today);
    if req.date < earliest || req.date > latest {
        errors.add(
            "date",
            field_error(
                "date_out_of_range",
                format!("date {} must be between {} and {}", req.date, earliest, latest),
            ),
        );
    }

    let swing_style = parse_label::<SwingStyle>(
        &mut errors,
        "swing_style",
        "invalid_swing_style",
        &req.swing_style,
        SwingStyle::LABELS,
    );
    let swing_workout_type = parse_label::<SwingWorkoutType>(
        &mut errors,
        "swing_workout_type",
        "invalid_swing_workout_type",
        &req.swing_workout_type,
        SwingWorkoutType::LABELS,
    );
    let getup_workout_type = parse_label::<GetupWorkoutType>(
        &mut errors,
        "getup_workout_type",
        "invalid_getup_workout_type",
        &req.getup_workout_type,
        GetupWorkoutType::LABELS,
    );

    let rep_sum = req.getup_reps_1.saturating_add(req.getup_reps_2);
    if req.turkish_get_ups != rep_sum {
        errors.add(
            "turkish_get_ups",
            field_error(
                "getup_sum_mismatch",
                format!(
                    "turkish_get_ups ({}) must equal getup_reps_1 + getup_reps_2 ({})",
                    req.turkish_get_ups, rep_sum
                ),
            ),
        );
    }

    match (swing_style, swing_workout_type, getup_workout_type) {
        (Some(swing_style), Some(swing_workout_type), Some(getup_workout_type))
            if errors.errors().is_empty() =>
        {
            Ok(ValidWorkout {
                date: req.date,
                kettlebell_swings: req.kettlebell_swings,
                turkish_get_ups: req.turkish_get_ups,
                swing_weight_kg: req.swing_weight_kg,
                swing_style,
                swing_workout_type,
                getup_weight_1_kg: req.getup_weight_1_kg,
                getup_reps_1: req.getup_reps_1,
                getup_weight_2_kg: req.getup_weight_2_kg,
                getup_reps_2: req.getup_reps_2,
                getup_workout_type,
            })
        }
        _ => Err(errors),
    }
}

fn parse_label<T>(
    errors: &mut ValidationErrors,
    field: &'static str,
    code: &'static str,
    value: &str,
    allowed: &[&str],
) -> Option<T>
where
    T: FromStr<Err = UnknownVariant>,
{
    match value.parse::<T>() {
        Ok(parsed) => Some(parsed),
        Err(unknown) => {
            let mut err = field_error(
                code,
                format!("{} must be one of: {}", unknown, allowed.join(", ")),
            );
            err.add_param(Cow::from("value"), &value);
            errors.add(field, err);
            None
        }
    }
}

fn field_error(code: &'static str, message: String) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(Cow::from(message));
    err
}
