use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row};
use utoipa::ToSchema;

/// Returned when a stored or submitted label matches no known variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

impl fmt::Display for UnknownVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown {} '{}'", self.kind, self.value)
    }
}

impl std::error::Error for UnknownVariant {}

macro_rules! labelled_enum {
    (
        $(#[$meta:meta])*
        $name:ident, $kind:literal {
            $($variant:ident => $label:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
        pub enum $name {
            $(
                #[serde(rename = $label)]
                $variant,
            )+
        }

        impl $name {
            pub const LABELS: &'static [&'static str] = &[$($label),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $label,)+
                }
            }
        }

        impl FromStr for $name {
            type Err = UnknownVariant;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                match value {
                    $($label => Ok(Self::$variant),)+
                    _ => Err(UnknownVariant {
                        kind: $kind,
                        value: value.to_string(),
                    }),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

labelled_enum! {
    /// How the kettlebell was held for the swing block.
    SwingStyle, "swing style" {
        OneHanded => "1-handed",
        TwoHanded => "2-handed",
    }
}

labelled_enum! {
    SwingWorkoutType, "swing workout type" {
        Standard => "Standard",
        Emom => "EMOM",
        Ladders => "Ladders",
        Clusters => "Clusters",
        Descending => "Descending",
        Pyramid => "Pyramid",
    }
}

labelled_enum! {
    GetupWorkoutType, "get-up workout type" {
        Standard => "Standard",
        Emom => "EMOM",
        Complex => "Complex",
        HeavySingle => "Heavy Single",
        Alternating => "Alternating",
    }
}

/// A persisted workout session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Workout {
    pub id: i64,
    pub date: NaiveDate,
    pub kettlebell_swings: i64,
    pub turkish_get_ups: i64,
    pub swing_weight_kg: f64,
    pub swing_style: SwingStyle,
    pub swing_workout_type: SwingWorkoutType,
    pub getup_weight_1_kg: f64,
    pub getup_reps_1: i64,
    pub getup_weight_2_kg: Option<f64>,
    pub getup_reps_2: i64,
    pub getup_workout_type: GetupWorkoutType,
}

fn decode_label<T>(row: &SqliteRow, column: &str) -> Result<T, sqlx::Error>
where
    T: FromStr<Err = UnknownVariant>,
{
    let raw: String = row.try_get(column)?;
    raw.parse().map_err(|e: UnknownVariant| sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: Box::new(e),
    })
}

impl<'r> FromRow<'r, SqliteRow> for Workout {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            date: row.try_get("date")?,
            kettlebell_swings: row.try_get("kettlebell_swings")?,
            turkish_get_ups: row.try_get("turkish_get_ups")?,
            swing_weight_kg: row.try_get("swing_weight_kg")?,
            swing_style: decode_label(row, "swing_style")?,
            swing_workout_type: decode_label(row, "swing_workout_type")?,
            getup_weight_1_kg: row.try_get("getup_weight_1_kg")?,
            getup_reps_1: row.try_get("getup_reps_1")?,
            getup_weight_2_kg: row.try_get("getup_weight_2_kg")?,
            getup_reps_2: row.try_get("getup_reps_2")?,
            getup_workout_type: decode_label(row, "getup_workout_type")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels_round_trip_through_from_str() {
        for label in GetupWorkoutType::LABELS {
            let parsed: GetupWorkoutType = label.parse().unwrap();
            assert_eq!(parsed.as_str(), *label);
        }
    }

    #[test]
    fn test_unknown_label_is_rejected() {
        let err = "Tabata".parse::<SwingWorkoutType>().unwrap_err();
        assert_eq!(err.value, "Tabata");
        assert_eq!(err.kind, "swing workout type");
    }

    #[test]
    fn test_labels_are_case_sensitive() {
        assert!("emom".parse::<SwingWorkoutType>().is_err());
        assert!("2-Handed".parse::<SwingStyle>().is_err());
    }

    #[test]
    fn test_serde_uses_wire_labels() {
        let json = serde_json::to_string(&GetupWorkoutType::HeavySingle).unwrap();
        assert_eq!(json, "\"Heavy Single\"");

        let style: SwingStyle = serde_json::from_str("\"1-handed\"").unwrap();
        assert_eq!(style, SwingStyle::OneHanded);
    }
}
