use std::fmt;
use std::num::IntErrorKind;

use serde::de::{self, Deserializer, Visitor};
use serde::Deserialize;
use utoipa::IntoParams;

pub const DEFAULT_SKIP: i64 = 0;
pub const DEFAULT_LIMIT: i64 = 100;
pub const MAX_LIMIT: i64 = 1000;

/// Offset/limit window for listing workouts.
///
/// Out-of-range values are clamped back to the defaults instead of being
/// rejected, so `skip=-5&limit=5000` reads the same page as no parameters.
/// Integers too large for `i64` saturate first and are then clamped.
#[derive(Debug, Clone, Copy, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListParams {
    #[serde(default = "default_skip", deserialize_with = "saturating_i64")]
    pub skip: i64,
    #[serde(default = "default_limit", deserialize_with = "saturating_i64")]
    pub limit: i64,
}

fn default_skip() -> i64 {
    DEFAULT_SKIP
}

fn default_limit() -> i64 {
    DEFAULT_LIMIT
}

struct SaturatingI64;

impl Visitor<'_> for SaturatingI64 {
    type Value = i64;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an integer")
    }

    fn visit_i64<E: de::Error>(self, value: i64) -> Result<i64, E> {
        Ok(value)
    }

    fn visit_u64<E: de::Error>(self, value: u64) -> Result<i64, E> {
        Ok(i64::try_from(value).unwrap_or(i64::MAX))
    }

    fn visit_str<E: de::Error>(self, value: &str) -> Result<i64, E> {
        match value.trim().parse::<i64>() {
            Ok(parsed) => Ok(parsed),
            Err(e) => match e.kind() {
                IntErrorKind::PosOverflow => Ok(i64::MAX),
                IntErrorKind::NegOverflow => Ok(i64::MIN),
                _ => Err(E::invalid_value(de::Unexpected::Str(value), &self)),
            },
        }
    }
}

/// Query strings carry every value as text, so parse it here rather than
/// letting an overflowing number fail the whole request.
fn saturating_i64<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    deserializer.deserialize_any(SaturatingI64)
}

impl Default for ListParams {
    fn default() -> Self {
        Self {
            skip: DEFAULT_SKIP,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl ListParams {
    pub fn new(skip: i64, limit: i64) -> Self {
        Self { skip, limit }
    }

    pub fn clamped(self) -> Self {
        let skip = if self.skip < 0 { DEFAULT_SKIP } else { self.skip };
        let limit = if (1..=MAX_LIMIT).contains(&self.limit) {
            self.limit
        } else {
            DEFAULT_LIMIT
        };
        Self { skip, limit }
    }

    pub fn offset(&self) -> i64 {
        self.clamped().skip
    }

    pub fn limit(&self) -> i64 {
        self.clamped().limit
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_range_values_are_kept() {
        let params = ListParams::new(20, 50);
        assert_eq!(params.offset(), 20);
        assert_eq!(params.limit(), 50);
    }

    #[test]
    fn test_out_of_range_values_fall_back_to_defaults() {
        let params = ListParams::new(-5, 5000);
        assert_eq!(params.offset(), DEFAULT_SKIP);
        assert_eq!(params.limit(), DEFAULT_LIMIT);
    }

    #[test]
    fn test_overflowing_values_are_clamped() {
        let params: ListParams = serde_json::from_value(serde_json::json!({
            "skip": "-99999999999999999999",
            "limit": "99999999999999999999",
        }))
        .unwrap();
        assert_eq!(params.offset(), DEFAULT_SKIP);
        assert_eq!(params.limit(), DEFAULT_LIMIT);

        let params: ListParams =
            serde_json::from_value(serde_json::json!({ "limit": u64::MAX })).unwrap();
        assert_eq!(params.limit(), DEFAULT_LIMIT);
    }

    #[test]
    fn test_non_numeric_values_are_rejected() {
        let result = serde_json::from_value::<ListParams>(serde_json::json!({ "limit": "ten" }));
        assert!(result.is_err());
    }

    #[test]
    fn test_limit_bounds_are_inclusive() {
        assert_eq!(ListParams::new(0, 1).limit(), 1);
        assert_eq!(ListParams::new(0, 1000).limit(), 1000);
        assert_eq!(ListParams::new(0, 0).limit(), DEFAULT_LIMIT);
        assert_eq!(ListParams::new(0, 1001).limit(), DEFAULT_LIMIT);
    }
}
