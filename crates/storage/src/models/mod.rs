pub mod workout;

pub use workout::{GetupWorkoutType, SwingStyle, SwingWorkoutType, UnknownVariant, Workout};
