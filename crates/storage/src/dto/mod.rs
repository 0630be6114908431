pub mod common;
pub mod workout;
