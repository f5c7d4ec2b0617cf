//! Error types in Sylva
//!

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("invalid parameter {0}")]
    Parameters(String),
    #[error("records have {0} rows but targets have {1}")]
    MismatchedShapes(usize, usize),
    #[error("column {0} is continuous, only nominal columns are supported")]
    ContinuousColumn(usize),
    #[error("value {value} in column {col} is not a nominal code")]
    InvalidCode { col: usize, value: f64 },
    #[error("target {0} is not a class code")]
    InvalidTarget(f64),
    #[error("Not enough samples")]
    NotEnoughSamples,
}
