use thiserror::Error;

pub type Result<T> = std::result::Result<T, TreeError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TreeError {
    #[error("invalid parameter {0}")]
    Parameters(String),
    /// Imputation needs at least one known value per column
    #[error("column {0} has no known value to impute from")]
    NoKnownValues(usize),
    #[error(transparent)]
    BaseCrate(#[from] sylva::Error),
}
