use thiserror::Error;

#[derive(Error, Debug)]
pub enum FilterError {
    #[error("Invalid limit: {0}")]
    InvalidLimit(String),

    #[error("Invalid skip: {0}")]
    InvalidSkip(String),

    #[error("Invalid search: {0}")]
    InvalidSearch(String),
}
