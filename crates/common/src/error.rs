use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Unknown label: {0}")]
    UnknownLabel(String),

    #[error("Invalid session token")]
    InvalidToken,

    #[error("Invalid username: {0}")]
    InvalidUsername(String),

    #[error("Invalid password: {0}")]
    InvalidPassword(String),

    #[error("Record {0} is already classified")]
    AlreadyClassified(u64),
}

pub type Result<T> = std::result::Result<T, Error>;
