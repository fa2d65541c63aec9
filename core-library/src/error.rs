use thiserror::Error;

#[derive(Error, Debug)]
pub enum LibraryError {
    #[error("Record has no usable identifier: {0}")]
    MissingIdentifier(String),

    #[error("Invalid input: {field} - {message}")]
    InvalidInput { field: String, message: String },

    #[error("Malformed {what}: {message}")]
    Malformed { what: String, message: String },
}

pub type Result<T> = std::result::Result<T, LibraryError>;
