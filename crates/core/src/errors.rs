use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("Unknown permission level: {0}")]
    UnknownPermission(String),

    #[error("Invalid permission code: {0}")]
    InvalidPermissionCode(i64),

    #[error("Unknown entity kind: {0}")]
    UnknownEntityKind(String),

    #[error("Invalid entity type code: {0}")]
    InvalidEntityCode(u8),

    #[error("Unknown entity family: {0}")]
    UnknownEntityFamily(String),

    #[error("Empty subject: {0}")]
    EmptySubject(&'static str),
}

pub type Result<T> = std::result::Result<T, Error>;
