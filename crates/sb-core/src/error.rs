use std::fmt;

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    CorruptData,
    PersistFailure,
    ParentNotFound,
    KeyNotFound,
    KeyCollision,
    InvalidPayload,
    NoOlderSibling,
    NoYoungerSibling,
    AlreadyAtRoot,
    KeyAllocationExhausted,
    InvariantViolation,
    StorageNotFound,
    StorageRead,
    ConfigInvalid,
    InvalidArgument,
}

impl ErrorKind {
    pub fn code(self) -> &'static str {
        match self {
            Self::CorruptData => "CORRUPT_DATA",
            Self::PersistFailure => "PERSIST_FAILURE",
            Self::ParentNotFound => "PARENT_NOT_FOUND",
            Self::KeyNotFound => "KEY_NOT_FOUND",
            Self::KeyCollision => "KEY_COLLISION",
            Self::InvalidPayload => "INVALID_PAYLOAD",
            Self::NoOlderSibling => "NO_OLDER_SIBLING",
            Self::NoYoungerSibling => "NO_YOUNGER_SIBLING",
            Self::AlreadyAtRoot => "ALREADY_AT_ROOT",
            Self::KeyAllocationExhausted => "KEY_ALLOCATION_EXHAUSTED",
            Self::InvariantViolation => "INVARIANT_VIOLATION",
            Self::StorageNotFound => "STORAGE_NOT_FOUND",
            Self::StorageRead => "STORAGE_READ",
            Self::ConfigInvalid => "CONFIG_INVALID",
            Self::InvalidArgument => "INVALID_ARGUMENT",
        }
    }

    /// Move and lookup preconditions the caller is expected to recover from.
    pub fn is_precondition(self) -> bool {
        matches!(
            self,
            Self::NoOlderSibling
                | Self::NoYoungerSibling
                | Self::AlreadyAtRoot
                | Self::ParentNotFound
                | Self::KeyNotFound
                | Self::KeyCollision
        )
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{kind}: {message}")]
pub struct BundleError {
    pub kind: ErrorKind,
    pub message: String,
}

impl BundleError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn corrupt(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::CorruptData, message)
    }

    pub fn persist(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::PersistFailure, message)
    }

    pub fn code(&self) -> &'static str {
        self.kind.code()
    }
}
