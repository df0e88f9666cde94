use thiserror::Error;

#[derive(Debug, Error)]
#[error(transparent)]
pub struct Error(Box<ErrorKind>);

impl Error {
    pub fn kind(&self) -> &ErrorKind {
        self.0.as_ref()
    }

    pub fn into_kind(self) -> ErrorKind {
        *self.0
    }

    pub fn invalid_alignment(
        alignment: usize,
        element_size: usize,
        reason: impl Into<String>,
    ) -> Error {
        Error(
            ErrorKind::InvalidAlignment {
                alignment,
                element_size,
                reason: reason.into(),
            }
            .into(),
        )
    }

    pub fn allocation_failed(bytes: usize, alignment: usize, source: std::io::Error) -> Error {
        Error(
            ErrorKind::AllocationFailed {
                bytes,
                alignment,
                source,
            }
            .into(),
        )
    }

    pub fn capacity_overflow(length: usize, element_size: usize) -> Error {
        Error(
            ErrorKind::CapacityOverflow {
                length,
                element_size,
            }
            .into(),
        )
    }

    /// Returns `true` if the error was raised before any memory was requested
    /// from the allocator.
    pub fn is_usage_error(&self) -> bool {
        !matches!(self.kind(), ErrorKind::AllocationFailed { .. })
    }
}

#[derive(Debug, Error)]
pub enum ErrorKind {
    #[error("invalid alignment {alignment} for element size {element_size}: {reason}")]
    InvalidAlignment {
        alignment: usize,
        element_size: usize,
        reason: String,
    },

    #[error("failed to allocate {bytes} bytes (alignment {alignment}): {source}")]
    AllocationFailed {
        bytes: usize,
        alignment: usize,
        source: std::io::Error,
    },

    #[error("allocation of {length} elements of {element_size} bytes overflows usize")]
    CapacityOverflow { length: usize, element_size: usize },
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Error(kind.into())
    }
}
