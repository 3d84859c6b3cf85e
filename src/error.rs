pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid interval: [{start}, {end})")]
    InvalidInterval { start: i64, end: i64 },

    #[error(
        "unsorted input: record at {reference_id}:{start} follows {previous_reference_id}:{previous_start}"
    )]
    UnsortedInput {
        previous_reference_id: usize,
        previous_start: i64,
        reference_id: usize,
        start: i64,
    },

    #[error("invalid range: {0}")]
    InvalidRange(String),

    #[error("corrupt index: {0}")]
    CorruptIndex(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Stable name of the error kind, used in logs and CLI output.
    pub fn error_type(&self) -> &'static str {
        match self {
            Error::InvalidInterval { .. } => "InvalidInterval",
            Error::UnsortedInput { .. } => "UnsortedInput",
            Error::InvalidRange(_) => "InvalidRange",
            Error::CorruptIndex(_) => "CorruptIndex",
            Error::NotFound(_) => "NotFound",
            Error::Io(_) | Error::Internal(_) => "InternalError",
        }
    }

    /// Whether the error aborts an index build.
    pub fn is_build_fatal(&self) -> bool {
        matches!(
            self,
            Error::InvalidInterval { .. } | Error::UnsortedInput { .. } | Error::InvalidRange(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_type_names() {
        assert_eq!(
            Error::InvalidInterval { start: 5, end: 1 }.error_type(),
            "InvalidInterval"
        );
        assert_eq!(Error::CorruptIndex("x".into()).error_type(), "CorruptIndex");
        let io = Error::from(std::io::Error::other("disk"));
        assert_eq!(io.error_type(), "InternalError");
    }

    #[test]
    fn test_unsorted_message() {
        let err = Error::UnsortedInput {
            previous_reference_id: 0,
            previous_start: 500,
            reference_id: 0,
            start: 100,
        };
        assert_eq!(
            err.to_string(),
            "unsorted input: record at 0:100 follows 0:500"
        );
        assert!(err.is_build_fatal());
    }
}
