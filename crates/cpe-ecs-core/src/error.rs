//! Error types for CPE → ECS enrichment
//!
//! Load failures wrap the error that caused them, so a batch error still
//! names the entry, the line and the offending record. Use [`Error::root_cause`]
//! or the `is_*` helpers to classify a wrapped error.

use std::fmt;
use thiserror::Error;

/// Result type alias for CPE → ECS operations
pub type Result<T> = std::result::Result<T, Error>;

/// Which address of a record failed to parse
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressField {
    /// The lookup key (second field)
    Cpe,
    /// The substitute subnet address (third field)
    Ecs,
}

impl fmt::Display for AddressField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AddressField::Cpe => f.write_str("cpe"),
            AddressField::Ecs => f.write_str("ecs"),
        }
    }
}

/// Core error type for CPE → ECS enrichment
#[derive(Error, Debug)]
pub enum Error {
    /// A record had a malformed address
    #[error("invalid {field} ip address {record}")]
    Parse {
        /// The address that failed
        field: AddressField,
        /// The full offending record
        record: String,
    },

    /// A line of a file source failed to parse
    #[error("invalid data at line #{line} of {origin}: {cause}")]
    InvalidLine {
        /// File path the line came from
        origin: String,
        /// 1-based line number
        line: usize,
        /// Underlying parse error
        cause: Box<Error>,
    },

    /// A record of a remote source failed to parse
    #[error("failed to load ip entry {record} from {url}: {cause}")]
    InvalidRecord {
        /// URL the record came from (without token)
        url: String,
        /// The offending record
        record: String,
        /// Underlying parse error
        cause: Box<Error>,
    },

    /// File read or HTTP transport failure
    #[error("source error ({origin}): {message}")]
    Source {
        /// File path or URL
        origin: String,
        /// Error message
        message: String,
    },

    /// Remote source answered with a status other than 200
    #[error("unexpected status {status} from {url}")]
    HttpStatus {
        /// URL that was fetched (without token)
        url: String,
        /// HTTP status code
        status: u16,
    },

    /// An entry of a batch failed to load
    #[error("failed to load ip entry {entry}: {cause}")]
    Entry {
        /// The entry descriptor
        entry: String,
        /// Underlying error
        cause: Box<Error>,
    },

    /// A file of a batch failed to load
    #[error("failed to load ip file {file}: {cause}")]
    File {
        /// The file descriptor (`path` or `path:tag`)
        file: String,
        /// Underlying error
        cause: Box<Error>,
    },

    /// Token signing failure
    #[error("Token error: {0}")]
    Token(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// The request context was cancelled
    #[error("context cancelled")]
    Cancelled,

    /// The request context deadline passed
    #[error("context deadline exceeded")]
    DeadlineExceeded,

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a parse error for `record`
    pub fn parse(field: AddressField, record: impl Into<String>) -> Self {
        Self::Parse {
            field,
            record: record.into(),
        }
    }

    /// Create a source error
    pub fn source(origin: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Source {
            origin: origin.into(),
            message: message.to_string(),
        }
    }

    /// Create a token error
    pub fn token(msg: impl Into<String>) -> Self {
        Self::Token(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Wrap `self` as the failure of line `line` of `origin`
    pub fn in_line(self, origin: impl Into<String>, line: usize) -> Self {
        Self::InvalidLine {
            origin: origin.into(),
            line,
            cause: Box::new(self),
        }
    }

    /// Wrap `self` as the failure of remote record `record`
    pub fn in_record(self, url: impl Into<String>, record: impl Into<String>) -> Self {
        Self::InvalidRecord {
            url: url.into(),
            record: record.into(),
            cause: Box::new(self),
        }
    }

    /// Wrap `self` as the failure of batch entry `entry`
    pub fn in_entry(self, entry: impl Into<String>) -> Self {
        Self::Entry {
            entry: entry.into(),
            cause: Box::new(self),
        }
    }

    /// Wrap `self` as the failure of batch file `file`
    pub fn in_file(self, file: impl Into<String>) -> Self {
        Self::File {
            file: file.into(),
            cause: Box::new(self),
        }
    }

    /// The directly wrapped error, if any
    pub fn cause(&self) -> Option<&Error> {
        match self {
            Error::InvalidLine { cause, .. }
            | Error::InvalidRecord { cause, .. }
            | Error::Entry { cause, .. }
            | Error::File { cause, .. } => Some(cause),
            _ => None,
        }
    }

    /// The innermost error of a wrapped chain
    pub fn root_cause(&self) -> &Error {
        let mut current = self;
        while let Some(next) = current.cause() {
            current = next;
        }
        current
    }

    /// Whether the root cause is a malformed record
    pub fn is_parse(&self) -> bool {
        matches!(self.root_cause(), Error::Parse { .. })
    }

    /// Whether the root cause is a file or remote source failure
    pub fn is_source(&self) -> bool {
        matches!(
            self.root_cause(),
            Error::Source { .. } | Error::HttpStatus { .. }
        )
    }

    /// Whether this is a context cancellation or deadline error
    pub fn is_cancelled(&self) -> bool {
        matches!(
            self.root_cause(),
            Error::Cancelled | Error::DeadlineExceeded
        )
    }

    /// The HTTP status carried by the root cause, if any
    pub fn status(&self) -> Option<u16> {
        match self.root_cause() {
            Error::HttpStatus { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// The line number of a file parse failure, if any
    pub fn line(&self) -> Option<usize> {
        let mut current = Some(self);
        while let Some(err) = current {
            if let Error::InvalidLine { line, .. } = err {
                return Some(*line);
            }
            current = err.cause();
        }
        None
    }
}

/// Helper for converting anyhow::Error to our Error type
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}
