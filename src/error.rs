use std::error::Error as ErrorTrait;
use std::fmt::Display;

///
/// Contains information about an error occurence
///
#[derive(Debug)]
pub struct Error {
    /// The type of this error
    pub kind: ErrorKind,
    /// Some errors come with more context
    pub context: Option<String>,
}

impl Error {
    pub(crate) fn new(kind: ErrorKind) -> Error {
        Error {
            kind,
            context: None,
        }
    }

    pub(crate) fn new_with_context(kind: ErrorKind, context: impl Display) -> Error {
        Error {
            kind,
            context: Some(context.to_string()),
        }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} (context: {})",
            self.kind.description(),
            self.context.as_deref().unwrap_or("none")
        )
    }
}

impl ErrorTrait for Error {}

///
/// The type of an error
///
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// The server is not running
    ServerFailure,
    /// A lock can't be bypassed
    Deadlock,
    /// The listening socket could not be bound
    BindFailure,
    /// The incoming request could not be read
    MalformedRequest,
    /// No registered stub accepted the incoming request
    NoMatchingStub,
    /// The journal doesn't hold the expected amount of matching requests
    VerificationFailure,
    /// Could not deliver a response
    ResponseFailure,
    /// The status code is invalid or out of range
    InvalidStatusCode,
    /// A regular expression could not be compiled
    InvalidRegex,
    /// File not found
    FileNotFound,
}

impl ErrorKind {
    fn description(&self) -> &'static str {
        match self {
            ErrorKind::ServerFailure => "the server is not running",
            ErrorKind::Deadlock => "a lock can't be bypassed",
            ErrorKind::BindFailure => "could not bind the server address",
            ErrorKind::MalformedRequest => "the request could not be read",
            ErrorKind::NoMatchingStub => "no stub matched the request",
            ErrorKind::VerificationFailure => "request verification failed",
            ErrorKind::ResponseFailure => "could not deliver a response",
            ErrorKind::InvalidStatusCode => "invalid status code",
            ErrorKind::InvalidRegex => "invalid regular expression",
            ErrorKind::FileNotFound => "file not found",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_without_context() {
        let error = Error::new(ErrorKind::Deadlock);

        assert_eq!("a lock can't be bypassed (context: none)", error.to_string());
    }

    #[test]
    fn test_display_with_context() {
        let error = Error::new_with_context(ErrorKind::BindFailure, "127.0.0.1:1");

        assert_eq!(
            "could not bind the server address (context: 127.0.0.1:1)",
            error.to_string()
        );
    }
}
