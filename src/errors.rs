use std::io;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, StreamError>;

#[derive(Error, Debug)]
pub enum StreamError {
    #[error("IO error: {0}")]
    Io(#[source] io::Error),
    #[error("Stream is not readable")]
    NotReadable,
    #[error("Stream is not writable")]
    NotWritable,
    #[error("Operation on a closed stream")]
    Closed,
    #[error("Invalid URI {0}: {1}")]
    InvalidUri(String, String),
    #[error("No backend registered for scheme {0}")]
    UnsupportedScheme(String),
    #[error("Buffer size must be positive, got {0}")]
    InvalidBufferSize(usize),
    #[error("Character {0:?} cannot be encoded as ISO-8859-1")]
    Unencodable(char),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("{error}; closing the stream also failed: {close}")]
    Cleanup {
        error: Box<StreamError>,
        close: Box<StreamError>,
    },
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl StreamError {
    /// Programmer errors, as opposed to failures reported by a backend.
    pub fn is_misuse(&self) -> bool {
        matches!(
            self,
            StreamError::NotReadable
                | StreamError::NotWritable
                | StreamError::Closed
        )
    }

    /// Merge the outcome of an operation with the outcome of the close
    /// that followed it. Neither failure is dropped.
    pub fn combine<T>(outcome: Result<T>, closed: Result<()>) -> Result<T> {
        match (outcome, closed) {
            (Ok(value), Ok(())) => Ok(value),
            (Ok(_), Err(close)) => Err(close),
            (Err(error), Ok(())) => Err(error),
            (Err(error), Err(close)) => Err(StreamError::Cleanup {
                error: Box::new(error),
                close: Box::new(close),
            }),
        }
    }

    fn io_kind(&self) -> io::ErrorKind {
        match self {
            StreamError::Io(err) => err.kind(),
            StreamError::NotReadable
            | StreamError::NotWritable
            | StreamError::Closed
            | StreamError::UnsupportedScheme(_) => io::ErrorKind::Unsupported,
            StreamError::InvalidUri(..)
            | StreamError::InvalidBufferSize(_)
            | StreamError::Unencodable(_) => io::ErrorKind::InvalidInput,
            StreamError::Cleanup { error, .. } => error.io_kind(),
            StreamError::Config(_) | StreamError::Other(_) => {
                io::ErrorKind::Other
            }
        }
    }
}

impl From<io::Error> for StreamError {
    fn from(err: io::Error) -> Self {
        let wrapped = err
            .get_ref()
            .map_or(false, |inner| inner.is::<StreamError>());
        if !wrapped {
            return StreamError::Io(err);
        }

        let kind = err.kind();
        match err.into_inner() {
            Some(inner) => match inner.downcast::<StreamError>() {
                Ok(stream_error) => *stream_error,
                Err(other) => StreamError::Io(io::Error::new(kind, other)),
            },
            None => StreamError::Io(io::Error::from(kind)),
        }
    }
}

impl From<StreamError> for io::Error {
    fn from(err: StreamError) -> Self {
        match err {
            StreamError::Io(err) => err,
            other => io::Error::new(other.io_kind(), other),
        }
    }
}

impl From<serde_json::Error> for StreamError {
    fn from(err: serde_json::Error) -> Self {
        Self::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn misuse_survives_io_round_trip() {
        let io_error: io::Error = StreamError::Closed.into();
        assert_eq!(io_error.kind(), io::ErrorKind::Unsupported);

        let back = StreamError::from(io_error);
        assert!(matches!(back, StreamError::Closed));
        assert!(back.is_misuse());
    }

    #[test]
    fn backend_error_is_passed_verbatim() {
        let original =
            io::Error::new(io::ErrorKind::PermissionDenied, "access denied");
        let err = StreamError::from(original);
        assert!(!err.is_misuse());

        let io_error: io::Error = err.into();
        assert_eq!(io_error.kind(), io::ErrorKind::PermissionDenied);
        assert_eq!(io_error.to_string(), "access denied");
    }

    #[test]
    fn combine_keeps_both_failures() {
        let outcome: Result<()> = Err(StreamError::Io(io::Error::new(
            io::ErrorKind::ConnectionReset,
            "reset",
        )));
        let closed = Err(StreamError::Io(io::Error::new(
            io::ErrorKind::BrokenPipe,
            "broken",
        )));

        match StreamError::combine(outcome, closed) {
            Err(StreamError::Cleanup { error, close }) => {
                assert!(error.to_string().contains("reset"));
                assert!(close.to_string().contains("broken"));
            }
            other => panic!("unexpected outcome: {:?}", other),
        }

        assert_eq!(StreamError::combine(Ok(5), Ok(())).unwrap(), 5);
        assert!(matches!(
            StreamError::combine(Ok(5), Err(StreamError::Closed)),
            Err(StreamError::Closed)
        ));
    }
}
