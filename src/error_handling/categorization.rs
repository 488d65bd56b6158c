//! Error categorization.

use super::types::{Error, ErrorKind};

impl Error {
    /// Categorizes the error.
    ///
    /// I/O errors are transport errors, except `InvalidData` and `InvalidInput`,
    /// which is what the decompressors report for a corrupt body.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::UnsupportedScheme(_)
            | Error::InvalidUrl(_)
            | Error::InvalidMethod(_)
            | Error::InvalidHeader { .. }
            | Error::InvalidTimeout(_)
            | Error::UnsupportedCharset(_)
            | Error::InvalidDelimiter(_)
            | Error::ConflictingBody => ErrorKind::Configuration,
            Error::TooManyRedirects { .. } | Error::Transport(_) => ErrorKind::Transport,
            Error::Io(e)
                if matches!(
                    e.kind(),
                    std::io::ErrorKind::InvalidData | std::io::ErrorKind::InvalidInput
                ) =>
            {
                ErrorKind::Decoding
            }
            Error::Io(_) => ErrorKind::Transport,
            Error::Json(_) => ErrorKind::Decoding,
            Error::MethodMismatch { .. } | Error::BodyConsumed | Error::InconsistentState(_) => {
                ErrorKind::Invariant
            }
        }
    }

    /// Returns `true` if the error is a transport timeout.
    ///
    /// Timeouts surface either as a `reqwest::Error` (connect phase) or as an I/O
    /// error while reading the body (read phase).
    pub fn is_timeout(&self) -> bool {
        match self {
            Error::Transport(e) => e.is_timeout(),
            Error::Io(e) => {
                e.kind() == std::io::ErrorKind::TimedOut
                    || e.get_ref()
                        .and_then(|inner| inner.downcast_ref::<reqwest::Error>())
                        .is_some_and(|inner| inner.is_timeout())
            }
            _ => false,
        }
    }

    /// Returns `true` if the error was raised before any network I/O.
    pub fn is_configuration(&self) -> bool {
        self.kind() == ErrorKind::Configuration
    }
}
