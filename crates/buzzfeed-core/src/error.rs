//! Feed errors

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while feeding a command stream to the device
#[derive(Error, Debug)]
pub enum FeedError {
    /// Parity code other than N, O or E
    #[error("Invalid parity '{0}': expected one of N, O, E")]
    InvalidParity(String),

    /// Data bits outside 5 to 8
    #[error("Invalid data bits {0}: expected 5, 6, 7 or 8")]
    InvalidDataBits(u8),

    /// Stop bits other than 1 or 2
    #[error("Invalid stop bits {0}: expected 1 or 2")]
    InvalidStopBits(u8),

    /// Neither inline data nor a file was given
    #[error("No data source: give inline data, a file, or both")]
    MissingSource,

    /// The device could not be opened or configured
    #[error("Could not open serial device {device}: {reason}")]
    PortOpen {
        /// Device path
        device: String,
        /// Underlying cause, kept for debug logs
        reason: String,
    },

    /// A character that is neither a hex digit nor the wait marker
    #[error("Invalid hex digit '{character}' at position {position}")]
    InvalidHexDigit {
        /// Offending character
        character: char,
        /// 1-based index among the source's significant characters
        position: usize,
    },

    /// A source ended halfway through a hex pair
    #[error("Unpaired hex digit at end of {source_name}")]
    OddLength {
        /// Name of the source, see [`crate::Source::name`]
        source_name: String,
    },

    /// The wait marker arrived between the two digits of a pair
    #[error("Wait marker at position {position} splits a hex pair")]
    DanglingMarker {
        /// 1-based index of the marker
        position: usize,
    },

    /// Payload longer than the single-byte length field allows
    #[error("Payload of {0} bytes does not fit a frame")]
    PayloadTooLarge(usize),

    /// An input file could not be opened
    #[error("Unable to open file {}", path.display())]
    SourceOpen {
        /// Path that failed to open
        path: PathBuf,
        /// I/O error from the open call
        #[source]
        source: std::io::Error,
    },

    /// Writing a frame to the device failed
    #[error("Serial write failed: {0}")]
    Write(#[source] std::io::Error),
}

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, FeedError>;

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_error_display() {
        let err = FeedError::InvalidHexDigit {
            character: 'G',
            position: 3,
        };
        assert_eq!(err.to_string(), "Invalid hex digit 'G' at position 3");

        let err = FeedError::OddLength {
            source_name: "inline data".to_string(),
        };
        assert_eq!(err.to_string(), "Unpaired hex digit at end of inline data");

        let err = FeedError::SourceOpen {
            path: PathBuf::from("tune.hex"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
        };
        assert_eq!(err.to_string(), "Unable to open file tune.hex");
        assert!(std::error::Error::source(&err).is_some());
    }
}
