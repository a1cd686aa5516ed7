// Error handling framework
//
// Persistence and callback failures are logged and swallowed by the engine;
// these types carry them as far as the log line. Schedule input errors are
// returned to the caller before any state is touched.

use thiserror::Error;

/// Schedule-related errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("Invalid time '{input}': {reason}")]
    InvalidTime { input: String, reason: String },

    #[error("Minute of day out of range: {0} (expected 0..=1439)")]
    MinuteOutOfRange(u32),
}

/// Key-value persistence errors
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Filesystem error: {0}")]
    FileSystemError(String),

    #[error("Invalid JSON: {0}")]
    InvalidJson(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

/// Medicine catalog errors
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Catalog source unavailable: {0}")]
    SourceUnavailable(String),

    #[error("Invalid catalog data: {0}")]
    InvalidData(String),
}

/// PIN authentication errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("PIN must be exactly {0} digits")]
    InvalidPinFormat(usize),

    #[error("Incorrect PIN")]
    InvalidCredentials,

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        StorageError::FileSystemError(err.to_string())
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::InvalidJson(err.to_string())
    }
}

impl From<std::io::Error> for CatalogError {
    fn from(err: std::io::Error) -> Self {
        CatalogError::SourceUnavailable(err.to_string())
    }
}

impl From<serde_json::Error> for CatalogError {
    fn from(err: serde_json::Error) -> Self {
        CatalogError::InvalidData(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_time_display() {
        let err = ScheduleError::InvalidTime {
            input: "25:00".to_string(),
            reason: "hour out of range".to_string(),
        };
        assert!(err.to_string().contains("Invalid time '25:00'"));
    }

    #[test]
    fn test_io_error_maps_to_filesystem_error() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: StorageError = io.into();
        assert!(matches!(err, StorageError::FileSystemError(_)));
    }

    #[test]
    fn test_json_error_maps_to_invalid_data() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: CatalogError = json_err.into();
        assert!(err.to_string().contains("Invalid catalog data"));
    }

    #[test]
    fn test_pin_format_error_mentions_length() {
        assert_eq!(
            AuthError::InvalidPinFormat(4).to_string(),
            "PIN must be exactly 4 digits"
        );
    }
}
