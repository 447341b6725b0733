use crate::error::HandlerError;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumIter};

/// Coarse error classification returned to clients for fast branching.
///
/// The discriminants are part of the wire contract: the JSON document carries
/// the integer value, never the name.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display, AsRefStr, EnumIter,
)]
#[serde(into = "u8", try_from = "u8")]
#[repr(u8)]
pub enum ErrorKind {
    /// Fall-back when the error type could not be set.
    #[default]
    Undetermined = 0,
    /// Failure while processing a request.
    ServerError = 1,
    /// Malformed request: missing or default values for key elements.
    RequestError = 2,
    /// Request data failed validation; see `validationErrors`.
    DataValidationError = 3,
    ConfigurationError = 4,
    /// An external dependency misbehaved.
    ExternalError = 5,
    NotImplemented = 9,
    SecurityError = 10,
    /// Authorization failure.
    AccessRestrictedError = 11,
    /// Connection dropped or otherwise interrupted.
    NetworkError = 18,
    StorageError = 20,
    /// Update hit data that was already modified.
    StorageConcurrencyError = 21,
    /// Operation was cancelled, usually through a cancellation token or a dropped task.
    CancelledOperation = 30,
}

impl From<ErrorKind> for u8 {
    fn from(kind: ErrorKind) -> Self {
        kind as u8
    }
}

impl TryFrom<u8> for ErrorKind {
    type Error = HandlerError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        let kind = match value {
            0 => ErrorKind::Undetermined,
            1 => ErrorKind::ServerError,
            2 => ErrorKind::RequestError,
            3 => ErrorKind::DataValidationError,
            4 => ErrorKind::ConfigurationError,
            5 => ErrorKind::ExternalError,
            9 => ErrorKind::NotImplemented,
            10 => ErrorKind::SecurityError,
            11 => ErrorKind::AccessRestrictedError,
            18 => ErrorKind::NetworkError,
            20 => ErrorKind::StorageError,
            21 => ErrorKind::StorageConcurrencyError,
            30 => ErrorKind::CancelledOperation,
            other => return Err(HandlerError::UnknownErrorKind(other)),
        };
        Ok(kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_discriminants_are_stable() {
        assert_eq!(u8::from(ErrorKind::Undetermined), 0);
        assert_eq!(u8::from(ErrorKind::DataValidationError), 3);
        assert_eq!(u8::from(ErrorKind::NotImplemented), 9);
        assert_eq!(u8::from(ErrorKind::NetworkError), 18);
        assert_eq!(u8::from(ErrorKind::StorageConcurrencyError), 21);
        assert_eq!(u8::from(ErrorKind::CancelledOperation), 30);
    }

    #[test]
    fn test_every_kind_converts_back_from_its_discriminant() {
        for kind in ErrorKind::iter() {
            assert_eq!(ErrorKind::try_from(u8::from(kind)).unwrap(), kind);
        }
        assert_eq!(ErrorKind::iter().count(), 13);
    }

    #[test]
    fn test_unknown_discriminant_is_rejected() {
        let err = ErrorKind::try_from(6).unwrap_err();
        assert!(matches!(err, HandlerError::UnknownErrorKind(6)));
        assert!(serde_json::from_str::<ErrorKind>("42").is_err());
    }

    #[test]
    fn test_serializes_as_integer() {
        assert_eq!(serde_json::to_string(&ErrorKind::ServerError).unwrap(), "1");
        assert_eq!(ErrorKind::ServerError.to_string(), "ServerError");
        assert_eq!(ErrorKind::CancelledOperation.as_ref(), "CancelledOperation");
    }
}
