use std::fmt;
use std::ops::{BitOr, BitOrAssign};

/// What the exception interceptor does with a classified failure.
///
/// A bit set: [`LOG_ERROR`](Self::LOG_ERROR) and
/// [`RESPOND_WITH_ERROR`](Self::RESPOND_WITH_ERROR) combine into
/// [`LOG_AND_THROW_ERROR`](Self::LOG_AND_THROW_ERROR), the default.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ErrorBehavior(u8);

impl ErrorBehavior {
    /// Neither logged nor returned to the client.
    pub const IGNORE: Self = Self(0);
    /// Logged at error severity through `tracing`.
    pub const LOG_ERROR: Self = Self(1);
    /// Returned to the client as a JSON error document.
    pub const RESPOND_WITH_ERROR: Self = Self(2);
    /// Logged and returned.
    pub const LOG_AND_THROW_ERROR: Self = Self(Self::LOG_ERROR.0 | Self::RESPOND_WITH_ERROR.0);

    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Builds a behavior from raw bits, dropping unknown ones.
    pub const fn from_bits_truncate(bits: u8) -> Self {
        Self(bits & Self::LOG_AND_THROW_ERROR.0)
    }

    /// True when every bit of `other` is set in `self`.
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn is_ignore(self) -> bool {
        self.0 == 0
    }

    pub const fn should_log(self) -> bool {
        self.contains(Self::LOG_ERROR)
    }

    pub const fn should_respond(self) -> bool {
        self.contains(Self::RESPOND_WITH_ERROR)
    }
}

impl Default for ErrorBehavior {
    fn default() -> Self {
        Self::LOG_AND_THROW_ERROR
    }
}

impl BitOr for ErrorBehavior {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for ErrorBehavior {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl fmt::Debug for ErrorBehavior {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.should_log(), self.should_respond()) {
            (false, false) => f.write_str("Ignore"),
            (true, false) => f.write_str("LogError"),
            (false, true) => f.write_str("RespondWithError"),
            (true, true) => f.write_str("LogError | RespondWithError"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_logs_and_responds() {
        let behavior = ErrorBehavior::default();
        assert_eq!(behavior, ErrorBehavior::LOG_AND_THROW_ERROR);
        assert!(behavior.should_log());
        assert!(behavior.should_respond());
        assert_eq!(behavior.bits(), 3);
    }

    #[test]
    fn test_flags_combine() {
        let mut behavior = ErrorBehavior::IGNORE;
        assert!(behavior.is_ignore());
        assert!(!behavior.should_log());

        behavior |= ErrorBehavior::RESPOND_WITH_ERROR;
        assert!(behavior.should_respond());
        assert!(!behavior.should_log());

        assert_eq!(
            ErrorBehavior::LOG_ERROR | ErrorBehavior::RESPOND_WITH_ERROR,
            ErrorBehavior::LOG_AND_THROW_ERROR
        );
    }

    #[test]
    fn test_unknown_bits_are_dropped() {
        assert_eq!(ErrorBehavior::from_bits_truncate(0b1111), ErrorBehavior::LOG_AND_THROW_ERROR);
        assert_eq!(format!("{:?}", ErrorBehavior::from_bits_truncate(1)), "LogError");
    }
}
