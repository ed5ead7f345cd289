//! Error taxonomy for location acquisition and facility search.
//!
//! Every variant's `Display` text is the user-facing message shown by the
//! error card; transport detail is carried separately and only logged.
//! An empty result set is a valid state ([`crate::state::LoadState::Empty`]),
//! not an error.

use thiserror::Error;

/// Failures surfaced by the facility-discovery core.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FindError {
    /// The device exposes no geolocation capability.
    #[error("Location is not supported. Please enter your city or pincode.")]
    LocationUnsupported,
    /// No fix arrived within the overall acquisition window.
    #[error("Location is taking too long. Enter your city or pincode.")]
    LocationTimeout,
    /// The user refused the location permission prompt.
    #[error("Location permission denied. Enter your city or pincode.")]
    LocationDenied,
    /// The search request exceeded its deadline.
    #[error("Unable to load facilities right now. Please try again.")]
    NetworkTimeout,
    /// Transport error or non-success status from the backend. The payload
    /// holds the transport detail for logging.
    #[error("Unable to load facilities right now. Please try again.")]
    NetworkFailure(String),
}

impl FindError {
    /// Whether this error came from location acquisition (as opposed to the
    /// network). Location errors surface immediately with the manual-entry
    /// affordance; network errors go through the cache-fallback path first.
    #[must_use]
    pub fn is_location(&self) -> bool {
        matches!(
            self,
            Self::LocationUnsupported | Self::LocationTimeout | Self::LocationDenied
        )
    }

    /// Transport detail for network failures, if any.
    #[must_use]
    pub fn detail(&self) -> Option<&str> {
        match self {
            Self::NetworkFailure(detail) => Some(detail),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::FindError;

    #[test]
    fn network_errors_share_the_generic_user_message() {
        let timeout = FindError::NetworkTimeout.to_string();
        let failure = FindError::NetworkFailure("status 503".into()).to_string();
        assert_eq!(timeout, failure);
        assert!(timeout.starts_with("Unable to load facilities"));
    }

    #[test]
    fn location_errors_are_classified() {
        assert!(FindError::LocationDenied.is_location());
        assert!(FindError::LocationTimeout.is_location());
        assert!(FindError::LocationUnsupported.is_location());
        assert!(!FindError::NetworkTimeout.is_location());
        assert_eq!(
            FindError::NetworkFailure("x".into()).detail(),
            Some("x")
        );
        assert_eq!(FindError::LocationDenied.detail(), None);
    }
}
