//! One-shot device location lookup.
//!
//! [`GeolocationResolver`] asks a [`PositionProvider`] for a single fix and
//! turns every failure mode into [`MapError::LocationUnavailable`]. It never
//! watches for updates and never retries; substituting a fallback center is
//! the caller's job.

use std::future::Future;
use std::time::Duration;

use goodstore_core::Coordinate;

use crate::error::MapError;

/// Options passed through to the platform's current-position call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionOptions {
    pub enable_high_accuracy: bool,
    pub timeout: Duration,
    pub maximum_age: Duration,
}

/// A raw fix as reported by the platform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    pub latitude: f64,
    pub longitude: f64,
    /// Accuracy radius in meters, when reported.
    pub accuracy: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionErrorCode {
    PermissionDenied,
    PositionUnavailable,
    Timeout,
    Unsupported,
}

impl std::fmt::Display for PositionErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PositionErrorCode::PermissionDenied => write!(f, "permission denied"),
            PositionErrorCode::PositionUnavailable => write!(f, "position unavailable"),
            PositionErrorCode::Timeout => write!(f, "timed out"),
            PositionErrorCode::Unsupported => write!(f, "geolocation unsupported"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositionError {
    pub code: PositionErrorCode,
    pub message: String,
}

impl PositionError {
    #[must_use]
    pub fn new(code: PositionErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// The platform's current-position facility.
///
/// Implementations complete the returned future exactly once, with either a
/// fix or an error.
pub trait PositionProvider: Send + Sync {
    fn current_position(
        &self,
        options: PositionOptions,
    ) -> impl Future<Output = Result<Position, PositionError>> + Send;
}

pub struct GeolocationResolver<P> {
    provider: P,
}

impl<P: PositionProvider> GeolocationResolver<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Requests one high-accuracy fix.
    ///
    /// The provider receives `timeout` itself, and the resolver also bounds the
    /// wait so a provider that never calls back still fails on time.
    ///
    /// # Errors
    ///
    /// Returns [`MapError::LocationUnavailable`] on permission denial, timeout,
    /// missing or invalid position, or an unsupported platform.
    pub async fn resolve(
        &self,
        timeout: Duration,
        max_cache_age: Duration,
    ) -> Result<Coordinate, MapError> {
        let options = PositionOptions {
            enable_high_accuracy: true,
            timeout,
            maximum_age: max_cache_age,
        };

        let outcome = tokio::time::timeout(timeout, self.provider.current_position(options)).await;

        let position = match outcome {
            Ok(Ok(position)) => position,
            Ok(Err(e)) => {
                tracing::debug!(code = %e.code, message = %e.message, "geolocation request failed");
                return Err(MapError::LocationUnavailable(e.code));
            }
            Err(_) => {
                tracing::debug!(
                    timeout_ms = timeout.as_millis(),
                    "geolocation provider did not answer in time"
                );
                return Err(MapError::LocationUnavailable(PositionErrorCode::Timeout));
            }
        };

        Coordinate::new(position.latitude, position.longitude).map_err(|e| {
            tracing::debug!(error = %e, "geolocation provider returned an invalid fix");
            MapError::LocationUnavailable(PositionErrorCode::PositionUnavailable)
        })
    }
}
