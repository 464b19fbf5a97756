use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error_handling::types::AuthorizationError;

/// Target geometry of the captured frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameGeometry {
    pub width: u32,
    pub height: u32,
    /// Screen density in dots per inch.
    pub density: u32,
}

/// Authorization plus frame geometry for the lifetime of one capture run.
///
/// Created by the lifecycle owner when capture is granted and consumed by
/// [`CaptureLoop::start`](crate::data_capture::recorder::CaptureLoop::start).
#[derive(Debug, Clone)]
pub struct CaptureSession {
    pub id: Uuid,
    pub token: String,
    pub geometry: FrameGeometry,
    pub granted_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl CaptureSession {
    pub fn new(token: impl Into<String>, geometry: FrameGeometry) -> Self {
        Self {
            id: Uuid::new_v4(),
            token: token.into(),
            geometry,
            granted_at: Utc::now(),
            expires_at: None,
        }
    }

    pub fn with_expiry(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    /// Checks the session is usable at `now`.
    pub fn validate_at(&self, now: DateTime<Utc>) -> Result<(), AuthorizationError> {
        if self.token.trim().is_empty() {
            return Err(AuthorizationError::MissingToken);
        }
        if let Some(expires_at) = self.expires_at {
            if expires_at <= now {
                return Err(AuthorizationError::Expired(expires_at));
            }
        }
        let FrameGeometry { width, height, .. } = self.geometry;
        if width == 0 || height == 0 {
            return Err(AuthorizationError::InvalidGeometry(format!(
                "{}x{}",
                width, height
            )));
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), AuthorizationError> {
        self.validate_at(Utc::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn geometry() -> FrameGeometry {
        FrameGeometry {
            width: 1080,
            height: 2400,
            density: 420,
        }
    }

    #[test]
    fn test_valid_session() {
        let session = CaptureSession::new("token", geometry());
        assert_eq!(session.validate(), Ok(()));
    }

    #[test]
    fn test_missing_token() {
        let session = CaptureSession::new("  ", geometry());
        assert_eq!(session.validate(), Err(AuthorizationError::MissingToken));
    }

    #[test]
    fn test_expired_session() {
        let past = Utc::now() - Duration::seconds(1);
        let session = CaptureSession::new("token", geometry()).with_expiry(past);
        assert_eq!(session.validate(), Err(AuthorizationError::Expired(past)));

        let future = Utc::now() + Duration::hours(1);
        let session = CaptureSession::new("token", geometry()).with_expiry(future);
        assert_eq!(session.validate(), Ok(()));
    }

    #[test]
    fn test_zero_geometry() {
        let session = CaptureSession::new(
            "token",
            FrameGeometry {
                width: 0,
                height: 2400,
                density: 420,
            },
        );
        assert!(matches!(
            session.validate(),
            Err(AuthorizationError::InvalidGeometry(_))
        ));
    }
}
