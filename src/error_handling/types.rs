use std::fmt;

use chrono::{DateTime, Utc};

#[derive(Debug)]
pub enum ConfigError {
    IoError(std::io::Error),
    TomlError(String),
    NotADirectory(String),
    NotInRange(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "IO error: {}", e),
            ConfigError::TomlError(e) => write!(f, "TOML parsing error: {}", e),
            ConfigError::NotADirectory(e) => write!(f, "Directory error: {}", e),
            ConfigError::NotInRange(e) => write!(f, "Value out of range: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::IoError(err)
    }
}

#[derive(Debug)]
pub enum StorageError {
    /// The content directory could not be created or opened.
    InitFailed(std::io::Error),
    WriteFailed(std::io::Error),
    ReadFailed(std::io::Error),
    /// The requested name is not a flat artifact name.
    InvalidName(String),
    NotFound(String),
}

impl StorageError {
    /// Errors a client caused by asking for something that is not there.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::NotFound(_) | StorageError::InvalidName(_))
    }
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::InitFailed(e) => write!(f, "Storage initialization failed: {}", e),
            StorageError::WriteFailed(e) => write!(f, "Storage write failed: {}", e),
            StorageError::ReadFailed(e) => write!(f, "Storage read failed: {}", e),
            StorageError::InvalidName(name) => write!(f, "Invalid artifact name: {:?}", name),
            StorageError::NotFound(name) => write!(f, "Artifact not found: {}", name),
        }
    }
}

impl std::error::Error for StorageError {}

/// Failure of a single capture tick. Never fatal to the capture loop.
#[derive(Debug)]
pub enum CaptureError {
    FrameSourceError(String),
    StrideMismatch(String),
    EncodeError(String),
    StorageError(StorageError),
}

impl fmt::Display for CaptureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptureError::FrameSourceError(e) => write!(f, "Frame source error: {}", e),
            CaptureError::StrideMismatch(e) => write!(f, "Frame layout error: {}", e),
            CaptureError::EncodeError(e) => write!(f, "Image encoding error: {}", e),
            CaptureError::StorageError(e) => write!(f, "Capture storage error: {}", e),
        }
    }
}

impl std::error::Error for CaptureError {}

impl From<StorageError> for CaptureError {
    fn from(err: StorageError) -> Self {
        CaptureError::StorageError(err)
    }
}

impl From<image::ImageError> for CaptureError {
    fn from(err: image::ImageError) -> Self {
        CaptureError::EncodeError(err.to_string())
    }
}

#[derive(Debug, PartialEq)]
pub enum AuthorizationError {
    MissingToken,
    Expired(DateTime<Utc>),
    InvalidGeometry(String),
    /// The screen provider refused the session.
    Rejected(String),
}

impl fmt::Display for AuthorizationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthorizationError::MissingToken => write!(f, "Capture session has no token"),
            AuthorizationError::Expired(at) => {
                write!(f, "Capture session expired at {}", at.to_rfc3339())
            }
            AuthorizationError::InvalidGeometry(e) => write!(f, "Invalid capture geometry: {}", e),
            AuthorizationError::Rejected(e) => write!(f, "Capture authorization rejected: {}", e),
        }
    }
}

impl std::error::Error for AuthorizationError {}

#[derive(Debug)]
pub enum WebError {
    BindError(String),
    AlreadyRunning,
}

impl fmt::Display for WebError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WebError::BindError(e) => write!(f, "Web server bind error: {}", e),
            WebError::AlreadyRunning => write!(f, "Web server is already running"),
        }
    }
}

impl std::error::Error for WebError {}

#[derive(Debug)]
pub enum ControllerError {
    ConfigurationError(ConfigError),
    StorageError(StorageError),
    AuthorizationError(AuthorizationError),
    WebError(WebError),
    SignalError(std::io::Error),
}

impl fmt::Display for ControllerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControllerError::ConfigurationError(e) => write!(f, "Configuration error: {}", e),
            ControllerError::StorageError(e) => write!(f, "Storage error: {}", e),
            ControllerError::AuthorizationError(e) => write!(f, "Authorization error: {}", e),
            ControllerError::WebError(e) => write!(f, "Web error: {}", e),
            ControllerError::SignalError(e) => write!(f, "Signal handling error: {}", e),
        }
    }
}

impl std::error::Error for ControllerError {}

impl From<ConfigError> for ControllerError {
    fn from(err: ConfigError) -> Self {
        ControllerError::ConfigurationError(err)
    }
}

impl From<StorageError> for ControllerError {
    fn from(err: StorageError) -> Self {
        ControllerError::StorageError(err)
    }
}

impl From<AuthorizationError> for ControllerError {
    fn from(err: AuthorizationError) -> Self {
        ControllerError::AuthorizationError(err)
    }
}

impl From<WebError> for ControllerError {
    fn from(err: WebError) -> Self {
        ControllerError::WebError(err)
    }
}
