//! Error types for the retropsp binding

use thiserror::Error;

/// Main error type for the binding
#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Negotiation error: {0}")]
    Negotiation(#[from] NegotiationError),

    #[error("Init error: {0}")]
    Init(#[from] InitError),

    #[error("Settings error: {0}")]
    Settings(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// The host refused something the session cannot run without
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NegotiationError {
    #[error("Pixel format {0} rejected by host")]
    PixelFormat(&'static str),

    #[error("Hardware render context {0} rejected by host")]
    HwRender(&'static str),
}

/// Failures of the deferred bring-up on the first frame
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InitError {
    #[error("Graphics context bring-up failed: {0}")]
    Graphics(String),

    #[error("Core init failed: {0}")]
    Core(String),
}

/// Result type alias for binding operations
pub type Result<T> = std::result::Result<T, BridgeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = NegotiationError::PixelFormat("XRGB8888");
        assert_eq!(format!("{}", err), "Pixel format XRGB8888 rejected by host");

        let err = InitError::Core("no disc".to_string());
        assert_eq!(format!("{}", err), "Core init failed: no disc");
    }

    #[test]
    fn test_error_conversion() {
        let err: BridgeError = NegotiationError::HwRender("OpenGL").into();
        assert!(matches!(err, BridgeError::Negotiation(_)));

        let err: BridgeError = InitError::Graphics("no loader".to_string()).into();
        assert_eq!(
            format!("{}", err),
            "Init error: Graphics context bring-up failed: no loader"
        );
    }
}
