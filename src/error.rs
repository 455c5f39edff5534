//! Compose pipeline error types
//!
//! Two-tier taxonomy: `ComposeError` is fatal and stops the pipeline before
//! any canvas mutation; `ComposeWarning` covers conditions the pipeline
//! degrades through (a skipped overlay, a fallback font, overflowing text).
//! The caller always receives a best-effort image unless a `ComposeError`
//! was raised.

use std::fmt;

/// Errors that abort a compose run
#[derive(Debug, Clone)]
pub enum ComposeError {
    /// Zero/negative size or a crop box that degenerates after clipping
    InvalidDimension {
        width: u32,
        height: u32,
        reason: String,
    },

    /// Failed to decode input image data
    DecodeFailed { message: String },

    /// Encoding to the output format failed
    EncodeFailed { format: String, message: String },

    /// Invalid pipeline parameter
    InvalidParameter { param: String, message: String },

    /// Text rasterization failed
    RenderFailed { message: String },
}

impl fmt::Display for ComposeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComposeError::InvalidDimension {
                width,
                height,
                reason,
            } => {
                write!(f, "Invalid dimensions {}x{}: {}", width, height, reason)
            }
            ComposeError::DecodeFailed { message } => {
                write!(f, "Failed to decode image: {}", message)
            }
            ComposeError::EncodeFailed { format, message } => {
                write!(f, "Failed to encode to {}: {}", format, message)
            }
            ComposeError::InvalidParameter { param, message } => {
                write!(f, "Invalid parameter '{}': {}", param, message)
            }
            ComposeError::RenderFailed { message } => {
                write!(f, "Failed to render text: {}", message)
            }
        }
    }
}

impl std::error::Error for ComposeError {}

impl ComposeError {
    /// Helper constructors for common error patterns
    pub fn invalid_dimension(width: u32, height: u32, reason: impl Into<String>) -> Self {
        ComposeError::InvalidDimension {
            width,
            height,
            reason: reason.into(),
        }
    }

    pub fn decode_failed(message: impl Into<String>) -> Self {
        ComposeError::DecodeFailed {
            message: message.into(),
        }
    }

    pub fn encode_failed(format: impl Into<String>, message: impl Into<String>) -> Self {
        ComposeError::EncodeFailed {
            format: format.into(),
            message: message.into(),
        }
    }

    pub fn invalid_param(param: impl Into<String>, message: impl Into<String>) -> Self {
        ComposeError::InvalidParameter {
            param: param.into(),
            message: message.into(),
        }
    }

    pub fn render_failed(message: impl Into<String>) -> Self {
        ComposeError::RenderFailed {
            message: message.into(),
        }
    }
}

/// Non-fatal conditions surfaced alongside the composed image.
///
/// Warnings are collected in pipeline order and also emitted as
/// `tracing::warn!` events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComposeWarning {
    /// A fixed overlay asset could not be loaded; the overlay was skipped
    MissingAsset { path: String },

    /// A requested font face was unavailable; the embedded default was used
    FontFallback { requested: String },

    /// Rendered text exceeds its allotted region height; output is
    /// produced unclipped
    TextOverflow {
        region: String,
        text_height: u32,
        region_height: u32,
    },
}

impl fmt::Display for ComposeWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComposeWarning::MissingAsset { path } => {
                write!(f, "Overlay asset unavailable, skipped: {}", path)
            }
            ComposeWarning::FontFallback { requested } => {
                write!(f, "Font '{}' unavailable, using embedded default", requested)
            }
            ComposeWarning::TextOverflow {
                region,
                text_height,
                region_height,
            } => {
                write!(
                    f,
                    "Text height {}px exceeds {} height {}px",
                    text_height, region, region_height
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_dimension_display() {
        let err = ComposeError::invalid_dimension(0, 600, "width must be positive");
        assert_eq!(
            err.to_string(),
            "Invalid dimensions 0x600: width must be positive"
        );
    }

    #[test]
    fn test_decode_failed_display() {
        let err = ComposeError::decode_failed("invalid header");
        assert_eq!(err.to_string(), "Failed to decode image: invalid header");
    }

    #[test]
    fn test_encode_failed_display() {
        let err = ComposeError::encode_failed("jpeg", "encoder error");
        assert_eq!(err.to_string(), "Failed to encode to jpeg: encoder error");
    }

    #[test]
    fn test_invalid_param_display() {
        let err = ComposeError::invalid_param("opacity", "must be between 0.0 and 1.0");
        assert_eq!(
            err.to_string(),
            "Invalid parameter 'opacity': must be between 0.0 and 1.0"
        );
    }

    #[test]
    fn test_warning_display() {
        let warn = ComposeWarning::MissingAsset {
            path: "logos/brand.png".to_string(),
        };
        assert_eq!(
            warn.to_string(),
            "Overlay asset unavailable, skipped: logos/brand.png"
        );

        let warn = ComposeWarning::TextOverflow {
            region: "band left half".to_string(),
            text_height: 80,
            region_height: 64,
        };
        assert_eq!(
            warn.to_string(),
            "Text height 80px exceeds band left half height 64px"
        );
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ComposeError>();
        assert_send_sync::<ComposeWarning>();
    }
}
