//! Error types for the PokeCostume application

use thiserror::Error;

/// PokeCostume application errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CostumeError {
    /// Generate was requested without a captured photo or a selected name
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Camera permission denied, device missing, or stream failure
    #[error("Camera device error: {0}")]
    DeviceError(String),

    /// The external generation call failed for any reason
    #[error("Generation error: {0}")]
    GenerationError(String),

    /// Event not permitted in the current phase
    #[error("Invalid transition: {0}")]
    TransitionError(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Channel communication error
    #[error("Channel error: {0}")]
    ChannelError(String),

    /// File system I/O error
    #[error("IO error: {0}")]
    IOError(String),

    /// Still image encoding or decoding error
    #[error("Image error: {0}")]
    ImageError(String),
}

impl From<std::io::Error> for CostumeError {
    fn from(e: std::io::Error) -> Self {
        CostumeError::IOError(e.to_string())
    }
}

impl From<image::ImageError> for CostumeError {
    fn from(e: image::ImageError) -> Self {
        CostumeError::ImageError(e.to_string())
    }
}

impl CostumeError {
    /// Check if this error is recoverable
    ///
    /// Recoverable errors leave the session usable: the user can simply try
    /// again. The others need the user to fix something outside the app.
    pub fn is_recoverable(&self) -> bool {
        match self {
            CostumeError::ValidationError(_) => true,
            // Camera problems need the user to grant access or plug a device
            CostumeError::DeviceError(_) => false,
            CostumeError::GenerationError(_) => true,
            CostumeError::TransitionError(_) => true,
            CostumeError::ConfigError(_) => false,
            CostumeError::ChannelError(_) => false,
            CostumeError::IOError(_) => false,
            CostumeError::ImageError(_) => true,
        }
    }

    /// Get a user-friendly description of the error
    ///
    /// Validation and generation messages are already written for the user
    /// and are passed through unchanged.
    pub fn user_message(&self) -> String {
        match self {
            CostumeError::ValidationError(msg) => msg.clone(),
            CostumeError::DeviceError(_) => {
                "Could not access webcam. Please check permissions and try again.".to_string()
            }
            CostumeError::GenerationError(msg) => msg.clone(),
            CostumeError::TransitionError(_) => "That action is not available right now.".to_string(),
            CostumeError::ConfigError(_) => "Configuration error. Please check settings.".to_string(),
            CostumeError::ChannelError(_) => {
                "Internal communication error. Please restart the application.".to_string()
            }
            CostumeError::IOError(_) => "File system error occurred.".to_string(),
            CostumeError::ImageError(_) => "The image could not be processed. Please try again.".to_string(),
        }
    }
}

/// Result type alias for PokeCostume operations
pub type Result<T> = std::result::Result<T, CostumeError>;
