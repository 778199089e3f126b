//! Generation adapter
//!
//! An [`ImageGenerator`] performs one blocking request/response exchange
//! with the external service. [`GenerationPipeline`] runs it off the UI
//! thread: a worker thread with its own tokio runtime receives
//! [`GenerationCommand`]s and reports [`GenerationEvent`]s over channels.

pub mod config;
pub mod gemini;
pub mod pipeline;

pub use config::GenerationConfig;
pub use gemini::GeminiGenerator;
pub use pipeline::{GenerationCommand, GenerationEvent, GenerationHandle, GenerationPipeline};

use crate::camera::StillImage;
use crate::Result;

/// The external generation service, seen as one atomic call
pub trait ImageGenerator: Send + Sync {
    fn name(&self) -> &str;

    /// Composite `photo` with `subject`. Any failure is a
    /// [`crate::CostumeError::GenerationError`] carrying a readable message.
    fn generate(&self, photo: &StillImage, subject: &str) -> Result<StillImage>;
}
