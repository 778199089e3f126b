//! UI components

mod action_bar;
mod error_banner;
mod preview;
mod result_display;
mod selector;

pub use action_bar::ActionBar;
pub use error_banner::ErrorBanner;
pub use preview::CameraPreview;
pub use result_display::ResultDisplay;
pub use selector::SubjectSelector;
