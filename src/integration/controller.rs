//! Top-level controller
//!
//! Owns the session and its two boundary adapters. Every user action and
//! every generation outcome becomes a [`SessionEvent`] applied through
//! [`Session::next`]; after each accepted transition the camera is
//! reconciled with the new phase so the device is held only while
//! `Capturing`.

use crate::camera::{CaptureAdapter, LivePreview, RgbFrame};
use crate::catalog::Catalog;
use crate::generation::{GeminiGenerator, GenerationEvent, GenerationHandle, GenerationPipeline};
use crate::integration::config::AppConfig;
use crate::session::{Phase, Session, SessionEvent, VALIDATION_MESSAGE};
use crate::{CostumeError, Result};
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Actions the UI can ask for
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UiAction {
    /// Turn the camera on
    Start,
    /// Take a photo from the live preview
    Capture,
    /// Discard the photo and return to the preview
    Retake,
    /// Generate (or regenerate) the costume picture
    Generate,
    /// Reset to the welcome screen
    StartOver,
    /// Choose a subject
    SelectName(String),
    /// Try to acquire the camera again after a device error
    RetryCamera,
}

pub struct Controller {
    session: Session,
    catalog: Catalog,
    camera: CaptureAdapter,
    preview: Option<LivePreview>,
    device_error: Option<String>,
    generation: Option<GenerationHandle>,
    mirror_preview: bool,
}

impl Controller {
    /// Create a controller in `Idle` with the catalog's first name selected
    pub fn new(catalog: Catalog, camera: CaptureAdapter, generation: GenerationHandle) -> Self {
        let session = Session::new(catalog.first_name());
        info!(
            "[SESSION] Ready with {} subjects, camera {}",
            catalog.len(),
            camera.device_name()
        );
        Self {
            session,
            catalog,
            camera,
            preview: None,
            device_error: None,
            generation: Some(generation),
            mirror_preview: true,
        }
    }

    /// Build everything from configuration: embedded catalog, configured
    /// camera, Gemini generator on a worker thread
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        config.validate()?;
        if config.generation.api_key().is_none() {
            warn!("[CONFIG] No API key configured, generation requests will fail");
        }

        let camera = config.camera.build_adapter()?;
        let generator = Arc::new(GeminiGenerator::new(config.generation.clone()));
        let generation = GenerationPipeline::new(generator)
            .with_timeout(config.generation.timeout())
            .start_worker()?;

        Ok(Self::new(Catalog::embedded(), camera, generation)
            .with_mirror_preview(config.camera.mirror_preview))
    }

    pub fn with_mirror_preview(mut self, mirror: bool) -> Self {
        self.mirror_preview = mirror;
        self
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn phase(&self) -> Phase {
        self.session.phase()
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Blocking camera message shown in place of the preview
    pub fn device_error(&self) -> Option<&str> {
        self.device_error.as_deref()
    }

    /// Whether a live preview currently holds the camera
    pub fn is_camera_active(&self) -> bool {
        self.preview.is_some()
    }

    /// Frames received by the current preview, 0 when none is running
    pub fn preview_frame_count(&self) -> u64 {
        self.preview.as_ref().map_or(0, LivePreview::frame_count)
    }

    /// Latest preview frame, mirrored when configured
    pub fn preview_frame(&self) -> Option<RgbFrame> {
        let frame = self.preview.as_ref()?.latest_frame()?;
        Some(if self.mirror_preview {
            frame.mirrored()
        } else {
            frame
        })
    }

    /// Idle -> Capturing, acquiring the camera
    pub fn start(&mut self) -> Result<()> {
        self.apply(SessionEvent::Start)
    }

    /// Freeze the current preview frame and move to Captured
    pub fn capture_photo(&mut self) -> Result<()> {
        if !self.session.phase().is_capturing() {
            return Err(CostumeError::TransitionError(format!(
                "capture is not allowed in phase {}",
                self.session.phase()
            )));
        }

        let preview = self.preview.as_ref().ok_or_else(|| {
            CostumeError::DeviceError(
                self.device_error
                    .clone()
                    .unwrap_or_else(|| "camera is not running".to_string()),
            )
        })?;

        let still = match preview.freeze_frame() {
            Ok(still) => still,
            Err(e) => {
                if preview.failure().is_some() {
                    self.release_camera_with_error(&e);
                }
                return Err(e);
            }
        };

        self.apply(SessionEvent::FrameFrozen(still))
    }

    /// Discard photo and result, back to the live preview
    pub fn retake(&mut self) -> Result<()> {
        self.apply(SessionEvent::Retake)
    }

    /// Submit the captured photo and the selected name for generation
    pub fn generate(&mut self) -> Result<()> {
        let request_id = Uuid::new_v4();
        if let Err(e) = self.apply(SessionEvent::Generate { request_id }) {
            if matches!(e, CostumeError::ValidationError(_)) {
                self.session.record_error(e.user_message());
            }
            return Err(e);
        }

        let (photo, subject) = match self.session.captured_image() {
            Some(photo) => (photo.clone(), self.session.selected_name().to_string()),
            None => return Err(CostumeError::ValidationError(VALIDATION_MESSAGE.to_string())),
        };

        info!("[GENERATION] Submitting request {} for {}", request_id, subject);
        let submitted = match &self.generation {
            Some(handle) => handle.generate(request_id, photo, &subject),
            None => Err(CostumeError::ChannelError(
                "generation worker has shut down".to_string(),
            )),
        };

        if let Err(e) = submitted {
            error!("[GENERATION] {}", e);
            self.apply(SessionEvent::GenerationFailed {
                request_id,
                message: e.user_message(),
            })?;
            return Err(e);
        }
        Ok(())
    }

    /// Change the selected subject (refused while generating)
    pub fn select_name(&mut self, name: &str) -> Result<()> {
        self.apply(SessionEvent::SelectName(name.to_string()))
    }

    /// Reset everything; cancels an outstanding generation
    pub fn start_over(&mut self) -> Result<()> {
        let pending = self.session.pending_request();
        self.apply(SessionEvent::StartOver)?;

        if let (Some(request_id), Some(handle)) = (pending, &self.generation) {
            if let Err(e) = handle.cancel(request_id) {
                warn!("[GENERATION] Could not cancel {}: {}", request_id, e);
            }
        }
        Ok(())
    }

    /// Clear the device error and try to acquire the camera again
    pub fn retry_camera(&mut self) -> Result<()> {
        if !self.session.phase().is_capturing() {
            return Err(CostumeError::TransitionError(format!(
                "camera retry is not allowed in phase {}",
                self.session.phase()
            )));
        }
        info!("[CAMERA] Retrying {}", self.camera.device_name());
        self.device_error = None;
        self.reconcile_camera();
        match &self.device_error {
            Some(message) => Err(CostumeError::DeviceError(message.clone())),
            None => Ok(()),
        }
    }

    /// Dispatch a UI action
    pub fn handle(&mut self, action: UiAction) -> Result<()> {
        debug!("[SESSION] Action {:?} in phase {}", action, self.session.phase());
        match action {
            UiAction::Start => self.start(),
            UiAction::Capture => self.capture_photo(),
            UiAction::Retake => self.retake(),
            UiAction::Generate => self.generate(),
            UiAction::StartOver => self.start_over(),
            UiAction::SelectName(name) => self.select_name(&name),
            UiAction::RetryCamera => self.retry_camera(),
        }
    }

    /// Drain generation events and check the camera stream.
    ///
    /// Returns true when anything changed.
    pub fn poll_events(&mut self) -> bool {
        let mut changed = false;

        let events: Vec<GenerationEvent> = match &self.generation {
            Some(handle) => std::iter::from_fn(|| handle.try_recv_event()).collect(),
            None => Vec::new(),
        };

        for event in events {
            let applied = match event {
                GenerationEvent::Started { request_id } => {
                    debug!("[GENERATION] Request {} started", request_id);
                    continue;
                }
                GenerationEvent::Completed {
                    request_id,
                    image,
                    elapsed_ms,
                } => {
                    info!("[GENERATION] Result for {} after {}ms", request_id, elapsed_ms);
                    self.apply(SessionEvent::GenerationSucceeded { request_id, image })
                }
                GenerationEvent::Failed {
                    request_id,
                    message,
                } => self.apply(SessionEvent::GenerationFailed {
                    request_id,
                    message,
                }),
                GenerationEvent::Shutdown => {
                    warn!("[GENERATION] Worker shut down");
                    continue;
                }
            };
            if applied.is_ok() {
                changed = true;
            }
        }

        let stream_failure = self.preview.as_ref().and_then(LivePreview::failure);
        if let Some(reason) = stream_failure {
            self.release_camera_with_error(&CostumeError::DeviceError(reason));
            changed = true;
        }

        changed
    }

    /// Release the camera and stop the generation worker
    pub fn shutdown(&mut self) {
        if let Some(preview) = self.preview.take() {
            preview.stop();
        }
        if let Some(handle) = self.generation.take() {
            if let Err(e) = handle.shutdown() {
                error!("[GENERATION] Shutdown failed: {}", e);
            }
        }
        info!("[SESSION] Shut down");
    }

    fn apply(&mut self, event: SessionEvent) -> Result<()> {
        let from = self.session.phase();
        match self.session.next(&event) {
            Ok(next) => {
                self.session = next;
                let to = self.session.phase();
                if from != to {
                    info!("[SESSION] {} -> {} on {}", from, to, event.name());
                }
                self.reconcile_camera();
                Ok(())
            }
            Err(e) => {
                debug!("[SESSION] Rejected {} in {}: {}", event.name(), from, e);
                Err(e)
            }
        }
    }

    /// Hold the camera exactly while `Capturing`
    fn reconcile_camera(&mut self) {
        if self.session.phase().is_capturing() {
            if self.preview.is_none() && self.device_error.is_none() {
                match self.camera.start_preview() {
                    Ok(preview) => self.preview = Some(preview),
                    Err(e) => {
                        error!("[CAMERA] {}", e);
                        self.device_error = Some(e.user_message());
                    }
                }
            }
        } else {
            if let Some(preview) = self.preview.take() {
                preview.stop();
            }
            self.device_error = None;
        }
    }

    fn release_camera_with_error(&mut self, e: &CostumeError) {
        error!("[CAMERA] {}", e);
        if let Some(preview) = self.preview.take() {
            preview.stop();
        }
        self.device_error = Some(e.user_message());
    }
}

impl Drop for Controller {
    fn drop(&mut self) {
        if self.generation.is_some() || self.preview.is_some() {
            self.shutdown();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::{encode_jpeg, StillImage, SyntheticCamera};
    use crate::catalog::CatalogEntry;
    use crate::generation::ImageGenerator;
    use std::time::{Duration, Instant};

    struct FixedGenerator {
        delay: Duration,
        fail_with: Option<String>,
    }

    impl ImageGenerator for FixedGenerator {
        fn name(&self) -> &str {
            "fixed"
        }

        fn generate(&self, _photo: &StillImage, _subject: &str) -> Result<StillImage> {
            std::thread::sleep(self.delay);
            match &self.fail_with {
                Some(msg) => Err(CostumeError::GenerationError(msg.clone())),
                None => encode_jpeg(&RgbFrame::filled(8, 8, [0, 200, 0]), 90),
            }
        }
    }

    fn controller_with(camera: Arc<SyntheticCamera>, generator: FixedGenerator) -> Controller {
        let catalog = Catalog::from_entries(vec![
            CatalogEntry::new("1", "Pikachu"),
            CatalogEntry::new("2", "Charmander"),
        ]);
        let generation = GenerationPipeline::new(Arc::new(generator))
            .start_worker()
            .unwrap();
        Controller::new(catalog, CaptureAdapter::new(camera), generation)
    }

    fn instant_ok() -> FixedGenerator {
        FixedGenerator {
            delay: Duration::ZERO,
            fail_with: None,
        }
    }

    fn wait_for_frame(controller: &Controller) {
        let deadline = Instant::now() + Duration::from_secs(2);
        while controller.preview_frame_count() == 0 && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(5));
        }
    }

    fn wait_while_generating(controller: &mut Controller) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while controller.phase().is_generating() && Instant::now() < deadline {
            controller.poll_events();
            std::thread::sleep(Duration::from_millis(5));
        }
    }

    fn captured(controller: &mut Controller) {
        controller.start().unwrap();
        wait_for_frame(controller);
        controller.capture_photo().unwrap();
    }

    #[test]
    fn test_drop_while_capturing_releases_camera() {
        let camera = Arc::new(SyntheticCamera::new(16, 12));
        let mut controller = controller_with(camera.clone(), instant_ok());
        controller.start().unwrap();
        wait_for_frame(&controller);
        assert_eq!(controller.phase(), Phase::Capturing);
        assert_eq!(camera.open_streams(), 1);

        drop(controller);
        assert_eq!(camera.open_streams(), 0);
    }

    #[test]
    fn test_shutdown_while_capturing_releases_camera() {
        let camera = Arc::new(SyntheticCamera::new(16, 12));
        let mut controller = controller_with(camera.clone(), instant_ok());
        controller.start().unwrap();
        wait_for_frame(&controller);
        assert_eq!(camera.open_streams(), 1);

        controller.shutdown();
        assert_eq!(camera.open_streams(), 0);
        assert!(!controller.is_camera_active());
    }

    #[test]
    fn test_camera_held_only_while_capturing() {
        let camera = Arc::new(SyntheticCamera::new(16, 12));
        let mut controller = controller_with(camera.clone(), instant_ok());
        assert_eq!(camera.open_streams(), 0);

        controller.start().unwrap();
        assert_eq!(controller.phase(), Phase::Capturing);
        assert_eq!(camera.open_streams(), 1);

        wait_for_frame(&controller);
        controller.capture_photo().unwrap();
        assert_eq!(controller.phase(), Phase::Captured);
        assert_eq!(camera.open_streams(), 0);

        controller.retake().unwrap();
        assert_eq!(camera.open_streams(), 1);

        controller.start_over().unwrap();
        assert_eq!(camera.open_streams(), 0);
    }

    #[test]
    fn test_successful_generation() {
        let mut controller =
            controller_with(Arc::new(SyntheticCamera::new(16, 12)), instant_ok());
        captured(&mut controller);

        controller.generate().unwrap();
        assert_eq!(controller.phase(), Phase::Generating);

        wait_while_generating(&mut controller);
        let session = controller.session();
        assert_eq!(session.phase(), Phase::Result);
        assert!(session.generated_image().is_some());
        assert_eq!(session.selected_name(), "Pikachu");
    }

    #[test]
    fn test_failed_generation_returns_to_captured() {
        let mut controller = controller_with(
            Arc::new(SyntheticCamera::new(16, 12)),
            FixedGenerator {
                delay: Duration::ZERO,
                fail_with: Some("Quota exceeded".to_string()),
            },
        );
        captured(&mut controller);
        let photo = controller.session().captured_image().cloned();

        controller.generate().unwrap();
        wait_while_generating(&mut controller);

        let session = controller.session();
        assert_eq!(session.phase(), Phase::Captured);
        assert_eq!(session.last_error(), Some("Quota exceeded"));
        assert!(session.generated_image().is_none());
        assert_eq!(session.captured_image().cloned(), photo);
    }

    #[test]
    fn test_validation_error_is_recorded() {
        let mut controller =
            controller_with(Arc::new(SyntheticCamera::new(16, 12)), instant_ok());
        captured(&mut controller);
        controller.select_name("").unwrap();

        let result = controller.generate();
        assert!(matches!(result, Err(CostumeError::ValidationError(_))));
        assert_eq!(controller.phase(), Phase::Captured);
        assert_eq!(controller.session().last_error(), Some(VALIDATION_MESSAGE));
    }

    #[test]
    fn test_start_over_cancels_generation() {
        let mut controller = controller_with(
            Arc::new(SyntheticCamera::new(16, 12)),
            FixedGenerator {
                delay: Duration::from_millis(200),
                fail_with: None,
            },
        );
        captured(&mut controller);
        controller.generate().unwrap();
        controller.start_over().unwrap();
        assert_eq!(controller.phase(), Phase::Idle);

        std::thread::sleep(Duration::from_millis(400));
        controller.poll_events();
        assert_eq!(controller.phase(), Phase::Idle);
        assert!(controller.session().generated_image().is_none());
    }

    #[test]
    fn test_selection_locked_while_generating() {
        let mut controller = controller_with(
            Arc::new(SyntheticCamera::new(16, 12)),
            FixedGenerator {
                delay: Duration::from_millis(100),
                fail_with: None,
            },
        );
        captured(&mut controller);
        controller.generate().unwrap();
        assert!(controller.select_name("Charmander").is_err());
        assert_eq!(controller.session().selected_name(), "Pikachu");
        wait_while_generating(&mut controller);
    }

    #[test]
    fn test_denied_camera_blocks_capture_until_retry() {
        let mut controller = controller_with(
            Arc::new(SyntheticCamera::unavailable("Permission denied")),
            instant_ok(),
        );
        controller.start().unwrap();
        assert_eq!(controller.phase(), Phase::Capturing);
        assert!(controller.device_error().is_some());
        assert!(!controller.is_camera_active());

        assert!(matches!(
            controller.capture_photo(),
            Err(CostumeError::DeviceError(_))
        ));
        assert!(matches!(
            controller.retry_camera(),
            Err(CostumeError::DeviceError(_))
        ));
        assert!(controller.device_error().is_some());
    }

    #[test]
    fn test_handle_dispatches_actions() {
        let mut controller =
            controller_with(Arc::new(SyntheticCamera::new(16, 12)), instant_ok());
        controller.handle(UiAction::SelectName("Charmander".into())).unwrap();
        controller.handle(UiAction::Start).unwrap();
        assert_eq!(controller.phase(), Phase::Capturing);
        assert_eq!(controller.session().selected_name(), "Charmander");
        assert!(controller.handle(UiAction::Generate).is_err());
    }

    #[test]
    fn test_preview_frame_is_mirrored() {
        let mut controller =
            controller_with(Arc::new(SyntheticCamera::new(16, 12)), instant_ok());
        controller.start().unwrap();
        wait_for_frame(&controller);
        let frame = controller.preview_frame().unwrap();
        // The synthetic pattern ramps red left to right
        assert!(frame.pixels[0] > frame.pixels[(frame.width as usize - 1) * 3]);
    }
}
