//! UI automation tests using egui_kittest and AccessKit
//!
//! These drive the real controller (synthetic camera, scripted generator)
//! through the rendered components and check the accessibility tree.

use egui_kittest::kittest::Queryable;
use egui_kittest::Harness;
use pokecostume::camera::{encode_jpeg, CaptureAdapter, RgbFrame, StillImage, SyntheticCamera};
use pokecostume::catalog::{Catalog, CatalogEntry};
use pokecostume::generation::{GenerationPipeline, ImageGenerator};
use pokecostume::integration::Controller;
use pokecostume::session::Phase;
use pokecostume::ui::{show_session, TextureCache, Theme};
use pokecostume::{CostumeError, Result};
use std::sync::Arc;
use std::time::{Duration, Instant};

struct ScriptedGenerator {
    delay: Duration,
    fail_with: Option<&'static str>,
}

impl ImageGenerator for ScriptedGenerator {
    fn name(&self) -> &str {
        "scripted"
    }

    fn generate(&self, _photo: &StillImage, _subject: &str) -> Result<StillImage> {
        std::thread::sleep(self.delay);
        match self.fail_with {
            Some(msg) => Err(CostumeError::GenerationError(msg.to_string())),
            None => encode_jpeg(&RgbFrame::filled(32, 24, [255, 220, 0]), 90),
        }
    }
}

/// Application state wrapper for testing
struct TestApp {
    controller: Controller,
    textures: TextureCache,
    theme: Theme,
}

impl TestApp {
    fn new(camera: SyntheticCamera, generator: ScriptedGenerator) -> Self {
        let catalog = Catalog::from_entries(vec![
            CatalogEntry::new("1", "Pikachu"),
            CatalogEntry::new("2", "Charmander"),
        ]);
        let generation = GenerationPipeline::new(Arc::new(generator))
            .start_worker()
            .unwrap();
        let camera = CaptureAdapter::new(Arc::new(camera));
        Self {
            controller: Controller::new(catalog, camera, generation),
            textures: TextureCache::new(),
            theme: Theme::dark(),
        }
    }

    fn working() -> Self {
        Self::new(
            SyntheticCamera::new(64, 48),
            ScriptedGenerator {
                delay: Duration::from_millis(200),
                fail_with: None,
            },
        )
    }
}

fn harness(app: TestApp) -> Harness<'static, TestApp> {
    Harness::builder()
        .with_size(egui::Vec2::new(900.0, 700.0))
        .build_state(
            |ctx, app: &mut TestApp| {
                app.controller.poll_events();
                egui::CentralPanel::default().show(ctx, |ui| {
                    if let Some(action) =
                        show_session(ui, &app.controller, &mut app.textures, &app.theme)
                    {
                        let _ = app.controller.handle(action);
                    }
                });
            },
            app,
        )
}

/// Poll the controller until `done` holds, then render
fn wait_until(harness: &mut Harness<'static, TestApp>, done: impl Fn(&TestApp) -> bool) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !done(harness.state()) && Instant::now() < deadline {
        harness.state_mut().controller.poll_events();
        std::thread::sleep(Duration::from_millis(10));
    }
    harness.run();
    harness.run();
}

fn capture(harness: &mut Harness<'static, TestApp>) {
    harness.get_by_label("Start Camera").click();
    harness.run();
    wait_until(harness, |app| app.controller.preview_frame_count() > 0);

    harness.get_by_label("Take Photo").click();
    harness.run();
}

#[test]
fn test_idle_screen() {
    let mut harness = harness(TestApp::working());
    harness.run();

    let _start = harness.get_by_label("Start Camera");
    let _selector = harness.get_by_label("Pokémon selector");
    assert!(harness.query_by_label("Take Photo").is_none());
}

#[test]
fn test_start_camera_shows_preview() {
    let mut harness = harness(TestApp::working());
    harness.run();

    harness.get_by_label("Start Camera").click();
    harness.run();
    assert_eq!(harness.state().controller.phase(), Phase::Capturing);
    assert!(harness.state().controller.is_camera_active());

    wait_until(&mut harness, |app| app.controller.preview_frame_count() > 0);
    let _preview = harness.get_by_label("Camera preview");
    let _take = harness.get_by_label("Take Photo");
}

#[test]
fn test_take_photo_shows_captured_controls() {
    let mut harness = harness(TestApp::working());
    harness.run();
    capture(&mut harness);

    assert_eq!(harness.state().controller.phase(), Phase::Captured);
    assert!(!harness.state().controller.is_camera_active());
    let _photo = harness.get_by_label("Captured photo");
    let _generate = harness.get_by_label("Generate");
    let _retake = harness.get_by_label("Retake Photo");
    let _start_over = harness.get_by_label("Start Over");
}

#[test]
fn test_generate_shows_progress_then_result() {
    let mut harness = harness(TestApp::working());
    harness.run();
    capture(&mut harness);

    harness.get_by_label("Generate").click();
    harness.run();
    assert_eq!(harness.state().controller.phase(), Phase::Generating);
    let _progress = harness.get_by_label("Generation in progress");

    wait_until(&mut harness, |app| app.controller.phase() == Phase::Result);
    assert_eq!(harness.state().controller.phase(), Phase::Result);
    let _generated = harness.get_by_label("Generated costume");
    let _photo = harness.get_by_label("Captured photo");
    let _again = harness.get_by_label("Generate New");
}

#[test]
fn test_generation_failure_shows_error() {
    let app = TestApp::new(
        SyntheticCamera::new(64, 48),
        ScriptedGenerator {
            delay: Duration::ZERO,
            fail_with: Some("Quota exceeded"),
        },
    );
    let mut harness = harness(app);
    harness.run();
    capture(&mut harness);

    harness.get_by_label("Generate").click();
    harness.run();
    wait_until(&mut harness, |app| !app.controller.phase().is_generating());

    assert_eq!(harness.state().controller.phase(), Phase::Captured);
    let _error = harness.get_by_label("Error: Quota exceeded");
    let _photo = harness.get_by_label("Captured photo");
}

#[test]
fn test_generating_button_is_disabled() {
    let mut harness = harness(TestApp::working());
    harness.run();
    capture(&mut harness);

    harness.get_by_label("Generate").click();
    harness.run();

    harness.get_by_label("Generating...").click();
    harness.run();
    assert_eq!(harness.state().controller.phase(), Phase::Generating);
    wait_until(&mut harness, |app| app.controller.phase() == Phase::Result);
}

#[test]
fn test_start_over_while_generating() {
    let mut harness = harness(TestApp::working());
    harness.run();
    capture(&mut harness);

    harness.get_by_label("Generate").click();
    harness.run();
    harness.get_by_label("Start Over").click();
    harness.run();
    assert_eq!(harness.state().controller.phase(), Phase::Idle);

    // The cancelled request never lands
    std::thread::sleep(Duration::from_millis(400));
    harness.state_mut().controller.poll_events();
    harness.run();
    assert_eq!(harness.state().controller.phase(), Phase::Idle);
    let _start = harness.get_by_label("Start Camera");
}

#[test]
fn test_retake_returns_to_preview() {
    let mut harness = harness(TestApp::working());
    harness.run();
    capture(&mut harness);

    harness.get_by_label("Retake Photo").click();
    harness.run();
    assert_eq!(harness.state().controller.phase(), Phase::Capturing);
    assert!(harness.state().controller.session().captured_image().is_none());
    assert!(harness.query_by_label("Captured photo").is_none());
}

#[test]
fn test_denied_camera_shows_blocking_message() {
    let app = TestApp::new(
        SyntheticCamera::unavailable("Permission denied"),
        ScriptedGenerator {
            delay: Duration::ZERO,
            fail_with: None,
        },
    );
    let mut harness = harness(app);
    harness.run();

    harness.get_by_label("Start Camera").click();
    harness.run();

    let _message = harness.get_by_label(
        "Camera error: Could not access webcam. Please check permissions and try again.",
    );
    assert!(harness.query_by_label("Camera preview").is_none());

    harness.get_by_label("Retry Camera").click();
    harness.run();
    assert!(harness.state().controller.device_error().is_some());
    assert_eq!(harness.state().controller.phase(), Phase::Capturing);
}
