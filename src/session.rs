//! Capture-Select-Generate session state machine
//!
//! `Session` is the single source of truth for what the UI shows. All
//! changes go through [`Session::next`], a pure function from the current
//! session and an event to the following session. Rendering code reads
//! [`Session::phase`] and never infers the screen from which fields happen
//! to be set.

use crate::camera::StillImage;
use crate::{CostumeError, Result};
use std::fmt;
use uuid::Uuid;

/// Message shown when generate is requested without a photo or a name
pub const VALIDATION_MESSAGE: &str = "Please capture an image and select a Pokémon.";

/// Position in the capture-select-generate flow
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Welcome screen, camera off
    #[default]
    Idle,
    /// Live camera preview
    Capturing,
    /// A photo is frozen and waiting for generate
    Captured,
    /// One generation request is outstanding
    Generating,
    /// The generated picture is shown next to the photo
    Result,
}

impl Phase {
    pub fn is_idle(&self) -> bool {
        matches!(self, Phase::Idle)
    }

    pub fn is_capturing(&self) -> bool {
        matches!(self, Phase::Capturing)
    }

    pub fn is_generating(&self) -> bool {
        matches!(self, Phase::Generating)
    }

    /// Phases in which a captured photo is held
    pub fn has_photo(&self) -> bool {
        matches!(self, Phase::Captured | Phase::Generating | Phase::Result)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Idle => write!(f, "Idle"),
            Phase::Capturing => write!(f, "Capturing"),
            Phase::Captured => write!(f, "Captured"),
            Phase::Generating => write!(f, "Generating"),
            Phase::Result => write!(f, "Result"),
        }
    }
}

/// Inputs to the state machine
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionEvent {
    /// Turn the camera on
    Start,
    /// A still was taken from the live preview
    FrameFrozen(StillImage),
    /// Discard the photo and go back to the preview
    Retake,
    /// Ask for a generated picture; the id tags the outstanding request
    Generate { request_id: Uuid },
    /// The generation service answered with a picture
    GenerationSucceeded { request_id: Uuid, image: StillImage },
    /// The generation service failed
    GenerationFailed { request_id: Uuid, message: String },
    /// Reset everything
    StartOver,
    /// Change the chosen subject
    SelectName(String),
}

impl SessionEvent {
    /// Short name for logs and error messages
    pub fn name(&self) -> &'static str {
        match self {
            SessionEvent::Start => "start",
            SessionEvent::FrameFrozen(_) => "frame_frozen",
            SessionEvent::Retake => "retake",
            SessionEvent::Generate { .. } => "generate",
            SessionEvent::GenerationSucceeded { .. } => "generation_succeeded",
            SessionEvent::GenerationFailed { .. } => "generation_failed",
            SessionEvent::StartOver => "start_over",
            SessionEvent::SelectName(_) => "select_name",
        }
    }
}

/// The whole interaction's mutable state
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Session {
    phase: Phase,
    captured_image: Option<StillImage>,
    selected_name: String,
    generated_image: Option<StillImage>,
    last_error: Option<String>,
    pending_request: Option<Uuid>,
    /// Selection restored by start over (the catalog's first entry)
    default_name: String,
}

impl Default for Session {
    fn default() -> Self {
        Self::new("")
    }
}

impl Session {
    /// Fresh session in `Idle` with the given default selection
    pub fn new(default_name: impl Into<String>) -> Self {
        let default_name = default_name.into();
        Self {
            phase: Phase::Idle,
            captured_image: None,
            selected_name: default_name.clone(),
            generated_image: None,
            last_error: None,
            pending_request: None,
            default_name,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn captured_image(&self) -> Option<&StillImage> {
        self.captured_image.as_ref()
    }

    pub fn selected_name(&self) -> &str {
        &self.selected_name
    }

    pub fn generated_image(&self) -> Option<&StillImage> {
        self.generated_image.as_ref()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Id of the generation request currently outstanding
    pub fn pending_request(&self) -> Option<Uuid> {
        self.pending_request
    }

    pub fn default_name(&self) -> &str {
        &self.default_name
    }

    /// Whether a generate request would pass validation
    pub fn can_generate(&self) -> bool {
        matches!(self.phase, Phase::Captured | Phase::Result)
            && self.captured_image.is_some()
            && !self.selected_name.trim().is_empty()
    }

    /// Whether the subject selector accepts changes
    pub fn selection_enabled(&self) -> bool {
        !self.phase.is_generating()
    }

    /// Record an error message to show the user without changing phase
    pub fn record_error(&mut self, message: impl Into<String>) {
        self.last_error = Some(message.into());
    }

    /// Compute the session that follows `event`.
    ///
    /// Returns an error and leaves `self` untouched when the event is not
    /// permitted in the current phase, fails validation, or reports the
    /// outcome of a request that is no longer outstanding.
    pub fn next(&self, event: &SessionEvent) -> Result<Session> {
        let mut next = self.clone();

        match (self.phase, event) {
            (Phase::Idle, SessionEvent::Start) => {
                next.phase = Phase::Capturing;
                next.last_error = None;
            }

            (Phase::Capturing, SessionEvent::FrameFrozen(image)) => {
                next.phase = Phase::Captured;
                next.captured_image = Some(image.clone());
            }

            (Phase::Captured | Phase::Result, SessionEvent::Retake) => {
                next.phase = Phase::Capturing;
                next.captured_image = None;
                next.generated_image = None;
            }

            (Phase::Captured | Phase::Result, SessionEvent::Generate { request_id }) => {
                if !self.can_generate() {
                    return Err(CostumeError::ValidationError(VALIDATION_MESSAGE.to_string()));
                }
                next.phase = Phase::Generating;
                next.last_error = None;
                next.generated_image = None;
                next.pending_request = Some(*request_id);
            }

            (Phase::Generating, SessionEvent::GenerationSucceeded { request_id, image }) => {
                self.check_pending(*request_id)?;
                next.phase = Phase::Result;
                next.generated_image = Some(image.clone());
                next.pending_request = None;
            }

            (Phase::Generating, SessionEvent::GenerationFailed { request_id, message }) => {
                self.check_pending(*request_id)?;
                next.phase = Phase::Captured;
                next.generated_image = None;
                next.last_error = Some(message.clone());
                next.pending_request = None;
            }

            // From Generating this cancels the outstanding request: its id is
            // forgotten, so a late outcome is rejected as stale.
            (
                Phase::Capturing | Phase::Captured | Phase::Generating | Phase::Result,
                SessionEvent::StartOver,
            ) => {
                next = Session::new(self.default_name.clone());
            }

            (Phase::Generating, SessionEvent::SelectName(_)) => {
                return Err(CostumeError::TransitionError(
                    "selection is locked while generating".to_string(),
                ));
            }

            (_, SessionEvent::SelectName(name)) => {
                next.selected_name = name.clone();
            }

            (phase, SessionEvent::GenerationSucceeded { .. } | SessionEvent::GenerationFailed { .. }) => {
                return Err(CostumeError::TransitionError(format!(
                    "stale generation outcome in phase {}",
                    phase
                )));
            }

            (phase, event) => {
                return Err(CostumeError::TransitionError(format!(
                    "{} is not allowed in phase {}",
                    event.name(),
                    phase
                )));
            }
        }

        Ok(next)
    }

    fn check_pending(&self, request_id: Uuid) -> Result<()> {
        if self.pending_request == Some(request_id) {
            Ok(())
        } else {
            Err(CostumeError::TransitionError(format!(
                "stale generation outcome for request {}",
                request_id
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::{encode_jpeg, RgbFrame};

    fn still() -> StillImage {
        encode_jpeg(&RgbFrame::filled(4, 4, [10, 20, 30]), 90).unwrap()
    }

    fn captured() -> Session {
        Session::new("Pikachu")
            .next(&SessionEvent::Start)
            .unwrap()
            .next(&SessionEvent::FrameFrozen(still()))
            .unwrap()
    }

    #[test]
    fn test_new_session_defaults() {
        let session = Session::new("Bulbasaur");
        assert_eq!(session.phase(), Phase::Idle);
        assert_eq!(session.selected_name(), "Bulbasaur");
        assert!(session.captured_image().is_none());
        assert!(session.generated_image().is_none());
        assert!(session.last_error().is_none());
    }

    #[test]
    fn test_start_clears_error() {
        let mut session = Session::new("Mew");
        session.record_error("old");
        let next = session.next(&SessionEvent::Start).unwrap();
        assert_eq!(next.phase(), Phase::Capturing);
        assert!(next.last_error().is_none());
    }

    #[test]
    fn test_next_does_not_mutate_input() {
        let session = captured();
        let before = session.clone();
        let _ = session.next(&SessionEvent::Retake).unwrap();
        assert_eq!(session, before);
    }

    #[test]
    fn test_generate_without_name_is_validation_error() {
        let session = Session::new("")
            .next(&SessionEvent::Start)
            .unwrap()
            .next(&SessionEvent::FrameFrozen(still()))
            .unwrap();
        let result = session.next(&SessionEvent::Generate {
            request_id: Uuid::new_v4(),
        });
        assert_eq!(
            result,
            Err(CostumeError::ValidationError(VALIDATION_MESSAGE.to_string()))
        );
    }

    #[test]
    fn test_generate_without_photo_keeps_phase() {
        let mut session = captured();
        session.captured_image = None;
        let result = session.next(&SessionEvent::Generate {
            request_id: Uuid::new_v4(),
        });
        assert!(matches!(result, Err(CostumeError::ValidationError(_))));
        assert_eq!(session.phase(), Phase::Captured);
    }

    #[test]
    fn test_generate_records_pending_request() {
        let id = Uuid::new_v4();
        let generating = captured()
            .next(&SessionEvent::Generate { request_id: id })
            .unwrap();
        assert_eq!(generating.phase(), Phase::Generating);
        assert_eq!(generating.pending_request(), Some(id));
        assert!(!generating.selection_enabled());
    }

    #[test]
    fn test_generate_refused_while_generating() {
        let generating = captured()
            .next(&SessionEvent::Generate {
                request_id: Uuid::new_v4(),
            })
            .unwrap();
        let result = generating.next(&SessionEvent::Generate {
            request_id: Uuid::new_v4(),
        });
        assert!(matches!(result, Err(CostumeError::TransitionError(_))));
    }

    #[test]
    fn test_stale_outcome_is_rejected() {
        let generating = captured()
            .next(&SessionEvent::Generate {
                request_id: Uuid::new_v4(),
            })
            .unwrap();
        let result = generating.next(&SessionEvent::GenerationSucceeded {
            request_id: Uuid::new_v4(),
            image: still(),
        });
        assert!(matches!(result, Err(CostumeError::TransitionError(_))));
    }

    #[test]
    fn test_selection_locked_while_generating() {
        let generating = captured()
            .next(&SessionEvent::Generate {
                request_id: Uuid::new_v4(),
            })
            .unwrap();
        let result = generating.next(&SessionEvent::SelectName("Eevee".to_string()));
        assert!(matches!(result, Err(CostumeError::TransitionError(_))));
    }

    #[test]
    fn test_selection_allowed_in_other_phases() {
        let idle = Session::new("Pikachu");
        let next = idle.next(&SessionEvent::SelectName("Eevee".into())).unwrap();
        assert_eq!(next.selected_name(), "Eevee");
        assert_eq!(next.phase(), Phase::Idle);
    }

    #[test]
    fn test_start_over_from_generating_cancels() {
        let id = Uuid::new_v4();
        let generating = captured()
            .next(&SessionEvent::Generate { request_id: id })
            .unwrap();
        let idle = generating.next(&SessionEvent::StartOver).unwrap();
        assert_eq!(idle.phase(), Phase::Idle);
        assert!(idle.pending_request().is_none());

        let late = idle.next(&SessionEvent::GenerationSucceeded {
            request_id: id,
            image: still(),
        });
        assert!(late.is_err());
    }

    #[test]
    fn test_start_over_not_allowed_from_idle() {
        assert!(Session::new("x").next(&SessionEvent::StartOver).is_err());
    }

    #[test]
    fn test_illegal_events() {
        let idle = Session::new("Pikachu");
        assert!(idle.next(&SessionEvent::Retake).is_err());
        assert!(idle.next(&SessionEvent::FrameFrozen(still())).is_err());
        assert!(captured().next(&SessionEvent::Start).is_err());
    }

    #[test]
    fn test_phase_display() {
        assert_eq!(Phase::Generating.to_string(), "Generating");
        assert!(Phase::Result.has_photo());
        assert!(!Phase::Capturing.has_photo());
    }
}
