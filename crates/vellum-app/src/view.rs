//! View policy - pure derivation of what a frontend should show
//!
//! The engine never draws anything. Frontends call `view_policy` after each
//! state change and honor the returned contract. The tricky part is the
//! password challenge: the render surface must stay mounted (hidden) while
//! a submitted password is validated, so the prompt does not bounce when
//! the surface remounts.

use crate::state::DocumentLoadState;
use vellum_core::LoadPhase;

/// Static notice shown on the failure surface. The classified failure
/// reason is logged, not displayed.
pub const LOAD_FAILURE_NOTICE: &str = "Failed to load the document.";

/// How the render surface should be treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceVisibility {
    /// Shown normally
    Visible,

    /// Kept mounted so the in-flight attempt can resolve, but hidden
    HiddenMounted,

    /// Not mounted at all
    Unmounted,
}

/// Props for the password prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PromptProps {
    /// Highlight the entry as invalid (a submitted password was rejected)
    pub is_invalid: bool,

    /// Show a busy indicator (the submitted password is being validated)
    pub is_loading: bool,
}

/// What a frontend should show for the current load state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewPolicy {
    pub surface: SurfaceVisibility,

    /// Present exactly when the password prompt should be on screen
    pub prompt: Option<PromptProps>,

    /// Standalone loading indicator (initial load, no challenge active)
    pub loading_indicator: bool,

    /// Static failure notice, present only in `Failed`
    pub failure_notice: Option<&'static str>,
}

/// Derive the view contract from the load state.
pub fn view_policy(doc: &DocumentLoadState) -> ViewPolicy {
    match doc.phase {
        LoadPhase::Loading if doc.challenge_active => ViewPolicy {
            // Validating a submitted password: the prompt stays up with a
            // busy indicator while the surface revalidates hidden.
            surface: SurfaceVisibility::HiddenMounted,
            prompt: Some(PromptProps {
                is_invalid: doc.password_known_invalid,
                is_loading: true,
            }),
            loading_indicator: false,
            failure_notice: None,
        },
        LoadPhase::Loading => ViewPolicy {
            surface: SurfaceVisibility::HiddenMounted,
            prompt: None,
            loading_indicator: true,
            failure_notice: None,
        },
        LoadPhase::AwaitingPassword => ViewPolicy {
            surface: SurfaceVisibility::HiddenMounted,
            prompt: Some(PromptProps {
                is_invalid: doc.password_known_invalid,
                is_loading: false,
            }),
            loading_indicator: false,
            failure_notice: None,
        },
        LoadPhase::Loaded => ViewPolicy {
            surface: SurfaceVisibility::Visible,
            prompt: None,
            loading_indicator: false,
            failure_notice: None,
        },
        LoadPhase::Failed => ViewPolicy {
            surface: SurfaceVisibility::Unmounted,
            prompt: None,
            loading_indicator: false,
            failure_notice: Some(LOAD_FAILURE_NOTICE),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vellum_core::{DocumentSource, RenderFailure};

    fn new_doc() -> DocumentLoadState {
        DocumentLoadState::new(DocumentSource::from("a.pdf"), None)
    }

    #[test]
    fn test_initial_loading_shows_indicator_only() {
        let mut doc = new_doc();
        doc.begin_attempt();

        let policy = view_policy(&doc);

        assert_eq!(policy.surface, SurfaceVisibility::HiddenMounted);
        assert!(policy.prompt.is_none());
        assert!(policy.loading_indicator);
        assert!(policy.failure_notice.is_none());
    }

    #[test]
    fn test_awaiting_password_shows_prompt_over_hidden_surface() {
        let mut doc = new_doc();
        doc.begin_attempt();
        doc.enter_awaiting_password();

        let policy = view_policy(&doc);

        assert_eq!(policy.surface, SurfaceVisibility::HiddenMounted);
        assert_eq!(
            policy.prompt,
            Some(PromptProps {
                is_invalid: false,
                is_loading: false,
            })
        );
        assert!(!policy.loading_indicator);
    }

    #[test]
    fn test_prompt_marks_rejected_password_invalid() {
        let mut doc = new_doc();
        doc.begin_attempt();
        doc.set_password("wrong".to_string());
        doc.enter_awaiting_password();

        let policy = view_policy(&doc);

        assert!(policy.prompt.is_some_and(|p| p.is_invalid));
    }

    #[test]
    fn test_validating_password_keeps_prompt_with_busy_state() {
        let mut doc = new_doc();
        doc.begin_attempt();
        doc.enter_awaiting_password();
        doc.set_password("secret".to_string());
        doc.begin_attempt();

        let policy = view_policy(&doc);

        assert_eq!(policy.surface, SurfaceVisibility::HiddenMounted);
        assert_eq!(
            policy.prompt,
            Some(PromptProps {
                is_invalid: false,
                is_loading: true,
            })
        );
        assert!(!policy.loading_indicator);
    }

    #[test]
    fn test_loaded_shows_surface_only() {
        let mut doc = new_doc();
        doc.begin_attempt();
        doc.enter_loaded(Some(3));

        let policy = view_policy(&doc);

        assert_eq!(policy.surface, SurfaceVisibility::Visible);
        assert!(policy.prompt.is_none());
        assert!(!policy.loading_indicator);
        assert!(policy.failure_notice.is_none());
    }

    #[test]
    fn test_failed_shows_static_notice() {
        let mut doc = new_doc();
        doc.begin_attempt();
        doc.enter_failed(RenderFailure::classify("corrupt xref table"));

        let policy = view_policy(&doc);

        assert_eq!(policy.surface, SurfaceVisibility::Unmounted);
        assert!(policy.prompt.is_none());
        assert_eq!(policy.failure_notice, Some(LOAD_FAILURE_NOTICE));
    }
}
