//! Inputs to the auth reducer.

use gatehouse_types::{OAuthProvider, SessionUser};

use super::signup::SignUpProgress;
use super::state::Tab;
use crate::media::{ImageSlot, SelectedFile};
use crate::validation::Field;

/// A user who just authenticated, with their avatar resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct Authenticated {
    pub user: SessionUser,
    pub avatar_url: Option<String>,
}

/// Why a submission ended without a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowFailure {
    /// Notification text shown to the user.
    pub message: String,
}

impl FlowFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Everything that can happen to the auth page.
#[derive(Debug)]
pub enum AuthEvent {
    /// Page opened; look for an existing session.
    Mount,
    /// Result of the mount-time session check. `None` means signed out.
    SessionRestored(Option<Authenticated>),
    SwitchTab(Tab),
    Input { field: Field, value: String },
    TogglePasswordVisibility,
    /// A file was picked for `slot`; it is checked before being accepted.
    ImagePicked { slot: ImageSlot, file: SelectedFile },
    ImageRemoved(ImageSlot),
    /// The picked file couldn't be read at all.
    SelectionFailed { message: String },
    Submit,
    OAuth(OAuthProvider),
    /// Building or opening the provider URL failed.
    OAuthFailed {
        provider: OAuthProvider,
        message: Option<String>,
    },
    SignInFinished(Result<Authenticated, FlowFailure>),
    SignUpFinished {
        result: Result<Authenticated, FlowFailure>,
        progress: SignUpProgress,
    },
    /// Periodic clock tick: rotates humor and expires toasts.
    Tick,
    Unmount,
}
