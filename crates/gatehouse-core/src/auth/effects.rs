//! Auth effect types.
//!
//! Effects are commands returned by the reducer for the host (TUI runtime
//! or headless driver) to execute. Backend work is grouped under
//! [`AuthEffect::Backend`] so hosts can hand it to
//! [`perform`](super::handlers::perform) and feed the resulting event back.

use gatehouse_types::{OAuthProvider, SessionUser};

use super::signup::SignUpProgress;
use crate::media::SelectedFile;
use crate::validation::{SignInForm, SignUpForm};

/// Async backend work. Each task resolves to exactly one event.
#[derive(Debug, Clone)]
pub enum BackendTask {
    /// Look up an existing session.
    RestoreSession,
    SignIn { form: SignInForm },
    SignUp {
        form: SignUpForm,
        avatar: Option<SelectedFile>,
        progress: SignUpProgress,
    },
}

#[derive(Debug, Clone)]
pub enum AuthEffect {
    /// Run a backend task and dispatch its result.
    Backend(BackendTask),

    /// Build the provider redirect and open it in the browser.
    OpenOAuth {
        provider: OAuthProvider,
        success_url: String,
        failure_url: String,
    },

    /// Record the signed-in user in the session context.
    InstallSession {
        user: SessionUser,
        avatar_url: Option<String>,
    },

    /// Write the `user` cookie.
    PersistUserCookie { user: SessionUser },

    /// Leave the auth page.
    Navigate { url: String },

    /// Forget the signed-in user in the session context.
    ClearSession,
}
