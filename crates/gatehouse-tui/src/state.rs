//! Application state.
//!
//! ```text
//! AppState
//! ├── auth: AuthView         (forms, phase, images, humor, toasts)
//! ├── session: SessionContext (who is signed in, once known)
//! ├── focus: Focus           (which control receives keys)
//! ├── prompt: Option<PathPrompt> (image path overlay)
//! └── exit_at / outcome      (leaving after a redirect)
//! ```

use std::time::{Duration, Instant};

use gatehouse_core::auth::{AuthView, Phase, Tab};
use gatehouse_core::config::Routes;
use gatehouse_core::media::{ImageSlot, PreviewRegistry};
use gatehouse_core::session::SessionContext;
use gatehouse_core::validation::Field;
use gatehouse_types::{OAuthProvider, SessionUser};

/// How long the success screen stays up before the app exits.
pub const REDIRECT_DELAY: Duration = Duration::from_millis(1_500);

// ============================================================================
// Focus
// ============================================================================

/// A control that can receive keyboard input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    OAuth(OAuthProvider),
    Field(Field),
    Image(ImageSlot),
    Submit,
    SwitchTab,
}

impl Focus {
    /// Focusable controls of `tab`, top to bottom.
    pub fn order(tab: Tab) -> Vec<Focus> {
        let mut order: Vec<Focus> = OAuthProvider::all()
            .iter()
            .copied()
            .map(Focus::OAuth)
            .collect();
        order.extend(tab.fields().iter().copied().map(Focus::Field));
        if tab == Tab::SignUp {
            order.push(Focus::Image(ImageSlot::Avatar));
            order.push(Focus::Image(ImageSlot::Cover));
        }
        order.push(Focus::Submit);
        order.push(Focus::SwitchTab);
        order
    }

    /// Where focus lands when `tab` is shown.
    pub fn initial(tab: Tab) -> Focus {
        tab.fields()
            .first()
            .copied()
            .map_or(Focus::Submit, Focus::Field)
    }
}

// ============================================================================
// Path prompt
// ============================================================================

/// Overlay asking for the path of an image file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPrompt {
    pub slot: ImageSlot,
    pub buffer: String,
}

impl PathPrompt {
    pub fn new(slot: ImageSlot) -> Self {
        Self {
            slot,
            buffer: String::new(),
        }
    }
}

// ============================================================================
// AppState
// ============================================================================

/// How the interactive session ended.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Authenticated { user: SessionUser, redirect: String },
    Cancelled,
}

pub struct AppState {
    pub auth: AuthView,
    pub session: SessionContext,
    pub focus: Focus,
    pub prompt: Option<PathPrompt>,
    pub spinner_frame: usize,
    /// Set once a redirect was issued; the app quits when it passes.
    pub exit_at: Option<Instant>,
    pub should_quit: bool,
}

impl AppState {
    pub fn new(routes: Routes, now: Instant) -> Self {
        Self::with_view(AuthView::new(routes, PreviewRegistry::new(), now))
    }

    pub fn with_view(auth: AuthView) -> Self {
        let focus = Focus::initial(auth.tab);
        Self {
            auth,
            session: SessionContext::new(),
            focus,
            prompt: None,
            spinner_frame: 0,
            exit_at: None,
            should_quit: false,
        }
    }

    pub fn focus_order(&self) -> Vec<Focus> {
        Focus::order(self.auth.tab)
    }

    /// Moves focus by `step` positions, wrapping around.
    pub fn move_focus(&mut self, step: isize) {
        let order = self.focus_order();
        let Some(len) = isize::try_from(order.len()).ok().filter(|len| *len > 0) else {
            return;
        };
        let current = order
            .iter()
            .position(|focus| *focus == self.focus)
            .and_then(|idx| isize::try_from(idx).ok())
            .unwrap_or(0);
        let next = (current + step).rem_euclid(len);
        if let Some(focus) = usize::try_from(next).ok().and_then(|idx| order.get(idx)) {
            self.focus = *focus;
        }
    }

    /// Whether the user can still change anything on the page.
    pub fn is_editable(&self) -> bool {
        self.auth.phase.is_idle()
    }

    pub fn outcome(&self) -> Outcome {
        match (&self.auth.phase, self.session.user()) {
            (Phase::Success { redirect }, Some(user)) => {
                Outcome::Authenticated {
                    user: user.clone(),
                    redirect: redirect.clone(),
                }
            }
            _ => Outcome::Cancelled,
        }
    }
}
