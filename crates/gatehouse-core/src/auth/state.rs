//! Auth page state.
//!
//! ```text
//! AuthView
//! ├── tab: Tab                     (sign-in or sign-up, never both)
//! ├── phase: Phase                 (Idle -> Submitting -> Success)
//! ├── sign_in / sign_up: FormState (values, violations, touched fields)
//! ├── avatar / cover               (accepted picks with live previews)
//! ├── humor: HumorTicker           (rotating line under the heading)
//! ├── toasts: Vec<Toast>           (transient notifications)
//! └── progress                     (sign-up steps already done)
//! ```

use std::collections::HashSet;
use std::time::{Duration, Instant};

use rand::SeedableRng;
use rand::rngs::StdRng;

use super::signup::SignUpProgress;
use crate::config::Routes;
use crate::humor::{HumorTicker, SIGNIN_HUMOR_LINES, SIGNUP_HUMOR_LINES};
use crate::media::{ImageSelection, ImageSlot, PreviewRegistry};
use crate::validation::{Field, FormFields, SignInForm, SignUpForm, Violations};

/// How long a toast stays on screen.
pub const TOAST_DURATION: Duration = Duration::from_secs(4);

// ============================================================================
// Tab / Phase
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tab {
    SignIn,
    SignUp,
}

impl Tab {
    pub fn title(self) -> &'static str {
        match self {
            Tab::SignIn => "Sign In",
            Tab::SignUp => "Sign Up",
        }
    }

    pub fn heading(self) -> &'static str {
        match self {
            Tab::SignIn => "Welcome Back!",
            Tab::SignUp => "Create Account",
        }
    }

    pub fn humor_lines(self) -> &'static [&'static str] {
        match self {
            Tab::SignIn => SIGNIN_HUMOR_LINES,
            Tab::SignUp => SIGNUP_HUMOR_LINES,
        }
    }

    pub fn other(self) -> Tab {
        match self {
            Tab::SignIn => Tab::SignUp,
            Tab::SignUp => Tab::SignIn,
        }
    }

    pub fn fields(self) -> &'static [Field] {
        match self {
            Tab::SignIn => SignInForm::fields(),
            Tab::SignUp => SignUpForm::fields(),
        }
    }
}

/// Submission lifecycle. Failures go back to `Idle`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Submitting,
    /// Authenticated; the page is leaving for `redirect`.
    Success { redirect: String },
}

impl Phase {
    pub fn is_idle(&self) -> bool {
        matches!(self, Phase::Idle)
    }

    pub fn is_submitting(&self) -> bool {
        matches!(self, Phase::Submitting)
    }

    pub fn is_done(&self) -> bool {
        matches!(self, Phase::Success { .. })
    }
}

// ============================================================================
// FormState
// ============================================================================

/// Values of one form plus the latest validation result.
///
/// Validation re-runs on every change. Messages are only shown for fields
/// the user has edited, or for all fields after a refused submit.
#[derive(Debug, Clone)]
pub struct FormState<F: FormFields> {
    pub values: F,
    violations: Violations,
    touched: HashSet<Field>,
}

impl<F: FormFields> Default for FormState<F> {
    fn default() -> Self {
        let values = F::default();
        Self {
            violations: values.violations(),
            values,
            touched: HashSet::new(),
        }
    }
}

impl<F: FormFields> FormState<F> {
    pub fn set(&mut self, field: Field, value: String) {
        if !F::fields().contains(&field) {
            return;
        }
        self.values.set(field, value);
        self.touched.insert(field);
        self.violations = self.values.violations();
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Marks every field touched so all messages show.
    pub fn touch_all(&mut self) {
        self.touched.extend(F::fields().iter().copied());
    }

    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn violations(&self) -> &Violations {
        &self.violations
    }

    /// Inline message for a field, if the user has touched it.
    pub fn visible_error(&self, field: Field) -> Option<&str> {
        if self.touched.contains(&field) {
            self.violations.first(field)
        } else {
            None
        }
    }

    pub fn value(&self, field: Field) -> &str {
        self.values.value(field)
    }
}

// ============================================================================
// Toasts
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastKind {
    Success,
    Error,
    Info,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub id: u64,
    pub kind: ToastKind,
    pub message: String,
    pub created_at: Instant,
}

impl Toast {
    pub fn is_expired(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.created_at) >= TOAST_DURATION
    }
}

// ============================================================================
// AuthView
// ============================================================================

/// Everything the auth page shows and remembers.
#[derive(Debug)]
pub struct AuthView {
    pub tab: Tab,
    pub phase: Phase,
    pub sign_in: FormState<SignInForm>,
    pub sign_up: FormState<SignUpForm>,
    /// Shared by both forms' password fields.
    pub password_visible: bool,
    pub avatar: Option<ImageSelection>,
    pub cover: Option<ImageSelection>,
    /// Stored avatar of the signed-in user, once known.
    pub remote_avatar: Option<String>,
    /// An avatar upload is part of the running submission.
    pub loading_image: bool,
    pub humor: HumorTicker,
    pub toasts: Vec<Toast>,
    /// Sign-up steps that succeeded before the last failure.
    pub progress: Option<SignUpProgress>,
    pub routes: Routes,
    pub(crate) rng: StdRng,
    pub(crate) previews: PreviewRegistry,
    next_toast_id: u64,
}

impl AuthView {
    pub fn new(routes: Routes, previews: PreviewRegistry, now: Instant) -> Self {
        Self::with_rng(routes, previews, StdRng::seed_from_u64(rand::random()), now)
    }

    /// Same as [`AuthView::new`] with a caller-supplied random source.
    pub fn with_rng(routes: Routes, previews: PreviewRegistry, mut rng: StdRng, now: Instant) -> Self {
        let humor = HumorTicker::new(Tab::SignIn.humor_lines(), &mut rng, now);
        Self {
            tab: Tab::SignIn,
            phase: Phase::Idle,
            sign_in: FormState::default(),
            sign_up: FormState::default(),
            password_visible: false,
            avatar: None,
            cover: None,
            remote_avatar: None,
            loading_image: false,
            humor,
            toasts: Vec::new(),
            progress: None,
            routes,
            rng,
            previews,
            next_toast_id: 0,
        }
    }

    /// Submit is enabled only for a valid active form while nothing runs.
    pub fn can_submit(&self) -> bool {
        self.phase.is_idle() && self.active_form_valid()
    }

    pub fn active_form_valid(&self) -> bool {
        match self.tab {
            Tab::SignIn => self.sign_in.is_valid(),
            Tab::SignUp => self.sign_up.is_valid(),
        }
    }

    pub fn field_value(&self, field: Field) -> &str {
        match self.tab {
            Tab::SignIn => self.sign_in.value(field),
            Tab::SignUp => self.sign_up.value(field),
        }
    }

    pub fn field_error(&self, field: Field) -> Option<&str> {
        match self.tab {
            Tab::SignIn => self.sign_in.visible_error(field),
            Tab::SignUp => self.sign_up.visible_error(field),
        }
    }

    pub fn image(&self, slot: ImageSlot) -> Option<&ImageSelection> {
        match slot {
            ImageSlot::Avatar => self.avatar.as_ref(),
            ImageSlot::Cover => self.cover.as_ref(),
        }
    }

    pub(crate) fn image_slot_mut(&mut self, slot: ImageSlot) -> &mut Option<ImageSelection> {
        match slot {
            ImageSlot::Avatar => &mut self.avatar,
            ImageSlot::Cover => &mut self.cover,
        }
    }

    pub fn previews(&self) -> &PreviewRegistry {
        &self.previews
    }

    pub fn push_toast(&mut self, kind: ToastKind, message: impl Into<String>, now: Instant) {
        self.next_toast_id += 1;
        self.toasts.push(Toast {
            id: self.next_toast_id,
            kind,
            message: message.into(),
            created_at: now,
        });
    }

    pub fn last_toast(&self) -> Option<&Toast> {
        self.toasts.last()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn routes() -> Routes {
        Routes {
            landing_url: "http://localhost:3000/".to_string(),
            auth_url: "http://localhost:3000/start".to_string(),
        }
    }

    #[test]
    fn test_fresh_view_cannot_submit() {
        let view = AuthView::with_rng(
            routes(),
            PreviewRegistry::new(),
            StdRng::seed_from_u64(0),
            Instant::now(),
        );
        assert_eq!(view.tab, Tab::SignIn);
        assert!(!view.can_submit());
        assert!(SIGNIN_HUMOR_LINES.contains(&view.humor.current()));
    }

    #[test]
    fn test_errors_hidden_until_touched() {
        let mut form = FormState::<SignInForm>::default();
        assert!(!form.is_valid());
        assert_eq!(form.visible_error(Field::Email), None);

        form.set(Field::Email, "nope".to_string());
        assert_eq!(
            form.visible_error(Field::Email),
            Some("Please enter a valid email address")
        );
        assert_eq!(form.visible_error(Field::Password), None);

        form.touch_all();
        assert_eq!(
            form.visible_error(Field::Password),
            Some("Password must be at least 8 characters")
        );
    }

    #[test]
    fn test_form_ignores_foreign_fields() {
        let mut form = FormState::<SignInForm>::default();
        form.set(Field::Username, "ada".to_string());
        assert_eq!(form.visible_error(Field::Username), None);
        assert_eq!(form.value(Field::Username), "");
    }

    #[test]
    fn test_toast_expires_after_duration() {
        let start = Instant::now();
        let toast = Toast {
            id: 1,
            kind: ToastKind::Info,
            message: "hi".to_string(),
            created_at: start,
        };
        assert!(!toast.is_expired(start + Duration::from_millis(3_999)));
        assert!(toast.is_expired(start + TOAST_DURATION));
    }
}
