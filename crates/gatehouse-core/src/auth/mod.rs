//! The two-tab auth page controller.
//!
//! Elm-style: [`update`] folds [`AuthEvent`]s into [`AuthView`] and returns
//! [`AuthEffect`]s. Hosts run the effects; backend work goes through
//! [`perform`] and comes back as another event.

mod driver;
mod effects;
mod events;
mod handlers;
mod signup;
mod state;
mod update;

pub use driver::Driver;
pub use effects::{AuthEffect, BackendTask};
pub use events::{AuthEvent, Authenticated, FlowFailure};
pub use handlers::{oauth_redirect, perform, resolve_avatar, restore_session, sign_in, sign_out, sign_up};
pub use signup::{ProgressStore, SignUpProgress};
pub use state::{AuthView, FormState, Phase, TOAST_DURATION, Tab, Toast, ToastKind};
pub use update::update;
