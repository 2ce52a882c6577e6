//! UI effect types.
//!
//! The reducer returns these; the runtime executes them. Auth effects are
//! wrapped untouched so the headless driver and the TUI share one reducer.

use std::path::PathBuf;

use gatehouse_core::auth::AuthEffect;
use gatehouse_core::media::ImageSlot;

#[derive(Debug)]
pub enum UiEffect {
    Quit,
    /// Read the file at `path` and offer it to `slot`.
    LoadImage { slot: ImageSlot, path: PathBuf },
    Auth(AuthEffect),
}

impl From<AuthEffect> for UiEffect {
    fn from(effect: AuthEffect) -> Self {
        UiEffect::Auth(effect)
    }
}
