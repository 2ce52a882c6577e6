//! Full-screen sign-in / sign-up page for Gatehouse.

pub mod effects;
pub mod events;
pub mod render;
pub mod runtime;
pub mod state;
pub mod terminal;
pub mod update;

use std::io::{IsTerminal, stdout};

use anyhow::Result;
use gatehouse_core::backend::Backend;
pub use runtime::{RuntimeOptions, TuiRuntime};
pub use state::Outcome;

/// Shows the auth page until the user signs in or leaves.
///
/// Must be called from within a Tokio runtime; backend calls are spawned
/// onto it.
pub fn run_auth_page<B>(backend: B, options: RuntimeOptions) -> Result<Outcome>
where
    B: Backend + Send + Sync + 'static,
{
    if !stdout().is_terminal() {
        anyhow::bail!(
            "The auth page requires a terminal.\n\
             Use `gatehouse signin` or `gatehouse signup` for non-interactive use."
        );
    }

    let mut runtime = TuiRuntime::new(backend, options)?;
    let outcome = runtime.run();
    drop(runtime);
    outcome
}
