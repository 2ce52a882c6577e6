//! Interactive auth page.

use anyhow::Result;
use gatehouse_core::backend::AppwriteClient;
use gatehouse_core::config::{BackendSettings, Config, Routes};
use gatehouse_core::session::CookieJar;
use gatehouse_tui::{Outcome, RuntimeOptions};

pub fn run(config: &Config) -> Result<()> {
    let settings = BackendSettings::resolve(config)?;
    let routes = Routes::resolve(config)?;
    let jar = CookieJar::open_default();
    let client = AppwriteClient::new(&settings)?.with_cookie_jar(jar.clone());

    let outcome = gatehouse_tui::run_auth_page(
        client,
        RuntimeOptions {
            routes,
            bucket_id: settings.bucket_id,
            open_browser: config.open_browser,
            cookie_jar: Some(jar),
        },
    )?;

    if let Outcome::Authenticated { user, redirect } = outcome {
        println!("Signed in as {}.", user.display_name());
        println!("Continue at {redirect}");
    }
    Ok(())
}
