//! Headless auth commands.
//!
//! Each command drives the same reducer as the interactive page through
//! [`Driver`], so validation, messages and redirects match.

use std::io::{self, BufRead};

use anyhow::{Context, Result, bail};
use gatehouse_core::auth::{self, AuthEvent, Driver, Phase, ProgressStore, Tab};
use gatehouse_core::backend::AppwriteClient;
use gatehouse_core::config::{BackendSettings, Config, Routes};
use gatehouse_core::media::{ImageSlot, SelectedFile, normalize_input_path};
use gatehouse_core::session::{CookieJar, SessionContext};
use gatehouse_core::validation::{Field, Violations};
use gatehouse_types::OAuthProvider;

/// Values collected from `gatehouse signup`.
pub struct SignUpArgs {
    pub username: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    pub avatar: Option<String>,
    pub cover: Option<String>,
}

/// Picks the password from the flag or the first line of stdin.
pub fn read_password(flag: Option<String>, from_stdin: bool) -> Result<String> {
    if let Some(password) = flag {
        return Ok(password);
    }
    if !from_stdin {
        bail!("A password is required. Pass --password or --password-stdin.");
    }
    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("read password from stdin")?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

fn connect(config: &Config) -> Result<(AppwriteClient, BackendSettings, CookieJar)> {
    let settings = BackendSettings::resolve(config)?;
    let jar = CookieJar::open_default();
    let client = AppwriteClient::new(&settings)?.with_cookie_jar(jar.clone());
    Ok((client, settings, jar))
}

fn driver(config: &Config) -> Result<Driver<AppwriteClient>> {
    let (client, settings, jar) = connect(config)?;
    let routes = Routes::resolve(config)?;
    Ok(Driver::new(client, settings.bucket_id, routes).with_cookie_jar(jar))
}

async fn fill(driver: &mut Driver<AppwriteClient>, values: [(Field, &str); 2]) {
    for (field, value) in values {
        driver
            .dispatch(AuthEvent::Input {
                field,
                value: value.to_string(),
            })
            .await;
    }
}

pub async fn sign_in(config: &Config, email: &str, password: &str) -> Result<()> {
    let mut driver = driver(config)?;
    fill(&mut driver, [(Field::Email, email), (Field::Password, password)]).await;
    submit(&mut driver).await
}

pub async fn sign_up(config: &Config, args: SignUpArgs) -> Result<()> {
    // Each run is a new process; an earlier failed attempt resumes from disk.
    let mut driver = driver(config)?.with_progress_store(ProgressStore::open_default());
    driver.dispatch(AuthEvent::SwitchTab(Tab::SignUp)).await;
    fill(
        &mut driver,
        [
            (Field::Username, args.username.as_str()),
            (Field::Email, args.email.as_str()),
        ],
    )
    .await;
    fill(
        &mut driver,
        [
            (Field::Password, args.password.as_str()),
            (Field::ConfirmPassword, args.confirm_password.as_str()),
        ],
    )
    .await;

    for (slot, path) in [
        (ImageSlot::Avatar, args.avatar.as_deref()),
        (ImageSlot::Cover, args.cover.as_deref()),
    ] {
        if let Some(path) = path {
            pick_image(&mut driver, slot, path).await?;
        }
    }

    submit(&mut driver).await
}

async fn pick_image(driver: &mut Driver<AppwriteClient>, slot: ImageSlot, raw: &str) -> Result<()> {
    let path = normalize_input_path(raw);
    let file = SelectedFile::from_path_for(slot, &path).with_context(|| slot.label())?;
    driver.dispatch(AuthEvent::ImagePicked { slot, file }).await;

    if driver.view().image(slot).is_none() {
        let reason = driver
            .last_toast()
            .map_or("The file was rejected", |toast| toast.message.as_str());
        bail!("{}: {reason}", slot.label());
    }
    Ok(())
}

/// Submits the active form and reports the outcome.
async fn submit(driver: &mut Driver<AppwriteClient>) -> Result<()> {
    let before = driver.toasts().len();
    driver.dispatch(AuthEvent::Submit).await;

    let view = driver.view();
    if !view.active_form_valid() {
        let lines: Vec<String> = match view.tab {
            Tab::SignIn => collect_violations(view.sign_in.violations(), view.tab),
            Tab::SignUp => collect_violations(view.sign_up.violations(), view.tab),
        };
        bail!("{}", lines.join("\n"));
    }

    let message = driver
        .toasts()
        .get(before..)
        .and_then(<[_]>::last)
        .map(|toast| toast.message.clone());

    match driver.phase() {
        Phase::Success { redirect } => {
            if let Some(message) = message {
                println!("{message}");
            }
            println!("Continue at {redirect}");
            Ok(())
        }
        _ => bail!(message.unwrap_or_else(|| "Request failed".to_string())),
    }
}

fn collect_violations(violations: &Violations, tab: Tab) -> Vec<String> {
    violations
        .lines(tab.fields())
        .map(|(field, message)| format!("{}: {message}", field.label()))
        .collect()
}

pub async fn oauth(config: &Config, provider: OAuthProvider) -> Result<()> {
    let mut driver = driver(config)?;
    driver.dispatch(AuthEvent::OAuth(provider)).await;

    let Some(url) = driver.external_urls().last() else {
        let reason = driver
            .last_toast()
            .map_or("Could not start OAuth sign-in", |toast| toast.message.as_str());
        bail!("{reason}");
    };

    println!("{url}");
    if config.open_browser
        && let Err(err) = open::that(url)
    {
        tracing::warn!("could not open browser: {err}");
    }
    Ok(())
}

pub async fn whoami(config: &Config) -> Result<()> {
    let mut driver = driver(config)?;
    driver.dispatch(AuthEvent::Mount).await;

    let Some(user) = driver.session().user() else {
        bail!("Not signed in.");
    };
    println!("{} <{}>", user.display_name(), user.email);
    if let Some(avatar) = driver.session().avatar_url() {
        println!("Avatar: {avatar}");
    }
    Ok(())
}

pub async fn sign_out(config: &Config) -> Result<()> {
    let (client, _, jar) = connect(config)?;
    let mut session = SessionContext::new();

    match auth::sign_out(&client, &mut session, Some(&jar)).await {
        Ok(()) => println!("Signed out."),
        Err(err) if err.is_unauthorized() => println!("No active session."),
        Err(err) => {
            return Err(err).context("Signed out locally, but the backend session was not ended");
        }
    }
    Ok(())
}
