//! CLI entry and dispatch.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use gatehouse_core::config::{self, Config, ConfigKey};
use gatehouse_core::logging;
use gatehouse_types::OAuthProvider;

mod commands;

#[derive(Parser)]
#[command(name = "gatehouse")]
#[command(version)]
#[command(about = "Sign in or create an account on your backend")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Config file to use instead of the default location
    #[arg(long, global = true, env = "GATEHOUSE_CONFIG", value_name = "PATH")]
    config: Option<PathBuf>,
}

/// Password input shared by the sign-in and sign-up commands.
#[derive(clap::Args, Debug, Clone)]
struct PasswordArgs {
    /// Account password
    #[arg(long, conflicts_with = "password_stdin")]
    password: Option<String>,

    /// Read the password from the first line of stdin
    #[arg(long)]
    password_stdin: bool,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Sign in with email and password
    Signin {
        #[arg(long)]
        email: String,

        #[command(flatten)]
        password: PasswordArgs,
    },

    /// Create an account (and sign in)
    Signup {
        #[arg(long)]
        username: String,

        #[arg(long)]
        email: String,

        #[command(flatten)]
        password: PasswordArgs,

        /// Password confirmation (defaults to the password)
        #[arg(long)]
        confirm_password: Option<String>,

        /// Profile photo to upload
        #[arg(long, value_name = "PATH")]
        avatar: Option<String>,

        /// Cover photo (checked, kept local)
        #[arg(long, value_name = "PATH")]
        cover: Option<String>,
    },

    /// Start an OAuth sign-in and print the consent URL
    Oauth {
        /// Provider to use (github, google)
        #[arg(value_name = "PROVIDER")]
        provider: OAuthProvider,
    },

    /// Show the signed-in account, if any
    Whoami,

    /// End the current session
    Signout,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(clap::Subcommand)]
enum ConfigCommands {
    /// Show the path to the config file
    Path,
    /// Initialize a default config file (if not present)
    Init,
    /// Set a single config value
    Set {
        /// Key to set (endpoint, project_id, bucket_id, app_origin, open_browser, request_timeout_secs)
        #[arg(value_name = "KEY")]
        key: ConfigKey,
        #[arg(value_name = "VALUE")]
        value: String,
    },
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    // The page takes over the terminal, so it logs to a file instead.
    let _log_guard = if cli.command.is_none() {
        logging::init_file(&config::paths::logs_dir()).ok()
    } else {
        logging::init_stderr();
        None
    };

    let rt = tokio::runtime::Runtime::new().context("create tokio runtime")?;
    rt.block_on(async move { dispatch(cli).await })
}

async fn dispatch(cli: Cli) -> Result<()> {
    let Cli { command, config } = cli;
    let config_path = config.unwrap_or_else(config::paths::config_path);
    let load = || Config::load_from(&config_path).context("load config");

    // default to the interactive page
    let Some(command) = command else {
        return commands::page::run(&load()?);
    };

    match command {
        Commands::Signin { email, password } => {
            let password = commands::auth::read_password(password.password, password.password_stdin)?;
            commands::auth::sign_in(&load()?, &email, &password).await
        }
        Commands::Signup {
            username,
            email,
            password,
            confirm_password,
            avatar,
            cover,
        } => {
            let password = commands::auth::read_password(password.password, password.password_stdin)?;
            let args = commands::auth::SignUpArgs {
                confirm_password: confirm_password.unwrap_or_else(|| password.clone()),
                username,
                email,
                password,
                avatar,
                cover,
            };
            commands::auth::sign_up(&load()?, args).await
        }
        Commands::Oauth { provider } => commands::auth::oauth(&load()?, provider).await,
        Commands::Whoami => commands::auth::whoami(&load()?).await,
        Commands::Signout => commands::auth::sign_out(&load()?).await,

        Commands::Config { command } => match command {
            ConfigCommands::Path => {
                commands::config::path(&config_path);
                Ok(())
            }
            ConfigCommands::Init => commands::config::init(&config_path),
            ConfigCommands::Set { key, value } => commands::config::set(&config_path, key, &value),
        },
    }
}
