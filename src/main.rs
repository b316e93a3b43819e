use std::path::{Path, PathBuf};

use clap::Parser;
use nscm::{
    cache::{CACHE_FILE_NAME, SessionCache},
    config::{self, ConfigError, LoggingConfig, Settings},
    observability,
    prompt::{SystemBrowser, TerminalPrompter},
    signin::{self, SessionResult, SigninOptions, SigninPaths},
};

#[derive(Parser, Debug)]
#[command(version, about = "Certified modules command-line tool", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Path to settings file (defaults to ./nscm.toml, then
    /// ~/.config/nscm/nscm.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(clap::Subcommand, Debug)]
enum Command {
    /// Sign in and configure npm for your team's certified registry
    Signin {
        /// Sign in through GitHub
        #[arg(long, conflicts_with = "google")]
        github: bool,
        /// Sign in through Google
        #[arg(long)]
        google: bool,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let args = Args::parse();

    let settings = load_settings(args.config.as_deref());

    // Fall back to default logging so settings errors are still reported
    let logging = match &settings {
        Ok((_, settings)) => settings.logging.clone(),
        Err(_) => LoggingConfig::default(),
    };
    if let Err(e) = observability::init_tracing(&logging) {
        eprintln!("{e}");
    }

    match args.command {
        Command::Signin { github, google } => {
            let options = SigninOptions { github, google };
            let result = match settings {
                Ok((path, settings)) => {
                    tracing::debug!(path = %path.display(), "Loaded settings");
                    run_signin(&settings, options).await
                }
                Err(e) => Err(e.into()),
            };
            if let Err(e) = result {
                eprintln!("signin failed: {e}");
                std::process::exit(1);
            }
        }
    }
}

fn load_settings(explicit_path: Option<&Path>) -> Result<(PathBuf, Settings), ConfigError> {
    let path = config::resolve_config_path(explicit_path)?;
    let settings = Settings::from_file(&path)?;
    Ok((path, settings))
}

async fn run_signin(
    settings: &Settings,
    options: SigninOptions,
) -> Result<(), Box<dyn std::error::Error>> {
    let paths = SigninPaths::from_environment()?;
    let mut prompter = TerminalPrompter::new();
    let browser = SystemBrowser;

    let session = signin::signin(
        options.method(),
        &settings.session,
        &paths,
        &mut prompter,
        &browser,
    )
    .await?;

    cache_session(&session).await;

    println!();
    println!("Signed in to team {}.", display_team(&session));
    println!("  Token written to {}", paths.global_npmrc.display());
    println!("  Registry {} set in {}", session.registry, paths.local_npmrc.display());

    Ok(())
}

/// The cache is a convenience for later commands; failing to write it does
/// not fail the sign-in.
async fn cache_session(session: &SessionResult) {
    let Some(path) = config::default_config_dir().map(|dir| dir.join(CACHE_FILE_NAME)) else {
        return;
    };

    let mut cache = match SessionCache::load(&path).await {
        Ok(cache) => cache,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Ignoring unreadable session cache");
            SessionCache::default()
        }
    };
    cache.record(session);

    if let Err(e) = cache.store(&path).await {
        tracing::warn!(path = %path.display(), error = %e, "Failed to store session cache");
    }
}

fn display_team(session: &SessionResult) -> &str {
    if session.team.name.is_empty() {
        &session.team.id
    } else {
        &session.team.name
    }
}
