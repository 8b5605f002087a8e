use std::time::Duration;

use clap::{Parser, Subcommand};
use spotify_auth::{AuthError, Authenticator, LocalServerConfig, Scope};
use tracing_subscriber::EnvFilter;

const DEFAULT_REDIRECT_URI: &str = "http://127.0.0.1:8888/callback";

#[derive(Debug, Parser)]
#[command(
    name = "spotify-auth",
    about = "Authorize against a Spotify account and print the access token as JSON."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the authorization code flow in a browser.
    Login {
        /// Redirect URI registered for the app; must be a local http address.
        #[arg(long, default_value = DEFAULT_REDIRECT_URI)]
        redirect_uri: String,
        /// Scope to request; repeat for several.
        #[arg(long = "scope")]
        scopes: Vec<Scope>,
        /// Ask again even if the user already approved the app.
        #[arg(long)]
        show_dialog: bool,
        /// Seconds to wait for the callback.
        #[arg(long, default_value_t = 300)]
        timeout: u64,
    },
    /// List the scopes this tool knows about.
    Scopes,
}

#[tokio::main]
async fn main() -> Result<(), AuthError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Login {
            redirect_uri,
            scopes,
            show_dialog,
            timeout,
        } => run_login(redirect_uri, scopes, show_dialog, timeout).await,
        Command::Scopes => {
            for scope in Scope::ALL {
                println!("{scope}");
            }
            Ok(())
        }
    }
}

async fn run_login(
    redirect_uri: String,
    scopes: Vec<Scope>,
    show_dialog: bool,
    timeout: u64,
) -> Result<(), AuthError> {
    let config =
        LocalServerConfig::from_redirect_uri(&redirect_uri)?.with_timeout(Duration::from_secs(timeout));
    let auth = Authenticator::new(redirect_uri, scopes);
    if auth.credentials().client_id.is_empty() {
        eprintln!("SPOTIFY_ID is not set; the provider will reject the request.");
    }

    let token = auth
        .run_local_flow_with(config, show_dialog, |url| {
            eprintln!("Authorization URL:\n{url}");
            if let Err(err) = webbrowser::open(url) {
                eprintln!("Failed to open browser automatically: {err}");
            }
            Ok(())
        })
        .await?;

    let output =
        serde_json::to_string_pretty(&token).map_err(|err| AuthError::InvalidResponse {
            message: err.to_string(),
            body: String::new(),
        })?;

    println!("{output}");
    Ok(())
}
