use clap::{Parser, Subcommand};
use oauth2_newsletter2go::{
    AccessToken, Grant, Newsletter2GoProvider, OAuthClient, OAuthClientConfig, OAuthError,
    ProviderOptions, TokenParams,
};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "nl2go-oauth",
    about = "Obtain Newsletter2Go access tokens and account details, printed as JSON."
)]
struct Cli {
    /// Auth key from the Newsletter2Go account settings.
    #[arg(long, env = "NL2GO_AUTH_KEY", hide_env_values = true)]
    auth_key: String,

    #[arg(long, env = "NL2GO_CLIENT_ID")]
    client_id: Option<String>,

    /// API base URL, e.g. a staging host.
    #[arg(long, env = "NL2GO_ENDPOINT")]
    endpoint: Option<String>,

    /// Request timeout in seconds.
    #[arg(long)]
    timeout_secs: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Exchange account credentials for an access token.
    Token {
        #[arg(long)]
        username: String,
        #[arg(long, env = "NL2GO_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Trade a refresh token for a new access token.
    Refresh {
        #[arg(long)]
        refresh_token: String,
    },
    /// Show the user behind an access token.
    Me {
        #[arg(long)]
        access_token: String,
        #[arg(long)]
        account_id: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), OAuthError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let client = build_client(&cli)?;

    match cli.command {
        Command::Token { username, password } => {
            let params = TokenParams::from([
                ("username".to_string(), username),
                ("password".to_string(), password),
            ]);
            let token = client.get_access_token(Grant::Password, params).await?;
            print_json(&token)
        }
        Command::Refresh { refresh_token } => {
            let token = AccessToken::new(String::new()).with_refresh_token(refresh_token);
            let token = client.refresh_access_token(&token).await?;
            print_json(&token)
        }
        Command::Me {
            access_token,
            account_id,
        } => {
            let token = AccessToken::new(access_token).with_value("account_id", account_id);
            let owner = client.get_resource_owner(&token).await?;
            print_json(&owner)
        }
    }
}

fn build_client(cli: &Cli) -> Result<OAuthClient<Newsletter2GoProvider>, OAuthError> {
    let mut options = ProviderOptions::new();
    options.insert("authKey".to_string(), cli.auth_key.clone());
    if let Some(client_id) = &cli.client_id {
        options.insert("clientId".to_string(), client_id.clone());
    }
    if let Some(timeout) = cli.timeout_secs {
        options.insert("timeout".to_string(), timeout.to_string());
    }

    let (mut provider, rest) = Newsletter2GoProvider::from_options(options)?;
    if let Some(endpoint) = &cli.endpoint {
        provider = provider.with_endpoint(endpoint.clone());
    }
    let config = OAuthClientConfig::from_options(rest)?;

    OAuthClient::new(provider, config)
}

fn print_json<T: Serialize>(value: &T) -> Result<(), OAuthError> {
    let output =
        serde_json::to_string_pretty(value).map_err(|err| OAuthError::InvalidResponse {
            message: err.to_string(),
            body: String::new(),
        })?;

    println!("{output}");
    Ok(())
}
