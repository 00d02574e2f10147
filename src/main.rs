//! FranceConnect CLI
//!
//! Runs the client operations from the command line and prints JSON.

use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use serde_json::json;
use tracing::error;

use france_connect::{
    AuthorizationOptions, ClientConfig, FranceConnectClient,
    cli::{Cli, Command},
    setup_tracing,
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = setup_tracing(&cli.log_level, cli.log_format.as_deref()) {
        eprintln!("Failed to setup tracing: {e}");
        return ExitCode::FAILURE;
    }

    match run(cli).await {
        Ok(output) => {
            println!("{output}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "Command failed");
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<String> {
    let config = ClientConfig::load(cli.config.as_deref()).context("loading configuration")?;
    let client = FranceConnectClient::new(config)?;

    let value = match cli.command {
        Command::AuthorizeUrl {
            acr_values,
            nonce,
            state,
            callback_url,
        } => {
            let mut options = AuthorizationOptions::new();
            if !acr_values.is_empty() {
                options = options.acr_values(acr_values);
            }
            options.nonce = nonce;
            options.state = state;
            options.callback_url = callback_url;

            let request = client.authorization_url(options);
            json!({
                "url": request.url.as_str(),
                "nonce": request.nonce,
                "state": request.state,
            })
        }
        Command::LogoutUrl {
            id_token,
            state,
            callback_url,
        } => {
            let url = client.logout_url(&id_token, &state, callback_url.as_deref());
            json!({ "url": url.as_str() })
        }
        Command::Discover => serde_json::Value::Object(
            client
                .provider_configuration()
                .await
                .context("fetching OpenID configuration")?,
        ),
        Command::Exchange { code } => {
            let (token, claims) = client
                .exchange_code(&code)
                .await
                .context("exchanging authorization code")?;
            json!({ "token": token, "id_token_claims": claims })
        }
        Command::Userinfo { access_token } => serde_json::to_value(
            client
                .user_info(&access_token)
                .await
                .context("fetching user info")?,
        )?,
        Command::Verify { token } => serde_json::to_value(
            client
                .verify_token(&token)
                .await
                .context("verifying token")?,
        )?,
    };

    Ok(serde_json::to_string_pretty(&value)?)
}
