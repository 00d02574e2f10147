//! Command-line interface

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::AcrValue;

/// FranceConnect OpenID Connect client
#[derive(Parser, Debug)]
#[command(name = "france-connect")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file (YAML)
    #[arg(short, long, env = "FRANCE_CONNECT_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(
        long,
        default_value = "warn",
        env = "FRANCE_CONNECT_LOG_LEVEL",
        global = true
    )]
    pub log_level: String,

    /// Log format (text, json)
    #[arg(long, env = "FRANCE_CONNECT_LOG_FORMAT", global = true)]
    pub log_format: Option<String>,

    /// Operation to run
    #[command(subcommand)]
    pub command: Command,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print a login URL together with its nonce and state
    AuthorizeUrl {
        /// ACR value to request (repeatable; default eidas1)
        #[arg(long = "acr")]
        acr_values: Vec<AcrValue>,

        /// Use this nonce instead of a random one
        #[arg(long)]
        nonce: Option<String>,

        /// Use this state instead of a random one
        #[arg(long)]
        state: Option<String>,

        /// Redirect URI (default: configured login callback)
        #[arg(long)]
        callback_url: Option<String>,
    },

    /// Print an end-session URL
    LogoutUrl {
        /// ID token received at login
        #[arg(long, required = true)]
        id_token: String,

        /// State to round-trip through the logout redirect
        #[arg(long, required = true)]
        state: String,

        /// Redirect URI (default: configured logout callback)
        #[arg(long)]
        callback_url: Option<String>,
    },

    /// Fetch the provider's OpenID configuration
    Discover,

    /// Exchange an authorization code for tokens
    Exchange {
        /// Authorization code from the login callback
        #[arg(long, required = true)]
        code: String,
    },

    /// Fetch verified user-info claims
    Userinfo {
        /// Access token from the code exchange
        #[arg(long, required = true, env = "FRANCE_CONNECT_ACCESS_TOKEN")]
        access_token: String,
    },

    /// Verify a provider-signed token and print its claims
    Verify {
        /// Compact-serialized JWT
        #[arg(long, required = true)]
        token: String,
    },
}
