use clap::{Parser, Subcommand};

/// authgate: session tokens for the user service
#[derive(Parser)]
#[command(name = "authgate", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP server
    Serve {
        /// Port to bind (overrides AUTHGATE_PORT)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Work with session tokens directly
    Token {
        #[command(subcommand)]
        command: TokenCommands,
    },

    /// Probe the revocation store and the user service once
    Health,
}

#[derive(Subcommand)]
pub enum TokenCommands {
    /// Mint a token without going through the user service
    Issue {
        #[arg(long)]
        id: i64,
        #[arg(long)]
        label: String,
    },
    /// Validate a token and print its claims and revocation state
    Inspect { token: String },
    /// Revoke a token until it expires
    Revoke { token: String },
}
