use clap::Subcommand;
use serde_json::json;

use crate::auth::fingerprint;
use crate::cli::config::FileTokenStore;
use crate::cli::utils::{output_error, output_success};
use crate::cli::OutputFormat;
use crate::gate::TokenStore;

#[derive(Subcommand)]
pub enum SessionCommands {
    #[command(about = "Store a session token locally")]
    Login {
        #[arg(help = "Session token")]
        token: String,
    },

    #[command(about = "Remove the locally stored token")]
    Logout,

    #[command(about = "Show whether a token is stored")]
    Status,
}

pub async fn handle(cmd: SessionCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    let store = FileTokenStore::open_default()?;

    match cmd {
        SessionCommands::Login { token } => {
            let token = token.trim();
            if token.split('.').count() != 3 {
                return Err(anyhow::anyhow!("not a session token (expected three dot-separated parts)"));
            }

            store.set(token);
            output_success(
                &output_format,
                &format!("Stored token {}", fingerprint(token)),
                Some(json!({ "fingerprint": fingerprint(token) })),
            )
        }
        SessionCommands::Logout => {
            store.remove();
            output_success(&output_format, "Logged out", None)
        }
        SessionCommands::Status => match store.get() {
            Some(token) => output_success(
                &output_format,
                &format!("Token stored ({})", fingerprint(&token)),
                Some(json!({ "stored": true, "fingerprint": fingerprint(&token) })),
            ),
            None => output_error(&output_format, "No token stored", Some("ANONYMOUS")),
        },
    }
}
