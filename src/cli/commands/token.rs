use clap::Subcommand;
use serde_json::json;

use crate::auth::{self, IdentityClaims, TOKEN_LIFETIME_SECS};
use crate::cli::utils::{output_success, parse_claim};
use crate::cli::OutputFormat;
use crate::config;

#[derive(Subcommand)]
pub enum TokenCommands {
    #[command(about = "Sign a seven-day session token for a user")]
    Issue {
        #[arg(help = "User id (becomes the 'id' claim)")]
        id: String,
        #[arg(long, help = "Email claim")]
        email: Option<String>,
        #[arg(long, help = "Display name claim")]
        name: Option<String>,
        #[arg(long = "claim", value_name = "KEY=VALUE", help = "Extra claim, repeatable")]
        claims: Vec<String>,
    },

    #[command(about = "Verify a token locally and print its claims")]
    Decode {
        #[arg(help = "Session token")]
        token: String,
    },
}

pub async fn handle(cmd: TokenCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        TokenCommands::Issue { id, email, name, claims } => {
            let mut identity = IdentityClaims::new(id);
            identity.email = email;
            identity.name = name;
            for raw in &claims {
                let (key, value) = parse_claim(raw)?;
                identity = identity.with_claim(key, value);
            }

            let token = auth::issue(&identity)?;

            match output_format {
                OutputFormat::Json => output_success(
                    &output_format,
                    "Token issued",
                    Some(json!({ "token": token, "expires_in": TOKEN_LIFETIME_SECS })),
                ),
                OutputFormat::Text => {
                    println!("{}", token);
                    Ok(())
                }
            }
        }
        TokenCommands::Decode { token } => {
            let secret = config::config()
                .security
                .secret()
                .ok_or(auth::IssueError::Configuration)?;

            let claims = auth::decode(&token, secret)
                .map_err(|e| anyhow::anyhow!("token rejected: {}", e))?;

            match output_format {
                OutputFormat::Json => output_success(
                    &output_format,
                    "Token is valid",
                    Some(json!({ "claims": claims })),
                ),
                OutputFormat::Text => {
                    println!("{}", serde_json::to_string_pretty(&claims)?);
                    Ok(())
                }
            }
        }
    }
}
