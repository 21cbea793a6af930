use super::Context;
use crate::output::print_json;
use clap::Subcommand;
use pulse_server::auth::TokenVerifier;

#[derive(Subcommand)]
pub enum TokenSubcommand {
    /// Mint a bearer token for a subject with the configured secret
    Mint { subject: String },

    /// Check a token and print the subject it carries
    Verify { token: String },
}

pub fn run(ctx: &Context, subcmd: TokenSubcommand) -> anyhow::Result<()> {
    let config = ctx.load_config()?;
    if config.auth.token_secret.is_empty() {
        anyhow::bail!(
            "auth.token_secret is not set; run `pulse config init` or set {}",
            pulse_core::config::TOKEN_SECRET_ENV
        );
    }
    let verifier = TokenVerifier::new(&config.auth.token_secret);

    match subcmd {
        TokenSubcommand::Mint { subject } => {
            let token = verifier.mint(&subject)?;
            if ctx.json {
                print_json(&serde_json::json!({ "subject": subject, "token": token }))
            } else {
                println!("{token}");
                Ok(())
            }
        }
        TokenSubcommand::Verify { token } => {
            let subject = verifier.verify(token.trim())?;
            if ctx.json {
                print_json(&serde_json::json!({ "subject": subject }))
            } else {
                println!("{subject}");
                Ok(())
            }
        }
    }
}
