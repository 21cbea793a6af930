use super::Context;
use crate::output::print_json;
use anyhow::Context as _;
use clap::Subcommand;
use pulse_core::config::{Config, WarnLevel};
use pulse_server::auth::generate_secret;

// ---------------------------------------------------------------------------
// Subcommand types
// ---------------------------------------------------------------------------

#[derive(Subcommand)]
pub enum ConfigSubcommand {
    /// Write a default config with a freshly generated token secret
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },

    /// Print the effective config (secret redacted)
    Show,

    /// Validate the config for common mistakes
    Validate,
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub fn run(ctx: &Context, subcmd: ConfigSubcommand) -> anyhow::Result<()> {
    match subcmd {
        ConfigSubcommand::Init { force } => init(ctx, force),
        ConfigSubcommand::Show => show(ctx),
        ConfigSubcommand::Validate => validate(ctx),
    }
}

// ---------------------------------------------------------------------------
// init
// ---------------------------------------------------------------------------

fn init(ctx: &Context, force: bool) -> anyhow::Result<()> {
    let path = &ctx.config_path;
    if path.exists() && !force {
        anyhow::bail!("{} already exists; pass --force to overwrite", path.display());
    }

    let mut config = Config::default();
    config.auth.token_secret = generate_secret();
    config
        .save(path)
        .with_context(|| format!("failed to write {}", path.display()))?;

    if ctx.json {
        print_json(&serde_json::json!({ "path": path }))?;
    } else {
        println!("Wrote {}", path.display());
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// show
// ---------------------------------------------------------------------------

fn show(ctx: &Context) -> anyhow::Result<()> {
    let mut config = ctx.load_config()?;
    if !config.auth.token_secret.is_empty() {
        config.auth.token_secret = "<redacted>".to_string();
    }
    if ctx.json {
        print_json(&config)
    } else {
        print!("{}", serde_yaml::to_string(&config)?);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// validate
// ---------------------------------------------------------------------------

fn validate(ctx: &Context) -> anyhow::Result<()> {
    let config = ctx.load_config()?;
    let warnings = config.validate();

    if ctx.json {
        let value = serde_json::json!({
            "warnings": warnings,
        });
        print_json(&value)?;
    } else if warnings.is_empty() {
        println!("Config is valid. No warnings.");
    } else {
        for w in &warnings {
            let prefix = match w.level {
                WarnLevel::Warning => "warning",
                WarnLevel::Error => "error",
            };
            println!("[{prefix}] {}", w.message);
        }
    }

    if Config::has_errors(&warnings) {
        anyhow::bail!("config validation found errors");
    }

    Ok(())
}
