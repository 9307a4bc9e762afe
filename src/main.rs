//! Remote Config CLI
//!
//! Reads and writes environment-scoped configuration objects in S3 and
//! secrets in AWS Secrets Manager.

use anyhow::{Context, Result};
use clap::{Args as ClapArgs, Parser, Subcommand};
use remote_config::{
    config::{AwsClients, SecretNaming, Settings},
    environment::{Environment, ProcessEnvironment},
    logging::{init_tracing, LogFormat},
    store::{S3BlobStore, SecretsManagerStore},
    ConfigAccessor, GetRequest, SetRequest, WritePair,
};
use std::path::PathBuf;
use std::sync::Arc;

/// Remote Config
///
/// Environment-scoped config and secret accessor.
#[derive(Parser, Debug)]
#[command(name = "remote-config")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Deployment environment (overrides the environment variable)
    #[arg(short, long, global = true)]
    env: Option<String>,

    /// Bucket holding config objects (overrides CONFIG_BUCKET env var)
    #[arg(long, global = true)]
    bucket: Option<String>,

    /// Secret naming on write: legacy, scoped (overrides SECRET_NAMING env var)
    #[arg(long, global = true)]
    secret_naming: Option<SecretNaming>,

    /// Log level: trace, debug, info, warn, error (overrides LOG_LEVEL env var)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    /// Read settings from this env file instead of the process environment
    #[arg(long, global = true)]
    env_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Resolve secrets and configs
    Get(GetArgs),
    /// Write secrets and configs
    Set(SetArgs),
}

#[derive(ClapArgs, Debug)]
struct GetArgs {
    /// Secret key to resolve (repeatable)
    #[arg(short, long = "secret")]
    secrets: Vec<String>,

    /// Config key to resolve (repeatable)
    #[arg(short, long = "config")]
    configs: Vec<String>,

    /// Print NAME=value lines and populate the environment
    #[arg(long)]
    export: bool,
}

#[derive(ClapArgs, Debug)]
struct SetArgs {
    /// Secret to write as NAME=VALUE (repeatable)
    #[arg(short, long = "secret", value_parser = parse_pair)]
    secrets: Vec<WritePair>,

    /// Config to write as NAME=VALUE (repeatable)
    #[arg(short, long = "config", value_parser = parse_pair)]
    configs: Vec<WritePair>,
}

/// Parse `NAME=VALUE`; values that are valid JSON are sent as structured data
fn parse_pair(raw: &str) -> Result<WritePair, String> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got `{}`", raw))?;

    let value = serde_json::from_str::<serde_json::Value>(value)
        .unwrap_or_else(|_| serde_json::Value::String(value.to_string()));

    Ok(WritePair::new(name, value))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut settings = match &args.env_file {
        Some(path) => Settings::from_env_file(path)?,
        None => Settings::load()?,
    };

    // Override settings with CLI arguments
    if let Some(bucket) = args.bucket {
        settings.config_bucket = bucket;
    }
    if let Some(naming) = args.secret_naming {
        settings.secret_naming = naming;
    }
    if let Some(log_level) = args.log_level {
        settings.log_level = log_level;
    }

    let format = if args.json_logs {
        LogFormat::Json
    } else {
        LogFormat::Plain
    };
    init_tracing(&settings.log_level, format);

    let env = ProcessEnvironment::from_settings(&settings);
    if let Some(name) = &args.env {
        env.set_var(&settings.environment_var, name);
    }

    tracing::debug!(
        environment = ?env.current_env(),
        bucket = %settings.config_bucket,
        secret_naming = %settings.secret_naming,
        "Starting"
    );

    let clients = AwsClients::load(&settings).await;
    let secrets = SecretsManagerStore::new(clients.secrets_manager);
    let blobs = S3BlobStore::new(clients.s3);
    let accessor =
        ConfigAccessor::from_settings(&settings, Arc::new(env), Arc::new(secrets), Arc::new(blobs));

    match args.command {
        Command::Get(get) => {
            let request = GetRequest::new()
                .secret_keys(get.secrets)
                .config_keys(get.configs)
                .set_environment(get.export);

            let entries = accessor.get(&request).await?;

            if get.export {
                for entry in &entries {
                    let value = entry
                        .value
                        .as_ref()
                        .map(|v| v.to_string_lossy().into_owned())
                        .unwrap_or_default();
                    println!("{}={}", entry.name.to_uppercase(), value);
                }
            } else {
                let output =
                    serde_json::to_string_pretty(&entries).context("Failed to encode entries")?;
                println!("{}", output);
            }
        }
        Command::Set(set) => {
            let request = SetRequest::new()
                .config_pairs(set.configs)
                .secret_pairs(set.secrets);

            match accessor.set(&request).await? {
                Some(outcomes) => {
                    let output = serde_json::to_string_pretty(&outcomes)
                        .context("Failed to encode outcomes")?;
                    println!("{}", output);
                }
                None => eprintln!("Local environment: nothing written"),
            }
        }
    }

    Ok(())
}
