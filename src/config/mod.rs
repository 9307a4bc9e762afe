//! Configuration management module
//!
//! This module handles loading and validating accessor configuration
//! from environment variables and .env files.

pub mod aws;
pub mod settings;

pub use aws::AwsClients;
pub use settings::{
    SecretNaming, Settings, DEFAULT_CONFIG_BUCKET, DEFAULT_ENVIRONMENT_VAR, LOCAL_ENVIRONMENT,
};
