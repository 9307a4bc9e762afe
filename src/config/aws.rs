//! AWS SDK clients for the config and secret stores
//!
//! The shared `SdkConfig` is loaded once and both service clients are
//! derived from it. Endpoint overrides point either client at LocalStack
//! or MinIO during development.

use aws_config::{meta::region::RegionProviderChain, BehaviorVersion, Region, SdkConfig};
use aws_sdk_s3::Client as S3Client;
use aws_sdk_secretsmanager::Client as SecretsManagerClient;

use crate::config::Settings;

/// SDK clients for both stores, built from one loaded configuration
#[derive(Clone)]
pub struct AwsClients {
    pub s3: S3Client,
    pub secrets_manager: SecretsManagerClient,
}

impl AwsClients {
    /// Resolve region and credentials, then build both clients
    pub async fn load(settings: &Settings) -> Self {
        let region_provider =
            RegionProviderChain::first_try(Region::new(settings.aws_region.clone()))
                .or_default_provider();

        let sdk_config = aws_config::defaults(BehaviorVersion::latest())
            .region(region_provider)
            .load()
            .await;

        Self::from_sdk_config(&sdk_config, settings)
    }

    /// Build both clients from an already loaded configuration
    pub fn from_sdk_config(sdk_config: &SdkConfig, settings: &Settings) -> Self {
        let mut s3 = aws_sdk_s3::config::Builder::from(sdk_config);
        if let Some(endpoint_url) = &settings.s3_endpoint_url {
            tracing::info!(endpoint = %endpoint_url, "Using custom S3 endpoint");
            // Custom endpoints rarely resolve virtual-hosted bucket names
            s3 = s3.endpoint_url(endpoint_url).force_path_style(true);
        }

        let mut secrets_manager = aws_sdk_secretsmanager::config::Builder::from(sdk_config);
        if let Some(endpoint_url) = &settings.secrets_manager_endpoint_url {
            tracing::info!(endpoint = %endpoint_url, "Using custom Secrets Manager endpoint");
            secrets_manager = secrets_manager.endpoint_url(endpoint_url);
        }

        Self {
            s3: S3Client::from_conf(s3.build()),
            secrets_manager: SecretsManagerClient::from_conf(secrets_manager.build()),
        }
    }
}
