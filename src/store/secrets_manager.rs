//! Secrets Manager-backed secret store

use async_trait::async_trait;
use aws_sdk_secretsmanager::Client as SecretsManagerClient;
use aws_smithy_types::error::display::DisplayErrorContext;

use super::SecretStore;
use crate::error::{StoreError, StoreKind};
use crate::models::{EntryValue, WriteAck};

/// Secret store backed by AWS Secrets Manager.
#[derive(Clone)]
pub struct SecretsManagerStore {
    client: SecretsManagerClient,
}

impl SecretsManagerStore {
    pub fn new(client: SecretsManagerClient) -> Self {
        Self { client }
    }

    /// Get a reference to the underlying AWS SDK client
    pub fn client(&self) -> &SecretsManagerClient {
        &self.client
    }
}

#[async_trait]
impl SecretStore for SecretsManagerStore {
    async fn read(&self, id: &str) -> Result<Option<EntryValue>, StoreError> {
        tracing::debug!(secret_id = %id, "Fetching secret value");

        let output = self
            .client
            .get_secret_value()
            .secret_id(id)
            .send()
            .await
            .map_err(|e| StoreError::read(StoreKind::Secret, id, DisplayErrorContext(&e)))?;

        if let Some(text) = output.secret_string() {
            return Ok(Some(EntryValue::Text(text.to_string())));
        }

        Ok(output
            .secret_binary()
            .map(|blob| EntryValue::Bytes(blob.as_ref().to_vec())))
    }

    async fn write(&self, name: &str, value: &str) -> Result<WriteAck, StoreError> {
        tracing::debug!(secret_id = %name, "Updating secret value");

        let output = self
            .client
            .update_secret()
            .secret_id(name)
            .secret_string(value)
            .send()
            .await
            .map_err(|e| StoreError::write(StoreKind::Secret, name, DisplayErrorContext(&e)))?;

        Ok(WriteAck {
            store: StoreKind::Secret,
            key: name.to_string(),
            version: output.version_id().map(str::to_string),
        })
    }
}
