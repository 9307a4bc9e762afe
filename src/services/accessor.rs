//! Config and secret accessor
//!
//! `ConfigAccessor` resolves configuration keys from the blob store and
//! secret keys from the secret store, scoped to the current deployment
//! environment, and writes values back the same way. When the environment
//! is `local` every call is served from environment variables instead and
//! no store is contacted.

use futures::future::try_join_all;
use std::sync::Arc;

use crate::config::{SecretNaming, Settings, DEFAULT_CONFIG_BUCKET, LOCAL_ENVIRONMENT};
use crate::environment::{set_env_vars, Environment};
use crate::error::StoreError;
use crate::models::{EntryValue, GetRequest, ResolvedEntry, SetRequest, WriteOutcome, WritePair};
use crate::store::{BlobStore, ObjectAcl, SecretStore};

/// Facade over the secret store, the blob store and the environment.
#[derive(Clone)]
pub struct ConfigAccessor {
    env: Arc<dyn Environment>,
    secrets: Arc<dyn SecretStore>,
    blobs: Arc<dyn BlobStore>,
    bucket: String,
    secret_naming: SecretNaming,
}

impl ConfigAccessor {
    /// Create an accessor using the default bucket and legacy secret naming
    pub fn new(
        env: Arc<dyn Environment>,
        secrets: Arc<dyn SecretStore>,
        blobs: Arc<dyn BlobStore>,
    ) -> Self {
        Self {
            env,
            secrets,
            blobs,
            bucket: DEFAULT_CONFIG_BUCKET.to_string(),
            secret_naming: SecretNaming::default(),
        }
    }

    /// Create an accessor with bucket and naming taken from settings
    pub fn from_settings(
        settings: &Settings,
        env: Arc<dyn Environment>,
        secrets: Arc<dyn SecretStore>,
        blobs: Arc<dyn BlobStore>,
    ) -> Self {
        Self::new(env, secrets, blobs)
            .with_bucket(settings.config_bucket.clone())
            .with_secret_naming(settings.secret_naming)
    }

    pub fn with_bucket(mut self, bucket: impl Into<String>) -> Self {
        self.bucket = bucket.into();
        self
    }

    pub fn with_secret_naming(mut self, naming: SecretNaming) -> Self {
        self.secret_naming = naming;
        self
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Resolve the requested keys, optionally mirroring them into the
    /// environment under uppercased names.
    ///
    /// Secrets come first, then configs, each group in request order.
    /// Any single store failure fails the whole call.
    pub async fn get(&self, request: &GetRequest) -> Result<Vec<ResolvedEntry>, StoreError> {
        let current = self.env.current_env();
        let entries = self.resolve_in(current.as_deref(), request).await?;

        // Local mode never populates
        if request.set_environment && !entries.is_empty() && !is_local(current.as_deref()) {
            self.populate(&entries);
        }

        Ok(entries)
    }

    /// Resolve the requested keys without touching the environment
    pub async fn resolve(&self, request: &GetRequest) -> Result<Vec<ResolvedEntry>, StoreError> {
        let current = self.env.current_env();
        self.resolve_in(current.as_deref(), request).await
    }

    async fn resolve_in(
        &self,
        current: Option<&str>,
        request: &GetRequest,
    ) -> Result<Vec<ResolvedEntry>, StoreError> {
        if is_local(current) {
            return Ok(self.resolve_local(request));
        }

        let env_name = scope_name(current);
        tracing::debug!(
            environment = %env_name,
            secrets = request.secret_keys.len(),
            configs = request.config_keys.len(),
            "Resolving remote values"
        );

        let (mut secrets, configs) = futures::try_join!(
            self.fetch_secrets(env_name, &request.secret_keys),
            self.fetch_configs(env_name, &request.config_keys),
        )?;

        secrets.extend(configs);
        Ok(secrets)
    }

    /// Write entries into the environment under uppercased names
    pub fn populate(&self, entries: &[ResolvedEntry]) {
        set_env_vars(self.env.as_ref(), entries);
    }

    /// Write the given pairs to their stores.
    ///
    /// Returns `None` without writing anything when running locally.
    /// Otherwise returns one outcome per pair, configs first, then secrets.
    /// Pairs lacking a name or value yield [`WriteOutcome::Absent`].
    pub async fn set(&self, request: &SetRequest) -> Result<Option<Vec<WriteOutcome>>, StoreError> {
        let current = self.env.current_env();
        if is_local(current.as_deref()) {
            tracing::debug!("Local environment, skipping store writes");
            return Ok(None);
        }

        let env_name = scope_name(current.as_deref());

        let (mut outcomes, secrets) = futures::try_join!(
            self.store_configs(env_name, &request.config_pairs),
            self.store_secrets(env_name, &request.secret_pairs),
        )?;

        outcomes.extend(secrets);

        tracing::info!(
            environment = %env_name,
            written = outcomes.iter().filter(|o| !o.is_absent()).count(),
            skipped = outcomes.iter().filter(|o| o.is_absent()).count(),
            "Stored values"
        );

        Ok(Some(outcomes))
    }

    fn resolve_local(&self, request: &GetRequest) -> Vec<ResolvedEntry> {
        request
            .secret_keys
            .iter()
            .chain(&request.config_keys)
            .map(|key| ResolvedEntry::new(key.clone(), self.env.var(key).map(EntryValue::Text)))
            .collect()
    }

    async fn fetch_secrets(
        &self,
        env_name: &str,
        keys: &[String],
    ) -> Result<Vec<ResolvedEntry>, StoreError> {
        try_join_all(keys.iter().map(|key| async move {
            let value = self.secrets.read(&secret_read_id(env_name, key)).await?;
            Ok::<_, StoreError>(ResolvedEntry::new(key.clone(), value))
        }))
        .await
    }

    async fn fetch_configs(
        &self,
        env_name: &str,
        keys: &[String],
    ) -> Result<Vec<ResolvedEntry>, StoreError> {
        try_join_all(keys.iter().map(|key| async move {
            let body = self.blobs.read(&self.bucket, &config_key(env_name, key)).await?;
            Ok::<_, StoreError>(ResolvedEntry::new(key.clone(), Some(EntryValue::Bytes(body))))
        }))
        .await
    }

    async fn store_configs(
        &self,
        env_name: &str,
        pairs: &[WritePair],
    ) -> Result<Vec<WriteOutcome>, StoreError> {
        try_join_all(pairs.iter().map(|pair| async move {
            let Some((name, payload)) = pair.validated() else {
                return Ok::<_, StoreError>(WriteOutcome::Absent);
            };

            let ack = self
                .blobs
                .write(
                    &self.bucket,
                    &config_key(env_name, name),
                    payload.into_bytes(),
                    ObjectAcl::BucketOwnerFullControl,
                )
                .await?;
            Ok(WriteOutcome::Written(ack))
        }))
        .await
    }

    async fn store_secrets(
        &self,
        env_name: &str,
        pairs: &[WritePair],
    ) -> Result<Vec<WriteOutcome>, StoreError> {
        try_join_all(pairs.iter().map(|pair| async move {
            let Some((name, payload)) = pair.validated() else {
                return Ok::<_, StoreError>(WriteOutcome::Absent);
            };

            let secret_name = match self.secret_naming {
                SecretNaming::Legacy => name.to_string(),
                SecretNaming::Scoped => secret_read_id(env_name, name),
            };

            let ack = self.secrets.write(&secret_name, &payload).await?;
            Ok(WriteOutcome::Written(ack))
        }))
        .await
    }
}

fn is_local(current: Option<&str>) -> bool {
    current == Some(LOCAL_ENVIRONMENT)
}

/// Environment name used to scope keys; empty when unset
fn scope_name(current: Option<&str>) -> &str {
    current.unwrap_or_else(|| {
        tracing::warn!("Deployment environment is not set, using unscoped keys");
        ""
    })
}

/// Secret id read for `key` in environment `env_name`
fn secret_read_id(env_name: &str, key: &str) -> String {
    format!("{}_{}", env_name, key)
}

/// Object key for config `key` in environment `env_name`
fn config_key(env_name: &str, key: &str) -> String {
    format!("{}/{}", env_name, key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::MemoryEnvironment;
    use crate::error::StoreKind;
    use crate::store::{MemoryBlobStore, MemorySecretStore, StoreCall};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Fixture {
        env: Arc<MemoryEnvironment>,
        secrets: Arc<MemorySecretStore>,
        blobs: Arc<MemoryBlobStore>,
        accessor: ConfigAccessor,
    }

    fn fixture_with(
        env: MemoryEnvironment,
        secrets: MemorySecretStore,
        blobs: MemoryBlobStore,
    ) -> Fixture {
        let env = Arc::new(env);
        let secrets = Arc::new(secrets);
        let blobs = Arc::new(blobs);
        let accessor = ConfigAccessor::new(env.clone(), secrets.clone(), blobs.clone());
        Fixture {
            env,
            secrets,
            blobs,
            accessor,
        }
    }

    fn fixture(env_name: &str) -> Fixture {
        fixture_with(
            MemoryEnvironment::new(env_name),
            MemorySecretStore::new()
                .with_secret("test_secret1", "s3cr3t")
                .with_secret("test_secret2", "other"),
            MemoryBlobStore::new()
                .with_object("configs", "test/config1", b"{\"a\":1}".to_vec())
                .with_object("configs", "test/config2", b"plain".to_vec()),
        )
    }

    fn text(value: &str) -> Option<EntryValue> {
        Some(EntryValue::Text(value.to_string()))
    }

    #[tokio::test]
    async fn test_get_reads_secret_with_env_prefix() {
        let f = fixture("test");
        let entries = f
            .accessor
            .get(&GetRequest::new().secret_keys(["secret1"]))
            .await
            .unwrap();

        assert_eq!(entries, vec![ResolvedEntry::new("secret1", text("s3cr3t"))]);
        assert_eq!(
            f.secrets.calls(),
            vec![StoreCall::GetSecretValue {
                secret_id: "test_secret1".to_string()
            }]
        );
        assert!(f.blobs.calls().is_empty());
    }

    #[tokio::test]
    async fn test_get_reads_config_from_bucket() {
        let f = fixture("test");
        let entries = f
            .accessor
            .get(&GetRequest::new().config_keys(["config1"]))
            .await
            .unwrap();

        assert_eq!(
            entries,
            vec![ResolvedEntry::new(
                "config1",
                Some(EntryValue::Bytes(b"{\"a\":1}".to_vec()))
            )]
        );
        assert_eq!(
            f.blobs.calls(),
            vec![StoreCall::GetObject {
                bucket: "configs".to_string(),
                key: "test/config1".to_string()
            }]
        );
    }

    #[tokio::test]
    async fn test_get_orders_secrets_before_configs() {
        let f = fixture("test");
        let entries = f
            .accessor
            .get(
                &GetRequest::new()
                    .config_keys(["config2", "config1"])
                    .secret_keys(["secret2", "secret1"]),
            )
            .await
            .unwrap();

        let names: Vec<_> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["secret2", "secret1", "config2", "config1"]);
    }

    #[tokio::test]
    async fn test_get_duplicate_keys_give_duplicate_entries() {
        let f = fixture("test");
        let entries = f
            .accessor
            .get(&GetRequest::new().secret_keys(["secret1", "secret1"]))
            .await
            .unwrap();

        assert_eq!(entries.len(), 2);
        assert_eq!(f.secrets.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_get_set_environment_populates_uppercased_vars() {
        let f = fixture("test");
        f.accessor
            .get(
                &GetRequest::new()
                    .config_keys(["config1"])
                    .secret_keys(["secret1"])
                    .set_environment(true),
            )
            .await
            .unwrap();

        let vars = f.env.vars();
        assert_eq!(vars.get("SECRET1").map(String::as_str), Some("s3cr3t"));
        assert_eq!(vars.get("CONFIG1").map(String::as_str), Some("{\"a\":1}"));
    }

    #[tokio::test]
    async fn test_resolve_does_not_touch_environment() {
        let f = fixture("test");
        let request = GetRequest::new().secret_keys(["secret1"]).set_environment(true);
        let entries = f.accessor.resolve(&request).await.unwrap();

        assert_eq!(entries.len(), 1);
        assert!(f.env.vars().is_empty());
    }

    #[tokio::test]
    async fn test_get_local_reads_raw_env_vars() {
        let f = fixture_with(
            MemoryEnvironment::new("local")
                .with_var("config1", "from-env")
                .with_var("SECRET1", "uppercase-only"),
            MemorySecretStore::new(),
            MemoryBlobStore::new(),
        );

        let entries = f
            .accessor
            .get(
                &GetRequest::new()
                    .config_keys(["config1"])
                    .secret_keys(["secret1"])
                    .set_environment(true),
            )
            .await
            .unwrap();

        assert_eq!(
            entries,
            vec![
                ResolvedEntry::new("secret1", None),
                ResolvedEntry::new("config1", text("from-env")),
            ]
        );
        assert!(f.secrets.calls().is_empty());
        assert!(f.blobs.calls().is_empty());
        assert!(f.env.var("CONFIG1").is_none());
    }

    #[tokio::test]
    async fn test_get_observes_environment_changes() {
        let f = fixture("local");
        let request = GetRequest::new().secret_keys(["secret1"]);

        f.accessor.get(&request).await.unwrap();
        assert!(f.secrets.calls().is_empty());

        f.env.set_current(Some("test"));
        f.accessor.get(&request).await.unwrap();
        assert_eq!(f.secrets.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_get_fails_on_any_read_failure() {
        let f = fixture("test");
        f.blobs.fail_on("test/config2");

        let err = f
            .accessor
            .get(
                &GetRequest::new()
                    .secret_keys(["secret1"])
                    .config_keys(["config1", "config2"])
                    .set_environment(true),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, StoreError::Read { store: StoreKind::Blob, .. }));
        assert_eq!(err.key(), "test/config2");
        assert!(f.env.vars().is_empty());
    }

    #[tokio::test]
    async fn test_get_empty_request_returns_nothing() {
        let f = fixture("test");
        let entries = f.accessor.get(&GetRequest::new().set_environment(true)).await.unwrap();
        assert!(entries.is_empty());
    }

    #[tokio::test]
    async fn test_set_writes_config_verbatim_with_acl() {
        let f = fixture("test");
        let outcomes = f
            .accessor
            .set(&SetRequest::new().config_pairs([WritePair::new("config1", "value1")]))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].ack().map(|a| a.key.as_str()), Some("test/config1"));
        assert_eq!(
            f.blobs.calls(),
            vec![StoreCall::PutObject {
                bucket: "configs".to_string(),
                key: "test/config1".to_string(),
                body: b"value1".to_vec(),
                acl: ObjectAcl::BucketOwnerFullControl,
            }]
        );
    }

    #[tokio::test]
    async fn test_set_stringifies_structured_values() {
        let f = fixture("test");
        f.accessor
            .set(
                &SetRequest::new()
                    .config_pairs([WritePair::new("config1", json!({ "moshe": "yakov" }))])
                    .secret_pairs([WritePair::new("secret1", json!({ "moshe": "yakov" }))]),
            )
            .await
            .unwrap();

        assert_eq!(
            f.blobs.object("configs", "test/config1"),
            Some(br#"{"moshe":"yakov"}"#.to_vec())
        );
        assert_eq!(
            f.secrets.calls(),
            vec![StoreCall::UpdateSecret {
                name: "secret1".to_string(),
                secret_string: r#"{"moshe":"yakov"}"#.to_string(),
            }]
        );
    }

    #[tokio::test]
    async fn test_set_secret_uses_bare_name_by_default() {
        let f = fixture("test");
        f.accessor
            .set(&SetRequest::new().secret_pairs([WritePair::new("secret1", "value1")]))
            .await
            .unwrap();

        assert_eq!(f.secrets.secret("secret1"), text("value1"));
    }

    #[tokio::test]
    async fn test_set_secret_scoped_naming() {
        let mut f = fixture("test");
        f.accessor = f.accessor.clone().with_secret_naming(SecretNaming::Scoped);

        f.accessor
            .set(&SetRequest::new().secret_pairs([WritePair::new("secret1", "rotated")]))
            .await
            .unwrap();

        assert_eq!(f.secrets.secret("test_secret1"), text("rotated"));
        let entries = f
            .accessor
            .get(&GetRequest::new().secret_keys(["secret1"]))
            .await
            .unwrap();
        assert_eq!(entries[0].value, text("rotated"));
    }

    #[tokio::test]
    async fn test_set_local_returns_none() {
        let f = fixture("local");
        let result = f
            .accessor
            .set(&SetRequest::new().secret_pairs([WritePair::new("secret1", json!({ "a": 1 }))]))
            .await
            .unwrap();

        assert!(result.is_none());
        assert!(f.secrets.calls().is_empty());
    }

    #[tokio::test]
    async fn test_set_empty_request_returns_empty() {
        let f = fixture("test");
        let result = f.accessor.set(&SetRequest::new()).await.unwrap();
        assert_eq!(result, Some(vec![]));
    }

    #[tokio::test]
    async fn test_set_missing_value_is_absent() {
        let f = fixture("test");
        let partial = WritePair {
            name: Some("moshe".to_string()),
            value: None,
        };

        let configs = f
            .accessor
            .set(&SetRequest::new().config_pairs([partial.clone()]))
            .await
            .unwrap();
        assert_eq!(configs, Some(vec![WriteOutcome::Absent]));

        let secrets = f
            .accessor
            .set(&SetRequest::new().secret_pairs([partial]))
            .await
            .unwrap();
        assert_eq!(secrets, Some(vec![WriteOutcome::Absent]));

        assert!(f.blobs.calls().is_empty());
        assert!(f.secrets.calls().is_empty());
    }

    #[tokio::test]
    async fn test_set_orders_configs_before_secrets() {
        let f = fixture("test");
        let outcomes = f
            .accessor
            .set(
                &SetRequest::new()
                    .secret_pairs([WritePair::new("secret1", "a")])
                    .config_pairs([WritePair::default(), WritePair::new("config1", "b")]),
            )
            .await
            .unwrap()
            .unwrap();

        assert_eq!(outcomes.len(), 3);
        assert!(outcomes[0].is_absent());
        assert_eq!(outcomes[1].ack().map(|a| a.store), Some(StoreKind::Blob));
        assert_eq!(outcomes[2].ack().map(|a| a.store), Some(StoreKind::Secret));
    }

    #[tokio::test]
    async fn test_set_fails_on_any_write_failure() {
        let f = fixture("test");
        f.secrets.fail_on("secret1");

        let err = f
            .accessor
            .set(
                &SetRequest::new()
                    .config_pairs([WritePair::new("config1", "a")])
                    .secret_pairs([WritePair::new("secret1", "b")]),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, StoreError::Write { store: StoreKind::Secret, .. }));
    }

    #[tokio::test]
    async fn test_custom_bucket_and_missing_environment() {
        let f = fixture_with(
            MemoryEnvironment::default(),
            MemorySecretStore::new(),
            MemoryBlobStore::new().with_object("team-configs", "/config1", b"x".to_vec()),
        );
        let accessor = f.accessor.clone().with_bucket("team-configs");

        let entries = accessor
            .get(&GetRequest::new().config_keys(["config1"]))
            .await
            .unwrap();
        assert_eq!(entries[0].value, Some(EntryValue::Bytes(b"x".to_vec())));
        assert_eq!(accessor.bucket(), "team-configs");
    }

    /// Reports `local` on the first read and `test` on every later one
    struct SwitchingEnvironment {
        inner: MemoryEnvironment,
        reads: AtomicUsize,
    }

    impl Environment for SwitchingEnvironment {
        fn current_env(&self) -> Option<String> {
            match self.reads.fetch_add(1, Ordering::SeqCst) {
                0 => Some("local".to_string()),
                _ => Some("test".to_string()),
            }
        }

        fn var(&self, name: &str) -> Option<String> {
            self.inner.var(name)
        }

        fn set_var(&self, name: &str, value: &str) {
            self.inner.set_var(name, value)
        }

        fn remove_var(&self, name: &str) {
            self.inner.remove_var(name)
        }
    }

    fn switching_accessor() -> (Arc<SwitchingEnvironment>, Arc<MemorySecretStore>, ConfigAccessor) {
        let env = Arc::new(SwitchingEnvironment {
            inner: MemoryEnvironment::default().with_var("SECRET1", "keep"),
            reads: AtomicUsize::new(0),
        });
        let secrets = Arc::new(MemorySecretStore::new().with_secret("test_secret1", "remote"));
        let accessor = ConfigAccessor::new(
            env.clone(),
            secrets.clone(),
            Arc::new(MemoryBlobStore::new()),
        );
        (env, secrets, accessor)
    }

    #[tokio::test]
    async fn test_get_reads_environment_once() {
        let (env, secrets, accessor) = switching_accessor();

        let entries = accessor
            .get(&GetRequest::new().secret_keys(["secret1"]).set_environment(true))
            .await
            .unwrap();

        assert_eq!(entries, vec![ResolvedEntry::new("secret1", None)]);
        assert_eq!(env.reads.load(Ordering::SeqCst), 1);
        assert_eq!(env.var("SECRET1").as_deref(), Some("keep"));
        assert!(secrets.calls().is_empty());
    }

    #[tokio::test]
    async fn test_set_reads_environment_once() {
        let (env, secrets, accessor) = switching_accessor();

        let result = accessor
            .set(&SetRequest::new().secret_pairs([WritePair::new("secret1", "value1")]))
            .await
            .unwrap();

        assert!(result.is_none());
        assert_eq!(env.reads.load(Ordering::SeqCst), 1);
        assert!(secrets.calls().is_empty());
    }

    #[tokio::test]
    async fn test_set_skips_falsy_values() {
        let f = fixture("test");
        let outcomes = f
            .accessor
            .set(&SetRequest::new().config_pairs([
                WritePair::new("zero", 0),
                WritePair::new("off", false),
                WritePair::new("blank", ""),
                WritePair::new("on", true),
            ]))
            .await
            .unwrap()
            .unwrap();

        assert!(outcomes[..3].iter().all(WriteOutcome::is_absent));
        assert_eq!(outcomes[3].ack().map(|a| a.key.as_str()), Some("test/on"));
        assert_eq!(f.blobs.calls().len(), 1);
    }
}
