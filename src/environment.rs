//! Deployment environment detection and environment variable access
//!
//! The accessor never touches `std::env` directly; it goes through an
//! [`Environment`] so that tests and embedders can supply their own state.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use crate::config::{Settings, DEFAULT_ENVIRONMENT_VAR, LOCAL_ENVIRONMENT};
use crate::models::ResolvedEntry;

/// Source of the deployment environment identifier and of variable values
pub trait Environment: Send + Sync {
    /// Current deployment environment identifier, read fresh on every call
    fn current_env(&self) -> Option<String>;

    /// Look up a variable by its exact (case-sensitive) name
    fn var(&self, name: &str) -> Option<String>;

    /// Set a variable, overwriting any previous value
    fn set_var(&self, name: &str, value: &str);

    /// Remove a variable if it is set
    fn remove_var(&self, name: &str);

    /// Whether the local-development bypass is active
    fn is_local(&self) -> bool {
        self.current_env().as_deref() == Some(LOCAL_ENVIRONMENT)
    }
}

/// Write resolved entries into the environment under uppercased names.
///
/// Byte values are decoded as lossy UTF-8; entries without a value clear
/// the variable.
pub fn set_env_vars(env: &dyn Environment, entries: &[ResolvedEntry]) {
    for entry in entries {
        let var_name = entry.name.to_uppercase();
        match &entry.value {
            Some(value) => env.set_var(&var_name, &value.to_string_lossy()),
            None => env.remove_var(&var_name),
        }
    }

    tracing::debug!(count = entries.len(), "Populated environment variables");
}

/// Process environment backed by `std::env`
#[derive(Debug, Clone)]
pub struct ProcessEnvironment {
    /// Variable holding the deployment environment identifier
    environment_var: String,
}

impl ProcessEnvironment {
    pub fn new(environment_var: impl Into<String>) -> Self {
        Self {
            environment_var: environment_var.into(),
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.environment_var.clone())
    }
}

impl Default for ProcessEnvironment {
    fn default() -> Self {
        Self::new(DEFAULT_ENVIRONMENT_VAR)
    }
}

impl Environment for ProcessEnvironment {
    fn current_env(&self) -> Option<String> {
        std::env::var(&self.environment_var).ok()
    }

    fn var(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }

    fn set_var(&self, name: &str, value: &str) {
        std::env::set_var(name, value);
    }

    fn remove_var(&self, name: &str) {
        std::env::remove_var(name);
    }
}

/// In-memory environment, isolated from the process
#[derive(Debug, Default)]
pub struct MemoryEnvironment {
    current: RwLock<Option<String>>,
    vars: RwLock<HashMap<String, String>>,
}

impl MemoryEnvironment {
    pub fn new(current: impl Into<String>) -> Self {
        Self {
            current: RwLock::new(Some(current.into())),
            vars: RwLock::new(HashMap::new()),
        }
    }

    pub fn with_var(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_var(&name.into(), &value.into());
        self
    }

    /// Switch the deployment environment; later calls observe it immediately
    pub fn set_current(&self, current: Option<&str>) {
        *self.current.write().unwrap_or_else(PoisonError::into_inner) =
            current.map(str::to_string);
    }

    /// Snapshot of all variables
    pub fn vars(&self) -> HashMap<String, String> {
        self.vars
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Environment for MemoryEnvironment {
    fn current_env(&self) -> Option<String> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn var(&self, name: &str) -> Option<String> {
        self.vars
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    fn set_var(&self, name: &str, value: &str) {
        self.vars
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.to_string(), value.to_string());
    }

    fn remove_var(&self, name: &str) {
        self.vars
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(name);
    }
}
