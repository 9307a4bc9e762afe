//! Environment-scoped configuration and secret accessor library

// Public modules
pub mod config;
pub mod environment;
pub mod error;
pub mod logging;
pub mod models;
pub mod services;
pub mod store;

// Re-export commonly used types
pub use config::{SecretNaming, Settings};
pub use environment::{set_env_vars, Environment, MemoryEnvironment, ProcessEnvironment};
pub use error::{StoreError, StoreKind};
pub use models::{
    EntryValue, GetRequest, ResolvedEntry, SetRequest, WriteAck, WriteOutcome, WritePair,
};
pub use services::ConfigAccessor;
