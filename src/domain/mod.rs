//! Domain layer
//!
//! Plain data types with no infrastructure dependencies: object identity,
//! secret objects and the pod descriptor the cache is driven by.
//!
//! ## Module Organization
//!
//! - `key`: namespace-qualified object identity
//! - `secret`: secret objects, their versions and redacted payloads
//! - `pod`: pod descriptor and secret reference extraction

pub mod key;
pub mod pod;
pub mod secret;

pub use key::ObjectKey;
pub use pod::{
    Container, EnvFromSource, EnvVar, EnvVarSource, LocalObjectReference, Pod, PodSpec,
    SecretEnvSource, SecretKeySelector,
};
pub use secret::{ObjectMeta, Secret, SecretValue};
