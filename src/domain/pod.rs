//! Pod workload descriptor.
//!
//! Only the fields needed to discover secret references are modelled. A pod
//! references secrets through image pull secrets and through environment
//! variables of its containers and init containers.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::key::ObjectKey;
use super::secret::ObjectMeta;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pod {
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub spec: PodSpec,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PodSpec {
    #[serde(default)]
    pub image_pull_secrets: Vec<LocalObjectReference>,
    #[serde(default)]
    pub init_containers: Vec<Container>,
    #[serde(default)]
    pub containers: Vec<Container>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalObjectReference {
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Container {
    pub name: String,
    #[serde(default)]
    pub env: Vec<EnvVar>,
    #[serde(default)]
    pub env_from: Vec<EnvFromSource>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvVar {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_from: Option<EnvVarSource>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvVarSource {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_key_ref: Option<SecretKeySelector>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretKeySelector {
    pub name: String,
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub optional: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvFromSource {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_ref: Option<SecretEnvSource>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretEnvSource {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub optional: Option<bool>,
}

impl Pod {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            metadata: ObjectMeta {
                namespace: namespace.into(),
                name: name.into(),
                resource_version: String::new(),
            },
            spec: PodSpec::default(),
        }
    }

    /// Registration identity of this pod.
    pub fn key(&self) -> ObjectKey {
        ObjectKey::new(&self.metadata.namespace, &self.metadata.name)
    }

    /// Names of every secret the pod references, optional ones included.
    pub fn secret_names(&self) -> BTreeSet<String> {
        let mut names: BTreeSet<String> =
            self.spec.image_pull_secrets.iter().map(|r| r.name.clone()).collect();

        for container in self.spec.init_containers.iter().chain(&self.spec.containers) {
            for env in &container.env {
                if let Some(selector) =
                    env.value_from.as_ref().and_then(|source| source.secret_key_ref.as_ref())
                {
                    names.insert(selector.name.clone());
                }
            }
            for source in &container.env_from {
                if let Some(secret_ref) = &source.secret_ref {
                    names.insert(secret_ref.name.clone());
                }
            }
        }

        names.retain(|name| !name.is_empty());
        names
    }

    /// Cache keys for every referenced secret, in the pod's namespace.
    pub fn secret_keys(&self) -> BTreeSet<ObjectKey> {
        self.secret_names()
            .into_iter()
            .map(|name| ObjectKey::new(&self.metadata.namespace, name))
            .collect()
    }

    pub fn with_image_pull_secret(mut self, name: impl Into<String>) -> Self {
        self.spec.image_pull_secrets.push(LocalObjectReference { name: name.into() });
        self
    }

    /// Add a container whose environment reads `key` from each listed secret.
    pub fn with_container_env_secrets(mut self, container: &str, secrets: &[(&str, &str)]) -> Self {
        let env = secrets
            .iter()
            .map(|(secret, key)| EnvVar {
                name: key.to_uppercase(),
                value: None,
                value_from: Some(EnvVarSource {
                    secret_key_ref: Some(SecretKeySelector {
                        name: secret.to_string(),
                        key: key.to_string(),
                        optional: None,
                    }),
                }),
            })
            .collect();
        self.spec.containers.push(Container {
            name: container.to_string(),
            env,
            env_from: Vec::new(),
        });
        self
    }
}
