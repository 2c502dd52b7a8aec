//! Common test utilities for credential pipeline tests
//!
//! In-memory stand-ins for the provisioning backend and the secret store, so
//! the full pipeline can run without a cluster.

#![allow(dead_code, reason = "each test binary uses a different subset of helpers")]

use async_trait::async_trait;
use credential_bridge_controller::controller::credentials::provisioner::{
    desired_spec, MetadataMutation, ProvisionRequest,
};
use credential_bridge_controller::controller::credentials::store::SecretMutation;
use credential_bridge_controller::controller::credentials::{
    CredentialBlob, CredentialReconciler, CredentialRequest, CredentialStore, Owner,
    ResourceHandle, ResourceProvisioner, UpsertOutcome, KEYCLOAK_DATABASE_MAPPING,
};
use credential_bridge_controller::crd::{Postgres, PostgresStatus, SecretRef, Tier};
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use k8s_openapi::ByteString;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const OWNER_NAMESPACE: &str = "rhsso-operator";
pub const CONSUMER_NAMESPACE: &str = "rhsso";
pub const POSTGRES_NAME: &str = "keycloak-postgres";
pub const TARGET_SECRET: &str = "keycloak-db-secret";

type Key = (String, String);

fn key(namespace: &str, name: &str) -> Key {
    (namespace.to_string(), name.to_string())
}

/// Provisioning backend that keeps `Postgres` objects in memory
///
/// Instances start with no status (pending); tests move them through phases
/// with [`FakeProvisioner::set_phase`].
#[derive(Debug, Default)]
pub struct FakeProvisioner {
    instances: Mutex<BTreeMap<Key, Postgres>>,
    calls: AtomicUsize,
    fail: AtomicBool,
    delay: Mutex<Option<Duration>>,
}

impl FakeProvisioner {
    pub fn set_phase(&self, namespace: &str, name: &str, phase: &str, secret_ref: Option<SecretRef>) {
        let mut instances = self.instances.lock().unwrap();
        let postgres = instances
            .get_mut(&key(namespace, name))
            .expect("instance must be provisioned before its phase is set");
        postgres.status = Some(PostgresStatus {
            phase: Some(phase.to_string()),
            secret_ref,
            ..PostgresStatus::default()
        });
    }

    pub fn set_failed(&self, namespace: &str, name: &str, message: &str) {
        self.set_phase(namespace, name, "failed", None);
        let mut instances = self.instances.lock().unwrap();
        if let Some(status) = instances
            .get_mut(&key(namespace, name))
            .and_then(|pg| pg.status.as_mut())
        {
            status.message = Some(message.to_string());
        }
    }

    pub fn instance(&self, namespace: &str, name: &str) -> Option<Postgres> {
        self.instances.lock().unwrap().get(&key(namespace, name)).cloned()
    }

    pub fn instance_count(&self) -> usize {
        self.instances.lock().unwrap().len()
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn fail_requests(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn delay_requests(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }
}

#[async_trait]
impl ResourceProvisioner for FakeProvisioner {
    async fn provision(
        &self,
        request: &ProvisionRequest,
        annotate: MetadataMutation<'_>,
    ) -> anyhow::Result<ResourceHandle> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail.load(Ordering::SeqCst) {
            anyhow::bail!("provisioning backend unavailable");
        }

        let mut instances = self.instances.lock().unwrap();
        let postgres = instances
            .entry(key(&request.namespace, &request.name))
            .or_insert_with(|| Postgres {
                metadata: ObjectMeta {
                    name: Some(request.name.clone()),
                    namespace: Some(request.namespace.clone()),
                    ..ObjectMeta::default()
                },
                spec: desired_spec(request),
                status: None,
            });
        annotate(&mut postgres.metadata);
        postgres.spec = desired_spec(request);
        Ok(ResourceHandle::from(&*postgres))
    }
}

/// Secret store with create-or-update semantics and fault injection
#[derive(Debug, Default)]
pub struct InMemorySecretStore {
    secrets: Mutex<BTreeMap<Key, Secret>>,
    writes: AtomicUsize,
    fail_reads: AtomicBool,
    conflict_next_write: AtomicBool,
}

impl InMemorySecretStore {
    pub fn insert(&self, namespace: &str, name: &str, data: &[(&str, &str)]) {
        let data = data
            .iter()
            .map(|(k, v)| ((*k).to_string(), ByteString(v.as_bytes().to_vec())))
            .collect();
        let secret = Secret {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                namespace: Some(namespace.to_string()),
                resource_version: Some("1".to_string()),
                ..ObjectMeta::default()
            },
            data: Some(data),
            ..Secret::default()
        };
        self.secrets.lock().unwrap().insert(key(namespace, name), secret);
    }

    pub fn secret(&self, namespace: &str, name: &str) -> Option<Secret> {
        self.secrets.lock().unwrap().get(&key(namespace, name)).cloned()
    }

    /// Mutate a stored secret as another actor would, without counting it as our write
    pub fn modify(&self, namespace: &str, name: &str, f: impl FnOnce(&mut Secret)) {
        let mut secrets = self.secrets.lock().unwrap();
        let secret = secrets
            .get_mut(&key(namespace, name))
            .expect("secret must exist before it is modified");
        f(secret);
        bump_resource_version(&mut secret.metadata);
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Make the next changing write lose an optimistic-concurrency race
    pub fn conflict_next_write(&self) {
        self.conflict_next_write.store(true, Ordering::SeqCst);
    }
}

fn bump_resource_version(meta: &mut ObjectMeta) {
    let next = meta
        .resource_version
        .as_deref()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(0)
        + 1;
    meta.resource_version = Some(next.to_string());
}

#[async_trait]
impl CredentialStore for InMemorySecretStore {
    async fn get(&self, secret_ref: &SecretRef) -> anyhow::Result<CredentialBlob> {
        if self.fail_reads.load(Ordering::SeqCst) {
            anyhow::bail!("connection reset while reading {secret_ref}");
        }
        let secrets = self.secrets.lock().unwrap();
        let secret = secrets
            .get(&key(&secret_ref.namespace, &secret_ref.name))
            .ok_or_else(|| anyhow::anyhow!("secret {secret_ref} not found"))?;
        Ok(CredentialBlob::from_secret(secret))
    }

    async fn upsert(
        &self,
        secret_ref: &SecretRef,
        mutate: SecretMutation<'_>,
    ) -> anyhow::Result<(Secret, UpsertOutcome)> {
        let mut secrets = self.secrets.lock().unwrap();
        let k = key(&secret_ref.namespace, &secret_ref.name);

        let existing = secrets.get(&k).cloned();
        match existing {
            None => {
                let mut secret = Secret {
                    metadata: ObjectMeta {
                        name: Some(secret_ref.name.clone()),
                        namespace: Some(secret_ref.namespace.clone()),
                        ..ObjectMeta::default()
                    },
                    type_: Some("Opaque".to_string()),
                    ..Secret::default()
                };
                mutate(&mut secret)?;
                bump_resource_version(&mut secret.metadata);
                self.writes.fetch_add(1, Ordering::SeqCst);
                secrets.insert(k, secret.clone());
                Ok((secret, UpsertOutcome::Created))
            }
            Some(current) => {
                let mut desired = current.clone();
                mutate(&mut desired)?;
                if desired == current {
                    return Ok((current, UpsertOutcome::Unchanged));
                }
                if self.conflict_next_write.swap(false, Ordering::SeqCst) {
                    anyhow::bail!(
                        "Operation cannot be fulfilled on secrets \"{}\": the object has been modified (409 Conflict)",
                        secret_ref.name
                    );
                }
                bump_resource_version(&mut desired.metadata);
                self.writes.fetch_add(1, Ordering::SeqCst);
                secrets.insert(k, desired.clone());
                Ok((desired, UpsertOutcome::Updated))
            }
        }
    }
}

/// Pipeline wired to fresh in-memory collaborators
pub struct Harness {
    pub provisioner: Arc<FakeProvisioner>,
    pub store: Arc<InMemorySecretStore>,
    pub reconciler: CredentialReconciler,
}

impl Harness {
    pub fn new() -> Self {
        let provisioner = Arc::new(FakeProvisioner::default());
        let store = Arc::new(InMemorySecretStore::default());
        let reconciler = CredentialReconciler::new(
            provisioner.clone(),
            store.clone(),
            KEYCLOAK_DATABASE_MAPPING,
        );
        Self {
            provisioner,
            store,
            reconciler,
        }
    }

    /// Move the instance to `complete` with its native credentials in place
    pub fn complete_with(&self, credentials: &[(&str, &str)]) {
        self.store.insert(OWNER_NAMESPACE, POSTGRES_NAME, credentials);
        self.provisioner.set_phase(
            OWNER_NAMESPACE,
            POSTGRES_NAME,
            "complete",
            Some(SecretRef::new(POSTGRES_NAME, OWNER_NAMESPACE)),
        );
    }

    pub fn target(&self) -> Option<Secret> {
        self.store.secret(CONSUMER_NAMESPACE, TARGET_SECRET)
    }
}

pub fn owner() -> Owner {
    Owner::new("rhsso", OWNER_NAMESPACE, "managed").with_uid("4c1a5e0b-installation")
}

pub fn request() -> CredentialRequest {
    CredentialRequest {
        owner: owner(),
        postgres_name: POSTGRES_NAME.to_string(),
        tier: Tier::Production,
        target: SecretRef::new(TARGET_SECRET, CONSUMER_NAMESPACE),
    }
}

pub fn source_credentials() -> Vec<(&'static str, &'static str)> {
    vec![
        ("database", "db1"),
        ("port", "5432"),
        ("host", "pg.example"),
        ("password", "secret"),
        ("username", "admin"),
    ]
}

pub fn field(secret: &Secret, key: &str) -> Option<String> {
    secret
        .data
        .as_ref()
        .and_then(|data| data.get(key))
        .map(|value| String::from_utf8_lossy(&value.0).into_owned())
}
