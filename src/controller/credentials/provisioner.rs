//! # Resource Provisioner
//!
//! Requests (or re-requests) a Postgres instance from the provisioning backend
//! and reports what the backend has observed so far.
//!
//! Requests are keyed by `(name, namespace)`, so calling this on every
//! reconciliation is safe: the first call starts provisioning, later calls
//! observe progress.

use crate::controller::credentials::apply::create_or_update;
use crate::controller::credentials::ownership::{apply_owner_annotations, Owner};
use crate::controller::credentials::phase::ResourceHandle;
use crate::crd::{Postgres, PostgresSpec, SecretRef, Tier};
use anyhow::Result;
use async_trait::async_trait;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::{Api, Client};
use tracing::debug;

/// Everything the backend needs to provision one instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionRequest {
    pub name: String,
    pub namespace: String,
    pub tier: Tier,
    pub owner: Owner,
    /// Where the backend should publish native credentials
    pub credential_target: SecretRef,
}

impl ProvisionRequest {
    /// Build a request whose native credentials are published under the
    /// instance's own name and namespace
    #[must_use]
    pub fn new(
        owner: &Owner,
        name: impl Into<String>,
        namespace: impl Into<String>,
        tier: Tier,
    ) -> Self {
        let name = name.into();
        let namespace = namespace.into();
        let credential_target = SecretRef::new(name.clone(), namespace.clone());
        Self {
            name,
            namespace,
            tier,
            owner: owner.clone(),
            credential_target,
        }
    }

    /// Input checks before anything is sent to the backend
    ///
    /// # Errors
    ///
    /// Returns a description of the first empty field.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("postgres name must not be empty".to_string());
        }
        if self.namespace.trim().is_empty() {
            return Err(format!("namespace for postgres {} must not be empty", self.name));
        }
        if self.owner.name.is_empty() {
            return Err(format!("owner of postgres {} must have a name", self.name));
        }
        Ok(())
    }
}

/// Mutation applied to the request object's metadata before it is written
pub type MetadataMutation<'a> = &'a (dyn Fn(&mut ObjectMeta) + Send + Sync);

/// Provisioning backend seam
#[async_trait]
pub trait ResourceProvisioner: Send + Sync {
    /// Issue or refresh the provisioning request and return the observed state
    ///
    /// `annotate` is applied to the request object on every call.
    async fn provision(
        &self,
        request: &ProvisionRequest,
        annotate: MetadataMutation<'_>,
    ) -> Result<ResourceHandle>;
}

/// Provisioner backed by `Postgres` custom resources
#[derive(Clone)]
pub struct KubePostgresProvisioner {
    client: Client,
}

impl std::fmt::Debug for KubePostgresProvisioner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubePostgresProvisioner").finish_non_exhaustive()
    }
}

impl KubePostgresProvisioner {
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ResourceProvisioner for KubePostgresProvisioner {
    async fn provision(
        &self,
        request: &ProvisionRequest,
        annotate: MetadataMutation<'_>,
    ) -> Result<ResourceHandle> {
        let api: Api<Postgres> = Api::namespaced(self.client.clone(), &request.namespace);
        let desired = desired_spec(request);

        let template = Postgres {
            metadata: ObjectMeta {
                name: Some(request.name.clone()),
                namespace: Some(request.namespace.clone()),
                ..ObjectMeta::default()
            },
            spec: desired.clone(),
            status: None,
        };

        let (postgres, outcome) = create_or_update(&api, &request.name, template, |postgres| {
            annotate(&mut postgres.metadata);
            postgres.spec = desired.clone();
            Ok(())
        })
        .await?;

        debug!(
            "Postgres request {}/{} {}",
            request.namespace,
            request.name,
            outcome.as_str()
        );
        Ok(ResourceHandle::from(&postgres))
    }
}

/// Spec the backend should see for `request`
#[must_use]
pub fn desired_spec(request: &ProvisionRequest) -> PostgresSpec {
    PostgresSpec {
        deployment_type: request.owner.variant.clone(),
        tier: request.tier,
        secret_ref: request.credential_target.clone(),
    }
}

/// Owner-annotation mutation for a request, as handed to [`ResourceProvisioner::provision`]
pub fn owner_annotator(owner: &Owner) -> impl Fn(&mut ObjectMeta) + Send + Sync + '_ {
    move |meta| apply_owner_annotations(meta, owner)
}
