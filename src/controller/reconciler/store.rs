//! # Object Store
//!
//! Where the driver writes its results back. [`KubeStore`] patches the
//! Kubernetes API server; tests use an in-memory store.

use super::types::ReconcilerError;
use crate::adapter::ManagedResource;
use async_trait::async_trait;
use kube::api::{Api, Patch, PatchParams};
use kube::{Client, ResourceExt};
use serde_json::{json, Value};
use tracing::debug;

/// Persistence seam for reconcile results
#[async_trait]
pub trait ObjectStore<R: ManagedResource>: Send + Sync {
    /// Write the status subresource
    async fn save_status(&self, resource: &R) -> Result<(), ReconcilerError>;

    /// Write `metadata.finalizers`
    async fn save_finalizers(&self, resource: &R) -> Result<(), ReconcilerError>;
}

/// Object store backed by the Kubernetes API server
#[derive(Clone)]
pub struct KubeStore {
    client: Client,
}

impl KubeStore {
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn api_for<R: ManagedResource>(&self, resource: &R) -> Result<Api<R>, ReconcilerError> {
        let namespace = resource
            .namespace()
            .ok_or_else(|| ReconcilerError::MissingNamespace(resource.identify()))?;
        Ok(Api::namespaced(self.client.clone(), &namespace))
    }
}

/// A 404 means the object was already removed; there is nothing left to write
fn tolerate_gone<T>(result: Result<T, kube::Error>) -> Result<(), ReconcilerError> {
    match result {
        Ok(_) => Ok(()),
        Err(kube::Error::Api(ae)) if ae.code == 404 => {
            debug!("object already removed, skipping write");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

#[async_trait]
impl<R: ManagedResource> ObjectStore<R> for KubeStore {
    async fn save_status(&self, resource: &R) -> Result<(), ReconcilerError> {
        let status = serde_json::to_value(resource)?
            .get("status")
            .cloned()
            .unwrap_or(Value::Null);
        if status.is_null() {
            return Ok(());
        }

        let api = self.api_for(resource)?;
        let patch = json!({ "status": status });
        tolerate_gone(
            api.patch_status(&resource.name_any(), &PatchParams::default(), &Patch::Merge(&patch))
                .await,
        )
    }

    async fn save_finalizers(&self, resource: &R) -> Result<(), ReconcilerError> {
        let api = self.api_for(resource)?;
        let patch = json!({
            "metadata": {
                "finalizers": resource.finalizers(),
            }
        });
        tolerate_gone(
            api.patch(&resource.name_any(), &PatchParams::default(), &Patch::Merge(&patch))
                .await,
        )
    }
}
