//! Bulk propagation of one grant across every entity of a kind

use crate::client::CuicClient;
use crate::error::ClientError;
use async_trait::async_trait;
use cuic_core::{
    EntityFamily, EntityKind, EntityListing, GrantRequest, PermissionLevel, PropagationOutcome,
    PropagationReport, Subject,
};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Remote operations a propagation job needs
#[async_trait]
pub trait PermissionBackend: Send + Sync {
    async fn list_kind(&self, kind: EntityKind) -> Result<EntityListing, ClientError>;
    async fn write_grant(&self, grant: &GrantRequest) -> Result<(), ClientError>;
}

#[async_trait]
impl PermissionBackend for CuicClient {
    async fn list_kind(&self, kind: EntityKind) -> Result<EntityListing, ClientError> {
        self.list_entities(kind, false).await
    }

    async fn write_grant(&self, grant: &GrantRequest) -> Result<(), ClientError> {
        self.set_permission(grant).await
    }
}

/// Applies one grant to every listed entity, one call at a time
pub struct Propagator<'a, B: PermissionBackend + ?Sized> {
    backend: &'a B,
    throttle: Duration,
}

impl<'a, B: PermissionBackend + ?Sized> Propagator<'a, B> {
    pub const fn new(backend: &'a B, throttle: Duration) -> Self {
        Self { backend, throttle }
    }

    /// Grant `level` to `subject` on every entity listed for `leaf_kind`
    ///
    /// Rows flagged as containers are written with `container_kind`'s code,
    /// all others with `leaf_kind`'s. A failed write is recorded and the job
    /// moves on; only a failed listing aborts it.
    pub async fn propagate(
        &self,
        level: PermissionLevel,
        container_kind: EntityKind,
        leaf_kind: EntityKind,
        subject: &Subject,
    ) -> Result<PropagationReport, ClientError> {
        let entities = match self.backend.list_kind(leaf_kind).await? {
            EntityListing::Entities(entities) => entities,
            EntityListing::Unrecognized(raw) => {
                let length = raw.to_string().len();
                return Err(ClientError::malformed(
                    format!("listing for {leaf_kind} has an unrecognized shape"),
                    length,
                ));
            }
        };

        info!(
            %leaf_kind,
            %container_kind,
            %subject,
            %level,
            count = entities.len(),
            "Propagating permission"
        );

        let mut report = PropagationReport::default();
        for (index, entity) in entities.iter().enumerate() {
            if index > 0 {
                tokio::time::sleep(self.throttle).await;
            }

            let kind = entity.write_kind(container_kind, leaf_kind);
            let grant = GrantRequest::new(subject.clone(), kind, entity.id.clone(), level);

            let outcome = match self.backend.write_grant(&grant).await {
                Ok(()) => {
                    debug!(entity_id = %entity.id, %kind, "Permission saved");
                    PropagationOutcome::succeeded(&entity.id, kind)
                }
                Err(e) => {
                    warn!(entity_id = %entity.id, %kind, error = %e, "Failed to save permission");
                    PropagationOutcome::failed(&entity.id, kind, e.to_string())
                }
            };
            report.outcomes.push(outcome);
        }

        info!(
            succeeded = report.succeeded(),
            failed = report.failed(),
            "Propagation finished"
        );
        Ok(report)
    }

    /// Propagate over a family's fixed folder/leaf pair
    pub async fn propagate_family(
        &self,
        level: PermissionLevel,
        family: EntityFamily,
        subject: &Subject,
    ) -> Result<PropagationReport, ClientError> {
        self.propagate(level, family.container(), family.leaf(), subject)
            .await
    }
}

impl CuicClient {
    /// Run a propagation job with this client's throttle
    pub async fn propagate(
        &self,
        level: PermissionLevel,
        container_kind: EntityKind,
        leaf_kind: EntityKind,
        subject: &Subject,
    ) -> Result<PropagationReport, ClientError> {
        Propagator::new(self, self.throttle())
            .propagate(level, container_kind, leaf_kind, subject)
            .await
    }

    pub async fn propagate_family(
        &self,
        level: PermissionLevel,
        family: EntityFamily,
        subject: &Subject,
    ) -> Result<PropagationReport, ClientError> {
        Propagator::new(self, self.throttle())
            .propagate_family(level, family, subject)
            .await
    }
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use mockall::mock;

    mock! {
        pub PermissionBackend {}

        #[async_trait]
        impl PermissionBackend for PermissionBackend {
            async fn list_kind(&self, kind: EntityKind) -> Result<EntityListing, ClientError>;
            async fn write_grant(&self, grant: &GrantRequest) -> Result<(), ClientError>;
        }
    }
}
