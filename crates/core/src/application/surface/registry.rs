// Surface Registry - owns the running surfaces of one process

use super::{
    DisplaySurface, SnapshotListener, SurfaceHandle, SurfacePorts, SurfaceProfile, SurfaceView,
};
use crate::domain::{QueueSnapshot, SubscriptionScope};
use crate::error::{AppError, Result};
use crate::port::IdProvider;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, warn};

pub type SurfaceId = String;

pub struct SurfaceRegistry {
    id_provider: Arc<dyn IdProvider>,
    surfaces: HashMap<SurfaceId, SurfaceHandle>,
}

impl SurfaceRegistry {
    pub fn new(id_provider: Arc<dyn IdProvider>) -> Self {
        Self {
            id_provider,
            surfaces: HashMap::new(),
        }
    }

    /// Mount a surface; must be called within a tokio runtime
    pub fn subscribe(&mut self, profile: SurfaceProfile, ports: SurfacePorts) -> SurfaceId {
        let id = self.id_provider.generate_id();
        info!(surface = %id, kind = %profile.kind, "Subscribing surface");
        let handle = DisplaySurface::spawn(id.clone(), profile, ports);
        self.surfaces.insert(id.clone(), handle);
        id
    }

    /// Tear a surface down and wait for it to finish
    pub async fn unsubscribe(&mut self, id: &str) -> Result<()> {
        let handle = self
            .surfaces
            .remove(id)
            .ok_or_else(|| AppError::NotFound(format!("surface {}", id)))?;
        handle.shutdown().await
    }

    fn handle(&self, id: &str) -> Result<&SurfaceHandle> {
        self.surfaces
            .get(id)
            .ok_or_else(|| AppError::NotFound(format!("surface {}", id)))
    }

    pub fn on_snapshot(&self, id: &str, listener: SnapshotListener) -> Result<()> {
        self.handle(id)?.on_snapshot(listener)
    }

    pub fn set_announcements_enabled(&self, id: &str, enabled: bool) -> Result<()> {
        self.handle(id)?.set_announcements_enabled(enabled)
    }

    pub fn announce_if_needed(&self, id: &str, snapshot: QueueSnapshot) -> Result<()> {
        self.handle(id)?.announce_if_needed(snapshot)
    }

    pub fn change_scope(&self, id: &str, scope: SubscriptionScope) -> Result<()> {
        self.handle(id)?.change_scope(scope)
    }

    pub fn view(&self, id: &str) -> Result<SurfaceView> {
        Ok(self.handle(id)?.view())
    }

    pub fn watch(&self, id: &str) -> Result<watch::Receiver<SurfaceView>> {
        Ok(self.handle(id)?.watch())
    }

    pub fn ids(&self) -> Vec<SurfaceId> {
        let mut ids: Vec<_> = self.surfaces.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.surfaces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.surfaces.is_empty()
    }

    /// Tear down every surface; failures are logged and the rest still stop
    pub async fn shutdown_all(&mut self) {
        let handles: Vec<_> = self.surfaces.drain().collect();
        info!(count = handles.len(), "Shutting down surfaces");
        for (id, handle) in handles {
            if let Err(e) = handle.shutdown().await {
                warn!(surface = %id, error = %e, "Surface did not shut down cleanly");
            }
        }
    }
}
