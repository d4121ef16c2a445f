// src/engine/pool.rs

//! Pool of configured render engines.
//!
//! Engines are expensive to configure, so the pool keeps them around between
//! jobs. A borrow never waits: when no idle engine is available a new one is
//! created and configured inline. The number of engines therefore grows up to
//! the number of jobs running at the same time, which the orchestrator bounds.

use std::fmt;
use std::mem::ManuallyDrop;
use std::ops::{Deref, DerefMut};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::debug;

use crate::engine::{EngineError, EngineFactory, LogBridge, RenderEngine};
use crate::render::RenderConfiguration;

/// A configured engine plus the configuration it was built with.
pub struct EngineHandle {
    id: usize,
    config: Arc<RenderConfiguration>,
    engine: Box<dyn RenderEngine>,
}

impl fmt::Debug for EngineHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineHandle")
            .field("id", &self.id)
            .field("format", &self.config.format)
            .finish_non_exhaustive()
    }
}

impl EngineHandle {
    /// Creation order of this engine within its pool, starting at 0.
    pub fn id(&self) -> usize {
        self.id
    }

    pub fn configuration(&self) -> &RenderConfiguration {
        &self.config
    }

    pub async fn render(&mut self, input: &Path, output_dir: &Path) -> Result<(), EngineError> {
        self.engine.render(input, output_dir).await
    }
}

/// Concurrent-safe collection of idle engines plus the factory that makes new
/// ones.
pub struct EnginePool {
    factory: Arc<dyn EngineFactory>,
    config: Arc<RenderConfiguration>,
    idle: Mutex<Vec<EngineHandle>>,
    next_id: AtomicUsize,
    created: AtomicUsize,
}

impl fmt::Debug for EnginePool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnginePool")
            .field("config", &self.config)
            .field("created", &self.created())
            .field("idle", &self.idle_count())
            .finish_non_exhaustive()
    }
}

impl EnginePool {
    pub fn new(factory: Arc<dyn EngineFactory>, config: Arc<RenderConfiguration>) -> Self {
        Self {
            factory,
            config,
            idle: Mutex::new(Vec::new()),
            next_id: AtomicUsize::new(0),
            created: AtomicUsize::new(0),
        }
    }

    pub fn configuration(&self) -> &Arc<RenderConfiguration> {
        &self.config
    }

    /// Whether engines from this pool may serve jobs rendered with `config`.
    pub fn is_configured_for(&self, config: &RenderConfiguration) -> bool {
        *self.config == *config
    }

    /// Number of engines successfully created so far (one per pool miss).
    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    pub fn idle_count(&self) -> usize {
        self.idle().len()
    }

    /// Take an idle engine, or create and configure a new one.
    ///
    /// The returned lease gives exclusive use of the engine and puts it back
    /// into the pool when dropped, whatever the outcome of the job.
    pub fn borrow(self: &Arc<Self>) -> Result<PooledEngine, EngineError> {
        let reused = self.idle().pop();

        let handle = match reused {
            Some(handle) => {
                debug!(engine_id = handle.id, "reusing idle engine");
                handle
            }
            None => self.create()?,
        };

        Ok(PooledEngine {
            pool: Arc::clone(self),
            handle: ManuallyDrop::new(handle),
        })
    }

    /// Return an engine to the idle list.
    pub fn release(&self, handle: EngineHandle) {
        debug!(engine_id = handle.id, "engine returned to pool");
        self.idle().push(handle);
    }

    fn create(&self) -> Result<EngineHandle, EngineError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        debug!(engine_id = id, format = %self.config.format, "configuring new engine");

        let engine = self
            .factory
            .new_engine(id, &self.config, LogBridge::new(id))?;
        self.created.fetch_add(1, Ordering::SeqCst);

        Ok(EngineHandle {
            id,
            config: Arc::clone(&self.config),
            engine,
        })
    }

    fn idle(&self) -> MutexGuard<'_, Vec<EngineHandle>> {
        // The idle list is only pushed to and popped from; a panic elsewhere
        // cannot leave it half-updated.
        self.idle.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Exclusive lease on a pooled engine. Dropping it releases the engine.
pub struct PooledEngine {
    pool: Arc<EnginePool>,
    handle: ManuallyDrop<EngineHandle>,
}

impl fmt::Debug for PooledEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PooledEngine")
            .field("handle", &self.handle)
            .finish_non_exhaustive()
    }
}

impl Deref for PooledEngine {
    type Target = EngineHandle;

    fn deref(&self) -> &EngineHandle {
        &self.handle
    }
}

impl DerefMut for PooledEngine {
    fn deref_mut(&mut self) -> &mut EngineHandle {
        &mut self.handle
    }
}

impl Drop for PooledEngine {
    fn drop(&mut self) {
        // SAFETY: `handle` is not touched again after this; `self` is being
        // dropped and `ManuallyDrop` skips the field's own drop.
        let handle = unsafe { ManuallyDrop::take(&mut self.handle) };
        self.pool.release(handle);
    }
}
