// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Background hole application
//!
//! A [`Puncher`] owns a worker thread that owns the [`FaceTree`]. Callers
//! queue holes without blocking; the worker applies them one at a time in
//! submission order and publishes a fresh [`MeshSnapshot`] after each one.
//! Readers only ever see published snapshots, never a tree mid-cut.

use crate::config::PuncherConfig;
use crate::error::{Error, Result};
use holepunch_geometry::{FaceTree, MaterialMeshes, MeshTransform, Prism, SourceMesh, Triangle};
use serde::Serialize;
use std::any::Any;
use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError, RwLock};
use std::thread::{self, JoinHandle};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Render state published after each hole
#[derive(Debug, Clone, Default)]
pub struct MeshSnapshot {
    /// Number of snapshots published before this one
    pub generation: u64,
    pub holes_applied: usize,
    /// The most recently applied hole
    pub last_hole: Option<Prism>,
    pub meshes: MaterialMeshes,
    pub triangle_count: usize,
}

impl MeshSnapshot {
    pub fn stats(&self) -> SnapshotStats {
        SnapshotStats {
            generation: self.generation,
            holes_applied: self.holes_applied,
            triangle_count: self.triangle_count,
            outer_triangles: self.meshes.outer.triangle_count(),
            inner_triangles: self.meshes.inner.triangle_count(),
            vertex_count: self.meshes.outer.vertex_count() + self.meshes.inner.vertex_count(),
        }
    }
}

/// Snapshot counters for reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SnapshotStats {
    pub generation: u64,
    pub holes_applied: usize,
    pub triangle_count: usize,
    pub outer_triangles: usize,
    pub inner_triangles: usize,
    pub vertex_count: usize,
}

#[derive(Debug, Default)]
struct QueueState {
    pending: VecDeque<Prism>,
    /// A hole has been taken off the queue and is being applied
    busy: bool,
    shutdown: bool,
}

#[derive(Debug)]
struct Shared {
    state: Mutex<QueueState>,
    /// Signalled when holes are queued or shutdown is requested
    work: Condvar,
    /// Signalled when the queue drains
    idle: Condvar,
    snapshot: RwLock<Arc<MeshSnapshot>>,
}

impl Shared {
    fn new(snapshot: MeshSnapshot) -> Self {
        Self {
            state: Mutex::new(QueueState::default()),
            work: Condvar::new(),
            idle: Condvar::new(),
            snapshot: RwLock::new(Arc::new(snapshot)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Block until a hole is queued. `None` once shut down with nothing left.
    ///
    /// The emptiness check and the wait happen under one lock, so a hole
    /// queued while the worker goes to sleep is never missed.
    fn next_hole(&self) -> Option<Prism> {
        let mut state = self.lock();
        loop {
            if let Some(prism) = state.pending.pop_front() {
                state.busy = true;
                return Some(prism);
            }
            if state.shutdown {
                return None;
            }
            state = self
                .work
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    fn finish_hole(&self) {
        let mut state = self.lock();
        state.busy = false;
        if state.pending.is_empty() {
            self.idle.notify_all();
        }
    }

    /// Block until the queue is empty and no hole is in flight
    fn wait_idle(&self) {
        let mut state = self.lock();
        while !state.pending.is_empty() || state.busy {
            state = self
                .idle
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    fn publish(&self, snapshot: MeshSnapshot) {
        *self
            .snapshot
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Arc::new(snapshot);
    }
}

/// Queues holes and applies them on a worker thread
#[derive(Debug)]
pub struct Puncher {
    shared: Arc<Shared>,
    worker: Option<JoinHandle<()>>,
    transform: MeshTransform,
}

impl Puncher {
    /// Build the tree over `triangles` and start the worker
    pub fn new(triangles: Vec<Triangle>, config: PuncherConfig) -> Result<Self> {
        Self::with_transform(triangles, MeshTransform::default(), config)
    }

    /// Start from an indexed mesh placed in the world by `transform`.
    ///
    /// Holes passed to [`Puncher::add_world_hole`] are mapped into the
    /// mesh's space.
    pub fn from_source(
        mesh: &SourceMesh,
        transform: MeshTransform,
        config: PuncherConfig,
    ) -> Result<Self> {
        Self::with_transform(mesh.to_triangles()?, transform, config)
    }

    fn with_transform(
        triangles: Vec<Triangle>,
        transform: MeshTransform,
        config: PuncherConfig,
    ) -> Result<Self> {
        config.validate()?;
        let tree = FaceTree::from_triangles(triangles, config.tree_config())?;

        let shared = Arc::new(Shared::new(snapshot_of(&tree, 0, 0, None)));
        let worker_shared = Arc::clone(&shared);
        let worker = thread::Builder::new()
            .name("holepunch-worker".to_string())
            .spawn(move || run(tree, worker_shared))?;

        debug!(leaf_capacity = config.leaf_capacity, "hole worker started");

        Ok(Self {
            shared,
            worker: Some(worker),
            transform,
        })
    }

    /// Queue a hole given in the mesh's own space. Never waits for geometry
    /// work.
    pub fn add_hole(&self, prism: Prism) -> Result<()> {
        let mut state = self.shared.lock();
        if state.shutdown {
            return Err(Error::WorkerStopped);
        }
        state.pending.push_back(prism);
        self.shared.work.notify_one();
        Ok(())
    }

    /// Queue a hole given in world space
    pub fn add_world_hole(&self, prism: &Prism) -> Result<()> {
        self.add_hole(prism.to_mesh_space(&self.transform)?)
    }

    /// The latest published mesh
    pub fn snapshot(&self) -> Arc<MeshSnapshot> {
        Arc::clone(
            &self
                .shared
                .snapshot
                .read()
                .unwrap_or_else(PoisonError::into_inner),
        )
    }

    /// Holes queued but not yet started
    pub fn pending(&self) -> usize {
        self.shared.lock().pending.len()
    }

    /// Block until every queued hole has been applied
    pub fn wait_idle(&self) {
        self.shared.wait_idle();
    }

    /// Apply every queued hole, then stop the worker
    pub fn shutdown(&mut self) -> Result<()> {
        {
            let mut state = self.shared.lock();
            state.shutdown = true;
            self.shared.work.notify_all();
        }

        match self.worker.take() {
            Some(worker) => worker.join().map_err(|_| Error::WorkerStopped),
            None => Ok(()),
        }
    }
}

impl Drop for Puncher {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            warn!(error = %e, "hole worker did not stop cleanly");
        }
    }
}

fn snapshot_of(
    tree: &FaceTree,
    generation: u64,
    holes_applied: usize,
    last_hole: Option<Prism>,
) -> MeshSnapshot {
    MeshSnapshot {
        generation,
        holes_applied,
        last_hole,
        meshes: tree.material_meshes(),
        triangle_count: tree.triangle_count(),
    }
}

/// Marks the queue stopped when the worker exits, however it exits.
///
/// Holes still queued at that point are dropped, so `add_hole` and
/// `wait_idle` never wait on a dead worker.
struct WorkerExit<'a>(&'a Shared);

impl Drop for WorkerExit<'_> {
    fn drop(&mut self) {
        let mut state = self.0.lock();
        if !state.pending.is_empty() {
            warn!(dropped = state.pending.len(), "hole worker exited with holes queued");
            state.pending.clear();
        }
        state.shutdown = true;
        state.busy = false;
        self.0.idle.notify_all();
    }
}

/// Run one hole, turning a panic in the geometry code into an error
fn guarded<F>(apply: F) -> Result<()>
where
    F: FnOnce() -> holepunch_geometry::Result<()>,
{
    match panic::catch_unwind(AssertUnwindSafe(apply)) {
        Ok(result) => result.map_err(Error::from),
        Err(payload) => Err(Error::HolePanicked(panic_message(&*payload))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

fn run(mut tree: FaceTree, shared: Arc<Shared>) {
    let _exit = WorkerExit(&shared);
    let mut holes_applied = 0usize;

    while let Some(prism) = shared.next_hole() {
        let started = Instant::now();
        // A panicking hole may leave the leaves it visited partly cut
        if let Err(e) = guarded(|| tree.punch_hole(&prism)) {
            warn!(error = %e, "hole failed, mesh may be incomplete");
        }
        holes_applied += 1;

        let snapshot = snapshot_of(&tree, holes_applied as u64, holes_applied, Some(prism));
        info!(
            hole = holes_applied,
            elapsed_ms = started.elapsed().as_secs_f64() * 1000.0,
            triangles = snapshot.triangle_count,
            "applied hole"
        );
        shared.publish(snapshot);
        shared.finish_hole();
    }

    debug!(holes_applied, "hole worker stopped");
}
