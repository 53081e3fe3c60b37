// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Galatea-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Galatea and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Debounced autosave between the graph model and the project store.
//!
//! Trailing-edge debounce: every scheduled snapshot overwrites the pending
//! one and re-arms the deadline, so only the final state after a quiet
//! period is persisted. Saves run on a dedicated worker thread; a failed
//! save is not retried and never touches local state — edits stay safe,
//! only unpersisted.

use std::sync::{Arc, Condvar, Mutex};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crate::model::{CanvasState, ProjectId};
use crate::store::{ProjectStore, StoreError};

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(1000);

#[derive(Debug)]
struct PendingSave {
    project_id: ProjectId,
    state: CanvasState,
    due: Instant,
}

#[derive(Debug, Default)]
struct AutosaveState {
    pending: Option<PendingSave>,
    saving: bool,
    last_error: Option<StoreError>,
    shutdown: bool,
}

#[derive(Debug)]
struct AutosaveInner {
    state: Mutex<AutosaveState>,
    cv: Condvar,
}

/// Owns the debounce timer and the save worker for one editor session.
#[derive(Debug)]
pub struct AutosaveManager {
    inner: Arc<AutosaveInner>,
    debounce: Duration,
    worker: Option<JoinHandle<()>>,
}

impl AutosaveManager {
    pub fn new(store: Arc<dyn ProjectStore>) -> Self {
        Self::with_debounce(store, DEFAULT_DEBOUNCE)
    }

    pub fn with_debounce(store: Arc<dyn ProjectStore>, debounce: Duration) -> Self {
        let inner = Arc::new(AutosaveInner {
            state: Mutex::new(AutosaveState::default()),
            cv: Condvar::new(),
        });

        let worker = std::thread::Builder::new()
            .name("galatea-autosave".to_owned())
            .spawn({
                let inner = inner.clone();
                move || run_worker(inner, store)
            })
            .expect("spawn autosave worker thread");

        Self {
            inner,
            debounce,
            worker: Some(worker),
        }
    }

    pub fn debounce(&self) -> Duration {
        self.debounce
    }

    /// (Re)arms the debounce timer with a fresh snapshot. A snapshot already
    /// pending is overwritten — intermediate states are never individually
    /// saved.
    pub fn schedule(&self, project_id: ProjectId, state: CanvasState) {
        self.arm(project_id, state, self.debounce);
    }

    /// The explicit Save action: same worker, same `saving` flag, no delay.
    pub fn save_now(&self, project_id: ProjectId, state: CanvasState) {
        self.arm(project_id, state, Duration::ZERO);
    }

    fn arm(&self, project_id: ProjectId, state: CanvasState, delay: Duration) {
        let mut guard = self.inner.state.lock().expect("autosave lock poisoned");
        guard.pending = Some(PendingSave {
            project_id,
            state,
            due: Instant::now() + delay,
        });
        drop(guard);
        self.inner.cv.notify_all();
    }

    /// True exactly while a store write is in flight.
    pub fn is_saving(&self) -> bool {
        self.inner
            .state
            .lock()
            .expect("autosave lock poisoned")
            .saving
    }

    /// True while a snapshot is waiting for its deadline.
    pub fn is_dirty(&self) -> bool {
        self.inner
            .state
            .lock()
            .expect("autosave lock poisoned")
            .pending
            .is_some()
    }

    /// The error of the most recent failed save, if any. Failed saves are
    /// not retried; surfacing the error is the caller's responsibility.
    pub fn take_last_error(&self) -> Option<StoreError> {
        self.inner
            .state
            .lock()
            .expect("autosave lock poisoned")
            .last_error
            .take()
    }

    /// Blocks until nothing is pending and no save is in flight.
    pub fn flush(&self) {
        let mut state = self.inner.state.lock().expect("autosave lock poisoned");
        while state.pending.is_some() || state.saving {
            state = self.inner.cv.wait(state).expect("autosave cv poisoned");
        }
    }
}

impl Drop for AutosaveManager {
    fn drop(&mut self) {
        {
            let mut state = self.inner.state.lock().expect("autosave lock poisoned");
            state.shutdown = true;
        }
        self.inner.cv.notify_all();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

fn run_worker(inner: Arc<AutosaveInner>, store: Arc<dyn ProjectStore>) {
    loop {
        let (project_id, snapshot) = {
            let mut state = inner.state.lock().expect("autosave lock poisoned");

            loop {
                match state.pending.take() {
                    // Shutdown drains immediately instead of waiting out the
                    // deadline. The saving flag flips inside this critical
                    // section so flush never observes the hand-off as idle.
                    Some(pending) if pending.due <= Instant::now() || state.shutdown => {
                        state.saving = true;
                        break (pending.project_id, pending.state);
                    }
                    Some(pending) => {
                        let wait = pending.due.saturating_duration_since(Instant::now());
                        state.pending = Some(pending);
                        let (guard, _timeout) = inner
                            .cv
                            .wait_timeout(state, wait)
                            .expect("autosave cv poisoned");
                        state = guard;
                    }
                    None if state.shutdown => return,
                    None => {
                        state = inner.cv.wait(state).expect("autosave cv poisoned");
                    }
                }
            }
        };

        inner.cv.notify_all();

        let result = store.put_canvas(&project_id, &snapshot);

        let mut state = inner.state.lock().expect("autosave lock poisoned");
        state.saving = false;
        if let Err(err) = result {
            state.last_error = Some(err);
        }
        drop(state);
        inner.cv.notify_all();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::{AutosaveManager, DEFAULT_DEBOUNCE};
    use crate::model::{CanvasGraph, IdAllocator, NodeKind, Position, ProjectId};
    use crate::store::{MemoryStore, ProjectStore, StoreError};

    fn store_with_project() -> (Arc<MemoryStore>, ProjectId) {
        let store = Arc::new(MemoryStore::new());
        let project = store.create("Autosave", None).expect("create");
        let project_id = project.project_id().clone();
        (store, project_id)
    }

    #[test]
    fn default_debounce_is_one_second() {
        let (store, _project_id) = store_with_project();
        let autosave = AutosaveManager::new(store);
        assert_eq!(autosave.debounce(), DEFAULT_DEBOUNCE);
        assert_eq!(DEFAULT_DEBOUNCE, Duration::from_millis(1000));
    }

    #[test]
    fn burst_of_schedules_coalesces_into_one_save_of_the_final_state() {
        let (store, project_id) = store_with_project();
        let autosave = AutosaveManager::with_debounce(store.clone(), Duration::from_millis(100));

        let mut graph = CanvasGraph::new(IdAllocator::new("a").expect("allocator"));
        for _ in 0..5 {
            graph.add_node(NodeKind::Service, Position::default());
            autosave.schedule(project_id.clone(), graph.snapshot());
        }

        autosave.flush();
        assert_eq!(store.canvas_put_count(), 1);

        let stored = store.get(&project_id).expect("get");
        assert_eq!(stored.canvas_state(), &graph.snapshot());
    }

    #[test]
    fn schedule_after_a_quiet_period_saves_again() {
        let (store, project_id) = store_with_project();
        let autosave = AutosaveManager::with_debounce(store.clone(), Duration::from_millis(10));

        let mut graph = CanvasGraph::new(IdAllocator::new("a").expect("allocator"));
        graph.add_node(NodeKind::Model, Position::default());
        autosave.schedule(project_id.clone(), graph.snapshot());
        autosave.flush();

        graph.add_node(NodeKind::Endpoint, Position::default());
        autosave.schedule(project_id.clone(), graph.snapshot());
        autosave.flush();

        assert_eq!(store.canvas_put_count(), 2);
    }

    #[test]
    fn save_now_bypasses_the_debounce_window() {
        let (store, project_id) = store_with_project();
        // A window far longer than the test; only save_now can finish it.
        let autosave = AutosaveManager::with_debounce(store.clone(), Duration::from_secs(3600));

        let mut graph = CanvasGraph::new(IdAllocator::new("a").expect("allocator"));
        graph.add_node(NodeKind::StickyNote, Position::default());

        autosave.save_now(project_id.clone(), graph.snapshot());
        autosave.flush();

        assert_eq!(store.canvas_put_count(), 1);
    }

    #[test]
    fn nothing_is_saved_before_the_window_elapses() {
        let (store, project_id) = store_with_project();
        let autosave = AutosaveManager::with_debounce(store.clone(), Duration::from_secs(3600));

        autosave.schedule(project_id, crate::model::CanvasState::default());
        assert!(autosave.is_dirty());
        assert_eq!(store.canvas_put_count(), 0);

        // Dropping drains the pending save instead of losing it.
        drop(autosave);
        assert_eq!(store.canvas_put_count(), 1);
    }

    #[test]
    fn failed_saves_park_the_error_and_clear_the_saving_flag() {
        let store = Arc::new(MemoryStore::new());
        let autosave = AutosaveManager::with_debounce(store.clone(), Duration::from_millis(5));

        let ghost = ProjectId::new("p404").expect("id");
        autosave.save_now(ghost, crate::model::CanvasState::default());
        autosave.flush();

        assert!(!autosave.is_saving());
        let err = autosave.take_last_error().expect("error parked");
        assert!(matches!(err, StoreError::ProjectNotFound { .. }));
        assert!(autosave.take_last_error().is_none());
    }
}
