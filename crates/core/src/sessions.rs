//! Live-session registry.
//!
//! Sessions live in a sharded concurrent map, each behind its own mutex:
//! frames for one session id are serialized while different ids proceed in
//! parallel. There is no global lock on the request path.

use std::sync::{Arc, Mutex, MutexGuard};

use dashmap::DashMap;

use repsense_common::clock::Clock;
use repsense_common::error::{RepsenseError, RepsenseResult};
use repsense_model::met::MetTable;
use repsense_model::summary::SessionSummary;

use crate::tracker::ExerciseTracker;

/// One live tracking session.
#[derive(Debug)]
pub struct Session {
    id: String,
    tracker: ExerciseTracker,
    created_at: f64,
    last_active: f64,
}

impl Session {
    fn new(id: String, tracker: ExerciseTracker, now: f64) -> Self {
        Self {
            id,
            tracker,
            created_at: now,
            last_active: now,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn tracker(&self) -> &ExerciseTracker {
        &self.tracker
    }

    pub fn tracker_mut(&mut self) -> &mut ExerciseTracker {
        &mut self.tracker
    }

    pub fn created_at(&self) -> f64 {
        self.created_at
    }

    pub fn last_active(&self) -> f64 {
        self.last_active
    }

    /// Mark the session as used at `now`.
    pub fn touch(&mut self, now: f64) {
        self.last_active = self.last_active.max(now);
    }

    pub fn summary(&self) -> SessionSummary {
        self.tracker.summary()
    }
}

/// Shared handle to a session.
pub type SessionHandle = Arc<Mutex<Session>>;

/// Lock a session, recovering the state if a previous holder panicked.
pub fn lock_session(handle: &SessionHandle) -> MutexGuard<'_, Session> {
    handle.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Registry of live sessions keyed by opaque id.
pub struct SessionStore {
    sessions: DashMap<String, SessionHandle>,
    met_table: MetTable,
    debounce_secs: f64,
    clock: Arc<dyn Clock>,
}

impl SessionStore {
    pub fn new(met_table: MetTable, debounce_secs: f64, clock: Arc<dyn Clock>) -> Self {
        Self {
            sessions: DashMap::new(),
            met_table,
            debounce_secs,
            clock,
        }
    }

    /// Return the session for `id`, creating a fresh one if it is unseen.
    pub fn get_or_create(&self, id: &str) -> SessionHandle {
        if let Some(existing) = self.sessions.get(id) {
            return Arc::clone(existing.value());
        }
        let entry = self.sessions.entry(id.to_string()).or_insert_with(|| {
            tracing::info!(session_id = id, "Session created");
            let tracker = ExerciseTracker::with_debounce(self.met_table.clone(), self.debounce_secs);
            Arc::new(Mutex::new(Session::new(
                id.to_string(),
                tracker,
                self.clock.now_secs(),
            )))
        });
        Arc::clone(entry.value())
    }

    /// Run `f` on the live session for `id`, creating it if unseen.
    ///
    /// The session is touched before and after `f`. If the session was
    /// evicted or terminated between lookup and locking, the stale handle is
    /// discarded and a registered session is used instead, so a frame is
    /// never recorded into a session the store no longer holds.
    pub fn with_session<R>(&self, id: &str, f: impl FnOnce(&mut Session) -> R) -> R {
        loop {
            let handle = self.get_or_create(id);
            let mut session = lock_session(&handle);
            if !self.is_registered(id, &handle) {
                tracing::debug!(session_id = id, "Session removed while waiting, retrying");
                continue;
            }
            session.touch(self.clock.now_secs());
            let result = f(&mut session);
            session.touch(self.clock.now_secs());
            return result;
        }
    }

    /// Remove a session and return its final summary.
    ///
    /// Waits for any in-flight frame on the session to finish first.
    pub fn terminate(&self, id: &str) -> RepsenseResult<SessionSummary> {
        self.finish(id, |_| Ok(()))
    }

    /// Hand the final summary of `id` to `persist`, then remove the session.
    ///
    /// The session stays locked while `persist` runs, so no frame can slip in
    /// between the summary and the removal. If `persist` fails the session is
    /// kept and the caller may retry.
    pub fn finish(
        &self,
        id: &str,
        persist: impl FnOnce(&SessionSummary) -> RepsenseResult<()>,
    ) -> RepsenseResult<SessionSummary> {
        let handle = self
            .sessions
            .get(id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| RepsenseError::session_not_found(id))?;
        let session = lock_session(&handle);
        if !self.is_registered(id, &handle) {
            return Err(RepsenseError::session_not_found(id));
        }

        let summary = session.summary();
        persist(&summary)?;
        self.sessions
            .remove_if(id, |_, current| Arc::ptr_eq(current, &handle));
        drop(session);

        tracing::info!(
            session_id = id,
            calories = summary.calories,
            exercise_types_count = summary.exercise_types_count,
            reps = summary.total_reps(),
            "Session terminated"
        );
        Ok(summary)
    }

    fn is_registered(&self, id: &str, handle: &SessionHandle) -> bool {
        self.sessions
            .get(id)
            .is_some_and(|current| Arc::ptr_eq(current.value(), handle))
    }

    /// Drop sessions idle for longer than `idle_timeout_secs`.
    ///
    /// A session whose lock is held is busy and is always kept. Returns the
    /// ids that were evicted.
    pub fn evict_idle(&self, idle_timeout_secs: f64) -> Vec<String> {
        let now = self.clock.now_secs();
        let mut evicted = Vec::new();
        self.sessions.retain(|id, handle| {
            let Ok(session) = handle.try_lock() else {
                return true;
            };
            if now - session.last_active() <= idle_timeout_secs {
                return true;
            }
            let summary = session.summary();
            tracing::info!(
                session_id = %id,
                idle_secs = now - session.last_active(),
                calories = summary.calories,
                exercise_types_count = summary.exercise_types_count,
                "Evicting idle session"
            );
            evicted.push(id.clone());
            false
        });
        evicted
    }

    pub fn contains(&self, id: &str) -> bool {
        self.sessions.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Drop every session.
    pub fn clear(&self) {
        let count = self.sessions.len();
        self.sessions.clear();
        if count > 0 {
            tracing::info!(count, "Cleared live sessions");
        }
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("sessions", &self.sessions.len())
            .field("met_table", &self.met_table)
            .finish()
    }
}
