//! [`TokioTransitionScheduler`]: arms one tokio sleep task per instance and
//! delivers the transition as an [`AlarmEvent`] on a channel.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::NaiveDateTime;
use reveille_core::{InstanceId, InstanceState};
use tokio::runtime::Handle;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::clock::Clock;
use crate::event::{AlarmEvent, TransitionRequest};
use crate::generation::Generation;
use crate::traits::TransitionScheduler;

pub struct TokioTransitionScheduler {
    runtime: Handle,
    clock: Arc<dyn Clock>,
    events: UnboundedSender<AlarmEvent>,
    armed: Mutex<HashMap<InstanceId, JoinHandle<()>>>,
}

impl TokioTransitionScheduler {
    /// `runtime` is where the sleep tasks run; arming works from any thread.
    pub fn new(runtime: Handle, clock: Arc<dyn Clock>, events: UnboundedSender<AlarmEvent>) -> Self {
        Self {
            runtime,
            clock,
            events,
            armed: Mutex::new(HashMap::new()),
        }
    }

    /// Number of armed, not yet delivered transitions.
    pub fn armed_count(&self) -> usize {
        self.armed().values().filter(|h| !h.is_finished()).count()
    }

    fn armed(&self) -> MutexGuard<'_, HashMap<InstanceId, JoinHandle<()>>> {
        self.armed.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl TransitionScheduler for TokioTransitionScheduler {
    fn arm(&self, instance_id: InstanceId, target: InstanceState, at: NaiveDateTime, generation: Generation) {
        // Deadlines already in the past deliver immediately.
        let delay = (at - self.clock.now()).to_std().unwrap_or_default();
        let events = self.events.clone();
        let request = TransitionRequest::scheduled(instance_id, target, generation);

        let handle = self.runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            if events.send(AlarmEvent::Transition(request)).is_err() {
                warn!(%instance_id, "event channel closed, transition dropped");
            }
        });

        debug!(%instance_id, %target, ?delay, "transition armed");
        if let Some(previous) = self.armed().insert(instance_id, handle) {
            previous.abort();
        }
    }

    fn cancel(&self, instance_id: InstanceId) {
        if let Some(handle) = self.armed().remove(&instance_id) {
            handle.abort();
            debug!(%instance_id, "armed transition cancelled");
        }
    }
}
