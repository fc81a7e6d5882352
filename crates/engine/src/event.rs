//! Inbound events handled by the state manager.

use reveille_core::{InstanceId, InstanceState};

use crate::generation::Generation;

/// Who asked for a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// Delivered by the timer facility. Subject to the generation check.
    Scheduler,
    /// Requested by the user. Always honoured.
    User,
}

/// Request to move an instance to `target`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionRequest {
    pub instance_id: InstanceId,
    pub target: InstanceState,
    pub generation: Generation,
    pub origin: Origin,
}

impl TransitionRequest {
    pub fn scheduled(instance_id: InstanceId, target: InstanceState, generation: Generation) -> Self {
        Self {
            instance_id,
            target,
            generation,
            origin: Origin::Scheduler,
        }
    }

    pub fn is_user_action(&self) -> bool {
        self.origin == Origin::User
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AlarmEvent {
    /// The process (or device) just started.
    Boot,
    /// Wall clock or timezone changed underneath us.
    TimeChanged,
    Transition(TransitionRequest),
}

impl std::fmt::Display for AlarmEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AlarmEvent::Boot => f.write_str("boot"),
            AlarmEvent::TimeChanged => f.write_str("time-changed"),
            AlarmEvent::Transition(req) => write!(
                f,
                "transition {} -> {} (gen {}, {:?})",
                req.instance_id, req.target, req.generation, req.origin
            ),
        }
    }
}
