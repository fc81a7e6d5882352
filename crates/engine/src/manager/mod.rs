//! The alarm instance state machine.
//!
//! [`AlarmStateManager`] owns every state change of every instance. Its
//! `impl` is split by concern:
//!
//! - `core`: construction, serialization and the public entry points
//! - `transitions`: one `set_*_state` per target state
//! - `register`: reconciling one instance against the current time
//! - `parent`: scheduling the successor of a finished instance
//! - `sweep`: the boot / time-change reconciliation pass
//! - `next_wake`: publishing the upcoming alarm
//! - `records`: alarm record management

mod core;
mod next_wake;
mod parent;
mod records;
mod register;
mod sweep;
mod transitions;


pub use self::core::{AlarmStateManager, Collaborators};
pub use self::records::UpdateKind;
pub use self::sweep::SweepReport;
