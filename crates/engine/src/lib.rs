pub mod clock;
pub mod command;
pub mod event;
pub mod generation;
pub mod json_store;
pub mod manager;
pub mod memory;
pub mod sinks;
pub mod timer;
pub mod traits;
pub mod wake;

pub use clock::{Clock, ManualClock, SystemClock};
pub use event::{AlarmEvent, Origin, TransitionRequest};
pub use generation::{Generation, GenerationCounter};
pub use manager::{AlarmStateManager, Collaborators, SweepReport, UpdateKind};
pub use memory::MemoryStore;
pub use traits::*;
