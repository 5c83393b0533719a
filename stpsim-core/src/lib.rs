//! STP simulator core library
//!
//! Address types, the error type, the simulated clock, the event bus and the
//! network model that every device implementation plugs into.

pub mod clock;
pub mod device;
pub mod error;
pub mod event;
pub mod interface;
pub mod network;
pub mod types;

// Re-export commonly used types
pub use clock::{Clock, ManualTime, SystemTimeSource, TimeSource};
pub use device::{Context, Device, DeviceCore, LearningBridge, SpanningTreeParticipant};
pub use error::{Error, Result};
pub use event::{Direction, Event, EventBus, Observation, SubscriptionId, TestOutcome};
pub use interface::{Interface, QueueDiscipline};
pub use network::{Network, NetworkConfig};
pub use types::*;
