//! Ride events.
//!
//! The matching API publishes an event after every change it commits. Anything interested in those changes registers a
//! hook in [`EventHooks`]; each hook runs on its own handler task, fed by a channel, so a slow hook never holds up the
//! state machine.
mod channel;
mod event_types;
mod hooks;

pub use channel::{EventHandler, EventProducer, Handler};
pub use event_types::*;
pub use hooks::{EventHandlers, EventHooks, EventProducers};
