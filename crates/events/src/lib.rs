//! Movement events and their distribution.
//!
//! The domain produces events as plain values; publishing them is the job of
//! whoever owns the state (see `medkit-infra`).

pub mod bus;
pub mod event;
pub mod in_memory_bus;

pub use bus::{EventBus, Subscription};
pub use event::Event;
pub use in_memory_bus::{InMemoryBusError, InMemoryEventBus};
