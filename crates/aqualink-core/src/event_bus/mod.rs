//! # Event Bus Module
//!
//! Provides the typed event bus used to deliver device events to
//! independent consumers.
//!
//! ## Overview
//!
//! - Publishers emit [`DeviceEvent`]s without knowing subscribers
//! - Subscribers register per [`EventKind`] and receive the typed payload
//! - Handlers run synchronously in registration order; a panicking handler
//!   is logged and does not stop the rest of the emission
//! - Async consumers can poll a broadcast receiver instead
//!
//! ## Usage
//!
//! ```rust,ignore
//! use aqualink_core::event_bus::{DeviceEvent, EventBus, EventKind};
//!
//! let bus = EventBus::new();
//! let subscription = bus.on_data(|sample| {
//!     println!("temperature: {:.1}", sample.temperature);
//! });
//!
//! bus.unsubscribe(EventKind::Data, subscription);
//! ```

mod bus;
mod events;

pub use bus::*;
pub use events::*;
