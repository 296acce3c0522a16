//! # AquaLink Communication
//!
//! Device links and the connectivity service for AquaLink.
//! A [`DeviceLink`] is the replaceable transport to one sensor device; the
//! [`ConnectivityService`] drives its connection lifecycle, streams telemetry
//! while connected and relays commands, publishing everything on the
//! core event bus.

pub mod link;
pub mod service;

pub use link::{DeviceLink, SimulatedLink, DEFAULT_DEVICE_NAME};
pub use service::{ConnectivityConfig, ConnectivityService};
