//! Connectivity service
//!
//! Composition root tying a [`DeviceLink`] to the event bus. It owns the
//! connection state machine, the telemetry schedule and the command channel,
//! all driven by tokio timer tasks.
//!
//! ## Ordering
//!
//! Public operations and timer callbacks run under a re-entrant dispatch
//! lock, so they never overlap and handlers may call back into the service.
//! Each state change advances an epoch that stale callbacks check before
//! acting. Together these guarantee that once `disconnect()` returns no
//! further `data` or `commandResponse` event is published.
//!
//! ## Example
//!
//! ```rust,ignore
//! let service = ConnectivityService::simulated(ConnectivityConfig::default())?;
//! service.on_data(|sample| println!("{}", sample));
//! service.connect();
//! ```

mod config;
mod state;

pub use config::ConnectivityConfig;

use std::sync::{Arc, Weak};
use std::time::Duration;

use aqualink_core::{
    now_millis, Command, CommandParams, CommandResult, ConnectionError, ConnectionStatus,
    DeviceError, DeviceEvent, EventBus, EventKind, Result, SubscriptionId, TelemetrySample,
};
use parking_lot::{Mutex, ReentrantMutex};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::link::{DeviceLink, SimulatedLink};
use state::LinkState;

/// Manages the connection to one device and publishes its events
pub struct ConnectivityService {
    core: Arc<ServiceCore>,
}

struct ServiceCore {
    config: ConnectivityConfig,
    link: Arc<dyn DeviceLink>,
    bus: Arc<EventBus>,
    state: Mutex<LinkState>,
    dispatch: ReentrantMutex<()>,
    runtime: Handle,
}

impl ConnectivityService {
    /// Create a service with its own event bus on the current tokio runtime
    pub fn new(config: ConnectivityConfig, link: Arc<dyn DeviceLink>) -> Result<Self> {
        Self::with_bus(config, link, Arc::new(EventBus::new()))
    }

    /// Create a service publishing on a shared event bus
    ///
    /// Must be called from within a tokio runtime.
    pub fn with_bus(
        config: ConnectivityConfig,
        link: Arc<dyn DeviceLink>,
        bus: Arc<EventBus>,
    ) -> Result<Self> {
        let runtime = Handle::try_current().map_err(|e| ConnectionError::NoRuntime {
            reason: e.to_string(),
        })?;
        Self::with_runtime(config, link, bus, runtime)
    }

    /// Create a service whose timers run on the given runtime
    pub fn with_runtime(
        config: ConnectivityConfig,
        link: Arc<dyn DeviceLink>,
        bus: Arc<EventBus>,
        runtime: Handle,
    ) -> Result<Self> {
        config.validate()?;
        tracing::debug!(device = link.name(), "Created connectivity service");
        Ok(Self {
            core: Arc::new(ServiceCore {
                config,
                link,
                bus,
                state: Mutex::new(LinkState::default()),
                dispatch: ReentrantMutex::new(()),
                runtime,
            }),
        })
    }

    /// Create a service backed by a [`SimulatedLink`]
    pub fn simulated(config: ConnectivityConfig) -> Result<Self> {
        Self::new(config, Arc::new(SimulatedLink::new()))
    }

    /// Begin the service lifecycle
    ///
    /// Arms the automatic first connect after the startup delay when
    /// `auto_connect` is set. Calling `start` twice is a no-op.
    pub fn start(&self) {
        self.core.start();
    }

    /// End the service lifecycle
    ///
    /// Cancels every timer and pending acknowledgment, closes the link and
    /// publishes `Disconnected`.
    pub fn stop(&self) {
        self.core.stop();
    }

    /// Schedule the link to come up after the connect delay
    ///
    /// No-op while already connected. While a connect is pending the delay
    /// restarts.
    pub fn connect(&self) {
        self.core.connect();
    }

    /// Stop telemetry, close the link and publish `Disconnected`
    ///
    /// Callable from any state; every call publishes.
    pub fn disconnect(&self) {
        self.core.disconnect();
    }

    /// Disconnect, publish `Reconnecting`, then connect after the backoff
    pub fn reconnect(&self) {
        self.core.reconnect();
    }

    /// Check if the link is connected
    pub fn is_connected(&self) -> bool {
        self.core.state.lock().status.is_connected()
    }

    /// Current connection status, including the unpublished `Connecting`
    pub fn status(&self) -> ConnectionStatus {
        self.core.state.lock().status
    }

    /// Check if `start` has been called without a matching `stop`
    pub fn is_started(&self) -> bool {
        self.core.state.lock().started
    }

    /// Check if the periodic telemetry schedule is running
    pub fn is_streaming(&self) -> bool {
        self.core.state.lock().is_streaming()
    }

    /// Send a command to the device
    ///
    /// Rejected with [`DeviceError::NotConnected`] unless connected. An
    /// accepted command is answered by exactly one `commandResponse` event
    /// after the acknowledgment delay, unless the link goes down first.
    pub fn send_command(&self, name: &str, parameters: CommandParams) -> Result<()> {
        self.core.send_command(name, parameters)
    }

    /// Register a handler for one kind of event
    pub fn on<F>(&self, kind: EventKind, handler: F) -> SubscriptionId
    where
        F: Fn(&DeviceEvent) + Send + Sync + 'static,
    {
        self.core.bus.subscribe(kind, handler)
    }

    /// Remove a handler. Unknown ids are ignored.
    pub fn off(&self, kind: EventKind, id: SubscriptionId) -> bool {
        self.core.bus.unsubscribe(kind, id)
    }

    /// Register a handler for connection status changes
    pub fn on_connection<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(ConnectionStatus) + Send + Sync + 'static,
    {
        self.core.bus.on_connection(handler)
    }

    /// Register a handler for telemetry samples
    pub fn on_data<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(&TelemetrySample) + Send + Sync + 'static,
    {
        self.core.bus.on_data(handler)
    }

    /// Register a handler for command acknowledgments
    pub fn on_command_response<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(&CommandResult) + Send + Sync + 'static,
    {
        self.core.bus.on_command_response(handler)
    }

    /// The event bus this service publishes on
    pub fn bus(&self) -> &Arc<EventBus> {
        &self.core.bus
    }

    /// The timing configuration
    pub fn config(&self) -> &ConnectivityConfig {
        &self.core.config
    }

    /// Name of the device behind the link
    pub fn device_name(&self) -> &str {
        self.core.link.name()
    }
}

impl Drop for ConnectivityService {
    fn drop(&mut self) {
        self.core.shutdown();
    }
}

impl std::fmt::Debug for ConnectivityService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.core.state.lock();
        f.debug_struct("ConnectivityService")
            .field("device", &self.core.link.name())
            .field("status", &state.status)
            .field("started", &state.started)
            .field("config", &self.core.config)
            .finish()
    }
}

impl ServiceCore {
    fn start(self: &Arc<Self>) {
        let _dispatch = self.dispatch.lock();
        let mut state = self.state.lock();
        if state.started {
            tracing::debug!("Connectivity service already started");
            return;
        }
        state.started = true;
        tracing::info!(device = self.link.name(), "Connectivity service started");

        if self.config.auto_connect && state.status == ConnectionStatus::Disconnected {
            let epoch = state.advance_epoch();
            let handle = self.schedule(self.config.startup_delay, move |core| {
                core.deferred_connect(epoch, ConnectionStatus::Disconnected)
            });
            state.set_pending(handle);
        }
    }

    fn stop(&self) {
        let _dispatch = self.dispatch.lock();
        let was_started = std::mem::replace(&mut self.state.lock().started, false);
        if was_started {
            tracing::info!(device = self.link.name(), "Connectivity service stopped");
        }
        self.disconnect();
    }

    fn connect(self: &Arc<Self>) {
        let _dispatch = self.dispatch.lock();
        let mut state = self.state.lock();
        if state.status.is_connected() {
            tracing::debug!("connect() ignored, already connected");
            return;
        }

        let epoch = state.advance_epoch();
        state.status = ConnectionStatus::Connecting;
        tracing::debug!(
            device = self.link.name(),
            delay_ms = self.config.connect_delay.as_millis() as u64,
            "Connecting"
        );
        let handle = self.schedule(self.config.connect_delay, move |core| {
            core.complete_connect(epoch)
        });
        state.set_pending(handle);
    }

    /// Connect if the state is still what it was when the timer was armed
    fn deferred_connect(self: &Arc<Self>, epoch: u64, expected: ConnectionStatus) {
        let _dispatch = self.dispatch.lock();
        {
            let state = self.state.lock();
            if !state.is_current(epoch) || state.status != expected {
                tracing::debug!("Skipping stale {} timer", expected);
                return;
            }
        }
        self.connect();
    }

    fn complete_connect(self: &Arc<Self>, epoch: u64) {
        let _dispatch = self.dispatch.lock();
        {
            let state = self.state.lock();
            if !state.is_current(epoch) || state.status != ConnectionStatus::Connecting {
                tracing::debug!("Skipping stale connect timer");
                return;
            }
        }

        if let Err(err) = self.link.open() {
            tracing::error!(device = self.link.name(), "Connection failed: {}", err);
            {
                let mut state = self.state.lock();
                state.advance_epoch();
                state.status = ConnectionStatus::Disconnected;
            }
            self.bus
                .publish(DeviceEvent::connection(ConnectionStatus::Disconnected));
            self.bus.publish(DeviceEvent::ConnectFailed {
                reason: err.to_string(),
            });
            return;
        }

        {
            let mut state = self.state.lock();
            state.status = ConnectionStatus::Connected;
            // Armed before publishing so a handler's disconnect can cancel it
            let handle = self.spawn_stream(epoch);
            state.set_stream(handle);
        }
        tracing::info!(device = self.link.name(), "Connected");
        self.bus
            .publish(DeviceEvent::connection(ConnectionStatus::Connected));
        self.emit_sample(epoch);
    }

    fn spawn_stream(self: &Arc<Self>, epoch: u64) -> JoinHandle<()> {
        let weak = Arc::downgrade(self);
        let period = self.config.telemetry_interval;
        self.runtime.spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let Some(core) = weak.upgrade() else {
                    break;
                };
                if !core.emit_sample(epoch) {
                    break;
                }
            }
        })
    }

    /// Publish one sample. Returns false once the schedule is stale.
    fn emit_sample(&self, epoch: u64) -> bool {
        let _dispatch = self.dispatch.lock();
        {
            let state = self.state.lock();
            if !state.is_current(epoch) || !state.status.is_connected() {
                return false;
            }
        }

        match self.link.read_sample() {
            Ok(sample) => {
                tracing::trace!("Telemetry {}", sample);
                self.bus.publish(DeviceEvent::Data(sample));
            }
            Err(err) => tracing::warn!("Skipping telemetry tick: {}", err),
        }
        true
    }

    fn disconnect(&self) {
        let _dispatch = self.dispatch.lock();
        let dropped = {
            let mut state = self.state.lock();
            state.advance_epoch();
            state.status = ConnectionStatus::Disconnected;
            state.cancel_all()
        };
        if dropped > 0 {
            tracing::warn!(dropped, "Discarding unacknowledged commands");
        }
        self.link.close();
        tracing::info!(device = self.link.name(), "Disconnected");
        self.bus
            .publish(DeviceEvent::connection(ConnectionStatus::Disconnected));
    }

    fn reconnect(self: &Arc<Self>) {
        let _dispatch = self.dispatch.lock();
        self.disconnect();
        {
            let mut state = self.state.lock();
            let epoch = state.advance_epoch();
            state.status = ConnectionStatus::Reconnecting;
            let handle = self.schedule(self.config.reconnect_delay, move |core| {
                core.deferred_connect(epoch, ConnectionStatus::Reconnecting)
            });
            state.set_pending(handle);
        }
        tracing::info!(
            device = self.link.name(),
            delay_ms = self.config.reconnect_delay.as_millis() as u64,
            "Reconnecting"
        );
        self.bus
            .publish(DeviceEvent::connection(ConnectionStatus::Reconnecting));
    }

    fn send_command(self: &Arc<Self>, name: &str, parameters: CommandParams) -> Result<()> {
        let _dispatch = self.dispatch.lock();
        let mut state = self.state.lock();
        if !state.status.is_connected() {
            tracing::warn!(command = name, status = %state.status, "Rejecting command");
            return Err(DeviceError::NotConnected.into());
        }

        let command = Command::new(name, parameters);
        tracing::debug!(command = name, "Command accepted");
        let epoch = state.epoch;
        let handle = self.schedule(self.config.command_ack_delay, move |core| {
            core.acknowledge(&command, epoch)
        });
        state.track_ack(handle);
        Ok(())
    }

    fn acknowledge(&self, command: &Command, epoch: u64) {
        let _dispatch = self.dispatch.lock();
        {
            let state = self.state.lock();
            if !state.is_current(epoch) || !state.status.is_connected() {
                tracing::warn!(
                    command = %command.name,
                    "Dropping acknowledgment, link changed after the command was accepted"
                );
                return;
            }
        }

        let result = match self.link.execute(command) {
            Ok(result) => result,
            Err(err) => {
                tracing::error!(command = %command.name, "Command failed: {}", err);
                CommandResult::failed(&command.name, err.to_string(), now_millis())
            }
        };
        tracing::debug!("{}", result.message);
        self.bus.publish(DeviceEvent::CommandResponse(result));
    }

    /// Cancel everything without publishing
    fn shutdown(&self) {
        let _dispatch = self.dispatch.lock();
        {
            let mut state = self.state.lock();
            state.advance_epoch();
            state.status = ConnectionStatus::Disconnected;
            state.started = false;
            state.cancel_all();
        }
        self.link.close();
        tracing::debug!(device = self.link.name(), "Connectivity service dropped");
    }

    /// Run `callback` after `delay` unless the service is gone by then
    fn schedule<F>(self: &Arc<Self>, delay: Duration, callback: F) -> JoinHandle<()>
    where
        F: FnOnce(&Arc<ServiceCore>) + Send + 'static,
    {
        let weak: Weak<ServiceCore> = Arc::downgrade(self);
        self.runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(core) = weak.upgrade() {
                callback(&core);
            }
        })
    }
}
