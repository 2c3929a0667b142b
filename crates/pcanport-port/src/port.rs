use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use pcanport_filter::{compile, AcceptanceSet};
use pcanport_frame::{decode, encode, Frame};
use pcanport_native::params::{PARAMETER_OFF, PARAMETER_ON};
use pcanport_native::{
    Baudrate, CanDriver, ChannelHandle, ChannelInfo, EventCallback, Parameter,
};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, trace, warn};

use crate::config::PortConfig;
use crate::error::{LifecycleError, PortError, Result};
use crate::event::{event_channel, CloseReason, PortEvent, PortEvents};
use crate::status::{StatusMonitor, StatusSnapshot};

/// Lifecycle state of a [`Port`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortState {
    Closed,
    Opening,
    Open,
    Closing,
    /// Opening failed part way. Only `close()` is accepted.
    Faulted,
}

impl fmt::Display for PortState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Closed => "closed",
            Self::Opening => "opening",
            Self::Open => "open",
            Self::Closing => "closing",
            Self::Faulted => "faulted",
        };
        f.write_str(name)
    }
}

/// A channel that can be passed to [`Port::open`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortDescriptor {
    pub path: ChannelHandle,
    pub info: ChannelInfo,
}

struct Inner {
    state: PortState,
    channel: Option<ChannelHandle>,
    initialized: bool,
    event_armed: bool,
    retired: bool,
    acceptance: AcceptanceSet,
    monitor: StatusMonitor,
    events: Option<UnboundedSender<PortEvent>>,
}

impl Inner {
    fn emit(&self, event: PortEvent) {
        if let Some(tx) = &self.events {
            // A dropped receiver just means nobody is listening.
            let _ = tx.send(event);
        }
    }

    fn is_active(&self, channel: ChannelHandle) -> bool {
        self.state == PortState::Open && self.channel == Some(channel)
    }

    fn open_channel(&self) -> Result<ChannelHandle> {
        match (self.state, self.channel) {
            (PortState::Open, Some(channel)) => Ok(channel),
            (PortState::Faulted, _) => Err(LifecycleError::Faulted.into()),
            _ => Err(LifecycleError::NotOpen.into()),
        }
    }
}

/// State shared between the port and the driver's event callback.
struct Shared<D> {
    driver: Arc<D>,
    inner: Mutex<Inner>,
}

impl<D: CanDriver> Shared<D> {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn report(&self, err: &PortError) {
        debug!(error = %err, "port operation failed");
        self.lock().emit(PortEvent::Error(err.info()));
    }

    /// Empty the channel's receive queue, then check the bus status.
    ///
    /// Runs on whatever thread the driver raises events from. The lock is
    /// never held across `read`, and the port's state is re-checked before
    /// every read so a concurrent close stops the loop.
    fn drain(&self, channel: ChannelHandle) {
        let mut received = 0usize;
        loop {
            if !self.lock().is_active(channel) {
                trace!(%channel, "drain skipped; port not open");
                return;
            }
            match self.driver.read(channel) {
                Ok(wire) => {
                    let frame = decode(&wire);
                    let inner = self.lock();
                    if !inner.is_active(channel) {
                        return;
                    }
                    inner.emit(PortEvent::Data(frame));
                    received += 1;
                }
                Err(err) if err.is_queue_empty() => break,
                Err(err) => {
                    debug!(%channel, error = %err, "read failed; ending drain pass");
                    break;
                }
            }
        }
        trace!(%channel, received, "drain pass complete");

        let mut inner = self.lock();
        if !inner.is_active(channel) {
            return;
        }
        // status() and error_text() never raise receive events, so holding
        // the lock here cannot re-enter.
        if let Some(snapshot) = inner.monitor.poll(&*self.driver, channel) {
            inner.emit(PortEvent::Status(snapshot));
        }
    }

    /// Move to `Faulted` and make sure no receive callback stays armed.
    fn fault(&self, channel: ChannelHandle) {
        let armed = {
            let mut inner = self.lock();
            inner.state = PortState::Faulted;
            std::mem::take(&mut inner.event_armed)
        };
        if armed {
            if let Err(err) = self.driver.disable_event(channel) {
                warn!(%channel, error = %err, "failed to disarm receive event");
            }
        }
        warn!(%channel, "port faulted during open");
    }

    /// Tear the channel down and end the event stream.
    fn shutdown(&self, reason: CloseReason) -> Result<()> {
        let (channel, initialized, armed) = {
            let mut inner = self.lock();
            if !matches!(inner.state, PortState::Open | PortState::Faulted) {
                return Err(LifecycleError::NotOpen.into());
            }
            inner.state = PortState::Closing;
            (
                inner.channel.take(),
                std::mem::take(&mut inner.initialized),
                std::mem::take(&mut inner.event_armed),
            )
        };

        let mut first_error = None;
        if let Some(channel) = channel {
            let mut record = |result: pcanport_native::Result<()>| {
                if let Err(err) = result {
                    warn!(%channel, error = %err, "teardown step failed");
                    first_error.get_or_insert(err);
                }
            };
            if armed {
                record(self.driver.disable_event(channel));
            }
            if initialized {
                record(self.driver.reset(channel));
                record(self.driver.uninitialize(channel));
            }
            info!(%channel, ?reason, "port closed");
        }

        let mut inner = self.lock();
        inner.state = PortState::Closed;
        inner.retired = true;
        inner.acceptance = AcceptanceSet::default();
        inner.emit(PortEvent::Close(reason));
        inner.events = None;

        match first_error {
            Some(err) => Err(err.into()),
            None => Ok(()),
        }
    }
}

/// One CAN channel exposed as a stream of frames.
///
/// A port is opened once and closed once. Inbound frames, write
/// confirmations, status changes and failures are delivered through
/// [`PortEvents`], obtained with [`take_events`](Self::take_events).
///
/// Inbound frames are read on the thread the driver raises its receive event
/// from; the port assumes one consumer and one owner of the channel.
pub struct Port<D: CanDriver + 'static> {
    shared: Arc<Shared<D>>,
    config: PortConfig,
    events: Mutex<Option<PortEvents>>,
}

impl<D: CanDriver + 'static> Port<D> {
    /// Create a closed port. The configuration is validated here.
    ///
    /// Configuration errors found at construction are only returned; no event
    /// stream exists yet to report them on.
    pub fn new(driver: Arc<D>, config: PortConfig) -> Result<Self> {
        config.validate()?;
        let (tx, events) = event_channel();
        let inner = Inner {
            state: PortState::Closed,
            channel: None,
            initialized: false,
            event_armed: false,
            retired: false,
            acceptance: AcceptanceSet::default(),
            monitor: StatusMonitor::new(),
            events: Some(tx),
        };
        Ok(Self {
            shared: Arc::new(Shared {
                driver,
                inner: Mutex::new(inner),
            }),
            config,
            events: Mutex::new(Some(events)),
        })
    }

    pub fn config(&self) -> &PortConfig {
        &self.config
    }

    /// Replace the configuration. Only allowed before the port is opened.
    pub fn set_config(&mut self, config: PortConfig) -> Result<()> {
        {
            let inner = self.shared.lock();
            if inner.retired {
                return Err(LifecycleError::Retired.into());
            }
            if inner.state != PortState::Closed {
                return Err(LifecycleError::AlreadyOpen.into());
            }
        }
        config.validate()?;
        self.config = config;
        Ok(())
    }

    /// Hand out the event receiver. Returns `None` after the first call.
    pub fn take_events(&self) -> Option<PortEvents> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    /// Channels the driver reports, usable as `open` paths.
    pub fn list(&self) -> Result<Vec<PortDescriptor>> {
        let result = self
            .shared
            .driver
            .channel_info()
            .map(|channels| {
                channels
                    .into_iter()
                    .map(|info| PortDescriptor {
                        path: info.channel_handle,
                        info,
                    })
                    .collect()
            })
            .map_err(PortError::from);
        if let Err(err) = &result {
            self.shared.report(err);
        }
        result
    }

    /// Open a channel and start receiving.
    ///
    /// Listen-only mode is switched off, the channel is initialized at the
    /// configured rate and filters are programmed. The port then becomes
    /// open, the receive callback is armed and bus-off auto-reset is enabled.
    /// Drivers that need it get receive delivery switched off while
    /// configuring. Any failure leaves the port `Faulted` with no callback
    /// armed; close it to release the channel.
    pub fn open(&self, path: ChannelHandle) -> Result<()> {
        let result = self.try_open(path);
        if let Err(err) = &result {
            self.shared.report(err);
        }
        result
    }

    fn try_open(&self, path: ChannelHandle) -> Result<()> {
        let baudrate = self.config.baudrate()?;
        {
            let mut inner = self.shared.lock();
            match inner.state {
                PortState::Closed if inner.retired => return Err(LifecycleError::Retired.into()),
                PortState::Closed => {}
                PortState::Faulted => return Err(LifecycleError::Faulted.into()),
                PortState::Opening | PortState::Open | PortState::Closing => {
                    return Err(LifecycleError::AlreadyOpen.into())
                }
            }
            inner.state = PortState::Opening;
            inner.channel = Some(path);
        }
        debug!(channel = %path, %baudrate, "opening port");

        if let Err(err) = self.configure(path, baudrate) {
            self.shared.fault(path);
            return Err(err);
        }
        info!(channel = %path, %baudrate, loopback = self.config.loopback, "port open");
        Ok(())
    }

    fn configure(&self, path: ChannelHandle, baudrate: Baudrate) -> Result<()> {
        let driver = &self.shared.driver;
        let toggle = driver.needs_receive_toggle();

        driver.set_value(path, Parameter::ListenOnly, &[PARAMETER_OFF])?;
        if toggle {
            driver.set_value(path, Parameter::ReceiveStatus, &[PARAMETER_OFF])?;
        }
        driver.initialize(path, baudrate)?;
        self.shared.lock().initialized = true;

        let acceptance = compile(driver.as_ref(), path, &self.config.filters)?;
        {
            let mut inner = self.shared.lock();
            inner.acceptance = acceptance;
            inner.state = PortState::Open;
            inner.emit(PortEvent::Open);
        }

        let weak: Weak<Shared<D>> = Arc::downgrade(&self.shared);
        let callback: EventCallback = Arc::new(move || {
            if let Some(shared) = weak.upgrade() {
                shared.drain(path);
            }
        });
        driver.enable_event(path, callback)?;
        self.shared.lock().event_armed = true;

        if toggle {
            driver.set_value(path, Parameter::ReceiveStatus, &[PARAMETER_ON])?;
        }
        driver.set_value(path, Parameter::BusoffAutoreset, &[PARAMETER_ON])?;
        Ok(())
    }

    /// Release the channel and end the event stream.
    ///
    /// Accepted from `Open` and `Faulted`. A port that is closed cannot be
    /// opened again. If a teardown step fails the remaining steps still run,
    /// the port still closes, and the first failure is returned.
    pub fn close(&self) -> Result<()> {
        let result = self.shared.shutdown(CloseReason::Requested);
        if let Err(err) = &result {
            self.shared.report(err);
        }
        result
    }

    /// Send a frame.
    ///
    /// Oversized payloads are rejected before the controller is touched. A
    /// failed native write is returned and not retried; the port stays open.
    pub fn write(&self, frame: &Frame) -> Result<()> {
        let result = self.try_write(frame);
        if let Err(err) = &result {
            self.shared.report(err);
        }
        result
    }

    fn try_write(&self, frame: &Frame) -> Result<()> {
        let channel = self.shared.lock().open_channel()?;
        let wire = encode(frame)?;
        self.shared
            .driver
            .write(channel, &wire)
            .map_err(PortError::Write)?;
        trace!(%channel, id = frame.id, ext = frame.ext, len = frame.payload.len(), "frame written");

        let inner = self.shared.lock();
        inner.emit(PortEvent::Write(frame.clone()));
        if self.config.loopback {
            let echo = decode(&wire);
            if inner.acceptance.admits(&echo) {
                inner.emit(PortEvent::Data(echo));
            }
        }
        Ok(())
    }

    /// Current bus status, read fresh from the controller.
    ///
    /// Does not affect change tracking for [`PortEvent::Status`].
    pub fn status(&self) -> Result<StatusSnapshot> {
        let channel = {
            let inner = self.shared.lock();
            match (inner.state, inner.channel) {
                (PortState::Open | PortState::Faulted, Some(channel)) => Ok(channel),
                _ => Err(PortError::from(LifecycleError::NotOpen)),
            }
        };
        let channel = match channel {
            Ok(channel) => channel,
            Err(err) => {
                self.shared.report(&err);
                return Err(err);
            }
        };
        let driver = self.shared.driver.as_ref();
        Ok(StatusSnapshot::describe(driver, driver.status(channel)))
    }

    /// Last status reported through [`PortEvent::Status`].
    pub fn last_status(&self) -> Option<StatusSnapshot> {
        self.shared.lock().monitor.current().cloned()
    }

    pub fn state(&self) -> PortState {
        self.shared.lock().state
    }

    /// Handle of the channel in use, if any.
    pub fn channel(&self) -> Option<ChannelHandle> {
        self.shared.lock().channel
    }

    pub fn is_open(&self) -> bool {
        self.state() == PortState::Open
    }

    /// Same as [`is_open`](Self::is_open).
    pub fn is_connected(&self) -> bool {
        self.is_open()
    }
}

impl<D: CanDriver + 'static> Drop for Port<D> {
    fn drop(&mut self) {
        let active = matches!(
            self.shared.lock().state,
            PortState::Open | PortState::Faulted
        );
        if active {
            if let Err(err) = self.shared.shutdown(CloseReason::Dropped) {
                warn!(error = %err, "teardown on drop failed");
            }
        }
    }
}

impl<D: CanDriver + 'static> fmt::Debug for Port<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.shared.lock();
        f.debug_struct("Port")
            .field("state", &inner.state)
            .field("channel", &inner.channel)
            .field("config", &self.config)
            .finish()
    }
}
