use std::collections::{BTreeMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::{debug, trace};

use crate::acceptance::{bank_admits, AcceptanceRule};
use crate::driver::{
    CanDriver, ChannelHandle, ChannelInfo, EventCallback, CHANNEL_AVAILABLE, CHANNEL_OCCUPIED,
    DEVICE_TYPE_USB,
};
use crate::error::{DriverError, Result};
use crate::params::{split_acceptance_word, Baudrate, FilterMode, Parameter, PARAMETER_ON};
use crate::status::StatusCode;
use crate::wire::{WireFrame, MAX_DATA_LEN};

/// Receive queue depth per channel; further messages overrun.
pub const RX_QUEUE_CAPACITY: usize = 32_767;

/// A native call recorded by [`VirtualBus`].
///
/// Reads and status queries are not recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriverCall {
    Initialize {
        channel: ChannelHandle,
        baudrate: Baudrate,
    },
    Uninitialize(ChannelHandle),
    Reset(ChannelHandle),
    Write {
        channel: ChannelHandle,
        frame: WireFrame,
    },
    SetValue {
        channel: ChannelHandle,
        param: Parameter,
        value: Vec<u8>,
    },
    FilterMessages {
        channel: ChannelHandle,
        from: u32,
        to: u32,
        mode: FilterMode,
    },
    EnableEvent(ChannelHandle),
    DisableEvent(ChannelHandle),
}

impl DriverCall {
    /// Channel the call targeted.
    pub fn channel(&self) -> ChannelHandle {
        match self {
            Self::Initialize { channel, .. }
            | Self::Write { channel, .. }
            | Self::SetValue { channel, .. }
            | Self::FilterMessages { channel, .. } => *channel,
            Self::Uninitialize(channel)
            | Self::Reset(channel)
            | Self::EnableEvent(channel)
            | Self::DisableEvent(channel) => *channel,
        }
    }

    /// True for calls that program the acceptance filter bank.
    pub fn is_filter_programming(&self) -> bool {
        match self {
            Self::FilterMessages { .. } => true,
            Self::SetValue { param, .. } => matches!(
                param,
                Parameter::AcceptanceFilter11Bit
                    | Parameter::AcceptanceFilter29Bit
                    | Parameter::MessageFilter
            ),
            _ => false,
        }
    }
}

struct VirtualChannel {
    info: ChannelInfo,
    baudrate: Option<Baudrate>,
    listen_only: bool,
    receiving: bool,
    busoff_autoreset: bool,
    rules: Vec<AcceptanceRule>,
    rx: VecDeque<WireFrame>,
    callback: Option<EventCallback>,
    status: StatusCode,
}

impl VirtualChannel {
    fn new(info: ChannelInfo) -> Self {
        Self {
            info,
            baudrate: None,
            listen_only: false,
            receiving: true,
            busoff_autoreset: false,
            rules: Vec::new(),
            rx: VecDeque::new(),
            callback: None,
            status: StatusCode::OK,
        }
    }

    fn is_initialized(&self) -> bool {
        self.baudrate.is_some()
    }

    /// Queue an arriving message; returns the callback to notify, if any.
    fn enqueue(&mut self, frame: &WireFrame) -> Option<EventCallback> {
        if !self.receiving || !bank_admits(&self.rules, frame.id, frame.has_extended_flag()) {
            return None;
        }
        if self.rx.len() >= RX_QUEUE_CAPACITY {
            self.status = StatusCode(self.status.0 | StatusCode::QOVERRUN.0);
        } else {
            self.rx.push_back(*frame);
        }
        self.callback.clone()
    }
}

struct Fault {
    op: &'static str,
    skip: usize,
    code: StatusCode,
}

#[derive(Default)]
struct BusState {
    channels: BTreeMap<ChannelHandle, VirtualChannel>,
    faults: Vec<Fault>,
    calls: Vec<DriverCall>,
}

impl BusState {
    fn take_fault(&mut self, op: &'static str) -> Result<()> {
        let Some(pos) = self.faults.iter().position(|fault| fault.op == op) else {
            return Ok(());
        };
        if self.faults[pos].skip > 0 {
            self.faults[pos].skip -= 1;
            return Ok(());
        }
        let fault = self.faults.remove(pos);
        Err(DriverError::status(op, fault.code))
    }

    fn channel(&mut self, op: &'static str, handle: ChannelHandle) -> Result<&mut VirtualChannel> {
        self.channels
            .get_mut(&handle)
            .ok_or(DriverError::status(op, StatusCode::ILLHANDLE))
    }

    fn initialized(
        &mut self,
        op: &'static str,
        handle: ChannelHandle,
    ) -> Result<&mut VirtualChannel> {
        let channel = self.channel(op, handle)?;
        if !channel.is_initialized() {
            return Err(DriverError::status(op, StatusCode::INITIALIZE));
        }
        Ok(channel)
    }
}

/// An in-memory CAN bus implementing [`CanDriver`].
///
/// Every channel is a node on the same bus. A message written on one channel
/// reaches every other initialized, receiving channel running at the same bit
/// rate whose acceptance filters admit it, and that channel's event callback
/// then fires. Callbacks run on the writer's thread after the bus lock is
/// released.
///
/// Acceptance filters see a message as extended whenever its type carries the
/// extended flag, so an extended remote request passes an extended filter.
/// Frame decoding is stricter and only reports `ext` for a plain extended
/// message; such a request therefore arrives with `ext: false`.
///
/// The bus also records the native calls made against it and can be told to
/// fail upcoming calls, which makes it the backend for tests and demos.
pub struct VirtualBus {
    state: Mutex<BusState>,
    receive_toggle: bool,
}

impl VirtualBus {
    /// Create a bus with `channel_count` USB channels starting at `0x51`.
    pub fn new(channel_count: usize) -> Self {
        let mut state = BusState::default();
        for index in 0..channel_count {
            let handle = ChannelHandle(ChannelHandle::USBBUS1.0 + index as u16);
            let info = ChannelInfo {
                channel_handle: handle,
                device_type: DEVICE_TYPE_USB,
                controller_number: 0,
                device_features: 0,
                device_name: "PCAN-USB".to_string(),
                device_id: index as u32,
                channel_condition: CHANNEL_AVAILABLE,
            };
            state.channels.insert(handle, VirtualChannel::new(info));
        }
        Self {
            state: Mutex::new(state),
            receive_toggle: false,
        }
    }

    /// Report the receive-toggle capability to callers.
    pub fn with_receive_toggle(mut self, enabled: bool) -> Self {
        self.receive_toggle = enabled;
        self
    }

    /// Handles of all channels on the bus.
    pub fn handles(&self) -> Vec<ChannelHandle> {
        self.lock().channels.keys().copied().collect()
    }

    /// Make the next call to `op` fail with `code`.
    ///
    /// `op` is the native operation name used in [`DriverError::Status`],
    /// e.g. `"initialize"`, `"write"`, `"read"` or `"set_value"`.
    pub fn fail_next(&self, op: &'static str, code: StatusCode) {
        self.fail_nth(op, 0, code);
    }

    /// Let `skip` calls to `op` succeed, then fail the next one with `code`.
    pub fn fail_nth(&self, op: &'static str, skip: usize, code: StatusCode) {
        self.lock().faults.push(Fault { op, skip, code });
    }

    /// Force the bus status reported for a channel.
    pub fn set_status(&self, channel: ChannelHandle, code: StatusCode) {
        if let Some(ch) = self.lock().channels.get_mut(&channel) {
            ch.status = code;
        }
    }

    /// Deliver a message to one channel as if a remote node had sent it, then
    /// fire the channel's event callback.
    ///
    /// Returns whether the channel accepted the message.
    pub fn inject(&self, channel: ChannelHandle, frame: WireFrame) -> bool {
        let accepted = self.queue(channel, frame);
        if accepted {
            self.raise_event(channel);
        }
        accepted
    }

    /// Like [`inject`](Self::inject) but without notifying, so several
    /// messages can pile up behind one later [`raise_event`](Self::raise_event).
    pub fn queue(&self, channel: ChannelHandle, frame: WireFrame) -> bool {
        let mut state = self.lock();
        let Some(ch) = state.channels.get_mut(&channel) else {
            return false;
        };
        if !ch.is_initialized() {
            return false;
        }
        let queued_before = ch.rx.len();
        ch.enqueue(&frame);
        ch.rx.len() > queued_before
    }

    /// Fire a channel's event callback without queueing anything.
    pub fn raise_event(&self, channel: ChannelHandle) {
        let callback = self
            .lock()
            .channels
            .get(&channel)
            .and_then(|ch| ch.callback.clone());
        if let Some(callback) = callback {
            callback();
        }
    }

    /// Calls recorded so far.
    pub fn calls(&self) -> Vec<DriverCall> {
        self.lock().calls.clone()
    }

    /// Forget recorded calls.
    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    /// Number of messages waiting in a channel's receive queue.
    pub fn pending(&self, channel: ChannelHandle) -> usize {
        self.lock().channels.get(&channel).map_or(0, |ch| ch.rx.len())
    }

    /// Whether a channel is initialized.
    pub fn is_initialized(&self, channel: ChannelHandle) -> bool {
        self.lock()
            .channels
            .get(&channel)
            .is_some_and(VirtualChannel::is_initialized)
    }

    /// Whether a channel has an event callback registered.
    pub fn has_event(&self, channel: ChannelHandle) -> bool {
        self.lock()
            .channels
            .get(&channel)
            .is_some_and(|ch| ch.callback.is_some())
    }

    /// Whether a channel is in listen-only mode.
    pub fn is_listen_only(&self, channel: ChannelHandle) -> bool {
        self.lock()
            .channels
            .get(&channel)
            .is_some_and(|ch| ch.listen_only)
    }

    /// Whether bus-off auto-reset is enabled on a channel.
    pub fn busoff_autoreset(&self, channel: ChannelHandle) -> bool {
        self.lock()
            .channels
            .get(&channel)
            .is_some_and(|ch| ch.busoff_autoreset)
    }

    /// The acceptance rules programmed on a channel.
    pub fn rules(&self, channel: ChannelHandle) -> Vec<AcceptanceRule> {
        self.lock()
            .channels
            .get(&channel)
            .map(|ch| ch.rules.clone())
            .unwrap_or_default()
    }

    fn lock(&self) -> MutexGuard<'_, BusState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn flag(value: &[u8]) -> bool {
    value.first().is_some_and(|b| *b != 0)
}

fn check_len(param: Parameter, value: &[u8]) -> Result<()> {
    if value.len() != param.value_len() {
        return Err(DriverError::ValueLength {
            param: param.name(),
            expected: param.value_len(),
            actual: value.len(),
        });
    }
    Ok(())
}

impl CanDriver for VirtualBus {
    fn needs_receive_toggle(&self) -> bool {
        self.receive_toggle
    }

    fn channel_info(&self) -> Result<Vec<ChannelInfo>> {
        let state = self.lock();
        Ok(state
            .channels
            .values()
            .map(|ch| {
                let mut info = ch.info.clone();
                info.channel_condition = if ch.is_initialized() {
                    CHANNEL_OCCUPIED
                } else {
                    CHANNEL_AVAILABLE
                };
                info
            })
            .collect())
    }

    fn initialize(&self, channel: ChannelHandle, baudrate: Baudrate) -> Result<()> {
        let mut state = self.lock();
        state.calls.push(DriverCall::Initialize { channel, baudrate });
        state.take_fault("initialize")?;
        let ch = state.channel("initialize", channel)?;
        if ch.is_initialized() {
            return Err(DriverError::status("initialize", StatusCode::HWINUSE));
        }
        ch.baudrate = Some(baudrate);
        ch.status = StatusCode::OK;
        ch.rx.clear();
        debug!(%channel, %baudrate, "virtual channel initialized");
        Ok(())
    }

    fn uninitialize(&self, channel: ChannelHandle) -> Result<()> {
        let mut state = self.lock();
        state.calls.push(DriverCall::Uninitialize(channel));
        state.take_fault("uninitialize")?;
        let ch = state.initialized("uninitialize", channel)?;
        let info = ch.info.clone();
        *ch = VirtualChannel::new(info);
        debug!(%channel, "virtual channel uninitialized");
        Ok(())
    }

    fn reset(&self, channel: ChannelHandle) -> Result<()> {
        let mut state = self.lock();
        state.calls.push(DriverCall::Reset(channel));
        state.take_fault("reset")?;
        let ch = state.initialized("reset", channel)?;
        ch.rx.clear();
        ch.status = StatusCode::OK;
        Ok(())
    }

    fn status(&self, channel: ChannelHandle) -> StatusCode {
        let state = self.lock();
        match state.channels.get(&channel) {
            Some(ch) if ch.is_initialized() => ch.status,
            Some(_) => StatusCode::INITIALIZE,
            None => StatusCode::ILLHANDLE,
        }
    }

    fn read(&self, channel: ChannelHandle) -> Result<WireFrame> {
        let mut state = self.lock();
        state.take_fault("read")?;
        let ch = state.initialized("read", channel)?;
        ch.rx
            .pop_front()
            .ok_or(DriverError::status("read", StatusCode::QRCVEMPTY))
    }

    fn write(&self, channel: ChannelHandle, frame: &WireFrame) -> Result<()> {
        let callbacks = {
            let mut state = self.lock();
            state.calls.push(DriverCall::Write {
                channel,
                frame: *frame,
            });
            state.take_fault("write")?;
            let sender = state.initialized("write", channel)?;
            if sender.listen_only {
                return Err(DriverError::status("write", StatusCode::ILLOPERATION));
            }
            if usize::from(frame.len) > MAX_DATA_LEN {
                return Err(DriverError::status("write", StatusCode::ILLDATA));
            }
            let baudrate = sender.baudrate;

            let mut callbacks = Vec::new();
            for (handle, ch) in state.channels.iter_mut() {
                if *handle == channel || ch.baudrate != baudrate {
                    continue;
                }
                if let Some(callback) = ch.enqueue(frame) {
                    trace!(from = %channel, to = %handle, id = frame.id, "delivered");
                    callbacks.push(callback);
                }
            }
            callbacks
        };

        for callback in callbacks {
            callback();
        }
        Ok(())
    }

    fn set_value(&self, channel: ChannelHandle, param: Parameter, value: &[u8]) -> Result<()> {
        let mut state = self.lock();
        state.calls.push(DriverCall::SetValue {
            channel,
            param,
            value: value.to_vec(),
        });
        state.take_fault("set_value")?;
        check_len(param, value)?;
        match param {
            Parameter::ListenOnly => state.channel("set_value", channel)?.listen_only = flag(value),
            Parameter::ReceiveStatus => state.channel("set_value", channel)?.receiving = flag(value),
            Parameter::BusoffAutoreset => {
                state.channel("set_value", channel)?.busoff_autoreset = flag(value)
            }
            Parameter::MessageFilter => {
                let ch = state.initialized("set_value", channel)?;
                if value[0] != PARAMETER_ON {
                    return Err(DriverError::status("set_value", StatusCode::ILLPARAMVAL));
                }
                ch.rules.clear();
            }
            Parameter::AcceptanceFilter11Bit | Parameter::AcceptanceFilter29Bit => {
                let ch = state.initialized("set_value", channel)?;
                let mut word = [0u8; 8];
                word.copy_from_slice(value);
                let (code, mask) = split_acceptance_word(u64::from_le_bytes(word));
                let mode = FilterMode::for_extended(param == Parameter::AcceptanceFilter29Bit);
                ch.rules.push(AcceptanceRule::CodeMask { code, mask, mode });
            }
            Parameter::ReceiveEvent => {
                return Err(DriverError::status("set_value", StatusCode::ILLPARAMTYPE));
            }
        }
        Ok(())
    }

    fn get_value(&self, channel: ChannelHandle, param: Parameter) -> Result<Vec<u8>> {
        let mut state = self.lock();
        state.take_fault("get_value")?;
        let ch = state.channel("get_value", channel)?;
        let value = match param {
            Parameter::ListenOnly => vec![u8::from(ch.listen_only)],
            Parameter::ReceiveStatus => vec![u8::from(ch.receiving)],
            Parameter::BusoffAutoreset => vec![u8::from(ch.busoff_autoreset)],
            Parameter::MessageFilter => vec![if ch.rules.is_empty() { 1 } else { 2 }],
            Parameter::AcceptanceFilter11Bit | Parameter::AcceptanceFilter29Bit => {
                let extended = param == Parameter::AcceptanceFilter29Bit;
                let (code, mask) = ch
                    .rules
                    .iter()
                    .rev()
                    .find_map(|rule| match rule {
                        AcceptanceRule::CodeMask { code, mask, mode }
                            if mode.is_extended() == extended =>
                        {
                            Some((*code, *mask))
                        }
                        _ => None,
                    })
                    .unwrap_or((0, 0));
                crate::params::acceptance_word(code, mask)
                    .to_le_bytes()
                    .to_vec()
            }
            Parameter::ReceiveEvent => {
                return Err(DriverError::status("get_value", StatusCode::ILLPARAMTYPE));
            }
        };
        Ok(value)
    }

    fn filter_messages(
        &self,
        channel: ChannelHandle,
        from: u32,
        to: u32,
        mode: FilterMode,
    ) -> Result<()> {
        let mut state = self.lock();
        state.calls.push(DriverCall::FilterMessages {
            channel,
            from,
            to,
            mode,
        });
        state.take_fault("filter_messages")?;
        let ch = state.initialized("filter_messages", channel)?;
        if from > to || to > mode.max_id() {
            return Err(DriverError::status(
                "filter_messages",
                StatusCode::ILLPARAMVAL,
            ));
        }
        ch.rules.push(AcceptanceRule::Range { from, to, mode });
        Ok(())
    }

    fn error_text(&self, code: StatusCode) -> Result<String> {
        self.lock().take_fault("error_text")?;
        code.description()
            .map(str::to_string)
            .ok_or(DriverError::status("error_text", StatusCode::ILLPARAMVAL))
    }

    fn enable_event(&self, channel: ChannelHandle, callback: EventCallback) -> Result<()> {
        let mut state = self.lock();
        state.calls.push(DriverCall::EnableEvent(channel));
        state.take_fault("enable_event")?;
        state.channel("enable_event", channel)?.callback = Some(callback);
        Ok(())
    }

    fn disable_event(&self, channel: ChannelHandle) -> Result<()> {
        let mut state = self.lock();
        state.calls.push(DriverCall::DisableEvent(channel));
        state.take_fault("disable_event")?;
        state.channel("disable_event", channel)?.callback = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;
    use crate::wire::{MESSAGE_EXTENDED, MESSAGE_RTR, MESSAGE_STANDARD};

    fn wire(id: u32, msg_type: u8, data: &[u8]) -> WireFrame {
        let mut frame = WireFrame {
            id,
            msg_type,
            len: data.len() as u8,
            data: [0; 8],
        };
        frame.data[..data.len()].copy_from_slice(data);
        frame
    }

    fn counter() -> (Arc<AtomicUsize>, EventCallback) {
        let count = Arc::new(AtomicUsize::new(0));
        let hits = Arc::clone(&count);
        let callback: EventCallback = Arc::new(move || {
            hits.fetch_add(1, Ordering::SeqCst);
        });
        (count, callback)
    }

    #[test]
    fn lists_usb_channels() {
        let bus = VirtualBus::new(2);
        let info = bus.channel_info().unwrap();
        assert_eq!(info.len(), 2);
        assert_eq!(info[0].channel_handle, ChannelHandle(0x51));
        assert_eq!(info[1].channel_handle, ChannelHandle(0x52));
        assert_eq!(info[0].device_type, DEVICE_TYPE_USB);
        assert_eq!(info[0].channel_condition, CHANNEL_AVAILABLE);
    }

    #[test]
    fn write_reaches_other_channel_and_fires_callback() {
        let bus = VirtualBus::new(2);
        let (a, b) = (ChannelHandle(0x51), ChannelHandle(0x52));
        bus.initialize(a, Baudrate::BAUD_250K).unwrap();
        bus.initialize(b, Baudrate::BAUD_250K).unwrap();
        let (count, callback) = counter();
        bus.enable_event(b, callback).unwrap();

        bus.write(a, &wire(0x123, MESSAGE_STANDARD, &[1, 2])).unwrap();

        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(bus.pending(a), 0);
        let got = bus.read(b).unwrap();
        assert_eq!(got.id, 0x123);
        assert_eq!(got.payload(), &[1, 2]);
        assert!(bus.read(b).unwrap_err().is_queue_empty());
    }

    #[test]
    fn mismatched_bit_rate_does_not_deliver() {
        let bus = VirtualBus::new(2);
        let (a, b) = (ChannelHandle(0x51), ChannelHandle(0x52));
        bus.initialize(a, Baudrate::BAUD_250K).unwrap();
        bus.initialize(b, Baudrate::BAUD_500K).unwrap();
        bus.write(a, &wire(0x1, MESSAGE_STANDARD, &[])).unwrap();
        assert_eq!(bus.pending(b), 0);
    }

    #[test]
    fn range_filter_applies_to_delivery() {
        let bus = VirtualBus::new(2);
        let (a, b) = (ChannelHandle(0x51), ChannelHandle(0x52));
        bus.initialize(a, Baudrate::BAUD_250K).unwrap();
        bus.initialize(b, Baudrate::BAUD_250K).unwrap();
        bus.filter_messages(b, 0, 0x7FF, FilterMode::Standard)
            .unwrap();

        bus.write(a, &wire(0x7FF, MESSAGE_STANDARD, &[])).unwrap();
        bus.write(a, &wire(0x1, MESSAGE_EXTENDED, &[])).unwrap();

        assert_eq!(bus.pending(b), 1);
        assert_eq!(bus.read(b).unwrap().id, 0x7FF);
    }

    #[test]
    fn extended_remote_request_passes_extended_filter() {
        let bus = VirtualBus::new(1);
        let ch = ChannelHandle(0x51);
        bus.initialize(ch, Baudrate::BAUD_250K).unwrap();
        bus.filter_messages(ch, 0x100, 0x1FF, FilterMode::Extended)
            .unwrap();

        let request = MESSAGE_EXTENDED | MESSAGE_RTR;
        assert!(bus.inject(ch, wire(0x150, request, &[])));
        assert!(!bus.inject(ch, wire(0x150, MESSAGE_RTR, &[])));

        let got = bus.read(ch).unwrap();
        assert_eq!(got.msg_type, request);
        assert!(got.has_extended_flag());
    }

    #[test]
    fn acceptance_filter_round_trips_through_set_value() {
        let bus = VirtualBus::new(1);
        let ch = ChannelHandle(0x51);
        bus.initialize(ch, Baudrate::BAUD_250K).unwrap();
        bus.acceptance_filter_29bit(ch, 0x18FF_0000, 0x1FFF_0000)
            .unwrap();

        let word = bus.get_value(ch, Parameter::AcceptanceFilter29Bit).unwrap();
        let word = u64::from_le_bytes(word.try_into().unwrap());
        assert_eq!(split_acceptance_word(word), (0x18FF_0000, 0x1FFF_0000));
        assert!(bus.inject(ch, wire(0x18FF_1234, MESSAGE_EXTENDED, &[])));
        assert!(!bus.inject(ch, wire(0x18FE_1234, MESSAGE_EXTENDED, &[])));
    }

    #[test]
    fn uninitialized_channel_rejects_io() {
        let bus = VirtualBus::new(1);
        let ch = ChannelHandle(0x51);
        let err = bus.read(ch).unwrap_err();
        assert_eq!(err.code(), Some(StatusCode::INITIALIZE));
        assert_eq!(bus.status(ch), StatusCode::INITIALIZE);
        assert_eq!(bus.status(ChannelHandle(0x60)), StatusCode::ILLHANDLE);
    }

    #[test]
    fn double_initialize_reports_in_use() {
        let bus = VirtualBus::new(1);
        let ch = ChannelHandle(0x51);
        bus.initialize(ch, Baudrate::BAUD_250K).unwrap();
        let err = bus.initialize(ch, Baudrate::BAUD_250K).unwrap_err();
        assert_eq!(err.code(), Some(StatusCode::HWINUSE));
    }

    #[test]
    fn injected_fault_fires_once() {
        let bus = VirtualBus::new(1);
        let ch = ChannelHandle(0x51);
        bus.fail_next("initialize", StatusCode::NODRIVER);
        let err = bus.initialize(ch, Baudrate::BAUD_250K).unwrap_err();
        assert_eq!(err, DriverError::status("initialize", StatusCode::NODRIVER));
        bus.initialize(ch, Baudrate::BAUD_250K).unwrap();
    }

    #[test]
    fn nth_fault_skips_earlier_calls() {
        let bus = VirtualBus::new(1);
        let ch = ChannelHandle(0x51);
        bus.fail_nth("set_value", 1, StatusCode::ILLOPERATION);
        bus.set_value(ch, Parameter::ListenOnly, &[0]).unwrap();
        assert!(bus.set_value(ch, Parameter::ListenOnly, &[0]).is_err());
        bus.set_value(ch, Parameter::ListenOnly, &[0]).unwrap();
    }

    #[test]
    fn listen_only_cannot_transmit() {
        let bus = VirtualBus::new(1);
        let ch = ChannelHandle(0x51);
        bus.set_value(ch, Parameter::ListenOnly, &[PARAMETER_ON])
            .unwrap();
        bus.initialize(ch, Baudrate::BAUD_250K).unwrap();
        let err = bus.write(ch, &wire(0x1, MESSAGE_STANDARD, &[])).unwrap_err();
        assert_eq!(err.code(), Some(StatusCode::ILLOPERATION));
    }

    #[test]
    fn receive_status_off_drops_traffic() {
        let bus = VirtualBus::new(1);
        let ch = ChannelHandle(0x51);
        bus.initialize(ch, Baudrate::BAUD_250K).unwrap();
        bus.set_value(ch, Parameter::ReceiveStatus, &[0]).unwrap();
        assert!(!bus.inject(ch, wire(0x1, MESSAGE_STANDARD, &[])));
    }

    #[test]
    fn set_value_checks_length() {
        let bus = VirtualBus::new(1);
        let err = bus
            .set_value(ChannelHandle(0x51), Parameter::ListenOnly, &[0, 0])
            .unwrap_err();
        assert!(matches!(err, DriverError::ValueLength { expected: 1, .. }));
    }

    #[test]
    fn uninitialize_clears_callback_and_queue() {
        let bus = VirtualBus::new(1);
        let ch = ChannelHandle(0x51);
        bus.initialize(ch, Baudrate::BAUD_250K).unwrap();
        let (_count, callback) = counter();
        bus.enable_event(ch, callback).unwrap();
        bus.inject(ch, wire(0x5, MESSAGE_STANDARD, &[]));
        bus.uninitialize(ch).unwrap();
        assert!(!bus.has_event(ch));
        assert_eq!(bus.pending(ch), 0);
        assert!(!bus.is_initialized(ch));
    }

    #[test]
    fn error_text_unknown_code_fails() {
        let bus = VirtualBus::new(0);
        assert_eq!(
            bus.error_text(StatusCode::BUSOFF).unwrap(),
            "Bus error: the CAN controller is in bus-off state"
        );
        assert!(bus.error_text(StatusCode(0x0012_3456)).is_err());
    }

    #[test]
    fn records_calls() {
        let bus = VirtualBus::new(1);
        let ch = ChannelHandle(0x51);
        bus.initialize(ch, Baudrate::BAUD_125K).unwrap();
        bus.filter_messages(ch, 0x100, 0x1FF, FilterMode::Standard)
            .unwrap();
        let calls = bus.calls();
        assert_eq!(
            calls[0],
            DriverCall::Initialize {
                channel: ch,
                baudrate: Baudrate::BAUD_125K
            }
        );
        assert!(calls[1].is_filter_programming());
        assert_eq!(calls[1].channel(), ch);
    }
}
