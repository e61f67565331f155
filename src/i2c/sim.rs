// Licensed under the Apache-2.0 license

//! Software bus simulator.
//!
//! [`SimulatedController`] implements [`ControllerPort`] with the timing
//! quirks of the real peripheral: every status sample advances the bus by
//! one event, the peripheral stalls while software owes it a byte, it holds
//! the bus for a repeated start when restart is enabled, and the active flag
//! drops in the same cycle the final received byte is latched.
//!
//! The remote device is a [`SimTarget`]. [`ScriptedTarget`] replays fixed
//! data and can be told to NACK or fail; [`PreloadingTarget`] puts any
//! [`TargetHandler`] (such as a virtual register file) behind a target
//! peripheral that pre-loads its transmit register one byte ahead.
//!
//! [`SimulatedTargetPort`] implements [`TargetPort`] for driving the event
//! dispatch boundary directly.

use heapless::Vec;

use crate::i2c::common::READ_BIT;
use crate::i2c::traits::{ControllerPort, TargetHandler};
#[cfg(feature = "i2c_target")]
use crate::i2c::traits::TargetPort;
use embedded_hal::i2c::SevenBitAddress;

const TRANSCRIPT_LEN: usize = 512;
const DATA_LEN: usize = 256;

/// What happened on the wire, in order.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum WireEvent {
    Start(u8),
    Restart(u8),
    Write { data: u8, ack: bool },
    Read(u8),
    Stop,
    Abort,
}

/// Remote device seen by the simulated controller.
pub trait SimTarget {
    /// Address phase. Return `true` to acknowledge.
    fn address(&mut self, address: SevenBitAddress, read: bool) -> bool;
    /// One byte from the controller. Return `true` to acknowledge.
    fn write(&mut self, data: u8) -> bool;
    /// Next byte for the controller; `None` models a bus error mid-read.
    fn read(&mut self) -> Option<u8>;
    fn stop(&mut self);
}

/// Device that answers at one address with canned data.
pub struct ScriptedTarget {
    address: SevenBitAddress,
    written: Vec<u8, DATA_LEN>,
    read_data: Vec<u8, DATA_LEN>,
    read_pos: usize,
    nack_after: Option<usize>,
    fail_read_after: Option<usize>,
    reject_reads: bool,
    stops: u32,
}

impl ScriptedTarget {
    #[must_use]
    pub fn new(address: SevenBitAddress) -> Self {
        Self {
            address,
            written: Vec::new(),
            read_data: Vec::new(),
            read_pos: 0,
            nack_after: None,
            fail_read_after: None,
            reject_reads: false,
            stops: 0,
        }
    }

    /// Bytes served to reads, in order. Reads past the end return `0xff`.
    #[must_use]
    pub fn with_read_data(mut self, data: &[u8]) -> Self {
        self.read_data.clear();
        for &byte in data.iter().take(DATA_LEN) {
            let _ = self.read_data.push(byte);
        }
        self
    }

    /// Acknowledge the first `n` data bytes written, NACK every one after.
    #[must_use]
    pub fn nack_write_after(mut self, n: usize) -> Self {
        self.nack_after = Some(n);
        self
    }

    /// Fail the bus after `n` bytes have been read.
    #[must_use]
    pub fn abort_read_after(mut self, n: usize) -> Self {
        self.fail_read_after = Some(n);
        self
    }

    /// Acknowledge the address for writes only; NACK it in the read direction.
    #[must_use]
    pub fn nack_read_address(mut self) -> Self {
        self.reject_reads = true;
        self
    }

    /// Every data byte the controller clocked out, acknowledged or not.
    #[must_use]
    pub fn written(&self) -> &[u8] {
        &self.written
    }

    #[must_use]
    pub fn stop_count(&self) -> u32 {
        self.stops
    }
}

impl SimTarget for ScriptedTarget {
    fn address(&mut self, address: SevenBitAddress, read: bool) -> bool {
        address == self.address && !(read && self.reject_reads)
    }

    fn write(&mut self, data: u8) -> bool {
        let _ = self.written.push(data);
        self.nack_after.is_none_or(|n| self.written.len() <= n)
    }

    fn read(&mut self) -> Option<u8> {
        if self.fail_read_after == Some(self.read_pos) {
            return None;
        }
        let byte = self.read_data.get(self.read_pos).copied().unwrap_or(0xff);
        self.read_pos += 1;
        Some(byte)
    }

    fn stop(&mut self) {
        self.stops += 1;
    }
}

/// Target peripheral in front of a [`TargetHandler`].
///
/// The transmit register is refilled as soon as a byte starts shifting out,
/// so a read of `n` bytes raises `n + 1` byte requests; the last one is
/// discarded when the stop arrives.
pub struct PreloadingTarget<'h, H: ?Sized> {
    address: SevenBitAddress,
    handler: &'h H,
    preloaded: Option<u8>,
}

impl<'h, H: TargetHandler + ?Sized> PreloadingTarget<'h, H> {
    pub fn new(address: SevenBitAddress, handler: &'h H) -> Self {
        Self {
            address,
            handler,
            preloaded: None,
        }
    }
}

impl<H: TargetHandler + ?Sized> SimTarget for PreloadingTarget<'_, H> {
    fn address(&mut self, address: SevenBitAddress, read: bool) -> bool {
        if address != self.address {
            return false;
        }
        if read {
            self.preloaded = Some(self.handler.on_byte_requested());
        }
        true
    }

    fn write(&mut self, data: u8) -> bool {
        self.handler.on_byte_written(data);
        true
    }

    fn read(&mut self) -> Option<u8> {
        let out = match self.preloaded.take() {
            Some(byte) => byte,
            None => self.handler.on_byte_requested(),
        };
        self.preloaded = Some(self.handler.on_byte_requested());
        Some(out)
    }

    fn stop(&mut self) {
        self.preloaded = None;
        self.handler.on_bus_stopped();
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum BusState {
    Idle,
    Address,
    Transmit,
    AwaitRestart,
    Receive,
}

/// Controller peripheral model.
pub struct SimulatedController<T> {
    pub target: T,
    address: u8,
    count: u8,
    restart_enable: bool,
    txb: Option<u8>,
    rxb: Option<u8>,
    state: BusState,
    wedged: bool,
    aborts: u32,
    status_clears: u32,
    transcript: Vec<WireEvent, TRANSCRIPT_LEN>,
    truncated: bool,
}

impl<T: SimTarget> SimulatedController<T> {
    pub fn new(target: T) -> Self {
        Self {
            target,
            address: 0,
            count: 0,
            restart_enable: false,
            txb: None,
            rxb: None,
            state: BusState::Idle,
            wedged: false,
            aborts: 0,
            status_clears: 0,
            transcript: Vec::new(),
            truncated: false,
        }
    }

    /// Wire events so far. Holds at most 512 events; anything after that is
    /// not recorded and [`transcript_truncated`](Self::transcript_truncated)
    /// reports it.
    #[must_use]
    pub fn transcript(&self) -> &[WireEvent] {
        &self.transcript
    }

    #[must_use]
    pub fn transcript_truncated(&self) -> bool {
        self.truncated
    }

    /// From now on the bus never goes idle (SCL held low) until aborted.
    pub fn wedge(&mut self) {
        self.wedged = true;
    }

    /// Leave an unread byte in the receive register.
    pub fn inject_stale_rx(&mut self, data: u8) {
        self.rxb = Some(data);
    }

    #[must_use]
    pub fn abort_count(&self) -> u32 {
        self.aborts
    }

    #[must_use]
    pub fn status_clear_count(&self) -> u32 {
        self.status_clears
    }

    #[must_use]
    pub fn restart_enabled(&self) -> bool {
        self.restart_enable
    }

    fn record(&mut self, event: WireEvent) {
        if self.transcript.push(event).is_err() {
            self.truncated = true;
        }
    }

    fn stop(&mut self) {
        self.state = BusState::Idle;
        self.target.stop();
        self.record(WireEvent::Stop);
    }

    /// One bus event.
    fn step(&mut self) {
        match self.state {
            BusState::Idle | BusState::AwaitRestart => {}
            BusState::Address => {
                let read = self.address & READ_BIT != 0;
                if self.target.address(self.address >> 1, read) {
                    self.state = if read {
                        BusState::Receive
                    } else {
                        BusState::Transmit
                    };
                } else {
                    self.stop();
                }
            }
            BusState::Transmit => {
                if self.count == 0 {
                    if self.restart_enable {
                        self.state = BusState::AwaitRestart;
                    } else {
                        self.stop();
                    }
                } else if let Some(data) = self.txb.take() {
                    let ack = self.target.write(data);
                    self.record(WireEvent::Write { data, ack });
                    if ack {
                        self.count -= 1;
                    } else {
                        self.stop();
                    }
                }
            }
            BusState::Receive => {
                if self.count == 0 {
                    self.stop();
                } else if self.rxb.is_none() {
                    match self.target.read() {
                        Some(data) => {
                            self.record(WireEvent::Read(data));
                            self.count -= 1;
                            self.rxb = Some(data);
                            // Final byte is NACKed; idle and latch coincide.
                            if self.count == 0 {
                                self.stop();
                            }
                        }
                        None => self.stop(),
                    }
                }
            }
        }
    }
}

impl<T: SimTarget> ControllerPort for SimulatedController<T> {
    fn set_address(&mut self, address: u8) {
        self.address = address;
    }

    fn set_count(&mut self, count: u8) {
        self.count = count;
    }

    fn count(&self) -> u8 {
        self.count
    }

    fn set_restart_enable(&mut self, enabled: bool) {
        self.restart_enable = enabled;
    }

    fn start(&mut self) {
        match self.state {
            BusState::Idle => {
                self.record(WireEvent::Start(self.address));
                self.state = BusState::Address;
            }
            BusState::AwaitRestart => {
                self.record(WireEvent::Restart(self.address));
                self.state = BusState::Address;
            }
            _ => {}
        }
    }

    fn is_active(&mut self) -> bool {
        if self.wedged {
            return true;
        }
        self.step();
        self.state != BusState::Idle
    }

    fn data_request(&self) -> bool {
        match self.state {
            BusState::Transmit => self.txb.is_none() && self.count > 0,
            BusState::AwaitRestart => true,
            BusState::Receive => self.rxb.is_some(),
            BusState::Idle | BusState::Address => false,
        }
    }

    fn tx_empty(&self) -> bool {
        self.txb.is_none()
    }

    fn rx_full(&self) -> bool {
        self.rxb.is_some()
    }

    fn write_data(&mut self, data: u8) {
        self.txb = Some(data);
    }

    fn read_data(&mut self) -> u8 {
        self.rxb.take().unwrap_or(0)
    }

    fn clear_status(&mut self) {
        self.status_clears += 1;
    }

    fn abort(&mut self) {
        let was_active = self.wedged || self.state != BusState::Idle;
        self.state = BusState::Idle;
        self.txb = None;
        self.rxb = None;
        self.wedged = false;
        self.aborts += 1;
        if was_active {
            self.target.stop();
        }
        self.record(WireEvent::Abort);
    }
}

/// Target peripheral model driven by explicit controller actions.
#[cfg(feature = "i2c_target")]
#[derive(Default)]
pub struct SimulatedTargetPort {
    own_address: Option<u8>,
    rx: Option<u8>,
    tx_pending: bool,
    stop_pending: bool,
    rearms: u32,
    transmitted: Vec<u8, DATA_LEN>,
}

#[cfg(feature = "i2c_target")]
impl SimulatedTargetPort {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn own_address(&self) -> Option<u8> {
        self.own_address
    }

    #[must_use]
    pub fn rearm_count(&self) -> u32 {
        self.rearms
    }

    /// Bytes loaded into the transmit register so far.
    #[must_use]
    pub fn transmitted(&self) -> &[u8] {
        &self.transmitted
    }

    pub fn controller_writes(&mut self, data: u8) {
        self.rx = Some(data);
    }

    pub fn controller_requests(&mut self) {
        self.tx_pending = true;
    }

    pub fn controller_stops(&mut self) {
        self.stop_pending = true;
    }
}

#[cfg(feature = "i2c_target")]
impl TargetPort for SimulatedTargetPort {
    fn set_own_address(&mut self, address: u8) {
        self.own_address = Some(address);
    }

    fn rx_full(&self) -> bool {
        self.rx.is_some()
    }

    fn read_data(&mut self) -> u8 {
        self.rx.take().unwrap_or(0)
    }

    fn tx_requested(&self) -> bool {
        self.tx_pending
    }

    fn write_data(&mut self, data: u8) {
        let _ = self.transmitted.push(data);
        self.tx_pending = false;
    }

    fn stop_detected(&self) -> bool {
        self.stop_pending
    }

    fn clear_stop(&mut self) {
        self.stop_pending = false;
    }

    fn rearm(&mut self) {
        self.rearms += 1;
        self.tx_pending = false;
    }
}
