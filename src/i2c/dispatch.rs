// Licensed under the Apache-2.0 license

//! Event dispatch boundary for the target role.
//!
//! The peripheral raises three kinds of event: a byte arrived, a byte is
//! wanted, the bus stopped. [`EventDispatch`] routes each to the handler
//! registered in the matching slot. Slots hold shared references only; the
//! application keeps ownership of the handlers.
//!
//! The `service_*` methods are the bodies of the receive, transmit and stop
//! interrupt routines. Call them from the corresponding vectors, or call
//! [`EventDispatch::service`] from a single shared vector.

use crate::i2c::common::{BusEvent, TargetConfig};
use crate::i2c::traits::{
    ByteRequestHandler, ByteWriteHandler, StopHandler, TargetHandler, TargetPort,
};

/// Byte transmitted when no read handler is registered.
pub const IDLE_BYTE: u8 = 0x00;

/// Three handler slots, each holding at most one handler.
#[derive(Clone, Copy, Default)]
pub struct EventDispatch<'h> {
    write: Option<&'h dyn ByteWriteHandler>,
    read: Option<&'h dyn ByteRequestHandler>,
    stop: Option<&'h dyn StopHandler>,
}

impl<'h> EventDispatch<'h> {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            write: None,
            read: None,
            stop: None,
        }
    }

    /// Route all three events to one handler, replacing whatever was registered.
    pub fn attach<H: TargetHandler>(&mut self, handler: &'h H) {
        self.write = Some(handler);
        self.read = Some(handler);
        self.stop = Some(handler);
    }

    pub fn assign_byte_write_handler(&mut self, handler: &'h dyn ByteWriteHandler) {
        self.write = Some(handler);
    }

    pub fn assign_byte_read_handler(&mut self, handler: &'h dyn ByteRequestHandler) {
        self.read = Some(handler);
    }

    pub fn assign_stop_handler(&mut self, handler: &'h dyn StopHandler) {
        self.stop = Some(handler);
    }

    /// Empty every slot.
    pub fn detach(&mut self) {
        *self = Self::new();
    }

    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.write.is_some() || self.read.is_some() || self.stop.is_some()
    }

    /// Deliver one event. Returns the byte to transmit for
    /// [`BusEvent::ByteRequested`], `None` otherwise.
    pub fn dispatch(&self, event: BusEvent) -> Option<u8> {
        match event {
            BusEvent::ByteWritten(data) => {
                if let Some(handler) = self.write {
                    handler.on_byte_written(data);
                }
                None
            }
            BusEvent::ByteRequested => Some(
                self.read
                    .map_or(IDLE_BYTE, |handler| handler.on_byte_requested()),
            ),
            BusEvent::Stopped => {
                if let Some(handler) = self.stop {
                    handler.on_bus_stopped();
                }
                None
            }
        }
    }

    /// Program the own address and arm the peripheral for the first transaction.
    pub fn enable<P: TargetPort>(&self, port: &mut P, config: &TargetConfig) {
        port.set_own_address(config.address);
        port.rearm();
    }

    /// Receive interrupt: hand the incoming byte to the write slot.
    pub fn service_rx<P: TargetPort>(&self, port: &mut P) -> bool {
        if !port.rx_full() {
            return false;
        }
        let data = port.read_data();
        self.dispatch(BusEvent::ByteWritten(data));
        true
    }

    /// Transmit interrupt: load the next byte from the read slot.
    pub fn service_tx<P: TargetPort>(&self, port: &mut P) -> bool {
        if !port.tx_requested() {
            return false;
        }
        let data = self.dispatch(BusEvent::ByteRequested).unwrap_or(IDLE_BYTE);
        port.write_data(data);
        true
    }

    /// Stop interrupt: re-arm the peripheral, notify the stop slot, acknowledge.
    pub fn service_stop<P: TargetPort>(&self, port: &mut P) -> bool {
        if !port.stop_detected() {
            return false;
        }
        port.rearm();
        self.dispatch(BusEvent::Stopped);
        port.clear_stop();
        true
    }

    /// Shared-vector entry point. Data is drained before the stop so a byte
    /// that arrived just ahead of the stop condition lands in the right transaction.
    pub fn service<P: TargetPort>(&self, port: &mut P) {
        self.service_rx(port);
        self.service_tx(port);
        self.service_stop(port);
    }
}
