// Licensed under the Apache-2.0 license

//! # I2C Hardware Port and Handler Traits
//!
//! This module defines the seams between the bus logic and everything around
//! it. The hardware port traits describe the handful of register operations
//! the logic needs; the handler traits describe the three target-side event
//! points that the dispatch boundary routes to.
//!
//! ## Trait Hierarchy
//!
//! ```text
//! ControllerPort (controller-role peripheral registers)
//! TargetPort     (target-role peripheral registers, feature: i2c_target)
//!
//! ByteWriteHandler    ─┐
//! ByteRequestHandler  ─┼── TargetHandler (blanket composite)
//! StopHandler         ─┘
//! ```
//!
//! Nothing here touches pins, clocks or interrupt vectors. A port can be
//! backed by memory-mapped registers or by the software simulator in
//! the `sim` module.

/// Controller-role register interface consumed by the transaction engine.
///
/// The engine drives a transfer purely by loading registers and polling
/// status flags. Addresses passed to [`ControllerPort::set_address`] already
/// carry the direction bit; the engine computes them, never the caller.
///
/// # Examples
///
/// ```rust,no_run
/// use i2c_ddk::i2c::ControllerPort;
///
/// fn probe<P: ControllerPort>(port: &mut P, addr: u8) -> bool {
///     port.set_address(addr << 1);
///     port.write_data(0x00);
///     port.set_count(1);
///     port.start();
///     while port.is_active() {}
///     port.count() == 0
/// }
/// ```
pub trait ControllerPort {
    /// Load the address register with an 8-bit wire address (7-bit address
    /// shifted left, direction bit in bit 0).
    fn set_address(&mut self, address: u8);

    /// Load the byte counter for the next start or restart.
    fn set_count(&mut self, count: u8);

    /// Bytes the hardware still expects to transfer.
    ///
    /// Zero once the bus is idle means every byte was acknowledged.
    fn count(&self) -> u8;

    /// Hold the bus for a repeated start once the byte counter reaches zero
    /// instead of issuing a stop.
    fn set_restart_enable(&mut self, enabled: bool);

    /// Trigger a start condition, or a repeated start while the bus is held.
    fn start(&mut self);

    /// Host-mode active flag.
    ///
    /// Takes `&mut self` because sampling status may advance hardware state
    /// (a simulator clocks one bus event per sample).
    fn is_active(&mut self) -> bool;

    /// The peripheral is stalled waiting for software (next byte, or the
    /// restart once the counter is exhausted).
    fn data_request(&self) -> bool;

    /// Transmit data register is empty.
    fn tx_empty(&self) -> bool;

    /// Receive data register holds an unread byte.
    fn rx_full(&self) -> bool;

    /// Load one byte into the transmit data register.
    fn write_data(&mut self, data: u8);

    /// Unload the receive data register.
    fn read_data(&mut self) -> u8;

    /// Clear stale status and error flags before a combined transfer.
    fn clear_status(&mut self);

    /// Abandon the current transfer and release the bus.
    ///
    /// Called when a deadline expires or the caller cancels.
    fn abort(&mut self);
}

/// Target-role register interface consumed by the event dispatch boundary.
///
/// The three flag/data pairs correspond to the peripheral's receive,
/// transmit and stop interrupt sources.
#[cfg(feature = "i2c_target")]
pub trait TargetPort {
    /// Program the 7-bit address the peripheral answers to.
    fn set_own_address(&mut self, address: u8);

    /// A byte written by the remote controller is waiting.
    fn rx_full(&self) -> bool;

    /// Unload the received byte, clearing the receive source.
    fn read_data(&mut self) -> u8;

    /// The transmit register is empty and the peripheral wants the next byte.
    fn tx_requested(&self) -> bool;

    /// Load the next byte to transmit, clearing the transmit source.
    fn write_data(&mut self, data: u8);

    /// A stop condition has been detected.
    fn stop_detected(&self) -> bool;

    /// Acknowledge the stop condition.
    fn clear_stop(&mut self);

    /// Prepare for the next transaction: reload the byte counter and drop
    /// any byte that was pre-loaded for transmit but never clocked out.
    fn rearm(&mut self);
}

/// Receives each byte the remote controller writes.
///
/// Handlers take `&self`: they are reached from interrupt context through a
/// shared reference, so any state they mutate must be interior and
/// interrupt-safe (atomics or cells guarded by a critical section).
pub trait ByteWriteHandler {
    fn on_byte_written(&self, data: u8);
}

/// Supplies each byte the remote controller reads.
///
/// Must always produce a value; the wire gives the target no way to signal
/// a failure mid-byte.
pub trait ByteRequestHandler {
    fn on_byte_requested(&self) -> u8;
}

/// Notified once at the end of every transaction.
pub trait StopHandler {
    fn on_bus_stopped(&self);
}

/// Complete handler set for all three event points.
pub trait TargetHandler: ByteWriteHandler + ByteRequestHandler + StopHandler {}

impl<T> TargetHandler for T where T: ByteWriteHandler + ByteRequestHandler + StopHandler {}
