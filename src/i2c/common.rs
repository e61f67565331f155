// Licensed under the Apache-2.0 license

//! Common types and constants for the I2C driver modules.
//!
//! This module provides shared definitions for configuration, bus events,
//! status snapshots and address handling used by both the controller engine
//! and the target-side register file.

/// Largest payload a single transfer may carry: the hardware byte counter is 8 bits wide.
pub const MAX_TRANSFER_LEN: usize = 255;

/// Register file size used when no capacity is configured.
pub const DEFAULT_BUFFER_CAPACITY: usize = 16;

/// Direction bit appended to the 7-bit address on the wire.
pub const READ_BIT: u8 = 0b1;

/// Address byte for a write transfer to `addr`.
#[must_use]
pub const fn write_address(addr: u8) -> u8 {
    (addr & 0x7f) << 1
}

/// Address byte for a read transfer from `addr`.
#[must_use]
pub const fn read_address(addr: u8) -> u8 {
    write_address(addr) | READ_BIT
}

/// Role of one controller-side transaction.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum TransferKind {
    /// Send-only.
    Write,
    /// Receive-only.
    Read,
    /// Write, repeated start, then read.
    WriteRead,
}

/// One target-side bus event, as raised by the peripheral's interrupt sources.
///
/// A transaction delivers zero or more events of a single data kind followed
/// by exactly one [`BusEvent::Stopped`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BusEvent {
    /// The remote controller wrote one byte.
    ByteWritten(u8),
    /// The peripheral needs the next byte to transmit.
    ByteRequested,
    /// A stop condition ended the transaction.
    Stopped,
}

/// Snapshot of the register file state, readable from foreground code.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TargetStatus {
    /// Current read/write index. May sit one past the read buffer while a
    /// read transaction is underway.
    pub cursor: usize,
    /// Waiting for the pointer byte of a write transaction.
    pub awaiting_address: bool,
    /// A byte was requested during the current transaction.
    pub had_read: bool,
    /// Bound write buffer capacity.
    pub write_capacity: usize,
    /// Bound read buffer capacity.
    pub read_capacity: usize,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigurationError {
    /// Address does not fit in 7 bits or lies in a reserved range.
    InvalidAddress(u8),
    /// A register file needs at least one byte of storage.
    ZeroCapacity,
}

/// Controller engine settings.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct ControllerConfig {
    /// Upper bound on status polls for the blocking wrappers. `None` waits
    /// forever, so a wedged bus hangs the caller.
    pub poll_limit: Option<u32>,
}

#[derive(Default)]
pub struct ControllerConfigBuilder {
    poll_limit: Option<u32>,
}

impl ControllerConfigBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self { poll_limit: None }
    }
    #[must_use]
    pub fn poll_limit(mut self, polls: u32) -> Self {
        self.poll_limit = Some(polls);
        self
    }
    #[must_use]
    pub fn unbounded(mut self) -> Self {
        self.poll_limit = None;
        self
    }
    #[must_use]
    pub fn build(self) -> ControllerConfig {
        ControllerConfig {
            poll_limit: self.poll_limit,
        }
    }
}

/// Target role settings.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TargetConfig {
    /// Own 7-bit bus address.
    pub address: u8,
    /// Register file size in bytes.
    pub buffer_capacity: usize,
}

pub struct TargetConfigBuilder {
    address: u8,
    buffer_capacity: usize,
}

impl TargetConfigBuilder {
    #[must_use]
    pub fn new(address: u8) -> Self {
        Self {
            address,
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
        }
    }
    #[must_use]
    pub fn buffer_capacity(mut self, capacity: usize) -> Self {
        self.buffer_capacity = capacity;
        self
    }

    /// Validates and produces the configuration.
    ///
    /// # Errors
    ///
    /// Rejects addresses above `0x7f` and the reserved blocks `0x00..=0x07`
    /// and `0x78..=0x7f`, and a zero capacity.
    pub fn build(self) -> Result<TargetConfig, ConfigurationError> {
        if !(0x08..=0x77).contains(&self.address) {
            return Err(ConfigurationError::InvalidAddress(self.address));
        }
        if self.buffer_capacity == 0 {
            return Err(ConfigurationError::ZeroCapacity);
        }
        Ok(TargetConfig {
            address: self.address,
            buffer_capacity: self.buffer_capacity,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_bytes() {
        assert_eq!(write_address(0x50), 0xa0);
        assert_eq!(read_address(0x50), 0xa1);
        // caller-supplied direction bits never leak onto the wire
        assert_eq!(write_address(0xd0), 0xa0);
    }

    #[test]
    fn test_target_config_defaults() {
        let config = TargetConfigBuilder::new(0x64).build().unwrap();
        assert_eq!(config.address, 0x64);
        assert_eq!(config.buffer_capacity, DEFAULT_BUFFER_CAPACITY);
    }

    #[test]
    fn test_target_config_rejects_reserved_addresses() {
        for addr in [0x00, 0x07, 0x78, 0x7f, 0x80, 0xff] {
            assert_eq!(
                TargetConfigBuilder::new(addr).build(),
                Err(ConfigurationError::InvalidAddress(addr))
            );
        }
    }

    #[test]
    fn test_target_config_rejects_zero_capacity() {
        let result = TargetConfigBuilder::new(0x42).buffer_capacity(0).build();
        assert_eq!(result, Err(ConfigurationError::ZeroCapacity));
    }

    #[test]
    fn test_controller_config_builder() {
        assert_eq!(ControllerConfigBuilder::new().build().poll_limit, None);
        let config = ControllerConfigBuilder::new().poll_limit(500).build();
        assert_eq!(config.poll_limit, Some(500));
        let config = ControllerConfigBuilder::new().poll_limit(5).unbounded().build();
        assert_eq!(config.poll_limit, None);
    }
}
