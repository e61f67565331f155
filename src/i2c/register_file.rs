// Licensed under the Apache-2.0 license

//! Virtual register file for the target role.
//!
//! A remote controller sees a small byte-addressable memory. In
//! address-prefixed mode the first byte of every write transaction moves the
//! cursor ("register pointer") and the following bytes are stored from
//! there on; reads return bytes from the cursor onwards. The cursor survives
//! the stop condition, so a pointer set by one transaction is used by the
//! next one.
//!
//! The peripheral pre-loads its transmit register one byte ahead of the
//! wire, so every read transaction requests one byte more than the
//! controller clocks out. The stop handler steps the cursor back by one to
//! account for it.
//!
//! All state is kept in atomics. Event handlers run from interrupt context
//! and foreground code may inspect or update the buffers at any time without
//! masking interrupts.
//!
//! ```rust,ignore
//! static BLOCK: RegisterBlock<16> = RegisterBlock::new();
//! static REGS: VirtualRegisterFile<'static> = VirtualRegisterFile::new(BLOCK.cells());
//!
//! let mut dispatch = EventDispatch::new();
//! dispatch.attach(&REGS);
//! ```

use core::marker::PhantomData;
use core::sync::atomic::{AtomicBool, AtomicU8, AtomicUsize, Ordering};

use crate::i2c::common::{TargetConfig, TargetStatus};
use crate::i2c::traits::{ByteRequestHandler, ByteWriteHandler, StopHandler};

/// Compile-time choice of how write transactions are interpreted.
pub trait AddressingMode {
    /// First written byte of each transaction is a register pointer.
    const ADDRESS_PREFIXED: bool;
}

/// First byte of a write sets the cursor; the cursor persists across transactions.
#[derive(Debug)]
pub enum AddressPrefixed {}

/// Every byte is data, stored from index 0; the cursor resets at each stop.
#[derive(Debug)]
pub enum FlatStream {}

impl AddressingMode for AddressPrefixed {
    const ADDRESS_PREFIXED: bool = true;
}

impl AddressingMode for FlatStream {
    const ADDRESS_PREFIXED: bool = false;
}

/// Fixed-size interrupt-safe backing storage.
pub struct RegisterBlock<const N: usize> {
    cells: [AtomicU8; N],
}

impl<const N: usize> Default for RegisterBlock<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> RegisterBlock<N> {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            cells: [const { AtomicU8::new(0) }; N],
        }
    }

    #[must_use]
    pub const fn cells(&self) -> &[AtomicU8] {
        &self.cells
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        N
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        N == 0
    }

    #[must_use]
    pub fn load(&self, index: usize) -> Option<u8> {
        self.cells.get(index).map(|cell| cell.load(Ordering::Relaxed))
    }

    /// Returns `false` if `index` is out of range.
    pub fn store(&self, index: usize, value: u8) -> bool {
        match self.cells.get(index) {
            Some(cell) => {
                cell.store(value, Ordering::Relaxed);
                true
            }
            None => false,
        }
    }

    /// Copy `data` in starting at `offset`, truncating at the end of the block.
    /// Returns the number of bytes stored.
    pub fn copy_from(&self, offset: usize, data: &[u8]) -> usize {
        let cells = self.cells.get(offset..).unwrap_or(&[]);
        let mut stored = 0;
        for (cell, &byte) in cells.iter().zip(data) {
            cell.store(byte, Ordering::Relaxed);
            stored += 1;
        }
        stored
    }

    #[must_use]
    pub fn snapshot(&self) -> [u8; N] {
        let mut out = [0u8; N];
        for (byte, cell) in out.iter_mut().zip(self.cells.iter()) {
            *byte = cell.load(Ordering::Relaxed);
        }
        out
    }
}

/// Byte-addressable memory exposed to a remote controller.
pub struct VirtualRegisterFile<'a, M: AddressingMode = AddressPrefixed> {
    write_buffer: &'a [AtomicU8],
    read_buffer: &'a [AtomicU8],
    cursor: AtomicUsize,
    awaiting_address: AtomicBool,
    had_read: AtomicBool,
    _mode: PhantomData<M>,
}

impl<'a, M: AddressingMode> VirtualRegisterFile<'a, M> {
    /// Register file reading and writing the same storage.
    #[must_use]
    pub const fn new(storage: &'a [AtomicU8]) -> Self {
        Self::with_buffers(storage, storage)
    }

    /// Register file with separate write and read storage. The two may alias.
    #[must_use]
    pub const fn with_buffers(write_buffer: &'a [AtomicU8], read_buffer: &'a [AtomicU8]) -> Self {
        Self {
            write_buffer,
            read_buffer,
            cursor: AtomicUsize::new(0),
            awaiting_address: AtomicBool::new(M::ADDRESS_PREFIXED),
            had_read: AtomicBool::new(false),
            _mode: PhantomData,
        }
    }

    /// Register file with no storage bound yet: writes are dropped and reads return `0x00`.
    #[must_use]
    pub const fn unbound() -> Self {
        Self::with_buffers(&[], &[])
    }

    /// Shared storage limited to the configured capacity.
    #[must_use]
    pub fn configured(storage: &'a [AtomicU8], config: &TargetConfig) -> Self {
        let bound = storage.get(..config.buffer_capacity).unwrap_or(storage);
        Self::new(bound)
    }

    /// Bind the storage read requests are served from.
    pub fn setup_read_buffer(&mut self, buffer: &'a [AtomicU8]) {
        self.read_buffer = buffer;
    }

    /// Bind the storage written bytes are stored into.
    pub fn setup_write_buffer(&mut self, buffer: &'a [AtomicU8]) {
        self.write_buffer = buffer;
    }

    /// Handle one byte written by the remote controller.
    pub fn store_byte(&self, data: u8) {
        if M::ADDRESS_PREFIXED && self.awaiting_address.load(Ordering::Acquire) {
            self.cursor.store(usize::from(data), Ordering::Release);
            self.awaiting_address.store(false, Ordering::Release);
            return;
        }

        let cursor = self.cursor.load(Ordering::Acquire);
        // Past the end: drop the byte and leave the cursor where it is.
        if let Some(cell) = self.write_buffer.get(cursor) {
            cell.store(data, Ordering::Relaxed);
            self.cursor.store(cursor + 1, Ordering::Release);
        }
    }

    /// Produce the next byte for the remote controller.
    pub fn request_byte(&self) -> u8 {
        self.had_read.store(true, Ordering::Release);

        let cursor = self.cursor.load(Ordering::Acquire);
        match self.read_buffer.get(cursor) {
            Some(cell) => {
                self.cursor.store(cursor + 1, Ordering::Release);
                cell.load(Ordering::Relaxed)
            }
            None => {
                // Park one past the end; the stop handler takes the pre-loaded byte back off.
                self.cursor
                    .store(self.read_buffer.len() + 1, Ordering::Release);
                0x00
            }
        }
    }

    /// End of transaction.
    pub fn on_stop(&self) {
        if M::ADDRESS_PREFIXED {
            let cursor = self.cursor.load(Ordering::Acquire);
            if self.had_read.load(Ordering::Acquire) && cursor != 0 {
                self.cursor.store(cursor - 1, Ordering::Release);
            }
        } else {
            self.cursor.store(0, Ordering::Release);
        }

        self.awaiting_address
            .store(M::ADDRESS_PREFIXED, Ordering::Release);
        self.had_read.store(false, Ordering::Release);
    }

    #[must_use]
    pub fn cursor(&self) -> usize {
        self.cursor.load(Ordering::Acquire)
    }

    /// Return to the power-on state. Only call while the bus is idle.
    pub fn reset(&self) {
        self.cursor.store(0, Ordering::Release);
        self.awaiting_address
            .store(M::ADDRESS_PREFIXED, Ordering::Release);
        self.had_read.store(false, Ordering::Release);
    }

    #[must_use]
    pub fn write_capacity(&self) -> usize {
        self.write_buffer.len()
    }

    #[must_use]
    pub fn read_capacity(&self) -> usize {
        self.read_buffer.len()
    }

    #[must_use]
    pub fn status(&self) -> TargetStatus {
        TargetStatus {
            cursor: self.cursor(),
            awaiting_address: self.awaiting_address.load(Ordering::Acquire),
            had_read: self.had_read.load(Ordering::Acquire),
            write_capacity: self.write_capacity(),
            read_capacity: self.read_capacity(),
        }
    }
}

impl<M: AddressingMode> ByteWriteHandler for VirtualRegisterFile<'_, M> {
    fn on_byte_written(&self, data: u8) {
        self.store_byte(data);
    }
}

impl<M: AddressingMode> ByteRequestHandler for VirtualRegisterFile<'_, M> {
    fn on_byte_requested(&self) -> u8 {
        self.request_byte()
    }
}

impl<M: AddressingMode> StopHandler for VirtualRegisterFile<'_, M> {
    fn on_bus_stopped(&self) {
        self.on_stop();
    }
}
