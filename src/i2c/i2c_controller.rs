// Licensed under the Apache-2.0 license

//! Controller-role transaction engine.
//!
//! Transfers are driven entirely by polling the port's status flags. The
//! primitive is non-blocking: [`I2cController::start`] loads the registers and
//! issues the start condition, and [`I2cController::poll`] advances the
//! transfer by one step, returning `nb::Error::WouldBlock` while the bus is
//! still busy. [`I2cController::execute`] loops over `poll` under a caller
//! supplied [`Deadline`], and the `send_*`/`read_*` helpers wrap `execute`
//! with the deadline from [`ControllerConfig`].
//!
//! Success is judged exactly the way the hardware reports it: the remaining
//! byte count must be zero once the bus goes idle.

use crate::common::{Logger, NoOpLogger};
use crate::i2c::common::{
    read_address, write_address, ControllerConfig, TransferKind, MAX_TRANSFER_LEN,
};
use crate::i2c::deadline::{Deadline, PollBudget, Unbounded};
use crate::i2c::error::Error;
use crate::i2c::traits::ControllerPort;
use embedded_hal::i2c::{Operation, SevenBitAddress};

/// One controller transaction. Addresses are 7-bit; the direction bit is
/// added by the engine.
#[derive(Debug)]
pub enum Transaction<'b> {
    Write {
        address: SevenBitAddress,
        bytes: &'b [u8],
    },
    Read {
        address: SevenBitAddress,
        buffer: &'b mut [u8],
    },
    /// Write `bytes`, repeated start, read into `buffer`.
    WriteRead {
        address: SevenBitAddress,
        bytes: &'b [u8],
        buffer: &'b mut [u8],
    },
}

impl Transaction<'_> {
    #[must_use]
    pub fn kind(&self) -> TransferKind {
        match self {
            Self::Write { .. } => TransferKind::Write,
            Self::Read { .. } => TransferKind::Read,
            Self::WriteRead { .. } => TransferKind::WriteRead,
        }
    }

    #[must_use]
    pub fn address(&self) -> SevenBitAddress {
        match *self {
            Self::Write { address, .. }
            | Self::Read { address, .. }
            | Self::WriteRead { address, .. } => address,
        }
    }

    fn validate(&self) -> Result<(), Error> {
        let fits = |len: usize| (1..=MAX_TRANSFER_LEN).contains(&len);
        let ok = match self {
            Self::Write { bytes, .. } => fits(bytes.len()),
            Self::Read { buffer, .. } => fits(buffer.len()),
            Self::WriteRead { bytes, buffer, .. } => fits(bytes.len()) && fits(buffer.len()),
        };
        if ok {
            Ok(())
        } else {
            Err(Error::InvalidLength)
        }
    }

    fn tx_bytes(&self) -> &[u8] {
        match self {
            Self::Write { bytes, .. } | Self::WriteRead { bytes, .. } => bytes,
            Self::Read { .. } => &[],
        }
    }

    fn rx_buffer(&mut self) -> &mut [u8] {
        match self {
            Self::Read { buffer, .. } | Self::WriteRead { buffer, .. } => buffer,
            Self::Write { .. } => &mut [],
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Phase {
    /// Feeding the transmit register.
    Sending,
    /// Write half of a combined transfer; ends with the repeated start.
    Addressing,
    /// Collecting from the receive register.
    Receiving,
    /// Bus released; holds the outcome reported by every later poll.
    Done(Result<(), Error>),
}

/// An in-flight transaction. Created by [`I2cController::start`].
#[derive(Debug)]
pub struct Transfer<'b> {
    txn: Transaction<'b>,
    phase: Phase,
    index: usize,
}

impl Transfer<'_> {
    #[must_use]
    pub fn kind(&self) -> TransferKind {
        self.txn.kind()
    }

    #[must_use]
    pub fn is_done(&self) -> bool {
        matches!(self.phase, Phase::Done(_))
    }

    /// Outcome of a finished transfer, `None` while still in flight.
    #[must_use]
    pub fn outcome(&self) -> Option<Result<(), Error>> {
        match self.phase {
            Phase::Done(result) => Some(result),
            _ => None,
        }
    }
}

pub struct I2cController<P: ControllerPort, L: Logger = NoOpLogger> {
    pub port: P,
    pub config: ControllerConfig,
    pub logger: L,
}

impl<P: ControllerPort> I2cController<P, NoOpLogger> {
    pub fn new(port: P, config: ControllerConfig) -> Self {
        Self::with_logger(port, config, NoOpLogger)
    }
}

impl<P: ControllerPort, L: Logger> I2cController<P, L> {
    pub fn with_logger(port: P, config: ControllerConfig, logger: L) -> Self {
        Self {
            port,
            config,
            logger,
        }
    }

    /// Release the port.
    pub fn free(self) -> P {
        self.port
    }

    /// Load the registers for `txn` and issue the start condition.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidLength`] if a payload is empty or longer than
    /// [`MAX_TRANSFER_LEN`]. Nothing is touched on the bus in that case.
    pub fn start<'b>(&mut self, txn: Transaction<'b>) -> Result<Transfer<'b>, Error> {
        txn.validate()?;

        let address = txn.address();
        let phase = match &txn {
            Transaction::Write { bytes, .. } => {
                self.port.set_address(write_address(address));
                if let Some(&first) = bytes.first() {
                    self.port.write_data(first);
                }
                self.port.set_count(count_of(bytes.len()));
                self.port.start();
                Phase::Sending
            }
            Transaction::Read { buffer, .. } => {
                self.port.set_address(read_address(address));
                self.port.set_count(count_of(buffer.len()));
                self.port.start();
                Phase::Receiving
            }
            Transaction::WriteRead { bytes, .. } => {
                self.port.set_address(write_address(address));
                if let Some(&first) = bytes.first() {
                    self.port.write_data(first);
                }
                self.port.set_count(count_of(bytes.len()));
                self.port.clear_status();
                self.port.set_restart_enable(true);
                self.port.start();
                Phase::Addressing
            }
        };
        self.logger.debug("i2c: start");

        let index = match phase {
            Phase::Receiving => 0,
            _ => 1,
        };
        Ok(Transfer { txn, phase, index })
    }

    /// Advance `transfer` by one step.
    ///
    /// # Errors
    ///
    /// `WouldBlock` while the bus is active. [`Error::Incomplete`] if the bus
    /// went idle with bytes outstanding. Once finished, the same outcome is
    /// returned on every further poll.
    pub fn poll(&mut self, transfer: &mut Transfer<'_>) -> nb::Result<(), Error> {
        if let Phase::Done(result) = transfer.phase {
            return result.map_err(nb::Error::Other);
        }

        if !self.port.is_active() {
            return self.finish(transfer).map_err(nb::Error::Other);
        }

        match transfer.phase {
            Phase::Sending => {
                if self.port.data_request() && self.port.tx_empty() {
                    self.load_next(transfer);
                }
            }
            Phase::Addressing => {
                if self.port.rx_full() {
                    // Nothing can be received before the restart; leftover from an earlier transfer.
                    let _ = self.port.read_data();
                    self.logger.debug("i2c: discarded stale receive data");
                } else if self.port.data_request() && self.port.tx_empty() {
                    if transfer.index < transfer.txn.tx_bytes().len() {
                        self.load_next(transfer);
                    } else {
                        self.restart(transfer);
                    }
                }
            }
            Phase::Receiving => {
                if self.port.rx_full() {
                    self.store_next(transfer);
                }
            }
            Phase::Done(_) => {}
        }
        Err(nb::Error::WouldBlock)
    }

    /// Abandon `transfer` and release the bus.
    pub fn cancel(&mut self, transfer: Transfer<'_>) {
        drop(transfer);
        self.port.abort();
        self.port.set_restart_enable(false);
        self.logger.debug("i2c: transfer aborted");
    }

    /// Run `txn` to completion, checking `deadline` after every pending poll.
    ///
    /// # Errors
    ///
    /// Any error from [`start`](Self::start) or [`poll`](Self::poll), or the
    /// deadline's error. On deadline expiry the port is aborted first.
    pub fn execute<D: Deadline>(&mut self, txn: Transaction<'_>, mut deadline: D) -> Result<(), Error> {
        let mut transfer = self.start(txn)?;
        loop {
            match self.poll(&mut transfer) {
                Ok(()) => return Ok(()),
                Err(nb::Error::Other(e)) => return Err(e),
                Err(nb::Error::WouldBlock) => {
                    if let Err(e) = deadline.check() {
                        self.logger.error("i2c: deadline expired");
                        self.cancel(transfer);
                        return Err(e);
                    }
                }
            }
        }
    }

    pub fn send_byte(&mut self, address: SevenBitAddress, data: u8) -> Result<(), Error> {
        self.send_bytes(address, &[data])
    }

    pub fn send_bytes(&mut self, address: SevenBitAddress, bytes: &[u8]) -> Result<(), Error> {
        self.run(Transaction::Write { address, bytes })
    }

    pub fn read_byte(&mut self, address: SevenBitAddress) -> Result<u8, Error> {
        let mut buffer = [0u8; 1];
        self.read_bytes(address, &mut buffer)?;
        let [byte] = buffer;
        Ok(byte)
    }

    /// Read one byte, yielding `0x00` if the transfer fails.
    pub fn read_byte_or_zero(&mut self, address: SevenBitAddress) -> u8 {
        self.read_byte(address).unwrap_or(0x00)
    }

    pub fn read_bytes(&mut self, address: SevenBitAddress, buffer: &mut [u8]) -> Result<(), Error> {
        self.run(Transaction::Read { address, buffer })
    }

    /// Write `bytes`, repeated start, then fill `buffer`.
    pub fn write_read(
        &mut self,
        address: SevenBitAddress,
        bytes: &[u8],
        buffer: &mut [u8],
    ) -> Result<(), Error> {
        self.run(Transaction::WriteRead {
            address,
            bytes,
            buffer,
        })
    }

    /// Set the target's register pointer to `register` and read `buffer.len()` bytes from it.
    pub fn register_write_read(
        &mut self,
        address: SevenBitAddress,
        register: u8,
        buffer: &mut [u8],
    ) -> Result<(), Error> {
        self.write_read(address, &[register], buffer)
    }

    fn run(&mut self, txn: Transaction<'_>) -> Result<(), Error> {
        match self.config.poll_limit {
            Some(polls) => self.execute(txn, PollBudget::new(polls)),
            None => self.execute(txn, Unbounded),
        }
    }

    fn load_next(&mut self, transfer: &mut Transfer<'_>) {
        if let Some(&byte) = transfer.txn.tx_bytes().get(transfer.index) {
            self.port.write_data(byte);
            transfer.index += 1;
        }
    }

    fn store_next(&mut self, transfer: &mut Transfer<'_>) {
        let byte = self.port.read_data();
        if let Some(slot) = transfer.txn.rx_buffer().get_mut(transfer.index) {
            *slot = byte;
            transfer.index += 1;
        }
    }

    fn restart(&mut self, transfer: &mut Transfer<'_>) {
        let len = transfer.txn.rx_buffer().len();
        self.port.set_address(read_address(transfer.txn.address()));
        self.port.set_count(count_of(len));
        self.port.start();
        self.port.set_restart_enable(false);
        transfer.phase = Phase::Receiving;
        transfer.index = 0;
        self.logger.debug("i2c: restart");
    }

    fn finish(&mut self, transfer: &mut Transfer<'_>) -> Result<(), Error> {
        // The active flag drops one cycle before the final byte is latched.
        if transfer.phase == Phase::Receiving && self.port.rx_full() {
            self.store_next(transfer);
        }
        if transfer.txn.kind() == TransferKind::WriteRead {
            self.port.set_restart_enable(false);
        }
        let result = if self.port.count() == 0 {
            Ok(())
        } else {
            self.logger.error("i2c: transfer incomplete");
            Err(Error::Incomplete)
        };
        transfer.phase = Phase::Done(result);
        result
    }
}

/// Lengths are validated against [`MAX_TRANSFER_LEN`] before this is used.
fn count_of(len: usize) -> u8 {
    u8::try_from(len).unwrap_or(u8::MAX)
}

impl<P: ControllerPort, L: Logger> embedded_hal::i2c::ErrorType for I2cController<P, L> {
    type Error = Error;
}

impl<P: ControllerPort, L: Logger> embedded_hal::i2c::I2c for I2cController<P, L> {
    fn read(&mut self, addr: SevenBitAddress, buffer: &mut [u8]) -> Result<(), Self::Error> {
        self.read_bytes(addr, buffer)
    }

    fn write(&mut self, addr: SevenBitAddress, bytes: &[u8]) -> Result<(), Self::Error> {
        self.send_bytes(addr, bytes)
    }

    fn write_read(
        &mut self,
        addr: SevenBitAddress,
        bytes: &[u8],
        buffer: &mut [u8],
    ) -> Result<(), Self::Error> {
        I2cController::write_read(self, addr, bytes, buffer)
    }

    /// Only sequences that map onto one start/restart/stop transfer are
    /// supported: a single write, a single read, or a write followed by a read.
    fn transaction(
        &mut self,
        addr: SevenBitAddress,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        match operations {
            [] => Ok(()),
            [Operation::Write(bytes)] => self.send_bytes(addr, bytes),
            [Operation::Read(buffer)] => self.read_bytes(addr, buffer),
            [Operation::Write(bytes), Operation::Read(buffer)] => {
                I2cController::write_read(self, addr, bytes, buffer)
            }
            _ => Err(Error::Unsupported),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::test_support::RecordingLogger;
    use crate::i2c::common::ControllerConfigBuilder;
    use crate::i2c::deadline::CancelToken;
    #[cfg(feature = "i2c_target")]
    use crate::i2c::register_file::{RegisterBlock, VirtualRegisterFile};
    use crate::i2c::sim::{PreloadingTarget, ScriptedTarget, SimulatedController, WireEvent};
    use embedded_hal::i2c::I2c as _;
    use hex_literal::hex;

    fn controller(target: ScriptedTarget) -> I2cController<SimulatedController<ScriptedTarget>> {
        I2cController::new(
            SimulatedController::new(target),
            ControllerConfigBuilder::new().poll_limit(1_000).build(),
        )
    }

    #[test]
    fn test_send_bytes_acked() {
        let mut i2c = controller(ScriptedTarget::new(0x50));
        assert_eq!(i2c.send_bytes(0x50, &hex!("01 02 03")), Ok(()));
        assert_eq!(i2c.port.target.written(), &hex!("01 02 03"));
        assert_eq!(i2c.port.count(), 0);
    }

    #[test]
    fn test_send_byte() {
        let mut i2c = controller(ScriptedTarget::new(0x21));
        assert!(i2c.send_byte(0x21, 0x9c).is_ok());
        assert_eq!(i2c.port.target.written(), &[0x9c]);
        assert_eq!(i2c.port.transcript().first(), Some(&WireEvent::Start(0x42)));
    }

    #[test]
    fn test_send_bytes_nack_mid_transfer_fails() {
        let mut i2c = controller(ScriptedTarget::new(0x50).nack_write_after(2));
        assert_eq!(i2c.send_bytes(0x50, &hex!("01 02 03 04")), Err(Error::Incomplete));
        assert_eq!(i2c.port.target.written(), &hex!("01 02 03"));
        assert_ne!(i2c.port.count(), 0);
        assert_eq!(i2c.port.transcript().last(), Some(&WireEvent::Stop));
    }

    #[test]
    fn test_address_nack_fails() {
        let mut i2c = controller(ScriptedTarget::new(0x50));
        assert_eq!(i2c.send_byte(0x51, 0x00), Err(Error::Incomplete));
        let mut buf = [0u8; 2];
        assert_eq!(i2c.read_bytes(0x51, &mut buf), Err(Error::Incomplete));
    }

    #[test]
    fn test_read_bytes_collects_every_byte() {
        let mut i2c = controller(ScriptedTarget::new(0x48).with_read_data(&hex!("de ad be ef")));
        let mut buf = [0u8; 4];
        assert_eq!(i2c.read_bytes(0x48, &mut buf), Ok(()));
        assert_eq!(buf, hex!("de ad be ef"));
    }

    #[test]
    fn test_read_byte_and_read_byte_or_zero() {
        let mut i2c = controller(ScriptedTarget::new(0x48).with_read_data(&[0x7e]));
        assert_eq!(i2c.read_byte(0x48), Ok(0x7e));
        assert_eq!(i2c.read_byte_or_zero(0x49), 0x00);
    }

    #[test]
    fn test_read_bytes_nack_fails() {
        let mut i2c = controller(
            ScriptedTarget::new(0x48)
                .with_read_data(&hex!("01 02 03"))
                .abort_read_after(1),
        );
        let mut buf = [0u8; 3];
        assert_eq!(i2c.read_bytes(0x48, &mut buf), Err(Error::Incomplete));
    }

    #[test]
    fn test_register_write_read_across_restart() {
        let mut i2c = controller(
            ScriptedTarget::new(0x50).with_read_data(&hex!("a0 a1 a2 a3 a4 a5")),
        );
        let mut buf = [0u8; 4];

        assert_eq!(i2c.register_write_read(0x50, 0x10, &mut buf), Ok(()));

        assert_eq!(buf, hex!("a0 a1 a2 a3"));
        assert_eq!(i2c.port.target.written(), &[0x10]);
        let transcript = i2c.port.transcript();
        assert_eq!(transcript.first(), Some(&WireEvent::Start(0xa0)));
        assert!(transcript.contains(&WireEvent::Restart(0xa1)));
        let reads = transcript
            .iter()
            .filter(|e| matches!(e, WireEvent::Read(_)))
            .count();
        assert_eq!(reads, 4);
        assert_eq!(
            transcript.iter().filter(|e| **e == WireEvent::Stop).count(),
            1
        );
    }

    #[test]
    fn test_final_byte_needs_drain_after_idle() {
        let mut i2c = controller(ScriptedTarget::new(0x50).with_read_data(&hex!("11 22")));
        let mut buf = [0u8; 2];
        let mut transfer = i2c
            .start(Transaction::WriteRead {
                address: 0x50,
                bytes: &[0x00],
                buffer: &mut buf,
            })
            .unwrap();

        let mut polls = 0;
        while let Err(nb::Error::WouldBlock) = i2c.poll(&mut transfer) {
            polls += 1;
            assert!(polls < 100);
        }
        assert!(transfer.is_done());
        drop(transfer);
        assert_eq!(buf, hex!("11 22"));
        // the last byte and the idle flag arrive together
        assert!(!i2c.port.rx_full());
    }

    #[test]
    fn test_stale_receive_data_is_discarded_before_restart() {
        let mut logger = RecordingLogger::default();
        let mut i2c = I2cController::with_logger(
            SimulatedController::new(ScriptedTarget::new(0x50).with_read_data(&hex!("01 02"))),
            ControllerConfig::default(),
            &mut logger,
        );
        i2c.port.inject_stale_rx(0xee);

        let mut buf = [0u8; 2];
        assert_eq!(i2c.register_write_read(0x50, 0x00, &mut buf), Ok(()));
        assert_eq!(buf, hex!("01 02"));
        drop(i2c);
        assert!(logger.saw("stale"));
        assert!(logger.saw("restart"));
    }

    #[test]
    fn test_multi_byte_write_phase() {
        let mut i2c = controller(ScriptedTarget::new(0x50).with_read_data(&[0x99]));
        let mut buf = [0u8; 1];
        assert_eq!(i2c.write_read(0x50, &hex!("12 34"), &mut buf), Ok(()));
        assert_eq!(i2c.port.target.written(), &hex!("12 34"));
        assert_eq!(buf, [0x99]);
    }

    #[test]
    fn test_write_phase_nack_fails_and_clears_restart() {
        let mut i2c = controller(ScriptedTarget::new(0x50).nack_write_after(0));
        let mut buf = [0u8; 2];
        assert_eq!(
            i2c.register_write_read(0x50, 0x10, &mut buf),
            Err(Error::Incomplete)
        );
        assert!(!i2c.port.restart_enabled());
        assert!(!i2c
            .port
            .transcript()
            .iter()
            .any(|e| matches!(e, WireEvent::Restart(_))));
    }

    #[test]
    fn test_invalid_lengths_never_touch_the_bus() {
        let mut i2c = controller(ScriptedTarget::new(0x50));
        assert_eq!(i2c.send_bytes(0x50, &[]), Err(Error::InvalidLength));
        assert_eq!(i2c.read_bytes(0x50, &mut []), Err(Error::InvalidLength));
        let long = [0u8; MAX_TRANSFER_LEN + 1];
        assert_eq!(i2c.send_bytes(0x50, &long), Err(Error::InvalidLength));
        assert!(i2c.port.transcript().is_empty());
    }

    #[test]
    fn test_wedged_bus_times_out_and_aborts() {
        let mut i2c = controller(ScriptedTarget::new(0x50));
        i2c.port.wedge();
        assert_eq!(i2c.send_byte(0x50, 0x01), Err(Error::Timeout));
        assert_eq!(i2c.port.abort_count(), 1);
        assert_eq!(i2c.port.transcript().last(), Some(&WireEvent::Abort));
    }

    #[test]
    fn test_cancel_token_stops_execute() {
        let mut i2c = I2cController::new(
            SimulatedController::new(ScriptedTarget::new(0x50)),
            ControllerConfig::default(),
        );
        i2c.port.wedge();
        let token = CancelToken::new();
        token.cancel();
        let result = i2c.execute(
            Transaction::Write {
                address: 0x50,
                bytes: &[1],
            },
            &token,
        );
        assert_eq!(result, Err(Error::Cancelled));
        assert_eq!(i2c.port.abort_count(), 1);
    }

    #[test]
    fn test_poll_after_done_is_ok() {
        let mut i2c = controller(ScriptedTarget::new(0x50));
        let mut transfer = i2c
            .start(Transaction::Write {
                address: 0x50,
                bytes: &[1],
            })
            .unwrap();
        assert_eq!(transfer.kind(), TransferKind::Write);
        assert_eq!(transfer.outcome(), None);
        assert_eq!(nb::block!(i2c.poll(&mut transfer)), Ok(()));
        assert_eq!(i2c.poll(&mut transfer), Ok(()));
        assert_eq!(transfer.outcome(), Some(Ok(())));
    }

    #[test]
    fn test_failed_transfer_stays_failed_when_polled_again() {
        let mut i2c = controller(ScriptedTarget::new(0x50));
        let mut transfer = i2c
            .start(Transaction::Write {
                address: 0x51,
                bytes: &[1],
            })
            .unwrap();
        assert_eq!(nb::block!(i2c.poll(&mut transfer)), Err(Error::Incomplete));
        assert!(transfer.is_done());
        assert_eq!(i2c.poll(&mut transfer), Err(nb::Error::Other(Error::Incomplete)));
        assert_eq!(i2c.poll(&mut transfer), Err(nb::Error::Other(Error::Incomplete)));
        assert_eq!(transfer.outcome(), Some(Err(Error::Incomplete)));
    }

    #[test]
    fn test_read_address_nack_after_restart_fails() {
        let mut i2c = controller(ScriptedTarget::new(0x50).nack_read_address());
        let mut buf = [0u8; 2];
        assert_eq!(
            i2c.register_write_read(0x50, 0x10, &mut buf),
            Err(Error::Incomplete)
        );
        assert_eq!(i2c.port.target.written(), &[0x10]);
        assert!(!i2c.port.restart_enabled());
        let transcript = i2c.port.transcript();
        assert!(transcript.contains(&WireEvent::Restart(0xa1)));
        assert!(!transcript.iter().any(|e| matches!(e, WireEvent::Read(_))));
        assert_eq!(transcript.last(), Some(&WireEvent::Stop));
    }

    #[test]
    fn test_embedded_hal_surface() {
        let mut i2c = controller(ScriptedTarget::new(0x50).with_read_data(&hex!("0a 0b 0c")));
        let mut buf = [0u8; 2];

        i2c.write(0x50, &[0x01]).unwrap();
        i2c.read(0x50, &mut buf).unwrap();
        assert_eq!(buf, hex!("0a 0b"));

        let mut one = [0u8; 1];
        i2c.transaction(0x50, &mut [Operation::Write(&[0x02]), Operation::Read(&mut one)])
            .unwrap();
        assert_eq!(one, [0x0c]);

        let mut a = [0u8; 1];
        let mut b = [0u8; 1];
        assert_eq!(
            i2c.transaction(0x50, &mut [Operation::Read(&mut a), Operation::Read(&mut b)]),
            Err(Error::Unsupported)
        );
        assert_eq!(i2c.transaction(0x50, &mut []), Ok(()));
    }

    #[cfg(feature = "i2c_target")]
    #[test]
    fn test_round_trip_against_register_file() {
        let block = RegisterBlock::<16>::new();
        let regs: VirtualRegisterFile<'_> = VirtualRegisterFile::new(block.cells());
        let mut i2c = I2cController::new(
            SimulatedController::new(PreloadingTarget::new(0x64, &regs)),
            ControllerConfigBuilder::new().poll_limit(1_000).build(),
        );

        assert_eq!(i2c.send_bytes(0x64, &hex!("05 aa bb")), Ok(()));
        assert_eq!(block.load(5), Some(0xaa));
        assert_eq!(block.load(6), Some(0xbb));
        assert_eq!(regs.cursor(), 7);

        let mut buf = [0u8; 3];
        assert_eq!(i2c.register_write_read(0x64, 0x05, &mut buf), Ok(()));
        assert_eq!(buf, hex!("aa bb 00"));
        // one byte was pre-loaded past the last one clocked out and then taken back
        assert_eq!(regs.cursor(), 5 + 3);

        // a plain read continues from the corrected pointer
        block.store(8, 0x42);
        assert_eq!(i2c.read_byte(0x64), Ok(0x42));
        assert_eq!(regs.cursor(), 9);
    }

    #[cfg(feature = "i2c_target")]
    #[test]
    fn test_read_past_end_of_register_file() {
        let block = RegisterBlock::<16>::new();
        block.copy_from(14, &hex!("e0 e1"));
        let regs: VirtualRegisterFile<'_> = VirtualRegisterFile::new(block.cells());
        let mut i2c = I2cController::new(
            SimulatedController::new(PreloadingTarget::new(0x64, &regs)),
            ControllerConfigBuilder::new().poll_limit(1_000).build(),
        );

        let mut buf = [0xffu8; 4];
        assert_eq!(i2c.register_write_read(0x64, 14, &mut buf), Ok(()));
        assert_eq!(buf, hex!("e0 e1 00 00"));
        assert_eq!(regs.cursor(), 16);
    }
}
