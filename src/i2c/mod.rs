// Licensed under the Apache-2.0 license

//! I2C transaction engine and target-side register emulation.
//!
//! The controller half drives write, read and write-then-read transactions
//! through a [`ControllerPort`] by polling its status flags. The target half
//! turns the peripheral's receive, transmit and stop events into calls on
//! application handlers; [`VirtualRegisterFile`] is the stock handler that
//! presents a small register memory to the remote controller.
//!
//! Both halves are written against port traits only, so they run unchanged
//! on real hardware and against the software bus in `sim`.

pub mod common;
pub mod deadline;
pub mod error;
pub mod i2c_controller;
pub mod traits;

#[cfg(feature = "i2c_target")]
pub mod dispatch;
#[cfg(feature = "i2c_target")]
pub mod register_file;

#[cfg(any(test, feature = "sim"))]
pub mod sim;

pub use common::{
    BusEvent, ConfigurationError, ControllerConfig, ControllerConfigBuilder, TargetConfig,
    TargetConfigBuilder, TargetStatus, TransferKind, MAX_TRANSFER_LEN,
};
pub use deadline::{CancelToken, Clock, ClockDeadline, Deadline, PollBudget, Unbounded};
pub use error::Error;
pub use i2c_controller::{I2cController, Transaction, Transfer};
pub use traits::{
    ByteRequestHandler, ByteWriteHandler, ControllerPort, StopHandler, TargetHandler,
};

#[cfg(feature = "i2c_target")]
pub use dispatch::EventDispatch;
#[cfg(feature = "i2c_target")]
pub use register_file::{AddressPrefixed, AddressingMode, FlatStream, RegisterBlock, VirtualRegisterFile};
#[cfg(feature = "i2c_target")]
pub use traits::TargetPort;
