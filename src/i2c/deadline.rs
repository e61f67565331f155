// Licensed under the Apache-2.0 license

//! Deadlines and cancellation for blocking transfers.
//!
//! [`I2cController::execute`](crate::i2c::I2cController::execute) consults a
//! [`Deadline`] every time a poll finds the bus still busy. When the deadline
//! reports an error the engine aborts the port and returns it.

use core::sync::atomic::{AtomicBool, Ordering};

use fugit::{MicrosDurationU32, TimerInstantU32};

use crate::i2c::error::Error;

/// Microsecond instant of a free-running 32-bit timer.
pub type Instant = TimerInstantU32<1_000_000>;

pub trait Deadline {
    /// Called after each poll that left the transfer pending.
    ///
    /// # Errors
    ///
    /// Returns the error that should terminate the transfer, typically
    /// [`Error::Timeout`] or [`Error::Cancelled`].
    fn check(&mut self) -> Result<(), Error>;
}

impl<D: Deadline + ?Sized> Deadline for &mut D {
    fn check(&mut self) -> Result<(), Error> {
        (**self).check()
    }
}

/// Both deadlines apply; the first to fire wins.
impl<A: Deadline, B: Deadline> Deadline for (A, B) {
    fn check(&mut self) -> Result<(), Error> {
        self.0.check()?;
        self.1.check()
    }
}

/// Never expires. A wedged bus blocks the caller forever.
#[derive(Clone, Copy, Debug, Default)]
pub struct Unbounded;

impl Deadline for Unbounded {
    fn check(&mut self) -> Result<(), Error> {
        Ok(())
    }
}

/// Expires after a fixed number of pending polls.
#[derive(Clone, Copy, Debug)]
pub struct PollBudget {
    remaining: u32,
}

impl PollBudget {
    #[must_use]
    pub const fn new(polls: u32) -> Self {
        Self { remaining: polls }
    }

    #[must_use]
    pub const fn remaining(&self) -> u32 {
        self.remaining
    }
}

impl Deadline for PollBudget {
    fn check(&mut self) -> Result<(), Error> {
        if self.remaining == 0 {
            return Err(Error::Timeout);
        }
        self.remaining -= 1;
        Ok(())
    }
}

/// Cancellation flag that can be raised from another context (an interrupt,
/// a watchdog task) while a transfer is blocking.
#[derive(Debug, Default)]
pub struct CancelToken {
    cancelled: AtomicBool,
}

impl CancelToken {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            cancelled: AtomicBool::new(false),
        }
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// Re-arm the token for the next transfer.
    pub fn reset(&self) {
        self.cancelled.store(false, Ordering::Release);
    }
}

impl Deadline for &CancelToken {
    fn check(&mut self) -> Result<(), Error> {
        if self.is_cancelled() {
            Err(Error::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Monotonic microsecond time source.
pub trait Clock {
    fn now(&self) -> Instant;
}

/// Wall-clock deadline measured against a [`Clock`].
pub struct ClockDeadline<'c, C: Clock> {
    clock: &'c C,
    expires_at: Instant,
}

impl<'c, C: Clock> ClockDeadline<'c, C> {
    /// Deadline `timeout` from now.
    pub fn after(clock: &'c C, timeout: MicrosDurationU32) -> Self {
        Self {
            expires_at: clock.now() + timeout,
            clock,
        }
    }

    #[must_use]
    pub fn expires_at(&self) -> Instant {
        self.expires_at
    }
}

impl<C: Clock> Deadline for ClockDeadline<'_, C> {
    fn check(&mut self) -> Result<(), Error> {
        match self.clock.now().checked_duration_since(self.expires_at) {
            Some(_) => Err(Error::Timeout),
            None => Ok(()),
        }
    }
}
