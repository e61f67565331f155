// Licensed under the Apache-2.0 license

use embedded_hal::i2c::{ErrorKind, NoAcknowledgeSource};

/// Controller-side transfer failure.
///
/// The hardware only reports how many bytes were left when the bus went
/// idle, so a NACK, a lost arbitration and a bus error are indistinguishable
/// and all surface as [`Error::Incomplete`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// Bus went idle with a non-zero remaining byte count.
    Incomplete,
    /// The caller's deadline expired before the bus went idle.
    Timeout,
    /// The caller cancelled the transfer.
    Cancelled,
    /// Empty payload, or longer than the byte counter can hold.
    InvalidLength,
    /// Operation sequence cannot be expressed as one start/restart/stop transfer.
    Unsupported,
}

impl embedded_hal::i2c::Error for Error {
    fn kind(&self) -> ErrorKind {
        match *self {
            Self::Incomplete => ErrorKind::NoAcknowledge(NoAcknowledgeSource::Unknown),
            Self::Timeout | Self::Cancelled | Self::InvalidLength | Self::Unsupported => {
                ErrorKind::Other
            }
        }
    }
}
