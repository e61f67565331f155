// Licensed under the Apache-2.0 license

//! Crate-wide helpers shared by the bus drivers.

/// Sink for driver diagnostics.
///
/// Drivers only ever pass static strings so that logging stays usable from
/// interrupt context without allocation or formatting.
pub trait Logger {
    fn debug(&mut self, msg: &str);
    fn error(&mut self, msg: &str);
}

/// Logger that discards everything. Used as the default type parameter.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoOpLogger;

impl Logger for NoOpLogger {
    fn debug(&mut self, _msg: &str) {}
    fn error(&mut self, _msg: &str) {}
}

impl<L: Logger + ?Sized> Logger for &mut L {
    fn debug(&mut self, msg: &str) {
        (**self).debug(msg);
    }

    fn error(&mut self, msg: &str) {
        (**self).error(msg);
    }
}
