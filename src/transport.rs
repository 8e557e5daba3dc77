//! Byte-stream capability used to talk to the radio modem.
//!
//! The modem sits behind a serial port. Reads are non-blocking in the `nb`
//! sense: [`nb::Error::WouldBlock`] means "no byte available right now", which
//! is exactly the (unreliable) availability signal the line reader polls.
//! Writes are blocking and are followed by an explicit [`flush`](ModemTransport::flush)
//! once a whole command has been queued.

/// A duplex serial byte stream to the modem.
pub trait ModemTransport {
    /// Error reported by the underlying serial peripheral.
    type Error;

    /// Attempts to read one byte.
    ///
    /// Returns `Err(nb::Error::WouldBlock)` when nothing is currently available.
    fn read_byte(&mut self) -> nb::Result<u8, Self::Error>;

    /// Queues all of `bytes` for transmission.
    fn write_all(&mut self, bytes: &[u8]) -> Result<(), Self::Error>;

    /// Blocks until every queued byte has left the transmitter.
    fn flush(&mut self) -> Result<(), Self::Error>;
}

impl<T: ModemTransport + ?Sized> ModemTransport for &mut T {
    type Error = T::Error;

    fn read_byte(&mut self) -> nb::Result<u8, Self::Error> {
        (**self).read_byte()
    }

    fn write_all(&mut self, bytes: &[u8]) -> Result<(), Self::Error> {
        (**self).write_all(bytes)
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        (**self).flush()
    }
}
