//! Source and destination buffers shared by the stream pump, the one-shot
//! functions and the incremental sessions.

use std::io::{ErrorKind, Read, Write};

use log::trace;

use crate::errors::*;

/// Recommended input chunk for the compressor (`ZSTD_CStreamInSize`).
pub fn compressor_source_length() -> usize {
    unsafe { zstd_sys::ZSTD_CStreamInSize() }
}

/// Recommended output chunk for the compressor (`ZSTD_CStreamOutSize`).
pub fn compressor_destination_length() -> usize {
    unsafe { zstd_sys::ZSTD_CStreamOutSize() }
}

/// Recommended input chunk for the decompressor (`ZSTD_DStreamInSize`).
pub fn decompressor_source_length() -> usize {
    unsafe { zstd_sys::ZSTD_DStreamInSize() }
}

/// Recommended output chunk for the decompressor (`ZSTD_DStreamOutSize`).
pub fn decompressor_destination_length() -> usize {
    unsafe { zstd_sys::ZSTD_DStreamOutSize() }
}

/// Allocates a zeroed buffer, reporting failure instead of aborting.
pub(crate) fn allocate(length: usize) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    buffer
        .try_reserve_exact(length)
        .map_err(|_| Error::AllocateFailed)?;
    buffer.resize(length, 0);
    Ok(buffer)
}

#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Refill {
    Read(usize),
    Finished,
}

/// Fixed-capacity input buffer refilled from a reader.
///
/// `consumed <= filled <= capacity` always holds; bytes in
/// `consumed..filled` have been read but not handed off yet.
pub(crate) struct SourceBuffer {
    buffer: Vec<u8>,
    consumed: usize,
    filled: usize,
}

impl SourceBuffer {
    pub(crate) fn new(capacity: usize) -> Result<Self> {
        Ok(Self {
            buffer: allocate(capacity)?,
            consumed: 0,
            filled: 0,
        })
    }

    pub(crate) fn pending(&self) -> &[u8] {
        &self.buffer[self.consumed..self.filled]
    }

    pub(crate) fn consume(&mut self, length: usize) {
        debug_assert!(self.consumed + length <= self.filled);
        self.consumed += length;
    }

    /// Moves the pending tail to the buffer start and reads more data into
    /// the free space behind it.
    pub(crate) fn refill<R: Read>(&mut self, reader: &mut R) -> Result<Refill> {
        if self.consumed != 0 {
            self.buffer.copy_within(self.consumed..self.filled, 0);
            self.filled -= self.consumed;
            self.consumed = 0;
        }

        if self.filled == self.buffer.len() {
            // the whole buffer is pending and can't take more
            return Err(Error::NotEnoughSourceBuffer);
        }

        loop {
            match reader.read(&mut self.buffer[self.filled..]) {
                Ok(0) => return Ok(Refill::Finished),
                Ok(read_size) => {
                    self.filled += read_size;
                    return Ok(Refill::Read(read_size));
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(Error::ReadIo(e)),
            }
        }
    }
}

/// Fixed-capacity output buffer. The stream pump flushes it into a writer,
/// the incremental sessions drain it into owned chunks.
pub(crate) struct DestinationBuffer {
    buffer: Vec<u8>,
    filled: usize,
}

impl DestinationBuffer {
    pub(crate) fn new(capacity: usize) -> Result<Self> {
        Ok(Self {
            buffer: allocate(capacity)?,
            filled: 0,
        })
    }

    pub(crate) fn free(&mut self) -> &mut [u8] {
        &mut self.buffer[self.filled..]
    }

    pub(crate) fn advance(&mut self, length: usize) {
        debug_assert!(self.filled + length <= self.buffer.len());
        self.filled += length;
    }

    pub(crate) fn filled(&self) -> &[u8] {
        &self.buffer[..self.filled]
    }

    pub(crate) fn is_full(&self) -> bool {
        self.filled == self.buffer.len()
    }

    /// Writes the filled region and rewinds.
    ///
    /// Fails with [`Error::NotEnoughDestinationBuffer`] when nothing has been
    /// produced, as the caller needs more room than the buffer has.
    pub(crate) fn flush<W: Write>(&mut self, writer: &mut W) -> Result<()> {
        if self.filled == 0 {
            return Err(Error::NotEnoughDestinationBuffer);
        }
        trace!("flush {} bytes of destination", self.filled);
        writer
            .write_all(&self.buffer[..self.filled])
            .map_err(Error::WriteIo)?;
        self.filled = 0;
        Ok(())
    }

    pub(crate) fn write_remaining<W: Write>(&mut self, writer: &mut W) -> Result<()> {
        if self.filled == 0 {
            return Ok(());
        }
        self.flush(writer)
    }

    /// Returns everything written since the last drain and rewinds.
    pub(crate) fn drain(&mut self) -> Vec<u8> {
        let result = self.buffer[..self.filled].to_vec();
        self.filled = 0;
        result
    }
}

/// Output buffer that grows by one capacity unit each time it runs out.
pub(crate) struct GrowableBuffer {
    buffer: Vec<u8>,
    filled: usize,
    unit: usize,
}

impl GrowableBuffer {
    pub(crate) fn new(unit: usize) -> Result<Self> {
        Ok(Self {
            buffer: allocate(unit)?,
            filled: 0,
            unit,
        })
    }

    pub(crate) fn free(&mut self) -> &mut [u8] {
        &mut self.buffer[self.filled..]
    }

    pub(crate) fn advance(&mut self, length: usize) {
        debug_assert!(self.filled + length <= self.buffer.len());
        self.filled += length;
    }

    pub(crate) fn is_full(&self) -> bool {
        self.filled == self.buffer.len()
    }

    /// Resizes to `filled + unit`.
    ///
    /// Fails with [`Error::NotEnoughDestinationBuffer`] if the free space is
    /// still a whole unit, i.e. nothing was produced since the last growth.
    pub(crate) fn grow(&mut self) -> Result<()> {
        if self.buffer.len() - self.filled == self.unit {
            return Err(Error::NotEnoughDestinationBuffer);
        }
        let length = self.filled + self.unit;
        self.buffer
            .try_reserve(length.saturating_sub(self.buffer.len()))
            .map_err(|_| Error::AllocateFailed)?;
        self.buffer.resize(length, 0);
        trace!("destination grown to {} bytes", length);
        Ok(())
    }

    pub(crate) fn into_vec(mut self) -> Vec<u8> {
        self.buffer.truncate(self.filled);
        self.buffer.shrink_to_fit();
        self.buffer
    }
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::io::Cursor;

    use super::*;

    /// Yields at most `chunk` bytes per read and starts with an interruption.
    struct Trickle {
        data: Cursor<Vec<u8>>,
        chunk: usize,
        interrupted: bool,
    }

    impl Read for Trickle {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if !self.interrupted {
                self.interrupted = true;
                return Err(io::Error::new(ErrorKind::Interrupted, "again"));
            }
            let length = buf.len().min(self.chunk);
            self.data.read(&mut buf[..length])
        }
    }

    #[test]
    fn source_refill_compacts_pending_tail() {
        let mut reader = Trickle {
            data: Cursor::new(b"abcdefgh".to_vec()),
            chunk: 3,
            interrupted: false,
        };
        let mut source = SourceBuffer::new(4).unwrap();

        assert_eq!(source.refill(&mut reader).unwrap(), Refill::Read(3));
        assert_eq!(source.pending(), b"abc");
        source.consume(2);

        assert_eq!(source.refill(&mut reader).unwrap(), Refill::Read(3));
        assert_eq!(source.pending(), b"cdef");

        assert!(matches!(
            source.refill(&mut reader),
            Err(Error::NotEnoughSourceBuffer)
        ));

        source.consume(4);
        assert_eq!(source.refill(&mut reader).unwrap(), Refill::Read(2));
        assert_eq!(source.pending(), b"gh");
        source.consume(2);
        assert_eq!(source.refill(&mut reader).unwrap(), Refill::Finished);
        assert!(source.pending().is_empty());
    }

    #[test]
    fn source_read_error_is_read_io() {
        struct Broken;
        impl Read for Broken {
            fn read(&mut self, _: &mut [u8]) -> io::Result<usize> {
                Err(io::Error::new(ErrorKind::Other, "broken"))
            }
        }
        let mut source = SourceBuffer::new(4).unwrap();
        assert!(matches!(source.refill(&mut Broken), Err(Error::ReadIo(_))));
    }

    #[test]
    fn destination_flush_policy() {
        let mut sink = Vec::new();
        let mut destination = DestinationBuffer::new(4).unwrap();

        assert!(matches!(
            destination.flush(&mut sink),
            Err(Error::NotEnoughDestinationBuffer)
        ));
        destination.write_remaining(&mut sink).unwrap();
        assert!(sink.is_empty());

        destination.free()[..4].copy_from_slice(b"wxyz");
        destination.advance(4);
        assert!(destination.is_full());
        destination.flush(&mut sink).unwrap();
        assert_eq!(destination.free().len(), 4);

        destination.free()[..1].copy_from_slice(b"!");
        destination.advance(1);
        assert_eq!(destination.filled(), b"!");
        destination.write_remaining(&mut sink).unwrap();
        assert_eq!(sink, b"wxyz!");
    }

    #[test]
    fn destination_drain_rewinds() {
        let mut destination = DestinationBuffer::new(8).unwrap();
        destination.free()[..3].copy_from_slice(b"abc");
        destination.advance(3);
        assert_eq!(destination.drain(), b"abc");
        assert!(destination.drain().is_empty());
        assert_eq!(destination.free().len(), 8);
    }

    #[test]
    fn growable_buffer_grows_linearly() {
        let mut destination = GrowableBuffer::new(4).unwrap();
        assert!(matches!(
            destination.grow(),
            Err(Error::NotEnoughDestinationBuffer)
        ));

        destination.free().copy_from_slice(b"1234");
        destination.advance(4);
        assert!(destination.is_full());
        destination.grow().unwrap();
        assert_eq!(destination.free().len(), 4);

        destination.free()[..2].copy_from_slice(b"56");
        destination.advance(2);
        destination.grow().unwrap();
        assert_eq!(destination.free().len(), 4);

        assert_eq!(destination.into_vec(), b"123456");
    }
}
