//! Compressor and decompressor that do a direct stream-to-stream process
//! through two fixed, reusable buffers.

use std::io::{Read, Write};

use bytesize::ByteSize;
use log::debug;

use crate::buffer::{DestinationBuffer, Refill, SourceBuffer};
use crate::errors::*;
use crate::option::{CompressorOptions, DecompressorOptions};
use crate::transform::{Completion, CompressTransform, DecompressTransform, Directive, Transform};

/// Compress `reader` to `writer`.
///
/// Bytes already flushed to `writer` stay there if this fails.
pub fn compress<R, W>(reader: &mut R, writer: &mut W, options: &CompressorOptions) -> Result<()>
where
    R: Read,
    W: Write,
{
    options.validate()?;
    let mut transform = CompressTransform::new(options)?;
    let mut pump = Pump::new(options.source_length(), options.destination_length())?;
    debug!(
        "compress stream: source buffer {}, destination buffer {}",
        ByteSize(options.source_length() as u64),
        ByteSize(options.destination_length() as u64)
    );

    pump.read_source(&mut transform, reader, writer)?;
    pump.finish(&mut transform, writer)?;
    pump.complete(writer)
}

/// Decompress `reader` to `writer`.
pub fn decompress<R, W>(
    reader: &mut R,
    writer: &mut W,
    options: &DecompressorOptions,
) -> Result<()>
where
    R: Read,
    W: Write,
{
    options.validate()?;
    let mut transform = DecompressTransform::new(options)?;
    let mut pump = Pump::new(options.source_length(), options.destination_length())?;
    debug!(
        "decompress stream: source buffer {}, destination buffer {}",
        ByteSize(options.source_length() as u64),
        ByteSize(options.destination_length() as u64)
    );

    pump.read_source(&mut transform, reader, writer)?;
    transform.end_of_input()?;
    pump.complete(writer)
}

/// Drives any [`Transform`] from a reader to a writer.
pub struct Pump {
    source: SourceBuffer,
    destination: DestinationBuffer,
    read_total: u64,
    written_total: u64,
}

impl Pump {
    pub fn new(source_length: usize, destination_length: usize) -> Result<Self> {
        Ok(Self {
            source: SourceBuffer::new(source_length)?,
            destination: DestinationBuffer::new(destination_length)?,
            read_total: 0,
            written_total: 0,
        })
    }

    /// Feeds the whole source through `transform`, flushing the destination
    /// whenever it fills up. The transform is called at least once, even for
    /// an empty source.
    pub fn read_source<T, R, W>(
        &mut self,
        transform: &mut T,
        reader: &mut R,
        writer: &mut W,
    ) -> Result<()>
    where
        T: Transform,
        R: Read,
        W: Write,
    {
        let mut transform_called = false;

        loop {
            match self.source.refill(reader)? {
                Refill::Read(read_size) => self.read_total += read_size as u64,
                Refill::Finished => break,
            }
            self.transform_pending(transform, writer)?;
            transform_called = true;
        }

        // a frame may end inside the last read, leaving the next frame pending
        while !self.source.pending().is_empty() {
            if !self.transform_pending(transform, writer)? {
                return Err(Error::ReadIo(std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    "source remainder was not consumed",
                )));
            }
            transform_called = true;
        }

        if !transform_called {
            self.transform_pending(transform, writer)?;
        }
        Ok(())
    }

    /// Steps `transform` over the pending source until it stops filling the
    /// destination. Returns whether anything was consumed or produced.
    fn transform_pending<T, W>(&mut self, transform: &mut T, writer: &mut W) -> Result<bool>
    where
        T: Transform,
        W: Write,
    {
        let mut progress = false;
        loop {
            let step = transform.step(
                self.source.pending(),
                self.destination.free(),
                Directive::Continue,
            )?;
            self.source.consume(step.consumed);
            self.destination.advance(step.produced);
            progress |= step.made_progress();

            if self.destination.is_full() {
                self.flush(writer)?;
                continue;
            }
            return Ok(progress);
        }
    }

    /// Ends the stream: steps with [`Directive::End`] and no input until the
    /// transform reports it is fully flushed.
    pub fn finish<T, W>(&mut self, transform: &mut T, writer: &mut W) -> Result<()>
    where
        T: Transform,
        W: Write,
    {
        loop {
            let step = transform.step(&[], self.destination.free(), Directive::End)?;
            self.destination.advance(step.produced);

            if step.completion == Completion::Pending {
                self.flush(writer)?;
                continue;
            }
            return Ok(());
        }
    }

    /// Writes what is left in the destination and flushes `writer`.
    pub fn complete<W: Write>(&mut self, writer: &mut W) -> Result<()> {
        self.written_total += self.destination.filled().len() as u64;
        self.destination.write_remaining(writer)?;
        writer.flush().map_err(Error::WriteIo)?;
        debug!(
            "stream done: read {}, wrote {}",
            ByteSize(self.read_total),
            ByteSize(self.written_total)
        );
        Ok(())
    }

    fn flush<W: Write>(&mut self, writer: &mut W) -> Result<()> {
        let length = self.destination.filled().len() as u64;
        self.destination.flush(writer)?;
        self.written_total += length;
        Ok(())
    }
}
