//! Read-based zstd compressor and decompressor.

use std::io;
use std::io::Read;

use crate::buffer::{Refill, SourceBuffer};
use crate::errors::*;
use crate::option::{CompressorOptions, DecompressorOptions};
use crate::session::{Compressor, Decompressor};

/// Output taken from a session that `read` has not handed out yet.
#[derive(Default)]
struct Output {
    buffer: Vec<u8>,
    pos: usize,
}

impl Output {
    fn is_empty(&self) -> bool {
        self.pos == self.buffer.len()
    }

    fn replace(&mut self, buffer: Vec<u8>) {
        self.buffer = buffer;
        self.pos = 0;
    }

    fn copy_to(&mut self, buf: &mut [u8]) -> usize {
        let length = buf.len().min(self.buffer.len() - self.pos);
        buf[..length].copy_from_slice(&self.buffer[self.pos..self.pos + length]);
        self.pos += length;
        length
    }
}

/// Reads plain data from `reader` and serves it compressed.
pub struct Encoder<R>
where
    R: Read,
{
    reader: R,
    source: SourceBuffer,
    session: Compressor,
    output: Output,
    /// the last push filled the destination
    destination_full: bool,
    finishing: bool,
}

impl<R> Encoder<R>
where
    R: Read,
{
    pub fn new(reader: R, options: &CompressorOptions) -> Result<Self> {
        Ok(Self {
            reader,
            source: SourceBuffer::new(options.source_length())?,
            session: Compressor::new(options)?,
            output: Output::default(),
            destination_full: false,
            finishing: false,
        })
    }

    pub fn get_ref(&self) -> &R {
        &self.reader
    }

    pub fn into_inner(self) -> R {
        self.reader
    }

    /// Produces the next piece of output; it may be empty.
    fn fill(&mut self) -> Result<()> {
        if self.finishing {
            self.session.finish()?;
            self.output.replace(self.session.drain_result()?);
            return Ok(());
        }

        if self.source.pending().is_empty() && !self.destination_full {
            if let Refill::Finished = self.source.refill(&mut self.reader)? {
                self.finishing = true;
                return Ok(());
            }
        }
        let (consumed, full) = self.session.push(self.source.pending())?;
        self.source.consume(consumed);
        self.destination_full = full;
        self.output.replace(self.session.drain_result()?);
        Ok(())
    }
}

impl<R> Read for Encoder<R>
where
    R: Read,
{
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        while self.output.is_empty() {
            if self.session.is_finished() {
                return Ok(0);
            }
            self.fill().map_err(Error::into_io_error)?;
        }
        Ok(self.output.copy_to(buf))
    }
}

/// Reads compressed data from `reader` and serves it decompressed.
///
/// A source that ends inside a frame makes `read` fail with
/// [`Error::CorruptedSource`], see [`Error::from_io_error`].
pub struct Decoder<R>
where
    R: Read,
{
    reader: R,
    source: SourceBuffer,
    session: Decompressor,
    output: Output,
    destination_full: bool,
    /// the last push neither consumed nor produced anything
    stalled: bool,
    finished: bool,
}

impl<R> Decoder<R>
where
    R: Read,
{
    pub fn new(reader: R, options: &DecompressorOptions) -> Result<Self> {
        Ok(Self {
            reader,
            source: SourceBuffer::new(options.source_length())?,
            session: Decompressor::new(options)?,
            output: Output::default(),
            destination_full: false,
            stalled: false,
            finished: false,
        })
    }

    pub fn get_ref(&self) -> &R {
        &self.reader
    }

    pub fn into_inner(self) -> R {
        self.reader
    }

    fn fill(&mut self) -> Result<()> {
        let needs_input =
            (self.source.pending().is_empty() && !self.destination_full) || self.stalled;
        if needs_input {
            if let Refill::Finished = self.source.refill(&mut self.reader)? {
                if !self.source.pending().is_empty() {
                    return Err(Error::CorruptedSource);
                }
                self.session.end_of_input()?;
                self.session.close();
                self.finished = true;
                return Ok(());
            }
        }

        let pending = self.source.pending();
        let (consumed, full) = self.session.push(pending)?;
        self.source.consume(consumed);
        self.destination_full = full;
        let chunk = self.session.drain_result()?;
        self.stalled = consumed == 0 && chunk.is_empty();
        self.output.replace(chunk);
        Ok(())
    }
}

impl<R> Read for Decoder<R>
where
    R: Read,
{
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        while self.output.is_empty() {
            if self.finished {
                return Ok(0);
            }
            self.fill().map_err(Error::into_io_error)?;
        }
        Ok(self.output.copy_to(buf))
    }
}
