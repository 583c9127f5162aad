//! Write-based zstd compressor and decompressor.

use std::io;
use std::io::Write;

use crate::errors::*;
use crate::option::{CompressorOptions, DecompressorOptions};
use crate::session::{Compressor, Decompressor};

/// Compresses everything written to it into `writer`.
///
/// Call [`Encoder::finish`] to end the frame and get the writer back. An
/// encoder dropped without finishing still tries to end the frame, ignoring
/// errors.
pub struct Encoder<W>
where
    W: Write,
{
    /// `None` only after `finish` handed the writer out
    writer: Option<W>,
    session: Compressor,
}

impl<W> Encoder<W>
where
    W: Write,
{
    pub fn new(writer: W, options: &CompressorOptions) -> Result<Self> {
        Ok(Self {
            writer: Some(writer),
            session: Compressor::new(options)?,
        })
    }

    pub fn get_ref(&self) -> Option<&W> {
        self.writer.as_ref()
    }

    /// Ends the frame, flushes and returns the inner writer.
    pub fn finish(mut self) -> Result<W> {
        self.finish_frame()?;
        self.writer.take().ok_or(Error::UsedAfterClose)
    }

    fn finish_frame(&mut self) -> Result<()> {
        while self.session.finish()? {
            self.drain()?;
        }
        self.drain()?;
        self.flush_writer()
    }

    /// Moves the compressed bytes from the session to the writer.
    fn drain(&mut self) -> Result<usize> {
        let chunk = self.session.drain_result()?;
        if let Some(writer) = self.writer.as_mut() {
            writer.write_all(&chunk).map_err(Error::WriteIo)?;
        }
        Ok(chunk.len())
    }

    fn flush_writer(&mut self) -> Result<()> {
        match self.writer.as_mut() {
            Some(writer) => writer.flush().map_err(Error::WriteIo),
            None => Ok(()),
        }
    }

    fn write_chunk(&mut self, buf: &[u8]) -> Result<usize> {
        loop {
            let (consumed, full) = self.session.push(buf)?;
            if full && self.drain()? == 0 {
                return Err(Error::NotEnoughDestination);
            }
            if consumed != 0 || buf.is_empty() {
                return Ok(consumed);
            }
            if !full {
                // the codec neither took input nor produced output
                return Err(Error::NotEnoughDestination);
            }
        }
    }

    fn flush_frame(&mut self) -> Result<()> {
        while self.session.flush()? {
            self.drain()?;
        }
        self.drain()?;
        self.flush_writer()
    }
}

impl<W> Drop for Encoder<W>
where
    W: Write,
{
    fn drop(&mut self) {
        if self.writer.is_some() && !self.session.is_finished() {
            let _ = self.finish_frame();
        }
    }
}

impl<W> Write for Encoder<W>
where
    W: Write,
{
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.write_chunk(buf).map_err(Error::into_io_error)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.flush_frame().map_err(Error::into_io_error)
    }
}

/// Decompresses everything written to it into `writer`.
pub struct Decoder<W>
where
    W: Write,
{
    writer: W,
    session: Decompressor,
}

impl<W> Decoder<W>
where
    W: Write,
{
    pub fn new(writer: W, options: &DecompressorOptions) -> Result<Self> {
        Ok(Self {
            writer,
            session: Decompressor::new(options)?,
        })
    }

    pub fn get_ref(&self) -> &W {
        &self.writer
    }

    /// Checks the input ended on a frame boundary and returns the inner
    /// writer.
    ///
    /// # Errors
    ///
    /// This returns [`Error::CorruptedSource`] if the last frame is
    /// incomplete.
    pub fn finish(mut self) -> Result<W> {
        // a full destination may have left output inside the codec
        loop {
            let (_, full) = self.session.push(&[])?;
            let chunk = self.session.drain_result()?;
            self.writer.write_all(&chunk).map_err(Error::WriteIo)?;
            if !full {
                break;
            }
        }
        self.session.end_of_input()?;
        self.writer.flush().map_err(Error::WriteIo)?;
        self.session.close();
        Ok(self.writer)
    }

    fn write_chunk(&mut self, buf: &[u8]) -> Result<usize> {
        loop {
            let (consumed, full) = self.session.push(buf)?;
            let chunk = self.session.drain_result()?;
            self.writer.write_all(&chunk).map_err(Error::WriteIo)?;
            if consumed != 0 || buf.is_empty() {
                return Ok(consumed);
            }
            if !full {
                return Err(Error::CorruptedSource);
            }
        }
    }
}

impl<W> Write for Decoder<W>
where
    W: Write,
{
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.write_chunk(buf).map_err(Error::into_io_error)
    }

    fn flush(&mut self) -> io::Result<()> {
        // output is handed to the writer on every write already
        self.writer.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oneshot;

    fn text() -> Vec<u8> {
        b"the quick brown fox jumps over the lazy dog\n".repeat(300)
    }

    #[test]
    fn encoder_output_decompresses() {
        let data = text();
        let options = CompressorOptions {
            destination_buffer_length: 64,
            ..Default::default()
        };
        let mut encoder = Encoder::new(Vec::new(), &options).unwrap();
        for chunk in data.chunks(100) {
            encoder.write_all(chunk).unwrap();
        }
        let compressed = encoder.finish().unwrap();
        assert_eq!(
            oneshot::decompress(&compressed, &DecompressorOptions::default()).unwrap(),
            data
        );
    }

    #[test]
    fn dropped_encoder_ends_the_frame() {
        let mut compressed = Vec::new();
        {
            let mut encoder = Encoder::new(&mut compressed, &CompressorOptions::default()).unwrap();
            encoder.write_all(b"dropped").unwrap();
        }
        assert_eq!(
            oneshot::decompress(&compressed, &DecompressorOptions::default()).unwrap(),
            b"dropped"
        );
    }

    #[test]
    fn decoder_receives_byte_by_byte() {
        let data = text();
        let compressed = oneshot::compress(&data, &CompressorOptions::default()).unwrap();
        let options = DecompressorOptions {
            destination_buffer_length: 32,
            ..Default::default()
        };
        let mut decoder = Decoder::new(Vec::new(), &options).unwrap();
        for byte in &compressed {
            decoder.write_all(std::slice::from_ref(byte)).unwrap();
        }
        assert_eq!(decoder.finish().unwrap(), data);
    }

    #[test]
    fn decoder_finish_rejects_a_partial_frame() {
        let compressed = oneshot::compress(&text(), &CompressorOptions::default()).unwrap();
        let mut decoder = Decoder::new(Vec::new(), &DecompressorOptions::default()).unwrap();
        decoder
            .write_all(&compressed[..compressed.len() - 3])
            .unwrap();
        assert!(matches!(decoder.finish(), Err(Error::CorruptedSource)));
    }
}
