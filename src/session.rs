//! Incremental compressor and decompressor sessions.
//!
//! A session owns one codec context and one fixed destination buffer. The
//! caller pushes input, drains the result whenever the destination fills up,
//! and closes the session when done.

use std::mem;

use crate::buffer::DestinationBuffer;
use crate::errors::*;
use crate::option::{CompressorOptions, DecompressorOptions};
use crate::transform::{
    Completion, CompressTransform, DecompressTransform, Directive, Step, Transform,
};

struct Inner<T> {
    transform: T,
    destination: DestinationBuffer,
}

impl<T: Transform> Inner<T> {
    fn step(&mut self, input: &[u8], directive: Directive) -> Result<Step> {
        let step = self
            .transform
            .step(input, self.destination.free(), directive)?;
        self.destination.advance(step.produced);
        Ok(step)
    }
}

enum State<T> {
    Open(Inner<T>),
    /// The frame is closed, only the result can still be drained.
    Finished(Inner<T>),
    Closed,
}

impl<T: Transform> State<T> {
    fn open(&mut self) -> Result<&mut Inner<T>> {
        match self {
            State::Open(inner) => Ok(inner),
            _ => Err(Error::UsedAfterClose),
        }
    }

    fn readable(&mut self) -> Result<&mut Inner<T>> {
        match self {
            State::Open(inner) | State::Finished(inner) => Ok(inner),
            State::Closed => Err(Error::UsedAfterClose),
        }
    }

    fn push(&mut self, chunk: &[u8]) -> Result<(usize, bool)> {
        let inner = self.open()?;
        let step = inner.step(chunk, Directive::Continue)?;
        Ok((step.consumed, inner.destination.is_full()))
    }

    fn drain_result(&mut self) -> Result<Vec<u8>> {
        Ok(self.readable()?.destination.drain())
    }
}

pub struct Compressor {
    state: State<CompressTransform>,
}

impl Compressor {
    pub fn new(options: &CompressorOptions) -> Result<Self> {
        options.validate()?;
        Ok(Self {
            state: State::Open(Inner {
                transform: CompressTransform::new(options)?,
                destination: DestinationBuffer::new(options.destination_length())?,
            }),
        })
    }

    /// Feeds `chunk` to the compressor.
    ///
    /// Returns the number of bytes consumed and whether the destination is
    /// full. A full destination has to be drained with
    /// [`Compressor::drain_result`] before more progress can be made.
    pub fn push(&mut self, chunk: &[u8]) -> Result<(usize, bool)> {
        self.state.push(chunk)
    }

    /// Flushes the data buffered in the codec so far. Returns `true` while
    /// more output is pending, in which case the result has to be drained
    /// and `flush` called again.
    pub fn flush(&mut self) -> Result<bool> {
        let step = self.state.open()?.step(&[], Directive::Flush)?;
        Ok(step.completion == Completion::Pending)
    }

    /// Ends the frame. Returns `true` while more output is pending; once it
    /// returns `false` the session is finished and accepts no more input.
    pub fn finish(&mut self) -> Result<bool> {
        let step = self.state.open()?.step(&[], Directive::End)?;
        if step.completion == Completion::Pending {
            return Ok(true);
        }
        if let State::Open(inner) = mem::replace(&mut self.state, State::Closed) {
            self.state = State::Finished(inner);
        }
        Ok(false)
    }

    /// Takes the bytes produced since the last drain.
    pub fn drain_result(&mut self) -> Result<Vec<u8>> {
        self.state.drain_result()
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.state, State::Finished(_))
    }

    pub fn is_closed(&self) -> bool {
        matches!(self.state, State::Closed)
    }

    /// Releases the context and the buffer. Closing twice is a no-op.
    pub fn close(&mut self) {
        self.state = State::Closed;
    }
}

pub struct Decompressor {
    state: State<DecompressTransform>,
}

impl Decompressor {
    pub fn new(options: &DecompressorOptions) -> Result<Self> {
        options.validate()?;
        Ok(Self {
            state: State::Open(Inner {
                transform: DecompressTransform::new(options)?,
                destination: DestinationBuffer::new(options.destination_length())?,
            }),
        })
    }

    /// Feeds `chunk` to the decompressor, see [`Compressor::push`].
    pub fn push(&mut self, chunk: &[u8]) -> Result<(usize, bool)> {
        self.state.push(chunk)
    }

    pub fn drain_result(&mut self) -> Result<Vec<u8>> {
        self.state.drain_result()
    }

    /// Checks that the input pushed so far ends on a frame boundary.
    ///
    /// # Errors
    ///
    /// This returns [`Error::CorruptedSource`] if a frame is incomplete.
    pub fn end_of_input(&mut self) -> Result<()> {
        self.state.readable()?.transform.end_of_input()
    }

    pub fn is_closed(&self) -> bool {
        matches!(self.state, State::Closed)
    }

    /// Releases the context and the buffer. Closing twice is a no-op.
    pub fn close(&mut self) {
        self.state = State::Closed;
    }
}
