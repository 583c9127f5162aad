//! The single-step contract between the buffer pumps and a streaming codec.

use zstd_sys::ZSTD_EndDirective;

use crate::context::{CompressionContext, DecompressionContext};
use crate::errors::*;
use crate::lock::LockMode;
use crate::option::{CompressorOptions, DecompressorOptions};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Directive {
    /// Take input, emit output when convenient.
    Continue,
    /// Emit everything buffered so far.
    Flush,
    /// Emit everything and close the frame.
    End,
}

impl From<Directive> for ZSTD_EndDirective {
    fn from(directive: Directive) -> Self {
        match directive {
            Directive::Continue => ZSTD_EndDirective::ZSTD_e_continue,
            Directive::Flush => ZSTD_EndDirective::ZSTD_e_flush,
            Directive::End => ZSTD_EndDirective::ZSTD_e_end,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// Compressor: output is still buffered. Decompressor: the frame may
    /// need more input.
    Pending,
    /// Compressor: fully flushed. Decompressor: a frame was completed.
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Step {
    pub consumed: usize,
    pub produced: usize,
    pub completion: Completion,
}

impl Step {
    pub fn made_progress(&self) -> bool {
        self.consumed != 0 || self.produced != 0
    }
}

/// A stateful chunked transform.
///
/// `step` calls the codec exactly once; it never reads past `input` nor
/// writes past `output`.
pub trait Transform {
    fn step(&mut self, input: &[u8], output: &mut [u8], directive: Directive) -> Result<Step>;

    /// Called once the source is exhausted; fails if the data so far is not
    /// a complete stream.
    fn end_of_input(&self) -> Result<()> {
        Ok(())
    }
}

pub struct CompressTransform {
    context: CompressionContext,
    lock: LockMode,
}

impl CompressTransform {
    pub fn new(options: &CompressorOptions) -> Result<Self> {
        Ok(Self {
            context: CompressionContext::new(options)?,
            lock: options.lock_mode(),
        })
    }
}

impl Transform for CompressTransform {
    fn step(&mut self, input: &[u8], output: &mut [u8], directive: Directive) -> Result<Step> {
        let context = &mut self.context;
        let progress = self
            .lock
            .run(|| context.compress_stream(input, output, directive.into()))?;
        Ok(Step {
            consumed: progress.consumed,
            produced: progress.produced,
            completion: if progress.hint == 0 {
                Completion::Done
            } else {
                Completion::Pending
            },
        })
    }
}

pub struct DecompressTransform {
    context: DecompressionContext,
    lock: LockMode,
    /// A frame has been started and not yet completed.
    in_frame: bool,
}

impl DecompressTransform {
    pub fn new(options: &DecompressorOptions) -> Result<Self> {
        Ok(Self {
            context: DecompressionContext::new(options)?,
            lock: options.lock_mode(),
            in_frame: false,
        })
    }
}

impl Transform for DecompressTransform {
    fn step(&mut self, input: &[u8], output: &mut [u8], _directive: Directive) -> Result<Step> {
        let context = &mut self.context;
        let progress = self
            .lock
            .run(|| context.decompress_stream(input, output))?;

        let completion = if progress.hint == 0 {
            self.in_frame = false;
            Completion::Done
        } else {
            if progress.consumed != 0 {
                self.in_frame = true;
            }
            Completion::Pending
        };
        Ok(Step {
            consumed: progress.consumed,
            produced: progress.produced,
            completion,
        })
    }

    fn end_of_input(&self) -> Result<()> {
        if self.in_frame {
            return Err(Error::CorruptedSource);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compress_end_reports_done() {
        let mut transform = CompressTransform::new(&CompressorOptions::default()).unwrap();
        let mut output = vec![0_u8; 256];
        let step = transform.step(b"abc", &mut output, Directive::End).unwrap();
        assert_eq!(step.consumed, 3);
        assert!(step.produced > 0);
        assert_eq!(step.completion, Completion::Done);
    }

    #[test]
    fn compress_with_zero_output_is_pending() {
        let mut transform = CompressTransform::new(&CompressorOptions::default()).unwrap();
        let step = transform.step(b"abc", &mut [], Directive::End).unwrap();
        assert_eq!(step.produced, 0);
        assert_eq!(step.completion, Completion::Pending);
    }

    #[test]
    fn half_frame_is_not_a_complete_stream() {
        let mut compressor = CompressTransform::new(&CompressorOptions::default()).unwrap();
        let mut frame = vec![0_u8; 256];
        let step = compressor
            .step(b"some data to compress", &mut frame, Directive::End)
            .unwrap();
        frame.truncate(step.produced);

        let options = DecompressorOptions {
            use_global_lock: true,
            ..Default::default()
        };
        let mut decompressor = DecompressTransform::new(&options).unwrap();
        let mut output = vec![0_u8; 256];
        decompressor.end_of_input().unwrap();

        let step = decompressor
            .step(&frame[..frame.len() - 2], &mut output, Directive::Continue)
            .unwrap();
        assert_eq!(step.completion, Completion::Pending);
        assert!(matches!(
            decompressor.end_of_input(),
            Err(Error::CorruptedSource)
        ));

        let step = decompressor
            .step(&frame[frame.len() - 2..], &mut output[step.produced..], Directive::Continue)
            .unwrap();
        assert_eq!(step.completion, Completion::Done);
        decompressor.end_of_input().unwrap();
    }
}
