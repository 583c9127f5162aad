//! Whole-buffer compression and decompression into a growing result.

use bytesize::ByteSize;
use log::debug;

use crate::buffer::GrowableBuffer;
use crate::errors::*;
use crate::option::{CompressorOptions, DecompressorOptions};
use crate::transform::{Completion, CompressTransform, DecompressTransform, Directive, Transform};

/// Compresses `source` into a single frame.
///
/// The frame records `source.len()` as its content size unless
/// `options.pledged_size` says otherwise.
pub fn compress(source: &[u8], options: &CompressorOptions) -> Result<Vec<u8>> {
    options.validate()?;
    let mut options = options.clone();
    options.pledged_size.get_or_insert(source.len() as u64);

    let mut transform = CompressTransform::new(&options)?;
    let mut destination = GrowableBuffer::new(options.destination_length())?;

    let mut remaining = source;
    while !remaining.is_empty() {
        let step = transform.step(remaining, destination.free(), Directive::Continue)?;
        remaining = &remaining[step.consumed..];
        destination.advance(step.produced);
        if destination.is_full() || !step.made_progress() {
            destination.grow()?;
        }
    }

    loop {
        let step = transform.step(&[], destination.free(), Directive::End)?;
        destination.advance(step.produced);
        if step.completion == Completion::Done {
            break;
        }
        destination.grow()?;
    }

    let result = destination.into_vec();
    debug!(
        "compressed {} into {}",
        ByteSize(source.len() as u64),
        ByteSize(result.len() as u64)
    );
    Ok(result)
}

/// Decompresses every frame in `source`.
///
/// # Errors
///
/// A source that ends inside a frame is [`Error::CorruptedSource`].
pub fn decompress(source: &[u8], options: &DecompressorOptions) -> Result<Vec<u8>> {
    options.validate()?;
    let mut transform = DecompressTransform::new(options)?;
    let mut destination = GrowableBuffer::new(options.destination_length())?;

    let mut remaining = source;
    loop {
        let step = transform.step(remaining, destination.free(), Directive::Continue)?;
        remaining = &remaining[step.consumed..];
        destination.advance(step.produced);

        if destination.is_full() {
            destination.grow()?;
            continue;
        }
        if remaining.is_empty() {
            break;
        }
        if !step.made_progress() {
            return Err(Error::CorruptedSource);
        }
    }
    transform.end_of_input()?;

    let result = destination.into_vec();
    debug!(
        "decompressed {} into {}",
        ByteSize(source.len() as u64),
        ByteSize(result.len() as u64)
    );
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<u8> {
        (0..4000_u32)
            .flat_map(|i| format!("line {} of the sample\n", i % 97).into_bytes())
            .collect()
    }

    #[test]
    fn round_trip_with_default_buffers() {
        let data = sample();
        let compressed = compress(&data, &CompressorOptions::default()).unwrap();
        assert!(compressed.len() < data.len());
        let decompressed = decompress(&compressed, &DecompressorOptions::default()).unwrap();
        assert_eq!(decompressed, data);
    }

    #[test]
    fn tiny_destination_unit_grows() {
        let data = sample();
        let compressed = compress(
            &data,
            &CompressorOptions {
                destination_buffer_length: 16,
                compression_level: Some(3),
                ..Default::default()
            },
        )
        .unwrap();
        let decompressed = decompress(
            &compressed,
            &DecompressorOptions {
                destination_buffer_length: 16,
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(decompressed, data);
    }

    #[test]
    fn empty_input_makes_a_frame() {
        let compressed = compress(b"", &CompressorOptions::default()).unwrap();
        assert!(!compressed.is_empty());
        assert!(decompress(&compressed, &DecompressorOptions::default())
            .unwrap()
            .is_empty());
        assert!(decompress(b"", &DecompressorOptions::default())
            .unwrap()
            .is_empty());
    }

    #[test]
    fn concatenated_frames_decompress_together() {
        let mut compressed = compress(b"first,", &CompressorOptions::default()).unwrap();
        compressed.extend(compress(b"second", &CompressorOptions::default()).unwrap());
        let decompressed = decompress(&compressed, &DecompressorOptions::default()).unwrap();
        assert_eq!(decompressed, b"first,second");
    }

    #[test]
    fn truncated_frame_is_corrupted() {
        let compressed = compress(&sample(), &CompressorOptions::default()).unwrap();
        let truncated = &compressed[..compressed.len() / 2];
        assert!(matches!(
            decompress(truncated, &DecompressorOptions::default()),
            Err(Error::CorruptedSource)
        ));
    }

    #[test]
    fn invalid_level_is_rejected_before_work() {
        let options = CompressorOptions {
            compression_level: Some(i32::MAX),
            ..Default::default()
        };
        assert!(matches!(
            compress(b"data", &options),
            Err(Error::ValidateFailed(_))
        ));
    }
}
