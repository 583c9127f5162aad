//! Buffered zstd compression for byte strings, streams and files.
//!
//! Every entry point runs the codec in fixed-size steps: input is taken from a
//! source buffer, output is collected in a destination buffer that is either
//! flushed to a sink, drained by the caller or grown in place.

pub mod buffer;
mod context;
pub mod dictionary;
pub mod errors;
pub mod file;
pub mod lock;
pub mod oneshot;
pub mod option;
pub mod read;
pub mod session;
pub mod stream;
pub mod transform;
pub mod write;

pub use dictionary::{Dictionary, FinalizeOptions, TrainOptions};
pub use errors::{Error, Result};
pub use option::{CompressorOptions, DecompressorOptions, OptionMap, OptionValue, Strategy};
pub use session::{Compressor, Decompressor};

/// Version of the linked zstd library, e.g. `"1.5.5"`.
pub fn library_version() -> String {
    let number = unsafe { zstd_sys::ZSTD_versionNumber() };
    format!("{}.{}.{}", number / 10000, number / 100 % 100, number % 100)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_is_dotted() {
        let version = library_version();
        assert_eq!(version.split('.').count(), 3);
        assert!(version.starts_with("1."));
    }
}
