//! Path-based compression on top of the stream pump.

use std::fs::File;
use std::path::Path;

use log::debug;

use crate::errors::*;
use crate::option::{CompressorOptions, DecompressorOptions};
use crate::stream;

/// Compresses the file at `source` into a new file at `destination`.
///
/// The source size is pledged into the frame header unless
/// `options.pledged_size` is set.
pub fn compress<S, D>(source: S, destination: D, options: &CompressorOptions) -> Result<()>
where
    S: AsRef<Path>,
    D: AsRef<Path>,
{
    let (source, destination) = (source.as_ref(), destination.as_ref());
    let mut reader = File::open(source).map_err(Error::AccessIo)?;
    let mut options = options.clone();
    if options.pledged_size.is_none() {
        let metadata = reader.metadata().map_err(Error::AccessIo)?;
        options.pledged_size = Some(metadata.len());
    }
    let mut writer = File::create(destination).map_err(Error::AccessIo)?;

    debug!(
        "compress file {} -> {}",
        source.display(),
        destination.display()
    );
    stream::compress(&mut reader, &mut writer, &options)
}

/// Decompresses the file at `source` into a new file at `destination`.
pub fn decompress<S, D>(source: S, destination: D, options: &DecompressorOptions) -> Result<()>
where
    S: AsRef<Path>,
    D: AsRef<Path>,
{
    let (source, destination) = (source.as_ref(), destination.as_ref());
    let mut reader = File::open(source).map_err(Error::AccessIo)?;
    let mut writer = File::create(destination).map_err(Error::AccessIo)?;

    debug!(
        "decompress file {} -> {}",
        source.display(),
        destination.display()
    );
    stream::decompress(&mut reader, &mut writer, options)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    #[test]
    fn file_round_trip_pledges_the_size() {
        let dir = tempfile::tempdir().unwrap();
        let plain = dir.path().join("plain.txt");
        let packed = dir.path().join("plain.txt.zst");
        let unpacked = dir.path().join("unpacked.txt");

        let data = b"file contents, file contents, file contents\n".repeat(100);
        fs::write(&plain, &data).unwrap();

        compress(&plain, &packed, &CompressorOptions::default()).unwrap();
        let frame = fs::read(&packed).unwrap();
        let content_size =
            unsafe { zstd_sys::ZSTD_getFrameContentSize(frame.as_ptr().cast(), frame.len()) };
        assert_eq!(content_size, data.len() as u64);

        decompress(&packed, &unpacked, &DecompressorOptions::default()).unwrap();
        assert_eq!(fs::read(&unpacked).unwrap(), data);
    }

    #[test]
    fn missing_source_is_access_io() {
        let dir = tempfile::tempdir().unwrap();
        let result = compress(
            dir.path().join("missing"),
            dir.path().join("out"),
            &CompressorOptions::default(),
        );
        assert!(matches!(result, Err(Error::AccessIo(_))));
        assert!(!dir.path().join("out").exists());

        let result = decompress(
            dir.path().join("missing"),
            dir.path().join("out"),
            &DecompressorOptions::default(),
        );
        assert!(matches!(result, Err(Error::AccessIo(_))));
    }

    #[test]
    fn uncreatable_destination_is_access_io() {
        let dir = tempfile::tempdir().unwrap();
        let plain = dir.path().join("plain");
        fs::write(&plain, b"x").unwrap();
        let result = compress(
            &plain,
            dir.path().join("no/such/dir/out"),
            &CompressorOptions::default(),
        );
        assert!(matches!(result, Err(Error::AccessIo(_))));
    }
}
