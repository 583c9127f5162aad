//! zstd dictionaries: training, finalizing and inspection.

use std::ffi::c_void;
use std::os::raw::{c_int, c_uint};
use std::sync::Arc;

use byteorder::{ByteOrder, LE};
use bytesize::ByteSize;
use log::debug;

use crate::buffer::allocate;
use crate::errors::*;
use crate::lock::LockMode;
use crate::option::compression_level_bounds;

/// Leading bytes of a dictionary produced by the trainer.
pub const DICTIONARY_MAGIC_NUMBER: u32 = 0xEC30_A437;

/// Capacity used when training or finalizing with a zero capacity.
pub const DEFAULT_CAPACITY: usize = 110 * 1024;

/// An immutable dictionary blob, cheap to clone.
#[derive(Clone, PartialEq, Eq)]
pub struct Dictionary {
    buffer: Arc<[u8]>,
}

impl std::fmt::Debug for Dictionary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dictionary")
            .field("len", &self.buffer.len())
            .field("id", &self.id())
            .finish()
    }
}

#[derive(Debug, Clone, Default)]
pub struct TrainOptions {
    /// Dictionary capacity; 0 means [`DEFAULT_CAPACITY`].
    pub capacity: usize,
    pub use_global_lock: bool,
}

#[derive(Debug, Clone, Default)]
pub struct FinalizeOptions {
    /// Maximum dictionary size; 0 means [`DEFAULT_CAPACITY`].
    pub max_size: usize,
    /// Level the statistics are tuned for; 0 means the library default.
    pub compression_level: i32,
    pub notification_level: u32,
    /// 0 picks an id derived from the content.
    pub dictionary_id: u32,
    pub use_global_lock: bool,
}

impl Dictionary {
    /// # Errors
    ///
    /// This returns [`Error::ValidateFailed`] if `buffer` is empty.
    pub fn new<B: AsRef<[u8]>>(buffer: B) -> Result<Self> {
        let buffer = buffer.as_ref();
        if buffer.is_empty() {
            return Err(Error::validate("dictionary buffer should not be empty"));
        }
        Ok(Self {
            buffer: Arc::from(buffer),
        })
    }

    /// Trains a dictionary from `samples`.
    pub fn train<S: AsRef<[u8]>>(samples: &[S], options: &TrainOptions) -> Result<Self> {
        let samples = Samples::collect(samples)?;
        let capacity = if options.capacity == 0 {
            DEFAULT_CAPACITY
        } else {
            options.capacity
        };

        let mut buffer = allocate(capacity)?;
        let size = LockMode::from_flag(options.use_global_lock).run(|| unsafe {
            zstd_sys::ZDICT_trainFromBuffer(
                buffer.as_mut_ptr() as *mut c_void,
                buffer.len(),
                samples.buffer.as_ptr() as *const c_void,
                samples.sizes.as_ptr(),
                samples.count,
            )
        });
        let size = check(size)?;
        buffer.truncate(size);

        debug!(
            "trained dictionary: {} from {} samples ({})",
            ByteSize(size as u64),
            samples.count,
            ByteSize(samples.buffer.len() as u64)
        );
        Self::new(buffer)
    }

    /// Builds a dictionary from raw `content`, adding entropy tables computed
    /// from `samples`.
    pub fn finalize<S: AsRef<[u8]>>(
        content: &[u8],
        samples: &[S],
        options: &FinalizeOptions,
    ) -> Result<Self> {
        if content.is_empty() {
            return Err(Error::validate("content should not be empty"));
        }
        let samples = Samples::collect(samples)?;

        if options.compression_level != 0
            && !compression_level_bounds()?.contains(&options.compression_level)
        {
            return Err(Error::validate("invalid compression level"));
        }

        let max_size = if options.max_size == 0 {
            DEFAULT_CAPACITY
        } else {
            options.max_size
        };

        let parameters = zstd_sys::ZDICT_params_t {
            compressionLevel: options.compression_level as c_int,
            notificationLevel: options.notification_level as c_uint,
            dictID: options.dictionary_id as c_uint,
        };

        let mut buffer = allocate(max_size)?;
        let size = LockMode::from_flag(options.use_global_lock).run(|| unsafe {
            zstd_sys::ZDICT_finalizeDictionary(
                buffer.as_mut_ptr() as *mut c_void,
                buffer.len(),
                content.as_ptr() as *const c_void,
                content.len(),
                samples.buffer.as_ptr() as *const c_void,
                samples.sizes.as_ptr(),
                samples.count,
                parameters,
            )
        });
        let size = check(size)?;
        buffer.truncate(size);

        debug!(
            "finalized dictionary: {} from {} of content",
            ByteSize(size as u64),
            ByteSize(content.len() as u64)
        );
        Self::new(buffer)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Always `false`; an empty dictionary can't be constructed.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// The dictionary id, or `None` for a raw content dictionary.
    pub fn id(&self) -> Option<u32> {
        let id = unsafe {
            zstd_sys::ZDICT_getDictID(self.buffer.as_ptr() as *const c_void, self.buffer.len())
        };
        if id == 0 {
            None
        } else {
            Some(id)
        }
    }

    /// Size of the dictionary header (magic, id and entropy tables).
    pub fn header_size(&self) -> Result<usize> {
        let size = unsafe {
            zstd_sys::ZDICT_getDictHeaderSize(
                self.buffer.as_ptr() as *const c_void,
                self.buffer.len(),
            )
        };
        check(size)
    }

    /// Whether the blob starts with [`DICTIONARY_MAGIC_NUMBER`]. Anything else
    /// is loaded as raw content.
    pub fn is_structured(&self) -> bool {
        self.buffer.get(..4).map(LE::read_u32) == Some(DICTIONARY_MAGIC_NUMBER)
    }
}

/// Samples flattened into one buffer, as the trainer expects them.
struct Samples {
    buffer: Vec<u8>,
    sizes: Vec<usize>,
    count: c_uint,
}

impl Samples {
    fn collect<S: AsRef<[u8]>>(samples: &[S]) -> Result<Self> {
        let count = c_uint::try_from(samples.len())
            .map_err(|_| Error::validate("too many dictionary samples"))?;

        let mut total = 0_usize;
        for sample in samples {
            let sample = sample.as_ref();
            if sample.is_empty() {
                return Err(Error::validate("dictionary sample should not be empty"));
            }
            total += sample.len();
        }

        let mut buffer = Vec::new();
        buffer
            .try_reserve_exact(total)
            .map_err(|_| Error::AllocateFailed)?;
        let mut sizes = Vec::with_capacity(samples.len());
        for sample in samples {
            let sample = sample.as_ref();
            buffer.extend_from_slice(sample);
            sizes.push(sample.len());
        }

        Ok(Self {
            buffer,
            sizes,
            count,
        })
    }
}
