//! Owned zstd contexts.
//!
//! A context is created configured, used by exactly one pump or session, and
//! freed on drop.

use std::ffi::c_void;
use std::os::raw::c_ulonglong;

use log::trace;
use zstd_sys::{ZSTD_CCtx, ZSTD_DCtx, ZSTD_EndDirective, ZSTD_inBuffer, ZSTD_outBuffer};

use crate::dictionary::Dictionary;
use crate::errors::*;
use crate::option::{CompressorOptions, DecompressorOptions};

/// What a single streaming call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Progress {
    pub(crate) consumed: usize,
    pub(crate) produced: usize,
    /// The raw non-error return value: bytes left to flush for the
    /// compressor, 0 at a frame end for the decompressor.
    pub(crate) hint: usize,
}

pub(crate) struct CompressionContext {
    raw: *mut ZSTD_CCtx,
}

// The context is plain heap memory owned by this value.
unsafe impl Send for CompressionContext {}

impl CompressionContext {
    pub(crate) fn new(options: &CompressorOptions) -> Result<Self> {
        let raw = unsafe { zstd_sys::ZSTD_createCCtx() };
        if raw.is_null() {
            return Err(Error::AllocateFailed);
        }
        // owned from here on, so every early return below frees it
        let mut context = Self { raw };

        for (parameter, value) in options.parameters() {
            trace!("compressor parameter {:?} = {}", parameter, value);
            check(unsafe { zstd_sys::ZSTD_CCtx_setParameter(context.raw, parameter, value) })?;
        }
        if let Some(size) = options.pledged_size {
            check(unsafe {
                zstd_sys::ZSTD_CCtx_setPledgedSrcSize(context.raw, size as c_ulonglong)
            })?;
        }
        if let Some(dictionary) = &options.dictionary {
            context.load_dictionary(dictionary)?;
        }
        Ok(context)
    }

    fn load_dictionary(&mut self, dictionary: &Dictionary) -> Result<()> {
        let bytes = dictionary.as_bytes();
        check(unsafe {
            zstd_sys::ZSTD_CCtx_loadDictionary(
                self.raw,
                bytes.as_ptr() as *const c_void,
                bytes.len(),
            )
        })?;
        Ok(())
    }

    pub(crate) fn compress_stream(
        &mut self,
        input: &[u8],
        output: &mut [u8],
        directive: ZSTD_EndDirective,
    ) -> Result<Progress> {
        let mut in_buffer = ZSTD_inBuffer {
            src: input.as_ptr() as *const c_void,
            size: input.len(),
            pos: 0,
        };
        let mut out_buffer = ZSTD_outBuffer {
            dst: output.as_mut_ptr() as *mut c_void,
            size: output.len(),
            pos: 0,
        };
        let result = unsafe {
            zstd_sys::ZSTD_compressStream2(self.raw, &mut out_buffer, &mut in_buffer, directive)
        };
        let hint = check(result)?;
        Ok(Progress {
            consumed: in_buffer.pos,
            produced: out_buffer.pos,
            hint,
        })
    }
}

impl Drop for CompressionContext {
    fn drop(&mut self) {
        unsafe {
            zstd_sys::ZSTD_freeCCtx(self.raw);
        }
    }
}

pub(crate) struct DecompressionContext {
    raw: *mut ZSTD_DCtx,
}

// The context is plain heap memory owned by this value.
unsafe impl Send for DecompressionContext {}

impl DecompressionContext {
    pub(crate) fn new(options: &DecompressorOptions) -> Result<Self> {
        let raw = unsafe { zstd_sys::ZSTD_createDCtx() };
        if raw.is_null() {
            return Err(Error::AllocateFailed);
        }
        let mut context = Self { raw };

        for (parameter, value) in options.parameters() {
            trace!("decompressor parameter {:?} = {}", parameter, value);
            check(unsafe { zstd_sys::ZSTD_DCtx_setParameter(context.raw, parameter, value) })?;
        }
        if let Some(dictionary) = &options.dictionary {
            context.load_dictionary(dictionary)?;
        }
        Ok(context)
    }

    fn load_dictionary(&mut self, dictionary: &Dictionary) -> Result<()> {
        let bytes = dictionary.as_bytes();
        check(unsafe {
            zstd_sys::ZSTD_DCtx_loadDictionary(
                self.raw,
                bytes.as_ptr() as *const c_void,
                bytes.len(),
            )
        })?;
        Ok(())
    }

    pub(crate) fn decompress_stream(
        &mut self,
        input: &[u8],
        output: &mut [u8],
    ) -> Result<Progress> {
        let mut in_buffer = ZSTD_inBuffer {
            src: input.as_ptr() as *const c_void,
            size: input.len(),
            pos: 0,
        };
        let mut out_buffer = ZSTD_outBuffer {
            dst: output.as_mut_ptr() as *mut c_void,
            size: output.len(),
            pos: 0,
        };
        let result =
            unsafe { zstd_sys::ZSTD_decompressStream(self.raw, &mut out_buffer, &mut in_buffer) };
        let hint = check(result)?;
        Ok(Progress {
            consumed: in_buffer.pos,
            produced: out_buffer.pos,
            hint,
        })
    }
}

impl Drop for DecompressionContext {
    fn drop(&mut self) {
        unsafe {
            zstd_sys::ZSTD_freeDCtx(self.raw);
        }
    }
}
