use std::ffi::CStr;
use std::io;
use std::io::ErrorKind;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("allocate error")]
    AllocateFailed,
    #[error("validate error: {0}")]
    ValidateFailed(String),
    #[error("used after closed")]
    UsedAfterClose,
    #[error("not enough source buffer")]
    NotEnoughSourceBuffer,
    #[error("not enough destination buffer")]
    NotEnoughDestinationBuffer,
    #[error("not enough destination")]
    NotEnoughDestination,
    #[error("decompressor received corrupted source")]
    CorruptedSource,
    #[error("corrupted dictionary")]
    CorruptedDictionary,
    #[error("failed to access IO: {0}")]
    AccessIo(#[source] io::Error),
    #[error("failed to read IO: {0}")]
    ReadIo(#[source] io::Error),
    #[error("failed to write IO: {0}")]
    WriteIo(#[source] io::Error),
    #[error("unexpected error: {0}")]
    Unexpected(String),
    #[error("not implemented")]
    NotImplemented,
}

impl Error {
    pub(crate) fn validate<S: Into<String>>(reason: S) -> Self {
        Self::ValidateFailed(reason.into())
    }

    /// Maps a zstd (or zdict) function result that is known to be an error
    /// into its category.
    pub(crate) fn from_code(code: usize) -> Self {
        match error_code(code) {
            codes::MEMORY_ALLOCATION => Self::AllocateFailed,
            codes::PARAMETER_UNSUPPORTED
            | codes::PARAMETER_COMBINATION_UNSUPPORTED
            | codes::PARAMETER_OUT_OF_BOUND
            | codes::TABLE_LOG_TOO_LARGE
            | codes::MAX_SYMBOL_VALUE_TOO_LARGE
            | codes::MAX_SYMBOL_VALUE_TOO_SMALL
            | codes::WORK_SPACE_TOO_SMALL
            | codes::SRC_SIZE_WRONG
            | codes::DST_SIZE_TOO_SMALL
            | codes::DST_BUFFER_NULL => Self::ValidateFailed(error_name(code)),
            codes::PREFIX_UNKNOWN
            | codes::VERSION_UNSUPPORTED
            | codes::FRAME_PARAMETER_UNSUPPORTED
            | codes::FRAME_PARAMETER_WINDOW_TOO_LARGE
            | codes::CORRUPTION_DETECTED
            | codes::CHECKSUM_WRONG
            | codes::LITERALS_HEADER_WRONG => Self::CorruptedSource,
            codes::DICTIONARY_CORRUPTED | codes::DICTIONARY_WRONG => Self::CorruptedDictionary,
            _ => Self::Unexpected(error_name(code)),
        }
    }

    /// Wraps this error so it can travel through [`std::io::Read`] and
    /// [`std::io::Write`] signatures. Sink errors are passed through as-is.
    pub fn into_io_error(self) -> io::Error {
        match self {
            Error::AccessIo(e) | Error::ReadIo(e) | Error::WriteIo(e) => e,
            e => io::Error::new(ErrorKind::Other, e),
        }
    }

    /// Recovers an [`Error`] previously wrapped by [`Error::into_io_error`].
    /// Any other I/O error is reported as [`Error::ReadIo`].
    pub fn from_io_error(error: io::Error) -> Self {
        if error.get_ref().map_or(false, |inner| inner.is::<Error>()) {
            if let Some(inner) = error.into_inner() {
                if let Ok(e) = inner.downcast::<Error>() {
                    return *e;
                }
            }
            return Error::Unexpected("lost wrapped error".into());
        }
        Error::ReadIo(error)
    }
}

/// Returns `Err` when `result` carries a zstd error code.
pub(crate) fn check(result: usize) -> Result<usize> {
    if is_error(result) {
        Err(Error::from_code(result))
    } else {
        Ok(result)
    }
}

pub(crate) fn is_error(result: usize) -> bool {
    unsafe { zstd_sys::ZSTD_isError(result) != 0 }
}

/// Same as `ZSTD_getErrorCode`, kept numeric so unknown codes can't produce
/// an invalid enum value.
fn error_code(result: usize) -> u32 {
    if !is_error(result) {
        return codes::NO_ERROR;
    }
    0_usize.wrapping_sub(result) as u32
}

fn error_name(result: usize) -> String {
    unsafe {
        CStr::from_ptr(zstd_sys::ZSTD_getErrorName(result))
            .to_string_lossy()
            .into()
    }
}

/// Stable values of `ZSTD_ErrorCode` (zstd_errors.h).
mod codes {
    pub const NO_ERROR: u32 = 0;
    pub const PREFIX_UNKNOWN: u32 = 10;
    pub const VERSION_UNSUPPORTED: u32 = 12;
    pub const FRAME_PARAMETER_UNSUPPORTED: u32 = 14;
    pub const FRAME_PARAMETER_WINDOW_TOO_LARGE: u32 = 16;
    pub const CORRUPTION_DETECTED: u32 = 20;
    pub const CHECKSUM_WRONG: u32 = 22;
    pub const LITERALS_HEADER_WRONG: u32 = 24;
    pub const DICTIONARY_CORRUPTED: u32 = 30;
    pub const DICTIONARY_WRONG: u32 = 32;
    pub const PARAMETER_UNSUPPORTED: u32 = 40;
    pub const PARAMETER_COMBINATION_UNSUPPORTED: u32 = 41;
    pub const PARAMETER_OUT_OF_BOUND: u32 = 42;
    pub const TABLE_LOG_TOO_LARGE: u32 = 44;
    pub const MAX_SYMBOL_VALUE_TOO_LARGE: u32 = 46;
    pub const MAX_SYMBOL_VALUE_TOO_SMALL: u32 = 48;
    pub const MEMORY_ALLOCATION: u32 = 64;
    pub const WORK_SPACE_TOO_SMALL: u32 = 66;
    pub const DST_SIZE_TOO_SMALL: u32 = 70;
    pub const SRC_SIZE_WRONG: u32 = 72;
    pub const DST_BUFFER_NULL: u32 = 74;
}
