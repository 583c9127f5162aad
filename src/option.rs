//! Compressor and decompressor options.
//!
//! Options are resolved once per operation, either from the typed structs
//! directly or from an [`OptionMap`]. A field left as `None` keeps the
//! library default.

use std::collections::HashMap;
use std::fmt;
use std::ops::RangeInclusive;
use std::os::raw::c_int;
use std::str::FromStr;

use zstd_sys::{ZSTD_cParameter, ZSTD_dParameter};

use crate::buffer;
use crate::dictionary::Dictionary;
use crate::errors::*;
use crate::lock::LockMode;

/// Dynamic option mapping, keyed by camelCase option names.
pub type OptionMap = HashMap<String, OptionValue>;

#[derive(Debug, Clone)]
pub enum OptionValue {
    Bool(bool),
    Integer(i64),
    Symbol(String),
    Dictionary(Dictionary),
}

impl From<bool> for OptionValue {
    fn from(value: bool) -> Self {
        OptionValue::Bool(value)
    }
}

impl From<i64> for OptionValue {
    fn from(value: i64) -> Self {
        OptionValue::Integer(value)
    }
}

impl From<&str> for OptionValue {
    fn from(value: &str) -> Self {
        OptionValue::Symbol(value.into())
    }
}

impl From<Dictionary> for OptionValue {
    fn from(value: Dictionary) -> Self {
        OptionValue::Dictionary(value)
    }
}

/// Match-finding strategy, from fastest to strongest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Fast = 1,
    Dfast,
    Greedy,
    Lazy,
    Lazy2,
    Btlazy2,
    Btopt,
    Btultra,
    Btultra2,
}

impl Strategy {
    pub const ALL: [Strategy; 9] = [
        Strategy::Fast,
        Strategy::Dfast,
        Strategy::Greedy,
        Strategy::Lazy,
        Strategy::Lazy2,
        Strategy::Btlazy2,
        Strategy::Btopt,
        Strategy::Btultra,
        Strategy::Btultra2,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Strategy::Fast => "fast",
            Strategy::Dfast => "dfast",
            Strategy::Greedy => "greedy",
            Strategy::Lazy => "lazy",
            Strategy::Lazy2 => "lazy2",
            Strategy::Btlazy2 => "btlazy2",
            Strategy::Btopt => "btopt",
            Strategy::Btultra => "btultra",
            Strategy::Btultra2 => "btultra2",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Strategy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Strategy::ALL
            .into_iter()
            .find(|strategy| strategy.name() == s)
            .ok_or_else(|| Error::validate("invalid strategy"))
    }
}

#[derive(Debug, Clone, Default)]
pub struct CompressorOptions {
    pub compression_level: Option<i32>,
    /// Maximum back-reference distance (power of 2).
    pub window_log: Option<u32>,
    /// Size of the initial probe table (power of 2).
    pub hash_log: Option<u32>,
    /// Size of the multi-probe search table (power of 2).
    pub chain_log: Option<u32>,
    /// Number of search attempts (power of 2).
    pub search_log: Option<u32>,
    pub min_match: Option<u32>,
    pub target_length: Option<u32>,
    pub strategy: Option<Strategy>,
    pub enable_long_distance_matching: Option<bool>,
    pub ldm_hash_log: Option<u32>,
    pub ldm_min_match: Option<u32>,
    pub ldm_bucket_size_log: Option<u32>,
    pub ldm_hash_rate_log: Option<u32>,
    pub content_size_flag: Option<bool>,
    pub checksum_flag: Option<bool>,
    pub dict_id_flag: Option<bool>,
    /// Worker threads; needs a multithreaded build of the library.
    pub nb_workers: Option<u32>,
    pub job_size: Option<u32>,
    pub overlap_log: Option<u32>,
    /// Exact source size, written into the frame header.
    pub pledged_size: Option<u64>,
    pub dictionary: Option<Dictionary>,
    /// 0 means the library recommended size.
    pub source_buffer_length: usize,
    /// 0 means the library recommended size.
    pub destination_buffer_length: usize,
    pub use_global_lock: bool,
}

#[derive(Debug, Clone, Default)]
pub struct DecompressorOptions {
    /// Size limit of the window the decompressor may allocate (power of 2).
    pub window_log_max: Option<u32>,
    pub dictionary: Option<Dictionary>,
    /// 0 means the library recommended size.
    pub source_buffer_length: usize,
    /// 0 means the library recommended size.
    pub destination_buffer_length: usize,
    pub use_global_lock: bool,
}

struct Entry {
    name: &'static str,
    parameter: ZSTD_cParameter,
    value: Option<i64>,
}

impl CompressorOptions {
    /// Resolves options from `map`; unknown keys are ignored.
    ///
    /// # Errors
    ///
    /// This returns [`Error::ValidateFailed`] if a value has the wrong shape
    /// or is out of the library bounds.
    pub fn from_map(map: &OptionMap) -> Result<Self> {
        let options = Self {
            compression_level: get_i32(map, "compressionLevel")?,
            window_log: get_u32(map, "windowLog")?,
            hash_log: get_u32(map, "hashLog")?,
            chain_log: get_u32(map, "chainLog")?,
            search_log: get_u32(map, "searchLog")?,
            min_match: get_u32(map, "minMatch")?,
            target_length: get_u32(map, "targetLength")?,
            strategy: get_symbol(map, "strategy")?
                .map(|s| s.parse())
                .transpose()?,
            enable_long_distance_matching: get_bool(map, "enableLongDistanceMatching")?,
            ldm_hash_log: get_u32(map, "ldmHashLog")?,
            ldm_min_match: get_u32(map, "ldmMinMatch")?,
            ldm_bucket_size_log: get_u32(map, "ldmBucketSizeLog")?,
            ldm_hash_rate_log: get_u32(map, "ldmHashRateLog")?,
            content_size_flag: get_bool(map, "contentSizeFlag")?,
            checksum_flag: get_bool(map, "checksumFlag")?,
            dict_id_flag: get_bool(map, "dictIdFlag")?,
            nb_workers: get_u32(map, "nbWorkers")?,
            job_size: get_u32(map, "jobSize")?,
            overlap_log: get_u32(map, "overlapLog")?,
            pledged_size: get_unsigned(map, "pledgedSize")?,
            dictionary: get_dictionary(map, "dictionary")?,
            source_buffer_length: get_length(map, "sourceBufferLength")?,
            destination_buffer_length: get_length(map, "destinationBufferLength")?,
            use_global_lock: get_bool(map, "useGlobalLock")?.unwrap_or(false),
        };
        options.validate()?;
        Ok(options)
    }

    /// Checks every present parameter against the bounds of the linked
    /// library.
    pub fn validate(&self) -> Result<()> {
        for entry in self.entries() {
            if let Some(value) = entry.value {
                let bounds = compressor_bounds(entry.parameter)?;
                if !contains(&bounds, value) {
                    return Err(Error::validate(format!("invalid {}", entry.name)));
                }
            }
        }
        Ok(())
    }

    pub(crate) fn parameters(&self) -> impl Iterator<Item = (ZSTD_cParameter, c_int)> {
        self.entries()
            .into_iter()
            .filter_map(|entry| entry.value.map(|v| (entry.parameter, v as c_int)))
    }

    pub(crate) fn lock_mode(&self) -> LockMode {
        LockMode::from_flag(self.use_global_lock)
    }

    pub(crate) fn source_length(&self) -> usize {
        or_default(self.source_buffer_length, buffer::compressor_source_length)
    }

    pub(crate) fn destination_length(&self) -> usize {
        or_default(
            self.destination_buffer_length,
            buffer::compressor_destination_length,
        )
    }

    fn entries(&self) -> [Entry; 19] {
        use ZSTD_cParameter::*;
        let unsigned = |v: Option<u32>| v.map(i64::from);
        let flag = |v: Option<bool>| v.map(i64::from);
        [
            Entry {
                name: "compression level",
                parameter: ZSTD_c_compressionLevel,
                value: self.compression_level.map(i64::from),
            },
            Entry {
                name: "window log",
                parameter: ZSTD_c_windowLog,
                value: unsigned(self.window_log),
            },
            Entry {
                name: "hash log",
                parameter: ZSTD_c_hashLog,
                value: unsigned(self.hash_log),
            },
            Entry {
                name: "chain log",
                parameter: ZSTD_c_chainLog,
                value: unsigned(self.chain_log),
            },
            Entry {
                name: "search log",
                parameter: ZSTD_c_searchLog,
                value: unsigned(self.search_log),
            },
            Entry {
                name: "min match",
                parameter: ZSTD_c_minMatch,
                value: unsigned(self.min_match),
            },
            Entry {
                name: "target length",
                parameter: ZSTD_c_targetLength,
                value: unsigned(self.target_length),
            },
            Entry {
                name: "strategy",
                parameter: ZSTD_c_strategy,
                value: self.strategy.map(|s| s as i64),
            },
            Entry {
                name: "long distance matching flag",
                parameter: ZSTD_c_enableLongDistanceMatching,
                value: flag(self.enable_long_distance_matching),
            },
            Entry {
                name: "ldm hash log",
                parameter: ZSTD_c_ldmHashLog,
                value: unsigned(self.ldm_hash_log),
            },
            Entry {
                name: "ldm min match",
                parameter: ZSTD_c_ldmMinMatch,
                value: unsigned(self.ldm_min_match),
            },
            Entry {
                name: "ldm bucket size log",
                parameter: ZSTD_c_ldmBucketSizeLog,
                value: unsigned(self.ldm_bucket_size_log),
            },
            Entry {
                name: "ldm hash rate log",
                parameter: ZSTD_c_ldmHashRateLog,
                value: unsigned(self.ldm_hash_rate_log),
            },
            Entry {
                name: "content size flag",
                parameter: ZSTD_c_contentSizeFlag,
                value: flag(self.content_size_flag),
            },
            Entry {
                name: "checksum flag",
                parameter: ZSTD_c_checksumFlag,
                value: flag(self.checksum_flag),
            },
            Entry {
                name: "dict id flag",
                parameter: ZSTD_c_dictIDFlag,
                value: flag(self.dict_id_flag),
            },
            Entry {
                name: "nb workers",
                parameter: ZSTD_c_nbWorkers,
                value: unsigned(self.nb_workers),
            },
            Entry {
                name: "job size",
                parameter: ZSTD_c_jobSize,
                value: unsigned(self.job_size),
            },
            Entry {
                name: "overlap log",
                parameter: ZSTD_c_overlapLog,
                value: unsigned(self.overlap_log),
            },
        ]
    }
}

impl DecompressorOptions {
    /// Resolves options from `map`; unknown keys are ignored.
    pub fn from_map(map: &OptionMap) -> Result<Self> {
        let options = Self {
            window_log_max: get_u32(map, "windowLogMax")?,
            dictionary: get_dictionary(map, "dictionary")?,
            source_buffer_length: get_length(map, "sourceBufferLength")?,
            destination_buffer_length: get_length(map, "destinationBufferLength")?,
            use_global_lock: get_bool(map, "useGlobalLock")?.unwrap_or(false),
        };
        options.validate()?;
        Ok(options)
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(window_log_max) = self.window_log_max {
            let bounds = decompressor_bounds(ZSTD_dParameter::ZSTD_d_windowLogMax)?;
            if !contains(&bounds, window_log_max.into()) {
                return Err(Error::validate("invalid window log max"));
            }
        }
        Ok(())
    }

    pub(crate) fn parameters(&self) -> impl Iterator<Item = (ZSTD_dParameter, c_int)> {
        self.window_log_max
            .map(|v| (ZSTD_dParameter::ZSTD_d_windowLogMax, v as c_int))
            .into_iter()
    }

    pub(crate) fn lock_mode(&self) -> LockMode {
        LockMode::from_flag(self.use_global_lock)
    }

    pub(crate) fn source_length(&self) -> usize {
        or_default(self.source_buffer_length, buffer::decompressor_source_length)
    }

    pub(crate) fn destination_length(&self) -> usize {
        or_default(
            self.destination_buffer_length,
            buffer::decompressor_destination_length,
        )
    }
}

/// Compression levels accepted by the linked library.
pub fn compression_level_bounds() -> Result<RangeInclusive<i32>> {
    let bounds = compressor_bounds(ZSTD_cParameter::ZSTD_c_compressionLevel)?;
    Ok(*bounds.start() as i32..=*bounds.end() as i32)
}

fn compressor_bounds(parameter: ZSTD_cParameter) -> Result<RangeInclusive<i64>> {
    let bounds = unsafe { zstd_sys::ZSTD_cParam_getBounds(parameter) };
    if is_error(bounds.error) {
        return Err(Error::NotImplemented);
    }
    Ok(i64::from(bounds.lowerBound)..=i64::from(bounds.upperBound))
}

fn decompressor_bounds(parameter: ZSTD_dParameter) -> Result<RangeInclusive<i64>> {
    let bounds = unsafe { zstd_sys::ZSTD_dParam_getBounds(parameter) };
    if is_error(bounds.error) {
        return Err(Error::NotImplemented);
    }
    Ok(i64::from(bounds.lowerBound)..=i64::from(bounds.upperBound))
}

fn contains(bounds: &RangeInclusive<i64>, value: i64) -> bool {
    bounds.contains(&value)
}

fn or_default(length: usize, default: fn() -> usize) -> usize {
    if length == 0 {
        default()
    } else {
        length
    }
}

fn get_bool(map: &OptionMap, key: &str) -> Result<Option<bool>> {
    match map.get(key) {
        None => Ok(None),
        Some(OptionValue::Bool(v)) => Ok(Some(*v)),
        Some(_) => Err(Error::validate(format!("invalid bool: {}", key))),
    }
}

fn get_integer(map: &OptionMap, key: &str) -> Result<Option<i64>> {
    match map.get(key) {
        None => Ok(None),
        Some(OptionValue::Integer(v)) => Ok(Some(*v)),
        Some(_) => Err(Error::validate(format!("invalid integer: {}", key))),
    }
}

fn get_i32(map: &OptionMap, key: &str) -> Result<Option<i32>> {
    get_integer(map, key)?
        .map(|v| i32::try_from(v).map_err(|_| Error::validate(format!("invalid {}", key))))
        .transpose()
}

fn get_unsigned(map: &OptionMap, key: &str) -> Result<Option<u64>> {
    get_integer(map, key)?
        .map(|v| {
            u64::try_from(v)
                .map_err(|_| Error::validate(format!("invalid not negative integer: {}", key)))
        })
        .transpose()
}

fn get_u32(map: &OptionMap, key: &str) -> Result<Option<u32>> {
    get_unsigned(map, key)?
        .map(|v| u32::try_from(v).map_err(|_| Error::validate(format!("invalid {}", key))))
        .transpose()
}

fn get_length(map: &OptionMap, key: &str) -> Result<usize> {
    get_unsigned(map, key)?
        .map(|v| usize::try_from(v).map_err(|_| Error::validate(format!("invalid {}", key))))
        .transpose()
        .map(Option::unwrap_or_default)
}

fn get_symbol<'a>(map: &'a OptionMap, key: &str) -> Result<Option<&'a str>> {
    match map.get(key) {
        None => Ok(None),
        Some(OptionValue::Symbol(v)) => Ok(Some(v)),
        Some(_) => Err(Error::validate(format!("invalid symbol: {}", key))),
    }
}

fn get_dictionary(map: &OptionMap, key: &str) -> Result<Option<Dictionary>> {
    match map.get(key) {
        None => Ok(None),
        Some(OptionValue::Dictionary(v)) => Ok(Some(v.clone())),
        Some(_) => Err(Error::validate("invalid dictionary")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map<const N: usize>(entries: [(&str, OptionValue); N]) -> OptionMap {
        entries
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect()
    }

    #[test]
    fn empty_map_keeps_defaults() {
        let options = CompressorOptions::from_map(&OptionMap::new()).unwrap();
        assert!(options.compression_level.is_none());
        assert_eq!(options.parameters().count(), 0);
        assert!(!options.use_global_lock);
        assert_eq!(options.source_buffer_length, 0);
        assert!(options.source_length() > 0);
        assert!(options.destination_length() > 0);
    }

    #[test]
    fn recognized_keys_are_resolved() {
        let options = CompressorOptions::from_map(&map([
            ("compressionLevel", 5_i64.into()),
            ("strategy", "btopt".into()),
            ("checksumFlag", true.into()),
            ("pledgedSize", 100_i64.into()),
            ("destinationBufferLength", 512_i64.into()),
            ("useGlobalLock", true.into()),
            ("someUnknownKey", "whatever".into()),
        ]))
        .unwrap();

        assert_eq!(options.compression_level, Some(5));
        assert_eq!(options.strategy, Some(Strategy::Btopt));
        assert_eq!(options.checksum_flag, Some(true));
        assert_eq!(options.pledged_size, Some(100));
        assert_eq!(options.destination_length(), 512);
        assert_eq!(options.lock_mode(), LockMode::Global);

        let parameters: Vec<_> = options.parameters().collect();
        assert_eq!(
            parameters,
            vec![
                (ZSTD_cParameter::ZSTD_c_compressionLevel, 5),
                (ZSTD_cParameter::ZSTD_c_strategy, Strategy::Btopt as c_int),
                (ZSTD_cParameter::ZSTD_c_checksumFlag, 1),
            ]
        );
    }

    #[test]
    fn wrong_shapes_are_rejected() {
        for entries in [
            map([("compressionLevel", true.into())]),
            map([("checksumFlag", 1_i64.into())]),
            map([("strategy", "fastest".into())]),
            map([("strategy", 1_i64.into())]),
            map([("windowLog", (-1_i64).into())]),
            map([("sourceBufferLength", (-1_i64).into())]),
            map([("useGlobalLock", "yes".into())]),
            map([("dictionary", "raw".into())]),
        ] {
            assert!(matches!(
                CompressorOptions::from_map(&entries),
                Err(Error::ValidateFailed(_))
            ));
        }
    }

    #[test]
    fn out_of_bounds_values_are_rejected() {
        let level = *compression_level_bounds().unwrap().end();
        let within = map([("compressionLevel", i64::from(level).into())]);
        assert!(CompressorOptions::from_map(&within).is_ok());
        let beyond = map([("compressionLevel", (i64::from(level) + 1).into())]);
        assert!(matches!(
            CompressorOptions::from_map(&beyond),
            Err(Error::ValidateFailed(_))
        ));
        assert!(matches!(
            CompressorOptions::from_map(&map([("windowLog", 1000_i64.into())])),
            Err(Error::ValidateFailed(_))
        ));
        assert!(matches!(
            DecompressorOptions::from_map(&map([("windowLogMax", 1_i64.into())])),
            Err(Error::ValidateFailed(_))
        ));
    }

    #[test]
    fn decompressor_keys() {
        let dictionary = Dictionary::new(b"raw content").unwrap();
        let options = DecompressorOptions::from_map(&map([
            ("windowLogMax", 20_i64.into()),
            ("dictionary", dictionary.clone().into()),
            ("sourceBufferLength", 1_i64.into()),
            ("compressionLevel", 3_i64.into()),
        ]))
        .unwrap();
        assert_eq!(options.window_log_max, Some(20));
        assert_eq!(options.dictionary, Some(dictionary));
        assert_eq!(options.source_length(), 1);
        assert_eq!(options.parameters().count(), 1);
    }

    #[test]
    fn strategy_names() {
        for strategy in Strategy::ALL {
            assert_eq!(strategy.name().parse::<Strategy>().unwrap(), strategy);
        }
        assert_eq!(Strategy::Btultra2 as i32, 9);
    }
}
