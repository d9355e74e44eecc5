//! L1 data-cache geometry discovery.
//!
//! This module queries the operating system for the geometry of the L1 data cache (size, line size
//! and associativity). Three families of platform interfaces are supported:
//! - the logical-processor-information query (Windows),
//! - the POSIX `sysconf` interface, completed by `/proc/cpuinfo` (Linux and other Unices),
//! - the kernel key/value hardware query `sysctlbyname` (macOS).
//!
//! None of them is fully reliable: fields may be missing, reported as "unknown" or simply wrong.
//! Every probe therefore recovers what it can through heuristics and finally normalizes the result
//! so that callers always get strictly positive values, whichever platform branch ran.
//!
//! The platform calls only gather raw data; turning that data into a [`CacheGeometry`] is done by
//! the pure `resolve_*` functions, which can be exercised on any host.

use crate::consts;

use tracing::{debug, info};

use std::fmt;

/// Geometry of the L1 data cache.
///
/// Fields are signed so that raw platform values (where `-1` or `0` mean "unavailable") can be
/// carried until normalization.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CacheGeometry {
    /// L1D size in bytes.
    pub l1d_size: i64,
    /// Cache line size in bytes.
    pub line_size: i64,
    /// Number of ways.
    pub associativity: i64,
}

impl CacheGeometry {
    /// Geometry with every field unavailable.
    pub const UNKNOWN: Self = Self::new(-1, -1, -1);

    /// Geometry made of the normalization fallback constants.
    pub const FALLBACK: Self = Self::new(
        consts::FALLBACK_L1D_SIZE,
        consts::FALLBACK_LINE_SIZE,
        consts::FALLBACK_ASSOCIATIVITY,
    );

    pub const fn new(l1d_size: i64, line_size: i64, associativity: i64) -> Self {
        Self {
            l1d_size,
            line_size,
            associativity,
        }
    }

    /// Replaces every non-positive field with its fallback constant.
    pub fn normalized(self) -> Self {
        let normalized = Self {
            l1d_size: positive_or(self.l1d_size, consts::FALLBACK_L1D_SIZE),
            line_size: positive_or(self.line_size, consts::FALLBACK_LINE_SIZE),
            associativity: positive_or(self.associativity, consts::FALLBACK_ASSOCIATIVITY),
        };
        if normalized != self {
            info!(raw = %self, normalized = %normalized, "substituted fallback cache geometry");
        }
        normalized
    }

    /// Returns `true` if every field is strictly positive.
    pub fn is_valid(&self) -> bool {
        self.l1d_size > 0 && self.line_size > 0 && self.associativity > 0
    }
}

impl fmt::Display for CacheGeometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} bytes, {}-byte lines, {}-way",
            self.l1d_size, self.line_size, self.associativity
        )
    }
}

fn positive_or(value: i64, fallback: i64) -> i64 {
    if value > 0 {
        value
    } else {
        fallback
    }
}

/// Capability of discovering the host's L1 data-cache geometry.
///
/// Implementations never fail: unavailable information degrades to heuristics and fallback
/// constants, and the returned geometry is always normalized.
pub trait CacheProbe {
    /// Short name of the platform interface used, for logging.
    fn name(&self) -> &'static str;

    /// Queries the geometry of the L1 data cache.
    fn probe(&self) -> CacheGeometry;
}

/// Returns the probe matching the platform the crate was built for.
pub fn host_probe() -> Box<dyn CacheProbe> {
    #[cfg(windows)]
    {
        Box::new(LogicalProcessorProbe)
    }

    #[cfg(any(target_os = "macos", target_os = "ios"))]
    {
        Box::new(SysctlProbe)
    }

    #[cfg(all(unix, not(any(target_os = "macos", target_os = "ios"))))]
    {
        Box::new(SysconfProbe)
    }

    #[cfg(not(any(windows, unix)))]
    {
        Box::new(FallbackProbe)
    }
}

/// Probes the host's L1 data cache with the platform's probe.
pub fn probe() -> CacheGeometry {
    host_probe().probe()
}

/// Kind of cache reported by a logical-processor cache descriptor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CacheKind {
    Unified,
    Instruction,
    Data,
    Trace,
}

/// One cache entry as reported by the logical-processor-information query.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CacheDescriptor {
    pub level: u8,
    pub kind: CacheKind,
    pub size: i64,
    pub line_size: i64,
    pub associativity: i64,
}

/// Resolves the geometry from logical-processor cache descriptors.
///
/// The first level-1 data cache wins. An associativity flagged as unknown (`0` or `0xFF`) is
/// replaced by [`consts::UNKNOWN_ASSOCIATIVITY`].
pub fn resolve_logical_processor(descriptors: &[CacheDescriptor]) -> CacheGeometry {
    let Some(l1d) = descriptors
        .iter()
        .find(|d| d.level == 1 && d.kind == CacheKind::Data)
    else {
        debug!("no level-1 data cache descriptor reported");
        return CacheGeometry::UNKNOWN.normalized();
    };

    let associativity = if consts::ASSOCIATIVITY_UNKNOWN_SENTINELS.contains(&l1d.associativity) {
        consts::UNKNOWN_ASSOCIATIVITY
    } else {
        l1d.associativity
    };

    CacheGeometry::new(l1d.size, l1d.line_size, associativity).normalized()
}

/// Resolves the geometry from raw `sysconf` values, falling back to the contents of
/// `/proc/cpuinfo` when the associativity is not exposed.
///
/// In the fallback, `cache_alignment` provides the line size and `L1d cache` the size (in KiB),
/// each only if the corresponding `sysconf` value was unusable. The associativity is then guessed
/// from the total line count, see [`guess_associativity`].
pub fn resolve_sysconf(sysconf: CacheGeometry, cpuinfo: Option<&str>) -> CacheGeometry {
    if sysconf.associativity > 0 {
        return sysconf.normalized();
    }

    let mut geometry = sysconf;
    for line in cpuinfo.unwrap_or_default().lines() {
        if line.contains("cache_alignment") && geometry.line_size <= 0 {
            if let Some(line_size) = field_value(line) {
                geometry.line_size = line_size;
            }
        }
        if line.contains("L1d cache") && geometry.l1d_size <= 0 {
            if let Some(kib) = field_value(line) {
                geometry.l1d_size = kib.saturating_mul(1024);
            }
        }
    }

    if geometry.l1d_size > 0 && geometry.line_size > 0 {
        geometry.associativity = guess_associativity(geometry.l1d_size, geometry.line_size);
        debug!(
            associativity = geometry.associativity,
            "guessed associativity from line count"
        );
    }

    geometry.normalized()
}

/// Guesses the associativity of a cache from its size and line size.
///
/// The first of 12, 8 and 4 that evenly divides the total line count is returned, 8 if none does.
// NOTE: this is a heuristic, a divisor of the line count says nothing certain about the number of
// ways.
pub fn guess_associativity(l1d_size: i64, line_size: i64) -> i64 {
    let total_lines = l1d_size / line_size;
    consts::ASSOCIATIVITY_GUESSES
        .into_iter()
        .find(|ways| total_lines % ways == 0)
        .unwrap_or(consts::UNKNOWN_ASSOCIATIVITY)
}

/// Parses the leading integer of the value of a `key : value` line.
fn field_value(line: &str) -> Option<i64> {
    let (_, value) = line.split_once(':')?;
    let value = value.trim_start();
    let end = value
        .char_indices()
        .find(|&(i, c)| !(c.is_ascii_digit() || (i == 0 && (c == '-' || c == '+'))))
        .map_or(value.len(), |(i, _)| i);
    value[..end].parse().ok()
}

/// Resolves the geometry from `sysctlbyname` results.
///
/// `cache_config` is the first entry of `hw.cacheconfig`. Using it as the associativity is an
/// approximation: the key describes cache sharing per level rather than the L1D's ways.
pub fn resolve_sysctl(
    l1d_size: Option<i64>,
    line_size: Option<i64>,
    cache_config: Option<i64>,
) -> CacheGeometry {
    CacheGeometry::new(
        l1d_size.unwrap_or(-1),
        line_size.unwrap_or(-1),
        cache_config.unwrap_or(consts::UNKNOWN_ASSOCIATIVITY),
    )
    .normalized()
}

/// Probe for platforms exposing no cache information at all.
#[derive(Clone, Copy, Debug, Default)]
pub struct FallbackProbe;

impl CacheProbe for FallbackProbe {
    fn name(&self) -> &'static str {
        "fallback"
    }

    fn probe(&self) -> CacheGeometry {
        CacheGeometry::UNKNOWN.normalized()
    }
}

/// Probe returning a fixed geometry (normalized).
#[derive(Clone, Copy, Debug)]
pub struct FixedProbe(pub CacheGeometry);

impl CacheProbe for FixedProbe {
    fn name(&self) -> &'static str {
        "fixed"
    }

    fn probe(&self) -> CacheGeometry {
        self.0.normalized()
    }
}

/// Probe replacing some fields of another probe's result with user-provided values.
pub struct OverrideProbe {
    inner: Box<dyn CacheProbe>,
    l1d_size: Option<i64>,
    line_size: Option<i64>,
    associativity: Option<i64>,
}

impl OverrideProbe {
    pub fn new(
        inner: Box<dyn CacheProbe>,
        l1d_size: Option<i64>,
        line_size: Option<i64>,
        associativity: Option<i64>,
    ) -> Self {
        Self {
            inner,
            l1d_size,
            line_size,
            associativity,
        }
    }
}

impl CacheProbe for OverrideProbe {
    fn name(&self) -> &'static str {
        self.inner.name()
    }

    fn probe(&self) -> CacheGeometry {
        let probed = self.inner.probe();
        CacheGeometry::new(
            self.l1d_size.unwrap_or(probed.l1d_size),
            self.line_size.unwrap_or(probed.line_size),
            self.associativity.unwrap_or(probed.associativity),
        )
        .normalized()
    }
}

/// Probe based on the logical-processor-information query.
#[cfg(windows)]
#[derive(Clone, Copy, Debug, Default)]
pub struct LogicalProcessorProbe;

#[cfg(windows)]
impl CacheProbe for LogicalProcessorProbe {
    fn name(&self) -> &'static str {
        "GetLogicalProcessorInformation"
    }

    fn probe(&self) -> CacheGeometry {
        let descriptors = query_logical_processor_caches();
        debug!(probe = self.name(), count = descriptors.len(), "read cache descriptors");
        resolve_logical_processor(&descriptors)
    }
}

#[cfg(windows)]
fn query_logical_processor_caches() -> Vec<CacheDescriptor> {
    use std::{mem::size_of, ptr::null_mut};
    use winapi::um::{
        sysinfoapi::GetLogicalProcessorInformation,
        winnt::{
            CacheData, CacheInstruction, CacheTrace, RelationCache,
            SYSTEM_LOGICAL_PROCESSOR_INFORMATION,
        },
    };

    let entry_size = size_of::<SYSTEM_LOGICAL_PROCESSOR_INFORMATION>();

    // First call only reports the required buffer length.
    let mut len = 0;
    // SAFETY: a null buffer with a zero length is allowed, the call only writes `len`.
    unsafe { GetLogicalProcessorInformation(null_mut(), &mut len) };
    let count = len as usize / entry_size;
    if count == 0 {
        return Vec::new();
    }

    // SAFETY: the structure is plain old data, all-zero is a valid value.
    let mut buffer: Vec<SYSTEM_LOGICAL_PROCESSOR_INFORMATION> =
        vec![unsafe { std::mem::zeroed() }; count];
    // SAFETY: `buffer` holds `count` entries, which is at least `len` bytes.
    if unsafe { GetLogicalProcessorInformation(buffer.as_mut_ptr(), &mut len) } == 0 {
        return Vec::new();
    }
    buffer.truncate(len as usize / entry_size);

    buffer
        .iter()
        .filter(|entry| entry.Relationship == RelationCache)
        .map(|entry| {
            // SAFETY: `Cache` is the active union member for `RelationCache` entries.
            let cache = unsafe { entry.u.Cache() };
            let kind = if cache.Type == CacheData {
                CacheKind::Data
            } else if cache.Type == CacheInstruction {
                CacheKind::Instruction
            } else if cache.Type == CacheTrace {
                CacheKind::Trace
            } else {
                CacheKind::Unified
            };
            CacheDescriptor {
                level: cache.Level,
                kind,
                size: cache.Size.into(),
                line_size: cache.LineSize.into(),
                associativity: cache.Associativity.into(),
            }
        })
        .collect()
}

/// Probe based on `sysconf`, completed by `/proc/cpuinfo`.
#[cfg(all(unix, not(any(target_os = "macos", target_os = "ios"))))]
#[derive(Clone, Copy, Debug, Default)]
pub struct SysconfProbe;

#[cfg(all(unix, not(any(target_os = "macos", target_os = "ios"))))]
impl SysconfProbe {
    const CPUINFO_PATH: &'static str = "/proc/cpuinfo";
}

#[cfg(all(unix, not(any(target_os = "macos", target_os = "ios"))))]
impl CacheProbe for SysconfProbe {
    fn name(&self) -> &'static str {
        "sysconf"
    }

    fn probe(&self) -> CacheGeometry {
        let raw = query_sysconf();
        debug!(probe = self.name(), raw = %raw, "read sysconf values");
        if raw.associativity > 0 {
            return resolve_sysconf(raw, None);
        }

        let cpuinfo = match std::fs::read_to_string(Self::CPUINFO_PATH) {
            Ok(contents) => Some(contents),
            Err(err) => {
                debug!(path = Self::CPUINFO_PATH, %err, "cannot read cpuinfo");
                None
            }
        };
        resolve_sysconf(raw, cpuinfo.as_deref())
    }
}

#[cfg(all(target_os = "linux", target_env = "gnu"))]
fn query_sysconf() -> CacheGeometry {
    // SAFETY: `sysconf` takes no pointers and returns -1 for unsupported names.
    let read = |name| unsafe { libc::sysconf(name) } as i64;
    CacheGeometry::new(
        read(libc::_SC_LEVEL1_DCACHE_SIZE),
        read(libc::_SC_LEVEL1_DCACHE_LINESIZE),
        read(libc::_SC_LEVEL1_DCACHE_ASSOC),
    )
}

#[cfg(all(
    unix,
    not(any(target_os = "macos", target_os = "ios")),
    not(all(target_os = "linux", target_env = "gnu"))
))]
fn query_sysconf() -> CacheGeometry {
    CacheGeometry::UNKNOWN
}

/// Probe based on the `sysctlbyname` hardware keys.
#[cfg(any(target_os = "macos", target_os = "ios"))]
#[derive(Clone, Copy, Debug, Default)]
pub struct SysctlProbe;

#[cfg(any(target_os = "macos", target_os = "ios"))]
impl CacheProbe for SysctlProbe {
    fn name(&self) -> &'static str {
        "sysctlbyname"
    }

    fn probe(&self) -> CacheGeometry {
        let l1d_size = sysctl_values::<1>(c"hw.l1dcachesize").map(|[v]| v);
        let line_size = sysctl_values::<1>(c"hw.cachelinesize").map(|[v]| v);
        let cache_config = sysctl_values::<16>(c"hw.cacheconfig").map(|config| config[0]);
        debug!(
            probe = self.name(),
            ?l1d_size,
            ?line_size,
            ?cache_config,
            "read sysctl values"
        );
        resolve_sysctl(l1d_size, line_size, cache_config)
    }
}

/// Reads up to `N` 64-bit integers from a `sysctlbyname` key.
#[cfg(any(target_os = "macos", target_os = "ios"))]
fn sysctl_values<const N: usize>(name: &std::ffi::CStr) -> Option<[i64; N]> {
    let mut values = [0_i64; N];
    let mut len = std::mem::size_of_val(&values);
    // SAFETY: `name` is NUL-terminated and `len` is the byte size of `values`, so the kernel
    // writes at most that many bytes. No new value is set.
    let rc = unsafe {
        libc::sysctlbyname(
            name.as_ptr(),
            values.as_mut_ptr().cast(),
            &mut len,
            std::ptr::null_mut(),
            0,
        )
    };
    (rc == 0 && len > 0).then_some(values)
}
