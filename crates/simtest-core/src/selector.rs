//! Simulator selection by OS version and device name.
//!
//! The configured OS version is either a literal bucket label (`"iOS 12.1"`)
//! or [`LATEST_OS_VERSION`], in which case the highest iOS version present
//! in the simulator directory is used. Device names are matched exactly.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use thiserror::Error;
use tracing::debug;

use crate::simctl::{OsVersionBuckets, SimctlError, SimulatorDirectory, SimulatorInfo};

/// OS version value that selects the newest installed iOS runtime.
pub const LATEST_OS_VERSION: &str = "latest";

/// Bucket label prefix of the iOS platform family.
pub const IOS_PLATFORM_PREFIX: &str = "iOS";

/// Errors raised while resolving a simulator.
#[derive(Error, Debug)]
pub enum SelectError {
    /// A bucket label of the iOS family does not end in a version number.
    #[error("Failed to parse version ({version}): {reason}")]
    InvalidVersion { version: String, reason: String },

    /// No iOS bucket exists to pick the latest version from.
    #[error("Failed to determine latest iOS simulator version")]
    NoLatestVersion,

    /// The OS version bucket does not exist.
    #[error("No simulators found for os version: {0}")]
    NoBucket(String),

    /// The bucket exists but holds no device with the requested name.
    #[error("No simulators found for os version: ({os_version}), device name: ({device})")]
    NoDevice { os_version: String, device: String },

    /// The simulator directory could not be read.
    #[error("simctl error: {0}")]
    Simctl(#[from] SimctlError),
}

/// A dotted, all-numeric OS version such as `12.1` or `16.4.1`.
///
/// Ordering compares components numerically, treating missing trailing
/// components as zero, so `12.10 > 12.9` and `12.1 == 12.1.0`.
#[derive(Debug, Clone)]
pub struct OsVersion {
    segments: Vec<u64>,
}

impl OsVersion {
    pub fn major(&self) -> u64 {
        self.segment(0)
    }

    pub fn minor(&self) -> u64 {
        self.segment(1)
    }

    fn segment(&self, index: usize) -> u64 {
        self.segments.get(index).copied().unwrap_or(0)
    }
}

impl FromStr for OsVersion {
    type Err = SelectError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| SelectError::InvalidVersion {
            version: s.to_string(),
            reason: reason.to_string(),
        };

        if s.is_empty() {
            return Err(invalid("empty version"));
        }

        let segments = s
            .split('.')
            .map(|part| part.parse::<u64>().map_err(|_| invalid("malformed version component")))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { segments })
    }
}

impl Ord for OsVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.segments.len().max(other.segments.len());
        (0..len)
            .map(|i| self.segment(i).cmp(&other.segment(i)))
            .find(|ordering| ordering.is_ne())
            .unwrap_or(Ordering::Equal)
    }
}

impl PartialOrd for OsVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for OsVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for OsVersion {}

impl fmt::Display for OsVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.segments.iter().map(u64::to_string).collect();
        write!(f, "{}", parts.join("."))
    }
}

/// Returns the bucket label of the newest iOS version, formatted as
/// `iOS <major>.<minor>`.
///
/// Labels outside the iOS family are ignored. An iOS label whose suffix is
/// not a version fails the whole lookup rather than being skipped.
pub fn latest_os_version(buckets: &OsVersionBuckets) -> Result<String, SelectError> {
    let mut latest: Option<OsVersion> = None;

    for label in buckets.keys() {
        let Some(suffix) = label.strip_prefix(IOS_PLATFORM_PREFIX) else {
            continue;
        };

        let version: OsVersion = suffix.trim().parse()?;
        if latest.as_ref().map_or(true, |current| version > *current) {
            latest = Some(version);
        }
    }

    let latest = latest.ok_or(SelectError::NoLatestVersion)?;
    Ok(format!(
        "{} {}.{}",
        IOS_PLATFORM_PREFIX,
        latest.major(),
        latest.minor()
    ))
}

/// Resolves `(os_version, device_name)` against a set of buckets.
///
/// When several devices in the bucket share the name, the first one listed
/// is returned.
pub fn resolve(
    buckets: &OsVersionBuckets,
    os_version: &str,
    device_name: &str,
) -> Result<SimulatorInfo, SelectError> {
    let os_version = if os_version == LATEST_OS_VERSION {
        let latest = latest_os_version(buckets)?;
        debug!(os_version = %latest, "Resolved latest OS version");
        latest
    } else {
        os_version.to_string()
    };

    let devices = buckets
        .get(&os_version)
        .ok_or_else(|| SelectError::NoBucket(os_version.clone()))?;

    devices
        .iter()
        .find(|info| info.name == device_name)
        .cloned()
        .ok_or(SelectError::NoDevice {
            os_version,
            device: device_name.to_string(),
        })
}

/// Reads the simulator directory and resolves the configured simulator.
pub fn select(
    directory: &dyn SimulatorDirectory,
    os_version: &str,
    device_name: &str,
) -> Result<SimulatorInfo, SelectError> {
    let buckets = directory.os_version_buckets()?;
    resolve(&buckets, os_version, device_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sim(name: &str, udid: &str) -> SimulatorInfo {
        SimulatorInfo {
            name: name.to_string(),
            udid: udid.to_string(),
            state: "Shutdown".to_string(),
        }
    }

    fn buckets(entries: &[(&str, Vec<SimulatorInfo>)]) -> OsVersionBuckets {
        entries
            .iter()
            .map(|(label, devices)| (label.to_string(), devices.clone()))
            .collect()
    }

    fn version(s: &str) -> OsVersion {
        s.parse().unwrap()
    }

    #[test]
    fn os_version_compares_numerically() {
        assert!(version("12.10") > version("12.9"));
        assert!(version("13.0") > version("12.4.1"));
        assert!(version("12.1.1") > version("12.1"));
        assert_eq!(version("12.1"), version("12.1.0"));
    }

    #[test]
    fn os_version_rejects_garbage() {
        assert!("".parse::<OsVersion>().is_err());
        assert!("12.x".parse::<OsVersion>().is_err());
        assert!("beta".parse::<OsVersion>().is_err());
    }

    #[test]
    fn os_version_display() {
        assert_eq!(version("16.4.1").to_string(), "16.4.1");
        assert_eq!(version("16").major(), 16);
        assert_eq!(version("16").minor(), 0);
    }

    #[test]
    fn latest_picks_numeric_maximum() {
        let b = buckets(&[
            ("iOS 9.3", vec![]),
            ("iOS 10.0", vec![]),
            ("iOS 12.10", vec![]),
            ("iOS 12.9", vec![]),
        ]);
        assert_eq!(latest_os_version(&b).unwrap(), "iOS 12.10");
    }

    #[test]
    fn latest_drops_patch_component() {
        let b = buckets(&[("iOS 16.4.1", vec![]), ("iOS 16.2", vec![])]);
        assert_eq!(latest_os_version(&b).unwrap(), "iOS 16.4");
    }

    #[test]
    fn latest_ignores_other_platforms() {
        let b = buckets(&[
            ("iOS 11.4", vec![]),
            ("tvOS 17.0", vec![]),
            ("watchOS 10.0", vec![]),
        ]);
        assert_eq!(latest_os_version(&b).unwrap(), "iOS 11.4");
    }

    #[test]
    fn latest_fails_without_ios_buckets() {
        let b = buckets(&[("tvOS 17.0", vec![])]);
        assert!(matches!(
            latest_os_version(&b),
            Err(SelectError::NoLatestVersion)
        ));
    }

    #[test]
    fn latest_fails_on_unparsable_ios_label() {
        let b = buckets(&[("iOS 12.1", vec![]), ("iOS beta", vec![])]);
        assert!(matches!(
            latest_os_version(&b),
            Err(SelectError::InvalidVersion { .. })
        ));
    }

    #[test]
    fn resolve_latest_scenario() {
        let b = buckets(&[
            ("iOS 12.1", vec![sim("iPhone 8", "X")]),
            ("iOS 11.4", vec![sim("iPhone 8", "Y")]),
        ]);

        let info = resolve(&b, LATEST_OS_VERSION, "iPhone 8").unwrap();
        assert_eq!(info.udid, "X");
    }

    #[test]
    fn resolve_literal_bucket() {
        let b = buckets(&[
            ("iOS 12.1", vec![sim("iPhone 8", "X")]),
            ("iOS 11.4", vec![sim("iPhone 8", "Y")]),
        ]);

        let info = resolve(&b, "iOS 11.4", "iPhone 8").unwrap();
        assert_eq!(info.udid, "Y");
    }

    #[test]
    fn resolve_missing_bucket_is_not_found() {
        let b = buckets(&[("iOS 12.1", vec![sim("iPhone 8", "X")])]);

        match resolve(&b, "iOS 12", "iPhone 8") {
            Err(SelectError::NoBucket(label)) => assert_eq!(label, "iOS 12"),
            other => panic!("Expected NoBucket, got: {:?}", other),
        }
    }

    #[test]
    fn resolve_requires_exact_device_name() {
        let b = buckets(&[("iOS 12.1", vec![sim("iPhone 8 Plus", "P")])]);

        match resolve(&b, "iOS 12.1", "iPhone 8") {
            Err(SelectError::NoDevice { os_version, device }) => {
                assert_eq!(os_version, "iOS 12.1");
                assert_eq!(device, "iPhone 8");
            }
            other => panic!("Expected NoDevice, got: {:?}", other),
        }
    }

    #[test]
    fn resolve_duplicate_names_picks_first() {
        let b = buckets(&[(
            "iOS 12.1",
            vec![sim("iPhone 8", "first"), sim("iPhone 8", "second")],
        )]);

        assert_eq!(resolve(&b, "iOS 12.1", "iPhone 8").unwrap().udid, "first");
    }

    #[test]
    fn error_display_no_device() {
        let err = SelectError::NoDevice {
            os_version: "iOS 12.1".to_string(),
            device: "iPhone 8".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "No simulators found for os version: (iOS 12.1), device name: (iPhone 8)"
        );
    }
}
