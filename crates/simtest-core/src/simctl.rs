//! Simulator discovery through `xcrun simctl`.
//!
//! This module lists the installed iOS Simulators and groups them by OS
//! version bucket (e.g. `"iOS 17.0"`), which is the shape the simulator
//! selector works on.
//!
//! # Requirements
//!
//! Needs an Xcode installation; `xcrun simctl` ships with it.
//!
//! # Example
//!
//! ```no_run
//! use simtest_core::simctl::Simctl;
//!
//! let buckets = Simctl::list_buckets().unwrap();
//! for (os_version, devices) in &buckets {
//!     for device in devices {
//!         println!("{os_version}: {} ({})", device.name, device.udid);
//!     }
//! }
//! ```

use std::collections::{BTreeMap, HashMap};
use std::process::Command;

use serde::{Deserialize, Serialize};
use thiserror::Error;

const RUNTIME_PREFIX: &str = "com.apple.CoreSimulator.SimRuntime.";

/// Errors raised while listing simulators.
#[derive(Error, Debug)]
pub enum SimctlError {
    /// `simctl` exited unsuccessfully; carries its stderr.
    #[error("simctl failed: {0}")]
    CommandFailed(String),

    /// The device list was not the expected JSON.
    #[error("Failed to parse simctl device list: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// `xcrun` could not be started.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A resolved iOS Simulator identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulatorInfo {
    /// Device name as shown in Xcode (`iPhone 8`).
    pub name: String,

    /// Simulator UDID.
    pub udid: String,

    /// `Booted`, `Shutdown`, ...
    pub state: String,
}

/// Simulators keyed by OS version bucket label (`"iOS 12.1"`).
pub type OsVersionBuckets = BTreeMap<String, Vec<SimulatorInfo>>;

/// Source of the available simulators.
///
/// [`Simctl`] is the production implementation; tests provide fixed maps.
pub trait SimulatorDirectory {
    /// Returns every available simulator grouped by OS version bucket.
    fn os_version_buckets(&self) -> Result<OsVersionBuckets, SimctlError>;
}

#[derive(Debug, Deserialize)]
struct RawDevice {
    udid: String,
    name: String,
    state: String,
    #[serde(rename = "isAvailable", default)]
    is_available: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct DeviceList {
    devices: HashMap<String, Vec<RawDevice>>,
}

/// The real simulator directory.
pub struct Simctl;

impl Simctl {
    /// Lists all available simulators grouped by OS version bucket.
    ///
    /// Runs `xcrun simctl list devices -j`.
    ///
    /// Fails when `xcrun` cannot be started or does not print a device list.
    pub fn list_buckets() -> Result<OsVersionBuckets, SimctlError> {
        let output = Command::new("xcrun")
            .args(["simctl", "list", "devices", "-j"])
            .output()?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SimctlError::CommandFailed(stderr.trim().to_string()));
        }

        Self::parse_device_list(&output.stdout)
    }

    /// Parses `simctl list devices -j` output into OS version buckets.
    ///
    /// Runtime identifiers are converted to bucket labels with
    /// [`Self::bucket_label`]. Devices reported as unavailable are dropped,
    /// and so are buckets left without any device.
    pub fn parse_device_list(json: &[u8]) -> Result<OsVersionBuckets, SimctlError> {
        let list: DeviceList = serde_json::from_slice(json)?;

        let mut buckets = OsVersionBuckets::new();
        for (runtime, devices) in list.devices {
            let available: Vec<SimulatorInfo> = devices
                .into_iter()
                .filter(|d| d.is_available != Some(false))
                .map(|d| SimulatorInfo {
                    name: d.name,
                    udid: d.udid,
                    state: d.state,
                })
                .collect();

            if available.is_empty() {
                continue;
            }

            buckets
                .entry(Self::bucket_label(&runtime))
                .or_default()
                .extend(available);
        }

        Ok(buckets)
    }

    /// Converts a simctl runtime key into an OS version bucket label.
    ///
    /// `com.apple.CoreSimulator.SimRuntime.iOS-17-0` becomes `iOS 17.0`.
    /// Keys that are not runtime identifiers are returned unchanged.
    pub fn bucket_label(runtime: &str) -> String {
        let Some(rest) = runtime.strip_prefix(RUNTIME_PREFIX) else {
            return runtime.to_string();
        };

        match rest.split_once('-') {
            Some((platform, version)) => format!("{} {}", platform, version.replace('-', ".")),
            None => rest.to_string(),
        }
    }
}

impl SimulatorDirectory for Simctl {
    fn os_version_buckets(&self) -> Result<OsVersionBuckets, SimctlError> {
        Self::list_buckets()
    }
}
