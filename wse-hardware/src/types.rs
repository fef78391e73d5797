// Copyright (c) 2026 Graphcore Ltd. All rights reserved.

//! Types that map directly to the hardware/placement file contents, and the
//! error type shared by the hardware layer.

use std::collections::BTreeMap;
use std::error::Error;
use std::fmt;
use std::path::Path;

use byte_unit::Byte;
use serde::{Deserialize, Serialize, de};
use serde_yaml::Value;

use crate::Coordinate;

#[macro_export]
/// Build an `Err(HwError)` from a format string and arguments
macro_rules! hw_error {
    ($($arg:tt)*) => {
        Err($crate::types::HwError(format!($($arg)*)))
    };
}

/// The `HwError` is returned for invalid hardware descriptions, placements
/// and lookups of resources that do not exist.
#[derive(Debug, Clone, PartialEq)]
pub struct HwError(pub String);

impl fmt::Display for HwError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Error: {}", self.0)
    }
}

impl Error for HwError {}

pub type HwResult = Result<(), HwError>;

/// Default fabric clock (1GHz) used to quantise link transfers into flits.
pub const DEFAULT_CLOCK_FREQUENCY_HZ: f64 = 1e9;

/// Parse a rate (bytes or operations per second).
///
/// Plain numbers (including floating point ones such as `1.5e11`) are taken
/// as-is. Strings are either hex (`0x1000_0000`) or byte strings with units
/// (`10B`, `10GB`, `10GiB`).
pub fn parse_rate<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: de::Deserializer<'de>,
{
    let value: Value = Deserialize::deserialize(deserializer)?;
    if let Some(number) = value.as_f64() {
        return Ok(number);
    }
    let num_bytes = byte_value_to_u64(&value).map_err(de::Error::custom)?;
    Ok(num_bytes as f64)
}

fn byte_value_to_u64(value: &Value) -> Result<u64, String> {
    if let Some(number) = value.as_u64() {
        return Ok(number);
    }

    let s = match value.as_str() {
        Some(s) => s.to_owned(),
        None => {
            return Err(format!(
                "'{value:?}': Unsupported type for Deserialize (should be u64 or String)"
            ));
        }
    };

    // Convert to lowercase in order to standardise any 0x prefix
    let lowercase = s.to_lowercase();

    if lowercase.starts_with("0x") {
        let without_underscore = lowercase.replace('_', "");
        let without_0x = without_underscore.trim_start_matches("0x");
        u64::from_str_radix(without_0x, 16)
            .map_err(|e| format!("Unable to parse {s} as hex string: {e}"))
    } else {
        let ignore_case = false;
        let num_bytes = Byte::parse_str(&s, ignore_case)
            .map_err(|e| format!("Unable to parse {s} as Byte string: {e}"))?;
        Ok(num_bytes.as_u64())
    }
}

#[derive(clap::ValueEnum, Clone, Copy, Default, Debug, Serialize, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RoutingAlgorithm {
    #[default]
    /// Move along the columns (`y`) first
    ColumnFirst,

    /// Move along the rows (`x`) first
    RowFirst,
}

impl RoutingAlgorithm {
    #[must_use]
    pub fn flipped(self) -> Self {
        match self {
            RoutingAlgorithm::ColumnFirst => RoutingAlgorithm::RowFirst,
            RoutingAlgorithm::RowFirst => RoutingAlgorithm::ColumnFirst,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DramStacking {
    /// DRAM ports surround the reticle array
    #[serde(rename = "2d")]
    TwoD,

    /// One DRAM port stacked under every reticle
    #[serde(rename = "3d")]
    ThreeD,
}

/// Description of a wafer: an `H x W` array of reticles with DRAM ports.
#[derive(Debug, Deserialize)]
pub struct WaferConfig {
    pub reticle_array_height: usize,
    pub reticle_array_width: usize,

    /// Operations per second of a single reticle
    #[serde(deserialize_with = "parse_rate")]
    pub reticle_compute_power: f64,

    /// Bytes per second of each directed link between neighbouring nodes
    #[serde(deserialize_with = "parse_rate")]
    pub inter_reticle_bandwidth: f64,

    /// Bytes per second of each DRAM port
    #[serde(deserialize_with = "parse_rate")]
    pub dram_bandwidth: f64,

    pub dram_stacking: DramStacking,

    pub clock_frequency: Option<f64>,

    pub routing: Option<RoutingAlgorithm>,
}

impl WaferConfig {
    pub fn from_file(wafer_path: &Path) -> Result<Self, HwError> {
        let s = std::fs::read_to_string(wafer_path)
            .map_err(|e| HwError(format!("Unable to read {}: {e}", wafer_path.display())))?;
        Self::from_string(&s)
    }

    pub fn from_string(wafer_str: &str) -> Result<Self, HwError> {
        let cfg: WaferConfig = serde_yaml::from_str(wafer_str)
            .map_err(|e| HwError(format!("serde_yaml::from_str failed: {e}")))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> HwResult {
        let mut errors = Vec::new();
        if self.reticle_array_height == 0 || self.reticle_array_width == 0 {
            errors.push(format!(
                "Invalid reticle array {}x{}",
                self.reticle_array_height, self.reticle_array_width
            ));
        }
        for (name, value) in [
            ("reticle_compute_power", self.reticle_compute_power),
            ("inter_reticle_bandwidth", self.inter_reticle_bandwidth),
            ("dram_bandwidth", self.dram_bandwidth),
            ("clock_frequency", self.clock_frequency()),
        ] {
            if !(value.is_finite() && value > 0.0) {
                errors.push(format!("{name} must be positive, got {value}"));
            }
        }

        if !errors.is_empty() {
            return hw_error!("Failed to validate wafer:\n{}", errors.join("\n"));
        }
        Ok(())
    }

    #[must_use]
    pub fn clock_frequency(&self) -> f64 {
        self.clock_frequency.unwrap_or(DEFAULT_CLOCK_FREQUENCY_HZ)
    }

    #[must_use]
    pub fn routing(&self) -> RoutingAlgorithm {
        self.routing.unwrap_or_default()
    }

    /// Size of a flit in bytes: what one link moves in one clock cycle.
    #[must_use]
    pub fn flit_size(&self) -> f64 {
        self.inter_reticle_bandwidth / self.clock_frequency()
    }

    /// The most bandwidth the array boundary can carry.
    ///
    /// This is not the conventional bisection bandwidth but the maximum
    /// bandwidth offered across the perimeter of the reticle array.
    #[must_use]
    pub fn bisection_bandwidth(&self) -> f64 {
        2.0 * (self.reticle_array_height + self.reticle_array_width) as f64
            * self.inter_reticle_bandwidth
    }

    #[must_use]
    pub fn num_dram_ports(&self) -> usize {
        match self.dram_stacking {
            DramStacking::TwoD => 2 * (self.reticle_array_height + self.reticle_array_width),
            DramStacking::ThreeD => self.reticle_array_height * self.reticle_array_width,
        }
    }

    #[must_use]
    pub fn total_dram_bandwidth(&self) -> f64 {
        self.num_dram_ports() as f64 * self.dram_bandwidth
    }

    /// Whether `coordinate` lies inside the reticle array.
    #[must_use]
    pub fn is_reticle(&self, coordinate: Coordinate) -> bool {
        (0..self.reticle_array_height as i32).contains(&coordinate.x)
            && (0..self.reticle_array_width as i32).contains(&coordinate.y)
    }

    /// Whether a DRAM port is placed at `coordinate` for this stacking type.
    #[must_use]
    pub fn is_dram_port(&self, coordinate: Coordinate) -> bool {
        match self.dram_stacking {
            DramStacking::ThreeD => self.is_reticle(coordinate),
            DramStacking::TwoD => {
                let h = self.reticle_array_height as i32;
                let w = self.reticle_array_width as i32;
                let x_in = (0..h).contains(&coordinate.x);
                let y_in = (0..w).contains(&coordinate.y);
                let x_edge = coordinate.x == -1 || coordinate.x == h;
                let y_edge = coordinate.y == -1 || coordinate.y == w;
                (x_edge && y_in) || (y_edge && x_in)
            }
        }
    }
}

/// Placement of the workload's virtual identities on physical coordinates.
#[derive(Debug, Default, Deserialize)]
pub struct PlacementConfig {
    #[serde(default)]
    pub reticles: BTreeMap<usize, Coordinate>,

    #[serde(default)]
    pub dram_ports: BTreeMap<usize, Coordinate>,
}

impl PlacementConfig {
    pub fn from_file(placement_path: &Path) -> Result<Self, HwError> {
        let s = std::fs::read_to_string(placement_path).map_err(|e| {
            HwError(format!("Unable to read {}: {e}", placement_path.display()))
        })?;
        Self::from_string(&s)
    }

    pub fn from_string(placement_str: &str) -> Result<Self, HwError> {
        serde_yaml::from_str(placement_str)
            .map_err(|e| HwError(format!("serde_yaml::from_str failed: {e}")))
    }

    /// Check every placement against the wafer it is meant for.
    pub fn validate(&self, wafer: &WaferConfig) -> HwResult {
        let mut errors = Vec::new();
        for (virtual_id, coordinate) in &self.reticles {
            if !wafer.is_reticle(*coordinate) {
                errors.push(format!(
                    "Virtual reticle {virtual_id} placed at {coordinate} which is not a reticle"
                ));
            }
        }
        for (virtual_id, coordinate) in &self.dram_ports {
            if !wafer.is_dram_port(*coordinate) {
                errors.push(format!(
                    "Virtual DRAM port {virtual_id} placed at {coordinate} which is not a DRAM port"
                ));
            }
        }

        if !errors.is_empty() {
            return hw_error!("Failed to validate placement:\n{}", errors.join("\n"));
        }
        Ok(())
    }
}
