use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Protocol ruleset tag active at a given chain height
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProtocolVersion(pub u32);

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// Height → protocol version lookup supplied by the host chain.
pub trait VersionResolver: Send + Sync {
    fn version_at(&self, height: u64) -> ProtocolVersion;
}

/// Monotonic activation schedule: each entry activates at its height and
/// stays active until the next one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionSchedule {
    activations: BTreeMap<u64, ProtocolVersion>,
}

impl VersionSchedule {
    /// Create a schedule from `(activation_height, version)` pairs.
    ///
    /// Versions must not decrease as heights increase.
    pub fn new(pairs: impl IntoIterator<Item = (u64, ProtocolVersion)>) -> Result<Self, String> {
        let activations: BTreeMap<u64, ProtocolVersion> = pairs.into_iter().collect();

        if activations.is_empty() {
            return Err("Version schedule must contain at least one activation".to_string());
        }

        let mut previous: Option<ProtocolVersion> = None;
        for (height, version) in &activations {
            if let Some(prev) = previous {
                if *version < prev {
                    return Err(format!(
                        "Version {} at height {} is older than {}",
                        version, height, prev
                    ));
                }
            }
            previous = Some(*version);
        }

        Ok(Self { activations })
    }

    /// Single version from genesis onwards
    pub fn fixed(version: ProtocolVersion) -> Self {
        let mut activations = BTreeMap::new();
        activations.insert(0, version);
        Self { activations }
    }

    /// Parse `"0:2,300:3"` style schedules
    pub fn parse(schedule: &str) -> Result<Self, String> {
        let mut pairs = Vec::new();
        for part in schedule.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let (height, version) = part
                .split_once(':')
                .ok_or_else(|| format!("Invalid schedule entry: {}", part))?;
            let height = height
                .trim()
                .parse::<u64>()
                .map_err(|e| format!("Invalid activation height '{}': {}", height, e))?;
            let version = version
                .trim()
                .parse::<u32>()
                .map_err(|e| format!("Invalid protocol version '{}': {}", version, e))?;
            pairs.push((height, ProtocolVersion(version)));
        }
        Self::new(pairs)
    }

    pub fn activations(&self) -> impl Iterator<Item = (u64, ProtocolVersion)> + '_ {
        self.activations.iter().map(|(h, v)| (*h, *v))
    }
}

impl VersionResolver for VersionSchedule {
    fn version_at(&self, height: u64) -> ProtocolVersion {
        // Heights below the first activation run the first version
        self.activations
            .range(..=height)
            .next_back()
            .or_else(|| self.activations.iter().next())
            .map(|(_, v)| *v)
            .unwrap_or(ProtocolVersion(0))
    }
}

impl Default for VersionSchedule {
    fn default() -> Self {
        Self::fixed(ProtocolVersion(3))
    }
}
