use serde::{Deserialize, Serialize};

/// Mapping category
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MappingType {
    Sport,
    Round,
    Team,
    Tournament,
}

impl MappingType {
    pub const ALL: [MappingType; 4] = [
        MappingType::Sport,
        MappingType::Round,
        MappingType::Team,
        MappingType::Tournament,
    ];

    /// Convert from the query-surface index name
    pub fn from_index_name(s: &str) -> Result<Self, String> {
        match s {
            "sports" => Ok(MappingType::Sport),
            "rounds" => Ok(MappingType::Round),
            "teamnames" => Ok(MappingType::Team),
            "tournaments" => Ok(MappingType::Tournament),
            _ => Err(format!("No mapping exists for the mapping index: {}", s)),
        }
    }

    /// Convert to the query-surface index name
    pub fn index_name(&self) -> &'static str {
        match self {
            MappingType::Sport => "sports",
            MappingType::Round => "rounds",
            MappingType::Team => "teamnames",
            MappingType::Tournament => "tournaments",
        }
    }

    /// Wire code used by the opcode codec
    pub fn code(&self) -> u8 {
        match self {
            MappingType::Sport => 0x01,
            MappingType::Round => 0x02,
            MappingType::Team => 0x03,
            MappingType::Tournament => 0x04,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0x01 => Some(MappingType::Sport),
            0x02 => Some(MappingType::Round),
            0x03 => Some(MappingType::Team),
            0x04 => Some(MappingType::Tournament),
            _ => None,
        }
    }
}

/// Write-once association between a numeric id and a display name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingEntry {
    pub category: MappingType,
    pub id: u32,
    pub name: String,
}

impl MappingEntry {
    pub fn new(category: MappingType, id: u32, name: impl Into<String>) -> Self {
        Self {
            category,
            id,
            name: name.into(),
        }
    }
}
