//! Records persisted for projects and their versions.

use serde::de::Error as DeError;
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// `file_path` value of a project whose data lives in `sub_versions`.
pub const PARTITIONED_FILE_PATH: &str = "partitioned";

/// Version of a materialized file: whole-dataset versions are `0` (raw
/// upload), `1` (cleaned) and `2` (renamed); partitions of version 2 are
/// `2.1`, `2.2`, ...
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VersionNumber {
    Whole(u32),
    Partition { base: u32, index: u32 },
}

impl VersionNumber {
    pub const RAW: VersionNumber = VersionNumber::Whole(0);
    pub const CLEANED: VersionNumber = VersionNumber::Whole(1);
    pub const RENAMED: VersionNumber = VersionNumber::Whole(2);

    pub fn partition_of_renamed(index: u32) -> Self {
        VersionNumber::Partition { base: 2, index }
    }

    /// Key used in a project's version log, e.g. `v1` or `v2.3`.
    pub fn label(&self) -> String {
        format!("v{self}")
    }

    pub fn is_whole(&self) -> bool {
        matches!(self, VersionNumber::Whole(_))
    }
}

impl fmt::Display for VersionNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VersionNumber::Whole(n) => write!(f, "{n}"),
            VersionNumber::Partition { base, index } => write!(f, "{base}.{index}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidVersionNumber(pub String);

impl fmt::Display for InvalidVersionNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid version number: {:?}", self.0)
    }
}

impl std::error::Error for InvalidVersionNumber {}

impl FromStr for VersionNumber {
    type Err = InvalidVersionNumber;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || InvalidVersionNumber(s.to_string());
        let trimmed = s.trim().trim_start_matches('v');
        match trimmed.split_once('.') {
            None => trimmed.parse().map(VersionNumber::Whole).map_err(|_| invalid()),
            Some((base, index)) => {
                let base = base.parse().map_err(|_| invalid())?;
                let index: u32 = index.parse().map_err(|_| invalid())?;
                if index == 0 {
                    return Err(invalid());
                }
                Ok(VersionNumber::Partition { base, index })
            }
        }
    }
}

impl Serialize for VersionNumber {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for VersionNumber {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(D::Error::custom)
    }
}

/// One entry of a project's ordered version log, serialized as the
/// single-key object `{"v1": "<version id>"}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionRef {
    pub label: String,
    pub version_id: String,
}

impl VersionRef {
    pub fn new(number: VersionNumber, version_id: impl Into<String>) -> Self {
        Self {
            label: number.label(),
            version_id: version_id.into(),
        }
    }

    pub fn number(&self) -> Option<VersionNumber> {
        self.label.parse().ok()
    }
}

impl Serialize for VersionRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(&self.label, &self.version_id)?;
        map.end()
    }
}

impl<'de> Deserialize<'de> for VersionRef {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let map = BTreeMap::<String, String>::deserialize(deserializer)?;
        if map.len() != 1 {
            return Err(D::Error::custom(format!(
                "version reference must have exactly one entry, found {}",
                map.len()
            )));
        }
        let (label, version_id) = map.into_iter().next().ok_or_else(|| {
            D::Error::custom("version reference must have exactly one entry")
        })?;
        Ok(Self { label, version_id })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatatypeMapping {
    pub column_name: String,
    pub datatype: String,
}

/// Descriptor of one tag partition file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagPartition {
    pub version_id: String,
    pub tag: String,
    pub tag_type: String,
    pub file_path: String,
    pub version_number: VersionNumber,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub project_id: String,
    pub user_id: String,
    pub name: String,
    pub file_path: String,
    pub version_number: VersionNumber,
    pub datatype_mapping: Vec<DatatypeMapping>,
    pub versions: Vec<VersionRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_versions: Option<Vec<TagPartition>>,
    pub remove_duplicates: bool,
    #[serde(rename = "name_of_the_column_with_tags")]
    pub tag_column: Option<String>,
    #[serde(rename = "name_of_the_column_with_tag_type")]
    pub tag_type_column: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl Project {
    pub fn is_partitioned(&self) -> bool {
        self.sub_versions.is_some() || self.file_path == PARTITIONED_FILE_PATH
    }

    /// Id of the most recent whole-dataset version in the log.
    pub fn latest_whole_version_id(&self) -> Option<&str> {
        self.versions
            .iter()
            .rev()
            .find(|r| r.number().is_some_and(|n| n.is_whole()))
            .map(|r| r.version_id.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct NewProject {
    pub user_id: String,
    pub name: String,
    pub file_path: String,
    pub remove_duplicates: bool,
}

/// Caller-editable project fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ProjectSettings {
    pub datatype_mapping: Vec<DatatypeMapping>,
    #[serde(default, rename = "name_of_the_column_with_tags")]
    pub tag_column: Option<String>,
    #[serde(default, rename = "name_of_the_column_with_tag_type")]
    pub tag_type_column: Option<String>,
}

/// Immutable ledger entry for one materialized file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionRecord {
    pub version_id: String,
    pub project_id: String,
    pub description: String,
    pub file_path: String,
    pub version_number: VersionNumber,
    pub created_at: String,
}
