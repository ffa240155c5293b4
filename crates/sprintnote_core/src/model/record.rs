//! Remote record type taxonomy.
//!
//! Closed set of record kinds other components store in sync zones. The zone
//! manager does not use these operationally.

use std::error::Error;
use std::fmt::{Display, Formatter};

/// Remote record kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RecordType {
    Sprint,
    Story,
    StoryInformation,
    Space,
}

/// Record type name for sprints.
pub const RECORD_TYPE_SPRINT: &str = "Sprint";
/// Record type name for stories.
pub const RECORD_TYPE_STORY: &str = "Story";
/// Record type name for story detail payloads.
pub const RECORD_TYPE_STORY_INFORMATION: &str = "StoryInformation";
/// Record type name for spaces.
pub const RECORD_TYPE_SPACE: &str = "Space";

const ALL_RECORD_TYPES: &[RecordType] = &[
    RecordType::Sprint,
    RecordType::Story,
    RecordType::StoryInformation,
    RecordType::Space,
];

impl RecordType {
    /// Stable remote record type name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sprint => RECORD_TYPE_SPRINT,
            Self::Story => RECORD_TYPE_STORY,
            Self::StoryInformation => RECORD_TYPE_STORY_INFORMATION,
            Self::Space => RECORD_TYPE_SPACE,
        }
    }

    pub fn all() -> &'static [RecordType] {
        ALL_RECORD_TYPES
    }
}

impl Display for RecordType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parses one record type name. Names are case-sensitive.
pub fn parse_record_type(value: &str) -> Result<RecordType, RecordTypeError> {
    let normalized = value.trim();
    if normalized.is_empty() {
        return Err(RecordTypeError::Empty);
    }

    match normalized {
        RECORD_TYPE_SPRINT => Ok(RecordType::Sprint),
        RECORD_TYPE_STORY => Ok(RecordType::Story),
        RECORD_TYPE_STORY_INFORMATION => Ok(RecordType::StoryInformation),
        RECORD_TYPE_SPACE => Ok(RecordType::Space),
        other => Err(RecordTypeError::Unsupported(other.to_string())),
    }
}

/// Record type parse errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordTypeError {
    Empty,
    Unsupported(String),
}

impl Display for RecordTypeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => write!(f, "record type must not be empty"),
            Self::Unsupported(value) => write!(f, "record type is unsupported: {value}"),
        }
    }
}

impl Error for RecordTypeError {}
