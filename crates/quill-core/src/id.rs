use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum IdError {
    #[error("Invalid subject ID: {0}")]
    Invalid(String),
}

/// Numeric identifier of an authenticated principal.
///
/// Serialized as a decimal string so it survives JSON consumers that lose
/// precision above 2^53.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubjectId(pub u64);

impl SubjectId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn get(self) -> u64 {
        self.0
    }

    pub fn to_le_bytes(self) -> [u8; 8] {
        self.0.to_le_bytes()
    }

    pub fn from_le_bytes(bytes: [u8; 8]) -> Self {
        Self(u64::from_le_bytes(bytes))
    }
}

impl From<u64> for SubjectId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for SubjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SubjectId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<u64>()
            .map(SubjectId)
            .map_err(|_| IdError::Invalid(s.to_string()))
    }
}

impl Serialize for SubjectId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for SubjectId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        SubjectId::from_str(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subject_id_display_and_parse() {
        let id = SubjectId::new(42);
        assert_eq!(id.to_string(), "42");
        assert_eq!("42".parse::<SubjectId>().unwrap(), id);
    }

    #[test]
    fn test_subject_id_parse_invalid() {
        assert!("".parse::<SubjectId>().is_err());
        assert!("-1".parse::<SubjectId>().is_err());
        assert!("abc".parse::<SubjectId>().is_err());
    }

    #[test]
    fn test_subject_id_serializes_as_string() {
        let id = SubjectId::new(u64::MAX);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", u64::MAX));

        let back: SubjectId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn test_subject_id_le_bytes() {
        let id = SubjectId::new(0x0102_0304_0506_0708);
        let bytes = id.to_le_bytes();
        assert_eq!(bytes[0], 0x08);
        assert_eq!(SubjectId::from_le_bytes(bytes), id);
    }
}
