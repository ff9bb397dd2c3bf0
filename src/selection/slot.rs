//! Selection slots, target formats, and payload values.
//!
//! Slot and target names are the literal upper-case atom names X expects
//! (`PRIMARY`, `CLIPBOARD`, `UTF8_STRING`, ...). Slots form a closed set;
//! targets are open, but only the text family is ever converted.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::SelectionError;

/// One of the three system-wide selection slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SelectionSlot {
    Primary,
    Secondary,
    Clipboard,
}

impl SelectionSlot {
    pub const ALL: [SelectionSlot; 3] = [Self::Primary, Self::Secondary, Self::Clipboard];

    /// The atom name of this slot.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Primary => "PRIMARY",
            Self::Secondary => "SECONDARY",
            Self::Clipboard => "CLIPBOARD",
        }
    }
}

impl FromStr for SelectionSlot {
    type Err = SelectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PRIMARY" => Ok(Self::Primary),
            "SECONDARY" => Ok(Self::Secondary),
            "CLIPBOARD" => Ok(Self::Clipboard),
            other => Err(SelectionError::InvalidSlot(other.to_string())),
        }
    }
}

impl fmt::Display for SelectionSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A format a requester asks the owner to convert the selection into.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TargetType {
    /// `TEXT`: "whatever text encoding the owner prefers".
    Text,
    Utf8String,
    /// `STRING`: Latin-1 text.
    String,
    /// `text/plain;charset=utf-8`
    PlainUtf8,
    /// `MULTIPLE`: several conversions in one transaction. Never served.
    Multiple,
    Other(String),
}

impl TargetType {
    /// Targets advertised when asserting a text payload, in preference
    /// order.
    pub const TEXT_TARGETS: [TargetType; 4] = [
        TargetType::Utf8String,
        TargetType::Text,
        TargetType::String,
        TargetType::PlainUtf8,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            Self::Text => "TEXT",
            Self::Utf8String => "UTF8_STRING",
            Self::String => "STRING",
            Self::PlainUtf8 => "text/plain;charset=utf-8",
            Self::Multiple => "MULTIPLE",
            Self::Other(name) => name,
        }
    }

    /// Whether a text payload can be handed out in this format.
    pub fn is_text(&self) -> bool {
        matches!(
            self,
            Self::Text | Self::Utf8String | Self::String | Self::PlainUtf8
        )
    }
}

impl From<&str> for TargetType {
    fn from(name: &str) -> Self {
        match name {
            "TEXT" => Self::Text,
            "UTF8_STRING" => Self::Utf8String,
            "STRING" => Self::String,
            "text/plain;charset=utf-8" => Self::PlainUtf8,
            "MULTIPLE" => Self::Multiple,
            other => Self::Other(other.to_string()),
        }
    }
}

impl fmt::Display for TargetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The value a caller asks to assert as a selection.
///
/// Only `Text` is ever handed to the windowing system. `Opaque` values
/// (markers, structured data, ...) are accepted and echoed back but never
/// asserted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectionValue {
    Text(#[serde(with = "serde_bytes")] Vec<u8>),
    Opaque(String),
}

impl SelectionValue {
    pub fn as_text(&self) -> Option<&[u8]> {
        match self {
            Self::Text(bytes) => Some(bytes),
            Self::Opaque(_) => None,
        }
    }
}

/// Data retrieved from a selection owner, tagged with the format it
/// arrived in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignSelection {
    pub data: Vec<u8>,
    pub format: TargetType,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slot_names_parse() {
        for slot in SelectionSlot::ALL {
            assert_eq!(slot.as_str().parse::<SelectionSlot>().unwrap(), slot);
        }
    }

    #[test]
    fn slot_names_are_case_sensitive() {
        let err = "clipboard".parse::<SelectionSlot>().unwrap_err();
        assert!(matches!(err, SelectionError::InvalidSlot(ref s) if s == "clipboard"));
    }

    #[test]
    fn unknown_slot_rejected() {
        assert!("DND".parse::<SelectionSlot>().is_err());
        assert!("".parse::<SelectionSlot>().is_err());
    }

    #[test]
    fn text_family_targets() {
        for target in &TargetType::TEXT_TARGETS {
            assert!(target.is_text(), "{target} should be text");
        }
        assert!(!TargetType::Multiple.is_text());
        assert!(!TargetType::from("image/png").is_text());
    }

    #[test]
    fn target_names_map_back() {
        assert_eq!(TargetType::from("UTF8_STRING"), TargetType::Utf8String);
        assert_eq!(TargetType::from("MULTIPLE"), TargetType::Multiple);
        assert_eq!(TargetType::from("TIMESTAMP").as_str(), "TIMESTAMP");
    }

    #[test]
    fn opaque_value_has_no_text() {
        assert!(SelectionValue::Opaque("marker".into()).as_text().is_none());
        assert_eq!(
            SelectionValue::Text(b"hi".to_vec()).as_text(),
            Some(&b"hi"[..])
        );
    }
}
