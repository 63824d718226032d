//! String IDs: the standard strings followed by the font's own String INDEX.

use lazy_static::lazy_static;
use rustc_hash::FxHashMap;

use super::index::Index;
use super::tables::{NUM_STANDARD_STRINGS, STANDARD_STRINGS};
use crate::error::WriteError;

/// String ID
pub type SID = u16;

lazy_static! {
    static ref STANDARD_SIDS: FxHashMap<&'static str, SID> = STANDARD_STRINGS
        .iter()
        .enumerate()
        .map(|(sid, &name)| (name, sid as SID))
        .collect();
}

/// The combined standard and custom string table of a font.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Strings {
    custom: Vec<String>,
}

impl Strings {
    pub fn new() -> Self {
        Strings::default()
    }

    /// Decode a String INDEX. Strings are treated as Latin-1.
    pub fn from_index(index: &Index) -> Self {
        let custom = index.iter().map(latin1_to_string).collect();
        Strings { custom }
    }

    /// Number of custom strings.
    pub fn count(&self) -> usize {
        self.custom.len()
    }

    /// Look up the string for `sid`, `.notdef` if it does not exist.
    pub fn get(&self, sid: usize) -> &str {
        if sid < NUM_STANDARD_STRINGS {
            return STANDARD_STRINGS[sid];
        }
        self.custom
            .get(sid - NUM_STANDARD_STRINGS)
            .map(String::as_str)
            .unwrap_or(STANDARD_STRINGS[0])
    }

    /// Find the SID of `name`, checking the standard strings first.
    pub fn sid(&self, name: &str) -> Option<SID> {
        if let Some(&sid) = STANDARD_SIDS.get(name) {
            return Some(sid);
        }
        self.custom
            .iter()
            .position(|custom| custom == name)
            .and_then(|index| SID::try_from(index + NUM_STANDARD_STRINGS).ok())
    }

    pub fn add(&mut self, name: impl Into<String>) {
        self.custom.push(name.into());
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> + '_ {
        self.custom.iter().map(String::as_str)
    }

    pub(crate) fn to_index(&self) -> Result<Index, WriteError> {
        self.custom
            .iter()
            .map(|name| string_to_latin1(name))
            .collect::<Result<Vec<_>, _>>()
            .map(Index::from)
    }
}

pub(crate) fn latin1_to_string(bytes: &[u8]) -> String {
    bytes.iter().copied().map(char::from).collect()
}

fn string_to_latin1(text: &str) -> Result<Vec<u8>, WriteError> {
    text.chars()
        .map(|c| u8::try_from(c).map_err(|_| WriteError::BadValue))
        .collect()
}
