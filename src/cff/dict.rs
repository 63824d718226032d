//! DICT data: operators, the Top and Private DICT schemas, reading and writing.
//!
//! Refer to section 4 "DICT Data" and tables 9, 10 and 23 of Technical Note #5176.

use std::fmt;
use std::marker::PhantomData;

use log::warn;
use num_traits::ToPrimitive;
use tinyvec::TinyVec;

use super::index::Index;
use super::number::{read_operand, write_number};
use crate::binary::read::{ReadBinary, ReadCtxt};
use crate::binary::write::{WriteBinary, WriteContext};
use crate::binary::{U16Be, U8};
use crate::error::{ParseError, WriteError};

/// Operand list of a single DICT entry.
pub type Operands = TinyVec<[f64; 6]>;

/// Bytes written in place of every offset operand until the real value is known.
pub(crate) const OFFSET_PLACEHOLDER: [u8; 5] = [0x1d, 0, 0, 0, 0];

const ESCAPE: u8 = 12;

/// DICT operator. Two byte operators are stored as `12 << 8 | b1`.
#[repr(u16)]
#[derive(Debug, PartialEq, Eq, Hash, Copy, Clone)]
pub enum Operator {
    Version = 0,
    Notice = 1,
    FullName = 2,
    FamilyName = 3,
    Weight = 4,
    FontBBox = 5,
    BlueValues = 6,
    OtherBlues = 7,
    FamilyBlues = 8,
    FamilyOtherBlues = 9,
    StdHW = 10,
    StdVW = 11,
    UniqueID = 13,
    XUID = 14,
    Charset = 15,
    Encoding = 16,
    CharStrings = 17,
    Private = 18,
    Subrs = 19,
    DefaultWidthX = 20,
    NominalWidthX = 21,
    Copyright = op2(0),
    IsFixedPitch = op2(1),
    ItalicAngle = op2(2),
    UnderlinePosition = op2(3),
    UnderlineThickness = op2(4),
    PaintType = op2(5),
    CharstringType = op2(6),
    FontMatrix = op2(7),
    StrokeWidth = op2(8),
    BlueScale = op2(9),
    BlueShift = op2(10),
    BlueFuzz = op2(11),
    StemSnapH = op2(12),
    StemSnapV = op2(13),
    ForceBold = op2(14),
    LanguageGroup = op2(17),
    ExpansionFactor = op2(18),
    InitialRandomSeed = op2(19),
    SyntheticBase = op2(20),
    PostScript = op2(21),
    BaseFontName = op2(22),
    BaseFontBlend = op2(23),
    ROS = op2(30),
    CIDFontVersion = op2(31),
    CIDFontRevision = op2(32),
    CIDFontType = op2(33),
    CIDCount = op2(34),
    UIDBase = op2(35),
    FDArray = op2(36),
    FDSelect = op2(37),
    FontName = op2(38),
}

const fn op2(value: u8) -> u16 {
    ((ESCAPE as u16) << 8) | (value as u16)
}

/// How the operands of a DICT entry are interpreted.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub enum OperandType {
    Num,
    Sid,
    /// Written as a fixed size placeholder and patched once the target position is known.
    Offset,
    Array,
    Delta,
}

/// Static description of one DICT key.
#[derive(Debug)]
pub struct DictEntry {
    pub operator: Operator,
    pub name: &'static str,
    pub types: &'static [OperandType],
    pub default: Option<&'static [f64]>,
}

impl DictEntry {
    /// Entries with a single `num`, `sid` or `offset` operand keep only their first value.
    fn is_scalar(&self) -> bool {
        matches!(
            self.types,
            [OperandType::Num] | [OperandType::Sid] | [OperandType::Offset]
        )
    }
}

/// The keys a kind of DICT may hold, in serialization order.
pub trait DictSchema {
    const ENTRIES: &'static [DictEntry];

    fn entry(operator: Operator) -> Option<&'static DictEntry> {
        Self::ENTRIES.iter().find(|entry| entry.operator == operator)
    }

    fn operator_by_name(name: &str) -> Option<Operator> {
        Self::ENTRIES
            .iter()
            .find(|entry| entry.name == name)
            .map(|entry| entry.operator)
    }
}

#[derive(Debug, PartialEq, Clone)]
pub struct TopDictSchema;

#[derive(Debug, PartialEq, Clone)]
pub struct PrivateDictSchema;

const NUM: &[OperandType] = &[OperandType::Num];
const SID: &[OperandType] = &[OperandType::Sid];
const OFFSET: &[OperandType] = &[OperandType::Offset];
const ARRAY: &[OperandType] = &[OperandType::Array];
const DELTA: &[OperandType] = &[OperandType::Delta];
const ROS: &[OperandType] = &[OperandType::Sid, OperandType::Sid, OperandType::Num];
const BBOX: &[OperandType] = &[OperandType::Num; 4];
const MATRIX: &[OperandType] = &[OperandType::Num; 6];
const PRIVATE: &[OperandType] = &[OperandType::Offset, OperandType::Offset];

pub const DEFAULT_FONT_MATRIX: [f64; 6] = [0.001, 0.0, 0.0, 0.001, 0.0, 0.0];

const fn entry(
    operator: Operator,
    name: &'static str,
    types: &'static [OperandType],
    default: Option<&'static [f64]>,
) -> DictEntry {
    DictEntry {
        operator,
        name,
        types,
        default,
    }
}

impl DictSchema for TopDictSchema {
    const ENTRIES: &'static [DictEntry] = &[
        entry(Operator::ROS, "ROS", ROS, None),
        entry(Operator::SyntheticBase, "SyntheticBase", NUM, None),
        entry(Operator::Version, "version", SID, None),
        entry(Operator::Notice, "Notice", SID, None),
        entry(Operator::Copyright, "Copyright", SID, None),
        entry(Operator::FullName, "FullName", SID, None),
        entry(Operator::FamilyName, "FamilyName", SID, None),
        entry(Operator::Weight, "Weight", SID, None),
        entry(Operator::IsFixedPitch, "isFixedPitch", NUM, Some(&[0.0])),
        entry(Operator::ItalicAngle, "ItalicAngle", NUM, Some(&[0.0])),
        entry(Operator::UnderlinePosition, "UnderlinePosition", NUM, Some(&[-100.0])),
        entry(Operator::UnderlineThickness, "UnderlineThickness", NUM, Some(&[50.0])),
        entry(Operator::PaintType, "PaintType", NUM, Some(&[0.0])),
        entry(Operator::CharstringType, "CharstringType", NUM, Some(&[2.0])),
        entry(Operator::FontMatrix, "FontMatrix", MATRIX, Some(&DEFAULT_FONT_MATRIX)),
        entry(Operator::UniqueID, "UniqueID", NUM, None),
        entry(Operator::FontBBox, "FontBBox", BBOX, Some(&[0.0; 4])),
        entry(Operator::StrokeWidth, "StrokeWidth", NUM, Some(&[0.0])),
        entry(Operator::XUID, "XUID", ARRAY, None),
        entry(Operator::Charset, "charset", OFFSET, Some(&[0.0])),
        entry(Operator::Encoding, "Encoding", OFFSET, Some(&[0.0])),
        entry(Operator::CharStrings, "CharStrings", OFFSET, Some(&[0.0])),
        entry(Operator::Private, "Private", PRIVATE, None),
        entry(Operator::PostScript, "PostScript", SID, None),
        entry(Operator::BaseFontName, "BaseFontName", SID, None),
        entry(Operator::BaseFontBlend, "BaseFontBlend", DELTA, None),
        entry(Operator::CIDFontVersion, "CIDFontVersion", NUM, Some(&[0.0])),
        entry(Operator::CIDFontRevision, "CIDFontRevision", NUM, Some(&[0.0])),
        entry(Operator::CIDFontType, "CIDFontType", NUM, Some(&[0.0])),
        entry(Operator::CIDCount, "CIDCount", NUM, Some(&[8720.0])),
        entry(Operator::UIDBase, "UIDBase", NUM, None),
        entry(Operator::FDSelect, "FDSelect", OFFSET, None),
        entry(Operator::FDArray, "FDArray", OFFSET, None),
        entry(Operator::FontName, "FontName", SID, None),
    ];
}

impl DictSchema for PrivateDictSchema {
    const ENTRIES: &'static [DictEntry] = &[
        entry(Operator::BlueValues, "BlueValues", DELTA, None),
        entry(Operator::OtherBlues, "OtherBlues", DELTA, None),
        entry(Operator::FamilyBlues, "FamilyBlues", DELTA, None),
        entry(Operator::FamilyOtherBlues, "FamilyOtherBlues", DELTA, None),
        entry(Operator::BlueScale, "BlueScale", NUM, Some(&[0.039625])),
        entry(Operator::BlueShift, "BlueShift", NUM, Some(&[7.0])),
        entry(Operator::BlueFuzz, "BlueFuzz", NUM, Some(&[1.0])),
        entry(Operator::StdHW, "StdHW", NUM, None),
        entry(Operator::StdVW, "StdVW", NUM, None),
        entry(Operator::StemSnapH, "StemSnapH", DELTA, None),
        entry(Operator::StemSnapV, "StemSnapV", DELTA, None),
        entry(Operator::ForceBold, "ForceBold", NUM, Some(&[0.0])),
        entry(Operator::LanguageGroup, "LanguageGroup", NUM, Some(&[0.0])),
        entry(Operator::ExpansionFactor, "ExpansionFactor", NUM, Some(&[0.06])),
        entry(Operator::InitialRandomSeed, "initialRandomSeed", NUM, Some(&[0.0])),
        entry(Operator::DefaultWidthX, "defaultWidthX", NUM, Some(&[0.0])),
        entry(Operator::NominalWidthX, "nominalWidthX", NUM, Some(&[0.0])),
        entry(Operator::Subrs, "Subrs", OFFSET, None),
    ];
}

/// A CFF DICT described in Section 4 of Technical Note #5176
///
/// Values are stored as read. Missing keys fall back to the schema default.
#[derive(Debug, PartialEq, Clone)]
pub struct Dict<S>
where
    S: DictSchema,
{
    dict: Vec<(Operator, Operands)>,
    schema: PhantomData<S>,
}

pub type TopDict = Dict<TopDictSchema>;

/// A Private DICT together with the local subroutines its `Subrs` entry points at.
#[derive(Debug, PartialEq, Clone, Default)]
pub struct PrivateDict {
    pub dict: Dict<PrivateDictSchema>,
    pub subrs: Option<Index>,
}

impl<S: DictSchema> Default for Dict<S> {
    fn default() -> Self {
        Dict {
            dict: Vec::new(),
            schema: PhantomData,
        }
    }
}

impl<S: DictSchema> Dict<S> {
    pub fn new() -> Self {
        Dict::default()
    }

    /// The stored operands for `operator`, or its default.
    pub fn get(&self, operator: Operator) -> Option<&[f64]> {
        self.values(operator)
            .or_else(|| S::entry(operator).and_then(|entry| entry.default))
    }

    /// The stored operands for `operator`, ignoring defaults.
    pub fn values(&self, operator: Operator) -> Option<&[f64]> {
        self.dict
            .iter()
            .find(|(op, _)| *op == operator)
            .map(|(_, operands)| operands.as_slice())
    }

    /// First operand of `operator` (or its default).
    pub fn get_number(&self, operator: Operator) -> Option<f64> {
        self.get(operator).and_then(|operands| operands.first().copied())
    }

    /// First operand of `operator` as a non-negative offset.
    pub fn get_offset(&self, operator: Operator) -> Option<usize> {
        self.get_number(operator).and_then(|value| value.to_usize())
    }

    pub fn has(&self, operator: Operator) -> bool {
        self.dict.iter().any(|(op, _)| *op == operator)
    }

    /// Store `operands` for `operator`, replacing any existing value.
    pub fn set(&mut self, operator: Operator, operands: &[f64]) -> Result<(), ParseError> {
        if S::entry(operator).is_none() {
            return Err(ParseError::UnknownDictKey);
        }
        self.insert(operator, operands);
        Ok(())
    }

    /// Store `operands` for an operator known to be part of the schema.
    pub(crate) fn insert(&mut self, operator: Operator, operands: &[f64]) {
        let operands = Operands::from(operands);
        match self.dict.iter_mut().find(|(op, _)| *op == operator) {
            Some((_, existing)) => *existing = operands,
            None => self.dict.push((operator, operands)),
        }
    }

    pub fn remove(&mut self, operator: Operator) {
        self.dict.retain(|(op, _)| *op != operator);
    }

    pub fn get_by_name(&self, name: &str) -> Result<Option<&[f64]>, ParseError> {
        let operator = S::operator_by_name(name).ok_or(ParseError::UnknownDictKey)?;
        Ok(self.get(operator))
    }

    pub fn set_by_name(&mut self, name: &str, operands: &[f64]) -> Result<(), ParseError> {
        let operator = S::operator_by_name(name).ok_or(ParseError::UnknownDictKey)?;
        self.set(operator, operands)
    }

    /// Whether `name` is a key of this schema with a stored value.
    pub fn has_name(&self, name: &str) -> bool {
        S::operator_by_name(name).map_or(false, |operator| self.has(operator))
    }

    pub fn iter(&self) -> impl Iterator<Item = &(Operator, Operands)> {
        self.dict.iter()
    }

    pub fn len(&self) -> usize {
        self.dict.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dict.is_empty()
    }

    /// Store a value decoded from font data.
    ///
    /// Keys outside the schema and empty operand lists are ignored. An entry containing NaN is
    /// dropped.
    fn set_from_dict_data(&mut self, key: u16, operands: &[f64]) {
        let entry = match Operator::try_from(key).ok().and_then(S::entry) {
            Some(entry) => entry,
            None => return,
        };
        if operands.is_empty() {
            return;
        }
        if operands.iter().any(|value| value.is_nan()) {
            warn!("Invalid CFFDict value: {:?} for key {:?}.", operands, entry.operator);
            return;
        }
        let operands = if entry.is_scalar() {
            &operands[..1]
        } else {
            operands
        };
        self.insert(entry.operator, operands);
    }
}

impl<S: DictSchema> ReadBinary for Dict<S> {
    type HostType<'b> = Self;

    fn read<'a>(ctxt: &mut ReadCtxt<'a>) -> Result<Self::HostType<'a>, ParseError> {
        let mut dict = Dict::new();
        for (key, operands) in read_dict_data(ctxt)? {
            dict.set_from_dict_data(key, &operands);
        }
        Ok(dict)
    }
}

/// Split DICT data into (operator, operands) pairs.
///
/// Operands that are not followed by an operator are discarded, as is a truncated escape.
pub(crate) fn read_dict_data(ctxt: &mut ReadCtxt<'_>) -> Result<Vec<(u16, Vec<f64>)>, ParseError> {
    let mut entries = Vec::new();
    let mut operands = Vec::new();

    while ctxt.bytes_available() {
        let b0 = ctxt.read_u8()?;
        match b0 {
            ESCAPE => {
                let Ok(b1) = ctxt.read_u8() else {
                    break;
                };
                entries.push((op2(b1), std::mem::take(&mut operands)));
            }
            0..=21 => entries.push((u16::from(b0), std::mem::take(&mut operands))),
            _ => match read_operand(ctxt, b0) {
                Ok(value) => operands.push(value),
                Err(ParseError::BadEof) => break,
                Err(err) => return Err(err),
            },
        }
    }

    Ok(entries)
}

impl<S: DictSchema> WriteBinary<&Dict<S>> for Dict<S> {
    /// Position of the first placeholder of every offset entry, relative to the DICT start.
    type Output = Vec<(Operator, usize)>;

    fn write<C: WriteContext>(ctxt: &mut C, dict: &Dict<S>) -> Result<Self::Output, WriteError> {
        let start = ctxt.bytes_written();
        let mut placeholders = Vec::new();

        for entry in S::ENTRIES {
            let operands = match dict.values(entry.operator) {
                Some(operands) if !operands.is_empty() => operands,
                _ => continue,
            };

            for (i, operand_type) in entry.types.iter().enumerate() {
                match operand_type {
                    OperandType::Num | OperandType::Sid => {
                        let value = operands.get(i).ok_or(WriteError::BadValue)?;
                        write_number(ctxt, *value)?;
                    }
                    OperandType::Offset => {
                        if !placeholders.iter().any(|(op, _)| *op == entry.operator) {
                            placeholders.push((entry.operator, ctxt.bytes_written() - start));
                        }
                        ctxt.write_bytes(&OFFSET_PLACEHOLDER)?;
                    }
                    OperandType::Array | OperandType::Delta => {
                        for value in operands {
                            write_number(ctxt, *value)?;
                        }
                    }
                }
            }
            Operator::write(ctxt, entry.operator)?;
        }

        Ok(placeholders)
    }
}

impl WriteBinary<Self> for Operator {
    type Output = ();

    fn write<C: WriteContext>(ctxt: &mut C, op: Operator) -> Result<(), WriteError> {
        let value = op as u16;
        if value > 0xFF {
            U16Be::write(ctxt, value)?;
        } else {
            U8::write(ctxt, value as u8)?;
        }

        Ok(())
    }
}

impl TryFrom<u16> for Operator {
    type Error = ParseError;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        if (value & 0xFF00) == op2(0) {
            match value as u8 {
                0 => Ok(Operator::Copyright),
                1 => Ok(Operator::IsFixedPitch),
                2 => Ok(Operator::ItalicAngle),
                3 => Ok(Operator::UnderlinePosition),
                4 => Ok(Operator::UnderlineThickness),
                5 => Ok(Operator::PaintType),
                6 => Ok(Operator::CharstringType),
                7 => Ok(Operator::FontMatrix),
                8 => Ok(Operator::StrokeWidth),
                9 => Ok(Operator::BlueScale),
                10 => Ok(Operator::BlueShift),
                11 => Ok(Operator::BlueFuzz),
                12 => Ok(Operator::StemSnapH),
                13 => Ok(Operator::StemSnapV),
                14 => Ok(Operator::ForceBold),
                17 => Ok(Operator::LanguageGroup),
                18 => Ok(Operator::ExpansionFactor),
                19 => Ok(Operator::InitialRandomSeed),
                20 => Ok(Operator::SyntheticBase),
                21 => Ok(Operator::PostScript),
                22 => Ok(Operator::BaseFontName),
                23 => Ok(Operator::BaseFontBlend),
                30 => Ok(Operator::ROS),
                31 => Ok(Operator::CIDFontVersion),
                32 => Ok(Operator::CIDFontRevision),
                33 => Ok(Operator::CIDFontType),
                34 => Ok(Operator::CIDCount),
                35 => Ok(Operator::UIDBase),
                36 => Ok(Operator::FDArray),
                37 => Ok(Operator::FDSelect),
                38 => Ok(Operator::FontName),
                _ => Err(ParseError::UnknownDictKey),
            }
        } else {
            match value {
                0 => Ok(Operator::Version),
                1 => Ok(Operator::Notice),
                2 => Ok(Operator::FullName),
                3 => Ok(Operator::FamilyName),
                4 => Ok(Operator::Weight),
                5 => Ok(Operator::FontBBox),
                6 => Ok(Operator::BlueValues),
                7 => Ok(Operator::OtherBlues),
                8 => Ok(Operator::FamilyBlues),
                9 => Ok(Operator::FamilyOtherBlues),
                10 => Ok(Operator::StdHW),
                11 => Ok(Operator::StdVW),
                13 => Ok(Operator::UniqueID),
                14 => Ok(Operator::XUID),
                15 => Ok(Operator::Charset),
                16 => Ok(Operator::Encoding),
                17 => Ok(Operator::CharStrings),
                18 => Ok(Operator::Private),
                19 => Ok(Operator::Subrs),
                20 => Ok(Operator::DefaultWidthX),
                21 => Ok(Operator::NominalWidthX),
                _ => Err(ParseError::UnknownDictKey),
            }
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = TopDictSchema::entry(*self)
            .or_else(|| PrivateDictSchema::entry(*self))
            .map_or("unknown", |entry| entry.name);
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binary::read::ReadScope;
    use crate::binary::write::WriteBuffer;

    fn read_top_dict(data: &[u8]) -> TopDict {
        ReadScope::new(data).read::<TopDict>().unwrap()
    }

    fn write_dict<S: DictSchema>(dict: &Dict<S>) -> (Vec<u8>, Vec<(Operator, usize)>) {
        let mut ctxt = WriteBuffer::new();
        let placeholders = Dict::write(&mut ctxt, dict).unwrap();
        (ctxt.into_inner(), placeholders)
    }

    #[test]
    fn test_read_top_dict() {
        let data = [
            0xf8, 0x1b, 0x00, 0xf8, 0x1c, 0x02, 0xf8, 0x1d, 0x03, 0xf8, 0x19, 0x04, 0x1c, 0x6f,
            0x00, 0x0d, 0xfb, 0x3c, 0xfb, 0x6e, 0xfa, 0x7c, 0xfa, 0x16, 0x05, 0xe9, 0x11, 0xb8,
            0xf1, 0x12,
        ];
        let dict = read_top_dict(&data);
        assert_eq!(dict.get(Operator::Version), Some(&[391.0][..]));
        assert_eq!(dict.get(Operator::FullName), Some(&[392.0][..]));
        assert_eq!(dict.get(Operator::FamilyName), Some(&[393.0][..]));
        assert_eq!(dict.get(Operator::Weight), Some(&[389.0][..]));
        assert_eq!(dict.get(Operator::UniqueID), Some(&[28416.0][..]));
        assert_eq!(
            dict.get(Operator::FontBBox),
            Some(&[-168.0, -218.0, 1000.0, 898.0][..])
        );
        assert_eq!(dict.get_offset(Operator::CharStrings), Some(94));
        assert_eq!(dict.get(Operator::Private), Some(&[45.0, 102.0][..]));
    }

    #[test]
    fn test_defaults() {
        let dict = TopDict::new();
        assert_eq!(dict.get(Operator::UnderlinePosition), Some(&[-100.0][..]));
        assert_eq!(dict.get(Operator::FontMatrix), Some(&DEFAULT_FONT_MATRIX[..]));
        assert_eq!(dict.get(Operator::ROS), None);
        assert!(!dict.has(Operator::UnderlinePosition));

        let private = Dict::<PrivateDictSchema>::new();
        assert_eq!(private.get_number(Operator::BlueScale), Some(0.039625));
        assert_eq!(private.get_number(Operator::NominalWidthX), Some(0.0));
    }

    #[test]
    fn test_malformed_private_dict() {
        let data = [
            64, 39, 31, 30, 252, 114, 137, 115, 79, 30, 197, 119, 2, 99, 127, 6,
        ];
        let dict = ReadScope::new(&data)
            .read::<Dict<PrivateDictSchema>>()
            .unwrap();
        assert_eq!(dict.get(Operator::BlueValues), None);
        assert!(dict.is_empty());
    }

    #[test]
    fn test_lenient_entries() {
        // Unknown key 12 15, an operator without operands, a scalar given two values and a
        // trailing operand
        let data = [139, 12, 15, 0, 140, 141, 13, 142];
        let dict = read_top_dict(&data);
        assert_eq!(dict.len(), 1);
        assert_eq!(dict.get(Operator::UniqueID), Some(&[1.0][..]));
        assert!(!dict.has(Operator::Version));
    }

    #[test]
    fn test_private_key_in_top_dict_is_ignored() {
        // BlueValues (6) is not a Top DICT key
        let dict = read_top_dict(&[139, 140, 6]);
        assert!(dict.is_empty());
    }

    #[test]
    fn test_schema_checks() {
        let mut dict = Dict::<PrivateDictSchema>::new();
        assert_eq!(
            dict.set(Operator::CharStrings, &[1.0]),
            Err(ParseError::UnknownDictKey)
        );
        assert_eq!(dict.get_by_name("Bogus"), Err(ParseError::UnknownDictKey));
        dict.set_by_name("Subrs", &[20.0]).unwrap();
        assert_eq!(dict.get_by_name("Subrs"), Ok(Some(&[20.0][..])));
        assert!(dict.has_name("Subrs"));
        assert!(!dict.has_name("Bogus"));
        dict.remove(Operator::Subrs);
        assert!(!dict.has_name("Subrs"));
    }

    #[test]
    fn test_write_in_schema_order() {
        let mut dict = TopDict::new();
        dict.set(Operator::Private, &[45.0, 102.0]).unwrap();
        dict.set(Operator::CharStrings, &[94.0]).unwrap();
        dict.set(Operator::Version, &[391.0]).unwrap();

        let (data, placeholders) = write_dict(&dict);
        assert_eq!(
            data,
            vec![
                0xf8, 0x1b, 0x00, // version
                0x1d, 0, 0, 0, 0, 0x11, // CharStrings
                0x1d, 0, 0, 0, 0, 0x1d, 0, 0, 0, 0, 0x12, // Private
            ]
        );
        assert_eq!(
            placeholders,
            vec![(Operator::CharStrings, 3), (Operator::Private, 9)]
        );
    }

    #[test]
    fn test_write_escaped_operator() {
        let mut dict = TopDict::new();
        dict.set(Operator::FontMatrix, &DEFAULT_FONT_MATRIX).unwrap();
        let (data, placeholders) = write_dict(&dict);
        assert_eq!(
            data,
            vec![
                0x1e, 0x0a, 0x00, 0x1f, 0x8b, 0x8b, 0x1e, 0x0a, 0x00, 0x1f, 0x8b, 0x8b, 12, 7
            ]
        );
        assert!(placeholders.is_empty());
        assert_eq!(read_top_dict(&data), dict);
    }

    #[test]
    fn test_write_short_matrix_fails() {
        let mut dict = TopDict::new();
        dict.set(Operator::FontMatrix, &[1.0, 0.0]).unwrap();
        let mut ctxt = WriteBuffer::new();
        assert_eq!(Dict::write(&mut ctxt, &dict), Err(WriteError::BadValue));
    }

    #[test]
    fn test_operator_display() {
        assert_eq!(Operator::CharStrings.to_string(), "CharStrings");
        assert_eq!(Operator::NominalWidthX.to_string(), "nominalWidthX");
    }
}
