//! Serialization of a [CFF] into a sanitized CFF program.
//!
//! Compilation happens in two steps. [Layout::build] serializes every section on its own,
//! writing each offset operand as a fixed size placeholder and recording which section the
//! placeholder refers to. [Layout::link] then lays the sections out one after the other and
//! patches every placeholder now that all positions are known.

use rustc_hash::FxHashMap;

use super::charstring::ENDCHAR_PROGRAM;
use super::dict::OFFSET_PLACEHOLDER;
use super::{Dict, FontDict, Header, Index, Operator, TopDict, CFF};
use crate::binary::write::{WriteBinary, WriteBuffer, WriteContext};
use crate::binary::{I32Be, U8};
use crate::error::WriteError;

const MAX_NAME_LENGTH: usize = 127;
const MAX_XUID_LENGTH: usize = 16;
const FORBIDDEN_NAME_CHARS: &str = "[](){}<>/%";
const BAD_FONT_NAME: &str = "Bad_Font_Name";

/// Keys that only make sense while parsing a CID-keyed font.
const CID_KEYS: [Operator; 5] = [
    Operator::CIDFontVersion,
    Operator::CIDFontRevision,
    Operator::CIDFontType,
    Operator::CIDCount,
    Operator::UIDBase,
];

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
enum DictId {
    Top,
    Font(usize),
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
enum SectionId {
    Header,
    Names,
    TopDicts,
    Strings,
    GlobalSubrs,
    Encoding,
    Charset,
    CharStrings,
    FDSelect,
    FDArray,
    Private(DictId),
    Subrs(DictId),
    Trailer,
}

/// What an offset placeholder is patched with.
#[derive(Debug, Copy, Clone)]
enum Target {
    /// Absolute position of a section.
    Start(SectionId),
    /// A fixed value, such as the id of a predefined encoding.
    Predefined(i32),
    /// Length and position of a Private DICT. Takes two placeholders.
    PrivateRange(DictId),
    /// Position of local subroutines relative to their Private DICT.
    RelativeSubrs(DictId),
}

#[derive(Debug)]
struct Slot {
    section: SectionId,
    /// Relative to the start of `section`.
    position: usize,
    target: Target,
}

/// Offset placeholders of one serialized DICT.
struct Placeholders {
    section: SectionId,
    /// Relative to the start of `section`.
    positions: Vec<(Operator, usize)>,
}

impl Placeholders {
    fn slot(&self, operator: Operator, target: Target) -> Result<Slot, WriteError> {
        let position = self
            .positions
            .iter()
            .find(|(op, _)| *op == operator)
            .map(|&(_, position)| position)
            .ok_or(WriteError::MissingPlaceholder)?;
        Ok(Slot {
            section: self.section,
            position,
            target,
        })
    }
}

#[derive(Default)]
struct Layout {
    sections: Vec<(SectionId, Vec<u8>)>,
    slots: Vec<Slot>,
}

pub(crate) fn compile(cff: &CFF) -> Result<Vec<u8>, WriteError> {
    Layout::build(cff)?.link()
}

impl Layout {
    fn build(cff: &CFF) -> Result<Layout, WriteError> {
        let mut layout = Layout::default();

        let mut top = cff.top.clone();
        let mut fd_array = if cff.is_cid_font {
            cff.fd_array.clone()
        } else {
            Vec::new()
        };
        if cff.is_cid_font {
            hoist_font_matrix(&mut top.dict, &mut fd_array);
            remove_cid_keys(&mut top.dict);
            for font_dict in fd_array.iter_mut() {
                remove_cid_keys(&mut font_dict.dict);
            }
        }
        if top
            .dict
            .values(Operator::XUID)
            .map_or(false, |xuid| xuid.len() > MAX_XUID_LENGTH)
        {
            top.dict.remove(Operator::XUID);
        }
        top.dict.set(Operator::Charset, &[0.0])?;

        let mut header = WriteBuffer::new();
        Header::write(&mut header, &cff.header)?;
        layout.push(SectionId::Header, header.into_inner());

        let names = cff
            .names
            .iter()
            .map(|name| sanitize_name(name))
            .collect::<Vec<_>>();
        layout.push_index(SectionId::Names, &Index::from(names))?;

        let top_placeholders = layout
            .push_dicts(SectionId::TopDicts, &[&top.dict])?
            .pop()
            .ok_or(WriteError::BadValue)?;
        layout.push_index(SectionId::Strings, &cff.strings.to_index()?)?;
        layout.push_index(SectionId::GlobalSubrs, &cff.global_subrs)?;

        if let Some(encoding) = &cff.encoding {
            if top.dict.has(Operator::Encoding) {
                if encoding.predefined {
                    let id = Target::Predefined(i32::from(encoding.format));
                    layout
                        .slots
                        .push(top_placeholders.slot(Operator::Encoding, id)?);
                } else {
                    layout.push(SectionId::Encoding, encoding.raw.clone());
                    layout.slots.push(top_placeholders.slot(
                        Operator::Encoding,
                        Target::Start(SectionId::Encoding),
                    )?);
                }
            }
        }

        let charset = cff
            .charset
            .compile(cff.num_glyphs(), &cff.strings, cff.is_cid_font)?;
        layout.push(SectionId::Charset, charset);
        layout.slots.push(
            top_placeholders.slot(Operator::Charset, Target::Start(SectionId::Charset))?,
        );

        let char_strings = cff
            .char_strings
            .iter()
            .map(|program| {
                if program.is_empty() {
                    ENDCHAR_PROGRAM.to_vec()
                } else {
                    program.to_vec()
                }
            })
            .collect::<Vec<_>>();
        layout.push_index(SectionId::CharStrings, &Index::from(char_strings))?;
        layout.slots.push(top_placeholders.slot(
            Operator::CharStrings,
            Target::Start(SectionId::CharStrings),
        )?);

        if cff.is_cid_font {
            let fd_select = cff.fd_select.as_ref().ok_or(WriteError::BadValue)?;
            layout.push(SectionId::FDSelect, fd_select.compile()?);
            layout.slots.push(
                top_placeholders.slot(Operator::FDSelect, Target::Start(SectionId::FDSelect))?,
            );

            let dicts = fd_array
                .iter()
                .map(|font_dict| &font_dict.dict)
                .collect::<Vec<_>>();
            let fd_placeholders = layout.push_dicts(SectionId::FDArray, &dicts)?;
            layout.slots.push(
                top_placeholders.slot(Operator::FDArray, Target::Start(SectionId::FDArray))?,
            );

            for (i, (font_dict, placeholders)) in
                fd_array.iter().zip(fd_placeholders.iter()).enumerate()
            {
                layout.push_private(DictId::Font(i), font_dict, placeholders)?;
            }
        }

        layout.push_private(DictId::Top, &top, &top_placeholders)?;
        layout.push(SectionId::Trailer, vec![0]);

        Ok(layout)
    }

    fn push(&mut self, id: SectionId, data: Vec<u8>) {
        self.sections.push((id, data));
    }

    fn push_index(&mut self, id: SectionId, index: &Index) -> Result<Vec<usize>, WriteError> {
        let mut buffer = WriteBuffer::new();
        let positions = Index::write(&mut buffer, index)?;
        self.push(id, buffer.into_inner());
        Ok(positions)
    }

    /// Write `dicts` as an INDEX, returning the placeholders of each.
    fn push_dicts(
        &mut self,
        id: SectionId,
        dicts: &[&TopDict],
    ) -> Result<Vec<Placeholders>, WriteError> {
        let mut objects = Vec::with_capacity(dicts.len());
        let mut dict_positions = Vec::with_capacity(dicts.len());
        for dict in dicts {
            let mut buffer = WriteBuffer::new();
            dict_positions.push(TopDict::write(&mut buffer, *dict)?);
            objects.push(buffer.into_inner());
        }

        let object_positions = self.push_index(id, &Index::from(objects))?;
        Ok(object_positions
            .into_iter()
            .zip(dict_positions)
            .map(|(start, positions)| Placeholders {
                section: id,
                positions: positions
                    .into_iter()
                    .map(|(operator, position)| (operator, start + position))
                    .collect(),
            })
            .collect())
    }

    fn push_private(
        &mut self,
        id: DictId,
        font_dict: &FontDict,
        placeholders: &Placeholders,
    ) -> Result<(), WriteError> {
        let private = font_dict
            .private
            .as_ref()
            .filter(|_| font_dict.dict.has(Operator::Private))
            .ok_or(WriteError::MissingPrivateDict)?;

        let mut buffer = WriteBuffer::new();
        let positions = Dict::write(&mut buffer, &private.dict)?;
        self.push(SectionId::Private(id), buffer.into_inner());
        self.slots
            .push(placeholders.slot(Operator::Private, Target::PrivateRange(id))?);

        if let Some(subrs) = &private.subrs {
            if private.dict.has(Operator::Subrs) {
                self.push_index(SectionId::Subrs(id), subrs)?;
                let private_placeholders = Placeholders {
                    section: SectionId::Private(id),
                    positions,
                };
                self.slots.push(
                    private_placeholders.slot(Operator::Subrs, Target::RelativeSubrs(id))?,
                );
            }
        }

        Ok(())
    }

    fn link(self) -> Result<Vec<u8>, WriteError> {
        let mut buffer = WriteBuffer::new();
        // Start and length of every section
        let mut ranges = FxHashMap::default();
        for (id, data) in &self.sections {
            ranges.insert(*id, (buffer.bytes_written(), data.len()));
            buffer.write_bytes(data)?;
        }
        let range = |id: SectionId| ranges.get(&id).copied().ok_or(WriteError::MissingPlaceholder);

        for slot in &self.slots {
            let values = match slot.target {
                Target::Start(id) => vec![range(id)?.0],
                Target::Predefined(value) => vec![usize::try_from(value)?],
                Target::PrivateRange(id) => {
                    let (start, len) = range(SectionId::Private(id))?;
                    vec![len, if len == 0 { 0 } else { start }]
                }
                Target::RelativeSubrs(id) => vec![range(SectionId::Private(id))?.1],
            };

            let mut position = range(slot.section)?.0 + slot.position;
            for value in values {
                let mut placeholder = buffer.slice_mut(position, OFFSET_PLACEHOLDER.len())?;
                if placeholder.bytes() != &OFFSET_PLACEHOLDER[..] {
                    return Err(WriteError::PlaceholderMismatch);
                }
                U8::write(&mut placeholder, OFFSET_PLACEHOLDER[0])?;
                I32Be::write(&mut placeholder, i32::try_from(value)?)?;
                position += OFFSET_PLACEHOLDER.len();
            }
        }

        Ok(buffer.into_inner())
    }
}

/// Restrict a font name to printable ASCII without PostScript delimiters.
fn sanitize_name(name: &str) -> Vec<u8> {
    let sanitized = name
        .chars()
        .take(MAX_NAME_LENGTH)
        .map(|c| {
            if !('!'..='~').contains(&c) || FORBIDDEN_NAME_CHARS.contains(c) {
                b'_'
            } else {
                c as u8
            }
        })
        .collect::<Vec<_>>();

    if sanitized.is_empty() {
        BAD_FONT_NAME.as_bytes().to_vec()
    } else {
        sanitized
    }
}

/// Move the Top DICT FontMatrix of a CID-keyed font into each Font DICT.
///
/// A Font DICT with its own matrix gets the product of both.
fn hoist_font_matrix(top: &mut TopDict, fd_array: &mut [FontDict]) {
    let Some(base) = top.values(Operator::FontMatrix).map(<[f64]>::to_vec) else {
        return;
    };
    top.remove(Operator::FontMatrix);

    for font_dict in fd_array {
        let matrix = font_dict
            .dict
            .values(Operator::FontMatrix)
            .and_then(|sub| transform(&base, sub))
            .map_or_else(|| base.clone(), |matrix| matrix.to_vec());
        font_dict.dict.insert(Operator::FontMatrix, &matrix);
    }
}

/// Product of two affine transforms, `m1` applied after `m2`.
fn transform(m1: &[f64], m2: &[f64]) -> Option<[f64; 6]> {
    let (&[a1, b1, c1, d1, e1, f1], &[a2, b2, c2, d2, e2, f2]) = (m1, m2) else {
        return None;
    };
    Some([
        a1 * a2 + c1 * b2,
        b1 * a2 + d1 * b2,
        a1 * c2 + c1 * d2,
        b1 * c2 + d1 * d2,
        a1 * e2 + c1 * f2 + e1,
        b1 * e2 + d1 * f2 + f1,
    ])
}

fn remove_cid_keys(dict: &mut TopDict) {
    for operator in CID_KEYS {
        dict.remove(operator);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cff::charset::{Charset, CharsetGlyphs, CharsetSource};
    use crate::cff::{FDSelect, PrivateDict, Strings};
    use crate::tests::read_fixture;

    fn times_roman() -> CFF {
        let data = read_fixture("tests/fonts/cff/ABCDEF+Times-Roman.cff");
        CFF::parse(&data, false).unwrap()
    }

    fn cid_font() -> CFF {
        let mut top = TopDict::new();
        top.set(Operator::ROS, &[391.0, 392.0, 0.0]).unwrap();
        top.set(Operator::CIDCount, &[3.0]).unwrap();
        top.set(Operator::UIDBase, &[1000.0]).unwrap();
        top.set(Operator::FontMatrix, &[0.5, 0.0, 0.0, 0.5, 0.0, 0.0])
            .unwrap();
        top.set(Operator::CharStrings, &[0.0]).unwrap();
        top.set(Operator::FDArray, &[0.0]).unwrap();
        top.set(Operator::FDSelect, &[0.0]).unwrap();
        top.set(Operator::Private, &[0.0, 0.0]).unwrap();

        let mut font_dict = TopDict::new();
        font_dict
            .set(Operator::FontMatrix, &[2.0, 0.0, 0.0, 2.0, 0.0, 0.0])
            .unwrap();
        font_dict.set(Operator::CIDCount, &[3.0]).unwrap();
        font_dict.set(Operator::Private, &[0.0, 0.0]).unwrap();
        let mut private = PrivateDict::default();
        private.dict.set(Operator::DefaultWidthX, &[500.0]).unwrap();

        let mut strings = Strings::new();
        strings.add("Adobe");
        strings.add("Identity");

        CFF {
            header: Header {
                major: 1,
                minor: 0,
                hdr_size: 4,
                off_size: 4,
            },
            names: vec![String::from("Test-Identity")],
            top: FontDict {
                dict: top,
                private: Some(PrivateDict::default()),
            },
            strings,
            global_subrs: Index::new(),
            char_strings: Index::from(vec![vec![0x0e]; 3]),
            charset: Charset {
                source: CharsetSource::Custom {
                    format: 2,
                    raw: Vec::new(),
                },
                glyphs: CharsetGlyphs::Cids(vec![0, 1, 2]),
            },
            encoding: None,
            fd_array: vec![FontDict {
                dict: font_dict,
                private: Some(private),
            }],
            fd_select: Some(FDSelect {
                format: 3,
                fd_indices: vec![0; 3],
            }),
            is_cid_font: true,
            widths: vec![0.0; 3],
            seacs: vec![None; 3],
        }
    }

    #[test]
    fn test_compile_times_roman() {
        let cff = times_roman();
        let data = cff.compile().unwrap();
        assert_eq!(data.last(), Some(&0));

        let compiled = CFF::parse(&data, false).unwrap();
        assert_eq!(compiled.header.hdr_size, 4);
        assert_eq!(compiled.names, vec!["ABCDEF+Times-Roman"]);
        assert_eq!(compiled.strings, cff.strings);
        assert_eq!(compiled.char_strings, cff.char_strings);
        assert_eq!(compiled.top.dict.get_number(Operator::Version), Some(391.0));
        assert_eq!(compiled.top.dict.get_number(Operator::UniqueID), Some(28416.0));
        assert_eq!(
            compiled.top.dict.values(Operator::FontBBox),
            Some(&[-168.0, -218.0, 1000.0, 898.0][..])
        );
        assert_eq!(compiled.charset.name(1), Some("space"));
        assert_eq!(
            compiled.top.private.as_ref().unwrap().dict,
            cff.top.private.as_ref().unwrap().dict
        );
        assert_eq!(compiled.widths, cff.widths);
    }

    #[test]
    fn test_compile_is_stable() {
        let first = times_roman().compile().unwrap();
        let second = CFF::parse(&first, false).unwrap().compile().unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_compile_cid_font() {
        let data = cid_font().compile().unwrap();
        let compiled = CFF::parse(&data, false).unwrap();

        assert!(compiled.is_cid_font);
        assert_eq!(compiled.num_glyphs(), 3);
        assert_eq!(compiled.charset.glyphs, CharsetGlyphs::Cids(vec![0, 1, 2]));
        assert!(!compiled.top.dict.has(Operator::FontMatrix));
        assert!(!compiled.top.dict.has(Operator::CIDCount));
        assert!(!compiled.top.dict.has(Operator::UIDBase));
        assert_eq!(compiled.fd_array.len(), 1);

        let font_dict = &compiled.fd_array[0].dict;
        assert_eq!(
            font_dict.values(Operator::FontMatrix),
            Some(&[1.0, 0.0, 0.0, 1.0, 0.0, 0.0][..])
        );
        assert!(!font_dict.has(Operator::CIDCount));
        assert_eq!(compiled.fd_select.unwrap().fd_indices, vec![0, 0, 0]);
        assert_eq!(compiled.widths, vec![500.0; 3]);
    }

    #[test]
    fn test_empty_private_dict() {
        let mut cff = times_roman();
        cff.top.private = Some(PrivateDict::default());
        let data = cff.compile().unwrap();

        let compiled = CFF::parse(&data, false).unwrap();
        assert_eq!(
            compiled.top.dict.values(Operator::Private),
            Some(&[0.0, 0.0][..])
        );
    }

    #[test]
    fn test_local_subrs() {
        let mut cff = times_roman();
        let private = cff.top.private.as_mut().unwrap();
        private.dict.set(Operator::Subrs, &[0.0]).unwrap();
        private.subrs = Some(Index::from(vec![vec![0x0b]]));
        let data = cff.compile().unwrap();

        let compiled = CFF::parse(&data, false).unwrap();
        assert_eq!(
            compiled.top.private.unwrap().subrs,
            Some(Index::from(vec![vec![0x0b]]))
        );
    }

    #[test]
    fn test_missing_private_dict() {
        let mut cff = times_roman();
        cff.top.private = None;
        assert_eq!(cff.compile(), Err(WriteError::MissingPrivateDict));

        let mut cff = times_roman();
        cff.top.dict.remove(Operator::Private);
        assert_eq!(cff.compile(), Err(WriteError::MissingPrivateDict));
    }

    #[test]
    fn test_missing_placeholder() {
        let mut cff = times_roman();
        cff.top.dict.remove(Operator::CharStrings);
        assert_eq!(cff.compile(), Err(WriteError::MissingPlaceholder));
    }

    #[test]
    fn test_placeholder_mismatch() {
        let layout = Layout {
            sections: vec![(SectionId::Header, vec![1, 0, 4, 1, 0])],
            slots: vec![Slot {
                section: SectionId::Header,
                position: 0,
                target: Target::Predefined(0),
            }],
        };
        assert_eq!(layout.link(), Err(WriteError::PlaceholderMismatch));
    }

    #[test]
    fn test_empty_char_string() {
        let mut cff = times_roman();
        cff.char_strings.set(1, Vec::new());
        let data = cff.compile().unwrap();

        let compiled = CFF::parse(&data, false).unwrap();
        assert_eq!(compiled.char_strings.get(1), Some(&ENDCHAR_PROGRAM[..]));
    }

    #[test]
    fn test_long_xuid_removed() {
        let mut cff = times_roman();
        cff.top.dict.set(Operator::XUID, &[1.0; 17]).unwrap();
        let compiled = CFF::parse(&cff.compile().unwrap(), false).unwrap();
        assert!(!compiled.top.dict.has(Operator::XUID));

        let mut cff = times_roman();
        cff.top.dict.set(Operator::XUID, &[1.0; 16]).unwrap();
        let compiled = CFF::parse(&cff.compile().unwrap(), false).unwrap();
        assert_eq!(compiled.top.dict.values(Operator::XUID), Some(&[1.0; 16][..]));
    }

    #[test]
    fn test_sanitize_name() {
        assert_eq!(sanitize_name("Times Roman[1]"), b"Times_Roman_1_");
        assert_eq!(sanitize_name("a/b%c\u{e9}"), b"a_b_c_");
        assert_eq!(sanitize_name(""), BAD_FONT_NAME.as_bytes());
        assert_eq!(sanitize_name(&"x".repeat(200)).len(), MAX_NAME_LENGTH);
    }

    #[test]
    fn test_transform() {
        assert_eq!(
            transform(&[0.5, 0.0, 0.0, 0.5, 10.0, 0.0], &[2.0, 0.0, 0.0, 2.0, 4.0, 2.0]),
            Some([1.0, 0.0, 0.0, 1.0, 12.0, 1.0])
        );
        assert_eq!(transform(&[1.0], &[1.0; 6]), None);
    }
}
