//! Encodings: character code to glyph id mappings of name keyed fonts.
//!
//! Refer to section 12 "Encodings" of Technical Note #5176.

use rustc_hash::FxHashMap;

use super::charset::Charset;
use super::strings::Strings;
use super::tables::{EXPERT_ENCODING, STANDARD_ENCODING, STANDARD_STRINGS};
use crate::binary::read::{ReadBinaryDep, ReadCtxt};
use crate::binary::{U16Be, U8};
use crate::error::ParseError;

const SUPPLEMENT_FLAG: u8 = 0x80;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Encoding {
    /// `true` for the Standard (format 0) and Expert (format 1) encodings.
    pub predefined: bool,
    pub format: u8,
    /// Character code to glyph id.
    pub codes: FxHashMap<u16, u16>,
    /// The encoding data as stored, with the supplement flag cleared and the supplement
    /// itself left out. Empty for predefined encodings.
    pub raw: Vec<u8>,
}

impl Encoding {
    /// Build the Standard (`0`) or Expert (`1`) encoding for the glyphs of `charset`.
    pub fn predefined(id: usize, charset: &Charset) -> Option<Encoding> {
        let base = match id {
            0 => &STANDARD_ENCODING,
            1 => &EXPERT_ENCODING,
            _ => return None,
        };

        let mut codes = FxHashMap::default();
        for glyph_id in 0..charset.len() {
            let Some(name) = charset.name(glyph_id) else {
                continue;
            };
            let code = base
                .iter()
                .position(|&sid| sid != 0 && STANDARD_STRINGS[usize::from(sid)] == name);
            if let (Some(code), Ok(glyph_id)) = (code, u16::try_from(glyph_id)) {
                codes.insert(code as u16, glyph_id);
            }
        }

        Some(Encoding {
            predefined: true,
            format: id as u8,
            codes,
            raw: Vec::new(),
        })
    }

    pub fn glyph_id(&self, code: u16) -> Option<u16> {
        self.codes.get(&code).copied()
    }
}

impl ReadBinaryDep for Encoding {
    type Args<'a> = (&'a Strings, &'a Charset);
    type HostType<'a> = Encoding;

    fn read_dep<'a>(
        ctxt: &mut ReadCtxt<'a>,
        (strings, charset): (&'a Strings, &'a Charset),
    ) -> Result<Self, ParseError> {
        let scope = ctxt.scope();
        let start = ctxt.position();
        let format = ctxt.read_u8()?;
        let mut codes = FxHashMap::default();

        match format & !SUPPLEMENT_FLAG {
            0 => {
                let ncodes = ctxt.read_u8()?;
                let array = ctxt.read_array::<U8>(usize::from(ncodes))?;
                for (glyph_id, code) in (1..).zip(array.iter()) {
                    codes.insert(u16::from(code), glyph_id);
                }
            }
            1 => {
                let nranges = ctxt.read_u8()?;
                let mut glyph_id = 1;
                for (first, n_left) in ctxt.read_array::<(U8, U8)>(usize::from(nranges))?.iter() {
                    let first = u16::from(first);
                    for code in first..=first + u16::from(n_left) {
                        codes.insert(code, glyph_id);
                        glyph_id += 1;
                    }
                }
            }
            _ => return Err(ParseError::UnknownFormat),
        }

        let mut raw = scope.data()[..ctxt.position() - start].to_vec();
        raw[0] &= !SUPPLEMENT_FLAG;

        if format & SUPPLEMENT_FLAG != 0 {
            let nsups = ctxt.read_u8()?;
            for (code, sid) in ctxt.read_array::<(U8, U16Be)>(usize::from(nsups))?.iter() {
                let name = strings.get(usize::from(sid));
                match charset
                    .glyph_id_for_name(name)
                    .and_then(|glyph_id| u16::try_from(glyph_id).ok())
                {
                    Some(glyph_id) => {
                        codes.insert(u16::from(code), glyph_id);
                    }
                    None => {
                        codes.remove(&u16::from(code));
                    }
                }
            }
        }

        Ok(Encoding {
            predefined: false,
            format: format & !SUPPLEMENT_FLAG,
            codes,
            raw,
        })
    }
}
