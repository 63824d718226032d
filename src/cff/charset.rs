//! Charsets: the name (or CID) of every glyph.
//!
//! Refer to section 13 "Charsets" of Technical Note #5176.

use log::warn;

use super::strings::{Strings, SID};
use super::tables::{EXPERT_CHARSET, EXPERT_SUBSET_CHARSET, ISO_ADOBE_LAST_SID, STANDARD_STRINGS};
use crate::binary::read::{ReadBinaryDep, ReadCtxt, ReadUnchecked};
use crate::binary::{U16Be, U8};
use crate::error::{ParseError, WriteError};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PredefinedCharset {
    IsoAdobe = 0,
    Expert = 1,
    ExpertSubset = 2,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CharsetSource {
    Predefined(PredefinedCharset),
    /// A charset stored in the font, with the bytes it was read from.
    Custom { format: u8, raw: Vec<u8> },
}

/// Glyph identifiers, indexed by glyph id. Glyph 0 is always `.notdef` or CID 0.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CharsetGlyphs {
    Names(Vec<String>),
    Cids(Vec<u32>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Charset {
    pub source: CharsetSource,
    pub glyphs: CharsetGlyphs,
}

/// Arguments for reading a custom charset: glyph count, string table and whether the font is
/// CID-keyed.
pub type CharsetArgs<'a> = (usize, &'a Strings, bool);

impl Charset {
    /// Returns the charset identified by the predefined id `offset` (0, 1 or 2), if it is one.
    pub fn predefined(offset: usize) -> Option<Charset> {
        let (kind, sids): (PredefinedCharset, Vec<SID>) = match offset {
            0 => (PredefinedCharset::IsoAdobe, (0..=ISO_ADOBE_LAST_SID).collect()),
            1 => (PredefinedCharset::Expert, EXPERT_CHARSET.to_vec()),
            2 => (PredefinedCharset::ExpertSubset, EXPERT_SUBSET_CHARSET.to_vec()),
            _ => return None,
        };
        let names = sids
            .iter()
            .map(|&sid| STANDARD_STRINGS[usize::from(sid)].to_string())
            .collect();
        Some(Charset {
            source: CharsetSource::Predefined(kind),
            glyphs: CharsetGlyphs::Names(names),
        })
    }

    pub fn len(&self) -> usize {
        match &self.glyphs {
            CharsetGlyphs::Names(names) => names.len(),
            CharsetGlyphs::Cids(cids) => cids.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_cid(&self) -> bool {
        matches!(self.glyphs, CharsetGlyphs::Cids(_))
    }

    /// Glyph name of `glyph_id`. `None` for CID charsets.
    pub fn name(&self, glyph_id: usize) -> Option<&str> {
        match &self.glyphs {
            CharsetGlyphs::Names(names) => names.get(glyph_id).map(String::as_str),
            CharsetGlyphs::Cids(_) => None,
        }
    }

    /// CID of `glyph_id`. `None` for name keyed charsets.
    pub fn cid(&self, glyph_id: usize) -> Option<u32> {
        match &self.glyphs {
            CharsetGlyphs::Cids(cids) => cids.get(glyph_id).copied(),
            CharsetGlyphs::Names(_) => None,
        }
    }

    /// First glyph id with the supplied name.
    pub fn glyph_id_for_name(&self, name: &str) -> Option<usize> {
        match &self.glyphs {
            CharsetGlyphs::Names(names) => names.iter().position(|n| n == name),
            CharsetGlyphs::Cids(_) => None,
        }
    }

    /// First glyph id with the supplied CID.
    pub fn glyph_id_for_cid(&self, cid: u32) -> Option<usize> {
        match &self.glyphs {
            CharsetGlyphs::Cids(cids) => cids.iter().position(|&c| c == cid),
            CharsetGlyphs::Names(_) => None,
        }
    }

    /// Serialize this charset for a font with `num_glyphs` glyphs.
    ///
    /// CID-keyed fonts get a single format 2 range. Other fonts get format 0 with the SID of
    /// each glyph name after `.notdef`; names missing from `strings` are written as SID 0.
    pub fn compile(
        &self,
        num_glyphs: usize,
        strings: &Strings,
        is_cid_font: bool,
    ) -> Result<Vec<u8>, WriteError> {
        let num_glyphs_less_notdef = num_glyphs.saturating_sub(1);
        if is_cid_font {
            // GID n is CID n: one range starting at CID 1 covers every glyph after .notdef
            if num_glyphs_less_notdef == 0 {
                return Ok(vec![2]);
            }
            let n_left = u16::try_from(num_glyphs_less_notdef - 1)?;
            let [hi, lo] = n_left.to_be_bytes();
            return Ok(vec![2, 0, 1, hi, lo]);
        }

        let mut data = Vec::with_capacity(1 + num_glyphs_less_notdef * 2);
        data.push(0);
        let mut warned = false;
        for glyph_id in 1..=num_glyphs_less_notdef {
            let sid = match &self.glyphs {
                CharsetGlyphs::Names(names) => match names.get(glyph_id) {
                    Some(name) => strings.sid(name).unwrap_or_else(|| {
                        if !warned {
                            warned = true;
                            warn!("Couldn't find {} in CFF strings", name);
                        }
                        0
                    }),
                    None => 0,
                },
                CharsetGlyphs::Cids(cids) => cids
                    .get(glyph_id)
                    .and_then(|&cid| u16::try_from(cid).ok())
                    .unwrap_or(0),
            };
            data.extend_from_slice(&sid.to_be_bytes());
        }
        Ok(data)
    }
}

impl ReadBinaryDep for Charset {
    type Args<'a> = CharsetArgs<'a>;
    type HostType<'a> = Charset;

    fn read_dep<'a>(
        ctxt: &mut ReadCtxt<'a>,
        (num_glyphs, strings, cid): CharsetArgs<'a>,
    ) -> Result<Self, ParseError> {
        let scope = ctxt.scope();
        let start = ctxt.position();
        let format = ctxt.read_u8()?;
        // .notdef is implicit
        let length = num_glyphs.saturating_sub(1);
        let mut ids = vec![0u32];

        match format {
            0 => {
                // Glyphs past the end of the data get SID 0
                let available = ctxt.scope().data().len() / U16Be::SIZE;
                let array = ctxt.read_array::<U16Be>(length.min(available))?;
                ids.extend(array.iter().map(u32::from));
                ids.resize(length + 1, 0);
            }
            1 => read_ranges::<U8>(ctxt, length, &mut ids)?,
            2 => read_ranges::<U16Be>(ctxt, length, &mut ids)?,
            _ => return Err(ParseError::UnknownFormat),
        }

        let raw = scope.data()[..ctxt.position() - start].to_vec();
        let glyphs = if cid {
            CharsetGlyphs::Cids(ids)
        } else {
            let names = ids
                .into_iter()
                .map(|sid| strings.get(sid as usize).to_string())
                .collect();
            CharsetGlyphs::Names(names)
        };

        Ok(Charset {
            source: CharsetSource::Custom { format, raw },
            glyphs,
        })
    }
}

/// Read (first, n_left) ranges until `length` glyphs beyond `.notdef` are covered.
fn read_ranges<N>(ctxt: &mut ReadCtxt<'_>, length: usize, ids: &mut Vec<u32>) -> Result<(), ParseError>
where
    N: ReadUnchecked,
    N::HostType: Into<u32>,
{
    while ids.len() <= length {
        let Ok((first, n_left)) = ctxt.read::<(U16Be, N)>() else {
            ids.resize(length + 1, 0);
            break;
        };
        let first = u32::from(first);
        ids.extend(first..=first + n_left.into());
    }
    Ok(())
}
