//! CFF font handling.
//!
//! Refer to [Technical Note #5176](http://wwwimages.adobe.com/content/dam/Adobe/en/devnet/font/pdfs/5176.CFF.pdf)
//! for more information.
//!
//! [CFF::parse] reads an untrusted CFF program into an owned model, repairing what can be
//! repaired along the way. [CFF::compile] writes the model back out as a sanitized CFF program.

use log::{debug, info, warn};
use num_traits::ToPrimitive;

use crate::binary::read::{ReadBinary, ReadCtxt, ReadScope};
use crate::binary::write::{WriteBinary, WriteContext};
use crate::binary::U8;
use crate::error::{ParseError, WriteError};

pub mod charset;
pub mod charstring;
mod compile;
pub mod dict;
pub mod encoding;
pub mod fd_select;
pub mod index;
mod number;
pub mod strings;
mod tables;

pub use charset::{Charset, CharsetGlyphs, CharsetSource, PredefinedCharset};
pub use charstring::{CharStringMetrics, Seac};
pub use dict::{Dict, Operator, PrivateDict, PrivateDictSchema, TopDict, TopDictSchema};
pub use encoding::Encoding;
pub use fd_select::FDSelect;
pub use index::Index;
pub use strings::{Strings, SID};

use charstring::FontDictSelect;

/// Glyph ids are 16-bit so a font can never hold more glyphs than this.
pub const MAX_GLYPHS: usize = 65535;

const HEADER_MAJOR_VERSION: u8 = 1;

/// A parsed CFF font.
///
/// Only the first font of a FontSet is read. Glyph programs have already been validated and
/// repaired by the time parsing returns.
#[derive(Clone, Debug, PartialEq)]
pub struct CFF {
    pub header: Header,
    pub names: Vec<String>,
    pub top: FontDict,
    pub strings: Strings,
    pub global_subrs: Index,
    pub char_strings: Index,
    pub charset: Charset,
    /// Absent for CID-keyed fonts.
    pub encoding: Option<Encoding>,
    pub fd_array: Vec<FontDict>,
    pub fd_select: Option<FDSelect>,
    pub is_cid_font: bool,
    /// Advance width of each glyph.
    pub widths: Vec<f64>,
    /// Accent composition operands found in each glyph, when requested at parse time.
    pub seacs: Vec<Option<Seac>>,
}

/// CFF Font Header described in Section 6 of Technical Note #5176
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Header {
    pub major: u8,
    pub minor: u8,
    pub hdr_size: u8,
    pub off_size: u8,
}

/// A Top DICT or an entry of the FDArray, with the Private DICT it refers to.
///
/// `private` is `None` when the `Private` entry was malformed. Such a font can still be
/// inspected but it cannot be compiled.
#[derive(Clone, Debug, PartialEq)]
pub struct FontDict {
    pub dict: TopDict,
    pub private: Option<PrivateDict>,
}

impl CFF {
    /// Parse the CFF program in `data`.
    ///
    /// The program may be preceded by junk: it starts at the first byte holding the major version
    /// number. When `seac_analysis` is set, `endchar` operators carrying accent composition
    /// operands are recorded in `seacs`.
    pub fn parse(data: &[u8], seac_analysis: bool) -> Result<CFF, ParseError> {
        let start = data
            .iter()
            .position(|&b| b == HEADER_MAJOR_VERSION)
            .ok_or(ParseError::MissingHeader)?;
        if start != 0 {
            info!("cff data is shifted");
        }
        let scope = ReadScope::new(&data[start..]);

        // The first five sections are consecutive, everything else is found through offsets
        let header = scope.read::<Header>()?;
        let mut ctxt = scope.offset(usize::from(header.hdr_size)).ctxt();
        let name_index = ctxt.read::<Index>()?;
        let top_dict_index = ctxt.read::<Index>()?;
        let string_index = ctxt.read::<Index>()?;
        let mut global_subrs = ctxt.read::<Index>()?;

        let names = name_index
            .iter()
            .map(strings::latin1_to_string)
            .collect();
        let strings = Strings::from_index(&string_index);
        let mut top_dict = top_dict_index
            .get(0)
            .map(|data| ReadScope::new(data).read::<TopDict>())
            .ok_or(ParseError::MissingValue)??;
        let top_private = read_private_dict(&scope, &mut top_dict)?;
        let mut top = FontDict {
            dict: top_dict,
            private: top_private,
        };

        let is_cid_font = top.dict.has(Operator::ROS);
        let mut char_strings = scope
            .offset(top.dict.get_offset(Operator::CharStrings).unwrap_or(0))
            .read::<Index>()?;
        let num_glyphs = char_strings.count();
        let charset_offset = top.dict.get_offset(Operator::Charset).unwrap_or(0);

        let mut fd_array = Vec::new();
        let (charset, encoding, fd_select) = if is_cid_font {
            let fd_array_index = scope
                .offset(top.dict.get_offset(Operator::FDArray).unwrap_or(0))
                .read::<Index>()?;
            for dict_data in fd_array_index.iter() {
                let mut dict = ReadScope::new(dict_data).read::<TopDict>()?;
                let private = read_private_dict(&scope, &mut dict)?;
                fd_array.push(FontDict { dict, private });
            }
            let charset = read_charset(&scope, charset_offset, num_glyphs, &strings, true)?;
            let fd_select = scope
                .offset(top.dict.get_offset(Operator::FDSelect).unwrap_or(0))
                .read_dep::<FDSelect>(num_glyphs)?;
            (charset, None, Some(fd_select))
        } else {
            let charset = read_charset(&scope, charset_offset, num_glyphs, &strings, false)?;
            let encoding_offset = top.dict.get_offset(Operator::Encoding).unwrap_or(0);
            let encoding = match Encoding::predefined(encoding_offset, &charset) {
                Some(encoding) => encoding,
                None => scope
                    .offset(encoding_offset)
                    .read_dep::<Encoding>((&strings, &charset))?,
            };
            (charset, Some(encoding), None)
        };

        let font_dicts = fd_select.as_ref().map(|fd_select| FontDictSelect {
            fd_select,
            fd_array: &mut fd_array,
        });
        let metrics = charstring::validate_char_strings(
            &mut char_strings,
            &mut global_subrs,
            top.private.as_mut(),
            font_dicts,
            seac_analysis,
        );

        Ok(CFF {
            header,
            names,
            top,
            strings,
            global_subrs,
            char_strings,
            charset,
            encoding,
            fd_array,
            fd_select,
            is_cid_font,
            widths: metrics.widths,
            seacs: metrics.seacs,
        })
    }

    /// Serialize this font into a sanitized CFF program.
    pub fn compile(&self) -> Result<Vec<u8>, WriteError> {
        compile::compile(self)
    }

    pub fn num_glyphs(&self) -> usize {
        self.char_strings.count()
    }

    /// Returns `true` if `glyph_id` refers to a glyph with a non-empty program.
    pub fn has_glyph_id(&self, glyph_id: usize) -> bool {
        self.char_strings
            .get(glyph_id)
            .map_or(false, |program| !program.is_empty())
    }

    /// Append a copy of glyph 0.
    ///
    /// Some consumers never display glyph 0, so fonts that put a real glyph there need it
    /// duplicated. Does nothing when the font is already at the glyph limit.
    pub fn duplicate_first_glyph(&mut self) {
        if self.char_strings.count() >= MAX_GLYPHS {
            warn!("Not enough space in charstrings to duplicate first glyph.");
            return;
        }
        let Some(glyph_zero) = self.char_strings.get(0).map(<[u8]>::to_vec) else {
            return;
        };
        self.char_strings.push(glyph_zero);
        if let Some(&width) = self.widths.first() {
            self.widths.push(width);
        }
        if let Some(&seac) = self.seacs.first() {
            self.seacs.push(seac);
        }
        if self.is_cid_font {
            if let Some(fd_select) = &mut self.fd_select {
                if let Some(&fd_index) = fd_select.fd_indices.first() {
                    fd_select.fd_indices.push(fd_index);
                }
            }
        }
    }

    /// Width of `glyph_id` as found while validating its program.
    pub fn width(&self, glyph_id: usize) -> Option<f64> {
        self.widths.get(glyph_id).copied()
    }

    pub fn seac(&self, glyph_id: usize) -> Option<Seac> {
        self.seacs.get(glyph_id).copied().flatten()
    }

    /// The Private DICT used by `glyph_id`: the one of its Font DICT in CID-keyed fonts.
    pub fn private_dict(&self, glyph_id: usize) -> Option<&PrivateDict> {
        match &self.fd_select {
            Some(fd_select) if self.is_cid_font => {
                let fd_index = fd_select.font_dict_index(glyph_id)?;
                self.fd_array.get(usize::from(fd_index))?.private.as_ref()
            }
            _ => self.top.private.as_ref(),
        }
    }
}

impl ReadBinary for Header {
    type HostType<'b> = Self;

    fn read(ctxt: &mut ReadCtxt<'_>) -> Result<Self, ParseError> {
        let major = ctxt.read_u8()?;
        ctxt.check(major == HEADER_MAJOR_VERSION)?;
        let minor = ctxt.read_u8()?;
        let hdr_size = ctxt.read_u8()?;
        let off_size = ctxt.read_u8()?;

        Ok(Header {
            major,
            minor,
            hdr_size,
            off_size,
        })
    }
}

impl WriteBinary<&Self> for Header {
    type Output = ();

    fn write<C: WriteContext>(ctxt: &mut C, header: &Header) -> Result<(), WriteError> {
        U8::write(ctxt, header.major)?;
        U8::write(ctxt, header.minor)?;
        // Any data between the header and the Name INDEX is discarded.
        // So the size will always be 4 bytes.
        U8::write(ctxt, 4)?; // hdr_size
        U8::write(ctxt, header.off_size)?;

        Ok(())
    }
}

fn read_charset(
    scope: &ReadScope<'_>,
    offset: usize,
    num_glyphs: usize,
    strings: &Strings,
    is_cid_font: bool,
) -> Result<Charset, ParseError> {
    match Charset::predefined(offset) {
        Some(charset) => Ok(charset),
        None => scope
            .offset(offset)
            .read_dep::<Charset>((num_glyphs, strings, is_cid_font)),
    }
}

/// Replace the Private DICT of `parent` with an empty one.
fn empty_private_dict(parent: &mut TopDict) -> Option<PrivateDict> {
    parent.insert(Operator::Private, &[0.0, 0.0]);
    Some(PrivateDict::default())
}

/// Read the Private DICT (and its local subroutines) that `parent` refers to.
///
/// A missing or unusable Private DICT is replaced with an empty one. A `Private` entry that does
/// not hold exactly a size and an offset is removed, leaving no Private DICT at all.
fn read_private_dict(
    scope: &ReadScope<'_>,
    parent: &mut TopDict,
) -> Result<Option<PrivateDict>, ParseError> {
    let Some(values) = parent.values(Operator::Private) else {
        return Ok(empty_private_dict(parent));
    };
    let &[size, offset] = values else {
        debug!("malformed Private entry: {:?}", values);
        parent.remove(Operator::Private);
        return Ok(None);
    };

    let len = scope.data().len();
    let (Some(size), Some(offset)) = (size.to_usize(), offset.to_usize()) else {
        debug!("Private entry out of range: {} {}", size, offset);
        return Ok(empty_private_dict(parent));
    };
    if size == 0 || offset >= len {
        debug!("Private entry out of range: {} {}", size, offset);
        return Ok(empty_private_dict(parent));
    }

    let dict = scope
        .offset_length(offset, size.min(len - offset))?
        .read::<dict::Dict<PrivateDictSchema>>()?;

    // Subrs is relative to the start of the Private DICT
    let subrs_offset = match dict.values(Operator::Subrs) {
        None | Some([]) => None,
        Some(&[value, ..]) if value == 0.0 => None,
        Some(&[value, ..]) => match value.to_usize().and_then(|value| value.checked_add(offset)) {
            Some(subrs_offset) if subrs_offset < len => Some(subrs_offset),
            _ => {
                debug!("Subrs offset out of range: {}", value);
                return Ok(empty_private_dict(parent));
            }
        },
    };

    let subrs = match subrs_offset {
        Some(subrs_offset) => match scope.offset(subrs_offset).read::<Index>() {
            Ok(subrs) => Some(subrs),
            Err(err) => {
                debug!("unable to read Subrs: {}", err);
                return Ok(empty_private_dict(parent));
            }
        },
        None => None,
    };

    Ok(Some(PrivateDict { dict, subrs }))
}
