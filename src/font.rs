//! Loading a CFF font for use by a renderer.
//!
//! [CffFont] is the boundary with the code that finds fonts in documents: it parses the font
//! program, reports font wide metrics back through [FontProperties], and produces the sanitized
//! program along with the character code to glyph id mapping.

use log::warn;
use rustc_hash::FxHashMap;

use crate::cff::{Operator, Seac, CFF};
use crate::error::ParseError;

/// Caller supplied description of a font, filled in further while loading it.
#[derive(Debug, Clone, PartialEq)]
pub struct FontProperties {
    /// The font is used through a CMap (a Type0 font).
    pub composite: bool,
    /// CID to glyph id table of a composite font, indexed by CID.
    pub cid_to_gid_map: Option<Vec<u16>>,
    /// The font program is a substitute bundled with the application.
    pub is_internal_font: bool,
    /// Glyph name for each character code, used for internal fonts.
    pub default_encoding: Option<Vec<Option<String>>>,
    /// Record `endchar` accent compositions while validating glyphs.
    pub seac_analysis: bool,
    pub font_matrix: Option<[f64; 6]>,
    pub ascent: Option<f64>,
    pub descent: Option<f64>,
    /// Glyph name for each character code, as encoded by the font itself.
    pub builtin_encoding: Option<Vec<Option<String>>>,
}

impl FontProperties {
    pub fn new(seac_analysis: bool) -> Self {
        FontProperties {
            composite: false,
            cid_to_gid_map: None,
            is_internal_font: false,
            default_encoding: None,
            seac_analysis,
            font_matrix: None,
            ascent: None,
            descent: None,
            builtin_encoding: None,
        }
    }
}

/// Maps CIDs back to the character codes that select them.
pub trait CharCodeMap {
    fn char_code_of(&self, cid: u32) -> Option<u32>;
}

impl CharCodeMap for FxHashMap<u32, u32> {
    fn char_code_of(&self, cid: u32) -> Option<u32> {
        self.get(&cid).copied()
    }
}

pub struct CffFont {
    cff: CFF,
    properties: FontProperties,
    data: Vec<u8>,
}

impl CffFont {
    /// Parse and sanitize the CFF program in `bytes`.
    ///
    /// Parse errors are returned. If the parsed font cannot be written back out the original
    /// bytes are kept as the font data.
    pub fn new(bytes: &[u8], properties: &mut FontProperties) -> Result<CffFont, ParseError> {
        let cff = CFF::parse(bytes, properties.seac_analysis)?;

        let top = &cff.top.dict;
        if let Some(matrix) = top.get(Operator::FontMatrix) {
            if let Ok(matrix) = <[f64; 6]>::try_from(matrix) {
                properties.font_matrix = Some(matrix);
            }
        }
        if let Some(&[_, y_min, _, y_max]) = top.values(Operator::FontBBox) {
            properties.ascent = Some(y_max.max(y_min));
            properties.descent = Some(y_min.min(y_max));
        }
        if let Some(encoding) = builtin_encoding(&cff) {
            properties.builtin_encoding = Some(encoding);
        }

        let data = compile_or_original(&cff, bytes);
        Ok(CffFont {
            cff,
            properties: properties.clone(),
            data,
        })
    }

    /// The sanitized font program.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn cff(&self) -> &CFF {
        &self.cff
    }

    pub fn num_glyphs(&self) -> usize {
        self.cff.num_glyphs()
    }

    pub fn has_glyph_id(&self, glyph_id: usize) -> bool {
        self.cff.has_glyph_id(glyph_id)
    }

    pub fn seacs(&self) -> &[Option<Seac>] {
        &self.cff.seacs
    }

    pub fn widths(&self) -> &[f64] {
        &self.cff.widths
    }

    /// Character code to glyph id mapping of this font.
    ///
    /// Composite fonts go through `cmap`, with codes equal to CIDs when there is none. Other
    /// fonts use the encoding of the font, or the default encoding for internal fonts.
    pub fn glyph_mapping(&self, cmap: Option<&dyn CharCodeMap>) -> FxHashMap<u32, u16> {
        if self.properties.composite {
            self.composite_glyph_mapping(cmap)
        } else {
            self.simple_glyph_mapping()
        }
    }

    fn composite_glyph_mapping(&self, cmap: Option<&dyn CharCodeMap>) -> FxHashMap<u32, u16> {
        let char_code_of = |cid: u32| match cmap {
            Some(cmap) => cmap.char_code_of(cid),
            None => Some(cid),
        };

        let mut mapping = FxHashMap::default();
        if self.cff.is_cid_font {
            let inverse_cid_to_gid = self
                .properties
                .cid_to_gid_map
                .as_ref()
                .filter(|map| !map.is_empty())
                .map(|map| {
                    map.iter()
                        .enumerate()
                        .map(|(cid, &gid)| (u32::from(gid), cid as u32))
                        .collect::<FxHashMap<_, _>>()
                });

            for glyph_id in 0..self.cff.charset.len() {
                let (Some(cid), Ok(gid)) = (self.cff.charset.cid(glyph_id), u16::try_from(glyph_id))
                else {
                    continue;
                };
                let Some(mut char_code) = char_code_of(cid) else {
                    continue;
                };
                if let Some(&code) = inverse_cid_to_gid
                    .as_ref()
                    .and_then(|inverse| inverse.get(&char_code))
                {
                    char_code = code;
                }
                mapping.insert(char_code, gid);
            }
        } else {
            for glyph_id in 0..self.cff.num_glyphs().min(usize::from(u16::MAX) + 1) {
                let gid = glyph_id as u16;
                if let Some(char_code) = char_code_of(u32::from(gid)) {
                    mapping.insert(char_code, gid);
                }
            }
        }
        mapping
    }

    fn simple_glyph_mapping(&self) -> FxHashMap<u32, u16> {
        let charset = &self.cff.charset;
        match (&self.properties.default_encoding, &self.cff.encoding) {
            (Some(names), _) if self.properties.is_internal_font => names
                .iter()
                .enumerate()
                .map(|(code, name)| {
                    let glyph_id = name
                        .as_deref()
                        .and_then(|name| charset.glyph_id_for_name(name))
                        .and_then(|glyph_id| u16::try_from(glyph_id).ok())
                        .unwrap_or(0);
                    (code as u32, glyph_id)
                })
                .collect(),
            (_, Some(encoding)) => encoding
                .codes
                .iter()
                .map(|(&code, &glyph_id)| (u32::from(code), glyph_id))
                .collect(),
            (_, None) => FxHashMap::default(),
        }
    }
}

/// Glyph name of each character code in the encoding of the font.
fn builtin_encoding(cff: &CFF) -> Option<Vec<Option<String>>> {
    let encoding = cff.encoding.as_ref()?;
    let mut names: Vec<Option<String>> = Vec::new();
    for (&code, &glyph_id) in &encoding.codes {
        let Some(name) = cff.charset.name(usize::from(glyph_id)) else {
            continue;
        };
        let code = usize::from(code);
        if names.len() <= code {
            names.resize(code + 1, None);
        }
        names[code] = Some(name.to_string());
    }
    (!names.is_empty()).then_some(names)
}

fn compile_or_original(cff: &CFF, bytes: &[u8]) -> Vec<u8> {
    match cff.compile() {
        Ok(data) => data,
        Err(err) => {
            warn!("Failed to compile font: {}", err);
            bytes.to_vec()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::read_fixture;

    const TIMES_ROMAN: &str = "tests/fonts/cff/ABCDEF+Times-Roman.cff";

    struct ShiftedCodes(u32);

    impl CharCodeMap for ShiftedCodes {
        fn char_code_of(&self, cid: u32) -> Option<u32> {
            Some(cid + self.0)
        }
    }

    #[test]
    fn test_new_sets_properties() {
        let data = read_fixture(TIMES_ROMAN);
        let mut properties = FontProperties::new(false);
        let font = CffFont::new(&data, &mut properties).unwrap();

        assert_eq!(
            properties.font_matrix,
            Some([0.001, 0.0, 0.0, 0.001, 0.0, 0.0])
        );
        assert_eq!(properties.ascent, Some(898.0));
        assert_eq!(properties.descent, Some(-218.0));

        // The predefined charset names more glyphs than the font has
        let builtin_encoding = properties.builtin_encoding.unwrap();
        assert_eq!(builtin_encoding[0x20].as_deref(), Some("space"));
        assert_eq!(builtin_encoding[0x41].as_deref(), Some("A"));
        assert_eq!(builtin_encoding[0x7f], None);

        assert_eq!(font.num_glyphs(), 2);
        assert_eq!(font.widths(), &[250.0, 250.0]);
        assert_eq!(font.seacs(), &[None, None]);
        assert!(font.has_glyph_id(1));
        assert!(!font.has_glyph_id(2));
        assert!(CFF::parse(font.data(), false).is_ok());
    }

    #[test]
    fn test_parse_error() {
        let mut properties = FontProperties::new(false);
        assert_eq!(
            CffFont::new(&[0, 0, 0], &mut properties).err(),
            Some(ParseError::MissingHeader)
        );
    }

    #[test]
    fn test_compile_failure_keeps_original() {
        let data = read_fixture(TIMES_ROMAN);
        let mut cff = CFF::parse(&data, false).unwrap();
        assert_ne!(compile_or_original(&cff, &data), data);

        cff.top.private = None;
        assert_eq!(compile_or_original(&cff, &data), data);
    }

    #[test]
    fn test_simple_glyph_mapping() {
        let data = read_fixture(TIMES_ROMAN);
        let mut properties = FontProperties::new(false);
        let font = CffFont::new(&data, &mut properties).unwrap();

        let mapping = font.glyph_mapping(None);
        assert_eq!(mapping.get(&0x20), Some(&1));
        assert_eq!(mapping.get(&0x41), Some(&34));
        assert_eq!(mapping.get(&0x7f), None);
    }

    #[test]
    fn test_internal_font_glyph_mapping() {
        let data = read_fixture(TIMES_ROMAN);
        let mut properties = FontProperties::new(false);
        properties.is_internal_font = true;
        let mut default_encoding = vec![None; 0x42];
        default_encoding[0x41] = Some(String::from("space"));
        default_encoding[0x40] = Some(String::from("Euro"));
        properties.default_encoding = Some(default_encoding);
        let font = CffFont::new(&data, &mut properties).unwrap();

        let mapping = font.glyph_mapping(None);
        assert_eq!(mapping.len(), 0x42);
        assert_eq!(mapping.get(&0x41), Some(&1));
        assert_eq!(mapping.get(&0x40), Some(&0));
        assert_eq!(mapping.get(&0x20), Some(&0));
    }

    #[test]
    fn test_composite_glyph_mapping() {
        let data = read_fixture(TIMES_ROMAN);
        let mut properties = FontProperties::new(false);
        properties.composite = true;
        let font = CffFont::new(&data, &mut properties).unwrap();

        let mapping = font.glyph_mapping(None);
        assert_eq!(mapping.get(&0), Some(&0));
        assert_eq!(mapping.get(&1), Some(&1));

        let mapping = font.glyph_mapping(Some(&ShiftedCodes(10)));
        assert_eq!(mapping.get(&10), Some(&0));
        assert_eq!(mapping.get(&11), Some(&1));
        assert_eq!(mapping.get(&1), None);
    }
}
