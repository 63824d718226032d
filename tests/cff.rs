mod common;

use cffsan::cff::{
    Charset, CharsetGlyphs, CharsetSource, FDSelect, FontDict, Header, Index, Operator,
    PrivateDict, Strings, TopDict, CFF,
};
use cffsan::font::{CffFont, FontProperties};
use rustc_hash::FxHashMap;

use crate::common::read_fixture;

const TIMES_ROMAN: &str = "tests/fonts/cff/ABCDEF+Times-Roman.cff";
// Position of the program of glyph 1 in the fixture
const GLYPH_1_PROGRAM: usize = 101;

fn cid_font_data(num_glyphs: usize) -> Vec<u8> {
    let mut top = TopDict::new();
    top.set(Operator::ROS, &[391.0, 392.0, 0.0]).unwrap();
    top.set(Operator::CharStrings, &[0.0]).unwrap();
    top.set(Operator::FDArray, &[0.0]).unwrap();
    top.set(Operator::FDSelect, &[0.0]).unwrap();
    top.set(Operator::Private, &[0.0, 0.0]).unwrap();

    let mut font_dict = TopDict::new();
    font_dict.set(Operator::Private, &[0.0, 0.0]).unwrap();

    let mut strings = Strings::new();
    strings.add("Adobe");
    strings.add("Identity");

    let cff = CFF {
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
        char_strings: Index::from(vec![vec![0x8b, 0x0e]; num_glyphs]),
        charset: Charset {
            source: CharsetSource::Custom {
                format: 2,
                raw: Vec::new(),
            },
            glyphs: CharsetGlyphs::Cids((0..num_glyphs as u32).collect()),
        },
        encoding: None,
        fd_array: vec![FontDict {
            dict: font_dict,
            private: Some(PrivateDict::default()),
        }],
        fd_select: Some(FDSelect {
            format: 0,
            fd_indices: vec![0; num_glyphs],
        }),
        is_cid_font: true,
        widths: vec![0.0; num_glyphs],
        seacs: vec![None; num_glyphs],
    };
    cff.compile().unwrap()
}

#[test]
fn sanitize_times_roman() {
    let data = read_fixture(TIMES_ROMAN);
    let mut properties = FontProperties::new(true);
    let font = CffFont::new(&data, &mut properties).unwrap();

    let sanitized = CFF::parse(font.data(), true).unwrap();
    assert_eq!(sanitized.num_glyphs(), 2);
    assert_eq!(sanitized.names, vec!["ABCDEF+Times-Roman"]);
    assert_eq!(sanitized.widths, font.widths());
    assert_eq!(sanitized.char_strings, font.cff().char_strings);
}

#[test]
fn shifted_font_data() {
    let mut data = vec![0x25, 0x21, 0x50];
    data.extend(read_fixture(TIMES_ROMAN));
    let cff = CFF::parse(&data, false).unwrap();
    assert_eq!(cff.num_glyphs(), 2);
    assert_eq!(cff.names, vec!["ABCDEF+Times-Roman"]);
}

#[test]
fn invalid_glyph_is_replaced() {
    let mut data = read_fixture(TIMES_ROMAN);
    // callsubr in a font without local subroutines
    data[GLYPH_1_PROGRAM] = 0x0a;

    let mut properties = FontProperties::new(false);
    let font = CffFont::new(&data, &mut properties).unwrap();
    assert_eq!(font.cff().char_strings.get(1), Some(&[0x8b, 0x0e][..]));

    let sanitized = CFF::parse(font.data(), false).unwrap();
    assert_eq!(sanitized.char_strings.get(1), Some(&[0x8b, 0x0e][..]));
}

#[test]
fn truncated_font_keeps_glyphs() {
    let data = read_fixture(TIMES_ROMAN);
    let cff = CFF::parse(&data[..GLYPH_1_PROGRAM], false).unwrap();
    assert_eq!(cff.num_glyphs(), 2);
    assert_eq!(cff.char_strings.get(0), Some(&[0x0e][..]));
    assert_eq!(cff.char_strings.get(1), Some(&[][..]));

    let compiled = CFF::parse(&cff.compile().unwrap(), false).unwrap();
    assert_eq!(compiled.num_glyphs(), 2);
    assert_eq!(compiled.char_strings.get(1), Some(&[0x8b, 0x0e][..]));
}

#[test]
fn cid_font_glyph_mapping() {
    let data = cid_font_data(3);
    let cmap: FxHashMap<u32, u32> = [(1, 1), (2, 2)].into_iter().collect();

    let mut properties = FontProperties::new(false);
    properties.composite = true;
    let font = CffFont::new(&data, &mut properties).unwrap();
    assert!(font.cff().is_cid_font);

    let mapping = font.glyph_mapping(Some(&cmap));
    assert_eq!(mapping.len(), 2);
    assert_eq!(mapping.get(&1), Some(&1));
    assert_eq!(mapping.get(&2), Some(&2));

    // Codes found in the CID to GID map are replaced by the CID that maps to them
    properties.cid_to_gid_map = Some(vec![0, 2, 1]);
    let font = CffFont::new(&data, &mut properties).unwrap();
    let mapping = font.glyph_mapping(Some(&cmap));
    assert_eq!(mapping.get(&2), Some(&1));
    assert_eq!(mapping.get(&1), Some(&2));
}

#[test]
fn duplicate_first_glyph_in_cid_font() {
    let mut cff = CFF::parse(&cid_font_data(2), false).unwrap();
    cff.duplicate_first_glyph();
    assert_eq!(cff.num_glyphs(), 3);
    assert_eq!(cff.fd_select.as_ref().unwrap().fd_indices, vec![0, 0, 0]);

    let compiled = CFF::parse(&cff.compile().unwrap(), false).unwrap();
    assert_eq!(compiled.num_glyphs(), 3);
}
