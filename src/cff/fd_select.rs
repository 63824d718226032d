//! FDSelect: the Font DICT used by each glyph of a CID-keyed font.
//!
//! Refer to section 19 "FDSelect" of Technical Note #5176.

use itertools::Itertools;
use log::warn;

use crate::binary::read::{ReadBinaryDep, ReadCtxt};
use crate::binary::{U16Be, U8};
use crate::error::{ParseError, WriteError};

/// Font DICT select, expanded to one Font DICT index per glyph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FDSelect {
    /// Format the data was read in, 0 or 3. Compilation uses the same format.
    pub format: u8,
    pub fd_indices: Vec<u8>,
}

impl FDSelect {
    /// Returns the index of the Font DICT for the supplied `glyph_id`
    pub fn font_dict_index(&self, glyph_id: usize) -> Option<u8> {
        self.fd_indices.get(glyph_id).copied()
    }

    pub fn len(&self) -> usize {
        self.fd_indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fd_indices.is_empty()
    }

    pub fn compile(&self) -> Result<Vec<u8>, WriteError> {
        match self.format {
            0 => {
                let mut data = Vec::with_capacity(1 + self.fd_indices.len());
                data.push(0);
                data.extend_from_slice(&self.fd_indices);
                Ok(data)
            }
            3 => {
                let ranges = self
                    .fd_indices
                    .iter()
                    .enumerate()
                    .dedup_by(|(_, a), (_, b)| a == b)
                    .collect::<Vec<_>>();
                let sentinel = u16::try_from(self.fd_indices.len())?;

                let mut data = Vec::with_capacity(5 + ranges.len() * 3);
                data.push(3);
                data.extend_from_slice(&u16::try_from(ranges.len())?.to_be_bytes());
                for (first, &fd_index) in ranges {
                    data.extend_from_slice(&u16::try_from(first)?.to_be_bytes());
                    data.push(fd_index);
                }
                data.extend_from_slice(&sentinel.to_be_bytes());
                Ok(data)
            }
            _ => Err(WriteError::BadValue),
        }
    }
}

impl ReadBinaryDep for FDSelect {
    type Args<'a> = usize;
    type HostType<'a> = FDSelect;

    fn read_dep<'a>(ctxt: &mut ReadCtxt<'a>, num_glyphs: usize) -> Result<Self, ParseError> {
        let format = ctxt.read_u8()?;
        let fd_indices = match format {
            0 => ctxt.read_array::<U8>(num_glyphs)?.to_vec(),
            3 => {
                let nranges = usize::from(ctxt.read_u16be()?);
                let mut fd_indices = Vec::new();
                for i in 0..nranges {
                    let (mut first, fd_index) = ctxt.read::<(U16Be, U8)>()?;
                    if i == 0 && first != 0 {
                        warn!("FDSelect: the first range must start at glyph 0, repairing");
                        first = 0;
                    }
                    // The next range start (or the sentinel) ends this range
                    let next = ctxt.scope().read::<U16Be>()?;
                    if next > first {
                        let len = fd_indices.len() + usize::from(next - first);
                        if len > num_glyphs {
                            return Err(ParseError::FdSelectMismatch);
                        }
                        fd_indices.resize(len, fd_index);
                    }
                }
                let _sentinel = ctxt.read_u16be()?;
                fd_indices
            }
            _ => return Err(ParseError::UnknownFormat),
        };

        if fd_indices.len() != num_glyphs {
            return Err(ParseError::FdSelectMismatch);
        }

        Ok(FDSelect { format, fd_indices })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binary::read::ReadScope;

    fn read(data: &[u8], num_glyphs: usize) -> Result<FDSelect, ParseError> {
        ReadScope::new(data).read_dep::<FDSelect>(num_glyphs)
    }

    #[test]
    fn test_read_format0() {
        let fd_select = read(&[0, 0, 1, 1], 3).unwrap();
        assert_eq!(fd_select.fd_indices, vec![0, 1, 1]);
        assert_eq!(fd_select.font_dict_index(2), Some(1));
        assert_eq!(fd_select.font_dict_index(3), None);
    }

    #[test]
    fn test_read_format3() {
        let data = [3, 0, 2, 0, 0, 0, 0, 2, 1, 0, 4];
        let fd_select = read(&data, 4).unwrap();
        assert_eq!(fd_select.fd_indices, vec![0, 0, 1, 1]);
        assert_eq!(fd_select.format, 3);
    }

    #[test]
    fn test_read_format3_repairs_first_range() {
        // The first range starts at glyph 1 instead of 0
        let data = [3, 0, 2, 0, 1, 0, 0, 2, 1, 0, 4];
        let fd_select = read(&data, 4).unwrap();
        assert_eq!(fd_select.fd_indices, vec![0, 0, 1, 1]);
    }

    #[test]
    fn test_read_length_mismatch() {
        let data = [3, 0, 1, 0, 0, 0, 0, 2];
        assert_eq!(read(&data, 3), Err(ParseError::FdSelectMismatch));
    }

    #[test]
    fn test_read_unknown_format() {
        assert_eq!(read(&[1, 0], 1), Err(ParseError::UnknownFormat));
    }

    #[test]
    fn test_compile_format3() {
        let fd_select = FDSelect {
            format: 3,
            fd_indices: vec![0, 0],
        };
        assert_eq!(fd_select.compile().unwrap(), vec![3, 0, 1, 0, 0, 0, 0, 2]);

        let fd_select = FDSelect {
            format: 3,
            fd_indices: vec![0, 0, 1, 1],
        };
        assert_eq!(
            fd_select.compile().unwrap(),
            vec![3, 0, 2, 0, 0, 0, 0, 2, 1, 0, 4]
        );
    }

    #[test]
    fn test_compile_format0() {
        let fd_select = FDSelect {
            format: 0,
            fd_indices: vec![2, 0, 1],
        };
        assert_eq!(fd_select.compile().unwrap(), vec![0, 2, 0, 1]);
    }
}
