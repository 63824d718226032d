//! The INDEX structure: a counted, offset delimited sequence of byte strings.
//!
//! Refer to section 5 "INDEX Data" of Technical Note #5176.

use byteorder::{BigEndian, ByteOrder};
use itertools::Itertools;

use crate::binary::read::{ReadBinary, ReadCtxt};
use crate::binary::write::{WriteBinary, WriteContext};
use crate::binary::{U16Be, U24Be, U32Be, U8};
use crate::error::{ParseError, WriteError};

/// An owned INDEX.
///
/// Objects are copied out of the input when read so that later repairs never alias the
/// original font data.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Index {
    objects: Vec<Vec<u8>>,
}

impl Index {
    pub fn new() -> Self {
        Index::default()
    }

    pub fn count(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&[u8]> {
        self.objects.get(index).map(Vec::as_slice)
    }

    /// Replace the object at `index`. Out of range indices are ignored.
    pub fn set(&mut self, index: usize, data: Vec<u8>) {
        if let Some(object) = self.objects.get_mut(index) {
            *object = data;
        }
    }

    pub fn push(&mut self, data: Vec<u8>) {
        self.objects.push(data);
    }

    pub fn iter(&self) -> impl Iterator<Item = &[u8]> + '_ {
        self.objects.iter().map(Vec::as_slice)
    }

    /// Total length of all objects.
    pub fn data_len(&self) -> usize {
        self.objects.iter().map(Vec::len).sum()
    }
}

impl From<Vec<Vec<u8>>> for Index {
    fn from(objects: Vec<Vec<u8>>) -> Self {
        Index { objects }
    }
}

impl ReadBinary for Index {
    type HostType<'a> = Index;

    fn read(ctxt: &mut ReadCtxt<'_>) -> Result<Self, ParseError> {
        let count = usize::from(ctxt.read_u16be()?);
        if count == 0 {
            return Ok(Index::new());
        }

        let off_size = ctxt.read_u8()?;
        ctxt.check((1..=4).contains(&off_size))?;

        let offset_array_size = (count + 1) * usize::from(off_size);
        let offset_array = ctxt.read_slice(offset_array_size)?;
        let offsets = (0..=count)
            .map(|i| lookup_offset_index(off_size, offset_array, i))
            .collect::<Vec<_>>();

        // Offsets are 1-based, relative to the byte preceding the object data
        let last_offset = offsets[count];
        if last_offset < 1 {
            return Err(ParseError::BadValue);
        }
        // Truncated data is cut short rather than rejected
        let available = ctxt.scope().data().len();
        let data = ctxt.read_slice((last_offset - 1).min(available))?;

        let objects = offsets
            .iter()
            .tuple_windows()
            .map(|(&start, &end)| read_object(data, start, end))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Index { objects })
    }
}

fn read_object(data: &[u8], start: usize, end: usize) -> Result<Vec<u8>, ParseError> {
    if start < 1 || end < 1 {
        return Err(ParseError::BadOffset);
    }
    let start = (start - 1).min(data.len());
    let end = (end - 1).min(data.len());
    Ok(data.get(start..end).map(<[u8]>::to_vec).unwrap_or_default())
}

fn lookup_offset_index(off_size: u8, offset_array: &[u8], index: usize) -> usize {
    let buf = &offset_array[index * usize::from(off_size)..];
    match off_size {
        1 => usize::from(buf[0]),
        2 => usize::from(BigEndian::read_u16(buf)),
        3 => BigEndian::read_u24(buf) as usize,
        _ => BigEndian::read_u32(buf) as usize,
    }
}

/// Smallest offset width able to hold `value`.
pub(crate) fn offset_size(value: usize) -> Option<u8> {
    match value {
        0..=0xFF => Some(1),
        0x100..=0xFFFF => Some(2),
        0x1_0000..=0xFF_FFFF => Some(3),
        0x100_0000..=0xFFFF_FFFF => Some(4),
        _ => None,
    }
}

impl WriteBinary<&Index> for Index {
    /// The position of each object relative to the start of the INDEX.
    type Output = Vec<usize>;

    fn write<C: WriteContext>(ctxt: &mut C, index: &Index) -> Result<Vec<usize>, WriteError> {
        let start = ctxt.bytes_written();
        if index.is_empty() {
            // A bare count of zero would be valid, downstream sanitizers want the extra byte
            return ctxt.write_bytes(&[0, 0, 0]).map(|()| Vec::new());
        }

        let count = u16::try_from(index.count())?;
        let mut offsets = Vec::with_capacity(index.count() + 1);
        let mut offset = 1;
        offsets.push(offset);
        for object in index.iter() {
            offset += object.len();
            offsets.push(offset);
        }
        let off_size = offset_size(offset).ok_or(WriteError::BadValue)?;

        U16Be::write(ctxt, count)?;
        U8::write(ctxt, off_size)?;
        match off_size {
            1 => ctxt.write_iter::<U8, _>(offsets.iter().map(|&offset| offset as u8))?,
            2 => ctxt.write_iter::<U16Be, _>(offsets.iter().map(|&offset| offset as u16))?,
            3 => ctxt.write_iter::<U24Be, _>(offsets.iter().map(|&offset| offset as u32))?,
            _ => ctxt.write_iter::<U32Be, _>(offsets.iter().map(|&offset| offset as u32))?,
        }

        let mut positions = Vec::with_capacity(index.count());
        for object in index.iter() {
            positions.push(ctxt.bytes_written() - start);
            ctxt.write_bytes(object)?;
        }
        Ok(positions)
    }
}
