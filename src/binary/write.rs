#![deny(missing_docs)]

//! Write binary data

use crate::binary::{I16Be, I32Be, U16Be, U24Be, U32Be, U8};
use crate::error::WriteError;

/// An in-memory buffer that implements `WriteContext`.
#[derive(Debug, Default)]
pub struct WriteBuffer {
    data: Vec<u8>,
}

/// A fixed size window into a `WriteBuffer`, used to fill in previously written bytes.
pub struct WriteSlice<'a> {
    offset: usize,
    data: &'a mut [u8],
}

/// Trait that describes a type that can be written to a `WriteContext` in binary form.
pub trait WriteBinary<HostType = Self> {
    /// The type of the value returned by `write`.
    type Output;

    /// Write the binary representation of Self to `ctxt`.
    fn write<C: WriteContext>(ctxt: &mut C, val: HostType) -> Result<Self::Output, WriteError>;
}

/// Trait for types that can have binary data written to them.
pub trait WriteContext {
    /// Write the values yielded by an iterator into a `WriteContext`.
    fn write_iter<T, HostType>(
        &mut self,
        iter: impl Iterator<Item = HostType>,
    ) -> Result<(), WriteError>
    where
        Self: Sized,
        T: WriteBinary<HostType>,
    {
        for val in iter {
            T::write(self, val)?;
        }

        Ok(())
    }

    /// Write a slice of bytes to a `WriteContext`.
    fn write_bytes(&mut self, data: &[u8]) -> Result<(), WriteError>;

    /// The total number of bytes written so far.
    fn bytes_written(&self) -> usize;
}

impl<T> WriteBinary<T> for U8
where
    T: Into<u8>,
{
    type Output = ();

    fn write<C: WriteContext>(ctxt: &mut C, t: T) -> Result<(), WriteError> {
        let val: u8 = t.into();
        ctxt.write_bytes(&[val])
    }
}

impl<T> WriteBinary<T> for I16Be
where
    T: Into<i16>,
{
    type Output = ();

    fn write<C: WriteContext>(ctxt: &mut C, t: T) -> Result<(), WriteError> {
        let val: i16 = t.into();
        ctxt.write_bytes(&val.to_be_bytes())
    }
}

impl<T> WriteBinary<T> for U16Be
where
    T: Into<u16>,
{
    type Output = ();

    fn write<C: WriteContext>(ctxt: &mut C, t: T) -> Result<(), WriteError> {
        let val: u16 = t.into();
        ctxt.write_bytes(&val.to_be_bytes())
    }
}

impl<T> WriteBinary<T> for U24Be
where
    T: Into<u32>,
{
    type Output = ();

    fn write<C: WriteContext>(ctxt: &mut C, t: T) -> Result<(), WriteError> {
        let val: u32 = t.into();
        if val > 0xFF_FFFF {
            return Err(WriteError::BadValue);
        }
        ctxt.write_bytes(&val.to_be_bytes()[1..4])
    }
}

impl<T> WriteBinary<T> for I32Be
where
    T: Into<i32>,
{
    type Output = ();

    fn write<C: WriteContext>(ctxt: &mut C, t: T) -> Result<(), WriteError> {
        let val: i32 = t.into();
        ctxt.write_bytes(&val.to_be_bytes())
    }
}

impl<T> WriteBinary<T> for U32Be
where
    T: Into<u32>,
{
    type Output = ();

    fn write<C: WriteContext>(ctxt: &mut C, t: T) -> Result<(), WriteError> {
        let val: u32 = t.into();
        ctxt.write_bytes(&val.to_be_bytes())
    }
}

impl WriteContext for WriteBuffer {
    fn write_bytes(&mut self, data: &[u8]) -> Result<(), WriteError> {
        self.data.extend_from_slice(data);
        Ok(())
    }

    fn bytes_written(&self) -> usize {
        self.data.len()
    }
}

impl<'a> WriteContext for WriteSlice<'a> {
    fn write_bytes(&mut self, data: &[u8]) -> Result<(), WriteError> {
        let end = self
            .offset
            .checked_add(data.len())
            .ok_or(WriteError::BadValue)?;
        match self.data.get_mut(self.offset..end) {
            Some(subslice) => {
                subslice.copy_from_slice(data);
                self.offset = end;
                Ok(())
            }
            None => Err(WriteError::BadValue),
        }
    }

    fn bytes_written(&self) -> usize {
        self.offset
    }
}

impl<'a> WriteSlice<'a> {
    /// The bytes covered by this slice, including any already overwritten.
    pub fn bytes(&self) -> &[u8] {
        self.data
    }
}

impl WriteBuffer {
    /// Create a new, empty `WriteBuffer`
    pub fn new() -> Self {
        WriteBuffer { data: Vec::new() }
    }

    /// Retrieve a slice of the data held by this buffer
    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    /// Returns the current size of the data held by this buffer
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if nothing has been written to this buffer
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Borrow `length` bytes starting at `offset` for overwriting.
    pub fn slice_mut(&mut self, offset: usize, length: usize) -> Result<WriteSlice<'_>, WriteError> {
        let end = offset.checked_add(length).ok_or(WriteError::BadValue)?;
        let data = self
            .data
            .get_mut(offset..end)
            .ok_or(WriteError::BadValue)?;
        Ok(WriteSlice { offset: 0, data })
    }

    /// Consume `self` and return the inner buffer
    pub fn into_inner(self) -> Vec<u8> {
        self.data
    }
}

impl From<Vec<u8>> for WriteBuffer {
    fn from(data: Vec<u8>) -> Self {
        WriteBuffer { data }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_u24be() {
        let mut ctxt = WriteBuffer::new();
        U24Be::write(&mut ctxt, 0x10203u32).unwrap();
        assert_eq!(ctxt.bytes(), &[1, 2, 3]);

        // Check out of range value
        match U24Be::write(&mut ctxt, u32::MAX) {
            Err(WriteError::BadValue) => {}
            _ => panic!("Expected WriteError::BadValue"),
        }
    }

    #[test]
    fn test_write_iter() {
        let mut ctxt = WriteBuffer::new();
        ctxt.write_iter::<U16Be, _>([1u16, 0x203].into_iter()).unwrap();
        assert_eq!(ctxt.bytes(), &[0, 1, 2, 3]);
    }

    #[test]
    fn test_slice_mut() {
        let mut ctxt = WriteBuffer::from(vec![1, 0, 0, 0, 0, 6]);
        {
            let mut slice = ctxt.slice_mut(1, 4).unwrap();
            I32Be::write(&mut slice, 0x02030405).unwrap();
            assert_eq!(slice.bytes_written(), 4);
        }
        assert_eq!(ctxt.bytes(), &[1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn test_slice_mut_overflow() {
        let mut ctxt = WriteBuffer::from(vec![0; 4]);
        assert!(ctxt.slice_mut(2, 4).is_err());
        let mut slice = ctxt.slice_mut(0, 2).unwrap();
        assert_eq!(U32Be::write(&mut slice, 1u32), Err(WriteError::BadValue));
    }
}
