//! Shared test code.

include!("../tests/common.rs");

pub(crate) mod writer {
    //! Testing utilities.

    // The writer module is derived from ttf-parser, licenced under Apache-2.0.
    // https://github.com/RazrFalcon/ttf-parser/blob/439aaaebd50eb8aed66302e3c1b51fae047f85b2/src/writer.rs

    use crate::cff::Operator;

    #[allow(missing_debug_implementations)]
    #[derive(Clone, Copy)]
    pub enum CffType {
        /// An integer operand in its shortest encoding.
        Int(i32),
        /// An integer operand always using the 5 byte encoding.
        LongInt(i32),
        /// A DICT operator.
        Op(Operator),
    }

    pub fn write(values: &[CffType]) -> Vec<u8> {
        let mut data = Vec::with_capacity(256);
        for v in values {
            write_type(*v, &mut data);
        }

        data
    }

    pub fn write_type(value: CffType, data: &mut Vec<u8>) {
        match value {
            CffType::Int(n) => match n {
                -107..=107 => {
                    data.push((n as i16 + 139) as u8);
                }
                108..=1131 => {
                    let n = n - 108;
                    data.push(((n >> 8) + 247) as u8);
                    data.push((n & 0xFF) as u8);
                }
                -1131..=-108 => {
                    let n = -n - 108;
                    data.push(((n >> 8) + 251) as u8);
                    data.push((n & 0xFF) as u8);
                }
                -32768..=32767 => {
                    data.push(28);
                    data.extend_from_slice(&i16::to_be_bytes(n as i16));
                }
                _ => write_type(CffType::LongInt(n), data),
            },
            CffType::LongInt(n) => {
                data.push(29);
                data.extend_from_slice(&i32::to_be_bytes(n));
            }
            CffType::Op(op) => {
                let value = op as u16;
                if value > 0xFF {
                    data.extend_from_slice(&value.to_be_bytes());
                } else {
                    data.push(value as u8);
                }
            }
        }
    }

    /// Build an INDEX holding `objects`, using 1 byte offsets.
    pub fn index(objects: &[&[u8]]) -> Vec<u8> {
        let mut data = Vec::new();
        data.extend_from_slice(&(objects.len() as u16).to_be_bytes());
        if objects.is_empty() {
            return data;
        }
        data.push(1);
        let mut offset = 1;
        data.push(offset);
        for object in objects {
            offset += object.len() as u8;
            data.push(offset);
        }
        for object in objects {
            data.extend_from_slice(object);
        }
        data
    }
}
