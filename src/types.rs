//! Value types and the other small immediate-shaped decoders: `Limits`,
//! `BlockType`, and `InitExpression`.

use crate::error::{Error, ErrorKind, Result};
use crate::reader::Reader;

/// A WebAssembly value type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    I32,
    I64,
    F32,
    F64,
    FuncRef,
    ExternRef,
}

impl ValueType {
    pub fn decode(reader: &mut Reader<'_>) -> Result<Self> {
        let offset = reader.absolute_offset();
        match reader.read_u8()? {
            0x7F => Ok(ValueType::I32),
            0x7E => Ok(ValueType::I64),
            0x7D => Ok(ValueType::F32),
            0x7C => Ok(ValueType::F64),
            0x70 => Ok(ValueType::FuncRef),
            0x6F => Ok(ValueType::ExternRef),
            other => Err(Error::new(ErrorKind::InvalidEncoding, offset)
                .with_detail(format!("unknown value type byte {other:#04x}"))),
        }
    }
}

/// The reference-type subset of [`ValueType`], used where only a
/// reference type is syntactically valid (table element type, `ref.null`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefType {
    FuncRef,
    ExternRef,
}

impl RefType {
    pub fn decode(reader: &mut Reader<'_>) -> Result<Self> {
        let offset = reader.absolute_offset();
        match reader.read_u8()? {
            0x70 => Ok(RefType::FuncRef),
            0x6F => Ok(RefType::ExternRef),
            other => Err(Error::new(ErrorKind::InvalidEncoding, offset)
                .with_detail(format!("unknown reference type byte {other:#04x}"))),
        }
    }
}

/// Sentinel byte for an empty [`BlockType`].
const BLOCK_EMPTY: u8 = 0x40;

/// The type produced by a structured control instruction (`block`, `loop`, `if`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockType {
    Empty,
    Value(ValueType),
}

impl BlockType {
    pub fn decode(reader: &mut Reader<'_>) -> Result<Self> {
        if reader.peek_u8()? == BLOCK_EMPTY {
            reader.read_u8()?;
            Ok(BlockType::Empty)
        } else {
            Ok(BlockType::Value(ValueType::decode(reader)?))
        }
    }
}

/// The minimum/maximum pair shared by table and memory types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    pub min: u32,
    pub max: Option<u32>,
}

impl Limits {
    pub fn decode(reader: &mut Reader<'_>) -> Result<Self> {
        let has_max = reader.read_limits_flag()?;
        let min = reader.read_u32()?;
        let max = if has_max { Some(reader.read_u32()?) } else { None };
        Ok(Limits { min, max })
    }
}

/// Opcodes a constant expression may start with.
mod const_op {
    pub const I32_CONST: u8 = 0x41;
    pub const I64_CONST: u8 = 0x42;
    pub const F32_CONST: u8 = 0x43;
    pub const F64_CONST: u8 = 0x44;
    pub const GLOBAL_GET: u8 = 0x23;
}

pub const END_OPCODE: u8 = 0x0B;

/// A constant-producing expression: exactly one value-producing opcode
/// followed by `end`. Used for global initializers and the offset of
/// `data`/`element` segments.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InitExpression {
    I32Const(i32),
    I64Const(i64),
    F32Const(u32),
    F64Const(u64),
    GlobalGet(u32),
}

impl InitExpression {
    pub fn decode(reader: &mut Reader<'_>) -> Result<Self> {
        let offset = reader.absolute_offset();
        let opcode = reader.read_u8()?;
        let expr = match opcode {
            const_op::I32_CONST => InitExpression::I32Const(reader.read_i32()?),
            const_op::I64_CONST => InitExpression::I64Const(reader.read_i64()?),
            const_op::F32_CONST => InitExpression::F32Const(reader.read_f32_bits()?),
            const_op::F64_CONST => InitExpression::F64Const(reader.read_f64_bits()?),
            const_op::GLOBAL_GET => InitExpression::GlobalGet(reader.read_u32()?),
            other => {
                return Err(Error::new(ErrorKind::InvalidEncoding, offset)
                    .with_detail(format!("opcode {other:#04x} cannot start a constant expression")))
            }
        };
        let end_offset = reader.absolute_offset();
        if reader.read_u8()? != END_OPCODE {
            return Err(Error::new(ErrorKind::MissingEndForExpression, end_offset));
        }
        Ok(expr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_type_roundtrip() {
        let bytes = [0x7F, 0x7E, 0x7D, 0x7C, 0x70, 0x6F];
        let mut r = Reader::new(&bytes, 0);
        assert_eq!(ValueType::decode(&mut r).unwrap(), ValueType::I32);
        assert_eq!(ValueType::decode(&mut r).unwrap(), ValueType::I64);
        assert_eq!(ValueType::decode(&mut r).unwrap(), ValueType::F32);
        assert_eq!(ValueType::decode(&mut r).unwrap(), ValueType::F64);
        assert_eq!(ValueType::decode(&mut r).unwrap(), ValueType::FuncRef);
        assert_eq!(ValueType::decode(&mut r).unwrap(), ValueType::ExternRef);
    }

    #[test]
    fn value_type_invalid() {
        let bytes = [0x01];
        let mut r = Reader::new(&bytes, 0);
        assert_eq!(*ValueType::decode(&mut r).unwrap_err().kind(), ErrorKind::InvalidEncoding);
    }

    #[test]
    fn block_type_empty_and_value() {
        let bytes = [0x40, 0x7F];
        let mut r = Reader::new(&bytes, 0);
        assert_eq!(BlockType::decode(&mut r).unwrap(), BlockType::Empty);
        assert_eq!(BlockType::decode(&mut r).unwrap(), BlockType::Value(ValueType::I32));
    }

    #[test]
    fn limits_no_max() {
        let bytes = [0x00, 0x01];
        let mut r = Reader::new(&bytes, 0);
        let limits = Limits::decode(&mut r).unwrap();
        assert_eq!(limits, Limits { min: 1, max: None });
    }

    #[test]
    fn limits_with_max() {
        let bytes = [0x01, 0x01, 0x02];
        let mut r = Reader::new(&bytes, 0);
        let limits = Limits::decode(&mut r).unwrap();
        assert_eq!(limits, Limits { min: 1, max: Some(2) });
    }

    #[test]
    fn init_expression_i32_const() {
        let bytes = [0x41, 0x2A, 0x0B]; // i32.const 42, end
        let mut r = Reader::new(&bytes, 0);
        assert_eq!(InitExpression::decode(&mut r).unwrap(), InitExpression::I32Const(42));
    }

    #[test]
    fn init_expression_missing_end() {
        let bytes = [0x41, 0x2A, 0x01];
        let mut r = Reader::new(&bytes, 0);
        assert_eq!(
            *InitExpression::decode(&mut r).unwrap_err().kind(),
            ErrorKind::MissingEndForExpression
        );
    }

    #[test]
    fn init_expression_invalid_opcode() {
        let bytes = [0x00];
        let mut r = Reader::new(&bytes, 0);
        assert_eq!(*InitExpression::decode(&mut r).unwrap_err().kind(), ErrorKind::InvalidEncoding);
    }
}
