//! Instruction decoding: one primary opcode, its optional secondary
//! (`0xFC`-prefixed) opcode, and its immediate.
//!
//! The immediate is a tagged union (see [`Immediate`] below) over every
//! shape an opcode's operand can take, rather than a separate enum
//! variant per opcode. Opcode values follow the core WebAssembly binary
//! encoding.

use bumpalo::Bump;

use crate::error::{Error, ErrorKind, Result};
use crate::reader::Reader;
use crate::types::{BlockType, RefType, ValueType, END_OPCODE};

/// Opcode byte constants referenced by the immediate-selection table.
pub mod op {
    pub const BLOCK: u8 = 0x02;
    pub const LOOP: u8 = 0x03;
    pub const IF: u8 = 0x04;
    pub const BR: u8 = 0x0C;
    pub const BR_IF: u8 = 0x0D;
    pub const BR_TABLE: u8 = 0x0E;
    pub const CALL: u8 = 0x10;
    pub const CALL_INDIRECT: u8 = 0x11;
    pub const SELECT_WITH_TYPES: u8 = 0x1C;
    pub const LOCAL_GET: u8 = 0x20;
    pub const LOCAL_SET: u8 = 0x21;
    pub const LOCAL_TEE: u8 = 0x22;
    pub const GLOBAL_GET: u8 = 0x23;
    pub const GLOBAL_SET: u8 = 0x24;
    pub const TABLE_GET: u8 = 0x25;
    pub const TABLE_SET: u8 = 0x26;
    pub const MEM_LOAD_STORE_FIRST: u8 = 0x28;
    pub const MEM_LOAD_STORE_LAST: u8 = 0x3E;
    pub const MEMORY_SIZE: u8 = 0x3F;
    pub const MEMORY_GROW: u8 = 0x40;
    pub const I32_CONST: u8 = 0x41;
    pub const I64_CONST: u8 = 0x42;
    pub const F32_CONST: u8 = 0x43;
    pub const F64_CONST: u8 = 0x44;
    pub const REF_NULL: u8 = 0xD0;
    pub const REF_FUNC: u8 = 0xD2;
    pub const SECONDARY_PREFIX: u8 = 0xFC;
}

/// Secondary (`0xFC`-prefixed) opcode constants.
pub mod secondary_op {
    pub const MEMORY_INIT: u32 = 8;
    pub const DATA_DROP: u32 = 9;
    pub const MEMORY_COPY: u32 = 10;
    pub const MEMORY_FILL: u32 = 11;
    pub const TABLE_INIT: u32 = 12;
    pub const ELEM_DROP: u32 = 13;
    pub const TABLE_COPY: u32 = 14;
    pub const TABLE_GROW: u32 = 15;
    pub const TABLE_SIZE: u32 = 16;
    pub const TABLE_FILL: u32 = 17;
}

/// The immediate operand of an instruction. Exactly one variant is
/// populated per §4.5's immediate-selection table; `None` covers every
/// opcode with no immediate at all.
#[derive(Debug, Clone, PartialEq)]
pub enum Immediate<'a> {
    None,
    U32(u32),
    I32(i32),
    I64(i64),
    F32Bits(u32),
    F64Bits(u64),
    BlockType(BlockType),
    RefType(RefType),
    /// The generic two-`u32` immediate shared by `call_indirect`, memory
    /// load/store `{align, offset}` memargs, and the bulk-memory/table
    /// secondary ops that take a pair of indices.
    Pair { x: u32, y: u32 },
    /// `br_table`'s label list with the default target as the last entry.
    BrTable(&'a [u32]),
    /// `select_with_types`'s explicit result type list.
    SelectTypes(&'a [ValueType]),
}

/// One decoded instruction: opcode, optional secondary opcode, immediate.
#[derive(Debug, Clone, PartialEq)]
pub struct Instruction<'a> {
    pub opcode: u8,
    pub secondary: Option<u32>,
    pub immediate: Immediate<'a>,
}

impl<'a> Instruction<'a> {
    /// A human-readable mnemonic, best-effort, for diagnostics.
    pub fn mnemonic(&self) -> &'static str {
        match (self.opcode, self.secondary) {
            (0x00, _) => "unreachable",
            (0x01, _) => "nop",
            (op::BLOCK, _) => "block",
            (op::LOOP, _) => "loop",
            (op::IF, _) => "if",
            (0x05, _) => "else",
            (END_OPCODE, _) => "end",
            (op::BR, _) => "br",
            (op::BR_IF, _) => "br_if",
            (op::BR_TABLE, _) => "br_table",
            (0x0F, _) => "return",
            (op::CALL, _) => "call",
            (op::CALL_INDIRECT, _) => "call_indirect",
            (0x1A, _) => "drop",
            (0x1B, _) => "select",
            (op::SELECT_WITH_TYPES, _) => "select_with_types",
            (op::LOCAL_GET, _) => "local.get",
            (op::LOCAL_SET, _) => "local.set",
            (op::LOCAL_TEE, _) => "local.tee",
            (op::GLOBAL_GET, _) => "global.get",
            (op::GLOBAL_SET, _) => "global.set",
            (op::TABLE_GET, _) => "table.get",
            (op::TABLE_SET, _) => "table.set",
            (op::MEMORY_SIZE, _) => "memory.size",
            (op::MEMORY_GROW, _) => "memory.grow",
            (op::I32_CONST, _) => "i32.const",
            (op::I64_CONST, _) => "i64.const",
            (op::F32_CONST, _) => "f32.const",
            (op::F64_CONST, _) => "f64.const",
            (op::REF_NULL, _) => "ref.null",
            (0xD1, _) => "ref.is_null",
            (op::REF_FUNC, _) => "ref.func",
            (op::MEM_LOAD_STORE_FIRST..=op::MEM_LOAD_STORE_LAST, _) => "mem.load_or_store",
            (op::SECONDARY_PREFIX, Some(secondary_op::MEMORY_INIT)) => "memory.init",
            (op::SECONDARY_PREFIX, Some(secondary_op::DATA_DROP)) => "data.drop",
            (op::SECONDARY_PREFIX, Some(secondary_op::MEMORY_COPY)) => "memory.copy",
            (op::SECONDARY_PREFIX, Some(secondary_op::MEMORY_FILL)) => "memory.fill",
            (op::SECONDARY_PREFIX, Some(secondary_op::TABLE_INIT)) => "table.init",
            (op::SECONDARY_PREFIX, Some(secondary_op::ELEM_DROP)) => "elem.drop",
            (op::SECONDARY_PREFIX, Some(secondary_op::TABLE_COPY)) => "table.copy",
            (op::SECONDARY_PREFIX, Some(secondary_op::TABLE_GROW)) => "table.grow",
            (op::SECONDARY_PREFIX, Some(secondary_op::TABLE_SIZE)) => "table.size",
            (op::SECONDARY_PREFIX, Some(secondary_op::TABLE_FILL)) => "table.fill",
            (op::SECONDARY_PREFIX, Some(0..=7)) => "trunc_sat",
            (op::SECONDARY_PREFIX, _) => "unknown secondary",
            _ => "arithmetic/comparison/other zero-immediate op",
        }
    }
}

fn decode_memarg<'a>(reader: &mut Reader<'a>) -> Result<Immediate<'a>> {
    let align_exponent = reader.read_u32()?;
    let offset = reader.read_u32()?;
    Ok(Immediate::Pair { x: align_exponent, y: offset })
}

fn decode_secondary<'a>(reader: &mut Reader<'a>) -> Result<(u32, Immediate<'a>)> {
    let offset = reader.absolute_offset();
    let secondary = reader.read_u32()?;
    let immediate = match secondary {
        0..=7 => Immediate::None,
        secondary_op::MEMORY_INIT
        | secondary_op::DATA_DROP
        | secondary_op::MEMORY_COPY
        | secondary_op::MEMORY_FILL
        | secondary_op::TABLE_INIT
        | secondary_op::ELEM_DROP
        | secondary_op::TABLE_COPY => {
            // Some of these only have one logical index plus a reserved
            // zero byte in the real encoding; reading two ULEB128s
            // uniformly (a reserved `0x00` is itself a valid one-byte
            // ULEB128) preserves the exact bytes either way.
            let x = reader.read_u32()?;
            let y = reader.read_u32()?;
            Immediate::Pair { x, y }
        }
        secondary_op::TABLE_GROW | secondary_op::TABLE_SIZE | secondary_op::TABLE_FILL => {
            Immediate::U32(reader.read_u32()?)
        }
        other => {
            return Err(Error::new(ErrorKind::InvalidEncoding, offset)
                .with_detail(format!("unknown secondary opcode {other}")))
        }
    };
    Ok((secondary, immediate))
}

/// Decodes one instruction (the opcode byte plus whatever immediate it carries).
pub fn decode_instruction<'a>(reader: &mut Reader<'a>, arena: &'a Bump) -> Result<Instruction<'a>> {
    let opcode = reader.read_u8()?;
    let mut secondary = None;
    let immediate = match opcode {
        op::BLOCK | op::LOOP | op::IF => Immediate::BlockType(BlockType::decode(reader)?),
        op::BR | op::BR_IF | op::CALL | op::REF_FUNC | op::LOCAL_GET | op::LOCAL_SET
        | op::LOCAL_TEE | op::GLOBAL_GET | op::GLOBAL_SET | op::TABLE_GET | op::TABLE_SET
        | op::MEMORY_SIZE | op::MEMORY_GROW => Immediate::U32(reader.read_u32()?),
        op::CALL_INDIRECT => {
            let type_idx = reader.read_u32()?;
            let table_idx = reader.read_u32()?;
            Immediate::Pair { x: type_idx, y: table_idx }
        }
        op::MEM_LOAD_STORE_FIRST..=op::MEM_LOAD_STORE_LAST => decode_memarg(reader)?,
        op::BR_TABLE => {
            let count = reader.read_u32()?;
            // `count` is untrusted; each of the `count + 1` targets needs
            // at least one byte, so cap the reservation by what's left.
            let capacity = (count as usize).min(reader.remaining()).saturating_add(1);
            let mut targets = bumpalo::collections::Vec::with_capacity_in(capacity, arena);
            for _ in 0..=count {
                targets.push(reader.read_u32()?);
            }
            Immediate::BrTable(targets.into_bump_slice())
        }
        op::REF_NULL => Immediate::RefType(RefType::decode(reader)?),
        op::SELECT_WITH_TYPES => {
            let types = reader.read_vec(arena, |r, _| ValueType::decode(r))?;
            Immediate::SelectTypes(types)
        }
        op::SECONDARY_PREFIX => {
            let (code, immediate) = decode_secondary(reader)?;
            secondary = Some(code);
            immediate
        }
        op::I32_CONST => Immediate::I32(reader.read_i32()?),
        op::I64_CONST => Immediate::I64(reader.read_i64()?),
        op::F32_CONST => Immediate::F32Bits(reader.read_f32_bits()?),
        op::F64_CONST => Immediate::F64Bits(reader.read_f64_bits()?),
        _ => Immediate::None,
    };
    let instruction = Instruction { opcode, secondary, immediate };
    #[cfg(feature = "log")]
    log::trace!("decoded instruction {:#04x} ({})", instruction.opcode, instruction.mnemonic());
    Ok(instruction)
}

/// Decodes instructions from `reader` until it is exhausted; the last
/// instruction decoded must be `end`, otherwise `MissingEndForBody`.
pub fn decode_body<'a>(reader: &mut Reader<'a>, arena: &'a Bump) -> Result<&'a [Instruction<'a>]> {
    let mut instructions = bumpalo::collections::Vec::new_in(arena);
    let mut saw_end = false;
    while !reader.is_empty() {
        let instruction = decode_instruction(reader, arena)?;
        saw_end = instruction.opcode == END_OPCODE;
        instructions.push(instruction);
    }
    if !saw_end {
        return Err(Error::new(ErrorKind::MissingEndForBody, reader.absolute_offset()));
    }
    Ok(instructions.into_bump_slice())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_one<'a>(bytes: &'a [u8], arena: &'a Bump) -> Instruction<'a> {
        let mut r = Reader::new(bytes, 0);
        decode_instruction(&mut r, arena).unwrap()
    }

    #[test]
    fn zero_immediate() {
        let arena = Bump::new();
        let instr = decode_one(&[0x00], &arena);
        assert_eq!(instr.immediate, Immediate::None);
        assert_eq!(instr.mnemonic(), "unreachable");
    }

    #[test]
    fn index_op() {
        let arena = Bump::new();
        let instr = decode_one(&[op::LOCAL_GET, 0x03], &arena);
        assert_eq!(instr.immediate, Immediate::U32(3));
    }

    #[test]
    fn memarg() {
        let arena = Bump::new();
        let instr = decode_one(&[0x28, 0x02, 0x04], &arena); // i32.load align=2 offset=4
        assert_eq!(instr.immediate, Immediate::Pair { x: 2, y: 4 });
    }

    #[test]
    fn call_indirect() {
        let arena = Bump::new();
        let instr = decode_one(&[op::CALL_INDIRECT, 0x01, 0x00], &arena);
        assert_eq!(instr.immediate, Immediate::Pair { x: 1, y: 0 });
    }

    #[test]
    fn br_table() {
        let arena = Bump::new();
        // 2 labels (0, 1) + default (2)
        let instr = decode_one(&[op::BR_TABLE, 0x02, 0x00, 0x01, 0x02], &arena);
        match instr.immediate {
            Immediate::BrTable(targets) => assert_eq!(targets, &[0, 1, 2]),
            other => panic!("unexpected immediate: {other:?}"),
        }
    }

    #[test]
    fn select_with_types_empty_list_accepted() {
        let arena = Bump::new();
        let instr = decode_one(&[op::SELECT_WITH_TYPES, 0x00], &arena);
        match instr.immediate {
            Immediate::SelectTypes(types) => assert!(types.is_empty()),
            other => panic!("unexpected immediate: {other:?}"),
        }
    }

    #[test]
    fn ref_null() {
        let arena = Bump::new();
        let instr = decode_one(&[op::REF_NULL, 0x70], &arena);
        assert_eq!(instr.immediate, Immediate::RefType(RefType::FuncRef));
    }

    #[test]
    fn secondary_trunc_sat() {
        let arena = Bump::new();
        let instr = decode_one(&[op::SECONDARY_PREFIX, 0x00], &arena);
        assert_eq!(instr.secondary, Some(0));
        assert_eq!(instr.immediate, Immediate::None);
    }

    #[test]
    fn secondary_memory_copy_pair() {
        let arena = Bump::new();
        let instr = decode_one(&[op::SECONDARY_PREFIX, 0x0A, 0x00, 0x00], &arena);
        assert_eq!(instr.secondary, Some(secondary_op::MEMORY_COPY));
        assert_eq!(instr.immediate, Immediate::Pair { x: 0, y: 0 });
    }

    #[test]
    fn secondary_table_grow_single_u32() {
        let arena = Bump::new();
        let instr = decode_one(&[op::SECONDARY_PREFIX, 0x0F, 0x03], &arena);
        assert_eq!(instr.secondary, Some(secondary_op::TABLE_GROW));
        assert_eq!(instr.immediate, Immediate::U32(3));
    }

    #[test]
    fn body_terminated_by_end() {
        let arena = Bump::new();
        let bytes = [0x01, 0x01, END_OPCODE]; // nop, nop, end
        let mut r = Reader::new(&bytes, 0);
        let body = decode_body(&mut r, &arena).unwrap();
        assert_eq!(body.len(), 3);
        assert_eq!(body.last().unwrap().opcode, END_OPCODE);
    }

    #[test]
    fn body_missing_end_fails() {
        let arena = Bump::new();
        let bytes = [0x01, 0x01];
        let mut r = Reader::new(&bytes, 0);
        assert_eq!(*decode_body(&mut r, &arena).unwrap_err().kind(), ErrorKind::MissingEndForBody);
    }
}
