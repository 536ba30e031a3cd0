//! The decoded module: types, imports, tables/memories/globals,
//! exports, elements, code, data, and custom sections.

use crate::instructions::Instruction;
use crate::types::{InitExpression, Limits, RefType, ValueType};

pub type TypeIdx = u32;
pub type FuncIdx = u32;

/// A function signature: ordered parameters, ordered results.
#[derive(Debug, Clone, PartialEq)]
pub struct FuncType<'a> {
    pub params: &'a [ValueType],
    pub results: &'a [ValueType],
}

/// The kind-specific payload of an [`Import`].
#[derive(Debug, Clone, PartialEq)]
pub enum ImportKind {
    Function(TypeIdx),
    Table { reftype: RefType, limits: Limits },
    Memory { limits: Limits },
    Global { valtype: ValueType, mutable: bool },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Import<'a> {
    pub module: &'a str,
    pub name: &'a str,
    pub kind: ImportKind,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Table {
    pub reftype: RefType,
    pub limits: Limits,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Memory {
    pub limits: Limits,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Global {
    pub valtype: ValueType,
    pub mutable: bool,
    pub init: InitExpression,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportKind {
    Function,
    Table,
    Memory,
    Global,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Export<'a> {
    pub name: &'a str,
    pub kind: ExportKind,
    pub index: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Element<'a> {
    pub table_index: u32,
    pub offset: InitExpression,
    pub func_indices: &'a [FuncIdx],
}

/// One run-length group of local-variable declarations in a function body.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Local {
    pub count: u32,
    pub valtype: ValueType,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Code<'a> {
    pub locals: &'a [Local],
    pub body: &'a [Instruction<'a>],
}

#[derive(Debug, Clone, PartialEq)]
pub struct Data<'a> {
    pub memory_index: u32,
    pub offset: InitExpression,
    pub bytes: &'a [u8],
}

#[derive(Debug, Clone, PartialEq)]
pub struct Custom<'a> {
    pub name: &'a str,
    pub data: &'a [u8],
}

/// A fully decoded WebAssembly module. Every slice here is allocated
/// out of the arena owned by the [`crate::DecodeResult`] that produced
/// this value, and is valid for exactly as long as that arena is.
#[derive(Debug, Clone, PartialEq)]
pub struct Module<'a> {
    /// Raw little-endian version field from the module envelope, kept
    /// for diagnostics.
    pub version: u32,
    pub types: &'a [FuncType<'a>],
    pub imports: &'a [Import<'a>],
    pub functions: &'a [TypeIdx],
    pub tables: &'a [Table],
    pub memories: &'a [Memory],
    pub globals: &'a [Global],
    pub exports: &'a [Export<'a>],
    pub start: Option<FuncIdx>,
    pub elements: &'a [Element<'a>],
    pub code: &'a [Code<'a>],
    pub data: &'a [Data<'a>],
    pub custom_sections: &'a [Custom<'a>],
}
