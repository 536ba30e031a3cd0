//! A binary decoder for WebAssembly modules.
//!
//! This crate turns a byte stream into a [`module::Module`]: every type,
//! import, table/memory/global, export, element and data segment, and
//! every function body's instruction stream, fully decoded and laid out
//! in one arena owned by the returned [`decoder::DecodeResult`].
//!
//! What this crate does *not* do: validate the module (type-check
//! instructions, check index bounds, enforce the stack-effect rules),
//! execute it, parse the text format, or re-encode a `Module` back to
//! bytes. It decodes the binary format, nothing more.
//!
//! ```no_run
//! let bytes = std::fs::read("add.wasm").unwrap();
//! let decoded = wasm_decoder::parse(bytes.as_slice()).unwrap();
//! for export in decoded.module().exports {
//!     println!("{} -> {:?}", export.name, export.kind);
//! }
//! ```

mod decoder;
mod error;
mod instructions;
mod module;
mod reader;
mod sections;
mod types;

pub use decoder::{parse, parse_with_config, DecodeConfig, DecodeResult};
pub use error::{Error, ErrorKind, Result};
pub use instructions::{Immediate, Instruction};
pub use module::{
    Code, Custom, Data, Element, Export, ExportKind, FuncIdx, FuncType, Global, Import,
    ImportKind, Local, Memory, Module, Table, TypeIdx,
};
pub use reader::Reader;
pub use sections::ElementPolicy;
pub use types::{BlockType, InitExpression, Limits, RefType, ValueType};
