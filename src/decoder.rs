//! The module driver: envelope, section dispatch loop, and the public
//! `parse`/`parse_with_config` entry points.

use std::io::Read;

use bumpalo::Bump;
use ouroboros::self_referencing;

use crate::error::{Error, ErrorKind, Result};
use crate::module::{
    Code, Custom, Data, Element, Export, FuncType, Global, Import, Module, Table,
};
use crate::reader::Reader;
use crate::sections::{self, id, ElementPolicy};

const WASM_MAGIC: [u8; 4] = *b"\0asm";
const SUPPORTED_VERSION: u32 = 1;

/// Caller-tunable decoding policy: whether to accept post-MVP
/// element-segment kinds, and whether to cap a single section's
/// declared length defensively. Everything else about the decode is
/// fixed and has no knob.
#[derive(Debug, Clone, Copy)]
pub struct DecodeConfig {
    /// Accept reference-types-proposal element segment kinds (`0x01`-`0x07`)
    /// instead of rejecting them as [`crate::error::ErrorKind::Unsupported`].
    pub accept_post_mvp_elements: bool,
    /// Reject any section whose declared length exceeds this many bytes,
    /// before attempting to read its payload. `None` means no extra cap
    /// beyond "fits in the remaining input".
    pub max_section_length: Option<usize>,
}

impl Default for DecodeConfig {
    fn default() -> Self {
        Self { accept_post_mvp_elements: false, max_section_length: None }
    }
}

struct ModuleBuilder<'a> {
    version: u32,
    types: &'a [FuncType<'a>],
    imports: &'a [Import<'a>],
    functions: &'a [u32],
    tables: &'a [Table],
    memories: &'a [crate::module::Memory],
    globals: &'a [Global],
    exports: &'a [Export<'a>],
    start: Option<u32>,
    elements: &'a [Element<'a>],
    code: &'a [Code<'a>],
    data: &'a [Data<'a>],
    custom_sections: bumpalo::collections::Vec<'a, Custom<'a>>,
}

impl<'a> ModuleBuilder<'a> {
    fn new(arena: &'a Bump) -> Self {
        Self {
            version: 0,
            types: &[],
            imports: &[],
            functions: &[],
            tables: &[],
            memories: &[],
            globals: &[],
            exports: &[],
            start: None,
            elements: &[],
            code: &[],
            data: &[],
            custom_sections: bumpalo::collections::Vec::new_in(arena),
        }
    }

    fn build(self) -> Module<'a> {
        Module {
            version: self.version,
            types: self.types,
            imports: self.imports,
            functions: self.functions,
            tables: self.tables,
            memories: self.memories,
            globals: self.globals,
            exports: self.exports,
            start: self.start,
            elements: self.elements,
            code: self.code,
            data: self.data,
            custom_sections: self.custom_sections.into_bump_slice(),
        }
    }
}

fn dispatch_section<'a>(
    builder: &mut ModuleBuilder<'a>,
    section_id: u8,
    reader: &mut Reader<'a>,
    arena: &'a Bump,
    config: &DecodeConfig,
) -> Result<()> {
    match section_id {
        id::CUSTOM => builder.custom_sections.push(sections::parse_custom_section(reader, arena)?),
        id::TYPE => builder.types = sections::parse_type_section(reader, arena)?,
        id::IMPORT => builder.imports = sections::parse_import_section(reader, arena)?,
        id::FUNCTION => builder.functions = sections::parse_function_section(reader, arena)?,
        id::TABLE => builder.tables = sections::parse_table_section(reader, arena)?,
        id::MEMORY => builder.memories = sections::parse_memory_section(reader, arena)?,
        id::GLOBAL => builder.globals = sections::parse_global_section(reader, arena)?,
        id::EXPORT => builder.exports = sections::parse_export_section(reader, arena)?,
        id::START => builder.start = Some(sections::parse_start_section(reader)?),
        id::ELEMENT => {
            let policy = ElementPolicy { accept_post_mvp: config.accept_post_mvp_elements };
            builder.elements = sections::parse_element_section(reader, arena, policy)?;
        }
        id::CODE => builder.code = sections::parse_code_section(reader, arena)?,
        id::DATA => builder.data = sections::parse_data_section(reader, arena)?,
        other => {
            #[cfg(feature = "log")]
            log::warn!("skipping unknown or unsupported section id {other:#04x}");
            reader.skip_to_end();
        }
    }
    Ok(())
}

fn decode_module<'a>(bytes: &'a [u8], arena: &'a Bump, config: &DecodeConfig) -> Result<Module<'a>> {
    let mut reader = Reader::new(bytes, 0);

    let magic = reader.read_bytes(4)?;
    if magic != WASM_MAGIC {
        return Err(Error::new(ErrorKind::InvalidMagicByte, 0)
            .with_detail(format!("expected {WASM_MAGIC:02x?}, found {magic:02x?}")));
    }
    let version_offset = reader.absolute_offset();
    let version = reader.read_u32_le()?;
    if version != SUPPORTED_VERSION {
        return Err(Error::new(ErrorKind::InvalidWasmVersion, version_offset)
            .with_detail(format!("expected version {SUPPORTED_VERSION}, found {version}")));
    }

    let mut builder = ModuleBuilder::new(arena);
    builder.version = version;

    loop {
        if reader.is_empty() {
            break;
        }
        let section_offset = reader.absolute_offset();
        let section_id = reader.read_u8()?;
        let length = reader.read_u32()? as usize;
        if let Some(max) = config.max_section_length {
            if length > max {
                return Err(Error::new(ErrorKind::MalformedSection, section_offset)
                    .with_section(section_id)
                    .with_detail(format!("section length {length} exceeds configured max {max}")));
            }
        }
        let mut section_reader =
            reader.sub_reader(length).map_err(|e| e.with_section(section_id))?;
        dispatch_section(&mut builder, section_id, &mut section_reader, arena, config)
            .map_err(|e| e.with_section(section_id))?;
        section_reader.assert_end().map_err(|e| e.with_section(section_id))?;
    }

    Ok(builder.build())
}

/// Owns the arena every decoded `Module` field is allocated from,
/// together with the `Module` itself. Dropping this value releases the
/// arena and, with it, everything the decoder allocated in one step —
/// the Rust expression of "the `Result` exposes an opaque arena handle
/// with a release operation": in safe Rust the release operation *is*
/// the destructor, there is nothing further to call.
#[self_referencing]
pub struct DecodeResult {
    arena: Bump,
    #[borrows(arena)]
    #[covariant]
    module: Module<'this>,
}

impl DecodeResult {
    /// The decoded module, borrowed for as long as this `DecodeResult` lives.
    pub fn module(&self) -> &Module<'_> {
        self.borrow_module()
    }
}

impl std::fmt::Debug for DecodeResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecodeResult").field("module", self.module()).finish()
    }
}

fn read_all(mut reader: impl Read) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    reader.read_to_end(&mut buf).map_err(|e| Error::io(0, e))?;
    Ok(buf)
}

/// Decodes a complete WebAssembly module from `reader` using the default
/// [`DecodeConfig`]. See [`parse_with_config`] for the full contract.
pub fn parse(reader: impl Read) -> Result<DecodeResult> {
    parse_with_config(reader, DecodeConfig::default())
}

/// Decodes a complete WebAssembly module from `reader`.
///
/// The entire input is read before decoding begins (no partial `Module`
/// is ever returned). On any error, nothing is retained: the arena that
/// would have backed the `Module` is dropped along with the failed
/// attempt, and the caller gets `Err` with enough context (section ID,
/// byte offset) to locate the failure.
pub fn parse_with_config(reader: impl Read, config: DecodeConfig) -> Result<DecodeResult> {
    let bytes = read_all(reader)?;
    DecodeResult::try_new(Bump::new(), |arena| {
        let owned: &[u8] = arena.alloc_slice_copy(&bytes);
        decode_module(owned, arena, &config)
    })
}
