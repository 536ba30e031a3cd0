//! Error taxonomy for the binary decoder.
//!
//! `ErrorKind` enumerates every way decoding can fail; `Error` wraps a
//! kind with the section/byte-offset context needed to locate the
//! failure. The kind set is a plain closed enum rather than a boxed,
//! extensible category/code pair, since the decoder's failure modes are
//! known up front.

use core::fmt;

/// Every way decoding a module can fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The four-byte magic at the start of the module was not `\0asm`.
    InvalidMagicByte,
    /// The four-byte version did not match a supported version.
    InvalidWasmVersion,
    /// A type-section entry was missing the `0x60` functype discriminator.
    ExpectedFuncType,
    /// An `InitExpression` was not terminated by `end`.
    MissingEndForExpression,
    /// A function body was not terminated by `end`.
    MissingEndForBody,
    /// A section's declared length disagreed with the bytes its decoder consumed.
    MalformedSection,
    /// A closed enum (e.g. `ValueType`) saw an unknown discriminant.
    InvalidEncoding,
    /// A LEB128 integer exceeded its target width.
    Overflow,
    /// The input ended where more bytes were required.
    EndOfStream,
    /// Arena allocation failed.
    OutOfMemory,
    /// The underlying reader reported a failure.
    Io,
    /// A well-formed but unsupported construct (e.g. a post-MVP element kind).
    Unsupported,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            ErrorKind::InvalidMagicByte => "invalid magic bytes",
            ErrorKind::InvalidWasmVersion => "unsupported wasm version",
            ErrorKind::ExpectedFuncType => "expected functype discriminator (0x60)",
            ErrorKind::MissingEndForExpression => "init expression missing terminating `end`",
            ErrorKind::MissingEndForBody => "function body missing terminating `end`",
            ErrorKind::MalformedSection => "section length did not match bytes consumed",
            ErrorKind::InvalidEncoding => "invalid encoding for a closed enum",
            ErrorKind::Overflow => "LEB128 integer overflowed its target width",
            ErrorKind::EndOfStream => "unexpected end of input",
            ErrorKind::OutOfMemory => "arena allocation failed",
            ErrorKind::Io => "I/O error",
            ErrorKind::Unsupported => "unsupported but well-formed construct",
        };
        f.write_str(msg)
    }
}

/// A decoding failure, with enough context to locate it in the input.
#[derive(Debug, Clone)]
pub struct Error {
    kind: ErrorKind,
    /// Section ID the failure occurred in, if known.
    section: Option<u8>,
    /// Absolute byte offset into the module at the point of failure.
    offset: usize,
    /// Human-readable detail, e.g. the unexpected byte value seen.
    detail: Option<String>,
    io: Option<std::io::Error>,
}

impl Error {
    pub(crate) fn new(kind: ErrorKind, offset: usize) -> Self {
        Self { kind, section: None, offset, detail: None, io: None }
    }

    pub(crate) fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// Attaches the section ID the error occurred in, unless one is already set.
    pub(crate) fn with_section(mut self, id: u8) -> Self {
        if self.section.is_none() {
            self.section = Some(id);
        }
        self
    }

    pub(crate) fn io(offset: usize, source: std::io::Error) -> Self {
        Self { kind: ErrorKind::Io, section: None, offset, detail: None, io: Some(source) }
    }

    /// The kind of failure.
    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    /// The section ID the failure occurred in, if the driver had dispatched
    /// to a section by the time the error was raised.
    pub fn section(&self) -> Option<u8> {
        self.section
    }

    /// Absolute byte offset into the module at the point of failure.
    pub fn offset(&self) -> usize {
        self.offset
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at byte {}", self.kind, self.offset)?;
        if let Some(section) = self.section {
            write!(f, " (section id {section:#04x})")?;
        }
        if let Some(detail) = &self.detail {
            write!(f, ": {detail}")?;
        }
        Ok(())
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.io.as_ref().map(|e| e as &(dyn std::error::Error + 'static))
    }
}

pub type Result<T> = core::result::Result<T, Error>;
