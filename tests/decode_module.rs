//! End-to-end decoding tests against WAT-compiled modules.

use wasm_decoder::{parse, parse_with_config, DecodeConfig, ErrorKind, ExportKind};

#[test]
fn add_two_i32_params() {
    let bytes = wat::parse_str(
        r#"
        (module
          (func (export "addTwo") (param i32 i32) (result i32)
            local.get 0
            local.get 1
            i32.add))
        "#,
    )
    .unwrap();

    let decoded = parse(bytes.as_slice()).unwrap();
    let module = decoded.module();

    assert_eq!(module.functions.len(), 1);
    assert_eq!(module.code.len(), 1);
    assert_eq!(module.exports.len(), 1);
    assert_eq!(module.exports[0].name, "addTwo");
    assert_eq!(module.exports[0].kind, ExportKind::Function);
}

#[test]
fn call_indirect_module() {
    let bytes = wat::parse_str(
        r#"
        (module
          (table 1 funcref)
          (memory (export "memory") 1)
          (type $binop (func (param i32 i32) (result i32)))
          (elem (i32.const 0) $multiply)
          (func $dispatch (export "dispatch") (param i32 i32 i32) (result i32)
            local.get 0
            local.get 1
            local.get 2
            call_indirect (type $binop))
          (func $multiply (export "multiply") (type $binop)
            local.get 0
            local.get 1
            i32.mul)
          (func $main (export "main") (result i32)
            i32.const 6
            i32.const 7
            i32.const 0
            call $dispatch))
        "#,
    )
    .unwrap();

    let decoded = parse(bytes.as_slice()).unwrap();
    let module = decoded.module();

    assert_eq!(module.functions.len(), 3);
    assert_eq!(module.code.len(), 3);

    let names: Vec<&str> = module.exports.iter().map(|e| e.name).collect();
    let kinds: Vec<ExportKind> = module.exports.iter().map(|e| e.kind).collect();
    assert_eq!(names, vec!["memory", "dispatch", "multiply", "main"]);
    assert_eq!(
        kinds,
        vec![ExportKind::Memory, ExportKind::Function, ExportKind::Function, ExportKind::Function]
    );
}

#[test]
fn empty_module() {
    let bytes = wat::parse_str("(module)").unwrap();
    let decoded = parse(bytes.as_slice()).unwrap();
    let module = decoded.module();

    assert!(module.types.is_empty());
    assert!(module.imports.is_empty());
    assert!(module.functions.is_empty());
    assert!(module.exports.is_empty());
    assert!(module.code.is_empty());
}

#[test]
fn bad_magic_bytes_rejected() {
    let bytes = [0x00, 0x01, 0x02, 0x03, 0x01, 0x00, 0x00, 0x00];
    let err = parse(&bytes[..]).unwrap_err();
    assert_eq!(*err.kind(), ErrorKind::InvalidMagicByte);
}

#[test]
fn unsupported_version_rejected() {
    let mut bytes = wat::parse_str("(module)").unwrap();
    bytes[4] = 2; // bump the version field
    let err = parse(bytes.as_slice()).unwrap_err();
    assert_eq!(*err.kind(), ErrorKind::InvalidWasmVersion);
}

#[test]
fn truncated_type_section_fails() {
    let bytes = wat::parse_str("(module (type (func (param i32 i32) (result i32))))").unwrap();
    // Magic(4) + version(4) + section id(1) + length byte(1), then truncate
    // the payload a few bytes short of what the section declares.
    let truncated = &bytes[..bytes.len() - 2];
    let err = parse(truncated).unwrap_err();
    assert!(matches!(*err.kind(), ErrorKind::EndOfStream | ErrorKind::MalformedSection));
}

#[test]
fn post_mvp_element_segment_rejected_by_default() {
    // `elem declare` (a passive/declarative segment) is a post-MVP
    // reference-types encoding this crate does not decode by default.
    let bytes = wat::parse_str(
        r#"
        (module
          (func $f)
          (elem declare func $f))
        "#,
    )
    .unwrap();

    let err = parse(bytes.as_slice()).unwrap_err();
    assert_eq!(*err.kind(), ErrorKind::Unsupported);

    let lenient = parse_with_config(
        bytes.as_slice(),
        DecodeConfig { accept_post_mvp_elements: true, ..DecodeConfig::default() },
    )
    .unwrap();
    assert_eq!(lenient.module().elements.len(), 1);
}
