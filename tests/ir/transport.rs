use std::fs;

use binir::io::{load_ir, roundtrip_file, save_ir};
use binir::{CodecConfig, IoConfig, IrError};
use tempfile::TempDir;

use crate::common::{create_temp_file, sample_ir};

#[test]
fn test_save_and_load() {
    let (ir, ids) = sample_ir();
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("hello.ir");

    save_ir(&path, &ir).unwrap();
    let loaded = load_ir(&path, &IoConfig::default(), &CodecConfig::default()).unwrap();

    assert_eq!(loaded, ir);
    assert_eq!(loaded.module(&ids.module).unwrap().entry_point(), Some(ids.entry));
}

#[test]
fn test_roundtrip_file_is_identical() {
    let (ir, _) = sample_ir();
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("hello.ir");
    save_ir(&path, &ir).unwrap();

    let report = roundtrip_file(&path).unwrap();
    assert!(report.is_identical());
    assert_eq!(report.modules, 2);
    assert_eq!(report.original_len as u64, fs::metadata(&path).unwrap().len());
}

#[test]
fn test_file_size_limit() {
    let (ir, _) = sample_ir();
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("hello.ir");
    save_ir(&path, &ir).unwrap();

    let tight = IoConfig { max_file_size: 16 };
    assert!(matches!(
        load_ir(&path, &tight, &CodecConfig::default()),
        Err(IrError::ResourceExhausted { .. })
    ));
}

#[test]
fn test_garbage_file_is_malformed() {
    let file = create_temp_file(b"definitely not an IR file");
    let err = load_ir(file.path(), &IoConfig::default(), &CodecConfig::default()).unwrap_err();
    assert!(err.is_decode_error());
}

#[test]
fn test_missing_file_is_io_error() {
    let dir = TempDir::new().unwrap();
    let result = load_ir(
        dir.path().join("absent.ir"),
        &IoConfig::default(),
        &CodecConfig::default(),
    );
    assert!(matches!(result, Err(IrError::Io(_))));
}
