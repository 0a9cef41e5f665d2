use std::collections::BTreeMap;

use binir::core::aux_data::encode_value;
use binir::serialization::messages::{AuxDataEntryMsg, AuxDataMsg, ExtensionMsg, IrMsg};
use binir::serialization::{IR_FORMAT_VERSION, IR_MAGIC};
use binir::{
    Addr, AuxSchema, CodecConfig, DecodeContext, Ir, IrError, Module, Node, NodeKind, NodeRef,
    RawAuxData, WireMessage,
};
use uuid::Uuid;

use crate::common::sample_ir;

fn ir_file(msg: IrMsg) -> Vec<u8> {
    let mut out = IR_MAGIC.to_vec();
    out.extend_from_slice(&IR_FORMAT_VERSION.to_le_bytes());
    out.extend(bincode::encode_to_vec(msg, bincode::config::standard()).unwrap());
    out
}

#[test]
fn test_tree_survives_round_trip() {
    let (ir, ids) = sample_ir();
    let bytes = ir.to_bytes().unwrap();
    let decoded = Ir::from_bytes(&bytes).unwrap();

    assert_eq!(decoded, ir);
    assert_eq!(decoded.uuid(), ir.uuid());
    assert_eq!(decoded.registry().len(), ir.registry().len());

    let names: Vec<_> = decoded.modules().iter().map(|m| m.name.as_str()).collect();
    assert_eq!(names, ["hello", "libc.so.6"]);

    let module = decoded.module(&ids.module).unwrap();
    assert_eq!(module.entry_point(), Some(ids.entry));
    let blocks: Vec<_> = module.blocks().ids().collect();
    assert_eq!(blocks, [ids.entry, ids.exit]);
    assert_eq!(module.cfg().vertices(), ir.module(&ids.module).unwrap().cfg().vertices());
    assert_eq!(module.cfg().edge_count(), 3);

    match decoded.lookup(&ids.table) {
        Some(NodeRef::DataObject(data)) => assert_eq!(data.address, Addr::new(0x402000)),
        other => panic!("expected data object, got {:?}", other.map(|n| n.kind())),
    }
    assert_eq!(
        decoded.symbol_address(&ids.main_symbol).unwrap(),
        Some(Addr::new(0x401000))
    );
}

#[test]
fn test_reencoding_is_byte_identical() {
    let (ir, _) = sample_ir();
    let bytes = ir.to_bytes().unwrap();
    let decoded = Ir::from_bytes(&bytes).unwrap();
    assert_eq!(decoded.to_bytes().unwrap(), bytes);
}

#[test]
fn test_image_bytes_survive() {
    let (ir, ids) = sample_ir();
    let decoded = Ir::from_bytes(&ir.to_bytes().unwrap()).unwrap();
    let image = decoded.module(&ids.module).unwrap().image_byte_map().unwrap();

    assert_eq!(image.uuid(), ids.image);
    assert_eq!(
        image.get_data(Addr::new(0x401000), 4).unwrap(),
        [0x55, 0x48, 0x89, 0xe5]
    );
    assert_eq!(image.read_u16(Addr::new(0x402000)).unwrap(), 0xaaaa);
    assert_eq!(decoded.registry().lookup(&ids.image).unwrap().kind, NodeKind::ImageByteMap);
}

#[test]
fn test_padding_sequence_without_schema() {
    let (ir, _) = sample_ir();
    let bytes = ir.to_bytes().unwrap();
    let ctx = DecodeContext::new(CodecConfig::default(), AuxSchema::new());

    let decoded = Ir::from_bytes_with(&bytes, &ctx).unwrap();
    let padding = decoded.aux_data.entry("padding").unwrap();
    assert!(padding.is_raw());
    assert_eq!(padding.type_name(), "sequence<Addr>");
    assert_eq!(padding.to_raw().bytes, encode_value(&vec![Addr::new(0x401017)]));
    assert_eq!(decoded.to_bytes().unwrap(), bytes);

    // Asking for the type decodes the raw bytes on demand.
    assert_eq!(
        decoded.aux_data.get::<Vec<Addr>>("padding").unwrap(),
        Some(vec![Addr::new(0x401017)])
    );
}

#[test]
fn test_aux_data_type_mismatch() {
    let (ir, _) = sample_ir();
    let decoded = Ir::from_bytes(&ir.to_bytes().unwrap()).unwrap();
    let err = decoded.aux_data.get::<BTreeMap<Uuid, String>>("padding").unwrap_err();
    assert!(matches!(err, IrError::TypeMismatch { .. }));
}

#[test]
fn test_unknown_aux_data_and_extensions_preserved() {
    let (ir, _) = sample_ir();
    let mut msg = ir.to_message();
    msg.aux_data.entries.push(AuxDataEntryMsg {
        key: "zzVendorBlob".to_string(),
        value: AuxDataMsg {
            type_name: "vendor<blob>".to_string(),
            data: vec![0xde, 0xad, 0xbe, 0xef],
        },
        extensions: Vec::new(),
    });
    msg.extensions.push(ExtensionMsg {
        tag: 42,
        bytes: b"future field".to_vec(),
    });
    msg.modules[0].extensions.push(ExtensionMsg {
        tag: 7,
        bytes: vec![1, 2, 3],
    });
    let bytes = ir_file(msg);

    let decoded = Ir::from_bytes(&bytes).unwrap();
    assert_eq!(
        decoded.aux_data.entry("zzVendorBlob").unwrap().to_raw(),
        RawAuxData::new("vendor<blob>", vec![0xde, 0xad, 0xbe, 0xef])
    );
    assert_eq!(decoded.extensions(), [(42, b"future field".to_vec())]);
    assert_eq!(decoded.modules().iter().next().unwrap().extensions(), [(7, vec![1, 2, 3])]);
    assert_eq!(decoded.to_bytes().unwrap(), bytes);
}

#[test]
fn test_nested_extensions_preserved() {
    let (ir, ids) = sample_ir();
    let mut msg = ir.to_message();
    msg.modules[0].sections[0].extensions.push(ExtensionMsg {
        tag: 3,
        bytes: vec![0xaa],
    });
    msg.modules[0].blocks[0].extensions.push(ExtensionMsg {
        tag: 4,
        bytes: vec![0xbb, 0xcc],
    });
    let bytes = ir_file(msg);

    let decoded = Ir::from_bytes(&bytes).unwrap();
    match decoded.lookup(&ids.text) {
        Some(NodeRef::Section(section)) => assert_eq!(section.extensions(), [(3, vec![0xaa])]),
        other => panic!("expected section, got {:?}", other.map(|n| n.kind())),
    }
    match decoded.lookup(&ids.entry) {
        Some(NodeRef::Block(block)) => assert_eq!(block.extensions(), [(4, vec![0xbb, 0xcc])]),
        other => panic!("expected block, got {:?}", other.map(|n| n.kind())),
    }
    assert_eq!(decoded.to_bytes().unwrap(), bytes);
}

#[test]
fn test_unsorted_set_payload_reencodes_unchanged() {
    let (ir, _) = sample_ir();
    let (low, high) = (Uuid::from_u128(1), Uuid::from_u128(2));
    let mut data = encode_value(&2u64);
    data.extend_from_slice(high.as_bytes());
    data.extend_from_slice(low.as_bytes());

    let mut msg = ir.to_message();
    msg.aux_data.entries.push(AuxDataEntryMsg {
        key: "zzLiveBlocks".to_string(),
        value: AuxDataMsg {
            type_name: "set<UUID>".to_string(),
            data: data.clone(),
        },
        extensions: Vec::new(),
    });
    let bytes = ir_file(msg);

    let decoded = Ir::from_bytes(&bytes).unwrap();
    assert_eq!(decoded.aux_data.entry("zzLiveBlocks").unwrap().to_raw().bytes, data);
    assert_eq!(decoded.to_bytes().unwrap(), bytes);
}

#[test]
fn test_duplicate_uuid_across_modules_rejected() {
    let (ir, _) = sample_ir();
    let mut msg = ir.to_message();
    let shared = msg.modules[0].blocks[0].clone();
    msg.modules[1].blocks.push(shared.clone());
    msg.modules[1].cfg.vertices.push(shared.uuid);

    assert!(matches!(
        Ir::from_bytes(&ir_file(msg)),
        Err(IrError::DuplicateUuid(_))
    ));
}

#[test]
fn test_missing_required_reference_is_malformed() {
    let (ir, _) = sample_ir();
    let mut msg = ir.to_message();
    msg.modules[0].entry_point = Some([0; 16]);
    let err = Ir::from_bytes(&ir_file(msg)).unwrap_err();
    assert!(err.is_decode_error());
}

#[test]
fn test_truncated_input_never_panics() {
    let (ir, _) = sample_ir();
    let bytes = ir.to_bytes().unwrap();
    for len in (0..bytes.len()).step_by(7) {
        assert!(Ir::from_bytes(&bytes[..len]).is_err());
    }
}

#[test]
fn test_empty_tree_round_trip() {
    let ir = Ir::new();
    let decoded = Ir::from_bytes(&ir.to_bytes().unwrap()).unwrap();
    assert_eq!(decoded, ir);
    assert!(decoded.modules().is_empty());
    assert_eq!(decoded.registry().len(), 1);
}

#[test]
fn test_standalone_module_decode() {
    let (ir, ids) = sample_ir();
    let module = ir.module(&ids.module).unwrap();
    let bytes = binir::encode(module).unwrap();
    let decoded: Module = binir::decode(&bytes).unwrap();
    assert_eq!(&decoded, module);

    let mut fresh = Ir::new();
    let id = fresh.decode_module_into(&bytes, &DecodeContext::default()).unwrap();
    assert_eq!(id, ids.module);
    assert!(fresh.lookup(&ids.entry).is_some());
}
