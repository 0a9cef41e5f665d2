use binir::{
    Addr, Block, ImageByteMap, IrError, Module, Node, NodeKind, NodeRef, Symbol,
    SymbolicExpression,
};

use crate::common::sample_ir;

#[test]
fn test_every_node_is_registered() {
    let (ir, ids) = sample_ir();
    let registry = ir.registry();

    assert_eq!(registry.lookup(&ir.uuid()).unwrap().kind, NodeKind::Ir);
    assert_eq!(registry.lookup(&ids.module).unwrap().owner, Some(ir.uuid()));
    assert_eq!(registry.lookup(&ids.text).unwrap().kind, NodeKind::Section);
    assert_eq!(registry.lookup(&ids.proxy).unwrap().kind, NodeKind::ProxyBlock);
    assert_eq!(registry.lookup(&ids.table).unwrap().owner, Some(ids.module));

    for module in ir.modules() {
        for (id, kind) in module.descendants() {
            assert_eq!(ir.lookup(&id).map(|n| n.kind()), Some(kind));
            assert_eq!(ir.owning_module(&id).map(Node::uuid), Some(module.uuid()));
        }
    }
}

#[test]
fn test_duplicate_module_rejected_atomically() {
    let (mut ir, ids) = sample_ir();
    let before = ir.registry().len();
    let copy = ir.module(&ids.module).unwrap().clone();

    assert!(matches!(ir.add_module(copy), Err(IrError::DuplicateUuid(_))));
    assert_eq!(ir.registry().len(), before);
    assert_eq!(ir.modules().len(), 2);
}

#[test]
fn test_module_sharing_one_child_uuid_rejected() {
    let (mut ir, ids) = sample_ir();
    let before = ir.registry().len();

    let mut clash = Module::new("clash");
    clash.add_block(Block::new(Addr::new(0x10), 1)).unwrap();
    clash
        .add_block(Block::with_uuid(ids.exit, Addr::new(0x20), 1))
        .unwrap();

    assert!(matches!(ir.add_module(clash), Err(IrError::DuplicateUuid(id)) if id == ids.exit));
    assert_eq!(ir.registry().len(), before);
}

#[test]
fn test_editor_keeps_registry_in_step() {
    let (mut ir, ids) = sample_ir();
    let mut editor = ir.edit_module(&ids.other_module).unwrap();

    let block = editor.add_block(Block::new(Addr::new(0x2000), 4)).unwrap();
    assert!(matches!(
        editor.add_block(Block::with_uuid(ids.entry, Addr::new(0x3000), 4)),
        Err(IrError::DuplicateUuid(_))
    ));
    let symbol = editor.add_symbol(Symbol::for_node("helper", block)).unwrap();
    editor.set_name("libc.so");

    assert_eq!(ir.owning_module(&block).unwrap().name, "libc.so");
    assert!(matches!(ir.lookup(&symbol), Some(NodeRef::Symbol(_))));

    let mut editor = ir.edit_module(&ids.other_module).unwrap();
    editor.remove_symbol(&symbol).unwrap();
    assert!(!ir.registry().contains(&symbol));
}

#[test]
fn test_replacing_image_swaps_registration() {
    let (mut ir, ids) = sample_ir();
    let replacement = ImageByteMap::new();
    let replacement_id = replacement.uuid();

    let old = ir
        .edit_module(&ids.module)
        .unwrap()
        .set_image_byte_map(replacement)
        .unwrap()
        .unwrap();
    assert_eq!(old.uuid(), ids.image);
    assert!(!ir.registry().contains(&ids.image));
    assert_eq!(
        ir.registry().lookup(&replacement_id).unwrap().kind,
        NodeKind::ImageByteMap
    );
}

#[test]
fn test_remove_module_unregisters_subtree() {
    let (mut ir, ids) = sample_ir();
    let module = ir.remove_module(&ids.module).unwrap();

    assert!(!ir.registry().contains(&ids.module));
    for (id, _) in module.descendants() {
        assert!(ir.lookup(&id).is_none());
    }
    // Detached modules can come back.
    ir.add_module(module).unwrap();
    assert!(ir.lookup(&ids.entry).is_some());
}

#[test]
fn test_entry_point_follows_block_removal() {
    let (mut ir, ids) = sample_ir();
    let mut editor = ir.edit_module(&ids.module).unwrap();

    assert!(matches!(
        editor.set_entry_point(Some(ids.proxy)),
        Err(IrError::UnknownReferent(_))
    ));
    editor.remove_block(&ids.entry).unwrap();
    assert_eq!(editor.entry_point(), None);
}

#[test]
fn test_move_symbol_between_modules() {
    let (mut ir, ids) = sample_ir();
    ir.move_symbol(&ids.main_symbol, &ids.other_module).unwrap();

    assert_eq!(
        ir.owning_module(&ids.main_symbol).map(Node::uuid),
        Some(ids.other_module)
    );
    assert!(!ir.module(&ids.module).unwrap().holds(&ids.main_symbol));
    // The referent still resolves across modules.
    assert_eq!(ir.symbol_address(&ids.main_symbol).unwrap(), Some(Addr::new(0x401000)));

    assert!(matches!(
        ir.move_symbol(&ids.entry, &ids.module),
        Err(IrError::UnknownNode(_))
    ));
}

#[test]
fn test_dangling_referents_after_removal() {
    let (mut ir, ids) = sample_ir();
    assert!(ir.dangling_referents().is_empty());

    ir.edit_module(&ids.module).unwrap().remove_data_object(&ids.table).unwrap();

    assert_eq!(ir.dangling_referents(), [ids.table_symbol]);
    assert!(matches!(
        ir.resolve_referent(&ids.table_symbol),
        Err(IrError::UnknownReferent(id)) if id == ids.table
    ));
    let expr = SymbolicExpression::addr_const(ids.table_symbol, 0);
    assert_eq!(ir.resolve_symbolic_expression(&expr).unwrap().len(), 1);
}
