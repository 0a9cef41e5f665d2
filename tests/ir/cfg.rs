use binir::{Addr, Block, Edge, EdgeLabel, EdgeType, Ir, IrError, Module, ProxyBlock};

use crate::common::sample_ir;

#[test]
fn test_self_edges_and_multi_edges_survive() {
    let mut module = Module::new("loop");
    let head = module.add_block(Block::new(Addr::new(0x10), 4)).unwrap();
    let body = module.add_block(Block::new(Addr::new(0x14), 4)).unwrap();

    module.add_edge(head, head, Some(EdgeLabel::branch())).unwrap();
    module.add_edge(head, body, Some(EdgeLabel::fallthrough())).unwrap();
    module.add_edge(head, body, Some(EdgeLabel::new(EdgeType::Branch, true, true))).unwrap();
    module.add_edge(head, body, None).unwrap();
    module
        .cfg_mut()
        .push_edge(Edge::new(body, head, None).with_switch_value(3))
        .unwrap();

    let mut ir = Ir::new();
    let id = ir.add_module(module).unwrap();
    let decoded = Ir::from_bytes(&ir.to_bytes().unwrap()).unwrap();
    let cfg = decoded.module(&id).unwrap().cfg();

    assert_eq!(cfg.edge_count(), 5);
    assert_eq!(cfg.edges(), ir.module(&id).unwrap().cfg().edges());
    assert_eq!(cfg.edges_from(&head).filter(|e| e.target == body).count(), 3);
    assert_eq!(cfg.successors(&head), [head, body]);
    assert!(cfg.has_cycles());
    assert_eq!(cfg.edges().last().unwrap().switch_value, Some(3));
}

#[test]
fn test_edges_require_vertices() {
    let (mut ir, ids) = sample_ir();
    let mut editor = ir.edit_module(&ids.module).unwrap();

    assert!(matches!(
        editor.add_edge(ids.entry, ids.table, None),
        Err(IrError::UnknownVertex(id)) if id == ids.table
    ));
    let edges_before = editor.cfg().edge_count();

    let proxy = editor.add_proxy_block(ProxyBlock::new()).unwrap();
    editor.add_edge(ids.exit, proxy, None).unwrap();
    assert_eq!(editor.cfg().edge_count(), edges_before + 1);
}

#[test]
fn test_removing_block_drops_incident_edges() {
    let (mut ir, ids) = sample_ir();
    let mut editor = ir.edit_module(&ids.module).unwrap();
    editor.remove_block(&ids.exit).unwrap();

    let cfg = editor.cfg();
    assert!(!cfg.contains_vertex(&ids.exit));
    assert!(cfg
        .edges()
        .iter()
        .all(|e| e.source != ids.exit && e.target != ids.exit));
    assert!(ir.lookup(&ids.exit).is_none());
}

#[test]
fn test_statistics() {
    let (ir, ids) = sample_ir();
    let cfg = ir.module(&ids.module).unwrap().cfg();
    let stats = cfg.statistics();

    assert_eq!(stats.vertex_count, 3);
    assert_eq!(stats.edge_count, 3);
    assert_eq!(cfg.entry_vertices(), [ids.entry]);
    assert_eq!(cfg.exit_vertices(), [ids.proxy]);
    assert_eq!(stats.edge_type_counts.get(&EdgeType::Branch), Some(&1));
    assert_eq!(stats.cyclomatic_complexity, 2);
    assert!(!stats.has_cycles);
}
