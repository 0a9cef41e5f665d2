//! Shared fixtures for the integration tests.

use std::collections::{BTreeMap, BTreeSet};
use std::io::Write;

use binir::{
    Addr, Block, ByteOrder, DataObject, EdgeLabel, EdgeType, FileFormat, ImageByteMap, Ir, Isa,
    Module, Node, ProxyBlock, Section, SectionFlags, StorageKind, Symbol, SymbolicExpression,
};
use tempfile::NamedTempFile;
use uuid::Uuid;

/// UUIDs of the interesting nodes in [`sample_ir`].
#[allow(dead_code)]
pub struct SampleIds {
    pub module: Uuid,
    pub other_module: Uuid,
    pub text: Uuid,
    pub entry: Uuid,
    pub exit: Uuid,
    pub proxy: Uuid,
    pub table: Uuid,
    pub main_symbol: Uuid,
    pub table_symbol: Uuid,
    pub image: Uuid,
}

/// A two-module tree with sections, blocks, a proxy, data, symbols, bytes,
/// a labelled CFG and a few AuxData tables.
pub fn sample_ir() -> (Ir, SampleIds) {
    let mut module = Module::new("hello");
    module.binary_path = "/tmp/hello".to_string();
    module.preferred_addr = Addr::new(0x400000);
    module.file_format = FileFormat::Elf;
    module.isa = Isa::X64;

    let text = module
        .add_section(
            Section::new(".text", Addr::new(0x401000), 0x40)
                .with_flags(SectionFlags::READABLE | SectionFlags::EXECUTABLE | SectionFlags::LOADED),
        )
        .unwrap();
    module
        .add_section(
            Section::new(".data", Addr::new(0x402000), 0x10)
                .with_flags(SectionFlags::READABLE | SectionFlags::WRITABLE),
        )
        .unwrap();

    let entry = module.add_block(Block::new(Addr::new(0x401000), 0x10)).unwrap();
    let exit = module.add_block(Block::new(Addr::new(0x401010), 0x08)).unwrap();
    let proxy = module.add_proxy_block(ProxyBlock::new()).unwrap();
    module.set_entry_point(Some(entry)).unwrap();

    module
        .add_edge(entry, exit, Some(EdgeLabel::new(EdgeType::Branch, true, true)))
        .unwrap();
    module.add_edge(entry, exit, Some(EdgeLabel::fallthrough())).unwrap();
    module
        .add_edge(exit, proxy, Some(EdgeLabel::new(EdgeType::Call, false, false)))
        .unwrap();

    let table = module
        .add_data_object(DataObject::new(Addr::new(0x402000), 0x10))
        .unwrap();
    let main_symbol = module
        .add_symbol(Symbol::for_node("main", entry).with_storage_kind(StorageKind::Extern))
        .unwrap();
    let table_symbol = module
        .add_symbol(Symbol::for_node("table", table).with_storage_kind(StorageKind::Static))
        .unwrap();
    module
        .add_symbol(Symbol::at_address("_start", Addr::new(0x401000)))
        .unwrap();
    module.add_symbolic_expression(
        Addr::new(0x401004),
        SymbolicExpression::addr_const(table_symbol, 8),
    );

    let mut image = ImageByteMap::with_bounds(Addr::new(0x401000), Addr::new(0x40200f)).unwrap();
    image.file_name = "hello".to_string();
    image.base_address = Addr::new(0x400000);
    image.entry_point_address = Addr::new(0x401000);
    image.byte_order = ByteOrder::Little;
    image
        .set_data(Addr::new(0x401000), &[0x55, 0x48, 0x89, 0xe5, 0x90, 0x90, 0xc3])
        .unwrap();
    image.fill(Addr::new(0x402000), 0x10, 0xaa).unwrap();
    let image_id = image.uuid();
    module.set_image_byte_map(image).unwrap();

    module
        .aux_data
        .insert("functionEntries", BTreeMap::from([(entry, BTreeSet::from([entry]))]));
    module.aux_data.insert(
        "comments",
        BTreeMap::from([(binir::Offset::new(entry, 4), "stack frame".to_string())]),
    );

    let mut other = Module::new("libc.so.6");
    other.file_format = FileFormat::Elf;
    let puts = other.add_block(Block::new(Addr::new(0x1000), 0x20)).unwrap();
    other.add_symbol(Symbol::for_node("puts", puts)).unwrap();

    let mut ir = Ir::new();
    let module_id = ir.add_module(module).unwrap();
    let other_id = ir.add_module(other).unwrap();
    ir.aux_data.insert("padding", vec![Addr::new(0x401017)]);

    let ids = SampleIds {
        module: module_id,
        other_module: other_id,
        text,
        entry,
        exit,
        proxy,
        table,
        main_symbol,
        table_symbol,
        image: image_id,
    };
    (ir, ids)
}

/// Creates a temporary file with the given content.
#[allow(dead_code)]
pub fn create_temp_file(content: &[u8]) -> NamedTempFile {
    let mut temp_file = NamedTempFile::new().unwrap();
    temp_file.write_all(content).unwrap();
    temp_file
}
