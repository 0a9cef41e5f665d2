use binir::{Addr, ByteOrder, ImageByteMap, Ir, IrError, Module};

use crate::common::sample_ir;

fn bounded_image() -> ImageByteMap {
    ImageByteMap::with_bounds(Addr::new(100), Addr::new(200)).unwrap()
}

#[test]
fn test_writes_inside_bounds() {
    let mut image = bounded_image();
    image.set_data(Addr::new(100), &[1, 2, 3]).unwrap();
    image.set_data(Addr::new(198), &[7, 8, 9]).unwrap();

    assert_eq!(image.get_data(Addr::new(101), 2).unwrap(), [2, 3]);
    assert_eq!(image.get_data(Addr::new(198), 3).unwrap(), [7, 8, 9]);
}

#[test]
fn test_write_past_max_is_rejected_whole() {
    let mut image = bounded_image();
    let err = image.set_data(Addr::new(195), &[0xff; 10]).unwrap_err();

    assert!(matches!(err, IrError::OutOfRange { .. }));
    assert!(image.byte_map().is_empty());
    assert!(matches!(
        image.get_data(Addr::new(195), 1),
        Err(IrError::RangeError { .. })
    ));
}

#[test]
fn test_access_below_min_is_out_of_range() {
    let mut image = bounded_image();
    assert!(matches!(
        image.set_data(Addr::new(99), &[0]),
        Err(IrError::OutOfRange { .. })
    ));
    assert!(matches!(
        image.get_data(Addr::new(50), 1),
        Err(IrError::OutOfRange { .. })
    ));
}

#[test]
fn test_unstored_bytes_are_range_errors() {
    let mut image = bounded_image();
    image.set_data(Addr::new(100), &[1, 2]).unwrap();
    image.set_data(Addr::new(110), &[3, 4]).unwrap();

    // In bounds but spanning a gap.
    assert!(matches!(
        image.get_data(Addr::new(101), 10),
        Err(IrError::RangeError { .. })
    ));
}

#[test]
fn test_full_window_fill_fails_without_allocating() {
    let mut image = ImageByteMap::with_bounds(Addr::MIN, Addr::MAX).unwrap();
    assert!(matches!(
        image.fill(Addr::MIN, u64::MAX, 0),
        Err(IrError::ResourceExhausted { .. })
    ));
    assert!(image.byte_map().is_empty());
}

#[test]
fn test_inverted_bounds_rejected() {
    let mut image = bounded_image();
    assert!(image.set_addr_min_max(Addr::new(300), Addr::new(10)).is_err());
    assert_eq!(image.addr_min_max(), (Addr::new(100), Addr::new(200)));
}

#[test]
fn test_bounds_and_bytes_survive_round_trip() {
    let mut image = bounded_image();
    image.byte_order = ByteOrder::Big;
    image.set_data(Addr::new(150), &[0x12, 0x34]).unwrap();
    image.mark_relocated();

    let mut module = Module::new("bounded");
    module.set_image_byte_map(image).unwrap();
    let mut ir = Ir::new();
    let id = ir.add_module(module).unwrap();

    let decoded = Ir::from_bytes(&ir.to_bytes().unwrap()).unwrap();
    let image = decoded.module(&id).unwrap().image_byte_map().unwrap();
    assert_eq!(image.addr_min_max(), (Addr::new(100), Addr::new(200)));
    assert!(image.is_relocated());
    assert_eq!(image.read_u16(Addr::new(150)).unwrap(), 0x1234);
    assert!(matches!(
        image.get_data(Addr::new(201), 1),
        Err(IrError::OutOfRange { .. })
    ));
}

#[test]
fn test_editing_image_through_tree() {
    let (mut ir, ids) = sample_ir();
    {
        let mut editor = ir.edit_module(&ids.module).unwrap();
        let image = editor.image_byte_map_mut().unwrap();
        image.set_data(Addr::new(0x401007), &[0xc3]).unwrap();
        assert!(image.set_data(Addr::new(0x402010), &[0]).is_err());
    }
    let image = ir.module(&ids.module).unwrap().image_byte_map().unwrap();
    assert_eq!(image.byte_map().run_count(), 2);
    assert_eq!(image.get_data(Addr::new(0x401006), 2).unwrap(), [0xc3, 0xc3]);
}
