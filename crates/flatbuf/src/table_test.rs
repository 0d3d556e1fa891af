//! Tests for the zero-copy table reader
//!
//! `create_test_message` lays out a message by hand so the reader is
//! checked against the wire format itself rather than against the builder.

use crate::error::CodecError;
use crate::table::Table;
use crate::Builder;

/// Hand-built message with one table:
///
/// ```text
/// field 0: u32 = 42
/// field 1: string "hi"
/// field 2: absent (voffset 0)
/// ```
fn create_test_message() -> Vec<u8> {
    let mut buf = Vec::new();

    // [0..4]: root offset, filled in later
    buf.extend_from_slice(&[0u8; 4]);

    // === VTable at 4 ===
    let vtable_start = buf.len();
    buf.extend_from_slice(&10u16.to_le_bytes()); // vtable size: 4 + 3 * 2
    buf.extend_from_slice(&12u16.to_le_bytes()); // table size
    buf.extend_from_slice(&4u16.to_le_bytes()); // field 0 at table + 4
    buf.extend_from_slice(&8u16.to_le_bytes()); // field 1 at table + 8
    buf.extend_from_slice(&0u16.to_le_bytes()); // field 2 absent
    buf.extend_from_slice(&[0u8; 2]); // pad to 4

    // === Table at 16 ===
    let table_start = buf.len();
    let soffset = (table_start - vtable_start) as i32;
    buf.extend_from_slice(&soffset.to_le_bytes());
    buf.extend_from_slice(&42u32.to_le_bytes());
    let str_ref_pos = buf.len();
    buf.extend_from_slice(&[0u8; 4]);

    // === String ===
    let str_start = buf.len();
    buf.extend_from_slice(&2u32.to_le_bytes());
    buf.extend_from_slice(b"hi\0");

    let str_rel = (str_start - str_ref_pos) as u32;
    buf[str_ref_pos..str_ref_pos + 4].copy_from_slice(&str_rel.to_le_bytes());
    buf[0..4].copy_from_slice(&(table_start as u32).to_le_bytes());

    buf
}

// =============================================================================
// Table::root / Table::new
// =============================================================================

#[test]
fn test_root_hand_built() {
    let buf = create_test_message();
    let table = Table::root(&buf).expect("should parse hand-built message");

    assert_eq!(table.offset(), 16);
    assert_eq!(table.vtable_size(), 10);
    assert_eq!(table.field_count(), 3);
    assert_eq!(table.read_u32(0, 0), 42);
    assert_eq!(table.read_str(1).unwrap(), Some("hi"));
    assert_eq!(table.lookup(2), None);
}

#[test]
fn test_root_too_short() {
    let buf = [0u8; 2];
    let result = Table::root(&buf);
    assert!(matches!(result, Err(CodecError::MessageTooShort { .. })));
}

#[test]
fn test_root_offset_past_buffer() {
    let mut buf = vec![0u8; 64];
    buf[0..4].copy_from_slice(&1000u32.to_le_bytes());

    let result = Table::root(&buf);
    assert!(matches!(result, Err(CodecError::InvalidFlatBuffer(_))));
}

#[test]
fn test_vtable_underflow() {
    let mut buf = vec![0u8; 32];
    buf[0..4].copy_from_slice(&8u32.to_le_bytes());
    buf[8..12].copy_from_slice(&100i32.to_le_bytes());

    let result = Table::root(&buf);
    assert!(matches!(result, Err(CodecError::InvalidFlatBuffer(_))));
}

#[test]
fn test_vtable_size_too_small() {
    let mut buf = create_test_message();
    buf[4..6].copy_from_slice(&2u16.to_le_bytes());

    let result = Table::root(&buf);
    assert!(matches!(result, Err(CodecError::InvalidFlatBuffer(_))));
}

#[test]
fn test_vtable_size_past_buffer() {
    let mut buf = create_test_message();
    buf[4..6].copy_from_slice(&1000u16.to_le_bytes());

    let result = Table::root(&buf);
    assert!(matches!(result, Err(CodecError::InvalidFlatBuffer(_))));
}

// =============================================================================
// Field lookup
// =============================================================================

#[test]
fn test_lookup_past_vtable_is_absent() {
    let buf = create_test_message();
    let table = Table::root(&buf).unwrap();

    // a newer schema may know more fields than this message carries
    assert_eq!(table.lookup(3), None);
    assert_eq!(table.lookup(usize::MAX), None);
    assert_eq!(table.read_u64(7, 99), 99);
}

#[test]
fn test_absent_field_returns_default() {
    let buf = create_test_message();
    let table = Table::root(&buf).unwrap();

    assert_eq!(table.read_i32(2, -5), -5);
    assert!(table.read_bool(2, true));
    assert_eq!(table.read_f64(2, 2.5), 2.5);
}

#[test]
fn test_truncated_scalar_returns_default() {
    let buf = create_test_message();
    let table = Table::root(&buf).unwrap();

    // field 1 starts exactly at the cut
    let truncated = &buf[..24];
    let table_trunc = Table::new(truncated, table.offset()).unwrap();
    assert_eq!(table_trunc.read_u64(1, 7), 7);
}

// =============================================================================
// Vectors, bytes and strings
// =============================================================================

#[test]
fn test_read_vector_len() {
    let buf = create_test_message();
    let table = Table::root(&buf).unwrap();

    assert_eq!(table.read_vector_len(1), 2);
    assert_eq!(table.read_vector_len(2), 0);
}

#[test]
fn test_read_vector_absent() {
    let buf = create_test_message();
    let table = Table::root(&buf).unwrap();
    assert!(table.read_vector(2).unwrap().is_none());
}

#[test]
fn test_string_nul_on_wire() {
    let buf = create_test_message();
    let table = Table::root(&buf).unwrap();
    let vector = table.read_vector(1).unwrap().unwrap();

    assert_eq!(vector.len(), 2);
    assert_eq!(buf[vector.start() + vector.len()], 0);
}

#[test]
fn test_read_str_invalid_utf8() {
    let mut buf = create_test_message();
    let len = buf.len();
    buf[len - 3] = 0xFF;

    let table = Table::root(&buf).unwrap();
    assert!(matches!(table.read_str(1), Err(CodecError::InvalidUtf8)));
    assert_eq!(table.read_bytes(1).unwrap(), Some(&[0xFF, b'i'][..]));
}

#[test]
fn test_read_bytes_past_buffer() {
    let mut buf = create_test_message();
    let len = buf.len();
    // claim a much longer string than the buffer holds
    buf[len - 7..len - 3].copy_from_slice(&500u32.to_le_bytes());

    let table = Table::root(&buf).unwrap();
    assert!(matches!(
        table.read_bytes(1),
        Err(CodecError::InvalidFlatBuffer(_))
    ));
}

#[test]
fn test_empty_bytes_read_as_none() {
    let mut fb = Builder::new();
    let empty = fb.prepend_bytes(&[]).unwrap();
    fb.object_begin(1).unwrap();
    fb.object_prepend_uoffset(0, empty).unwrap();
    let root = fb.object_end().unwrap();
    fb.finish(root).unwrap();

    let table = Table::root(fb.finished_data().unwrap()).unwrap();
    assert!(table.lookup(0).is_some());
    assert_eq!(table.read_bytes(0).unwrap(), None);
    assert_eq!(table.read_str(0).unwrap(), None);
    assert_eq!(table.read_vector_len(0), 0);
}

#[test]
fn test_vector_get_past_end() {
    let mut fb = Builder::new();
    let values = fb.prepend_vector(&[10i64, -20, 30]).unwrap();
    fb.object_begin(1).unwrap();
    fb.object_prepend_uoffset(0, values).unwrap();
    let root = fb.object_end().unwrap();
    fb.finish(root).unwrap();

    let table = Table::root(fb.finished_data().unwrap()).unwrap();
    let vector = table.read_vector(0).unwrap().unwrap();
    assert_eq!(vector.len(), 3);
    assert_eq!(vector.get::<i64>(0), Some(10));
    assert_eq!(vector.get::<i64>(1), Some(-20));
    assert_eq!(vector.get::<i64>(2), Some(30));
    assert_eq!(vector.get::<i64>(3), None);
}

// =============================================================================
// Nested tables and unions
// =============================================================================

#[test]
fn test_read_table_and_union() {
    let mut fb = Builder::new();

    fb.object_begin(1).unwrap();
    fb.object_prepend_f32(0, 0.25, 0.0).unwrap();
    let child = fb.object_end().unwrap();

    fb.object_begin(2).unwrap();
    fb.object_prepend_u8(0, 3, 0).unwrap(); // union discriminant
    fb.object_prepend_uoffset(1, child).unwrap();
    let root = fb.object_end().unwrap();
    fb.finish(root).unwrap();

    let table = Table::root(fb.finished_data().unwrap()).unwrap();
    assert_eq!(table.read_u8(0, 0), 3);

    let member = table.read_union(1).unwrap().unwrap();
    assert_eq!(member.read_f32(0, 0.0), 0.25);

    let nested = table.read_table(1).unwrap().unwrap();
    assert_eq!(nested.offset(), member.offset());
    assert!(table.read_table(5).unwrap().is_none());
}

#[test]
fn test_nested_offset_past_buffer() {
    let mut buf = create_test_message();
    // point field 1's uoffset far beyond the end
    buf[24..28].copy_from_slice(&10_000u32.to_le_bytes());

    let table = Table::root(&buf).unwrap();
    assert!(matches!(
        table.read_table(1),
        Err(CodecError::InvalidFlatBuffer(_))
    ));
    assert_eq!(table.read_vector_len(1), 0);
}

#[test]
fn test_vector_of_tables_and_strings() {
    let mut fb = Builder::new();

    let mut items = Vec::new();
    for i in 0..4u16 {
        fb.object_begin(1).unwrap();
        fb.object_prepend_u16(0, i + 1, 0).unwrap();
        items.push(fb.object_end().unwrap());
    }
    let tables = fb.prepend_offset_vector(&items).unwrap();

    let names = ["alpha", "beta"]
        .iter()
        .map(|s| fb.prepend_string(s).unwrap())
        .collect::<Vec<_>>();
    let names = fb.prepend_offset_vector(&names).unwrap();

    fb.object_begin(2).unwrap();
    fb.object_prepend_uoffset(0, tables).unwrap();
    fb.object_prepend_uoffset(1, names).unwrap();
    let root = fb.object_end().unwrap();
    fb.finish(root).unwrap();

    let table = Table::root(fb.finished_data().unwrap()).unwrap();

    let tables = table.read_vector(0).unwrap().unwrap();
    let values = tables
        .tables()
        .map(|t| t.unwrap().read_u16(0, 0))
        .collect::<Vec<_>>();
    assert_eq!(values, vec![1, 2, 3, 4]);
    assert!(tables.table(4).unwrap().is_none());

    let names = table.read_vector(1).unwrap().unwrap();
    assert_eq!(names.str(0).unwrap(), Some("alpha"));
    assert_eq!(names.str(1).unwrap(), Some("beta"));
    assert_eq!(names.str(2).unwrap(), None);
}
