use optic_memory::PoolId;
use pretty_assertions::assert_eq;

use crate::slice::Slice;

#[test]
fn default_slice_is_an_empty_app_pool_view() {
    let s = Slice::default();
    assert!(s.is_app_pool());
    assert_eq!(s.size, 0);
    assert_eq!(s.count, 0);
    assert!(!s.contains_addr(0));
}

#[test]
fn contains_addr_checks_the_half_open_extent() {
    let s = Slice::new(PoolId(2), 0x10, 0x10, 8, 8);
    assert!(!s.contains_addr(0x0f));
    assert!(s.contains_addr(0x10));
    assert!(s.contains_addr(0x17));
    assert!(!s.contains_addr(0x18));
}

#[test]
fn sub_slices_are_relative_to_the_base() {
    let s = Slice::new(PoolId(2), 0, 0x100, 64, 16); // 16 elements of 4 bytes
    let sub = s.sub(4, 2, 4);
    assert_eq!(sub.pool, s.pool);
    assert_eq!(sub.root, s.root);
    assert_eq!(sub.base, 0x110);
    assert_eq!(sub.size, 8);
    assert_eq!(sub.count, 2);
}
