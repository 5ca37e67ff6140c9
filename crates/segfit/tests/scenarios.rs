use segfit::{Allocator, VecHost};

fn new_allocator() -> Allocator<VecHost> {
    let mut alloc = Allocator::new(VecHost::new());
    alloc.init().expect("init should not fail against an unbounded host");
    alloc
}

#[test]
fn empty_init_then_single_allocate() {
    let mut alloc = new_allocator();
    let (lo, _hi) = alloc.arena_bounds();

    let p = alloc.allocate(1).unwrap().expect("allocate(1) must succeed");
    assert!(p.0 - lo >= 156, "payload must land past the prolog region");
    assert_eq!(p.size(alloc.host().bytes()), 16, "1 byte rounds up to the minimum block size");
    assert!(!p.is_free(alloc.host().bytes()));
    assert!(alloc.check());
}

#[test]
fn split_on_fit_reuses_freed_block() {
    let mut alloc = new_allocator();
    let a = alloc.allocate(16).unwrap().unwrap();
    let b = alloc.allocate(32).unwrap().unwrap();
    let _c = alloc.allocate(16).unwrap().unwrap();

    alloc.free(Some(b));
    let d = alloc.allocate(8).unwrap().unwrap();

    assert_eq!(d, b, "the freed block should be reused by the next fitting request");
    let remainder = d.next(alloc.host().bytes());
    assert!(remainder.is_free(alloc.host().bytes()));
    assert!(remainder.size(alloc.host().bytes()) >= 16);
    assert!(alloc.check());
    let _ = a;
}

#[test]
fn coalesce_three_way() {
    let mut alloc = new_allocator();
    let a = alloc.allocate(8).unwrap().unwrap();
    let b = alloc.allocate(8).unwrap().unwrap();
    let c = alloc.allocate(8).unwrap().unwrap();

    alloc.free(Some(a));
    alloc.free(Some(c));
    alloc.free(Some(b));

    assert!(a.is_free(alloc.host().bytes()));
    assert_eq!(a.size(alloc.host().bytes()), 48, "three adjacent 16-byte blocks coalesce to 48");
    assert!(alloc.check());
}

#[test]
fn grow_arena_when_no_fit() {
    let mut alloc = new_allocator();
    let (_, before_hi) = alloc.arena_bounds();

    let p = alloc.allocate(4096).unwrap().expect("a fresh arena must grow to satisfy this");
    let (_, after_hi) = alloc.arena_bounds();

    assert!(after_hi - before_hi >= 4104, "arena must grow by at least payload + overhead, aligned");
    assert_eq!(p.size(alloc.host().bytes()), segfit::align_up(4096, 8) + 8);
    assert!(!p.is_free(alloc.host().bytes()));
    assert!(alloc.check());
}

#[test]
fn extend_absorbs_a_freed_last_block() {
    let mut alloc = new_allocator();
    let a = alloc.allocate(24).unwrap().unwrap();
    alloc.free(Some(a));

    let (_, before_hi) = alloc.arena_bounds();
    let grown = alloc.allocate(4096).unwrap().expect("growth must succeed");
    let (_, after_hi) = alloc.arena_bounds();

    assert_eq!(grown, a, "the freed last block must be reused in place, not orphaned");
    assert!(after_hi - before_hi < 4096, "only the shortfall past the freed block's size should be requested");
    assert!(!grown.is_free(alloc.host().bytes()));
    assert!(alloc.check());
}

#[test]
fn realloc_absorbs_a_free_next_neighbor() {
    let mut alloc = new_allocator();
    let a = alloc.allocate(24).unwrap().unwrap();
    let b = alloc.allocate(24).unwrap().unwrap();
    alloc.free(Some(b));

    let grown = alloc.realloc(Some(a), 40).unwrap().expect("realloc must succeed in place");
    assert_eq!(grown, a, "forward absorption must not move the block");
    assert!(alloc.check());
}

#[test]
fn realloc_grows_the_last_block_in_place() {
    let mut alloc = new_allocator();
    let a = alloc.allocate(32).unwrap().unwrap();

    let grown = alloc.realloc(Some(a), 10_000).unwrap().expect("growing the last block must succeed");
    assert_eq!(grown, a);
    assert!(grown.size(alloc.host().bytes()) >= segfit::align_up(10_000, 8) + 8);
    assert!(alloc.check());
}

#[test]
fn allocate_zero_returns_null_and_touches_nothing() {
    let mut alloc = new_allocator();
    let (_, before_hi) = alloc.arena_bounds();
    assert!(alloc.allocate(0).unwrap().is_none());
    let (_, after_hi) = alloc.arena_bounds();
    assert_eq!(before_hi, after_hi);
}

#[test]
fn lifo_reuse_returns_the_same_address() {
    let mut alloc = new_allocator();
    let p1 = alloc.allocate(24).unwrap().unwrap();
    alloc.free(Some(p1));
    let p2 = alloc.allocate(24).unwrap().unwrap();
    assert_eq!(p1, p2);
}

#[test]
fn realloc_to_same_size_is_a_no_op() {
    let mut alloc = new_allocator();
    let p = alloc.allocate(40).unwrap().unwrap();
    let payload = alloc.payload_size(p);
    let same = alloc.realloc(Some(p), payload).unwrap().unwrap();
    assert_eq!(same, p);
    assert_eq!(alloc.payload_size(same), payload);
}

#[test]
fn realloc_to_zero_frees_and_returns_none() {
    let mut alloc = new_allocator();
    let p = alloc.allocate(16).unwrap().unwrap();
    assert!(alloc.realloc(Some(p), 0).unwrap().is_none());
    assert!(p.is_free(alloc.host().bytes()));
}

#[test]
fn realloc_of_null_is_allocate() {
    let mut alloc = new_allocator();
    let p = alloc.realloc(None, 16).unwrap().expect("realloc(None, n) behaves as allocate(n)");
    assert!(!p.is_free(alloc.host().bytes()));
}

#[test]
fn exhausted_host_surfaces_as_an_error() {
    let mut alloc = Allocator::new(VecHost::with_limit(512));
    alloc.init().expect("init fits the limit");
    let err = alloc.allocate(10_000).expect_err("a 10 KiB request must exceed the 512 byte cap");
    assert!(matches!(err, segfit::ArenaError::Exhausted { .. }));
}
