//! Reflection slots: per-storage constants readable through the wrapper.

use core::alloc::Layout;
use core::ptr::NonNull;
use core::sync::atomic::{AtomicUsize, Ordering};

use veneer::prelude::*;

facade! {
    /// Reports how and at what layout its value is stored.
    facade Stored {
        reflect kind: StorageKind;
        reflect layout: Layout;
        direct convention Ping {
            fn ping(&self) -> u8;
        }
    }
}

impl Ping for u16 {
    fn ping(&self) -> u8 {
        1
    }
}

struct Chunk([u64; 6]);

impl Ping for Chunk {
    fn ping(&self) -> u8 {
        self.0[0] as u8
    }
}

#[repr(align(32))]
struct Overaligned(u8);

impl Ping for Overaligned {
    fn ping(&self) -> u8 {
        self.0
    }
}

/// An allocator handle too wide for the buffer next to a pointer; forces
/// the single-pointer compact strategy.
#[derive(Clone)]
struct PaddedAllocator {
    #[allow(dead_code)]
    pad: [usize; 3],
}

impl RawAllocator for PaddedAllocator {
    fn allocate(&self, layout: Layout) -> NonNull<u8> {
        GlobalAllocator.allocate(layout)
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        unsafe { GlobalAllocator.deallocate(ptr, layout) }
    }
}

// ---------------------------------------------------------------------------

#[test]
fn in_place_storage_is_reported() {
    veneer_testhelpers::setup();

    let p: Proxy<Stored> = make_proxy(7u16);
    assert_eq!(p.ping(), 1);
    assert_eq!(p.kind(), StorageKind::Inplace);
    assert_eq!(p.layout(), Layout::new::<u16>());
}

#[test]
fn oversized_values_report_the_allocated_strategy() {
    veneer_testhelpers::setup();

    let p: Proxy<Stored> = make_proxy(Chunk([2; 6]));
    assert_eq!(p.ping(), 2);
    assert_eq!(p.kind(), StorageKind::Allocated);
    // The layout reflects the value, not the storage shell.
    assert_eq!(p.layout(), Layout::new::<Chunk>());
    assert_eq!(p.layout().size(), 48);
}

#[test]
fn overaligned_values_take_the_heap_path() {
    veneer_testhelpers::setup();

    let p: Proxy<Stored> = make_proxy(Overaligned(9));
    assert_eq!(p.ping(), 9);
    assert_eq!(p.kind(), StorageKind::Allocated);
    assert_eq!(p.layout().align(), 32);
}

#[test]
fn explicit_allocation_is_reported() {
    veneer_testhelpers::setup();

    let p: Proxy<Stored> = allocate_proxy(GlobalAllocator, 7u16);
    assert_eq!(p.kind(), StorageKind::Allocated);
    assert_eq!(p.layout(), Layout::new::<u16>());
    assert_eq!(p.ping(), 1);
}

#[test]
fn wide_allocator_handles_fall_back_to_compact_storage() {
    veneer_testhelpers::setup();

    let p: Proxy<Stored> = allocate_proxy(PaddedAllocator { pad: [0; 3] }, 7u16);
    assert_eq!(p.kind(), StorageKind::Compact);
    assert_eq!(p.layout(), Layout::new::<u16>());
    assert_eq!(p.ping(), 1);
}

#[test]
#[should_panic(expected = "empty Proxy")]
fn reflection_through_an_empty_wrapper_panics() {
    veneer_testhelpers::setup();

    let p = Proxy::<Stored>::new();
    let _ = p.kind();
}

// ---------------------------------------------------------------------------
// Allocator plumbing observed end to end
// ---------------------------------------------------------------------------

#[derive(Clone)]
struct CountingAllocator {
    allocs: &'static AtomicUsize,
}

impl RawAllocator for CountingAllocator {
    fn allocate(&self, layout: Layout) -> NonNull<u8> {
        self.allocs.fetch_add(1, Ordering::SeqCst);
        GlobalAllocator.allocate(layout)
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        unsafe { GlobalAllocator.deallocate(ptr, layout) }
    }
}

#[test]
fn allocate_proxy_uses_the_given_allocator() {
    veneer_testhelpers::setup();
    static ALLOCS: AtomicUsize = AtomicUsize::new(0);

    let alloc = CountingAllocator { allocs: &ALLOCS };
    let p: Proxy<Stored> = allocate_proxy(alloc, 7u16);
    assert_eq!(ALLOCS.load(Ordering::SeqCst), 1);
    assert_eq!(p.kind(), StorageKind::Allocated);
    drop(p);
}
