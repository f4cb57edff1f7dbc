//! The process-wide cast registry: recovering values under other facades.

use core::alloc::Layout;
use core::ptr::NonNull;
use core::sync::atomic::{AtomicUsize, Ordering};

use veneer::prelude::*;

facade! {
    /// Source side of the casts below.
    facade Inbound {
        direct convention Ingest {
            fn checksum(&self) -> u64;
        }
    }
}

facade! {
    /// Destination side; copyable, so casts may clone into it.
    facade Outbound {
        copy = nontrivial;
        direct convention Egress {
            fn emit(&self) -> String;
        }
    }
}

#[derive(Clone)]
struct Packet {
    seq: u64,
}

impl Ingest for Packet {
    fn checksum(&self) -> u64 {
        self.seq * 31
    }
}

impl Egress for Packet {
    fn emit(&self) -> String {
        format!("#{}", self.seq)
    }
}

/// Bound under `Inbound` only; no cast destination ever registers it.
struct Orphan(u64);

impl Ingest for Orphan {
    fn checksum(&self) -> u64 {
        self.0
    }
}

// ---------------------------------------------------------------------------
// Copy and move casts
// ---------------------------------------------------------------------------

#[test]
fn cast_copy_between_registered_facades() {
    veneer_testhelpers::setup();
    register_inplace::<Outbound, Packet>();

    let src: Proxy<Inbound> = make_proxy(Packet { seq: 3 });
    let out = cast_copy::<Outbound, Inbound>(&src).unwrap();
    assert_eq!(out.emit(), "#3");
    // The source is untouched.
    assert_eq!(src.checksum(), 93);
}

#[test]
fn cast_move_transfers_the_value() {
    veneer_testhelpers::setup();
    register_inplace::<Outbound, Packet>();

    let mut src: Proxy<Inbound> = make_proxy(Packet { seq: 5 });
    let out = cast_move::<Outbound, Inbound>(&mut src).unwrap();
    assert!(src.is_empty());
    assert_eq!(out.emit(), "#5");
}

#[test]
fn unregistered_types_do_not_cast() {
    veneer_testhelpers::setup();

    let mut src: Proxy<Inbound> = make_proxy(Orphan(7));
    assert!(cast_copy::<Outbound, Inbound>(&src).is_none());
    assert!(cast_move::<Outbound, Inbound>(&mut src).is_none());
    // Misses leave the source engaged.
    assert_eq!(src.checksum(), 7);
}

#[test]
fn empty_sources_do_not_cast() {
    veneer_testhelpers::setup();

    let mut src = Proxy::<Inbound>::new();
    assert!(cast_copy::<Outbound, Inbound>(&src).is_none());
    assert!(cast_move::<Outbound, Inbound>(&mut src).is_none());
}

#[test]
fn first_engagement_registers_automatically() {
    veneer_testhelpers::setup();

    // Building any Proxy<Outbound> of a Packet records the triple.
    let witness: Proxy<Outbound> = make_proxy(Packet { seq: 0 });
    drop(witness);

    let src: Proxy<Inbound> = make_proxy(Packet { seq: 8 });
    let out = cast_copy::<Outbound, Inbound>(&src).unwrap();
    assert_eq!(out.emit(), "#8");
}

#[test]
fn cast_copy_requires_copy_support_on_the_destination() {
    veneer_testhelpers::setup();
    // Inbound declares no copy support, so its registered entries carry no
    // clone entry point.
    register_inplace::<Inbound, Packet>();

    let mut src: Proxy<Outbound> = make_proxy(Packet { seq: 4 });
    assert!(cast_copy::<Inbound, Outbound>(&src).is_none());
    // Moving needs no clone support and still succeeds.
    let out = cast_move::<Inbound, Outbound>(&mut src).unwrap();
    assert_eq!(out.checksum(), 124);
}

// ---------------------------------------------------------------------------
// Allocator-qualified entries
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

/// Heap-only on both sides of the cast.
#[derive(Clone)]
struct Ledger {
    bytes: [u64; 5],
}

impl Ingest for Ledger {
    fn checksum(&self) -> u64 {
        self.bytes.iter().sum()
    }
}

impl Egress for Ledger {
    fn emit(&self) -> String {
        format!("ledger:{}", self.checksum())
    }
}

#[test]
fn heap_entries_match_only_their_allocator() {
    veneer_testhelpers::setup();
    static ALLOCS: AtomicUsize = AtomicUsize::new(0);

    register_allocated::<Outbound, Ledger, CountingAllocator>();

    let src: Proxy<Inbound> = make_proxy(Ledger { bytes: [1; 5] });
    // The only registered entry wants CountingAllocator; the global-
    // allocator cast cannot use it.
    assert!(cast_copy::<Outbound, Inbound>(&src).is_none());

    let alloc = CountingAllocator { allocs: &ALLOCS };
    let out = cast_copy_in::<Outbound, Inbound, CountingAllocator>(&src, &alloc).unwrap();
    assert!(ALLOCS.load(Ordering::SeqCst) >= 1);
    assert_eq!(out.emit(), "ledger:5");
    assert_eq!(src.checksum(), 5);
}

#[test]
fn cast_move_in_adopts_across_strategies() {
    veneer_testhelpers::setup();
    static ALLOCS: AtomicUsize = AtomicUsize::new(0);

    register_allocated::<Outbound, Ledger, CountingAllocator>();

    let mut src: Proxy<Inbound> = make_proxy(Ledger { bytes: [2; 5] });
    let alloc = CountingAllocator { allocs: &ALLOCS };
    let out = cast_move_in::<Outbound, Inbound, CountingAllocator>(&mut src, &alloc).unwrap();
    assert!(src.is_empty());
    assert_eq!(out.emit(), "ledger:10");
}

// ---------------------------------------------------------------------------
// Concurrency
// ---------------------------------------------------------------------------

#[test]
fn registrations_race_safely() {
    veneer_testhelpers::setup();

    std::thread::scope(|s| {
        for seq in 0..8u64 {
            s.spawn(move || {
                register_inplace::<Outbound, Packet>();
                let src: Proxy<Inbound> = make_proxy(Packet { seq });
                let out = cast_copy::<Outbound, Inbound>(&src).unwrap();
                assert_eq!(out.emit(), format!("#{seq}"));
            });
        }
    });
}
