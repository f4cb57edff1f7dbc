//! The process-wide cast registry.
//!
//! Rust has no way to look a facade up from a value type alone, so every
//! engagement records its (facade, value type, storage strategy) triple
//! here. A later [`cast_copy`] or [`cast_move`] into some other facade
//! succeeds exactly when that facade was seen (or pre-registered) with the
//! same value type and a compatible storage.
//!
//! The table is append-only and guarded by a single mutex; entry thunks are
//! copied out under the lock and invoked outside it, so user code (clone
//! and allocator implementations) never runs while the registry is held.

use std::collections::HashMap;
use std::ptr::NonNull;
use std::sync::{Mutex, OnceLock};

use crate::metadata::Metadata;
use crate::proxy::Proxy;
use crate::ptr::{PtrConst, PtrMut, PtrUninit};
use crate::storage::{
    AllocStorage, GlobalAllocator, InplaceStorage, RawAllocator, StorageKind,
};
use crate::token::TypeToken;
use crate::{Facade, Proxiable};

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
struct CastKey {
    facade: TypeToken,
    value: TypeToken,
}

/// Erased `&'static Metadata<_>`; the facade token in the key recovers the
/// conventions type.
#[derive(Clone, Copy)]
struct ErasedMeta(*const ());

// SAFETY: points at a promoted metadata constant; immutable and 'static.
unsafe impl Send for ErasedMeta {}
unsafe impl Sync for ErasedMeta {}

#[derive(Clone, Copy)]
struct CastEntry {
    meta: ErasedMeta,
    kind: StorageKind,
    allocator: TypeToken,
    adopt: unsafe fn(PtrUninit<'_>, PtrMut<'_>, PtrConst<'_>),
    clone_value: Option<unsafe fn(PtrUninit<'_>, PtrConst<'_>, PtrConst<'_>)>,
}

static REGISTRY: OnceLock<Mutex<HashMap<CastKey, Vec<CastEntry>>>> = OnceLock::new();

fn table() -> &'static Mutex<HashMap<CastKey, Vec<CastEntry>>> {
    REGISTRY.get_or_init(|| Mutex::new(HashMap::new()))
}

/// Record the (facade, value, storage) triple, once.
///
/// Called on every engagement; duplicate (storage kind, allocator) entries
/// for a key are dropped under the same lock that guards insertion, so
/// concurrent first engagements cannot double-insert.
pub(crate) fn register<F: Facade, S: Proxiable<F>>() {
    assert!(
        crate::proxy::fits_in_space::<S, F>(),
        "storage does not fit the facade's in-place buffer"
    );
    let meta: &'static Metadata<F::Conventions> = S::METADATA;
    let slot = meta.cast;
    let key = CastKey {
        facade: TypeToken::of::<F>(),
        value: slot.value_type,
    };
    let entry = CastEntry {
        meta: ErasedMeta(meta as *const Metadata<F::Conventions> as *const ()),
        kind: slot.kind,
        allocator: slot.allocator,
        adopt: slot.adopt,
        clone_value: slot.clone_value,
    };
    let mut table = table().lock().unwrap_or_else(|e| e.into_inner());
    let entries = table.entry(key).or_default();
    if entries
        .iter()
        .any(|e| e.kind == entry.kind && e.allocator == entry.allocator)
    {
        return;
    }
    crate::trace!(
        "registering {:?} storage of {} under {}",
        entry.kind,
        slot.value_type.name(),
        std::any::type_name::<F>()
    );
    entries.push(entry);
}

/// Pre-register the in-place strategy for `(F, T)`, so casts into `F` can
/// succeed before any `Proxy<F>` of a `T` was ever constructed.
pub fn register_inplace<F, T>()
where
    F: Facade,
    T: 'static,
    InplaceStorage<T>: Proxiable<F>,
{
    register::<F, InplaceStorage<T>>();
}

/// Pre-register the allocated strategy for `(F, T)` under allocator `A`.
pub fn register_allocated<F, T, A>()
where
    F: Facade,
    T: 'static,
    A: RawAllocator,
    AllocStorage<T, A>: Proxiable<F>,
{
    register::<F, AllocStorage<T, A>>();
}

fn find_entry<NF: Facade, A: RawAllocator>(
    value: TypeToken,
    eligible: impl Fn(&CastEntry) -> bool,
) -> Option<CastEntry> {
    let key = CastKey {
        facade: TypeToken::of::<NF>(),
        value,
    };
    let requested = TypeToken::of::<A>();
    let table = table().lock().unwrap_or_else(|e| e.into_inner());
    let entries = table.get(&key)?;
    entries
        .iter()
        .find(|e| {
            // In-place entries need no allocator; heap entries only match
            // the allocator type they were registered with.
            (e.kind == StorageKind::Inplace || e.allocator == requested) && eligible(e)
        })
        .copied()
}

/// Copy the value bound in `source` into a fresh wrapper under facade `NF`,
/// allocating (if the registered strategy needs to) from the global
/// allocator.
///
/// `None` when `source` is empty, when `(NF, value type)` was never
/// registered with a compatible storage, or when the registered entry has
/// no copy support.
pub fn cast_copy<NF, F>(source: &Proxy<F>) -> Option<Proxy<NF>>
where
    NF: Facade,
    F: Facade,
{
    cast_copy_in::<NF, F, GlobalAllocator>(source, &GlobalAllocator)
}

/// [`cast_copy`] with an explicit allocator; only in-place entries and heap
/// entries registered under `A` are eligible.
pub fn cast_copy_in<NF, F, A>(source: &Proxy<F>, alloc: &A) -> Option<Proxy<NF>>
where
    NF: Facade,
    F: Facade,
    A: RawAllocator,
{
    let slot = source.cast_slot()?;
    let entry = find_entry::<NF, A>(slot.value_type, |e| e.clone_value.is_some())?;
    let clone_value = entry.clone_value?;
    let mut out = Proxy::<NF>::new();
    let alloc_ptr = PtrConst::new(NonNull::from(alloc).cast());
    // SAFETY: the entry was registered for (NF, this value type), its
    // storage was fit-checked at registration, and its allocator token
    // matched A above; the source value is only read.
    unsafe {
        let value_addr = (slot.object_addr)(source.space_const());
        clone_value(out.space_uninit(), value_addr, alloc_ptr);
        out.bind_meta_raw(entry.meta.0);
    }
    crate::trace!(
        "cast_copy of {} into {}",
        slot.value_type.name(),
        std::any::type_name::<NF>()
    );
    Some(out)
}

/// Move the value bound in `source` into a fresh wrapper under facade `NF`,
/// leaving `source` empty. `None` (with `source` untouched) when `source`
/// is empty or `(NF, value type)` was never registered with a compatible
/// storage.
pub fn cast_move<NF, F>(source: &mut Proxy<F>) -> Option<Proxy<NF>>
where
    NF: Facade,
    F: Facade,
{
    cast_move_in::<NF, F, GlobalAllocator>(source, &GlobalAllocator)
}

/// [`cast_move`] with an explicit allocator; only in-place entries and heap
/// entries registered under `A` are eligible.
pub fn cast_move_in<NF, F, A>(source: &mut Proxy<F>, alloc: &A) -> Option<Proxy<NF>>
where
    NF: Facade,
    F: Facade,
    A: RawAllocator,
{
    let slot = source.cast_slot()?;
    let entry = find_entry::<NF, A>(slot.value_type, |_| true)?;
    let mut out = Proxy::<NF>::new();
    let alloc_ptr = PtrConst::new(NonNull::from(alloc).cast());
    // Disengage before running thunks: if one unwinds, the source must not
    // re-drop a value that may already have been moved out.
    source.clear_meta();
    // SAFETY: as in cast_copy, plus: adopt takes ownership of the value and
    // consume then releases the source storage shell around the hole.
    unsafe {
        let value_addr = (slot.object_addr)(source.space_mut().as_const());
        (entry.adopt)(out.space_uninit(), value_addr.assume_mut(), alloc_ptr);
        (slot.consume)(source.space_mut());
        out.bind_meta_raw(entry.meta.0);
    }
    crate::trace!(
        "cast_move of {} into {}",
        slot.value_type.name(),
        std::any::type_name::<NF>()
    );
    Some(out)
}
