//! Dispatch metadata: the per-(facade, storage) constant a wrapper points
//! at while engaged.
//!
//! One [`Metadata`] exists per facade/storage pair, produced in const
//! context by the binding machinery and promoted to `'static`. It bundles
//! the facade's convention slots with the lifetime and cast entry points of
//! the concrete storage strategy, so the wrapper itself stays two words of
//! state: a metadata cell and an opaque buffer.

use core::mem::{align_of, needs_drop, size_of};

use crate::constraint::ConstraintLevel;
use crate::ptr::{PtrConst, PtrMut, PtrUninit};
use crate::storage::{CloneableStorage, ErasedStorage, StorageKind};
use crate::token::TypeToken;

/// Lifetime entry points of a storage strategy, erased.
///
/// Slots for operations that are either not required by the facade or
/// trivial for the storage are absent.
#[derive(Clone, Copy)]
pub struct LifetimeSlots {
    /// Clone the storage at `src` into `dst`. Present iff the facade
    /// requires copyability.
    pub clone: Option<unsafe fn(src: PtrConst<'_>, dst: PtrUninit<'_>)>,
    /// Drop the storage in place. Absent when the storage has no drop glue.
    pub drop: Option<unsafe fn(PtrMut<'_>)>,
}

impl LifetimeSlots {
    /// Slots for a facade without copy support.
    pub const fn for_storage<S: ErasedStorage>(destructibility: ConstraintLevel) -> Self {
        Self {
            clone: None,
            drop: drop_slot::<S>(destructibility),
        }
    }

    /// Slots for a facade with copy support.
    pub const fn for_cloneable<S: CloneableStorage>(destructibility: ConstraintLevel) -> Self {
        Self {
            clone: Some(clone_storage::<S>),
            drop: drop_slot::<S>(destructibility),
        }
    }
}

const fn drop_slot<S>(destructibility: ConstraintLevel) -> Option<unsafe fn(PtrMut<'_>)> {
    if needs_drop::<S>() {
        assert!(
            destructibility as u8 != ConstraintLevel::Trivial as u8,
            "facade requires trivial destruction but the storage has drop glue"
        );
        Some(drop_storage::<S>)
    } else {
        None
    }
}

unsafe fn drop_storage<S>(this: PtrMut<'_>) {
    // SAFETY: slot contract; `this` points at a live S.
    unsafe { this.drop_in_place::<S>() }
}

unsafe fn clone_storage<S: Clone>(src: PtrConst<'_>, dst: PtrUninit<'_>) {
    // SAFETY: slot contract; `src` points at a live S, `dst` is writable
    // for S.
    let cloned = unsafe { src.get::<S>() }.clone();
    unsafe {
        dst.put(cloned);
    }
}

/// Cast and typed-access entry points of a bound storage, erased.
///
/// Everything the cast registry and the downcast family need to identify
/// the held value, reach it, and rebuild an equivalent storage elsewhere.
#[derive(Clone, Copy)]
pub struct CastSlot {
    /// Token of the held value's type.
    pub value_type: TypeToken,
    /// Size of the held value in bytes.
    pub value_size: usize,
    /// Alignment of the held value.
    pub value_align: usize,
    /// Strategy family of the storage.
    pub kind: StorageKind,
    /// Allocator token for heap strategies; [`TypeToken::UNIT`] otherwise.
    pub allocator: TypeToken,
    /// Address of the value, given the address of the storage. Computed
    /// without creating references, so the result may be written through
    /// when the caller holds write provenance.
    pub object_addr: unsafe fn(PtrConst<'_>) -> PtrConst<'_>,
    /// Tear the storage down after its value was moved out.
    pub consume: unsafe fn(PtrMut<'_>),
    /// Move-construct the storage in `dst` from a bare value and an
    /// allocator matching [`allocator`](Self::allocator).
    pub adopt: unsafe fn(dst: PtrUninit<'_>, value: PtrMut<'_>, alloc: PtrConst<'_>),
    /// Copy-construct the storage in `dst` from a borrowed value. Present
    /// iff the facade requires copyability.
    pub clone_value: Option<unsafe fn(dst: PtrUninit<'_>, value: PtrConst<'_>, alloc: PtrConst<'_>)>,
}

impl CastSlot {
    /// Entry points for a facade without copy support.
    pub const fn for_storage<S: ErasedStorage>() -> Self {
        Self {
            value_type: TypeToken::of::<S::Value>(),
            value_size: size_of::<S::Value>(),
            value_align: align_of::<S::Value>(),
            kind: S::KIND,
            allocator: S::ALLOCATOR,
            object_addr: S::value_addr,
            consume: S::consume,
            adopt: S::adopt,
            clone_value: None,
        }
    }

    /// Entry points for a facade with copy support.
    pub const fn for_cloneable<S: CloneableStorage>() -> Self {
        Self {
            value_type: TypeToken::of::<S::Value>(),
            value_size: size_of::<S::Value>(),
            value_align: align_of::<S::Value>(),
            kind: S::KIND,
            allocator: S::ALLOCATOR,
            object_addr: S::value_addr,
            consume: S::consume,
            adopt: S::adopt,
            clone_value: Some(S::clone_from_value),
        }
    }
}

/// The full per-(facade, storage) dispatch constant.
#[derive(Clone, Copy)]
pub struct Metadata<C> {
    /// Lifetime entry points of the bound storage.
    pub lifetime: LifetimeSlots,
    /// Cast and typed-access entry points of the bound storage.
    pub cast: CastSlot,
    /// The facade's convention slots, instantiated for the bound storage.
    pub conventions: C,
}

/// How a wrapper holds its metadata binding.
///
/// # Safety
///
/// Implementations must report exactly the binding history:
/// [`get`](Self::get) returns the metadata most recently passed to
/// [`bind`](Self::bind), or `None` after [`clear`](Self::clear) (or
/// initially). The wrapper's soundness rests on the cell's answer agreeing
/// with the state of the buffer next to it.
pub unsafe trait MetaCell<C: 'static>: Copy {
    /// The disengaged cell.
    const EMPTY: Self;

    /// An engaged cell.
    fn bind(meta: &'static Metadata<C>) -> Self;

    /// The bound metadata, if engaged.
    fn get(&self) -> Option<&Metadata<C>>;

    /// Disengage.
    fn clear(&mut self);
}

/// The default cell: one pointer to the promoted metadata constant.
pub struct MetaRef<C: 'static>(Option<&'static Metadata<C>>);

impl<C: 'static> Clone for MetaRef<C> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<C: 'static> Copy for MetaRef<C> {}

unsafe impl<C: 'static> MetaCell<C> for MetaRef<C> {
    const EMPTY: Self = Self(None);

    fn bind(meta: &'static Metadata<C>) -> Self {
        Self(Some(meta))
    }

    fn get(&self) -> Option<&Metadata<C>> {
        self.0
    }

    fn clear(&mut self) {
        self.0 = None;
    }
}

/// An inlined cell: the metadata is copied into the wrapper, trading
/// wrapper size for one less indirection per dispatch. Opt-in per facade.
pub struct MetaInline<C: 'static>(Option<Metadata<C>>);

impl<C: Copy + 'static> Clone for MetaInline<C> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<C: Copy + 'static> Copy for MetaInline<C> {}

unsafe impl<C: Copy + 'static> MetaCell<C> for MetaInline<C> {
    const EMPTY: Self = Self(None);

    fn bind(meta: &'static Metadata<C>) -> Self {
        Self(Some(*meta))
    }

    fn get(&self) -> Option<&Metadata<C>> {
        self.0.as_ref()
    }

    fn clear(&mut self) {
        self.0 = None;
    }
}
