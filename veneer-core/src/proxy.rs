//! The erased wrapper and its construction entry points.

use core::fmt;
use core::marker::PhantomData;
use core::mem::{align_of, size_of, MaybeUninit};
use core::ptr::NonNull;

use crate::metadata::{CastSlot, Metadata, MetaCell};
use crate::ptr::{PtrConst, PtrMut, PtrUninit};
use crate::storage::InplaceStorage;
use crate::{ConvProject, CopyableFacade, Facade, Proxiable, ThreadSafeFacade};

#[cfg(feature = "alloc")]
use crate::storage::{AllocStorage, CompactStorage, GlobalAllocator, RawAllocator};

/// Whether storage `S` is eligible for facade `F`'s in-place buffer.
///
/// Checks both the actual buffer layout and the facade's declared layout
/// constraints; fully const-foldable, so the branch in [`make_proxy`]
/// disappears at compile time.
pub const fn fits_in_space<S, F: Facade>() -> bool {
    size_of::<S>() <= size_of::<F::Space>()
        && align_of::<S>() <= align_of::<F::Space>()
        && F::CONSTRAINTS.fits(size_of::<S>(), align_of::<S>())
}

/// A value of some erased type, dispatched through facade `F`.
///
/// Either *empty* (fresh, reset, or moved out of) or *engaged*: holding a
/// storage strategy in its buffer and a metadata binding describing it.
/// Invoking a convention operation on an empty wrapper panics; everything
/// else (queries, reset, re-engagement, drop) is valid in both states.
///
/// Not `Send`/`Sync` by default, since the thread affinity of the erased
/// value is unknown; facades declare `threading = required;` to demand
/// `Send + Sync` of everything they bind and get a sendable wrapper.
pub struct Proxy<F: Facade> {
    meta: F::MetaCell,
    space: MaybeUninit<F::Space>,
    phantom: PhantomData<*mut ()>,
}

// SAFETY: a ThreadSafeFacade binds only Send + Sync storages.
unsafe impl<F: ThreadSafeFacade> Send for Proxy<F> {}
// SAFETY: same bound; shared access only reaches the value through &self.
unsafe impl<F: ThreadSafeFacade> Sync for Proxy<F> {}

impl<F: Facade> Proxy<F> {
    /// An empty wrapper.
    pub const fn new() -> Self {
        Self {
            meta: <F::MetaCell as MetaCell<F::Conventions>>::EMPTY,
            space: MaybeUninit::uninit(),
            phantom: PhantomData,
        }
    }

    /// Engage with an already-built storage strategy.
    ///
    /// This is the primitive the construction entry points funnel through;
    /// it also records the (facade, value, storage) triple with the cast
    /// registry the first time each combination is seen.
    ///
    /// Panics if `S` does not fit the facade's buffer; prefer
    /// [`make_proxy`], which picks a fitting strategy instead.
    pub fn from_storage<S: Proxiable<F>>(storage: S) -> Self {
        assert!(
            fits_in_space::<S, F>(),
            "storage does not fit the facade's in-place buffer"
        );
        #[cfg(feature = "std")]
        crate::registry::register::<F, S>();
        crate::trace!(
            "engaging {} with {}",
            core::any::type_name::<F>(),
            core::any::type_name::<S>()
        );
        let mut this = Self::new();
        // SAFETY: fit checked above; the buffer is fresh.
        unsafe {
            this.space_uninit().put(storage);
        }
        this.meta = <F::MetaCell as MetaCell<F::Conventions>>::bind(S::METADATA);
        this
    }

    /// Whether a value is currently bound.
    pub fn has_value(&self) -> bool {
        self.meta.get().is_some()
    }

    /// The opposite of [`has_value`](Self::has_value).
    pub fn is_empty(&self) -> bool {
        self.meta.get().is_none()
    }

    /// Destroy the bound value, if any, leaving the wrapper empty.
    pub fn reset(&mut self) {
        let Some(meta) = self.meta.get() else { return };
        let drop_fn = meta.lifetime.drop;
        // Clear first: if the drop unwinds, the wrapper must not try again.
        self.meta.clear();
        if let Some(drop_fn) = drop_fn {
            // SAFETY: the buffer held a live storage for this metadata.
            unsafe { drop_fn(self.space_mut()) };
        }
    }

    /// Destroy the bound value, if any, then bind `value` in place.
    ///
    /// Unlike [`make_proxy`] there is no heap fallback: `value` must fit
    /// the buffer.
    pub fn emplace<T>(&mut self, value: T)
    where
        InplaceStorage<T>: Proxiable<F>,
    {
        const {
            assert!(
                fits_in_space::<InplaceStorage<T>, F>(),
                "value does not fit the facade's in-place buffer"
            )
        };
        self.reset();
        *self = Self::from_storage(InplaceStorage::new(value));
    }

    /// Move the wrapper out, leaving `self` empty.
    pub fn take(&mut self) -> Self {
        core::mem::replace(self, Self::new())
    }

    /// Exchange contents with another wrapper of the same facade.
    pub fn swap(&mut self, other: &mut Self) {
        core::mem::swap(self, other);
    }

    /// Convention slots plus value-storage pointer for `&self` dispatch.
    ///
    /// The slots were built against the same storage type the pointer leads
    /// to; generated accessors pass the pointer straight into a slot.
    ///
    /// Panics when empty.
    pub fn dispatch_ref<C: Copy + 'static>(&self) -> (C, PtrConst<'_>)
    where
        F: ConvProject<C>,
    {
        let conv = *F::project(&self.expect_meta().conventions);
        (conv, self.space_const())
    }

    /// Convention slots plus value-storage pointer for `&mut self` dispatch.
    ///
    /// Panics when empty.
    pub fn dispatch_mut<C: Copy + 'static>(&mut self) -> (C, PtrMut<'_>)
    where
        F: ConvProject<C>,
    {
        let conv = *F::project(&self.expect_meta().conventions);
        (conv, self.space_mut())
    }

    /// Convention slots plus value-storage pointer for consuming dispatch.
    ///
    /// The wrapper is left empty *before* the slot runs; the slot must move
    /// the storage out of the buffer. Panics when empty.
    pub fn dispatch_consume<C: Copy + 'static>(&mut self) -> (C, PtrMut<'_>)
    where
        F: ConvProject<C>,
    {
        let conv = *F::project(&self.expect_meta().conventions);
        self.meta.clear();
        (conv, self.space_mut())
    }

    #[track_caller]
    fn expect_meta(&self) -> &Metadata<F::Conventions> {
        match self.meta.get() {
            Some(meta) => meta,
            None => empty_dispatch::<F>(),
        }
    }

    pub(crate) fn cast_slot(&self) -> Option<CastSlot> {
        self.meta.get().map(|meta| meta.cast)
    }

    pub(crate) fn clear_meta(&mut self) {
        self.meta.clear();
    }

    /// Bind the cell to an erased metadata pointer recovered from the cast
    /// registry.
    ///
    /// # Safety
    ///
    /// `meta` must point at a `'static` `Metadata<F::Conventions>` whose
    /// storage type currently occupies this wrapper's buffer.
    pub(crate) unsafe fn bind_meta_raw(&mut self, meta: *const ()) {
        let meta = unsafe { &*(meta as *const Metadata<F::Conventions>) };
        self.meta = <F::MetaCell as MetaCell<F::Conventions>>::bind(meta);
    }

    pub(crate) fn space_const(&self) -> PtrConst<'_> {
        PtrConst::new(NonNull::from(&self.space).cast())
    }

    pub(crate) fn space_mut(&mut self) -> PtrMut<'_> {
        PtrMut::new(NonNull::from(&mut self.space).cast())
    }

    pub(crate) fn space_uninit(&mut self) -> PtrUninit<'_> {
        PtrUninit::new(NonNull::from(&mut self.space).cast())
    }
}

#[cold]
#[track_caller]
fn empty_dispatch<F: Facade>() -> ! {
    panic!(
        "operation invoked through an empty Proxy<{}>",
        core::any::type_name::<F>()
    )
}

impl<F: Facade> Drop for Proxy<F> {
    fn drop(&mut self) {
        self.reset();
    }
}

impl<F: Facade> Default for Proxy<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: CopyableFacade> Clone for Proxy<F> {
    fn clone(&self) -> Self {
        let Some(meta) = self.meta.get() else {
            return Self::new();
        };
        let clone_fn = match meta.lifetime.clone {
            Some(f) => f,
            // CopyableFacade: the clone slot is always populated.
            None => unreachable!(),
        };
        let mut out = Self::new();
        // SAFETY: self is engaged and out's buffer has the same capacity;
        // the cell is set only after the slot succeeds.
        unsafe { clone_fn(self.space_const(), out.space_uninit()) };
        out.meta = self.meta;
        out
    }
}

impl<F: Facade> fmt::Debug for Proxy<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.meta.get() {
            Some(meta) => write!(
                f,
                "Proxy<{}>({})",
                core::any::type_name::<F>(),
                meta.cast.value_type.name()
            ),
            None => write!(f, "Proxy<{}>(<empty>)", core::any::type_name::<F>()),
        }
    }
}

/// Erase `value` behind facade `F`.
///
/// Picks the in-place strategy when the value fits the facade's buffer and
/// constraints, the global-allocator strategy otherwise. The choice is made
/// at compile time per value type.
#[cfg(feature = "alloc")]
pub fn make_proxy<F, T>(value: T) -> Proxy<F>
where
    F: Facade,
    T: 'static,
    InplaceStorage<T>: Proxiable<F>,
    AllocStorage<T, GlobalAllocator>: Proxiable<F>,
{
    if const { fits_in_space::<InplaceStorage<T>, F>() } {
        Proxy::from_storage(InplaceStorage::new(value))
    } else {
        Proxy::from_storage(AllocStorage::new_in(GlobalAllocator, value))
    }
}

/// Erase `value` behind facade `F`, in place, no heap fallback.
///
/// Fails to compile when the value does not fit the facade's buffer.
pub fn make_proxy_inplace<F, T>(value: T) -> Proxy<F>
where
    F: Facade,
    T: 'static,
    InplaceStorage<T>: Proxiable<F>,
{
    const {
        assert!(
            fits_in_space::<InplaceStorage<T>, F>(),
            "value does not fit the facade's in-place buffer"
        )
    };
    Proxy::from_storage(InplaceStorage::new(value))
}

/// Erase `value` behind facade `F`, heap-allocating from `alloc`.
///
/// Uses the two-field strategy (handle and pointer in the buffer) when it
/// fits, the compact strategy (one pointer, handle in the block) otherwise.
#[cfg(feature = "alloc")]
pub fn allocate_proxy<F, T, A>(alloc: A, value: T) -> Proxy<F>
where
    F: Facade,
    T: 'static,
    A: RawAllocator,
    AllocStorage<T, A>: Proxiable<F>,
    CompactStorage<T, A>: Proxiable<F>,
{
    if const { fits_in_space::<AllocStorage<T, A>, F>() } {
        Proxy::from_storage(AllocStorage::new_in(alloc, value))
    } else {
        Proxy::from_storage(CompactStorage::new_in(alloc, value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraint::{ConstraintLevel, Constraints};
    use crate::metadata::{CastSlot, LifetimeSlots, MetaRef};
    use crate::space::DefaultSpace;
    use crate::storage::{CloneableStorage, ErasedStorage, StorageKind};

    // A facade with no conventions, bound by hand: any storage qualifies.
    enum Opaque {}

    unsafe impl Facade for Opaque {
        type Conventions = ();
        type Space = DefaultSpace;
        type MetaCell = MetaRef<()>;
        const CONSTRAINTS: Constraints = Constraints::DEFAULT;
    }

    unsafe impl<S: ErasedStorage> Proxiable<Opaque> for S {
        const METADATA: &'static Metadata<()> = &const {
            Metadata {
                lifetime: LifetimeSlots::for_storage::<S>(ConstraintLevel::Nothrow),
                cast: CastSlot::for_storage::<S>(),
                conventions: (),
            }
        };
    }

    impl ConvProject<()> for Opaque {
        fn project(conventions: &()) -> &() {
            conventions
        }
    }

    // Same, but copyable.
    enum OpaqueClone {}

    unsafe impl Facade for OpaqueClone {
        type Conventions = ();
        type Space = DefaultSpace;
        type MetaCell = MetaRef<()>;
        const CONSTRAINTS: Constraints = crate::constraint::ConstraintsBuilder::new()
            .support_copy(ConstraintLevel::Nontrivial)
            .normalize();
    }

    unsafe impl<S: CloneableStorage> Proxiable<OpaqueClone> for S {
        const METADATA: &'static Metadata<()> = &const {
            Metadata {
                lifetime: LifetimeSlots::for_cloneable::<S>(ConstraintLevel::Nothrow),
                cast: CastSlot::for_cloneable::<S>(),
                conventions: (),
            }
        };
    }

    unsafe impl CopyableFacade for OpaqueClone {}

    // Neither facade opts into ThreadSafeFacade, so the raw-pointer marker
    // field must keep the wrapper off other threads.
    static_assertions::assert_not_impl_any!(Proxy<Opaque>: Send, Sync);
    static_assertions::assert_not_impl_any!(Proxy<OpaqueClone>: Send, Sync);

    #[test]
    fn starts_empty() {
        veneer_testhelpers::setup();

        let p = Proxy::<Opaque>::new();
        assert!(p.is_empty());
        assert!(!p.has_value());
        assert_eq!(p.type_token(), crate::TypeToken::UNIT);
    }

    #[test]
    fn small_values_go_in_place() {
        veneer_testhelpers::setup();

        let p = make_proxy::<Opaque, u64>(7);
        assert!(p.has_value());
        assert_eq!(p.downcast_ref::<u64>().copied(), Ok(7));
        assert!(
            const { fits_in_space::<InplaceStorage<u64>, Opaque>() },
            "u64 should fit a two-pointer buffer"
        );
    }

    #[test]
    fn big_values_take_the_heap_path() {
        veneer_testhelpers::setup();

        type Big = [u64; 8];
        assert!(!const { fits_in_space::<InplaceStorage<Big>, Opaque>() });
        let p = make_proxy::<Opaque, Big>([9; 8]);
        assert_eq!(p.downcast_ref::<Big>().map(|v| v[0]), Ok(9));
    }

    #[test]
    fn reset_makes_it_empty_and_is_idempotent() {
        veneer_testhelpers::setup();

        let mut p = make_proxy::<Opaque, String>(String::from("x"));
        assert!(p.has_value());
        p.reset();
        assert!(p.is_empty());
        p.reset();
        assert!(p.is_empty());
    }

    #[test]
    fn take_moves_the_binding() {
        veneer_testhelpers::setup();

        let mut p = make_proxy::<Opaque, u32>(5);
        let q = p.take();
        assert!(p.is_empty());
        assert_eq!(q.downcast_ref::<u32>().copied(), Ok(5));
    }

    #[test]
    fn swap_exchanges_bindings() {
        veneer_testhelpers::setup();

        let mut a = make_proxy::<Opaque, u32>(1);
        let mut b = Proxy::<Opaque>::new();
        a.swap(&mut b);
        assert!(a.is_empty());
        assert_eq!(b.downcast_ref::<u32>().copied(), Ok(1));
    }

    #[test]
    fn emplace_replaces_the_value() {
        veneer_testhelpers::setup();

        let mut p = make_proxy::<Opaque, u32>(1);
        p.emplace(2u64);
        assert!(p.type_token().is::<u64>());
        assert_eq!(p.downcast_ref::<u64>().copied(), Ok(2));
    }

    #[test]
    fn clone_copies_the_value() {
        veneer_testhelpers::setup();

        let p = make_proxy::<OpaqueClone, String>(String::from("twice"));
        let q = p.clone();
        assert_eq!(p.downcast_ref::<String>().map(String::as_str), Ok("twice"));
        assert_eq!(q.downcast_ref::<String>().map(String::as_str), Ok("twice"));
        let empty = Proxy::<OpaqueClone>::new();
        assert!(empty.clone().is_empty());
    }

    #[test]
    fn allocate_proxy_uses_the_given_allocator() {
        veneer_testhelpers::setup();

        let p = allocate_proxy::<Opaque, String, GlobalAllocator>(
            GlobalAllocator,
            String::from("boxed"),
        );
        assert_eq!(p.downcast_ref::<String>().map(String::as_str), Ok("boxed"));
    }

    #[test]
    fn debug_shows_state() {
        veneer_testhelpers::setup();

        let p = make_proxy::<Opaque, u32>(3);
        let s = format!("{p:?}");
        assert!(s.contains("u32"), "{s}");
        let e = Proxy::<Opaque>::new();
        assert!(format!("{e:?}").contains("<empty>"));
    }

    #[test]
    fn drop_runs_the_value_destructor() {
        veneer_testhelpers::setup();

        use core::sync::atomic::{AtomicUsize, Ordering};
        static DROPS: AtomicUsize = AtomicUsize::new(0);
        struct Probe;
        impl Drop for Probe {
            fn drop(&mut self) {
                DROPS.fetch_add(1, Ordering::SeqCst);
            }
        }
        drop(make_proxy::<Opaque, Probe>(Probe));
        assert_eq!(DROPS.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn downcast_round_trip() {
        veneer_testhelpers::setup();

        let p = make_proxy::<Opaque, String>(String::from("mine"));
        let p = match p.downcast::<u32>() {
            Ok(_) => panic!("wrong type must not succeed"),
            Err(p) => p,
        };
        assert!(p.has_value());
        assert_eq!(p.downcast::<String>().ok().as_deref(), Some("mine"));
    }

    #[test]
    fn downcast_mut_edits_in_place() {
        veneer_testhelpers::setup();

        let mut p = make_proxy::<Opaque, String>(String::from("a"));
        p.downcast_mut::<String>().unwrap().push('b');
        assert_eq!(p.downcast_ref::<String>().map(String::as_str), Ok("ab"));
        assert!(p.downcast_mut::<u32>().is_err());
    }

    #[test]
    #[should_panic(expected = "empty Proxy")]
    fn dispatching_through_empty_panics() {
        veneer_testhelpers::setup();

        let p = Proxy::<Opaque>::new();
        let _ = p.dispatch_ref::<()>();
    }

    #[test]
    fn remove_proxy_moves_the_value_out() {
        veneer_testhelpers::setup();

        let p = make_proxy::<Opaque, String>(String::from("taken"));
        let s: String = unsafe { crate::remove_proxy::<String, Opaque>(p) };
        assert_eq!(s, "taken");
    }
}
