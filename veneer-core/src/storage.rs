//! Storage strategies: where an erased value actually lives.
//!
//! A wrapper owns a fixed-size buffer (its facade's
//! [`Space`](crate::Facade::Space)). A storage strategy is the `Sized` type
//! placed in that buffer: either the value itself, or some handle that leads
//! to it. The dispatch layer never knows which; it goes through
//! [`ErasedStorage`] and the erased entry points recorded in metadata.

use core::alloc::Layout;
use core::mem::ManuallyDrop;
use core::ptr::NonNull;

use crate::ptr::{PtrConst, PtrMut, PtrUninit};
use crate::token::TypeToken;

/// Which storage strategy family a metadata instance was bound with.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StorageKind {
    /// The value itself lives in the wrapper buffer.
    Inplace,
    /// An allocator handle and a pointer live in the buffer; the value lives
    /// in its own heap block.
    Allocated,
    /// A single pointer lives in the buffer; allocator handle and value
    /// share one heap block.
    Compact,
    /// Non-owning pointer adapters. Reserved vocabulary: this crate ships
    /// owning strategies only.
    Raw,
}

/// Minimal allocator contract for the heap-backed strategies.
///
/// Handles are values: they are cloned into each storage that uses them, and
/// a clone must be able to deallocate blocks obtained from the original.
pub trait RawAllocator: Clone + 'static {
    /// Allocate a block for `layout`.
    ///
    /// Does not return on failure (`handle_alloc_error`). A zero-sized
    /// layout yields a dangling, well-aligned pointer and no allocation.
    fn allocate(&self, layout: Layout) -> NonNull<u8>;

    /// Release a block.
    ///
    /// # Safety
    ///
    /// `ptr` must come from [`allocate`](Self::allocate) on this allocator
    /// (or a clone of it) with the same `layout`, and must not have been
    /// deallocated already.
    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout);
}

/// The global-allocator handle: a zero-sized [`RawAllocator`] backed by
/// `alloc::alloc`.
#[cfg(feature = "alloc")]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GlobalAllocator;

#[cfg(feature = "alloc")]
impl RawAllocator for GlobalAllocator {
    fn allocate(&self, layout: Layout) -> NonNull<u8> {
        if layout.size() == 0 {
            // SAFETY: alignments are nonzero.
            return unsafe { NonNull::new_unchecked(layout.align() as *mut u8) };
        }
        // SAFETY: layout has nonzero size.
        let Some(ptr) = NonNull::new(unsafe { alloc::alloc::alloc(layout) }) else {
            alloc::alloc::handle_alloc_error(layout)
        };
        ptr
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        if layout.size() != 0 {
            // SAFETY: forwarded caller contract; ptr came from `alloc` with
            // this layout.
            unsafe { alloc::alloc::dealloc(ptr.as_ptr(), layout) };
        }
    }
}

/// Contract between a storage strategy and the dispatch layer.
///
/// The `value*` methods are the typed face, used by generated dispatch
/// thunks. The associated functions are the erased face: they receive the
/// storage by opaque pointer and are recorded as function pointers in
/// metadata, so casts and typed access can manipulate a storage they only
/// know by its metadata.
///
/// # Safety
///
/// Implementations must uphold:
///
/// - `value`, `value_mut` and `value_addr` all resolve to the same object
///   for the life of the storage;
/// - `consume` releases every resource of the storage *except* the value,
///   which the caller has already moved out;
/// - `adopt` move-constructs a valid storage of this type in `dst` from a
///   bare value, taking ownership of it;
/// - `ALLOCATOR` names the exact allocator type `adopt` expects behind its
///   `alloc` pointer (`()` when the strategy takes none).
pub unsafe trait ErasedStorage: Sized + 'static {
    /// The stored value type.
    type Value: 'static;

    /// Strategy family, recorded in metadata and registry entries.
    const KIND: StorageKind;

    /// Allocator token for heap strategies; [`TypeToken::UNIT`] otherwise.
    const ALLOCATOR: TypeToken;

    /// Borrow the stored value.
    fn value(&self) -> &Self::Value;

    /// Exclusively borrow the stored value.
    fn value_mut(&mut self) -> &mut Self::Value;

    /// Take the value out, releasing the storage's other resources.
    fn into_value(self) -> Self::Value;

    /// Address of the value, given the address of the storage.
    ///
    /// Implementations must compute this without creating references to the
    /// value, so that a caller holding write provenance over the storage may
    /// write through the result.
    ///
    /// # Safety
    ///
    /// `this` must point at a live storage of this type.
    unsafe fn value_addr(this: PtrConst<'_>) -> PtrConst<'_>;

    /// Tear the storage down after its value has been moved out.
    ///
    /// # Safety
    ///
    /// `this` must point at a storage of this type whose value has been
    /// moved out; the storage is dead afterwards.
    unsafe fn consume(this: PtrMut<'_>);

    /// Move-construct this storage in `dst` from a bare value.
    ///
    /// # Safety
    ///
    /// `dst` must be writable and aligned for `Self`; `value` must point at
    /// a live `Self::Value`, which is moved out of; `alloc` must point at a
    /// live allocator of the type named by [`ALLOCATOR`](Self::ALLOCATOR)
    /// (anything, for strategies that take none).
    unsafe fn adopt(dst: PtrUninit<'_>, value: PtrMut<'_>, alloc: PtrConst<'_>);
}

/// Storage strategies that can also be built by copying a borrowed value.
///
/// # Safety
///
/// `clone_from_value` must construct a valid storage without mutating the
/// source value, and `Clone::clone` of the storage must produce an
/// independently owned storage of the same value.
pub unsafe trait CloneableStorage: ErasedStorage + Clone {
    /// Copy-construct this storage in `dst` from a borrowed value.
    ///
    /// # Safety
    ///
    /// Same as [`ErasedStorage::adopt`], except `value` is only read
    /// through a shared borrow.
    unsafe fn clone_from_value(dst: PtrUninit<'_>, value: PtrConst<'_>, alloc: PtrConst<'_>);
}

/// The value itself, stored directly in the wrapper buffer.
#[derive(Clone)]
#[repr(transparent)]
pub struct InplaceStorage<T>(T);

impl<T: Copy> Copy for InplaceStorage<T> {}

impl<T> InplaceStorage<T> {
    /// Wrap a value.
    pub const fn new(value: T) -> Self {
        Self(value)
    }
}

unsafe impl<T: 'static> ErasedStorage for InplaceStorage<T> {
    type Value = T;
    const KIND: StorageKind = StorageKind::Inplace;
    const ALLOCATOR: TypeToken = TypeToken::UNIT;

    fn value(&self) -> &T {
        &self.0
    }

    fn value_mut(&mut self) -> &mut T {
        &mut self.0
    }

    fn into_value(self) -> T {
        self.0
    }

    unsafe fn value_addr(this: PtrConst<'_>) -> PtrConst<'_> {
        // repr(transparent): the storage address is the value address.
        this
    }

    unsafe fn consume(_this: PtrMut<'_>) {
        // The value was the only resource, and it is gone.
    }

    unsafe fn adopt(dst: PtrUninit<'_>, value: PtrMut<'_>, _alloc: PtrConst<'_>) {
        // SAFETY: caller hands over a live T and a writable slot.
        unsafe {
            let value = value.read::<T>();
            dst.put(Self(value));
        }
    }
}

unsafe impl<T: Clone + 'static> CloneableStorage for InplaceStorage<T> {
    unsafe fn clone_from_value(dst: PtrUninit<'_>, value: PtrConst<'_>, _alloc: PtrConst<'_>) {
        // SAFETY: caller guarantees a live T behind `value`.
        let value = unsafe { value.get::<T>() }.clone();
        // SAFETY: caller guarantees `dst` is writable for Self.
        unsafe {
            dst.put(Self(value));
        }
    }
}

/// Allocator handle plus pointer in the wrapper buffer; the value in its own
/// heap block.
#[cfg(feature = "alloc")]
pub struct AllocStorage<T, A: RawAllocator = GlobalAllocator> {
    ptr: NonNull<T>,
    alloc: A,
}

// SAFETY: the storage owns the pointed-to value outright.
#[cfg(feature = "alloc")]
unsafe impl<T: Send, A: RawAllocator + Send> Send for AllocStorage<T, A> {}
// SAFETY: shared access only reaches the value through &self.
#[cfg(feature = "alloc")]
unsafe impl<T: Sync, A: RawAllocator + Sync> Sync for AllocStorage<T, A> {}

#[cfg(feature = "alloc")]
impl<T, A: RawAllocator> AllocStorage<T, A> {
    /// Allocate a block from `alloc` and move `value` into it.
    pub fn new_in(alloc: A, value: T) -> Self {
        let ptr = alloc.allocate(Layout::new::<T>()).cast::<T>();
        // SAFETY: freshly allocated (or dangling for ZSTs, where the write
        // is a no-op) and aligned for T.
        unsafe { ptr.write(value) };
        Self { ptr, alloc }
    }
}

#[cfg(feature = "alloc")]
impl<T, A: RawAllocator> Drop for AllocStorage<T, A> {
    fn drop(&mut self) {
        // SAFETY: we own the block and the value in it.
        unsafe {
            self.ptr.drop_in_place();
            self.alloc.deallocate(self.ptr.cast(), Layout::new::<T>());
        }
    }
}

#[cfg(feature = "alloc")]
impl<T: Clone + 'static, A: RawAllocator> Clone for AllocStorage<T, A> {
    fn clone(&self) -> Self {
        Self::new_in(self.alloc.clone(), self.value().clone())
    }
}

#[cfg(feature = "alloc")]
unsafe impl<T: 'static, A: RawAllocator> ErasedStorage for AllocStorage<T, A> {
    type Value = T;
    const KIND: StorageKind = StorageKind::Allocated;
    const ALLOCATOR: TypeToken = TypeToken::of::<A>();

    fn value(&self) -> &T {
        // SAFETY: the block is live while self is.
        unsafe { self.ptr.as_ref() }
    }

    fn value_mut(&mut self) -> &mut T {
        // SAFETY: exclusive through &mut self.
        unsafe { self.ptr.as_mut() }
    }

    fn into_value(self) -> T {
        let this = ManuallyDrop::new(self);
        // SAFETY: `this` is never dropped; each field is read out exactly
        // once, and the block is released after the value leaves it.
        unsafe {
            let alloc = core::ptr::read(&this.alloc);
            let value = this.ptr.read();
            alloc.deallocate(this.ptr.cast(), Layout::new::<T>());
            value
        }
    }

    unsafe fn value_addr(this: PtrConst<'_>) -> PtrConst<'_> {
        let storage = this.as_byte_ptr() as *const Self;
        // SAFETY: live storage behind `this`; reading the pointer field does
        // not touch the value, and the returned pointer carries the heap
        // block's own provenance.
        let ptr = unsafe { (*storage).ptr };
        PtrConst::new(ptr.cast())
    }

    unsafe fn consume(this: PtrMut<'_>) {
        // SAFETY: caller moved the value out of the block already; only the
        // block itself and the allocator handle remain.
        let storage = ManuallyDrop::new(unsafe { this.read::<Self>() });
        unsafe {
            let alloc = core::ptr::read(&storage.alloc);
            alloc.deallocate(storage.ptr.cast(), Layout::new::<T>());
        }
    }

    unsafe fn adopt(dst: PtrUninit<'_>, value: PtrMut<'_>, alloc: PtrConst<'_>) {
        // SAFETY: caller passes a live A behind `alloc` and a live T behind
        // `value`, relinquishing the latter.
        unsafe {
            let alloc = alloc.get::<A>().clone();
            let value = value.read::<T>();
            dst.put(Self::new_in(alloc, value));
        }
    }
}

#[cfg(feature = "alloc")]
unsafe impl<T: Clone + 'static, A: RawAllocator> CloneableStorage for AllocStorage<T, A> {
    unsafe fn clone_from_value(dst: PtrUninit<'_>, value: PtrConst<'_>, alloc: PtrConst<'_>) {
        // SAFETY: caller passes a live A and a live T, the latter borrowed.
        unsafe {
            let alloc = alloc.get::<A>().clone();
            let value = value.get::<T>().clone();
            dst.put(Self::new_in(alloc, value));
        }
    }
}

#[cfg(feature = "alloc")]
struct CompactBlock<T, A> {
    alloc: A,
    value: T,
}

/// A single pointer in the wrapper buffer; allocator handle and value share
/// one heap block. For allocators too big to sit in the buffer next to a
/// pointer.
#[cfg(feature = "alloc")]
pub struct CompactStorage<T, A: RawAllocator = GlobalAllocator> {
    ptr: NonNull<CompactBlock<T, A>>,
}

// SAFETY: the storage owns the pointed-to block outright.
#[cfg(feature = "alloc")]
unsafe impl<T: Send, A: RawAllocator + Send> Send for CompactStorage<T, A> {}
// SAFETY: shared access only reaches the block through &self.
#[cfg(feature = "alloc")]
unsafe impl<T: Sync, A: RawAllocator + Sync> Sync for CompactStorage<T, A> {}

#[cfg(feature = "alloc")]
impl<T, A: RawAllocator> CompactStorage<T, A> {
    /// Allocate one block from `alloc` and move both `alloc` and `value`
    /// into it.
    pub fn new_in(alloc: A, value: T) -> Self {
        let layout = Layout::new::<CompactBlock<T, A>>();
        let ptr = alloc.allocate(layout).cast::<CompactBlock<T, A>>();
        // SAFETY: freshly allocated and aligned for the block.
        unsafe { ptr.write(CompactBlock { alloc, value }) };
        Self { ptr }
    }

    fn alloc_ref(&self) -> &A {
        // SAFETY: the block is live while self is.
        unsafe { &self.ptr.as_ref().alloc }
    }
}

#[cfg(feature = "alloc")]
impl<T, A: RawAllocator> Drop for CompactStorage<T, A> {
    fn drop(&mut self) {
        // SAFETY: we own the block. The handle is read out first so it can
        // release the block it lives in, then dropped from the stack.
        unsafe {
            let block = self.ptr.as_ptr();
            core::ptr::drop_in_place(&raw mut (*block).value);
            let alloc = core::ptr::read(&raw const (*block).alloc);
            alloc.deallocate(self.ptr.cast(), Layout::new::<CompactBlock<T, A>>());
        }
    }
}

#[cfg(feature = "alloc")]
impl<T: Clone + 'static, A: RawAllocator> Clone for CompactStorage<T, A> {
    fn clone(&self) -> Self {
        Self::new_in(self.alloc_ref().clone(), self.value().clone())
    }
}

#[cfg(feature = "alloc")]
unsafe impl<T: 'static, A: RawAllocator> ErasedStorage for CompactStorage<T, A> {
    type Value = T;
    const KIND: StorageKind = StorageKind::Compact;
    const ALLOCATOR: TypeToken = TypeToken::of::<A>();

    fn value(&self) -> &T {
        // SAFETY: the block is live while self is.
        unsafe { &self.ptr.as_ref().value }
    }

    fn value_mut(&mut self) -> &mut T {
        // SAFETY: exclusive through &mut self.
        unsafe { &mut self.ptr.as_mut().value }
    }

    fn into_value(self) -> T {
        let this = ManuallyDrop::new(self);
        // SAFETY: `this` is never dropped; value and handle are read out of
        // the block exactly once before it is released.
        unsafe {
            let block = this.ptr.as_ptr();
            let value = core::ptr::read(&raw const (*block).value);
            let alloc = core::ptr::read(&raw const (*block).alloc);
            alloc.deallocate(this.ptr.cast(), Layout::new::<CompactBlock<T, A>>());
            value
        }
    }

    unsafe fn value_addr(this: PtrConst<'_>) -> PtrConst<'_> {
        let storage = this.as_byte_ptr() as *const Self;
        // SAFETY: live storage behind `this`; raw projection into the block,
        // no references created.
        unsafe {
            let block = (*storage).ptr.as_ptr();
            let value = &raw const (*block).value;
            PtrConst::new(NonNull::new_unchecked(value as *mut u8))
        }
    }

    unsafe fn consume(this: PtrMut<'_>) {
        // SAFETY: caller moved the value out of the block already.
        let storage = ManuallyDrop::new(unsafe { this.read::<Self>() });
        unsafe {
            let block = storage.ptr.as_ptr();
            let alloc = core::ptr::read(&raw const (*block).alloc);
            alloc.deallocate(storage.ptr.cast(), Layout::new::<CompactBlock<T, A>>());
        }
    }

    unsafe fn adopt(dst: PtrUninit<'_>, value: PtrMut<'_>, alloc: PtrConst<'_>) {
        // SAFETY: caller passes a live A behind `alloc` and a live T behind
        // `value`, relinquishing the latter.
        unsafe {
            let alloc = alloc.get::<A>().clone();
            let value = value.read::<T>();
            dst.put(Self::new_in(alloc, value));
        }
    }
}

#[cfg(feature = "alloc")]
unsafe impl<T: Clone + 'static, A: RawAllocator> CloneableStorage for CompactStorage<T, A> {
    unsafe fn clone_from_value(dst: PtrUninit<'_>, value: PtrConst<'_>, alloc: PtrConst<'_>) {
        // SAFETY: caller passes a live A and a live T, the latter borrowed.
        unsafe {
            let alloc = alloc.get::<A>().clone();
            let value = value.get::<T>().clone();
            dst.put(Self::new_in(alloc, value));
        }
    }
}
