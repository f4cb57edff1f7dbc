//! Opaque pointers
//!
//! Type-erased pointer wrappers the dispatch slots and storage thunks trade
//! in. Everything stored behind a facade is `Sized`, so these are thin: a
//! `NonNull<u8>` plus a lifetime tying the pointer to the borrow it came
//! from. The type of the pointee travels out of band, in the metadata that
//! accompanies the pointer.

use core::{fmt, marker::PhantomData, ptr::NonNull};

/// A pointer to uninitialized memory, with a lifetime.
#[repr(transparent)]
#[derive(Clone, Copy)]
pub struct PtrUninit<'mem> {
    ptr: NonNull<u8>,
    phantom: PhantomData<&'mem mut u8>,
}

impl fmt::Debug for PtrUninit<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.ptr.as_ptr().fmt(f)
    }
}

impl<'mem> PtrUninit<'mem> {
    /// Create an opaque pointer to uninitialized memory.
    #[inline]
    pub const fn new(ptr: NonNull<u8>) -> Self {
        Self {
            ptr,
            phantom: PhantomData,
        }
    }

    /// The raw byte pointer.
    #[inline]
    pub const fn as_mut_byte_ptr(self) -> *mut u8 {
        self.ptr.as_ptr()
    }

    /// Write a value to this location.
    ///
    /// # Safety
    ///
    /// The pointer must be valid for writes of `T` and properly aligned
    /// for `T`.
    #[inline]
    pub unsafe fn put<T>(self, value: T) -> PtrMut<'mem> {
        unsafe {
            self.ptr.cast::<T>().write(value);
            self.assume_init()
        }
    }

    /// Treat the memory as initialized.
    ///
    /// # Safety
    ///
    /// The memory must actually have been initialized.
    #[inline]
    pub const unsafe fn assume_init(self) -> PtrMut<'mem> {
        PtrMut {
            ptr: self.ptr,
            phantom: PhantomData,
        }
    }
}

/// A pointer to an initialized value, usable for reads only.
#[repr(transparent)]
#[derive(Clone, Copy)]
pub struct PtrConst<'mem> {
    ptr: NonNull<u8>,
    phantom: PhantomData<&'mem u8>,
}

impl fmt::Debug for PtrConst<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.ptr.as_ptr().fmt(f)
    }
}

impl<'mem> PtrConst<'mem> {
    /// Create an opaque pointer to an initialized value.
    #[inline]
    pub const fn new(ptr: NonNull<u8>) -> Self {
        Self {
            ptr,
            phantom: PhantomData,
        }
    }

    /// The raw byte pointer.
    #[inline]
    pub const fn as_byte_ptr(self) -> *const u8 {
        self.ptr.as_ptr()
    }

    /// Borrow the pointee.
    ///
    /// # Safety
    ///
    /// The pointee must be a live `T`, and no exclusive borrow of it may
    /// exist for `'mem`.
    #[inline]
    pub unsafe fn get<T>(self) -> &'mem T {
        unsafe { self.ptr.cast::<T>().as_ref() }
    }

    /// Read the pointee out by value.
    ///
    /// # Safety
    ///
    /// The pointee must be a live `T`; the caller takes over its ownership
    /// and must make sure it is not dropped in place afterwards.
    #[inline]
    pub unsafe fn read<T>(self) -> T {
        unsafe { self.ptr.cast::<T>().read() }
    }

    /// Reinterpret as a mutable pointer.
    ///
    /// # Safety
    ///
    /// The pointee must actually be writable and the provenance chain this
    /// pointer was derived from must permit writes.
    #[inline]
    pub const unsafe fn assume_mut(self) -> PtrMut<'mem> {
        PtrMut {
            ptr: self.ptr,
            phantom: PhantomData,
        }
    }
}

/// A pointer to an initialized value, usable for reads and writes.
#[repr(transparent)]
#[derive(Clone, Copy)]
pub struct PtrMut<'mem> {
    ptr: NonNull<u8>,
    phantom: PhantomData<&'mem mut u8>,
}

impl fmt::Debug for PtrMut<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.ptr.as_ptr().fmt(f)
    }
}

impl<'mem> PtrMut<'mem> {
    /// Create an opaque pointer to an initialized value.
    #[inline]
    pub const fn new(ptr: NonNull<u8>) -> Self {
        Self {
            ptr,
            phantom: PhantomData,
        }
    }

    /// The raw byte pointer.
    #[inline]
    pub const fn as_mut_byte_ptr(self) -> *mut u8 {
        self.ptr.as_ptr()
    }

    /// Discard write permission.
    #[inline]
    pub const fn as_const(self) -> PtrConst<'mem> {
        PtrConst {
            ptr: self.ptr,
            phantom: PhantomData,
        }
    }

    /// Borrow the pointee.
    ///
    /// # Safety
    ///
    /// The pointee must be a live `T`.
    #[inline]
    pub unsafe fn get<T>(self) -> &'mem T {
        unsafe { self.ptr.cast::<T>().as_ref() }
    }

    /// Exclusively borrow the pointee.
    ///
    /// # Safety
    ///
    /// The pointee must be a live `T` and this must be the only live
    /// pointer used to access it for `'mem`.
    #[inline]
    pub unsafe fn get_mut<T>(self) -> &'mem mut T {
        unsafe { self.ptr.cast::<T>().as_mut() }
    }

    /// Read the pointee out by value.
    ///
    /// # Safety
    ///
    /// The pointee must be a live `T`; the caller takes over its ownership
    /// and must make sure it is not dropped in place afterwards.
    #[inline]
    pub unsafe fn read<T>(self) -> T {
        unsafe { self.ptr.cast::<T>().read() }
    }

    /// Drop the pointee in place.
    ///
    /// # Safety
    ///
    /// The pointee must be a live `T`, not accessed again afterwards.
    #[inline]
    pub unsafe fn drop_in_place<T>(self) {
        unsafe { self.ptr.cast::<T>().drop_in_place() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::mem::MaybeUninit;

    #[test]
    fn put_then_read_round_trips() {
        veneer_testhelpers::setup();

        let mut slot = MaybeUninit::<u64>::uninit();
        let uninit = PtrUninit::new(NonNull::from(&mut slot).cast());
        let init = unsafe { uninit.put(0xdead_beefu64) };
        assert_eq!(unsafe { *init.get::<u64>() }, 0xdead_beef);
        let back: u64 = unsafe { init.read() };
        assert_eq!(back, 0xdead_beef);
    }

    #[test]
    fn drop_in_place_runs_destructor() {
        veneer_testhelpers::setup();

        let mut slot = MaybeUninit::<String>::uninit();
        let uninit = PtrUninit::new(NonNull::from(&mut slot).cast());
        let init = unsafe { uninit.put(String::from("gone")) };
        assert_eq!(unsafe { init.get::<String>() }.as_str(), "gone");
        unsafe { init.drop_in_place::<String>() };
    }
}
