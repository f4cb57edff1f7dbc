//! Typed access to the value behind a wrapper.
//!
//! The metadata always records the bound value's [`TypeToken`], so a
//! wrapper can be interrogated and unwrapped without any convention
//! declaring support for it.

use crate::error::BadCast;
use crate::proxy::Proxy;
use crate::token::TypeToken;
use crate::Facade;

impl<F: Facade> Proxy<F> {
    /// Token of the bound value's type; [`TypeToken::UNIT`] when empty.
    pub fn type_token(&self) -> TypeToken {
        match self.cast_slot() {
            Some(slot) => slot.value_type,
            None => TypeToken::UNIT,
        }
    }

    /// Borrow the bound value as a `T`.
    pub fn downcast_ref<T: 'static>(&self) -> Result<&T, BadCast> {
        let slot = self.cast_slot().ok_or(BadCast {
            expected: core::any::type_name::<T>(),
            actual: TypeToken::UNIT.name(),
        })?;
        if !slot.value_type.is::<T>() {
            return Err(BadCast {
                expected: core::any::type_name::<T>(),
                actual: slot.value_type.name(),
            });
        }
        // SAFETY: token matched; object_addr leads to the live value.
        unsafe {
            let addr = (slot.object_addr)(self.space_const());
            Ok(addr.get::<T>())
        }
    }

    /// Exclusively borrow the bound value as a `T`.
    pub fn downcast_mut<T: 'static>(&mut self) -> Result<&mut T, BadCast> {
        let slot = self.cast_slot().ok_or(BadCast {
            expected: core::any::type_name::<T>(),
            actual: TypeToken::UNIT.name(),
        })?;
        if !slot.value_type.is::<T>() {
            return Err(BadCast {
                expected: core::any::type_name::<T>(),
                actual: slot.value_type.name(),
            });
        }
        // SAFETY: token matched; the address derives from an exclusive
        // borrow of the buffer (object_addr creates no references), so
        // handing out &mut is sound.
        unsafe {
            let addr = (slot.object_addr)(self.space_mut().as_const());
            Ok(addr.assume_mut().get_mut::<T>())
        }
    }

    /// Move the bound value out as a `T`, leaving the wrapper empty.
    ///
    /// On a type mismatch (or an empty wrapper) the untouched wrapper comes
    /// back as the error.
    pub fn downcast<T: 'static>(mut self) -> Result<T, Self> {
        let Some(slot) = self.cast_slot() else {
            return Err(self);
        };
        if !slot.value_type.is::<T>() {
            return Err(self);
        }
        self.clear_meta();
        // SAFETY: token matched; the cell is clear so Drop is a no-op; the
        // value is read out before consume releases the storage around it.
        unsafe {
            let addr = (slot.object_addr)(self.space_mut().as_const());
            let value = addr.read::<T>();
            (slot.consume)(self.space_mut());
            Ok(value)
        }
    }
}

/// Move the bound value out without checking its type.
///
/// Panics on an empty wrapper.
///
/// # Safety
///
/// The bound value must be exactly a `T`; use
/// [`Proxy::downcast`] for the checked form.
pub unsafe fn remove_proxy<T: 'static, F: Facade>(mut proxy: Proxy<F>) -> T {
    let slot = match proxy.cast_slot() {
        Some(slot) => slot,
        None => panic!(
            "remove_proxy on an empty Proxy<{}>",
            core::any::type_name::<F>()
        ),
    };
    proxy.clear_meta();
    // SAFETY: the caller asserts the value is a T; everything else is as in
    // Proxy::downcast.
    unsafe {
        let addr = (slot.object_addr)(proxy.space_mut().as_const());
        let value = addr.read::<T>();
        (slot.consume)(proxy.space_mut());
        value
    }
}
