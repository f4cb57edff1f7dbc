//! Operator sugar for proxies.
//!
//! Coherence does not let a downstream crate implement `core::ops` traits
//! for [`Proxy`], so each supported operator gets a dispatch trait here. A
//! facade implements the dispatch trait (the `facade!` macro does this for
//! every `op` declaration), handing out the slot stored in its conventions,
//! and the blanket impl below turns that into the actual operator on
//! `&Proxy<F>`.

use crate::{ConvProject, Facade, Proxy, PtrConst};

macro_rules! unary_dispatch {
    ($(#[$attr:meta])* $Dispatch:ident, $Op:ident, $method:ident) => {
        $(#[$attr])*
        pub trait $Dispatch: Facade + ConvProject<<Self as Facade>::Conventions> {
            /// Operator result type.
            type Output;

            /// The slot recorded for the bound value's storage.
            fn slot(
                conventions: &<Self as Facade>::Conventions,
            ) -> unsafe fn(PtrConst<'_>) -> Self::Output;
        }

        impl<F: $Dispatch> core::ops::$Op for &Proxy<F> {
            type Output = <F as $Dispatch>::Output;

            fn $method(self) -> Self::Output {
                let (conventions, value) = self.dispatch_ref::<<F as Facade>::Conventions>();
                let slot = F::slot(&conventions);
                // SAFETY: the slot was built for the storage occupying this
                // buffer, and `value` addresses that storage.
                unsafe { slot(value) }
            }
        }
    };
}

macro_rules! binary_dispatch {
    ($(#[$attr:meta])* $Dispatch:ident, $Op:ident, $method:ident) => {
        $(#[$attr])*
        pub trait $Dispatch: Facade + ConvProject<<Self as Facade>::Conventions> {
            /// Right-hand operand type.
            type Rhs;

            /// Operator result type.
            type Output;

            /// The slot recorded for the bound value's storage.
            fn slot(
                conventions: &<Self as Facade>::Conventions,
            ) -> unsafe fn(PtrConst<'_>, Self::Rhs) -> Self::Output;
        }

        impl<F: $Dispatch> core::ops::$Op<<F as $Dispatch>::Rhs> for &Proxy<F> {
            type Output = <F as $Dispatch>::Output;

            fn $method(self, rhs: <F as $Dispatch>::Rhs) -> Self::Output {
                let (conventions, value) = self.dispatch_ref::<<F as Facade>::Conventions>();
                let slot = F::slot(&conventions);
                // SAFETY: the slot was built for the storage occupying this
                // buffer, and `value` addresses that storage.
                unsafe { slot(value, rhs) }
            }
        }
    };
}

unary_dispatch! {
    /// `-proxy` support.
    NegDispatch, Neg, neg
}
unary_dispatch! {
    /// `!proxy` support.
    NotDispatch, Not, not
}

binary_dispatch! {
    /// `proxy + rhs` support.
    AddDispatch, Add, add
}
binary_dispatch! {
    /// `proxy - rhs` support.
    SubDispatch, Sub, sub
}
binary_dispatch! {
    /// `proxy * rhs` support.
    MulDispatch, Mul, mul
}
binary_dispatch! {
    /// `proxy / rhs` support.
    DivDispatch, Div, div
}
binary_dispatch! {
    /// `proxy % rhs` support.
    RemDispatch, Rem, rem
}
binary_dispatch! {
    /// `proxy & rhs` support.
    BitAndDispatch, BitAnd, bitand
}
binary_dispatch! {
    /// `proxy | rhs` support.
    BitOrDispatch, BitOr, bitor
}
binary_dispatch! {
    /// `proxy ^ rhs` support.
    BitXorDispatch, BitXor, bitxor
}
binary_dispatch! {
    /// `proxy << rhs` support.
    ShlDispatch, Shl, shl
}
binary_dispatch! {
    /// `proxy >> rhs` support.
    ShrDispatch, Shr, shr
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraint::{ConstraintLevel, Constraints};
    use crate::metadata::{CastSlot, LifetimeSlots, Metadata, MetaRef};
    use crate::space::DefaultSpace;
    use crate::storage::{ErasedStorage, InplaceStorage};
    use crate::Proxiable;

    #[derive(Clone, Copy)]
    struct NumConventions {
        neg: unsafe fn(PtrConst<'_>) -> i32,
        add: unsafe fn(PtrConst<'_>, i32) -> i32,
    }

    enum Num {}

    unsafe impl Facade for Num {
        type Conventions = NumConventions;
        type Space = DefaultSpace;
        type MetaCell = MetaRef<NumConventions>;
        const CONSTRAINTS: Constraints = Constraints::DEFAULT;
    }

    impl ConvProject<NumConventions> for Num {
        fn project(conventions: &NumConventions) -> &NumConventions {
            conventions
        }
    }

    unsafe fn neg_thunk<S: ErasedStorage<Value = i32>>(this: PtrConst<'_>) -> i32 {
        -*unsafe { this.get::<S>() }.value()
    }

    unsafe fn add_thunk<S: ErasedStorage<Value = i32>>(this: PtrConst<'_>, rhs: i32) -> i32 {
        *unsafe { this.get::<S>() }.value() + rhs
    }

    unsafe impl<S: ErasedStorage<Value = i32>> Proxiable<Num> for S {
        const METADATA: &'static Metadata<NumConventions> = &const {
            Metadata {
                lifetime: LifetimeSlots::for_storage::<S>(ConstraintLevel::Nothrow),
                cast: CastSlot::for_storage::<S>(),
                conventions: NumConventions {
                    neg: neg_thunk::<S>,
                    add: add_thunk::<S>,
                },
            }
        };
    }

    impl NegDispatch for Num {
        type Output = i32;

        fn slot(conventions: &NumConventions) -> unsafe fn(PtrConst<'_>) -> i32 {
            conventions.neg
        }
    }

    impl AddDispatch for Num {
        type Rhs = i32;
        type Output = i32;

        fn slot(conventions: &NumConventions) -> unsafe fn(PtrConst<'_>, i32) -> i32 {
            conventions.add
        }
    }

    #[test]
    fn operators_dispatch_through_the_wrapper() {
        veneer_testhelpers::setup();

        let p = Proxy::<Num>::from_storage(InplaceStorage::new(21));
        assert_eq!(-&p, -21);
        assert_eq!(&p + 21, 42);
    }
}
