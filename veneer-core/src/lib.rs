#![cfg_attr(not(feature = "std"), no_std)]
#![warn(missing_docs)]
#![warn(clippy::std_instead_of_core)]
#![warn(clippy::std_instead_of_alloc)]
#![doc = include_str!("../README.md")]

#[cfg(feature = "alloc")]
extern crate alloc;

#[cfg(feature = "tracing")]
macro_rules! trace {
    ($($tt:tt)*) => { tracing::trace!($($tt)*) };
}

#[cfg(not(feature = "tracing"))]
macro_rules! trace {
    ($($tt:tt)*) => {};
}

pub(crate) use trace;

// Constraint algebra: layout maxima and lifetime levels
mod constraint;
pub use constraint::*;

// Const-constructible type identity
mod token;
pub use token::*;

// Opaque pointer utilities
mod ptr;
pub use ptr::*;

// Capacity prototypes for the in-place buffer
pub mod space;

// Dispatch and typed-access errors
mod error;
pub use error::*;

// Per-(facade, storage) dispatch constants
mod metadata;
pub use metadata::*;

// Storage strategies and the allocator contract
mod storage;
pub use storage::*;

// The erased wrapper and construction entry points
mod proxy;
pub use proxy::*;

// Operator dispatch bridges for the wrapper
mod ops;
pub use ops::*;

// Typed access: tokens, downcasts, unchecked removal
mod rtti;
pub use rtti::*;

// The process-wide cast registry
#[cfg(feature = "std")]
mod registry;
#[cfg(feature = "std")]
pub use registry::*;

/// An abstract interface: a set of dispatchable conventions plus the layout
/// and lifetime constraints a bound value must satisfy.
///
/// Facades are uninhabited marker types. The `facade!` macro in the
/// `veneer` crate declares one, generates its [`Conventions`] struct, and
/// implements this trait; the wrapper [`Proxy<F>`] then carries any value
/// whose storage satisfies [`Proxiable<F>`].
///
/// # Safety
///
/// `CONSTRAINTS` must be normalized, and its layout maxima must not exceed
/// `Space`. `Conventions` must be exactly the slots struct the facade's
/// `Proxiable` impls populate. Getting either wrong turns every dispatch
/// through the wrapper into undefined behavior; implement through `facade!`.
///
/// [`Conventions`]: Facade::Conventions
pub unsafe trait Facade: Sized + 'static {
    /// Generated struct of erased dispatch slots (plus any reflection
    /// values and embedded parent conventions).
    type Conventions: Copy + 'static;

    /// Capacity prototype donating size and alignment to the in-place
    /// buffer.
    type Space: 'static;

    /// How the wrapper holds its metadata binding; [`MetaRef`] unless the
    /// facade opts into [`MetaInline`].
    type MetaCell: MetaCell<Self::Conventions>;

    /// The facade's normalized constraints.
    const CONSTRAINTS: Constraints;
}

/// Binds a storage strategy to a facade.
///
/// One blanket impl per facade is generated by `facade!`; its where-clause
/// *is* the conformance check (the value implements the convention traits,
/// the storage supports the required lifetime operations), and its
/// [`METADATA`](Self::METADATA) constant is the single `'static` dispatch
/// record for the (facade, storage) pair.
///
/// # Safety
///
/// Every slot in `METADATA` must be sound to call with a pointer to a live
/// `Self`, and the cast slot must describe `Self` exactly.
pub unsafe trait Proxiable<F: Facade>: ErasedStorage {
    /// Dispatch metadata for `Self` bound under `F`.
    const METADATA: &'static Metadata<F::Conventions>;
}

/// Structural projection from a facade's conventions onto a conventions
/// struct it embeds.
///
/// Generated accessors are written against this: the accessors of facade
/// `B` apply to `Proxy<F>` for every `F` that can project a
/// `B::Conventions`, which covers `B` itself (the identity projection) and
/// every facade declared with `extends B`.
pub trait ConvProject<C: Copy + 'static>: Facade {
    /// Project the embedded slots out of the facade's own conventions.
    fn project(conventions: &Self::Conventions) -> &C;
}

/// Marker for facades that require copy support.
///
/// Enables `Clone` on the wrapper.
///
/// # Safety
///
/// Every `Proxiable<Self>` impl must populate the clone slots of its
/// metadata.
pub unsafe trait CopyableFacade: Facade {}

/// Marker for facades declared with `threading = required;`.
///
/// Makes the wrapper `Send + Sync`.
///
/// # Safety
///
/// Every `Proxiable<Self>` impl must bound the storage by `Send + Sync`.
pub unsafe trait ThreadSafeFacade: Facade {}

/// Constant reflection values, computed per storage strategy at binding
/// time and stored by value in a facade's conventions.
///
/// A facade declares `reflect name: Type;` and `Type`'s `Reflect` impl
/// supplies the value. Implementations for [`StorageKind`], [`TypeToken`]
/// and [`core::alloc::Layout`] are built in; user types can implement the
/// trait to capture anything else const-computable about the storage.
pub trait Reflect<S: ErasedStorage>: Copy + 'static {
    /// The reflected value for storage `S`.
    const VALUE: Self;
}

impl<S: ErasedStorage> Reflect<S> for StorageKind {
    const VALUE: Self = S::KIND;
}

impl<S: ErasedStorage> Reflect<S> for TypeToken {
    const VALUE: Self = TypeToken::of::<S::Value>();
}

impl<S: ErasedStorage> Reflect<S> for core::alloc::Layout {
    const VALUE: Self = core::alloc::Layout::new::<S::Value>();
}
