#![cfg_attr(not(feature = "std"), no_std)]
#![warn(missing_docs)]
#![warn(clippy::std_instead_of_core)]
#![warn(clippy::std_instead_of_alloc)]
#![doc = include_str!("../README.md")]

pub use veneer_core::*;

/// Re-export paste for use in the `facade!` expansion.
#[doc(hidden)]
pub use paste;

pub use static_assertions;

mod macros;

pub mod prelude {
    //! One import for declaring and using facades.
    //!
    //! ```
    //! use veneer::prelude::*;
    //! ```

    pub use crate::facade;
    pub use crate::{
        make_proxy_inplace, remove_proxy, BadCast, ConstraintLevel, Facade, NotImplemented,
        Proxy, RawAllocator, StorageKind, TypeToken,
    };

    #[cfg(feature = "alloc")]
    pub use crate::{allocate_proxy, make_proxy, GlobalAllocator};

    #[cfg(feature = "std")]
    pub use crate::{
        cast_copy, cast_copy_in, cast_move, cast_move_in, register_allocated, register_inplace,
    };
}
