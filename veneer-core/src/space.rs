//! Capacity prototypes for the in-place buffer.
//!
//! A facade names one of these as its `Space`; the wrapper then carries a
//! `MaybeUninit` of it and any storage whose size and alignment fit is
//! placed directly in the wrapper instead of behind an allocation.
//!
//! All prototypes are pointer-aligned. A value with stricter alignment than
//! a pointer never qualifies for the buffer and takes the heap path in
//! [`make_proxy`](crate::make_proxy) instead.

/// One pointer wide.
pub type S1 = [usize; 1];
/// Two pointers wide. The default.
pub type S2 = [usize; 2];
/// Four pointers wide.
pub type S4 = [usize; 4];
/// Eight pointers wide.
pub type S8 = [usize; 8];
/// Sixteen pointers wide.
pub type S16 = [usize; 16];

/// The buffer a facade gets when it does not pick one: two pointers, enough
/// for a boxed value plus its allocator handle, or any small value.
pub type DefaultSpace = S2;
