//! Errors surfaced by dispatch and typed access.

use core::fmt;

/// A weak-dispatch operation was invoked on a value whose type does not
/// provide it.
///
/// Returned by accessors of `weak` conventions; the wrapper stays engaged
/// and usable after the failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NotImplemented {
    operation: &'static str,
}

impl NotImplemented {
    /// A failure for the named operation, e.g. `"DictionaryOps::at"`.
    pub const fn new(operation: &'static str) -> Self {
        Self { operation }
    }

    /// The operation that was not provided.
    pub const fn operation(&self) -> &'static str {
        self.operation
    }
}

impl fmt::Display for NotImplemented {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "operation `{}` is not implemented by the bound value",
            self.operation
        )
    }
}

impl core::error::Error for NotImplemented {}

/// A typed access named a type other than the one actually bound.
///
/// Returned by [`Proxy::downcast_ref`](crate::Proxy::downcast_ref) and
/// [`Proxy::downcast_mut`](crate::Proxy::downcast_mut). The names are
/// diagnostic only; matching is done on `TypeId`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BadCast {
    /// Name of the type the caller asked for.
    pub expected: &'static str,
    /// Name of the type actually bound, or `"()"` for an empty wrapper.
    pub actual: &'static str,
}

impl fmt::Display for BadCast {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "bad proxy cast: expected `{}`, bound value is `{}`",
            self.expected, self.actual
        )
    }
}

impl core::error::Error for BadCast {}
