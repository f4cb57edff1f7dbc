//! Type identity that can be minted in const context.
//!
//! `TypeId::of` is not yet const-comparable on stable, so a [`TypeToken`]
//! carries function pointers that produce the id and name on demand. Two
//! tokens compare equal iff the `TypeId` values they produce are equal, so
//! token identity is stable across codegen units.

use core::any::TypeId;
use core::fmt;
use core::hash::{Hash, Hasher};

/// Identity token for a `'static` type.
#[derive(Clone, Copy)]
pub struct TypeToken {
    type_id: fn() -> TypeId,
    type_name: fn() -> &'static str,
}

impl TypeToken {
    /// Token for `T`.
    pub const fn of<T: 'static>() -> Self {
        Self {
            type_id: TypeId::of::<T>,
            type_name: type_name_of::<T>,
        }
    }

    /// Token for `()`, used wherever "no type" is meant: the value token of
    /// an empty wrapper, the allocator token of the in-place strategy.
    pub const UNIT: Self = Self::of::<()>();

    /// The `TypeId` this token stands for.
    pub fn id(&self) -> TypeId {
        (self.type_id)()
    }

    /// Diagnostic name of the type. Not guaranteed unique; use [`id`] for
    /// identity.
    ///
    /// [`id`]: Self::id
    pub fn name(&self) -> &'static str {
        (self.type_name)()
    }

    /// Whether this token identifies `T`.
    pub fn is<T: 'static>(&self) -> bool {
        self.id() == TypeId::of::<T>()
    }
}

fn type_name_of<T>() -> &'static str {
    core::any::type_name::<T>()
}

impl PartialEq for TypeToken {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl Eq for TypeToken {}

impl Hash for TypeToken {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id().hash(state);
    }
}

impl fmt::Debug for TypeToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeToken({})", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_compare_by_type_identity() {
        veneer_testhelpers::setup();

        const A: TypeToken = TypeToken::of::<u32>();
        const B: TypeToken = TypeToken::of::<u32>();
        assert_eq!(A, B);
        assert_ne!(A, TypeToken::of::<u64>());
        assert!(A.is::<u32>());
        assert!(!A.is::<i32>());
    }

    #[test]
    fn unit_token() {
        veneer_testhelpers::setup();

        assert!(TypeToken::UNIT.is::<()>());
        assert_eq!(TypeToken::UNIT, TypeToken::of::<()>());
    }

    #[test]
    fn name_is_diagnostic() {
        veneer_testhelpers::setup();

        assert!(TypeToken::of::<String>().name().contains("String"));
    }
}
