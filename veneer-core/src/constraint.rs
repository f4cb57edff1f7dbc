//! The constraint algebra facades are built on: layout maxima for the
//! in-place buffer plus required strictness levels for the lifetime
//! operations a wrapper must be able to perform on whatever it holds.

use core::mem::{align_of, size_of};

/// How strictly a lifetime operation (copy, relocation, destruction) must be
/// supported by a bound value.
///
/// Levels form a total order: each level includes everything the previous one
/// allows and demands more.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum ConstraintLevel {
    /// The operation is not required at all.
    None,
    /// The operation must exist; it may run arbitrary user code and may
    /// unwind.
    Nontrivial,
    /// The operation must exist and complete without unwinding.
    ///
    /// Rust does not track unwinding in the type system, so for binding
    /// purposes this is enforced exactly like [`Nontrivial`]; the level still
    /// participates in facade merging.
    ///
    /// [`Nontrivial`]: ConstraintLevel::Nontrivial
    Nothrow,
    /// The operation must be bitwise: no user code runs.
    Trivial,
}

impl ConstraintLevel {
    /// The stricter of two levels.
    pub const fn strictest(self, other: Self) -> Self {
        if self as u8 >= other as u8 { self } else { other }
    }

    /// Whether this level satisfies `required`.
    pub const fn at_least(self, required: Self) -> bool {
        self as u8 >= required as u8
    }
}

/// A facade's normalized layout and lifetime requirements.
///
/// Produced by [`ConstraintsBuilder::normalize`]; every field holds a
/// definite value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Constraints {
    /// Largest storage size (in bytes) eligible for the in-place buffer.
    pub max_size: usize,
    /// Largest storage alignment eligible for the in-place buffer.
    pub max_align: usize,
    /// Required copy support.
    pub copyability: ConstraintLevel,
    /// Required relocation support. Every sized Rust value relocates
    /// bitwise, so any level is satisfiable; the field participates in
    /// facade merging.
    pub relocatability: ConstraintLevel,
    /// Required destruction support.
    pub destructibility: ConstraintLevel,
}

/// Default buffer capacity: two pointers.
pub const DEFAULT_MAX_SIZE: usize = 2 * size_of::<*const ()>();
/// Default buffer alignment: one pointer.
pub const DEFAULT_MAX_ALIGN: usize = align_of::<*const ()>();

impl Constraints {
    /// Fully defaulted constraints: a two-pointer buffer, no copy
    /// requirement, nothrow relocation and destruction.
    pub const DEFAULT: Self = ConstraintsBuilder::new().normalize();

    /// Pointwise combination: the smaller layout, the stricter levels.
    ///
    /// Commutative and associative; used when a facade extends another.
    pub const fn merge(self, other: Self) -> Self {
        Self {
            max_size: min(self.max_size, other.max_size),
            max_align: min(self.max_align, other.max_align),
            copyability: self.copyability.strictest(other.copyability),
            relocatability: self.relocatability.strictest(other.relocatability),
            destructibility: self.destructibility.strictest(other.destructibility),
        }
    }

    /// Whether a storage with the given layout is eligible for the in-place
    /// buffer under these constraints.
    pub const fn fits(&self, size: usize, align: usize) -> bool {
        size <= self.max_size && align <= self.max_align
    }
}

/// Unnormalized constraints under construction. Fields start unspecified;
/// [`normalize`](Self::normalize) fills the remainder with defaults.
///
/// All operations are `const fn` so a facade's constraints can be assembled
/// entirely at compile time, where a violated invariant (a layout that is
/// not a multiple of its alignment, an alignment that is not a power of two)
/// becomes a compile error.
#[derive(Clone, Copy, Debug)]
pub struct ConstraintsBuilder {
    max_size: Option<usize>,
    max_align: Option<usize>,
    copyability: Option<ConstraintLevel>,
    relocatability: Option<ConstraintLevel>,
    destructibility: Option<ConstraintLevel>,
}

impl ConstraintsBuilder {
    /// All fields unspecified.
    pub const fn new() -> Self {
        Self {
            max_size: None,
            max_align: None,
            copyability: None,
            relocatability: None,
            destructibility: None,
        }
    }

    /// Shrink (or set, if unspecified) the layout maxima.
    ///
    /// `size` must be a multiple of `align`, and `align` a power of two.
    pub const fn restrict_layout(self, size: usize, align: usize) -> Self {
        assert!(align.is_power_of_two(), "max_align must be a power of two");
        assert!(
            size % align == 0,
            "max_size must be a multiple of max_align"
        );
        Self {
            max_size: Some(min_opt(self.max_size, size)),
            max_align: Some(min_opt(self.max_align, align)),
            ..self
        }
    }

    /// Require copy support at `level`.
    pub const fn support_copy(self, level: ConstraintLevel) -> Self {
        Self {
            copyability: Some(level),
            ..self
        }
    }

    /// Require relocation support at `level`.
    pub const fn support_relocation(self, level: ConstraintLevel) -> Self {
        Self {
            relocatability: Some(level),
            ..self
        }
    }

    /// Require destruction support at `level`.
    pub const fn support_destruction(self, level: ConstraintLevel) -> Self {
        Self {
            destructibility: Some(level),
            ..self
        }
    }

    /// Fold an already-normalized constraint set (an extended facade's) into
    /// this builder: smaller layout, stricter levels.
    pub const fn merge_normalized(self, other: Constraints) -> Self {
        Self {
            max_size: Some(min_opt(self.max_size, other.max_size)),
            max_align: Some(min_opt(self.max_align, other.max_align)),
            copyability: Some(strictest_opt(self.copyability, other.copyability)),
            relocatability: Some(strictest_opt(self.relocatability, other.relocatability)),
            destructibility: Some(strictest_opt(self.destructibility, other.destructibility)),
        }
    }

    /// Fill unspecified fields with defaults and produce the definite set.
    ///
    /// Defaults: two-pointer layout, `copyability = None`,
    /// `relocatability = Nothrow`, `destructibility = Nothrow`.
    pub const fn normalize(self) -> Constraints {
        let out = Constraints {
            max_size: match self.max_size {
                Some(n) => n,
                None => DEFAULT_MAX_SIZE,
            },
            max_align: match self.max_align {
                Some(n) => n,
                None => DEFAULT_MAX_ALIGN,
            },
            copyability: match self.copyability {
                Some(level) => level,
                None => ConstraintLevel::None,
            },
            relocatability: match self.relocatability {
                Some(level) => level,
                None => ConstraintLevel::Nothrow,
            },
            destructibility: match self.destructibility {
                Some(level) => level,
                None => ConstraintLevel::Nothrow,
            },
        };
        assert!(out.max_align.is_power_of_two());
        assert!(out.max_size % out.max_align == 0);
        out
    }
}

impl Default for ConstraintsBuilder {
    fn default() -> Self {
        Self::new()
    }
}

const fn min(a: usize, b: usize) -> usize {
    if a <= b { a } else { b }
}

const fn min_opt(a: Option<usize>, b: usize) -> usize {
    match a {
        Some(a) => min(a, b),
        None => b,
    }
}

const fn strictest_opt(a: Option<ConstraintLevel>, b: ConstraintLevel) -> ConstraintLevel {
    match a {
        Some(a) => a.strictest(b),
        None => b,
    }
}
