//! The `facade!` declaration macro.
//!
//! The exported macro is a single entry point with internal `@` rules. The
//! first group of rules resolves omitted sections to their defaults, one
//! section per step; `@build` then fans out to one emitter rule per
//! generated item. Convention bodies are token lists and get re-parsed by
//! small munchers, once per artifact built from them (slots struct, thunks,
//! slot table, accessor impl).

/// Declare a facade: an uninhabited marker type describing everything a
/// [`Proxy`](crate::Proxy) of it can do, plus the generated traits, slot
/// tables, and blanket impls that make any conforming value bindable.
///
/// Sections appear in this order, and every one is optional:
///
/// * `space = <type>;` buffer capacity prototype, default
///   [`DefaultSpace`](crate::space::DefaultSpace)
/// * `meta = inline;` store metadata by value instead of by reference
/// * `copy = none | nontrivial | nothrow | trivial;` required copy support;
///   anything above `none` makes the proxy `Clone`
/// * `relocation = ...;` and `destruction = ...;` same levels, defaults
///   `nothrow`
/// * `threading = required;` bind only `Send + Sync` values and get a
///   sendable proxy
/// * `extends <Facade> as <field>;` inherit another facade's conventions
///   and constraints
/// * `reflect <name>: <type>;` record a per-storage constant, readable
///   through the generated `*Reflections` trait
/// * `op <Op> -> <type>;` / `op <Op>(<rhs>) -> <type>;` dispatch a
///   `core::ops` operator through the proxy
/// * `direct | indirect | weak convention <Trait> { fn ...; }` dispatched
///   methods; `direct` calls the bound value, `indirect` calls its deref
///   target, `weak` wraps results in `Result<_, NotImplemented>` and lets
///   implementations skip methods
///
/// # Example
///
/// ```
/// use veneer::prelude::*;
///
/// facade! {
///     /// Anything that can describe itself.
///     pub facade Describable {
///         direct convention Describe {
///             fn describe(&self) -> String;
///         }
///     }
/// }
///
/// struct Point {
///     x: i32,
///     y: i32,
/// }
///
/// impl Describe for Point {
///     fn describe(&self) -> String {
///         format!("({}, {})", self.x, self.y)
///     }
/// }
///
/// let p: Proxy<Describable> = make_proxy(Point { x: 1, y: 2 });
/// assert_eq!(p.describe(), "(1, 2)");
/// ```
#[macro_export]
macro_rules! facade {
    (
        $(#[$attr:meta])*
        $vis:vis facade $Name:ident {
            $( space = $Space:ty; )?
            $( meta = $cellkw:ident; )?
            $( copy = $copy:ident; )?
            $( relocation = $reloc:ident; )?
            $( destruction = $destr:ident; )?
            $( threading = $threadkw:ident; )?
            $( extends $Base:ty as $bfield:ident; )*
            $( reflect $rname:ident: $rty:ty; )*
            $( op $Op:ident $(($rhs:ty))? -> $oret:ty; )*
            $(
                $(#[$cattr:meta])*
                $ckind:ident convention $Trait:ident { $($cbody:tt)* }
            )*
        }
    ) => {
        $crate::facade! { @space
            space [$( $Space )?]
            cell [$( $cellkw )?]
            copy [$( $copy )?]
            reloc [$( $reloc )?]
            destr [$( $destr )?]
            thread [$( $threadkw )?]
            ops [$( { $Op $(($rhs))? -> $oret } )*]
            attrs [$(#[$attr])*]
            vis [$vis]
            name [$Name]
            extends [$( { $Base as $bfield } )*]
            reflect [$( { $rname : $rty } )*]
            convs [$( { $(#[$cattr])* $ckind convention $Trait { $($cbody)* } } )*]
        }
    };

    // ---- section defaulting --------------------------------------------
    //
    // Each step consumes the leading bundle and appends its resolved form
    // (or forms) at the tail, so the next step's bundle is in front.

    (@space space [] $($rest:tt)*) => {
        $crate::facade! { @cell $($rest)* space [$crate::space::DefaultSpace] }
    };
    (@space space [$Space:ty] $($rest:tt)*) => {
        $crate::facade! { @cell $($rest)* space [$Space] }
    };

    (@cell cell [] $($rest:tt)*) => {
        $crate::facade! { @copy $($rest)* cell [ref] }
    };
    (@cell cell [inline] $($rest:tt)*) => {
        $crate::facade! { @copy $($rest)* cell [inline] }
    };

    (@copy copy [] $($rest:tt)*) => {
        $crate::facade! { @reloc $($rest)*
            bound []
            builder [for_storage]
            copymark [no]
            copycall []
        }
    };
    (@copy copy [none] $($rest:tt)*) => {
        $crate::facade! { @reloc $($rest)*
            bound []
            builder [for_storage]
            copymark [no]
            copycall [ .support_copy($crate::ConstraintLevel::None) ]
        }
    };
    (@copy copy [nontrivial] $($rest:tt)*) => {
        $crate::facade! { @reloc $($rest)*
            bound [ + $crate::CloneableStorage ]
            builder [for_cloneable]
            copymark [yes]
            copycall [ .support_copy($crate::ConstraintLevel::Nontrivial) ]
        }
    };
    (@copy copy [nothrow] $($rest:tt)*) => {
        $crate::facade! { @reloc $($rest)*
            bound [ + $crate::CloneableStorage ]
            builder [for_cloneable]
            copymark [yes]
            copycall [ .support_copy($crate::ConstraintLevel::Nothrow) ]
        }
    };
    (@copy copy [trivial] $($rest:tt)*) => {
        $crate::facade! { @reloc $($rest)*
            bound [ + $crate::CloneableStorage + ::core::marker::Copy ]
            builder [for_cloneable]
            copymark [yes]
            copycall [ .support_copy($crate::ConstraintLevel::Trivial) ]
        }
    };

    (@reloc reloc [] $($rest:tt)*) => {
        $crate::facade! { @destr $($rest)* reloc [] }
    };
    (@reloc reloc [none] $($rest:tt)*) => {
        $crate::facade! { @destr $($rest)*
            reloc [ .support_relocation($crate::ConstraintLevel::None) ]
        }
    };
    (@reloc reloc [nontrivial] $($rest:tt)*) => {
        $crate::facade! { @destr $($rest)*
            reloc [ .support_relocation($crate::ConstraintLevel::Nontrivial) ]
        }
    };
    (@reloc reloc [nothrow] $($rest:tt)*) => {
        $crate::facade! { @destr $($rest)*
            reloc [ .support_relocation($crate::ConstraintLevel::Nothrow) ]
        }
    };
    (@reloc reloc [trivial] $($rest:tt)*) => {
        $crate::facade! { @destr $($rest)*
            reloc [ .support_relocation($crate::ConstraintLevel::Trivial) ]
        }
    };

    (@destr destr [] $($rest:tt)*) => {
        $crate::facade! { @thread $($rest)*
            destr []
            dlevel [ $crate::ConstraintLevel::Nothrow ]
        }
    };
    (@destr destr [none] $($rest:tt)*) => {
        $crate::facade! { @thread $($rest)*
            destr [ .support_destruction($crate::ConstraintLevel::None) ]
            dlevel [ $crate::ConstraintLevel::None ]
        }
    };
    (@destr destr [nontrivial] $($rest:tt)*) => {
        $crate::facade! { @thread $($rest)*
            destr [ .support_destruction($crate::ConstraintLevel::Nontrivial) ]
            dlevel [ $crate::ConstraintLevel::Nontrivial ]
        }
    };
    (@destr destr [nothrow] $($rest:tt)*) => {
        $crate::facade! { @thread $($rest)*
            destr [ .support_destruction($crate::ConstraintLevel::Nothrow) ]
            dlevel [ $crate::ConstraintLevel::Nothrow ]
        }
    };
    (@destr destr [trivial] $($rest:tt)*) => {
        $crate::facade! { @thread $($rest)*
            destr [ .support_destruction($crate::ConstraintLevel::Trivial) ]
            dlevel [ $crate::ConstraintLevel::Trivial ]
        }
    };

    (@thread thread [] $($rest:tt)*) => {
        $crate::facade! { @ops $($rest)* tbound [] tmark [off] }
    };
    (@thread thread [required] $($rest:tt)*) => {
        $crate::facade! { @ops $($rest)*
            tbound [ + ::core::marker::Send + ::core::marker::Sync ]
            tmark [on]
        }
    };

    // Split operator declarations into unary and binary lists.
    (@ops ops [$($entries:tt)*] $($rest:tt)*) => {
        $crate::facade! { @ops_munch uops [] bops [] pending [$($entries)*] $($rest)* }
    };
    (@ops_munch uops [$($u:tt)*] bops [$($b:tt)*]
        pending [ { $Op:ident -> $ret:ty } $($more:tt)* ] $($rest:tt)*
    ) => {
        $crate::facade! { @ops_munch
            uops [$($u)* { $Op -> $ret }]
            bops [$($b)*]
            pending [$($more)*]
            $($rest)*
        }
    };
    (@ops_munch uops [$($u:tt)*] bops [$($b:tt)*]
        pending [ { $Op:ident ($rhs:ty) -> $ret:ty } $($more:tt)* ] $($rest:tt)*
    ) => {
        $crate::facade! { @ops_munch
            uops [$($u)*]
            bops [$($b)* { $Op ($rhs) -> $ret }]
            pending [$($more)*]
            $($rest)*
        }
    };
    (@ops_munch uops $u:tt bops $b:tt pending [] $($rest:tt)*) => {
        $crate::facade! { @build $($rest)* uops $u bops $b }
    };

    // ---- fan-out -------------------------------------------------------

    (@build
        attrs [$(#[$attr:meta])*]
        vis [$vis:vis]
        name [$Name:ident]
        extends [$( { $Base:ty as $bfield:ident } )*]
        reflect [$( { $rname:ident : $rty:ty } )*]
        convs [$( { $(#[$cattr:meta])* $ckind:ident convention $Trait:ident { $($cbody:tt)* } } )*]
        space [$Space:ty]
        cell [$cellkind:ident]
        bound [$($sbound:tt)*]
        builder [$builder:ident]
        copymark [$copymark:ident]
        copycall [$($copycall:tt)*]
        reloc [$($reloccall:tt)*]
        destr [$($destrcall:tt)*]
        dlevel [$($dlevel:tt)*]
        tbound [$($tbound:tt)*]
        tmark [$tmark:ident]
        uops [$( { $UOp:ident -> $uret:ty } )*]
        bops [$( { $BOp:ident ($brhs:ty) -> $bret:ty } )*]
    ) => {
        $(#[$attr])*
        $vis enum $Name {}

        $crate::facade! { @facade_impl $cellkind
            vis [$vis] name [$Name] space [$Space]
            chain [ $($copycall)* $($reloccall)* $($destrcall)* ]
            extends [$( { $Base as $bfield } )*]
        }

        $crate::facade! { @conventions_struct
            vis [$vis] name [$Name]
            traits [$( $Trait )*]
            extends [$( { $Base as $bfield } )*]
            reflect [$( { $rname : $rty } )*]
            uops [$( { $UOp -> $uret } )*]
            bops [$( { $BOp ($brhs) -> $bret } )*]
        }

        $crate::facade! { @proxiable
            name [$Name]
            bound [$($sbound)*]
            tbound [$($tbound)*]
            builder [$builder]
            dlevel [$($dlevel)*]
            traits [$( $Trait )*]
            extends [$( { $Base as $bfield } )*]
            reflect [$( { $rname : $rty } )*]
            uops [$( { $UOp -> $uret } )*]
            bops [$( { $BOp ($brhs) -> $bret } )*]
        }

        $(
            $crate::facade! { @conv $ckind
                attrs [$(#[$cattr])*]
                vis [$vis] name [$Name]
                trait [$Trait]
                body [$($cbody)*]
            }
        )*

        $crate::facade! { @reflections
            vis [$vis] name [$Name]
            reflect [$( { $rname : $rty } )*]
        }

        $(
            $crate::facade! { @op_unary name [$Name] op [$UOp] ret [$uret] }
        )*
        $(
            $crate::facade! { @op_binary name [$Name] op [$BOp] rhs [$brhs] ret [$bret] }
        )*

        $crate::facade! { @copy_marker $copymark name [$Name] }
        $crate::facade! { @thread_marker $tmark name [$Name] }
    };

    // ---- facade impl and projections -----------------------------------

    (@facade_impl ref
        vis [$vis:vis] name [$Name:ident] space [$Space:ty]
        chain [$($chain:tt)*]
        extends [$( { $Base:ty as $bfield:ident } )*]
    ) => {
        $crate::paste::paste! {
            // SAFETY: the conventions struct, constraints, and blanket
            // Proxiable impl below are generated from the same declaration.
            unsafe impl $crate::Facade for $Name {
                type Conventions = [<$Name Conventions>];
                type Space = $Space;
                type MetaCell = $crate::MetaRef<[<$Name Conventions>]>;
                const CONSTRAINTS: $crate::Constraints = $crate::ConstraintsBuilder::new()
                    .restrict_layout(
                        ::core::mem::size_of::<$Space>(),
                        ::core::mem::align_of::<$Space>(),
                    )
                    $($chain)*
                    $( .merge_normalized(<$Base as $crate::Facade>::CONSTRAINTS) )*
                    .normalize();
            }

            impl $crate::ConvProject<[<$Name Conventions>]> for $Name {
                fn project(
                    conventions: &[<$Name Conventions>],
                ) -> &[<$Name Conventions>] {
                    conventions
                }
            }

            $(
                impl $crate::ConvProject<<$Base as $crate::Facade>::Conventions> for $Name {
                    fn project(
                        conventions: &[<$Name Conventions>],
                    ) -> &<$Base as $crate::Facade>::Conventions {
                        &conventions.$bfield
                    }
                }
            )*
        }
    };
    (@facade_impl inline
        vis [$vis:vis] name [$Name:ident] space [$Space:ty]
        chain [$($chain:tt)*]
        extends [$( { $Base:ty as $bfield:ident } )*]
    ) => {
        $crate::paste::paste! {
            // SAFETY: the conventions struct, constraints, and blanket
            // Proxiable impl below are generated from the same declaration.
            unsafe impl $crate::Facade for $Name {
                type Conventions = [<$Name Conventions>];
                type Space = $Space;
                type MetaCell = $crate::MetaInline<[<$Name Conventions>]>;
                const CONSTRAINTS: $crate::Constraints = $crate::ConstraintsBuilder::new()
                    .restrict_layout(
                        ::core::mem::size_of::<$Space>(),
                        ::core::mem::align_of::<$Space>(),
                    )
                    $($chain)*
                    $( .merge_normalized(<$Base as $crate::Facade>::CONSTRAINTS) )*
                    .normalize();
            }

            impl $crate::ConvProject<[<$Name Conventions>]> for $Name {
                fn project(
                    conventions: &[<$Name Conventions>],
                ) -> &[<$Name Conventions>] {
                    conventions
                }
            }

            $(
                impl $crate::ConvProject<<$Base as $crate::Facade>::Conventions> for $Name {
                    fn project(
                        conventions: &[<$Name Conventions>],
                    ) -> &<$Base as $crate::Facade>::Conventions {
                        &conventions.$bfield
                    }
                }
            )*
        }
    };

    // ---- conventions struct --------------------------------------------

    (@conventions_struct
        vis [$vis:vis] name [$Name:ident]
        traits [$( $Trait:ident )*]
        extends [$( { $Base:ty as $bfield:ident } )*]
        reflect [$( { $rname:ident : $rty:ty } )*]
        uops [$( { $UOp:ident -> $uret:ty } )*]
        bops [$( { $BOp:ident ($brhs:ty) -> $bret:ty } )*]
    ) => {
        $crate::paste::paste! {
            #[doc = ::core::concat!(
                "Dispatch conventions of [`", ::core::stringify!($Name), "`]."
            )]
            #[derive(Clone, Copy)]
            $vis struct [<$Name Conventions>] {
                $(
                    #[doc = ::core::concat!(
                        "Slots of [`", ::core::stringify!($Trait), "`]."
                    )]
                    pub [<$Trait:snake>]: [<$Trait Slots>],
                )*
                $(
                    #[doc = "Conventions inherited from the extended facade."]
                    pub $bfield: <$Base as $crate::Facade>::Conventions,
                )*
                $(
                    #[doc = ::core::concat!(
                        "The `", ::core::stringify!($rname), "` reflection value."
                    )]
                    pub $rname: $rty,
                )*
                $(
                    #[doc = ::core::concat!(
                        "`", ::core::stringify!($UOp), "` operator slot."
                    )]
                    pub [<$UOp:snake>]: unsafe fn($crate::PtrConst<'_>) -> $uret,
                )*
                $(
                    #[doc = ::core::concat!(
                        "`", ::core::stringify!($BOp), "` operator slot."
                    )]
                    pub [<$BOp:snake>]: unsafe fn($crate::PtrConst<'_>, $brhs) -> $bret,
                )*
            }
        }
    };

    // ---- blanket Proxiable impl ----------------------------------------

    (@proxiable
        name [$Name:ident]
        bound [$($sbound:tt)*]
        tbound [$($tbound:tt)*]
        builder [$builder:ident]
        dlevel [$($dlevel:tt)*]
        traits [$( $Trait:ident )*]
        extends [$( { $Base:ty as $bfield:ident } )*]
        reflect [$( { $rname:ident : $rty:ty } )*]
        uops [$( { $UOp:ident -> $uret:ty } )*]
        bops [$( { $BOp:ident ($brhs:ty) -> $bret:ty } )*]
    ) => {
        $crate::paste::paste! {
            // SAFETY: the metadata is built for exactly this storage type,
            // and the where clause is the conformance check.
            unsafe impl<S> $crate::Proxiable<$Name> for S
            where
                S: $crate::ErasedStorage $($sbound)* $($tbound)*,
                $( S: [<$Trait Binding>], )*
                $( S: $crate::Proxiable<$Base>, )*
                $( $rty: $crate::Reflect<S>, )*
                $(
                    for<'any> &'any <S as $crate::ErasedStorage>::Value:
                        ::core::ops::$UOp<Output = $uret>,
                )*
                $(
                    for<'any> &'any <S as $crate::ErasedStorage>::Value:
                        ::core::ops::$BOp<$brhs, Output = $bret>,
                )*
            {
                const METADATA: &'static $crate::Metadata<[<$Name Conventions>]> = &const {
                    $crate::Metadata {
                        lifetime: $crate::LifetimeSlots::$builder::<S>($($dlevel)*),
                        cast: $crate::CastSlot::$builder::<S>(),
                        conventions: [<$Name Conventions>] {
                            $( [<$Trait:snake>]: <S as [<$Trait Binding>]>::SLOTS, )*
                            $( $bfield: <S as $crate::Proxiable<$Base>>::METADATA.conventions, )*
                            $( $rname: <$rty as $crate::Reflect<S>>::VALUE, )*
                            $( [<$UOp:snake>]: [<__veneer_op_ $UOp:snake _ $Name:snake>]::<S>, )*
                            $( [<$BOp:snake>]: [<__veneer_op_ $BOp:snake _ $Name:snake>]::<S>, )*
                        },
                    }
                };
            }
        }
    };

    // ---- conventions ---------------------------------------------------

    (@conv direct
        attrs [$(#[$cattr:meta])*]
        vis [$vis:vis] name [$Name:ident]
        trait [$Trait:ident]
        body [$($body:tt)*]
    ) => {
        $(#[$cattr])*
        $vis trait $Trait {
            $($body)*
        }

        $crate::facade! { @slots_struct vis [$vis] trait [$Trait] acc [] body [$($body)*] }
        $crate::facade! { @direct_thunks trait [$Trait] body [$($body)*] }
        $crate::facade! { @binding_direct vis [$vis] trait [$Trait] body [$($body)*] }
        $crate::facade! { @accessors_impl name [$Name] trait [$Trait] body [$($body)*] }
    };

    (@conv indirect
        attrs [$(#[$cattr:meta])*]
        vis [$vis:vis] name [$Name:ident]
        trait [$Trait:ident]
        body [$($body:tt)*]
    ) => {
        $(#[$cattr])*
        $vis trait $Trait {
            $($body)*
        }

        $crate::facade! { @slots_struct vis [$vis] trait [$Trait] acc [] body [$($body)*] }
        $crate::facade! { @ind_thunks trait [$Trait] body [$($body)*] }
        $crate::facade! { @ind_scan
            vis [$vis] trait [$Trait] mutflag [] scan [$($body)*] body [$($body)*]
        }
        $crate::facade! { @accessors_impl name [$Name] trait [$Trait] body [$($body)*] }
    };

    (@conv weak
        attrs [$(#[$cattr:meta])*]
        vis [$vis:vis] name [$Name:ident]
        trait [$Trait:ident]
        body [$($body:tt)*]
    ) => {
        $(#[$cattr])*
        $vis trait $Trait {
            $crate::facade! { @weak_trait_items trait [$Trait] body [$($body)*] }
        }

        $crate::facade! { @weak_normalize
            vis [$vis] name [$Name] trait [$Trait] acc [] body [$($body)*]
        }
    };

    (@conv $other:ident $($rest:tt)*) => {
        ::core::compile_error!(::core::concat!(
            "unknown convention kind `",
            ::core::stringify!($other),
            "`; expected `direct`, `indirect`, or `weak`"
        ));
    };

    // ---- slots struct (shared by all convention kinds) ------------------

    (@slots_struct vis [$vis:vis] trait [$Trait:ident] acc [$($acc:tt)*] body []) => {
        $crate::paste::paste! {
            #[doc = ::core::concat!(
                "Dispatch slots of [`", ::core::stringify!($Trait), "`]."
            )]
            #[derive(Clone, Copy)]
            $vis struct [<$Trait Slots>] {
                $($acc)*
            }
        }
    };
    (@slots_struct vis [$vis:vis] trait [$Trait:ident] acc [$($acc:tt)*]
        body [
            $(#[$fattr:meta])*
            fn $f:ident(&self $(, $a:ident : $aty:ty)*) $(-> $ret:ty)?;
            $($more:tt)*
        ]
    ) => {
        $crate::facade! { @slots_struct vis [$vis] trait [$Trait]
            acc [
                $($acc)*
                #[doc = ::core::concat!("`", ::core::stringify!($f), "` slot.")]
                pub $f: unsafe fn($crate::PtrConst<'_> $(, $aty)*) -> ($($ret)?),
            ]
            body [$($more)*]
        }
    };
    (@slots_struct vis [$vis:vis] trait [$Trait:ident] acc [$($acc:tt)*]
        body [
            $(#[$fattr:meta])*
            fn $f:ident(&mut self $(, $a:ident : $aty:ty)*) $(-> $ret:ty)?;
            $($more:tt)*
        ]
    ) => {
        $crate::facade! { @slots_struct vis [$vis] trait [$Trait]
            acc [
                $($acc)*
                #[doc = ::core::concat!("`", ::core::stringify!($f), "` slot.")]
                pub $f: unsafe fn($crate::PtrMut<'_> $(, $aty)*) -> ($($ret)?),
            ]
            body [$($more)*]
        }
    };
    (@slots_struct vis [$vis:vis] trait [$Trait:ident] acc [$($acc:tt)*]
        body [
            $(#[$fattr:meta])*
            fn $f:ident(self $(, $a:ident : $aty:ty)*) $(-> $ret:ty)?;
            $($more:tt)*
        ]
    ) => {
        $crate::facade! { @slots_struct vis [$vis] trait [$Trait]
            acc [
                $($acc)*
                #[doc = ::core::concat!("`", ::core::stringify!($f), "` slot.")]
                pub $f: unsafe fn($crate::PtrMut<'_> $(, $aty)*) -> ($($ret)?),
            ]
            body [$($more)*]
        }
    };

    // ---- thunks, direct ------------------------------------------------

    (@direct_thunks trait [$Trait:ident] body []) => {};
    (@direct_thunks trait [$Trait:ident]
        body [
            $(#[$fattr:meta])*
            fn $f:ident(&self $(, $a:ident : $aty:ty)*) $(-> $ret:ty)?;
            $($more:tt)*
        ]
    ) => {
        $crate::paste::paste! {
            unsafe fn [<__veneer_ $Trait:snake _ $f>]<S>(
                this: $crate::PtrConst<'_>
                $(, $a: $aty)*
            ) -> ($($ret)?)
            where
                S: $crate::ErasedStorage,
                <S as $crate::ErasedStorage>::Value: $Trait,
            {
                // SAFETY: `this` addresses a live `S` in some wrapper buffer.
                let storage = unsafe { this.get::<S>() };
                $Trait::$f(<S as $crate::ErasedStorage>::value(storage) $(, $a)*)
            }
        }
        $crate::facade! { @direct_thunks trait [$Trait] body [$($more)*] }
    };
    (@direct_thunks trait [$Trait:ident]
        body [
            $(#[$fattr:meta])*
            fn $f:ident(&mut self $(, $a:ident : $aty:ty)*) $(-> $ret:ty)?;
            $($more:tt)*
        ]
    ) => {
        $crate::paste::paste! {
            unsafe fn [<__veneer_ $Trait:snake _ $f>]<S>(
                this: $crate::PtrMut<'_>
                $(, $a: $aty)*
            ) -> ($($ret)?)
            where
                S: $crate::ErasedStorage,
                <S as $crate::ErasedStorage>::Value: $Trait,
            {
                // SAFETY: `this` addresses a live `S`, exclusively borrowed.
                let storage = unsafe { this.get_mut::<S>() };
                $Trait::$f(<S as $crate::ErasedStorage>::value_mut(storage) $(, $a)*)
            }
        }
        $crate::facade! { @direct_thunks trait [$Trait] body [$($more)*] }
    };
    (@direct_thunks trait [$Trait:ident]
        body [
            $(#[$fattr:meta])*
            fn $f:ident(self $(, $a:ident : $aty:ty)*) $(-> $ret:ty)?;
            $($more:tt)*
        ]
    ) => {
        $crate::paste::paste! {
            unsafe fn [<__veneer_ $Trait:snake _ $f>]<S>(
                this: $crate::PtrMut<'_>
                $(, $a: $aty)*
            ) -> ($($ret)?)
            where
                S: $crate::ErasedStorage,
                <S as $crate::ErasedStorage>::Value: $Trait,
            {
                // SAFETY: consuming dispatch hands the buffer's storage over
                // exactly once.
                let storage = unsafe { this.read::<S>() };
                $Trait::$f(<S as $crate::ErasedStorage>::into_value(storage) $(, $a)*)
            }
        }
        $crate::facade! { @direct_thunks trait [$Trait] body [$($more)*] }
    };

    // ---- thunks, indirect ----------------------------------------------

    (@ind_thunks trait [$Trait:ident] body []) => {};
    (@ind_thunks trait [$Trait:ident]
        body [
            $(#[$fattr:meta])*
            fn $f:ident(&self $(, $a:ident : $aty:ty)*) $(-> $ret:ty)?;
            $($more:tt)*
        ]
    ) => {
        $crate::paste::paste! {
            unsafe fn [<__veneer_ $Trait:snake _ $f>]<S>(
                this: $crate::PtrConst<'_>
                $(, $a: $aty)*
            ) -> ($($ret)?)
            where
                S: $crate::ErasedStorage,
                <S as $crate::ErasedStorage>::Value: ::core::ops::Deref,
                <<S as $crate::ErasedStorage>::Value as ::core::ops::Deref>::Target: $Trait,
            {
                // SAFETY: `this` addresses a live `S` in some wrapper buffer.
                let storage = unsafe { this.get::<S>() };
                $Trait::$f(
                    ::core::ops::Deref::deref(<S as $crate::ErasedStorage>::value(storage))
                    $(, $a)*
                )
            }
        }
        $crate::facade! { @ind_thunks trait [$Trait] body [$($more)*] }
    };
    (@ind_thunks trait [$Trait:ident]
        body [
            $(#[$fattr:meta])*
            fn $f:ident(&mut self $(, $a:ident : $aty:ty)*) $(-> $ret:ty)?;
            $($more:tt)*
        ]
    ) => {
        $crate::paste::paste! {
            unsafe fn [<__veneer_ $Trait:snake _ $f>]<S>(
                this: $crate::PtrMut<'_>
                $(, $a: $aty)*
            ) -> ($($ret)?)
            where
                S: $crate::ErasedStorage,
                <S as $crate::ErasedStorage>::Value: ::core::ops::DerefMut,
                <<S as $crate::ErasedStorage>::Value as ::core::ops::Deref>::Target: $Trait,
            {
                // SAFETY: `this` addresses a live `S`, exclusively borrowed.
                let storage = unsafe { this.get_mut::<S>() };
                $Trait::$f(
                    ::core::ops::DerefMut::deref_mut(
                        <S as $crate::ErasedStorage>::value_mut(storage),
                    )
                    $(, $a)*
                )
            }
        }
        $crate::facade! { @ind_thunks trait [$Trait] body [$($more)*] }
    };
    (@ind_thunks trait [$Trait:ident]
        body [
            $(#[$fattr:meta])*
            fn $f:ident(self $($args:tt)*) $(-> $ret:ty)?;
            $($more:tt)*
        ]
    ) => {
        ::core::compile_error!(
            "indirect conventions cannot take `self` by value; the proxy owns \
             the handle, not its target"
        );
    };

    // ---- indirect binding: scan for &mut methods, then emit -------------

    (@ind_scan vis $v:tt trait $t:tt mutflag $mf:tt scan [] body $b:tt) => {
        $crate::facade! { @ind_binding vis $v trait $t mutflag $mf body $b }
    };
    (@ind_scan vis $v:tt trait $t:tt mutflag $mf:tt
        scan [
            $(#[$fattr:meta])*
            fn $f:ident(&mut self $($args:tt)*) $(-> $ret:ty)?;
            $($more:tt)*
        ]
        body $b:tt
    ) => {
        $crate::facade! { @ind_scan vis $v trait $t mutflag [yes] scan [$($more)*] body $b }
    };
    (@ind_scan vis $v:tt trait $t:tt mutflag $mf:tt
        scan [
            $(#[$fattr:meta])*
            fn $f:ident($($args:tt)*) $(-> $ret:ty)?;
            $($more:tt)*
        ]
        body $b:tt
    ) => {
        $crate::facade! { @ind_scan vis $v trait $t mutflag $mf scan [$($more)*] body $b }
    };

    (@ind_binding vis [$vis:vis] trait [$Trait:ident] mutflag [] body [$($body:tt)*]) => {
        $crate::paste::paste! {
            #[doc = ::core::concat!(
                "Storage-side binding of [`", ::core::stringify!($Trait), "`]."
            )]
            $vis trait [<$Trait Binding>]: $crate::ErasedStorage {
                /// The slots built for this storage type.
                const SLOTS: [<$Trait Slots>];
            }

            impl<S> [<$Trait Binding>] for S
            where
                S: $crate::ErasedStorage,
                <S as $crate::ErasedStorage>::Value: ::core::ops::Deref,
                <<S as $crate::ErasedStorage>::Value as ::core::ops::Deref>::Target: $Trait,
            {
                const SLOTS: [<$Trait Slots>] =
                    $crate::facade! { @slots_init storage [S] trait [$Trait] acc [] body [$($body)*] };
            }
        }
    };
    (@ind_binding vis [$vis:vis] trait [$Trait:ident] mutflag [yes] body [$($body:tt)*]) => {
        $crate::paste::paste! {
            #[doc = ::core::concat!(
                "Storage-side binding of [`", ::core::stringify!($Trait), "`]."
            )]
            $vis trait [<$Trait Binding>]: $crate::ErasedStorage {
                /// The slots built for this storage type.
                const SLOTS: [<$Trait Slots>];
            }

            impl<S> [<$Trait Binding>] for S
            where
                S: $crate::ErasedStorage,
                <S as $crate::ErasedStorage>::Value: ::core::ops::DerefMut,
                <<S as $crate::ErasedStorage>::Value as ::core::ops::Deref>::Target: $Trait,
            {
                const SLOTS: [<$Trait Slots>] =
                    $crate::facade! { @slots_init storage [S] trait [$Trait] acc [] body [$($body)*] };
            }
        }
    };

    // ---- direct/weak binding -------------------------------------------

    (@binding_direct vis [$vis:vis] trait [$Trait:ident] body [$($body:tt)*]) => {
        $crate::paste::paste! {
            #[doc = ::core::concat!(
                "Storage-side binding of [`", ::core::stringify!($Trait), "`]."
            )]
            $vis trait [<$Trait Binding>]: $crate::ErasedStorage {
                /// The slots built for this storage type.
                const SLOTS: [<$Trait Slots>];
            }

            impl<S> [<$Trait Binding>] for S
            where
                S: $crate::ErasedStorage,
                <S as $crate::ErasedStorage>::Value: $Trait,
            {
                const SLOTS: [<$Trait Slots>] =
                    $crate::facade! { @slots_init storage [S] trait [$Trait] acc [] body [$($body)*] };
            }
        }
    };

    // Slot table literal; receiver-agnostic, one entry per method.
    (@slots_init storage [$S:ident] trait [$Trait:ident] acc [$($acc:tt)*] body []) => {
        $crate::paste::paste! {
            [<$Trait Slots>] {
                $($acc)*
            }
        }
    };
    (@slots_init storage [$S:ident] trait [$Trait:ident] acc [$($acc:tt)*]
        body [
            $(#[$fattr:meta])*
            fn $f:ident($($args:tt)*) $(-> $ret:ty)?;
            $($more:tt)*
        ]
    ) => {
        $crate::facade! { @slots_init storage [$S] trait [$Trait]
            acc [ $($acc)* $f: [<__veneer_ $Trait:snake _ $f>]::<$S>, ]
            body [$($more)*]
        }
    };

    // ---- accessor impl on the wrapper ----------------------------------

    (@accessors_impl name [$Name:ident] trait [$Trait:ident] body [$($body:tt)*]) => {
        $crate::paste::paste! {
            impl<F> $Trait for $crate::Proxy<F>
            where
                F: $crate::Facade + $crate::ConvProject<[<$Name Conventions>]>,
            {
                $crate::facade! { @accessor_fns name [$Name] body [$($body)*] }
            }
        }
    };

    (@accessor_fns name [$Name:ident] body []) => {};
    (@accessor_fns name [$Name:ident]
        body [
            $(#[$fattr:meta])*
            fn $f:ident(&self $(, $a:ident : $aty:ty)*) $(-> $ret:ty)?;
            $($more:tt)*
        ]
    ) => {
        $crate::paste::paste! {
            fn $f(&self $(, $a: $aty)*) $(-> $ret)? {
                let (conventions, value) = self.dispatch_ref::<[<$Name Conventions>]>();
                // SAFETY: the slot was built for the storage behind `value`.
                unsafe { (conventions.$f)(value $(, $a)*) }
            }
        }
        $crate::facade! { @accessor_fns name [$Name] body [$($more)*] }
    };
    (@accessor_fns name [$Name:ident]
        body [
            $(#[$fattr:meta])*
            fn $f:ident(&mut self $(, $a:ident : $aty:ty)*) $(-> $ret:ty)?;
            $($more:tt)*
        ]
    ) => {
        $crate::paste::paste! {
            fn $f(&mut self $(, $a: $aty)*) $(-> $ret)? {
                let (conventions, value) = self.dispatch_mut::<[<$Name Conventions>]>();
                // SAFETY: the slot was built for the storage behind `value`.
                unsafe { (conventions.$f)(value $(, $a)*) }
            }
        }
        $crate::facade! { @accessor_fns name [$Name] body [$($more)*] }
    };
    (@accessor_fns name [$Name:ident]
        body [
            $(#[$fattr:meta])*
            fn $f:ident(self $(, $a:ident : $aty:ty)*) $(-> $ret:ty)?;
            $($more:tt)*
        ]
    ) => {
        $crate::paste::paste! {
            fn $f(mut self $(, $a: $aty)*) $(-> $ret)? {
                let (conventions, value) = self.dispatch_consume::<[<$Name Conventions>]>();
                // SAFETY: the wrapper is already empty; the slot moves the
                // storage out of the buffer exactly once.
                unsafe { (conventions.$f)(value $(, $a)*) }
            }
        }
        $crate::facade! { @accessor_fns name [$Name] body [$($more)*] }
    };

    // ---- weak conventions ----------------------------------------------

    (@weak_trait_items trait [$Trait:ident] body []) => {};
    (@weak_trait_items trait [$Trait:ident]
        body [
            $(#[$fattr:meta])*
            fn $f:ident(&self $(, $a:ident : $aty:ty)*) $(-> $ret:ty)?;
            $($more:tt)*
        ]
    ) => {
        $(#[$fattr])*
        fn $f(&self $(, $a: $aty)*) -> ::core::result::Result<($($ret)?), $crate::NotImplemented> {
            $( let _ = $a; )*
            ::core::result::Result::Err($crate::NotImplemented::new(
                ::core::concat!(::core::stringify!($Trait), "::", ::core::stringify!($f)),
            ))
        }
        $crate::facade! { @weak_trait_items trait [$Trait] body [$($more)*] }
    };
    (@weak_trait_items trait [$Trait:ident]
        body [
            $(#[$fattr:meta])*
            fn $f:ident(&mut self $(, $a:ident : $aty:ty)*) $(-> $ret:ty)?;
            $($more:tt)*
        ]
    ) => {
        $(#[$fattr])*
        fn $f(&mut self $(, $a: $aty)*) -> ::core::result::Result<($($ret)?), $crate::NotImplemented> {
            $( let _ = $a; )*
            ::core::result::Result::Err($crate::NotImplemented::new(
                ::core::concat!(::core::stringify!($Trait), "::", ::core::stringify!($f)),
            ))
        }
        $crate::facade! { @weak_trait_items trait [$Trait] body [$($more)*] }
    };
    (@weak_trait_items trait [$Trait:ident]
        body [
            $(#[$fattr:meta])*
            fn $f:ident(self $(, $a:ident : $aty:ty)*) $(-> $ret:ty)?;
            $($more:tt)*
        ]
    ) => {
        $(#[$fattr])*
        fn $f(self $(, $a: $aty)*) -> ::core::result::Result<($($ret)?), $crate::NotImplemented>
        where
            Self: ::core::marker::Sized,
        {
            $( let _ = $a; )*
            ::core::result::Result::Err($crate::NotImplemented::new(
                ::core::concat!(::core::stringify!($Trait), "::", ::core::stringify!($f)),
            ))
        }
        $crate::facade! { @weak_trait_items trait [$Trait] body [$($more)*] }
    };

    // Rewrite weak signatures to their fallible form, then reuse the direct
    // emitters against the rewritten body.
    (@weak_normalize vis $v:tt name $n:tt trait [$Trait:ident] acc [$($acc:tt)*] body []) => {
        $crate::facade! { @slots_struct vis $v trait [$Trait] acc [] body [$($acc)*] }
        $crate::facade! { @direct_thunks trait [$Trait] body [$($acc)*] }
        $crate::facade! { @binding_direct vis $v trait [$Trait] body [$($acc)*] }
        $crate::facade! { @accessors_impl name $n trait [$Trait] body [$($acc)*] }
    };
    (@weak_normalize vis $v:tt name $n:tt trait [$Trait:ident] acc [$($acc:tt)*]
        body [
            $(#[$fattr:meta])*
            fn $f:ident(&self $(, $a:ident : $aty:ty)*) $(-> $ret:ty)?;
            $($more:tt)*
        ]
    ) => {
        $crate::facade! { @weak_normalize vis $v name $n trait [$Trait]
            acc [
                $($acc)*
                fn $f(&self $(, $a : $aty)*)
                    -> ::core::result::Result<($($ret)?), $crate::NotImplemented>;
            ]
            body [$($more)*]
        }
    };
    (@weak_normalize vis $v:tt name $n:tt trait [$Trait:ident] acc [$($acc:tt)*]
        body [
            $(#[$fattr:meta])*
            fn $f:ident(&mut self $(, $a:ident : $aty:ty)*) $(-> $ret:ty)?;
            $($more:tt)*
        ]
    ) => {
        $crate::facade! { @weak_normalize vis $v name $n trait [$Trait]
            acc [
                $($acc)*
                fn $f(&mut self $(, $a : $aty)*)
                    -> ::core::result::Result<($($ret)?), $crate::NotImplemented>;
            ]
            body [$($more)*]
        }
    };
    (@weak_normalize vis $v:tt name $n:tt trait [$Trait:ident] acc [$($acc:tt)*]
        body [
            $(#[$fattr:meta])*
            fn $f:ident(self $(, $a:ident : $aty:ty)*) $(-> $ret:ty)?;
            $($more:tt)*
        ]
    ) => {
        $crate::facade! { @weak_normalize vis $v name $n trait [$Trait]
            acc [
                $($acc)*
                fn $f(self $(, $a : $aty)*)
                    -> ::core::result::Result<($($ret)?), $crate::NotImplemented>;
            ]
            body [$($more)*]
        }
    };

    // ---- reflections ----------------------------------------------------

    (@reflections vis [$vis:vis] name [$Name:ident] reflect []) => {};
    (@reflections vis [$vis:vis] name [$Name:ident]
        reflect [$( { $rname:ident : $rty:ty } )+]
    ) => {
        $crate::paste::paste! {
            #[doc = ::core::concat!(
                "Reflection values recorded by [`", ::core::stringify!($Name), "`]."
            )]
            $vis trait [<$Name Reflections>] {
                $(
                    #[doc = ::core::concat!(
                        "The `", ::core::stringify!($rname), "` value for the bound storage."
                    )]
                    fn $rname(&self) -> $rty;
                )+
            }

            impl<F> [<$Name Reflections>] for $crate::Proxy<F>
            where
                F: $crate::Facade + $crate::ConvProject<[<$Name Conventions>]>,
            {
                $(
                    fn $rname(&self) -> $rty {
                        self.dispatch_ref::<[<$Name Conventions>]>().0.$rname
                    }
                )+
            }
        }
    };

    // ---- operators -------------------------------------------------------

    (@op_unary name [$Name:ident] op [$UOp:ident] ret [$uret:ty]) => {
        $crate::paste::paste! {
            unsafe fn [<__veneer_op_ $UOp:snake _ $Name:snake>]<S>(
                this: $crate::PtrConst<'_>,
            ) -> $uret
            where
                S: $crate::ErasedStorage,
                for<'any> &'any <S as $crate::ErasedStorage>::Value:
                    ::core::ops::$UOp<Output = $uret>,
            {
                // SAFETY: `this` addresses a live `S` in some wrapper buffer.
                let storage = unsafe { this.get::<S>() };
                ::core::ops::$UOp::[<$UOp:lower>](<S as $crate::ErasedStorage>::value(storage))
            }

            impl $crate::[<$UOp Dispatch>] for $Name {
                type Output = $uret;

                fn slot(
                    conventions: &[<$Name Conventions>],
                ) -> unsafe fn($crate::PtrConst<'_>) -> $uret {
                    conventions.[<$UOp:snake>]
                }
            }
        }
    };

    (@op_binary name [$Name:ident] op [$BOp:ident] rhs [$brhs:ty] ret [$bret:ty]) => {
        $crate::paste::paste! {
            unsafe fn [<__veneer_op_ $BOp:snake _ $Name:snake>]<S>(
                this: $crate::PtrConst<'_>,
                rhs: $brhs,
            ) -> $bret
            where
                S: $crate::ErasedStorage,
                for<'any> &'any <S as $crate::ErasedStorage>::Value:
                    ::core::ops::$BOp<$brhs, Output = $bret>,
            {
                // SAFETY: `this` addresses a live `S` in some wrapper buffer.
                let storage = unsafe { this.get::<S>() };
                ::core::ops::$BOp::[<$BOp:lower>](
                    <S as $crate::ErasedStorage>::value(storage),
                    rhs,
                )
            }

            impl $crate::[<$BOp Dispatch>] for $Name {
                type Rhs = $brhs;
                type Output = $bret;

                fn slot(
                    conventions: &[<$Name Conventions>],
                ) -> unsafe fn($crate::PtrConst<'_>, $brhs) -> $bret {
                    conventions.[<$BOp:snake>]
                }
            }
        }
    };

    // ---- marker impls ----------------------------------------------------

    (@copy_marker no name [$Name:ident]) => {};
    (@copy_marker yes name [$Name:ident]) => {
        // SAFETY: conformance required a cloneable storage, so the clone
        // slot is populated for every bound value.
        unsafe impl $crate::CopyableFacade for $Name {}
    };

    (@thread_marker off name [$Name:ident]) => {};
    (@thread_marker on name [$Name:ident]) => {
        // SAFETY: conformance required `Send + Sync` storages.
        unsafe impl $crate::ThreadSafeFacade for $Name {}
    };
}
