//! Public entry points, one per operation family.
//!
//! Every entry point validates its options, resolves the operand shape,
//! looks up the typed cell for the resolved element type and runs it.

use std::fmt;
use std::sync::OnceLock;

use crate::config::{OpConfig, OptionSet};
use crate::element::ElementType;
use crate::error::{Error, Result};
use crate::kernels::{arith, bitwise, compare as relation, math};
use crate::operand::Operand;
use crate::resolve::{self, BinaryRules};
use crate::scalar::Scalar;

pub(crate) mod table;

use self::table::KernelTable;

macro_rules! named_ops {
    ($(#[$meta:meta])* pub enum $name:ident { $($variant:ident => $label:literal,)* }) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant,)*
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant,)*];

            pub const fn name(self) -> &'static str {
                match self {
                    $($name::$variant => $label,)*
                }
            }

            pub fn from_name(name: &str) -> Option<Self> {
                Self::ALL.iter().copied().find(|op| op.name() == name)
            }

            /// Position in [`Self::ALL`].
            const fn index(self) -> usize {
                self as usize
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.name())
            }
        }
    };
}

named_ops! {
    /// One array in, one array out.
    pub enum UnaryOp {
        Acos => "acos",
        Acosh => "acosh",
        Asin => "asin",
        Asinh => "asinh",
        Atan => "atan",
        Atanh => "atanh",
        Cos => "cos",
        Cosh => "cosh",
        Sin => "sin",
        Sinh => "sinh",
        Tan => "tan",
        Tanh => "tanh",
        Exp => "exp",
        Expm1 => "expm1",
        Log => "log",
        Log10 => "log10",
        Log1p => "log1p",
        Sqrt => "sqrt",
        Ceil => "ceil",
        Floor => "floor",
        Trunc => "trunc",
        Degrees => "degrees",
        Radians => "radians",
        Fabs => "fabs",
        Erf => "erf",
        Erfc => "erfc",
        Gamma => "gamma",
        Lgamma => "lgamma",
        Neg => "neg",
        Abs => "abs_",
        Pow2 => "pow2",
        Pow3 => "pow3",
        Invert => "invert",
    }
}

impl UnaryOp {
    pub fn options(self) -> OptionSet {
        match self {
            UnaryOp::Invert => OptionSet::MAXLEN,
            _ => OptionSet::CHECKED,
        }
    }

    fn table(self) -> &'static KernelTable<table::UnaryFn> {
        static TABLES: OnceLock<Vec<KernelTable<table::UnaryFn>>> = OnceLock::new();
        &table::cached(&TABLES, Self::ALL, Self::build_table)[self.index()]
    }

    fn build_table(self) -> KernelTable<table::UnaryFn> {
        use math::*;
        let name = self.name();
        match self {
            UnaryOp::Acos => table::float_unary::<Acos>(name),
            UnaryOp::Acosh => table::float_unary::<Acosh>(name),
            UnaryOp::Asin => table::float_unary::<Asin>(name),
            UnaryOp::Asinh => table::float_unary::<Asinh>(name),
            UnaryOp::Atan => table::float_unary::<Atan>(name),
            UnaryOp::Atanh => table::float_unary::<Atanh>(name),
            UnaryOp::Cos => table::float_unary::<Cos>(name),
            UnaryOp::Cosh => table::float_unary::<Cosh>(name),
            UnaryOp::Sin => table::float_unary::<Sin>(name),
            UnaryOp::Sinh => table::float_unary::<Sinh>(name),
            UnaryOp::Tan => table::float_unary::<Tan>(name),
            UnaryOp::Tanh => table::float_unary::<Tanh>(name),
            UnaryOp::Exp => table::float_unary::<Exp>(name),
            UnaryOp::Expm1 => table::float_unary::<Expm1>(name),
            UnaryOp::Log => table::float_unary::<Log>(name),
            UnaryOp::Log10 => table::float_unary::<Log10>(name),
            UnaryOp::Log1p => table::float_unary::<Log1p>(name),
            UnaryOp::Sqrt => table::float_unary::<Sqrt>(name),
            UnaryOp::Ceil => table::float_unary::<Ceil>(name),
            UnaryOp::Floor => table::float_unary::<Floor>(name),
            UnaryOp::Trunc => table::float_unary::<Trunc>(name),
            UnaryOp::Degrees => table::float_unary::<Degrees>(name),
            UnaryOp::Radians => table::float_unary::<Radians>(name),
            UnaryOp::Fabs => table::float_unary::<Fabs>(name),
            UnaryOp::Erf => table::float_unary::<Erf>(name),
            UnaryOp::Erfc => table::float_unary::<Erfc>(name),
            UnaryOp::Gamma => table::float_unary::<Gamma>(name),
            UnaryOp::Lgamma => table::float_unary::<Lgamma>(name),
            UnaryOp::Neg => table::signed_unary::<Neg>(name),
            UnaryOp::Abs => table::any_unary::<Abs>(name),
            UnaryOp::Pow2 => table::any_unary::<Pow2>(name),
            UnaryOp::Pow3 => table::any_unary::<Pow3>(name),
            UnaryOp::Invert => table::integer_unary::<bitwise::Invert>(name),
        }
    }
}

named_ops! {
    /// Two operands, at least one of them an array.
    pub enum BinaryOp {
        Add => "add",
        Sub => "sub",
        Mul => "mul",
        TrueDiv => "truediv",
        FloorDiv => "floordiv",
        Mod => "mod",
        Pow => "pow",
        BitAnd => "and_",
        BitOr => "or_",
        BitXor => "xor",
        LShift => "lshift",
        RShift => "rshift",
        CopySign => "copysign",
        FMod => "fmod",
        Hypot => "hypot",
        Atan2 => "atan2",
    }
}

fn zero(_: ElementType) -> Scalar {
    Scalar::Int(0)
}

fn one(_: ElementType) -> Scalar {
    Scalar::Int(1)
}

/// Every bit set in the element type.
fn all_bits(element_type: ElementType) -> Scalar {
    match element_type.category() {
        crate::element::Category::Unsigned => {
            let max = (1u128 << (element_type.width() * 8)) - 1;
            Scalar::from(max as u64)
        }
        _ => Scalar::Int(-1),
    }
}

impl BinaryOp {
    pub fn options(self) -> OptionSet {
        match self {
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::TrueDiv => OptionSet::ALL,
            BinaryOp::BitAnd
            | BinaryOp::BitOr
            | BinaryOp::BitXor
            | BinaryOp::LShift
            | BinaryOp::RShift => OptionSet::MAXLEN,
            _ => OptionSet::CHECKED,
        }
    }

    /// Value substituted for an omitted second operand.
    pub fn default_operand(self, element_type: ElementType) -> Option<Scalar> {
        self.default_fn().map(|default| default(element_type))
    }

    fn default_fn(self) -> Option<fn(ElementType) -> Scalar> {
        match self {
            BinaryOp::Add
            | BinaryOp::Sub
            | BinaryOp::BitOr
            | BinaryOp::BitXor
            | BinaryOp::LShift
            | BinaryOp::RShift => Some(zero),
            BinaryOp::Mul | BinaryOp::TrueDiv | BinaryOp::FloorDiv | BinaryOp::Pow => Some(one),
            BinaryOp::BitAnd => Some(all_bits),
            BinaryOp::Mod
            | BinaryOp::CopySign
            | BinaryOp::FMod
            | BinaryOp::Hypot
            | BinaryOp::Atan2 => None,
        }
    }

    fn table(self) -> &'static KernelTable<table::BinaryFn> {
        static TABLES: OnceLock<Vec<KernelTable<table::BinaryFn>>> = OnceLock::new();
        &table::cached(&TABLES, Self::ALL, Self::build_table)[self.index()]
    }

    fn build_table(self) -> KernelTable<table::BinaryFn> {
        let name = self.name();
        match self {
            BinaryOp::Add => table::arithmetic::<arith::Add>(name),
            BinaryOp::Sub => table::arithmetic::<arith::Sub>(name),
            BinaryOp::Mul => table::arithmetic::<arith::Mul>(name),
            BinaryOp::TrueDiv => table::float_binary::<arith::TrueDiv>(name),
            BinaryOp::FloorDiv => table::arithmetic::<arith::FloorDiv>(name),
            BinaryOp::Mod => table::arithmetic::<arith::Mod>(name),
            BinaryOp::Pow => table::arithmetic::<arith::Pow>(name),
            BinaryOp::BitAnd => table::integer_binary::<bitwise::BitAnd>(name),
            BinaryOp::BitOr => table::integer_binary::<bitwise::BitOr>(name),
            BinaryOp::BitXor => table::integer_binary::<bitwise::BitXor>(name),
            BinaryOp::LShift => table::integer_binary::<bitwise::ShiftLeft>(name),
            BinaryOp::RShift => table::integer_binary::<bitwise::ShiftRight>(name),
            BinaryOp::CopySign => table::float_binary::<arith::CopySign>(name),
            BinaryOp::FMod => table::float_binary::<arith::FMod>(name),
            BinaryOp::Hypot => table::float_binary::<arith::Hypot>(name),
            BinaryOp::Atan2 => table::float_binary::<arith::Atan2>(name),
        }
    }
}

named_ops! {
    /// All-elements comparisons.
    pub enum CompareOp {
        Eq => "eq",
        Ne => "ne",
        Lt => "lt",
        Le => "le",
        Gt => "gt",
        Ge => "ge",
    }
}

impl CompareOp {
    fn table(self) -> &'static KernelTable<table::CompareFn> {
        static TABLES: OnceLock<Vec<KernelTable<table::CompareFn>>> = OnceLock::new();
        &table::cached(&TABLES, Self::ALL, Self::build_table)[self.index()]
    }

    fn build_table(self) -> KernelTable<table::CompareFn> {
        let name = self.name();
        match self {
            CompareOp::Eq => table::comparison::<relation::Equal>(name),
            CompareOp::Ne => table::comparison::<relation::NotEqual>(name),
            CompareOp::Lt => table::comparison::<relation::Less>(name),
            CompareOp::Le => table::comparison::<relation::LessEqual>(name),
            CompareOp::Gt => table::comparison::<relation::Greater>(name),
            CompareOp::Ge => table::comparison::<relation::GreaterEqual>(name),
        }
    }
}

named_ops! {
    pub enum ReduceOp {
        Max => "amax",
        Min => "amin",
        Sum => "asum",
    }
}

impl ReduceOp {
    pub fn options(self) -> OptionSet {
        match self {
            ReduceOp::Sum => OptionSet::ALL,
            ReduceOp::Max | ReduceOp::Min => OptionSet::SCAN,
        }
    }

    fn table(self) -> &'static KernelTable<table::ReduceFn> {
        static TABLES: OnceLock<Vec<KernelTable<table::ReduceFn>>> = OnceLock::new();
        &table::cached(&TABLES, Self::ALL, Self::build_table)[self.index()]
    }

    fn build_table(self) -> KernelTable<table::ReduceFn> {
        match self {
            ReduceOp::Max => table::amax(),
            ReduceOp::Min => table::amin(),
            ReduceOp::Sum => table::asum(),
        }
    }
}

named_ops! {
    /// Float classification, true if any element matches (all, for
    /// `isfinite`).
    pub enum PredicateOp {
        IsNan => "isnan",
        IsInf => "isinf",
        IsFinite => "isfinite",
    }
}

impl PredicateOp {
    fn table(self) -> &'static KernelTable<table::PredicateFn> {
        static TABLES: OnceLock<Vec<KernelTable<table::PredicateFn>>> = OnceLock::new();
        &table::cached(&TABLES, Self::ALL, Self::build_table)[self.index()]
    }

    fn build_table(self) -> KernelTable<table::PredicateFn> {
        match self {
            PredicateOp::IsNan => table::isnan(),
            PredicateOp::IsInf => table::isinf(),
            PredicateOp::IsFinite => table::isfinite(),
        }
    }
}

/// Any operation, addressed by its public name.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
    Unary(UnaryOp),
    Ldexp,
    Binary(BinaryOp),
    Fma,
    Reduce(ReduceOp),
    Predicate(PredicateOp),
    Compare(CompareOp),
    Repeat,
    Count,
    Cycle,
    Compress,
}

impl Operation {
    /// Every operation, in a stable order.
    pub fn all() -> Vec<Operation> {
        let mut ops: Vec<Operation> = UnaryOp::ALL.iter().copied().map(Operation::Unary).collect();
        ops.push(Operation::Ldexp);
        ops.extend(BinaryOp::ALL.iter().copied().map(Operation::Binary));
        ops.push(Operation::Fma);
        ops.extend(ReduceOp::ALL.iter().copied().map(Operation::Reduce));
        ops.extend(PredicateOp::ALL.iter().copied().map(Operation::Predicate));
        ops.extend(CompareOp::ALL.iter().copied().map(Operation::Compare));
        ops.extend([
            Operation::Repeat,
            Operation::Count,
            Operation::Cycle,
            Operation::Compress,
        ]);
        ops
    }

    pub fn from_name(name: &str) -> Result<Self> {
        Self::all()
            .into_iter()
            .find(|op| op.name() == name)
            .ok_or(Error::InvalidOperator)
    }

    pub fn name(self) -> &'static str {
        match self {
            Operation::Unary(op) => op.name(),
            Operation::Binary(op) => op.name(),
            Operation::Reduce(op) => op.name(),
            Operation::Predicate(op) => op.name(),
            Operation::Compare(op) => op.name(),
            Operation::Ldexp => "ldexp",
            Operation::Fma => "fma",
            Operation::Repeat => "repeat",
            Operation::Count => "count",
            Operation::Cycle => "cycle",
            Operation::Compress => "compress",
        }
    }

    /// Options the operation accepts.
    pub fn options(self) -> OptionSet {
        match self {
            Operation::Unary(op) => op.options(),
            Operation::Binary(op) => op.options(),
            Operation::Reduce(op) => op.options(),
            Operation::Ldexp | Operation::Fma | Operation::Count => OptionSet::CHECKED,
            Operation::Predicate(_)
            | Operation::Compare(_)
            | Operation::Repeat
            | Operation::Cycle
            | Operation::Compress => OptionSet::MAXLEN,
        }
    }

    /// Element types with a kernel for this operation.
    pub fn supported_types(self) -> Vec<ElementType> {
        match self {
            Operation::Unary(op) => op.table().supported(),
            Operation::Binary(op) => op.table().supported(),
            Operation::Reduce(op) => op.table().supported(),
            Operation::Predicate(op) => op.table().supported(),
            Operation::Compare(op) => op.table().supported(),
            Operation::Ldexp => table::ldexp().supported(),
            Operation::Fma => table::fma().supported(),
            Operation::Repeat => table::repeat().supported(),
            Operation::Count => table::count().supported(),
            Operation::Cycle => table::cycle().supported(),
            Operation::Compress => table::compress().supported(),
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Applies a one-array operation, in place or into `out`.
#[tracing::instrument(level = "trace", skip_all, fields(op = op.name()))]
pub fn unary<'a>(
    op: UnaryOp,
    data: Operand<'a>,
    out: Option<Operand<'a>>,
    config: &OpConfig,
) -> Result<()> {
    op.options().validate(config)?;
    let mut call = resolve::unary(data, out, config)?;
    let cell = op.table().cell(call.desc.element_type)?;
    cell(&mut call, config)
}

/// `data * 2**exponent`. The exponent must be an integer that fits in 32 bits.
#[tracing::instrument(level = "trace", skip_all, fields(op = "ldexp"))]
pub fn ldexp<'a>(
    data: Operand<'a>,
    exponent: Operand<'a>,
    out: Option<Operand<'a>>,
    config: &OpConfig,
) -> Result<()> {
    OptionSet::CHECKED.validate(config)?;
    let mut call = resolve::unary(data, out, config)?;
    let exponent = resolve::required_param(Some(exponent), "exponent")?;
    let exponent = match exponent {
        Scalar::Float(_) => return Err(Error::TypeMismatch),
        integral => integral
            .as_i128()
            .and_then(|value| i32::try_from(value).ok())
            .ok_or(Error::Overflow)?,
    };
    let cell = table::ldexp().cell(call.desc.element_type)?;
    cell(&mut call, exponent, config)
}

/// Applies a two-operand operation. With `rhs` omitted the operation's
/// default operand is used. Results go to `out` if given, else to the first
/// array operand.
#[tracing::instrument(level = "trace", skip_all, fields(op = op.name()))]
pub fn binary<'a>(
    op: BinaryOp,
    lhs: Operand<'a>,
    rhs: Option<Operand<'a>>,
    out: Option<Operand<'a>>,
    config: &OpConfig,
) -> Result<()> {
    op.options().validate(config)?;
    let rules = BinaryRules {
        default: op.default_fn(),
        writes: true,
    };
    let mut call = resolve::binary(lhs, rhs, out, rules, config)?;
    let cell = op.table().cell(call.desc.element_type)?;
    cell(&mut call, config)
}

/// Fused `x * y + z` with a single rounding. `y` and `z` may be scalars.
#[tracing::instrument(level = "trace", skip_all, fields(op = "fma"))]
pub fn fma<'a>(
    x: Operand<'a>,
    y: Operand<'a>,
    z: Operand<'a>,
    out: Option<Operand<'a>>,
    config: &OpConfig,
) -> Result<()> {
    OptionSet::CHECKED.validate(config)?;
    let mut call = resolve::ternary(x, y, z, out, config)?;
    let cell = table::fma().cell(call.desc.element_type)?;
    cell(&mut call, config)
}

#[tracing::instrument(level = "trace", skip_all, fields(op = op.name()))]
pub fn reduce(op: ReduceOp, data: Operand<'_>, config: &OpConfig) -> Result<Scalar> {
    op.options().validate(config)?;
    let call = resolve::single(data, false, config)?;
    let cell = op.table().cell(call.desc.element_type)?;
    cell(&call, config)
}

#[tracing::instrument(level = "trace", skip_all, fields(op = op.name()))]
pub fn predicate(op: PredicateOp, data: Operand<'_>, config: &OpConfig) -> Result<bool> {
    OptionSet::MAXLEN.validate(config)?;
    let call = resolve::single(data, false, config)?;
    let cell = op.table().cell(call.desc.element_type)?;
    cell(&call, config)
}

/// True when every element pair satisfies the comparison. Either side may be
/// a scalar.
#[tracing::instrument(level = "trace", skip_all, fields(op = op.name()))]
pub fn compare<'a>(
    op: CompareOp,
    lhs: Operand<'a>,
    rhs: Operand<'a>,
    config: &OpConfig,
) -> Result<bool> {
    OptionSet::MAXLEN.validate(config)?;
    let rules = BinaryRules {
        default: None,
        writes: false,
    };
    let call = resolve::binary(lhs, Some(rhs), None, rules, config)?;
    let cell = op.table().cell(call.desc.element_type)?;
    cell(&call, config)
}

/// Fills `data` with `value`.
#[tracing::instrument(level = "trace", skip_all, fields(op = "repeat"))]
pub fn repeat<'a>(data: Operand<'a>, value: Operand<'a>, config: &OpConfig) -> Result<()> {
    OptionSet::MAXLEN.validate(config)?;
    let mut call = resolve::single(data, true, config)?;
    let value = resolve::required_param(Some(value), "value")?;
    let cell = table::repeat().cell(call.desc.element_type)?;
    cell(&mut call, value, config)
}

/// Fills `data` with `start, start + step, ...`. `start` defaults to 0 and
/// `step` to 1.
#[tracing::instrument(level = "trace", skip_all, fields(op = "count"))]
pub fn count<'a>(
    data: Operand<'a>,
    start: Option<Operand<'a>>,
    step: Option<Operand<'a>>,
    config: &OpConfig,
) -> Result<()> {
    OptionSet::CHECKED.validate(config)?;
    let mut call = resolve::single(data, true, config)?;
    let start = resolve::scalar_param(start)?.unwrap_or(Scalar::Int(0));
    let step = resolve::scalar_param(step)?.unwrap_or(Scalar::Int(1));
    let cell = table::count().cell(call.desc.element_type)?;
    cell(&mut call, start, step, config)
}

/// Fills `data` with a ramp from `start` to `stop` inclusive, restarting at
/// `start` after `stop`. `step` defaults to 1 and must be positive.
#[tracing::instrument(level = "trace", skip_all, fields(op = "cycle"))]
pub fn cycle<'a>(
    data: Operand<'a>,
    start: Operand<'a>,
    stop: Operand<'a>,
    step: Option<Operand<'a>>,
    config: &OpConfig,
) -> Result<()> {
    OptionSet::MAXLEN.validate(config)?;
    let mut call = resolve::single(data, true, config)?;
    let start = resolve::required_param(Some(start), "start")?;
    let stop = resolve::required_param(Some(stop), "stop")?;
    let step = resolve::scalar_param(step)?.unwrap_or(Scalar::Int(1));
    let cell = table::cycle().cell(call.desc.element_type)?;
    cell(&mut call, start, stop, step, config)
}

/// Copies the elements of `data` selected by a non-zero `selector` entry
/// into `out`. Returns how many were written.
#[tracing::instrument(level = "trace", skip_all, fields(op = "compress"))]
pub fn compress<'a>(
    data: Operand<'a>,
    out: Operand<'a>,
    selector: Operand<'a>,
    config: &OpConfig,
) -> Result<usize> {
    OptionSet::MAXLEN.validate(config)?;
    let mut call = resolve::compress(data, out, selector, config)?;
    let cell = table::compress().cell(call.desc.element_type)?;
    cell(&mut call, config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_name_resolves_to_its_operation() {
        for op in Operation::all() {
            assert_eq!(Operation::from_name(op.name()), Ok(op));
            assert!(!op.supported_types().is_empty(), "{op} has no kernels");
        }
        assert_eq!(Operation::all().len(), 67);
        assert_eq!(Operation::from_name("frobnicate"), Err(Error::InvalidOperator));
    }

    #[test]
    fn bitwise_and_defaults_to_all_bits() {
        assert_eq!(
            BinaryOp::BitAnd.default_operand(ElementType::UInt8),
            Some(Scalar::Int(255))
        );
        assert_eq!(
            BinaryOp::BitAnd.default_operand(ElementType::ULongLong),
            Some(Scalar::UInt(u64::MAX))
        );
        assert_eq!(
            BinaryOp::BitAnd.default_operand(ElementType::Int16),
            Some(Scalar::Int(-1))
        );
        assert_eq!(BinaryOp::Mod.default_operand(ElementType::Int16), None);
    }

    #[test]
    fn options_follow_the_operation_family() {
        assert!(Operation::Binary(BinaryOp::Add).options().nosimd);
        assert!(!Operation::Binary(BinaryOp::Pow).options().nosimd);
        assert!(!Operation::Binary(BinaryOp::BitXor).options().matherrors);
        assert!(Operation::Count.options().matherrors);
        assert!(!Operation::Cycle.options().matherrors);
        for op in [ReduceOp::Max, ReduceOp::Min] {
            assert_eq!(op.options(), OptionSet::SCAN);
        }
        assert!(ReduceOp::Sum.options().matherrors);
    }
}
