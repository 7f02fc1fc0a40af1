//! Per-operation tables of typed cells, one slot per element type.
//!
//! Cells for type categories an operation does not support are absent, and
//! looking one up fails with [`Error::UnknownElementType`].

use std::os::raw::{c_long, c_ulong};
use std::sync::OnceLock;

use crate::config::OpConfig;
use crate::element::ElementType;
use crate::error::{Error, Result};
use crate::kernels::arith::{self, FloatBinary, IntBinary};
use crate::kernels::compare::{self, Relation};
use crate::kernels::math::{self, FloatUnary, IntUnary};
use crate::kernels::{compress, fill, reduce};
use crate::resolve::{ArrayCall, BinaryCall, CompressCall, TernaryCall, UnaryCall};
use crate::scalar::Scalar;

pub(crate) type BinaryFn = fn(&mut BinaryCall<'_>, &OpConfig) -> Result<()>;
pub(crate) type UnaryFn = fn(&mut UnaryCall<'_>, &OpConfig) -> Result<()>;
pub(crate) type LdexpFn = fn(&mut UnaryCall<'_>, i32, &OpConfig) -> Result<()>;
pub(crate) type TernaryFn = fn(&mut TernaryCall<'_>, &OpConfig) -> Result<()>;
pub(crate) type CompareFn = fn(&BinaryCall<'_>, &OpConfig) -> Result<bool>;
pub(crate) type ReduceFn = fn(&ArrayCall<'_>, &OpConfig) -> Result<Scalar>;
pub(crate) type PredicateFn = fn(&ArrayCall<'_>, &OpConfig) -> Result<bool>;
pub(crate) type RepeatFn = fn(&mut ArrayCall<'_>, Scalar, &OpConfig) -> Result<()>;
pub(crate) type CountFn = fn(&mut ArrayCall<'_>, Scalar, Scalar, &OpConfig) -> Result<()>;
pub(crate) type CycleFn = fn(&mut ArrayCall<'_>, Scalar, Scalar, Scalar, &OpConfig) -> Result<()>;
pub(crate) type CompressFn = fn(&mut CompressCall<'_>, &OpConfig) -> Result<usize>;

#[derive(Clone, Copy)]
pub(crate) struct KernelTable<F: Copy> {
    name: &'static str,
    cells: [Option<F>; ElementType::COUNT],
}

impl<F: Copy> KernelTable<F> {
    pub(crate) fn new(name: &'static str) -> Self {
        Self {
            name,
            cells: [None; ElementType::COUNT],
        }
    }

    pub(crate) fn with(mut self, entries: impl IntoIterator<Item = (ElementType, F)>) -> Self {
        for (element_type, cell) in entries {
            self.cells[element_type.index()] = Some(cell);
        }
        self
    }

    pub(crate) fn cell(&self, element_type: ElementType) -> Result<F> {
        self.cells[element_type.index()].ok_or_else(|| {
            tracing::debug!(op = self.name, %element_type, "no kernel for element type");
            Error::UnknownElementType
        })
    }

    pub(crate) fn supported(&self) -> Vec<ElementType> {
        ElementType::ALL
            .into_iter()
            .filter(|element_type| self.cells[element_type.index()].is_some())
            .collect()
    }
}

/// Builds one table per operation of a family on first use, in the order
/// of `ops`.
pub(crate) fn cached<O: Copy, F: Copy + Send + Sync + 'static>(
    cache: &'static OnceLock<Vec<KernelTable<F>>>,
    ops: &[O],
    build: fn(O) -> KernelTable<F>,
) -> &'static [KernelTable<F>] {
    cache.get_or_init(|| ops.iter().map(|&op| build(op)).collect())
}

/// Expands one cell expression per element type of a category, with `$t`
/// bound to the native type.
macro_rules! cells {
    (signed: $t:ident => $cell:expr) => {
        [
            (ElementType::Int8, { type $t = i8; $cell }),
            (ElementType::Int16, { type $t = i16; $cell }),
            (ElementType::Int32, { type $t = i32; $cell }),
            (ElementType::Long, { type $t = c_long; $cell }),
            (ElementType::LongLong, { type $t = i64; $cell }),
        ]
    };
    (unsigned: $t:ident => $cell:expr) => {
        [
            (ElementType::UInt8, { type $t = u8; $cell }),
            (ElementType::UInt16, { type $t = u16; $cell }),
            (ElementType::UInt32, { type $t = u32; $cell }),
            (ElementType::ULong, { type $t = c_ulong; $cell }),
            (ElementType::ULongLong, { type $t = u64; $cell }),
        ]
    };
    (float: $t:ident => $cell:expr) => {
        [
            (ElementType::Float32, { type $t = f32; $cell }),
            (ElementType::Float64, { type $t = f64; $cell }),
        ]
    };
}

pub(crate) fn arithmetic<K: IntBinary + FloatBinary>(name: &'static str) -> KernelTable<BinaryFn> {
    KernelTable::new(name)
        .with(cells!(signed: T => arith::int_binary_cell::<T, K> as BinaryFn))
        .with(cells!(unsigned: T => arith::int_binary_cell::<T, K> as BinaryFn))
        .with(cells!(float: T => arith::float_binary_cell::<T, K> as BinaryFn))
}

pub(crate) fn integer_binary<K: IntBinary>(name: &'static str) -> KernelTable<BinaryFn> {
    KernelTable::new(name)
        .with(cells!(signed: T => arith::int_binary_cell::<T, K> as BinaryFn))
        .with(cells!(unsigned: T => arith::int_binary_cell::<T, K> as BinaryFn))
}

pub(crate) fn float_binary<K: FloatBinary>(name: &'static str) -> KernelTable<BinaryFn> {
    KernelTable::new(name).with(cells!(float: T => arith::float_binary_cell::<T, K> as BinaryFn))
}

pub(crate) fn float_unary<K: FloatUnary>(name: &'static str) -> KernelTable<UnaryFn> {
    KernelTable::new(name).with(cells!(float: T => math::float_unary_cell::<T, K> as UnaryFn))
}

pub(crate) fn integer_unary<K: IntUnary>(name: &'static str) -> KernelTable<UnaryFn> {
    KernelTable::new(name)
        .with(cells!(signed: T => math::int_unary_cell::<T, K> as UnaryFn))
        .with(cells!(unsigned: T => math::int_unary_cell::<T, K> as UnaryFn))
}

/// Negation has no unsigned cells.
pub(crate) fn signed_unary<K: IntUnary + FloatUnary>(name: &'static str) -> KernelTable<UnaryFn> {
    KernelTable::new(name)
        .with(cells!(signed: T => math::int_unary_cell::<T, K> as UnaryFn))
        .with(cells!(float: T => math::float_unary_cell::<T, K> as UnaryFn))
}

pub(crate) fn any_unary<K: IntUnary + FloatUnary>(name: &'static str) -> KernelTable<UnaryFn> {
    signed_unary::<K>(name).with(cells!(unsigned: T => math::int_unary_cell::<T, K> as UnaryFn))
}

pub(crate) fn ldexp() -> &'static KernelTable<LdexpFn> {
    static TABLE: OnceLock<KernelTable<LdexpFn>> = OnceLock::new();
    TABLE.get_or_init(|| {
        KernelTable::new("ldexp").with(cells!(float: T => math::ldexp_cell::<T> as LdexpFn))
    })
}

pub(crate) fn fma() -> &'static KernelTable<TernaryFn> {
    static TABLE: OnceLock<KernelTable<TernaryFn>> = OnceLock::new();
    TABLE.get_or_init(|| {
        KernelTable::new("fma").with(cells!(float: T => arith::fma_cell::<T> as TernaryFn))
    })
}

pub(crate) fn comparison<K: Relation>(name: &'static str) -> KernelTable<CompareFn> {
    KernelTable::new(name)
        .with(cells!(signed: T => compare::compare_cell::<T, K> as CompareFn))
        .with(cells!(unsigned: T => compare::compare_cell::<T, K> as CompareFn))
        .with(cells!(float: T => compare::compare_cell::<T, K> as CompareFn))
}

pub(crate) fn amax() -> KernelTable<ReduceFn> {
    KernelTable::new("amax")
        .with(cells!(signed: T => reduce::max_cell::<T> as ReduceFn))
        .with(cells!(unsigned: T => reduce::max_cell::<T> as ReduceFn))
        .with(cells!(float: T => reduce::max_cell::<T> as ReduceFn))
}

pub(crate) fn amin() -> KernelTable<ReduceFn> {
    KernelTable::new("amin")
        .with(cells!(signed: T => reduce::min_cell::<T> as ReduceFn))
        .with(cells!(unsigned: T => reduce::min_cell::<T> as ReduceFn))
        .with(cells!(float: T => reduce::min_cell::<T> as ReduceFn))
}

pub(crate) fn asum() -> KernelTable<ReduceFn> {
    KernelTable::new("asum")
        .with(cells!(signed: T => reduce::signed_sum_cell::<T> as ReduceFn))
        .with(cells!(unsigned: T => reduce::unsigned_sum_cell::<T> as ReduceFn))
        .with(cells!(float: T => reduce::float_sum_cell::<T> as ReduceFn))
}

pub(crate) fn isnan() -> KernelTable<PredicateFn> {
    KernelTable::new("isnan").with(cells!(float: T => reduce::isnan_cell::<T> as PredicateFn))
}

pub(crate) fn isinf() -> KernelTable<PredicateFn> {
    KernelTable::new("isinf").with(cells!(float: T => reduce::isinf_cell::<T> as PredicateFn))
}

pub(crate) fn isfinite() -> KernelTable<PredicateFn> {
    KernelTable::new("isfinite")
        .with(cells!(float: T => reduce::isfinite_cell::<T> as PredicateFn))
}

pub(crate) fn repeat() -> &'static KernelTable<RepeatFn> {
    static TABLE: OnceLock<KernelTable<RepeatFn>> = OnceLock::new();
    TABLE.get_or_init(|| {
        KernelTable::new("repeat")
            .with(cells!(signed: T => fill::repeat_cell::<T> as RepeatFn))
            .with(cells!(unsigned: T => fill::repeat_cell::<T> as RepeatFn))
            .with(cells!(float: T => fill::repeat_cell::<T> as RepeatFn))
    })
}

pub(crate) fn count() -> &'static KernelTable<CountFn> {
    static TABLE: OnceLock<KernelTable<CountFn>> = OnceLock::new();
    TABLE.get_or_init(|| {
        KernelTable::new("count")
            .with(cells!(signed: T => fill::int_count_cell::<T> as CountFn))
            .with(cells!(unsigned: T => fill::int_count_cell::<T> as CountFn))
            .with(cells!(float: T => fill::float_count_cell::<T> as CountFn))
    })
}

pub(crate) fn cycle() -> &'static KernelTable<CycleFn> {
    static TABLE: OnceLock<KernelTable<CycleFn>> = OnceLock::new();
    TABLE.get_or_init(|| {
        KernelTable::new("cycle")
            .with(cells!(signed: T => fill::int_cycle_cell::<T> as CycleFn))
            .with(cells!(unsigned: T => fill::int_cycle_cell::<T> as CycleFn))
            .with(cells!(float: T => fill::float_cycle_cell::<T> as CycleFn))
    })
}

pub(crate) fn compress() -> &'static KernelTable<CompressFn> {
    static TABLE: OnceLock<KernelTable<CompressFn>> = OnceLock::new();
    TABLE.get_or_init(|| {
        KernelTable::new("compress")
            .with(cells!(signed: T => compress::compress_cell::<T> as CompressFn))
            .with(cells!(unsigned: T => compress::compress_cell::<T> as CompressFn))
            .with(cells!(float: T => compress::compress_cell::<T> as CompressFn))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernels::bitwise::BitAnd;

    #[test]
    fn category_restricted_tables_leave_gaps() {
        let table = float_binary::<arith::TrueDiv>("truediv");
        assert_eq!(table.supported(), vec![ElementType::Float32, ElementType::Float64]);
        assert_eq!(table.cell(ElementType::Int32).err(), Some(Error::UnknownElementType));

        let table = integer_binary::<BitAnd>("and_");
        assert_eq!(table.supported().len(), 10);
        assert!(table.cell(ElementType::Float64).is_err());
    }

    #[test]
    fn family_tables_are_built_once_in_declaration_order() {
        use crate::ops::{BinaryOp, ReduceOp, UnaryOp};

        for &op in UnaryOp::ALL {
            assert_eq!(op.table().name, op.name());
        }
        for &op in BinaryOp::ALL {
            assert_eq!(op.table().name, op.name());
        }
        assert!(std::ptr::eq(ReduceOp::Sum.table(), ReduceOp::Sum.table()));
        assert!(std::ptr::eq(compress(), compress()));
    }

    #[test]
    fn negation_skips_unsigned_types() {
        let table = signed_unary::<math::Neg>("neg");
        assert!(table.cell(ElementType::UInt16).is_err());
        assert!(table.cell(ElementType::Long).is_ok());
        assert_eq!(any_unary::<math::Abs>("abs_").supported().len(), 12);
    }
}
