//! Element-type registry and the per-type kernel contract.

use std::fmt;
use std::mem::size_of;
use std::os::raw::{c_long, c_ulong};

use num_traits::{
    Bounded, CheckedAdd, CheckedMul, CheckedNeg, CheckedRem, CheckedSub, Float, One, PrimInt,
    WrappingAdd, WrappingMul, WrappingNeg, WrappingSub, Zero,
};

use crate::error::{Error, Result};
use crate::range;
use crate::scalar::Scalar;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Category {
    Signed,
    Unsigned,
    Float,
}

/// The twelve element types an array may carry.
///
/// `Long` and `ULong` take the width of the platform C `long`. Every other
/// type has a fixed width.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ElementType {
    Int8,
    UInt8,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Long,
    ULong,
    LongLong,
    ULongLong,
    Float32,
    Float64,
}

impl ElementType {
    pub const ALL: [ElementType; 12] = [
        ElementType::Int8,
        ElementType::UInt8,
        ElementType::Int16,
        ElementType::UInt16,
        ElementType::Int32,
        ElementType::UInt32,
        ElementType::Long,
        ElementType::ULong,
        ElementType::LongLong,
        ElementType::ULongLong,
        ElementType::Float32,
        ElementType::Float64,
    ];

    pub const COUNT: usize = 12;

    pub fn from_tag(tag: char) -> Result<Self> {
        Ok(match tag {
            'b' => ElementType::Int8,
            'B' => ElementType::UInt8,
            'h' => ElementType::Int16,
            'H' => ElementType::UInt16,
            'i' => ElementType::Int32,
            'I' => ElementType::UInt32,
            'l' => ElementType::Long,
            'L' => ElementType::ULong,
            'q' => ElementType::LongLong,
            'Q' => ElementType::ULongLong,
            'f' => ElementType::Float32,
            'd' => ElementType::Float64,
            _ => return Err(Error::UnknownElementType),
        })
    }

    /// Parses a buffer-protocol format string. Only native order is
    /// accepted, either implicit or spelled `@`.
    pub fn from_format(format: &str) -> Result<Self> {
        let body = format.strip_prefix('@').unwrap_or(format);
        let mut chars = body.chars();
        match (chars.next(), chars.next()) {
            (Some(tag), None) => Self::from_tag(tag),
            _ => Err(Error::UnknownElementType),
        }
    }

    pub const fn tag(self) -> char {
        match self {
            ElementType::Int8 => 'b',
            ElementType::UInt8 => 'B',
            ElementType::Int16 => 'h',
            ElementType::UInt16 => 'H',
            ElementType::Int32 => 'i',
            ElementType::UInt32 => 'I',
            ElementType::Long => 'l',
            ElementType::ULong => 'L',
            ElementType::LongLong => 'q',
            ElementType::ULongLong => 'Q',
            ElementType::Float32 => 'f',
            ElementType::Float64 => 'd',
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            ElementType::Int8 => "int8",
            ElementType::UInt8 => "uint8",
            ElementType::Int16 => "int16",
            ElementType::UInt16 => "uint16",
            ElementType::Int32 => "int32",
            ElementType::UInt32 => "uint32",
            ElementType::Long => "long",
            ElementType::ULong => "ulong",
            ElementType::LongLong => "longlong",
            ElementType::ULongLong => "ulonglong",
            ElementType::Float32 => "float32",
            ElementType::Float64 => "float64",
        }
    }

    pub const fn width(self) -> usize {
        match self {
            ElementType::Int8 | ElementType::UInt8 => 1,
            ElementType::Int16 | ElementType::UInt16 => 2,
            ElementType::Int32 | ElementType::UInt32 | ElementType::Float32 => 4,
            ElementType::Long => size_of::<c_long>(),
            ElementType::ULong => size_of::<c_ulong>(),
            ElementType::LongLong | ElementType::ULongLong | ElementType::Float64 => 8,
        }
    }

    pub const fn category(self) -> Category {
        match self {
            ElementType::Int8
            | ElementType::Int16
            | ElementType::Int32
            | ElementType::Long
            | ElementType::LongLong => Category::Signed,
            ElementType::UInt8
            | ElementType::UInt16
            | ElementType::UInt32
            | ElementType::ULong
            | ElementType::ULongLong => Category::Unsigned,
            ElementType::Float32 | ElementType::Float64 => Category::Float,
        }
    }

    pub const fn is_float(self) -> bool {
        matches!(self.category(), Category::Float)
    }

    /// Position in [`ElementType::ALL`], used as the dispatch-table index.
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Number of whole elements in `byte_len` bytes. A partial trailing
    /// element is not counted.
    pub const fn element_count(self, byte_len: usize) -> usize {
        byte_len / self.width()
    }

    /// Whether an integral value is representable in this type.
    pub fn holds_integer(self, value: i128) -> bool {
        match self {
            ElementType::Int8 => range::in_range_i8(value),
            ElementType::UInt8 => range::in_range_u8(value),
            ElementType::Int16 => range::in_range_i16(value),
            ElementType::UInt16 => range::in_range_u16(value),
            ElementType::Int32 => range::in_range_i32(value),
            ElementType::UInt32 => range::in_range_u32(value),
            ElementType::Long => range::in_range_long(value),
            ElementType::ULong => range::in_range_ulong(value),
            ElementType::LongLong => range::in_range_i64(value),
            ElementType::ULongLong => range::in_range_u64(value),
            ElementType::Float32 | ElementType::Float64 => true,
        }
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// `limit` when it is positive and below `raw`, otherwise `raw`.
pub fn effective_length(raw: usize, limit: i64) -> usize {
    match usize::try_from(limit) {
        Ok(limit) if limit > 0 && limit < raw => limit,
        _ => raw,
    }
}

/// Native Rust type behind an [`ElementType`].
pub trait Element:
    Copy + PartialOrd + fmt::Debug + Send + Sync + 'static + Zero + One
{
    const CATEGORY: Category;
    /// Element type a plain Rust slice of this type is viewed as.
    const DEFAULT_TYPE: ElementType;

    /// Converts an already classified scalar, rejecting values the type
    /// cannot hold.
    fn from_scalar(value: Scalar) -> Result<Self>;

    fn to_scalar(self) -> Scalar;

    fn is_finite_value(self) -> bool {
        true
    }

    fn accepts(element_type: ElementType) -> bool {
        element_type.category() == Self::CATEGORY && element_type.width() == size_of::<Self>()
    }
}

/// Integer kernels: checked and wrapping arithmetic plus the precomputed
/// input bounds of square and cube.
pub trait IntElement:
    Element
    + PrimInt
    + Bounded
    + CheckedAdd
    + CheckedSub
    + CheckedMul
    + CheckedNeg
    + CheckedRem
    + WrappingAdd
    + WrappingSub
    + WrappingMul
    + WrappingNeg
{
    const SIGNED: bool;
    const BITS: u32;
    /// Inclusive input range whose square fits the type.
    const POW2_BOUNDS: (Self, Self);
    /// Inclusive input range whose cube fits the type.
    const POW3_BOUNDS: (Self, Self);

    fn to_i128(self) -> i128;
    fn from_i128(value: i128) -> Option<Self>;
    /// Low bits of `value`, matching native two's complement wraparound.
    fn truncate_i128(value: i128) -> Self;
}

/// Floating point kernels.
pub trait FloatElement: Element + Float {
    const ELEMENT_TYPE: ElementType;

    fn erf(self) -> Self;
    fn erfc(self) -> Self;
    fn gamma(self) -> Self;
    fn lgamma(self) -> Self;
    fn ldexp(self, exponent: i32) -> Self;
    fn from_f64(value: f64) -> Self;
    fn into_f64(self) -> f64;
}

macro_rules! signed_element {
    ($($ty:ty => $default:ident, pow2: $p2:expr, pow3: ($p3lo:expr, $p3hi:expr);)*) => {
        $(
            impl Element for $ty {
                const CATEGORY: Category = Category::Signed;
                const DEFAULT_TYPE: ElementType = ElementType::$default;

                fn from_scalar(value: Scalar) -> Result<Self> {
                    match value {
                        Scalar::Int(v) => <$ty>::try_from(v).map_err(|_| Error::Overflow),
                        Scalar::UInt(v) => <$ty>::try_from(v).map_err(|_| Error::Overflow),
                        Scalar::Float(_) => Err(Error::TypeMismatch),
                    }
                }

                fn to_scalar(self) -> Scalar {
                    Scalar::Int(self as i64)
                }
            }

            impl IntElement for $ty {
                const SIGNED: bool = true;
                const BITS: u32 = <$ty>::BITS;
                const POW2_BOUNDS: (Self, Self) = (-$p2, $p2);
                const POW3_BOUNDS: (Self, Self) = ($p3lo, $p3hi);

                fn to_i128(self) -> i128 {
                    self as i128
                }

                fn from_i128(value: i128) -> Option<Self> {
                    <$ty>::try_from(value).ok()
                }

                fn truncate_i128(value: i128) -> Self {
                    value as $ty
                }
            }
        )*
    };
}

macro_rules! unsigned_element {
    ($($ty:ty => $default:ident, pow2: $p2:expr, pow3: $p3:expr;)*) => {
        $(
            impl Element for $ty {
                const CATEGORY: Category = Category::Unsigned;
                const DEFAULT_TYPE: ElementType = ElementType::$default;

                fn from_scalar(value: Scalar) -> Result<Self> {
                    match value {
                        Scalar::Int(v) => <$ty>::try_from(v).map_err(|_| Error::Overflow),
                        Scalar::UInt(v) => <$ty>::try_from(v).map_err(|_| Error::Overflow),
                        Scalar::Float(_) => Err(Error::TypeMismatch),
                    }
                }

                fn to_scalar(self) -> Scalar {
                    Scalar::UInt(self as u64)
                }
            }

            impl IntElement for $ty {
                const SIGNED: bool = false;
                const BITS: u32 = <$ty>::BITS;
                const POW2_BOUNDS: (Self, Self) = (0, $p2);
                const POW3_BOUNDS: (Self, Self) = (0, $p3);

                fn to_i128(self) -> i128 {
                    self as i128
                }

                fn from_i128(value: i128) -> Option<Self> {
                    <$ty>::try_from(value).ok()
                }

                fn truncate_i128(value: i128) -> Self {
                    value as $ty
                }
            }
        )*
    };
}

signed_element! {
    i8 => Int8, pow2: 11, pow3: (-5, 5);
    i16 => Int16, pow2: 181, pow3: (-32, 31);
    i32 => Int32, pow2: 46_340, pow3: (-1_290, 1_290);
    i64 => LongLong, pow2: 3_037_000_499, pow3: (-2_097_152, 2_097_151);
}

unsigned_element! {
    u8 => UInt8, pow2: 15, pow3: 6;
    u16 => UInt16, pow2: 255, pow3: 40;
    u32 => UInt32, pow2: 65_535, pow3: 1_625;
    u64 => ULongLong, pow2: 4_294_967_295, pow3: 2_642_245;
}

macro_rules! float_element {
    (
        $ty:ty, $et:ident,
        erf: $erf:path, erfc: $erfc:path, gamma: $gamma:path,
        lgamma: $lgamma:path, ldexp: $ldexp:path
    ) => {
        impl Element for $ty {
            const CATEGORY: Category = Category::Float;
            const DEFAULT_TYPE: ElementType = ElementType::$et;

            fn from_scalar(value: Scalar) -> Result<Self> {
                match value {
                    Scalar::Int(v) => Ok(v as $ty),
                    Scalar::UInt(v) => Ok(v as $ty),
                    Scalar::Float(v) => {
                        if ElementType::$et == ElementType::Float32 && !range::in_float32_range(v) {
                            return Err(Error::Overflow);
                        }
                        Ok(v as $ty)
                    }
                }
            }

            fn to_scalar(self) -> Scalar {
                Scalar::Float(self as f64)
            }

            fn is_finite_value(self) -> bool {
                self.is_finite()
            }
        }

        impl FloatElement for $ty {
            const ELEMENT_TYPE: ElementType = ElementType::$et;

            fn erf(self) -> Self {
                $erf(self)
            }

            fn erfc(self) -> Self {
                $erfc(self)
            }

            fn gamma(self) -> Self {
                $gamma(self)
            }

            fn lgamma(self) -> Self {
                $lgamma(self)
            }

            fn ldexp(self, exponent: i32) -> Self {
                $ldexp(self, exponent)
            }

            fn from_f64(value: f64) -> Self {
                value as $ty
            }

            fn into_f64(self) -> f64 {
                self as f64
            }
        }
    };
}

float_element!(
    f32, Float32,
    erf: libm::erff, erfc: libm::erfcf, gamma: libm::tgammaf,
    lgamma: libm::lgammaf, ldexp: libm::ldexpf
);
float_element!(
    f64, Float64,
    erf: libm::erf, erfc: libm::erfc, gamma: libm::tgamma,
    lgamma: libm::lgamma, ldexp: libm::ldexp
);

#[cfg(test)]
mod tests {
    use super::*;

    fn check_pow_bounds<T: IntElement>() {
        let (lo, hi) = T::POW2_BOUNDS;
        assert!(hi.checked_mul(&hi).is_some());
        assert!(lo.checked_mul(&lo).is_some());
        let above = hi + T::one();
        assert!(above.checked_mul(&above).is_none());

        let (lo, hi) = T::POW3_BOUNDS;
        assert!(hi.checked_mul(&hi).and_then(|sq| sq.checked_mul(&hi)).is_some());
        assert!(lo.checked_mul(&lo).and_then(|sq| sq.checked_mul(&lo)).is_some());
        let above = hi + T::one();
        assert!(above
            .checked_mul(&above)
            .and_then(|sq| sq.checked_mul(&above))
            .is_none());
        if T::SIGNED {
            let below = lo - T::one();
            assert!(below
                .checked_mul(&below)
                .and_then(|sq| sq.checked_mul(&below))
                .is_none());
        }
    }

    #[test]
    fn precomputed_power_bounds_are_tight() {
        check_pow_bounds::<i8>();
        check_pow_bounds::<u8>();
        check_pow_bounds::<i16>();
        check_pow_bounds::<u16>();
        check_pow_bounds::<i32>();
        check_pow_bounds::<u32>();
        check_pow_bounds::<i64>();
        check_pow_bounds::<u64>();
    }

    #[test]
    fn tags_round_trip_through_the_registry() {
        for et in ElementType::ALL {
            assert_eq!(ElementType::from_tag(et.tag()), Ok(et));
            assert_eq!(ElementType::ALL[et.index()], et);
        }
        assert_eq!(ElementType::from_format("@d"), Ok(ElementType::Float64));
        assert_eq!(ElementType::from_format("<d"), Err(Error::UnknownElementType));
        assert_eq!(ElementType::from_format("?"), Err(Error::UnknownElementType));
        assert_eq!(ElementType::from_format("dd"), Err(Error::UnknownElementType));
    }

    #[test]
    fn element_count_drops_partial_trailing_element() {
        assert_eq!(ElementType::Int32.element_count(10), 2);
        assert_eq!(ElementType::Float64.element_count(7), 0);
        assert_eq!(ElementType::UInt8.element_count(7), 7);
    }

    #[test]
    fn effective_length_ignores_unusable_limits() {
        assert_eq!(effective_length(10, 0), 10);
        assert_eq!(effective_length(10, -3), 10);
        assert_eq!(effective_length(10, 4), 4);
        assert_eq!(effective_length(10, 10), 10);
        assert_eq!(effective_length(10, 25), 10);
    }

    #[test]
    fn rust_types_accept_matching_element_types() {
        assert!(i64::accepts(ElementType::LongLong));
        assert!(i32::accepts(ElementType::Int32));
        assert!(!u32::accepts(ElementType::Int32));
        assert!(!f32::accepts(ElementType::Int32));
        assert!(c_long::accepts(ElementType::Long));
        assert!(c_ulong::accepts(ElementType::ULong));
    }

    #[test]
    fn float32_scalars_outside_range_overflow() {
        assert_eq!(f32::from_scalar(Scalar::Float(1.0e39)), Err(Error::Overflow));
        assert!(f32::from_scalar(Scalar::Float(f64::INFINITY)).is_ok());
        assert_eq!(f64::from_scalar(Scalar::Float(1.0e39)), Ok(1.0e39));
        assert_eq!(i8::from_scalar(Scalar::Float(1.0)), Err(Error::TypeMismatch));
    }
}
