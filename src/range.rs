//! Representability predicates for every fixed-width element type.
//!
//! Integer predicates take an `i128` so that both signed and unsigned 64-bit
//! readings compare exactly against the destination bounds.

use std::os::raw::{c_long, c_ulong};

macro_rules! int_range {
    ($($name:ident => $ty:ty),* $(,)?) => {
        $(
            #[inline]
            pub const fn $name(value: i128) -> bool {
                value >= <$ty>::MIN as i128 && value <= <$ty>::MAX as i128
            }
        )*
    };
}

int_range! {
    in_range_i8 => i8,
    in_range_u8 => u8,
    in_range_i16 => i16,
    in_range_u16 => u16,
    in_range_i32 => i32,
    in_range_u32 => u32,
    in_range_long => c_long,
    in_range_ulong => c_ulong,
    in_range_i64 => i64,
    in_range_u64 => u64,
}

/// NaN, the infinities and anything within `±f32::MAX` are accepted. Overflow
/// of float32 results is caught by finiteness checks after computation.
#[inline]
pub fn in_float32_range(value: f64) -> bool {
    !value.is_finite() || (value >= -(f32::MAX as f64) && value <= f32::MAX as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_bounds_are_inclusive() {
        assert!(in_range_i8(-128));
        assert!(in_range_i8(127));
        assert!(!in_range_i8(128));
        assert!(!in_range_i8(-129));
        assert!(in_range_u8(255));
        assert!(!in_range_u8(-1));
        assert!(in_range_u64(u64::MAX as i128));
        assert!(!in_range_u64(u64::MAX as i128 + 1));
        assert!(!in_range_i64(i64::MAX as i128 + 1));
        assert!(in_range_u32(u32::MAX as i128));
        assert!(!in_range_i16(i16::MIN as i128 - 1));
        assert!(in_range_long(c_long::MIN as i128));
        assert!(!in_range_ulong(-1));
    }

    #[test]
    fn float32_range_passes_non_finite_values() {
        assert!(in_float32_range(f64::NAN));
        assert!(in_float32_range(f64::INFINITY));
        assert!(in_float32_range(f64::NEG_INFINITY));
        assert!(in_float32_range(f32::MAX as f64));
        assert!(!in_float32_range(f32::MAX as f64 * 2.0));
        assert!(!in_float32_range(-1.0e39));
    }
}
