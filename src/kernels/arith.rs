use super::{finite, run_binary, run_ternary, Bound2};
use crate::config::{Mode, OpConfig};
use crate::element::{FloatElement, IntElement};
use crate::error::{Error, Result};
use crate::metrics;
use crate::resolve::{BinaryCall, TernaryCall};
use crate::simd::{self, VectorOp, Vectorized};

/// Two-operand integer kernel.
pub(crate) trait IntBinary {
    const NAME: &'static str;
    fn apply<T: IntElement>(x: T, y: T, mode: Mode) -> Result<T>;
}

/// Two-operand float kernel. Finiteness is checked by the caller.
pub(crate) trait FloatBinary {
    const NAME: &'static str;
    const VECTOR: Option<VectorOp> = None;
    fn apply<T: FloatElement>(x: T, y: T, mode: Mode) -> Result<T>;
}

pub(crate) fn int_binary_cell<T: IntElement, K: IntBinary>(
    call: &mut BinaryCall<'_>,
    config: &OpConfig,
) -> Result<()> {
    let mode = config.mode();
    let Bound2 { dest, x, y } = call.bind::<T>()?;
    run_binary(K::NAME, dest, &x, &y, 0, |a, b| K::apply(a, b, mode))
}

pub(crate) fn float_binary_cell<T: FloatElement + Vectorized, K: FloatBinary>(
    call: &mut BinaryCall<'_>,
    config: &OpConfig,
) -> Result<()> {
    let mode = config.mode();
    let checked = mode.is_checked();
    let Bound2 { dest, x, y } = call.bind::<T>()?;
    let mut start = 0;
    if let Some(op) = K::VECTOR {
        let mut path = "scalar";
        if simd::eligible(T::ELEMENT_TYPE, dest.len(), config.nosimd) {
            let run = T::vector_binary(op, dest, &x, &y, checked)?;
            start = run.processed;
            path = run.level.label();
        }
        metrics::record_path(K::NAME, T::ELEMENT_TYPE.name(), path);
    }
    run_binary(K::NAME, dest, &x, &y, start, |a, b| {
        K::apply(a, b, mode).and_then(|value| finite(value, checked))
    })
}

pub(crate) fn fma_cell<T: FloatElement>(
    call: &mut TernaryCall<'_>,
    config: &OpConfig,
) -> Result<()> {
    let checked = config.mode().is_checked();
    let bound = call.bind::<T>()?;
    run_ternary("fma", bound, |x, y, z| finite(x.mul_add(y, z), checked))
}

pub(crate) struct Add;
pub(crate) struct Sub;
pub(crate) struct Mul;
pub(crate) struct TrueDiv;
pub(crate) struct FloorDiv;
pub(crate) struct Mod;
pub(crate) struct Pow;
pub(crate) struct CopySign;
pub(crate) struct FMod;
pub(crate) struct Hypot;
pub(crate) struct Atan2;

impl IntBinary for Add {
    const NAME: &'static str = "add";

    fn apply<T: IntElement>(x: T, y: T, mode: Mode) -> Result<T> {
        match mode {
            Mode::Checked => x.checked_add(&y).ok_or(Error::Overflow),
            Mode::Unchecked => Ok(x.wrapping_add(&y)),
        }
    }
}

impl FloatBinary for Add {
    const NAME: &'static str = "add";
    const VECTOR: Option<VectorOp> = Some(VectorOp::Add);

    fn apply<T: FloatElement>(x: T, y: T, _mode: Mode) -> Result<T> {
        Ok(x + y)
    }
}

impl IntBinary for Sub {
    const NAME: &'static str = "sub";

    fn apply<T: IntElement>(x: T, y: T, mode: Mode) -> Result<T> {
        match mode {
            Mode::Checked => x.checked_sub(&y).ok_or(Error::Overflow),
            Mode::Unchecked => Ok(x.wrapping_sub(&y)),
        }
    }
}

impl FloatBinary for Sub {
    const NAME: &'static str = "sub";
    const VECTOR: Option<VectorOp> = Some(VectorOp::Sub);

    fn apply<T: FloatElement>(x: T, y: T, _mode: Mode) -> Result<T> {
        Ok(x - y)
    }
}

impl IntBinary for Mul {
    const NAME: &'static str = "mul";

    fn apply<T: IntElement>(x: T, y: T, mode: Mode) -> Result<T> {
        match mode {
            Mode::Checked => x.checked_mul(&y).ok_or(Error::Overflow),
            Mode::Unchecked => Ok(x.wrapping_mul(&y)),
        }
    }
}

impl FloatBinary for Mul {
    const NAME: &'static str = "mul";
    const VECTOR: Option<VectorOp> = Some(VectorOp::Mul);

    fn apply<T: FloatElement>(x: T, y: T, _mode: Mode) -> Result<T> {
        Ok(x * y)
    }
}

impl FloatBinary for TrueDiv {
    const NAME: &'static str = "truediv";
    const VECTOR: Option<VectorOp> = Some(VectorOp::Div);

    fn apply<T: FloatElement>(x: T, y: T, mode: Mode) -> Result<T> {
        if mode.is_checked() && y.is_zero() {
            return Err(Error::DivideByZero);
        }
        Ok(x / y)
    }
}

/// Floor quotient. `MIN / -1` is the only quotient that does not fit.
pub(crate) fn floor_div<T: IntElement>(x: T, y: T, mode: Mode) -> Result<T> {
    if y.is_zero() {
        return Err(Error::DivideByZero);
    }
    let Some(quotient) = x.checked_div(&y) else {
        return match mode {
            Mode::Checked => Err(Error::Overflow),
            Mode::Unchecked => Ok(x),
        };
    };
    let remainder = x - quotient * y;
    if !remainder.is_zero() && ((remainder < T::zero()) != (y < T::zero())) {
        Ok(quotient - T::one())
    } else {
        Ok(quotient)
    }
}

/// Floor modulus: the result takes the sign of the divisor.
pub(crate) fn floor_mod<T: IntElement>(x: T, y: T) -> Result<T> {
    if y.is_zero() {
        return Err(Error::DivideByZero);
    }
    let Some(remainder) = x.checked_rem(&y) else {
        return Ok(T::zero());
    };
    if !remainder.is_zero() && ((remainder < T::zero()) != (y < T::zero())) {
        Ok(remainder + y)
    } else {
        Ok(remainder)
    }
}

impl IntBinary for FloorDiv {
    const NAME: &'static str = "floordiv";

    fn apply<T: IntElement>(x: T, y: T, mode: Mode) -> Result<T> {
        floor_div(x, y, mode)
    }
}

impl FloatBinary for FloorDiv {
    const NAME: &'static str = "floordiv";

    fn apply<T: FloatElement>(x: T, y: T, mode: Mode) -> Result<T> {
        if mode.is_checked() && y.is_zero() {
            return Err(Error::DivideByZero);
        }
        Ok((x / y).floor())
    }
}

impl IntBinary for Mod {
    const NAME: &'static str = "mod";

    fn apply<T: IntElement>(x: T, y: T, _mode: Mode) -> Result<T> {
        floor_mod(x, y)
    }
}

impl FloatBinary for Mod {
    const NAME: &'static str = "mod";

    fn apply<T: FloatElement>(x: T, y: T, mode: Mode) -> Result<T> {
        if mode.is_checked() && y.is_zero() {
            return Err(Error::DivideByZero);
        }
        let remainder = x % y;
        if !remainder.is_zero() && ((remainder < T::zero()) != (y < T::zero())) {
            Ok(remainder + y)
        } else {
            Ok(remainder)
        }
    }
}

/// Integer power by repeated squaring, guarding every multiplication in
/// checked mode.
pub(crate) fn int_pow<T: IntElement>(base: T, exponent: T, mode: Mode) -> Result<T> {
    if exponent < T::zero() {
        return Err(Error::ValueError("negative exponent"));
    }
    let mut remaining = exponent.to_u64().unwrap_or_default();
    let multiply = |a: T, b: T| -> Result<T> {
        match mode {
            Mode::Checked => a.checked_mul(&b).ok_or(Error::Overflow),
            Mode::Unchecked => Ok(a.wrapping_mul(&b)),
        }
    };
    let mut result = T::one();
    let mut factor = base;
    while remaining > 0 {
        if remaining & 1 == 1 {
            result = multiply(result, factor)?;
        }
        remaining >>= 1;
        if remaining > 0 {
            factor = multiply(factor, factor)?;
        }
    }
    Ok(result)
}

impl IntBinary for Pow {
    const NAME: &'static str = "pow";

    fn apply<T: IntElement>(x: T, y: T, mode: Mode) -> Result<T> {
        int_pow(x, y, mode)
    }
}

impl FloatBinary for Pow {
    const NAME: &'static str = "pow";

    fn apply<T: FloatElement>(x: T, y: T, _mode: Mode) -> Result<T> {
        Ok(x.powf(y))
    }
}

impl FloatBinary for CopySign {
    const NAME: &'static str = "copysign";

    fn apply<T: FloatElement>(x: T, y: T, _mode: Mode) -> Result<T> {
        Ok(x.copysign(y))
    }
}

impl FloatBinary for FMod {
    const NAME: &'static str = "fmod";

    fn apply<T: FloatElement>(x: T, y: T, _mode: Mode) -> Result<T> {
        Ok(x % y)
    }
}

impl FloatBinary for Hypot {
    const NAME: &'static str = "hypot";

    fn apply<T: FloatElement>(x: T, y: T, _mode: Mode) -> Result<T> {
        Ok(x.hypot(y))
    }
}

impl FloatBinary for Atan2 {
    const NAME: &'static str = "atan2";

    fn apply<T: FloatElement>(x: T, y: T, _mode: Mode) -> Result<T> {
        Ok(x.atan2(y))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn floor_division_rounds_towards_negative_infinity() {
        assert_eq!(floor_div(-7i32, 2, Mode::Checked), Ok(-4));
        assert_eq!(floor_div(7i32, -2, Mode::Checked), Ok(-4));
        assert_eq!(floor_div(-7i32, -2, Mode::Checked), Ok(3));
        assert_eq!(floor_div(7u8, 2, Mode::Checked), Ok(3));
        assert_eq!(floor_div(i8::MIN, -1, Mode::Checked), Err(Error::Overflow));
        assert_eq!(floor_div(i8::MIN, -1, Mode::Unchecked), Ok(i8::MIN));
        assert_eq!(floor_div(5i16, 0, Mode::Unchecked), Err(Error::DivideByZero));
    }

    #[test]
    fn modulus_takes_the_divisor_sign() {
        assert_eq!(floor_mod(-7i32, 3), Ok(2));
        assert_eq!(floor_mod(7i32, -3), Ok(-2));
        assert_eq!(floor_mod(i64::MIN, -1), Ok(0));
        assert_eq!(floor_mod(9u16, 4), Ok(1));
        assert_eq!(
            <Mod as FloatBinary>::apply(-7.0f64, 3.0, Mode::Checked),
            Ok(2.0)
        );
    }

    #[test]
    fn integer_power_guards_every_step() {
        assert_eq!(int_pow(0i32, 0, Mode::Checked), Ok(1));
        assert_eq!(int_pow(0i32, 5, Mode::Checked), Ok(0));
        assert_eq!(int_pow(-2i8, 7, Mode::Checked), Ok(-128));
        assert_eq!(int_pow(2i8, 7, Mode::Checked), Err(Error::Overflow));
        assert_eq!(int_pow(2i8, 7, Mode::Unchecked), Ok(-128));
        assert_eq!(int_pow(3u64, 40, Mode::Checked), Ok(12_157_665_459_056_928_801));
        assert_eq!(int_pow(1u8, 255, Mode::Checked), Ok(1));
        assert!(matches!(
            int_pow(2i32, -1, Mode::Unchecked),
            Err(Error::ValueError(_))
        ));
    }

    #[test]
    fn float_division_by_zero_depends_on_mode() {
        assert_eq!(
            <TrueDiv as FloatBinary>::apply(1.0f32, 0.0, Mode::Checked),
            Err(Error::DivideByZero)
        );
        assert_eq!(
            <TrueDiv as FloatBinary>::apply(1.0f32, 0.0, Mode::Unchecked),
            Ok(f32::INFINITY)
        );
    }
}
