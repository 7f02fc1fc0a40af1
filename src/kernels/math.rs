use super::{finite, run_unary, Bound1};
use crate::config::{Mode, OpConfig};
use crate::element::{FloatElement, IntElement};
use crate::error::{Error, Result};
use crate::resolve::UnaryCall;

/// One-operand float kernel. Domain errors surface as NaN or infinity and are
/// caught by the checked-mode finiteness test.
pub(crate) trait FloatUnary {
    const NAME: &'static str;
    fn apply<T: FloatElement>(x: T) -> T;
}

pub(crate) trait IntUnary {
    const NAME: &'static str;
    fn apply<T: IntElement>(x: T, mode: Mode) -> Result<T>;
}

pub(crate) fn float_unary_cell<T: FloatElement, K: FloatUnary>(
    call: &mut UnaryCall<'_>,
    config: &OpConfig,
) -> Result<()> {
    let checked = config.mode().is_checked();
    let Bound1 { dest, x } = call.bind::<T>()?;
    run_unary(K::NAME, dest, &x, |value| finite(K::apply(value), checked))
}

pub(crate) fn int_unary_cell<T: IntElement, K: IntUnary>(
    call: &mut UnaryCall<'_>,
    config: &OpConfig,
) -> Result<()> {
    let mode = config.mode();
    let Bound1 { dest, x } = call.bind::<T>()?;
    run_unary(K::NAME, dest, &x, |value| K::apply(value, mode))
}

pub(crate) fn ldexp_cell<T: FloatElement>(
    call: &mut UnaryCall<'_>,
    exponent: i32,
    config: &OpConfig,
) -> Result<()> {
    let checked = config.mode().is_checked();
    let Bound1 { dest, x } = call.bind::<T>()?;
    run_unary("ldexp", dest, &x, |value| finite(value.ldexp(exponent), checked))
}

macro_rules! float_unary {
    ($($kernel:ident => $name:literal, |$x:ident| $body:expr;)*) => {
        $(
            pub(crate) struct $kernel;

            impl FloatUnary for $kernel {
                const NAME: &'static str = $name;

                #[inline]
                fn apply<T: FloatElement>($x: T) -> T {
                    $body
                }
            }
        )*
    };
}

float_unary! {
    Acos => "acos", |x| x.acos();
    Acosh => "acosh", |x| x.acosh();
    Asin => "asin", |x| x.asin();
    Asinh => "asinh", |x| x.asinh();
    Atan => "atan", |x| x.atan();
    Atanh => "atanh", |x| x.atanh();
    Cos => "cos", |x| x.cos();
    Cosh => "cosh", |x| x.cosh();
    Sin => "sin", |x| x.sin();
    Sinh => "sinh", |x| x.sinh();
    Tan => "tan", |x| x.tan();
    Tanh => "tanh", |x| x.tanh();
    Exp => "exp", |x| x.exp();
    Expm1 => "expm1", |x| x.exp_m1();
    Log => "log", |x| x.ln();
    Log10 => "log10", |x| x.log10();
    Log1p => "log1p", |x| x.ln_1p();
    Sqrt => "sqrt", |x| x.sqrt();
    Ceil => "ceil", |x| x.ceil();
    Floor => "floor", |x| x.floor();
    Trunc => "trunc", |x| x.trunc();
    Degrees => "degrees", |x| x.to_degrees();
    Radians => "radians", |x| x.to_radians();
    Fabs => "fabs", |x| x.abs();
    Erf => "erf", |x| FloatElement::erf(x);
    Erfc => "erfc", |x| FloatElement::erfc(x);
    Gamma => "gamma", |x| FloatElement::gamma(x);
    Lgamma => "lgamma", |x| FloatElement::lgamma(x);
}

pub(crate) struct Neg;
pub(crate) struct Abs;
pub(crate) struct Pow2;
pub(crate) struct Pow3;

impl IntUnary for Neg {
    const NAME: &'static str = "neg";

    fn apply<T: IntElement>(x: T, mode: Mode) -> Result<T> {
        match mode {
            Mode::Checked => x.checked_neg().ok_or(Error::Overflow),
            Mode::Unchecked => Ok(x.wrapping_neg()),
        }
    }
}

impl FloatUnary for Neg {
    const NAME: &'static str = "neg";

    fn apply<T: FloatElement>(x: T) -> T {
        -x
    }
}

impl IntUnary for Abs {
    const NAME: &'static str = "abs_";

    fn apply<T: IntElement>(x: T, mode: Mode) -> Result<T> {
        if !T::SIGNED || x >= T::zero() {
            return Ok(x);
        }
        <Neg as IntUnary>::apply(x, mode)
    }
}

impl FloatUnary for Abs {
    const NAME: &'static str = "abs_";

    fn apply<T: FloatElement>(x: T) -> T {
        x.abs()
    }
}

/// Checked powers test the input against the precomputed bounds instead of
/// multiplying with overflow detection.
fn bounded_power<T: IntElement>(x: T, bounds: (T, T), mode: Mode, power: fn(T) -> T) -> Result<T> {
    if mode.is_checked() && (x < bounds.0 || x > bounds.1) {
        return Err(Error::Overflow);
    }
    Ok(power(x))
}

impl IntUnary for Pow2 {
    const NAME: &'static str = "pow2";

    fn apply<T: IntElement>(x: T, mode: Mode) -> Result<T> {
        bounded_power(x, T::POW2_BOUNDS, mode, |v| v.wrapping_mul(&v))
    }
}

impl FloatUnary for Pow2 {
    const NAME: &'static str = "pow2";

    fn apply<T: FloatElement>(x: T) -> T {
        x * x
    }
}

impl IntUnary for Pow3 {
    const NAME: &'static str = "pow3";

    fn apply<T: IntElement>(x: T, mode: Mode) -> Result<T> {
        bounded_power(x, T::POW3_BOUNDS, mode, |v| v.wrapping_mul(&v).wrapping_mul(&v))
    }
}

impl FloatUnary for Pow3 {
    const NAME: &'static str = "pow3";

    fn apply<T: FloatElement>(x: T) -> T {
        x * x * x
    }
}
