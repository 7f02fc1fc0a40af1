use super::arith::IntBinary;
use super::math::IntUnary;
use crate::config::Mode;
use crate::element::IntElement;
use crate::error::{Error, Result};

pub(crate) struct BitAnd;
pub(crate) struct BitOr;
pub(crate) struct BitXor;
pub(crate) struct ShiftLeft;
pub(crate) struct ShiftRight;
pub(crate) struct Invert;

impl IntBinary for BitAnd {
    const NAME: &'static str = "and_";

    fn apply<T: IntElement>(x: T, y: T, _mode: Mode) -> Result<T> {
        Ok(x & y)
    }
}

impl IntBinary for BitOr {
    const NAME: &'static str = "or_";

    fn apply<T: IntElement>(x: T, y: T, _mode: Mode) -> Result<T> {
        Ok(x | y)
    }
}

impl IntBinary for BitXor {
    const NAME: &'static str = "xor";

    fn apply<T: IntElement>(x: T, y: T, _mode: Mode) -> Result<T> {
        Ok(x ^ y)
    }
}

/// Shift count as a bit index. Counts outside `0..BITS` are rejected, so no
/// shift is ever undefined.
fn shift_count<T: IntElement>(count: T) -> Result<usize> {
    count
        .to_usize()
        .filter(|&bits| bits < T::BITS as usize)
        .ok_or(Error::ValueError("shift count out of range"))
}

impl IntBinary for ShiftLeft {
    const NAME: &'static str = "lshift";

    fn apply<T: IntElement>(x: T, y: T, _mode: Mode) -> Result<T> {
        Ok(x << shift_count(y)?)
    }
}

impl IntBinary for ShiftRight {
    const NAME: &'static str = "rshift";

    fn apply<T: IntElement>(x: T, y: T, _mode: Mode) -> Result<T> {
        Ok(x >> shift_count(y)?)
    }
}

impl IntUnary for Invert {
    const NAME: &'static str = "invert";

    fn apply<T: IntElement>(x: T, _mode: Mode) -> Result<T> {
        Ok(!x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shifts_keep_the_sign_of_signed_values() {
        assert_eq!(ShiftRight::apply(-16i8, 2, Mode::Checked), Ok(-4));
        assert_eq!(ShiftLeft::apply(1u8, 7, Mode::Checked), Ok(128));
        assert_eq!(ShiftLeft::apply(64i8, 1, Mode::Checked), Ok(-128));
    }

    #[test]
    fn out_of_range_shift_counts_are_rejected() {
        assert!(ShiftLeft::apply(1u16, 16, Mode::Unchecked).is_err());
        assert!(ShiftRight::apply(1i32, -1, Mode::Unchecked).is_err());
        assert_eq!(ShiftRight::apply(u64::MAX, 63, Mode::Unchecked), Ok(1));
    }

    #[test]
    fn bitwise_combinations() {
        assert_eq!(BitAnd::apply(0b1100u8, 0b1010, Mode::Checked), Ok(0b1000));
        assert_eq!(BitOr::apply(0b1100u8, 0b1010, Mode::Checked), Ok(0b1110));
        assert_eq!(BitXor::apply(0b1100u8, 0b1010, Mode::Checked), Ok(0b0110));
        assert_eq!(Invert::apply(0i16, Mode::Checked), Ok(-1));
        assert_eq!(Invert::apply(0x0fu8, Mode::Checked), Ok(0xf0));
    }
}
