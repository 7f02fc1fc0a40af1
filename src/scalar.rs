use std::fmt;

use crate::element::{Category, ElementType};
use crate::error::{Error, Result};
use crate::range;

/// A scalar operand as read from the caller, before coercion.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Scalar {
    Int(i64),
    /// Only produced for values above `i64::MAX`.
    UInt(u64),
    Float(f64),
}

impl Scalar {
    /// Classifies an integral value, preferring the signed reading.
    pub fn from_integer(value: i128) -> Option<Self> {
        if let Ok(v) = i64::try_from(value) {
            Some(Scalar::Int(v))
        } else {
            u64::try_from(value).ok().map(Scalar::UInt)
        }
    }

    pub fn as_i128(self) -> Option<i128> {
        match self {
            Scalar::Int(v) => Some(v as i128),
            Scalar::UInt(v) => Some(v as i128),
            Scalar::Float(_) => None,
        }
    }

    /// Checks that the value can be coerced into `element_type`.
    pub fn check_fits(self, element_type: ElementType) -> Result<()> {
        match (self, element_type.category()) {
            (Scalar::Float(_), Category::Signed | Category::Unsigned) => Err(Error::TypeMismatch),
            (Scalar::Float(v), Category::Float) => {
                if element_type == ElementType::Float32 && !range::in_float32_range(v) {
                    Err(Error::Overflow)
                } else {
                    Ok(())
                }
            }
            (_, Category::Float) => Ok(()),
            (integral, _) => {
                let value = integral.as_i128().unwrap_or_default();
                if element_type.holds_integer(value) {
                    Ok(())
                } else {
                    Err(Error::Overflow)
                }
            }
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Int(v) => write!(f, "{v}"),
            Scalar::UInt(v) => write!(f, "{v}"),
            Scalar::Float(v) => write!(f, "{v}"),
        }
    }
}

impl From<i64> for Scalar {
    fn from(value: i64) -> Self {
        Scalar::Int(value)
    }
}

impl From<i32> for Scalar {
    fn from(value: i32) -> Self {
        Scalar::Int(value as i64)
    }
}

impl From<u64> for Scalar {
    fn from(value: u64) -> Self {
        match i64::try_from(value) {
            Ok(v) => Scalar::Int(v),
            Err(_) => Scalar::UInt(value),
        }
    }
}

impl From<f64> for Scalar {
    fn from(value: f64) -> Self {
        Scalar::Float(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integers_prefer_the_signed_reading() {
        assert_eq!(Scalar::from_integer(-1), Some(Scalar::Int(-1)));
        assert_eq!(
            Scalar::from_integer(u64::MAX as i128),
            Some(Scalar::UInt(u64::MAX))
        );
        assert_eq!(Scalar::from_integer(u64::MAX as i128 + 1), None);
        assert_eq!(Scalar::from_integer(i64::MIN as i128 - 1), None);
        assert_eq!(Scalar::from(7u64), Scalar::Int(7));
    }

    #[test]
    fn fit_checks_follow_destination_bounds() {
        assert_eq!(Scalar::Int(127).check_fits(ElementType::Int8), Ok(()));
        assert_eq!(Scalar::Int(128).check_fits(ElementType::Int8), Err(Error::Overflow));
        assert_eq!(Scalar::Int(-1).check_fits(ElementType::ULongLong), Err(Error::Overflow));
        assert_eq!(Scalar::UInt(u64::MAX).check_fits(ElementType::ULongLong), Ok(()));
        assert_eq!(Scalar::UInt(u64::MAX).check_fits(ElementType::LongLong), Err(Error::Overflow));
        assert_eq!(Scalar::Float(0.5).check_fits(ElementType::Int32), Err(Error::TypeMismatch));
        assert_eq!(Scalar::Int(3).check_fits(ElementType::Float32), Ok(()));
        assert_eq!(Scalar::Float(1.0e40).check_fits(ElementType::Float32), Err(Error::Overflow));
        assert_eq!(Scalar::Float(1.0e40).check_fits(ElementType::Float64), Ok(()));
    }
}
