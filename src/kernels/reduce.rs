//! Reductions over one array: extrema, sums and float classification.

use crate::config::OpConfig;
use crate::element::{Element, FloatElement, IntElement};
use crate::error::{Error, Result};
use crate::metrics;
use crate::resolve::ArrayCall;
use crate::scalar::Scalar;
use crate::simd::{self, Vectorized};

fn values<'c, T: Element>(call: &'c ArrayCall<'_>) -> Result<&'c [T]> {
    call.data.slice::<T>(call.desc.len)
}

/// Largest element. A leading NaN is kept, later ones are skipped.
pub(crate) fn max_cell<T: Element>(call: &ArrayCall<'_>, _config: &OpConfig) -> Result<Scalar> {
    let data = values::<T>(call)?;
    let best = data[1..]
        .iter()
        .fold(data[0], |best, &value| if value > best { value } else { best });
    Ok(best.to_scalar())
}

pub(crate) fn min_cell<T: Element>(call: &ArrayCall<'_>, _config: &OpConfig) -> Result<Scalar> {
    let data = values::<T>(call)?;
    let best = data[1..]
        .iter()
        .fold(data[0], |best, &value| if value < best { value } else { best });
    Ok(best.to_scalar())
}

/// Signed integers accumulate in 64 bits.
pub(crate) fn signed_sum_cell<T: IntElement + Into<i64>>(
    call: &ArrayCall<'_>,
    config: &OpConfig,
) -> Result<Scalar> {
    let data = values::<T>(call)?;
    let checked = config.mode().is_checked();
    let mut total = 0i64;
    for (index, &value) in data.iter().enumerate() {
        let value: i64 = value.into();
        total = if checked {
            total.checked_add(value).ok_or_else(|| {
                tracing::debug!(op = "asum", index, "accumulator overflow");
                Error::Overflow
            })?
        } else {
            total.wrapping_add(value)
        };
    }
    Ok(Scalar::Int(total))
}

/// Unsigned integers accumulate in 64 unsigned bits.
pub(crate) fn unsigned_sum_cell<T: IntElement + Into<u64>>(
    call: &ArrayCall<'_>,
    config: &OpConfig,
) -> Result<Scalar> {
    let data = values::<T>(call)?;
    let checked = config.mode().is_checked();
    let mut total = 0u64;
    for (index, &value) in data.iter().enumerate() {
        let value: u64 = value.into();
        total = if checked {
            total.checked_add(value).ok_or_else(|| {
                tracing::debug!(op = "asum", index, "accumulator overflow");
                Error::Overflow
            })?
        } else {
            total.wrapping_add(value)
        };
    }
    Ok(Scalar::from(total))
}

/// Floats accumulate in their own precision. The vector path adds in a
/// different order than the sequential loop.
pub(crate) fn float_sum_cell<T: FloatElement + Vectorized>(
    call: &ArrayCall<'_>,
    config: &OpConfig,
) -> Result<Scalar> {
    let data = values::<T>(call)?;
    let (total, path) = if simd::eligible(T::ELEMENT_TYPE, data.len(), config.nosimd) {
        let (total, level) = T::vector_sum(data)?;
        (total, level.label())
    } else {
        let total = data.iter().fold(T::zero(), |acc, &value| acc + value);
        (total, "scalar")
    };
    metrics::record_path("asum", T::ELEMENT_TYPE.name(), path);
    if config.mode().is_checked() && !total.is_finite() {
        return Err(Error::ArithmeticError);
    }
    Ok(Scalar::Float(total.into_f64()))
}

pub(crate) fn isnan_cell<T: FloatElement>(
    call: &ArrayCall<'_>,
    _config: &OpConfig,
) -> Result<bool> {
    Ok(values::<T>(call)?.iter().any(|value| value.is_nan()))
}

pub(crate) fn isinf_cell<T: FloatElement>(
    call: &ArrayCall<'_>,
    _config: &OpConfig,
) -> Result<bool> {
    Ok(values::<T>(call)?.iter().any(|value| value.is_infinite()))
}

/// True only when every element is finite.
pub(crate) fn isfinite_cell<T: FloatElement>(
    call: &ArrayCall<'_>,
    _config: &OpConfig,
) -> Result<bool> {
    Ok(values::<T>(call)?.iter().all(|value| value.is_finite()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolve;

    fn sum_i8(data: &mut [i8], config: &OpConfig) -> Result<Scalar> {
        let call = resolve::single(data.into(), false, config)?;
        signed_sum_cell::<i8>(&call, config)
    }

    #[test]
    fn narrow_sums_use_a_wide_accumulator() {
        let mut data = [100i8; 10];
        assert_eq!(sum_i8(&mut data, &OpConfig::default()), Ok(Scalar::Int(1000)));
    }

    #[test]
    fn unsigned_totals_above_the_signed_range() {
        let mut data = [u64::MAX / 2, u64::MAX / 2];
        let config = OpConfig::default();
        let call = resolve::single((&mut data).into(), false, &config).unwrap();
        assert_eq!(
            unsigned_sum_cell::<u64>(&call, &config),
            Ok(Scalar::UInt(u64::MAX - 1))
        );
        drop(call);

        let mut data = [u64::MAX, 1];
        let call = resolve::single((&mut data).into(), false, &config).unwrap();
        assert_eq!(unsigned_sum_cell::<u64>(&call, &config), Err(Error::Overflow));
        let unchecked = OpConfig::new().matherrors(true);
        assert_eq!(unsigned_sum_cell::<u64>(&call, &unchecked), Ok(Scalar::Int(0)));
    }

    #[test]
    fn extrema_of_mixed_values() {
        let mut data = [3.0f32, -1.5, 7.25, 0.0];
        let config = OpConfig::default();
        let call = resolve::single((&mut data).into(), false, &config).unwrap();
        assert_eq!(max_cell::<f32>(&call, &config), Ok(Scalar::Float(7.25)));
        assert_eq!(min_cell::<f32>(&call, &config), Ok(Scalar::Float(-1.5)));
    }

    #[test]
    fn classification_short_circuits_on_any_match() {
        let mut data = [1.0f64, f64::NAN, f64::INFINITY];
        let config = OpConfig::default();
        let call = resolve::single((&mut data).into(), false, &config).unwrap();
        assert_eq!(isnan_cell::<f64>(&call, &config), Ok(true));
        assert_eq!(isinf_cell::<f64>(&call, &config), Ok(true));
        assert_eq!(isfinite_cell::<f64>(&call, &config), Ok(false));
    }
}
