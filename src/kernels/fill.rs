//! Fills: constant, arithmetic progression and a repeating ramp.

use crate::config::OpConfig;
use crate::element::{Element, FloatElement, IntElement};
use crate::error::{Error, Result};
use crate::resolve::ArrayCall;
use crate::scalar::Scalar;

fn destination<'c, T: Element>(call: &'c mut ArrayCall<'_>) -> Result<&'c mut [T]> {
    let len = call.desc.len;
    call.data.slice_mut::<T>(len)
}

pub(crate) fn repeat_cell<T: Element>(
    call: &mut ArrayCall<'_>,
    value: Scalar,
    _config: &OpConfig,
) -> Result<()> {
    let value = T::from_scalar(value)?;
    destination::<T>(call)?.fill(value);
    Ok(())
}

/// Step of an integer progression. Unsigned types take a negative step as a
/// decrement of its magnitude.
#[derive(Clone, Copy)]
enum Stride<T> {
    Up(T),
    Down(T),
}

fn stride<T: IntElement>(step: Scalar) -> Result<Stride<T>> {
    if T::SIGNED {
        return Ok(Stride::Up(T::from_scalar(step)?));
    }
    match step {
        Scalar::Int(value) if value < 0 => T::from_i128(-(value as i128))
            .map(Stride::Down)
            .ok_or(Error::Overflow),
        other => Ok(Stride::Up(T::from_scalar(other)?)),
    }
}

pub(crate) fn int_count_cell<T: IntElement>(
    call: &mut ArrayCall<'_>,
    start: Scalar,
    step: Scalar,
    config: &OpConfig,
) -> Result<()> {
    let start = T::from_scalar(start)?;
    let stride = stride::<T>(step)?;
    let checked = config.mode().is_checked();
    let dest = destination::<T>(call)?;
    let mut current = start;
    dest[0] = current;
    for index in 1..dest.len() {
        current = match (stride, checked) {
            (Stride::Up(step), true) => current.checked_add(&step),
            (Stride::Down(step), true) => current.checked_sub(&step),
            (Stride::Up(step), false) => Some(current.wrapping_add(&step)),
            (Stride::Down(step), false) => Some(current.wrapping_sub(&step)),
        }
        .ok_or_else(|| {
            tracing::debug!(op = "count", index, "progression overflow");
            Error::Overflow
        })?;
        dest[index] = current;
    }
    Ok(())
}

/// Float progressions compute each element as `start + step * i` so rounding
/// does not accumulate.
pub(crate) fn float_count_cell<T: FloatElement>(
    call: &mut ArrayCall<'_>,
    start: Scalar,
    step: Scalar,
    config: &OpConfig,
) -> Result<()> {
    let start = T::from_scalar(start)?;
    let step = T::from_scalar(step)?;
    let checked = config.mode().is_checked();
    let dest = destination::<T>(call)?;
    for (index, slot) in dest.iter_mut().enumerate() {
        let value = start + step * T::from_f64(index as f64);
        if checked && !value.is_finite() {
            tracing::debug!(op = "count", index, "non-finite progression");
            return Err(Error::ArithmeticError);
        }
        *slot = value;
    }
    Ok(())
}

/// Endpoints and step of a cycle, validated before anything is written.
fn cycle_bounds<T: Element>(start: Scalar, stop: Scalar, step: Scalar) -> Result<(T, T, T)> {
    let start = T::from_scalar(start)?;
    let stop = T::from_scalar(stop)?;
    let step = T::from_scalar(step)?;
    if !(step > T::zero()) {
        return Err(Error::ValueError("cycle step must be positive"));
    }
    if !start.is_finite_value() || !stop.is_finite_value() || !step.is_finite_value() {
        return Err(Error::ValueError("cycle bounds must be finite"));
    }
    Ok((start, stop, step))
}

/// Ramps from `start` towards `stop` inclusive in steps of `step`, wrapping
/// back to `start` once the next value would pass `stop`. A `start` above
/// `stop` ramps downwards.
pub(crate) fn int_cycle_cell<T: IntElement>(
    call: &mut ArrayCall<'_>,
    start: Scalar,
    stop: Scalar,
    step: Scalar,
    _config: &OpConfig,
) -> Result<()> {
    let (start, stop, step) = cycle_bounds::<T>(start, stop, step)?;
    let (first, last, step) = (start.to_i128(), stop.to_i128(), step.to_i128());
    let ascending = first <= last;
    let dest = destination::<T>(call)?;
    let mut current = first;
    for slot in dest.iter_mut() {
        *slot = T::truncate_i128(current);
        let next = if ascending { current + step } else { current - step };
        current = if (ascending && next > last) || (!ascending && next < last) {
            first
        } else {
            next
        };
    }
    Ok(())
}

pub(crate) fn float_cycle_cell<T: FloatElement>(
    call: &mut ArrayCall<'_>,
    start: Scalar,
    stop: Scalar,
    step: Scalar,
    _config: &OpConfig,
) -> Result<()> {
    let (first, last, step) = cycle_bounds::<T>(start, stop, step)?;
    let ascending = first <= last;
    let dest = destination::<T>(call)?;
    let mut current = first;
    for slot in dest.iter_mut() {
        *slot = current;
        let next = if ascending { current + step } else { current - step };
        current = if (ascending && next > last) || (!ascending && next < last) {
            first
        } else {
            next
        };
    }
    Ok(())
}
