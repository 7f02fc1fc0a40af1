//! Typed inner loops.
//!
//! Cells in the dispatch tables bind a resolved call to typed slices and hand
//! them to the runners here. Runners stop at the first failing element and
//! return its error. Elements before it keep their new values.

pub(crate) mod arith;
pub(crate) mod bitwise;
pub(crate) mod compare;
pub(crate) mod compress;
pub(crate) mod fill;
pub(crate) mod math;
pub(crate) mod reduce;

use crate::element::Element;
use crate::error::{Error, Result};
use crate::operand::ArrayView;
use crate::resolve::{Arg, BinaryCall, TernaryCall, UnaryCall};

/// Where a kernel reads one of its operands from.
#[derive(Debug)]
pub(crate) enum Input<'v, T> {
    /// The destination itself, as in `a += b`.
    Dest,
    Borrowed(&'v [T]),
    /// Copy of an input that partially overlaps the destination.
    Owned(Vec<T>),
    Scalar(T),
}

impl<'v, T: Copy> Input<'v, T> {
    #[inline]
    pub(crate) fn at(&self, dest: &[T], index: usize) -> T {
        match self {
            Input::Dest => dest[index],
            Input::Borrowed(values) => values[index],
            Input::Owned(values) => values[index],
            Input::Scalar(value) => *value,
        }
    }

    pub(crate) fn as_slice(&self) -> Option<&[T]> {
        match self {
            Input::Borrowed(values) => Some(values),
            Input::Owned(values) => Some(values),
            Input::Dest | Input::Scalar(_) => None,
        }
    }
}

/// Reads `view` as an input to a kernel that writes `dest`.
pub(crate) fn array_input<'v, T: Element>(
    view: &'v ArrayView<'_>,
    dest: &ArrayView<'_>,
    len: usize,
) -> Result<Input<'v, T>> {
    if view.same_start(dest) {
        return Ok(Input::Dest);
    }
    let values = view.slice::<T>(len)?;
    if view.overlaps(dest) {
        Ok(Input::Owned(values.to_vec()))
    } else {
        Ok(Input::Borrowed(values))
    }
}

fn arg_input<'v, T: Element>(
    arg: &'v Arg<'_>,
    dest: &ArrayView<'_>,
    len: usize,
) -> Result<Input<'v, T>> {
    match arg {
        Arg::Array(view) => array_input(view, dest, len),
        Arg::Scalar(value) => Ok(Input::Scalar(T::from_scalar(*value)?)),
    }
}

/// Typed operands of a two-input kernel.
pub(crate) struct Bound2<'v, T> {
    pub dest: &'v mut [T],
    pub x: Input<'v, T>,
    pub y: Input<'v, T>,
}

impl<'a> BinaryCall<'a> {
    /// Binds the call to typed slices, picking the destination from the
    /// shape: the separate output if given, else the first array operand.
    pub(crate) fn bind<T: Element>(&mut self) -> Result<Bound2<'_, T>> {
        let len = self.desc.len;
        let BinaryCall { lhs, rhs, out, .. } = self;
        match (out, lhs, rhs) {
            (Some(out), lhs, rhs) => {
                let x = arg_input(lhs, out, len)?;
                let y = arg_input(rhs, out, len)?;
                let dest = out.slice_mut(len)?;
                Ok(Bound2 { dest, x, y })
            }
            (None, Arg::Array(lhs), rhs) => {
                let y = arg_input(rhs, lhs, len)?;
                let dest = lhs.slice_mut(len)?;
                Ok(Bound2 {
                    dest,
                    x: Input::Dest,
                    y,
                })
            }
            (None, Arg::Scalar(lhs), Arg::Array(rhs)) => {
                let x = Input::Scalar(T::from_scalar(*lhs)?);
                let dest = rhs.slice_mut(len)?;
                Ok(Bound2 {
                    dest,
                    x,
                    y: Input::Dest,
                })
            }
            (None, Arg::Scalar(_), Arg::Scalar(_)) => Err(Error::MissingParameter("array")),
        }
    }

    /// Binds both operands for reading only, as comparisons do.
    pub(crate) fn bind_read<T: Element>(&self) -> Result<(Input<'_, T>, Input<'_, T>)> {
        let len = self.desc.len;
        Ok((read_arg(&self.lhs, len)?, read_arg(&self.rhs, len)?))
    }
}

fn read_arg<'v, T: Element>(arg: &'v Arg<'_>, len: usize) -> Result<Input<'v, T>> {
    match arg {
        Arg::Array(view) => Ok(Input::Borrowed(view.slice::<T>(len)?)),
        Arg::Scalar(value) => Ok(Input::Scalar(T::from_scalar(*value)?)),
    }
}

pub(crate) struct Bound1<'v, T> {
    pub dest: &'v mut [T],
    pub x: Input<'v, T>,
}

impl<'a> UnaryCall<'a> {
    pub(crate) fn bind<T: Element>(&mut self) -> Result<Bound1<'_, T>> {
        let len = self.desc.len;
        match &mut self.out {
            Some(out) => {
                let x = array_input(&self.data, out, len)?;
                let dest = out.slice_mut(len)?;
                Ok(Bound1 { dest, x })
            }
            None => Ok(Bound1 {
                dest: self.data.slice_mut(len)?,
                x: Input::Dest,
            }),
        }
    }
}

pub(crate) struct Bound3<'v, T> {
    pub dest: &'v mut [T],
    pub x: Input<'v, T>,
    pub y: Input<'v, T>,
    pub z: Input<'v, T>,
}

impl<'a> TernaryCall<'a> {
    pub(crate) fn bind<T: Element>(&mut self) -> Result<Bound3<'_, T>> {
        let len = self.desc.len;
        let TernaryCall { x, y, z, out, .. } = self;
        match out {
            Some(out) => {
                let xs = array_input(x, out, len)?;
                let ys = arg_input(y, out, len)?;
                let zs = arg_input(z, out, len)?;
                let dest = out.slice_mut(len)?;
                Ok(Bound3 {
                    dest,
                    x: xs,
                    y: ys,
                    z: zs,
                })
            }
            None => {
                let ys = arg_input(y, x, len)?;
                let zs = arg_input(z, x, len)?;
                let dest = x.slice_mut(len)?;
                Ok(Bound3 {
                    dest,
                    x: Input::Dest,
                    y: ys,
                    z: zs,
                })
            }
        }
    }
}

fn abort(name: &'static str, index: usize, err: Error) -> Error {
    tracing::debug!(op = name, index, error = %err, "kernel aborted");
    err
}

/// Runs `f` over every element of `dest`.
pub(crate) fn run_unary<T: Copy>(
    name: &'static str,
    dest: &mut [T],
    x: &Input<'_, T>,
    f: impl Fn(T) -> Result<T>,
) -> Result<()> {
    for index in 0..dest.len() {
        let value = x.at(dest, index);
        dest[index] = f(value).map_err(|err| abort(name, index, err))?;
    }
    Ok(())
}

/// Runs `f` over `dest[start..]`. Elements below `start` were already
/// written by a vector kernel.
pub(crate) fn run_binary<T: Copy>(
    name: &'static str,
    dest: &mut [T],
    x: &Input<'_, T>,
    y: &Input<'_, T>,
    start: usize,
    f: impl Fn(T, T) -> Result<T>,
) -> Result<()> {
    for index in start..dest.len() {
        let a = x.at(dest, index);
        let b = y.at(dest, index);
        dest[index] = f(a, b).map_err(|err| abort(name, index, err))?;
    }
    Ok(())
}

pub(crate) fn run_ternary<T: Copy>(
    name: &'static str,
    bound: Bound3<'_, T>,
    f: impl Fn(T, T, T) -> Result<T>,
) -> Result<()> {
    let Bound3 { dest, x, y, z } = bound;
    for index in 0..dest.len() {
        let a = x.at(dest, index);
        let b = y.at(dest, index);
        let c = z.at(dest, index);
        dest[index] = f(a, b, c).map_err(|err| abort(name, index, err))?;
    }
    Ok(())
}

/// Rejects a non-finite float result in checked mode.
#[inline]
pub(crate) fn finite<T: Element>(value: T, checked: bool) -> Result<T> {
    if checked && !value.is_finite_value() {
        Err(Error::ArithmeticError)
    } else {
        Ok(value)
    }
}
