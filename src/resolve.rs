//! Parameter-shape resolution.
//!
//! Every entry point passes its classified operands through one of the
//! resolvers below before any kernel runs. A resolver fixes the common
//! element type, checks linked lengths, validates every scalar against that
//! type, applies `maxlen`, and records the shape tag the typed cell matches on.
//! Errors found here leave every buffer untouched.

use crate::config::OpConfig;
use crate::element::{effective_length, ElementType};
use crate::error::{Error, Result};
use crate::operand::{ArrayView, Operand};
use crate::scalar::Scalar;

/// Which operand slots hold arrays, and where results are written.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShapeTag {
    ArrayScalar,
    ScalarArray,
    ArrayArray,
    ArrayScalarOut,
    ScalarArrayOut,
    ArrayArrayOut,
    /// Single-array operation writing back into its input.
    InPlace,
    /// Single-array operation writing to a separate output array.
    Output,
}

impl ShapeTag {
    pub fn has_output(self) -> bool {
        matches!(
            self,
            ShapeTag::ArrayScalarOut
                | ShapeTag::ScalarArrayOut
                | ShapeTag::ArrayArrayOut
                | ShapeTag::Output
        )
    }

    fn binary(lhs_array: bool, rhs_array: bool, out: bool) -> Self {
        match (lhs_array, rhs_array, out) {
            (true, false, false) => ShapeTag::ArrayScalar,
            (false, true, false) => ShapeTag::ScalarArray,
            (true, true, false) => ShapeTag::ArrayArray,
            (true, false, true) => ShapeTag::ArrayScalarOut,
            (false, true, true) => ShapeTag::ScalarArrayOut,
            _ => ShapeTag::ArrayArrayOut,
        }
    }
}

/// The resolved shape of one call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ShapeDescriptor {
    pub element_type: ElementType,
    /// Elements to process, after `maxlen`.
    pub len: usize,
    pub tag: ShapeTag,
}

/// An operand slot after classification.
#[derive(Debug)]
pub(crate) enum Arg<'a> {
    Array(ArrayView<'a>),
    /// Already checked to fit the call's element type.
    Scalar(Scalar),
}

impl<'a> Arg<'a> {
    fn from_operand(operand: Operand<'a>) -> Result<Self> {
        match operand.validate()? {
            Operand::Array(view) => Ok(Arg::Array(view)),
            Operand::Scalar(value) => Ok(Arg::Scalar(value)),
            Operand::Invalid(invalid) => Err(invalid.into()),
        }
    }

    fn array(&self) -> Option<&ArrayView<'a>> {
        match self {
            Arg::Array(view) => Some(view),
            Arg::Scalar(_) => None,
        }
    }

    fn is_array(&self) -> bool {
        matches!(self, Arg::Array(_))
    }

    fn check_scalar(&self, element_type: ElementType) -> Result<()> {
        match self {
            Arg::Scalar(value) => value.check_fits(element_type),
            Arg::Array(_) => Ok(()),
        }
    }
}

/// Two operands, optionally with a separate output.
#[derive(Debug)]
pub(crate) struct BinaryCall<'a> {
    pub desc: ShapeDescriptor,
    pub lhs: Arg<'a>,
    pub rhs: Arg<'a>,
    pub out: Option<ArrayView<'a>>,
}

/// One array, optionally with a separate output.
#[derive(Debug)]
pub(crate) struct UnaryCall<'a> {
    pub desc: ShapeDescriptor,
    pub data: ArrayView<'a>,
    pub out: Option<ArrayView<'a>>,
}

/// `x * y + z` operands.
#[derive(Debug)]
pub(crate) struct TernaryCall<'a> {
    pub desc: ShapeDescriptor,
    pub x: ArrayView<'a>,
    pub y: Arg<'a>,
    pub z: Arg<'a>,
    pub out: Option<ArrayView<'a>>,
}

/// A single array that is read (reductions) or written (fills).
#[derive(Debug)]
pub(crate) struct ArrayCall<'a> {
    pub desc: ShapeDescriptor,
    pub data: ArrayView<'a>,
}

#[derive(Debug)]
pub(crate) struct CompressCall<'a> {
    pub desc: ShapeDescriptor,
    pub data: ArrayView<'a>,
    pub out: ArrayView<'a>,
    pub selector: ArrayView<'a>,
}

fn require_array<'a>(operand: Operand<'a>, slot: &'static str) -> Result<ArrayView<'a>> {
    match operand.validate()? {
        Operand::Array(view) => Ok(view),
        _ => Err(Error::MissingParameter(slot)),
    }
}

fn output_array<'a>(operand: Option<Operand<'a>>) -> Result<Option<ArrayView<'a>>> {
    match operand.map(Operand::validate).transpose()? {
        None => Ok(None),
        Some(Operand::Array(view)) => Ok(Some(view)),
        Some(_) => Err(Error::TypeMismatch),
    }
}

/// Common element type and raw length of a set of length-linked arrays.
fn common_shape(arrays: &[&ArrayView<'_>]) -> Result<(ElementType, usize)> {
    let first = arrays.first().ok_or(Error::MissingParameter("array"))?;
    let element_type = first.element_type();
    let len = first.len();
    for view in &arrays[1..] {
        if view.element_type() != element_type {
            return Err(Error::TypeMismatch);
        }
    }
    for view in &arrays[1..] {
        if view.len() != len {
            return Err(Error::LengthMismatch);
        }
    }
    if len == 0 {
        return Err(Error::InvalidLength);
    }
    Ok((element_type, len))
}

fn writable(view: &ArrayView<'_>) -> Result<()> {
    if view.is_writable() {
        Ok(())
    } else {
        Err(Error::ValueError("destination array is read-only"))
    }
}

fn finish(
    element_type: ElementType,
    raw: usize,
    tag: ShapeTag,
    config: &OpConfig,
) -> Result<ShapeDescriptor> {
    let len = effective_length(raw, config.maxlen);
    if len < 1 {
        return Err(Error::InvalidLength);
    }
    let desc = ShapeDescriptor {
        element_type,
        len,
        tag,
    };
    tracing::trace!(?desc, "resolved call shape");
    Ok(desc)
}

/// How a two-operand family treats its slots.
#[derive(Clone, Copy, Debug)]
pub(crate) struct BinaryRules {
    /// Substitute for an omitted second operand, per element type.
    pub default: Option<fn(ElementType) -> Scalar>,
    /// Whether the call writes a destination array.
    pub writes: bool,
}

pub(crate) fn binary<'a>(
    lhs: Operand<'a>,
    rhs: Option<Operand<'a>>,
    out: Option<Operand<'a>>,
    rules: BinaryRules,
    config: &OpConfig,
) -> Result<BinaryCall<'a>> {
    let lhs = Arg::from_operand(lhs)?;
    let rhs = rhs.map(Arg::from_operand).transpose()?;
    let out = output_array(out)?;
    let rhs = match (rhs, rules.default) {
        (Some(rhs), _) => rhs,
        (None, Some(default)) => {
            let element_type = lhs
                .array()
                .or(out.as_ref())
                .map(ArrayView::element_type)
                .ok_or(Error::MissingParameter("array"))?;
            Arg::Scalar(default(element_type))
        }
        (None, None) => return Err(Error::MissingParameter("second operand")),
    };
    if !lhs.is_array() && !rhs.is_array() {
        return Err(Error::MissingParameter("array"));
    }

    let arrays: Vec<&ArrayView<'_>> = [lhs.array(), rhs.array(), out.as_ref()]
        .into_iter()
        .flatten()
        .collect();
    let (element_type, raw) = common_shape(&arrays)?;
    lhs.check_scalar(element_type)?;
    rhs.check_scalar(element_type)?;

    if rules.writes {
        let dest = out.as_ref().or(lhs.array()).or(rhs.array());
        if let Some(dest) = dest {
            writable(dest)?;
        }
    }
    let tag = ShapeTag::binary(lhs.is_array(), rhs.is_array(), out.is_some());
    let desc = finish(element_type, raw, tag, config)?;
    Ok(BinaryCall {
        desc,
        lhs,
        rhs,
        out,
    })
}

pub(crate) fn unary<'a>(
    data: Operand<'a>,
    out: Option<Operand<'a>>,
    config: &OpConfig,
) -> Result<UnaryCall<'a>> {
    let data = require_array(data, "data array")?;
    let out = output_array(out)?;
    let arrays: Vec<&ArrayView<'_>> = std::iter::once(&data).chain(out.as_ref()).collect();
    let (element_type, raw) = common_shape(&arrays)?;
    writable(out.as_ref().unwrap_or(&data))?;
    let tag = if out.is_some() {
        ShapeTag::Output
    } else {
        ShapeTag::InPlace
    };
    let desc = finish(element_type, raw, tag, config)?;
    Ok(UnaryCall { desc, data, out })
}

pub(crate) fn ternary<'a>(
    x: Operand<'a>,
    y: Operand<'a>,
    z: Operand<'a>,
    out: Option<Operand<'a>>,
    config: &OpConfig,
) -> Result<TernaryCall<'a>> {
    let x = require_array(x, "x array")?;
    let y = Arg::from_operand(y)?;
    let z = Arg::from_operand(z)?;
    let out = output_array(out)?;
    let arrays: Vec<&ArrayView<'_>> = [Some(&x), y.array(), z.array(), out.as_ref()]
        .into_iter()
        .flatten()
        .collect();
    let (element_type, raw) = common_shape(&arrays)?;
    y.check_scalar(element_type)?;
    z.check_scalar(element_type)?;
    writable(out.as_ref().unwrap_or(&x))?;
    let tag = if out.is_some() {
        ShapeTag::Output
    } else {
        ShapeTag::InPlace
    };
    let desc = finish(element_type, raw, tag, config)?;
    Ok(TernaryCall {
        desc,
        x,
        y,
        z,
        out,
    })
}

/// Resolves a single-array call. `writes` marks fills, which need a
/// writable destination.
pub(crate) fn single<'a>(
    data: Operand<'a>,
    writes: bool,
    config: &OpConfig,
) -> Result<ArrayCall<'a>> {
    let data = require_array(data, "data array")?;
    let (element_type, raw) = common_shape(&[&data])?;
    if writes {
        writable(&data)?;
    }
    let desc = finish(element_type, raw, ShapeTag::InPlace, config)?;
    Ok(ArrayCall { desc, data })
}

/// The three compress arrays share a type but not a length. Only the output
/// may be empty.
pub(crate) fn compress<'a>(
    data: Operand<'a>,
    out: Operand<'a>,
    selector: Operand<'a>,
    config: &OpConfig,
) -> Result<CompressCall<'a>> {
    let data = require_array(data, "data array")?;
    let out = require_array(out, "output array")?;
    let selector = require_array(selector, "selector array")?;
    let element_type = data.element_type();
    if out.element_type() != element_type || selector.element_type() != element_type {
        return Err(Error::TypeMismatch);
    }
    if data.is_empty() || selector.is_empty() {
        return Err(Error::InvalidLength);
    }
    writable(&out)?;
    let desc = finish(element_type, data.len(), ShapeTag::Output, config)?;
    Ok(CompressCall {
        desc,
        data,
        out,
        selector,
    })
}

/// Validates an optional scalar parameter slot. Arrays are not accepted.
pub(crate) fn scalar_param(operand: Option<Operand<'_>>) -> Result<Option<Scalar>> {
    match operand.map(Operand::validate).transpose()? {
        None => Ok(None),
        Some(Operand::Scalar(value)) => Ok(Some(value)),
        Some(Operand::Array(_)) => Err(Error::TypeMismatch),
        Some(Operand::Invalid(invalid)) => Err(invalid.into()),
    }
}

pub(crate) fn required_param(operand: Option<Operand<'_>>, slot: &'static str) -> Result<Scalar> {
    scalar_param(operand)?.ok_or(Error::MissingParameter(slot))
}
