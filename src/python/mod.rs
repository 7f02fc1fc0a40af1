//! Python bindings. Each operation is exposed under its public name and
//! accepts any object supporting the buffer protocol as an array.

mod buffer;

use pyo3::exceptions::{
    PyArithmeticError, PyOverflowError, PyTypeError, PyValueError, PyZeroDivisionError,
};
use pyo3::prelude::*;
use pyo3::types::{PyDict, PyList, PyModule};

use crate::config::{OpConfig, OptionSet};
use crate::error::Error;
use crate::metrics;
use crate::ops::{self, BinaryOp, CompareOp, Operation, PredicateOp, ReduceOp, UnaryOp};
use crate::scalar::Scalar;
use crate::simd;

use self::buffer::Argument;

impl From<Error> for PyErr {
    fn from(err: Error) -> PyErr {
        let message = err.to_string();
        match err {
            Error::TypeMismatch | Error::UnknownElementType | Error::MissingParameter(_) => {
                PyTypeError::new_err(message)
            }
            Error::LengthMismatch
            | Error::InvalidLength
            | Error::ValueError(_)
            | Error::InvalidOperator
            | Error::InvalidPlatformOperator => PyValueError::new_err(message),
            Error::Overflow => PyOverflowError::new_err(message),
            Error::ArithmeticError => PyArithmeticError::new_err(message),
            Error::DivideByZero => PyZeroDivisionError::new_err(message),
        }
    }
}

/// Builds the per-call options from keyword arguments, rejecting any the
/// operation does not accept.
fn parse_options(
    function: &str,
    accepted: OptionSet,
    options: Option<&Bound<'_, PyDict>>,
) -> PyResult<OpConfig> {
    let mut config = OpConfig::default();
    let Some(options) = options else {
        return Ok(config);
    };
    for (key, value) in options.iter() {
        let key: String = key.extract()?;
        if !accepted.accepts(&key) {
            return Err(PyTypeError::new_err(format!(
                "{function}() got an unexpected keyword argument '{key}'"
            )));
        }
        if key == "matherrors" {
            config.matherrors = value.is_truthy()?;
        } else if key == "nosimd" {
            config.nosimd = value.is_truthy()?;
        } else {
            config.maxlen = value.extract::<i64>()?;
        }
    }
    Ok(config)
}

fn scalar_to_py(py: Python<'_>, value: Scalar) -> PyObject {
    match value {
        Scalar::Int(v) => v.into_py(py),
        Scalar::UInt(v) => v.into_py(py),
        Scalar::Float(v) => v.into_py(py),
    }
}

fn run_unary(
    op: UnaryOp,
    data: &Bound<'_, PyAny>,
    out: Option<&Bound<'_, PyAny>>,
    options: Option<&Bound<'_, PyDict>>,
) -> PyResult<()> {
    let config = parse_options(op.name(), op.options(), options)?;
    let data = Argument::classify(data)?;
    let out = Argument::optional(out)?;
    ops::unary(op, data.operand(), out.as_ref().map(Argument::operand), &config)?;
    Ok(())
}

fn run_binary(
    op: BinaryOp,
    data: &Bound<'_, PyAny>,
    param: Option<&Bound<'_, PyAny>>,
    out: Option<&Bound<'_, PyAny>>,
    options: Option<&Bound<'_, PyDict>>,
) -> PyResult<()> {
    let config = parse_options(op.name(), op.options(), options)?;
    let data = Argument::classify(data)?;
    let param = Argument::optional(param)?;
    let out = Argument::optional(out)?;
    ops::binary(
        op,
        data.operand(),
        param.as_ref().map(Argument::operand),
        out.as_ref().map(Argument::operand),
        &config,
    )?;
    Ok(())
}

macro_rules! unary_functions {
    ($($func:ident => $op:ident, $name:tt;)*) => {
        $(
            #[pyfunction]
            #[pyo3(name = $name, signature = (data, out = None, **options))]
            fn $func(
                data: &Bound<'_, PyAny>,
                out: Option<&Bound<'_, PyAny>>,
                options: Option<&Bound<'_, PyDict>>,
            ) -> PyResult<()> {
                run_unary(UnaryOp::$op, data, out, options)
            }
        )*

        fn add_unary_functions(m: &Bound<'_, PyModule>) -> PyResult<()> {
            $(m.add_function(pyo3::wrap_pyfunction!($func, m)?)?;)*
            Ok(())
        }
    };
}

unary_functions! {
    acos => Acos, "acos";
    acosh => Acosh, "acosh";
    asin => Asin, "asin";
    asinh => Asinh, "asinh";
    atan => Atan, "atan";
    atanh => Atanh, "atanh";
    cos => Cos, "cos";
    cosh => Cosh, "cosh";
    sin => Sin, "sin";
    sinh => Sinh, "sinh";
    tan => Tan, "tan";
    tanh => Tanh, "tanh";
    exp => Exp, "exp";
    expm1 => Expm1, "expm1";
    log => Log, "log";
    log10 => Log10, "log10";
    log1p => Log1p, "log1p";
    sqrt => Sqrt, "sqrt";
    ceil => Ceil, "ceil";
    floor => Floor, "floor";
    trunc => Trunc, "trunc";
    degrees => Degrees, "degrees";
    radians => Radians, "radians";
    fabs => Fabs, "fabs";
    erf => Erf, "erf";
    erfc => Erfc, "erfc";
    gamma => Gamma, "gamma";
    lgamma => Lgamma, "lgamma";
    neg => Neg, "neg";
    abs_ => Abs, "abs_";
    pow2 => Pow2, "pow2";
    pow3 => Pow3, "pow3";
    invert => Invert, "invert";
}

macro_rules! binary_functions {
    ($($func:ident => $op:ident, $name:tt;)*) => {
        $(
            #[pyfunction]
            #[pyo3(name = $name, signature = (data, param = None, out = None, **options))]
            fn $func(
                data: &Bound<'_, PyAny>,
                param: Option<&Bound<'_, PyAny>>,
                out: Option<&Bound<'_, PyAny>>,
                options: Option<&Bound<'_, PyDict>>,
            ) -> PyResult<()> {
                run_binary(BinaryOp::$op, data, param, out, options)
            }
        )*

        fn add_binary_functions(m: &Bound<'_, PyModule>) -> PyResult<()> {
            $(m.add_function(pyo3::wrap_pyfunction!($func, m)?)?;)*
            Ok(())
        }
    };
}

binary_functions! {
    add => Add, "add";
    sub => Sub, "sub";
    mul => Mul, "mul";
    truediv => TrueDiv, "truediv";
    floordiv => FloorDiv, "floordiv";
    mod_ => Mod, "mod";
    pow => Pow, "pow";
    and_ => BitAnd, "and_";
    or_ => BitOr, "or_";
    xor => BitXor, "xor";
    lshift => LShift, "lshift";
    rshift => RShift, "rshift";
    copysign => CopySign, "copysign";
    fmod => FMod, "fmod";
    hypot => Hypot, "hypot";
    atan2 => Atan2, "atan2";
}

macro_rules! compare_functions {
    ($($func:ident => $op:ident;)*) => {
        $(
            #[pyfunction]
            #[pyo3(signature = (data1, data2, **options))]
            fn $func(
                data1: &Bound<'_, PyAny>,
                data2: &Bound<'_, PyAny>,
                options: Option<&Bound<'_, PyDict>>,
            ) -> PyResult<bool> {
                let op = CompareOp::$op;
                let config = parse_options(op.name(), Operation::Compare(op).options(), options)?;
                let lhs = Argument::classify(data1)?;
                let rhs = Argument::classify(data2)?;
                Ok(ops::compare(op, lhs.operand(), rhs.operand(), &config)?)
            }
        )*

        fn add_compare_functions(m: &Bound<'_, PyModule>) -> PyResult<()> {
            $(m.add_function(pyo3::wrap_pyfunction!($func, m)?)?;)*
            Ok(())
        }
    };
}

compare_functions! {
    eq => Eq;
    ne => Ne;
    lt => Lt;
    le => Le;
    gt => Gt;
    ge => Ge;
}

macro_rules! predicate_functions {
    ($($func:ident => $op:ident;)*) => {
        $(
            #[pyfunction]
            #[pyo3(signature = (data, **options))]
            fn $func(
                data: &Bound<'_, PyAny>,
                options: Option<&Bound<'_, PyDict>>,
            ) -> PyResult<bool> {
                let op = PredicateOp::$op;
                let config = parse_options(op.name(), Operation::Predicate(op).options(), options)?;
                let data = Argument::classify(data)?;
                Ok(ops::predicate(op, data.operand(), &config)?)
            }
        )*
    };
}

predicate_functions! {
    isnan => IsNan;
    isinf => IsInf;
    isfinite => IsFinite;
}

macro_rules! reduce_functions {
    ($($func:ident => $op:ident;)*) => {
        $(
            #[pyfunction]
            #[pyo3(signature = (data, **options))]
            fn $func(
                py: Python<'_>,
                data: &Bound<'_, PyAny>,
                options: Option<&Bound<'_, PyDict>>,
            ) -> PyResult<PyObject> {
                let op = ReduceOp::$op;
                let config = parse_options(op.name(), op.options(), options)?;
                let data = Argument::classify(data)?;
                let value = ops::reduce(op, data.operand(), &config)?;
                Ok(scalar_to_py(py, value))
            }
        )*
    };
}

reduce_functions! {
    amax => Max;
    amin => Min;
    asum => Sum;
}

#[pyfunction]
#[pyo3(signature = (data, exponent, out = None, **options))]
fn ldexp(
    data: &Bound<'_, PyAny>,
    exponent: &Bound<'_, PyAny>,
    out: Option<&Bound<'_, PyAny>>,
    options: Option<&Bound<'_, PyDict>>,
) -> PyResult<()> {
    let config = parse_options("ldexp", Operation::Ldexp.options(), options)?;
    let data = Argument::classify(data)?;
    let exponent = Argument::classify(exponent)?;
    let out = Argument::optional(out)?;
    ops::ldexp(
        data.operand(),
        exponent.operand(),
        out.as_ref().map(Argument::operand),
        &config,
    )?;
    Ok(())
}

#[pyfunction]
#[pyo3(signature = (x, y, z, out = None, **options))]
fn fma(
    x: &Bound<'_, PyAny>,
    y: &Bound<'_, PyAny>,
    z: &Bound<'_, PyAny>,
    out: Option<&Bound<'_, PyAny>>,
    options: Option<&Bound<'_, PyDict>>,
) -> PyResult<()> {
    let config = parse_options("fma", Operation::Fma.options(), options)?;
    let (x, y, z) = (
        Argument::classify(x)?,
        Argument::classify(y)?,
        Argument::classify(z)?,
    );
    let out = Argument::optional(out)?;
    ops::fma(
        x.operand(),
        y.operand(),
        z.operand(),
        out.as_ref().map(Argument::operand),
        &config,
    )?;
    Ok(())
}

#[pyfunction]
#[pyo3(signature = (data, value, **options))]
fn repeat(
    data: &Bound<'_, PyAny>,
    value: &Bound<'_, PyAny>,
    options: Option<&Bound<'_, PyDict>>,
) -> PyResult<()> {
    let config = parse_options("repeat", Operation::Repeat.options(), options)?;
    let data = Argument::classify(data)?;
    let value = Argument::classify(value)?;
    ops::repeat(data.operand(), value.operand(), &config)?;
    Ok(())
}

#[pyfunction]
#[pyo3(signature = (data, start = None, step = None, **options))]
fn count(
    data: &Bound<'_, PyAny>,
    start: Option<&Bound<'_, PyAny>>,
    step: Option<&Bound<'_, PyAny>>,
    options: Option<&Bound<'_, PyDict>>,
) -> PyResult<()> {
    let config = parse_options("count", Operation::Count.options(), options)?;
    let data = Argument::classify(data)?;
    let start = Argument::optional(start)?;
    let step = Argument::optional(step)?;
    ops::count(
        data.operand(),
        start.as_ref().map(Argument::operand),
        step.as_ref().map(Argument::operand),
        &config,
    )?;
    Ok(())
}

#[pyfunction]
#[pyo3(signature = (data, start, stop, step = None, **options))]
fn cycle(
    data: &Bound<'_, PyAny>,
    start: &Bound<'_, PyAny>,
    stop: &Bound<'_, PyAny>,
    step: Option<&Bound<'_, PyAny>>,
    options: Option<&Bound<'_, PyDict>>,
) -> PyResult<()> {
    let config = parse_options("cycle", Operation::Cycle.options(), options)?;
    let data = Argument::classify(data)?;
    let start = Argument::classify(start)?;
    let stop = Argument::classify(stop)?;
    let step = Argument::optional(step)?;
    ops::cycle(
        data.operand(),
        start.operand(),
        stop.operand(),
        step.as_ref().map(Argument::operand),
        &config,
    )?;
    Ok(())
}

#[pyfunction]
#[pyo3(signature = (data, out, selector, **options))]
fn compress(
    data: &Bound<'_, PyAny>,
    out: &Bound<'_, PyAny>,
    selector: &Bound<'_, PyAny>,
    options: Option<&Bound<'_, PyDict>>,
) -> PyResult<usize> {
    let config = parse_options("compress", Operation::Compress.options(), options)?;
    let data = Argument::classify(data)?;
    let out = Argument::classify(out)?;
    let selector = Argument::classify(selector)?;
    Ok(ops::compress(
        data.operand(),
        out.operand(),
        selector.operand(),
        &config,
    )?)
}

/// Detected capabilities and the kernel chosen for each vector table.
#[pyfunction]
fn simd_info(py: Python<'_>) -> PyResult<PyObject> {
    let (caps, selections) = simd::snapshot();
    let info = PyDict::new_bound(py);
    info.set_item("arch", caps.arch)?;
    info.set_item("feature_level", caps.feature_level())?;
    info.set_item("avx2", caps.avx2)?;
    info.set_item("avx", caps.avx)?;
    info.set_item("fma", caps.fma)?;
    info.set_item("sse41", caps.sse41)?;
    info.set_item("neon", caps.neon)?;
    info.set_item("lane_width_bits", caps.lane_width_bits)?;
    info.set_item("mode", format!("{:?}", simd::dispatch::global_mode()).to_lowercase())?;

    let selected = PyDict::new_bound(py);
    for (name, level) in selections {
        selected.set_item(name, level.label())?;
    }
    info.set_item("selected", selected)?;
    Ok(info.into())
}

/// How often each vectorizable operation took each path.
#[pyfunction]
fn simd_usage(py: Python<'_>) -> PyResult<PyObject> {
    let usage = PyList::empty_bound(py);
    for entry in metrics::snapshot() {
        let item = PyDict::new_bound(py);
        item.set_item("operation", entry.operation)?;
        item.set_item("element_type", entry.element_type)?;
        item.set_item("path", entry.path)?;
        item.set_item("count", entry.count)?;
        usage.append(item)?;
    }
    Ok(usage.into())
}

/// Python module initialization for `arrayfunc`.
#[pymodule]
fn arrayfunc(_py: Python<'_>, m: &Bound<'_, PyModule>) -> PyResult<()> {
    add_unary_functions(m)?;
    add_binary_functions(m)?;
    add_compare_functions(m)?;

    m.add_function(pyo3::wrap_pyfunction!(isnan, m)?)?;
    m.add_function(pyo3::wrap_pyfunction!(isinf, m)?)?;
    m.add_function(pyo3::wrap_pyfunction!(isfinite, m)?)?;
    m.add_function(pyo3::wrap_pyfunction!(amax, m)?)?;
    m.add_function(pyo3::wrap_pyfunction!(amin, m)?)?;
    m.add_function(pyo3::wrap_pyfunction!(asum, m)?)?;
    m.add_function(pyo3::wrap_pyfunction!(ldexp, m)?)?;
    m.add_function(pyo3::wrap_pyfunction!(fma, m)?)?;
    m.add_function(pyo3::wrap_pyfunction!(repeat, m)?)?;
    m.add_function(pyo3::wrap_pyfunction!(count, m)?)?;
    m.add_function(pyo3::wrap_pyfunction!(cycle, m)?)?;
    m.add_function(pyo3::wrap_pyfunction!(compress, m)?)?;
    m.add_function(pyo3::wrap_pyfunction!(simd_info, m)?)?;
    m.add_function(pyo3::wrap_pyfunction!(simd_usage, m)?)?;

    m.add("__version__", env!("CARGO_PKG_VERSION"))?;
    m.add("__doc__", "Element-wise operations over typed buffers.")?;

    Ok(())
}

/// Populates `module` with the extension's contents, for embedding tests.
pub fn init_test_module(py: Python<'_>, module: &Bound<'_, PyModule>) -> PyResult<()> {
    arrayfunc(py, module)
}
