//! Classification of Python call arguments into operands.

use std::ffi::CStr;

use pyo3::exceptions::PyOverflowError;
use pyo3::ffi;
use pyo3::prelude::*;
use pyo3::types::{PyBool, PyFloat, PyInt};

use crate::element::ElementType;
use crate::operand::{ArrayView, Invalid, Operand};
use crate::scalar::Scalar;

/// An exported buffer, released when dropped.
pub(crate) struct BufferGuard {
    view: Box<ffi::Py_buffer>,
    writable: bool,
}

impl BufferGuard {
    /// Requests a writable buffer, falling back to a read-only one.
    fn acquire(object: &Bound<'_, PyAny>) -> PyResult<Self> {
        let py = object.py();
        // SAFETY: Py_buffer is a plain C struct for which all-zero is the
        // documented "empty" state.
        let mut view: Box<ffi::Py_buffer> = Box::new(unsafe { std::mem::zeroed() });
        let writable_flags = ffi::PyBUF_FORMAT | ffi::PyBUF_WRITABLE;
        // SAFETY: `object` is a live reference and `view` outlives the call.
        if unsafe { ffi::PyObject_GetBuffer(object.as_ptr(), &mut *view, writable_flags) } == 0 {
            return Ok(Self {
                view,
                writable: true,
            });
        }
        // Discard the writable-request error before retrying.
        drop(PyErr::take(py));
        if unsafe { ffi::PyObject_GetBuffer(object.as_ptr(), &mut *view, ffi::PyBUF_FORMAT) } == 0 {
            return Ok(Self {
                view,
                writable: false,
            });
        }
        Err(PyErr::fetch(py))
    }

    fn element_type(&self) -> Option<ElementType> {
        if self.view.format.is_null() {
            return Some(ElementType::UInt8);
        }
        // SAFETY: a non-null format is a NUL-terminated string owned by the
        // exporter for the lifetime of the buffer.
        let format = unsafe { CStr::from_ptr(self.view.format) };
        format
            .to_str()
            .ok()
            .and_then(|format| ElementType::from_format(format).ok())
    }

    fn operand(&self) -> Operand<'_> {
        let Some(element_type) = self.element_type() else {
            return Operand::Invalid(Invalid::UnknownFormat);
        };
        let byte_len = usize::try_from(self.view.len).unwrap_or_default();
        // SAFETY: the exporter keeps `buf` valid for `len` bytes until the
        // buffer is released in `drop`, which the returned borrow precedes.
        let view = unsafe {
            ArrayView::from_raw_parts(
                element_type,
                self.view.buf as *mut u8,
                byte_len,
                self.writable && self.view.readonly == 0,
            )
        };
        Operand::Array(view)
    }
}

impl Drop for BufferGuard {
    fn drop(&mut self) {
        Python::with_gil(|_| {
            // SAFETY: the view was filled by a successful PyObject_GetBuffer
            // and is released exactly once.
            unsafe { ffi::PyBuffer_Release(&mut *self.view) };
        });
    }
}

/// A classified argument that keeps any exported buffer alive.
pub(crate) enum Argument {
    Buffer(BufferGuard),
    Value(Scalar),
    Invalid(Invalid),
}

impl Argument {
    pub(crate) fn classify(object: &Bound<'_, PyAny>) -> PyResult<Self> {
        if object.is_instance_of::<PyBool>() {
            let value: bool = object.extract()?;
            return Ok(Argument::Value(Scalar::Int(value as i64)));
        }
        if object.is_instance_of::<PyInt>() {
            return match object.extract::<i128>() {
                Ok(value) => Ok(match Operand::integer(value) {
                    Operand::Scalar(scalar) => Argument::Value(scalar),
                    _ => Argument::Invalid(Invalid::Overflow),
                }),
                Err(err) if err.is_instance_of::<PyOverflowError>(object.py()) => {
                    Ok(Argument::Invalid(Invalid::Overflow))
                }
                Err(err) => Err(err),
            };
        }
        if object.is_instance_of::<PyFloat>() {
            return Ok(Argument::Value(Scalar::Float(object.extract()?)));
        }
        // SAFETY: `object` is a live reference.
        if unsafe { ffi::PyObject_CheckBuffer(object.as_ptr()) } != 0 {
            return BufferGuard::acquire(object).map(Argument::Buffer);
        }
        Ok(Argument::Invalid(Invalid::NotNumeric))
    }

    pub(crate) fn optional(object: Option<&Bound<'_, PyAny>>) -> PyResult<Option<Self>> {
        match object {
            Some(object) if !object.is_none() => Self::classify(object).map(Some),
            _ => Ok(None),
        }
    }

    pub(crate) fn operand(&self) -> Operand<'_> {
        match self {
            Argument::Buffer(guard) => guard.operand(),
            Argument::Value(scalar) => Operand::Scalar(*scalar),
            Argument::Invalid(invalid) => Operand::Invalid(*invalid),
        }
    }
}
