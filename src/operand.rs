//! Classified call-site operands and the borrowed array view.

use std::marker::PhantomData;
use std::mem::align_of;
use std::ptr::NonNull;
use std::slice;

use crate::element::{Element, ElementType};
use crate::error::{Error, Result};
use crate::scalar::Scalar;

/// A borrowed view over caller-owned element storage.
///
/// Typed slices are only reachable through accessors that check the Rust
/// type against the view's element type.
pub struct ArrayView<'a> {
    element_type: ElementType,
    ptr: NonNull<u8>,
    byte_len: usize,
    writable: bool,
    _marker: PhantomData<&'a mut [u8]>,
}

impl<'a> ArrayView<'a> {
    /// Views a mutable slice as the default element type of `T`.
    pub fn from_slice<T: Element>(data: &'a mut [T]) -> Self {
        Self {
            element_type: T::DEFAULT_TYPE,
            ptr: NonNull::from(&mut *data).cast(),
            byte_len: std::mem::size_of_val(data),
            writable: true,
            _marker: PhantomData,
        }
    }

    /// Views a mutable slice as a specific element type of the same width and
    /// category, e.g. `i64` as `Long`.
    pub fn from_slice_as<T: Element>(element_type: ElementType, data: &'a mut [T]) -> Result<Self> {
        if !T::accepts(element_type) {
            return Err(Error::TypeMismatch);
        }
        let mut view = Self::from_slice(data);
        view.element_type = element_type;
        Ok(view)
    }

    /// Views a shared slice. The view can be read but not used as a
    /// destination.
    pub fn from_readonly<T: Element>(data: &'a [T]) -> Self {
        Self {
            element_type: T::DEFAULT_TYPE,
            ptr: NonNull::from(data).cast(),
            byte_len: std::mem::size_of_val(data),
            writable: false,
            _marker: PhantomData,
        }
    }

    /// # Safety
    ///
    /// `ptr` must be valid for reads of `byte_len` bytes for `'a`, and for
    /// writes as well when `writable` is set. No other reference may access
    /// the region mutably while the view is alive.
    pub unsafe fn from_raw_parts(
        element_type: ElementType,
        ptr: *mut u8,
        byte_len: usize,
        writable: bool,
    ) -> Self {
        let (ptr, byte_len) = match NonNull::new(ptr) {
            Some(ptr) => (ptr, byte_len),
            None => (NonNull::dangling(), 0),
        };
        Self {
            element_type,
            ptr,
            byte_len,
            writable,
            _marker: PhantomData,
        }
    }

    pub fn element_type(&self) -> ElementType {
        self.element_type
    }

    /// Whole elements in the view.
    pub fn len(&self) -> usize {
        self.element_type.element_count(self.byte_len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn byte_len(&self) -> usize {
        self.byte_len
    }

    pub fn is_writable(&self) -> bool {
        self.writable
    }

    fn check_access<T: Element>(&self, len: usize) -> Result<()> {
        if !T::accepts(self.element_type) {
            return Err(Error::TypeMismatch);
        }
        if len > self.len() {
            return Err(Error::LengthMismatch);
        }
        if len > 0 && self.ptr.as_ptr() as usize % align_of::<T>() != 0 {
            return Err(Error::ValueError("misaligned buffer"));
        }
        Ok(())
    }

    pub(crate) fn slice<T: Element>(&self, len: usize) -> Result<&[T]> {
        self.check_access::<T>(len)?;
        if len == 0 {
            return Ok(&[]);
        }
        // SAFETY: type, length and alignment were checked above, and the
        // view borrows the region for 'a.
        Ok(unsafe { slice::from_raw_parts(self.ptr.as_ptr() as *const T, len) })
    }

    pub(crate) fn slice_mut<T: Element>(&mut self, len: usize) -> Result<&mut [T]> {
        if !self.writable {
            return Err(Error::ValueError("destination array is read-only"));
        }
        self.check_access::<T>(len)?;
        if len == 0 {
            return Ok(&mut []);
        }
        // SAFETY: as in `slice`, plus the view is writable and borrowed
        // mutably for the lifetime of the returned slice.
        Ok(unsafe { slice::from_raw_parts_mut(self.ptr.as_ptr() as *mut T, len) })
    }

    /// Both views start at the same address.
    pub(crate) fn same_start(&self, other: &ArrayView<'_>) -> bool {
        self.ptr == other.ptr
    }

    pub(crate) fn overlaps(&self, other: &ArrayView<'_>) -> bool {
        let a = self.ptr.as_ptr() as usize;
        let b = other.ptr.as_ptr() as usize;
        self.byte_len > 0 && other.byte_len > 0 && a < b + other.byte_len && b < a + self.byte_len
    }
}

impl std::fmt::Debug for ArrayView<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArrayView")
            .field("element_type", &self.element_type)
            .field("len", &self.len())
            .field("writable", &self.writable)
            .finish()
    }
}

/// Why a call-site value could not be classified.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Invalid {
    /// Integral value outside both 64-bit ranges.
    Overflow,
    /// Buffer whose format tag is not one of the twelve element types.
    UnknownFormat,
    NotNumeric,
}

impl From<Invalid> for Error {
    fn from(value: Invalid) -> Self {
        match value {
            Invalid::Overflow => Error::Overflow,
            Invalid::UnknownFormat => Error::UnknownElementType,
            Invalid::NotNumeric => Error::TypeMismatch,
        }
    }
}

/// A classified call-site value.
#[derive(Debug)]
pub enum Operand<'a> {
    Array(ArrayView<'a>),
    Scalar(Scalar),
    Invalid(Invalid),
}

impl<'a> Operand<'a> {
    pub fn integer(value: i128) -> Self {
        Scalar::from_integer(value)
            .map(Operand::Scalar)
            .unwrap_or(Operand::Invalid(Invalid::Overflow))
    }

    pub fn is_array(&self) -> bool {
        matches!(self, Operand::Array(_))
    }

    pub(crate) fn validate(self) -> Result<Self> {
        match self {
            Operand::Invalid(invalid) => Err(invalid.into()),
            other => Ok(other),
        }
    }
}

impl<'a> From<ArrayView<'a>> for Operand<'a> {
    fn from(value: ArrayView<'a>) -> Self {
        Operand::Array(value)
    }
}

impl<'a, T: Element> From<&'a mut [T]> for Operand<'a> {
    fn from(value: &'a mut [T]) -> Self {
        Operand::Array(ArrayView::from_slice(value))
    }
}

impl<'a, T: Element, const N: usize> From<&'a mut [T; N]> for Operand<'a> {
    fn from(value: &'a mut [T; N]) -> Self {
        Operand::Array(ArrayView::from_slice(value.as_mut_slice()))
    }
}

impl<'a, T: Element> From<&'a mut Vec<T>> for Operand<'a> {
    fn from(value: &'a mut Vec<T>) -> Self {
        Operand::Array(ArrayView::from_slice(value.as_mut_slice()))
    }
}

impl From<Scalar> for Operand<'_> {
    fn from(value: Scalar) -> Self {
        Operand::Scalar(value)
    }
}

impl From<i64> for Operand<'_> {
    fn from(value: i64) -> Self {
        Operand::Scalar(Scalar::Int(value))
    }
}

impl From<i32> for Operand<'_> {
    fn from(value: i32) -> Self {
        Operand::Scalar(Scalar::Int(value as i64))
    }
}

impl From<u64> for Operand<'_> {
    fn from(value: u64) -> Self {
        Operand::Scalar(Scalar::from(value))
    }
}

impl From<f64> for Operand<'_> {
    fn from(value: f64) -> Self {
        Operand::Scalar(Scalar::Float(value))
    }
}
