//! Element-wise numeric operations over flat, fixed-width typed buffers.
//!
//! Every operation takes its operands as [`Operand`]s: typed array views or
//! numeric scalars. A call is resolved to one element type and length before
//! any kernel runs, so argument errors never leave a buffer half written.
//! Arithmetic errors found while a kernel runs stop it at the failing element.
//!
//! ```
//! use arrayfunc::{ops, BinaryOp, OpConfig};
//!
//! let mut data = [1i32, 2, 3];
//! let config = OpConfig::default();
//! ops::binary(BinaryOp::Add, (&mut data).into(), Some(10i64.into()), None, &config).unwrap();
//! assert_eq!(data, [11, 12, 13]);
//! ```

pub mod config;
pub mod element;
pub mod error;
mod kernels;
pub mod metrics;
pub mod operand;
pub mod ops;
pub mod range;
pub mod resolve;
pub mod scalar;
pub mod simd;

#[cfg(feature = "python")]
mod python;

pub use config::{Mode, OpConfig, OptionSet, Settings};
pub use element::{Category, Element, ElementType, FloatElement, IntElement};
pub use error::{Error, Result};
pub use operand::{ArrayView, Invalid, Operand};
pub use ops::{BinaryOp, CompareOp, Operation, PredicateOp, ReduceOp, UnaryOp};
pub use resolve::{ShapeDescriptor, ShapeTag};
pub use scalar::Scalar;

#[cfg(feature = "python")]
pub use python::init_test_module;
