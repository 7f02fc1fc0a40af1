//! Vector kernels for the float hot paths.
//!
//! A kernel is picked once per process from the detected capabilities and
//! cached. Vector kernels only ever process whole chunks. In checked mode a
//! kernel stops before storing a chunk with a non-finite lane and reports how
//! many elements it wrote. The scalar loop then resumes from that point and
//! reports the exact failing element.

use std::ptr;

mod cpu;
pub mod dispatch;

pub use cpu::{capabilities, SimdCapabilities};

use crate::config;
use crate::element::ElementType;
use crate::error::{Error, Result};
use crate::kernels::Input;

use self::dispatch::{LevelKernel, SimdLevel, SimdMode, VectorTable};

/// Binary operations with a vector kernel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum VectorOp {
    Add,
    Sub,
    Mul,
    Div,
}

/// Raw read side of a kernel operand.
#[derive(Clone, Copy)]
pub(crate) enum Lanes<T> {
    Ptr(*const T),
    Splat(T),
}

impl<T: Copy> Lanes<T> {
    fn of(input: &Input<'_, T>, dest: *mut T) -> Self {
        match input {
            Input::Dest => Lanes::Ptr(dest as *const T),
            Input::Borrowed(values) => Lanes::Ptr(values.as_ptr()),
            Input::Owned(values) => Lanes::Ptr(values.as_ptr()),
            Input::Scalar(value) => Lanes::Splat(*value),
        }
    }

    /// # Safety
    ///
    /// A `Ptr` must be valid for reads of `N` elements at `index`.
    #[inline(always)]
    unsafe fn load<const N: usize>(self, index: usize) -> [T; N] {
        match self {
            Lanes::Ptr(base) => ptr::read_unaligned(base.add(index) as *const [T; N]),
            Lanes::Splat(value) => [value; N],
        }
    }
}

type BinaryKernelF64 = unsafe fn(VectorOp, *mut f64, usize, Lanes<f64>, Lanes<f64>, bool) -> usize;
type BinaryKernelF32 = unsafe fn(VectorOp, *mut f32, usize, Lanes<f32>, Lanes<f32>, bool) -> usize;
type SumKernelF64 = unsafe fn(*const f64, usize) -> f64;
type SumKernelF32 = unsafe fn(*const f32, usize) -> f32;

unsafe fn scalar_binary_f64(
    _op: VectorOp,
    _out: *mut f64,
    _len: usize,
    _x: Lanes<f64>,
    _y: Lanes<f64>,
    _checked: bool,
) -> usize {
    0
}

unsafe fn scalar_binary_f32(
    _op: VectorOp,
    _out: *mut f32,
    _len: usize,
    _x: Lanes<f32>,
    _y: Lanes<f32>,
    _checked: bool,
) -> usize {
    0
}

unsafe fn scalar_sum_f64(data: *const f64, len: usize) -> f64 {
    std::slice::from_raw_parts(data, len).iter().sum()
}

unsafe fn scalar_sum_f32(data: *const f32, len: usize) -> f32 {
    std::slice::from_raw_parts(data, len).iter().sum()
}

#[cfg(target_arch = "x86_64")]
const BINARY_F64_LEVELS: &[LevelKernel<BinaryKernelF64>] = &[
    LevelKernel::new(SimdLevel::Avx2, x86::binary_f64),
    LevelKernel::new(SimdLevel::Sse41, portable::binary_f64),
];
#[cfg(target_arch = "x86_64")]
const BINARY_F32_LEVELS: &[LevelKernel<BinaryKernelF32>] = &[
    LevelKernel::new(SimdLevel::Avx2, x86::binary_f32),
    LevelKernel::new(SimdLevel::Sse41, portable::binary_f32),
];
#[cfg(target_arch = "x86_64")]
const SUM_F64_LEVELS: &[LevelKernel<SumKernelF64>] = &[
    LevelKernel::new(SimdLevel::Avx2, x86::sum_f64),
    LevelKernel::new(SimdLevel::Sse41, portable::sum_f64),
];
#[cfg(target_arch = "x86_64")]
const SUM_F32_LEVELS: &[LevelKernel<SumKernelF32>] = &[
    LevelKernel::new(SimdLevel::Avx2, x86::sum_f32),
    LevelKernel::new(SimdLevel::Sse41, portable::sum_f32),
];

#[cfg(target_arch = "aarch64")]
const BINARY_F64_LEVELS: &[LevelKernel<BinaryKernelF64>] =
    &[LevelKernel::new(SimdLevel::Neon, portable::binary_f64)];
#[cfg(target_arch = "aarch64")]
const BINARY_F32_LEVELS: &[LevelKernel<BinaryKernelF32>] =
    &[LevelKernel::new(SimdLevel::Neon, portable::binary_f32)];
#[cfg(target_arch = "aarch64")]
const SUM_F64_LEVELS: &[LevelKernel<SumKernelF64>] =
    &[LevelKernel::new(SimdLevel::Neon, portable::sum_f64)];
#[cfg(target_arch = "aarch64")]
const SUM_F32_LEVELS: &[LevelKernel<SumKernelF32>] =
    &[LevelKernel::new(SimdLevel::Neon, portable::sum_f32)];

#[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
const BINARY_F64_LEVELS: &[LevelKernel<BinaryKernelF64>] = &[];
#[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
const BINARY_F32_LEVELS: &[LevelKernel<BinaryKernelF32>] = &[];
#[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
const SUM_F64_LEVELS: &[LevelKernel<SumKernelF64>] = &[];
#[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
const SUM_F32_LEVELS: &[LevelKernel<SumKernelF32>] = &[];

static BINARY_F64: VectorTable<BinaryKernelF64> =
    VectorTable::new("binary_f64", scalar_binary_f64, BINARY_F64_LEVELS);
static BINARY_F32: VectorTable<BinaryKernelF32> =
    VectorTable::new("binary_f32", scalar_binary_f32, BINARY_F32_LEVELS);
static SUM_F64: VectorTable<SumKernelF64> =
    VectorTable::new("sum_f64", scalar_sum_f64, SUM_F64_LEVELS);
static SUM_F32: VectorTable<SumKernelF32> =
    VectorTable::new("sum_f32", scalar_sum_f32, SUM_F32_LEVELS);

fn select<F: Copy + Send + Sync + 'static>(table: &VectorTable<F>) -> Result<LevelKernel<F>> {
    let mode = dispatch::global_mode();
    let kernel = table.selected(mode, capabilities());
    if mode == SimdMode::Force && !kernel.level.is_vector() {
        return Err(Error::InvalidPlatformOperator);
    }
    Ok(kernel)
}

/// Whether a vector kernel should be attempted for a call of `len` elements.
pub(crate) fn eligible(element_type: ElementType, len: usize, nosimd: bool) -> bool {
    if nosimd {
        return false;
    }
    match dispatch::global_mode() {
        SimdMode::Disable => false,
        SimdMode::Force => true,
        SimdMode::Auto => config::settings()
            .vector_threshold(element_type)
            .admits(len),
    }
}

/// Result of a vector kernel pass.
#[derive(Clone, Copy, Debug)]
pub(crate) struct VectorRun {
    pub level: SimdLevel,
    /// Leading elements already written.
    pub processed: usize,
}

/// Float types with vector kernels.
pub(crate) trait Vectorized: Copy + Sized {
    fn vector_binary(
        op: VectorOp,
        dest: &mut [Self],
        x: &Input<'_, Self>,
        y: &Input<'_, Self>,
        checked: bool,
    ) -> Result<VectorRun>;

    fn vector_sum(data: &[Self]) -> Result<(Self, SimdLevel)>;
}

impl Vectorized for f64 {
    fn vector_binary(
        op: VectorOp,
        dest: &mut [f64],
        x: &Input<'_, f64>,
        y: &Input<'_, f64>,
        checked: bool,
    ) -> Result<VectorRun> {
        let selection = select(&BINARY_F64)?;
        let len = dest.len();
        let out = dest.as_mut_ptr();
        let (xs, ys) = (Lanes::of(x, out), Lanes::of(y, out));
        // SAFETY: every operand slice has `len` elements and the kernel was
        // selected for a supported level.
        let processed = unsafe { (selection.func)(op, out, len, xs, ys, checked) };
        Ok(VectorRun {
            level: selection.level,
            processed,
        })
    }

    fn vector_sum(data: &[f64]) -> Result<(f64, SimdLevel)> {
        let selection = select(&SUM_F64)?;
        // SAFETY: as above.
        let total = unsafe { (selection.func)(data.as_ptr(), data.len()) };
        Ok((total, selection.level))
    }
}

impl Vectorized for f32 {
    fn vector_binary(
        op: VectorOp,
        dest: &mut [f32],
        x: &Input<'_, f32>,
        y: &Input<'_, f32>,
        checked: bool,
    ) -> Result<VectorRun> {
        let selection = select(&BINARY_F32)?;
        let len = dest.len();
        let out = dest.as_mut_ptr();
        let (xs, ys) = (Lanes::of(x, out), Lanes::of(y, out));
        // SAFETY: as for f64.
        let processed = unsafe { (selection.func)(op, out, len, xs, ys, checked) };
        Ok(VectorRun {
            level: selection.level,
            processed,
        })
    }

    fn vector_sum(data: &[f32]) -> Result<(f32, SimdLevel)> {
        let selection = select(&SUM_F32)?;
        // SAFETY: as for f64.
        let total = unsafe { (selection.func)(data.as_ptr(), data.len()) };
        Ok((total, selection.level))
    }
}

/// Names and levels of every kernel selected so far, plus the detected
/// capabilities.
pub fn snapshot() -> (SimdCapabilities, Vec<(&'static str, SimdLevel)>) {
    (*capabilities(), dispatch::selections())
}

#[cfg(any(target_arch = "x86_64", target_arch = "aarch64"))]
mod portable {
    use wide::{f32x8, f64x4};

    use super::{Lanes, VectorOp};

    pub unsafe fn binary_f64(
        op: VectorOp,
        out: *mut f64,
        len: usize,
        x: Lanes<f64>,
        y: Lanes<f64>,
        checked: bool,
    ) -> usize {
        const LANES: usize = 4;
        let mut i = 0usize;
        while i + LANES <= len {
            let a = f64x4::from(x.load::<LANES>(i));
            let b = f64x4::from(y.load::<LANES>(i));
            let r = match op {
                VectorOp::Add => a + b,
                VectorOp::Sub => a - b,
                VectorOp::Mul => a * b,
                VectorOp::Div => a / b,
            };
            let values: [f64; LANES] = r.into();
            if checked && !values.iter().all(|v| v.is_finite()) {
                break;
            }
            std::ptr::copy_nonoverlapping(values.as_ptr(), out.add(i), LANES);
            i += LANES;
        }
        i
    }

    pub unsafe fn binary_f32(
        op: VectorOp,
        out: *mut f32,
        len: usize,
        x: Lanes<f32>,
        y: Lanes<f32>,
        checked: bool,
    ) -> usize {
        const LANES: usize = 8;
        let mut i = 0usize;
        while i + LANES <= len {
            let a = f32x8::from(x.load::<LANES>(i));
            let b = f32x8::from(y.load::<LANES>(i));
            let r = match op {
                VectorOp::Add => a + b,
                VectorOp::Sub => a - b,
                VectorOp::Mul => a * b,
                VectorOp::Div => a / b,
            };
            let values: [f32; LANES] = r.into();
            if checked && !values.iter().all(|v| v.is_finite()) {
                break;
            }
            std::ptr::copy_nonoverlapping(values.as_ptr(), out.add(i), LANES);
            i += LANES;
        }
        i
    }

    pub unsafe fn sum_f64(data: *const f64, len: usize) -> f64 {
        let values = std::slice::from_raw_parts(data, len);
        let mut acc = f64x4::splat(0.0);
        let mut chunks = values.chunks_exact(4);
        for chunk in chunks.by_ref() {
            let lanes: [f64; 4] = [chunk[0], chunk[1], chunk[2], chunk[3]];
            acc = acc + f64x4::from(lanes);
        }
        let acc: [f64; 4] = acc.into();
        let mut total: f64 = acc.iter().sum();
        for &value in chunks.remainder() {
            total += value;
        }
        total
    }

    pub unsafe fn sum_f32(data: *const f32, len: usize) -> f32 {
        let values = std::slice::from_raw_parts(data, len);
        let mut acc = f32x8::splat(0.0);
        let mut chunks = values.chunks_exact(8);
        for chunk in chunks.by_ref() {
            let mut lanes = [0.0f32; 8];
            lanes.copy_from_slice(chunk);
            acc = acc + f32x8::from(lanes);
        }
        let acc: [f32; 8] = acc.into();
        let mut total: f32 = acc.iter().sum();
        for &value in chunks.remainder() {
            total += value;
        }
        total
    }
}

#[cfg(target_arch = "x86_64")]
mod x86 {
    use std::arch::x86_64::*;

    use super::{Lanes, VectorOp};

    const LANES_F64: usize = 4;
    const LANES_F32: usize = 8;

    #[target_feature(enable = "avx2")]
    pub unsafe fn binary_f64(
        op: VectorOp,
        out: *mut f64,
        len: usize,
        x: Lanes<f64>,
        y: Lanes<f64>,
        checked: bool,
    ) -> usize {
        let mut i = 0usize;
        while i + LANES_F64 <= len {
            let a = match x {
                Lanes::Ptr(p) => _mm256_loadu_pd(p.add(i)),
                Lanes::Splat(v) => _mm256_set1_pd(v),
            };
            let b = match y {
                Lanes::Ptr(p) => _mm256_loadu_pd(p.add(i)),
                Lanes::Splat(v) => _mm256_set1_pd(v),
            };
            let r = match op {
                VectorOp::Add => _mm256_add_pd(a, b),
                VectorOp::Sub => _mm256_sub_pd(a, b),
                VectorOp::Mul => _mm256_mul_pd(a, b),
                VectorOp::Div => _mm256_div_pd(a, b),
            };
            if checked {
                // r - r is NaN exactly in the non-finite lanes.
                let d = _mm256_sub_pd(r, r);
                if _mm256_movemask_pd(_mm256_cmp_pd::<_CMP_ORD_Q>(d, d)) != 0b1111 {
                    break;
                }
            }
            _mm256_storeu_pd(out.add(i), r);
            i += LANES_F64;
        }
        i
    }

    #[target_feature(enable = "avx2")]
    pub unsafe fn binary_f32(
        op: VectorOp,
        out: *mut f32,
        len: usize,
        x: Lanes<f32>,
        y: Lanes<f32>,
        checked: bool,
    ) -> usize {
        let mut i = 0usize;
        while i + LANES_F32 <= len {
            let a = match x {
                Lanes::Ptr(p) => _mm256_loadu_ps(p.add(i)),
                Lanes::Splat(v) => _mm256_set1_ps(v),
            };
            let b = match y {
                Lanes::Ptr(p) => _mm256_loadu_ps(p.add(i)),
                Lanes::Splat(v) => _mm256_set1_ps(v),
            };
            let r = match op {
                VectorOp::Add => _mm256_add_ps(a, b),
                VectorOp::Sub => _mm256_sub_ps(a, b),
                VectorOp::Mul => _mm256_mul_ps(a, b),
                VectorOp::Div => _mm256_div_ps(a, b),
            };
            if checked {
                let d = _mm256_sub_ps(r, r);
                if _mm256_movemask_ps(_mm256_cmp_ps::<_CMP_ORD_Q>(d, d)) != 0xff {
                    break;
                }
            }
            _mm256_storeu_ps(out.add(i), r);
            i += LANES_F32;
        }
        i
    }

    #[target_feature(enable = "avx2")]
    pub unsafe fn sum_f64(data: *const f64, len: usize) -> f64 {
        let mut acc = _mm256_setzero_pd();
        let mut i = 0usize;
        while i + LANES_F64 <= len {
            acc = _mm256_add_pd(acc, _mm256_loadu_pd(data.add(i)));
            i += LANES_F64;
        }
        let mut lanes = [0.0f64; LANES_F64];
        _mm256_storeu_pd(lanes.as_mut_ptr(), acc);
        let mut total: f64 = lanes.iter().sum();
        while i < len {
            total += *data.add(i);
            i += 1;
        }
        total
    }

    #[target_feature(enable = "avx2")]
    pub unsafe fn sum_f32(data: *const f32, len: usize) -> f32 {
        let mut acc = _mm256_setzero_ps();
        let mut i = 0usize;
        while i + LANES_F32 <= len {
            acc = _mm256_add_ps(acc, _mm256_loadu_ps(data.add(i)));
            i += LANES_F32;
        }
        let mut lanes = [0.0f32; LANES_F32];
        _mm256_storeu_ps(lanes.as_mut_ptr(), acc);
        let mut total: f32 = lanes.iter().sum();
        while i < len {
            total += *data.add(i);
            i += 1;
        }
        total
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vector_and_scalar_paths_agree_on_exact_values() {
        let lhs: Vec<f64> = (0..37).map(|v| v as f64).collect();
        let mut dest = vec![0.5f64; 37];
        let x = Input::Borrowed(&lhs[..]);
        let y = Input::Dest;
        let run = f64::vector_binary(VectorOp::Add, &mut dest, &x, &y, true).unwrap();
        assert!(run.processed <= 37);
        for (i, value) in dest.iter().enumerate().take(run.processed) {
            assert_eq!(*value, i as f64 + 0.5);
        }
        for value in &dest[run.processed..] {
            assert_eq!(*value, 0.5);
        }
    }

    #[test]
    fn checked_pass_stops_before_a_non_finite_chunk() {
        let mut dest = vec![1.0f32; 64];
        dest[20] = f32::MAX;
        let x = Input::Dest;
        let y = Input::Scalar(f32::MAX);
        let run = f32::vector_binary(VectorOp::Add, &mut dest, &x, &y, true).unwrap();
        assert!(run.processed <= 20);
        assert_eq!(dest[20], f32::MAX);
    }

    #[test]
    fn vector_sum_matches_integral_totals() {
        let data: Vec<f64> = (1..=100).map(|v| v as f64).collect();
        let (total, _) = f64::vector_sum(&data).unwrap();
        assert_eq!(total, 5050.0);
        let data = vec![0.25f32; 33];
        let (total, _) = f32::vector_sum(&data).unwrap();
        assert_eq!(total, 8.25);
    }
}
