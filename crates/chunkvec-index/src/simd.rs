//! Vector kernels for normalization and similarity scoring.
//!
//! Every kernel implements [`VectorKernel`]: a lane-width main loop followed by
//! a scalar tail. The kernel used by the loader and the search engine is
//! [`ActiveKernel`], fixed at build time from the target's vector extensions:
//!
//! | target                          | kernel          |
//! |---------------------------------|-----------------|
//! | x86_64 + `avx512f`              | `Lanes16Kernel` |
//! | x86_64 + `avx2`                 | `Lanes8Kernel`  |
//! | other x86_64 (SSE2), aarch64 NEON | `Lanes4Kernel`  |
//! | anything else, or `scalar-kernel` | `ScalarKernel`  |
//!
//! There is no run-time CPU probing. All kernels compile on every target
//! (`wide` lowers its lanes to whatever the target offers), so each one can be
//! tested anywhere.
//!
//! Operands are anything implementing [`F32Lanes`]: plain `[f32]` slices, or
//! [`F32Bytes`]/[`F32BytesMut`] views over native-endian f32 data stored at
//! arbitrary alignment inside a corpus arena.

use std::array;

use chunkvec_core::{SearchError, SearchResult};
use wide::{f32x4, f32x8};

/// Newton-Raphson refinements applied to every reciprocal-square-root estimate.
pub const NEWTON_RAPHSON_STEPS: usize = 2;

const F32_BYTES: usize = size_of::<f32>();

// ─── Operand views ──────────────────────────────────────────────────────────

/// Read access to a run of f32 values.
pub trait F32Lanes {
    /// Number of f32 values.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Value at `index`. Panics when out of range.
    fn get(&self, index: usize) -> f32;

    /// `N` consecutive values starting at `start`.
    fn chunk<const N: usize>(&self, start: usize) -> [f32; N] {
        array::from_fn(|offset| self.get(start + offset))
    }
}

/// Write access to a run of f32 values.
pub trait F32LanesMut: F32Lanes {
    fn set(&mut self, index: usize, value: f32);

    fn set_chunk<const N: usize>(&mut self, start: usize, values: [f32; N]) {
        for (offset, value) in values.into_iter().enumerate() {
            self.set(start + offset, value);
        }
    }
}

impl F32Lanes for [f32] {
    fn len(&self) -> usize {
        <[f32]>::len(self)
    }

    fn get(&self, index: usize) -> f32 {
        self[index]
    }

    fn chunk<const N: usize>(&self, start: usize) -> [f32; N] {
        array::from_fn(|offset| self[start + offset])
    }
}

impl F32LanesMut for [f32] {
    fn set(&mut self, index: usize, value: f32) {
        self[index] = value;
    }

    fn set_chunk<const N: usize>(&mut self, start: usize, values: [f32; N]) {
        self[start..start + N].copy_from_slice(&values);
    }
}

/// Native-endian f32 values stored as raw bytes, with no alignment requirement.
#[derive(Debug, Clone, Copy)]
pub struct F32Bytes<'a> {
    bytes: &'a [u8],
}

impl<'a> F32Bytes<'a> {
    /// Returns `None` when `bytes.len()` is not a multiple of four.
    #[must_use]
    pub const fn new(bytes: &'a [u8]) -> Option<Self> {
        if bytes.len() % F32_BYTES == 0 {
            Some(Self { bytes })
        } else {
            None
        }
    }

    /// Views the longest prefix of `bytes` made of whole f32 values.
    #[must_use]
    pub const fn truncated(bytes: &'a [u8]) -> Self {
        let whole = bytes.len() - bytes.len() % F32_BYTES;
        Self {
            bytes: bytes.split_at(whole).0,
        }
    }

    #[must_use]
    pub const fn as_bytes(&self) -> &'a [u8] {
        self.bytes
    }

    /// Decodes every value into an owned vector.
    #[must_use]
    pub fn to_vec(&self) -> Vec<f32> {
        self.bytes
            .chunks_exact(F32_BYTES)
            .map(|b| f32::from_ne_bytes([b[0], b[1], b[2], b[3]]))
            .collect()
    }
}

impl F32Lanes for F32Bytes<'_> {
    fn len(&self) -> usize {
        self.bytes.len() / F32_BYTES
    }

    fn get(&self, index: usize) -> f32 {
        read_ne_f32(self.bytes, index)
    }
}

/// Mutable counterpart of [`F32Bytes`], used to normalize embeddings in place.
#[derive(Debug)]
pub struct F32BytesMut<'a> {
    bytes: &'a mut [u8],
}

impl<'a> F32BytesMut<'a> {
    /// Returns `None` when `bytes.len()` is not a multiple of four.
    #[must_use]
    pub fn new(bytes: &'a mut [u8]) -> Option<Self> {
        if bytes.len() % F32_BYTES == 0 {
            Some(Self { bytes })
        } else {
            None
        }
    }

    /// Views the longest prefix of `bytes` made of whole f32 values.
    #[must_use]
    pub fn truncated(bytes: &'a mut [u8]) -> Self {
        let whole = bytes.len() - bytes.len() % F32_BYTES;
        Self {
            bytes: &mut bytes[..whole],
        }
    }
}

impl F32Lanes for F32BytesMut<'_> {
    fn len(&self) -> usize {
        self.bytes.len() / F32_BYTES
    }

    fn get(&self, index: usize) -> f32 {
        read_ne_f32(self.bytes, index)
    }
}

impl F32LanesMut for F32BytesMut<'_> {
    fn set(&mut self, index: usize, value: f32) {
        let at = index * F32_BYTES;
        self.bytes[at..at + F32_BYTES].copy_from_slice(&value.to_ne_bytes());
    }
}

#[inline]
fn read_ne_f32(bytes: &[u8], index: usize) -> f32 {
    let at = index * F32_BYTES;
    let b = &bytes[at..at + F32_BYTES];
    f32::from_ne_bytes([b[0], b[1], b[2], b[3]])
}

// ─── Kernel interface ───────────────────────────────────────────────────────

/// Vector width a kernel processes per step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KernelLevel {
    Scalar,
    Lanes4,
    Lanes8,
    Lanes16,
}

impl KernelLevel {
    #[must_use]
    pub const fn lanes(self) -> usize {
        match self {
            Self::Scalar => 1,
            Self::Lanes4 => 4,
            Self::Lanes8 => 8,
            Self::Lanes16 => 16,
        }
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Scalar => "scalar",
            Self::Lanes4 => "lanes4",
            Self::Lanes8 => "lanes8",
            Self::Lanes16 => "lanes16",
        }
    }
}

/// Normalization and scoring primitives, one implementation per lane width.
///
/// Implementations are stateless; all methods are associated functions so
/// the kernel is chosen by type, at compile time.
pub trait VectorKernel {
    const LEVEL: KernelLevel;

    /// Sum of squared components.
    fn sum_of_squares<V: F32Lanes + ?Sized>(v: &V) -> f32;

    /// Approximate `1 / sqrt(sum)`: a fast estimate refined by
    /// [`NEWTON_RAPHSON_STEPS`] Newton-Raphson iterations. Relative error is
    /// well below 2e-4 for normal, positive `sum`; undefined otherwise.
    fn reciprocal_sqrt(sum: f32) -> f32;

    /// Multiplies every component by `factor` in place.
    fn scale<V: F32LanesMut + ?Sized>(v: &mut V, factor: f32);

    /// Dot product over the first `min(x.len(), y.len())` components.
    ///
    /// Products are accumulated in single precision across lanes, widened to
    /// f64 at the horizontal reduction; the tail is accumulated in f64.
    fn dot_product<X: F32Lanes + ?Sized, Y: F32Lanes + ?Sized>(x: &X, y: &Y) -> f64;

    /// Scales `v` to unit Euclidean length in place.
    ///
    /// When the single-precision sum of squares is not a normal f32 (it
    /// underflowed, overflowed, or is zero) the norm is recomputed in f64 and
    /// applied exactly. All-zero vectors, and vectors holding NaN or infinite
    /// components, are left unchanged.
    fn normalize<V: F32LanesMut + ?Sized>(v: &mut V) {
        let sum = Self::sum_of_squares(v);
        if sum.is_normal() {
            Self::scale(v, Self::reciprocal_sqrt(sum));
        } else {
            normalize_extended_range(v);
        }
    }
}

/// Normalizes through an f64 sum of squares, for vectors whose f32 sum of
/// squares leaves the normal range.
#[allow(clippy::cast_possible_truncation)]
fn normalize_extended_range<V: F32LanesMut + ?Sized>(v: &mut V) {
    let sum: f64 = (0..v.len())
        .map(|i| f64::from(v.get(i)) * f64::from(v.get(i)))
        .sum();
    if sum <= 0.0 || !sum.is_finite() {
        return;
    }
    let factor = sum.sqrt().recip();
    for i in 0..v.len() {
        let value = f64::from(v.get(i));
        v.set(i, (value * factor) as f32);
    }
}

// ─── Scalar fallback ────────────────────────────────────────────────────────

/// One value per step; the rsqrt estimate comes from the exponent bit trick.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScalarKernel;

impl VectorKernel for ScalarKernel {
    const LEVEL: KernelLevel = KernelLevel::Scalar;

    fn sum_of_squares<V: F32Lanes + ?Sized>(v: &V) -> f32 {
        (0..v.len()).map(|i| v.get(i) * v.get(i)).sum()
    }

    fn reciprocal_sqrt(sum: f32) -> f32 {
        let mut y = f32::from_bits(0x5f37_5a86_u32.wrapping_sub(sum.to_bits() >> 1));
        let half_sum = 0.5 * sum;
        for _ in 0..NEWTON_RAPHSON_STEPS {
            y *= 1.5 - half_sum * y * y;
        }
        y
    }

    fn scale<V: F32LanesMut + ?Sized>(v: &mut V, factor: f32) {
        for i in 0..v.len() {
            let value = v.get(i);
            v.set(i, value * factor);
        }
    }

    fn dot_product<X: F32Lanes + ?Sized, Y: F32Lanes + ?Sized>(x: &X, y: &Y) -> f64 {
        debug_assert_eq!(x.len(), y.len(), "vectors must have same dimension");
        let dim = x.len().min(y.len());
        (0..dim)
            .map(|i| f64::from(x.get(i)) * f64::from(y.get(i)))
            .sum()
    }
}

// ─── 4 lanes ────────────────────────────────────────────────────────────────

/// Four f32 per step (`f32x4`: SSE on x86_64, NEON on aarch64).
#[derive(Debug, Clone, Copy, Default)]
pub struct Lanes4Kernel;

impl VectorKernel for Lanes4Kernel {
    const LEVEL: KernelLevel = KernelLevel::Lanes4;

    fn sum_of_squares<V: F32Lanes + ?Sized>(v: &V) -> f32 {
        let len = v.len();
        let main = len - len % 4;
        let mut acc = f32x4::splat(0.0);
        for i in (0..main).step_by(4) {
            let x = f32x4::from(v.chunk::<4>(i));
            acc = x.mul_add(x, acc);
        }
        let mut sum = acc.reduce_add();
        for i in main..len {
            sum += v.get(i) * v.get(i);
        }
        sum
    }

    fn reciprocal_sqrt(sum: f32) -> f32 {
        let s = f32x4::splat(sum);
        let half = f32x4::splat(0.5);
        let three_halves = f32x4::splat(1.5);
        let mut y = s.recip_sqrt();
        for _ in 0..NEWTON_RAPHSON_STEPS {
            y = y * (three_halves - half * s * y * y);
        }
        y.to_array()[0]
    }

    fn scale<V: F32LanesMut + ?Sized>(v: &mut V, factor: f32) {
        let len = v.len();
        let main = len - len % 4;
        let factor4 = f32x4::splat(factor);
        for i in (0..main).step_by(4) {
            let x = f32x4::from(v.chunk::<4>(i));
            v.set_chunk(i, (x * factor4).to_array());
        }
        for i in main..len {
            let value = v.get(i);
            v.set(i, value * factor);
        }
    }

    fn dot_product<X: F32Lanes + ?Sized, Y: F32Lanes + ?Sized>(x: &X, y: &Y) -> f64 {
        debug_assert_eq!(x.len(), y.len(), "vectors must have same dimension");
        let dim = x.len().min(y.len());
        let main = dim - dim % 4;
        let mut acc = f32x4::splat(0.0);
        for i in (0..main).step_by(4) {
            let a = f32x4::from(x.chunk::<4>(i));
            let b = f32x4::from(y.chunk::<4>(i));
            acc = a.mul_add(b, acc);
        }
        let mut result = f64::from(acc.reduce_add());
        for i in main..dim {
            result += f64::from(x.get(i)) * f64::from(y.get(i));
        }
        result
    }
}

// ─── 8 lanes ────────────────────────────────────────────────────────────────

/// Eight f32 per step (`f32x8`: one AVX register, or two SSE/NEON halves).
#[derive(Debug, Clone, Copy, Default)]
pub struct Lanes8Kernel;

impl VectorKernel for Lanes8Kernel {
    const LEVEL: KernelLevel = KernelLevel::Lanes8;

    fn sum_of_squares<V: F32Lanes + ?Sized>(v: &V) -> f32 {
        let len = v.len();
        let main = len - len % 8;
        let mut acc = f32x8::splat(0.0);
        for i in (0..main).step_by(8) {
            let x = f32x8::from(v.chunk::<8>(i));
            acc = x.mul_add(x, acc);
        }
        let mut sum = acc.reduce_add();
        for i in main..len {
            sum += v.get(i) * v.get(i);
        }
        sum
    }

    fn reciprocal_sqrt(sum: f32) -> f32 {
        recip_sqrt_f32x8(sum)
    }

    fn scale<V: F32LanesMut + ?Sized>(v: &mut V, factor: f32) {
        let len = v.len();
        let main = len - len % 8;
        let factor8 = f32x8::splat(factor);
        for i in (0..main).step_by(8) {
            let x = f32x8::from(v.chunk::<8>(i));
            v.set_chunk(i, (x * factor8).to_array());
        }
        for i in main..len {
            let value = v.get(i);
            v.set(i, value * factor);
        }
    }

    fn dot_product<X: F32Lanes + ?Sized, Y: F32Lanes + ?Sized>(x: &X, y: &Y) -> f64 {
        debug_assert_eq!(x.len(), y.len(), "vectors must have same dimension");
        let dim = x.len().min(y.len());
        let main = dim - dim % 8;
        let mut acc = f32x8::splat(0.0);
        for i in (0..main).step_by(8) {
            let a = f32x8::from(x.chunk::<8>(i));
            let b = f32x8::from(y.chunk::<8>(i));
            acc = a.mul_add(b, acc);
        }
        let mut result = f64::from(acc.reduce_add());
        for i in main..dim {
            result += f64::from(x.get(i)) * f64::from(y.get(i));
        }
        result
    }
}

fn recip_sqrt_f32x8(sum: f32) -> f32 {
    let s = f32x8::splat(sum);
    let half = f32x8::splat(0.5);
    let three_halves = f32x8::splat(1.5);
    let mut y = s.recip_sqrt();
    for _ in 0..NEWTON_RAPHSON_STEPS {
        y = y * (three_halves - half * s * y * y);
    }
    y.to_array()[0]
}

// ─── 16 lanes ───────────────────────────────────────────────────────────────

/// Sixteen f32 per step: one AVX-512 register when the build enables
/// `avx512f`, otherwise a pair of `f32x8` registers.
#[derive(Debug, Clone, Copy, Default)]
pub struct Lanes16Kernel;

#[cfg(not(all(target_arch = "x86_64", target_feature = "avx512f")))]
impl VectorKernel for Lanes16Kernel {
    const LEVEL: KernelLevel = KernelLevel::Lanes16;

    fn sum_of_squares<V: F32Lanes + ?Sized>(v: &V) -> f32 {
        let len = v.len();
        let main = len - len % 16;
        let mut acc_lo = f32x8::splat(0.0);
        let mut acc_hi = f32x8::splat(0.0);
        for i in (0..main).step_by(16) {
            let lo = f32x8::from(v.chunk::<8>(i));
            let hi = f32x8::from(v.chunk::<8>(i + 8));
            acc_lo = lo.mul_add(lo, acc_lo);
            acc_hi = hi.mul_add(hi, acc_hi);
        }
        let mut sum = (acc_lo + acc_hi).reduce_add();
        for i in main..len {
            sum += v.get(i) * v.get(i);
        }
        sum
    }

    fn reciprocal_sqrt(sum: f32) -> f32 {
        recip_sqrt_f32x8(sum)
    }

    fn scale<V: F32LanesMut + ?Sized>(v: &mut V, factor: f32) {
        let len = v.len();
        let main = len - len % 16;
        let factor8 = f32x8::splat(factor);
        for i in (0..main).step_by(16) {
            let lo = f32x8::from(v.chunk::<8>(i));
            let hi = f32x8::from(v.chunk::<8>(i + 8));
            v.set_chunk(i, (lo * factor8).to_array());
            v.set_chunk(i + 8, (hi * factor8).to_array());
        }
        for i in main..len {
            let value = v.get(i);
            v.set(i, value * factor);
        }
    }

    fn dot_product<X: F32Lanes + ?Sized, Y: F32Lanes + ?Sized>(x: &X, y: &Y) -> f64 {
        debug_assert_eq!(x.len(), y.len(), "vectors must have same dimension");
        let dim = x.len().min(y.len());
        let main = dim - dim % 16;
        let mut acc_lo = f32x8::splat(0.0);
        let mut acc_hi = f32x8::splat(0.0);
        for i in (0..main).step_by(16) {
            let a_lo = f32x8::from(x.chunk::<8>(i));
            let b_lo = f32x8::from(y.chunk::<8>(i));
            let a_hi = f32x8::from(x.chunk::<8>(i + 8));
            let b_hi = f32x8::from(y.chunk::<8>(i + 8));
            acc_lo = a_lo.mul_add(b_lo, acc_lo);
            acc_hi = a_hi.mul_add(b_hi, acc_hi);
        }
        let mut result = f64::from((acc_lo + acc_hi).reduce_add());
        for i in main..dim {
            result += f64::from(x.get(i)) * f64::from(y.get(i));
        }
        result
    }
}

#[cfg(all(target_arch = "x86_64", target_feature = "avx512f"))]
impl VectorKernel for Lanes16Kernel {
    const LEVEL: KernelLevel = KernelLevel::Lanes16;

    fn sum_of_squares<V: F32Lanes + ?Sized>(v: &V) -> f32 {
        avx512::sum_of_squares(v)
    }

    fn reciprocal_sqrt(sum: f32) -> f32 {
        avx512::reciprocal_sqrt(sum)
    }

    fn scale<V: F32LanesMut + ?Sized>(v: &mut V, factor: f32) {
        avx512::scale(v, factor);
    }

    fn dot_product<X: F32Lanes + ?Sized, Y: F32Lanes + ?Sized>(x: &X, y: &Y) -> f64 {
        debug_assert_eq!(x.len(), y.len(), "vectors must have same dimension");
        avx512::dot_product(x, y)
    }
}

#[cfg(all(target_arch = "x86_64", target_feature = "avx512f"))]
mod avx512 {
    use std::arch::x86_64::{
        __m512, _mm512_fmadd_ps, _mm512_loadu_ps, _mm512_mul_ps, _mm512_reduce_add_ps,
        _mm512_rsqrt14_ps, _mm512_set1_ps, _mm512_setzero_ps, _mm512_storeu_ps, _mm512_sub_ps,
    };

    use super::{F32Lanes, F32LanesMut, NEWTON_RAPHSON_STEPS};

    #[inline]
    fn load<V: F32Lanes + ?Sized>(v: &V, start: usize) -> __m512 {
        let values = v.chunk::<16>(start);
        // SAFETY: `values` holds 16 initialized f32; avx512f is enabled for the
        // whole build, and the load is unaligned.
        unsafe { _mm512_loadu_ps(values.as_ptr()) }
    }

    #[inline]
    fn store(values: __m512) -> [f32; 16] {
        let mut out = [0.0_f32; 16];
        // SAFETY: `out` has room for 16 f32; the store is unaligned.
        unsafe { _mm512_storeu_ps(out.as_mut_ptr(), values) };
        out
    }

    pub(super) fn sum_of_squares<V: F32Lanes + ?Sized>(v: &V) -> f32 {
        let len = v.len();
        let main = len - len % 16;
        let mut acc = _mm512_setzero_ps();
        for i in (0..main).step_by(16) {
            let x = load(v, i);
            acc = _mm512_fmadd_ps(x, x, acc);
        }
        let mut sum = _mm512_reduce_add_ps(acc);
        for i in main..len {
            sum += v.get(i) * v.get(i);
        }
        sum
    }

    pub(super) fn reciprocal_sqrt(sum: f32) -> f32 {
        let s = _mm512_set1_ps(sum);
        let half = _mm512_set1_ps(0.5);
        let three_halves = _mm512_set1_ps(1.5);
        let mut y = _mm512_rsqrt14_ps(s);
        for _ in 0..NEWTON_RAPHSON_STEPS {
            let half_s_yy = _mm512_mul_ps(half, _mm512_mul_ps(s, _mm512_mul_ps(y, y)));
            y = _mm512_mul_ps(y, _mm512_sub_ps(three_halves, half_s_yy));
        }
        store(y)[0]
    }

    pub(super) fn scale<V: F32LanesMut + ?Sized>(v: &mut V, factor: f32) {
        let len = v.len();
        let main = len - len % 16;
        let factor16 = _mm512_set1_ps(factor);
        for i in (0..main).step_by(16) {
            let scaled = _mm512_mul_ps(load(v, i), factor16);
            v.set_chunk(i, store(scaled));
        }
        for i in main..len {
            let value = v.get(i);
            v.set(i, value * factor);
        }
    }

    pub(super) fn dot_product<X: F32Lanes + ?Sized, Y: F32Lanes + ?Sized>(x: &X, y: &Y) -> f64 {
        let dim = x.len().min(y.len());
        let main = dim - dim % 16;
        let mut acc = _mm512_setzero_ps();
        for i in (0..main).step_by(16) {
            acc = _mm512_fmadd_ps(load(x, i), load(y, i), acc);
        }
        let mut result = f64::from(_mm512_reduce_add_ps(acc));
        for i in main..dim {
            result += f64::from(x.get(i)) * f64::from(y.get(i));
        }
        result
    }
}

// ─── Build-time dispatch ────────────────────────────────────────────────────

#[cfg(feature = "scalar-kernel")]
pub type ActiveKernel = ScalarKernel;

#[cfg(all(
    not(feature = "scalar-kernel"),
    target_arch = "x86_64",
    target_feature = "avx512f"
))]
pub type ActiveKernel = Lanes16Kernel;

#[cfg(all(
    not(feature = "scalar-kernel"),
    target_arch = "x86_64",
    target_feature = "avx2",
    not(target_feature = "avx512f")
))]
pub type ActiveKernel = Lanes8Kernel;

#[cfg(all(
    not(feature = "scalar-kernel"),
    any(
        all(
            target_arch = "x86_64",
            not(target_feature = "avx2"),
            not(target_feature = "avx512f")
        ),
        all(target_arch = "aarch64", target_feature = "neon")
    )
))]
pub type ActiveKernel = Lanes4Kernel;

#[cfg(all(
    not(feature = "scalar-kernel"),
    not(target_arch = "x86_64"),
    not(all(target_arch = "aarch64", target_feature = "neon"))
))]
pub type ActiveKernel = ScalarKernel;

/// Lane width of [`ActiveKernel`].
pub const ACTIVE_LEVEL: KernelLevel = ActiveKernel::LEVEL;

// ─── Slice-level entry points ───────────────────────────────────────────────

/// Normalizes `v` to unit length in place with [`ActiveKernel`].
///
/// All-zero vectors are left unchanged.
pub fn normalize(v: &mut [f32]) {
    ActiveKernel::normalize(v);
}

/// Returns a unit-length copy of `v` (all-zero input yields all zeros).
#[must_use]
pub fn normalized(v: &[f32]) -> Vec<f32> {
    let mut out = v.to_vec();
    normalize(&mut out);
    out
}

/// Euclidean norm of `v`.
#[must_use]
pub fn l2_norm(v: &[f32]) -> f32 {
    ActiveKernel::sum_of_squares(v).sqrt()
}

/// Dot product of two equal-length vectors with [`ActiveKernel`].
///
/// # Errors
///
/// Returns `SearchError::DimensionMismatch` when slice lengths differ.
pub fn dot_product(x: &[f32], y: &[f32]) -> SearchResult<f64> {
    ensure_same_len(x.len(), y.len())?;
    Ok(ActiveKernel::dot_product(x, y))
}

/// Exact cosine similarity, computing the dot product and both norms in one
/// pass. Returns 0.0 when either vector has zero norm.
///
/// Independent of the load-time normalization invariant; search does not use
/// it.
///
/// # Errors
///
/// Returns `SearchError::DimensionMismatch` when slice lengths differ.
#[allow(clippy::float_cmp)]
pub fn cosine_similarity(x: &[f32], y: &[f32]) -> SearchResult<f64> {
    ensure_same_len(x.len(), y.len())?;

    let mut sum_xy = f32x8::splat(0.0);
    let mut sum_xx = f32x8::splat(0.0);
    let mut sum_yy = f32x8::splat(0.0);
    let mut x_chunks = x.chunks_exact(8);
    let mut y_chunks = y.chunks_exact(8);

    for (x_chunk, y_chunk) in x_chunks.by_ref().zip(y_chunks.by_ref()) {
        let a = f32x8::from(x_chunk.chunk::<8>(0));
        let b = f32x8::from(y_chunk.chunk::<8>(0));
        sum_xy = a.mul_add(b, sum_xy);
        sum_xx = a.mul_add(a, sum_xx);
        sum_yy = b.mul_add(b, sum_yy);
    }

    let mut xy = sum_xy.reduce_add();
    let mut xx = sum_xx.reduce_add();
    let mut yy = sum_yy.reduce_add();
    for (a, b) in x_chunks.remainder().iter().zip(y_chunks.remainder()) {
        xy += a * b;
        xx += a * a;
        yy += b * b;
    }

    let denom = f64::from(xx).sqrt() * f64::from(yy).sqrt();
    if denom == 0.0 {
        return Ok(0.0);
    }
    Ok(f64::from(xy) / denom)
}

fn ensure_same_len(expected: usize, found: usize) -> SearchResult<()> {
    if expected != found {
        return Err(SearchError::DimensionMismatch { expected, found });
    }
    Ok(())
}
