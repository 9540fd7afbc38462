use crate::TensorError;
use ndarray::{ArrayD, ArrayViewD, ArrayViewMutD, IxDyn};
use std::fmt;

/// Relative tolerance used by [`Tensor::all_close`].
pub const DEFAULT_RTOL: f32 = 1e-5;
/// Absolute tolerance used by [`Tensor::all_close`].
pub const DEFAULT_ATOL: f32 = 1e-8;

/// Number of elements held by a tensor of the given shape.
///
/// The empty shape is a scalar and holds one element.
#[inline]
pub fn volume(shape: &[usize]) -> usize {
    shape.iter().product()
}

/// Dense `f32` buffer with an explicit shape, stored row-major.
///
/// `data.len() == volume(shape)` holds for every value of this type. The
/// unchecked constructors and the index helpers panic when a caller breaks
/// that contract; boundary code should use [`Tensor::try_from_vec`].
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor {
    shape: Vec<usize>,
    data: Vec<f32>,
}

impl Tensor {
    /// Zero-filled tensor of the given shape.
    pub fn zeros(shape: Vec<usize>) -> Self {
        let data = vec![0.0; volume(&shape)];
        Self { shape, data }
    }

    /// Takes ownership of `data`.
    ///
    /// # Panics
    /// If `data.len()` differs from the volume of `shape`.
    pub fn from_vec(shape: Vec<usize>, data: Vec<f32>) -> Self {
        assert_eq!(
            data.len(),
            volume(&shape),
            "tensor data length does not match shape {:?}",
            shape
        );
        Self { shape, data }
    }

    /// Checked [`Tensor::from_vec`] for data coming from outside the crate.
    pub fn try_from_vec(shape: Vec<usize>, data: Vec<f32>) -> Result<Self, TensorError> {
        let expected = volume(&shape);
        if data.len() != expected {
            return Err(TensorError::VolumeMismatch {
                shape,
                expected,
                actual: data.len(),
            });
        }
        Ok(Self { shape, data })
    }

    /// Copies the first `volume(shape)` elements of `data`.
    ///
    /// # Panics
    /// If `data` is shorter than the volume of `shape`.
    pub fn from_slice_prefix(shape: Vec<usize>, data: &[f32]) -> Self {
        let n = volume(&shape);
        Self {
            data: data[..n].to_vec(),
            shape,
        }
    }

    /// Copies `volume(shape)` elements starting at `ptr`.
    ///
    /// # Safety
    /// `ptr` must be valid for reads of `volume(shape)` consecutive `f32`s.
    pub unsafe fn from_raw_parts(shape: Vec<usize>, ptr: *const f32) -> Self {
        let n = volume(&shape);
        let data = unsafe { std::slice::from_raw_parts(ptr, n) }.to_vec();
        Self { shape, data }
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn rank(&self) -> usize {
        self.shape.len()
    }

    pub fn volume(&self) -> usize {
        self.data.len()
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [f32] {
        &mut self.data
    }

    pub fn into_vec(self) -> Vec<f32> {
        self.data
    }

    pub fn as_ptr(&self) -> *const f32 {
        self.data.as_ptr()
    }

    pub fn as_mut_ptr(&mut self) -> *mut f32 {
        self.data.as_mut_ptr()
    }

    /// Row-major strides, in elements.
    pub fn strides(&self) -> Vec<usize> {
        let mut strides = vec![1; self.shape.len()];
        for i in (0..self.shape.len().saturating_sub(1)).rev() {
            strides[i] = strides[i + 1] * self.shape[i + 1];
        }
        strides
    }

    /// Flat offset of the sub-tensor addressed by an index prefix.
    ///
    /// # Panics
    /// If more indices than the rank are given or any index is out of range.
    pub fn offset(&self, indices: &[usize]) -> usize {
        assert!(
            indices.len() <= self.shape.len(),
            "{} indices given for a rank {} tensor",
            indices.len(),
            self.shape.len()
        );
        let strides = self.strides();
        indices
            .iter()
            .zip(&self.shape)
            .zip(&strides)
            .map(|((&index, &dim), &stride)| {
                assert!(index < dim, "index {} out of range for dimension {}", index, dim);
                index * stride
            })
            .sum()
    }

    /// Buffer tail starting at the first element addressed by `indices`.
    pub fn data_from(&self, indices: &[usize]) -> &[f32] {
        let offset = self.offset(indices);
        &self.data[offset..]
    }

    pub fn data_from_mut(&mut self, indices: &[usize]) -> &mut [f32] {
        let offset = self.offset(indices);
        &mut self.data[offset..]
    }

    pub fn iter(&self) -> std::slice::Iter<'_, f32> {
        self.data.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, f32> {
        self.data.iter_mut()
    }

    /// Same shape and bit-identical elements.
    pub fn all_equal(&self, other: &Tensor) -> bool {
        self.shape == other.shape
            && self
                .data
                .iter()
                .zip(&other.data)
                .all(|(a, b)| a.to_bits() == b.to_bits())
    }

    pub fn all_close(&self, other: &Tensor) -> bool {
        self.all_close_with(other, DEFAULT_RTOL, DEFAULT_ATOL)
    }

    /// Elementwise `|a - b| <= atol + rtol * |b|`, with `b` taken from `other`.
    pub fn all_close_with(&self, other: &Tensor, rtol: f32, atol: f32) -> bool {
        self.shape == other.shape
            && self
                .data
                .iter()
                .zip(&other.data)
                .all(|(a, b)| (a - b).abs() <= atol + rtol * b.abs())
    }

    pub fn reshape(self, shape: Vec<usize>) -> Result<Self, TensorError> {
        if volume(&shape) != self.data.len() {
            return Err(TensorError::InvalidReshape {
                from: self.shape,
                to: shape,
            });
        }
        Ok(Self {
            shape,
            data: self.data,
        })
    }

    pub fn view(&self) -> ArrayViewD<'_, f32> {
        ArrayViewD::from_shape(IxDyn(&self.shape), &self.data)
            .unwrap_or_else(|_| unreachable!("tensor volume invariant"))
    }

    pub fn view_mut(&mut self) -> ArrayViewMutD<'_, f32> {
        ArrayViewMutD::from_shape(IxDyn(&self.shape), &mut self.data)
            .unwrap_or_else(|_| unreachable!("tensor volume invariant"))
    }

    pub fn into_array(self) -> ArrayD<f32> {
        ArrayD::from_shape_vec(IxDyn(&self.shape), self.data)
            .unwrap_or_else(|_| unreachable!("tensor volume invariant"))
    }

    /// Prints shape and contents to stdout, one innermost row per line.
    pub fn dump(&self) {
        println!("{}", self);
    }
}

impl From<ArrayD<f32>> for Tensor {
    fn from(array: ArrayD<f32>) -> Self {
        let shape = array.shape().to_vec();
        let data = array.iter().copied().collect();
        Self { shape, data }
    }
}

impl From<ArrayViewD<'_, f32>> for Tensor {
    fn from(view: ArrayViewD<'_, f32>) -> Self {
        let shape = view.shape().to_vec();
        let data = view.iter().copied().collect();
        Self { shape, data }
    }
}

impl<'a> IntoIterator for &'a Tensor {
    type Item = &'a f32;
    type IntoIter = std::slice::Iter<'a, f32>;

    fn into_iter(self) -> Self::IntoIter {
        self.data.iter()
    }
}

impl<'a> IntoIterator for &'a mut Tensor {
    type Item = &'a mut f32;
    type IntoIter = std::slice::IterMut<'a, f32>;

    fn into_iter(self) -> Self::IntoIter {
        self.data.iter_mut()
    }
}

impl fmt::Display for Tensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "shape: {:?}", self.shape)?;
        let row = self.shape.last().copied().unwrap_or(1).max(1);
        for chunk in self.data.chunks(row) {
            let line: Vec<String> = chunk.iter().map(|v| format!("{v}")).collect();
            writeln!(f, "{}", line.join(" "))?;
        }
        Ok(())
    }
}
