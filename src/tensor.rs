// SPDX-FileCopyrightText: Copyright 2025 Au-Zone Technologies
// SPDX-License-Identifier: Apache-2.0

use crate::error::{Error, Result};
use ndarray::ArrayView3;

/// Read-only view over a flat row-major float buffer with a declared
/// `(channels, height, width)` shape. The decoder borrows the caller's
/// buffers through this type for the duration of one decode call and never
/// mutates them.
#[derive(Debug, Clone, Copy)]
pub struct TensorView<'a> {
    view: ArrayView3<'a, f32>,
}

impl<'a> TensorView<'a> {
    /// Wraps `data` as a `(channels, height, width)` tensor. Fails with
    /// `Error::ShapeMismatch` when the buffer length does not equal
    /// `channels * height * width`.
    pub fn new(data: &'a [f32], channels: usize, height: usize, width: usize) -> Result<Self> {
        if data.len() != channels * height * width {
            return Err(Error::ShapeMismatch(format!(
                "buffer of {} values cannot be viewed as shape ({}, {}, {})",
                data.len(),
                channels,
                height,
                width
            )));
        }
        let view = ArrayView3::from_shape((channels, height, width), data)
            .map_err(|e| Error::ShapeMismatch(e.to_string()))?;
        Ok(Self { view })
    }

    /// Wraps an existing ndarray view, for callers that already hold their
    /// tensors as arrays.
    pub fn from_array(view: ArrayView3<'a, f32>) -> Self {
        Self { view }
    }

    pub fn channels(&self) -> usize {
        self.view.shape()[0]
    }

    pub fn height(&self) -> usize {
        self.view.shape()[1]
    }

    pub fn width(&self) -> usize {
        self.view.shape()[2]
    }

    /// Bounds-checked element access.
    pub fn at(&self, channel: usize, row: usize, col: usize) -> Result<f32> {
        self.view
            .get((channel, row, col))
            .copied()
            .ok_or(Error::IndexOutOfRange {
                index: [channel, row, col],
                shape: [self.channels(), self.height(), self.width()],
            })
    }

    pub fn view(&self) -> ArrayView3<'a, f32> {
        self.view
    }
}
