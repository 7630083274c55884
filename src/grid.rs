use crate::error::{Error, Result};
use crate::tensor::TensorView;
use crate::{BoundingBox, Candidate};

/// Converts one spatial grid cell of the coverage and bounding-box tensors
/// into a candidate box in image pixel coordinates.
///
/// Each grid cell owns an anchor point at `(col + offset) * stride,
/// (row + offset) * stride`. The bounding-box tensor carries four regression
/// values per class (left, top, right, bottom) measured from that anchor in
/// units of `scale` pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridDecoder {
    stride: f32,
    scale: f32,
    offset: f32,
}

impl GridDecoder {
    /// Fails with `Error::InvalidConfig` on a zero or negative stride or
    /// scale. Decoding itself never re-checks these.
    pub fn new(stride: f32, scale: f32, offset: f32) -> Result<Self> {
        if !(stride > 0.0) || !stride.is_finite() {
            return Err(Error::InvalidConfig(format!(
                "grid stride must be positive, got {}",
                stride
            )));
        }
        if !(scale > 0.0) || !scale.is_finite() {
            return Err(Error::InvalidConfig(format!(
                "bounding box scale must be positive, got {}",
                scale
            )));
        }
        if !offset.is_finite() {
            return Err(Error::InvalidConfig(format!(
                "bounding box offset must be finite, got {}",
                offset
            )));
        }
        Ok(Self {
            stride,
            scale,
            offset,
        })
    }

    pub fn stride(&self) -> f32 {
        self.stride
    }

    /// Decodes the cell at `(row, col)` for one class. Returns `Ok(None)`
    /// when the coverage value is below `threshold`.
    ///
    /// The bounding-box tensor holds channels `4 * label .. 4 * label + 4`
    /// as the left, top, right, bottom edge offsets for this class.
    pub fn decode_cell(
        &self,
        coverage: &TensorView,
        bbox: &TensorView,
        label: usize,
        row: usize,
        col: usize,
        threshold: f32,
    ) -> Result<Option<Candidate>> {
        let score = coverage.at(label, row, col)?;
        if score < threshold {
            return Ok(None);
        }

        let left = bbox.at(4 * label, row, col)?;
        let top = bbox.at(4 * label + 1, row, col)?;
        let right = bbox.at(4 * label + 2, row, col)?;
        let bottom = bbox.at(4 * label + 3, row, col)?;

        let ax = (col as f32 + self.offset) * self.stride;
        let ay = (row as f32 + self.offset) * self.stride;

        Ok(Some(Candidate {
            label,
            score,
            bbox: BoundingBox {
                xmin: ax - left * self.scale,
                ymin: ay - top * self.scale,
                xmax: ax + right * self.scale,
                ymax: ay + bottom * self.scale,
            },
        }))
    }
}
