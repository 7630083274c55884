//! Decoder for DetectNet-style object detection networks.
//!
//! The network emits a per-class coverage map and a per-class bounding-box
//! regression map over a coarse grid; this crate turns those two tensors
//! into a deduplicated list of labeled, image-space detections by
//! thresholding coverage, decoding each qualifying grid cell into a
//! candidate box, clustering overlapping candidates per class, and
//! assembling one detection per surviving cluster.
use serde::{Deserialize, Serialize};

pub mod assemble;
pub mod cluster;
pub mod collect;
pub mod error;
pub mod grid;
pub mod tensor;

mod decoder;
pub use decoder::*;

pub use error::{Error, Result};
pub use tensor::TensorView;

/// Corner-form box in image pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BoundingBox {
    /// left-most coordinate of the bounding box
    pub xmin: f32,
    /// top-most coordinate of the bounding box
    pub ymin: f32,
    /// right-most coordinate of the bounding box
    pub xmax: f32,
    /// bottom-most coordinate of the bounding box
    pub ymax: f32,
}

impl BoundingBox {
    /// Transforms BoundingBox so that xmin <= xmax and ymin <= ymax
    pub fn to_canonical(&self) -> Self {
        let xmin = self.xmin.min(self.xmax);
        let xmax = self.xmin.max(self.xmax);
        let ymin = self.ymin.min(self.ymax);
        let ymax = self.ymin.max(self.ymax);
        BoundingBox {
            xmin,
            ymin,
            xmax,
            ymax,
        }
    }

    pub fn center(&self) -> (f32, f32) {
        (0.5 * (self.xmin + self.xmax), 0.5 * (self.ymin + self.ymax))
    }

    pub fn width(&self) -> f32 {
        self.xmax - self.xmin
    }

    pub fn height(&self) -> f32 {
        self.ymax - self.ymin
    }

    pub fn diagonal(&self) -> f32 {
        self.width().hypot(self.height())
    }
}

impl From<BoundingBox> for [f32; 4] {
    fn from(b: BoundingBox) -> Self {
        [b.xmin, b.ymin, b.xmax, b.ymax]
    }
}

impl From<[f32; 4]> for BoundingBox {
    fn from(arr: [f32; 4]) -> Self {
        BoundingBox {
            xmin: arr[0],
            ymin: arr[1],
            xmax: arr[2],
            ymax: arr[3],
        }
    }
}

/// A thresholded grid cell decoded into a box. Lives only within one decode
/// call, between collection and clustering.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    /// class index for this candidate
    pub label: usize,
    /// coverage value for this cell, higher implies more confidence
    pub score: f32,
    pub bbox: BoundingBox,
}

/// Center-form box reported to the downstream pipeline, in image pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BBox2D {
    pub center_x: f32,
    pub center_y: f32,
    pub size_x: f32,
    pub size_y: f32,
}

impl From<BoundingBox> for BBox2D {
    fn from(b: BoundingBox) -> Self {
        BBox2D {
            center_x: 0.5 * (b.xmin + b.xmax),
            center_y: 0.5 * (b.ymin + b.ymax),
            size_x: b.xmax - b.xmin,
            size_y: b.ymax - b.ymin,
        }
    }
}

/// One reported object: a class label, an aggregated confidence, and a
/// center-form box.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub label: String,
    pub score: f32,
    pub bbox: BBox2D,
}

impl Detection {
    /// Check if one detection is equal to another detection, within the
    /// given delta
    pub fn equal_within_delta(&self, rhs: &Detection, delta: f32) -> bool {
        let eq_delta = |a: f32, b: f32| (a - b).abs() <= delta;
        self.label == rhs.label
            && eq_delta(self.score, rhs.score)
            && eq_delta(self.bbox.center_x, rhs.bbox.center_x)
            && eq_delta(self.bbox.center_y, rhs.bbox.center_y)
            && eq_delta(self.bbox.size_x, rhs.bbox.size_x)
            && eq_delta(self.bbox.size_y, rhs.bbox.size_y)
    }
}

/// The decode result for one frame, stamped with the configured frame id so
/// the publishing side can attribute it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionList {
    pub frame_id: String,
    pub detections: Vec<Detection>,
}
