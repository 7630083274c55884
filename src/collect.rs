use crate::Candidate;
use crate::error::{Error, Result};
use crate::grid::GridDecoder;
use crate::tensor::TensorView;

/// Scans the coverage tensor and builds the thresholded candidate list.
///
/// Iteration order is class index ascending, then row-major over the grid,
/// so identical inputs always produce an identical candidate sequence. No
/// candidate cap is applied here; the coverage threshold alone bounds the
/// output size.
pub fn collect_candidates(
    grid: &GridDecoder,
    coverage: &TensorView,
    bbox: &TensorView,
    threshold: f32,
) -> Result<Vec<Candidate>> {
    if bbox.channels() != 4 * coverage.channels() {
        return Err(Error::ShapeMismatch(format!(
            "bounding box tensor has {} channels, expected {} for {} classes",
            bbox.channels(),
            4 * coverage.channels(),
            coverage.channels()
        )));
    }
    if bbox.height() != coverage.height() || bbox.width() != coverage.width() {
        return Err(Error::ShapeMismatch(format!(
            "bounding box grid {}x{} disagrees with coverage grid {}x{}",
            bbox.height(),
            bbox.width(),
            coverage.height(),
            coverage.width()
        )));
    }

    let mut candidates = Vec::new();
    for label in 0..coverage.channels() {
        for row in 0..coverage.height() {
            for col in 0..coverage.width() {
                if let Some(candidate) =
                    grid.decode_cell(coverage, bbox, label, row, col, threshold)?
                {
                    candidates.push(candidate);
                }
            }
        }
    }
    Ok(candidates)
}
