// SPDX-FileCopyrightText: Copyright 2025 Au-Zone Technologies
// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::assemble::assemble_detections;
use crate::cluster::merge_clusters;
use crate::collect::collect_candidates;
use crate::error::{Error, Result};
use crate::grid::GridDecoder;
use crate::tensor::TensorView;
use crate::{Detection, DetectionList};

/// Decoder parameters, loaded once at startup and shared read-only across
/// all decode calls.
///
/// `grid_stride` is the pixel distance between adjacent anchor points,
/// the network input size divided by the output grid size. The defaults
/// match a DetectNet model on a 640x368 input with a 40x23 output grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecoderConfig {
    #[serde(default = "default_frame_id")]
    pub frame_id: String,
    /// Class index into this list selects the reported label string.
    pub label_names: Vec<String>,
    #[serde(default = "default_coverage_threshold")]
    pub coverage_threshold: f32,
    #[serde(default = "default_bounding_box_scale")]
    pub bounding_box_scale: f32,
    #[serde(default = "default_bounding_box_offset")]
    pub bounding_box_offset: f32,
    #[serde(default = "default_grid_stride")]
    pub grid_stride: f32,
    /// Normalized center distance below which two candidate boxes of the
    /// same class belong to the same cluster.
    #[serde(default = "default_eps")]
    pub eps: f32,
    /// Clusters with fewer members than this are dropped as noise.
    #[serde(default = "default_min_boxes")]
    pub min_boxes: usize,
    #[serde(default)]
    pub verbose: bool,
}

fn default_frame_id() -> String {
    "detectnet".to_string()
}

fn default_coverage_threshold() -> f32 {
    0.5
}

fn default_bounding_box_scale() -> f32 {
    35.0
}

fn default_bounding_box_offset() -> f32 {
    0.5
}

fn default_grid_stride() -> f32 {
    16.0
}

fn default_eps() -> f32 {
    0.5
}

fn default_min_boxes() -> usize {
    2
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            frame_id: default_frame_id(),
            label_names: Vec::new(),
            coverage_threshold: default_coverage_threshold(),
            bounding_box_scale: default_bounding_box_scale(),
            bounding_box_offset: default_bounding_box_offset(),
            grid_stride: default_grid_stride(),
            eps: default_eps(),
            min_boxes: default_min_boxes(),
            verbose: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum ConfigSource {
    Yaml(String),
    Json(String),
    Config(DecoderConfig),
}

/// Builds a [`Decoder`] from a configuration source, validating the
/// parameters once so decode calls never re-check them.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DecoderBuilder {
    config_src: Option<ConfigSource>,
}

impl DecoderBuilder {
    /// Creates a builder with no configuration. A valid configuration must
    /// be provided before building the decoder.
    ///
    /// # Examples
    /// ```rust
    /// # use detectnet_decoder::{DecoderBuilder, Result};
    /// # fn main() -> Result<()> {
    /// let config_yaml = "label_names: [person, bag]".to_string();
    /// let decoder = DecoderBuilder::new()
    ///     .with_config_yaml_str(config_yaml)
    ///     .build()?;
    /// assert_eq!(decoder.config().min_boxes, 2);
    /// # Ok(())
    /// # }
    /// ```
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads a decoder configuration in YAML format. The string is not
    /// checked here; use [`DecoderBuilder::build`] to deserialize and
    /// validate it.
    pub fn with_config_yaml_str(mut self, yaml_str: String) -> Self {
        self.config_src.replace(ConfigSource::Yaml(yaml_str));
        self
    }

    /// Loads a decoder configuration in JSON format. The string is not
    /// checked here; use [`DecoderBuilder::build`] to deserialize and
    /// validate it.
    ///
    /// # Examples
    /// ```rust
    /// # use detectnet_decoder::{DecoderBuilder, Result};
    /// # fn main() -> Result<()> {
    /// let config_json = r#"{"label_names": ["person"], "coverage_threshold": 0.6}"#;
    /// let decoder = DecoderBuilder::new()
    ///     .with_config_json_str(config_json.to_string())
    ///     .build()?;
    /// assert_eq!(decoder.config().coverage_threshold, 0.6);
    /// # Ok(())
    /// # }
    /// ```
    pub fn with_config_json_str(mut self, json_str: String) -> Self {
        self.config_src.replace(ConfigSource::Json(json_str));
        self
    }

    /// Loads an already-deserialized configuration, for callers that need
    /// control over deserialization.
    ///
    /// # Examples
    /// ```rust
    /// # use detectnet_decoder::{DecoderBuilder, DecoderConfig, Result};
    /// # fn main() -> Result<()> {
    /// let config = DecoderConfig {
    ///     label_names: vec!["person".to_string()],
    ///     ..DecoderConfig::default()
    /// };
    /// let decoder = DecoderBuilder::new().with_config(config).build()?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn with_config(mut self, config: DecoderConfig) -> Self {
        self.config_src.replace(ConfigSource::Config(config));
        self
    }

    /// Deserializes the configuration if needed, validates it, and builds
    /// the decoder. Fails with `Error::InvalidConfig` on a zero or negative
    /// stride or scale, a coverage threshold outside `[0, 1]`, a
    /// non-positive `eps`, `min_boxes` of zero, or an empty label list.
    pub fn build(self) -> Result<Decoder> {
        let config = match self.config_src {
            Some(ConfigSource::Json(s)) => serde_json::from_str(&s)?,
            Some(ConfigSource::Yaml(s)) => serde_yaml::from_str(&s)?,
            Some(ConfigSource::Config(c)) => c,
            None => return Err(Error::NoConfig),
        };
        Self::validate(&config)?;
        let grid = GridDecoder::new(
            config.grid_stride,
            config.bounding_box_scale,
            config.bounding_box_offset,
        )?;
        Ok(Decoder { config, grid })
    }

    fn validate(config: &DecoderConfig) -> Result<()> {
        if config.label_names.is_empty() {
            return Err(Error::InvalidConfig("label_names is empty".to_string()));
        }
        if !(0.0..=1.0).contains(&config.coverage_threshold) {
            return Err(Error::InvalidConfig(format!(
                "coverage_threshold {} outside [0, 1]",
                config.coverage_threshold
            )));
        }
        if !(config.eps > 0.0) || !config.eps.is_finite() {
            return Err(Error::InvalidConfig(format!(
                "eps must be positive, got {}",
                config.eps
            )));
        }
        if config.min_boxes == 0 {
            return Err(Error::InvalidConfig(
                "min_boxes must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Decodes DetectNet coverage and bounding-box regression tensors into a
/// deduplicated set of labeled image-space detections.
///
/// A decode call is a pure, synchronous function of its input tensors and
/// the immutable configuration; the decoder holds no mutable state between
/// calls, so one instance may be shared across threads as long as each call
/// receives its own tensor buffers.
#[derive(Debug, Clone, PartialEq)]
pub struct Decoder {
    config: DecoderConfig,
    grid: GridDecoder,
}

impl Decoder {
    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    /// Decodes one frame into `output_boxes`. The vector is cleared and
    /// filled with up to `output_boxes.capacity()` detections, ordered by
    /// class index ascending and score descending.
    ///
    /// The coverage tensor has shape `(num_classes, grid_h, grid_w)` and the
    /// bounding-box tensor `(num_classes * 4, grid_h, grid_w)`; anything
    /// else fails with `Error::ShapeMismatch`. A failed decode leaves
    /// `output_boxes` empty.
    ///
    /// # Examples
    /// ```rust
    /// # use detectnet_decoder::{DecoderBuilder, DecoderConfig, TensorView, Result};
    /// # fn main() -> Result<()> {
    /// let decoder = DecoderBuilder::new()
    ///     .with_config(DecoderConfig {
    ///         label_names: vec!["person".to_string()],
    ///         min_boxes: 1,
    ///         ..DecoderConfig::default()
    ///     })
    ///     .build()?;
    ///
    /// let coverage = vec![0.0_f32; 23 * 40];
    /// let bbox = vec![0.0_f32; 4 * 23 * 40];
    /// let coverage = TensorView::new(&coverage, 1, 23, 40)?;
    /// let bbox = TensorView::new(&bbox, 4, 23, 40)?;
    ///
    /// let mut output_boxes = Vec::with_capacity(20);
    /// decoder.decode(&coverage, &bbox, &mut output_boxes)?;
    /// assert!(output_boxes.is_empty());
    /// # Ok(())
    /// # }
    /// ```
    pub fn decode(
        &self,
        coverage: &TensorView,
        bbox: &TensorView,
        output_boxes: &mut Vec<Detection>,
    ) -> Result<()> {
        output_boxes.clear();
        let detections = self.decode_inner(coverage, bbox)?;
        let len = output_boxes.capacity().min(detections.len());
        for detection in detections.into_iter().take(len) {
            output_boxes.push(detection);
        }
        Ok(())
    }

    /// Decodes one frame into a [`DetectionList`] stamped with the
    /// configured `frame_id`, with no cap on the detection count.
    pub fn decode_list(&self, coverage: &TensorView, bbox: &TensorView) -> Result<DetectionList> {
        let detections = self.decode_inner(coverage, bbox)?;
        Ok(DetectionList {
            frame_id: self.config.frame_id.clone(),
            detections,
        })
    }

    fn decode_inner(&self, coverage: &TensorView, bbox: &TensorView) -> Result<Vec<Detection>> {
        let candidates =
            collect_candidates(&self.grid, coverage, bbox, self.config.coverage_threshold)?;
        let clusters = merge_clusters(&candidates, self.config.eps, self.config.min_boxes);
        let detections = assemble_detections(&clusters, &self.config.label_names)?;
        if self.config.verbose {
            debug!(
                candidates = candidates.len(),
                clusters = clusters.len(),
                detections = detections.len(),
                "decoded frame"
            );
        } else {
            trace!(
                candidates = candidates.len(),
                clusters = clusters.len(),
                detections = detections.len(),
                "decoded frame"
            );
        }
        Ok(detections)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_requires_config() {
        assert!(matches!(
            DecoderBuilder::new().build(),
            Err(Error::NoConfig)
        ));
    }

    #[test]
    fn test_build_from_yaml() {
        let yaml = r#"
frame_id: camera_front
label_names:
  - person
  - bag
coverage_threshold: 0.6
eps: 0.3
min_boxes: 1
"#;
        let decoder = DecoderBuilder::new()
            .with_config_yaml_str(yaml.to_string())
            .build()
            .unwrap();
        assert_eq!(decoder.config().frame_id, "camera_front");
        assert_eq!(decoder.config().label_names.len(), 2);
        assert_eq!(decoder.config().coverage_threshold, 0.6);
        assert_eq!(decoder.config().eps, 0.3);
        assert_eq!(decoder.config().min_boxes, 1);
        // untouched fields keep their defaults
        assert_eq!(decoder.config().bounding_box_scale, 35.0);
        assert_eq!(decoder.config().grid_stride, 16.0);
        assert!(!decoder.config().verbose);
    }

    #[test]
    fn test_build_from_json() {
        let json = r#"{"label_names": ["person"], "min_boxes": 3, "verbose": true}"#;
        let decoder = DecoderBuilder::new()
            .with_config_json_str(json.to_string())
            .build()
            .unwrap();
        assert_eq!(decoder.config().min_boxes, 3);
        assert!(decoder.config().verbose);
    }

    #[test]
    fn test_build_rejects_bad_yaml() {
        let err = DecoderBuilder::new()
            .with_config_yaml_str("label_names: {not a list".to_string())
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::Yaml(_)));
    }

    #[test]
    fn test_validation() {
        let valid = DecoderConfig {
            label_names: vec!["person".to_string()],
            ..DecoderConfig::default()
        };
        assert!(DecoderBuilder::new().with_config(valid.clone()).build().is_ok());

        let cases = [
            DecoderConfig {
                label_names: Vec::new(),
                ..valid.clone()
            },
            DecoderConfig {
                coverage_threshold: 1.5,
                ..valid.clone()
            },
            DecoderConfig {
                coverage_threshold: -0.1,
                ..valid.clone()
            },
            DecoderConfig {
                grid_stride: 0.0,
                ..valid.clone()
            },
            DecoderConfig {
                bounding_box_scale: -35.0,
                ..valid.clone()
            },
            DecoderConfig {
                eps: 0.0,
                ..valid.clone()
            },
            DecoderConfig {
                min_boxes: 0,
                ..valid.clone()
            },
        ];
        for config in cases {
            let err = DecoderBuilder::new().with_config(config).build().unwrap_err();
            assert!(matches!(err, Error::InvalidConfig(_)));
        }
    }
}
