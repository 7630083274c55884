pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug)]
pub enum Error {
    /// Buffer length disagrees with the declared tensor shape, or the
    /// coverage and bounding-box tensors are incompatible with each other.
    ShapeMismatch(String),
    /// Rejected at build time, never during a decode call.
    InvalidConfig(String),
    /// The network produced a class index beyond the configured label list.
    LabelIndexOutOfRange { label: usize, num_labels: usize },
    /// Tensor element access outside the declared shape.
    IndexOutOfRange {
        index: [usize; 3],
        shape: [usize; 3],
    },
    /// The builder was asked to build without any configuration source.
    NoConfig,
    Json(serde_json::Error),
    Yaml(serde_yaml::Error),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Json(err)
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(err: serde_yaml::Error) -> Self {
        Error::Yaml(err)
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::ShapeMismatch(msg) => write!(f, "Shape mismatch: {}", msg),
            Error::InvalidConfig(msg) => write!(f, "Invalid configuration: {}", msg),
            Error::LabelIndexOutOfRange { label, num_labels } => {
                write!(
                    f,
                    "Label index {} out of range for {} configured labels",
                    label, num_labels
                )
            }
            Error::IndexOutOfRange { index, shape } => {
                write!(
                    f,
                    "Index ({}, {}, {}) out of range for shape ({}, {}, {})",
                    index[0], index[1], index[2], shape[0], shape[1], shape[2]
                )
            }
            Error::NoConfig => write!(f, "No configuration provided"),
            Error::Json(e) => write!(f, "{}", e),
            Error::Yaml(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for Error {}
