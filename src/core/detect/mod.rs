pub mod backend;
pub mod error;
pub mod host;
pub mod mock;
pub mod policy;
pub mod registry;
pub mod result;

pub use backend::{Classifier, Detector, DetectorLoader, ModelConfig, ModelType};
pub use error::DetectError;
pub use host::HostDetector;
pub use mock::{MockClassifier, MockDetector, MockDetectorLoader};
pub use policy::DetectionPolicy;
pub use registry::{ModelHandle, ModelRegistry};
pub use result::{Classification, Detection, Prediction};
