pub mod deduplicator;
pub mod enhancer;
pub mod extractor;
pub mod filters;
pub mod frame;
pub mod prepare;
pub mod sampler;
pub mod tracker;
pub mod worker;

pub use deduplicator::{DedupCandidate, GridKey, ObjectDeduplicator, GRID_SIZE};
pub use enhancer::{EnhanceError, EnhancementLevel, ImageEnhancer};
pub use extractor::{ExtractError, ObjectExtractor};
pub use frame::{BoundingBox, EncodedFormat, EncodedImage, Frame, FrameError, PixelBuffer, PixelRect};
pub use prepare::FramePreparer;
pub use sampler::{FrameSampler, SamplingPlan};
pub use tracker::{ObjectTracker, TrackError, TrackResult};
pub use worker::EnhancementWorker;
