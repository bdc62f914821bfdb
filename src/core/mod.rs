pub mod detect;
pub mod report;
pub mod video;
