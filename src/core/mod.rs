// Scoring stages, from raw landmarks to stored score tables

pub mod angle_extractor;
pub mod config;
pub mod normalizer;
pub mod onset_detector;
pub mod pipeline;
pub mod scorer;
pub mod segmenter;
pub mod storage;
pub mod window_features;
