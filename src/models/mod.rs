// Data models for landmark recordings, angle features, reference artifacts, and scores

pub mod error;
pub mod motion;
pub mod pose;
pub mod recording;
pub mod reference;
pub mod score;
