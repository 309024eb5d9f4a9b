use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One entry of `GET /train/videos`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoDescriptor {
    pub name: String,
    /// Server-relative, e.g. `/videos/file.mp4`.
    pub url: String,
    pub size_bytes: u64,
    /// Epoch seconds; the server reports file mtimes with a fractional part.
    pub modified: f64,
}

impl VideoDescriptor {
    pub fn modified_at(&self) -> Option<DateTime<Utc>> {
        if !self.modified.is_finite() || self.modified < 0.0 {
            return None;
        }
        let secs = self.modified.trunc() as i64;
        let nanos = (self.modified.fract() * 1e9).round().min(999_999_999.0) as u32;
        DateTime::from_timestamp(secs, nanos)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoListing {
    pub videos: Vec<VideoDescriptor>,
}
