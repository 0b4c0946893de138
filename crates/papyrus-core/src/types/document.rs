use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Text extracted from one uploaded file, kept per session.
///
/// Records are append-only within a session; the text is never edited in
/// place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub filename: String,
    pub extracted_text: String,
    #[serde(with = "unix_seconds")]
    pub upload_time: DateTime<Utc>,
}

impl DocumentRecord {
    /// Create a record stamped with the current time
    pub fn new(filename: impl Into<String>, extracted_text: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            extracted_text: extracted_text.into(),
            upload_time: Utc::now(),
        }
    }

    /// Listing view without the extracted text
    pub fn info(&self) -> DocumentInfo {
        DocumentInfo {
            filename: self.filename.clone(),
            upload_time: self.upload_time,
        }
    }
}

/// Uploaded-file metadata as returned by the files listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentInfo {
    pub filename: String,
    /// Serialized as fractional Unix seconds
    #[serde(with = "unix_seconds")]
    pub upload_time: DateTime<Utc>,
}

mod unix_seconds {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(time: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let secs = time.timestamp() as f64 + f64::from(time.timestamp_subsec_micros()) / 1_000_000.0;
        serializer.serialize_f64(secs)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = f64::deserialize(deserializer)?;
        let whole = secs.trunc();
        let nanos = ((secs - whole) * 1_000_000_000.0).round().clamp(0.0, 999_999_999.0) as u32;
        DateTime::from_timestamp(whole as i64, nanos)
            .ok_or_else(|| serde::de::Error::custom(format!("timestamp out of range: {}", secs)))
    }
}
