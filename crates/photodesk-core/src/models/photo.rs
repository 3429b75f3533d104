//! Photo metadata models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct Photo {
    pub id: String,
    pub original_name: String,
    pub mime: String,
    pub size: u64,
    #[serde(with = "super::timestamp")]
    #[cfg_attr(feature = "ts", ts(type = "string"))]
    pub created_at: DateTime<Utc>,
}

impl Photo {
    /// Human readable file size (e.g. `2.4 MB`).
    pub fn size_display(&self) -> String {
        const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
        let mut size = self.size as f64;
        let mut unit = 0;
        while size >= 1024.0 && unit < UNITS.len() - 1 {
            size /= 1024.0;
            unit += 1;
        }
        if unit == 0 {
            format!("{} {}", self.size, UNITS[0])
        } else {
            format!("{:.1} {}", size, UNITS[unit])
        }
    }
}

/// Envelope of `GET .../photos`.
#[derive(Debug, Clone, Deserialize)]
pub struct PhotoList {
    pub items: Vec<Photo>,
}

/// Envelope of a photo upload: ids of the stored photos, in upload order.
#[derive(Debug, Clone, Deserialize)]
pub struct UploadedPhotos {
    pub items: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn photo(size: u64) -> Photo {
        Photo {
            id: "a".to_string(),
            original_name: "a.jpg".to_string(),
            mime: "image/jpeg".to_string(),
            size,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_size_display() {
        assert_eq!(photo(512).size_display(), "512 B");
        assert_eq!(photo(2048).size_display(), "2.0 KB");
        assert_eq!(photo(5 * 1024 * 1024 + 1024 * 400).size_display(), "5.4 MB");
    }

    #[test]
    fn test_parse_photo_list() {
        let json = r#"{"items":[{"id":"f1","original_name":"cat.png","mime":"image/png","size":10,"created_at":"2024-02-02T02:02:02"}]}"#;
        let list: PhotoList = serde_json::from_str(json).expect("Failed to parse photo list");
        assert_eq!(list.items.len(), 1);
        assert_eq!(list.items[0].mime, "image/png");
    }
}
