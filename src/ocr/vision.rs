//! Cloud vision API client.
//!
//! Posts a base64-encoded photo to the batch-analyze endpoint and collects
//! every `"text"` value from the response JSON. The response nests words
//! inside lines inside blocks, each carrying its own `"text"`; joining all
//! of them in document order reassembles the page in reading order.

use anyhow::{Context, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde_json::{json, Value};
use std::time::Duration;

use super::TextExtractor;
use crate::config::AppConfig;

pub struct VisionClient {
    http: reqwest::blocking::Client,
    url: String,
    api_key: String,
    folder_id: String,
    languages: Vec<String>,
}

impl VisionClient {
    /// Builds a client from the application config. The configured request
    /// timeout is the pipeline's only deadline around OCR.
    pub fn new(config: &AppConfig) -> Result<Self> {
        let http = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_sec))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            http,
            url: config.vision_api_url.clone(),
            api_key: config.vision_api_key.clone(),
            folder_id: config.vision_folder_id.clone(),
            languages: config.ocr_languages.clone(),
        })
    }

    fn request_body(&self, image_b64: &str) -> Value {
        json!({
            "folderId": self.folder_id,
            "analyzeSpecs": [
                {
                    "content": image_b64,
                    "features": [
                        {
                            "type": "TEXT_DETECTION",
                            "textDetectionConfig": {"languageCodes": self.languages}
                        }
                    ],
                }
            ]
        })
    }
}

impl TextExtractor for VisionClient {
    fn text_from_image(&self, image: &[u8]) -> Result<String> {
        let body = self.request_body(&STANDARD.encode(image));
        let response = self
            .http
            .post(&self.url)
            .header("Authorization", format!("Api-Key {}", self.api_key))
            .json(&body)
            .send()
            .context("Vision API request failed")?
            .error_for_status()
            .context("Vision API returned an error status")?;
        let value: Value = response
            .json()
            .context("Vision API response is not JSON")?;
        Ok(collect_text_values(&value).join(" "))
    }
}

/// Collects every string under a `"text"` key, depth-first in document
/// order, innermost values first within an object.
pub(crate) fn collect_text_values(value: &Value) -> Vec<String> {
    let mut texts = Vec::new();
    walk(value, &mut texts);
    texts
}

fn walk(value: &Value, texts: &mut Vec<String>) {
    match value {
        Value::Object(map) => {
            for child in map.values() {
                walk(child, texts);
            }
            if let Some(Value::String(text)) = map.get("text") {
                texts.push(text.clone());
            }
        }
        Value::Array(items) => {
            for item in items {
                walk(item, texts);
            }
        }
        _ => {}
    }
}
