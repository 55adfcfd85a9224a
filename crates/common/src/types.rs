//! Contract types for image generation payloads

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Backend that produced an image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Provider {
    #[serde(rename = "openai")]
    OpenAi,
    StabilityAi,
    Midjourney,
}

impl Provider {
    /// Every provider a payload may legally name
    pub const ALL: [Provider; 3] = [Provider::OpenAi, Provider::StabilityAi, Provider::Midjourney];

    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::OpenAi => "openai",
            Provider::StabilityAi => "stability-ai",
            Provider::Midjourney => "midjourney",
        }
    }

    /// Look up a provider by its wire tag. Matching is exact.
    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.as_str() == tag)
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rendering quality requested from the provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityTier {
    #[default]
    Standard,
    Hd,
}

impl QualityTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            QualityTier::Standard => "standard",
            QualityTier::Hd => "hd",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "standard" => Some(QualityTier::Standard),
            "hd" => Some(QualityTier::Hd),
            _ => None,
        }
    }
}

/// Descriptive metadata attached to a generated image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageMetadata {
    pub width: u32,
    pub height: u32,
    pub quality: QualityTier,
}

impl Default for ImageMetadata {
    fn default() -> Self {
        Self {
            width: 1024,
            height: 1024,
            quality: QualityTier::Standard,
        }
    }
}

/// A response payload that passed every schema check.
///
/// Only [`crate::schema::validate`] builds one, so holding a value means the
/// required fields are present and the provider is known.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidatedEntity {
    id: String,
    url: String,
    provider: Provider,
    generation_time: f64,
    metadata: ImageMetadata,
}

impl ValidatedEntity {
    pub(crate) fn new(
        id: String,
        url: String,
        provider: Provider,
        generation_time: f64,
        metadata: ImageMetadata,
    ) -> Self {
        Self {
            id,
            url,
            provider,
            generation_time,
            metadata,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn provider(&self) -> Provider {
        self.provider
    }

    /// Generation duration in milliseconds, 0 when the payload omitted it
    pub fn generation_time(&self) -> f64 {
        self.generation_time
    }

    pub fn metadata(&self) -> &ImageMetadata {
        &self.metadata
    }

    /// Render back into the raw wire shape, defaults included
    pub fn to_raw(&self) -> Value {
        json!({
            "id": self.id,
            "url": self.url,
            "provider": self.provider.as_str(),
            "generationTime": self.generation_time,
            "metadata": {
                "width": self.metadata.width,
                "height": self.metadata.height,
                "quality": self.metadata.quality.as_str(),
            },
        })
    }
}
