//! Fail-fast schema validation of raw response payloads
//!
//! Checks run in a fixed order and stop at the first problem:
//!
//! 1. `id` present, a string, non-empty
//! 2. `url` present, a string, non-empty
//! 3. `provider` present, a string, non-empty
//! 4. `provider` names a known [`Provider`]
//!
//! Optional fields are checked afterwards. An absent (or `null`)
//! `generationTime` becomes 0 and an absent `metadata` becomes
//! [`ImageMetadata::default`]. Present-but-malformed optional fields are
//! rejected rather than defaulted.

use serde_json::{Map, Value};
use tracing::trace;

use crate::error::{Result, SchemaViolation};
use crate::types::{ImageMetadata, Provider, QualityTier, ValidatedEntity};

/// Validate an untyped payload into a [`ValidatedEntity`].
pub fn validate(raw: &Value) -> Result<ValidatedEntity> {
    let fields = raw
        .as_object()
        .ok_or_else(|| SchemaViolation::wrong_type("payload", "object"))?;

    let id = required_str(fields, "id")?;
    let url = required_str(fields, "url")?;
    let tag = required_str(fields, "provider")?;
    let provider =
        Provider::from_tag(tag).ok_or_else(|| SchemaViolation::out_of_domain("provider", tag))?;

    let generation_time = optional_duration(fields, "generationTime")?;
    let metadata = match present(fields, "metadata") {
        Some(value) => parse_metadata(value)?,
        None => ImageMetadata::default(),
    };

    trace!(id, %provider, "payload passed schema validation");

    Ok(ValidatedEntity::new(
        id.to_string(),
        url.to_string(),
        provider,
        generation_time,
        metadata,
    ))
}

impl TryFrom<&Value> for ValidatedEntity {
    type Error = SchemaViolation;

    fn try_from(raw: &Value) -> Result<Self> {
        validate(raw)
    }
}

/// A field counts as present only when it exists and is not `null`
fn present<'a>(fields: &'a Map<String, Value>, name: &str) -> Option<&'a Value> {
    fields.get(name).filter(|v| !v.is_null())
}

fn required_str<'a>(fields: &'a Map<String, Value>, name: &str) -> Result<&'a str> {
    let value = present(fields, name).ok_or_else(|| SchemaViolation::missing(name))?;
    let text = value
        .as_str()
        .ok_or_else(|| SchemaViolation::wrong_type(name, "string"))?;
    if text.is_empty() {
        return Err(SchemaViolation::empty(name));
    }
    Ok(text)
}

fn optional_duration(fields: &Map<String, Value>, name: &str) -> Result<f64> {
    let Some(value) = present(fields, name) else {
        return Ok(0.0);
    };
    let millis = value
        .as_f64()
        .ok_or_else(|| SchemaViolation::wrong_type(name, "number"))?;
    if !millis.is_finite() || millis < 0.0 {
        return Err(SchemaViolation::out_of_domain(name, value.to_string()));
    }
    Ok(millis)
}

fn parse_metadata(value: &Value) -> Result<ImageMetadata> {
    let fields = value
        .as_object()
        .ok_or_else(|| SchemaViolation::wrong_type("metadata", "object"))?;

    let width = dimension(fields, "width")?;
    let height = dimension(fields, "height")?;

    let quality_field = "metadata.quality";
    let tag = present(fields, "quality")
        .ok_or_else(|| SchemaViolation::missing(quality_field))?
        .as_str()
        .ok_or_else(|| SchemaViolation::wrong_type(quality_field, "string"))?;
    let quality = QualityTier::from_tag(tag)
        .ok_or_else(|| SchemaViolation::out_of_domain(quality_field, tag))?;

    Ok(ImageMetadata {
        width,
        height,
        quality,
    })
}

fn dimension(fields: &Map<String, Value>, name: &str) -> Result<u32> {
    let path = format!("metadata.{}", name);
    let value = present(fields, name).ok_or_else(|| SchemaViolation::missing(path.as_str()))?;
    let raw = value
        .as_u64()
        .ok_or_else(|| SchemaViolation::wrong_type(path.as_str(), "positive integer"))?;
    match u32::try_from(raw) {
        Ok(px) if px > 0 => Ok(px),
        _ => Err(SchemaViolation::out_of_domain(path, raw.to_string())),
    }
}
