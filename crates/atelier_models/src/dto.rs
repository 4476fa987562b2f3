//! Provider wire format.

use derive_builder::Builder;
use derive_getters::Getters;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Body POSTed to the generate endpoint.
///
/// Preset `extra` parameters are flattened into the top level of the body.
#[derive(Debug, Clone, PartialEq, Serialize, Builder, Getters)]
#[builder(setter(into))]
pub struct GenerateBody {
    /// API key
    key: String,
    /// Prompt text
    prompt: String,
    /// Negative prompt
    #[builder(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    negative_prompt: Option<String>,
    /// Seed of the first sample
    seed: u64,
    /// Output width
    width: u32,
    /// Output height
    height: u32,
    /// Number of units
    samples: u32,
    /// Where to push completion
    #[builder(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    webhook: Option<String>,
    /// Correlation id echoed in webhooks
    #[builder(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    track_id: Option<String>,
    /// Model identifier
    model_id: String,
    /// Step count
    num_inference_steps: u32,
    /// Guidance value
    guidance_scale: f64,
    /// Sampler name
    scheduler: String,
    /// Frames per second (video)
    #[builder(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    fps: Option<u32>,
    /// Frame count (video)
    #[builder(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    num_frames: Option<u32>,
    /// Upscale flag, sent only when requested
    #[builder(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    upscale: Option<String>,
    /// Preset parameters
    #[builder(default)]
    #[serde(flatten)]
    extra: serde_json::Map<String, Value>,
}

impl GenerateBody {
    /// Creates a new builder for `GenerateBody`.
    pub fn builder() -> GenerateBodyBuilder {
        GenerateBodyBuilder::default()
    }
}

/// Body POSTed to the fetch endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FetchBody {
    /// API key
    pub key: String,
}

/// Response of generate, fetch, and webhook pushes.
///
/// Providers are loose with types here: ids arrive as numbers or strings, `eta` as a
/// number or a numeric string, and the message field is sometimes spelled `messege`.
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Getters)]
pub struct ProviderResponse {
    /// Status string
    #[serde(default)]
    status: Option<String>,
    /// Provider task id
    #[serde(default, deserialize_with = "lenient_string")]
    id: Option<String>,
    /// Seconds until ready
    #[serde(default, deserialize_with = "lenient_f64")]
    eta: Option<f64>,
    /// Explicit progress 0–100
    #[serde(default, deserialize_with = "lenient_f64")]
    progress: Option<f64>,
    /// Output URLs or inline payloads
    #[serde(default)]
    output: Vec<String>,
    /// Predicted output URLs
    #[serde(default)]
    future_links: Vec<String>,
    /// Error or informational message
    #[serde(default, alias = "messege")]
    message: Option<Value>,
    /// Additional hint shown on queueing
    #[serde(default)]
    tip: Option<String>,
    /// Correlation id from the submission
    #[serde(default, deserialize_with = "lenient_string")]
    track_id: Option<String>,
}

impl ProviderResponse {
    /// Message text, flattening structured messages into JSON.
    pub fn message_text(&self) -> Option<String> {
        match &self.message {
            None | Some(Value::Null) => self.tip.clone(),
            Some(Value::String(s)) => Some(s.clone()),
            Some(other) => Some(other.to_string()),
        }
    }
}

fn lenient_string<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    Ok(match Option::<Value>::deserialize(d)? {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

fn lenient_f64<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
    Ok(match Option::<Value>::deserialize(d)? {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}
