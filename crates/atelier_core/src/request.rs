//! Generation requests and parameter resolution.

use crate::{MediaKind, ModelPreset};
use derive_builder::Builder;
use rand::Rng;
use serde::{Deserialize, Serialize};

const DEFAULT_STEPS: u32 = 30;
const DEFAULT_GUIDANCE: f64 = 7.5;
const DEFAULT_SAMPLER: &str = "DPMSolverMultistepScheduler";
const DEFAULT_SIDE: u32 = 512;
const DEFAULT_FPS: u32 = 8;
const DEFAULT_FRAMES: u32 = 16;

fn default_units() -> u32 {
    1
}

/// A user's request for one batch of images or videos.
///
/// Only `media_kind` and `prompt` are required; unset parameters are taken from the
/// model preset and then from built-in defaults.
///
/// # Examples
///
/// ```
/// use atelier_core::{GenerationRequestBuilder, MediaKind};
///
/// let request = GenerationRequestBuilder::default()
///     .media_kind(MediaKind::Image)
///     .prompt("a lighthouse at dusk")
///     .units(4u32)
///     .seed(100u64)
///     .build()
///     .unwrap();
///
/// assert_eq!(request.units, 4);
/// assert_eq!(request.negative_prompt, None);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Builder)]
#[builder(setter(into, strip_option))]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    /// Image or video
    pub media_kind: MediaKind,
    /// Prompt text
    pub prompt: String,
    /// Negative prompt
    #[builder(default)]
    #[serde(default)]
    pub negative_prompt: Option<String>,
    /// Number of units in the batch
    #[builder(default = "1")]
    #[serde(default = "default_units")]
    pub units: u32,
    /// Base seed; unit `i` gets `seed + i`
    #[builder(default)]
    #[serde(default)]
    pub seed: Option<u64>,
    /// Model override
    #[builder(default)]
    #[serde(default)]
    pub model_id: Option<String>,
    /// Step count override
    #[builder(default)]
    #[serde(default)]
    pub steps: Option<u32>,
    /// Guidance override
    #[builder(default)]
    #[serde(default)]
    pub guidance: Option<f64>,
    /// Sampler override
    #[builder(default)]
    #[serde(default)]
    pub sampler: Option<String>,
    /// Width override
    #[builder(default)]
    #[serde(default)]
    pub width: Option<u32>,
    /// Height override
    #[builder(default)]
    #[serde(default)]
    pub height: Option<u32>,
    /// Frames per second (video)
    #[builder(default)]
    #[serde(default)]
    pub fps: Option<u32>,
    /// Frame count (video)
    #[builder(default)]
    #[serde(default)]
    pub frames: Option<u32>,
    /// Request upscaling
    #[builder(default)]
    #[serde(default)]
    pub upscale: bool,
}

impl GenerationRequest {
    /// Fill unset parameters from `preset`, then from defaults.
    ///
    /// `default_model` is used when neither the request nor a preset names a model.
    pub fn resolve(&self, preset: Option<&ModelPreset>, default_model: &str) -> GenerationParams {
        let model_id = self
            .model_id
            .clone()
            .or_else(|| preset.map(|p| p.model_id.clone()))
            .unwrap_or_else(|| default_model.to_string());

        let (fps, frames) = match self.media_kind {
            MediaKind::Image => (None, None),
            MediaKind::Video => (
                Some(
                    self.fps
                        .or_else(|| preset.and_then(|p| p.fps))
                        .unwrap_or(DEFAULT_FPS),
                ),
                Some(
                    self.frames
                        .or_else(|| preset.and_then(|p| p.frames))
                        .unwrap_or(DEFAULT_FRAMES),
                ),
            ),
        };

        GenerationParams {
            media_kind: self.media_kind,
            prompt: self.prompt.clone(),
            negative_prompt: self.negative_prompt.clone(),
            model_id,
            steps: self
                .steps
                .or_else(|| preset.and_then(|p| p.steps))
                .unwrap_or(DEFAULT_STEPS),
            guidance: self
                .guidance
                .or_else(|| preset.and_then(|p| p.guidance))
                .unwrap_or(DEFAULT_GUIDANCE),
            sampler: self
                .sampler
                .clone()
                .or_else(|| preset.and_then(|p| p.sampler.clone()))
                .unwrap_or_else(|| DEFAULT_SAMPLER.to_string()),
            width: self
                .width
                .or_else(|| preset.and_then(|p| p.width))
                .unwrap_or(DEFAULT_SIDE),
            height: self
                .height
                .or_else(|| preset.and_then(|p| p.height))
                .unwrap_or(DEFAULT_SIDE),
            fps,
            frames,
            upscale: self.upscale,
            extra: preset.map(|p| p.extra.clone()).unwrap_or_default(),
        }
    }
}

/// Fully resolved parameters shared by every unit of a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationParams {
    /// Image or video
    pub media_kind: MediaKind,
    /// Prompt text
    pub prompt: String,
    /// Negative prompt
    pub negative_prompt: Option<String>,
    /// Model identifier
    pub model_id: String,
    /// Inference steps
    pub steps: u32,
    /// Guidance value
    pub guidance: f64,
    /// Sampler name
    pub sampler: String,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Frames per second (video)
    pub fps: Option<u32>,
    /// Frame count (video)
    pub frames: Option<u32>,
    /// Upscaling requested
    pub upscale: bool,
    /// Preset parameters passed through to the provider
    #[serde(default)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Seeds for `count` units: `base + i` when a base is given, random otherwise.
///
/// # Examples
///
/// ```
/// use atelier_core::derive_seeds;
///
/// let seeds = derive_seeds(Some(100), 4, &mut rand::thread_rng());
/// assert_eq!(seeds, vec![100, 101, 102, 103]);
/// ```
pub fn derive_seeds<R: Rng + ?Sized>(base: Option<u64>, count: u32, rng: &mut R) -> Vec<u64> {
    match base {
        Some(base) => (0..count).map(|i| base.wrapping_add(u64::from(i))).collect(),
        None => (0..count)
            .map(|_| rng.gen_range(0..=u64::from(u32::MAX)))
            .collect(),
    }
}
