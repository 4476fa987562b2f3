//! Request validation.

use atelier_core::{GenerationParams, MediaKind};
use atelier_error::RequestError;

/// Check resolved parameters before anything is charged or submitted.
///
/// # Errors
///
/// A [`RequestError`] naming the first offending field.
pub fn validate_request(
    params: &GenerationParams,
    units: u32,
    max_units: u32,
) -> Result<(), RequestError> {
    if params.prompt.trim().is_empty() {
        return Err(RequestError::invalid("prompt", "must not be empty"));
    }
    if units == 0 {
        return Err(RequestError::invalid("units", "must be at least 1"));
    }
    if units > max_units {
        return Err(RequestError::invalid(
            "units",
            format!("at most {} units per request", max_units),
        ));
    }
    for (field, value) in [("width", params.width), ("height", params.height)] {
        if value == 0 || value % 8 != 0 {
            return Err(RequestError::invalid(
                field,
                format!("{} is not a positive multiple of 8", value),
            ));
        }
    }
    if params.steps == 0 {
        return Err(RequestError::invalid("steps", "must be positive"));
    }
    if params.media_kind == MediaKind::Video {
        if params.fps.unwrap_or(0) == 0 {
            return Err(RequestError::invalid("fps", "video requires a positive fps"));
        }
        if params.frames.unwrap_or(0) == 0 {
            return Err(RequestError::invalid("frames", "video requires a frame count"));
        }
    }
    Ok(())
}
