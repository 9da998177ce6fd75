//! Project timelines: ordered tracks of clips, each carrying ordered effects.
//!
//! Effects arrive in a loose wire form (`{type, name, params}`) and are
//! ingested once into the closed [`ClipEffect`] set. Anything outside that set
//! is dropped at ingestion.

use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashSet;
use tracing::debug;

use crate::error::{ModelError, ModelResult};

/// Fade length used when an effect does not carry a usable duration.
pub const DEFAULT_FADE_SECONDS: f64 = 1.0;

/// Kind of media a track holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum TrackKind {
    Video,
    Audio,
    Image,
}

impl TrackKind {
    /// Video and image tracks contribute to the composited picture.
    pub fn is_visual(&self) -> bool {
        matches!(self, TrackKind::Video | TrackKind::Image)
    }
}

/// Effect as it appears in a stored project config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, Default)]
pub struct EffectSpec {
    #[serde(rename = "type", default)]
    pub effect_type: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub params: serde_json::Map<String, serde_json::Value>,
}

/// Supported per-clip effects.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(into = "EffectSpec")]
pub enum ClipEffect {
    Grayscale,
    BoxBlur,
    Negate,
    FadeIn { duration: f64 },
    FadeOut { duration: f64 },
}

impl ClipEffect {
    /// Map a wire effect to a supported effect, or `None` if unsupported.
    pub fn from_spec(spec: &EffectSpec) -> Option<Self> {
        match (spec.effect_type.as_str(), spec.name.as_str()) {
            ("filter", "grayscale") => Some(ClipEffect::Grayscale),
            ("filter", "boxblur") => Some(ClipEffect::BoxBlur),
            ("filter", "negate") => Some(ClipEffect::Negate),
            ("transition", "fade") => {
                let duration = fade_duration(spec.params.get("duration"));
                match spec.params.get("position").and_then(|p| p.as_str()) {
                    Some("in") => Some(ClipEffect::FadeIn { duration }),
                    Some("out") => Some(ClipEffect::FadeOut { duration }),
                    _ => None,
                }
            }
            _ => None,
        }
    }
}

fn fade_duration(value: Option<&serde_json::Value>) -> f64 {
    let parsed = match value {
        Some(serde_json::Value::Number(n)) => n.as_f64(),
        Some(serde_json::Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed
        .filter(|d| d.is_finite() && *d > 0.0)
        .unwrap_or(DEFAULT_FADE_SECONDS)
}

impl From<ClipEffect> for EffectSpec {
    fn from(effect: ClipEffect) -> Self {
        let filter = |name: &str| EffectSpec {
            effect_type: "filter".to_string(),
            name: name.to_string(),
            params: Default::default(),
        };
        let fade = |position: &str, duration: f64| {
            let mut params = serde_json::Map::new();
            params.insert("position".to_string(), position.into());
            params.insert("duration".to_string(), duration.into());
            EffectSpec {
                effect_type: "transition".to_string(),
                name: "fade".to_string(),
                params,
            }
        };
        match effect {
            ClipEffect::Grayscale => filter("grayscale"),
            ClipEffect::BoxBlur => filter("boxblur"),
            ClipEffect::Negate => filter("negate"),
            ClipEffect::FadeIn { duration } => fade("in", duration),
            ClipEffect::FadeOut { duration } => fade("out", duration),
        }
    }
}

fn ingest_effects<'de, D>(deserializer: D) -> Result<Vec<ClipEffect>, D::Error>
where
    D: Deserializer<'de>,
{
    let specs: Option<Vec<EffectSpec>> = Option::deserialize(deserializer)?;
    Ok(specs
        .unwrap_or_default()
        .iter()
        .filter_map(|spec| {
            let effect = ClipEffect::from_spec(spec);
            if effect.is_none() {
                debug!(effect_type = %spec.effect_type, name = %spec.name, "Dropping unsupported effect");
            }
            effect
        })
        .collect())
}

/// A time window of one material.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Clip {
    pub material_id: String,
    /// Start offset into the material, in seconds
    pub start: f64,
    /// End offset into the material, in seconds
    pub end: f64,
    #[serde(default, deserialize_with = "ingest_effects")]
    #[schemars(with = "Vec<EffectSpec>")]
    pub effects: Vec<ClipEffect>,
}

impl Clip {
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Track {
    #[serde(rename = "type")]
    pub kind: TrackKind,
    #[serde(default)]
    pub clips: Vec<Clip>,
}

/// Declarative editing project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, Default)]
pub struct ProjectTimeline {
    #[serde(default)]
    pub tracks: Vec<Track>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame_rate: Option<u32>,
}

impl ProjectTimeline {
    /// Parse and validate a timeline stored as JSON.
    pub fn from_value(value: &serde_json::Value) -> ModelResult<Self> {
        let timeline: Self = serde_json::from_value(value.clone())?;
        timeline.validate()?;
        Ok(timeline)
    }

    pub fn from_json(raw: &str) -> ModelResult<Self> {
        let timeline: Self = serde_json::from_str(raw)?;
        timeline.validate()?;
        Ok(timeline)
    }

    fn validate(&self) -> ModelResult<()> {
        for (t, track) in self.tracks.iter().enumerate() {
            for (c, clip) in track.clips.iter().enumerate() {
                if clip.material_id.trim().is_empty() {
                    return Err(ModelError::invalid_timeline(format!(
                        "track {t} clip {c} has no material"
                    )));
                }
                if !clip.start.is_finite() || !clip.end.is_finite() || clip.start < 0.0 {
                    return Err(ModelError::invalid_timeline(format!(
                        "track {t} clip {c} has an invalid time window"
                    )));
                }
                if clip.end <= clip.start {
                    return Err(ModelError::invalid_timeline(format!(
                        "track {t} clip {c} ends at {} before it starts at {}",
                        clip.end, clip.start
                    )));
                }
            }
        }
        Ok(())
    }

    /// Distinct material ids referenced by any clip, in first-seen order.
    pub fn material_ids(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.tracks
            .iter()
            .flat_map(|track| track.clips.iter())
            .filter(|clip| seen.insert(clip.material_id.clone()))
            .map(|clip| clip.material_id.clone())
            .collect()
    }

    /// Clips of video and image tracks, in track then clip order.
    pub fn visual_clips(&self) -> Vec<(TrackKind, &Clip)> {
        self.tracks
            .iter()
            .filter(|track| track.kind.is_visual())
            .flat_map(|track| track.clips.iter().map(move |clip| (track.kind, clip)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_unknown_effects_are_dropped() {
        let timeline = ProjectTimeline::from_value(&json!({
            "tracks": [{
                "type": "video",
                "clips": [{
                    "material_id": "m1", "start": 0, "end": 4,
                    "effects": [
                        {"type": "filter", "name": "sepia"},
                        {"type": "filter", "name": "grayscale"},
                        {"type": "transition", "name": "wipe", "params": {"duration": 1}},
                        {"type": "transition", "name": "fade", "params": {"duration": 0.5, "position": "out"}},
                        {"type": "transition", "name": "fade", "params": {"duration": 2}}
                    ]
                }]
            }]
        }))
        .unwrap();

        let effects = &timeline.tracks[0].clips[0].effects;
        assert_eq!(
            effects,
            &vec![ClipEffect::Grayscale, ClipEffect::FadeOut { duration: 0.5 }]
        );
    }

    #[test]
    fn test_fade_duration_defaults() {
        let spec = |params: serde_json::Value| EffectSpec {
            effect_type: "transition".into(),
            name: "fade".into(),
            params: params.as_object().cloned().unwrap_or_default(),
        };
        assert_eq!(
            ClipEffect::from_spec(&spec(json!({"position": "in"}))),
            Some(ClipEffect::FadeIn { duration: 1.0 })
        );
        assert_eq!(
            ClipEffect::from_spec(&spec(json!({"position": "in", "duration": "1.5"}))),
            Some(ClipEffect::FadeIn { duration: 1.5 })
        );
        assert_eq!(
            ClipEffect::from_spec(&spec(json!({"position": "in", "duration": -3}))),
            Some(ClipEffect::FadeIn { duration: 1.0 })
        );
    }

    #[test]
    fn test_end_must_follow_start() {
        let err = ProjectTimeline::from_value(&json!({
            "tracks": [{"type": "video", "clips": [{"material_id": "m1", "start": 3, "end": 3}]}]
        }))
        .unwrap_err();
        assert!(matches!(err, ModelError::InvalidTimeline(_)));
    }

    #[test]
    fn test_unknown_track_type_is_rejected() {
        let err = ProjectTimeline::from_value(&json!({
            "tracks": [{"type": "subtitle", "clips": []}]
        }))
        .unwrap_err();
        assert!(matches!(err, ModelError::Json(_)));
    }

    #[test]
    fn test_material_ids_and_visual_clips() {
        let timeline = ProjectTimeline::from_json(
            r#"{
                "tracks": [
                    {"type": "audio", "clips": [{"material_id": "a1", "start": 0, "end": 9}]},
                    {"type": "video", "clips": [
                        {"material_id": "v1", "start": 0, "end": 2},
                        {"material_id": "v1", "start": 5, "end": 6}
                    ]},
                    {"type": "image", "clips": [{"material_id": "i1", "start": 0, "end": 3}]}
                ],
                "resolution": "1280x720"
            }"#,
        )
        .unwrap();

        assert_eq!(timeline.material_ids(), vec!["a1", "v1", "i1"]);
        let visual: Vec<_> = timeline
            .visual_clips()
            .into_iter()
            .map(|(kind, clip)| (kind, clip.material_id.as_str()))
            .collect();
        assert_eq!(
            visual,
            vec![
                (TrackKind::Video, "v1"),
                (TrackKind::Video, "v1"),
                (TrackKind::Image, "i1")
            ]
        );
    }

    #[test]
    fn test_effects_serialize_back_to_wire_form() {
        let value = serde_json::to_value(ClipEffect::FadeIn { duration: 2.0 }).unwrap();
        assert_eq!(value["type"], "transition");
        assert_eq!(value["params"]["position"], "in");
    }
}
