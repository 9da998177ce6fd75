//! FFmpeg CLI wrapper for video compositing.
//!
//! This crate provides:
//! - Type-safe multi-input FFmpeg command building
//! - Effect filter synthesis and timeline filter graphs
//! - Concat-demuxer slideshows against a narration track
//! - FFprobe duration lookup
//! - The [`MediaCompositor`] seam with an FFmpeg implementation

pub mod command;
pub mod composition;
pub mod compositor;
pub mod error;
pub mod filters;
pub mod probe;
pub mod slideshow;

pub use command::{FfmpegCommand, FfmpegInput, FfmpegRunner};
pub use composition::{ClipSource, CompositionClip, EncodeProfile, FilterPlan, TimelineComposition};
pub use compositor::{FfmpegCompositor, MediaCompositor};
pub use error::{MediaError, MediaResult};
pub use filters::{clip_filter_chain, effect_filter, fmt_seconds};
pub use probe::probe_duration;
pub use slideshow::{SlideshowComposition, DEFAULT_SECONDS_PER_IMAGE};

/// Whether FFmpeg and FFprobe are on the PATH.
pub fn tools_available() -> bool {
    which::which("ffmpeg").is_ok() && which::which("ffprobe").is_ok()
}
