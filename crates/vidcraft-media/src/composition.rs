//! Timeline compositing: many clips in, one encoded video out.
//!
//! Every visual clip becomes one FFmpeg input. Clips with effects get a
//! filter stage `[i:v]<chain>[vi]`. More than one clip is joined by a single
//! `concat` stage in clip order; a lone clip is mapped directly. When several
//! clips are joined and the output size is known, each clip is scaled to it
//! first, since `concat` needs matching frame sizes.

use std::path::{Path, PathBuf};

use vidcraft_models::ClipEffect;

use crate::command::{FfmpegCommand, FfmpegInput};
use crate::error::{MediaError, MediaResult};
use crate::filters::clip_filter_chain;

/// Label of the concatenated output stream.
pub const CONCAT_OUTPUT: &str = "[vout]";

/// How a clip's material is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClipSource {
    /// Trimmed window of a video file
    Video,
    /// Still image held for the clip duration
    Image,
}

/// One clip resolved to a local file.
#[derive(Debug, Clone, PartialEq)]
pub struct CompositionClip {
    pub source: ClipSource,
    pub path: PathBuf,
    pub start: f64,
    pub duration: f64,
    pub effects: Vec<ClipEffect>,
}

impl CompositionClip {
    fn to_input(&self) -> FfmpegInput {
        match self.source {
            ClipSource::Video => FfmpegInput::new(&self.path)
                .seek(self.start)
                .duration(self.duration),
            ClipSource::Image => FfmpegInput::new(&self.path).looped().duration(self.duration),
        }
    }
}

/// Fixed video encode settings.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodeProfile {
    pub video_codec: String,
    pub preset: String,
    pub crf: u8,
    pub pixel_format: String,
}

impl Default for EncodeProfile {
    fn default() -> Self {
        Self {
            video_codec: "libx264".to_string(),
            preset: "fast".to_string(),
            crf: 23,
            pixel_format: "yuv420p".to_string(),
        }
    }
}

/// Filter graph and the stream to map into the output.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterPlan {
    pub graph: Option<String>,
    pub map: String,
}

/// A full compositing job.
#[derive(Debug, Clone)]
pub struct TimelineComposition {
    pub clips: Vec<CompositionClip>,
    /// Output size as `WxH`
    pub resolution: Option<String>,
    pub frame_rate: Option<u32>,
    pub profile: EncodeProfile,
}

impl TimelineComposition {
    pub fn new(clips: Vec<CompositionClip>) -> Self {
        Self {
            clips,
            resolution: None,
            frame_rate: None,
            profile: EncodeProfile::default(),
        }
    }

    pub fn with_resolution(mut self, resolution: Option<String>) -> Self {
        self.resolution = resolution.filter(|r| !r.trim().is_empty());
        self
    }

    pub fn with_frame_rate(mut self, frame_rate: Option<u32>) -> Self {
        self.frame_rate = frame_rate.filter(|r| *r > 0);
        self
    }

    pub fn filter_plan(&self) -> MediaResult<FilterPlan> {
        if self.clips.is_empty() {
            return Err(MediaError::invalid_composition("no clips to composite"));
        }

        let mut stages = Vec::new();
        let mut labels = Vec::with_capacity(self.clips.len());

        let normalize = if self.clips.len() > 1 { self.scale_filter() } else { None };

        for (i, clip) in self.clips.iter().enumerate() {
            let chain = match (clip_filter_chain(&clip.effects, clip.duration), &normalize) {
                (Some(chain), Some(scale)) => Some(format!("{chain},{scale}")),
                (Some(chain), None) => Some(chain),
                (None, Some(scale)) => Some(scale.clone()),
                (None, None) => None,
            };
            match chain {
                Some(chain) => {
                    stages.push(format!("[{i}:v]{chain}[v{i}]"));
                    labels.push(format!("[v{i}]"));
                }
                None => labels.push(format!("[{i}:v]")),
            }
        }

        if labels.len() > 1 {
            stages.push(format!(
                "{}concat=n={}:v=1:a=0{}",
                labels.concat(),
                labels.len(),
                CONCAT_OUTPUT
            ));
            return Ok(FilterPlan {
                graph: Some(stages.join(";")),
                map: CONCAT_OUTPUT.to_string(),
            });
        }

        if stages.is_empty() {
            Ok(FilterPlan {
                graph: None,
                map: "0:v".to_string(),
            })
        } else {
            Ok(FilterPlan {
                graph: Some(stages.join(";")),
                map: labels.remove(0),
            })
        }
    }

    /// `scale=W:H,setsar=1` for a well-formed `WxH` resolution.
    fn scale_filter(&self) -> Option<String> {
        let (width, height) = self.resolution.as_deref()?.trim().split_once('x')?;
        let width: u32 = width.parse().ok().filter(|w| *w > 0)?;
        let height: u32 = height.parse().ok().filter(|h| *h > 0)?;
        Some(format!("scale={width}:{height},setsar=1"))
    }

    /// Build the single FFmpeg invocation for this composition.
    pub fn build_command(&self, output: impl AsRef<Path>) -> MediaResult<FfmpegCommand> {
        let plan = self.filter_plan()?;

        let mut cmd = self
            .clips
            .iter()
            .fold(FfmpegCommand::new(output), |cmd, clip| cmd.input(clip.to_input()));

        if let Some(graph) = plan.graph {
            cmd = cmd.filter_complex(graph);
        }
        cmd = cmd
            .map(plan.map)
            .video_codec(self.profile.video_codec.clone())
            .preset(self.profile.preset.clone())
            .crf(self.profile.crf)
            .pixel_format(self.profile.pixel_format.clone());

        if let Some(resolution) = &self.resolution {
            cmd = cmd.output_arg("-s").output_arg(resolution.clone());
        }
        if let Some(rate) = self.frame_rate {
            cmd = cmd.output_arg("-r").output_arg(rate.to_string());
        }

        Ok(cmd)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn video(name: &str, effects: Vec<ClipEffect>) -> CompositionClip {
        CompositionClip {
            source: ClipSource::Video,
            path: PathBuf::from(format!("/work/{name}.mp4")),
            start: 1.0,
            duration: 4.0,
            effects,
        }
    }

    fn count(args: &[String], flag: &str) -> usize {
        args.iter().filter(|a| a.as_str() == flag).count()
    }

    #[test]
    fn test_single_plain_clip_maps_directly() {
        let comp = TimelineComposition::new(vec![video("a", vec![])]);
        let cmd = comp.build_command("/work/out.mp4").unwrap();
        let args = cmd.build_args();

        assert_eq!(cmd.inputs().len(), 1);
        assert_eq!(count(&args, "-filter_complex"), 0);
        assert_eq!(cmd.output_value("-map"), Some("0:v"));
        assert!(!args.iter().any(|a| a.contains("concat")));
    }

    #[test]
    fn test_single_filtered_clip_maps_its_label() {
        let comp = TimelineComposition::new(vec![video("a", vec![ClipEffect::Grayscale])]);
        let plan = comp.filter_plan().unwrap();
        assert_eq!(plan.graph.as_deref(), Some("[0:v]hue=s=0[v0]"));
        assert_eq!(plan.map, "[v0]");
    }

    #[test]
    fn test_many_clips_concat_once_in_order() {
        let comp = TimelineComposition::new(vec![
            video("a", vec![]),
            video("b", vec![ClipEffect::FadeOut { duration: 1.0 }]),
            CompositionClip {
                source: ClipSource::Image,
                path: PathBuf::from("/work/c.png"),
                start: 0.0,
                duration: 2.0,
                effects: vec![],
            },
        ]);
        let cmd = comp.build_command("/work/out.mp4").unwrap();
        let args = cmd.build_args();

        assert_eq!(cmd.inputs().len(), 3);
        assert_eq!(count(&args, "-i"), 3);
        let graph = cmd.output_value("-filter_complex").unwrap();
        assert_eq!(
            graph,
            "[1:v]fade=t=out:st=3.00:d=1.00[v1];[0:v][v1][2:v]concat=n=3:v=1:a=0[vout]"
        );
        assert_eq!(graph.matches("concat=").count(), 1);
        assert_eq!(cmd.output_value("-map"), Some("[vout]"));
    }

    #[test]
    fn test_joined_clips_are_scaled_to_output_size() {
        let comp = TimelineComposition::new(vec![
            video("a", vec![ClipEffect::Grayscale]),
            video("b", vec![]),
        ])
        .with_resolution(Some("1280x720".into()));
        let plan = comp.filter_plan().unwrap();

        assert_eq!(
            plan.graph.as_deref(),
            Some(
                "[0:v]hue=s=0,scale=1280:720,setsar=1[v0];\
                 [1:v]scale=1280:720,setsar=1[v1];\
                 [v0][v1]concat=n=2:v=1:a=0[vout]"
            )
        );
    }

    #[test]
    fn test_single_clip_and_bad_resolution_are_not_scaled() {
        let single = TimelineComposition::new(vec![video("a", vec![])])
            .with_resolution(Some("1280x720".into()));
        assert_eq!(single.filter_plan().unwrap().graph, None);

        let malformed = TimelineComposition::new(vec![video("a", vec![]), video("b", vec![])])
            .with_resolution(Some("hd".into()));
        assert_eq!(
            malformed.filter_plan().unwrap().graph.as_deref(),
            Some("[0:v][1:v]concat=n=2:v=1:a=0[vout]")
        );
    }

    #[test]
    fn test_inputs_are_trimmed_or_looped() {
        let comp = TimelineComposition::new(vec![
            video("a", vec![]),
            CompositionClip {
                source: ClipSource::Image,
                path: PathBuf::from("/work/still.jpg"),
                start: 0.0,
                duration: 3.0,
                effects: vec![],
            },
        ]);
        let cmd = comp.build_command("/work/out.mp4").unwrap();
        assert_eq!(cmd.inputs()[0].args, vec!["-ss", "1.000", "-t", "4.000"]);
        assert_eq!(cmd.inputs()[1].args, vec!["-loop", "1", "-t", "3.000"]);
    }

    #[test]
    fn test_encode_profile_and_resolution() {
        let comp = TimelineComposition::new(vec![video("a", vec![])])
            .with_resolution(Some("1280x720".into()))
            .with_frame_rate(Some(30));
        let cmd = comp.build_command("/work/out.mkv").unwrap();

        assert_eq!(cmd.output_value("-c:v"), Some("libx264"));
        assert_eq!(cmd.output_value("-preset"), Some("fast"));
        assert_eq!(cmd.output_value("-crf"), Some("23"));
        assert_eq!(cmd.output_value("-pix_fmt"), Some("yuv420p"));
        assert_eq!(cmd.output_value("-s"), Some("1280x720"));
        assert_eq!(cmd.output_value("-r"), Some("30"));
        assert!(cmd.build_args().last().unwrap().ends_with("out.mkv"));
    }

    #[test]
    fn test_empty_composition_is_rejected() {
        let comp = TimelineComposition::new(vec![]);
        assert!(matches!(
            comp.build_command("/work/out.mp4"),
            Err(MediaError::InvalidComposition(_))
        ));
    }
}
