//! Image slideshow against a narration track.
//!
//! Uses the concat demuxer: a list file names each image with a fixed
//! display duration, and the audio is muxed in with `-shortest`.

use std::path::{Path, PathBuf};

use crate::command::{FfmpegCommand, FfmpegInput};
use crate::error::{MediaError, MediaResult};

/// Default display time per image, in seconds.
pub const DEFAULT_SECONDS_PER_IMAGE: u32 = 3;

#[derive(Debug, Clone)]
pub struct SlideshowComposition {
    pub images: Vec<PathBuf>,
    pub audio: PathBuf,
    pub seconds_per_image: u32,
}

impl SlideshowComposition {
    pub fn new(images: Vec<PathBuf>, audio: impl AsRef<Path>) -> Self {
        Self {
            images,
            audio: audio.as_ref().to_path_buf(),
            seconds_per_image: DEFAULT_SECONDS_PER_IMAGE,
        }
    }

    pub fn with_seconds_per_image(mut self, seconds: u32) -> Self {
        self.seconds_per_image = seconds.max(1);
        self
    }

    /// Concat demuxer list contents.
    ///
    /// The last image is listed twice so its duration is honoured.
    pub fn concat_list(&self) -> MediaResult<String> {
        let last = self
            .images
            .last()
            .ok_or_else(|| MediaError::invalid_composition("slideshow has no images"))?;

        let mut list = String::new();
        for image in &self.images {
            list.push_str(&format!("file '{}'\n", escape_path(image)));
            list.push_str(&format!("duration {}\n", self.seconds_per_image));
        }
        list.push_str(&format!("file '{}'\n", escape_path(last)));
        Ok(list)
    }

    /// Write the list file next to the images.
    pub async fn write_list(&self, list_path: impl AsRef<Path>) -> MediaResult<()> {
        tokio::fs::write(list_path.as_ref(), self.concat_list()?).await?;
        Ok(())
    }

    pub fn build_command(
        &self,
        list_path: impl AsRef<Path>,
        output: impl AsRef<Path>,
    ) -> FfmpegCommand {
        FfmpegCommand::new(output)
            .input(
                FfmpegInput::new(list_path)
                    .arg("-f")
                    .arg("concat")
                    .arg("-safe")
                    .arg("0"),
            )
            .input(FfmpegInput::new(&self.audio))
            .video_codec("libx264")
            .pixel_format("yuv420p")
            .audio_codec("aac")
            .output_arg("-shortest")
    }
}

fn escape_path(path: &Path) -> String {
    path.to_string_lossy().replace('\'', r"'\''")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_concat_list_durations() {
        let show = SlideshowComposition::new(
            vec![PathBuf::from("/s/panel_1.png"), PathBuf::from("/s/panel_2.png")],
            "/s/voice.wav",
        );
        assert_eq!(
            show.concat_list().unwrap(),
            "file '/s/panel_1.png'\nduration 3\nfile '/s/panel_2.png'\nduration 3\nfile '/s/panel_2.png'\n"
        );
    }

    #[test]
    fn test_command_uses_shortest_and_audio() {
        let show = SlideshowComposition::new(vec![PathBuf::from("/s/p.png")], "/s/voice.wav")
            .with_seconds_per_image(5);
        let cmd = show.build_command("/s/list.txt", "/s/out.mp4");
        let args = cmd.build_args();

        assert_eq!(cmd.inputs().len(), 2);
        assert!(args.contains(&"-shortest".to_string()));
        assert_eq!(cmd.inputs()[0].args, vec!["-f", "concat", "-safe", "0"]);
        assert!(show.concat_list().unwrap().contains("duration 5"));
    }

    #[test]
    fn test_empty_slideshow_is_rejected() {
        let show = SlideshowComposition::new(vec![], "/s/voice.wav");
        assert!(show.concat_list().is_err());
    }

    #[tokio::test]
    async fn test_write_list() {
        let dir = tempfile::tempdir().unwrap();
        let list = dir.path().join("list.txt");
        let show = SlideshowComposition::new(vec![dir.path().join("a.png")], dir.path().join("v.wav"));
        show.write_list(&list).await.unwrap();
        let written = std::fs::read_to_string(&list).unwrap();
        assert!(written.starts_with("file '"));
    }
}
