//! Compositor seam used by the render engine and the narrative pipeline.

use std::path::Path;

use async_trait::async_trait;
use tracing::info;

use crate::command::FfmpegRunner;
use crate::composition::TimelineComposition;
use crate::error::MediaResult;
use crate::probe::probe_duration;
use crate::slideshow::SlideshowComposition;

/// Runs compositing jobs against local files.
#[async_trait]
pub trait MediaCompositor: Send + Sync {
    /// Composite timeline clips into `output`.
    async fn compose_timeline(&self, composition: &TimelineComposition, output: &Path) -> MediaResult<()>;

    /// Render images against an audio track into `output`. `work_dir` receives
    /// the intermediate list file.
    async fn compose_slideshow(
        &self,
        slideshow: &SlideshowComposition,
        work_dir: &Path,
        output: &Path,
    ) -> MediaResult<()>;

    /// Duration of a media file in seconds.
    async fn probe_duration(&self, path: &Path) -> MediaResult<f64>;
}

/// FFmpeg-backed compositor.
#[derive(Debug, Clone, Default)]
pub struct FfmpegCompositor {
    runner: FfmpegRunner,
}

#[async_trait]
impl MediaCompositor for FfmpegCompositor {
    async fn compose_timeline(&self, composition: &TimelineComposition, output: &Path) -> MediaResult<()> {
        let cmd = composition.build_command(output)?;
        info!(
            inputs = cmd.inputs().len(),
            output = %output.display(),
            "Compositing timeline"
        );
        self.runner.run(&cmd).await
    }

    async fn compose_slideshow(
        &self,
        slideshow: &SlideshowComposition,
        work_dir: &Path,
        output: &Path,
    ) -> MediaResult<()> {
        let list_path = work_dir.join("images.txt");
        slideshow.write_list(&list_path).await?;

        let cmd = slideshow.build_command(&list_path, output);
        info!(
            images = slideshow.images.len(),
            output = %output.display(),
            "Compositing slideshow"
        );
        self.runner.run(&cmd).await
    }

    async fn probe_duration(&self, path: &Path) -> MediaResult<f64> {
        probe_duration(path).await
    }
}
