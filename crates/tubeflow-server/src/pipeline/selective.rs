//! Selective job: render one recommendation into a video
//!
//! Reuses the main run's recommendation list without recomputing any of the
//! analysis. Numbered independently as `"Step k/4"`.

use async_trait::async_trait;
use chrono::Utc;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use super::config::PipelineConfig;
use super::error::{AdmissionError, StageError};
use super::file_component;
use super::framework::{
    step_detail, Collaborators, ContentStrategist, FormattedScript, PipelineState,
    ProgressSnapshot, ProgressStore, Recommendation, RenderTarget, Stage, StageSequence,
    StageState, StepFailure, StepProgress, VideoRenderer, VideoScript,
};
use super::script;

/// A recommendation picked out of the current snapshot
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub index: usize,
    pub channel_id: String,
    pub recommendation: Recommendation,
}

impl Selection {
    /// Pick recommendation `index` from a snapshot
    ///
    /// `NotReady` only while no main run has published a list; an empty list
    /// makes every index out of range.
    pub fn from_snapshot(snapshot: &ProgressSnapshot, index: i64) -> Result<Self, AdmissionError> {
        let recommendations = snapshot
            .recommendations
            .as_ref()
            .ok_or(AdmissionError::NotReady)?;

        let out_of_range = AdmissionError::InvalidIndex {
            index,
            len: recommendations.len(),
        };
        let index = usize::try_from(index).map_err(|_| out_of_range.clone())?;
        let recommendation = recommendations.get(index).cloned().ok_or(out_of_range)?;

        Ok(Self {
            index,
            channel_id: snapshot
                .channel_id
                .clone()
                .unwrap_or_else(|| "channel".to_string()),
            recommendation,
        })
    }
}

/// Working state of one selective job
#[derive(Debug)]
pub struct SelectiveState {
    pub selection: Selection,
    pub target: RenderTarget,
    pub script: Option<VideoScript>,
    pub formatted: Option<FormattedScript>,
    pub video_path: Option<PathBuf>,
    pub video_url: Option<String>,
}

impl StageState for SelectiveState {}

// ============================================================================
// Stages
// ============================================================================

struct WriteScript {
    strategist: Arc<dyn ContentStrategist>,
}

#[async_trait]
impl Stage<SelectiveState> for WriteScript {
    fn label(&self) -> &str {
        "Writing script"
    }

    async fn run(&self, state: &mut SelectiveState) -> Result<(), StageError> {
        let script = self
            .strategist
            .write_script(&state.selection.recommendation)
            .await?;
        info!(sections = script.sections.len(), "Script written");
        state.script = Some(script);
        Ok(())
    }
}

struct FormatScript {
    section_duration_secs: f64,
}

#[async_trait]
impl Stage<SelectiveState> for FormatScript {
    fn label(&self) -> &str {
        "Formatting script for production"
    }

    async fn run(&self, state: &mut SelectiveState) -> Result<(), StageError> {
        let raw = state.script.take().unwrap_or_default();
        let formatted = script::format_script(&raw, self.section_duration_secs);
        state.script = Some(raw);
        state.formatted = Some(formatted);
        Ok(())
    }
}

struct RenderVideo {
    renderer: Arc<dyn VideoRenderer>,
}

#[async_trait]
impl Stage<SelectiveState> for RenderVideo {
    fn label(&self) -> &str {
        "Rendering video"
    }

    async fn run(&self, state: &mut SelectiveState) -> Result<(), StageError> {
        let formatted = state
            .formatted
            .as_ref()
            .ok_or_else(|| StageError::render("no formatted script to render"))?;

        tokio::fs::create_dir_all(&state.target.output_dir).await?;
        let path = self.renderer.render(formatted, &state.target).await?;

        info!(path = %path.display(), "Video rendered");
        state.video_path = Some(path);
        Ok(())
    }
}

struct PublishArtifact {
    config: Arc<PipelineConfig>,
}

#[async_trait]
impl Stage<SelectiveState> for PublishArtifact {
    fn label(&self) -> &str {
        "Publishing artifact"
    }

    async fn run(&self, state: &mut SelectiveState) -> Result<(), StageError> {
        let rendered = state
            .video_path
            .clone()
            .ok_or_else(|| StageError::render("renderer returned no file"))?;

        // Everything served to clients must live in the output directory.
        let published = if rendered.starts_with(&state.target.output_dir) {
            rendered
        } else {
            let inside = state.target.video_path();
            tokio::fs::copy(&rendered, &inside).await?;
            inside
        };

        if let Some(ref formatted) = state.formatted {
            let body = serde_json::to_vec_pretty(formatted)?;
            tokio::fs::write(state.target.script_path(), body).await?;
        }

        let file_name = published
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| StageError::render("rendered file has no usable name"))?;
        let url = self.config.output_url(file_name);

        info!(url = %url, "Artifact published");
        state.video_url = Some(url);
        state.video_path = Some(published);
        Ok(())
    }
}

// ============================================================================
// Runner
// ============================================================================

/// Drives selective jobs against the shared progress store
pub struct SelectiveJobRunner {
    store: ProgressStore,
    sequence: StageSequence<SelectiveState>,
    output_dir: PathBuf,
}

impl SelectiveJobRunner {
    pub fn new(
        store: ProgressStore,
        collaborators: &Collaborators,
        config: Arc<PipelineConfig>,
    ) -> Self {
        let sequence = StageSequence::new()
            .then(WriteScript {
                strategist: collaborators.strategist.clone(),
            })
            .then(FormatScript {
                section_duration_secs: config.section_duration_secs,
            })
            .then(RenderVideo {
                renderer: collaborators.renderer.clone(),
            })
            .then(PublishArtifact {
                config: config.clone(),
            });

        Self {
            store,
            sequence,
            output_dir: config.output_dir.clone(),
        }
    }

    pub fn total_steps(&self) -> u32 {
        self.sequence.total()
    }

    /// Write the initial snapshot of a selective job
    ///
    /// An index outside the current recommendations produces an `Error`
    /// snapshot carrying that index and runs nothing.
    pub fn begin(&self, index: usize) -> Result<Selection, StageError> {
        let requested = i64::try_from(index).unwrap_or(i64::MAX);
        match Selection::from_snapshot(&self.store.read(), requested) {
            Ok(selection) => {
                self.enter(&selection);
                Ok(selection)
            }
            Err(err) => {
                warn!(index, reason = %err, "Rejecting selective job");
                self.store.update(|snapshot| {
                    snapshot.target_index = Some(index);
                    snapshot.progress = None;
                    snapshot.fail(
                        format!("Video generation failed: {}", StageError::InvalidIndex),
                        StageError::InvalidIndex.to_string(),
                    );
                });
                Err(StageError::InvalidIndex)
            }
        }
    }

    /// Enter step 1 for an already validated selection
    pub fn enter(&self, selection: &Selection) {
        let total = self.total_steps();
        let detail = step_detail(1, total, self.sequence.label(1));
        self.store.update(|snapshot| {
            snapshot.state = PipelineState::GeneratingVideo;
            snapshot.target_index = Some(selection.index);
            snapshot.detail = detail;
            snapshot.progress = Some(StepProgress::new(1, total));
            snapshot.last_error = None;
        });
    }

    /// Run every stage for a selection and write the terminal snapshot
    ///
    /// Returns the public URL of the rendered video.
    #[tracing::instrument(skip(self, selection), fields(index = selection.index))]
    pub async fn execute(&self, selection: Selection) -> Result<String, StageError> {
        let index = selection.index;
        let target = RenderTarget {
            output_dir: self.output_dir.clone(),
            file_stem: format!(
                "video_{}_option_{}_{}",
                file_component(&selection.channel_id),
                index + 1,
                Utc::now().format("%Y%m%d_%H%M%S")
            ),
        };
        let mut state = SelectiveState {
            selection,
            target,
            script: None,
            formatted: None,
            video_path: None,
            video_url: None,
        };
        let total = self.total_steps();

        let outcome = self
            .sequence
            .execute(&self.store, &mut state)
            .await
            .and_then(|()| {
                state.video_url.take().ok_or_else(|| StepFailure {
                    step: total,
                    total,
                    label: self.sequence.label(total).to_string(),
                    error: StageError::render("artifact was not published"),
                })
            });

        match outcome {
            Ok(url) => {
                let detail = step_detail(total, total, self.sequence.label(total));
                let published = url.clone();
                self.store.update(|snapshot| {
                    snapshot.state = PipelineState::Completed;
                    snapshot.target_index = Some(index);
                    snapshot.detail = detail;
                    snapshot.progress = Some(StepProgress::new(total, total));
                    snapshot.video_artifacts.insert(index, published);
                });
                info!(url = %url, "Selective job completed");
                Ok(url)
            }
            Err(failure) => {
                let detail = failure.detail("Video generation");
                let cause = failure.error.to_string();
                self.store.update(|snapshot| {
                    snapshot.target_index = Some(index);
                    snapshot.fail(detail, cause);
                });
                warn!(step = failure.step, error = %failure.error, "Selective job failed");
                Err(failure.error)
            }
        }
    }

    /// Begin and execute in one call
    pub async fn run(&self, index: usize) -> Result<String, StageError> {
        let selection = self.begin(index)?;
        self.execute(selection).await
    }
}
