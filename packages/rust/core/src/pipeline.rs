//! End-to-end generation pipeline: topic → subtopic discovery → per-subtopic
//! collect → synthesize → index → store.
//!
//! The orchestrator owns its gateways and store and runs subtopics strictly
//! in sequence. A subtopic failure marks that row `failed` and moves on;
//! only discovery and the final status write are job-fatal.

use std::time::{Duration, Instant};

use chrono::Utc;
use tracing::{info, instrument, warn};

use lessonforge_collector::{collect_sources, CollectOptions};
use lessonforge_discovery::{discover_subtopics, DiscoveryOptions};
use lessonforge_gateways::{CompletionGateway, SearchGateway};
use lessonforge_index::build_index;
use lessonforge_shared::{
    JobId, JobStatus, KnowledgeRecord, LessonForgeError, Result, ScalePreset, SourceProvenance,
    SubtopicStatus, WebSource,
};
use lessonforge_storage::{JobStore, SubtopicUpdate};
use lessonforge_synthesis::{synthesize, SynthesisOptions};

use crate::progress::{emit, ProgressEvent, ProgressReporter};

/// Everything one generation run needs beyond the job row itself.
#[derive(Debug, Clone)]
pub struct JobSpec {
    /// Topic to build a knowledge base for.
    pub topic: String,
    pub scale: ScalePreset,
    /// Proficiency level tag (e.g. "B1").
    pub level: Option<String>,
    /// Target language for language-learning runs.
    pub language: Option<String>,
    /// Caller-supplied subtopic list; bypasses discovery when non-empty.
    pub subtopics: Vec<String>,
    /// Reference URLs seeded ahead of search hits for every subtopic.
    pub pinned_urls: Vec<String>,
    pub include_exercises: bool,
    /// Curated quality-domain allow-list for source collection.
    pub domain_allowlist: Vec<String>,
}

impl JobSpec {
    pub fn new(topic: impl Into<String>, scale: ScalePreset) -> Self {
        Self {
            topic: topic.into(),
            scale,
            level: None,
            language: None,
            subtopics: Vec::new(),
            pinned_urls: Vec::new(),
            include_exercises: true,
            domain_allowlist: Vec::new(),
        }
    }
}

/// Result of one generation run.
#[derive(Debug, Clone)]
pub struct JobReport {
    pub job_id: JobId,
    /// Subtopics that produced a knowledge record.
    pub completed: usize,
    /// Subtopics that failed; their rows carry the error message.
    pub failed: usize,
    pub total: usize,
    pub elapsed: Duration,
}

struct SubtopicOutcome {
    source_count: usize,
    word_count: usize,
}

/// Sequential generation driver over injected gateways and store.
pub struct Orchestrator<C, S, J> {
    completion: C,
    search: S,
    store: J,
}

impl<C, S, J> Orchestrator<C, S, J>
where
    C: CompletionGateway,
    S: SearchGateway,
    J: JobStore,
{
    pub fn new(completion: C, search: S, store: J) -> Self {
        Self {
            completion,
            search,
            store,
        }
    }

    pub fn store(&self) -> &J {
        &self.store
    }

    /// Run one job end to end. The job row must already exist.
    #[instrument(skip_all, fields(job_id = %job_id, topic = %spec.topic, scale = %spec.scale.as_str()))]
    pub async fn run_job(
        &self,
        job_id: &JobId,
        spec: &JobSpec,
        progress: &dyn ProgressReporter,
    ) -> Result<JobReport> {
        let start = Instant::now();
        info!("starting generation run");

        self.store
            .update_job_status(job_id, JobStatus::Running)
            .await?;

        // --- Phase 1: resolve subtopics ---
        let subtopics = match self.resolve_subtopics(spec, progress).await {
            Ok(subtopics) => subtopics,
            Err(e) => {
                self.fail_job(job_id, progress, &e).await;
                return Err(e);
            }
        };

        if let Err(e) = self.store.set_subtopics(job_id, &subtopics).await {
            self.fail_job(job_id, progress, &e).await;
            return Err(e);
        }

        // --- Phase 2: per-subtopic fold ---
        let total = subtopics.len();
        let mut completed = 0usize;
        let mut failed = 0usize;

        for (i, name) in subtopics.iter().enumerate() {
            let current = i + 1;
            match self
                .process_subtopic(job_id, name, spec, current, total, progress)
                .await
            {
                Ok(outcome) => {
                    completed += 1;
                    emit(
                        progress,
                        ProgressEvent::subtopic(
                            "Completed",
                            name,
                            current,
                            total,
                            format!(
                                "{} words from {} sources",
                                outcome.word_count, outcome.source_count
                            ),
                        ),
                    );
                }
                Err(e) => {
                    failed += 1;
                    warn!(subtopic = %name, error = %e, "subtopic failed; continuing");
                    if let Err(store_err) = self
                        .store
                        .update_subtopic(job_id, name, SubtopicUpdate::failed(failure_reason(&e)))
                        .await
                    {
                        warn!(subtopic = %name, error = %store_err, "could not record failure");
                    }
                    emit(
                        progress,
                        ProgressEvent::subtopic("Failed", name, current, total, e.to_string()),
                    );
                }
            }
        }

        // --- Phase 3: finalize ---
        if let Err(e) = self
            .store
            .update_job_status(job_id, JobStatus::Completed)
            .await
        {
            // Leave the row `failed`, not stuck in `running`, so status
            // pollers can tell this run is over.
            self.fail_job(job_id, progress, &e).await;
            return Err(e);
        }

        let report = JobReport {
            job_id: job_id.clone(),
            completed,
            failed,
            total,
            elapsed: start.elapsed(),
        };
        emit(
            progress,
            ProgressEvent::done(format!(
                "{}/{} subtopics completed",
                report.completed, report.total
            )),
        );
        info!(
            completed = report.completed,
            failed = report.failed,
            elapsed_ms = report.elapsed.as_millis(),
            "generation run complete"
        );
        Ok(report)
    }

    /// Caller-supplied subtopics bypass discovery; otherwise ask the
    /// completion gateway. Discovery errors are job-fatal.
    async fn resolve_subtopics(
        &self,
        spec: &JobSpec,
        progress: &dyn ProgressReporter,
    ) -> Result<Vec<String>> {
        if !spec.subtopics.is_empty() {
            return Ok(spec.subtopics.clone());
        }

        emit(
            progress,
            ProgressEvent::phase("Discovering subtopics", spec.topic.clone()),
        );
        let options = DiscoveryOptions {
            level: spec.level.clone(),
            language: spec.language.clone(),
        };
        discover_subtopics(
            &self.completion,
            &spec.topic,
            spec.scale.subtopic_count(),
            &options,
        )
        .await
    }

    /// The store-free step chain for one subtopic, with progress-row writes
    /// at each phase boundary.
    async fn process_subtopic(
        &self,
        job_id: &JobId,
        name: &str,
        spec: &JobSpec,
        current: usize,
        total: usize,
        progress: &dyn ProgressReporter,
    ) -> Result<SubtopicOutcome> {
        emit(
            progress,
            ProgressEvent::subtopic("Collecting sources", name, current, total, ""),
        );
        self.store
            .update_subtopic(job_id, name, SubtopicUpdate::status(SubtopicStatus::Scraping))
            .await?;

        let collect_options = CollectOptions {
            pinned_urls: spec.pinned_urls.clone(),
            ..CollectOptions::for_scale(spec.scale, spec.domain_allowlist.clone())
        };
        let sources = collect_sources(&self.search, name, &spec.topic, &collect_options).await?;

        self.store
            .update_subtopic(
                job_id,
                name,
                SubtopicUpdate {
                    status: Some(SubtopicStatus::Synthesizing),
                    source_count: Some(sources.len()),
                    ..SubtopicUpdate::default()
                },
            )
            .await?;

        if sources.is_empty() {
            return Err(LessonForgeError::validation("No sources found"));
        }

        emit(
            progress,
            ProgressEvent::subtopic("Synthesizing lesson", name, current, total, ""),
        );
        let synthesis_options = SynthesisOptions {
            level: spec.level.clone(),
            language: spec.language.clone(),
            include_exercises: spec.include_exercises,
            scale: spec.scale,
        };
        let output = synthesize(
            &self.completion,
            name,
            &spec.topic,
            &sources,
            &synthesis_options,
        )
        .await?;

        self.store
            .update_subtopic(
                job_id,
                name,
                SubtopicUpdate {
                    status: Some(SubtopicStatus::Optimizing),
                    word_count: Some(output.word_count),
                    ..SubtopicUpdate::default()
                },
            )
            .await?;

        emit(
            progress,
            ProgressEvent::subtopic("Building retrieval index", name, current, total, ""),
        );
        let index = build_index(&output.document);

        let now = Utc::now();
        let record = KnowledgeRecord {
            source_id: format!("{}-{}", slug(name), now.timestamp_millis()),
            subtopic: name.to_string(),
            title: output.document.metadata.title.clone(),
            markdown: output.markdown,
            document: output.document,
            index,
            sources: capture_provenance(&sources),
            word_count: output.word_count,
            created_at: now,
        };
        self.store.append_content(job_id, &record).await?;
        self.store
            .update_subtopic(
                job_id,
                name,
                SubtopicUpdate::status(SubtopicStatus::Completed),
            )
            .await?;

        Ok(SubtopicOutcome {
            source_count: sources.len(),
            word_count: record.word_count,
        })
    }

    /// Best-effort `failed` mark for job-fatal errors; the original error is
    /// what propagates.
    async fn fail_job(&self, job_id: &JobId, progress: &dyn ProgressReporter, error: &LessonForgeError) {
        emit(progress, ProgressEvent::error(error.to_string()));
        if let Err(e) = self.store.update_job_status(job_id, JobStatus::Failed).await {
            warn!(error = %e, "could not mark job failed");
        }
    }
}

fn capture_provenance(sources: &[WebSource]) -> Vec<SourceProvenance> {
    let fetched_at = Utc::now();
    sources
        .iter()
        .map(|s| SourceProvenance::capture(s, fetched_at))
        .collect()
}

/// Reason stored on a failed subtopic row. Validation failures carry a
/// self-descriptive reason ("No sources found"), so the taxonomy prefix is
/// dropped; other errors keep their full display form.
fn failure_reason(error: &LessonForgeError) -> String {
    match error {
        LessonForgeError::Validation { message } => message.clone(),
        other => other.to_string(),
    }
}

/// Lowercased, dash-separated identifier fragment from a subtopic name.
fn slug(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut last_dash = true;
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_lowercase());
            last_dash = false;
        } else if !last_dash {
            out.push('-');
            last_dash = true;
        }
    }
    while out.ends_with('-') {
        out.pop();
    }
    out
}
