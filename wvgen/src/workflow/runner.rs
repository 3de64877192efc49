use crate::generator::profile::build_waveform;
use crate::sink::{FileSink, SpectrumSink};
use crate::workflow::config::JobConfig;
use anyhow::{anyhow, Context};
use iqwavecore::container::{EncodeOptions, MarkerLists, OverflowPolicy, WaveformFile};
use iqwavecore::synth::clip_amplitude;
use iqwavecore::telemetry::{LogManager, MetricsRecorder, MetricsSnapshot};
use iqwavecore::{Waveform, WaveformSink};
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Options shared read-only by every job of a run.
#[derive(Clone, Debug)]
pub struct RunOptions {
    pub output_dir: PathBuf,
    pub write_exchange: bool,
    pub overflow: OverflowPolicy,
    pub spectrum: bool,
    /// Clip every job, regardless of its own `clip` flag.
    pub clip: bool,
    /// Clipping level for waveforms that arrive without parameters.
    pub clip_level: f64,
    pub markers: MarkerLists,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            write_exchange: false,
            overflow: OverflowPolicy::Wrap,
            spectrum: false,
            clip: false,
            clip_level: 1.0,
            markers: MarkerLists::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStage {
    Generated,
    Encoded,
    Written,
    Failed,
}

impl fmt::Display for JobStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            JobStage::Generated => "generated",
            JobStage::Encoded => "encoded",
            JobStage::Written => "written",
            JobStage::Failed => "failed",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobEvent {
    pub job: String,
    pub stage: JobStage,
}

impl fmt::Display for JobEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.job, self.stage)
    }
}

pub type ProgressCallback = Arc<dyn Fn(&JobEvent) + Send + Sync>;

/// Summary of one finished job, as written to the JSON report.
#[derive(Debug, Clone, Serialize)]
pub struct JobResult {
    pub name: String,
    pub path: PathBuf,
    pub comment: String,
    pub samples: usize,
    pub sample_rate: f64,
    pub rms_db: f64,
    pub peak_db: f64,
    pub declared_len: usize,
    pub overflowed_samples: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub peak_frequency: Option<f64>,
}

pub struct JobOutcome {
    pub name: String,
    pub result: anyhow::Result<JobResult>,
}

#[derive(Debug, Serialize)]
pub struct JobFailure {
    pub name: String,
    pub error: String,
}

#[derive(Debug, Serialize)]
pub struct RunReport {
    pub jobs: Vec<JobResult>,
    pub failures: Vec<JobFailure>,
    pub metrics: MetricsSnapshot,
}

impl RunReport {
    pub fn new(outcomes: &[JobOutcome], metrics: MetricsSnapshot) -> Self {
        let mut jobs = Vec::new();
        let mut failures = Vec::new();
        for outcome in outcomes {
            match &outcome.result {
                Ok(result) => jobs.push(result.clone()),
                Err(err) => failures.push(JobFailure {
                    name: outcome.name.clone(),
                    error: format!("{:#}", err),
                }),
            }
        }
        Self {
            jobs,
            failures,
            metrics,
        }
    }
}

/// Generates, encodes and writes jobs. Cheap to clone; clones share metrics.
#[derive(Clone)]
pub struct Runner {
    options: Arc<RunOptions>,
    progress: Option<ProgressCallback>,
    metrics: Arc<MetricsRecorder>,
}

impl Runner {
    pub fn new(options: RunOptions) -> Self {
        Self {
            options: Arc::new(options),
            progress: None,
            metrics: Arc::new(MetricsRecorder::new()),
        }
    }

    pub fn with_progress(mut self, progress: ProgressCallback) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    pub fn output_path(&self, name: &str) -> PathBuf {
        self.options.output_dir.join(format!("{}.wv", name))
    }

    pub fn execute(&self, job: &JobConfig) -> anyhow::Result<JobResult> {
        self.tracked(&job.name, || {
            let mut waveform = build_waveform(&job.waveform, &job.params)
                .with_context(|| format!("generating {} for job {}", job.waveform.label(), job.name))?;
            self.emit(&job.name, JobStage::Generated);

            if job.clip || self.options.clip {
                waveform = clip_amplitude(&waveform, job.params.max_ampl)
                    .with_context(|| format!("clipping job {}", job.name))?;
            }
            let banner = job.waveform.banner_frequencies(&job.params);
            self.deliver(&job.name, &self.output_path(&job.name), &waveform, banner)
        })
    }

    /// Encodes and writes an already built waveform to `path`.
    pub fn execute_waveform(
        &self,
        name: &str,
        path: &Path,
        waveform: &Waveform,
    ) -> anyhow::Result<JobResult> {
        self.tracked(name, || {
            let clipped;
            let waveform = if self.options.clip {
                clipped = clip_amplitude(waveform, self.options.clip_level)
                    .with_context(|| format!("clipping job {}", name))?;
                &clipped
            } else {
                waveform
            };
            self.deliver(name, path, waveform, Vec::new())
        })
    }

    /// Runs every job on its own blocking task. Failed jobs are reported in
    /// their outcome and do not stop the others. Outcomes are sorted by name.
    pub fn run_batch(&self, jobs: Vec<JobConfig>) -> anyhow::Result<Vec<JobOutcome>> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .context("creating runtime for batch jobs")?;

        let mut outcomes = runtime.block_on(async {
            let handles: Vec<_> = jobs
                .into_iter()
                .map(|job| {
                    let runner = self.clone();
                    let name = job.name.clone();
                    (name, tokio::task::spawn_blocking(move || runner.execute(&job)))
                })
                .collect();

            let mut outcomes = Vec::with_capacity(handles.len());
            for (name, handle) in handles {
                let result = match handle.await {
                    Ok(result) => result,
                    Err(join_error) => {
                        self.metrics.record_failure();
                        Err(anyhow!("job {} did not complete: {}", name, join_error))
                    }
                };
                outcomes.push(JobOutcome { name, result });
            }
            outcomes
        });

        outcomes.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(outcomes)
    }

    fn tracked<F>(&self, name: &str, job: F) -> anyhow::Result<JobResult>
    where
        F: FnOnce() -> anyhow::Result<JobResult>,
    {
        let result = job();
        if let Err(err) = &result {
            self.metrics.record_failure();
            log::error!("job {} failed: {:#}", name, err);
            self.emit(name, JobStage::Failed);
        }
        result
    }

    fn deliver(
        &self,
        name: &str,
        path: &Path,
        waveform: &Waveform,
        banner: Vec<(&'static str, f64)>,
    ) -> anyhow::Result<JobResult> {
        let logger = LogManager::new("runner");
        let options = EncodeOptions {
            overflow: self.options.overflow,
            markers: self.options.markers.clone(),
            timestamp: None,
        };
        let file = WaveformFile::encode(waveform, &options)
            .with_context(|| format!("encoding job {}", name))?;
        self.emit(name, JobStage::Encoded);

        let overflowed_samples = file.payload().overflows().len();
        if overflowed_samples > 0 {
            self.metrics.record_overflow(overflowed_samples);
        }

        let mut file_sink = FileSink::new(path, self.options.write_exchange).with_banner(banner);
        file_sink
            .consume(waveform, &file)
            .and_then(|_| file_sink.finish())
            .with_context(|| format!("writing job {} to {}", name, path.display()))?;

        let peak_frequency = if self.options.spectrum {
            let mut spectrum = SpectrumSink::new();
            spectrum
                .consume(waveform, &file)
                .with_context(|| format!("computing spectrum for job {}", name))?;
            spectrum.last_peak().map(|bin| bin.frequency)
        } else {
            None
        };

        self.metrics.record_written();
        self.emit(name, JobStage::Written);
        logger.detail(&format!(
            "{} -> {} ({} files)",
            name,
            file_sink.path().display(),
            file_sink.written().len()
        ));

        Ok(JobResult {
            name: name.to_string(),
            path: path.to_path_buf(),
            comment: waveform.comment().to_string(),
            samples: waveform.len(),
            sample_rate: waveform.sample_rate(),
            rms_db: file.levels().rms_db,
            peak_db: file.levels().peak_db,
            declared_len: file.payload().declared_len(),
            overflowed_samples,
            peak_frequency,
        })
    }

    fn emit(&self, job: &str, stage: JobStage) {
        if let Some(progress) = &self.progress {
            progress(&JobEvent {
                job: job.to_string(),
                stage,
            });
        }
    }
}
