use crate::generator::profile::WaveformKind;
use crate::workflow::runner::RunOptions;
use anyhow::{bail, Context};
use iqwavecore::container::{MarkerLists, OverflowPolicy};
use iqwavecore::synth::{AmplitudeScale, WaveformParams};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// One named waveform to generate. The name becomes the output file stem.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct JobConfig {
    pub name: String,
    #[serde(default)]
    pub waveform: WaveformKind,
    #[serde(default)]
    pub params: WaveformParams,
    /// Saturate I and Q at `params.max_ampl` before encoding.
    #[serde(default)]
    pub clip: bool,
}

/// Single-tone frequency sweep, expanded into one job per step.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SweepConfig {
    pub start: f64,
    pub stop: f64,
    pub step: f64,
    #[serde(default = "default_sweep_prefix")]
    pub prefix: String,
    #[serde(default)]
    pub scale: AmplitudeScale,
    /// Base parameters; `freq1` is replaced by each sweep frequency.
    #[serde(default)]
    pub params: WaveformParams,
}

fn default_sweep_prefix() -> String {
    "sweep".to_string()
}

impl SweepConfig {
    pub fn frequencies(&self) -> anyhow::Result<Vec<f64>> {
        if !(self.start.is_finite() && self.stop.is_finite() && self.step.is_finite()) {
            bail!("sweep bounds must be finite");
        }
        if self.step <= 0.0 {
            bail!("sweep step must be positive, got {}", self.step);
        }
        if self.stop < self.start {
            bail!(
                "sweep stop {} is below start {}",
                self.stop,
                self.start
            );
        }
        let steps = ((self.stop - self.start) / self.step + 1e-9).floor() as usize;
        Ok((0..=steps)
            .map(|index| self.start + index as f64 * self.step)
            .collect())
    }

    fn jobs(&self) -> anyhow::Result<Vec<JobConfig>> {
        let frequencies = self.frequencies()?;
        let width = frequencies.len().to_string().len().max(3);
        Ok(frequencies
            .into_iter()
            .enumerate()
            .map(|(index, freq)| JobConfig {
                name: format!("{}_{:0width$}", self.prefix, index, width = width),
                waveform: WaveformKind::SingleTone { scale: self.scale },
                params: WaveformParams {
                    freq1: freq,
                    ..self.params.clone()
                },
                clip: false,
            })
            .collect())
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowConfig {
    pub output_dir: PathBuf,
    /// Also write the plaintext `.env` file next to every `.wv`.
    pub write_exchange: bool,
    pub overflow: OverflowPolicy,
    /// Log the dominant spectral line of each waveform.
    pub spectrum: bool,
    pub markers: MarkerLists,
    pub jobs: Vec<JobConfig>,
    pub sweep: Option<SweepConfig>,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            write_exchange: false,
            overflow: OverflowPolicy::Wrap,
            spectrum: false,
            markers: MarkerLists::default(),
            jobs: Vec::new(),
            sweep: None,
        }
    }
}

impl WorkflowConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path_ref = path.as_ref();
        let contents = fs::read_to_string(path_ref)
            .with_context(|| format!("reading workflow config {}", path_ref.display()))?;
        let config: WorkflowConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("parsing workflow config {}", path_ref.display()))?;
        Ok(config)
    }

    /// Workflow with a single job, as assembled from command-line flags.
    pub fn single(job: JobConfig, output_dir: PathBuf) -> Self {
        Self {
            output_dir,
            jobs: vec![job],
            ..Default::default()
        }
    }

    /// Explicit jobs followed by the expanded sweep. Names must be unique and
    /// usable as file stems.
    pub fn expanded_jobs(&self) -> anyhow::Result<Vec<JobConfig>> {
        let mut jobs = self.jobs.clone();
        if let Some(sweep) = &self.sweep {
            jobs.extend(sweep.jobs().context("expanding frequency sweep")?);
        }
        if jobs.is_empty() {
            bail!("workflow defines no jobs");
        }

        let mut seen = HashSet::new();
        for job in &jobs {
            if job.name.trim().is_empty()
                || job.name.contains(|c| matches!(c, '/' | '\\'))
                || job.name == "."
                || job.name == ".."
            {
                bail!("job name {:?} cannot be used as a file name", job.name);
            }
            if !seen.insert(job.name.as_str()) {
                bail!("duplicate job name {:?}; each job needs its own output file", job.name);
            }
        }
        Ok(jobs)
    }

    pub fn to_run_options(&self) -> RunOptions {
        RunOptions {
            output_dir: self.output_dir.clone(),
            write_exchange: self.write_exchange,
            overflow: self.overflow,
            spectrum: self.spectrum,
            clip: false,
            clip_level: 1.0,
            markers: self.markers.clone(),
        }
    }
}
