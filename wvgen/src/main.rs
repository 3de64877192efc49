use anyhow::{bail, Context};
use clap::{Parser, ValueEnum};
use generator::profile::WaveformKind;
use iqwavecore::container::OverflowPolicy;
use iqwavecore::exchange;
use iqwavecore::synth::{AmplitudeScale, ChirpJunction, ModulatorShape, WaveformParams};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use workflow::config::{JobConfig, WorkflowConfig};
use workflow::runner::{JobOutcome, RunOptions, RunReport, Runner};

mod generator;
mod sink;
mod workflow;

const DEFAULT_OUTPUT: &str = "IQGen.wv";

#[derive(Clone, Copy, Debug, ValueEnum)]
enum KindArg {
    SingleTone,
    DualTone,
    LinearChirp,
    SweptChirp,
    Fm,
    PhaseStep,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Junction {
    Mirrored,
    Reversed,
}

impl From<Junction> for ChirpJunction {
    fn from(value: Junction) -> Self {
        match value {
            Junction::Mirrored => ChirpJunction::Mirrored,
            Junction::Reversed => ChirpJunction::Reversed,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Shape {
    Sine,
    Triangle,
}

impl From<Shape> for ModulatorShape {
    fn from(value: Shape) -> Self {
        match value {
            Shape::Sine => ModulatorShape::Sine,
            Shape::Triangle => ModulatorShape::Triangle,
        }
    }
}

#[derive(Parser)]
#[command(author, version, about = "IQ waveform generator for vector signal generators")]
struct Args {
    /// Run the jobs of a YAML workflow instead of a single waveform
    #[arg(long, conflicts_with = "convert")]
    workflow: Option<PathBuf>,
    /// Convert a plaintext I/Q exchange file (.env) into a .wv container
    #[arg(long)]
    convert: Option<PathBuf>,
    #[arg(long, value_enum, default_value_t = KindArg::SingleTone)]
    waveform: KindArg,
    /// Tone 1 / carrier / chirp start or span, Hz
    #[arg(long)]
    freq1: Option<f64>,
    /// Tone 2 / chirp stop, Hz
    #[arg(long)]
    freq2: Option<f64>,
    #[arg(long)]
    oversampling: Option<f64>,
    #[arg(long)]
    num_periods: Option<f64>,
    /// Chirp ramp time, seconds
    #[arg(long)]
    ramp_duration: Option<f64>,
    #[arg(long)]
    mod_freq: Option<f64>,
    #[arg(long)]
    mod_index: Option<f64>,
    #[arg(long)]
    phase_angle: Option<f64>,
    #[arg(long)]
    step_samples: Option<usize>,
    /// Clipping level used with --clip
    #[arg(long)]
    max_ampl: Option<f64>,
    /// Per-tone amplitude factor; each waveform kind has its own default
    #[arg(long)]
    scale: Option<f64>,
    /// Sample rate for the chirp kinds, Hz
    #[arg(long, default_value_t = 2.0e9)]
    sample_rate: f64,
    /// Append a down sweep to the linear chirp
    #[arg(long, value_enum)]
    down_sweep: Option<Junction>,
    /// Generate only the up segment of the swept chirp
    #[arg(long, default_value_t = false)]
    up_only: bool,
    #[arg(long, value_enum, default_value_t = Shape::Sine)]
    shape: Shape,
    /// Output container; the extension is always .wv
    #[arg(short, long)]
    output: Option<PathBuf>,
    /// Also write the plaintext .env exchange file
    #[arg(long, default_value_t = false)]
    exchange: bool,
    /// Clamp out-of-range samples instead of wrapping them
    #[arg(long, default_value_t = false)]
    saturate: bool,
    /// Saturate I and Q at the clipping level before encoding
    #[arg(long, default_value_t = false)]
    clip: bool,
    /// Log the dominant spectral line of each waveform
    #[arg(long, default_value_t = false)]
    spectrum: bool,
    /// Write a JSON run report
    #[arg(long)]
    report: Option<PathBuf>,
    /// Print the generation parameters before running
    #[arg(long, default_value_t = false)]
    show_params: bool,
    #[arg(short, long, default_value_t = false)]
    verbose: bool,
}

impl Args {
    fn params(&self) -> WaveformParams {
        let defaults = WaveformParams::default();
        WaveformParams {
            max_ampl: self.max_ampl.unwrap_or(defaults.max_ampl),
            oversampling: self.oversampling.unwrap_or(defaults.oversampling),
            freq1: self.freq1.unwrap_or(defaults.freq1),
            freq2: self.freq2.unwrap_or(defaults.freq2),
            num_periods: self.num_periods.unwrap_or(defaults.num_periods),
            ramp_duration: self.ramp_duration.unwrap_or(defaults.ramp_duration),
            mod_freq: self.mod_freq.unwrap_or(defaults.mod_freq),
            mod_index: self.mod_index.unwrap_or(defaults.mod_index),
            phase_angle_deg: self.phase_angle.unwrap_or(defaults.phase_angle_deg),
            step_samples: self.step_samples.unwrap_or(defaults.step_samples),
            filter_beta: defaults.filter_beta,
        }
    }

    fn scale_or(&self, default: AmplitudeScale) -> AmplitudeScale {
        self.scale.map(AmplitudeScale::Custom).unwrap_or(default)
    }

    fn kind(&self) -> WaveformKind {
        match self.waveform {
            KindArg::SingleTone => WaveformKind::SingleTone {
                scale: self.scale_or(AmplitudeScale::Unity),
            },
            KindArg::DualTone => WaveformKind::DualTone {
                scale: self.scale_or(AmplitudeScale::Half),
            },
            KindArg::LinearChirp => WaveformKind::LinearChirp {
                sample_rate: self.sample_rate,
                down_sweep: self.down_sweep.map(ChirpJunction::from),
            },
            KindArg::SweptChirp => WaveformKind::SweptChirp {
                sample_rate: self.sample_rate,
                scale: self.scale_or(AmplitudeScale::Legacy0707),
                both_directions: !self.up_only,
            },
            KindArg::Fm => WaveformKind::FrequencyModulated {
                shape: self.shape.into(),
            },
            KindArg::PhaseStep => WaveformKind::PhaseStep {
                scale: self.scale_or(AmplitudeScale::Half),
            },
        }
    }

    fn apply_overrides(&self, options: &mut RunOptions) {
        options.write_exchange |= self.exchange;
        options.spectrum |= self.spectrum;
        options.clip |= self.clip;
        if let Some(level) = self.max_ampl {
            options.clip_level = level;
        }
        if self.saturate {
            options.overflow = OverflowPolicy::Saturate;
        }
    }
}

/// Splits an output path into its directory and file stem.
fn split_output(path: &Path) -> anyhow::Result<(PathBuf, String)> {
    let stem = path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .with_context(|| format!("output path {} has no usable file name", path.display()))?
        .to_string();
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    Ok((dir, stem))
}

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn convert(args: &Args, env_path: &Path) -> anyhow::Result<(Vec<JobOutcome>, Runner)> {
    let output = args
        .output
        .clone()
        .unwrap_or_else(|| env_path.with_extension("wv"));
    let (dir, name) = split_output(&output)?;
    let mut options = RunOptions {
        output_dir: dir,
        ..Default::default()
    };
    args.apply_overrides(&mut options);
    options.write_exchange = false;

    let waveform = exchange::read_file(env_path)
        .with_context(|| format!("reading exchange file {}", env_path.display()))?;
    let runner = Runner::new(options);
    let path = runner.output_path(&name);
    let result = runner.execute_waveform(&name, &path, &waveform);
    Ok((vec![JobOutcome { name, result }], runner))
}

fn generate(args: &Args) -> anyhow::Result<(Vec<JobOutcome>, Runner)> {
    let config = if let Some(path) = &args.workflow {
        WorkflowConfig::load(path)?
    } else {
        let output = args
            .output
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT));
        let (dir, name) = split_output(&output)?;
        let job = JobConfig {
            name,
            waveform: args.kind(),
            params: args.params(),
            clip: false,
        };
        WorkflowConfig::single(job, dir)
    };

    let mut options = config.to_run_options();
    args.apply_overrides(&mut options);
    fs::create_dir_all(&options.output_dir)
        .with_context(|| format!("creating output directory {}", options.output_dir.display()))?;

    let jobs = config.expanded_jobs()?;
    let runner = Runner::new(options).with_progress(Arc::new(|event| log::debug!("{}", event)));

    let outcomes = if jobs.len() == 1 {
        jobs.iter()
            .map(|job| JobOutcome {
                name: job.name.clone(),
                result: runner.execute(job),
            })
            .collect()
    } else {
        log::info!("running {} jobs", jobs.len());
        runner.run_batch(jobs)?
    };
    Ok((outcomes, runner))
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    if args.show_params {
        print!("{}", args.params());
    }

    let (outcomes, runner) = match &args.convert {
        Some(env_path) => convert(&args, env_path)?,
        None => generate(&args)?,
    };

    for outcome in &outcomes {
        match &outcome.result {
            Ok(result) => println!(
                "{} -> {} samples @ {} Hz, rms {:.4} dB, peak {:.4} dB, {} ({})",
                result.name,
                result.samples,
                result.sample_rate,
                result.rms_db,
                result.peak_db,
                result.path.display(),
                result.comment
            ),
            Err(err) => eprintln!("{} failed: {:#}", outcome.name, err),
        }
    }

    let report = RunReport::new(&outcomes, runner.metrics());
    if let Some(path) = &args.report {
        let json = serde_json::to_string_pretty(&report).context("serializing run report")?;
        fs::write(path, json).with_context(|| format!("writing run report {}", path.display()))?;
    }

    if !report.failures.is_empty() {
        bail!(
            "{} of {} jobs failed",
            report.failures.len(),
            outcomes.len()
        );
    }
    Ok(())
}
