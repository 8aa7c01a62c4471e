// Command-line surface of the `taiso` binary

use crate::core::config::ScoringConfig;
use crate::core::pipeline::ScoringPipeline;
use crate::core::storage::{ResultStorage, RunManifest};
use crate::models::reference::{ExerciseTimingModel, ReferenceData, TeacherProfile};
use crate::models::score::ScoreReport;
use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

/// Number of exercises and body parts listed as needing work
const REPORT_TOP_N: usize = 3;

#[derive(Debug, Parser)]
#[command(name = "taiso", version, about = "Score exercise routines against a teacher reference")]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Args)]
pub struct GlobalArgs {
    /// Scoring configuration (JSON); defaults are used when omitted
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Override the exercise timing model path
    #[arg(long, global = true)]
    pub timing: Option<PathBuf>,

    /// Override the teacher profile path
    #[arg(long, global = true)]
    pub profile: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Segment a recording and write per-exercise window feature tables
    Features {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        outdir: PathBuf,
        /// File name prefix of the feature tables
        #[arg(long, default_value = "student")]
        name: String,
    },
    /// Score previously written feature tables
    Score {
        #[arg(long)]
        indir: PathBuf,
        #[arg(long)]
        outdir: PathBuf,
    },
    /// Full pipeline into a new run directory
    Run {
        #[arg(long)]
        input: PathBuf,
        /// Parent of the run directory; defaults to the configured results path
        #[arg(long)]
        outdir: Option<PathBuf>,
    },
}

impl GlobalArgs {
    fn load_config(&self) -> anyhow::Result<ScoringConfig> {
        let mut config = match &self.config {
            Some(path) => ScoringConfig::load_from(path)
                .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
            None => ScoringConfig::default(),
        };

        if let Some(timing) = &self.timing {
            config.timing_model_path = timing.clone();
        }
        if let Some(profile) = &self.profile {
            config.teacher_profile_path = profile.clone();
        }

        Ok(config)
    }
}

fn load_timing(config: &ScoringConfig) -> anyhow::Result<ExerciseTimingModel> {
    let path = &config.timing_model_path;
    ExerciseTimingModel::load(path)
        .with_context(|| format!("Failed to load timing model from {}", path.display()))
}

fn load_profile(config: &ScoringConfig) -> anyhow::Result<TeacherProfile> {
    let path = &config.teacher_profile_path;
    TeacherProfile::load(path)
        .with_context(|| format!("Failed to load teacher profile from {}", path.display()))
}

/// Dispatch a parsed command line
pub fn execute(cli: Cli) -> anyhow::Result<()> {
    let config = cli.global.load_config()?;

    match cli.command {
        Commands::Features { input, outdir, name } => {
            let reference = ReferenceData::new(load_timing(&config)?, TeacherProfile::default());
            let pipeline = ScoringPipeline::new(Arc::new(reference), config)?;
            let storage = ResultStorage::new(outdir.clone())?;

            let recording = pipeline.prepare(storage.read_recording(&input)?)?;
            let features = pipeline.extract_features(&recording)?;
            let written = storage.write_features(&outdir, &name, &features)?;

            println!("Wrote {} feature tables to {}", written.len(), outdir.display());
        }
        Commands::Score { indir, outdir } => {
            let timing = ExerciseTimingModel::default();
            let reference = ReferenceData::new(timing, load_profile(&config)?);
            let pipeline = ScoringPipeline::new(Arc::new(reference), config)?;
            let storage = ResultStorage::new(outdir.clone())?;

            let features = storage.read_features(&indir).with_context(|| {
                format!("Failed to read feature tables from {}", indir.display())
            })?;
            let report = pipeline.score(&features);

            let results = storage.write_report(&outdir, &report)?;
            let run_id = outdir
                .file_name()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            storage.write_manifest(&outdir, &RunManifest::from_report(&run_id, &report))?;

            print_report(&report);
            println!("Results: {}", results.display());
        }
        Commands::Run { input, outdir } => {
            let reference =
                ReferenceData::load(&config.timing_model_path, &config.teacher_profile_path)
                    .context("Failed to load reference data")?;
            let storage = ResultStorage::new(run_parent_dir(outdir, &config))?;
            let pipeline = ScoringPipeline::new(Arc::new(reference), config)?;

            let recording = storage.read_recording(&input)?;
            let outcome = pipeline.run_to_storage(recording, &storage)?;

            print_report(&outcome.report);
            println!("Run {}: {}", outcome.run_id, outcome.run_path.display());
        }
    }

    Ok(())
}

fn run_parent_dir(outdir: Option<PathBuf>, config: &ScoringConfig) -> PathBuf {
    outdir.unwrap_or_else(|| config.results_path.clone())
}

fn print_report(report: &ScoreReport) {
    if report.summaries.is_empty() {
        println!("No exercise could be scored");
        return;
    }

    println!("Exercise scores:");
    for summary in &report.summaries {
        println!("  {:<8} {:>6.1}", summary.exercise, summary.mean_score);
    }
    if let Some(overall) = report.overall_score() {
        println!("Overall: {:.1}", overall);
    }

    let weakest: Vec<&str> = report
        .weakest_exercises(REPORT_TOP_N)
        .iter()
        .map(|s| s.exercise.as_str())
        .collect();
    println!("Lowest exercises: {}", weakest.join(", "));

    let parts: Vec<&str> = report
        .weakest_parts(REPORT_TOP_N)
        .iter()
        .map(|(part, _)| part.as_str())
        .collect();
    println!("Parts to work on: {}", parts.join(", "));
}
