//! cytoset command line entry point.
//!
//! Usage:
//!   cytoset-native summary <project-dir> [--segmentation mask.tif]
//!   cytoset-native export <dataset-dir> --segmentation <file> \
//!       [--statistic mean|median] [--populations populations.json] --output out.csv

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use cytoset::color_utils::to_hex;
use cytoset::config::{AppConfig, LogLevel};
use cytoset::state::{Project, ProjectError, dataset_name};
use cytoset::statistics::StatisticKind;

#[derive(Parser, Debug)]
#[command(author, version, about = "Multiplexed tissue image statistics")]
struct Args {
    /// Log verbosity (error, warn, info, debug, trace); overrides the config file
    #[arg(long)]
    log_level: Option<LogLevel>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load every dataset of a project and print its channels and segments
    Summary {
        /// Project directory, one sub-directory per dataset
        dir: PathBuf,

        /// Mask file name looked up inside every dataset directory
        #[arg(long)]
        segmentation: Option<String>,
    },

    /// Export per-segment marker intensities of one dataset as CSV
    Export {
        /// Dataset directory holding one image per channel
        dataset: PathBuf,

        /// Segmentation mask file
        #[arg(long)]
        segmentation: PathBuf,

        /// Statistic per segment (defaults to the configured one)
        #[arg(long)]
        statistic: Option<StatisticKind>,

        /// Populations JSON whose names are listed per segment
        #[arg(long)]
        populations: Option<PathBuf>,

        /// Output CSV file
        #[arg(short, long)]
        output: PathBuf,
    },
}

fn summary(project: &mut Project, dir: &Path, segmentation: Option<String>) -> Result<(), ProjectError> {
    if segmentation.is_some() {
        project.set_segmentation_basename(segmentation)?;
    }
    project.open_project(dir)?;

    let ids = project.dataset_ids().to_vec();
    println!("{} datasets in {}", ids.len(), dir.display());
    for id in &ids {
        project.activate(id)?;
        project.wait_until_loaded(id)?;
        let Some(dataset) = project.dataset(id) else {
            continue;
        };
        let channels = dataset.channels().map(|c| c.names()).unwrap_or_default();
        let segments = dataset.segmentation().map_or(0, |s| s.len());
        println!(
            "  {}: {} channels ({}), {} segments",
            dataset_name(id),
            channels.len(),
            channels.join(", "),
            segments
        );
    }

    for (id, error) in project.take_errors() {
        println!("  warning [{}]: {}", dataset_name(&id), error);
    }
    Ok(())
}

fn export(
    project: &mut Project,
    dataset: &Path,
    segmentation: PathBuf,
    statistic: StatisticKind,
    populations: Option<&Path>,
    output: &Path,
) -> Result<(), ProjectError> {
    project.set_segmentation_file(dataset, Some(segmentation))?;
    project.open_dataset(dataset)?;
    project.wait_until_loaded(dataset)?;

    for (_, error) in project.take_errors() {
        log::warn!("{}", error);
    }

    if let Some(path) = populations {
        let count = project.import_populations(dataset, "json", path)?;
        println!("Imported {} populations", count);
        if let Some(store) = project.populations(dataset) {
            for population in store.iter() {
                println!(
                    "  {} {} ({} segments)",
                    to_hex(population.color),
                    population.name,
                    population.segments.len()
                );
            }
        }
    }

    project.export_intensities(dataset, None, statistic, output)?;
    println!("Wrote {} ({})", output.display(), statistic);
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();
    let config = AppConfig::load_from_default_path().unwrap_or_default();
    let preferences = config.preferences;

    let level = args.log_level.unwrap_or(preferences.log_level);
    env_logger::Builder::new()
        .filter_level(level.to_level_filter())
        .parse_default_env()
        .init();

    let result = Project::new(&preferences).and_then(|mut project| match args.command {
        Command::Summary { dir, segmentation } => summary(&mut project, &dir, segmentation),
        Command::Export {
            dataset,
            segmentation,
            statistic,
            populations,
            output,
        } => {
            let statistic = statistic.unwrap_or(project.default_statistic());
            export(
                &mut project,
                &dataset,
                segmentation,
                statistic,
                populations.as_deref(),
                &output,
            )
        }
    });

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
