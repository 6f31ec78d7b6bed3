use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use nutrirec_engine::{
    DatasetStore, EngineConfig, NutritionField, RecommendationRequest, Recommender,
};
use tracing_subscriber::EnvFilter;

mod convert;

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser, Debug)]
#[command(name = "nutrirec", version = VERSION, about = "Nutrition-based recipe recommender")]
struct Cli {
    /// TOML config file; falls back to NUTRIREC_CONFIG, then nutrirec.toml.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[arg(long, global = true)]
    snapshot: Option<PathBuf>,
    #[arg(long, global = true)]
    instructions: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Build the snapshot and instructions store from a CSV export.
    Convert {
        /// CSV export, optionally gzip-compressed (`.gz`).
        input: PathBuf,
    },
    /// Rank recipes against a nutrition profile and print them as JSON.
    Recommend {
        /// Nine comma-separated values: calories, fat, saturated fat,
        /// cholesterol, sodium, carbohydrate, fiber, sugar, protein.
        #[arg(long, value_delimiter = ',', allow_negative_numbers = true, required = true)]
        nutrition: Vec<f32>,
        #[arg(long, value_delimiter = ',')]
        exclude: Vec<String>,
        #[arg(long = "food-type")]
        food_type: Option<String>,
        #[arg(short = 'k', long = "neighbors")]
        k: Option<usize>,
        #[arg(long = "with-distance", action = ArgAction::SetTrue)]
        with_distance: bool,
        #[arg(long, action = ArgAction::SetTrue)]
        compact: bool,
    },
    /// Describe the configured snapshot and instructions store.
    Inspect,
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let config = resolve_config(&cli)?;

    match cli.command {
        Commands::Convert { input } => {
            let summary = convert::convert_export(
                &input,
                &config.snapshot_path,
                &config.instructions_path,
            )?;
            println!(
                "rows={} snapshot={} ({}) instructions={} ({} rows, {})",
                summary.rows,
                summary.snapshot_path.display(),
                human_bytes(summary.snapshot_bytes),
                summary.instructions_path.display(),
                summary.instructions_rows,
                human_bytes(summary.instructions_bytes)
            );
        }
        Commands::Recommend {
            nutrition,
            exclude,
            food_type,
            k,
            with_distance,
            compact,
        } => {
            let request = RecommendationRequest::builder(&nutrition)
                .exclude(exclude)
                .food_type(food_type)
                .k(k.unwrap_or(config.default_k))
                .return_distance(with_distance)
                .build()?;
            let recommender = Recommender::open(&config)?;
            let outcome = recommender.recommend(&request)?;
            let rendered = if compact {
                serde_json::to_string(&outcome)?
            } else {
                serde_json::to_string_pretty(&outcome)?
            };
            println!("{rendered}");
        }
        Commands::Inspect => inspect(&config)?,
    }
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Config file, then `NUTRIREC_*` environment, then command-line flags.
fn resolve_config(cli: &Cli) -> Result<EngineConfig> {
    let mut config = match &cli.config {
        Some(path) => EngineConfig::from_file(path)?.with_overrides(|key| env::var(key).ok())?,
        None => EngineConfig::load()?,
    };
    if let Some(path) = &cli.snapshot {
        config.snapshot_path = path.clone();
    }
    if let Some(path) = &cli.instructions {
        config.instructions_path = path.clone();
    }
    Ok(config)
}

fn inspect(config: &EngineConfig) -> Result<()> {
    let store = DatasetStore::from_config(config);
    let dataset = store
        .load()
        .with_context(|| format!("cannot inspect {}", config.snapshot_path.display()))?;
    let food_types = dataset.food_types();
    let mut counts = vec![0usize; food_types.dictionary().len()];
    for code in food_types.codes() {
        counts[*code as usize] += 1;
    }

    println!("snapshot={}", config.snapshot_path.display());
    println!("rows={}", dataset.len());
    println!("resident={}", human_bytes(dataset.resident_bytes() as u64));
    println!(
        "nutrition_fields={}",
        NutritionField::ALL
            .iter()
            .map(|field| field.column())
            .collect::<Vec<_>>()
            .join(",")
    );
    println!("food_types={}", food_types.dictionary().len());
    for (label, count) in food_types.dictionary().iter().zip(counts) {
        println!("  {label}: {count}");
    }
    println!(
        "instructions={} ({})",
        store.instructions().path().display(),
        if store.instructions().is_available() {
            "present"
        } else {
            "missing"
        }
    );
    println!("default_k={} max_k={}", config.default_k, config.max_k);
    Ok(())
}

fn human_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KiB", "MiB", "GiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit + 1 < UNITS.len() {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn recommend_flags_parse_comma_lists() {
        let cli = Cli::try_parse_from([
            "nutrirec",
            "recommend",
            "--nutrition",
            "500,20,5,60,400,50,6,10,25",
            "--exclude",
            "egg,milk",
            "--food-type",
            "Vegan",
            "-k",
            "3",
            "--with-distance",
        ])
        .unwrap();
        match cli.command {
            Commands::Recommend {
                nutrition,
                exclude,
                food_type,
                k,
                with_distance,
                compact,
            } => {
                assert_eq!(nutrition.len(), 9);
                assert_eq!(nutrition[4], 400.0);
                assert_eq!(exclude, vec!["egg", "milk"]);
                assert_eq!(food_type.as_deref(), Some("Vegan"));
                assert_eq!(k, Some(3));
                assert!(with_distance);
                assert!(!compact);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn flags_override_configured_paths() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("nutrirec.toml");
        std::fs::write(&config_path, "[data]\nsnapshot = \"a.snapshot\"\n").unwrap();
        let cli = Cli::try_parse_from([
            "nutrirec",
            "--config",
            config_path.to_str().unwrap(),
            "--instructions",
            "b.sqlite",
            "inspect",
        ])
        .unwrap();
        let config = resolve_config(&cli).unwrap();
        assert_eq!(config.instructions_path, PathBuf::from("b.sqlite"));
    }

    #[test]
    fn human_bytes_picks_a_unit() {
        assert_eq!(human_bytes(512), "512 B");
        assert_eq!(human_bytes(2048), "2.0 KiB");
        assert_eq!(human_bytes(5 * 1024 * 1024), "5.0 MiB");
    }
}
