use clap::{Parser, Subcommand};
use cli::RunConfig;
use color_eyre::eyre::Result;
use facets::{ClusteringColorSpace, PipelineBuilder, Settings, Stage};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use tracing_subscriber::{self, EnvFilter};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Vectorize an image using a configuration file
    Process {
        /// Path to the TOML or JSON configuration file
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Vectorize an image with settings given on the command line
    Run {
        /// Path to the input image
        #[arg(short, long)]
        input: PathBuf,
        /// Path of the GeoJSON file to write
        #[arg(short, long)]
        output: PathBuf,
        /// Number of palette colors
        #[arg(long, default_value = "16")]
        clusters: usize,
        /// Seed for the k-means initialisation
        #[arg(long)]
        seed: Option<u64>,
        /// Color space used for clustering
        #[arg(long, default_value = "rgb")]
        color_space: ClusteringColorSpace,
        /// Facets with fewer pixels are merged into their neighbours
        #[arg(long, default_value = "20")]
        min_facet_size: usize,
        /// Upper bound on the number of facets
        #[arg(long)]
        max_facets: Option<usize>,
    },
    /// Print the JSON schema of the settings
    Schema,
    /// Write a configuration file with default settings
    InitConfig {
        /// Path of the configuration file (.toml or .json)
        #[arg(short, long)]
        output: PathBuf,
    },
}

fn main() -> Result<()> {
    color_eyre::install()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info"))
        )
        .init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Process { config } => {
            let config = RunConfig::from_file(config)?;
            run(&config)?;
        }
        Commands::Run {
            input,
            output,
            clusters,
            seed,
            color_space,
            min_facet_size,
            max_facets,
        } => {
            let config = RunConfig {
                input: input.to_string_lossy().to_string(),
                output: output.to_string_lossy().to_string(),
                settings: Settings {
                    cluster_count: *clusters,
                    random_seed: *seed,
                    color_space: *color_space,
                    min_facet_size: *min_facet_size,
                    max_facet_count: *max_facets,
                    ..Settings::default()
                },
            };
            config.settings.validate()?;
            run(&config)?;
        }
        Commands::Schema => {
            println!("{}", serde_json::to_string_pretty(&Settings::schema())?);
        }
        Commands::InitConfig { output } => {
            init_config(output)?;
        }
    }

    Ok(())
}

fn run(config: &RunConfig) -> Result<()> {
    info!("Vectorizing {} -> {}", config.input, config.output);
    let image = image::open(&config.input)?.to_rgba8();
    info!("Loaded {}x{} image", image.width(), image.height());

    let pipeline = PipelineBuilder::from_settings(&config.settings).build();
    debug!("{}", pipeline.info());

    let token = facets::CancellationToken::new();
    let mut last_stage: Option<Stage> = None;
    let result = pipeline.process_with(&image, &token, &mut |stage, fraction| {
        if last_stage != Some(stage) {
            info!("Stage: {stage}");
            last_stage = Some(stage);
        }
        debug!("{stage}: {:.0}%", fraction * 100.0);
    })?;

    if let Some(parent) = Path::new(&config.output).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    result.save_geojson(&config.output)?;
    info!(
        "✅ Wrote {} facets with {} colors to {}",
        result.facet_result.live_count(),
        result.colors_by_index.len(),
        config.output
    );
    Ok(())
}

fn init_config(output: &Path) -> Result<()> {
    let config = RunConfig::new("input.png", "output.geojson");
    config.to_file(output)?;
    info!("Wrote default configuration to {:?}", output);
    Ok(())
}
