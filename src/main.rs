use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use cocostore::cli::{export, import, init, list, prep, split};
use cocostore::config::Config;
use cocostore::split::SplitRatios;
use cocostore::store::RecordStore;

#[derive(Parser)]
#[command(name = "cocostore")]
#[command(about = "COCO annotation dataset store: batch merge, export and train/val/test splits")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long, default_value = "cocostore.yaml")]
    config: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the tables (or wipe them with --reset)
    Init {
        /// Drop and recreate all tables
        #[arg(long)]
        reset: bool,
    },

    /// Load a canonical COCO file, keeping its ids
    Load {
        /// COCO json file
        file: PathBuf,
    },

    /// Merge an annotation-tool batch, renumbering its ids after the store's
    Import {
        /// COCO json file exported by the annotation tool
        file: PathBuf,
    },

    /// Export the store (or a category subset) as one COCO file
    Export {
        /// Category ids to include (comma separated); all when omitted
        #[arg(short = 'C', long, value_delimiter = ',')]
        categories: Vec<i64>,

        /// Output file
        #[arg(short, long, default_value = "export.json")]
        output: PathBuf,

        /// Description for the info block
        #[arg(short, long, default_value = "Description")]
        description: String,
    },

    /// Split images into train/val/test COCO files
    Split {
        /// Category ids to include (comma separated); all when omitted
        #[arg(short = 'C', long, value_delimiter = ',')]
        categories: Vec<i64>,

        /// Fraction of images for test
        #[arg(long)]
        test: Option<f64>,

        /// Fraction of images for validation
        #[arg(long)]
        val: Option<f64>,

        /// Seed for a reproducible split
        #[arg(long)]
        seed: Option<u64>,

        /// Output directory for train.json, val.json, test.json
        #[arg(short, long, default_value = ".")]
        output: PathBuf,
    },

    /// List category ids and names
    Categories,

    /// List files in a folder that are not in the store
    Unannotated {
        /// Images folder
        images_dir: PathBuf,

        /// Copy the files into a "00 NotAnnotated" subfolder
        #[arg(long)]
        copy: bool,
    },

    /// Correct image width/height in a COCO file from the image files
    FixSizes {
        /// Folder holding the images
        folder: PathBuf,
        /// COCO json file to correct
        file: PathBuf,
        /// Output file (default: updated_<file> next to the input)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show statistics
    Stats,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    // Load config
    let config = Config::load(&cli.config)?;

    // Initialize store
    let store = RecordStore::open(&config.database_path())?;

    match cli.command {
        Commands::Init { reset } => {
            init::run(&store, reset)?;
        }
        Commands::Load { file } => {
            import::load(&store, &file)?;
        }
        Commands::Import { file } => {
            import::merge(&store, &file)?;
        }
        Commands::Export {
            categories,
            output,
            description,
        } => {
            export::run(&store, &config, &categories, &output, &description)?;
        }
        Commands::Split {
            categories,
            test,
            val,
            seed,
            output,
        } => {
            let defaults = config.split.ratios();
            let ratios = SplitRatios {
                test: test.unwrap_or(defaults.test),
                val: val.unwrap_or(defaults.val),
            };
            split::run(
                &store,
                &config,
                categories,
                ratios,
                seed.or(config.split.seed),
                &output,
            )?;
        }
        Commands::Categories => {
            list::categories(&store)?;
        }
        Commands::Unannotated { images_dir, copy } => {
            prep::unannotated(&store, &images_dir, copy)?;
        }
        Commands::FixSizes {
            folder,
            file,
            output,
        } => {
            prep::fix_sizes(&folder, &file, output)?;
        }
        Commands::Stats => {
            list::stats(&store)?;
        }
    }

    Ok(())
}
