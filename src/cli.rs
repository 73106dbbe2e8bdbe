use clap::{Parser, Subcommand};

/// Top-level CLI for the studyboard backend
#[derive(Parser)]
#[command(
    name = "studyboard",
    version = "0.1.0",
    about = "Canvas-study backend: assistant relay service and questionnaire analysis"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the assistant relay HTTP service
    Serve {
        /// Override the configured listen port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Run a survey analysis over a questionnaire CSV export
    Analyze {
        #[command(subcommand)]
        job: AnalyzeJob,
    },
}

#[derive(Subcommand)]
pub enum AnalyzeJob {
    /// Engagement instrument: reverse-code, sub-scale scores, box plots
    Ues {
        /// Questionnaire CSV file
        #[arg(short, long)]
        input: String,
        /// Participant identifier column
        #[arg(long, default_value = "Participant")]
        participant_col: String,
        /// Condition label column
        #[arg(long, default_value = "condition")]
        condition_col: String,
        /// TOML instrument definition replacing the built-in UES layout
        #[arg(long)]
        instrument_file: Option<String>,
        /// Output directory for figures and intermediate CSVs
        #[arg(long)]
        out_dir: Option<String>,
    },

    /// System Usability Scale composite score (S1-S10)
    Sus {
        #[arg(short, long)]
        input: String,
        #[arg(long, default_value = "condition")]
        condition_col: String,
        #[arg(long)]
        out_dir: Option<String>,
    },

    /// Melt and plot an arbitrary list of item columns by condition
    Items {
        #[arg(short, long)]
        input: String,
        /// Comma-separated item column names, e.g. C1,C2,C3
        #[arg(long, value_delimiter = ',')]
        items: Vec<String>,
        #[arg(long, default_value = "condition")]
        condition_col: String,
        /// Tag used in output file names
        #[arg(long, default_value = "items")]
        tag: String,
        #[arg(long)]
        out_dir: Option<String>,
    },
}
