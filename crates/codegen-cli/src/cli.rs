use clap::builder::RangedU64ValueParser;
use clap::{Parser, ValueEnum};
use codegen_core::GenerationRequest;
use codegen_filter::FilterKind;
use codegen_pipeline::PipelineConfig;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

pub const OUTPUT_DIR_ENV: &str = "CODEGEN_OUTPUT_DIR";
pub const WORKERS_ENV: &str = "CODEGEN_WORKERS";
pub const FILTER_ENV: &str = "CODEGEN_FILTER";
pub const FALSE_POSITIVE_RATE_ENV: &str = "CODEGEN_FALSE_POSITIVE_RATE";
pub const LOG_JSON_ENV: &str = "CODEGEN_LOG_JSON";

pub const DEFAULT_LENGTH: &str = "6";
pub const DEFAULT_COUNT: &str = "1";
pub const DEFAULT_WORKERS: &str = "500";
pub const DEFAULT_FALSE_POSITIVE_RATE: &str = "0.001";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FilterArg {
    #[value(name = "exact")]
    Exact,
    #[value(name = "bloom")]
    Bloom,
}

impl Display for FilterArg {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            FilterArg::Exact => write!(f, "exact"),
            FilterArg::Bloom => write!(f, "bloom"),
        }
    }
}

#[derive(Debug, Parser)]
#[command(
    name = "codegen",
    about = "Generate unique prefixed codes into a text file",
    after_help = "Tip: To stop code generation midway, simply press [CTRL + C]"
)]
pub struct CLI {
    /// Add prefix to the codes (2-6 characters)
    #[arg(short = 'p', long, required_unless_present = "about")]
    pub prefix: Option<String>,

    /// The length of the generated code number (4-16 digits)
    #[arg(short = 'l', long, default_value = DEFAULT_LENGTH)]
    pub length: usize,

    /// The number of generated codes (1-100 million)
    #[arg(short = 'n', long, default_value = DEFAULT_COUNT)]
    pub count: u64,

    /// Add line numbers to the file
    #[arg(short = 'a', long)]
    pub line_numbers: bool,

    /// About
    #[arg(short = 'v', long)]
    pub about: bool,

    /// Duplicate filter; bloom trades a little throughput near the
    /// keyspace limit for far less memory
    #[arg(long, env = FILTER_ENV, value_enum, default_value_t = FilterArg::Exact)]
    pub filter: FilterArg,

    #[arg(long, env = FALSE_POSITIVE_RATE_ENV, default_value = DEFAULT_FALSE_POSITIVE_RATE)]
    pub false_positive_rate: f64,

    /// Number of generator threads
    #[arg(
        long,
        env = WORKERS_ENV,
        default_value = DEFAULT_WORKERS,
        value_parser = RangedU64ValueParser::<usize>::new().range(1..)
    )]
    pub workers: usize,

    /// Directory for the generated file, instead of the per-user default
    #[arg(long, env = OUTPUT_DIR_ENV)]
    pub output_dir: Option<PathBuf>,

    /// Emit logs as JSON
    #[arg(long, env = LOG_JSON_ENV)]
    pub log_json: bool,
}

impl CLI {
    pub fn request(&self) -> GenerationRequest {
        GenerationRequest::builder()
            .prefix(self.prefix.clone().unwrap_or_default())
            .digit_length(self.length)
            .target_count(self.count)
            .line_numbers(self.line_numbers)
            .build()
    }

    pub fn filter(&self) -> FilterKind {
        match self.filter {
            FilterArg::Exact => FilterKind::Exact,
            FilterArg::Bloom => FilterKind::Bloom {
                false_positive_rate: self.false_positive_rate,
            },
        }
    }

    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig::builder()
            .workers(self.workers)
            .filter(self.filter())
            .build()
    }
}
