mod cli;
mod output;
mod terminal;

use crate::cli::CLI;
use crate::output::Destination;
use crate::terminal::{clear_line, TerminalProgress};
use clap::Parser;
use codegen_core::{format_thousands, Header, RequestError};
use codegen_pipeline::{Interrupts, Pipeline, PipelineError, RunOutcome};
use std::process::ExitCode;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let config = CLI::parse();
    init_tracing(config.log_json);

    if config.about {
        print_about();
        return Ok(ExitCode::SUCCESS);
    }

    let request = config.request();
    if let Err(e) = request.validate() {
        println!("{}", describe(&e));
        return Ok(ExitCode::FAILURE);
    }
    if request.is_full_keyspace() {
        println!(
            "Attention: Code generation and saving may take a bit longer than usual based on the provided parameters!"
        );
    }

    let destination = match &config.output_dir {
        Some(dir) => Destination::custom(dir),
        None => Destination::per_user()?,
    };

    let token = output::file_token()?;
    let label = Header::new(request.target_count).label();
    let path = destination.file_path(&request.prefix, label, &token);
    debug!(path = %path.display(), "creating output file");

    let interrupts = match Interrupts::install() {
        Ok(interrupts) => interrupts,
        Err(e) => {
            println!("{}", describe_failure(&e));
            return Ok(ExitCode::FAILURE);
        }
    };
    let (artifact, out) = destination.create_artifact(&path)?;

    info!(
        workers = config.workers,
        filter = %config.filter,
        "generating codes"
    );
    let pipeline = Pipeline::new(config.pipeline_config());
    let outcome = pipeline.run(
        &request,
        out,
        artifact,
        interrupts,
        TerminalProgress::stdout(&request.prefix),
    );

    match outcome {
        Ok(RunOutcome::Completed { path, .. }) => {
            println!("Generated codes saved to {}", path.display());
            Ok(ExitCode::SUCCESS)
        }
        Ok(RunOutcome::Interrupted { .. }) => {
            clear_line();
            println!("Interrupted! Code generation interrupted. Cleaned up generated file.");
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            clear_line();
            println!("{}", describe_failure(&e));
            Ok(ExitCode::FAILURE)
        }
    }
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn print_about() {
    println!(
        "{} {}\n{}",
        env!("CARGO_BIN_NAME"),
        env!("CARGO_PKG_VERSION"),
        env!("CARGO_PKG_DESCRIPTION")
    );
}

/// User-facing wording for a rejected request.
fn describe(err: &RequestError) -> String {
    match err {
        RequestError::PrefixLength { min, max, .. } => {
            format!("Error Prefix length should be between {min} and {max} characters")
        }
        RequestError::PrefixCharacters(prefix) => {
            format!("Error Prefix '{prefix}' should contain only letters and digits")
        }
        RequestError::CodeLength { min, max, .. } => {
            format!("Error Code length should be between {min} and {max} digits")
        }
        RequestError::Count { max, .. } => {
            format!("Error Number of codes should be between 1 and {max}")
        }
        RequestError::KeyspaceExceeded {
            possible,
            digit_length,
        } => format!(
            "Warning Maximum [{}] numbers can be created with a length of [{digit_length}]",
            format_thousands(*possible)
        ),
    }
}

/// User-facing wording for a run that ended in an error.
fn describe_failure(err: &PipelineError) -> String {
    match err {
        PipelineError::Stalled {
            completed, target, ..
        } => format!(
            "Error! No new unique code could be found after {} of {} codes. Output was discarded.",
            format_thousands(*completed),
            format_thousands(*target)
        ),
        PipelineError::WorkersExhausted { completed, target } => format!(
            "Error! Code generation stopped after {} of {} codes. Output was discarded.",
            format_thousands(*completed),
            format_thousands(*target)
        ),
        PipelineError::Sink(e) => format!("Error! Issue saving codes to file: {e}"),
        PipelineError::Interrupt(e) => format!("Error! Could not listen for [CTRL + C]: {e}"),
        other => format!("Error! Code generation failed: {other}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use codegen_core::GenerationRequest;

    fn rejection(prefix: &str, digit_length: usize, target_count: u64) -> String {
        let request = GenerationRequest::builder()
            .prefix(prefix)
            .digit_length(digit_length)
            .target_count(target_count)
            .build();
        describe(&request.validate().unwrap_err())
    }

    #[test]
    fn describes_rejections() {
        assert_eq!(
            rejection("F", 6, 1),
            "Error Prefix length should be between 2 and 6 characters"
        );
        assert_eq!(
            rejection("FT", 3, 1),
            "Error Code length should be between 4 and 16 digits"
        );
        assert_eq!(
            rejection("FT", 6, 0),
            "Error Number of codes should be between 1 and 100000000"
        );
        assert_eq!(
            rejection("FT", 4, 10_001),
            "Warning Maximum [10,000] numbers can be created with a length of [4]"
        );
    }

    #[test]
    fn describes_failures_by_cause() {
        let stalled = PipelineError::Stalled {
            completed: 9_999,
            target: 10_000,
            attempts: 200_001,
            waited: std::time::Duration::from_secs(3),
        };
        assert_eq!(
            describe_failure(&stalled),
            "Error! No new unique code could be found after 9,999 of 10,000 codes. Output was discarded."
        );

        let sink = PipelineError::Sink(std::io::Error::other("disk full"));
        assert_eq!(
            describe_failure(&sink),
            "Error! Issue saving codes to file: disk full"
        );

        let exhausted = PipelineError::WorkersExhausted {
            completed: 0,
            target: 5,
        };
        assert!(describe_failure(&exhausted).starts_with("Error! Code generation stopped"));
        assert!(describe_failure(&PipelineError::Panicked("consumer"))
            .starts_with("Error! Code generation failed"));
    }
}
