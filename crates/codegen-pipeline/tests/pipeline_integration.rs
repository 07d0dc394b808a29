use std::collections::HashSet;
use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use codegen_core::format::{HELP_LINE, RULE_WIDTH};
use codegen_core::{Code, GenerationRequest};
use codegen_filter::FilterKind;
use codegen_generator::from_fn;
use codegen_pipeline::{
    Artifact, FsArtifactStore, Interrupts, Pipeline, PipelineConfig, PipelineError, Progress,
    ProgressObserver, RunOutcome, Silent,
};

/// Output directory laid out like the CLI's default destination.
struct OutputDir {
    tmp: tempfile::TempDir,
}

impl OutputDir {
    fn new() -> Self {
        let tmp = tempfile::tempdir().expect("Failed to create temp dir");
        fs::create_dir_all(tmp.path().join("Code Generator").join("Files"))
            .expect("Failed to create output dir");
        Self { tmp }
    }

    fn root(&self) -> PathBuf {
        self.tmp.path().join("Code Generator")
    }

    fn files(&self) -> PathBuf {
        self.root().join("Files")
    }

    fn artifact(&self, name: &str) -> (Artifact, BufWriter<fs::File>) {
        Artifact::create(self.files().join(name), FsArtifactStore::with_root(self.root()))
            .expect("Failed to create artifact")
    }
}

fn request(prefix: &str, digit_length: usize, target_count: u64) -> GenerationRequest {
    GenerationRequest::builder()
        .prefix(prefix)
        .digit_length(digit_length)
        .target_count(target_count)
        .build()
}

fn small_pipeline() -> Pipeline {
    Pipeline::new(
        PipelineConfig::builder()
            .workers(8)
            .channel_capacity(16)
            .tick(Duration::from_millis(5))
            .build(),
    )
}

fn body_lines(path: &Path) -> Vec<String> {
    let text = fs::read_to_string(path).expect("Failed to read output");
    let lines: Vec<String> = text.lines().map(str::to_owned).collect();
    assert_eq!(lines[1], HELP_LINE);
    assert_eq!(lines[2], "-".repeat(RULE_WIDTH));
    lines.into_iter().skip(3).collect()
}

fn is_code(line: &str, prefix: &str, digit_length: usize) -> bool {
    Code::parse(line, prefix, digit_length).is_ok()
}

/// Records the latest completed count where the test thread can poll it.
#[derive(Clone, Default)]
struct SharedProgress(Arc<AtomicU64>);

impl ProgressObserver for SharedProgress {
    fn on_progress(&mut self, progress: &Progress) {
        self.0.store(progress.completed, Ordering::SeqCst);
    }
}

#[test]
fn test_generates_requested_unique_codes() {
    let dir = OutputDir::new();
    let (artifact, out) = dir.artifact("[FT]-CODES_test.txt");
    let req = request("FT", 4, 10);

    let outcome = small_pipeline()
        .run(&req, out, artifact, Interrupts::never(), Silent)
        .unwrap();

    let RunOutcome::Completed { path, summary } = outcome else {
        panic!("expected completion, got {outcome:?}");
    };
    assert_eq!(summary.written, 10);
    assert!(summary.stats.delivered >= 10);

    let text = fs::read_to_string(&path).unwrap();
    assert!(text.starts_with("10 codes were generated | "));

    let lines = body_lines(&path);
    assert_eq!(lines.len(), 10);
    assert!(lines.iter().all(|l| is_code(l, "FT", 4)));
    assert_eq!(lines.iter().collect::<HashSet<_>>().len(), 10);
}

#[test]
fn test_single_code_uses_singular_header() {
    let dir = OutputDir::new();
    let (artifact, out) = dir.artifact("[AB]-CODE_test.txt");

    let outcome = small_pipeline()
        .run(&request("AB", 6, 1), out, artifact, Interrupts::never(), Silent)
        .unwrap();

    let RunOutcome::Completed { path, .. } = outcome else {
        panic!("expected completion");
    };
    let text = fs::read_to_string(&path).unwrap();
    assert!(text.starts_with("1 code were generated at "));
    assert_eq!(body_lines(&path).len(), 1);
}

#[test]
fn test_full_keyspace_terminates() {
    let dir = OutputDir::new();
    let (artifact, out) = dir.artifact("[FK]-CODES_test.txt");
    let req = request("FK", 4, 10_000);
    assert!(req.is_full_keyspace());

    let outcome = small_pipeline()
        .run(&req, out, artifact, Interrupts::never(), Silent)
        .unwrap();

    let RunOutcome::Completed { path, .. } = outcome else {
        panic!("expected completion");
    };
    let digits: HashSet<String> = body_lines(&path)
        .iter()
        .map(|l| l.trim_start_matches("FK-").to_owned())
        .collect();
    assert_eq!(digits.len(), 10_000);
    assert!(digits.contains("0000"));
    assert!(digits.contains("9999"));
}

#[test]
fn test_full_keyspace_outlasts_short_stall_timeout() {
    let dir = OutputDir::new();
    let (artifact, out) = dir.artifact("[FK]-CODES_slow_tail.txt");
    // the last codes take far longer than one stall interval to find
    let pipeline = Pipeline::new(
        PipelineConfig::builder()
            .workers(4)
            .channel_capacity(16)
            .stall_timeout(Duration::from_millis(1))
            .build(),
    );

    let outcome = pipeline
        .run(&request("FK", 4, 10_000), out, artifact, Interrupts::never(), Silent)
        .unwrap();

    let RunOutcome::Completed { path, summary } = outcome else {
        panic!("expected completion, got {outcome:?}");
    };
    assert_eq!(summary.written, 10_000);
    assert_eq!(body_lines(&path).len(), 10_000);
}

#[test]
fn test_line_numbers() {
    let dir = OutputDir::new();
    let (artifact, out) = dir.artifact("[LN]-CODES_test.txt");
    let req = GenerationRequest::builder()
        .prefix("LN")
        .digit_length(5)
        .target_count(25)
        .line_numbers(true)
        .build();

    let outcome = small_pipeline()
        .run(&req, out, artifact, Interrupts::never(), Silent)
        .unwrap();

    let RunOutcome::Completed { path, .. } = outcome else {
        panic!("expected completion");
    };
    for (i, line) in body_lines(&path).iter().enumerate() {
        let (index, code) = line.split_once(": ").expect("numbered line");
        assert_eq!(index, (i + 1).to_string());
        assert!(is_code(code, "LN", 5));
    }
}

#[test]
fn test_bloom_filter_run() {
    let dir = OutputDir::new();
    let (artifact, out) = dir.artifact("[BF]-CODES_test.txt");
    let pipeline = Pipeline::new(
        PipelineConfig::builder()
            .workers(8)
            .filter(FilterKind::Bloom {
                false_positive_rate: 0.001,
            })
            .build(),
    );

    let outcome = pipeline
        .run(&request("BF", 8, 5_000), out, artifact, Interrupts::never(), Silent)
        .unwrap();

    let RunOutcome::Completed { path, .. } = outcome else {
        panic!("expected completion");
    };
    let lines = body_lines(&path);
    assert_eq!(lines.len(), 5_000);
    assert_eq!(lines.iter().collect::<HashSet<_>>().len(), 5_000);
}

#[test]
fn test_interrupt_discards_sole_artifact_and_directory() {
    let dir = OutputDir::new();
    let (artifact, out) = dir.artifact("[FT]-CODES_partial.txt");
    let path = artifact.path().to_path_buf();
    let (trigger, interrupts) = Interrupts::channel();
    let progress = SharedProgress::default();

    let pipeline = Pipeline::new(
        PipelineConfig::builder()
            .workers(2)
            .channel_capacity(1)
            .tick(Duration::from_millis(5))
            .build(),
    );
    let req = request("FT", 4, 100);
    let observer = progress.clone();
    let run = thread::spawn(move || {
        pipeline.run_with(
            &req,
            |id| {
                let mut n = 0_u64;
                from_fn(move || {
                    thread::sleep(Duration::from_millis(50));
                    n += 1;
                    Code::new_unchecked(format!("FT-{}{n:03}", id))
                })
            },
            out,
            artifact,
            interrupts,
            observer,
        )
    });

    awaitility::at_most(Duration::from_secs(5)).until(|| progress.0.load(Ordering::SeqCst) >= 3);
    trigger.trigger();

    let outcome = run.join().unwrap().unwrap();
    let RunOutcome::Interrupted { summary } = outcome else {
        panic!("expected interruption, got {outcome:?}");
    };
    assert!(summary.written >= 3);
    assert!(summary.written < 100);
    assert!(!path.exists());
    assert!(!dir.root().exists());
    assert!(dir.tmp.path().exists());
}

#[test]
fn test_interrupt_keeps_other_artifacts() {
    let dir = OutputDir::new();
    let previous = dir.files().join("[FT]-CODES_previous.txt");
    fs::write(&previous, "earlier run").unwrap();

    let (artifact, out) = dir.artifact("[FT]-CODES_partial.txt");
    let path = artifact.path().to_path_buf();
    let (trigger, interrupts) = Interrupts::channel();
    // already pending when the run starts
    trigger.trigger();

    let pipeline = Pipeline::new(PipelineConfig::builder().workers(2).build());
    let outcome = pipeline
        .run_with(
            &request("FT", 4, 100),
            |_| {
                from_fn(|| {
                    thread::sleep(Duration::from_millis(50));
                    Code::new_unchecked("FT-0000")
                })
            },
            out,
            artifact,
            interrupts,
            Silent,
        )
        .unwrap();

    assert!(!outcome.is_completed());
    assert!(!path.exists());
    assert_eq!(fs::read_to_string(&previous).unwrap(), "earlier run");
}

#[test]
fn test_stall_is_fatal_and_discards_output() {
    let dir = OutputDir::new();
    let (artifact, out) = dir.artifact("[FT]-CODES_stalled.txt");
    let path = artifact.path().to_path_buf();
    let pipeline = Pipeline::new(
        PipelineConfig::builder()
            .workers(2)
            .stall_timeout(Duration::from_millis(100))
            .build(),
    );

    let err = pipeline
        .run_with(
            &request("FT", 4, 3),
            |_| from_fn(|| Code::new_unchecked("FT-0000")),
            out,
            artifact,
            Interrupts::never(),
            Silent,
        )
        .unwrap_err();

    assert!(matches!(
        err,
        PipelineError::Stalled {
            completed: 1,
            target: 3,
            ..
        }
    ));
    assert!(!path.exists());
}

/// Accepts every write but cannot flush.
struct FlushFails(BufWriter<fs::File>);

impl Write for FlushFails {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        Err(io::Error::other("device gone"))
    }
}

#[test]
fn test_flush_failure_discards_output() {
    let dir = OutputDir::new();
    let (artifact, out) = dir.artifact("[FT]-CODES_unflushed.txt");
    let path = artifact.path().to_path_buf();

    let err = small_pipeline()
        .run(
            &request("FT", 4, 20),
            FlushFails(out),
            artifact,
            Interrupts::never(),
            Silent,
        )
        .unwrap_err();

    assert!(matches!(err, PipelineError::Sink(_)));
    assert!(!path.exists());
    assert!(!dir.root().exists());
}

#[test]
fn test_invalid_request_discards_output() {
    let dir = OutputDir::new();
    let (artifact, out) = dir.artifact("[FT]-CODES_invalid.txt");
    let path = artifact.path().to_path_buf();

    let err = small_pipeline()
        .run(&request("FT", 4, 10_001), out, artifact, Interrupts::never(), Silent)
        .unwrap_err();

    assert!(matches!(err, PipelineError::Request(_)));
    assert!(!path.exists());
}
