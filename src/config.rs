//! Configuration types for fs-workqueue
//!
//! Defines CLI arguments and the typed runtime configuration built from them.

use crate::error::ConfigError;
use crate::lease::{ClaimMode, DEFAULT_LEASE_TIMEOUT};
use clap::{Parser, Subcommand, ValueEnum};
use regex::Regex;
use std::io::{self, BufRead};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Maximum reasonable worker concurrency
pub const MAX_WORKERS: usize = 512;

/// Default number of paths per work group
pub const DEFAULT_GROUP_SIZE: usize = 500;

/// Default zstd level for the index blob
pub const DEFAULT_COMPRESSION_LEVEL: i32 = 3;

/// Default sleep between empty fetches in continuous mode
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);

/// Resumable work queue over a shared filesystem workspace
#[derive(Parser, Debug, Clone)]
#[command(
    name = "fs-workqueue",
    version,
    about = "Resumable, lease-coordinated work queue over a shared filesystem workspace",
    long_about = "Partitions a list of input paths into fixed-size work groups and keeps\n\
                  an index of them in a shared workspace directory.\n\n\
                  Workers on any host that can see the workspace claim groups through\n\
                  lease marker files and mark them done by writing a result artifact.",
    after_help = "EXAMPLES:\n    \
        # Add paths to the index, 100 per group\n    \
        find /data -name '*.pdf' | fs-workqueue --workspace /shared/ws populate --group-size 100\n\n    \
        # Add paths from a file, skipping scratch files\n    \
        fs-workqueue --workspace /shared/ws populate paths.txt --exclude '\\.tmp$'\n\n    \
        # Watch progress\n    \
        fs-workqueue --workspace /shared/ws status --watch"
)]
pub struct CliArgs {
    /// Subcommand to run
    #[command(subcommand)]
    pub command: Command,

    /// Workspace root directory
    #[arg(long, env = "WORKQUEUE_WORKSPACE", global = true, value_name = "DIR")]
    pub workspace: Option<PathBuf>,

    /// Quiet mode - suppress progress output
    #[arg(short = 'q', long, global = true)]
    pub quiet: bool,

    /// Verbose output
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Group new paths and add them to the workspace index
    Populate {
        /// File with one path per line ("-" reads stdin)
        #[arg(value_name = "FILE", default_value = "-")]
        input: String,

        /// Number of paths per work group
        #[arg(short = 'g', long, default_value_t = DEFAULT_GROUP_SIZE, value_name = "NUM")]
        group_size: usize,

        /// Exclude paths matching pattern (can be repeated)
        #[arg(long = "exclude", value_name = "PATTERN", action = clap::ArgAction::Append)]
        exclude_patterns: Vec<String>,

        /// zstd level for the index file
        #[arg(long, default_value_t = DEFAULT_COMPRESSION_LEVEL, value_name = "LEVEL")]
        compression_level: i32,
    },

    /// Show workspace progress and leases
    Status {
        /// Watch mode - continuously update status
        #[arg(short, long)]
        watch: bool,

        /// Update interval for watch mode (seconds)
        #[arg(long, default_value = "2", value_name = "SECS")]
        interval: u64,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,

        /// Age after which a lease counts as stale (seconds)
        #[arg(long, default_value_t = DEFAULT_LEASE_TIMEOUT.as_secs(), value_name = "SECS")]
        lease_timeout: u64,
    },
}

/// Status output format
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

fn default_workers() -> usize {
    num_cpus::get()
}

fn compile_patterns(patterns: &[String]) -> Result<Vec<Regex>, ConfigError> {
    patterns
        .iter()
        .map(|p| {
            Regex::new(p).map_err(|e| ConfigError::InvalidPattern {
                pattern: p.clone(),
                reason: e.to_string(),
            })
        })
        .collect()
}

/// Configuration for a queue instance
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Workspace root
    pub workspace: PathBuf,
    /// Age after which a lease is considered abandoned
    pub lease_timeout: Duration,
    /// How lease markers are created
    pub claim_mode: ClaimMode,
    /// zstd level used when saving the index
    pub compression_level: i32,
}

impl QueueConfig {
    /// Defaults for a workspace root
    pub fn new(workspace: impl Into<PathBuf>) -> Self {
        Self {
            workspace: workspace.into(),
            lease_timeout: DEFAULT_LEASE_TIMEOUT,
            claim_mode: ClaimMode::default(),
            compression_level: DEFAULT_COMPRESSION_LEVEL,
        }
    }

    /// Set the lease staleness timeout
    pub fn with_lease_timeout(mut self, timeout: Duration) -> Self {
        self.lease_timeout = timeout;
        self
    }

    /// Set the claim mode
    pub fn with_claim_mode(mut self, mode: ClaimMode) -> Self {
        self.claim_mode = mode;
        self
    }

    /// Set the index compression level
    pub fn with_compression_level(mut self, level: i32) -> Self {
        self.compression_level = level;
        self
    }
}

/// Where populate reads its paths from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSource {
    Stdin,
    File(PathBuf),
}

impl PathSource {
    /// "-" means stdin, anything else is a file
    pub fn parse(input: &str) -> Self {
        if input == "-" {
            PathSource::Stdin
        } else {
            PathSource::File(PathBuf::from(input))
        }
    }
}

/// Configuration for the populate command
#[derive(Debug, Clone)]
pub struct PopulateConfig {
    /// Queue settings
    pub queue: QueueConfig,
    /// Input paths
    pub source: PathSource,
    /// Paths per group
    pub group_size: usize,
    /// Compiled exclude patterns
    pub exclude_patterns: Vec<Regex>,
    /// Show progress
    pub show_progress: bool,
}

impl PopulateConfig {
    /// Create from CLI args
    pub fn from_populate_args(
        workspace: &Path,
        input: &str,
        group_size: usize,
        exclude_patterns: &[String],
        compression_level: i32,
        quiet: bool,
    ) -> Result<Self, ConfigError> {
        if group_size == 0 {
            return Err(ConfigError::InvalidGroupSize(group_size));
        }

        Ok(Self {
            queue: QueueConfig::new(workspace).with_compression_level(compression_level),
            source: PathSource::parse(input),
            group_size,
            exclude_patterns: compile_patterns(exclude_patterns)?,
            show_progress: !quiet,
        })
    }

    /// Check if a path should be excluded
    pub fn is_excluded(&self, path: &str) -> bool {
        self.exclude_patterns.iter().any(|re| re.is_match(path))
    }

    /// Read one path per line, dropping blanks and excluded paths
    ///
    /// Returns the kept paths and the number of excluded ones.
    pub fn collect_paths<R: BufRead>(&self, reader: R) -> io::Result<(Vec<String>, usize)> {
        let mut paths = Vec::new();
        let mut excluded = 0;
        for line in reader.lines() {
            let line = line?;
            let path = line.trim_end_matches('\r');
            if path.trim().is_empty() {
                continue;
            }
            if self.is_excluded(path) {
                excluded += 1;
                continue;
            }
            paths.push(path.to_string());
        }
        Ok((paths, excluded))
    }
}

/// Configuration for the status command
#[derive(Debug, Clone)]
pub struct StatusConfig {
    /// Workspace root
    pub workspace: PathBuf,
    /// Keep refreshing until interrupted
    pub watch: bool,
    /// Refresh interval
    pub interval: Duration,
    /// Output format
    pub format: OutputFormat,
    /// Staleness threshold for reporting leases
    pub lease_timeout: Duration,
}

impl StatusConfig {
    /// Create from CLI args
    pub fn from_status_args(
        workspace: &Path,
        watch: bool,
        interval: u64,
        format: OutputFormat,
        lease_timeout: u64,
    ) -> Self {
        Self {
            workspace: workspace.to_path_buf(),
            watch,
            interval: Duration::from_secs(interval.max(1)),
            format,
            lease_timeout: Duration::from_secs(lease_timeout),
        }
    }
}

/// Configuration for a queue worker driver
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Worker ID used in logs
    pub worker_id: String,
    /// Number of concurrent processing tasks
    pub concurrency: usize,
    /// Stop after this many items
    pub max_items: Option<u64>,
    /// Re-initialize and keep polling when the queue runs dry
    pub continuous: bool,
    /// Sleep between empty polls in continuous mode
    pub poll_interval: Duration,
    /// Emit progress callbacks
    pub show_progress: bool,
}

impl WorkerConfig {
    /// Validated worker configuration
    ///
    /// A worker ID is generated from the hostname when none is given.
    pub fn new(worker_id: Option<&str>, concurrency: usize) -> Result<Self, ConfigError> {
        if concurrency == 0 || concurrency > MAX_WORKERS {
            return Err(ConfigError::InvalidWorkerCount {
                count: concurrency,
                max: MAX_WORKERS,
            });
        }

        let worker_id = worker_id
            .map(|s| s.to_string())
            .unwrap_or_else(generate_worker_id);

        Ok(Self {
            worker_id,
            concurrency,
            max_items: None,
            continuous: false,
            poll_interval: DEFAULT_POLL_INTERVAL,
            show_progress: false,
        })
    }

    /// Stop after `max` items
    pub fn with_max_items(mut self, max: u64) -> Self {
        self.max_items = Some(max);
        self
    }

    /// Keep polling with the given interval when the queue is empty
    pub fn continuous(mut self, poll_interval: Duration) -> Self {
        self.continuous = true;
        self.poll_interval = poll_interval;
        self
    }

    /// Enable progress callbacks
    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            worker_id: generate_worker_id(),
            concurrency: default_workers().min(MAX_WORKERS),
            max_items: None,
            continuous: false,
            poll_interval: DEFAULT_POLL_INTERVAL,
            show_progress: false,
        }
    }
}

/// `<hostname>-<8 hex chars>`
pub fn generate_worker_id() -> String {
    let hostname = hostname::get()
        .map(|h| h.to_string_lossy().to_string())
        .unwrap_or_else(|_| "unknown".to_string());
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!("{}-{}", hostname, &suffix[..8])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_populate() {
        let args = CliArgs::try_parse_from([
            "fs-workqueue",
            "--workspace",
            "/tmp/ws",
            "populate",
            "paths.txt",
            "-g",
            "10",
            "--exclude",
            r"\.tmp$",
            "--exclude",
            "^/scratch/",
        ])
        .unwrap();

        assert_eq!(args.workspace, Some(PathBuf::from("/tmp/ws")));
        match args.command {
            Command::Populate {
                input,
                group_size,
                exclude_patterns,
                compression_level,
            } => {
                assert_eq!(input, "paths.txt");
                assert_eq!(group_size, 10);
                assert_eq!(exclude_patterns.len(), 2);
                assert_eq!(compression_level, DEFAULT_COMPRESSION_LEVEL);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_cli_parse_status_defaults() {
        let args =
            CliArgs::try_parse_from(["fs-workqueue", "status", "--workspace", "ws"]).unwrap();
        match args.command {
            Command::Status {
                watch,
                interval,
                format,
                lease_timeout,
            } => {
                assert!(!watch);
                assert_eq!(interval, 2);
                assert_eq!(format, OutputFormat::Text);
                assert_eq!(lease_timeout, 1800);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_populate_config_rejects_bad_input() {
        let ws = Path::new("/tmp/ws");
        assert!(matches!(
            PopulateConfig::from_populate_args(ws, "-", 0, &[], 3, false),
            Err(ConfigError::InvalidGroupSize(0))
        ));
        assert!(matches!(
            PopulateConfig::from_populate_args(ws, "-", 5, &["(".to_string()], 3, false),
            Err(ConfigError::InvalidPattern { .. })
        ));
    }

    #[test]
    fn test_collect_paths_filters() {
        let config = PopulateConfig::from_populate_args(
            Path::new("/tmp/ws"),
            "-",
            5,
            &[r"\.tmp$".to_string()],
            3,
            true,
        )
        .unwrap();
        assert_eq!(config.source, PathSource::Stdin);
        assert!(!config.show_progress);

        let input = "/data/a.pdf\r\n\n/data/b.tmp\n   \n/data/c.pdf\n";
        let (paths, excluded) = config.collect_paths(input.as_bytes()).unwrap();
        assert_eq!(paths, vec!["/data/a.pdf", "/data/c.pdf"]);
        assert_eq!(excluded, 1);
    }

    #[test]
    fn test_worker_config() {
        assert!(matches!(
            WorkerConfig::new(None, 0),
            Err(ConfigError::InvalidWorkerCount { .. })
        ));
        assert!(WorkerConfig::new(None, MAX_WORKERS + 1).is_err());

        let config = WorkerConfig::new(Some("w1"), 4)
            .unwrap()
            .with_max_items(10)
            .continuous(Duration::from_secs(5));
        assert_eq!(config.worker_id, "w1");
        assert_eq!(config.max_items, Some(10));
        assert!(config.continuous);
        assert_eq!(config.poll_interval, Duration::from_secs(5));
    }

    #[test]
    fn test_generated_worker_id() {
        let id = generate_worker_id();
        let (_, suffix) = id.rsplit_once('-').unwrap();
        assert_eq!(suffix.len(), 8);
        assert_ne!(id, generate_worker_id());
    }
}
