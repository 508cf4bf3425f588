//! Chirp Firehose - Command-Line Stream Consumer
//!
//! Opens one of the streaming endpoints and prints statuses as they arrive.
//! Reconnects follow the configured attempts-per-minute cap.
//!
//! # Usage
//!
//! ```bash
//! # Random sample, credentials from the environment
//! CHIRP_USER=alice CHIRP_PASSWORD=secret chirp-firehose sample
//!
//! # Follow two accounts and a keyword, stop after 100 statuses
//! chirp-firehose --limit 100 filter --follow 12,34 --track rust
//!
//! # One JSON document per line
//! chirp-firehose --json sample
//!
//! # Verbose logging
//! RUST_LOG=chirp_core=debug chirp-firehose sample
//! ```

use std::path::PathBuf;
use std::sync::{mpsc, Arc};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use chirp_core::{
    load_config_from_path, ConfigOverrides, Credentials, Status, StatusDeletionNotice,
    StatusListener, StreamError, StreamRequest, StreamState, StreamSupervisor,
};

/// Chirp Firehose - print statuses from the streaming API
#[derive(Parser, Debug)]
#[command(name = "chirp-firehose")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short = 'c', long, env = "CHIRP_CONFIG", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Account name (overrides config and CHIRP_USER)
    #[arg(short = 'u', long, value_name = "NAME")]
    user: Option<String>,

    /// Account password
    #[arg(short = 'p', long, value_name = "PASSWORD", requires = "user")]
    password: Option<String>,

    /// Connection attempts allowed per minute
    #[arg(short = 'r', long, value_name = "N")]
    retries_per_minute: Option<usize>,

    /// Streaming API base URL (must end with '/')
    #[arg(long, value_name = "URL")]
    stream_base_url: Option<String>,

    /// Stop after this many statuses
    #[arg(short = 'n', long, value_name = "N")]
    limit: Option<usize>,

    /// Print statuses as JSON, one per line
    #[arg(long)]
    json: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'l', long, env = "CHIRP_LOG_LEVEL", default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    stream: StreamCommand,
}

#[derive(Subcommand, Debug)]
enum StreamCommand {
    /// Random sample of public statuses
    Sample,

    /// Statuses from given accounts or matching keywords
    Filter {
        /// Earlier statuses to replay first
        #[arg(long, default_value_t = 0)]
        count: i32,

        /// Account ids to follow
        #[arg(long, value_delimiter = ',')]
        follow: Vec<u64>,

        /// Keywords to track
        #[arg(long, value_delimiter = ',')]
        track: Vec<String>,
    },

    /// Every public status
    Firehose {
        /// Earlier statuses to replay first
        #[arg(long, default_value_t = 0)]
        count: i32,
    },

    /// Public statuses containing links
    Links {
        /// Earlier statuses to replay first
        #[arg(long, default_value_t = 0)]
        count: i32,
    },

    /// Every retweet
    Retweet,
}

impl StreamCommand {
    fn into_request(self) -> Result<StreamRequest> {
        Ok(match self {
            Self::Sample => StreamRequest::Sample,
            Self::Filter {
                count,
                follow,
                track,
            } => StreamRequest::filter(count, follow, track)?,
            Self::Firehose { count } => StreamRequest::Firehose { count },
            Self::Links { count } => StreamRequest::Links { count },
            Self::Retweet => StreamRequest::Retweet,
        })
    }
}

// =============================================================================
// Listener
// =============================================================================

enum Received {
    Status(Box<Status>),
    Deletion(StatusDeletionNotice),
    Limited(u64),
}

/// Hands records to the main thread; logs everything else
struct Forwarder {
    tx: parking_lot::Mutex<mpsc::Sender<Received>>,
}

impl StatusListener for Forwarder {
    fn on_status(&self, status: Status) {
        let _ = self.tx.lock().send(Received::Status(Box::new(status)));
    }

    fn on_deletion_notice(&self, notice: StatusDeletionNotice) {
        let _ = self.tx.lock().send(Received::Deletion(notice));
    }

    fn on_track_limitation_notice(&self, withheld: u64) {
        let _ = self.tx.lock().send(Received::Limited(withheld));
    }

    fn on_exception(&self, error: &StreamError) {
        warn!(error = %error, "Stream error");
    }

    fn on_state_change(&self, state: StreamState) {
        info!(state = %state, "Stream state");
    }
}

// =============================================================================
// Main
// =============================================================================

fn init_logging(level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(format!("chirp_firehose={level},chirp_core={level}"))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(true)
        .with_writer(std::io::stderr)
        .init();
}

fn print_status(status: &Status, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string(status)?);
    } else {
        println!(
            "@{} [{}]: {}",
            status.screen_name().unwrap_or("?"),
            status.id,
            status.text.replace('\n', " ")
        );
    }
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args.log_level);

    let mut config = load_config_from_path(args.config.clone())
        .context("Failed to load configuration")?;

    let mut overrides = ConfigOverrides::new();
    if let Some(user) = args.user.clone() {
        overrides = overrides.with_credentials(Credentials::new(
            user,
            args.password.clone().unwrap_or_default(),
        ));
    }
    if let Some(retries) = args.retries_per_minute {
        overrides = overrides.with_retries_per_minute(retries);
    }
    if let Some(url) = args.stream_base_url.clone() {
        overrides = overrides.with_stream_base_url(url);
    }
    overrides.apply(&mut config);
    config.validate().context("Invalid configuration")?;

    let request = args.stream.into_request()?;
    let (tx, rx) = mpsc::channel();
    let supervisor = StreamSupervisor::new(&config)
        .context("Failed to create stream supervisor")?
        .with_listener(Arc::new(Forwarder {
            tx: parking_lot::Mutex::new(tx),
        }));

    info!(
        stream = %request,
        base_url = %config.api.stream_base_url,
        retries_per_minute = config.stream.retries_per_minute,
        "Starting stream"
    );
    supervisor.start(request).context("Failed to start stream")?;

    let mut printed = 0usize;
    for received in rx {
        match received {
            Received::Status(status) => {
                print_status(&status, args.json)?;
                printed += 1;
                if args.limit.is_some_and(|limit| printed >= limit) {
                    info!(printed, "Status limit reached");
                    break;
                }
            }
            Received::Deletion(notice) => {
                info!(status_id = notice.status_id, user_id = notice.user_id, "Status deleted");
            }
            Received::Limited(withheld) => {
                warn!(withheld, "Track limit hit, statuses withheld");
            }
        }
    }

    supervisor.cleanup();
    supervisor.join();
    Ok(())
}
