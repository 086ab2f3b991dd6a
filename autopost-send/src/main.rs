//! autopost-send - Background daemon for scheduled posting
//!
//! Checks the media pool and credentials, then publishes one queued post at
//! each configured time of day.

use chrono::Utc;
use clap::Parser;
use libautopost::config::Credentials;
use libautopost::content::ContentStore;
use libautopost::error::{AutopostError, MediaError, PlatformError};
use libautopost::logging::{LogFormat, LoggingConfig};
use libautopost::media::{ensure_folder, MediaPool};
use libautopost::notify::{sink_from_env, Reporter};
use libautopost::platforms::twitter::TwitterClient;
use libautopost::platforms::Platform;
use libautopost::schedule::{clamp_posts_per_day, select_slots, DailySchedule};
use libautopost::{Config, CycleOutcome, MentionRotator, PostCycle, Result};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::time::{sleep, Duration};
use tracing::{debug, info};

#[derive(Parser, Debug)]
#[command(name = "autopost-send")]
#[command(version)]
#[command(about = "Background daemon for scheduled posting")]
#[command(long_about = "\
autopost-send - Background daemon for scheduled posting

DESCRIPTION:
    autopost-send publishes one post from the content queue at each
    scheduled time of day (UTC). Every post gets the next media file from
    the media folder and a rotating block of ten mentions.

    Failed uploads or publishes skip the item and move on; the queue is
    re-read from disk whenever it has been worked through.

USAGE:
    # Run in foreground (logs to stderr)
    autopost-send

    # Check credentials only
    autopost-send --verify

    # Publish the first queued post now and exit
    autopost-send --once

ENVIRONMENT:
    TWITTER_API_KEY, TWITTER_API_SECRET,
    TWITTER_ACCESS_TOKEN, TWITTER_ACCESS_SECRET   (required)
    TELEGRAM_BOT_TOKEN, TELEGRAM_CHAT_ID          (optional notifications)
    A .env file in the working directory is read first.

SIGNALS:
    SIGTERM, SIGINT - Graceful shutdown (finishes current post)

CONFIGURATION:
    Configuration file: ~/.config/autopost/config.toml

    [schedule]
    posts_per_day = 4      # clamped to 4..=10
    poll_interval = 60     # seconds between schedule checks

    [content]
    path = \"tweetlist.xlsx\"
    column = \"Tweet\"

    [media]
    folder = \"media\"

EXIT CODES:
    0 - Clean shutdown
    1 - Runtime or configuration error
    2 - Credential verification failed
    3 - Invalid input (empty post queue)
")]
struct Cli {
    /// Path to the config file (overrides AUTOPOST_CONFIG)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Poll interval in seconds (overrides config)
    #[arg(long, value_name = "SECONDS")]
    poll_interval: Option<u64>,

    /// Enable verbose logging to stderr
    #[arg(short, long)]
    verbose: bool,

    /// Log format: text, json or pretty
    #[arg(long, value_name = "FORMAT")]
    log_format: Option<LogFormat>,

    /// Run a single post cycle immediately and exit
    #[arg(long, conflicts_with = "verify")]
    once: bool,

    /// Verify credentials and exit
    #[arg(long)]
    verify: bool,
}

#[tokio::main]
async fn main() {
    // A missing .env is fine; the variables may come from the environment
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    if let Err(e) = LoggingConfig::from_env(cli.log_format, cli.verbose).try_init() {
        eprintln!("Warning: {}", e);
    }

    match run(cli).await {
        Ok(0) => {}
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(e.exit_code());
        }
    }
}

async fn run(cli: Cli) -> Result<i32> {
    let config = match &cli.config {
        Some(path) => Config::load_from_path(path)?,
        None => Config::load()?,
    };
    let reporter = Reporter::new(sink_from_env(&config.telegram));

    let posts_per_day = clamp_posts_per_day(config.schedule.posts_per_day);
    if cli.verify {
        let client = build_client(&config, &reporter).await?;
        verify_credentials(&client, &reporter).await?;
        return Ok(0);
    }

    reporter
        .info(format!(
            "Autopost bot starting with {} posts per day",
            posts_per_day
        ))
        .await;

    let media = prepare_media(&config, &reporter).await?;
    let client = build_client(&config, &reporter).await?;
    verify_credentials(&client, &reporter).await?;

    let mut content = ContentStore::open(&config.content_path(), &config.content.column);
    match content.load() {
        Ok(0) => {
            let message = format!("No posts found in {}", content.describe());
            reporter.error(format!("{}. Stopping", message)).await;
            return Err(AutopostError::InvalidInput(message));
        }
        Ok(count) => {
            reporter
                .info(format!("Loaded {} post(s) from {}", count, content.describe()))
                .await;
        }
        Err(e) => {
            reporter.error(format!("Could not load posts: {}", e)).await;
            return Err(e);
        }
    }

    let mentions = MentionRotator::new(&config.mentions.handles, config.mentions.window);
    let mut cycle = PostCycle::new(
        content,
        media,
        mentions,
        Box::new(client),
        reporter.clone(),
    );

    if cli.once {
        let outcome = cycle.run().await;
        debug!(?outcome, "Single cycle finished");
        return Ok(if outcome.is_published() { 0 } else { 1 });
    }

    let slots = select_slots(&config.schedule.slots, config.schedule.posts_per_day)?;
    let mut schedule = DailySchedule::new(slots, Utc::now());
    for slot in schedule.slots() {
        reporter
            .info(format!("Scheduled post at {} UTC", slot))
            .await;
    }
    reporter
        .info(format!("Scheduled {} posts per day", schedule.len()))
        .await;

    let shutdown = Arc::new(AtomicBool::new(false));
    setup_signal_handlers(shutdown.clone())?;

    let poll_interval = cli.poll_interval.unwrap_or(config.schedule.poll_interval).max(1);
    info!("Poll interval: {}s", poll_interval);

    run_daemon_loop(&mut cycle, &mut schedule, poll_interval, shutdown).await;

    reporter.info("Autopost bot stopped by user").await;
    Ok(0)
}

/// Media pool checks: the folder is created when missing, but the bot still
/// stops because there is nothing to post with
async fn prepare_media(config: &Config, reporter: &Reporter) -> Result<MediaPool> {
    let folder = config.media_folder();

    let created = match ensure_folder(&folder) {
        Ok(created) => created,
        Err(e) => {
            reporter.error(format!("Cannot use media folder: {}", e)).await;
            return Err(e);
        }
    };
    if created {
        reporter
            .error(format!(
                "Media folder '{}' did not exist and has been created. \
                 Add at least {} images or videos and restart",
                folder.display(),
                config.media.min_files
            ))
            .await;
        return Err(MediaError::FolderMissing(folder.display().to_string()).into());
    }

    match MediaPool::scan(&folder, config.media.min_files) {
        Ok(pool) => {
            reporter
                .info(format!(
                    "Found {} media file(s) in {}",
                    pool.len(),
                    folder.display()
                ))
                .await;
            Ok(pool)
        }
        Err(e) => {
            reporter.error(format!("{}. Stopping", e)).await;
            Err(e)
        }
    }
}

async fn build_client(config: &Config, reporter: &Reporter) -> Result<TwitterClient> {
    let credentials = match Credentials::from_env() {
        Ok(credentials) => credentials,
        Err(e) => {
            reporter
                .error(format!("Twitter credentials are incomplete: {}", e))
                .await;
            return Err(e);
        }
    };
    TwitterClient::new(&config.twitter, credentials)
}

/// Any failure to verify is treated as an authentication failure
async fn verify_credentials(client: &TwitterClient, reporter: &Reporter) -> Result<String> {
    reporter.info("Verifying Twitter credentials...").await;

    match client.verify_credentials().await {
        Ok(username) => {
            reporter
                .info(format!("Authenticated as @{}", username))
                .await;
            Ok(username)
        }
        Err(e) => {
            reporter
                .error(format!("Credential verification failed: {}", e))
                .await;
            reporter
                .error(
                    "Check the four TWITTER_* keys in your .env file, make sure the app has \
                     Read and Write permission, and regenerate the access token after \
                     changing permissions",
                )
                .await;
            if e.is_authentication() {
                Err(e)
            } else {
                Err(PlatformError::Authentication(e.to_string()).into())
            }
        }
    }
}

/// Set up signal handlers for graceful shutdown
#[cfg(unix)]
fn setup_signal_handlers(shutdown: Arc<AtomicBool>) -> Result<()> {
    use signal_hook::consts::{SIGINT, SIGTERM};
    use signal_hook::iterator::Signals;

    let mut signals = Signals::new([SIGINT, SIGTERM])
        .map_err(|e| AutopostError::InvalidInput(format!("Signal setup failed: {}", e)))?;

    std::thread::spawn(move || {
        if let Some(sig) = signals.forever().next() {
            info!("Received signal {}, stopping after the current post...", sig);
            shutdown.store(true, Ordering::Relaxed);
        }
    });

    Ok(())
}

#[cfg(not(unix))]
fn setup_signal_handlers(shutdown: Arc<AtomicBool>) -> Result<()> {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received Ctrl-C, stopping after the current post...");
            shutdown.store(true, Ordering::Relaxed);
        }
    });
    Ok(())
}

/// Main daemon loop
async fn run_daemon_loop(
    cycle: &mut PostCycle,
    schedule: &mut DailySchedule,
    poll_interval: u64,
    shutdown: Arc<AtomicBool>,
) {
    if let Some(next) = schedule.next_run() {
        info!("Next post at {}", next.format("%Y-%m-%d %H:%M UTC"));
    }

    loop {
        if shutdown.load(Ordering::Relaxed) {
            info!("Shutdown requested, stopping daemon loop");
            break;
        }

        let outcomes = cycle.run_due(schedule, Utc::now(), &shutdown).await;
        for (slot, outcome) in &outcomes {
            match outcome {
                CycleOutcome::Published { position, .. } => {
                    debug!(%slot, position, "Scheduled post published")
                }
                outcome => debug!(%slot, ?outcome, "Scheduled post not published"),
            }
        }
        if !outcomes.is_empty() {
            if let Some(next) = schedule.next_run() {
                info!("Next post at {}", next.format("%Y-%m-%d %H:%M UTC"));
            }
        }

        // Sleep until next poll (check shutdown every second)
        for _ in 0..poll_interval {
            if shutdown.load(Ordering::Relaxed) {
                break;
            }
            sleep(Duration::from_secs(1)).await;
        }
    }
}
