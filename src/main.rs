//! grabber - download a video or audio track with yt-dlp
//!
//! Prints the path of the written file on stdout and nothing else; all
//! diagnostics go to stderr.

use anyhow::Result;
use clap::Parser;
use grabber::app::{self, Invocation};
use grabber::database::{initialize_database, DownloadRecord, HistoryStore};
use grabber::utils::Settings;
use grabber::YtDlpExtractor;
use std::path::{Path, PathBuf};
use tracing::{warn, Level};

#[derive(Parser)]
#[command(version, about)]
struct Args {
    /// Media URL understood by yt-dlp
    #[arg(required_unless_present_any = ["history", "history_stats"])]
    url: Option<String>,

    /// Output format: mp3 for audio only, anything else (usually mp4) for video
    #[arg(required_unless_present_any = ["history", "history_stats"])]
    format: Option<String>,

    /// JSON settings file
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Directory to write into (default: downloads)
    #[arg(long, value_name = "DIR")]
    output_dir: Option<PathBuf>,

    /// Create the output directory if it does not exist
    #[arg(long)]
    create_output_dir: bool,

    /// Path to the yt-dlp executable
    #[arg(long = "yt-dlp", value_name = "PATH")]
    ytdlp: Option<PathBuf>,

    /// Record completed downloads in this SQLite database
    #[arg(long, value_name = "FILE")]
    history_db: Option<PathBuf>,

    /// Print recorded downloads as JSON lines and exit
    #[arg(long, conflicts_with = "history_stats")]
    history: bool,

    /// Print download counts per format as JSON and exit
    #[arg(long)]
    history_stats: bool,

    /// More logging on stderr (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

impl Args {
    fn settings(&self) -> Result<Settings> {
        let mut settings = Settings::load(self.config.as_deref())?;
        if let Some(dir) = &self.output_dir {
            settings.output_dir = dir.clone();
        }
        if self.create_output_dir {
            settings.create_output_dir = true;
        }
        if let Some(path) = &self.ytdlp {
            settings.ytdlp_path = Some(path.clone());
        }
        if let Some(path) = &self.history_db {
            settings.history_db = Some(path.clone());
        }
        Ok(settings)
    }

    fn log_level(&self) -> Level {
        match (self.quiet, self.verbose) {
            (true, _) => Level::ERROR,
            (false, 0) => Level::WARN,
            (false, 1) => Level::INFO,
            (false, _) => Level::DEBUG,
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();

    // stdout carries the result path only
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(args.log_level())
        .init();

    let settings = args.settings()?;

    if args.history || args.history_stats {
        let db = settings
            .history_db
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("--history and --history-stats need --history-db"))?;
        return print_history(db, args.history_stats).await;
    }

    // clap enforces both positionals when no history flag is given
    let (Some(url), Some(format)) = (args.url.clone(), args.format.clone()) else {
        anyhow::bail!("URL and FORMAT are required");
    };
    let invocation = Invocation::new(url, format);

    let extractor = YtDlpExtractor::new(settings.ytdlp_path.clone())?;
    let timestamp = chrono::Utc::now().timestamp();
    let outcome = app::run(&extractor, &settings, &invocation, timestamp).await?;

    println!("{}", outcome.path.display());

    if let Some(db) = &settings.history_db {
        let record = DownloadRecord::from_outcome(&invocation.url, invocation.format.as_str(), &outcome);
        if let Err(e) = save_history(db, &record).await {
            warn!("Failed to record download history: {:#}", e);
        }
    }

    Ok(())
}

async fn save_history(db: &Path, record: &DownloadRecord) -> Result<()> {
    let store = HistoryStore::new(initialize_database(db).await?);
    store.record(record).await?;
    Ok(())
}

async fn print_history(db: &Path, stats_only: bool) -> Result<()> {
    let store = HistoryStore::new(initialize_database(db).await?);

    if stats_only {
        println!("{}", serde_json::to_string(&store.stats().await?)?);
    } else {
        for record in store.all().await? {
            println!("{}", serde_json::to_string(&record)?);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;
    use std::io::Write;

    #[test]
    fn test_missing_format_is_usage_error() {
        let err = Args::try_parse_from(["grabber", "https://example.com/v"])
            .err()
            .unwrap();
        assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_no_arguments_is_usage_error() {
        let err = Args::try_parse_from(["grabber"]).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_positionals() {
        let args = Args::try_parse_from(["grabber", "https://example.com/v", "mp3"]).unwrap();
        assert_eq!(args.url.as_deref(), Some("https://example.com/v"));
        assert_eq!(args.format.as_deref(), Some("mp3"));
        assert!(!args.history && !args.history_stats);
    }

    #[test]
    fn test_history_flags_need_no_positionals() {
        let args = Args::try_parse_from(["grabber", "--history"]).unwrap();
        assert!(args.history);
        assert_eq!(args.url, None);
        assert_eq!(args.format, None);

        let args = Args::try_parse_from(["grabber", "--history-stats"]).unwrap();
        assert!(args.history_stats);

        let err = Args::try_parse_from(["grabber", "--history", "--history-stats"])
            .err()
            .unwrap();
        assert_eq!(err.kind(), ErrorKind::ArgumentConflict);
    }

    #[test]
    fn test_flags_override_config_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"output_dir": "/from-config", "history_db": "/config.db", "audio_quality": "320"}}"#
        )
        .unwrap();
        let config = file.path().to_str().unwrap();

        let args = Args::try_parse_from([
            "grabber",
            "--config",
            config,
            "--output-dir",
            "/o",
            "--history-db",
            "/h.db",
            "u",
            "mp4",
        ])
        .unwrap();
        let settings = args.settings().unwrap();
        assert_eq!(settings.output_dir, PathBuf::from("/o"));
        assert_eq!(settings.history_db, Some(PathBuf::from("/h.db")));
        assert_eq!(settings.audio_quality, "320");

        // Without flags the file wins over defaults
        let args = Args::try_parse_from(["grabber", "--config", config, "u", "mp4"]).unwrap();
        let settings = args.settings().unwrap();
        assert_eq!(settings.output_dir, PathBuf::from("/from-config"));
        assert_eq!(settings.history_db, Some(PathBuf::from("/config.db")));
        assert!(!settings.create_output_dir);
    }

    #[test]
    fn test_defaults_without_config() {
        let args = Args::try_parse_from(["grabber", "--create-output-dir", "u", "mp4"]).unwrap();
        let settings = args.settings().unwrap();
        assert_eq!(settings.output_dir, PathBuf::from("downloads"));
        assert!(settings.create_output_dir);
        assert_eq!(settings.ytdlp_path, None);
    }

    #[test]
    fn test_log_levels() {
        let level = |extra: &[&str]| {
            let mut argv = vec!["grabber"];
            argv.extend_from_slice(extra);
            argv.extend(["u", "mp4"]);
            Args::try_parse_from(argv).unwrap().log_level()
        };
        assert_eq!(level(&[]), Level::WARN);
        assert_eq!(level(&["-v"]), Level::INFO);
        assert_eq!(level(&["-vv"]), Level::DEBUG);
        assert_eq!(level(&["-vvv"]), Level::DEBUG);
        assert_eq!(level(&["-q"]), Level::ERROR);

        let err = Args::try_parse_from(["grabber", "-q", "-v", "u", "mp4"]).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::ArgumentConflict);
    }
}
