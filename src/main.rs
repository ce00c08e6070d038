use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use radar::auth::StaticIdentity;
use radar::config::Config;
use radar::dashboard::Dashboard;
use radar::export::write_atomic;
use radar::fetch::FailureKind;
use radar::radar::{BookmarkError, Radar};
use radar::storage::{Database, DatabaseError, TrendRef};
use radar::trend::{RecentTrends, RelevanceTier, SearchVolume};
use radar::util::{strip_control_chars, truncate_to_width};

const CARD_WIDTH: usize = 78;

/// Get the config directory path (~/.config/radar/)
fn get_config_dir() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    Ok(PathBuf::from(home).join(".config").join("radar"))
}

fn ensure_config_dir(config_dir: &Path) -> Result<()> {
    if !config_dir.exists() {
        std::fs::create_dir_all(config_dir).context("Failed to create config directory")?;
        tracing::info!(path = %config_dir.display(), "Created config directory");
    }

    // User-only access
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        match std::fs::metadata(config_dir) {
            Ok(metadata) => {
                let mut perms = metadata.permissions();
                perms.set_mode(0o700);
                if let Err(e) = std::fs::set_permissions(config_dir, perms) {
                    tracing::warn!(
                        path = %config_dir.display(),
                        error = %e,
                        "Failed to set config directory permissions to 0700"
                    );
                }
            }
            Err(e) => {
                tracing::warn!(
                    path = %config_dir.display(),
                    error = %e,
                    "Failed to read config directory metadata"
                );
            }
        }
    }

    Ok(())
}

#[derive(Parser, Debug)]
#[command(name = "radar", about = "Trending topics per category, scored and bookmarkable")]
struct Args {
    /// Config file (default: ~/.config/radar/config.toml)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Signed-in user id; bookmark commands need one
    #[arg(long, env = "RADAR_USER", value_name = "ID")]
    user: Option<String>,

    /// Reset database (delete and recreate)
    #[arg(long)]
    reset_db: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the content categories
    Categories,
    /// Fetch trends for a category and show them without storing
    Preview {
        slug: String,
        /// Bookmark the previewed trends with these titles
        #[arg(long = "save", value_name = "TITLE")]
        save: Vec<String>,
    },
    /// Fetch trends for a category and store them
    Refresh { slug: String },
    /// Show stored high-relevance trends from the last window
    Recent { slug: String },
    /// Bookmark a trend: a stored id (`12`) or a previewed title (`key:Copa`)
    Save {
        trend_ref: TrendRef,
        #[arg(long)]
        notes: Option<String>,
    },
    /// List your bookmarks
    Saved,
    /// Export selected bookmarks as JSON
    Export {
        #[arg(required = true)]
        trend_refs: Vec<TrendRef>,
        /// Write to this file instead of stdout
        #[arg(long, value_name = "FILE")]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config_dir = get_config_dir()?;
    ensure_config_dir(&config_dir)?;

    let config_path = args
        .config
        .clone()
        .unwrap_or_else(|| config_dir.join("config.toml"));
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    let db_path = config
        .database_path
        .clone()
        .unwrap_or_else(|| config_dir.join("radar.db"));

    if args.reset_db && db_path.exists() {
        std::fs::remove_file(&db_path).context("Failed to delete database")?;
        println!("Database reset.");
    }

    let db_path_str = db_path
        .to_str()
        .ok_or_else(|| anyhow::anyhow!("Invalid UTF-8 in database path"))?;
    let db = match Database::open(db_path_str).await {
        Ok(db) => db,
        Err(DatabaseError::InstanceLocked) => {
            eprintln!(
                "Error: The radar database is in use by another process. Please try again."
            );
            std::process::exit(1);
        }
        Err(e) => {
            return Err(anyhow::anyhow!("Failed to open database: {}", e));
        }
    };

    let auth = StaticIdentity::from_raw(args.user.as_deref());
    let radar = Radar::from_config(db, &config, reqwest::Client::new(), auth)
        .context("Invalid provider configuration")?;

    run(&radar, args.command).await
}

async fn run(radar: &Radar<StaticIdentity>, command: Command) -> Result<()> {
    match command {
        Command::Categories => {
            for category in radar.list_categories().await? {
                println!(
                    "{} {:<18} {:<20} {}",
                    category.icon, category.name, category.slug, category.description
                );
            }
        }

        Command::Preview { slug, save } => {
            let mut dashboard = Dashboard::new();
            dashboard.select(&slug);
            println!("Fetching trends for {slug}...");
            dashboard.apply(radar.preview(&slug).await);

            if let Some(e) = dashboard.error() {
                anyhow::bail!("{}: {e}", failure_label(e.kind()));
            }

            if dashboard.trends().is_empty() {
                println!("The provider returned no trends for {slug}.");
            }
            for trend in dashboard.trends() {
                print_card(
                    &trend.title,
                    &trend.description,
                    trend.tier(),
                    trend.relevance_score,
                    &trend.search_volume,
                    &trend.keywords,
                    &trend.source,
                );
            }

            for title in &save {
                if !dashboard.toggle_mark(title) {
                    eprintln!("Not in this preview: {title}");
                }
            }
            if !save.is_empty() && dashboard.marked().is_empty() {
                println!("Nothing marked; no bookmarks saved.");
            }
            for trend in dashboard.marked_trends() {
                let trend_ref = TrendRef::Preview(trend.client_key().to_string());
                let id = radar
                    .save_bookmark(&trend_ref, None)
                    .await
                    .map_err(bookmark_error)?;
                println!("Saved \"{}\" (bookmark {id})", strip_control_chars(&trend.title));
            }
        }

        Command::Refresh { slug } => {
            let report = radar.refresh(&slug).await;
            match report.result {
                Ok(ids) => println!("Stored {} trends for {}.", ids.len(), report.category),
                Err(e) => anyhow::bail!("{}: {e}", failure_label(e.kind())),
            }
        }

        Command::Recent { slug } => match radar.recent_trends(&slug).await? {
            RecentTrends::Placeholder(placeholder) => {
                println!("{}", placeholder.title);
                println!("{}", placeholder.description);
            }
            RecentTrends::Empty => {
                println!("No high-relevance trends for {slug} in the current window.");
            }
            RecentTrends::Rows(trends) => {
                for trend in &trends {
                    println!("#{}", trend.id);
                    print_card(
                        &trend.title,
                        &trend.description,
                        trend.tier(),
                        trend.relevance_score,
                        &trend.search_volume,
                        &trend.keywords,
                        &trend.source,
                    );
                }
            }
        },

        Command::Save { trend_ref, notes } => {
            let id = radar
                .save_bookmark(&trend_ref, notes.as_deref())
                .await
                .map_err(bookmark_error)?;
            println!("Saved bookmark {id}.");
        }

        Command::Saved => {
            if radar.current_user().is_none() {
                eprintln!("Not signed in (use --user or RADAR_USER); no bookmarks to show.");
            }
            for bookmark in radar.saved_bookmarks().await? {
                let saved_at = chrono::DateTime::from_timestamp_millis(bookmark.saved_at)
                    .map(|t| t.with_timezone(&chrono::Local).format("%d/%m/%Y %H:%M").to_string())
                    .unwrap_or_default();
                let notes = bookmark.notes.as_deref().unwrap_or("");
                println!(
                    "{:>5}  {:<16}  {}  {}",
                    bookmark.id,
                    saved_at,
                    strip_control_chars(&bookmark.trend_ref.to_string()),
                    strip_control_chars(notes)
                );
            }
        }

        Command::Export { trend_refs, output } => {
            let ack = radar
                .export_bookmarks(&trend_refs)
                .await
                .map_err(bookmark_error)?;
            let json = ack.document.to_json_pretty()?;
            match output {
                Some(path) => {
                    write_atomic(&path, json.as_bytes())?;
                    println!("{} ({} items -> {})", ack.message, ack.exported, path.display());
                }
                None => {
                    println!("{json}");
                    eprintln!("{} ({} items)", ack.message, ack.exported);
                }
            }
        }
    }

    Ok(())
}

fn failure_label(kind: FailureKind) -> &'static str {
    match kind {
        FailureKind::UnknownCategory => "Unknown category",
        FailureKind::ProviderUnavailable => "Trends provider unavailable, try again",
        FailureKind::MalformedResponse => "Trends provider sent an unusable response",
        FailureKind::Storage => "Could not store trends",
    }
}

fn bookmark_error(e: BookmarkError) -> anyhow::Error {
    match e {
        BookmarkError::Unauthenticated => {
            anyhow::anyhow!("{e} (use --user or set RADAR_USER)")
        }
        other => other.into(),
    }
}

fn tier_label(tier: RelevanceTier) -> &'static str {
    match tier {
        RelevanceTier::High => "ALTA",
        RelevanceTier::Medium => "MÉDIA",
        RelevanceTier::Low => "BAIXA",
    }
}

fn print_card(
    title: &str,
    description: &str,
    tier: RelevanceTier,
    score: u8,
    volume: &SearchVolume,
    keywords: &[String],
    source: &str,
) {
    let rule = "─".repeat(CARD_WIDTH);
    println!("{rule}");
    println!(
        "{}",
        truncate_to_width(&strip_control_chars(title), CARD_WIDTH)
    );
    println!(
        "Relevância {score} [{}]  Volume de busca: {}",
        tier_label(tier),
        strip_control_chars(&volume.to_string())
    );
    println!(
        "{}",
        truncate_to_width(&strip_control_chars(description), CARD_WIDTH)
    );
    if !keywords.is_empty() {
        let joined = keywords.join(", ");
        println!(
            "{}",
            truncate_to_width(&strip_control_chars(&joined), CARD_WIDTH)
        );
    }
    println!("{}", truncate_to_width(&strip_control_chars(source), CARD_WIDTH));
}
