use std::process::ExitCode;
use std::time::Duration;

use chrono::{Local, TimeZone};
use clap::{Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use resource_console::api::{ApiClient, ApiHttpClient};
use resource_console::config::ConfigLoader;
use resource_console::error::ConsoleError;
use resource_console::poller::{DEFAULT_POLL_INTERVAL, Poller};
use resource_console::store::MetadataStore;
use resource_console::sync::sync_site;
use resource_console::view::{
    ResourceSortKey, StatusFilter, child_downloads, count_by_status, filter_by_status,
    sort_resources,
};

#[derive(Parser)]
#[command(name = "resource-console")]
#[command(about = "Console for a remote download manager: catalog cache, download status")]
#[command(version, author)]
struct Cli {
    /// Path to a JSON config file (default: ./resource-console.json)
    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Show backend clients and sites")]
    Basic,
    #[command(about = "Refresh the local catalog cache for one site")]
    Sync { site: String },
    #[command(about = "List cached resources")]
    Resources {
        #[arg(long)]
        site: Option<String>,
        #[arg(long, default_value = "number")]
        sort: String,
    },
    #[command(about = "Show the local meta key/value table")]
    Meta,
    #[command(about = "Show current downloads, optionally filtered by status")]
    Downloads {
        /// none | active | queue | or an exact status literal
        #[arg(long, default_value = "none")]
        filter: String,
        /// Also list the file jobs of this resource
        #[arg(long)]
        resource: Option<String>,
    },
    #[command(about = "Poll download status on an interval and print summaries")]
    Watch {
        #[arg(long, default_value_t = 5)]
        interval_secs: u64,
        /// Stop after this many summaries (0 = run until interrupted)
        #[arg(long, default_value_t = 0)]
        count: u64,
    },
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(error) = report.downcast_ref::<ConsoleError>() {
            return ExitCode::from(map_exit_code(error));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &ConsoleError) -> u8 {
    match error {
        ConsoleError::Transport(_) | ConsoleError::Status { .. } | ConsoleError::Decode(_) => 3,
        ConsoleError::ConfigRead(_) | ConsoleError::ConfigParse(_) => 2,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = ConfigLoader::resolve(cli.config.as_deref()).into_diagnostic()?;
    let api = ApiHttpClient::new(config).into_diagnostic()?;

    match cli.command {
        Commands::Basic => {
            let basic = api.fetch_basic().into_diagnostic()?;
            println!("clients: {}", basic.clients.join(", "));
            println!("sites: {}", basic.sites.join(", "));
            Ok(())
        }
        Commands::Sync { site } => {
            let store = MetadataStore::open_default().into_diagnostic()?;
            let count = sync_site(&api, &store, &site).into_diagnostic()?;
            println!("{site}: cached {count} resources");
            Ok(())
        }
        Commands::Resources { site, sort } => {
            let store = MetadataStore::open_default().into_diagnostic()?;
            let mut resources = match &site {
                Some(site) => store.site_resources(site).into_diagnostic()?,
                None => store.all_resources().into_diagnostic()?,
            };
            let key: ResourceSortKey = sort.parse().map_err(miette::Report::msg)?;
            sort_resources(&mut resources, key);
            for r in &resources {
                println!(
                    "{}\t{}\t{}\t{}\t{}\t{}",
                    r.site,
                    r.number,
                    r.title,
                    r.author,
                    r.tags.join(","),
                    format_time(r.time),
                );
            }
            println!("resources: {}", resources.len());
            Ok(())
        }
        Commands::Meta => {
            let store = MetadataStore::open_default().into_diagnostic()?;
            for (key, value) in store.meta().into_diagnostic()? {
                println!("{key}={value}");
            }
            Ok(())
        }
        Commands::Downloads { filter, resource } => {
            let poller = Poller::new(api);
            poller.poll_once().into_diagnostic()?;
            let snapshot = poller.snapshot();

            let counts = count_by_status(&snapshot.resource_downloads);
            println!(
                "all {} / active {} / downloading {} / queue {} / error {} / completed {}",
                snapshot.resource_downloads.len(),
                counts.active,
                counts.downloading,
                counts.queue,
                counts.error,
                counts.completed,
            );
            let status_filter: StatusFilter = filter.parse().unwrap_or(StatusFilter::All);
            for r in filter_by_status(&snapshot.resource_downloads, &status_filter) {
                println!(
                    "{}\t{}\t{}\t{}\t{}\t{}",
                    r.site,
                    r.number,
                    if r.status.is_empty() { "queued" } else { &r.status },
                    r.size,
                    r.title,
                    r.note,
                );
            }
            if let Some(resource_id) = resource {
                println!("files of {resource_id}:");
                for d in child_downloads(&snapshot.downloads, &resource_id) {
                    println!(
                        "{}\t{}\t{}\t{}",
                        if d.status.is_empty() { "queued" } else { &d.status },
                        d.download_id,
                        d.filename,
                        d.note,
                    );
                }
            }
            Ok(())
        }
        Commands::Watch {
            interval_secs,
            count,
        } => {
            let interval = if interval_secs == 0 {
                DEFAULT_POLL_INTERVAL
            } else {
                Duration::from_secs(interval_secs)
            };
            let poller = Poller::new(api);
            let handle = poller.start(interval);
            let mut printed = 0u64;
            loop {
                std::thread::sleep(interval);
                let snapshot = poller.snapshot();
                let counts = count_by_status(&snapshot.resource_downloads);
                match poller.last_error() {
                    Some(error) => println!(
                        "active {} / queue {} / completed {} / error {} (stale: {error})",
                        counts.active, counts.queue, counts.completed, counts.error,
                    ),
                    None => println!(
                        "active {} / queue {} / completed {} / error {}",
                        counts.active, counts.queue, counts.completed, counts.error,
                    ),
                }
                printed += 1;
                if count != 0 && printed >= count {
                    break;
                }
            }
            handle.stop();
            Ok(())
        }
    }
}

fn format_time(time: i64) -> String {
    match Local.timestamp_opt(time, 0).single() {
        Some(stamp) => stamp.format("%Y-%m-%d").to_string(),
        None => time.to_string(),
    }
}
