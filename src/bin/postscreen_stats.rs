//! postscreen-stats: CLI for computing postscreen statistics from mail logs.

use clap::Parser;
use postscreen_stats::{
    htmlmap, open_log, report, summarize, ActionFilter, Aggregator, Config, MaxMindLocator,
    ReportMode, Result, TimestampFormat, DEFAULT_LOG_FILE,
};
use std::io::{self, Write};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "postscreen-stats")]
#[command(version = "0.1.0")]
#[command(about = "Parse Postfix logs to compute statistics on postscreen activity", long_about = None)]
struct Cli {
    /// Log file to parse (.gz accepted)
    #[arg(short, long, default_value = DEFAULT_LOG_FILE)]
    file: PathBuf,

    /// Action filter with operators | and &, e.g. 'PREGREET&DNSBL|HANGUP'
    #[arg(short, long)]
    action: Option<String>,

    /// Filter the results on a specific IP
    #[arg(short, long)]
    ip: Option<String>,

    /// Report mode
    #[arg(long, default_value = "short", value_parser = parse_report_mode)]
    report: ReportMode,

    /// Year of the logs, for syslog timestamps that omit it
    #[arg(short, long)]
    year: Option<i32>,

    /// Timestamps are RFC3339 ("2012-04-13T08:53:00+02:00") instead of
    /// syslog ("Oct 23 04:02:17")
    #[arg(long)]
    rfc3339: bool,

    /// Path to a MaxMind GeoLite2 City database file
    #[arg(long)]
    geofile: Option<PathBuf>,

    /// Destination HTML file for the map of blocked IPs (requires --geofile)
    #[arg(long)]
    mapdest: Option<PathBuf>,

    /// Only map IPs which connected at least this many times
    #[arg(long, default_value_t = 0)]
    map_min_conn: u64,
}

fn parse_report_mode(s: &str) -> std::result::Result<ReportMode, String> {
    ReportMode::parse(s).ok_or_else(|| format!("unknown report type: {}", s))
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut config = Config {
        log_file: cli.file,
        action_filter: cli.action,
        ip_filter: cli.ip,
        report_mode: cli.report,
        geofile: cli.geofile,
        map_dest: cli.mapdest,
        map_min_conn: cli.map_min_conn,
        ..Config::default()
    };
    if let Some(year) = cli.year {
        config.year = year;
    }
    if cli.rfc3339 {
        config.format = TimestampFormat::Rfc3339;
    }
    if let Some(filter) = &config.ip_filter {
        println!("Filtering results on IP {}", filter);
    }

    let mut aggregator = Aggregator::new(&config);
    if let Some(geofile) = &config.geofile {
        aggregator = aggregator.with_locator(Box::new(MaxMindLocator::open(geofile)?));
    }
    aggregator.consume(open_log(&config.log_file)?)?;
    let clients = aggregator.into_clients();

    let stdout = io::stdout();
    let mut out = stdout.lock();

    if config.report_mode.wants_detail() {
        report::write_client_details(&mut out, &clients)?;
    }

    if config.report_mode.wants_summary() {
        let filter = ActionFilter::compile(config.action_filter.as_deref());
        let summary = summarize(&clients, &filter);

        if config.report_mode.prints_summary() {
            report::write_summary(&mut out, &summary)?;
        }

        if let Some(map_dest) = &config.map_dest {
            if config.geofile.is_some() {
                htmlmap::render_map_file(map_dest, &clients, &summary, config.map_min_conn)?;
                println!("Created HTML map file at {}", map_dest.display());
            } else {
                eprintln!("--mapdest requires geolocation; re-run with --geofile");
            }
        }
    }
    out.flush()?;
    Ok(())
}
