//! skywatch: terminal flight tracker around a fixed observer.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};

use skywatch_core::config::{self, Config};
use skywatch_core::session::{ArrivalPolicy, TrackingSession};
use skywatch_core::types::Coordinate;
use skywatch_core::ReferenceData;

mod error;
mod geocode;
mod logging;
mod metadata;
mod opensky;
mod poller;
mod render;
mod tz;

use geocode::NominatimGeocoder;
use metadata::{MetadataResolver, MissLog, OfflineLookup};
use opensky::{Credentials, OpenSkyClient};
use poller::{PollOptions, Poller, ReplaySource};

#[derive(Parser)]
#[command(name = "skywatch", version, about = "Live view of aircraft around you")]
struct Cli {
    /// Config file (default: ~/.skywatch/config.yaml)
    #[arg(long, global = true, env = "SKYWATCH_CONFIG")]
    config: Option<PathBuf>,

    /// Debug logging (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Poll OpenSky and show aircraft within the radius
    Watch {
        #[command(flatten)]
        tracking: TrackingArgs,

        /// OpenSky username
        #[arg(long, env = "OPENSKY_USERNAME")]
        username: Option<String>,

        /// OpenSky password
        #[arg(long, env = "OPENSKY_PASSWORD", hide_env_values = true)]
        password: Option<String>,

        /// Seconds between polls
        #[arg(long)]
        refresh: Option<u64>,

        /// Stop after this many cycles
        #[arg(long)]
        cycles: Option<u64>,

        /// Don't clear the screen between cycles
        #[arg(long)]
        no_clear: bool,

        /// Print one JSON object per cycle instead of the table
        #[arg(long)]
        json: bool,
    },

    /// Replay recorded OpenSky responses (one JSON document per line)
    Replay {
        /// Path to recorded responses
        file: PathBuf,

        #[command(flatten)]
        tracking: TrackingArgs,

        /// Milliseconds between replayed cycles
        #[arg(long, default_value = "0")]
        interval_ms: u64,

        /// Print one JSON object per cycle instead of the table
        #[arg(long)]
        json: bool,
    },

    /// Print the bounding box sent to OpenSky
    Bounds {
        #[command(flatten)]
        tracking: TrackingArgs,
    },

    /// Show or write the config file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective config
    Show,
    /// Write the config file, applying any overrides given
    Init {
        #[command(flatten)]
        tracking: TrackingArgs,

        /// OpenSky username to store
        #[arg(long)]
        username: Option<String>,
    },
}

/// Observer and radius overrides shared by several commands.
#[derive(Args, Clone, Default)]
struct TrackingArgs {
    /// Address or city to geocode for the observer
    #[arg(long)]
    address: Option<String>,

    /// Observer latitude
    #[arg(long, requires = "lon", allow_hyphen_values = true)]
    lat: Option<f64>,

    /// Observer longitude
    #[arg(long, requires = "lat", allow_hyphen_values = true)]
    lon: Option<f64>,

    /// Tracking radius in miles
    #[arg(long)]
    radius: Option<f64>,

    /// IANA timezone for timestamps
    #[arg(long)]
    timezone: Option<String>,

    /// Arrival policy: ever-seen or continuous
    #[arg(long)]
    arrival_policy: Option<ArrivalPolicy>,
}

impl TrackingArgs {
    fn apply(&self, config: &mut Config) {
        if let Some(a) = &self.address {
            config.observer.address = Some(a.clone());
            // A new address replaces stored coordinates unless both are given.
            config.observer.lat = None;
            config.observer.lon = None;
        }
        if let (Some(lat), Some(lon)) = (self.lat, self.lon) {
            config.observer.lat = Some(lat);
            config.observer.lon = Some(lon);
        }
        if let Some(r) = self.radius {
            config.tracking.radius_miles = r;
        }
        if let Some(tz) = &self.timezone {
            config.observer.timezone = Some(tz.clone());
        }
        if let Some(p) = self.arrival_policy {
            config.tracking.arrival_policy = p;
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose);

    let mut config = config::load_config(cli.config.as_deref());

    let result = match cli.command {
        Commands::Watch {
            tracking,
            username,
            password,
            refresh,
            cycles,
            no_clear,
            json,
        } => {
            tracking.apply(&mut config);
            if username.is_some() {
                config.opensky.username = username;
            }
            if let Some(r) = refresh.filter(|r| *r > 0) {
                config.tracking.refresh_seconds = r;
            }
            let output = Output {
                clear_screen: !no_clear,
                json,
            };
            cmd_watch(&config, password, cycles, output).await
        }
        Commands::Replay {
            file,
            tracking,
            interval_ms,
            json,
        } => {
            tracking.apply(&mut config);
            cmd_replay(&config, &file, interval_ms, json).await
        }
        Commands::Bounds { tracking } => {
            tracking.apply(&mut config);
            cmd_bounds(&config).await
        }
        Commands::Config { action } => cmd_config(config, cli.config.as_deref(), action),
    };

    if let Err(e) = result {
        tracing::error!("{e}");
        std::process::exit(1);
    }
}

type CmdResult = Result<(), Box<dyn std::error::Error>>;

/// How `watch` presents each cycle.
struct Output {
    clear_screen: bool,
    json: bool,
}

async fn observer(config: &Config) -> Result<Coordinate, error::FetchError> {
    let geocoder = NominatimGeocoder::new(geocode::NOMINATIM_URL)?;
    Ok(geocode::resolve_observer(
        config.observer_coordinate(),
        config.observer.address.as_deref(),
        &geocoder,
    )
    .await)
}

fn reference_data(config: &Config) -> Arc<ReferenceData> {
    Arc::new(ReferenceData::load(
        config.data.aircraft_types.as_deref().map(Path::new),
        config.data.airlines.as_deref().map(Path::new),
    ))
}

async fn cmd_watch(
    config: &Config,
    password: Option<String>,
    cycles: Option<u64>,
    output: Output,
) -> CmdResult {
    let observer = observer(config).await?;
    let tracker = config.tracker_config(observer)?;
    let tz = tz::resolve_timezone(config.observer.timezone.as_deref(), observer);

    let credentials = match (config.opensky.username.clone(), password) {
        (Some(username), Some(password)) => Some(Credentials { username, password }),
        (Some(_), None) => {
            tracing::warn!("OpenSky username set without OPENSKY_PASSWORD, polling anonymously");
            None
        }
        _ => None,
    };
    let client = OpenSkyClient::new(&config.opensky.base_url, credentials)?;

    let metadata = MetadataResolver::new(
        client.clone(),
        reference_data(config),
        MissLog::new(Some(PathBuf::from(&config.data.missing_log))),
        config.tracking.metadata_cache_capacity,
    );

    tracing::info!(
        observer = %observer,
        radius_mi = tracker.radius_mi,
        refresh_secs = config.tracking.refresh_seconds,
        timezone = %tz,
        policy = %tracker.arrival_policy,
        "starting watch"
    );

    let poller = Poller::new(
        TrackingSession::new(tracker),
        client,
        metadata,
        tz,
        PollOptions {
            interval: Duration::from_secs(config.tracking.refresh_seconds),
            max_cycles: cycles,
            clear_screen: output.clear_screen,
            color: true,
            json: output.json,
        },
    );
    poller.run().await?;
    Ok(())
}

async fn cmd_replay(config: &Config, file: &Path, interval_ms: u64, json: bool) -> CmdResult {
    let source = ReplaySource::from_file(file)?;
    let cycles = source.remaining() as u64;
    if cycles == 0 {
        tracing::warn!(file = %file.display(), "no recorded batches");
        return Ok(());
    }

    // Replay never touches the network; fall back to the default observer.
    let observer = config
        .observer_coordinate()
        .unwrap_or(config::DEFAULT_OBSERVER);
    let tracker = config.tracker_config(observer)?;
    let tz = tz::resolve_timezone(config.observer.timezone.as_deref(), observer);

    let metadata = MetadataResolver::new(
        OfflineLookup,
        reference_data(config),
        MissLog::disabled(),
        config.tracking.metadata_cache_capacity,
    );

    let poller = Poller::new(
        TrackingSession::new(tracker),
        source,
        metadata,
        tz,
        PollOptions {
            interval: Duration::from_millis(interval_ms),
            max_cycles: Some(cycles),
            clear_screen: false,
            color: false,
            json,
        },
    );
    poller.run().await?;
    Ok(())
}

async fn cmd_bounds(config: &Config) -> CmdResult {
    let observer = observer(config).await?;
    let tracker = config.tracker_config(observer)?;
    let bbox = tracker.bounding_box();

    println!();
    println!("Observer:  {observer}");
    println!("Radius:    {:.1} mi", tracker.radius_mi);
    println!();
    println!("  lamin: {:.6}", bbox.lat_min);
    println!("  lamax: {:.6}", bbox.lat_max);
    println!("  lomin: {:.6}", bbox.lon_min);
    println!("  lomax: {:.6}", bbox.lon_max);
    println!();
    println!(
        "{}",
        opensky::states_url(&config.opensky.base_url, &bbox)
    );
    Ok(())
}

fn cmd_config(mut config: Config, path: Option<&Path>, action: ConfigAction) -> CmdResult {
    match action {
        ConfigAction::Show => {
            print!("{}", config::serialize_config(&config));
        }
        ConfigAction::Init { tracking, username } => {
            tracking.apply(&mut config);
            if username.is_some() {
                config.opensky.username = username;
            }
            if let (Some(lat), Some(lon)) = (config.observer.lat, config.observer.lon) {
                Coordinate::checked(lat, lon)?;
            }
            config.tracker_config(config.observer_coordinate().unwrap_or(config::DEFAULT_OBSERVER))?;
            let written = config::save_config(&config, path)?;
            println!("Wrote {}", written.display());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_watch() {
        let cli = Cli::try_parse_from([
            "skywatch", "watch", "--lat", "42.0", "--lon", "-71.0", "--radius", "30", "--cycles",
            "2",
        ])
        .unwrap();
        match cli.command {
            Commands::Watch {
                tracking, cycles, ..
            } => {
                assert_eq!(tracking.lat, Some(42.0));
                assert_eq!(tracking.lon, Some(-71.0));
                assert_eq!(tracking.radius, Some(30.0));
                assert_eq!(cycles, Some(2));
            }
            _ => panic!("expected watch"),
        }
    }

    #[test]
    fn test_lat_requires_lon() {
        assert!(Cli::try_parse_from(["skywatch", "bounds", "--lat", "42.0"]).is_err());
    }

    #[test]
    fn test_tracking_args_apply() {
        let mut config = Config::default();
        config.observer.lat = Some(1.0);
        config.observer.lon = Some(2.0);
        let args = TrackingArgs {
            address: Some("Saugus, MA".into()),
            radius: Some(12.0),
            arrival_policy: Some(ArrivalPolicy::Continuous),
            ..Default::default()
        };
        args.apply(&mut config);
        assert_eq!(config.observer.address.as_deref(), Some("Saugus, MA"));
        assert!(config.observer_coordinate().is_none());
        assert_eq!(config.tracking.radius_miles, 12.0);
        assert_eq!(config.tracking.arrival_policy, ArrivalPolicy::Continuous);
    }

    #[test]
    fn test_config_init_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        let action = ConfigAction::Init {
            tracking: TrackingArgs {
                lat: Some(42.0),
                lon: Some(-71.0),
                radius: Some(15.0),
                ..Default::default()
            },
            username: Some("spotter".into()),
        };
        cmd_config(Config::default(), Some(&path), action).unwrap();

        let loaded = config::load_config(Some(&path));
        assert_eq!(loaded.observer_coordinate(), Some(Coordinate::new(42.0, -71.0)));
        assert_eq!(loaded.tracking.radius_miles, 15.0);
        assert_eq!(loaded.opensky.username.as_deref(), Some("spotter"));
    }

    #[test]
    fn test_config_init_rejects_bad_radius() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        let action = ConfigAction::Init {
            tracking: TrackingArgs {
                radius: Some(-1.0),
                ..Default::default()
            },
            username: None,
        };
        assert!(cmd_config(Config::default(), Some(&path), action).is_err());
        assert!(!path.exists());
    }
}
