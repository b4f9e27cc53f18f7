//! Runtime configuration.
//!
//! Values come from the command line or the environment (a `.env` file is
//! loaded by the binary first) and are collected into [`Config`], which is
//! passed explicitly to everything that needs it.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use clap::Args;

pub const DEFAULT_BASE_URL: &str = "https://data.waltti.fi";
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

const PLACEHOLDER_CLIENT_ID: &str = "your_client_id";
const PLACEHOLDER_CLIENT_SECRET: &str = "your_client_secret";

/// Client id and secret for the realtime feed.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    client_id: String,
    client_secret: String,
}

impl Credentials {
    /// Returns `None` when either value is blank or still the documented placeholder.
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Option<Self> {
        let client_id = client_id.into().trim().to_string();
        let client_secret = client_secret.into().trim().to_string();

        let usable = |value: &str, placeholder: &str| !value.is_empty() && value != placeholder;
        if !usable(&client_id, PLACEHOLDER_CLIENT_ID)
            || !usable(&client_secret, PLACEHOLDER_CLIENT_SECRET)
        {
            return None;
        }

        Some(Self {
            client_id,
            client_secret,
        })
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn client_secret(&self) -> &str {
        &self.client_secret
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

/// Why simulated arrivals are served instead of live ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimulationReason {
    Forced,
    MissingCredentials,
}

impl fmt::Display for SimulationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimulationReason::Forced => write!(f, "simulated data requested"),
            SimulationReason::MissingCredentials => write!(f, "no feed credentials configured"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedMode {
    Live(Credentials),
    Simulated(SimulationReason),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub credentials: Option<Credentials>,
    pub force_simulated: bool,
    pub base_url: String,
    pub timeout: Duration,
    pub stops_path: PathBuf,
    pub trips_path: PathBuf,
}

impl Config {
    pub fn feed_mode(&self) -> FeedMode {
        if self.force_simulated {
            return FeedMode::Simulated(SimulationReason::Forced);
        }
        match &self.credentials {
            Some(credentials) => FeedMode::Live(credentials.clone()),
            None => FeedMode::Simulated(SimulationReason::MissingCredentials),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            credentials: None,
            force_simulated: false,
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            stops_path: PathBuf::from("data/stops.txt"),
            trips_path: PathBuf::from("data/trips.txt"),
        }
    }
}

/// Command-line / environment options shared by every subcommand.
#[derive(Debug, Clone, Args)]
pub struct ConfigArgs {
    /// Feed API client id
    #[arg(long, env = "WALTTI_CLIENT_ID", default_value = "", hide_env_values = true)]
    pub client_id: String,

    /// Feed API client secret
    #[arg(long, env = "WALTTI_CLIENT_SECRET", default_value = "", hide_env_values = true)]
    pub client_secret: String,

    /// Serve simulated arrivals even when credentials are present
    #[arg(long, env = "USE_SIMULATED_DATA", default_value_t = false)]
    pub simulated: bool,

    /// Base URL of the realtime feed API
    #[arg(long, env = "WALTTI_BASE_URL", default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Upper bound for a single feed request, in seconds
    #[arg(long, env = "FEED_TIMEOUT_SECS", default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub timeout_secs: u64,

    /// Path to the GTFS stops table
    #[arg(long, env = "STOPS_PATH", default_value = "data/stops.txt")]
    pub stops_path: PathBuf,

    /// Path to the GTFS trips table
    #[arg(long, env = "TRIPS_PATH", default_value = "data/trips.txt")]
    pub trips_path: PathBuf,
}

impl From<ConfigArgs> for Config {
    fn from(args: ConfigArgs) -> Self {
        Self {
            credentials: Credentials::new(args.client_id, args.client_secret),
            force_simulated: args.simulated,
            base_url: args.base_url.trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(args.timeout_secs),
            stops_path: args.stops_path,
            trips_path: args.trips_path,
        }
    }
}
