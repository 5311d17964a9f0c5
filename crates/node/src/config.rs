//! Configuration module
//!
//! Supports an optional YAML configuration file with command line arguments
//! taking precedence. Every `--flag value` pair given on the command line is
//! additionally recorded verbatim so `CONFIG GET` can serve it back; unknown
//! long flags are registered with clap dynamically before parsing.

use clap::{Arg, ArgMatches, Command};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::ffi::OsString;
use std::path::PathBuf;

const DEFAULT_PORT: u16 = 8000;

/// Flags clap knows statically; everything else is registered dynamically.
const KNOWN_FLAGS: &[&str] = &["port", "replicaof", "dir", "dbfilename", "log-level", "config"];

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Listen port for the RESP server
    #[serde(default = "default_port")]
    pub port: u16,
    /// Primary to follow; absent for a standalone primary
    #[serde(default)]
    pub replica_of: Option<ReplicaOf>,
    /// Snapshot directory (paired with `dbfilename`)
    #[serde(default)]
    pub dir: Option<PathBuf>,
    /// Snapshot file name inside `dir`
    #[serde(default)]
    pub dbfilename: Option<String>,
    /// Log level name: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Raw `--flag value` pairs, served by CONFIG GET
    #[serde(default)]
    pub flags: HashMap<String, String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            replica_of: None,
            dir: None,
            dbfilename: None,
            log_level: default_log_level(),
            flags: HashMap::new(),
        }
    }
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Address of the primary a replica follows
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplicaOf {
    pub host: String,
    pub port: u16,
}

impl ReplicaOf {
    /// Accepts `"<host> <port>"` and `"<host>:<port>"`.
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let (host, port) = if let Some((host, port)) = raw.split_once(char::is_whitespace) {
            (host, port.trim())
        } else if let Some((host, port)) = raw.rsplit_once(':') {
            (host, port)
        } else {
            return Err(ConfigError::InvalidReplicaOf(raw.to_string()));
        };
        if host.is_empty() {
            return Err(ConfigError::InvalidReplicaOf(raw.to_string()));
        }
        let port = port
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidReplicaOf(raw.to_string()))?;
        Ok(Self {
            host: host.to_string(),
            port,
        })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Configuration error
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid replicaof argument: {0:?}")]
    InvalidReplicaOf(String),
    #[error("invalid value for --{0}: {1:?}")]
    InvalidFlag(&'static str, String),
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config file: {0}")]
    Parse(#[from] serde_yaml::Error),
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&content)?)
    }

    /// Parse the command line. Usage errors and `--help` are handled by clap
    /// (process exit); semantic errors surface as [`ConfigError`].
    pub fn from_cli<I, T>(argv: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let argv: Vec<OsString> = argv.into_iter().map(Into::into).collect();
        let matches = build_command(&argv).get_matches_from(argv);
        Self::from_matches(&matches)
    }

    fn from_matches(matches: &ArgMatches) -> Result<Self, ConfigError> {
        let mut config = match matches.get_one::<String>("config") {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };

        if let Some(port) = cli_value(matches, "port") {
            config.port = port
                .parse::<u16>()
                .map_err(|_| ConfigError::InvalidFlag("port", port.clone()))?;
        }
        if let Some(raw) = cli_value(matches, "replicaof") {
            config.replica_of = Some(ReplicaOf::parse(raw)?);
        }
        if let Some(dir) = cli_value(matches, "dir") {
            config.dir = Some(PathBuf::from(dir));
        }
        if let Some(name) = cli_value(matches, "dbfilename") {
            config.dbfilename = Some(name.clone());
        }
        if let Some(level) = cli_value(matches, "log-level") {
            config.log_level = level.clone();
        }

        // record every flag as given, known and unknown alike
        for id in matches.ids() {
            let name = id.as_str();
            if name == "config" || name == "replicaof" {
                continue;
            }
            if let Some(value) = cli_value(matches, name) {
                config.flags.insert(name.to_string(), value.clone());
            }
        }
        Ok(config)
    }

    /// Full path of the snapshot file to load at startup, when configured
    pub fn snapshot_path(&self) -> Option<PathBuf> {
        match (&self.dir, &self.dbfilename) {
            (Some(dir), Some(name)) => Some(dir.join(name)),
            _ => None,
        }
    }

    /// CONFIG GET lookup over the recorded flag table
    pub fn lookup_flag(&self, name: &str) -> Option<String> {
        self.flags.get(name).cloned()
    }
}

fn cli_value<'a>(matches: &'a ArgMatches, id: &str) -> Option<&'a String> {
    match matches.value_source(id) {
        Some(clap::parser::ValueSource::CommandLine) => matches.get_one::<String>(id),
        _ => None,
    }
}

fn build_command(argv: &[OsString]) -> Command {
    let mut cmd = Command::new("redmirror")
        .about("In-memory cache server with primary/replica replication")
        .arg(
            Arg::new("port")
                .long("port")
                .value_name("PORT")
                .help("Port to listen on")
                .default_value("8000"),
        )
        .arg(
            Arg::new("replicaof")
                .long("replicaof")
                .value_name("HOST PORT")
                .help("Start as a replica of the named primary"),
        )
        .arg(
            Arg::new("dir")
                .long("dir")
                .value_name("PATH")
                .help("Snapshot directory"),
        )
        .arg(
            Arg::new("dbfilename")
                .long("dbfilename")
                .value_name("NAME")
                .help("Snapshot file name"),
        )
        .arg(
            Arg::new("log-level")
                .long("log-level")
                .value_name("LEVEL")
                .help("Log level: trace, debug, info, warn, error")
                .default_value("info"),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .value_name("FILE")
                .help("YAML configuration file"),
        );

    for name in dynamic_flag_names(argv) {
        cmd = cmd.arg(
            Arg::new(name.clone())
                .long(name)
                .value_name("VALUE")
                .num_args(1),
        );
    }
    cmd
}

/// Long flags present on the command line that clap does not know about.
fn dynamic_flag_names(argv: &[OsString]) -> Vec<String> {
    let mut names = Vec::new();
    for token in argv {
        let Some(token) = token.to_str() else { continue };
        let Some(name) = token.strip_prefix("--") else { continue };
        let name = name.split('=').next().unwrap_or(name);
        if name.is_empty()
            || name == "help"
            || KNOWN_FLAGS.contains(&name)
            || names.iter().any(|n| n == name)
        {
            continue;
        }
        names.push(name.to_string());
    }
    names
}
