//! Configuration layer: typed settings with layered precedence (file → env → CLI).

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, builder::BoolishValueParser};
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;

use crate::application::site::SiteConfig;

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "facciata";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 3000;

/// Command-line arguments for the facciata binary.
#[derive(Debug, Parser)]
#[command(name = "facciata", version, about = "Multi-site rendering gateway")]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "FACCIATA_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run the gateway.
    Serve(ServeArgs),
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeArgs {
    /// Override the listener host.
    #[arg(long = "server-host", value_name = "HOST")]
    pub host: Option<String>,

    /// Override the listener port.
    #[arg(long = "server-port", value_name = "PORT")]
    pub port: Option<u16>,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read configuration: {0}")]
    Read(#[from] config::ConfigError),
    #[error("invalid configuration: {message}")]
    Invalid { message: String },
}

impl ConfigError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid {
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => LevelFilter::TRACE,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Error => LevelFilter::ERROR,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub level: LogLevel,
    pub format: LogFormat,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            format: LogFormat::Compact,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
        }
    }
}

impl ServerSettings {
    pub fn addr(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|_| ConfigError::invalid(format!("invalid listener address `{}:{}`", self.host, self.port)))
    }
}

/// One configured site.
#[derive(Debug, Clone, Deserialize)]
pub struct SiteSettings {
    /// Unique site identifier.
    pub id: String,
    /// Host names this site answers for.
    pub hosts: Vec<String>,
    /// Upstream content API endpoint.
    pub endpoint: String,
    #[serde(flatten)]
    pub config: SiteConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    pub logging: LoggingSettings,
    pub sites: Vec<SiteSettings>,
}

impl Settings {
    /// Reject configurations the gateway cannot serve.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sites.is_empty() {
            return Err(ConfigError::invalid("no sites configured"));
        }

        let mut seen = std::collections::HashSet::new();
        for site in &self.sites {
            if !seen.insert(site.id.as_str()) {
                return Err(ConfigError::invalid(format!(
                    "duplicate site id `{}`",
                    site.id
                )));
            }
            if site.hosts.is_empty() {
                return Err(ConfigError::invalid(format!(
                    "site `{}` has no hosts",
                    site.id
                )));
            }
        }

        Ok(())
    }
}

/// Parse CLI arguments and load layered settings.
pub fn load_with_cli() -> Result<(CliArgs, Settings), ConfigError> {
    let cli = CliArgs::parse();
    let settings = load(&cli)?;
    Ok((cli, settings))
}

/// Load settings with file → environment → CLI precedence.
pub fn load(cli: &CliArgs) -> Result<Settings, ConfigError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = &cli.config_file {
        builder = builder.add_source(File::from(path.clone()));
    }

    builder = builder.add_source(Environment::with_prefix("FACCIATA").separator("__"));

    if let Some(Command::Serve(args)) = &cli.command {
        if let Some(host) = &args.host {
            builder = builder.set_override("server.host", host.clone())?;
        }
        if let Some(port) = args.port {
            builder = builder.set_override("server.port", i64::from(port))?;
        }
        if let Some(level) = &args.log_level {
            builder = builder.set_override("logging.level", level.clone())?;
        }
        if let Some(json) = args.log_json {
            builder =
                builder.set_override("logging.format", if json { "json" } else { "compact" })?;
        }
    }

    let settings = builder.build()?.try_deserialize()?;
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use config::FileFormat;

    use super::*;

    fn from_toml(toml: &str) -> Settings {
        Config::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()
            .expect("config builds")
            .try_deserialize()
            .expect("settings deserialize")
    }

    #[test]
    fn defaults_apply_without_any_source() {
        let settings = from_toml("");
        assert_eq!(settings.server.host, "127.0.0.1");
        assert_eq!(settings.server.port, 3000);
        assert!(settings.sites.is_empty());
    }

    #[test]
    fn site_sections_flatten_into_site_config() {
        let settings = from_toml(
            r#"
            [[sites]]
            id = "alpha"
            hosts = ["alpha.test"]
            endpoint = "http://upstream.test/api"

            [sites.router]
            status_code = 200
            expires_seconds = 600
            trailing_slash_fix = false

            [sites.cache]
            invalidation_window_ms = 5000
            invalidator = "http://purge.test/batch"
            "#,
        );

        let site = &settings.sites[0];
        assert_eq!(site.id, "alpha");
        assert_eq!(site.hosts, vec!["alpha.test".to_string()]);
        assert_eq!(site.config.router.expires_seconds, 600);
        assert!(!site.config.router.trailing_slash_fix);
        assert_eq!(site.config.cache.invalidation_window_ms, 5000);
        assert_eq!(
            site.config.cache.invalidator.as_deref(),
            Some("http://purge.test/batch")
        );
        // Untouched sections keep their defaults.
        assert_eq!(site.config.router.status_code, 200);
        assert_eq!(site.config.cache.response_limit, 512);
    }

    #[test]
    fn validation_rejects_duplicate_ids() {
        let settings = from_toml(
            r#"
            [[sites]]
            id = "alpha"
            hosts = ["a.test"]
            endpoint = "http://upstream.test/api"

            [[sites]]
            id = "alpha"
            hosts = ["b.test"]
            endpoint = "http://upstream.test/api"
            "#,
        );
        assert!(settings.validate().is_err());
    }

    #[test]
    fn validation_rejects_empty_sites() {
        let settings = from_toml("");
        assert!(settings.validate().is_err());
    }

    #[test]
    fn validation_rejects_hostless_site() {
        let settings = from_toml(
            r#"
            [[sites]]
            id = "alpha"
            hosts = []
            endpoint = "http://upstream.test/api"
            "#,
        );
        assert!(settings.validate().is_err());
    }

    #[test]
    fn listener_addr_parses() {
        let settings = from_toml("");
        assert_eq!(
            settings.server.addr().expect("addr parses").to_string(),
            "127.0.0.1:3000"
        );
    }
}
