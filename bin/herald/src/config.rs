//! Launcher configuration
//!
//! Every setting can come from a flag, an environment variable or the TOML
//! config file. Flags and environment win over the file, the file wins over
//! defaults.

use anyhow::Context;
use clap::{Parser, ValueEnum};
use herald_etcd::EtcdConfig;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_ETCD_ADDRESSES: &str = "http://127.0.0.1:2379";
const DEFAULT_LEASE_TTL_SECS: u64 = 30;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 5;

/// Log output format
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// herald command line
#[derive(Parser, Debug, Default)]
#[command(name = "herald")]
#[command(about = "Register declared services with etcd and hold them until terminated", long_about = None)]
#[command(version)]
pub struct Cli {
    /// TOML config file to read
    #[arg(short, long, env = "HERALD_CONFIG")]
    pub config: Option<PathBuf>,

    /// Services list. Syntax: name,address,tag=val,tag=val;name,address
    #[arg(long, env = "HERALD_SERVICES")]
    pub services: Option<String>,

    /// Stores list. Syntax: kind,path;kind,path
    #[arg(long, env = "HERALD_STORES")]
    pub stores: Option<String>,

    /// Comma-separated etcd gateway addresses
    #[arg(long, env = "HERALD_ETCD_ADDRESSES")]
    pub etcd_addresses: Option<String>,

    /// Lease TTL in seconds
    #[arg(long, env = "HERALD_LEASE_TTL")]
    pub lease_ttl: Option<u64>,

    /// Timeout of a single etcd request in seconds
    #[arg(long, env = "HERALD_REQUEST_TIMEOUT")]
    pub request_timeout: Option<u64>,

    /// Log formatter to use
    #[arg(long, env = "HERALD_LOG_FORMAT", value_enum)]
    pub log_format: Option<LogFormat>,

    /// Force colored text log output
    #[arg(long, env = "HERALD_LOG_FORCE_COLORS")]
    pub log_force_colors: bool,

    /// Record registrations in memory instead of etcd
    #[arg(long, env = "HERALD_DRY_RUN")]
    pub dry_run: bool,
}

/// Contents of the config file
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub services: Option<String>,
    pub stores: Option<String>,
    pub etcd_addresses: Option<String>,
    pub lease_ttl: Option<u64>,
    pub request_timeout: Option<u64>,
    pub log_format: Option<LogFormat>,
    pub log_force_colors: Option<bool>,
    pub dry_run: Option<bool>,
}

impl FileConfig {
    pub fn read(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("parsing config file {}", path.display()))
    }

    pub fn parse(text: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(text)?)
    }
}

/// Resolved settings for one run
#[derive(Clone, Debug)]
pub struct Config {
    pub services: String,
    pub stores: String,
    pub etcd: EtcdConfig,
    pub log_format: LogFormat,
    pub log_force_colors: bool,
    pub dry_run: bool,
}

impl Config {
    /// Read the config file named by `cli`, if any, and merge it under `cli`
    pub fn load(cli: Cli) -> anyhow::Result<Self> {
        let file = match &cli.config {
            Some(path) => FileConfig::read(path)?,
            None => FileConfig::default(),
        };
        Self::merge(cli, file)
    }

    pub fn merge(cli: Cli, file: FileConfig) -> anyhow::Result<Self> {
        let etcd_addresses = cli
            .etcd_addresses
            .or(file.etcd_addresses)
            .unwrap_or_else(|| DEFAULT_ETCD_ADDRESSES.to_string());
        let endpoints = split_addresses(&etcd_addresses);
        if endpoints.is_empty() {
            anyhow::bail!("etcd_addresses lists no address");
        }

        let lease_ttl = cli
            .lease_ttl
            .or(file.lease_ttl)
            .unwrap_or(DEFAULT_LEASE_TTL_SECS);
        if lease_ttl == 0 {
            anyhow::bail!("lease_ttl must be at least 1 second");
        }

        let request_timeout = cli
            .request_timeout
            .or(file.request_timeout)
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS);

        Ok(Self {
            services: cli.services.or(file.services).unwrap_or_default(),
            stores: cli.stores.or(file.stores).unwrap_or_default(),
            etcd: EtcdConfig {
                endpoints,
                lease_ttl: Duration::from_secs(lease_ttl),
                request_timeout: Duration::from_secs(request_timeout),
            },
            log_format: cli.log_format.or(file.log_format).unwrap_or_default(),
            log_force_colors: cli.log_force_colors || file.log_force_colors.unwrap_or(false),
            dry_run: cli.dry_run || file.dry_run.unwrap_or(false),
        })
    }
}

fn split_addresses(addresses: &str) -> Vec<String> {
    addresses
        .split(',')
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::merge(Cli::default(), FileConfig::default()).unwrap();
        assert_eq!(config.services, "");
        assert_eq!(config.stores, "");
        assert_eq!(config.etcd.endpoints, vec!["http://127.0.0.1:2379".to_string()]);
        assert_eq!(config.etcd.lease_ttl, Duration::from_secs(30));
        assert_eq!(config.etcd.request_timeout, Duration::from_secs(5));
        assert_eq!(config.log_format, LogFormat::Text);
        assert!(!config.log_force_colors);
        assert!(!config.dry_run);
    }

    #[test]
    fn test_cli_flags() {
        let cli = Cli::parse_from([
            "herald",
            "--services",
            "api,10.0.0.1:8080",
            "--stores",
            "default,/svc",
            "--etcd-addresses",
            "etcd-0:2379, etcd-1:2379",
            "--log-format",
            "json",
            "--dry-run",
        ]);
        let config = Config::merge(cli, FileConfig::default()).unwrap();

        assert_eq!(config.services, "api,10.0.0.1:8080");
        assert_eq!(config.stores, "default,/svc");
        assert_eq!(config.etcd.endpoints, vec!["etcd-0:2379".to_string(), "etcd-1:2379".to_string()]);
        assert_eq!(config.log_format, LogFormat::Json);
        assert!(config.dry_run);
    }

    #[test]
    fn test_file_values_fill_gaps() {
        let file = FileConfig::parse(
            r#"
            services = "api,10.0.0.1:8080,env=prod"
            stores = "puro,/legacy"
            lease_ttl = 10
            log_format = "json"
            log_force_colors = true
            "#,
        )
        .unwrap();
        let config = Config::merge(Cli::default(), file).unwrap();

        assert_eq!(config.services, "api,10.0.0.1:8080,env=prod");
        assert_eq!(config.stores, "puro,/legacy");
        assert_eq!(config.etcd.lease_ttl, Duration::from_secs(10));
        assert_eq!(config.log_format, LogFormat::Json);
        assert!(config.log_force_colors);
    }

    #[test]
    fn test_cli_overrides_file() {
        let file = FileConfig::parse(
            r#"
            services = "from-file,10.0.0.9:80"
            lease_ttl = 10
            "#,
        )
        .unwrap();
        let cli = Cli {
            services: Some("api,10.0.0.1:8080".to_string()),
            lease_ttl: Some(60),
            ..Cli::default()
        };
        let config = Config::merge(cli, file).unwrap();

        assert_eq!(config.services, "api,10.0.0.1:8080");
        assert_eq!(config.etcd.lease_ttl, Duration::from_secs(60));
    }

    #[test]
    fn test_rejects_zero_ttl() {
        let cli = Cli {
            lease_ttl: Some(0),
            ..Cli::default()
        };
        assert!(Config::merge(cli, FileConfig::default()).is_err());
    }

    #[test]
    fn test_rejects_empty_address_list() {
        let cli = Cli {
            etcd_addresses: Some(" , ".to_string()),
            ..Cli::default()
        };
        assert!(Config::merge(cli, FileConfig::default()).is_err());
    }

    #[test]
    fn test_file_rejects_unknown_keys() {
        assert!(FileConfig::parse("service = \"typo\"").is_err());
    }
}
