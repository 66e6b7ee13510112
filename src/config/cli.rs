//! Command-line options.
//!
//! Every option can also be set from the environment. Values given here
//! override the config file.

use std::path::PathBuf;

use clap::Parser;

use crate::config::schema::PluginConfig;

#[derive(Debug, Default, Parser)]
#[command(name = "reproxy-geo-plugin", version)]
#[command(about = "Adds geolocation headers to requests passing through reproxy", long_about = None)]
pub struct Cli {
    /// TOML config file
    #[arg(short, long, env = "CONFIG")]
    pub config: Option<PathBuf>,

    /// Listen on host:port
    #[arg(short, long, env = "LISTEN")]
    pub listen: Option<String>,

    /// Reproxy plugins endpoint
    #[arg(short, long, env = "REPROXY")]
    pub reproxy: Option<String>,

    /// Plugin name announced to reproxy
    #[arg(long, env = "PLUGIN_NAME")]
    pub name: Option<String>,

    /// Database file path
    #[arg(short, long, env = "DATABASE")]
    pub database: Option<String>,

    /// Comma-separated field codes (CF,CC,REG,CITY,ISP,LAT,LON,DOM,ZIP,TZ,NS,IDD,AREA,WEC,WEN,MCC,MNC,MB,EL,UT)
    #[arg(short, long, env = "FIELDS")]
    pub fields: Option<String>,

    /// HTTP header prefix
    #[arg(short, long, env = "PREFIX")]
    pub prefix: Option<String>,

    /// Take the client address from this header, e.g. X-Real-IP
    #[arg(short = 's', long = "ipsource", env = "IPSOURCE")]
    pub ip_source: Option<String>,

    /// Load the database file into memory
    #[arg(
        short = 'm',
        long = "inmemory",
        env = "INMEMORY",
        value_parser = clap::builder::BoolishValueParser::new()
    )]
    pub in_memory: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Serve Prometheus metrics on host:port
    #[arg(long = "metrics", env = "METRICS_LISTEN")]
    pub metrics_listen: Option<String>,
}

impl Cli {
    /// Apply explicitly set options on top of `config`.
    pub fn apply(&self, config: &mut PluginConfig) {
        if let Some(listen) = &self.listen {
            config.listener.address = listen.clone();
        }
        if let Some(reproxy) = &self.reproxy {
            config.host.endpoint = reproxy.clone();
        }
        if let Some(name) = &self.name {
            config.host.plugin_name = name.clone();
        }
        if let Some(database) = &self.database {
            config.database.path = database.clone();
        }
        if let Some(fields) = &self.fields {
            config.headers.fields = fields.clone();
        }
        if let Some(prefix) = &self.prefix {
            config.headers.prefix = prefix.clone();
        }
        if let Some(ip_source) = &self.ip_source {
            config.headers.ip_source = ip_source.clone();
        }
        if self.in_memory {
            config.database.in_memory = true;
        }
        if let Some(level) = &self.log_level {
            config.observability.log_level = level.clone();
        }
        if let Some(metrics) = &self.metrics_listen {
            config.observability.metrics_address = Some(metrics.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_flags() {
        let cli = Cli::try_parse_from([
            "reproxy-geo-plugin",
            "-l", "127.0.0.1:9000",
            "-r", "http://127.0.0.1:8081",
            "-d", "/data/geo.mmdb",
            "-f", "CF,LAT,LON",
            "-p", "X-Loc-",
            "-s", "X-Real-IP",
            "-m",
        ])
        .unwrap();

        let mut config = PluginConfig::default();
        cli.apply(&mut config);
        assert_eq!(config.listener.address, "127.0.0.1:9000");
        assert_eq!(config.database.path, "/data/geo.mmdb");
        assert_eq!(config.headers.fields, "CF,LAT,LON");
        assert_eq!(config.headers.prefix, "X-Loc-");
        assert_eq!(config.headers.ip_source, "X-Real-IP");
        assert!(config.database.in_memory);
    }

    #[test]
    fn test_inmemory_env_accepts_boolish_values() {
        for (value, expected) in [("1", true), ("t", true), ("TRUE", true), ("yes", true), ("0", false), ("false", false)] {
            std::env::set_var("INMEMORY", value);
            let parsed = Cli::try_parse_from(["reproxy-geo-plugin"]).map(|cli| cli.in_memory);
            std::env::remove_var("INMEMORY");
            assert_eq!(parsed.unwrap(), expected, "INMEMORY={value}");
        }
    }

    #[test]
    fn test_unset_options_keep_config() {
        let cli = Cli::try_parse_from(["reproxy-geo-plugin", "--ipsource", ""]).unwrap();
        let mut config = PluginConfig::default();
        config.headers.prefix = "X-From-File-".into();
        config.database.in_memory = true;
        cli.apply(&mut config);

        assert_eq!(config.headers.prefix, "X-From-File-");
        assert_eq!(config.headers.fields, "CF,CC,REG,CITY");
        assert_eq!(config.headers.ip_source, "");
        assert!(config.database.in_memory);
    }
}
