use std::path::PathBuf;

use clap::Parser;
use gtmcdc_config::{dev_mode_from_env, FilterConfig};

#[derive(Debug, Parser)]
#[command(name = "gtmcdc")]
#[command(about = "Filter a journal extract into JSON change events on Kafka")]
#[command(version)]
pub struct Cli {
    /// Input journal extract, or `stdin`
    #[arg(short, long)]
    pub input: Option<String>,

    /// Output file for echoed lines, or `stdout`
    #[arg(short, long)]
    pub output: Option<String>,

    /// Config file (.env or .toml); defaults to $GTMCDC_ENV or filter.env next to the binary
    #[arg(long)]
    pub conf: Option<PathBuf>,

    /// Log file, or `stderr`
    #[arg(long)]
    pub log: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    pub loglevel: Option<String>,

    /// Comma-separated Kafka broker list, or `off`
    #[arg(long)]
    pub brokers: Option<String>,

    /// Kafka topic to publish change events to
    #[arg(long)]
    pub topic: Option<String>,

    /// Address for the Prometheus /metrics listener, or `off`
    #[arg(long)]
    pub prom: Option<String>,

    /// Developer mode: no Kafka, no metrics listener, debug logging
    #[arg(long)]
    pub dev: bool,
}

impl Cli {
    pub fn dev_mode(&self) -> bool {
        self.dev || dev_mode_from_env()
    }

    /// Flags take precedence over file and environment values. Dev mode
    /// still wins over `--brokers` and `--prom`.
    pub fn apply_overrides(&self, config: &mut FilterConfig) {
        let overrides = [
            (&self.input, &mut config.input_file),
            (&self.output, &mut config.output_file),
            (&self.log, &mut config.log_file),
            (&self.loglevel, &mut config.log_level),
            (&self.brokers, &mut config.kafka_brokers),
            (&self.topic, &mut config.kafka_topic),
            (&self.prom, &mut config.prom_http_addr),
        ];

        for (flag, target) in overrides {
            if let Some(value) = flag.as_deref().filter(|v| !v.is_empty()) {
                *target = value.to_string();
            }
        }

        if self.dev || config.dev_mode {
            config.apply_dev_overrides();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_overrides() {
        let cli = Cli::parse_from([
            "gtmcdc",
            "-i",
            "journal.txt",
            "--brokers",
            "k1:9092,k2:9092",
            "--topic",
            "",
            "--loglevel",
            "warn",
        ]);

        let mut config = FilterConfig::default();
        cli.apply_overrides(&mut config);

        assert_eq!(config.input_file, "journal.txt");
        assert_eq!(config.kafka_brokers, "k1:9092,k2:9092");
        assert_eq!(config.kafka_topic, "cdc-test");
        assert_eq!(config.log_level, "warn");
        assert_eq!(config.output_file, "stdout");
    }

    #[test]
    fn test_dev_flag_wins() {
        let cli = Cli::parse_from(["gtmcdc", "--dev", "--brokers", "k1:9092", "--prom", "0.0.0.0:1"]);

        let mut config = FilterConfig::default();
        cli.apply_overrides(&mut config);

        assert!(config.dev_mode);
        assert!(!config.kafka_enabled());
        assert_eq!(config.prom_http_addr, "off");
        assert_eq!(config.log_level, "debug");
    }
}
