use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::error::HbasemonError;

/// Ports RegionServers listen on by default (HBase 1.x and 0.9x).
pub const DEFAULT_PORTS: [u16; 2] = [16020, 60020];

#[derive(Parser, Debug)]
#[command(version, about = "Passive HBase RegionServer RPC observer", long_about = None)]
pub struct Cli {
    /// Capture files to read; captures live traffic when omitted.
    #[arg(value_name = "FILE")]
    pub files: Vec<PathBuf>,

    /// RegionServer port to monitor; repeatable. Defaults to 16020 and 60020.
    #[arg(short, long = "port", value_name = "PORT")]
    pub ports: Vec<u16>,

    /// Stop after this many packets.
    #[arg(short, long, value_name = "COUNT")]
    pub count: Option<u64>,

    /// Stop after this many seconds.
    #[arg(short, long, value_name = "SECONDS")]
    pub duration: Option<u64>,

    /// Interface to capture on; the platform default when omitted.
    #[arg(short, long, value_name = "IFACE", env = "HBASEMON_INTERFACE")]
    pub interface: Option<String>,

    /// Produce events to Kafka, e.g. "broker1:9092,broker2:9092/hbase-rpc".
    #[arg(long, value_name = "SERVERS/TOPIC")]
    pub kafka: Option<String>,

    /// Log every emitted event.
    #[arg(short, long)]
    pub verbose: bool,
}

/// Parsed form of the `--kafka=SERVERS/TOPIC` flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KafkaOpts {
    pub servers: String,
    pub topic: String,
}

impl Cli {
    /// The monitored port set, defaulted when none was given.
    pub fn ports(&self) -> Vec<u16> {
        if self.ports.is_empty() {
            DEFAULT_PORTS.to_vec()
        } else {
            self.ports.clone()
        }
    }

    pub fn duration(&self) -> Option<Duration> {
        self.duration.map(Duration::from_secs)
    }

    /// Splits `--kafka` into servers and topic.
    pub fn kafka(&self) -> Result<Option<KafkaOpts>, HbasemonError> {
        let Some(value) = &self.kafka else {
            return Ok(None);
        };
        match value.split_once('/') {
            Some((servers, topic)) if !servers.is_empty() && !topic.is_empty() => {
                Ok(Some(KafkaOpts {
                    servers: servers.to_string(),
                    topic: topic.to_string(),
                }))
            }
            _ => Err(HbasemonError::Args(format!(
                "--kafka expects SERVERS/TOPIC, got {value:?}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::env;

    use clap::Parser as _;
    use serial_test::serial;

    use super::*;

    fn clear_env_vars() {
        unsafe {
            env::remove_var("HBASEMON_INTERFACE");
        }
    }

    #[test]
    #[serial]
    fn default_ports_apply_when_none_given() {
        clear_env_vars();
        let cli = Cli::parse_from(["hbasemon"]);
        assert_eq!(cli.ports(), vec![16020, 60020]);
    }

    #[test]
    #[serial]
    fn explicit_ports_replace_defaults() {
        clear_env_vars();
        let cli = Cli::parse_from(["hbasemon", "--port", "16201", "-p", "16301"]);
        assert_eq!(cli.ports(), vec![16201, 16301]);
    }

    #[test]
    #[serial]
    fn parses_limits_and_files() {
        clear_env_vars();
        let cli = Cli::parse_from([
            "hbasemon",
            "--count",
            "500",
            "--duration",
            "30",
            "a.pcap",
            "b.pcap",
        ]);
        assert_eq!(cli.count, Some(500));
        assert_eq!(cli.duration(), Some(Duration::from_secs(30)));
        assert_eq!(cli.files.len(), 2);
    }

    #[test]
    #[serial]
    fn interface_falls_back_to_env() {
        clear_env_vars();
        unsafe {
            env::set_var("HBASEMON_INTERFACE", "eth3");
        }
        let cli = Cli::parse_from(["hbasemon"]);
        assert_eq!(cli.interface.as_deref(), Some("eth3"));
        clear_env_vars();
    }

    #[test]
    #[serial]
    fn kafka_flag_splits_servers_and_topic() {
        clear_env_vars();
        let cli = Cli::parse_from(["hbasemon", "--kafka", "broker1:9092,broker2:9092/rpc"]);
        assert_eq!(
            cli.kafka().unwrap(),
            Some(KafkaOpts {
                servers: "broker1:9092,broker2:9092".to_string(),
                topic: "rpc".to_string(),
            })
        );
    }

    #[test]
    #[serial]
    fn kafka_flag_without_topic_is_an_error() {
        clear_env_vars();
        let cli = Cli::parse_from(["hbasemon", "--kafka", "broker1:9092"]);
        assert!(cli.kafka().is_err());

        let cli = Cli::parse_from(["hbasemon", "--kafka", "broker1:9092/"]);
        assert!(cli.kafka().is_err());
    }
}
