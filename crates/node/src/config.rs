//! On-disk configuration of the daemon.
use std::fs;
use std::io;
use std::net::Ipv4Addr;
use std::net::SocketAddrV4;

use chordring_core::config::RingConfig;
use serde::Deserialize;
use serde::Serialize;

use crate::error::Error;
use crate::error::Result;
use crate::logging::LogLevel;
use crate::util::ensure_parent_dir;
use crate::util::expand_home;

pub const DEFAULT_CONFIG_PATH: &str = "~/.chordring/config.yaml";
pub const DEFAULT_BIND_IP: Ipv4Addr = Ipv4Addr::UNSPECIFIED;
pub const DEFAULT_PORT: u16 = 7000;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    /// Hashed into the ring id of the node.
    pub name: String,
    pub bind_ip: Ipv4Addr,
    pub port: u16,
    /// Ring member to join through. A new ring is created when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bootstrap: Option<SocketAddrV4>,
    pub log_level: LogLevel,
    /// When there is no configuration in the YAML file,
    /// every tunable takes its default.
    #[serde(default)]
    pub ring: RingConfig,
}

impl Config {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            bind_ip: DEFAULT_BIND_IP,
            port: DEFAULT_PORT,
            bootstrap: None,
            log_level: LogLevel::Info,
            ring: RingConfig::default(),
        }
    }

    pub fn write_fs<P>(&self, path: P) -> Result<String>
    where P: AsRef<std::path::Path> {
        let path = expand_home(path)?;
        ensure_parent_dir(&path)?;
        let f =
            fs::File::create(path.as_path()).map_err(|e| Error::CreateFileError(e.to_string()))?;
        let f_writer = io::BufWriter::new(f);
        serde_yaml::to_writer(f_writer, self)?;
        Ok(path.to_string_lossy().into_owned())
    }

    pub fn read_fs<P>(path: P) -> Result<Config>
    where P: AsRef<std::path::Path> {
        let path = expand_home(path)?;
        tracing::debug!("Read config from: {:?}", path);
        let f = fs::File::open(path).map_err(|e| Error::OpenFileError(e.to_string()))?;
        let f_rdr = io::BufReader::new(f);
        Ok(serde_yaml::from_reader(f_rdr)?)
    }
}
