use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Clone, Debug)]
pub struct Config {
    #[clap(flatten)]
    pub db: DbConfig,
    #[clap(flatten)]
    pub worker: WorkerConfig,
    #[clap(flatten)]
    pub protocol: ProtocolConfig,
}

#[derive(Parser, Clone, Debug)]
pub struct DbConfig {
    /// Directory holding the market database
    #[clap(env = "AGORA_DATA_DIR", default_value = ".")]
    pub data_dir: PathBuf,
    #[clap(env = "AGORA_DB_NAME", default_value = "marketplace")]
    pub db_name: String,
}

#[derive(Parser, Clone, Debug)]
pub struct WorkerConfig {
    /// Messages waiting for a worker before senders are suspended
    #[clap(env = "AGORA_WORKER_QUEUE_SIZE", default_value = "256")]
    pub queue_size: usize,
    #[clap(env = "AGORA_WORKER_COUNT", default_value = "1")]
    pub count: usize,
}

#[derive(Parser, Clone, Debug)]
pub struct ProtocolConfig {
    /// Comma separated marketplace message versions accepted by the router
    #[clap(env = "AGORA_SUPPORTED_VERSIONS", default_value = "0300")]
    pub supported_versions: String,
}

impl ProtocolConfig {
    pub fn supported_versions(&self) -> Vec<String> {
        self.supported_versions
            .split(',')
            .map(str::trim)
            .filter(|version| !version.is_empty())
            .map(str::to_string)
            .collect()
    }
}

impl Config {
    pub fn from_env() -> Result<Config, clap::Error> {
        // Only the program name: every field comes from AGORA_* variables or
        // its default.
        Config::try_parse_from([""])
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_default_clap_db_config() {
        let c = Config::from_env().unwrap();
        assert_eq!(PathBuf::from("."), c.db.data_dir);
        assert_eq!("marketplace", c.db.db_name);
    }

    #[test]
    fn test_default_clap_worker_config() {
        let c = Config::from_env().unwrap();
        assert_eq!(256, c.worker.queue_size);
        assert_eq!(1, c.worker.count);
    }

    #[test]
    fn test_default_clap_protocol_config() {
        let c = Config::from_env().unwrap();
        assert_eq!(vec!["0300".to_string()], c.protocol.supported_versions());
    }

    #[test]
    fn test_supported_versions_list() {
        let protocol = ProtocolConfig {
            supported_versions: "0300, 0301,,".to_string(),
        };
        assert_eq!(
            vec!["0300".to_string(), "0301".to_string()],
            protocol.supported_versions()
        );
    }
}
