use clap::Parser;
use serde::Deserialize;
use std::path::{Path, PathBuf};

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_CONFIG_PATH: &str = "crag.toml";
const DEFAULT_TOP_K: usize = 5;

#[derive(Parser)]
#[command(name = "crag-server")]
struct Cli {
    /// Path to the configuration file
    #[arg(long = "config", default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,
}

#[derive(Debug, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    pub artifacts: ArtifactsConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
}

#[derive(Debug, Deserialize, PartialEq)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

/// Paths to the prebuilt corpus artifacts. Both are produced by the same
/// index-build run; the server refuses to start if they disagree in size.
#[derive(Debug, Deserialize, PartialEq)]
pub struct ArtifactsConfig {
    /// Serialized vector index file.
    pub index: PathBuf,
    /// Chunk metadata database.
    pub metadata: PathBuf,
}

#[derive(Debug, Deserialize, PartialEq)]
pub struct RetrievalConfig {
    /// Number of chunks to retrieve when a request does not specify top_k.
    #[serde(default = "default_top_k")]
    pub default_top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            default_top_k: default_top_k(),
        }
    }
}

fn default_top_k() -> usize {
    DEFAULT_TOP_K
}

impl Config {
    pub fn load() -> Result<Self, String> {
        let cli = Cli::parse();
        Self::from_file(&cli.config)
    }

    pub fn from_file(path: &Path) -> Result<Self, String> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| format!("failed to read config file '{}': {e}", path.display()))?;
        Self::parse(&contents)
    }

    pub fn parse(contents: &str) -> Result<Self, String> {
        let config: Config = toml::from_str(contents).map_err(|e| format!("invalid config: {e}"))?;
        if config.retrieval.default_top_k == 0 {
            return Err("invalid config: retrieval.default_top_k must be greater than zero".into());
        }
        Ok(config)
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_minimal_valid_config() {
        let toml = r#"
[artifacts]
index = "vector_store/index.bin"
metadata = "vector_store/metadata.db"
"#;
        let config = Config::parse(toml).unwrap();
        assert_eq!(config.artifacts.index, PathBuf::from("vector_store/index.bin"));
        assert_eq!(
            config.artifacts.metadata,
            PathBuf::from("vector_store/metadata.db")
        );
    }

    #[test]
    fn missing_artifacts_section_produces_error() {
        let toml = r#"
[server]
host = "0.0.0.0"
port = 8080
"#;
        let err = Config::parse(toml).unwrap_err();
        assert!(
            err.contains("artifacts"),
            "error should mention artifacts: {err}"
        );
    }

    #[test]
    fn missing_server_section_uses_defaults() {
        let toml = r#"
[artifacts]
index = "index.bin"
metadata = "metadata.db"
"#;
        let config = Config::parse(toml).unwrap();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.bind_address(), "127.0.0.1:3000");
    }

    #[test]
    fn missing_retrieval_section_defaults_top_k_to_five() {
        let toml = r#"
[artifacts]
index = "index.bin"
metadata = "metadata.db"
"#;
        let config = Config::parse(toml).unwrap();
        assert_eq!(config.retrieval.default_top_k, 5);
    }

    #[test]
    fn zero_default_top_k_is_rejected() {
        let toml = r#"
[artifacts]
index = "index.bin"
metadata = "metadata.db"

[retrieval]
default_top_k = 0
"#;
        let err = Config::parse(toml).unwrap_err();
        assert!(
            err.contains("default_top_k"),
            "error should mention default_top_k: {err}"
        );
    }

    #[test]
    fn custom_values_override_defaults() {
        let toml = r#"
[server]
host = "0.0.0.0"
port = 8080

[artifacts]
index = "index.bin"
metadata = "metadata.db"

[retrieval]
default_top_k = 3
"#;
        let config = Config::parse(toml).unwrap();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.retrieval.default_top_k, 3);
    }

    #[test]
    fn config_flag_reads_specified_file() {
        let dir = std::env::temp_dir().join("crag-config-test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("custom.toml");
        std::fs::write(
            &path,
            r#"
[artifacts]
index = "custom-index.bin"
metadata = "custom-metadata.db"
"#,
        )
        .unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.artifacts.index, PathBuf::from("custom-index.bin"));

        std::fs::remove_dir_all(&dir).ok();
    }
}
