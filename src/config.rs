use clap::Parser;
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "filo", about = "A personal content feed client")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Host to bind to
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Path to data directory
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Base URL of the hosted backend
    #[arg(long)]
    pub backend_url: Option<String>,

    /// API key for the hosted backend
    #[arg(long)]
    pub backend_key: Option<String>,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub backend: BackendConfig,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct BackendConfig {
    pub url: String,
    pub api_key: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
        }
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:54321".to_string(),
            api_key: String::new(),
        }
    }
}

impl Config {
    pub fn load(cli: &Cli) -> anyhow::Result<Self> {
        let data_dir = Self::data_dir(cli);
        let config_path = cli
            .config
            .clone()
            .unwrap_or_else(|| data_dir.join("config.toml"));

        let mut config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str(&content)?
        } else {
            Config::default()
        };

        // CLI overrides
        if let Some(ref host) = cli.host {
            config.server.host = host.clone();
        }
        if let Some(port) = cli.port {
            config.server.port = port;
        }
        if let Some(ref url) = cli.backend_url {
            config.backend.url = url.clone();
        }
        if let Some(ref key) = cli.backend_key {
            config.backend.api_key = key.clone();
        }

        Ok(config)
    }

    pub fn data_dir(cli: &Cli) -> PathBuf {
        cli.data_dir.clone().unwrap_or_else(|| {
            dirs::home_dir()
                .expect("Could not determine home directory")
                .join(".filo")
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli() -> Cli {
        Cli {
            config: None,
            host: None,
            port: None,
            data_dir: None,
            backend_url: None,
            backend_key: None,
        }
    }

    #[test]
    fn default_config_has_expected_values() {
        let config = Config::default();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.backend.url, "http://127.0.0.1:54321");
        assert!(config.backend.api_key.is_empty());
    }

    #[test]
    fn data_dir_uses_cli_override() {
        let mut cli = cli();
        cli.data_dir = Some(PathBuf::from("/tmp/test-filo"));
        assert_eq!(Config::data_dir(&cli), PathBuf::from("/tmp/test-filo"));
    }

    #[test]
    fn data_dir_defaults_to_home_dot_filo() {
        let dir = Config::data_dir(&cli());
        assert!(dir.ends_with(".filo"));
    }

    #[test]
    fn load_with_no_config_file_uses_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let mut cli = cli();
        cli.data_dir = Some(tmp.path().to_path_buf());
        let config = Config::load(&cli).unwrap();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 3000);
    }

    #[test]
    fn load_reads_toml_file() {
        let tmp = tempfile::tempdir().unwrap();
        let config_path = tmp.path().join("config.toml");
        std::fs::write(
            &config_path,
            r#"
[server]
host = "0.0.0.0"
port = 9000

[backend]
url = "https://project.example.com"
api_key = "anon-key"
"#,
        )
        .unwrap();

        let mut cli = cli();
        cli.config = Some(config_path);
        cli.data_dir = Some(tmp.path().to_path_buf());
        let config = Config::load(&cli).unwrap();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.backend.url, "https://project.example.com");
        assert_eq!(config.backend.api_key, "anon-key");
    }

    #[test]
    fn cli_overrides_beat_toml_values() {
        let tmp = tempfile::tempdir().unwrap();
        let config_path = tmp.path().join("config.toml");
        std::fs::write(
            &config_path,
            r#"
[server]
port = 9000

[backend]
url = "https://project.example.com"
"#,
        )
        .unwrap();

        let mut cli = cli();
        cli.config = Some(config_path);
        cli.data_dir = Some(tmp.path().to_path_buf());
        cli.port = Some(4000);
        cli.backend_url = Some("https://other.example.com".to_string());
        let config = Config::load(&cli).unwrap();
        assert_eq!(config.server.port, 4000);
        assert_eq!(config.backend.url, "https://other.example.com");
    }
}
