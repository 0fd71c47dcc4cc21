//! Server configuration

use nameguard_detect::DetectorConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen address
    #[serde(default = "default_listen")]
    pub listen: String,

    /// Listen port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Request audit log
    #[serde(default)]
    pub audit: AuditConfig,

    /// Detection cascade settings
    #[serde(default)]
    pub detector: DetectorConfig,
}

/// Request audit log settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// CSV file appended to per screened comment
    #[serde(default = "default_audit_path")]
    pub path: PathBuf,
}

impl ServerConfig {
    /// Load configuration from file and CLI overrides
    pub fn load(config_path: &str, cli: &crate::Cli) -> anyhow::Result<Self> {
        let mut config = if Path::new(config_path).exists() {
            let content = std::fs::read_to_string(config_path)?;
            serde_yaml::from_str(&content)?
        } else {
            Self::default()
        };

        if let Some(listen) = &cli.listen {
            config.listen = listen.clone();
        }
        if let Some(port) = cli.port {
            config.port = port;
        }
        if let Some(sanctions) = &cli.sanctions {
            config.detector.sanctions_path = sanctions.clone();
        }
        if let Some(audit_log) = &cli.audit_log {
            config.audit.path = audit_log.clone();
        }
        if cli.no_verifier {
            config.detector.verifier.enabled = false;
        }

        Ok(config)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            port: default_port(),
            audit: AuditConfig::default(),
            detector: DetectorConfig::default(),
        }
    }
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: default_audit_path(),
        }
    }
}

fn default_listen() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_true() -> bool {
    true
}

fn default_audit_path() -> PathBuf {
    PathBuf::from("logs/requests.csv")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_yaml_with_nested_detector() {
        let yaml = r#"
port: 9000
detector:
  verification_threshold: 0.9
  verifier:
    enabled: false
audit:
  enabled: false
"#;
        let config: ServerConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.listen, "0.0.0.0");
        assert_eq!(config.detector.verification_threshold, 0.9);
        assert!(!config.detector.verifier.enabled);
        assert!(!config.audit.enabled);
    }

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.port, 8000);
        assert!(config.audit.enabled);
        assert_eq!(config.audit.path, PathBuf::from("logs/requests.csv"));
    }
}
