use std::env;
use std::path::PathBuf;
use std::time::Duration;

use log::warn;

const DEFAULT_TIMEOUT_SECS: u64 = 120;

// Settings for the external image tool
#[derive(Debug, Clone)]
pub struct ToolConfig {
    pub command: String,
    pub args: Vec<String>,
    pub timeout: Duration,
    pub server_name: String,
    pub tool_name: String,
    pub descriptor_dir: PathBuf,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub static_dir: String,
    pub template_glob: String,
    pub tool: ToolConfig,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let port = parse_or_default(&lookup, "PORT", 8080u16);
        let timeout_secs = parse_or_default(&lookup, "IMAGE_TOOL_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS);

        let descriptor_dir = lookup("DESCRIPTOR_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(env::temp_dir);

        Self {
            host: get("HOST", "0.0.0.0"),
            port,
            static_dir: get("STATIC_DIR", "./static"),
            template_glob: get("TEMPLATE_GLOB", "templates/**/*"),
            tool: ToolConfig {
                command: get("IMAGE_TOOL_COMMAND", "cline"),
                args: get("IMAGE_TOOL_ARGS", "mcp")
                    .split_whitespace()
                    .map(str::to_string)
                    .collect(),
                timeout: Duration::from_secs(timeout_secs),
                server_name: get("IMAGE_SERVER_NAME", "flux-schnell"),
                tool_name: get("IMAGE_TOOL_NAME", "generate_image"),
                descriptor_dir,
            },
        }
    }
}

fn parse_or_default<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr + std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("Invalid value {:?} for {}, using {}", raw, key, default);
            default
        }),
        None => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> AppConfig {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_match_the_flux_tool() {
        let config = config_from(&[]);
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 8080);
        assert_eq!(config.tool.command, "cline");
        assert_eq!(config.tool.args, vec!["mcp".to_string()]);
        assert_eq!(config.tool.server_name, "flux-schnell");
        assert_eq!(config.tool.tool_name, "generate_image");
        assert_eq!(config.tool.timeout, Duration::from_secs(120));
        assert_eq!(config.tool.descriptor_dir, env::temp_dir());
    }

    #[test]
    fn overrides_are_applied() {
        let config = config_from(&[
            ("PORT", "9000"),
            ("IMAGE_TOOL_COMMAND", "/usr/local/bin/tool"),
            ("IMAGE_TOOL_ARGS", "run  --json"),
            ("IMAGE_TOOL_TIMEOUT_SECS", "5"),
            ("DESCRIPTOR_DIR", "/var/tmp/relay"),
        ]);
        assert_eq!(config.port, 9000);
        assert_eq!(config.tool.command, "/usr/local/bin/tool");
        assert_eq!(config.tool.args, vec!["run", "--json"]);
        assert_eq!(config.tool.timeout, Duration::from_secs(5));
        assert_eq!(config.tool.descriptor_dir, PathBuf::from("/var/tmp/relay"));
    }

    #[test]
    fn bad_numbers_fall_back() {
        let config = config_from(&[("PORT", "eighty"), ("IMAGE_TOOL_TIMEOUT_SECS", "-1")]);
        assert_eq!(config.port, 8080);
        assert_eq!(config.tool.timeout, Duration::from_secs(DEFAULT_TIMEOUT_SECS));
    }

    #[test]
    fn empty_args_means_no_leading_args() {
        let config = config_from(&[("IMAGE_TOOL_ARGS", "")]);
        assert!(config.tool.args.is_empty());
    }
}
