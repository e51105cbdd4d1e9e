//! `key: value` configuration file for mdcanvas.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};

use crate::graph::model::Position;
use crate::hotkey::Chord;

pub const CONFIG_ENV: &str = "MDCANVAS_CONFIG";

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Chord that creates a node.
    pub hotkey: Chord,
    /// Label given to newly created nodes.
    pub node_label: String,
    /// Where new nodes land when that spot is free.
    pub node_position: Position,
    /// Seed new nodes with the Markdown showcase note instead of an empty body.
    pub seed_content: bool,
    /// `tracing` filter directive used when `MDCANVAS_LOG` is unset.
    pub log_filter: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            hotkey: Chord::default(),
            node_label: "new note".to_string(),
            node_position: Position::new(250.0, 25.0),
            seed_content: true,
            log_filter: "info".to_string(),
        }
    }
}

pub fn parse(content: &str) -> Result<Config> {
    let mut config = Config::default();
    for (idx, raw) in content.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((key, value)) = line.split_once(':') else {
            bail!("line {}: expected `key: value`, got {:?}", line_no, raw);
        };
        let value = value.trim();
        match key.trim() {
            "hotkey" => {
                config.hotkey = Chord::parse(value).with_context(|| format!("line {}", line_no))?
            }
            "node_label" => config.node_label = value.to_string(),
            "node_x" => config.node_position.x = parse_number(value, line_no)?,
            "node_y" => config.node_position.y = parse_number(value, line_no)?,
            "seed_content" => config.seed_content = parse_bool(value, line_no)?,
            "log_filter" => config.log_filter = value.to_string(),
            other => bail!("line {}: unknown config key `{}`", line_no, other),
        }
    }
    Ok(config)
}

pub fn serialize(config: &Config) -> String {
    format!(
        "\
# mdcanvas configuration

# Chord that creates a node (keys joined with +, any order)
hotkey: {}

# Label given to new nodes
node_label: {}

# Canvas position of new nodes
node_x: {}
node_y: {}

# Start new nodes with the Markdown showcase note
seed_content: {}

# Log filter when MDCANVAS_LOG is unset (logs go to --log-file)
log_filter: {}
",
        config.hotkey,
        config.node_label,
        config.node_position.x,
        config.node_position.y,
        config.seed_content,
        config.log_filter
    )
}

/// `--config` wins, then `$MDCANVAS_CONFIG`; `None` means built-in defaults.
pub fn resolve_path(cli: Option<PathBuf>) -> Option<PathBuf> {
    cli.or_else(|| {
        std::env::var(CONFIG_ENV)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from)
    })
}

pub fn load(path: Option<&Path>) -> Result<Config> {
    let Some(path) = path else {
        return Ok(Config::default());
    };
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    parse(&content).with_context(|| format!("invalid config {}", path.display()))
}

fn parse_bool(value: &str, line_no: usize) -> Result<bool> {
    match value {
        "true" | "yes" | "on" => Ok(true),
        "false" | "no" | "off" => Ok(false),
        _ => bail!("line {}: expected true or false, got {:?}", line_no, value),
    }
}

fn parse_number(value: &str, line_no: usize) -> Result<f64> {
    value
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .with_context(|| format!("line {}: expected a number, got {:?}", line_no, value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn empty_file_yields_defaults() {
        assert_eq!(parse("# nothing\n\n").unwrap(), Config::default());
    }

    #[test]
    fn serialized_defaults_parse_back() {
        let text = serialize(&Config::default());
        assert_eq!(parse(&text).unwrap(), Config::default());
    }

    #[test]
    fn values_override_defaults() {
        let cfg = parse("hotkey: Ctrl+k\nnode_label: idea\nnode_x: 10\nnode_y: -4.5\nseed_content: off\n")
            .unwrap();
        assert_eq!(cfg.hotkey, Chord::parse("Control+k").unwrap());
        assert_eq!(cfg.node_label, "idea");
        assert_eq!(cfg.node_position, Position::new(10.0, -4.5));
        assert!(!cfg.seed_content);
    }

    #[test]
    fn unknown_keys_and_bad_values_name_the_line() {
        let err = parse("\nfoo: bar\n").unwrap_err();
        assert!(err.to_string().contains("line 2"), "{err}");

        let err = parse("seed_content: maybe\n").unwrap_err();
        assert!(err.to_string().contains("line 1"), "{err}");

        assert!(parse("node_x: wide\n").is_err());
        assert!(parse("no separator\n").is_err());
    }

    #[test]
    fn load_reads_from_disk() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("mdcanvas.conf");
        fs::write(&path, "node_label: from disk\n").unwrap();
        let cfg = load(Some(&path)).unwrap();
        assert_eq!(cfg.node_label, "from disk");
    }

    #[test]
    fn load_without_path_is_default_and_missing_file_errors() {
        assert_eq!(load(None).unwrap(), Config::default());
        let dir = TempDir::new().unwrap();
        assert!(load(Some(&dir.path().join("absent"))).is_err());
    }

    #[test]
    fn cli_path_takes_priority() {
        let picked = resolve_path(Some(PathBuf::from("/tmp/a.conf")));
        assert_eq!(picked, Some(PathBuf::from("/tmp/a.conf")));
    }
}
