//! Pipeline configuration: the `PIPELINE`/`INPUT`/`OUTPUT`/`MEMORY`/
//! `ANOMALY` section/key layout, loaded from an INI file and validated
//! eagerly before any I/O begins.

use std::path::{Path, PathBuf};

use ini::Ini;

use crate::error::ConfigError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputType {
    File,
    Directory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Csv,
}

#[derive(Debug, Clone)]
pub struct Config {
    // PIPELINE
    pub chunk_size: usize,
    pub max_rows: i64,
    pub enable_checkpoint: bool,
    pub bronze_checkpoint: PathBuf,
    pub silver_checkpoint: PathBuf,

    // INPUT
    pub input_type: InputType,
    pub input_path: PathBuf,
    pub file_pattern: Option<String>,

    // OUTPUT
    pub output_dir: PathBuf,
    pub output_format: OutputFormat,

    // MEMORY (advisory)
    pub max_chunk_mb: usize,
    pub flush_interval: usize,

    // ANOMALY
    pub anomaly_top_n: usize,
    pub high_revenue_threshold: f64,
}

impl Config {
    pub fn load(path: &Path) -> Result<Config, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::new("config file not found").key(path.display().to_string()));
        }

        let ini = Ini::load_from_file(path)
            .map_err(|e| ConfigError::new(format!("failed to parse config file: {e}")))?;

        let pipeline = section(&ini, "PIPELINE")?;
        let chunk_size = get_int(pipeline, "PIPELINE", "chunk_size")? as usize;
        if chunk_size == 0 {
            return Err(ConfigError::new("chunk_size must be > 0")
                .section("PIPELINE")
                .key("chunk_size"));
        }
        let max_rows = get_int(pipeline, "PIPELINE", "max_rows")?;
        let enable_checkpoint = get_bool(pipeline, "PIPELINE", "enable_checkpoint")?;
        // `checkpoint_file` is required by the section/key layout but the
        // two-phase runtime uses the explicit bronze/silver paths; fall
        // back to deriving them from it when the split paths are absent.
        let checkpoint_file = get_str(pipeline, "PIPELINE", "checkpoint_file")?;
        let bronze_checkpoint = pipeline
            .get("bronze_checkpoint")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(format!("{checkpoint_file}.bronze")));
        let silver_checkpoint = pipeline
            .get("silver_checkpoint")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(format!("{checkpoint_file}.silver")));

        let input = section(&ini, "INPUT")?;
        let input_type_raw = get_str(input, "INPUT", "input_type")?.to_lowercase();
        let input_type = match input_type_raw.as_str() {
            "file" => InputType::File,
            "directory" => InputType::Directory,
            _ => {
                return Err(ConfigError::new("input_type must be 'file' or 'directory'")
                    .section("INPUT")
                    .key("input_type"))
            }
        };
        let input_path = PathBuf::from(get_str(input, "INPUT", "input_path")?);
        let file_pattern = input.get("file_pattern").map(str::to_string);
        if input_type == InputType::Directory && file_pattern.is_none() {
            return Err(ConfigError::new("file_pattern required when input_type=directory")
                .section("INPUT")
                .key("file_pattern"));
        }

        let output = section(&ini, "OUTPUT")?;
        let output_dir = PathBuf::from(get_str(output, "OUTPUT", "output_dir")?);
        let output_format_raw = get_str(output, "OUTPUT", "format")?.to_lowercase();
        let output_format = match output_format_raw.as_str() {
            "csv" => OutputFormat::Csv,
            _ => {
                return Err(ConfigError::new("only csv output is supported")
                    .section("OUTPUT")
                    .key("format"))
            }
        };
        std::fs::create_dir_all(&output_dir)
            .map_err(|e| ConfigError::new(format!("failed to create output_dir: {e}")))?;

        let memory = section(&ini, "MEMORY")?;
        let max_chunk_mb = get_int(memory, "MEMORY", "max_chunk_mb")? as usize;
        let flush_interval = get_int(memory, "MEMORY", "flush_interval")? as usize;

        let anomaly = section(&ini, "ANOMALY")?;
        let anomaly_top_n = get_int(anomaly, "ANOMALY", "top_n")? as usize;
        if anomaly_top_n == 0 {
            return Err(ConfigError::new("top_n must be > 0")
                .section("ANOMALY")
                .key("top_n"));
        }
        let high_revenue_threshold = get_float(anomaly, "ANOMALY", "high_revenue_threshold")?;

        Ok(Config {
            chunk_size,
            max_rows,
            enable_checkpoint,
            bronze_checkpoint,
            silver_checkpoint,
            input_type,
            input_path,
            file_pattern,
            output_dir,
            output_format,
            max_chunk_mb,
            flush_interval,
            anomaly_top_n,
            high_revenue_threshold,
        })
    }
}

fn section<'a>(ini: &'a Ini, name: &str) -> Result<&'a ini::Properties, ConfigError> {
    ini.section(Some(name))
        .ok_or_else(|| ConfigError::new("missing required section").section(name))
}

fn get_str<'a>(props: &'a ini::Properties, section: &str, key: &str) -> Result<&'a str, ConfigError> {
    props
        .get(key)
        .ok_or_else(|| ConfigError::new("missing required config key").section(section).key(key))
}

fn get_int(props: &ini::Properties, section: &str, key: &str) -> Result<i64, ConfigError> {
    get_str(props, section, key)?
        .trim()
        .parse::<i64>()
        .map_err(|_| ConfigError::new("invalid integer value").section(section).key(key))
}

fn get_float(props: &ini::Properties, section: &str, key: &str) -> Result<f64, ConfigError> {
    get_str(props, section, key)?
        .trim()
        .parse::<f64>()
        .map_err(|_| ConfigError::new("invalid float value").section(section).key(key))
}

fn get_bool(props: &ini::Properties, section: &str, key: &str) -> Result<bool, ConfigError> {
    match get_str(props, section, key)?.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::new("invalid boolean value").section(section).key(key)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_config(dir: &TempDir, body: &str) -> PathBuf {
        let path = dir.path().join("pipeline.conf");
        std::fs::write(&path, body).unwrap();
        path
    }

    const VALID: &str = r#"
[PIPELINE]
chunk_size = 500
max_rows = -1
enable_checkpoint = true
checkpoint_file = ./state/checkpoint.json

[INPUT]
input_type = directory
input_path = ./data
file_pattern = *.csv

[OUTPUT]
output_dir = OUT_DIR
format = csv

[MEMORY]
max_chunk_mb = 64
flush_interval = 1000

[ANOMALY]
top_n = 25
high_revenue_threshold = 10000.0
"#;

    #[test]
    fn loads_valid_config() {
        let dir = TempDir::new().unwrap();
        let out_dir = dir.path().join("out");
        let body = VALID.replace("OUT_DIR", out_dir.to_str().unwrap());
        let path = write_config(&dir, &body);

        let config = Config::load(&path).unwrap();
        assert_eq!(config.chunk_size, 500);
        assert_eq!(config.max_rows, -1);
        assert!(config.enable_checkpoint);
        assert_eq!(config.input_type, InputType::Directory);
        assert_eq!(config.file_pattern.as_deref(), Some("*.csv"));
        assert_eq!(config.output_format, OutputFormat::Csv);
        assert_eq!(config.anomaly_top_n, 25);
        assert!(out_dir.exists());
    }

    #[test]
    fn rejects_missing_section() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "[PIPELINE]\nchunk_size = 1\n");
        let err = Config::load(&path).unwrap_err();
        assert!(err.message.contains("missing required"));
    }

    #[test]
    fn directory_input_requires_file_pattern() {
        let dir = TempDir::new().unwrap();
        let out_dir = dir.path().join("out");
        let body = VALID
            .replace("OUT_DIR", out_dir.to_str().unwrap())
            .replace("file_pattern = *.csv\n", "");
        let path = write_config(&dir, &body);
        let err = Config::load(&path).unwrap_err();
        assert_eq!(err.key.as_deref(), Some("file_pattern"));
    }

    #[test]
    fn missing_file_is_config_error() {
        let err = Config::load(Path::new("/nonexistent/pipeline.conf")).unwrap_err();
        assert!(err.message.contains("not found"));
    }
}
