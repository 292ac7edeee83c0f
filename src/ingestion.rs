//! File resolution and the two lazy, forward-only chunk sequences:
//! Bronze chunks (resumable from a checkpoint) and Silver files.

use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use crate::config::{Config, InputType};
use crate::domain::{ChunkEnvelope, CleanRecord, RawRecord, SilverFile};
use crate::error::{PipelineError, Result};

/// Resolves the configured input into a sorted, deterministic replay
/// order. `file` mode yields a single-element list; `directory` mode
/// globs `file_pattern` under `input_path`.
pub fn resolve_input_files(config: &Config) -> Result<Vec<String>> {
    let mut files: Vec<String> = match config.input_type {
        InputType::File => {
            if !config.input_path.exists() {
                return Err(PipelineError::Ingestion(format!(
                    "input file not found: {}",
                    config.input_path.display()
                )));
            }
            vec![config.input_path.to_string_lossy().into_owned()]
        }
        InputType::Directory => {
            if !config.input_path.is_dir() {
                return Err(PipelineError::Ingestion(format!(
                    "input path is not a directory: {}",
                    config.input_path.display()
                )));
            }
            let pattern = config
                .input_path
                .join(config.file_pattern.as_deref().unwrap_or("*"));
            let pattern = pattern.to_string_lossy().into_owned();
            let matches: Vec<String> = glob::glob(&pattern)
                .map_err(|e| PipelineError::Ingestion(format!("invalid glob pattern: {e}")))?
                .filter_map(|entry| entry.ok())
                .map(|p| p.to_string_lossy().into_owned())
                .collect();
            if matches.is_empty() {
                return Err(PipelineError::Ingestion(format!(
                    "no files match pattern: {pattern}"
                )));
            }
            matches
        }
    };
    files.sort();
    Ok(files)
}

/// Reads one header-first CSV file into raw records.
fn read_csv_records(path: &str) -> Result<Vec<RawRecord>> {
    let mut reader = csv::Reader::from_reader(BufReader::new(File::open(path)?));
    let headers = reader.headers()?.clone();
    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let mut fields = HashMap::with_capacity(headers.len());
        for (name, value) in headers.iter().zip(record.iter()) {
            fields.insert(name.to_string(), value.to_string());
        }
        rows.push(RawRecord::new(fields));
    }
    Ok(rows)
}

/// Lazy, finite, non-restartable sequence of Bronze chunk envelopes.
/// Honors the Phase-1 checkpoint: files lexicographically before
/// `cp.file` are skipped entirely; within `cp.file`, `cp.chunk_index *
/// chunk_size` rows are skipped before the first yielded chunk.
pub struct BronzeChunks {
    files: std::vec::IntoIter<String>,
    chunk_size: usize,
    checkpoint_file: Option<String>,
    checkpoint_chunk_index: u64,
    current: Option<FileChunker>,
}

struct FileChunker {
    file: String,
    rows: std::vec::IntoIter<RawRecord>,
    next_chunk_index: u64,
}

impl BronzeChunks {
    pub fn new(files: Vec<String>, config: &Config, checkpoint: crate::domain::Checkpoint) -> Self {
        BronzeChunks {
            files: files.into_iter(),
            chunk_size: config.chunk_size,
            checkpoint_file: checkpoint.file,
            checkpoint_chunk_index: checkpoint.chunk_index,
            current: None,
        }
    }

    fn advance_file(&mut self) -> Result<bool> {
        loop {
            let Some(file) = self.files.next() else {
                return Ok(false);
            };
            if let Some(cp_file) = &self.checkpoint_file {
                if &file < cp_file {
                    continue;
                }
            }
            let rows = read_csv_records(&file)?;
            let skip_chunks = if self.checkpoint_file.as_deref() == Some(file.as_str()) {
                self.checkpoint_chunk_index
            } else {
                0
            };
            let skip_rows = (skip_chunks as usize).saturating_mul(self.chunk_size);
            let mut rows = rows.into_iter();
            for _ in 0..skip_rows {
                if rows.next().is_none() {
                    break;
                }
            }
            self.current = Some(FileChunker {
                file,
                rows,
                next_chunk_index: skip_chunks,
            });
            return Ok(true);
        }
    }
}

impl Iterator for BronzeChunks {
    type Item = Result<ChunkEnvelope>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.current.is_none() {
                match self.advance_file() {
                    Ok(true) => {}
                    Ok(false) => return None,
                    Err(e) => return Some(Err(e)),
                }
            }

            let chunker = self.current.as_mut().unwrap();
            let mut rows = Vec::with_capacity(self.chunk_size);
            for _ in 0..self.chunk_size {
                match chunker.rows.next() {
                    Some(row) => rows.push(row),
                    None => break,
                }
            }

            if rows.is_empty() {
                self.current = None;
                continue;
            }

            let envelope = ChunkEnvelope {
                file: chunker.file.clone(),
                chunk_index: chunker.next_chunk_index,
                rows,
            };
            chunker.next_chunk_index += 1;
            return Some(Ok(envelope));
        }
    }
}

/// Enumerates `<output_dir>/silver/*.csv` sorted lexicographically,
/// skipping files at or before the Phase-2 checkpoint (`<=`: completed
/// files are never reprocessed).
pub struct SilverFiles {
    files: std::vec::IntoIter<PathBuf>,
}

impl SilverFiles {
    pub fn new(output_dir: &Path, checkpoint: crate::domain::Checkpoint) -> Result<Self> {
        let silver_dir = output_dir.join("silver");
        let mut files: Vec<PathBuf> = if silver_dir.is_dir() {
            std::fs::read_dir(&silver_dir)?
                .filter_map(|e| e.ok())
                .map(|e| e.path())
                .filter(|p| p.extension().and_then(|e| e.to_str()) == Some("csv"))
                .collect()
        } else {
            Vec::new()
        };
        files.sort();

        if let Some(cp_file) = &checkpoint.file {
            files.retain(|p| p.to_string_lossy().as_ref() > cp_file.as_str());
        }

        Ok(SilverFiles {
            files: files.into_iter(),
        })
    }
}

impl Iterator for SilverFiles {
    type Item = Result<SilverFile>;

    fn next(&mut self) -> Option<Self::Item> {
        let path = self.files.next()?;
        Some(read_silver_file(&path))
    }
}

fn read_silver_file(path: &Path) -> Result<SilverFile> {
    let mut reader = csv::Reader::from_reader(BufReader::new(File::open(path)?));
    let mut rows = Vec::new();
    for record in reader.deserialize() {
        let record: CleanRecord = record?;
        rows.push(record);
    }
    Ok(SilverFile {
        file: path.to_string_lossy().into_owned(),
        rows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn write_csv(path: &Path, header: &str, rows: &[&str]) {
        let mut f = File::create(path).unwrap();
        writeln!(f, "{header}").unwrap();
        for row in rows {
            writeln!(f, "{row}").unwrap();
        }
    }

    fn base_config(dir: &TempDir, input_path: PathBuf, chunk_size: usize) -> Config {
        Config {
            chunk_size,
            max_rows: -1,
            enable_checkpoint: true,
            bronze_checkpoint: dir.path().join("bronze.json"),
            silver_checkpoint: dir.path().join("silver.json"),
            input_type: InputType::File,
            input_path,
            file_pattern: None,
            output_dir: dir.path().join("out"),
            output_format: crate::config::OutputFormat::Csv,
            max_chunk_mb: 64,
            flush_interval: 1000,
            anomaly_top_n: 10,
            high_revenue_threshold: 1000.0,
        }
    }

    // S4
    #[test]
    fn chunk_size_two_over_five_rows_yields_2_2_1() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("a.csv");
        write_csv(
            &input,
            "order_id,quantity,unit_price",
            &["O1,1,1", "O2,1,1", "O3,1,1", "O4,1,1", "O5,1,1"],
        );

        let config = base_config(&dir, input.clone(), 2);
        let files = resolve_input_files(&config).unwrap();
        let chunks: Vec<ChunkEnvelope> = BronzeChunks::new(files, &config, crate::domain::Checkpoint::default())
            .map(|c| c.unwrap())
            .collect();

        let sizes: Vec<usize> = chunks.iter().map(|c| c.rows.len()).collect();
        let indices: Vec<u64> = chunks.iter().map(|c| c.chunk_index).collect();
        assert_eq!(sizes, vec![2, 2, 1]);
        assert_eq!(indices, vec![0, 1, 2]);
    }

    #[test]
    fn resume_skips_rows_before_checkpoint() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("a.csv");
        write_csv(
            &input,
            "order_id,quantity,unit_price",
            &["O1,1,1", "O2,1,1", "O3,1,1", "O4,1,1", "O5,1,1"],
        );

        let config = base_config(&dir, input.clone(), 2);
        let files = resolve_input_files(&config).unwrap();
        let cp = crate::domain::Checkpoint::new(input.to_string_lossy().into_owned(), 1);
        let chunks: Vec<ChunkEnvelope> = BronzeChunks::new(files, &config, cp)
            .map(|c| c.unwrap())
            .collect();

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].chunk_index, 1);
        assert_eq!(chunks[0].rows.len(), 2);
        assert_eq!(chunks[1].chunk_index, 2);
        assert_eq!(chunks[1].rows.len(), 1);
    }

    #[test]
    fn missing_file_input_fails_at_setup() {
        let dir = TempDir::new().unwrap();
        let config = base_config(&dir, dir.path().join("missing.csv"), 10);
        assert!(resolve_input_files(&config).is_err());
    }

    #[test]
    fn empty_directory_glob_fails_at_setup() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("data")).unwrap();
        let mut config = base_config(&dir, dir.path().join("data"), 10);
        config.input_type = InputType::Directory;
        config.file_pattern = Some("*.csv".to_string());
        assert!(resolve_input_files(&config).is_err());
    }
}
