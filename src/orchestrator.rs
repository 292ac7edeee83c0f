//! Drives the two independently-checkpointed phases: Bronze -> Silver
//! (clean and chunk), then Silver -> Gold (dedup, aggregate, finalize).
//! A crash between phases, or mid-phase, loses nothing already
//! committed: each phase resumes from its own last saved checkpoint.

use tracing::info;

use crate::aggregation::AggregationEngine;
use crate::checkpoint::CheckpointStore;
use crate::clean_transform::clean_row;
use crate::config::Config;
use crate::dedup::DedupIndex;
use crate::domain::{CleanRecord, Checkpoint};
use crate::error::Result;
use crate::ingestion::{resolve_input_files, BronzeChunks, SilverFiles};
use crate::metrics::Metrics;
use crate::writer::{write_gold_tables, write_silver_chunk};

pub fn run_pipeline(config: &Config) -> Result<()> {
    let mut metrics = Metrics::new();

    run_bronze_to_silver(config, &mut metrics)?;
    run_silver_to_gold(config, &mut metrics)?;

    info!(summary = %metrics.summary_line(), "pipeline run complete");
    Ok(())
}

fn run_bronze_to_silver(config: &Config, metrics: &mut Metrics) -> Result<()> {
    let mut checkpoint_store = CheckpointStore::new(&config.bronze_checkpoint, config.enable_checkpoint)?;
    let resume_from = checkpoint_store.get();

    let files = resolve_input_files(config)?;
    info!(file_count = files.len(), "phase 1: bronze ingestion starting");

    for envelope in BronzeChunks::new(files, config, resume_from) {
        let envelope = envelope?;
        metrics.record_read(envelope.rows.len() as u64);

        let mut clean_rows = Vec::with_capacity(envelope.rows.len());
        for raw in &envelope.rows {
            let result = clean_row(raw);
            metrics.record_clean_result(result.is_valid, &result.errors);
            if let Some(clean) = result.clean_row {
                clean_rows.push(clean);
            }
        }

        write_silver_chunk(&config.output_dir, &envelope.file, envelope.chunk_index, &clean_rows)?;

        checkpoint_store.save(Checkpoint {
            file: Some(envelope.file.clone()),
            chunk_index: envelope.chunk_index + 1,
            rows_processed: metrics.rows_read,
        })?;

        info!(
            file = %envelope.file,
            chunk_index = envelope.chunk_index,
            rows = clean_rows.len(),
            "bronze chunk committed to silver"
        );
    }

    info!("phase 1: bronze ingestion complete");
    Ok(())
}

fn run_silver_to_gold(config: &Config, metrics: &mut Metrics) -> Result<()> {
    let mut checkpoint_store = CheckpointStore::new(&config.silver_checkpoint, config.enable_checkpoint)?;
    let resume_from = checkpoint_store.get();

    let dedup_index = DedupIndex::open(config.output_dir.join("dedup/order_id.db"))?;
    let mut engine = AggregationEngine::new(config.anomaly_top_n);

    info!("phase 2: silver aggregation starting");

    for silver_file in SilverFiles::new(&config.output_dir, resume_from)? {
        let silver_file = silver_file?;
        let mut accepted = 0u64;

        for row in &silver_file.rows {
            if dedup_index.admit(&row.order_id)? {
                engine.process(row);
                accepted += 1;
            } else {
                metrics.record_duplicate();
            }
        }

        checkpoint_store.save(Checkpoint {
            file: Some(silver_file.file.clone()),
            chunk_index: 0,
            rows_processed: accepted,
        })?;

        info!(
            file = %silver_file.file,
            rows = silver_file.rows.len(),
            accepted,
            "silver file folded into gold aggregates"
        );
    }

    let tables = engine.finalize();
    write_gold_tables(&config.output_dir, tables)?;
    dedup_index.close()?;

    info!("phase 2: silver aggregation complete");
    Ok(())
}
