use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use baindex::{
    BamIndex, Config,
    config::Command,
    ranges::{byte_ranges, header_range, merge_ranges},
    source::BamRecordSource,
    storage::{IndexStore, LocalStorage},
    types::{ChunkEntry, IndexStats, QueryResponse, ReferenceStats, Region},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| config.log_level.clone().into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let storage: Arc<dyn IndexStore> = Arc::new(LocalStorage::new(config.data_dir.clone()));
    tracing::debug!("Data directory: {:?}", config.data_dir);

    match &config.command {
        Command::Index { id, output } => index(storage, id, output.clone()).await,
        Command::Query { id, records, .. } => {
            let region = config
                .command
                .region()
                .context("query command without a region")?;
            query(storage, id, region, *records).await
        }
        Command::Stats { id } => stats(storage, id).await,
    }
}

async fn open_source(storage: &dyn IndexStore, id: &str) -> anyhow::Result<BamRecordSource> {
    let path = storage.bam_path(id);
    let source = tokio::task::spawn_blocking(move || BamRecordSource::open(path)).await??;
    Ok(source)
}

async fn index(storage: Arc<dyn IndexStore>, id: &str, output: Option<PathBuf>) -> anyhow::Result<()> {
    if !storage.exists(id).await? {
        anyhow::bail!("alignment file not found: {}", storage.bam_path(id).display());
    }

    let source = open_source(storage.as_ref(), id).await?;
    let index = tokio::task::spawn_blocking(move || BamIndex::from_source(source))
        .await?
        .with_context(|| format!("failed to index {}", id))?;

    let path = match output {
        Some(path) => {
            let data = index.serialize();
            tokio::fs::write(&path, &data).await?;
            path
        }
        None => storage.save_index(id, &index).await?,
    };

    tracing::info!(id, path = %path.display(), "index written");
    println!("{}", path.display());
    Ok(())
}

async fn query(
    storage: Arc<dyn IndexStore>,
    id: &str,
    region: Region,
    count_records: bool,
) -> anyhow::Result<()> {
    let index = storage.load_index(id).await?;
    let mut source = open_source(storage.as_ref(), id).await?;

    let reference_id = source.reference_id(&region.reference_name)?;
    let (start, end) = region.interval();
    let chunks = index.query(reference_id, start, end)?;

    let mut ranges = vec![header_range(source.header_end())];
    ranges.extend(byte_ranges(&chunks));
    let file_size = storage.file_info(id).await?.size;
    let ranges = merge_ranges(ranges)
        .into_iter()
        .map(|range| range.clamp_to(file_size))
        .collect();

    let records = if count_records {
        let fetch_chunks = chunks.clone();
        let hits = tokio::task::spawn_blocking(move || {
            source.fetch(&fetch_chunks, reference_id, start, end)
        })
        .await??;
        Some(hits.len())
    } else {
        None
    };

    let response = QueryResponse {
        reference_name: region.reference_name,
        reference_id,
        start,
        end,
        chunks: chunks.iter().map(ChunkEntry::from).collect(),
        byte_ranges: ranges,
        records,
    };
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}

async fn stats(storage: Arc<dyn IndexStore>, id: &str) -> anyhow::Result<()> {
    let index = storage.load_index(id).await?;
    let source = open_source(storage.as_ref(), id).await?;
    let names = source.reference_names();

    if names.len() != index.reference_count() {
        tracing::warn!(
            header = names.len(),
            index = index.reference_count(),
            "reference count differs between header and index"
        );
    }

    let references = index
        .references()
        .iter()
        .enumerate()
        .map(|(i, reference)| {
            let name = names.get(i).cloned().unwrap_or_else(|| i.to_string());
            ReferenceStats::new(name, reference)
        })
        .collect();

    let stats = IndexStats {
        references,
        unplaced_unmapped: index.unplaced_unmapped_record_count(),
    };
    println!("{}", serde_json::to_string_pretty(&stats)?);
    Ok(())
}
