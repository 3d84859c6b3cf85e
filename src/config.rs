use crate::types::Region;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "baindex")]
#[command(about = "Build, inspect and query BAM indexes")]
pub struct Config {
    /// Directory containing data files
    #[arg(long, global = true, env = "BAINDEX_DATA_DIR", default_value = "./data")]
    pub data_dir: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "RUST_LOG", default_value = "info")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Index `<data-dir>/<id>.bam`
    Index {
        id: String,

        /// Write the index here instead of next to the BAM file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print the chunks and byte ranges covering a region
    Query {
        id: String,

        /// Reference sequence name
        #[arg(short, long)]
        reference: String,

        /// 0-based start, inclusive
        #[arg(long)]
        start: Option<u64>,

        /// 0-based end, exclusive
        #[arg(long)]
        end: Option<u64>,

        /// Also decode the chunks and count overlapping records
        #[arg(long)]
        records: bool,
    },

    /// Print per-reference index statistics
    Stats { id: String },
}

impl Command {
    pub fn id(&self) -> &str {
        match self {
            Command::Index { id, .. } | Command::Query { id, .. } | Command::Stats { id } => id,
        }
    }

    /// Region of a `query` command.
    pub fn region(&self) -> Option<Region> {
        match self {
            Command::Query {
                reference,
                start,
                end,
                ..
            } => Some(Region {
                reference_name: reference.clone(),
                start: *start,
                end: *end,
            }),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_defaults() {
        let config =
            Config::try_parse_from(["baindex", "query", "sample", "--reference", "chr1"]).unwrap();
        assert_eq!(config.command.id(), "sample");
        assert_eq!(config.data_dir, PathBuf::from("./data"));

        let region = config.command.region().unwrap();
        assert_eq!(region.reference_name, "chr1");
        assert_eq!(region.interval(), (0, i64::MAX));
    }

    #[test]
    fn test_query_interval() {
        let config = Config::try_parse_from([
            "baindex",
            "--data-dir",
            "/tmp/bams",
            "query",
            "sample",
            "-r",
            "chr2",
            "--start",
            "1000",
            "--end",
            "2000",
            "--records",
        ])
        .unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/tmp/bams"));
        assert!(matches!(config.command, Command::Query { records: true, .. }));
        assert_eq!(config.command.region().unwrap().interval(), (1000, 2000));
    }

    #[test]
    fn test_index_output() {
        let config =
            Config::try_parse_from(["baindex", "index", "sample", "-o", "out.bai"]).unwrap();
        match config.command {
            Command::Index { id, output } => {
                assert_eq!(id, "sample");
                assert_eq!(output, Some(PathBuf::from("out.bai")));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_stats_has_no_region() {
        let config = Config::try_parse_from(["baindex", "stats", "sample"]).unwrap();
        assert!(config.command.region().is_none());
    }

    #[test]
    fn test_query_requires_reference() {
        assert!(Config::try_parse_from(["baindex", "query", "sample"]).is_err());
    }
}
