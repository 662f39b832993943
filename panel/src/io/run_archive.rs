//! Archive of finished runs under `.panel/runs/<run_id>/`.

use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::core::stats::DisplayStats;
use crate::io::atomic::{write_atomic, write_json_atomic};

#[derive(Debug, Clone)]
pub struct ArchivePaths {
    pub dir: PathBuf,
    pub output_path: PathBuf,
    pub stats_path: PathBuf,
}

impl ArchivePaths {
    pub fn new(runs_dir: &Path, run_id: &str) -> Self {
        let dir = runs_dir.join(run_id);
        Self {
            output_path: dir.join("output.md"),
            stats_path: dir.join("stats.json"),
            dir,
        }
    }
}

/// Write the markdown artifact verbatim, plus stats when the run produced them.
pub fn write_run_archive(
    runs_dir: &Path,
    run_id: &str,
    output: &str,
    stats: Option<&DisplayStats>,
) -> Result<ArchivePaths> {
    let paths = ArchivePaths::new(runs_dir, run_id);
    write_atomic(&paths.output_path, output)?;
    if let Some(stats) = stats {
        write_json_atomic(&paths.stats_path, stats)?;
    }
    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn archive_paths_are_stable() {
        let paths = ArchivePaths::new(Path::new("/tmp/runs"), "run-7");
        assert!(paths.dir.ends_with("runs/run-7"));
        assert!(paths.output_path.ends_with("output.md"));
        assert!(paths.stats_path.ends_with("stats.json"));
    }

    #[test]
    fn writes_output_and_stats() {
        let temp = tempfile::tempdir().expect("tempdir");
        let stats = DisplayStats {
            duration: 3.5,
            total_token_count: 1200,
            total_cost: 0.25,
        };
        let paths = write_run_archive(temp.path(), "run-1", "# Issue 1\n", Some(&stats))
            .expect("archive");
        assert_eq!(
            fs::read_to_string(&paths.output_path).expect("read output"),
            "# Issue 1\n"
        );
        let stats_json = fs::read_to_string(&paths.stats_path).expect("read stats");
        assert!(stats_json.contains("\"totalTokenCount\": 1200"));
    }

    #[test]
    fn stats_file_is_skipped_without_stats() {
        let temp = tempfile::tempdir().expect("tempdir");
        let paths = write_run_archive(temp.path(), "run-2", "", None).expect("archive");
        assert!(paths.output_path.is_file());
        assert!(!paths.stats_path.exists());
    }
}
