//! Integration tests for sitefleet
//!
//! These drive the real binary against throwaway work directories with small
//! `sh` workers standing in for the crawler.

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const DATE: &str = "2026-01-31";

/// Helper to create a sitefleet Command
fn sitefleet() -> Command {
    let mut cmd = cargo_bin_cmd!("sitefleet");
    cmd.env_remove("SITEFLEET_WORKER_CMD")
        .env_remove("SITEFLEET_TOTAL_WORKERS")
        .env_remove("SITEFLEET_WORK_DIR");
    cmd
}

/// Helper to create a temporary work directory
fn create_work_dir() -> TempDir {
    TempDir::new().unwrap()
}

fn write_list(dir: &Path, name: &str, count: usize) {
    let sites: Vec<String> = (0..count).map(|i| format!("site{}.example", i)).collect();
    fs::write(dir.join(name), sites.join(",")).unwrap();
}

/// Write a worker script and a fleet.toml that runs it with no stagger.
fn setup_worker(dir: &Path, script: &str) {
    fs::write(dir.join("worker.sh"), script).unwrap();
    fs::write(
        dir.join("fleet.toml"),
        r#"
[run]
stagger_secs = 0
poll_interval_secs = 1

[worker]
command = "sh"
args = ["worker.sh"]
"#,
    )
    .unwrap();
}

// =============================================================================
// Basic CLI Tests
// =============================================================================

mod cli_basics {
    use super::*;

    #[test]
    fn test_sitefleet_help() {
        sitefleet()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("run"))
            .stdout(predicate::str::contains("plan"));
    }

    #[test]
    fn test_sitefleet_version() {
        sitefleet().arg("--version").assert().success();
    }

    #[test]
    fn test_run_requires_lists() {
        sitefleet().arg("run").assert().failure();
    }

    #[test]
    fn test_status_without_runs() {
        let dir = create_work_dir();
        sitefleet()
            .current_dir(dir.path())
            .arg("status")
            .assert()
            .success()
            .stdout(predicate::str::contains("No runs recorded"));
    }
}

// =============================================================================
// Config Tests
// =============================================================================

mod config_tests {
    use super::*;

    #[test]
    fn test_config_show_defaults() {
        let dir = create_work_dir();
        sitefleet()
            .current_dir(dir.path())
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("total_workers = 84"))
            .stdout(predicate::str::contains("sitefleet config init"));
    }

    #[test]
    fn test_config_init_creates_toml() {
        let dir = create_work_dir();
        sitefleet()
            .current_dir(dir.path())
            .args(["config", "init"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Created fleet.toml"));

        let content = fs::read_to_string(dir.path().join("fleet.toml")).unwrap();
        assert!(content.contains("[run]"));
        assert!(content.contains("total_workers = 84"));

        // A second init leaves the file alone
        sitefleet()
            .current_dir(dir.path())
            .args(["config", "init"])
            .assert()
            .success()
            .stdout(predicate::str::contains("already exists"));
    }

    #[test]
    fn test_config_validate_reports_warnings() {
        let dir = create_work_dir();
        fs::write(
            dir.path().join("fleet.toml"),
            "[run]\ntotal_workers = 0\n\n[paths]\nchunks_dir = \"out\"\ndata_dir = \"out\"\n",
        )
        .unwrap();

        sitefleet()
            .current_dir(dir.path())
            .args(["config", "validate"])
            .assert()
            .success()
            .stdout(predicate::str::contains("total_workers is 0"))
            .stdout(predicate::str::contains("overlap"));
    }

    #[test]
    fn test_env_override_for_total_workers() {
        let dir = create_work_dir();
        sitefleet()
            .current_dir(dir.path())
            .env("SITEFLEET_TOTAL_WORKERS", "12")
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("total_workers = 12"));
    }
}

// =============================================================================
// Planning Tests
// =============================================================================

mod plan_tests {
    use super::*;

    #[test]
    fn test_plan_writes_shard_files() {
        let dir = create_work_dir();
        write_list(dir.path(), "big.txt", 9);
        write_list(dir.path(), "small.txt", 3);

        sitefleet()
            .current_dir(dir.path())
            .args([
                "plan", "big.txt", "small.txt", "--workers", "4", "--seed", "7", "--date", DATE,
            ])
            .assert()
            .success()
            .stdout(predicate::str::contains("4 shards"));

        let chunks = dir.path().join("chunks");
        for i in 0..3 {
            let shard = chunks.join(format!("{}_big_shard{}.txt", DATE, i));
            let content = fs::read_to_string(&shard).unwrap();
            assert_eq!(content.split(',').count(), 3);
        }
        assert!(chunks.join(format!("{}_small_shard0.txt", DATE)).exists());
        assert!(!chunks.join(format!("{}_small_shard1.txt", DATE)).exists());
    }

    #[test]
    fn test_plan_with_glob_pattern() {
        let dir = create_work_dir();
        fs::create_dir_all(dir.path().join("lists")).unwrap();
        write_list(&dir.path().join("lists"), "a.txt", 4);
        write_list(&dir.path().join("lists"), "b.txt", 4);

        sitefleet()
            .current_dir(dir.path())
            .args(["plan", "lists/*.txt", "--workers", "2", "--date", DATE])
            .assert()
            .success();

        assert!(dir.path().join(format!("chunks/{}_a_shard0.txt", DATE)).exists());
        assert!(dir.path().join(format!("chunks/{}_b_shard0.txt", DATE)).exists());
    }

    #[test]
    fn test_empty_lists_fail_before_anything_is_written() {
        let dir = create_work_dir();
        fs::write(dir.path().join("empty.txt"), " , ,").unwrap();

        sitefleet()
            .current_dir(dir.path())
            .args(["run", "empty.txt", "--workers", "2"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("contain no sites"));

        assert!(!dir.path().join("chunks").exists());
        assert!(!dir.path().join("datadir").exists());
    }

    #[test]
    fn test_duplicate_list_names_rejected() {
        let dir = create_work_dir();
        for sub in ["x", "y"] {
            fs::create_dir_all(dir.path().join(sub)).unwrap();
            write_list(&dir.path().join(sub), "sites.txt", 2);
        }

        sitefleet()
            .current_dir(dir.path())
            .args(["plan", "x/sites.txt", "y/sites.txt", "--workers", "2"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("more than one input"));
    }

    #[test]
    fn test_plan_refuses_while_a_run_holds_the_lock() {
        let dir = create_work_dir();
        write_list(dir.path(), "sites.txt", 4);
        let _held = ::sitefleet::lock::RunLock::acquire(&dir.path().join(".sitefleet")).unwrap();

        sitefleet()
            .current_dir(dir.path())
            .args(["plan", "sites.txt", "--workers", "2", "--date", DATE])
            .assert()
            .failure()
            .stderr(predicate::str::contains("already in progress"));

        assert!(!dir.path().join("chunks").exists());
    }

    #[test]
    fn test_missing_list_file_fails() {
        let dir = create_work_dir();
        sitefleet()
            .current_dir(dir.path())
            .args(["plan", "nope.txt"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Failed to read site list"));
    }
}

// =============================================================================
// Full Run Tests
// =============================================================================

mod run_tests {
    use super::*;

    const RECORDING_WORKER: &str = r#"#!/bin/sh
mkdir -p "$SITEFLEET_SHARD_DATA_DIR"
cp "$1" "$SITEFLEET_SHARD_DATA_DIR/done.txt"
echo "worker $4 finished $2 shard $3"
"#;

    #[test]
    fn test_run_archives_and_removes_working_dirs() {
        let dir = create_work_dir();
        setup_worker(dir.path(), RECORDING_WORKER);
        write_list(dir.path(), "sites.txt", 6);

        sitefleet()
            .current_dir(dir.path())
            .args([
                "run", "sites.txt", "--workers", "2", "--date", DATE, "--ui", "minimal",
            ])
            .assert()
            .success()
            .stdout(predicate::str::contains("All workers finished"));

        assert!(!dir.path().join("chunks").exists());
        assert!(!dir.path().join("datadir").exists());

        let data_zip = dir.path().join(format!("{}_crawl_datadir.zip", DATE));
        let chunks_zip = dir.path().join(format!("{}_crawl_chunks.zip", DATE));
        assert!(fs::metadata(&data_zip).unwrap().len() > 0);
        assert!(fs::metadata(&chunks_zip).unwrap().len() > 0);

        let archive = zip::ZipArchive::new(fs::File::open(&data_zip).unwrap()).unwrap();
        let names: Vec<&str> = archive.file_names().collect();
        assert!(names.contains(&format!("datadir/{}_sites_shard0/done.txt", DATE).as_str()));
        assert!(names.contains(&format!("datadir/{}_sites_shard1/done.txt", DATE).as_str()));

        let archive = zip::ZipArchive::new(fs::File::open(&chunks_zip).unwrap()).unwrap();
        let names: Vec<&str> = archive.file_names().collect();
        assert!(names.contains(&format!("chunks/{}_sites_shard0_worker0.log", DATE).as_str()));

        let runs: Vec<_> = fs::read_dir(dir.path().join(".sitefleet/runs"))
            .unwrap()
            .collect();
        assert_eq!(runs.len(), 1);

        sitefleet()
            .current_dir(dir.path())
            .arg("status")
            .assert()
            .success()
            .stdout(predicate::str::contains("2 exited, 0 terminated, 0 never started"));
    }

    #[test]
    fn test_deadline_terminates_slow_worker() {
        let dir = create_work_dir();
        setup_worker(dir.path(), "exec sleep 30\n");
        write_list(dir.path(), "slow.txt", 2);

        sitefleet()
            .current_dir(dir.path())
            .args([
                "run", "slow.txt", "--workers", "1", "--timeout", "1", "--date", DATE,
                "--no-archive", "--ui", "minimal",
            ])
            .assert()
            .success()
            .stdout(predicate::str::contains("deadline reached"));

        // Archiving was skipped
        assert!(dir.path().join("chunks").exists());

        sitefleet()
            .current_dir(dir.path())
            .arg("status")
            .assert()
            .success()
            .stdout(predicate::str::contains("0 exited, 1 terminated"))
            .stdout(predicate::str::contains("terminated at deadline"));
    }

    #[test]
    fn test_worker_spawn_failure_is_isolated() {
        let dir = create_work_dir();
        fs::write(
            dir.path().join("fleet.toml"),
            "[run]\nstagger_secs = 0\npoll_interval_secs = 1\n\n[worker]\ncommand = \"/no/such/crawler\"\nargs = []\n",
        )
        .unwrap();
        write_list(dir.path(), "sites.txt", 2);

        sitefleet()
            .current_dir(dir.path())
            .args([
                "run", "sites.txt", "--workers", "2", "--date", DATE, "--no-archive", "--ui",
                "minimal",
            ])
            .assert()
            .success()
            .stdout(predicate::str::contains("failed to start"));

        sitefleet()
            .current_dir(dir.path())
            .args(["status", "--all"])
            .assert()
            .success()
            .stdout(predicate::str::contains(DATE));
    }
}
