use crate::errors::LaunchError;
use crate::plan::Shard;

/// How to invoke the crawl-execution worker for a shard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerCommand {
    pub program: String,
    /// Arguments placed before the shard arguments (e.g. the worker script)
    pub args: Vec<String>,
    /// Wrap the invocation in `display_wrapper`
    pub headless: bool,
    pub display_wrapper: Vec<String>,
}

impl WorkerCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            headless: false,
            display_wrapper: Vec::new(),
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_headless(mut self, wrapper: Vec<String>) -> Self {
        self.headless = true;
        self.display_wrapper = wrapper;
        self
    }

    /// Full argv for a shard: `[wrapper...] program args... chunk list index worker_id`.
    pub fn argv(&self, shard: &Shard) -> Result<Vec<String>, LaunchError> {
        if self.program.trim().is_empty() {
            return Err(LaunchError::EmptyCommand);
        }

        let mut argv = Vec::new();
        if self.headless {
            argv.extend(self.display_wrapper.iter().cloned());
        }
        argv.push(self.program.clone());
        argv.extend(self.args.iter().cloned());
        argv.push(shard.chunk_file.to_string_lossy().into_owned());
        argv.push(shard.list_name.clone());
        argv.push(shard.index.to_string());
        argv.push(shard.worker_id.to_string());
        Ok(argv)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn shard() -> Shard {
        Shard {
            worker_id: 5,
            list_name: "iffy".to_string(),
            index: 2,
            sites: vec!["a.com".to_string()],
            chunk_file: PathBuf::from("chunks/2026-01-31_iffy_shard2.txt"),
        }
    }

    #[test]
    fn test_argv_appends_shard_arguments() {
        let cmd = WorkerCommand::new("python3").with_args(["run_worker.py"]);
        assert_eq!(
            cmd.argv(&shard()).unwrap(),
            vec![
                "python3",
                "run_worker.py",
                "chunks/2026-01-31_iffy_shard2.txt",
                "iffy",
                "2",
                "5"
            ]
        );
    }

    #[test]
    fn test_headless_wraps_invocation() {
        let cmd = WorkerCommand::new("python3")
            .with_args(["run_worker.py"])
            .with_headless(vec!["xvfb-run".to_string(), "-a".to_string()]);
        let argv = cmd.argv(&shard()).unwrap();
        assert_eq!(&argv[..3], &["xvfb-run", "-a", "python3"]);
        assert_eq!(argv.last().unwrap(), "5");
    }

    #[test]
    fn test_headless_with_empty_wrapper_runs_bare() {
        let cmd = WorkerCommand::new("crawl").with_headless(Vec::new());
        assert_eq!(cmd.argv(&shard()).unwrap()[0], "crawl");
    }

    #[test]
    fn test_empty_program_is_error() {
        let cmd = WorkerCommand::new("  ");
        assert!(matches!(cmd.argv(&shard()), Err(LaunchError::EmptyCommand)));
    }
}
