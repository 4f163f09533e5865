//! Runs case scripts in a transient working area.
//!
//! The working area has a fixed name, so only one case may hold it at a time.
//! [`WorkArea`] is the token for that ownership: acquiring it wipes and
//! recreates the directory, and releasing or dropping it removes the
//! directory again. [`Sandbox::run`] takes `&mut self`, which keeps two cases
//! from ever holding the area at once.

use crate::config::HarnessConfig;
use crate::error::HarnessError;
use crate::fixture::Case;
use crate::script::{self, EngineInvocation, SCRIPT_FILE, TEMPLATE_FILE};
use crate::serialize::single_quote;
use std::error::Error as _;
use std::fs;
use std::io::{self, Read};
#[cfg(unix)]
use std::os::unix::process::CommandExt;
use std::path::{Component, Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(10);
/// How long to wait for the output pipe to drain once the script has exited.
/// Background processes the script left behind may keep the pipe open.
const DRAIN_GRACE: Duration = Duration::from_millis(250);

/// What a case script produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Execution {
    /// Combined stdout and stderr.
    pub output: String,
    /// Non-zero exit, timeout, or a failure to run the script at all.
    pub error: Option<String>,
}

/// Runs one case and reports what it produced. Implementations never fail:
/// problems are reported through [`Execution::error`].
pub trait CaseExecutor {
    fn execute(&mut self, case: &Case) -> Execution;
}

/// Exclusive ownership of the working directory.
#[derive(Debug)]
pub struct WorkArea {
    path: PathBuf,
    released: bool,
}

impl WorkArea {
    /// Removes whatever a previous run left behind and creates a fresh area.
    pub fn acquire(path: &Path) -> Result<Self, HarnessError> {
        match fs::remove_dir_all(path) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(source) => {
                return Err(HarnessError::WorkArea {
                    action: "remove stale",
                    path: path.to_path_buf(),
                    source,
                })
            }
        }
        fs::create_dir_all(path).map_err(|source| HarnessError::WorkArea {
            action: "create",
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self {
            path: path.to_path_buf(),
            released: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes `contents` to `name` inside the area. `name` must be a relative
    /// path made of plain components, so nothing lands outside the area.
    pub fn write(&self, name: &str, contents: &str) -> Result<(), HarnessError> {
        let relative = Path::new(name);
        let contained = relative.components().next().is_some()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !contained {
            return Err(HarnessError::WorkArea {
                action: "write into",
                path: self.path.clone(),
                source: io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("`{name}` does not name a file inside the working area"),
                ),
            });
        }
        let target = self.path.join(relative);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|source| HarnessError::WorkArea {
                action: "create",
                path: parent.to_path_buf(),
                source,
            })?;
        }
        fs::write(&target, contents).map_err(|source| HarnessError::WorkArea {
            action: "write into",
            path: target,
            source,
        })
    }

    /// Removes the area, reporting failure instead of only logging it.
    pub fn release(mut self) -> Result<(), HarnessError> {
        self.released = true;
        fs::remove_dir_all(&self.path).map_err(|source| HarnessError::WorkArea {
            action: "remove",
            path: self.path.clone(),
            source,
        })
    }
}

impl Drop for WorkArea {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        if let Err(e) = fs::remove_dir_all(&self.path) {
            tracing::warn!(
                path = %self.path.display(),
                error = %e,
                "failed to remove working area"
            );
        }
    }
}

/// Executes cases against the configured engine.
#[derive(Debug, Clone)]
pub struct Sandbox {
    engine: PathBuf,
    entry: String,
    shell: String,
    work_dir: PathBuf,
    timeout: Duration,
}

impl Sandbox {
    pub fn new(config: &HarnessConfig) -> Self {
        Self {
            engine: absolute(&config.engine),
            entry: config.entry.clone(),
            shell: config.shell.clone(),
            work_dir: config.work_dir.clone(),
            timeout: config.timeout,
        }
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    /// Materializes the case, runs it, and removes the working area again.
    pub fn run(&mut self, case: &Case) -> Result<Execution, HarnessError> {
        let invocation = EngineInvocation {
            engine: &self.engine,
            entry: &self.entry,
        };
        let script = script::build(case, &invocation);

        let area = WorkArea::acquire(&self.work_dir)?;
        area.write(SCRIPT_FILE, &script)?;
        area.write(TEMPLATE_FILE, &case.template)?;
        for (name, text) in &case.partials {
            tracing::debug!(partial = %name, "writing partial");
            area.write(name, text)?;
        }
        let execution = self.execute_script(area.path())?;
        area.release()?;
        Ok(execution)
    }

    fn execute_script(&self, dir: &Path) -> Result<Execution, HarnessError> {
        // The outer shell folds the script's stderr into the captured stdout.
        let command_line = format!("exec {} ./{SCRIPT_FILE} 2>&1", single_quote(&self.shell));
        let mut command = Command::new(&self.shell);
        command
            .arg("-c")
            .arg(&command_line)
            .current_dir(dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null());
        // Everything the script starts shares one process group, so a
        // timeout can take down the whole tree.
        #[cfg(unix)]
        command.process_group(0);
        let mut child = command
            .spawn()
            .map_err(|source| HarnessError::Spawn {
                program: self.shell.clone(),
                source,
            })?;

        let captured = Arc::new(Mutex::new(Vec::new()));
        let reader = child
            .stdout
            .take()
            .map(|stdout| spawn_reader(stdout, Arc::clone(&captured)));

        let (status, timed_out) = wait_with_deadline(&mut child, self.timeout)?;
        if let Some(reader) = reader {
            drain(reader);
        }

        let output = {
            let bytes = captured.lock().unwrap_or_else(PoisonError::into_inner);
            String::from_utf8_lossy(&bytes).into_owned()
        };
        let error = if timed_out {
            Some(format!("script timed out after {} ms", self.timeout.as_millis()))
        } else if !status.success() {
            Some(format!("script failed with {status}"))
        } else {
            None
        };
        Ok(Execution { output, error })
    }
}

impl CaseExecutor for Sandbox {
    fn execute(&mut self, case: &Case) -> Execution {
        tracing::debug!(case = %case.full_name, "running case");
        self.run(case).unwrap_or_else(|err| Execution {
            output: String::new(),
            error: Some(error_chain(&err)),
        })
    }
}

/// The script runs inside the working area, so a relative engine path is
/// anchored at the harness's own working directory.
fn absolute(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    std::env::current_dir()
        .map(|cwd| cwd.join(path))
        .unwrap_or_else(|_| path.to_path_buf())
}

fn spawn_reader<R: Read + Send + 'static>(
    mut source: R,
    sink: Arc<Mutex<Vec<u8>>>,
) -> JoinHandle<()> {
    thread::spawn(move || {
        let mut chunk = [0u8; 8192];
        loop {
            match source.read(&mut chunk) {
                Ok(0) | Err(_) => break,
                Ok(n) => sink
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .extend_from_slice(&chunk[..n]),
            }
        }
    })
}

/// Waits for the child, killing its process group once `timeout` elapses.
fn wait_with_deadline(
    child: &mut Child,
    timeout: Duration,
) -> Result<(ExitStatus, bool), HarnessError> {
    let started_at = Instant::now();
    loop {
        match child.try_wait() {
            Ok(Some(status)) => return Ok((status, false)),
            Ok(None) if started_at.elapsed() >= timeout => {
                kill_tree(child);
                let status = child
                    .wait()
                    .map_err(|source| HarnessError::Wait { source })?;
                return Ok((status, true));
            }
            Ok(None) => thread::sleep(POLL_INTERVAL),
            Err(source) => return Err(HarnessError::Wait { source }),
        }
    }
}

#[cfg(unix)]
fn kill_tree(child: &mut Child) {
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    let group = Pid::from_raw(child.id() as i32);
    if let Err(e) = killpg(group, Signal::SIGKILL) {
        tracing::debug!(error = %e, "process group already gone");
        let _ = child.kill();
    }
}

#[cfg(not(unix))]
fn kill_tree(child: &mut Child) {
    let _ = child.kill();
}

/// Gives the reader a short while to hit end-of-file. A reader still blocked
/// after that is left behind; only bytes captured so far are reported.
fn drain(reader: JoinHandle<()>) {
    let started_at = Instant::now();
    while !reader.is_finished() {
        if started_at.elapsed() >= DRAIN_GRACE {
            return;
        }
        thread::sleep(POLL_INTERVAL);
    }
    let _ = reader.join();
}

/// Renders an error and its sources on one line.
pub fn error_chain(err: &HarnessError) -> String {
    let mut text = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        text.push_str(": ");
        text.push_str(&cause.to_string());
        source = cause.source();
    }
    text
}
