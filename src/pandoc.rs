//! Pandoc as the HTML to Markdown converter.
//!
//! The rewrite pipelines treat conversion as an opaque [`HtmlConverter`].
//! [`Pandoc`] is the production implementation: it locates a pandoc
//! executable once per [`PandocLocator`], feeds the document on stdin and
//! enforces a deadline on every run.
//!
//! This is the only module that logs. Events go through `tracing`; installing
//! a subscriber is left to the application.

use std::{
    fmt,
    io::{self, Read, Write},
    path::{Path, PathBuf},
    process::{Child, ChildStderr, ChildStdout, Command, ExitStatus, Stdio},
    sync::{Mutex, PoisonError},
    thread,
    time::{Duration, Instant},
};

use crate::error::{ConversionError, LocateError};

/// Default deadline for a single conversion.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Default deadline for probing an executable with `--version`.
pub const DEFAULT_VERIFY_TIMEOUT: Duration = Duration::from_secs(10);

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Turns HTML into Markdown.
///
/// Closures with the right signature implement this trait, which is handy for
/// tests and for callers that bring their own converter.
///
/// ```
/// use confluence2md::{ConversionError, HtmlConverter};
///
/// let upper = |html: &str| -> Result<String, ConversionError> { Ok(html.to_uppercase()) };
/// assert_eq!(upper.convert("<p>x</p>").unwrap(), "<P>X</P>");
/// ```
pub trait HtmlConverter {
    /// Convert `html` to Markdown.
    ///
    /// # Errors
    /// Returns a [`ConversionError`] when the conversion cannot be completed.
    fn convert(&self, html: &str) -> Result<String, ConversionError>;
}

impl<F> HtmlConverter for F
where
    F: Fn(&str) -> Result<String, ConversionError>,
{
    fn convert(&self, html: &str) -> Result<String, ConversionError> {
        self(html)
    }
}

/// How pandoc is found and invoked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PandocOptions {
    /// Explicit executable; `None` searches `PATH` for `pandoc`.
    pub executable: Option<PathBuf>,
    /// Deadline for a conversion run.
    pub timeout: Duration,
    /// Deadline for `--version` probes.
    pub verify_timeout: Duration,
    /// Input format passed with `-f`.
    pub from: String,
    /// Output format passed with `-t`.
    pub to: String,
    /// Arguments appended after the formats.
    pub extra_args: Vec<String>,
}

impl Default for PandocOptions {
    fn default() -> Self {
        Self {
            executable: None,
            timeout: DEFAULT_TIMEOUT,
            verify_timeout: DEFAULT_VERIFY_TIMEOUT,
            from: "html".to_string(),
            to: "gfm".to_string(),
            extra_args: vec!["--wrap=none".to_string()],
        }
    }
}

impl PandocOptions {
    /// Use the executable at `path` instead of searching `PATH`.
    #[must_use]
    pub fn with_executable(mut self, path: impl Into<PathBuf>) -> Self {
        self.executable = Some(path.into());
        self
    }

    /// Set the conversion deadline.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the `--version` probe deadline.
    #[must_use]
    pub fn with_verify_timeout(mut self, timeout: Duration) -> Self {
        self.verify_timeout = timeout;
        self
    }

    /// Set the input and output formats.
    #[must_use]
    pub fn with_formats(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.from = from.into();
        self.to = to.into();
        self
    }

    /// Replace the trailing arguments.
    #[must_use]
    pub fn with_extra_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extra_args = args.into_iter().map(Into::into).collect();
        self
    }
}

type Resolver = Box<dyn Fn() -> Result<PathBuf, LocateError> + Send + Sync>;

/// Finds the pandoc executable at most once and remembers the outcome.
///
/// The first [`get`](Self::get) runs the resolver while holding a lock, so
/// concurrent callers wait for that one resolution instead of starting their
/// own. Failures are cached as well as successes; [`invalidate`](Self::invalidate)
/// forgets the outcome so the next call resolves again.
pub struct PandocLocator {
    resolver: Resolver,
    cached: Mutex<Option<Result<PathBuf, LocateError>>>,
}

impl PandocLocator {
    /// Locate `executable`, or `pandoc` on `PATH`, verifying the candidate with
    /// `--version`.
    #[must_use]
    pub fn new(executable: Option<PathBuf>, verify_timeout: Duration) -> Self {
        Self::with_resolver(move || resolve(executable.as_deref(), verify_timeout))
    }

    /// Use a custom resolution strategy.
    #[must_use]
    pub fn with_resolver<F>(resolver: F) -> Self
    where
        F: Fn() -> Result<PathBuf, LocateError> + Send + Sync + 'static,
    {
        Self {
            resolver: Box::new(resolver),
            cached: Mutex::new(None),
        }
    }

    /// Return the cached outcome, resolving first if nothing is cached.
    ///
    /// # Errors
    /// Returns the cached [`LocateError`] when resolution failed.
    pub fn get(&self) -> Result<PathBuf, LocateError> {
        let mut slot = self.cached.lock().unwrap_or_else(PoisonError::into_inner);
        slot.get_or_insert_with(|| (self.resolver)()).clone()
    }

    /// The cached outcome, without resolving.
    #[must_use]
    pub fn cached(&self) -> Option<Result<PathBuf, LocateError>> {
        self.cached
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Forget the cached outcome.
    pub fn invalidate(&self) {
        *self.cached.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

impl fmt::Debug for PandocLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PandocLocator")
            .field("cached", &self.cached())
            .finish_non_exhaustive()
    }
}

fn resolve(explicit: Option<&Path>, verify_timeout: Duration) -> Result<PathBuf, LocateError> {
    let candidate = match explicit {
        Some(path) => path.to_path_buf(),
        None => which::which("pandoc").map_err(|_| LocateError::NotFound)?,
    };
    tracing::debug!(path = %candidate.display(), "Verifying pandoc executable");
    verify(&candidate, verify_timeout)?;
    Ok(candidate)
}

fn verify(path: &Path, timeout: Duration) -> Result<(), LocateError> {
    let unusable = |reason: String| LocateError::Unusable {
        path: path.to_path_buf(),
        reason,
    };
    let finished = run(Command::new(path).arg("--version"), None, timeout)
        .map_err(|e| unusable(error_chain(&e)))?;
    if !finished.status.success() {
        return Err(unusable(format!("--version exited with {}", finished.status)));
    }
    let banner = String::from_utf8_lossy(&finished.stdout);
    if !banner.contains("pandoc") {
        return Err(unusable("unexpected output from --version".to_string()));
    }
    Ok(())
}

fn error_chain(err: &ConversionError) -> String {
    match std::error::Error::source(err) {
        Some(source) => format!("{err}: {source}"),
        None => err.to_string(),
    }
}

/// Output of a process that exited before its deadline.
struct Finished {
    status: ExitStatus,
    stdout: Vec<u8>,
    stderr: Vec<u8>,
}

fn drain<R: Read>(pipe: Option<R>) -> io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    if let Some(mut pipe) = pipe {
        pipe.read_to_end(&mut buf)?;
    }
    Ok(buf)
}

fn join<T>(handle: thread::ScopedJoinHandle<'_, io::Result<T>>) -> io::Result<T> {
    handle
        .join()
        .unwrap_or_else(|_| Err(io::Error::other("pipe thread panicked")))
}

/// Wait for `child`, killing it once `timeout` has elapsed.
///
/// Returns `None` when the child was killed.
fn wait_with_deadline(child: &mut Child, timeout: Duration) -> io::Result<Option<ExitStatus>> {
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        if Instant::now() >= deadline {
            child.kill()?;
            child.wait()?;
            return Ok(None);
        }
        thread::sleep(POLL_INTERVAL);
    }
}

/// Run `command` with `input` on stdin, collecting its output.
///
/// Stdin is written and both output pipes are drained on their own threads so
/// a child that fills one pipe while waiting on another cannot stall.
fn run(
    command: &mut Command,
    input: Option<&[u8]>,
    timeout: Duration,
) -> Result<Finished, ConversionError> {
    let mut child = command
        .stdin(if input.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(ConversionError::Spawn)?;
    let stdin = child.stdin.take();
    let stdout: Option<ChildStdout> = child.stdout.take();
    let stderr: Option<ChildStderr> = child.stderr.take();

    thread::scope(|scope| {
        let writer = scope.spawn(move || -> io::Result<()> {
            if let (Some(mut pipe), Some(bytes)) = (stdin, input) {
                pipe.write_all(bytes)?;
            }
            Ok(())
        });
        let out = scope.spawn(move || drain(stdout));
        let err = scope.spawn(move || drain(stderr));

        let waited = wait_with_deadline(&mut child, timeout);
        let written = join(writer);
        let stdout = join(out);
        let stderr = join(err);

        let Some(status) = waited.map_err(ConversionError::Io)? else {
            tracing::warn!(timeout_ms = timeout.as_millis(), "Killed pandoc after deadline");
            return Err(ConversionError::Timeout(timeout));
        };
        let stdout = stdout.map_err(ConversionError::Io)?;
        let stderr = stderr.map_err(ConversionError::Io)?;
        // A child that exits early closes stdin under the writer; its status
        // explains more than the broken pipe does.
        if status.success() {
            written.map_err(ConversionError::Io)?;
        }
        Ok(Finished {
            status,
            stdout,
            stderr,
        })
    })
}

/// Converts HTML to Markdown by running pandoc.
#[derive(Debug)]
pub struct Pandoc {
    locator: PandocLocator,
    options: PandocOptions,
}

impl Default for Pandoc {
    fn default() -> Self {
        Self::new(PandocOptions::default())
    }
}

impl Pandoc {
    /// Create a converter whose locator follows `options`.
    #[must_use]
    pub fn new(options: PandocOptions) -> Self {
        let locator = PandocLocator::new(options.executable.clone(), options.verify_timeout);
        Self { locator, options }
    }

    /// Create a converter that resolves through `locator`, ignoring
    /// `options.executable`.
    #[must_use]
    pub fn with_locator(locator: PandocLocator, options: PandocOptions) -> Self {
        Self { locator, options }
    }

    /// The locator this converter resolves the executable through.
    #[must_use]
    pub fn locator(&self) -> &PandocLocator {
        &self.locator
    }

    /// Invocation options.
    #[must_use]
    pub fn options(&self) -> &PandocOptions {
        &self.options
    }

    /// Confirm pandoc is available, returning its path.
    ///
    /// # Errors
    /// Returns [`ConversionError::Locate`] when no usable executable exists.
    pub fn check(&self) -> Result<PathBuf, ConversionError> {
        Ok(self.locator.get()?)
    }

    /// First line of `pandoc --version`, e.g. `pandoc 3.6.4`.
    ///
    /// # Errors
    /// Fails when pandoc cannot be located or run.
    pub fn version(&self) -> Result<String, ConversionError> {
        let path = self.locator.get()?;
        let finished = run(
            Command::new(&path).arg("--version"),
            None,
            self.options.verify_timeout,
        )?;
        if !finished.status.success() {
            return Err(ConversionError::Failed {
                status: finished.status,
                stderr: String::from_utf8_lossy(&finished.stderr).into_owned(),
            });
        }
        let banner = String::from_utf8(finished.stdout)?;
        Ok(banner.lines().next().unwrap_or_default().trim().to_string())
    }
}

impl HtmlConverter for Pandoc {
    fn convert(&self, html: &str) -> Result<String, ConversionError> {
        let path = self.locator.get()?;
        let started = Instant::now();
        tracing::debug!(
            path = %path.display(),
            from = %self.options.from,
            to = %self.options.to,
            bytes = html.len(),
            "Running pandoc"
        );
        let mut command = Command::new(&path);
        command
            .arg("-f")
            .arg(&self.options.from)
            .arg("-t")
            .arg(&self.options.to)
            .args(&self.options.extra_args);
        let finished = run(&mut command, Some(html.as_bytes()), self.options.timeout)?;
        if !finished.status.success() {
            let stderr = String::from_utf8_lossy(&finished.stderr).trim().to_string();
            tracing::warn!(status = %finished.status, stderr = %stderr, "Pandoc failed");
            return Err(ConversionError::Failed {
                status: finished.status,
                stderr,
            });
        }
        let markdown = String::from_utf8(finished.stdout)?;
        tracing::debug!(
            bytes = markdown.len(),
            elapsed_ms = started.elapsed().as_millis(),
            "Pandoc finished"
        );
        Ok(markdown)
    }
}
