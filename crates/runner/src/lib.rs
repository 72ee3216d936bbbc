//! A concurrent application runner that manages long-running processes with
//! graceful shutdown.
//!
//! The runner spawns one task per named process, cancels everything on
//! SIGTERM/SIGINT or on the first process error, gives the remaining
//! processes a bounded window to exit on their own, and finally executes
//! cleanup closers with a timeout.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;
use tokio::task::{JoinError, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// A named long-running process. Receives the shutdown token and runs until
/// completion or cancellation.
pub type AppProcess = Box<
    dyn FnOnce(CancellationToken) -> Pin<Box<dyn Future<Output = Result<(), anyhow::Error>> + Send>>
        + Send,
>;

/// A cleanup function executed after all processes have stopped.
pub type Closer =
    Box<dyn FnOnce() -> Pin<Box<dyn Future<Output = Result<(), anyhow::Error>> + Send>> + Send>;

pub struct Runner {
    processes: Vec<(String, AppProcess)>,
    closers: Vec<Closer>,
    closer_timeout: Duration,
    cancellation_token: CancellationToken,
}

impl Default for Runner {
    fn default() -> Self {
        Self::new()
    }
}

impl Runner {
    pub fn new() -> Self {
        Self {
            processes: Vec::new(),
            closers: Vec::new(),
            closer_timeout: Duration::from_secs(10),
            cancellation_token: CancellationToken::new(),
        }
    }

    /// Add a named process. Processes run concurrently; the first error
    /// cancels all of them.
    pub fn with_named_process<F, Fut>(mut self, name: impl Into<String>, process: F) -> Self
    where
        F: FnOnce(CancellationToken) -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), anyhow::Error>> + Send + 'static,
    {
        self.processes
            .push((name.into(), Box::new(|token| Box::pin(process(token)))));
        self
    }

    /// Add a closer, executed after all processes have stopped regardless of
    /// how they stopped.
    pub fn with_closer<F, Fut>(mut self, closer: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), anyhow::Error>> + Send + 'static,
    {
        self.closers.push(Box::new(|| Box::pin(closer())));
        self
    }

    /// Timeout for the graceful-drain window and for the closers.
    pub fn with_closer_timeout(mut self, timeout: Duration) -> Self {
        self.closer_timeout = timeout;
        self
    }

    /// Use an externally controlled cancellation token.
    pub fn with_cancellation_token(mut self, token: CancellationToken) -> Self {
        self.cancellation_token = token;
        self
    }

    /// Run all processes until completion or shutdown. Returns the first
    /// process error, if any; the caller decides the exit code.
    pub async fn run(self) -> Result<(), anyhow::Error> {
        let token = self.cancellation_token;
        let mut join_set = JoinSet::new();

        for (name, process) in self.processes {
            let process_token = token.clone();
            join_set.spawn(async move {
                let result = process(process_token).await;
                (name, result)
            });
        }

        spawn_signal_handlers(token.clone());

        let mut first_error = None;
        while let Some(result) = join_set.join_next().await {
            note_process_result(result, &token, &mut first_error);
            if token.is_cancelled() {
                break;
            }
        }

        // Remaining processes get a bounded window to observe the
        // cancellation and exit cleanly before being aborted.
        if !join_set.is_empty() {
            let drain = async {
                while let Some(result) = join_set.join_next().await {
                    note_process_result(result, &token, &mut first_error);
                }
            };
            if tokio::time::timeout(self.closer_timeout, drain).await.is_err() {
                error!("processes did not stop in time, aborting them");
                join_set.shutdown().await;
            }
        }

        if !self.closers.is_empty() {
            info!(timeout = ?self.closer_timeout, "running closers");
            match tokio::time::timeout(self.closer_timeout, run_closers(self.closers)).await {
                Ok(()) => info!("all closers completed"),
                Err(_) => error!(timeout = ?self.closer_timeout, "closers timed out"),
            }
        }

        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

fn spawn_signal_handlers(token: CancellationToken) {
    let ctrl_c_token = token.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("received shutdown signal");
                ctrl_c_token.cancel();
            }
            Err(err) => {
                error!(error = %err, "error setting up signal handler");
            }
        }
    });

    #[cfg(unix)]
    {
        tokio::spawn(async move {
            use tokio::signal::unix::{signal, SignalKind};
            let mut sigterm = match signal(SignalKind::terminate()) {
                Ok(sigterm) => sigterm,
                Err(err) => {
                    error!(error = %err, "error setting up SIGTERM handler");
                    return;
                }
            };
            sigterm.recv().await;
            info!("received SIGTERM signal");
            token.cancel();
        });
    }
}

fn note_process_result(
    result: Result<(String, Result<(), anyhow::Error>), JoinError>,
    token: &CancellationToken,
    first_error: &mut Option<anyhow::Error>,
) {
    match result {
        Ok((name, Ok(()))) => {
            debug!(process = %name, "process completed");
        }
        Ok((name, Err(err))) => {
            error!(process = %name, error = %format!("{err:#}"), "process error");
            if first_error.is_none() {
                *first_error = Some(err);
            }
            token.cancel();
        }
        Err(err) => {
            error!(error = %err, "process panicked");
            token.cancel();
        }
    }
}

async fn run_closers(closers: Vec<Closer>) {
    let mut closer_set = JoinSet::new();

    for closer in closers {
        closer_set.spawn(async move { closer().await });
    }

    while let Some(result) = closer_set.join_next().await {
        match result {
            Ok(Ok(())) => debug!("closer completed"),
            Ok(Err(err)) => error!(error = %format!("{err:#}"), "closer error"),
            Err(err) => error!(error = %err, "closer panicked"),
        }
    }
}
