//! Render worker process supervision
//!
//! Spawns the worker with piped stdio and splits its lifetime across four
//! tasks: a stdin feed, one line pump per output stream, and a supervisor
//! that owns the `Child` and reaps the real exit code.

use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, Command};
use tokio::sync::{mpsc, oneshot, Notify};

use crate::commands::{next_request_id, CommandSender, RequestTracker, WorkerCommand};
use crate::discovery::WorkerLaunch;
use vellum_core::events::WorkerEvent;
use vellum_core::prelude::*;

/// How long a shutdown request may wait for an acknowledgement.
const SHUTDOWN_ACK_WAIT: Duration = Duration::from_secs(1);

/// How long shutdown waits for the worker to leave on its own before
/// killing it.
const GRACEFUL_EXIT_WAIT: Duration = Duration::from_secs(2);

/// Handle to a running render worker.
///
/// The `Child` itself lives inside the supervisor task, which is the only
/// caller of `child.wait()`; every exit therefore surfaces with its real
/// code as `WorkerEvent::Exited`. The handle keeps the stdin channel for
/// requests, a one-shot kill trigger for the supervisor, and an atomic
/// flag plus [`Notify`] pair so exit can be observed without a lock.
pub struct WorkerProcess {
    /// Request lines destined for the worker's stdin
    stdin_tx: mpsc::Sender<String>,
    /// Tells the supervisor to kill the child. Consumed on first use.
    kill_tx: Option<oneshot::Sender<()>>,
    /// Set by the supervisor once the child is gone
    exited: Arc<AtomicBool>,
    /// Notified right after `exited` flips, waking `shutdown()`
    exit_notify: Arc<Notify>,
}

impl WorkerProcess {
    /// Spawn the render worker described by `launch`.
    ///
    /// Output lines and the eventual exit report arrive on `event_tx`.
    pub async fn spawn(
        launch: &WorkerLaunch,
        event_tx: mpsc::Sender<WorkerEvent>,
    ) -> Result<Self> {
        info!("Starting render worker: {}", launch);

        let mut child = Command::new(&launch.command)
            .args(&launch.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => Error::WorkerNotFound,
                _ => Error::ProcessSpawn {
                    reason: e.to_string(),
                },
            })?;

        info!("Render worker running (pid {:?})", child.id());

        let stdin = child.stdin.take().expect("stdin was configured");
        let (stdin_tx, stdin_rx) = mpsc::channel::<String>(32);
        tokio::spawn(Self::feed_stdin(stdin, stdin_rx));

        let stdout = child.stdout.take().expect("stdout was configured");
        let stderr = child.stderr.take().expect("stderr was configured");
        tokio::spawn(Self::pump_lines(
            stdout,
            "stdout",
            event_tx.clone(),
            WorkerEvent::Stdout,
        ));
        tokio::spawn(Self::pump_lines(
            stderr,
            "stderr",
            event_tx.clone(),
            WorkerEvent::Stderr,
        ));

        let exited = Arc::new(AtomicBool::new(false));
        let exit_notify = Arc::new(Notify::new());
        let (kill_tx, kill_rx) = oneshot::channel();
        tokio::spawn(Self::supervise(
            child,
            kill_rx,
            event_tx,
            Arc::clone(&exited),
            Arc::clone(&exit_notify),
        ));

        Ok(Self {
            stdin_tx,
            kill_tx: Some(kill_tx),
            exited,
            exit_notify,
        })
    }

    /// Supervisor task: waits for the child, killing it first if asked.
    ///
    /// The exit flag flips and waiters wake before the event goes out, so
    /// anyone who sees `Exited` also sees `has_exited() == true`.
    async fn supervise(
        mut child: Child,
        kill_rx: oneshot::Receiver<()>,
        event_tx: mpsc::Sender<WorkerEvent>,
        exited: Arc<AtomicBool>,
        exit_notify: Arc<Notify>,
    ) {
        let status = tokio::select! {
            status = child.wait() => status,
            // Kill trigger, or the handle dropped it without firing
            _ = kill_rx => {
                warn!("Killing render worker");
                if let Err(e) = child.kill().await {
                    error!("Failed to kill render worker: {}", e);
                }
                child.wait().await
            }
        };

        let code = match status {
            Ok(status) => {
                info!("Render worker exited: {:?}", status);
                status.code()
            }
            Err(e) => {
                error!("Could not reap render worker: {}", e);
                None
            }
        };

        exited.store(true, Ordering::Release);
        exit_notify.notify_waiters();
        let _ = event_tx.send(WorkerEvent::Exited { code }).await;
    }

    /// Forward lines from one output stream, wrapped in the given event.
    ///
    /// Ends on EOF without reporting anything; the supervisor owns the
    /// exit report.
    async fn pump_lines<R>(
        stream: R,
        label: &'static str,
        tx: mpsc::Sender<WorkerEvent>,
        wrap: fn(String) -> WorkerEvent,
    ) where
        R: AsyncRead + Unpin,
    {
        let mut lines = BufReader::new(stream).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            trace!("worker {}: {}", label, line);
            if tx.send(wrap(line)).await.is_err() {
                break;
            }
        }
        debug!("worker {} pump finished", label);
    }

    /// Write queued request lines to the worker's stdin.
    async fn feed_stdin(mut stdin: ChildStdin, mut rx: mpsc::Receiver<String>) {
        while let Some(request) = rx.recv().await {
            debug!("worker <- {}", request);
            let write = async {
                stdin.write_all(request.as_bytes()).await?;
                stdin.write_all(b"\n").await?;
                stdin.flush().await
            };
            if let Err(e) = write.await {
                error!("Worker stdin write failed: {}", e);
                break;
            }
        }
        debug!("Worker stdin feed finished");
    }

    /// Queue one raw request line for the worker.
    pub async fn send(&self, request: &str) -> Result<()> {
        self.stdin_tx
            .send(request.to_string())
            .await
            .map_err(|_| Error::channel_send("stdin channel closed"))
    }

    /// Shut the worker down, politely first.
    ///
    /// Sends `worker.shutdown` (awaiting the acknowledgement briefly when a
    /// [`CommandSender`] is available, fire-and-forget otherwise), waits up
    /// to [`GRACEFUL_EXIT_WAIT`] for the child to leave, then kills it.
    pub async fn shutdown(&mut self, cmd_sender: Option<&CommandSender>) -> Result<()> {
        if self.has_exited() {
            debug!("Render worker already gone, nothing to shut down");
            return Ok(());
        }

        info!("Shutting down render worker");

        match cmd_sender {
            Some(sender) => {
                if let Err(e) = sender
                    .send_with_timeout(WorkerCommand::Shutdown, SHUTDOWN_ACK_WAIT)
                    .await
                {
                    // The worker dying counts as compliance
                    if self.has_exited() {
                        return Ok(());
                    }
                    warn!("Shutdown request failed (continuing): {}", e);
                }
            }
            None => {
                let request = WorkerCommand::Shutdown.build(next_request_id());
                let _ = self.send(&request).await;
            }
        }

        // Register interest before the final flag check so an exit landing
        // between the two cannot be missed.
        let notified = self.exit_notify.notified();
        if self.has_exited() {
            info!("Render worker exited on request");
            return Ok(());
        }

        match tokio::time::timeout(GRACEFUL_EXIT_WAIT, notified).await {
            Ok(()) => {
                info!("Render worker exited on request");
                Ok(())
            }
            Err(_) => {
                warn!("Render worker ignored shutdown, killing it");
                self.trigger_kill();
                Ok(())
            }
        }
    }

    /// Fire the kill trigger. The supervisor does the actual killing and
    /// reaping, so the exit event still carries through the normal path.
    fn trigger_kill(&mut self) {
        if let Some(tx) = self.kill_tx.take() {
            // The supervisor may have finished already; that's fine.
            let _ = tx.send(());
        }
    }

    /// Whether the child has exited. Non-blocking, `&self`.
    pub fn has_exited(&self) -> bool {
        self.exited.load(Ordering::Acquire)
    }

    /// Logical complement of [`has_exited`](Self::has_exited).
    pub fn is_running(&self) -> bool {
        !self.has_exited()
    }

    /// Build a [`CommandSender`] targeting this worker's stdin.
    pub fn command_sender(&self, tracker: Arc<RequestTracker>) -> CommandSender {
        CommandSender::new(self.stdin_tx.clone(), tracker)
    }
}

impl Drop for WorkerProcess {
    fn drop(&mut self) {
        if !self.has_exited() {
            warn!("WorkerProcess dropped while the worker may still be running");
            self.trigger_kill();
        }
        // kill_on_drop(true) on the Child remains the last resort if the
        // supervisor never got to run.
    }
}
