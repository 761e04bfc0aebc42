//! `vellum open` - load a document, driving the password challenge over stdin
//!
//! Composes the full stack: settings, worker discovery and spawn, request
//! plumbing, engine, stdin password submissions, Ctrl-C, and the optional
//! source watcher. Exits 0 once the document is loaded (staying alive under
//! `--watch`), 1 on a terminal failure.

use std::io::Write as _;
use std::sync::Arc;

use clap::Args;
use tokio::sync::{broadcast, mpsc};

use vellum_app::config::{default_config_dir, load_settings};
use vellum_app::status::default_status_dir;
use vellum_app::view::LOAD_FAILURE_NOTICE;
use vellum_app::{AppState, Engine, EngineEvent, LoggingSink, Message, Settings, WorkerRenderer};
use vellum_core::prelude::*;
use vellum_core::{DocumentSource, LoadPhase, WorkerEvent};
use vellum_render::{resolve_worker, RequestTracker, WorkerProcess};

#[derive(Args, Debug)]
pub struct OpenArgs {
    /// Document to open (local path or URL)
    #[arg(value_name = "SOURCE")]
    pub source: String,

    /// Password for the first render attempt
    #[arg(long, value_name = "PASSWORD")]
    pub password: Option<String>,

    /// Keep running and reload when the source file changes on disk
    #[arg(long)]
    pub watch: bool,

    /// Render worker command (overrides settings and VELLUM_WORKER)
    #[arg(long, value_name = "CMD")]
    pub worker: Option<String>,
}

pub async fn run(args: OpenArgs) -> Result<()> {
    let OpenArgs {
        source,
        password,
        watch,
        worker: worker_override,
    } = args;

    // 1. Settings
    let settings = match default_config_dir() {
        Some(dir) => load_settings(&dir),
        None => Settings::default(),
    };

    // 2. Resolve and spawn the render worker
    let override_command = worker_override
        .as_deref()
        .or(settings.worker.command.as_deref());
    let mut launch = resolve_worker(override_command)?;
    launch.args.extend(settings.worker.args.iter().cloned());
    info!("Using render worker: {}", launch);

    let (worker_event_tx, worker_event_rx) = mpsc::channel::<WorkerEvent>(256);
    let mut worker = WorkerProcess::spawn(&launch, worker_event_tx).await?;

    // 3. Request plumbing and the process-backed renderer
    let tracker = Arc::new(RequestTracker::new());
    let sender = worker.command_sender(Arc::clone(&tracker));
    let renderer = WorkerRenderer::new(sender.clone(), settings.behavior.render_timeout());

    // 4. Engine
    let mut engine = Engine::new(
        renderer,
        Arc::new(LoggingSink),
        settings,
        default_status_dir(),
    );
    engine.start_worker_pump(worker_event_rx, Arc::clone(&tracker));

    // 5. Input sources: stdin submissions and Ctrl-C
    let stdin_tx = engine.msg_sender();
    std::thread::spawn(move || read_stdin_lines(stdin_tx, watch));

    let ctrl_c_tx = engine.msg_sender();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Ctrl-C received");
            let _ = ctrl_c_tx.send(Message::Quit).await;
        }
    });

    // 6. Open the document, watching it if asked
    let source = DocumentSource::from(source);
    if watch {
        engine.start_source_watcher(&source);
    }

    let mut events = engine.subscribe();
    println!("Loading {}...", source);
    engine.process_message(Message::OpenDocument {
        source: source.clone(),
        password,
    });
    report_events(&engine.state, &mut events);

    // 7. Event loop
    loop {
        if engine.should_quit() {
            info!("Quit requested");
            break;
        }

        match engine.msg_rx.recv().await {
            Some(msg) => {
                engine.process_message(msg);
                report_events(&engine.state, &mut events);

                // Without --watch the loop ends as soon as the load settles
                if !watch {
                    if let Some(LoadPhase::Loaded | LoadPhase::Failed) = engine.state.phase() {
                        break;
                    }
                }
            }
            None => {
                info!("Message channel closed");
                break;
            }
        }
    }

    let loaded = engine.state.phase() == Some(LoadPhase::Loaded);

    // 8. Shutdown
    engine.shutdown().await;
    if let Err(e) = worker.shutdown(Some(&sender)).await {
        warn!("Worker shutdown failed: {}", e);
    }

    info!("vellum open exiting (loaded: {})", loaded);
    if !loaded {
        std::process::exit(1);
    }
    Ok(())
}

/// Print user-facing lines for the events produced by one update cycle.
fn report_events(state: &AppState, events: &mut broadcast::Receiver<EngineEvent>) {
    while let Ok(event) = events.try_recv() {
        report_event(state, &event);
    }
}

fn report_event(state: &AppState, event: &EngineEvent) {
    match event {
        EngineEvent::PhaseChanged {
            old_phase,
            new_phase,
            ..
        } => match new_phase {
            LoadPhase::AwaitingPassword => {
                let invalid = state
                    .document
                    .as_ref()
                    .is_some_and(|d| d.password_known_invalid);
                if invalid {
                    println!("Incorrect password. Try again.");
                } else {
                    println!("This document is password protected.");
                }
                print!("Password: ");
                let _ = std::io::stdout().flush();
            }
            LoadPhase::Loading => {
                if *old_phase == LoadPhase::AwaitingPassword {
                    println!("Checking password...");
                } else {
                    println!("Reloading...");
                }
            }
            LoadPhase::Loaded => match state.document.as_ref().and_then(|d| d.page_count) {
                Some(pages) => println!("Loaded ({} pages).", pages),
                None => println!("Loaded."),
            },
            LoadPhase::Failed => {
                eprintln!("{}", LOAD_FAILURE_NOTICE);
            }
        },
        EngineEvent::RenderProgress {
            pages_done,
            page_count,
        } => match page_count {
            Some(total) => println!("Rendered {}/{} pages", pages_done, total),
            None => println!("Rendered {} pages", pages_done),
        },
        EngineEvent::SourceChanged => println!("Source changed on disk."),
        EngineEvent::WorkerReady { version, pid } => {
            info!("Render worker ready (version {}, pid {})", version, pid);
        }
        EngineEvent::WorkerExited { code } => {
            // The phase change that follows carries the user-facing notice
            info!("Render worker exited (code {:?})", code);
        }
        EngineEvent::WatcherError { message } => {
            warn!("Watcher error: {}", message);
        }
        _ => {}
    }
}

/// Read stdin lines as password submissions.
///
/// Every line is a submission; the handlers ignore submissions outside the
/// password challenge. On EOF a quit is sent unless the session is watching,
/// since a closed stdin can never resolve a pending challenge.
fn read_stdin_lines(msg_tx: mpsc::Sender<Message>, watch: bool) {
    use std::io::BufRead;

    let stdin = std::io::stdin();
    let reader = stdin.lock();

    for line in reader.lines() {
        match line {
            Ok(line) => {
                let _ = msg_tx.blocking_send(Message::SubmitPassword(line));
            }
            Err(e) => {
                error!("Failed to read stdin: {}", e);
                break;
            }
        }
    }

    info!("Stdin closed");
    if !watch {
        let _ = msg_tx.blocking_send(Message::Quit);
    }
}
