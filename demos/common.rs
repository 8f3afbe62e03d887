//! Shared bootstrap for the demo servers: parse `Config`, set up tracing,
//! bind a listener, start the worker pool, and run until interrupted.
//!
//! Shutdown follows the caller-responsibility ordering: on Ctrl-C the
//! worker pool is drained and joined first, while the reactor is still
//! polling to flush whatever they hand back, and only then is the reactor
//! told to stop. Running the reactor on its own thread is what makes that
//! ordering possible from a signal handler that fires on a different one.

use std::sync::Arc;
use std::sync::atomic::Ordering;

use clap::Parser;
use switchboard::config::Config;
use switchboard::reactor::Reactor;
use switchboard::session::ProtocolHandler;
use switchboard::worker::WorkerPool;

const MAX_SLOTS: usize = 1024;
const STEP_TIMEOUT_MS: u64 = 100;

/// Parses CLI args and validates them, exiting the process on failure.
pub fn parse_config() -> Config {
    let config = Config::parse();
    if !config.is_valid() {
        eprintln!("invalid configuration: host and port must be set");
        std::process::exit(1);
    }
    config
}

/// Wires up a [`Reactor`] and [`WorkerPool`] for one protocol under an
/// already-parsed `config`, and runs until Ctrl-C or a fatal reactor error.
pub fn run_with<H>(config: &Config, name: &str, factory: impl Fn() -> H + Send + Sync + 'static)
where
    H: ProtocolHandler + 'static,
{
    let mut reactor: Reactor<H> = Reactor::init(MAX_SLOTS).expect("failed to initialize reactor");
    reactor
        .start_listen(name, &config.host, config.port, Arc::new(factory))
        .expect("failed to bind listener");

    let stop_flag = reactor.stop_flag();
    let work_queue = reactor.work_queue();
    let workers = WorkerPool::start(config.threads_count, work_queue.clone(), reactor.pipe_write_fd());

    let (shutdown_tx, shutdown_rx) = std::sync::mpsc::channel();
    ctrlc::set_handler(move || {
        let _ = shutdown_tx.send(());
    })
    .expect("failed to install Ctrl-C handler");

    tracing::info!(name, host = %config.host, port = config.port, "listening");
    let reactor_thread = std::thread::spawn(move || reactor.run(STEP_TIMEOUT_MS).expect("reactor loop failed"));

    shutdown_rx.recv().expect("Ctrl-C channel closed unexpectedly");
    tracing::info!(name, "shutting down");

    // Workers drain and join first, while the reactor thread is still
    // running to flush whatever they hand back; only then does the
    // reactor stop.
    work_queue.shutdown();
    workers.join();
    stop_flag.store(true, Ordering::SeqCst);
    reactor_thread.join().expect("reactor thread panicked");
}

/// Convenience wrapper for single-protocol demo binaries: parses config,
/// sets up tracing, and runs.
pub fn run_demo<H>(name: &str, factory: impl Fn() -> H + Send + Sync + 'static)
where
    H: ProtocolHandler + 'static,
{
    let config = parse_config();
    init_tracing(&config);
    run_with(&config, name, factory);
}

pub fn init_tracing(config: &Config) {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(&config.log_level))
        .init();
}
