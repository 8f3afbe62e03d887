//! Configuration for the demo binaries, consumed by the enclosing program —
//! never by the reactor core itself.

use clap::Parser;

/// Command-line configuration for a `switchboard` demo server.
#[derive(Debug, Parser)]
#[command(name = "switchboard-server", about = "Demo reactor-based TCP server")]
pub struct Config {
    /// Address to bind to. Empty or "*" binds 0.0.0.0.
    #[arg(short = 'H', long, default_value = "0.0.0.0")]
    pub host: String,

    /// TCP port to listen on.
    #[arg(short, long, default_value_t = 7878)]
    pub port: u16,

    /// Tracing log level (error, warn, info, debug, trace).
    #[arg(short, long = "log-level", default_value = "info")]
    pub log_level: String,

    /// Number of worker threads draining the work queue.
    #[arg(short, long = "threads-count", default_value_t = 4)]
    pub threads_count: usize,

    /// Run without interactive prompts (e.g. Ctrl-C confirmation).
    #[arg(short, long)]
    pub non_interactive: bool,

    /// Which demo protocol to serve.
    #[arg(short = 'P', long, value_enum, default_value_t = Protocol::Echo)]
    pub protocol: Protocol,
}

/// The demo protocol the `switchboard-server` binary serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Protocol {
    Echo,
    MirrorFixed,
    MirrorDelimited,
    HttpIsh,
    ReqResp,
}

impl Config {
    /// `port > 0 && host != ""`.
    pub fn is_valid(&self) -> bool {
        self.port > 0 && !self.host.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_host() {
        let cfg = Config {
            host: String::new(),
            port: 1,
            log_level: "info".into(),
            threads_count: 1,
            non_interactive: false,
            protocol: Protocol::Echo,
        };
        assert!(!cfg.is_valid());
    }

    #[test]
    fn rejects_zero_port() {
        let cfg = Config {
            host: "127.0.0.1".into(),
            port: 0,
            log_level: "info".into(),
            threads_count: 1,
            non_interactive: false,
            protocol: Protocol::Echo,
        };
        assert!(!cfg.is_valid());
    }

    #[test]
    fn accepts_sane_defaults() {
        let cfg = Config {
            host: "0.0.0.0".into(),
            port: 7878,
            log_level: "info".into(),
            threads_count: 4,
            non_interactive: false,
            protocol: Protocol::Echo,
        };
        assert!(cfg.is_valid());
    }
}
