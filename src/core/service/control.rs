//! Local control surface: a Unix domain socket accepting
//! newline-terminated text commands, used by the `status`,
//! `emergency-stop`, and `circuit-breaker reset` CLI subcommands to talk to
//! a running `arbot run` process.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tracing::{info, warn};

use crate::app::config::Config;
use crate::app::AppState;

/// Commands the control socket understands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlCommand {
    Status,
    EmergencyStop,
    ResetCircuitBreaker,
    ReloadConfig(PathBuf),
}

impl ControlCommand {
    fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        match line.split_once(' ') {
            Some(("reload-config", path)) if !path.is_empty() => Some(Self::ReloadConfig(PathBuf::from(path))),
            _ => match line {
                "status" => Some(Self::Status),
                "emergency-stop" => Some(Self::EmergencyStop),
                "circuit-breaker-reset" => Some(Self::ResetCircuitBreaker),
                _ => None,
            },
        }
    }
}

/// Runs the control socket accept loop until the process exits. Each
/// connection is one request/response: read one line, act, write one line
/// back, close.
pub async fn serve(socket_path: PathBuf, state: Arc<AppState>) -> std::io::Result<()> {
    let _ = std::fs::remove_file(&socket_path);
    let listener = UnixListener::bind(&socket_path)?;
    info!(path = %socket_path.display(), "control socket listening");

    loop {
        let (stream, _) = listener.accept().await?;
        let state = Arc::clone(&state);
        tokio::spawn(async move {
            if let Err(err) = handle_connection(stream, &state).await {
                warn!(error = %err, "control connection error");
            }
        });
    }
}

async fn handle_connection(stream: UnixStream, state: &Arc<AppState>) -> std::io::Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();
    let Some(line) = lines.next_line().await? else {
        return Ok(());
    };

    let response = match ControlCommand::parse(&line) {
        Some(ControlCommand::Status) => status_report(state),
        Some(ControlCommand::EmergencyStop) => {
            state.request_emergency_stop().await;
            "emergency stop acknowledged\n".to_string()
        }
        Some(ControlCommand::ResetCircuitBreaker) => {
            state.reset_circuit_breaker();
            "circuit breaker reset\n".to_string()
        }
        Some(ControlCommand::ReloadConfig(path)) => reload_config(state, &path),
        None => format!("unrecognized command: {}\n", line.trim()),
    };

    writer.write_all(response.as_bytes()).await?;
    writer.flush().await
}

fn reload_config(state: &AppState, path: &Path) -> String {
    let new = match Config::load(path) {
        Ok(config) => config,
        Err(err) => return format!("reload failed: {err}\n"),
    };
    match state.reload_config(new) {
        Ok(()) => "config reloaded\n".to_string(),
        Err(field) => format!("reload rejected: `{field}` requires a restart\n"),
    }
}

fn status_report(state: &AppState) -> String {
    let (by_asset, total_exposure) = state.portfolio.exposure_snapshot();
    let daily_pnl = state.portfolio.daily_pnl_usd();
    let drawdown = state.portfolio.drawdown_usd();
    let drawdown_pct = state.portfolio.drawdown_pct();
    let circuit_phase = state.circuit.lock().phase(chrono::Utc::now());
    format!(
        "tracked_pairs={} total_exposure_usd={total_exposure} daily_pnl_usd={daily_pnl} drawdown_usd={drawdown} drawdown_pct={drawdown_pct} circuit={circuit_phase:?} assets={}\n",
        state.market.len(),
        by_asset.len(),
    )
}

/// Connect to a running instance's control socket, send one command, and
/// return its response line(s).
pub async fn send_command(socket_path: impl AsRef<Path>, command: &str) -> std::io::Result<String> {
    let stream = UnixStream::connect(socket_path).await?;
    let (reader, mut writer) = stream.into_split();
    writer.write_all(format!("{command}\n").as_bytes()).await?;
    writer.flush().await?;

    let mut response = String::new();
    let mut lines = BufReader::new(reader).lines();
    while let Some(line) = lines.next_line().await? {
        response.push_str(&line);
        response.push('\n');
    }
    Ok(response)
}
