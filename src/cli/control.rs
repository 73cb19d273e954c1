//! Handlers for the client-side control-socket commands: `emergency-stop`,
//! `circuit-breaker-reset`, and `reload-config`.

use crate::cli::{ReloadConfigArgs, SocketArgs};
use crate::core::service::control;
use crate::error::Result;

/// Execute the `emergency-stop` command.
pub async fn emergency_stop(args: &SocketArgs) -> Result<()> {
    let response = control::send_command(&args.socket, "emergency-stop").await?;
    print!("{response}");
    Ok(())
}

/// Execute the `circuit-breaker-reset` command.
pub async fn circuit_breaker_reset(args: &SocketArgs) -> Result<()> {
    let response = control::send_command(&args.socket, "circuit-breaker-reset").await?;
    print!("{response}");
    Ok(())
}

/// Execute the `reload-config` command.
pub async fn reload_config(args: &ReloadConfigArgs) -> Result<()> {
    let command = format!("reload-config {}", args.config.display());
    let response = control::send_command(&args.socket.socket, &command).await?;
    print!("{response}");
    Ok(())
}
