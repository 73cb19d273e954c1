//! Handler for the `status` command.

use crate::cli::SocketArgs;
use crate::core::service::control;
use crate::error::Result;

/// Execute the `status` command: query a running instance's control socket
/// and print its response verbatim.
pub async fn execute(args: &SocketArgs) -> Result<()> {
    let response = control::send_command(&args.socket, "status").await?;
    print!("{response}");
    Ok(())
}
