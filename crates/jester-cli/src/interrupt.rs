//! Operator interrupt handling.
//!
//! SIGINT and SIGTERM are consumed by a listener thread. The first signal
//! asks the game to quit over a fresh, time-bounded connection and then
//! terminates the process; a second signal terminates it at once. Any
//! request the main thread has in flight is abandoned; its socket closes
//! with the process.

use std::io;

use jester_protocol::ClientSettings;

/// Exit status reported after an operator interrupt.
#[cfg(unix)]
pub(crate) const INTERRUPT_EXIT_CODE: i32 = 130;

/// Upper bound on each stage of the interrupt-time quit request.
#[cfg(unix)]
const QUIT_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(1);

#[cfg(unix)]
pub(crate) fn install(settings: ClientSettings) -> io::Result<()> {
    use std::process;
    use std::thread;

    use jester_protocol::ProtocolClient;
    use signal_hook::consts::signal::{SIGINT, SIGTERM};
    use signal_hook::iterator::Signals;
    use tracing::{info, warn};

    use crate::commands::close_game;

    let settings = settings
        .with_connect_timeout(Some(QUIT_TIMEOUT))
        .with_read_timeout(Some(QUIT_TIMEOUT))
        .with_write_timeout(Some(QUIT_TIMEOUT));
    let mut signals = Signals::new([SIGINT, SIGTERM])?;
    thread::Builder::new()
        .name("jester-interrupt".to_owned())
        .spawn(move || {
            let mut closing = false;
            for signal in signals.forever() {
                if closing {
                    info!(signal, "second interrupt received; exiting now");
                    process::exit(INTERRUPT_EXIT_CODE);
                }
                closing = true;
                info!(signal, "interrupt received; closing the game");
                let client = ProtocolClient::new(settings.clone());
                let spawned = thread::Builder::new()
                    .name("jester-quit".to_owned())
                    .spawn(move || {
                        close_game(&client);
                        process::exit(INTERRUPT_EXIT_CODE);
                    });
                if let Err(error) = spawned {
                    warn!(error = %error, "could not start quit thread; exiting now");
                    process::exit(INTERRUPT_EXIT_CODE);
                }
            }
        })?;
    Ok(())
}

#[cfg(not(unix))]
pub(crate) fn install(settings: ClientSettings) -> io::Result<()> {
    let _ = settings;
    Ok(())
}
