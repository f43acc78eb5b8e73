//! Ctrl+C handling for the command-line front end
//!
//! The first SIGINT cancels the registered token so the running conversion
//! or burn can stop its tool and report a cancelled result. A second SIGINT
//! exits immediately.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use super::CancelToken;

/// How often the watcher thread checks for a pending interrupt
const WATCH_INTERVAL: Duration = Duration::from_millis(100);

/// Exit status of a process ended by SIGINT
#[cfg(unix)]
const INTERRUPTED_EXIT_CODE: i32 = 130;

static INTERRUPTED: AtomicBool = AtomicBool::new(false);

#[cfg(unix)]
extern "C" fn on_interrupt(_signal: libc::c_int) {
    // Only async-signal-safe calls here
    if INTERRUPTED.swap(true, Ordering::SeqCst) {
        unsafe { libc::_exit(INTERRUPTED_EXIT_CODE) };
    }
}

/// Whether a SIGINT has arrived since the handler was installed
pub fn interrupted() -> bool {
    INTERRUPTED.load(Ordering::SeqCst)
}

/// Cancel `token` when the user presses Ctrl+C
///
/// Installs the SIGINT handler and starts a watcher thread that turns the
/// signal into a cancellation. Child tools run in their own process group,
/// so they only stop when the cancelled run terminates them.
pub fn cancel_on_interrupt(token: CancelToken) -> io::Result<()> {
    install_handler()?;

    thread::Builder::new()
        .name("interrupt".to_string())
        .spawn(move || {
            while !interrupted() {
                thread::sleep(WATCH_INTERVAL);
            }
            log::warn!("Interrupted, cancelling (press Ctrl+C again to quit now)");
            token.cancel();
        })?;
    Ok(())
}

#[cfg(unix)]
fn install_handler() -> io::Result<()> {
    let handler = on_interrupt as extern "C" fn(libc::c_int) as libc::sighandler_t;
    let previous = unsafe { libc::signal(libc::SIGINT, handler) };
    if previous == libc::SIG_ERR {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

#[cfg(not(unix))]
fn install_handler() -> io::Result<()> {
    log::debug!("Ctrl+C cancellation is not supported on this platform");
    Ok(())
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn test_sigint_cancels_token() {
        let token = CancelToken::new();
        cancel_on_interrupt(token.clone()).unwrap();
        assert!(!token.is_cancelled());

        unsafe {
            libc::raise(libc::SIGINT);
        }

        let started = Instant::now();
        while !token.is_cancelled() && started.elapsed() < Duration::from_secs(5) {
            thread::sleep(Duration::from_millis(20));
        }
        assert!(interrupted());
        assert!(token.is_cancelled());
    }
}
