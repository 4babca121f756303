/*
Termination signals for the shutdown loop. The OS watcher forwards every
interrupt or terminate it sees into a channel until the listener stops; tests
push signals into the same channel with a ShutdownTrigger.

Once registered the OS handlers stay installed for the life of the process, so
signals after stop() are swallowed. The tool exits right after stopping.
*/

use std::fmt;
use std::io;

use log::warn;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownSignal {
    Interrupt,
    Terminate,
}

impl fmt::Display for ShutdownSignal {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ShutdownSignal::Interrupt => write!(f, "interrupt"),
            ShutdownSignal::Terminate => write!(f, "terminated"),
        }
    }
}

pub struct ShutdownListener {
    signals: mpsc::Receiver<ShutdownSignal>,
    watcher: Option<JoinHandle<()>>,
}

#[derive(Debug, Clone)]
pub struct ShutdownTrigger(mpsc::Sender<ShutdownSignal>);

impl ShutdownTrigger {
    /// Returns false if the listener already stopped or holds an unread signal
    pub fn trigger(&self, signal: ShutdownSignal) -> bool {
        self.0.try_send(signal).is_ok()
    }

    pub fn is_closed(&self) -> bool {
        self.0.is_closed()
    }
}

impl ShutdownListener {
    /// Listener not attached to the OS, fed only through the returned trigger
    pub fn channel() -> (ShutdownTrigger, ShutdownListener) {
        let (tx, rx) = mpsc::channel(1);
        (
            ShutdownTrigger(tx),
            ShutdownListener {
                signals: rx,
                watcher: None,
            },
        )
    }

    /// Next signal, or None once the listener is stopped or every trigger is gone
    pub async fn recv(&mut self) -> Option<ShutdownSignal> {
        self.signals.recv().await
    }

    /// Stop watching. Signals arriving afterwards are swallowed, not default-handled.
    pub fn stop(&mut self) {
        self.signals.close();
        if let Some(watcher) = self.watcher.take() {
            watcher.abort();
        }
    }
}

impl Drop for ShutdownListener {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Start watching for SIGINT and SIGTERM (Ctrl+C only on non-unix targets).
/// The handlers are installed before this returns.
pub fn listen_for_os_signals() -> ShutdownListener {
    let (trigger, mut listener) = ShutdownListener::channel();
    match OsSignals::register() {
        Ok(mut signals) => {
            listener.watcher = Some(tokio::spawn(async move {
                while let Some(signal) = signals.next().await {
                    // a full channel already holds an unread signal
                    if !trigger.trigger(signal) && trigger.is_closed() {
                        break;
                    }
                }
            }));
        }
        Err(e) => warn!("unable to listen for termination signals: {}", e),
    }
    listener
}

#[cfg(unix)]
struct OsSignals {
    interrupt: tokio::signal::unix::Signal,
    terminate: tokio::signal::unix::Signal,
}

#[cfg(unix)]
impl OsSignals {
    fn register() -> io::Result<Self> {
        use tokio::signal::unix::{signal, SignalKind};

        Ok(OsSignals {
            interrupt: signal(SignalKind::interrupt())?,
            terminate: signal(SignalKind::terminate())?,
        })
    }

    async fn next(&mut self) -> Option<ShutdownSignal> {
        tokio::select! {
            Some(()) = self.interrupt.recv() => Some(ShutdownSignal::Interrupt),
            Some(()) = self.terminate.recv() => Some(ShutdownSignal::Terminate),
            else => None,
        }
    }
}

#[cfg(not(unix))]
struct OsSignals;

#[cfg(not(unix))]
impl OsSignals {
    fn register() -> io::Result<Self> {
        Ok(OsSignals)
    }

    async fn next(&mut self) -> Option<ShutdownSignal> {
        tokio::signal::ctrl_c().await.ok().map(|_| ShutdownSignal::Interrupt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn trigger_reaches_listener() {
        let (trigger, mut listener) = ShutdownListener::channel();
        assert!(trigger.trigger(ShutdownSignal::Terminate));
        assert_eq!(listener.recv().await, Some(ShutdownSignal::Terminate));
    }

    #[tokio::test]
    async fn stopped_listener_takes_nothing() {
        let (trigger, mut listener) = ShutdownListener::channel();
        listener.stop();
        assert!(!trigger.trigger(ShutdownSignal::Interrupt));
        assert_eq!(listener.recv().await, None);
    }

    #[cfg(unix)]
    fn raise(signal: &str) {
        let status = std::process::Command::new("kill")
            .args([signal, &std::process::id().to_string()])
            .status()
            .unwrap();
        assert!(status.success());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn os_signals_keep_arriving_until_stopped() {
        use std::time::Duration;
        use tokio::time::timeout;

        let mut listener = listen_for_os_signals();

        raise("-INT");
        let first = timeout(Duration::from_secs(5), listener.recv()).await.unwrap();
        assert_eq!(first, Some(ShutdownSignal::Interrupt));

        raise("-TERM");
        let second = timeout(Duration::from_secs(5), listener.recv()).await.unwrap();
        assert_eq!(second, Some(ShutdownSignal::Terminate));

        listener.stop();
        // swallowed by the still-installed handler, the test process lives on
        raise("-INT");
        assert_eq!(listener.recv().await, None);
    }

    #[tokio::test]
    async fn os_listener_can_be_stopped() {
        let mut listener = listen_for_os_signals();
        listener.stop();
        assert_eq!(listener.recv().await, None);
    }

    #[test]
    fn signal_names() {
        assert_eq!(ShutdownSignal::Interrupt.to_string(), "interrupt");
        assert_eq!(ShutdownSignal::Terminate.to_string(), "terminated");
    }
}
