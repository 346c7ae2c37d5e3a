//! Processing mark and the host's global busy flag
//!
//! The host owns the busy flag and publishes it through a watch channel.
//! The panel only reads it: whenever it observes the flag at `false` after
//! a change, the local mark is cleared, whatever file or action it named.

use tokio::sync::watch;

/// Create a connected flag/signal pair, initially not busy
pub fn processing_channel() -> (ProcessingFlag, ProcessingSignal) {
    let (tx, rx) = watch::channel(false);
    (ProcessingFlag { tx }, ProcessingSignal::new(rx))
}

/// Writer side, held by the host
#[derive(Debug)]
pub struct ProcessingFlag {
    tx: watch::Sender<bool>,
}

impl ProcessingFlag {
    /// Publish the busy state. Only notifies readers on an actual change.
    pub fn set(&self, busy: bool) {
        self.tx.send_if_modified(|current| {
            let changed = *current != busy;
            *current = busy;
            changed
        });
    }

    pub fn get(&self) -> bool {
        *self.tx.borrow()
    }
}

/// Reader side, held by the panel, plus the single processing mark
#[derive(Debug)]
pub struct ProcessingSignal {
    rx: watch::Receiver<bool>,
    /// Filename currently understood to be under a backend action
    mark: Option<String>,
}

impl ProcessingSignal {
    pub fn new(rx: watch::Receiver<bool>) -> Self {
        Self { rx, mark: None }
    }

    /// Current value of the host's flag
    pub fn is_busy(&self) -> bool {
        *self.rx.borrow()
    }

    pub fn mark(&self) -> Option<&str> {
        self.mark.as_deref()
    }

    /// Replace the mark; at most one file is marked at a time
    pub fn set_mark(&mut self, filename: String) {
        self.mark = Some(filename);
    }

    pub fn is_marked(&self, filename: &str) -> bool {
        self.mark.as_deref() == Some(filename)
    }

    /// Pick up flag changes. Returns the filename whose mark was cleared.
    ///
    /// A change that lands on `false` means the flag fell at least once since
    /// the last observation, even if the intermediate `true` was never seen.
    pub fn reconcile(&mut self) -> Option<String> {
        match self.rx.has_changed() {
            Ok(true) => {}
            // No change, or the host dropped its flag
            _ => return None,
        }

        let busy = *self.rx.borrow_and_update();
        if busy {
            return None;
        }
        let cleared = self.mark.take();
        if let Some(ref name) = cleared {
            tracing::debug!("Processing flag dropped, clearing mark on {}", name);
        }
        cleared
    }
}
