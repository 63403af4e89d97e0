//! The fix host runs on its own thread and owns the document. Apply
//! requests are handled strictly in arrival order; each one gets exactly one
//! reply on the background channel.

use crate::app::messages::BackgroundMessage;
use anyhow::{Context, Result};
use linefix_core::{AppliedFix, DocumentEditor, FixHost, SurfaceMessage};
use std::sync::mpsc;
use std::thread::{self, JoinHandle};
use tracing::{debug, warn};

pub struct FixHostHandle {
    tx: mpsc::Sender<SurfaceMessage>,
    join: JoinHandle<Vec<AppliedFix>>,
}

pub fn spawn_fix_host<D>(
    mut host: FixHost<D>,
    replies: mpsc::Sender<BackgroundMessage>,
) -> Result<FixHostHandle>
where
    D: DocumentEditor + Send + 'static,
{
    let (tx, rx) = mpsc::channel::<SurfaceMessage>();
    let join = thread::Builder::new()
        .name("linefix-fix-host".to_string())
        .spawn(move || {
            for message in rx {
                let reply = host.handle(message);
                if replies.send(BackgroundMessage::Host(reply)).is_err() {
                    debug!("results surface closed, dropping host reply");
                }
            }
            host.applied().to_vec()
        })
        .context("Failed to start fix host thread")?;
    Ok(FixHostHandle { tx, join })
}

impl FixHostHandle {
    /// Queue a message for the host. `false` if the host has stopped.
    pub fn dispatch(&self, message: SurfaceMessage) -> bool {
        self.tx.send(message).is_ok()
    }

    /// Stop accepting requests, let queued ones finish, and return every
    /// fix the host applied.
    pub fn shutdown(self) -> Vec<AppliedFix> {
        let FixHostHandle { tx, join } = self;
        drop(tx);
        join.join().unwrap_or_else(|_| {
            warn!("fix host thread panicked");
            Vec::new()
        })
    }
}
