//! Logo uploads.
//!
//! Reading a chosen file into a data URI is the one asynchronous step of a session. Each
//! upload runs on its own worker thread and reports back over a channel; the session applies
//! completions in the order they arrive. Two overlapping uploads therefore race, and the one
//! that finishes last decides the logo, regardless of which was started first.

use std::any::Any;
use std::fs;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{channel, Receiver, Sender, TryRecvError};
use std::sync::Arc;
use std::thread;

use crate::error::UploadError;
use crate::helper::encode_data_uri;

/// Turns a picked file into a data URI.
pub trait LogoSource: Send + Sync + 'static {
    fn read_data_uri(&self, path: &Path) -> Result<String, UploadError>;
}

/// Reads logos from the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsLogoSource;

impl LogoSource for FsLogoSource {
    fn read_data_uri(&self, path: &Path) -> Result<String, UploadError> {
        let bytes = fs::read(path).map_err(|source| UploadError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        encode_data_uri(&bytes).ok_or_else(|| UploadError::NotAnImage {
            path: path.to_path_buf(),
        })
    }
}

/// Identifies one upload, in the order uploads were started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UploadTicket(pub u64);

/// The outcome of one upload.
#[derive(Debug)]
pub struct UploadCompletion {
    pub ticket: UploadTicket,
    pub path: PathBuf,
    pub result: Result<String, UploadError>,
}

/// Starts uploads and collects their completions.
pub struct LogoUploads {
    source: Arc<dyn LogoSource>,
    sender: Sender<UploadCompletion>,
    receiver: Receiver<UploadCompletion>,
    next_ticket: u64,
    pending: usize,
}

impl Default for LogoUploads {
    fn default() -> Self {
        LogoUploads::new(FsLogoSource)
    }
}

impl LogoUploads {
    pub fn new(source: impl LogoSource) -> Self {
        let (sender, receiver) = channel();
        LogoUploads {
            source: Arc::new(source),
            sender,
            receiver,
            next_ticket: 0,
            pending: 0,
        }
    }

    /// Uploads started but not yet collected.
    pub fn pending(&self) -> usize {
        self.pending
    }

    /// Starts reading `path` in the background. Not cancellable.
    pub fn begin(&mut self, path: &Path) -> UploadTicket {
        let ticket = UploadTicket(self.next_ticket);
        self.next_ticket += 1;
        self.pending += 1;

        let source = Arc::clone(&self.source);
        let sender = self.sender.clone();
        let worker_path = path.to_path_buf();
        let spawned = thread::Builder::new()
            .name(format!("logo-upload-{}", ticket.0))
            .spawn(move || {
                let result = panic::catch_unwind(AssertUnwindSafe(|| source.read_data_uri(&worker_path)))
                    .unwrap_or_else(|payload| {
                        Err(UploadError::Panicked {
                            path: worker_path.clone(),
                            message: panic_message(payload.as_ref()),
                        })
                    });
                // The receiver only goes away with the session.
                let _ = sender.send(UploadCompletion {
                    ticket,
                    path: worker_path,
                    result,
                });
            });
        if let Err(err) = spawned {
            tracing::warn!(error = %err, path = %path.display(), "failed to spawn upload worker");
            let _ = self.sender.send(UploadCompletion {
                ticket,
                path: path.to_path_buf(),
                result: Err(UploadError::Disconnected {
                    path: path.to_path_buf(),
                }),
            });
        }
        tracing::debug!(ticket = ticket.0, path = %path.display(), "logo upload started");
        ticket
    }

    /// Completions that have already arrived, in arrival order. Never blocks.
    pub fn try_completions(&mut self) -> Vec<UploadCompletion> {
        let mut done = Vec::new();
        loop {
            match self.receiver.try_recv() {
                Ok(completion) => {
                    self.pending = self.pending.saturating_sub(1);
                    done.push(completion);
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        done
    }

    /// Blocks for the next completion. Returns `None` when nothing is pending.
    pub fn wait_next(&mut self) -> Option<UploadCompletion> {
        if self.pending == 0 {
            return None;
        }
        let completion = self.receiver.recv().ok()?;
        self.pending -= 1;
        Some(completion)
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(text) = payload.downcast_ref::<&str>() {
        text.to_string()
    } else if let Some(text) = payload.downcast_ref::<String>() {
        text.clone()
    } else {
        "unknown panic".to_string()
    }
}
