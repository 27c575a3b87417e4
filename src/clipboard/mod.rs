//! Clipboard access for the `copy` action.

use std::fmt::Debug;
use std::sync::{mpsc, Mutex, PoisonError};

use crate::errors::{KeydashError, Result};

/// Something that can receive copied text.
pub trait Clipboard: Send + Sync + Debug {
    fn write_text(&self, text: &str) -> Result<()>;
}

/// The system clipboard via `arboard`.
///
/// The arboard handle lives on its own thread for the lifetime of this
/// value: on X11 copied text is only served while the handle is alive,
/// and the handle is not `Send` on every platform.
#[derive(Default)]
pub struct SystemClipboard {
    worker: Mutex<Option<mpsc::Sender<ClipboardJob>>>,
}

type ClipboardJob = (String, mpsc::Sender<std::result::Result<(), String>>);

impl SystemClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    fn spawn_worker() -> mpsc::Sender<ClipboardJob> {
        let (jobs, rx) = mpsc::channel::<ClipboardJob>();
        std::thread::spawn(move || {
            let mut handle: Option<arboard::Clipboard> = None;
            for (text, reply) in rx {
                if handle.is_none() {
                    match arboard::Clipboard::new() {
                        Ok(clipboard) => handle = Some(clipboard),
                        Err(e) => {
                            let _ = reply.send(Err(e.to_string()));
                            continue;
                        }
                    }
                }
                let result = match handle.as_mut() {
                    Some(clipboard) => clipboard.set_text(text).map_err(|e| e.to_string()),
                    None => Err("clipboard unavailable".to_string()),
                };
                let _ = reply.send(result);
            }
        });
        jobs
    }
}

impl Debug for SystemClipboard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SystemClipboard").finish_non_exhaustive()
    }
}

impl Clipboard for SystemClipboard {
    fn write_text(&self, text: &str) -> Result<()> {
        let (reply, response) = mpsc::channel();
        {
            let mut worker = self.worker.lock().unwrap_or_else(PoisonError::into_inner);
            let jobs = worker.get_or_insert_with(Self::spawn_worker);
            jobs.send((text.to_string(), reply))
                .map_err(|_| KeydashError::Clipboard("clipboard worker stopped".into()))?;
        }

        match response.recv() {
            Ok(result) => result.map_err(KeydashError::Clipboard),
            Err(_) => Err(KeydashError::Clipboard("clipboard worker stopped".into())),
        }
    }
}

/// Clipboard that remembers what was copied. Handy for tests and for
/// headless sessions where no system clipboard exists.
#[derive(Debug, Default)]
pub struct MemoryClipboard {
    contents: Mutex<Option<String>>,
}

impl MemoryClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> Option<String> {
        self.contents
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Clipboard for MemoryClipboard {
    fn write_text(&self, text: &str) -> Result<()> {
        *self.contents.lock().unwrap_or_else(PoisonError::into_inner) = Some(text.to_string());
        Ok(())
    }
}
