//! Background texture materialization.
//!
//! Texture conversion is an injected [`TextureMaker`]. The queue runs it on a
//! worker thread and never blocks the sync pass; completed texture names are
//! picked up at the start of a later pass and turned into texture
//! invalidations on the renderer.

use std::thread::{self, JoinHandle};

use flume::{Receiver, Sender};

/// Converts every texture that needs it and returns the names it produced.
pub trait TextureMaker: Send + 'static {
    fn make_all(&mut self) -> Vec<String>;
}

enum Request {
    MakeAll,
    Shutdown,
}

pub struct TextureQueue {
    request_tx: Sender<Request>,
    done_rx: Receiver<Vec<String>>,
    worker: Option<JoinHandle<()>>,
}

impl TextureQueue {
    pub fn new(mut maker: impl TextureMaker) -> Self {
        let (request_tx, request_rx) = flume::unbounded::<Request>();
        let (done_tx, done_rx) = flume::unbounded();

        let worker = thread::Builder::new()
            .name("scenebridge-textures".into())
            .spawn(move || {
                while let Ok(request) = request_rx.recv() {
                    match request {
                        Request::MakeAll => {
                            let made = maker.make_all();
                            if done_tx.send(made).is_err() {
                                break;
                            }
                        }
                        Request::Shutdown => break,
                    }
                }
            });

        let worker = match worker {
            Ok(handle) => Some(handle),
            Err(e) => {
                log::error!("Failed to spawn texture worker: {e}");
                None
            }
        };

        Self {
            request_tx,
            done_rx,
            worker,
        }
    }

    /// Queues a full texture build. Returns immediately.
    pub fn request_make_all(&self) {
        if self.worker.is_none() || self.request_tx.send(Request::MakeAll).is_err() {
            log::warn!("Texture worker is not running; make_all request dropped");
        }
    }

    /// Texture names completed since the last call.
    pub fn drain_completed(&self) -> Vec<String> {
        let mut names = Vec::new();
        while let Ok(batch) = self.done_rx.try_recv() {
            names.extend(batch);
        }
        names
    }
}

impl Drop for TextureQueue {
    fn drop(&mut self) {
        let _ = self.request_tx.send(Request::Shutdown);
        if let Some(worker) = self.worker.take()
            && worker.join().is_err()
        {
            log::error!("Texture worker panicked");
        }
    }
}

/// A maker with nothing to convert.
pub struct NoTextures;

impl TextureMaker for NoTextures {
    fn make_all(&mut self) -> Vec<String> {
        Vec::new()
    }
}
