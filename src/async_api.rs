use crate::{Error, ExportConfig, ExportOutput, Exporter, Result};
use crate::rendering::Rasterizer;
use std::sync::mpsc::{self, Sender};
use std::thread;
use tokio::sync::oneshot;

enum Command {
    Export(String, oneshot::Sender<Result<ExportOutput>>),
    Close(oneshot::Sender<Result<()>>),
}

/// An async-friendly exporter backed by a dedicated worker thread.
///
/// The worker thread owns the `Exporter` (and its rasterizer, which may hold a
/// browser) and runs exports one after another in submission order, so async
/// callers never block their runtime on rasterization or PDF encoding.
#[derive(Clone)]
pub struct ExportWorker {
    cmd_tx: Sender<Command>,
}

impl ExportWorker {
    /// Spawn the worker thread with the given configuration.
    pub async fn new(config: ExportConfig) -> Result<Self> {
        Self::spawn(config, None).await
    }

    /// Spawn the worker thread with an explicit rasterizer.
    pub async fn with_rasterizer<R>(config: ExportConfig, rasterizer: R) -> Result<Self>
    where
        R: Rasterizer + Send + 'static,
    {
        Self::spawn(config, Some(Box::new(rasterizer))).await
    }

    async fn spawn(config: ExportConfig, rasterizer: Option<Box<dyn Rasterizer + Send>>) -> Result<Self> {
        let (cmd_tx, cmd_rx) = mpsc::channel::<Command>();
        let (init_tx, init_rx): (oneshot::Sender<Result<()>>, oneshot::Receiver<Result<()>>) =
            oneshot::channel();

        thread::spawn(move || {
            // Initialize exporter on the worker thread
            let exporter = match Exporter::new(config) {
                Ok(e) => match rasterizer {
                    Some(r) => e.with_rasterizer(BoxedRasterizer(r)),
                    None => e,
                },
                Err(err) => {
                    let _ = init_tx.send(Err(err));
                    return;
                }
            };
            let _ = init_tx.send(Ok(()));

            while let Ok(cmd) = cmd_rx.recv() {
                match cmd {
                    Command::Export(html, resp) => {
                        let _ = resp.send(exporter.export(&html));
                    }
                    Command::Close(resp) => {
                        let _ = resp.send(Ok(()));
                        break;
                    }
                }
            }
            log::debug!("export worker stopped");
        });

        init_rx
            .await
            .map_err(|_| Error::Other("export worker failed to start".into()))??;
        Ok(Self { cmd_tx })
    }

    /// Queue an export and wait for its result.
    pub async fn export(&self, html: impl Into<String>) -> Result<ExportOutput> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::Export(html.into(), tx))
            .map_err(|_| Error::Other("export worker has stopped".into()))?;
        rx.await.map_err(|_| Error::Other("export worker dropped the request".into()))?
    }

    /// Stop the worker thread after pending exports finish.
    pub async fn close(self) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::Close(tx))
            .map_err(|_| Error::Other("export worker has stopped".into()))?;
        rx.await.map_err(|_| Error::Other("export worker dropped the request".into()))?
    }
}

/// Adapter so an already boxed rasterizer can be handed to `Exporter`
struct BoxedRasterizer(Box<dyn Rasterizer + Send>);

impl Rasterizer for BoxedRasterizer {
    fn rasterize(&mut self, document_html: &str, width: u32, scale: f32) -> Result<crate::rendering::Screenshot> {
        self.0.rasterize(document_html, width, scale)
    }
}
