//! mpv-backed media engine: one mpv process per pipeline, JSON-lines IPC
//! over a per-pipeline Unix socket.
//!
//! IPC model:
//!
//! ```text
//!   create_pipeline()
//!         │
//!         ├── writer task  ← receives requests via mpsc, registers the
//!         │                  reply channel in the pending map, writes line
//!         └── reader task  ← reads JSON lines from the socket
//!                               ├── has request_id → matched oneshot reply
//!                               └── otherwise      → raw bus event channel
//! ```
//!
//! There is no reconnection or health machinery: a pipeline that dies is
//! terminal for its session and a fresh one is built on the next start.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixStream;
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use streamdot_core::engine::{
    EngineEvent, MediaEngine, PipelineState, Subscription, SubscriptionId,
};
use streamdot_core::error::EngineError;
use streamdot_core::platform;

static NEXT_REQ_ID: AtomicU64 = AtomicU64::new(1);

/// observe_property id for `core-idle` (false while audio is flowing).
const OBS_CORE_IDLE: u64 = 1;

const IPC_TIMEOUT: Duration = Duration::from_secs(5);

type PendingMap = Arc<Mutex<HashMap<u64, oneshot::Sender<Result<Value, EngineError>>>>>;

struct PendingRequest {
    req_id: u64,
    payload: String, // serialised JSON line, '\n' included
    reply: oneshot::Sender<Result<Value, EngineError>>,
}

fn frame_request(req_id: u64, command: &Value) -> String {
    let mut raw = json!({ "command": command, "request_id": req_id }).to_string();
    raw.push('\n');
    raw
}

/// Handle to the writer task of one pipeline's IPC connection.
#[derive(Clone)]
struct IpcHandle {
    tx: mpsc::Sender<PendingRequest>,
}

impl IpcHandle {
    async fn send(&self, command: Value) -> Result<Value, EngineError> {
        let req_id = NEXT_REQ_ID.fetch_add(1, Ordering::Relaxed);
        let payload = frame_request(req_id, &command);
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(PendingRequest {
                req_id,
                payload,
                reply: reply_tx,
            })
            .await
            .map_err(|_| EngineError::Command("mpv writer task gone".into()))?;

        tokio::time::timeout(IPC_TIMEOUT, reply_rx)
            .await
            .map_err(|_| EngineError::Command(format!("mpv IPC timeout for req={req_id}")))?
            .map_err(|_| EngineError::Command(format!("mpv reply channel dropped req={req_id}")))?
    }
}

/// One mpv process primed with a single URL.
pub struct MpvPipeline {
    child: tokio::process::Child,
    ipc: IpcHandle,
    socket_path: PathBuf,
    /// Raw bus events; taken by `subscribe`.
    raw_events: Option<mpsc::Receiver<Value>>,
}

/// `MediaEngine` backed by mpv subprocesses.
pub struct MpvEngine {
    binary: String,
    forwarders: HashMap<SubscriptionId, JoinHandle<()>>,
}

impl MpvEngine {
    pub fn new(binary: String) -> Self {
        Self {
            binary,
            forwarders: HashMap::new(),
        }
    }
}

impl MediaEngine for MpvEngine {
    type Pipeline = MpvPipeline;

    async fn create_pipeline(&mut self, url: &str) -> Result<MpvPipeline, EngineError> {
        let socket_path = platform::pipeline_socket_path();
        let _ = tokio::fs::remove_file(&socket_path).await;

        info!("mpv: spawning pipeline for {url}");
        let mut child = tokio::process::Command::new(&self.binary)
            .arg("--no-video")
            .arg("--pause")
            .arg("--quiet")
            .arg(format!("--input-ipc-server={}", socket_path.display()))
            .arg(url)
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .spawn()
            .map_err(|e| {
                EngineError::PipelineCreation(format!("failed to spawn {}: {e}", self.binary))
            })?;

        // Wait for the IPC socket to appear and accept a connection.
        let mut connected = None;
        for _ in 0..50 {
            tokio::time::sleep(Duration::from_millis(100)).await;
            if !socket_path.exists() {
                continue;
            }
            if let Ok(stream) = UnixStream::connect(&socket_path).await {
                connected = Some(stream);
                break;
            }
        }
        let Some(stream) = connected else {
            let _ = child.kill().await;
            let _ = tokio::fs::remove_file(&socket_path).await;
            return Err(EngineError::PipelineCreation(
                "mpv IPC socket did not appear".into(),
            ));
        };
        debug!("mpv: connected to IPC socket {}", socket_path.display());

        let (raw_tx, raw_rx) = mpsc::channel::<Value>(64);
        let ipc = start_io_tasks(stream, raw_tx);

        // core-idle flips to false once audio actually flows; the bus turns
        // that into a state-change report.
        if let Err(e) = ipc
            .send(json!(["observe_property", OBS_CORE_IDLE, "core-idle"]))
            .await
        {
            warn!("mpv: observe_property core-idle failed: {e}");
        }

        Ok(MpvPipeline {
            child,
            ipc,
            socket_path,
            raw_events: Some(raw_rx),
        })
    }

    fn subscribe(
        &mut self,
        pipeline: &mut MpvPipeline,
        events: mpsc::Sender<(SubscriptionId, EngineEvent)>,
    ) -> Subscription {
        let subscription = Subscription::new();
        let id = subscription.id();
        match pipeline.raw_events.take() {
            Some(mut raw) => {
                let handle = tokio::spawn(async move {
                    while let Some(value) = raw.recv().await {
                        let Some(event) = map_event(&value) else {
                            continue;
                        };
                        if events.send((id, event)).await.is_err() {
                            break;
                        }
                    }
                    debug!("mpv: bus forwarder {id} exiting");
                });
                self.forwarders.insert(id, handle);
            }
            None => warn!("mpv: pipeline bus already subscribed"),
        }
        subscription
    }

    fn unsubscribe(&mut self, subscription: Subscription) {
        if let Some(handle) = self.forwarders.remove(&subscription.id()) {
            handle.abort();
        }
    }

    async fn set_playing(&mut self, pipeline: &MpvPipeline) -> Result<(), EngineError> {
        pipeline
            .ipc
            .send(json!(["set_property", "pause", false]))
            .await?;
        Ok(())
    }

    async fn release(&mut self, mut pipeline: MpvPipeline) {
        info!("mpv: releasing pipeline");
        if let Err(e) = pipeline.child.kill().await {
            debug!("mpv: kill failed (already exited?): {e}");
        }
        let _ = tokio::fs::remove_file(&pipeline.socket_path).await;
    }
}

fn start_io_tasks(stream: UnixStream, raw_tx: mpsc::Sender<Value>) -> IpcHandle {
    let (read_half, write_half) = stream.into_split();
    let reader = BufReader::new(read_half);

    // pending map: req_id → reply channel. Writer inserts, reader resolves.
    let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));
    let (cmd_tx, cmd_rx) = mpsc::channel::<PendingRequest>(64);

    tokio::spawn(writer_task(write_half, cmd_rx, pending.clone()));
    tokio::spawn(reader_task(reader, pending, raw_tx));

    IpcHandle { tx: cmd_tx }
}

async fn reader_task<R>(mut reader: BufReader<R>, pending: PendingMap, raw_tx: mpsc::Sender<Value>)
where
    R: tokio::io::AsyncRead + Unpin,
{
    let mut line = String::new();
    loop {
        line.clear();
        match reader.read_line(&mut line).await {
            Ok(0) => {
                debug!("mpv reader: connection closed");
                let mut map = pending.lock().await;
                for (_, tx) in map.drain() {
                    let _ = tx.send(Err(EngineError::Command("mpv IPC connection closed".into())));
                }
                break;
            }
            Ok(_) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                let val: Value = match serde_json::from_str(trimmed) {
                    Ok(v) => v,
                    Err(e) => {
                        debug!("mpv reader: invalid json '{trimmed}': {e}");
                        continue;
                    }
                };

                if let Some(req_id) = val.get("request_id").and_then(Value::as_u64) {
                    let mut map = pending.lock().await;
                    if let Some(tx) = map.remove(&req_id) {
                        let result = if val["error"].as_str() == Some("success") {
                            Ok(val)
                        } else {
                            let err = val["error"].as_str().unwrap_or("unknown error");
                            Err(EngineError::Command(format!("mpv error: {err}")))
                        };
                        let _ = tx.send(result);
                    } else {
                        debug!("mpv reader: response for unknown req={req_id}");
                    }
                } else {
                    // Unsolicited bus event / property-change
                    if raw_tx.send(val).await.is_err() {
                        break;
                    }
                }
            }
            Err(e) => {
                warn!("mpv reader: read error: {e}");
                let mut map = pending.lock().await;
                for (_, tx) in map.drain() {
                    let _ = tx.send(Err(EngineError::Command(format!("mpv IPC read error: {e}"))));
                }
                break;
            }
        }
    }
}

async fn writer_task<W>(mut writer: W, mut rx: mpsc::Receiver<PendingRequest>, pending: PendingMap)
where
    W: tokio::io::AsyncWrite + Unpin,
{
    while let Some(req) = rx.recv().await {
        // Register the reply channel before writing so the reader can match it.
        {
            let mut map = pending.lock().await;
            map.insert(req.req_id, req.reply);
        }
        if let Err(e) = writer.write_all(req.payload.as_bytes()).await {
            warn!("mpv writer: write error: {e}");
            let mut map = pending.lock().await;
            if let Some(tx) = map.remove(&req.req_id) {
                let _ = tx.send(Err(EngineError::Command(format!("mpv write error: {e}"))));
            }
            break;
        }
    }
    debug!("mpv writer: task exiting");
}

/// Map one raw mpv bus message onto the engine event vocabulary. Anything
/// the playback session does not care about maps to `None`.
fn map_event(raw: &Value) -> Option<EngineEvent> {
    match raw.get("event")?.as_str()? {
        "end-file" => {
            let reason = raw.get("reason").and_then(Value::as_str).unwrap_or("eof");
            if reason == "error" {
                let message = raw
                    .get("file_error")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown error")
                    .to_string();
                Some(EngineEvent::Error {
                    message,
                    detail: format!("end-file reason={reason}"),
                })
            } else {
                Some(EngineEvent::EndOfStream)
            }
        }
        "property-change" => {
            if raw.get("id")?.as_u64()? != OBS_CORE_IDLE {
                return None;
            }
            let idle = raw.get("data").and_then(Value::as_bool)?;
            let (old, new) = if idle {
                (PipelineState::Playing, PipelineState::Paused)
            } else {
                (PipelineState::Paused, PipelineState::Playing)
            };
            Some(EngineEvent::StateChanged {
                old,
                new,
                pending: new,
            })
        }
        _ => None,
    }
}
