//! Server access: request/reply over HTTP, or a persistent WebSocket that
//! can also push map data.

use super::{ChatReply, ChatRequest};
use crate::error::{Error, Result};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::{BTreeMap, VecDeque};
use std::io::ErrorKind;
use std::net::TcpStream;
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;
use tracing::{debug, info, trace, warn};
use tungstenite::stream::MaybeTlsStream;
use tungstenite::{Message, WebSocket};

/// How long the connection thread blocks in a read before checking for
/// queued requests
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Server access used by the widget.
///
/// Implementations are called from background jobs, never from the UI
/// thread.
pub trait Transport: Send + Sync {
    /// Send one chat message and wait for the reply
    fn send_chat(&self, request: &ChatRequest) -> Result<ChatReply>;

    /// Fetch the GeoJSON document as text
    fn fetch_geojson(&self) -> Result<String>;

    /// GeoJSON documents the server pushed since the last call
    fn take_pushed(&self) -> Vec<String> {
        Vec::new()
    }
}

/// Blocking reqwest client against `{base_url}/api/chat` and
/// `{base_url}/api/geojson`.
#[derive(Clone)]
pub struct HttpTransport {
    client: reqwest::blocking::Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl Transport for HttpTransport {
    fn send_chat(&self, request: &ChatRequest) -> Result<ChatReply> {
        let url = self.url("/api/chat");
        trace!(%url, "POST chat");
        let response = self
            .client
            .post(&url)
            .json(request)
            .send()?
            .error_for_status()?;
        Ok(response.json::<ChatReply>()?)
    }

    fn fetch_geojson(&self) -> Result<String> {
        let url = self.url("/api/geojson");
        debug!(%url, "GET geojson");
        let response = self
            .client
            .get(&url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .send()?;
        if !response.status().is_success() {
            return Err(Error::Transport(format!(
                "server answered {}",
                response.status()
            )));
        }
        Ok(response.text()?)
    }
}

/// One frame sent by the server over the WebSocket.
///
/// A request produces any number of frames: progress statuses, map data,
/// then the answer. An error is a status starting with `Error: `.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ServerFrame {
    status: String,
    response: String,
    /// Older servers send the answer here
    answer: String,
    #[serde(rename = "geoJSON")]
    geojson: Option<Value>,
    geo_objects: BTreeMap<String, GeoObject>,
    interrupted: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct GeoObject {
    features: Value,
}

impl ServerFrame {
    fn parse(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| Error::Transport(format!("bad frame: {}", e)))
    }

    /// Reply to the oldest waiting request, if this frame ends it
    fn reply(&self) -> Option<Result<ChatReply>> {
        if let Some(reason) = self.status.strip_prefix("Error: ") {
            return Some(Err(Error::Transport(reason.to_string())));
        }
        let text = if !self.response.is_empty() {
            &self.response
        } else if !self.answer.is_empty() {
            &self.answer
        } else if self.interrupted {
            &self.status
        } else {
            return None;
        };
        Some(Ok(ChatReply {
            response: text.clone(),
        }))
    }

    /// Map data carried by this frame: the raw document if present,
    /// otherwise every `geo_objects` feature in one collection
    fn geojson_document(&self) -> Option<String> {
        if let Some(doc) = self.geojson.as_ref().filter(|v| !v.is_null()) {
            return Some(doc.to_string());
        }
        let features: Vec<&Value> = self
            .geo_objects
            .values()
            .filter_map(|object| object.features.as_array())
            .flatten()
            .collect();
        if features.is_empty() {
            return None;
        }
        Some(json!({"type": "FeatureCollection", "features": features}).to_string())
    }
}

/// Chat request handed to the connection thread
struct Outgoing {
    request: ChatRequest,
    reply: Sender<Result<ChatReply>>,
}

/// Chat over a persistent WebSocket (`ws://host/ws`).
///
/// A background thread owns the socket. Replies are matched to requests in
/// the order they were sent; map data pushed by the server is queued for
/// [`Transport::take_pushed`]. The initial document is still fetched over
/// HTTP.
pub struct WsTransport {
    http: HttpTransport,
    outgoing: Sender<Outgoing>,
    pushed: Arc<Mutex<Vec<String>>>,
    timeout: Duration,
}

impl WsTransport {
    pub fn connect(url: &str, http: HttpTransport, timeout: Duration) -> Result<Self> {
        let (mut socket, _response) = tungstenite::connect(url)?;
        if let MaybeTlsStream::Plain(stream) = socket.get_mut() {
            stream
                .set_read_timeout(Some(POLL_INTERVAL))
                .map_err(|e| Error::Transport(e.to_string()))?;
        }
        info!(%url, "websocket connected");

        let (outgoing, requests) = mpsc::channel();
        let pushed = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&pushed);
        thread::Builder::new()
            .name("websocket".into())
            .spawn(move || run_connection(socket, requests, sink))
            .map_err(|e| Error::Transport(e.to_string()))?;

        Ok(Self {
            http,
            outgoing,
            pushed,
            timeout,
        })
    }
}

impl Transport for WsTransport {
    fn send_chat(&self, request: &ChatRequest) -> Result<ChatReply> {
        let (reply, answer) = mpsc::channel();
        self.outgoing
            .send(Outgoing {
                request: request.clone(),
                reply,
            })
            .map_err(|_| Error::Transport("websocket closed".into()))?;
        answer
            .recv_timeout(self.timeout)
            .map_err(|_| Error::Transport("no reply over websocket".into()))?
    }

    fn fetch_geojson(&self) -> Result<String> {
        self.http.fetch_geojson()
    }

    fn take_pushed(&self) -> Vec<String> {
        let mut pushed = self.pushed.lock().unwrap_or_else(|e| e.into_inner());
        std::mem::take(&mut *pushed)
    }
}

fn fail_all(waiting: &mut VecDeque<Sender<Result<ChatReply>>>, reason: &str) {
    for reply in waiting.drain(..) {
        let _ = reply.send(Err(Error::Transport(reason.to_string())));
    }
}

/// Connection thread: write queued requests, read frames, route replies
fn run_connection(
    mut socket: WebSocket<MaybeTlsStream<TcpStream>>,
    requests: Receiver<Outgoing>,
    pushed: Arc<Mutex<Vec<String>>>,
) {
    let mut waiting: VecDeque<Sender<Result<ChatReply>>> = VecDeque::new();
    loop {
        loop {
            match requests.try_recv() {
                Ok(out) => {
                    let sent = serde_json::to_string(&out.request)
                        .map_err(|e| Error::Transport(e.to_string()))
                        .and_then(|text| socket.send(Message::text(text)).map_err(Error::from));
                    match sent {
                        Ok(()) => waiting.push_back(out.reply),
                        Err(e) => {
                            let _ = out.reply.send(Err(e));
                        }
                    }
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    debug!("websocket transport dropped, closing");
                    let _ = socket.close(None);
                    let _ = socket.flush();
                    return;
                }
            }
        }

        match socket.read() {
            Ok(message) if message.is_text() => {
                let frame = match message.to_text().map_err(Error::from).and_then(ServerFrame::parse) {
                    Ok(frame) => frame,
                    Err(e) => {
                        warn!(error = %e, "ignoring websocket frame");
                        continue;
                    }
                };
                if let Some(doc) = frame.geojson_document() {
                    debug!(bytes = doc.len(), "map data pushed");
                    pushed.lock().unwrap_or_else(|e| e.into_inner()).push(doc);
                }
                match frame.reply() {
                    Some(result) => match waiting.pop_front() {
                        Some(reply) => {
                            let _ = reply.send(result);
                        }
                        None => debug!("reply with no waiting request"),
                    },
                    None if !frame.status.is_empty() => trace!(status = %frame.status, "progress"),
                    None => {}
                }
            }
            Ok(Message::Close(_)) => {
                info!("websocket closed by server");
                fail_all(&mut waiting, "websocket closed");
                return;
            }
            Ok(_) => {}
            Err(tungstenite::Error::Io(e))
                if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {}
            Err(e) => {
                warn!(error = %e, "websocket failed");
                fail_all(&mut waiting, &e.to_string());
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_join() {
        let t = HttpTransport::new("http://localhost:4000/", Duration::from_secs(1)).unwrap();
        assert_eq!(t.url("/api/chat"), "http://localhost:4000/api/chat");
    }

    #[test]
    fn test_unreachable_server_is_transport_error() {
        // Port 9 (discard) on localhost is not expected to run an HTTP server
        let t = HttpTransport::new("http://127.0.0.1:9", Duration::from_millis(500)).unwrap();
        let err = t
            .send_chat(&ChatRequest {
                message: "hello".into(),
            })
            .unwrap_err();
        assert!(matches!(err, Error::Transport(_)));
    }

    #[test]
    fn test_transport_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<HttpTransport>();
        assert_send_sync::<WsTransport>();
    }

    #[test]
    fn test_frame_reply() {
        let frame = ServerFrame::parse(r#"{"status":"Processing..."}"#).unwrap();
        assert!(frame.reply().is_none());
        assert!(frame.geojson_document().is_none());

        let frame = ServerFrame::parse(r#"{"answer":"old","response":"new"}"#).unwrap();
        assert_eq!(frame.reply().unwrap().unwrap().response, "new");

        let frame = ServerFrame::parse(r#"{"answer":"only answer"}"#).unwrap();
        assert_eq!(frame.reply().unwrap().unwrap().response, "only answer");

        let frame = ServerFrame::parse(r#"{"status":"Error: upstream down"}"#).unwrap();
        assert_eq!(
            frame.reply().unwrap().unwrap_err(),
            Error::Transport("upstream down".into())
        );

        let frame = ServerFrame::parse(
            r#"{"status":"Generation interrupted by user.","interrupted":true}"#,
        )
        .unwrap();
        assert_eq!(
            frame.reply().unwrap().unwrap().response,
            "Generation interrupted by user."
        );
    }

    #[test]
    fn test_frame_merges_geo_objects() {
        let frame = ServerFrame::parse(
            r#"{"geo_objects":{
                "points":{"type":"FeatureCollection","features":[
                    {"type":"Feature","properties":{},"geometry":{"type":"Point","coordinates":[1,2]}}]},
                "lines":{"type":"FeatureCollection","features":[
                    {"type":"Feature","properties":{},"geometry":{"type":"LineString","coordinates":[[0,0],[1,1]]}},
                    {"type":"Feature","properties":{},"geometry":{"type":"Point","coordinates":[3,4]}}]},
                "broken":{"type":"FeatureCollection","features":null}}}"#,
        )
        .unwrap();
        let doc: Value = serde_json::from_str(&frame.geojson_document().unwrap()).unwrap();
        assert_eq!(doc["type"], "FeatureCollection");
        assert_eq!(doc["features"].as_array().unwrap().len(), 3);

        // A raw document takes precedence
        let frame = ServerFrame::parse(
            r#"{"geoJSON":{"type":"FeatureCollection","features":[]},"geo_objects":{}}"#,
        )
        .unwrap();
        let doc: Value = serde_json::from_str(&frame.geojson_document().unwrap()).unwrap();
        assert_eq!(doc, json!({"type": "FeatureCollection", "features": []}));
    }

    /// Local WebSocket server running `script` against the first client
    fn serve(script: fn(&mut WebSocket<TcpStream>)) -> (String, thread::JoinHandle<()>) {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("ws://{}/ws", listener.local_addr().unwrap());
        let handle = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut ws = tungstenite::accept(stream).unwrap();
            script(&mut ws);
            // Wait for the client to hang up
            while ws.read().is_ok() {}
        });
        (url, handle)
    }

    fn http() -> HttpTransport {
        HttpTransport::new("http://127.0.0.1:9", Duration::from_millis(500)).unwrap()
    }

    #[test]
    fn test_ws_reply_and_pushed_map_data() {
        let (url, server) = serve(|ws| {
            let request = ws.read().unwrap();
            let request: Value = serde_json::from_str(request.to_text().unwrap()).unwrap();
            assert_eq!(request["message"], "where is the river?");

            ws.send(Message::text(r#"{"status":"Processing..."}"#)).unwrap();
            ws.send(Message::text(
                r#"{"geo_objects":{"rivers":{"type":"FeatureCollection","features":[
                    {"type":"Feature","properties":{"name":"Dijle"},
                     "geometry":{"type":"LineString","coordinates":[[4.5,50.8],[4.7,50.9]]}}]}}}"#,
            ))
            .unwrap();
            ws.send(Message::text(r#"{"status":"Done","response":"Here it is."}"#))
                .unwrap();
        });

        let transport = WsTransport::connect(&url, http(), Duration::from_secs(5)).unwrap();
        let reply = transport
            .send_chat(&ChatRequest {
                message: "where is the river?".into(),
            })
            .unwrap();
        assert_eq!(reply.response, "Here it is.");

        let pushed = transport.take_pushed();
        assert_eq!(pushed.len(), 1);
        assert!(pushed[0].contains("Dijle"));
        assert!(transport.take_pushed().is_empty());

        drop(transport);
        server.join().unwrap();
    }

    #[test]
    fn test_ws_error_status_fails_request() {
        let (url, server) = serve(|ws| {
            ws.read().unwrap();
            ws.send(Message::text(r#"{"status":"Error: model unavailable"}"#))
                .unwrap();
        });

        let transport = WsTransport::connect(&url, http(), Duration::from_secs(5)).unwrap();
        let err = transport
            .send_chat(&ChatRequest {
                message: "hello".into(),
            })
            .unwrap_err();
        assert_eq!(err, Error::Transport("model unavailable".into()));

        drop(transport);
        server.join().unwrap();
    }

    #[test]
    fn test_ws_server_hangup_fails_waiting_request() {
        let (url, server) = serve(|ws| {
            ws.read().unwrap();
            let _ = ws.close(None);
            let _ = ws.flush();
        });

        let transport = WsTransport::connect(&url, http(), Duration::from_secs(5)).unwrap();
        let err = transport
            .send_chat(&ChatRequest {
                message: "hello".into(),
            })
            .unwrap_err();
        assert!(matches!(err, Error::Transport(_)));
        server.join().unwrap();
    }

    #[test]
    fn test_ws_connect_refused() {
        let err = WsTransport::connect("ws://127.0.0.1:9/ws", http(), Duration::from_secs(1))
            .err()
            .unwrap();
        assert!(matches!(err, Error::Transport(_)));
    }
}
