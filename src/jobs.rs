//! Background network jobs.
//!
//! Requests run on the rayon pool and report back over a channel that the
//! UI loop drains between input events, so all widget state is still only
//! touched from one thread.

use crate::chat::{ChatReply, ChatRequest, Ticket, Transport};
use crate::error::{Error, Result};
use serde_json::json;
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use tracing::{debug, trace};

/// Where map data comes from
#[derive(Debug, Clone, PartialEq)]
pub enum GeoJsonSource {
    File(PathBuf),
    Server,
    /// Built-in sample document
    Fallback,
}

/// Finished job
#[derive(Debug)]
pub enum JobOutcome {
    Chat {
        ticket: Ticket,
        result: Result<ChatReply>,
    },
    GeoJson {
        seq: u64,
        result: Result<String>,
    },
}

pub struct Jobs {
    transport: Arc<dyn Transport>,
    tx: Sender<JobOutcome>,
    rx: Receiver<JobOutcome>,
    geojson_seq: u64,
}

impl Jobs {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            transport,
            tx,
            rx,
            geojson_seq: 0,
        }
    }

    pub fn submit_chat(&self, ticket: Ticket, request: ChatRequest) {
        let transport = Arc::clone(&self.transport);
        let tx = self.tx.clone();
        rayon::spawn(move || {
            let result = transport.send_chat(&request);
            // Receiver gone means the app is shutting down
            let _ = tx.send(JobOutcome::Chat { ticket, result });
        });
    }

    /// Start loading map data; returns the request's sequence number
    pub fn request_geojson(&mut self, source: GeoJsonSource) -> u64 {
        self.geojson_seq += 1;
        let seq = self.geojson_seq;
        let transport = Arc::clone(&self.transport);
        let tx = self.tx.clone();
        debug!(seq, ?source, "GeoJSON requested");

        rayon::spawn(move || {
            let result = match source {
                GeoJsonSource::File(path) => std::fs::read_to_string(&path)
                    .map_err(|e| Error::Transport(format!("{}: {}", path.display(), e))),
                GeoJsonSource::Server => transport.fetch_geojson(),
                GeoJsonSource::Fallback => Ok(fallback_geojson().to_string()),
            };
            let _ = tx.send(JobOutcome::GeoJson { seq, result });
        });
        seq
    }

    /// True when `seq` is the most recent map data request
    pub fn is_latest_geojson(&self, seq: u64) -> bool {
        seq == self.geojson_seq
    }

    /// Finished jobs, without blocking. Map data the server pushed counts
    /// as the newest load and supersedes any request still in flight.
    pub fn poll(&mut self) -> Vec<JobOutcome> {
        let mut outcomes: Vec<_> = self.rx.try_iter().collect();
        for doc in self.transport.take_pushed() {
            self.geojson_seq += 1;
            debug!(seq = self.geojson_seq, "pushed map data");
            outcomes.push(JobOutcome::GeoJson {
                seq: self.geojson_seq,
                result: Ok(doc),
            });
        }
        if !outcomes.is_empty() {
            trace!(count = outcomes.len(), "jobs finished");
        }
        outcomes
    }

    /// Block until one job finishes or `timeout` passes
    #[cfg(test)]
    pub fn wait(&self, timeout: std::time::Duration) -> Option<JobOutcome> {
        self.rx.recv_timeout(timeout).ok()
    }
}

/// Sample document with one point, one polygon and one line
pub fn fallback_geojson() -> serde_json::Value {
    json!({
        "type": "FeatureCollection",
        "features": [
            {
                "type": "Feature",
                "properties": {
                    "name": "Example Point",
                    "type": "point_of_interest",
                    "description": "This is a fallback point feature"
                },
                "geometry": {"type": "Point", "coordinates": [0.0, 0.0]}
            },
            {
                "type": "Feature",
                "properties": {
                    "name": "Example Polygon",
                    "type": "area",
                    "description": "This is a fallback polygon feature"
                },
                "geometry": {
                    "type": "Polygon",
                    "coordinates": [[[-5.0, -5.0], [-5.0, 5.0], [5.0, 5.0], [5.0, -5.0], [-5.0, -5.0]]]
                }
            },
            {
                "type": "Feature",
                "properties": {
                    "name": "Example LineString",
                    "type": "river",
                    "description": "This is a fallback line feature"
                },
                "geometry": {
                    "type": "LineString",
                    "coordinates": [[-10.0, 0.0], [-5.0, 2.0], [0.0, 0.0], [5.0, -2.0], [10.0, 0.0]]
                }
            }
        ]
    })
}
