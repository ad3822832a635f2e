//! Delegated bot search.
//!
//! A search request carries a full copy of the position, so the search thread
//! shares nothing with the live game. [`BotDispatcher`] keeps at most one
//! search in flight, hands out monotonically increasing tokens and drops any
//! response whose token is no longer current. When no search thread can be
//! used (it failed to start, died, or the target has no threads) the request
//! is answered synchronously on the caller's thread instead.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;

use crossbeam_channel::{Receiver, Sender, TryRecvError};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::board::Snapshot;
use crate::engine::{choose_move, choose_move_until, Difficulty};
use crate::error::WorkerError;
use crate::moves::Move;
use crate::piece::Color;

/// Message sent to the search context.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    pub request_id: u64,
    pub difficulty: Difficulty,
    pub bot_color: Color,
    /// The game's repetition table, as recorded by the board.
    #[serde(default)]
    pub repetition_counts: HashMap<String, u32>,
    pub state_snapshot: Snapshot,
}

/// Reply from the search context. `mv` is `None` when the bot has no legal
/// move or the request could not be served; `error` says which.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    pub request_id: u64,
    #[serde(rename = "move")]
    pub mv: Option<Move>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Serve one request on the current thread.
pub fn handle_request(request: &SearchRequest) -> SearchResponse {
    let mv = choose_move(
        request.state_snapshot.board(),
        request.difficulty,
        request.bot_color,
        &request.repetition_counts,
    );
    SearchResponse { request_id: request.request_id, mv, error: None }
}

/// Serve one request, giving up early once `stop` returns true.
pub fn handle_request_until(request: &SearchRequest, stop: &dyn Fn() -> bool) -> SearchResponse {
    let mv = choose_move_until(
        request.state_snapshot.board(),
        request.difficulty,
        request.bot_color,
        &request.repetition_counts,
        stop,
    );
    SearchResponse { request_id: request.request_id, mv, error: None }
}

/// Serve one JSON-encoded request and encode the reply.
///
/// Malformed input still gets a reply: `move` is null, `error` describes the
/// problem, and `requestId` is echoed when it can be recovered.
pub fn handle_request_json(text: &str) -> String {
    let response = match serde_json::from_str::<SearchRequest>(text) {
        Ok(request) => handle_request(&request),
        Err(err) => {
            let request_id = serde_json::from_str::<serde_json::Value>(text)
                .ok()
                .and_then(|value| value.get("requestId").and_then(serde_json::Value::as_u64))
                .unwrap_or(0);
            SearchResponse {
                request_id,
                mv: None,
                error: Some(WorkerError::Malformed(err).to_string()),
            }
        }
    };
    serde_json::to_string(&response).unwrap_or_else(|err| {
        format!(r#"{{"requestId":{},"move":null,"error":"{}"}}"#, response.request_id, err)
    })
}

// =============================================================================
// Search thread
// =============================================================================

/// Token of a request nobody is waiting for. Real tokens start at 1.
const NO_REQUEST: u64 = 0;

/// A dedicated thread answering [`SearchRequest`]s in order.
///
/// Only the most recently submitted request is current. Queued requests that
/// are no longer current are skipped, and a running search stops early once
/// its request is superseded or cancelled. The thread exits once the worker is
/// dropped.
pub struct SearchWorker {
    requests: Sender<SearchRequest>,
    responses: Receiver<SearchResponse>,
    current: Arc<AtomicU64>,
}

impl SearchWorker {
    pub fn spawn() -> Result<Self, WorkerError> {
        let (request_tx, request_rx) = crossbeam_channel::unbounded::<SearchRequest>();
        let (response_tx, response_rx) = crossbeam_channel::unbounded();
        let current = Arc::new(AtomicU64::new(NO_REQUEST));
        let watched = Arc::clone(&current);

        thread::Builder::new()
            .name("chess-search".to_string())
            .spawn(move || {
                for request in request_rx.iter() {
                    let id = request.request_id;
                    let superseded = || watched.load(Ordering::Acquire) != id;
                    if superseded() {
                        debug!(request_id = id, "skipping superseded search request");
                        continue;
                    }
                    let response = handle_request_until(&request, &superseded);
                    if response_tx.send(response).is_err() {
                        break;
                    }
                }
            })?;

        Ok(SearchWorker { requests: request_tx, responses: response_rx, current })
    }

    /// Queue `request` and make it the current one.
    pub fn submit(&self, request: SearchRequest) -> Result<(), WorkerError> {
        self.current.store(request.request_id, Ordering::Release);
        self.requests.send(request).map_err(|_| WorkerError::Disconnected)
    }

    /// Abandon whatever request is current.
    pub fn cancel(&self) {
        self.current.store(NO_REQUEST, Ordering::Release);
    }

    /// Next reply if one is waiting.
    pub fn try_recv(&self) -> Result<Option<SearchResponse>, WorkerError> {
        match self.responses.try_recv() {
            Ok(response) => Ok(Some(response)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(WorkerError::Disconnected),
        }
    }

    /// Block until the next reply.
    pub fn recv(&self) -> Result<SearchResponse, WorkerError> {
        self.responses.recv().map_err(|_| WorkerError::Disconnected)
    }
}

// =============================================================================
// Dispatcher
// =============================================================================

/// Token for one bot search. Only the most recent handle can yield a move.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SearchHandle(u64);

impl SearchHandle {
    pub fn token(self) -> u64 {
        self.0
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum SearchPoll {
    /// Still thinking.
    Pending,
    /// Finished; `None` means the bot had nothing to play.
    Ready(Option<Move>),
    /// The handle was cancelled, superseded or already collected.
    Stale,
}

struct PendingSearch {
    token: u64,
    request: SearchRequest,
    ready: Option<SearchResponse>,
}

pub struct BotDispatcher {
    worker: Option<SearchWorker>,
    next_token: u64,
    pending: Option<PendingSearch>,
}

impl Default for BotDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl BotDispatcher {
    /// Use a search thread where the platform has one.
    pub fn new() -> Self {
        let worker = if cfg!(target_arch = "wasm32") {
            None
        } else {
            match SearchWorker::spawn() {
                Ok(worker) => Some(worker),
                Err(err) => {
                    warn!(error = %err, "search worker unavailable, searching synchronously");
                    None
                }
            }
        };
        BotDispatcher { worker, next_token: 0, pending: None }
    }

    /// Answer every request on the caller's thread.
    pub fn synchronous() -> Self {
        BotDispatcher { worker: None, next_token: 0, pending: None }
    }

    pub fn has_worker(&self) -> bool {
        self.worker.is_some()
    }

    /// Start a search for `bot_color` on a copy of `snapshot`. Any earlier
    /// search is superseded.
    pub fn request(
        &mut self,
        snapshot: Snapshot,
        difficulty: Difficulty,
        bot_color: Color,
    ) -> SearchHandle {
        self.next_token += 1;
        let token = self.next_token;
        let request = SearchRequest {
            request_id: token,
            difficulty,
            bot_color,
            repetition_counts: snapshot.board().repetition_counts.clone(),
            state_snapshot: snapshot,
        };

        if let Some(worker) = &self.worker {
            if let Err(err) = worker.submit(request.clone()) {
                warn!(error = %err, "search worker unusable, searching synchronously");
                self.worker = None;
            }
        }
        let ready = if self.worker.is_none() {
            Some(handle_request(&request))
        } else {
            None
        };
        self.pending = Some(PendingSearch { token, request, ready });
        SearchHandle(token)
    }

    /// Void the in-flight search, if any. The search thread abandons it and
    /// any reply that still arrives is discarded.
    pub fn cancel(&mut self) {
        if let Some(pending) = self.pending.take() {
            if let Some(worker) = &self.worker {
                worker.cancel();
            }
            debug!(token = pending.token, "bot search cancelled");
        }
    }

    pub fn is_current(&self, handle: SearchHandle) -> bool {
        self.pending.as_ref().is_some_and(|p| p.token == handle.0)
    }

    /// Check for a result without blocking.
    pub fn poll(&mut self, handle: SearchHandle) -> SearchPoll {
        self.collect(handle, false)
    }

    /// Block until the search for `handle` finishes.
    pub fn wait(&mut self, handle: SearchHandle) -> SearchPoll {
        self.collect(handle, true)
    }

    fn collect(&mut self, handle: SearchHandle, block: bool) -> SearchPoll {
        if !self.is_current(handle) {
            return SearchPoll::Stale;
        }
        loop {
            let ready = self.pending.as_mut().and_then(|p| p.ready.take());
            if let Some(response) = ready {
                self.pending = None;
                return SearchPoll::Ready(response.mv);
            }

            let Some(worker) = &self.worker else {
                self.answer_locally();
                continue;
            };
            let received = if block {
                worker.recv().map(Some)
            } else {
                worker.try_recv()
            };
            match received {
                Ok(Some(response)) => self.accept(response),
                Ok(None) => return SearchPoll::Pending,
                Err(err) => {
                    warn!(error = %err, "search worker lost, searching synchronously");
                    self.worker = None;
                }
            }
        }
    }

    fn accept(&mut self, response: SearchResponse) {
        match self.pending.as_mut() {
            Some(pending) if pending.token == response.request_id => {
                if let Some(error) = &response.error {
                    warn!(%error, "search worker failed, searching synchronously");
                    pending.ready = Some(handle_request(&pending.request));
                } else {
                    pending.ready = Some(response);
                }
            }
            _ => debug!(request_id = response.request_id, "discarding stale search response"),
        }
    }

    fn answer_locally(&mut self) {
        if let Some(pending) = self.pending.as_mut() {
            if pending.ready.is_none() {
                pending.ready = Some(handle_request(&pending.request));
            }
        }
    }
}
