//! Thread-backed geometry worker.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use rustc_hash::{FxHashMap, FxHashSet};
use tessera_config::WorkerConfig;
use tracing::{debug, info, trace};

use crate::error::WorkerError;
use crate::handler::handle_request;
use crate::protocol::{RequestId, WorkerRequest, WorkerResponse};

/// Stack for each worker thread.
const WORKER_STACK_SIZE: usize = 8 * 1024 * 1024;

/// Runs requests on dedicated threads.
///
/// Requests and responses move through channels by value, so vertex buffers
/// change owner without being copied. Responses come back in completion
/// order; [`request`](Self::request) waits for a specific id and parks any
/// other responses it sees until they are drained.
pub struct GeometryWorker {
    request_sender: Option<Sender<WorkerRequest>>,
    response_receiver: Receiver<WorkerResponse>,
    worker_handles: Vec<JoinHandle<()>>,
    /// Maximum number of requests queued or running at once.
    budget: usize,
    in_flight: Arc<AtomicUsize>,
    timeout: Duration,
    /// Responses received while waiting for a different id.
    parked: FxHashMap<RequestId, WorkerResponse>,
    /// Ids whose caller gave up. Their responses are discarded on arrival.
    abandoned: FxHashSet<RequestId>,
}

impl GeometryWorker {
    /// Spawn the configured number of threads. Zero means one per core.
    pub fn new(config: &WorkerConfig) -> Result<Self, WorkerError> {
        let thread_count = match config.threads {
            0 => num_cpus::get().max(1),
            n => n,
        };
        let budget = config.queue_budget.max(1);
        let (request_tx, request_rx) = crossbeam_channel::bounded::<WorkerRequest>(budget);
        let (response_tx, response_rx) = crossbeam_channel::unbounded();
        let in_flight = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::with_capacity(thread_count);
        for i in 0..thread_count {
            let rx = request_rx.clone();
            let tx = response_tx.clone();
            let flight = Arc::clone(&in_flight);
            let handle = std::thread::Builder::new()
                .name(format!("geometry-worker-{i}"))
                .stack_size(WORKER_STACK_SIZE)
                .spawn(move || {
                    while let Ok(request) = rx.recv() {
                        let response = handle_request(request);
                        // Counted until the response is visible to the caller.
                        let sent = tx.send(response).is_ok();
                        flight.fetch_sub(1, Ordering::AcqRel);
                        if !sent {
                            break;
                        }
                    }
                })
                .map_err(WorkerError::Spawn)?;
            handles.push(handle);
        }
        info!(threads = thread_count, budget, "geometry worker started");

        Ok(Self {
            request_sender: Some(request_tx),
            response_receiver: response_rx,
            worker_handles: handles,
            budget,
            in_flight,
            timeout: Duration::from_millis(config.request_timeout_ms),
            parked: FxHashMap::default(),
            abandoned: FxHashSet::default(),
        })
    }

    /// Queue a request without waiting for it.
    pub fn submit(&self, request: WorkerRequest) -> Result<(), WorkerError> {
        let sender = self
            .request_sender
            .as_ref()
            .ok_or(WorkerError::Disconnected)?;
        if self.in_flight.load(Ordering::Acquire) >= self.budget {
            return Err(WorkerError::QueueFull {
                budget: self.budget,
            });
        }
        self.in_flight.fetch_add(1, Ordering::AcqRel);
        trace!(id = %request.id, kind = request.operation.type_name(), "submit");
        if sender.send(request).is_err() {
            self.in_flight.fetch_sub(1, Ordering::AcqRel);
            return Err(WorkerError::Disconnected);
        }
        Ok(())
    }

    fn accept(&mut self, response: WorkerResponse) -> Option<WorkerResponse> {
        if self.abandoned.remove(response.id()) {
            debug!(id = %response.id(), "discarding late response");
            None
        } else {
            Some(response)
        }
    }

    /// Every response that has arrived, parked ones first.
    pub fn drain_responses(&mut self) -> Vec<WorkerResponse> {
        let mut responses: Vec<_> = self.parked.drain().map(|(_, r)| r).collect();
        while let Ok(response) = self.response_receiver.try_recv() {
            responses.extend(self.accept(response));
        }
        responses
    }

    /// Submit and wait for the matching response using the configured timeout.
    pub fn request(&mut self, request: WorkerRequest) -> Result<WorkerResponse, WorkerError> {
        self.request_with_timeout(request, self.timeout)
    }

    /// Submit and wait up to `timeout` for the matching response. On timeout
    /// the request keeps running and its response is discarded when it lands.
    pub fn request_with_timeout(
        &mut self,
        request: WorkerRequest,
        timeout: Duration,
    ) -> Result<WorkerResponse, WorkerError> {
        let id = request.id.clone();
        self.submit(request)?;
        let started = Instant::now();
        loop {
            if let Some(response) = self.parked.remove(&id) {
                return Ok(response);
            }
            let remaining = timeout.saturating_sub(started.elapsed());
            match self.response_receiver.recv_timeout(remaining) {
                Ok(response) if response.id() == &id => return Ok(response),
                Ok(response) => {
                    if let Some(response) = self.accept(response) {
                        self.parked.insert(response.id().clone(), response);
                    }
                }
                Err(RecvTimeoutError::Timeout) => {
                    debug!(%id, ?timeout, "request timed out");
                    self.abandoned.insert(id.clone());
                    return Err(WorkerError::Timeout {
                        id,
                        elapsed: started.elapsed(),
                    });
                }
                Err(RecvTimeoutError::Disconnected) => return Err(WorkerError::Disconnected),
            }
        }
    }

    /// Requests queued or running.
    pub fn in_flight_count(&self) -> usize {
        self.in_flight.load(Ordering::Acquire)
    }

    pub fn thread_count(&self) -> usize {
        self.worker_handles.len()
    }

    /// Close the queue and join every thread. Queued requests still run.
    pub fn shutdown(&mut self) {
        if self.request_sender.take().is_none() {
            return;
        }
        for handle in self.worker_handles.drain(..) {
            let _ = handle.join();
        }
        debug!("geometry worker stopped");
    }
}

impl Drop for GeometryWorker {
    fn drop(&mut self) {
        self.shutdown();
    }
}
