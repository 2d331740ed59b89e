use std::io;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender};
use tracing::{debug, warn};

use super::source::{load_document, MapSource};
use super::LoadError;
use crate::world::{LoadRequest, LoadResponse};

/// Background map fetcher. Requests go to a single worker thread; responses
/// come back in submission order and are drained by the frame loop.
pub struct MapLoader {
    requests: Option<Sender<LoadRequest>>,
    responses: Receiver<LoadResponse>,
    undeliverable: Vec<LoadResponse>,
    worker: Option<JoinHandle<()>>,
}

impl MapLoader {
    pub fn spawn(source: impl MapSource) -> io::Result<Self> {
        let (request_tx, request_rx) = crossbeam_channel::unbounded::<LoadRequest>();
        let (response_tx, response_rx) = crossbeam_channel::unbounded::<LoadResponse>();
        let worker = thread::Builder::new()
            .name("map-loader".to_string())
            .spawn(move || run_worker(source, request_rx, response_tx))?;
        Ok(Self {
            requests: Some(request_tx),
            responses: response_rx,
            undeliverable: Vec::new(),
            worker: Some(worker),
        })
    }

    /// Never blocks. A dead worker turns the request into an immediate
    /// `WorkerUnavailable` response so the world leaves the loading phase.
    pub fn submit(&mut self, request: LoadRequest) {
        let Some(requests) = self.requests.as_ref() else {
            self.reject(request);
            return;
        };
        if let Err(error) = requests.send(request) {
            warn!("map_loader_send_failed");
            self.reject(error.into_inner());
        }
    }

    pub fn poll(&mut self) -> Vec<LoadResponse> {
        let mut drained = std::mem::take(&mut self.undeliverable);
        drained.extend(self.responses.try_iter());
        drained
    }

    #[cfg(test)]
    fn wait_next(&mut self, timeout: std::time::Duration) -> Option<LoadResponse> {
        if !self.undeliverable.is_empty() {
            return Some(self.undeliverable.remove(0));
        }
        self.responses.recv_timeout(timeout).ok()
    }

    fn reject(&mut self, request: LoadRequest) {
        self.undeliverable.push(LoadResponse {
            request_id: request.id,
            map_id: request.map_id,
            result: Err(LoadError::WorkerUnavailable),
        });
    }
}

impl Drop for MapLoader {
    fn drop(&mut self) {
        self.requests.take();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("map_loader_worker_panicked");
            }
        }
    }
}

fn run_worker(
    source: impl MapSource,
    requests: Receiver<LoadRequest>,
    responses: Sender<LoadResponse>,
) {
    debug!("map_loader_started");
    for request in requests.iter() {
        let result = load_document(&source, &request.map_id);
        let response = LoadResponse {
            request_id: request.id,
            map_id: request.map_id,
            result,
        };
        if responses.send(response).is_err() {
            break;
        }
    }
    debug!("map_loader_stopped");
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::time::Duration;

    use super::*;
    use crate::content::{DirectoryMapSource, MemoryMapSource};
    use crate::world::{LoadRequestId, MapId};

    const TIMEOUT: Duration = Duration::from_secs(5);

    fn request(id: u64, map: &str) -> LoadRequest {
        LoadRequest {
            id: LoadRequestId(id),
            map_id: MapId::new(map).expect("map id"),
        }
    }

    #[test]
    fn loads_documents_from_directory_in_background() {
        let temp = tempfile::tempdir().expect("tempdir");
        fs::write(
            temp.path().join("hallway.json"),
            r#"{"tiles": [["wall", "floor"]], "spawn": {"x": 32, "y": 0}}"#,
        )
        .expect("write");

        let mut loader = MapLoader::spawn(DirectoryMapSource::new(temp.path())).expect("spawn");
        loader.submit(request(7, "hallway"));
        let response = loader.wait_next(TIMEOUT).expect("response");
        assert_eq!(response.request_id, LoadRequestId(7));
        let document = response.result.expect("document");
        assert_eq!(document.tiles[0].len(), 2);
    }

    #[test]
    fn responses_arrive_in_submission_order() {
        let mut source = MemoryMapSource::default();
        source.insert(MapId::new("a").expect("id"), r#"{"tiles": [["x"]]}"#);
        let mut loader = MapLoader::spawn(source).expect("spawn");
        loader.submit(request(1, "a"));
        loader.submit(request(2, "missing"));
        loader.submit(request(3, "a"));

        let mut ids = Vec::new();
        while ids.len() < 3 {
            let response = loader.wait_next(TIMEOUT).expect("response");
            if response.request_id == LoadRequestId(2) {
                assert!(matches!(response.result, Err(LoadError::Missing { .. })));
            }
            ids.push(response.request_id.0);
        }
        assert_eq!(ids, vec![1, 2, 3]);
        assert!(loader.poll().is_empty());
    }

    #[test]
    fn submit_after_worker_shutdown_reports_unavailable() {
        let mut loader = MapLoader::spawn(MemoryMapSource::default()).expect("spawn");
        loader.requests.take();
        loader.submit(request(9, "a"));
        let drained = loader.poll();
        assert_eq!(drained.len(), 1);
        assert!(matches!(
            drained[0].result,
            Err(LoadError::WorkerUnavailable)
        ));
    }
}
