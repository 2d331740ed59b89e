use tracing::{debug, info};

use super::map::{MapDocument, MapId};
use super::Vec2;
use crate::content::LoadError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LoadRequestId(pub u64);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadRequest {
    pub id: LoadRequestId,
    pub map_id: MapId,
}

#[derive(Debug)]
pub struct LoadResponse {
    pub request_id: LoadRequestId,
    pub map_id: MapId,
    pub result: Result<MapDocument, LoadError>,
}

#[derive(Debug, Clone, PartialEq)]
struct PendingTransition {
    request_id: LoadRequestId,
    map_id: MapId,
    spawn: Option<Vec2>,
}

#[derive(Debug)]
pub enum Resolution {
    /// Response for a superseded or unknown request.
    Stale,
    Ready {
        map_id: MapId,
        document: MapDocument,
        spawn_override: Option<Vec2>,
    },
    Failed {
        map_id: MapId,
        error: LoadError,
    },
}

/// Tracks the single outstanding map load. Issuing a new request supersedes
/// the previous one.
#[derive(Debug, Default)]
pub struct TransitionManager {
    next_id: u64,
    pending: Option<PendingTransition>,
}

impl TransitionManager {
    pub fn request(&mut self, map_id: MapId, spawn: Option<Vec2>) -> LoadRequest {
        self.next_id += 1;
        let id = LoadRequestId(self.next_id);
        if let Some(previous) = self.pending.as_ref() {
            debug!(
                superseded = previous.request_id.0,
                map = %previous.map_id,
                "map_load_superseded"
            );
        }
        self.pending = Some(PendingTransition {
            request_id: id,
            map_id: map_id.clone(),
            spawn,
        });
        info!(request_id = id.0, map = %map_id, "map_load_requested");
        LoadRequest { id, map_id }
    }

    #[cfg(test)]
    pub(crate) fn pending_request(&self) -> Option<LoadRequestId> {
        self.pending.as_ref().map(|pending| pending.request_id)
    }

    pub fn resolve(&mut self, response: LoadResponse) -> Resolution {
        let matches = self
            .pending
            .as_ref()
            .is_some_and(|pending| pending.request_id == response.request_id);
        if !matches {
            info!(
                request_id = response.request_id.0,
                map = %response.map_id,
                "stale_map_response"
            );
            return Resolution::Stale;
        }
        let Some(pending) = self.pending.take() else {
            return Resolution::Stale;
        };
        match response.result {
            Ok(document) => Resolution::Ready {
                map_id: pending.map_id,
                document,
                spawn_override: pending.spawn,
            },
            Err(error) => Resolution::Failed {
                map_id: pending.map_id,
                error,
            },
        }
    }
}
