//! World-state runtime: map data, movement, collision, camera, dialogue and
//! map transitions, all owned by a single [`WorldController`].

use serde::Deserialize;
use tracing::{debug, info, trace, warn};

pub mod camera;
pub mod collision;
pub mod dialogue;
pub mod map;
pub mod movement;
pub mod tiles;
pub mod transition;


pub use camera::{CameraController, CameraMode, CameraState, Viewport};
pub use collision::{can_move, Aabb};
pub use dialogue::{DialogueEngine, DialogueStep};
pub use map::{DoorLink, DrawStyle, LoadedMap, MapDocument, MapId, TileType};
pub use movement::MovementController;
pub use tiles::{Block, RenderSpec, Rgba, TileGrid, TileRegistry};
pub use transition::{LoadRequest, LoadRequestId, LoadResponse, Resolution, TransitionManager};

use crate::content::LoadError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorldConfig {
    pub tile_size: f32,
    pub move_speed_px_per_second: f32,
    pub viewport: Viewport,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            tile_size: 32.0,
            // 8 px per tick at 60 ticks per second.
            move_speed_px_per_second: 480.0,
            viewport: Viewport {
                width: 960,
                height: 640,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub fn unit(self) -> (f32, f32) {
        match self {
            Self::Up => (0.0, -1.0),
            Self::Down => (0.0, 1.0),
            Self::Left => (-1.0, 0.0),
            Self::Right => (1.0, 0.0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    Move(Direction),
    Confirm,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MovementState {
    #[default]
    Idle,
    Moving,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayerState {
    pub position: Vec2,
    pub target: Vec2,
    pub movement: MovementState,
    pub size: f32,
}

impl PlayerState {
    pub fn idle_at(position: Vec2, size: f32) -> Self {
        Self {
            position,
            target: position,
            movement: MovementState::Idle,
            size,
        }
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(
            self.position.x + self.size * 0.5,
            self.position.y + self.size * 0.5,
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorldPhase {
    Ready,
    Loading { request_id: LoadRequestId },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    Applied { map_id: MapId },
    Discarded,
    Failed { map_id: MapId },
}

#[derive(Debug)]
pub struct WorldState {
    map: Option<LoadedMap>,
    player: PlayerState,
    camera: CameraState,
    camera_mode: CameraMode,
    dialogue: DialogueEngine,
    phase: WorldPhase,
    viewport: Viewport,
    last_load_error: Option<LoadError>,
}

impl WorldState {
    fn new(config: &WorldConfig) -> Self {
        Self {
            map: None,
            player: PlayerState::idle_at(Vec2::default(), config.tile_size),
            camera: CameraState::default(),
            camera_mode: CameraMode::Fixed,
            dialogue: DialogueEngine::default(),
            phase: WorldPhase::Ready,
            viewport: config.viewport,
            last_load_error: None,
        }
    }

    pub fn map(&self) -> Option<&LoadedMap> {
        self.map.as_ref()
    }

    pub fn current_map_id(&self) -> Option<&MapId> {
        self.map.as_ref().map(LoadedMap::id)
    }

    pub fn blocks(&self) -> &[Block] {
        self.map.as_ref().map(LoadedMap::blocks).unwrap_or(&[])
    }

    pub fn map_width(&self) -> f32 {
        self.map.as_ref().map_or(0.0, LoadedMap::width)
    }

    pub fn map_height(&self) -> f32 {
        self.map.as_ref().map_or(0.0, LoadedMap::height)
    }

    pub fn player(&self) -> &PlayerState {
        &self.player
    }

    pub fn camera_offset(&self) -> Vec2 {
        self.camera.offset
    }

    pub fn camera_mode(&self) -> CameraMode {
        self.camera_mode
    }

    pub fn dialogue(&self) -> &DialogueEngine {
        &self.dialogue
    }

    pub fn phase(&self) -> WorldPhase {
        self.phase
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.phase, WorldPhase::Loading { .. })
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn last_load_error(&self) -> Option<&LoadError> {
        self.last_load_error.as_ref()
    }
}

/// Single owner of all mutable world state. Driven by discrete input events,
/// fixed-step updates and completed map loads.
#[derive(Debug)]
pub struct WorldController {
    state: WorldState,
    movement: MovementController,
    camera: CameraController,
    transitions: TransitionManager,
    config: WorldConfig,
}

impl WorldController {
    pub fn new(config: WorldConfig) -> Self {
        Self {
            state: WorldState::new(&config),
            movement: MovementController::new(config.move_speed_px_per_second, config.tile_size),
            camera: CameraController,
            transitions: TransitionManager::default(),
            config,
        }
    }

    pub fn state(&self) -> &WorldState {
        &self.state
    }

    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        if self.state.viewport == viewport {
            return;
        }
        self.state.viewport = viewport;
        if let Some(map) = self.state.map.as_ref() {
            self.state.camera_mode = self
                .camera
                .resolve_mode(map.camera(), map.size(), viewport);
        }
        self.refresh_camera();
    }

    /// Issues a load for `map_id` and enters the loading phase. The caller
    /// hands the request to a loader and feeds the response back through
    /// [`Self::complete_load`].
    pub fn request_map(&mut self, map_id: MapId, spawn: Option<Vec2>) -> LoadRequest {
        let request = self.transitions.request(map_id, spawn);
        self.state.phase = WorldPhase::Loading {
            request_id: request.id,
        };
        request
    }

    /// Applies one input event. Returns a load request when the event walked
    /// into a door.
    pub fn handle_event(&mut self, event: InputEvent) -> Option<LoadRequest> {
        if self.state.is_loading() {
            trace!(?event, "input_dropped_loading");
            return None;
        }
        if self.state.dialogue.is_talking() {
            if event == InputEvent::Confirm {
                self.state.dialogue.advance();
            }
            return None;
        }
        let InputEvent::Move(direction) = event else {
            return None;
        };
        if self.state.player.movement == MovementState::Moving {
            trace!(?direction, "input_dropped_moving");
            return None;
        }
        let map = self.state.map.as_ref()?;

        let proposed = self.movement.propose(self.state.player.position, direction);
        if let Some(door) = map.door_at(proposed) {
            let target = door.target_map.clone();
            let spawn = door.spawn;
            info!(from = %map.id(), to = %target, "door_transition");
            return Some(self.request_map(target, spawn));
        }

        if can_move(map.blocks(), self.state.player.size, proposed) {
            self.movement.begin(&mut self.state.player, proposed);
            return None;
        }

        debug!(
            x = proposed.x,
            y = proposed.y,
            symbol = map.symbol_at_world(proposed).unwrap_or(""),
            "movement_blocked"
        );
        if let Some((_, lines)) = map.interaction_at(proposed) {
            self.state.dialogue.start_talk(lines);
        }
        None
    }

    /// Fixed-step tick: advance movement, fire contact triggers, then
    /// recompute the camera.
    pub fn update(&mut self, dt_seconds: f32) {
        let arrived = self.movement.advance(&mut self.state.player, dt_seconds);
        if arrived {
            self.trigger_contact();
        }
        self.refresh_camera();
    }

    pub fn complete_load(&mut self, response: LoadResponse) -> LoadOutcome {
        match self.transitions.resolve(response) {
            Resolution::Stale => LoadOutcome::Discarded,
            Resolution::Failed { map_id, error } => self.fail_load(map_id, error),
            Resolution::Ready {
                map_id,
                document,
                spawn_override,
            } => match LoadedMap::build(map_id.clone(), document, self.config.tile_size) {
                Ok(map) => {
                    self.install_map(map, spawn_override);
                    LoadOutcome::Applied { map_id }
                }
                Err(error) => self.fail_load(map_id, error),
            },
        }
    }

    fn trigger_contact(&mut self) {
        let Some(map) = self.state.map.as_ref() else {
            return;
        };
        let position = self.state.player.position;
        let Some((_, tile_type)) = map.tile_type_at(position) else {
            return;
        };
        if tile_type.solid {
            return;
        }
        if let Some((symbol, lines)) = map.interaction_at(position) {
            debug!(symbol, "contact_trigger");
            self.state.dialogue.start_talk(lines);
        }
    }

    fn install_map(&mut self, map: LoadedMap, spawn_override: Option<Vec2>) {
        let requested = spawn_override
            .or_else(|| map.spawn())
            .unwrap_or(self.state.player.position);
        let spawn = snap_to_tile(requested, self.config.tile_size);
        if spawn != requested {
            warn!(
                map = %map.id(),
                x = requested.x,
                y = requested.y,
                "spawn_unaligned"
            );
        }

        self.movement.reset(&mut self.state.player, spawn);
        self.state.dialogue.end_talk();
        self.state.camera_mode =
            self.camera
                .resolve_mode(map.camera(), map.size(), self.state.viewport);
        info!(
            map = %map.id(),
            block_count = map.blocks().len(),
            width = map.width(),
            height = map.height(),
            camera = ?self.state.camera_mode,
            spawn_x = spawn.x,
            spawn_y = spawn.y,
            "map_loaded"
        );
        self.state.map = Some(map);
        self.state.phase = WorldPhase::Ready;
        self.state.last_load_error = None;
        self.refresh_camera();
    }

    fn fail_load(&mut self, map_id: MapId, error: LoadError) -> LoadOutcome {
        warn!(map = %map_id, error = %error, "map_load_failed");
        self.state.phase = WorldPhase::Ready;
        self.state.last_load_error = Some(error);
        LoadOutcome::Failed { map_id }
    }

    fn refresh_camera(&mut self) {
        self.state.camera.offset = match self.state.map.as_ref() {
            Some(map) => self.camera.compute_offset(
                self.state.camera_mode,
                self.state.player.center(),
                map.size(),
                self.state.viewport,
            ),
            None => Vec2::default(),
        };
    }
}

fn snap_to_tile(position: Vec2, tile_size: f32) -> Vec2 {
    let snap = |value: f32| {
        let snapped = (value / tile_size).round() * tile_size;
        if snapped.is_finite() {
            snapped
        } else {
            0.0
        }
    };
    Vec2::new(snap(position.x), snap(position.y))
}
