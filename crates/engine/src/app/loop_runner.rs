use std::io;
use std::sync::Arc;
use std::time::{Duration, Instant};

use pixels::Error as PixelsError;
use thiserror::Error;
use tracing::{info, warn};
use winit::dpi::LogicalSize;
use winit::error::{EventLoopError, OsError};
use winit::event::{ElementState, Event, KeyEvent, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Fullscreen, Window, WindowBuilder};

use crate::content::{parse_map_id, DirectoryMapSource, LoadError, MapLoader};
use crate::world::{WorldConfig, WorldController, WorldState};
use crate::{resolve_app_paths, StartupError};

use super::input::ActionStates;
use super::metrics::MetricsAccumulator;
use super::{InputAction, InputSnapshot, Renderer};

pub const DEFAULT_START_MAP: &str = "classroom";

#[derive(Debug, Clone)]
pub struct LoopConfig {
    pub window_title: String,
    pub window_width: u32,
    pub window_height: u32,
    pub target_tps: u32,
    pub max_frame_delta: Duration,
    pub max_ticks_per_frame: u32,
    pub metrics_log_interval: Duration,
    pub start_map: String,
    pub world: WorldConfig,
}

impl Default for LoopConfig {
    fn default() -> Self {
        let world = WorldConfig::default();
        Self {
            window_title: "Tilewalk".to_string(),
            window_width: world.viewport.width,
            window_height: world.viewport.height,
            target_tps: 60,
            max_frame_delta: Duration::from_millis(250),
            max_ticks_per_frame: 5,
            metrics_log_interval: Duration::from_secs(5),
            start_map: DEFAULT_START_MAP.to_string(),
            world,
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Startup(#[from] StartupError),
    #[error("invalid start map: {0}")]
    InvalidStartMap(#[source] LoadError),
    #[error("failed to start map loader thread: {0}")]
    SpawnLoader(#[source] io::Error),
    #[error("failed to create event loop: {0}")]
    CreateEventLoop(#[source] EventLoopError),
    #[error("failed to create application window: {0}")]
    CreateWindow(#[source] OsError),
    #[error("failed to initialize renderer: {0}")]
    CreateRenderer(#[source] PixelsError),
    #[error("event loop failed: {0}")]
    EventLoopRun(#[source] EventLoopError),
}

pub fn run_app(config: LoopConfig) -> Result<(), AppError> {
    let app_paths = resolve_app_paths()?;
    info!(
        root = %app_paths.root.display(),
        maps_dir = %app_paths.maps_dir.display(),
        sprites_dir = %app_paths.sprites_dir.display(),
        "startup"
    );
    let start_map = parse_map_id(&config.start_map).map_err(AppError::InvalidStartMap)?;
    let mut loader = MapLoader::spawn(DirectoryMapSource::new(app_paths.maps_dir.clone()))
        .map_err(AppError::SpawnLoader)?;

    let event_loop = EventLoop::new().map_err(AppError::CreateEventLoop)?;
    let window = Arc::new(
        WindowBuilder::new()
            .with_title(config.window_title.clone())
            .with_inner_size(LogicalSize::new(
                config.window_width as f64,
                config.window_height as f64,
            ))
            .build(&event_loop)
            .map_err(AppError::CreateWindow)?,
    );
    let mut renderer = Renderer::new(Arc::clone(&window), app_paths.sprites_dir.clone())
        .map_err(AppError::CreateRenderer)?;

    event_loop.set_control_flow(ControlFlow::Poll);

    let target_tps = config.target_tps.max(1);
    let max_frame_delta =
        normalize_non_zero_duration(config.max_frame_delta, Duration::from_millis(250));
    let max_ticks_per_frame = config.max_ticks_per_frame.max(1);
    let metrics_log_interval =
        normalize_non_zero_duration(config.metrics_log_interval, Duration::from_secs(5));
    let fixed_dt = Duration::from_secs_f64(1.0 / target_tps as f64);
    let fixed_dt_seconds = fixed_dt.as_secs_f32();

    let mut world = WorldController::new(WorldConfig {
        viewport: renderer.viewport(),
        ..config.world
    });
    loader.submit(world.request_map(start_map, None));

    info!(
        target_tps,
        max_frame_delta_ms = max_frame_delta.as_millis() as u64,
        max_ticks_per_frame,
        metrics_log_interval_ms = metrics_log_interval.as_millis() as u64,
        tile_size = config.world.tile_size,
        move_speed = config.world.move_speed_px_per_second,
        "loop_config"
    );

    let mut input_collector = InputCollector::default();
    let mut accumulator = Duration::ZERO;
    let mut last_frame_instant = Instant::now();
    let mut metrics_accumulator = MetricsAccumulator::new(metrics_log_interval, Instant::now());
    let mut last_applied_title = config.window_title.clone();

    event_loop
        .run(move |event, window_target| match event {
            Event::WindowEvent { window_id, event } if window_id == window.id() => match event {
                WindowEvent::CloseRequested => {
                    info!(reason = "window_close", "shutdown_requested");
                    window_target.exit();
                }
                WindowEvent::Resized(new_size) => {
                    if let Err(error) = renderer.resize(new_size.width, new_size.height) {
                        warn!(error = %error, "renderer_resize_failed");
                        window_target.exit();
                    }
                    world.set_viewport(renderer.viewport());
                }
                WindowEvent::ScaleFactorChanged { .. } => {
                    let size = window.inner_size();
                    if let Err(error) = renderer.resize(size.width, size.height) {
                        warn!(error = %error, "renderer_resize_failed");
                        window_target.exit();
                    }
                    world.set_viewport(renderer.viewport());
                }
                WindowEvent::Focused(false) => input_collector.release_all(),
                WindowEvent::KeyboardInput { event, .. } => {
                    input_collector.handle_keyboard_input(&event);
                    if input_collector.quit_requested {
                        info!(reason = "escape_key", "shutdown_requested");
                        window_target.exit();
                    }
                }
                WindowEvent::RedrawRequested => {
                    let now = Instant::now();
                    let raw_frame_dt = now.saturating_duration_since(last_frame_instant);
                    last_frame_instant = now;

                    let clamped_frame_dt = clamp_frame_delta(raw_frame_dt, max_frame_delta);
                    accumulator = accumulator.saturating_add(clamped_frame_dt);

                    let step_plan = plan_sim_steps(accumulator, fixed_dt, max_ticks_per_frame);
                    for _ in 0..step_plan.ticks_to_run {
                        let snapshot = input_collector.snapshot_for_tick();
                        if snapshot.was_pressed(InputAction::ToggleFullscreen) {
                            toggle_fullscreen(&window);
                        }
                        run_tick(&mut world, &mut loader, &snapshot, fixed_dt_seconds);
                    }
                    accumulator = step_plan.remaining_accumulator;
                    let dropped_ticks = dropped_tick_count(step_plan.dropped_backlog, fixed_dt);
                    metrics_accumulator.record_ticks(step_plan.ticks_to_run, dropped_ticks);

                    if step_plan.dropped_backlog > Duration::ZERO {
                        warn!(
                            dropped_backlog_ms = step_plan.dropped_backlog.as_millis() as u64,
                            max_ticks_per_frame, "sim_clamp_triggered"
                        );
                    }

                    if let Err(error) = renderer.render(world.state()) {
                        warn!(error = %error, "renderer_draw_failed");
                        window_target.exit();
                    }
                    let next_title = compose_title(&config.window_title, world.state());
                    if next_title != last_applied_title {
                        window.set_title(&next_title);
                        last_applied_title = next_title;
                    }

                    metrics_accumulator.record_frame(raw_frame_dt);
                    if let Some(snapshot) = metrics_accumulator.maybe_snapshot(now) {
                        snapshot.log();
                    }
                }
                _ => {}
            },
            Event::AboutToWait => {
                window.request_redraw();
            }
            Event::LoopExiting => {
                info!(
                    map = %world
                        .state()
                        .current_map_id()
                        .map(ToString::to_string)
                        .unwrap_or_default(),
                    "shutdown"
                );
            }
            _ => {}
        })
        .map_err(AppError::EventLoopRun)
}

/// One fixed step: apply finished loads, feed input, advance the world.
fn run_tick(
    world: &mut WorldController,
    loader: &mut MapLoader,
    snapshot: &InputSnapshot,
    dt_seconds: f32,
) {
    for response in loader.poll() {
        world.complete_load(response);
    }
    for event in snapshot.world_events() {
        if let Some(request) = world.handle_event(event) {
            loader.submit(request);
        }
    }
    world.update(dt_seconds);
}

fn compose_title(base: &str, state: &WorldState) -> String {
    match state.dialogue().current_line() {
        Some(line) => format!("{base} | {line}"),
        None => base.to_string(),
    }
}

fn toggle_fullscreen(window: &Window) {
    let next = match window.fullscreen() {
        Some(_) => None,
        None => Some(Fullscreen::Borderless(None)),
    };
    info!(fullscreen = next.is_some(), "fullscreen_toggled");
    window.set_fullscreen(next);
}

#[derive(Debug, Default)]
struct InputCollector {
    quit_requested: bool,
    held: ActionStates,
    pressed: ActionStates,
}

impl InputCollector {
    fn handle_keyboard_input(&mut self, key_event: &KeyEvent) {
        self.handle_key(key_event.physical_key, key_event.state, key_event.repeat);
    }

    fn handle_key(&mut self, key: PhysicalKey, state: ElementState, repeat: bool) {
        let Some(action) = action_for_key(key) else {
            return;
        };
        match state {
            ElementState::Pressed => {
                let was_down = self.held.is_down(action);
                if !was_down || (repeat && action.repeats()) {
                    self.pressed.set(action, true);
                }
                self.held.set(action, true);
                if action == InputAction::Quit {
                    self.quit_requested = true;
                }
            }
            ElementState::Released => self.held.set(action, false),
        }
    }

    fn release_all(&mut self) {
        self.held = ActionStates::default();
    }

    fn snapshot_for_tick(&mut self) -> InputSnapshot {
        let snapshot = InputSnapshot::new(self.held, self.pressed, self.quit_requested);
        self.pressed = ActionStates::default();
        snapshot
    }
}

fn action_for_key(key: PhysicalKey) -> Option<InputAction> {
    let PhysicalKey::Code(code) = key else {
        return None;
    };
    match code {
        KeyCode::KeyW | KeyCode::ArrowUp => Some(InputAction::MoveUp),
        KeyCode::KeyS | KeyCode::ArrowDown => Some(InputAction::MoveDown),
        KeyCode::KeyA | KeyCode::ArrowLeft => Some(InputAction::MoveLeft),
        KeyCode::KeyD | KeyCode::ArrowRight => Some(InputAction::MoveRight),
        KeyCode::Space | KeyCode::Enter | KeyCode::NumpadEnter => Some(InputAction::Confirm),
        KeyCode::F11 => Some(InputAction::ToggleFullscreen),
        KeyCode::Escape => Some(InputAction::Quit),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy)]
struct StepPlan {
    ticks_to_run: u32,
    remaining_accumulator: Duration,
    dropped_backlog: Duration,
}

fn plan_sim_steps(
    mut accumulator: Duration,
    fixed_dt: Duration,
    max_ticks_per_frame: u32,
) -> StepPlan {
    let mut ticks_to_run = 0u32;

    while accumulator >= fixed_dt && ticks_to_run < max_ticks_per_frame {
        accumulator = accumulator.saturating_sub(fixed_dt);
        ticks_to_run = ticks_to_run.saturating_add(1);
    }

    let dropped_backlog = if accumulator >= fixed_dt {
        std::mem::take(&mut accumulator)
    } else {
        Duration::ZERO
    };
    StepPlan {
        ticks_to_run,
        remaining_accumulator: accumulator,
        dropped_backlog,
    }
}

fn dropped_tick_count(dropped_backlog: Duration, fixed_dt: Duration) -> u32 {
    if fixed_dt.is_zero() {
        return 0;
    }
    (dropped_backlog.as_nanos() / fixed_dt.as_nanos()).min(u32::MAX as u128) as u32
}

fn clamp_frame_delta(frame_dt: Duration, max_frame_delta: Duration) -> Duration {
    frame_dt.min(max_frame_delta)
}

fn normalize_non_zero_duration(value: Duration, fallback: Duration) -> Duration {
    if value.is_zero() {
        fallback
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;
    use crate::content::MemoryMapSource;
    use crate::world::{MapId, Vec2, Viewport};

    fn press(input: &mut InputCollector, code: KeyCode, repeat: bool) {
        input.handle_key(PhysicalKey::Code(code), ElementState::Pressed, repeat);
    }

    fn release(input: &mut InputCollector, code: KeyCode) {
        input.handle_key(PhysicalKey::Code(code), ElementState::Released, false);
    }

    #[test]
    fn clamp_frame_delta_caps_large_frame() {
        let max_frame_delta = Duration::from_millis(250);
        assert_eq!(
            clamp_frame_delta(Duration::from_millis(600), max_frame_delta),
            max_frame_delta
        );
    }

    #[test]
    fn plan_sim_steps_runs_expected_ticks_without_drop() {
        let fixed_dt = Duration::from_millis(16);
        let result = plan_sim_steps(Duration::from_millis(50), fixed_dt, 5);

        assert_eq!(result.ticks_to_run, 3);
        assert_eq!(result.remaining_accumulator, Duration::from_millis(2));
        assert_eq!(result.dropped_backlog, Duration::ZERO);
    }

    #[test]
    fn plan_sim_steps_drops_backlog_when_tick_cap_hit() {
        let fixed_dt = Duration::from_millis(16);
        let result = plan_sim_steps(Duration::from_millis(120), fixed_dt, 3);

        assert_eq!(result.ticks_to_run, 3);
        assert_eq!(result.remaining_accumulator, Duration::ZERO);
        assert_eq!(result.dropped_backlog, Duration::from_millis(72));
        assert_eq!(dropped_tick_count(result.dropped_backlog, fixed_dt), 4);
    }

    #[test]
    fn arrow_keys_and_wasd_map_to_the_same_actions() {
        for (code, action) in [
            (KeyCode::ArrowUp, InputAction::MoveUp),
            (KeyCode::KeyW, InputAction::MoveUp),
            (KeyCode::ArrowDown, InputAction::MoveDown),
            (KeyCode::KeyS, InputAction::MoveDown),
            (KeyCode::ArrowLeft, InputAction::MoveLeft),
            (KeyCode::KeyA, InputAction::MoveLeft),
            (KeyCode::ArrowRight, InputAction::MoveRight),
            (KeyCode::KeyD, InputAction::MoveRight),
            (KeyCode::Space, InputAction::Confirm),
            (KeyCode::Enter, InputAction::Confirm),
            (KeyCode::F11, InputAction::ToggleFullscreen),
            (KeyCode::Escape, InputAction::Quit),
        ] {
            assert_eq!(action_for_key(PhysicalKey::Code(code)), Some(action));
        }
        assert_eq!(action_for_key(PhysicalKey::Code(KeyCode::KeyQ)), None);
    }

    #[test]
    fn press_is_edge_triggered_for_single_tick() {
        let mut input = InputCollector::default();
        press(&mut input, KeyCode::ArrowRight, false);

        let first = input.snapshot_for_tick();
        let second = input.snapshot_for_tick();

        assert!(first.was_pressed(InputAction::MoveRight));
        assert!(!second.was_pressed(InputAction::MoveRight));
        assert!(second.is_down(InputAction::MoveRight));
    }

    #[test]
    fn auto_repeat_counts_as_new_press_for_movement() {
        let mut input = InputCollector::default();
        press(&mut input, KeyCode::ArrowDown, false);
        input.snapshot_for_tick();

        press(&mut input, KeyCode::ArrowDown, true);
        assert!(input.snapshot_for_tick().was_pressed(InputAction::MoveDown));
    }

    #[test]
    fn auto_repeat_does_not_retrigger_fullscreen() {
        let mut input = InputCollector::default();
        press(&mut input, KeyCode::F11, false);
        assert!(input
            .snapshot_for_tick()
            .was_pressed(InputAction::ToggleFullscreen));

        press(&mut input, KeyCode::F11, true);
        assert!(!input
            .snapshot_for_tick()
            .was_pressed(InputAction::ToggleFullscreen));

        release(&mut input, KeyCode::F11);
        press(&mut input, KeyCode::F11, false);
        assert!(input
            .snapshot_for_tick()
            .was_pressed(InputAction::ToggleFullscreen));
    }

    #[test]
    fn release_clears_held_state() {
        let mut input = InputCollector::default();
        press(&mut input, KeyCode::KeyA, false);
        release(&mut input, KeyCode::KeyA);
        let snapshot = input.snapshot_for_tick();
        assert!(!snapshot.is_down(InputAction::MoveLeft));
        assert!(snapshot.was_pressed(InputAction::MoveLeft));
    }

    #[test]
    fn focus_loss_releases_held_keys() {
        let mut input = InputCollector::default();
        press(&mut input, KeyCode::KeyA, false);
        input.snapshot_for_tick();
        input.release_all();
        press(&mut input, KeyCode::KeyA, false);
        assert!(input.snapshot_for_tick().was_pressed(InputAction::MoveLeft));
    }

    #[test]
    fn escape_requests_quit() {
        let mut input = InputCollector::default();
        press(&mut input, KeyCode::Escape, false);
        assert!(input.quit_requested);
        assert!(input.snapshot_for_tick().quit_requested());
    }

    fn world_config() -> WorldConfig {
        WorldConfig {
            viewport: Viewport {
                width: 320,
                height: 240,
            },
            ..WorldConfig::default()
        }
    }

    fn run_until_ready(world: &mut WorldController, loader: &mut MapLoader) {
        for _ in 0..500 {
            run_tick(world, loader, &InputSnapshot::default(), 1.0 / 60.0);
            if !world.state().is_loading() {
                return;
            }
            thread::sleep(Duration::from_millis(2));
        }
        panic!("map never finished loading");
    }

    #[test]
    fn ticks_apply_loader_responses_and_dialogue_reaches_title() {
        let mut source = MemoryMapSource::default();
        source.insert(
            MapId::new("room").expect("id"),
            r#"{
                "tiles": [["floor", "sign"]],
                "tileTypes": { "floor": {}, "sign": { "solid": true } },
                "events": { "sign": ["Welcome."] },
                "spawn": { "x": 0, "y": 0 }
            }"#,
        );
        let mut loader = MapLoader::spawn(source).expect("spawn loader");
        let mut world = WorldController::new(world_config());
        loader.submit(world.request_map(MapId::new("room").expect("id"), None));
        run_until_ready(&mut world, &mut loader);

        assert_eq!(
            world.state().current_map_id(),
            Some(&MapId::new("room").expect("id"))
        );
        assert_eq!(world.state().player().position, Vec2::new(0.0, 0.0));
        assert_eq!(compose_title("Tilewalk", world.state()), "Tilewalk");

        let mut input = InputCollector::default();
        press(&mut input, KeyCode::ArrowRight, false);
        run_tick(&mut world, &mut loader, &input.snapshot_for_tick(), 1.0 / 60.0);
        assert_eq!(
            compose_title("Tilewalk", world.state()),
            "Tilewalk | Welcome."
        );

        press(&mut input, KeyCode::Space, false);
        run_tick(&mut world, &mut loader, &input.snapshot_for_tick(), 1.0 / 60.0);
        assert!(!world.state().dialogue().is_talking());
    }

    #[test]
    fn missing_start_map_leaves_world_empty_with_error() {
        let mut loader = MapLoader::spawn(MemoryMapSource::default()).expect("spawn loader");
        let mut world = WorldController::new(world_config());
        loader.submit(world.request_map(MapId::new("nowhere").expect("id"), None));
        run_until_ready(&mut world, &mut loader);

        assert!(world.state().current_map_id().is_none());
        assert!(matches!(
            world.state().last_load_error(),
            Some(LoadError::Missing { .. })
        ));
    }
}
