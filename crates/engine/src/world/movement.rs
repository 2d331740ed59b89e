use super::{Direction, MovementState, PlayerState, Vec2};

#[derive(Debug, Clone, Copy)]
pub struct MovementController {
    speed_px_per_second: f32,
    tile_size: f32,
}

impl MovementController {
    pub fn new(speed_px_per_second: f32, tile_size: f32) -> Self {
        Self {
            speed_px_per_second,
            tile_size,
        }
    }

    /// One tile away from `position` along `direction`. Screen axes: +y is down.
    pub fn propose(&self, position: Vec2, direction: Direction) -> Vec2 {
        let (dx, dy) = direction.unit();
        Vec2::new(
            position.x + dx * self.tile_size,
            position.y + dy * self.tile_size,
        )
    }

    pub fn begin(&self, player: &mut PlayerState, target: Vec2) {
        player.target = target;
        player.movement = MovementState::Moving;
    }

    /// Steps toward the target and returns `true` on the update that arrives.
    pub fn advance(&self, player: &mut PlayerState, dt_seconds: f32) -> bool {
        if player.movement != MovementState::Moving {
            return false;
        }
        let step = (self.speed_px_per_second * dt_seconds.max(0.0)).max(0.0);

        player.position.x = step_axis(player.position.x, player.target.x, step);
        player.position.y = step_axis(player.position.y, player.target.y, step);

        let remaining_x = (player.target.x - player.position.x).abs();
        let remaining_y = (player.target.y - player.position.y).abs();
        if remaining_x <= step && remaining_y <= step {
            player.position = player.target;
            player.movement = MovementState::Idle;
            return true;
        }
        false
    }

    /// Drops any in-flight movement and parks the player at `position`.
    pub fn reset(&self, player: &mut PlayerState, position: Vec2) {
        player.position = position;
        player.target = position;
        player.movement = MovementState::Idle;
    }
}

fn step_axis(current: f32, target: f32, step: f32) -> f32 {
    let delta = target - current;
    if delta.abs() <= step {
        return target;
    }
    current + step * delta.signum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn controller() -> MovementController {
        // 128 px/s at 1/16 s per update moves 8 px per update.
        MovementController::new(128.0, 32.0)
    }

    fn idle_at(x: f32, y: f32) -> PlayerState {
        PlayerState::idle_at(Vec2::new(x, y), 32.0)
    }

    #[test]
    fn propose_moves_one_tile_per_direction() {
        let origin = Vec2::new(64.0, 64.0);
        let movement = controller();
        assert_eq!(movement.propose(origin, Direction::Up), Vec2::new(64.0, 32.0));
        assert_eq!(movement.propose(origin, Direction::Down), Vec2::new(64.0, 96.0));
        assert_eq!(movement.propose(origin, Direction::Left), Vec2::new(32.0, 64.0));
        assert_eq!(movement.propose(origin, Direction::Right), Vec2::new(96.0, 64.0));
    }

    #[test]
    fn advances_in_fixed_steps_and_snaps_on_arrival() {
        let movement = controller();
        let mut player = idle_at(64.0, 64.0);
        movement.begin(&mut player, Vec2::new(96.0, 64.0));

        assert!(!movement.advance(&mut player, 0.0625));
        assert_eq!(player.position, Vec2::new(72.0, 64.0));
        assert!(!movement.advance(&mut player, 0.0625));
        assert_eq!(player.position, Vec2::new(80.0, 64.0));
        assert!(movement.advance(&mut player, 0.0625));
        assert_eq!(player.position, Vec2::new(96.0, 64.0));
        assert_eq!(player.target, player.position);
        assert_eq!(player.movement, MovementState::Idle);
    }

    #[test]
    fn large_step_arrives_immediately_without_overshoot() {
        let movement = controller();
        let mut player = idle_at(64.0, 64.0);
        movement.begin(&mut player, Vec2::new(64.0, 32.0));
        assert!(movement.advance(&mut player, 1.0));
        assert_eq!(player.position, Vec2::new(64.0, 32.0));
    }

    #[test]
    fn idle_player_does_not_move() {
        let movement = controller();
        let mut player = idle_at(32.0, 32.0);
        assert!(!movement.advance(&mut player, 1.0));
        assert_eq!(player.position, Vec2::new(32.0, 32.0));
    }

    #[test]
    fn zero_dt_keeps_player_moving() {
        let movement = controller();
        let mut player = idle_at(0.0, 0.0);
        movement.begin(&mut player, Vec2::new(32.0, 0.0));
        assert!(!movement.advance(&mut player, 0.0));
        assert_eq!(player.movement, MovementState::Moving);
        assert_eq!(player.position, Vec2::new(0.0, 0.0));
    }

    #[test]
    fn reset_parks_player_idle() {
        let movement = controller();
        let mut player = idle_at(0.0, 0.0);
        movement.begin(&mut player, Vec2::new(32.0, 0.0));
        movement.reset(&mut player, Vec2::new(96.0, 96.0));
        assert_eq!(player.position, Vec2::new(96.0, 96.0));
        assert_eq!(player.target, player.position);
        assert_eq!(player.movement, MovementState::Idle);
    }
}
