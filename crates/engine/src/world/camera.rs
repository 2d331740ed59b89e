use serde::Deserialize;

use super::Vec2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub fn width_px(&self) -> f32 {
        self.width as f32
    }

    pub fn height_px(&self) -> f32 {
        self.height as f32
    }
}

/// How the camera behaves on a given map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CameraMode {
    /// Offset pinned to the origin.
    Fixed,
    /// Offset centres the player, clamped to the map bounds.
    Follow,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CameraState {
    pub offset: Vec2,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CameraController;

impl CameraController {
    /// Maps without an explicit mode are fixed when they fit inside the
    /// viewport and follow the player otherwise.
    pub fn resolve_mode(
        &self,
        explicit: Option<CameraMode>,
        map_size: Vec2,
        viewport: Viewport,
    ) -> CameraMode {
        if let Some(mode) = explicit {
            return mode;
        }
        if map_size.x <= viewport.width_px() && map_size.y <= viewport.height_px() {
            CameraMode::Fixed
        } else {
            CameraMode::Follow
        }
    }

    pub fn compute_offset(
        &self,
        mode: CameraMode,
        player_center: Vec2,
        map_size: Vec2,
        viewport: Viewport,
    ) -> Vec2 {
        match mode {
            CameraMode::Fixed => Vec2::default(),
            CameraMode::Follow => Vec2 {
                x: clamp_axis(player_center.x, viewport.width_px(), map_size.x),
                y: clamp_axis(player_center.y, viewport.height_px(), map_size.y),
            },
        }
    }
}

fn clamp_axis(center: f32, viewport_len: f32, map_len: f32) -> f32 {
    let max_offset = (map_len - viewport_len).max(0.0);
    let desired = center - viewport_len * 0.5;
    if !desired.is_finite() || !max_offset.is_finite() {
        return 0.0;
    }
    desired.clamp(0.0, max_offset)
}

#[cfg(test)]
mod tests {
    use super::*;

    const VIEWPORT: Viewport = Viewport {
        width: 320,
        height: 240,
    };

    fn follow_offset(player_center: Vec2, map_size: Vec2) -> Vec2 {
        CameraController.compute_offset(CameraMode::Follow, player_center, map_size, VIEWPORT)
    }

    #[test]
    fn fixed_mode_pins_offset_to_origin() {
        let offset = CameraController.compute_offset(
            CameraMode::Fixed,
            Vec2::new(900.0, 700.0),
            Vec2::new(1280.0, 960.0),
            VIEWPORT,
        );
        assert_eq!(offset, Vec2::default());
    }

    #[test]
    fn follow_mode_centres_player_inside_large_map() {
        let offset = follow_offset(Vec2::new(400.0, 300.0), Vec2::new(1280.0, 960.0));
        assert_eq!(offset, Vec2::new(240.0, 180.0));
    }

    #[test]
    fn follow_mode_clamps_near_edges() {
        let map = Vec2::new(1280.0, 960.0);
        assert_eq!(follow_offset(Vec2::new(16.0, 16.0), map), Vec2::default());
        assert_eq!(
            follow_offset(Vec2::new(1270.0, 950.0), map),
            Vec2::new(960.0, 720.0)
        );
    }

    #[test]
    fn map_smaller_than_viewport_pins_to_zero_instead_of_inverting_range() {
        let offset = follow_offset(Vec2::new(150.0, 100.0), Vec2::new(200.0, 160.0));
        assert_eq!(offset, Vec2::default());
    }

    #[test]
    fn offset_stays_in_range_for_every_player_position() {
        let map = Vec2::new(672.0, 288.0);
        for step_x in -4..30 {
            for step_y in -4..14 {
                let center = Vec2::new(step_x as f32 * 32.0 + 16.0, step_y as f32 * 32.0 + 16.0);
                let offset = follow_offset(center, map);
                assert!(offset.x >= 0.0 && offset.x <= (map.x - 320.0).max(0.0));
                assert!(offset.y >= 0.0 && offset.y <= (map.y - 240.0).max(0.0));
            }
        }
    }

    #[test]
    fn non_finite_center_falls_back_to_origin() {
        let offset = follow_offset(Vec2::new(f32::NAN, f32::INFINITY), Vec2::new(1280.0, 960.0));
        assert_eq!(offset, Vec2::default());
    }

    #[test]
    fn resolve_mode_prefers_explicit_setting() {
        let small = Vec2::new(100.0, 100.0);
        let large = Vec2::new(1000.0, 100.0);
        assert_eq!(
            CameraController.resolve_mode(Some(CameraMode::Follow), small, VIEWPORT),
            CameraMode::Follow
        );
        assert_eq!(
            CameraController.resolve_mode(None, small, VIEWPORT),
            CameraMode::Fixed
        );
        assert_eq!(
            CameraController.resolve_mode(None, large, VIEWPORT),
            CameraMode::Follow
        );
    }
}
