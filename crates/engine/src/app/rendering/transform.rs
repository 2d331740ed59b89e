use crate::world::Vec2;

/// World pixels to screen pixels. Both spaces share a top-left origin with
/// +y down, so the camera offset is a plain translation.
pub fn world_to_screen(world: Vec2, camera_offset: Vec2) -> (i32, i32) {
    let x = world.x - camera_offset.x;
    let y = world.y - camera_offset.y;
    (x.round() as i32, y.round() as i32)
}
