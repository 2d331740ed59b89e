use super::tiles::Block;
use super::Vec2;

/// Axis-aligned square in world pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec2,
    pub size: f32,
}

impl Aabb {
    pub fn square(min: Vec2, size: f32) -> Self {
        Self { min, size }
    }

    /// Strict interval overlap on both axes; touching edges do not overlap.
    pub fn overlaps(&self, other: &Aabb) -> bool {
        self.min.x < other.min.x + other.size
            && self.min.x + self.size > other.min.x
            && self.min.y < other.min.y + other.size
            && self.min.y + self.size > other.min.y
    }
}

/// Returns `false` as soon as the player box at `proposed` overlaps any solid
/// block. Linear in the block count.
pub fn can_move(blocks: &[Block], player_size: f32, proposed: Vec2) -> bool {
    let player = Aabb::square(proposed, player_size);
    !blocks
        .iter()
        .filter(|block| block.solid)
        .any(|block| player.overlaps(&block.bounds()))
}
