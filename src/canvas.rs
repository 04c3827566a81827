//! Output sink for synthesized voxels.
//!
//! The synthesizer writes through the `BlockCanvas` trait so it never
//! cares where blocks end up. `MemoryCanvas` is the concrete sink used
//! by the binary and the tests; it stores blocks sparsely with `Air` as
//! the implicit default.

use std::collections::HashMap;

/// Block material vocabulary the synthesizer emits.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum Material {
    #[default]
    Air,
    Bedrock,
    Stone,
    Dirt,
    Sandstone,
    Water,
    /// The vertical wall of a waterfall shaft.
    FallingWater,
    Wood,
    Leaves,
    Shrub,
}

impl Material {
    /// Solid ground and trunk materials. Water and foliage are not
    /// opaque; a tree root only counts as buried between opaque blocks.
    pub fn is_opaque(self) -> bool {
        matches!(
            self,
            Material::Bedrock
                | Material::Stone
                | Material::Dirt
                | Material::Sandstone
                | Material::Wood
        )
    }
}

/// Surface biome tag, one per column.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum Biome {
    #[default]
    Plains,
    Forest,
    Ocean,
}

/// Where synthesized blocks go. Coordinates are world voxel
/// coordinates: `y` is up, `x`/`z` span the scaled map centered on the
/// origin.
pub trait BlockCanvas {
    fn set_block(&mut self, x: i32, y: i32, z: i32, material: Material);

    fn set_biome(&mut self, x: i32, z: i32, biome: Biome);

    /// Read back a previously written block, `Air` if untouched.
    fn get_block(&self, x: i32, y: i32, z: i32) -> Material;
}

/// Sparse in-memory canvas. `Air` writes still occupy an entry so that
/// overwrites behave like a dense store would.
#[derive(Default)]
pub struct MemoryCanvas {
    blocks: HashMap<(i32, i32, i32), Material>,
    biomes: HashMap<(i32, i32), Biome>,
}

impl MemoryCanvas {
    pub fn new() -> MemoryCanvas {
        MemoryCanvas::default()
    }

    /// Number of block positions written, `Air` included.
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    pub fn biome_count(&self) -> usize {
        self.biomes.len()
    }

    /// How many written blocks hold the given material.
    pub fn count_of(&self, material: Material) -> usize {
        self.blocks.values().filter(|&&m| m == material).count()
    }

    pub fn get_biome(&self, x: i32, z: i32) -> Biome {
        self.biomes.get(&(x, z)).copied().unwrap_or_default()
    }
}

impl BlockCanvas for MemoryCanvas {
    fn set_block(&mut self, x: i32, y: i32, z: i32, material: Material) {
        self.blocks.insert((x, y, z), material);
    }

    fn set_biome(&mut self, x: i32, z: i32, biome: Biome) {
        self.biomes.insert((x, z), biome);
    }

    fn get_block(&self, x: i32, y: i32, z: i32) -> Material {
        self.blocks.get(&(x, y, z)).copied().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unwritten_positions_read_as_air() {
        let canvas = MemoryCanvas::new();
        assert_eq!(canvas.get_block(5, -3, 1000), Material::Air);
        assert_eq!(canvas.get_biome(0, 0), Biome::Plains);
    }

    #[test]
    fn test_overwrite_keeps_last_value() {
        let mut canvas = MemoryCanvas::new();
        canvas.set_block(1, 2, 3, Material::Stone);
        canvas.set_block(1, 2, 3, Material::Water);
        assert_eq!(canvas.get_block(1, 2, 3), Material::Water);
        assert_eq!(canvas.block_count(), 1);
    }

    #[test]
    fn test_opacity_split() {
        assert!(Material::Stone.is_opaque());
        assert!(Material::Wood.is_opaque());
        assert!(!Material::Water.is_opaque());
        assert!(!Material::Leaves.is_opaque());
        assert!(!Material::Air.is_opaque());
    }
}
