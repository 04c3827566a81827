//! Voxel synthesis: turns the decoded terrain into blocks on a canvas.
//!
//! Each map tile becomes a 16x16 patch of columns sampled from the
//! continuous height field, plus waterfall shafts and vegetation. All
//! randomness flows through one seeded rng with a fixed call order per
//! tile, so a given map and seed always produce the same block stream.

use log::debug;
use rand::Rng;
use rand_chacha::ChaCha8Rng;

use crate::canvas::{Biome, BlockCanvas, Material};
use crate::structures::StructureQuery;
use crate::terrain::{TerrainMap, HEIGHT, WIDTH};

/// World units per tile edge. One altitude step is one tile edge tall.
pub const GRID_SCALE: i32 = 16;

const SHRUB_CHANCE: f64 = 0.02;
const TREES_PER_DENSITY: f64 = 1.5;

/// Drives a full map conversion. Borrows the decoded terrain and the
/// structure lookups, writes into the canvas it was given.
pub struct Synthesizer<'a, S, C> {
    terrain: &'a TerrainMap,
    structures: &'a S,
    canvas: &'a mut C,
    rng: ChaCha8Rng,
}

impl<'a, S: StructureQuery, C: BlockCanvas> Synthesizer<'a, S, C> {
    pub fn new(
        terrain: &'a TerrainMap,
        structures: &'a S,
        canvas: &'a mut C,
        rng: ChaCha8Rng,
    ) -> Synthesizer<'a, S, C> {
        Synthesizer {
            terrain,
            structures,
            canvas,
            rng,
        }
    }

    /// Render every tile of the map, row by row.
    pub fn synthesize(&mut self) {
        for ty in 0..HEIGHT {
            debug!("synthesizing... {}% complete", (ty + 1) * 100 / HEIGHT);
            for tx in 0..WIDTH {
                self.render_tile(tx, ty);
            }
        }
    }

    /// One tile: 16x16 terrain columns, then the waterfall shaft if the
    /// tile is one, then vegetation. Shrubs only grow on empty lots, and
    /// an empty lot grows nothing else.
    fn render_tile(&mut self, tx: usize, ty: usize) {
        let x_start = tx as i32 * GRID_SCALE - (WIDTH as i32 / 2) * GRID_SCALE;
        let z_start = ty as i32 * GRID_SCALE - (HEIGHT as i32 / 2) * GRID_SCALE;

        let water_altitude = self.terrain.get_water_altitude(tx, ty) * GRID_SCALE;

        for z in z_start..z_start + GRID_SCALE {
            for x in x_start..x_start + GRID_SCALE {
                let altitude = self.scaled_altitude(x, z);
                self.render_column(x, z, altitude, water_altitude);
            }
        }

        if self.terrain.is_waterfall(tx, ty) {
            self.render_waterfall(x_start, z_start, self.terrain.get_terrain_altitude(tx, ty));
        }

        if self.structures.is_empty_lot(tx, ty) {
            if !self.terrain.is_flooded(tx, ty) && self.rng.gen::<f64>() < SHRUB_CHANCE {
                let x = x_start + self.rng.gen_range(0..GRID_SCALE);
                let z = z_start + self.rng.gen_range(0..GRID_SCALE);
                let altitude = self.scaled_altitude(x, z);
                self.canvas.set_block(x, altitude, z, Material::Shrub);
            }
            return;
        }

        let num_trees = (self.structures.tree_density(tx, ty) as f64 * TREES_PER_DENSITY) as u32;
        for _ in 0..num_trees {
            let x = x_start + self.rng.gen_range(0..GRID_SCALE);
            let z = z_start + self.rng.gen_range(0..GRID_SCALE);
            let height = 6 + self.rng.gen_range(0..4);
            let altitude = self.scaled_altitude(x, z);
            self.render_tree(x, z, altitude, height);
        }
    }

    /// Surface height of a world column, sampled at the column's center
    /// so every voxel inside the column sits at or below the field.
    fn scaled_altitude(&self, x: i32, z: i32) -> i32 {
        let sx = (WIDTH as i32 / 2) as f32 + (x as f32 + 0.5) / GRID_SCALE as f32;
        let sz = (HEIGHT as i32 / 2) as f32 + (z as f32 + 0.5) / GRID_SCALE as f32;
        (self.terrain.get_smooth_altitude(sx, sz) * GRID_SCALE as f32) as i32
    }

    /// Solid ground up to the surface, water up to the water line,
    /// bedrock floor, forest biome tag.
    fn render_column(&mut self, x: i32, z: i32, terrain_altitude: i32, water_altitude: i32) {
        for y in 1..terrain_altitude {
            self.canvas
                .set_block(x, y, z, terrain_material(terrain_altitude - y));
        }

        for y in terrain_altitude..water_altitude {
            self.canvas.set_block(x, y, z, Material::Water);
        }

        self.canvas.set_block(x, 0, z, Material::Bedrock);
        self.canvas.set_biome(x, z, Biome::Forest);
    }

    /// Vertical water shaft spanning one altitude step, with a falling
    /// wall around the rim and still water inside. Overwrites the
    /// terrain columns rendered before it.
    fn render_waterfall(&mut self, x_start: i32, z_start: i32, altitude: i32) {
        let x_end = x_start + GRID_SCALE;
        let z_end = z_start + GRID_SCALE;
        let y_start = altitude * GRID_SCALE - 1;
        let y_end = y_start + GRID_SCALE;

        for z in z_start..z_end {
            for x in x_start..x_end {
                let on_rim = x == x_start || x == x_end - 1 || z == z_start || z == z_end - 1;
                let block = if on_rim {
                    Material::FallingWater
                } else {
                    Material::Water
                };
                for y in y_start..=y_end {
                    self.canvas.set_block(x, y, z, block);
                }
            }
        }
    }

    /// Trunk with an alternating leaf shell. The parity test thins the
    /// canopy on odd layers so the tree does not read as a solid box.
    fn render_tree(&mut self, x: i32, z: i32, altitude: i32, height: i32) {
        for i in 2..height {
            for j in 0..3 {
                for k in 0..3 {
                    if (i & 1) == 0 || (j & 1) != (k & 1) {
                        self.canvas
                            .set_block(x + j - 1, altitude + i, z + k - 1, Material::Leaves);
                    }
                }
            }
        }

        self.canvas.set_block(x, altitude + height, z, Material::Leaves);

        for i in 0..height {
            self.canvas.set_block(x, altitude + i, z, Material::Wood);
        }

        // anchor the trunk with dirt when the root sits inside the ground
        if self.is_buried(x, altitude - 1, z) {
            self.canvas.set_block(x, altitude - 1, z, Material::Dirt);
        }
    }

    fn is_buried(&self, x: i32, y: i32, z: i32) -> bool {
        self.canvas.get_block(x - 1, y, z).is_opaque()
            && self.canvas.get_block(x, y, z - 1).is_opaque()
            && self.canvas.get_block(x + 1, y, z).is_opaque()
            && self.canvas.get_block(x, y, z + 1).is_opaque()
    }
}

/// Ground material by depth below the surface: a thin sandstone crust,
/// a dirt layer, stone underneath.
fn terrain_material(depth: i32) -> Material {
    if depth <= 1 {
        Material::Sandstone
    } else if depth <= 3 {
        Material::Dirt
    } else {
        Material::Stone
    }
}
