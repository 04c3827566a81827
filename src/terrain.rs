//! Terrain reconstruction from the altitude and terrain-type chunks.
//!
//! Builds a 128x128 tile grid of altitude/type/rotation/flood attributes
//! and exposes both discrete lookups and a continuous height field. The
//! byte layout here is reverse-engineered: the classification tables and
//! canal code ranges were validated against real saves, not derived from
//! a published format. Treat the constants as data.

use crate::container::{ChunkTag, TAG_ALTITUDE, TAG_TERRAIN};
use crate::error::DecodeError;
use crate::tilemap::Tilemap;

/// Logical grid width in tiles.
pub const WIDTH: usize = 128;

/// Logical grid height in tiles.
pub const HEIGHT: usize = 128;

/// Maximum depth a canal carves below its tile's base altitude.
const CANAL_DEPTH: f32 = 0.3;

const ALTITUDE_BYTES: usize = WIDTH * HEIGHT * 2;
const TERRAIN_BYTES: usize = WIDTH * HEIGHT;

/// Height-profile family of a tile, decoded from its terrain-type byte.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum TileType {
    /// Flat at the tile's base altitude.
    #[default]
    Low,
    /// Flat one level above the base altitude.
    High,
    /// Straight ramp from base+1 down to base.
    Slope,
    /// Three corners high, one corner low.
    CornerLow,
    /// One corner high, three corners low.
    CornerHigh,
    /// Sharp drop to an adjacent lower level, rendered as a water shaft.
    Waterfall,
    /// Below-grade water channel carved into the surface.
    Canal,
}

/// Orientation of a tile's height profile.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum Rotation {
    #[default]
    None,
    Clockwise90,
    Clockwise180,
    Clockwise270,
}

// Classification tables indexed by the low nibble of the terrain-type
// byte: one flat entry, then three rotated sub-ranges of four codes each
// (slope, corner-low, corner-high), then flat-high and two fallthroughs.
const XTER_TYPE: [TileType; 16] = {
    use TileType::*;
    [
        Low,
        Slope, Slope, Slope, Slope,
        CornerLow, CornerLow, CornerLow, CornerLow,
        CornerHigh, CornerHigh, CornerHigh, CornerHigh,
        High, Low, Low,
    ]
};

const XTER_ROTATION: [Rotation; 16] = {
    use Rotation::*;
    [
        None,
        None, Clockwise90, Clockwise180, Clockwise270,
        None, Clockwise90, Clockwise180, Clockwise270,
        None, Clockwise90, Clockwise180, Clockwise270,
        None, None, None,
    ]
};

/// Raw-buffer index for logical tile (x, y). The save stores rows with
/// the x-axis mirrored; this mapping is load-bearing for matching the
/// original byte layout.
fn raw_index(x: usize, y: usize) -> usize {
    (WIDTH - 1 - x) + y * WIDTH
}

fn classify_type(code: u8) -> TileType {
    match code {
        0x3E => TileType::Waterfall,
        0x30..=0x3D | 0x40..=0x45 => TileType::Canal,
        _ => XTER_TYPE[(code & 0xF) as usize],
    }
}

fn classify_rotation(code: u8) -> Rotation {
    XTER_ROTATION[(code & 0xF) as usize]
}

/// The decoded terrain grid. Built once from the two raw chunks and
/// read-only afterwards.
pub struct TerrainMap {
    altitude: Tilemap<i32>,
    water: Tilemap<i32>,
    tile_type: Tilemap<TileType>,
    rotation: Tilemap<Rotation>,
    underwater: Tilemap<bool>,
}

impl TerrainMap {
    /// Build the full grid from the altitude chunk (2 bytes per tile,
    /// big-endian words) and the decompressed terrain-type chunk (1 byte
    /// per tile). Both use mirrored indexing.
    pub fn new(altm: &[u8], xter: &[u8]) -> Result<TerrainMap, DecodeError> {
        if altm.len() != ALTITUDE_BYTES {
            return Err(DecodeError::InvalidSize {
                tag: TAG_ALTITUDE,
                size: altm.len(),
            });
        }
        if xter.len() != TERRAIN_BYTES {
            return Err(DecodeError::InvalidSize {
                tag: TAG_TERRAIN,
                size: xter.len(),
            });
        }

        let mut altitude = Tilemap::new_with(WIDTH, HEIGHT, 0i32);
        let mut water = Tilemap::new_with(WIDTH, HEIGHT, 0i32);
        let mut tile_type = Tilemap::new_with(WIDTH, HEIGHT, TileType::Low);
        let mut rotation = Tilemap::new_with(WIDTH, HEIGHT, Rotation::None);
        let mut underwater = Tilemap::new_with(WIDTH, HEIGHT, false);

        for y in 0..HEIGHT {
            for x in 0..WIDTH {
                let ri = raw_index(x, y);
                let word = u16::from_be_bytes([altm[ri * 2], altm[ri * 2 + 1]]);
                let code = xter[ri];

                altitude.set(x, y, (word & 0xF) as i32);
                water.set(x, y, ((word >> 5) & 0xF) as i32);
                tile_type.set(x, y, classify_type(code));
                rotation.set(x, y, classify_rotation(code));
                underwater.set(x, y, code & 0x30 != 0);
            }
        }

        Ok(TerrainMap {
            altitude,
            water,
            tile_type,
            rotation,
            underwater,
        })
    }

    /// Base altitude of a tile, in `[0, 15]`.
    pub fn get_terrain_altitude(&self, x: usize, y: usize) -> i32 {
        *self.altitude.get(x, y)
    }

    /// Water level of a tile, in `[0, 15]`.
    pub fn get_water_altitude(&self, x: usize, y: usize) -> i32 {
        *self.water.get(x, y)
    }

    pub fn tile_type(&self, x: usize, y: usize) -> TileType {
        *self.tile_type.get(x, y)
    }

    pub fn rotation(&self, x: usize, y: usize) -> Rotation {
        *self.rotation.get(x, y)
    }

    /// Whether the tile's type byte carries the submerged flag. Not
    /// implied by the tile type.
    pub fn is_underwater(&self, x: usize, y: usize) -> bool {
        *self.underwater.get(x, y)
    }

    pub fn is_flat(&self, x: usize, y: usize) -> bool {
        matches!(self.tile_type(x, y), TileType::Low | TileType::High)
    }

    pub fn is_slope(&self, x: usize, y: usize) -> bool {
        matches!(
            self.tile_type(x, y),
            TileType::Slope | TileType::CornerLow | TileType::CornerHigh
        )
    }

    pub fn is_waterfall(&self, x: usize, y: usize) -> bool {
        self.tile_type(x, y) == TileType::Waterfall
    }

    pub fn is_canal(&self, x: usize, y: usize) -> bool {
        self.tile_type(x, y) == TileType::Canal
    }

    pub fn is_flooded(&self, x: usize, y: usize) -> bool {
        self.is_underwater(x, y) || self.is_canal(x, y) || self.is_waterfall(x, y)
    }

    /// Continuous height sample at sub-tile resolution. `x` and `y` are
    /// in tile space; the integer part selects the tile and must be in
    /// bounds, the fractional part selects the position inside it.
    pub fn get_smooth_altitude(&self, x: f32, y: f32) -> f32 {
        let xi = x.floor() as i32;
        let yi = y.floor() as i32;
        if !self.altitude.in_bounds(xi, yi) {
            panic!("sample coordinate ({}, {}) outside terrain grid", x, y);
        }
        let (xi, yi) = (xi as usize, yi as usize);

        let altitude = self.get_terrain_altitude(xi, yi) as f32;
        let tile_type = self.tile_type(xi, yi);
        let rotation = self.rotation(xi, yi);
        let underwater = self.is_underwater(xi, yi);

        let mut xf = x - x.floor();
        let mut yf = y - y.floor();

        // canals and waterfalls are carved below their base altitude
        if tile_type == TileType::Canal || tile_type == TileType::Waterfall {
            return altitude - self.canal_depth(xi, yi, xf, yf);
        }

        // ceiling that lets flooded terrain ramp down into a neighboring
        // carved canal instead of leaving a vertical wall
        let mut canal_altitude = altitude + 1.0;
        if self.is_flooded(xi, yi) && self.has_adjacent_canal(xi, yi) {
            canal_altitude -= self.canal_depth(xi, yi, xf, yf);
        }

        // rotate the fractions into the tile's canonical orientation
        match rotation {
            Rotation::None => {}
            Rotation::Clockwise90 => {
                let swap = xf;
                xf = yf;
                yf = 1.0 - swap;
            }
            Rotation::Clockwise180 => {
                xf = 1.0 - xf;
                yf = 1.0 - yf;
            }
            Rotation::Clockwise270 => {
                let swap = xf;
                xf = 1.0 - yf;
                yf = swap;
            }
        }

        let shape = match tile_type {
            TileType::Low => altitude,
            TileType::High => altitude + 1.0,
            TileType::Slope => {
                if underwater {
                    altitude + flooded_slope(xf, yf)
                } else {
                    altitude + slope(xf, yf)
                }
            }
            TileType::CornerLow => {
                if underwater {
                    altitude + flooded_corner_low(xf, yf)
                } else {
                    altitude + corner_low(xf, yf)
                }
            }
            TileType::CornerHigh => {
                if underwater {
                    altitude + flooded_corner_high(xf, yf)
                } else {
                    altitude + corner_high(xf, yf)
                }
            }
            // handled by the early return above
            TileType::Waterfall | TileType::Canal => unreachable!(),
        };

        // canal carving always wins if it produces a lower surface
        shape.min(canal_altitude)
    }

    /// Depth carved below a canal-like tile at fraction (xf, yf), in
    /// `[0, 0.3]`. Evaluates the open corner of each rotation: both edge
    /// neighbors open gives the corner-low profile, only the first the
    /// slope profile, only the diagonal the corner-high profile. The
    /// smallest contribution wins.
    pub fn canal_depth(&self, x: usize, y: usize, xf: f32, yf: f32) -> f32 {
        let (xi, yi) = (x as i32, y as i32);
        let mut depth = CANAL_DEPTH;

        // unrotated
        let c1 = self.is_open(xi, yi - 1);
        let c2 = self.is_open(xi - 1, yi - 1);
        let c3 = self.is_open(xi - 1, yi);
        depth = depth.min(carve_profile(xf, yf, c1, c2, c3));

        // clockwise 90 degrees
        let c1 = self.is_open(xi + 1, yi);
        let c2 = self.is_open(xi + 1, yi - 1);
        let c3 = self.is_open(xi, yi - 1);
        depth = depth.min(carve_profile(yf, 1.0 - xf, c1, c2, c3));

        // clockwise 180 degrees
        let c1 = self.is_open(xi, yi + 1);
        let c2 = self.is_open(xi + 1, yi + 1);
        let c3 = self.is_open(xi + 1, yi);
        depth = depth.min(carve_profile(1.0 - xf, 1.0 - yf, c1, c2, c3));

        // clockwise 270 degrees
        let c1 = self.is_open(xi - 1, yi);
        let c2 = self.is_open(xi - 1, yi + 1);
        let c3 = self.is_open(xi, yi + 1);
        depth = depth.min(carve_profile(1.0 - yf, xf, c1, c2, c3));

        depth.max(0.0)
    }

    /// Whether any of the eight canal-bridging neighbor offsets is a
    /// canal tile. The `(+2, +1)` offset is asymmetric but intentional;
    /// changing it changes rendered geometry.
    pub fn has_adjacent_canal(&self, x: usize, y: usize) -> bool {
        const OFFSETS: [(i32, i32); 8] = [
            (1, 0),
            (2, 1),
            (0, 1),
            (-1, 1),
            (-1, 0),
            (-1, -1),
            (0, -1),
            (1, -1),
        ];
        let (xi, yi) = (x as i32, y as i32);
        OFFSETS
            .iter()
            .any(|&(dx, dy)| self.neighbor_or(xi + dx, yi + dy, true, Self::is_canal))
    }

    /// A neighbor is open if it is not flooded; off-grid neighbors are
    /// open (the map edge never dams a canal).
    fn is_open(&self, x: i32, y: i32) -> bool {
        !self.neighbor_or(x, y, false, Self::is_flooded)
    }

    /// Bounds-checked neighbor lookup: off-grid coordinates report the
    /// edge policy value instead of sampling the map.
    fn neighbor_or(
        &self,
        x: i32,
        y: i32,
        edge: bool,
        f: fn(&TerrainMap, usize, usize) -> bool,
    ) -> bool {
        if !self.altitude.in_bounds(x, y) {
            edge
        } else {
            f(self, x as usize, y as usize)
        }
    }
}

// Shape functions in the canonical (unrotated) orientation. Each returns
// the height above the tile's base altitude for a fraction in [0, 1).

fn slope(_xf: f32, yf: f32) -> f32 {
    1.0 - yf
}

fn corner_low(xf: f32, yf: f32) -> f32 {
    if yf > xf {
        1.0 - yf + xf
    } else {
        1.0
    }
}

fn corner_high(xf: f32, yf: f32) -> f32 {
    if yf < xf {
        xf - yf
    } else {
        0.0
    }
}

// Flooded variants trade the hard diagonal crease for a smoother blend
// with a small constant bias above the waterline.

fn flooded_slope(_xf: f32, yf: f32) -> f32 {
    1.0 - yf + 0.05
}

fn flooded_corner_low(xf: f32, yf: f32) -> f32 {
    ((1.0 - xf) * (1.0 - yf) + xf * (1.0 - yf) + xf * yf + 0.04).min(1.0)
}

fn flooded_corner_high(xf: f32, yf: f32) -> f32 {
    ((1.0 - yf) * xf * 1.05 + 0.02).min(1.0)
}

/// Carve contribution for one rotation of the canal profile, given the
/// rotated fraction and the openness of the two edge neighbors (`c1`,
/// `c3`) and the diagonal between them (`c2`).
fn carve_profile(xf: f32, yf: f32, c1: bool, c2: bool, c3: bool) -> f32 {
    if c1 && c3 {
        1.0 - flooded_corner_low(1.0 - xf, yf)
    } else if c1 {
        1.0 - flooded_slope(1.0 - xf, yf)
    } else if c2 {
        1.0 - flooded_corner_high(1.0 - xf, yf)
    } else {
        1.0
    }
}
