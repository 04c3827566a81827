//! Structure lookups the synthesizer consults per tile.
//!
//! Building rendering itself is out of scope here; the synthesizer only
//! needs to know whether a lot is empty and how densely it is wooded.
//! The trait keeps the door open for a real building decoder without
//! the terrain pipeline depending on one.

/// Per-tile structure queries, addressed in logical tile coordinates.
pub trait StructureQuery {
    /// No building, road, rail, powerline or other occupant on the lot.
    fn is_empty_lot(&self, x: usize, y: usize) -> bool;

    fn is_road(&self, x: usize, y: usize) -> bool;

    fn is_highway(&self, x: usize, y: usize) -> bool;

    fn is_rail(&self, x: usize, y: usize) -> bool;

    fn is_powerline(&self, x: usize, y: usize) -> bool;

    /// Wooded density of the lot, 0 for bare ground.
    fn tree_density(&self, x: usize, y: usize) -> u32;
}

/// A map with nothing built on it: every lot is empty and bare.
pub struct NoStructures;

impl StructureQuery for NoStructures {
    fn is_empty_lot(&self, _x: usize, _y: usize) -> bool {
        true
    }

    fn is_road(&self, _x: usize, _y: usize) -> bool {
        false
    }

    fn is_highway(&self, _x: usize, _y: usize) -> bool {
        false
    }

    fn is_rail(&self, _x: usize, _y: usize) -> bool {
        false
    }

    fn is_powerline(&self, _x: usize, _y: usize) -> bool {
        false
    }

    fn tree_density(&self, _x: usize, _y: usize) -> u32 {
        0
    }
}
