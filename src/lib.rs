//! City save decoding and voxel synthesis library
//!
//! Decodes the tagged-chunk save container, rebuilds the 128x128 terrain
//! grid with its continuous height field, and synthesizes a block world
//! from it. Re-exports modules for use by binaries and tools.

pub mod canvas;
pub mod container;
pub mod error;
pub mod export;
pub mod structures;
pub mod synth;
pub mod terrain;
pub mod tilemap;
