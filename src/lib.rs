//! Geometry preparation for tiled mesh pipelines: turns raw polygon-soup
//! primitives (as produced by format-specific importers) into clean, welded,
//! triangulated geometry ready for LOD batching and tile encoding.
//!
//! The crate is built from a handful of cooperating pieces:
//! - [`octree`]: a generic, arena-backed 8-way spatial partition used for
//!   locality queries during welding.
//! - [`weld`]: tolerance-based vertex welding accelerated by the octree.
//! - [`topology`]: degenerate-face removal, unused-vertex compaction, and the
//!   inverse "unweld" operation.
//! - [`tessellate`]: a constrained triangulator for arbitrary (possibly
//!   concave, possibly holed) 3D polygons.
//! - [`normals`]: per-face and adjacency-averaged per-vertex normals.
//! - [`prepare`]: the cleanup pipeline wiring the above together.
//!
//! # Features
//! - **f64** (default): use f64 as Real
//! - **f32**: use f32 as Real, conflicts with f64
//! - **parallel**: use rayon to process independent primitives concurrently

#![forbid(unsafe_code)]
#![warn(clippy::missing_const_for_fn, clippy::approx_constant, clippy::all)]

pub mod bounding;
pub mod errors;
pub mod float_types;
pub mod mesh;
pub mod normals;
pub mod octree;
pub mod prepare;
pub mod tessellate;
pub mod topology;
pub mod weld;

#[cfg(any(all(feature = "f64", feature = "f32"), not(any(feature = "f64", feature = "f32"))))]
compile_error!("Either 'f64' or 'f32' feature must be specified, but not both");

pub use bounding::Aabb;
pub use mesh::{Face, Mesh, Primitive, SceneNode, Surface, Vertex};
pub use weld::WeldOptions;
