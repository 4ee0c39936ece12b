#![forbid(unsafe_code)]

//! Core: edge-rectangle geometry and logging bootstrap.
//!
//! # Role in floatpane
//! `floatpane-core` holds the leaf primitives shared by the state engine
//! (`floatpane-layout`) and the host-facing runtime (`floatpane-runtime`):
//! the edge-distance rectangle that every container position is expressed
//! in, viewport and pointer types, and the `tracing` subscriber setup.

pub mod geometry;
pub mod logging;

pub use geometry::{
    Axis, Edge, EdgeRect, MIN_CONTAINER_HEIGHT, MIN_CONTAINER_WIDTH, MinSize, PointerPosition,
    Viewport,
};
