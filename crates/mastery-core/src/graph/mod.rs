//! Knowledge graph assembly for rendering

mod assembler;

pub use assembler::{
    AssembledGraph, GraphStats, HIGH_THRESHOLD, MEDIUM_THRESHOLD, MasteryLevel, RenderLink,
    RenderNode, assemble, edge_color,
};
