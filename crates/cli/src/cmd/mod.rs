mod generate;
mod graph;

pub use generate::{GenArgs, cmd_gen};
pub use graph::cmd_graph;
