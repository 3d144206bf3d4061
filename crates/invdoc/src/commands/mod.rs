//! CLI command implementations.

pub(crate) mod build;
pub(crate) mod node;

pub(crate) use build::BuildArgs;
pub(crate) use node::NodeArgs;
