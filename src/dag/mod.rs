//! DAG analysis: the `depends` expression grammar and the task dependency graph.

pub mod depends;
pub mod graph;

pub use depends::{DependencyType, DependsError, DependsExpr, TaskResult};
pub use graph::TaskGraph;
