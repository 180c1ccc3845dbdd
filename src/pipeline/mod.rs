//! 工作流：单轮状态、三个阶段（route / generate / finalize）与顺序运行器

pub mod graph;
pub mod stages;
pub mod state;

pub use graph::{Branch, Pipeline, PipelineBuilder, PipelineError, PipelinePhase, RouteFn};
pub use stages::{finalize, generate, route, GENERAL_LLM};
pub use state::{TurnState, TurnUpdate, NO_RESPONSE};
