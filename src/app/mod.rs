// Application layer: runs the scrape pipeline for each (keyword, domain) pair.

pub mod workflow;

pub use workflow::{run_all, scrape_workflow, RunFlags, RunSummary, WorkflowOutcome};
