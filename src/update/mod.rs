// Update module - turns device and repository state into an install plan
//
// - plan: UpdateRecord, classification buckets and per-scan skip counts
// - planner: UpdatePlanner, runs the version analysis per installed package
// - interaction: prompts for questionable updates and the final go-ahead
pub mod interaction;
pub mod plan;
pub mod planner;

pub use interaction::{InteractionMode, UpdateInteraction};
pub use plan::{ClassifiedUpdate, ScanOutcome, SkipReason, UpdatePlan, UpdateRecord};
pub use planner::UpdatePlanner;
