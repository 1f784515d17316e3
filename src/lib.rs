//! Decider core engine: a plan-driven workflow state machine that replays
//! an event history into step transitions and emits the next activities
//! to schedule.

pub mod activity;
pub mod config;
pub mod context;
pub mod error;
pub mod events;
pub mod expr;
pub mod loader;
pub mod plan;
pub mod result;
pub mod schema;
pub mod state_machine;
pub mod step;
pub mod step_state;
pub mod template;
pub mod workflow_state;

/// Core engine version.
pub const VERSION: &str = "0.1.0";

/// Initialize ambient logging. Call once at the outermost boundary of any
/// binary or embedding built on top of this crate; library code never
/// initializes a logger itself.
pub fn init() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::try_init()?;
    log::info!("decider-core v{} initialized", VERSION);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_does_not_panic() {
        let _ = init();
    }
}
