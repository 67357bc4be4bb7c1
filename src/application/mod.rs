// Application layer - poll cycle, monitor state and operator use cases
pub mod actions;
pub mod backend;
pub mod clock;
pub mod monitor;
pub mod poll_cycle;
pub mod redraw_gate;
pub mod renderer;
pub mod scheduler;

#[cfg(test)]
pub mod test_support;
