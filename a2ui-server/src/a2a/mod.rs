pub mod card;
pub mod tasks;

pub use card::build_agent_card;
pub use tasks::{create_a2a_router, A2aController, Task, TaskHandler, TaskStore};
