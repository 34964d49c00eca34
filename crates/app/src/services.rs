//! Application services: the long-running components.
//!
//! Each service struct accepts port trait implementations via generic parameters
//! (constructor injection), keeping this layer decoupled from concrete adapters.
//! Every service exposes a `run` loop that consumes its channel (or polls) until
//! the store goes away, handling each message in isolation.

pub mod command_processor;
pub mod program_book;
pub mod program_scheduler;
pub mod timer_manager;
pub mod trigger_router;

pub use command_processor::{CommandProcessor, CommandProcessorConfig, GroupSettings};
pub use program_book::ProgramBook;
pub use program_scheduler::{ProgramScheduler, SchedulerConfig};
pub use timer_manager::{TimerConfig, TimerManager};
pub use trigger_router::{TriggerRouter, TriggerRouterConfig};
