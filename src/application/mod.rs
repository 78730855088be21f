//! Application layer - relay service, HTTP surface, auto-bot and CLI

pub mod bot_controller;
pub mod commands;
pub mod context;
pub mod responses;
pub mod scheduler;
pub mod server;
pub mod services;

pub use bot_controller::{BotController, BotSettings, BotState, BotStats, BotStatus};
pub use commands::{Cli, CommandExecutor, Commands};
pub use context::AppContext;
pub use scheduler::PeriodicTask;
pub use server::AppState;
pub use services::RelayService;
