pub mod command;
pub mod graphql;
pub mod scripted;

pub use command::{CommandConfig, CommandFetcher};
pub use graphql::games_query;
pub use scripted::{catalog_payload, ScriptedFetcher, ScriptedResponse};
