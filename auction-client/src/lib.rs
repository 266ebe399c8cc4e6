pub mod abi;
pub mod config;
pub mod create;
pub mod detail;
pub mod dispatcher;
pub mod enricher;
pub mod listing;
pub mod paginator;
pub mod reader;
pub mod rpc;
pub mod scroll;

#[cfg(test)]
mod mock;

pub use config::{load_config, ClientConfig};
pub use create::CreateForm;
pub use detail::{AuctionView, DetailModel};
pub use dispatcher::ActionDispatcher;
pub use enricher::{EnrichmentTable, ItemEnricher};
pub use listing::{CardModel, ListStatus, ListingView};
pub use paginator::IncrementalPaginator;
pub use reader::RemoteCollectionReader;
pub use rpc::{GatewayError, JsonRpcGateway};
pub use scroll::{Footer, Observation, ScrollTrigger};
