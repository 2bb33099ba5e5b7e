#[macro_use]
extern crate diesel;

pub mod config;
pub mod db;
pub mod error;
pub mod hash;
pub mod market;
pub mod processor;
pub mod protocol;
pub mod tally;
pub mod testing;
pub mod translator;
pub mod worker;

pub use config::Config;
pub use error::{Error, Result};
pub use hash::{ContentHash, HashableObjectType};
pub use market::{MarketInitError, MarketService};
pub use processor::{Outcome, ProcessedMessage};
pub use protocol::{MarketplaceMessage, MessagingData, ReceivedMessage};
pub use worker::{WorkerStats, Workers};
