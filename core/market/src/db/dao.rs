//! Per-entity repositories.
//!
//! Each module holds synchronous functions taking a connection, used to
//! compose multi-entity transactions, and a DAO running them in their own
//! transaction.
pub(crate) mod action_message;
pub(crate) mod bid;
pub(crate) mod escrow;
pub(crate) mod flagged_item;
pub(crate) mod item_price;
pub(crate) mod listing_content;
pub(crate) mod listing_item;
pub(crate) mod listing_item_template;
pub(crate) mod message_children;
pub(crate) mod payment_information;
pub(crate) mod proposal;
pub(crate) mod proposal_result;
pub(crate) mod vote;

pub use action_message::ActionMessageDao;
pub use bid::BidDao;
pub use escrow::EscrowDao;
pub use flagged_item::FlaggedItemDao;
pub use item_price::ItemPriceDao;
pub use listing_item::ListingItemDao;
pub use listing_item_template::ListingItemTemplateDao;
pub use payment_information::PaymentInformationDao;
pub use proposal::ProposalDao;
pub use vote::VoteDao;
