mod action_message;
mod bid;
mod escrow;
mod flagged_item;
mod item_price;
mod listing_item;
mod payment_information;
mod proposal;

pub use action_message::{
    ActionMessage, ActionMessageCreateRequest, ActionType, MessageData, MessageDataCreateRequest,
    MessageEscrow, MessageEscrowCreateRequest, MessageInfo, MessageInfoCreateRequest,
    MessageObject, MessageObjectCreateRequest,
};
pub(crate) use action_message::ActionMessageRow;
pub use bid::{Bid, BidCreateRequest, BidData, BidDataCreateRequest, BidStatus};
pub(crate) use bid::BidRow;
pub use escrow::{
    Escrow, EscrowCreateRequest, EscrowRatio, EscrowRatioCreateRequest, EscrowType,
    EscrowUpdateRequest,
};
pub(crate) use escrow::EscrowRow;
pub use flagged_item::FlaggedItem;
pub(crate) use flagged_item::NewFlaggedItem;
pub use item_price::{
    CryptocurrencyAddress, CryptocurrencyAddressCreateRequest, CryptocurrencyAddressType,
    ItemPrice, ItemPriceCreateRequest, ItemPriceUpdateRequest, ShippingPrice,
    ShippingPriceCreateRequest,
};
pub(crate) use item_price::ItemPriceRow;
pub use listing_item::{
    ItemInformation, ItemInformationCreateRequest, ListingItem, ListingItemContent,
    ListingItemCreateRequest, ListingItemObject, ListingItemObjectCreateRequest,
    ListingItemObjectType, ListingItemTemplate, ListingOwner, MessagingInformation,
    MessagingInformationCreateRequest, MessagingProtocol,
};
pub(crate) use listing_item::{
    ListingContent, ListingItemRow, ListingItemTemplateRow, NewListingItem,
    NewListingItemTemplate,
};
pub use payment_information::{
    PaymentInformation, PaymentInformationCreateRequest, PaymentInformationUpdateRequest,
    PaymentType,
};
pub(crate) use payment_information::PaymentInformationRow;
pub use proposal::{
    Proposal, ProposalCreateRequest, ProposalOption, ProposalOptionCreateRequest,
    ProposalOptionResult, ProposalResult, ProposalType, ProposalUpdateRequest, Vote,
    VoteCreateRequest,
};
pub(crate) use proposal::{
    NewProposalOptionResult, NewProposalResult, ProposalResultRow, ProposalRow,
};
