use async_trait::async_trait;

use agora_persistence::executor::{do_with_transaction, ConnType, DbExecutor};

use crate::db::dao::{action_message, flagged_item, listing_item, proposal, vote};
use crate::db::model::{FlaggedItem, Proposal, ProposalType, Vote, VoteCreateRequest};
use crate::error::{Error, Result};
use crate::hash::ContentHash;
use crate::processor::{MessageProcessor, Outcome, ProcessedMessage};
use crate::protocol::validation::{Validate, ValidationError};
use crate::protocol::{MessagingData, ProposalMessage, VoteMessage};
use crate::translator::translate_proposal;

#[derive(Clone, Debug, PartialEq)]
pub enum ProposalAction {
    Add {
        data: MessagingData,
        proposal: ProposalMessage,
    },
    Vote {
        data: MessagingData,
        vote: VoteMessage,
    },
}

/// Handles `MP_PROPOSAL_ADD` and `MP_VOTE`.
///
/// Proposals are keyed by their content hash. An item vote proposal flags the
/// listing item it targets. A vote supersedes the voter's earlier vote on the
/// proposal, and votes are keyed by their transport msgid.
#[derive(Clone)]
pub struct ProposalMessageProcessor {
    db: DbExecutor,
}

impl ProposalMessageProcessor {
    pub fn new(db: DbExecutor) -> Self {
        ProposalMessageProcessor { db }
    }

    async fn add_proposal(
        &self,
        data: MessagingData,
        message: ProposalMessage,
    ) -> Result<ProcessedMessage> {
        let request = message.into_create_request(&data.from);
        request.validate()?;
        let hash = request.hash()?;
        let fallback = hash.clone();

        let result = do_with_transaction(&self.db.pool, "proposal_assemble", move |conn| {
            if let Some(proposal) = proposal::find_by_hash(conn, &hash)? {
                let flagged = find_flagged(conn, &proposal)?;
                return Ok(ProcessedMessage::Proposal {
                    proposal,
                    flagged,
                    outcome: Outcome::MatchedExisting,
                });
            }

            let item_id = match (&request.proposal_type, &request.item) {
                (ProposalType::ItemVote, Some(item)) => Some(
                    listing_item::find_id_by_hash(conn, item)?
                        .ok_or_else(|| Error::not_found("ListingItem", item))?,
                ),
                _ => None,
            };

            let proposal = proposal::create(conn, &hash, &request)?;
            let flagged = match item_id {
                Some(item_id) => {
                    let flagged = flagged_item::flag(
                        conn,
                        item_id,
                        Some(proposal.id),
                        Some(proposal.title.clone()),
                    )?;
                    if action_message::find_by_msgid(conn, &data.msgid)?.is_none() {
                        action_message::create(conn, &translate_proposal(&data, item_id, &hash))?;
                    }
                    Some(flagged)
                }
                None => None,
            };

            log::info!(
                "Assembled {} Proposal [{}] submitted by [{}], voting in blocks [{}, {}].",
                proposal.proposal_type,
                proposal.hash,
                proposal.submitter,
                proposal.block_start,
                proposal.block_end
            );
            Ok(ProcessedMessage::Proposal {
                proposal,
                flagged,
                outcome: Outcome::AssembledNew,
            })
        })
        .await;

        match result {
            Err(Error::AlreadyExists { .. }) => {
                do_with_transaction(&self.db.pool, "proposal_find_existing", move |conn| {
                    let proposal = proposal::find_by_hash(conn, &fallback)?
                        .ok_or_else(|| Error::not_found("Proposal", fallback))?;
                    let flagged = find_flagged(conn, &proposal)?;
                    Ok(ProcessedMessage::Proposal {
                        proposal,
                        flagged,
                        outcome: Outcome::MatchedExisting,
                    })
                })
                .await
            }
            result => result,
        }
    }

    async fn add_vote(&self, data: MessagingData, message: VoteMessage) -> Result<ProcessedMessage> {
        let msgid = data.msgid.clone();
        let proposal_hash = message.proposal_hash.clone();

        let result = do_with_transaction(&self.db.pool, "vote_assemble", move |conn| {
            let proposal = proposal::find_by_hash(conn, &message.proposal_hash)?
                .ok_or_else(|| Error::not_found("Proposal", &message.proposal_hash))?;
            if let Some(vote) = vote::find_by_msgid(conn, &data.msgid)? {
                return matched_vote(vote, proposal);
            }

            let option = proposal.option(message.option_id).ok_or_else(|| {
                Error::not_found(
                    "ProposalOption",
                    format!("{} of Proposal {}", message.option_id, proposal.hash),
                )
            })?;
            let request = VoteCreateRequest {
                voter: data.from.clone(),
                msgid: data.msgid.clone(),
                block: message.block,
                weight: message.weight,
                proposal_option_id: option.id,
            };
            request.validate()?;

            let vote = vote::record(conn, &proposal, &request)?;
            log::debug!(
                "Voter [{}] voted for option {} of Proposal [{}] with weight {}.",
                vote.voter,
                message.option_id,
                proposal.hash,
                vote.weight
            );
            Ok(ProcessedMessage::Vote {
                vote,
                proposal,
                outcome: Outcome::AssembledNew,
            })
        })
        .await;

        match result {
            Err(Error::AlreadyExists { .. }) => {
                do_with_transaction(&self.db.pool, "vote_find_existing", move |conn| {
                    let proposal = proposal::find_by_hash(conn, &proposal_hash)?
                        .ok_or_else(|| Error::not_found("Proposal", &proposal_hash))?;
                    let vote = vote::find_by_msgid(conn, &msgid)?
                        .ok_or_else(|| Error::not_found("Vote", &msgid))?;
                    matched_vote(vote, proposal)
                })
                .await
            }
            result => result,
        }
    }
}

/// A redelivered vote message. Its msgid must belong to a vote on the same
/// proposal.
fn matched_vote(vote: Vote, proposal: Proposal) -> Result<ProcessedMessage> {
    if !proposal
        .options
        .iter()
        .any(|option| option.id == vote.proposal_option_id)
    {
        return Err(ValidationError::invalid(
            "msgid",
            format!(
                "{} already cast a vote outside of Proposal {}",
                vote.msgid, proposal.hash
            ),
        )
        .into());
    }
    Ok(ProcessedMessage::Vote {
        vote,
        proposal,
        outcome: Outcome::MatchedExisting,
    })
}

fn find_flagged(conn: &ConnType, proposal: &Proposal) -> Result<Option<FlaggedItem>> {
    let item: &ContentHash = match (&proposal.proposal_type, &proposal.item) {
        (ProposalType::ItemVote, Some(item)) => item,
        _ => return Ok(None),
    };
    match listing_item::find_id_by_hash(conn, item)? {
        Some(item_id) => flagged_item::find_by_listing_item(conn, item_id),
        None => Ok(None),
    }
}

#[async_trait]
impl MessageProcessor for ProposalMessageProcessor {
    type Message = ProposalAction;

    async fn process(&self, action: ProposalAction) -> Result<ProcessedMessage> {
        match action {
            ProposalAction::Add { data, proposal } => self.add_proposal(data, proposal).await,
            ProposalAction::Vote { data, vote } => self.add_vote(data, vote).await,
        }
    }
}
