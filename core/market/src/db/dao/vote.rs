use chrono::Utc;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use diesel::{ExpressionMethods, OptionalExtension, QueryDsl, RunQueryDsl};
use std::collections::HashMap;

use agora_persistence::executor::{
    do_with_transaction, last_insert_id, readonly_transaction, AsDao, ConnType, PoolType,
};

use crate::db::dao::proposal;
use crate::db::model::{Proposal, Vote, VoteCreateRequest};
use crate::db::schema::{proposal_options, votes};
use crate::error::{DbContext, Error, Result};
use crate::protocol::validation::{Validate, ValidationError};

pub struct VoteDao<'c> {
    pool: &'c PoolType,
}

impl<'c> AsDao<'c> for VoteDao<'c> {
    fn as_dao(pool: &'c PoolType) -> Self {
        Self { pool }
    }
}

impl<'c> VoteDao<'c> {
    /// Records the vote. An earlier vote of the same voter on the proposal is
    /// superseded but kept, so tallies at earlier blocks still count it.
    pub async fn create(&self, proposal_id: i32, request: VoteCreateRequest) -> Result<Vote> {
        request.validate()?;
        do_with_transaction(self.pool, "vote_create", move |conn| {
            let proposal = proposal::find(conn, proposal_id)?;
            record(conn, &proposal, &request)
        })
        .await
    }

    /// Every vote cast on the proposal, superseded ones included.
    pub async fn list(&self, proposal_id: i32, up_to_block: Option<i64>) -> Result<Vec<Vote>> {
        readonly_transaction(self.pool, "vote_list", move |conn| {
            list_for_proposal(conn, proposal_id, up_to_block)
        })
        .await
    }

    /// Latest vote of each voter, optionally as of `up_to_block`.
    pub async fn current(&self, proposal_id: i32, up_to_block: Option<i64>) -> Result<Vec<Vote>> {
        readonly_transaction(self.pool, "vote_current", move |conn| {
            current_for_proposal(conn, proposal_id, up_to_block)
        })
        .await
    }

    pub async fn find_by_msgid(&self, msgid: String) -> Result<Option<Vote>> {
        readonly_transaction(self.pool, "vote_find_by_msgid", move |conn| {
            find_by_msgid(conn, &msgid)
        })
        .await
    }
}

/// Inserts the vote as the voter's current one. It may not predate the vote
/// it supersedes.
pub(crate) fn record(
    conn: &ConnType,
    proposal: &Proposal,
    request: &VoteCreateRequest,
) -> Result<Vote> {
    if !proposal
        .options
        .iter()
        .any(|option| option.id == request.proposal_option_id)
    {
        return Err(Error::not_found(
            "ProposalOption",
            format!("{} of Proposal {}", request.proposal_option_id, proposal.hash),
        ));
    }
    if !proposal.is_open_at(request.block) {
        return Err(ValidationError::VoteOutsideWindow {
            block: request.block,
            start: proposal.block_start,
            end: proposal.block_end,
        }
        .into());
    }

    if let Some(current) = find_by_voter(conn, proposal, &request.voter)? {
        if request.block < current.block {
            return Err(ValidationError::StaleVote {
                block: request.block,
                current: current.block,
            }
            .into());
        }
        log::debug!(
            "Voter [{}] changed the vote on Proposal [{}].",
            request.voter,
            proposal.hash
        );
    }

    match diesel::insert_into(votes::table)
        .values(&request.to_new(Utc::now().naive_utc()))
        .execute(conn)
    {
        Err(DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _)) => {
            return Err(Error::AlreadyExists {
                entity: "Vote",
                id: request.msgid.clone(),
            })
        }
        result => result.context("Could not create the Vote!")?,
    };
    let id = last_insert_id(conn).context("Could not create the Vote!")?;

    votes::table
        .find(id)
        .first::<Vote>(conn)
        .context("Could not load the Vote!")
}

/// Votes on any option of the proposal, optionally only those cast up to and
/// including `up_to_block`.
pub(crate) fn list_for_proposal(
    conn: &ConnType,
    proposal_id: i32,
    up_to_block: Option<i64>,
) -> Result<Vec<Vote>> {
    let mut query = votes::table
        .inner_join(proposal_options::table)
        .filter(proposal_options::proposal_id.eq(proposal_id))
        .select(votes::all_columns)
        .order_by(votes::id.asc())
        .into_boxed();
    if let Some(block) = up_to_block {
        query = query.filter(votes::block.le(block));
    }
    query
        .load::<Vote>(conn)
        .context("Could not load the Votes!")
}

/// One vote per voter: the one with the highest block, the later one on equal
/// blocks.
pub(crate) fn current_for_proposal(
    conn: &ConnType,
    proposal_id: i32,
    up_to_block: Option<i64>,
) -> Result<Vec<Vote>> {
    let mut latest: HashMap<String, Vote> = HashMap::new();
    for vote in list_for_proposal(conn, proposal_id, up_to_block)? {
        let newer_known = latest
            .get(&vote.voter)
            .map_or(false, |current| current.block > vote.block);
        if !newer_known {
            latest.insert(vote.voter.clone(), vote);
        }
    }
    let mut votes: Vec<Vote> = latest.into_values().collect();
    votes.sort_by_key(|vote| vote.id);
    Ok(votes)
}

/// Current vote of `voter` on any option of the proposal.
pub(crate) fn find_by_voter(conn: &ConnType, proposal: &Proposal, voter: &str) -> Result<Option<Vote>> {
    let option_ids: Vec<i32> = proposal.options.iter().map(|option| option.id).collect();
    votes::table
        .filter(votes::voter.eq(voter))
        .filter(votes::proposal_option_id.eq_any(option_ids))
        .order_by((votes::block.desc(), votes::id.desc()))
        .first::<Vote>(conn)
        .optional()
        .context("Could not load the Vote!")
}

pub(crate) fn find_by_msgid(conn: &ConnType, msgid: &str) -> Result<Option<Vote>> {
    votes::table
        .filter(votes::msgid.eq(msgid))
        .first::<Vote>(conn)
        .optional()
        .context("Could not load the Vote!")
}
