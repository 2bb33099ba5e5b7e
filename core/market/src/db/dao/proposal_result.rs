use chrono::Utc;
use diesel::{ExpressionMethods, OptionalExtension, QueryDsl, RunQueryDsl};
use std::collections::{HashMap, HashSet};

use agora_persistence::executor::{last_insert_id, ConnType};

use crate::db::dao::vote;
use crate::db::model::{
    NewProposalOptionResult, NewProposalResult, Proposal, ProposalOptionResult, ProposalResult,
    ProposalResultRow,
};
use crate::db::schema::{proposal_option_results, proposal_results};
use crate::error::{DbContext, Error, Result};
use crate::protocol::validation::ValidationError;

/// Sums weights and counts voters per option and stores the outcome as a new
/// snapshot. Each voter counts once, with their latest vote cast up to
/// `block`. Options without votes get a zero row.
pub(crate) fn create_snapshot(
    conn: &ConnType,
    proposal: &Proposal,
    block: i64,
) -> Result<ProposalResult> {
    let votes = vote::current_for_proposal(conn, proposal.id, Some(block))?;

    let mut weights: HashMap<i32, i64> = HashMap::new();
    let mut voters: HashMap<i32, HashSet<&str>> = HashMap::new();
    for vote in &votes {
        let weight = weights.entry(vote.proposal_option_id).or_default();
        *weight = weight
            .checked_add(vote.weight)
            .ok_or_else(|| ValidationError::WeightOverflow(proposal.hash.to_string()))?;
        voters
            .entry(vote.proposal_option_id)
            .or_default()
            .insert(vote.voter.as_str());
    }
    weights
        .values()
        .try_fold(0i64, |total, weight| total.checked_add(*weight))
        .ok_or_else(|| ValidationError::WeightOverflow(proposal.hash.to_string()))?;

    diesel::insert_into(proposal_results::table)
        .values(&NewProposalResult {
            block,
            proposal_id: proposal.id,
            created_at: Utc::now().naive_utc(),
        })
        .execute(conn)
        .context("Could not create the ProposalResult!")?;
    let result_id = last_insert_id(conn).context("Could not create the ProposalResult!")?;

    for option in &proposal.options {
        diesel::insert_into(proposal_option_results::table)
            .values(&NewProposalOptionResult {
                weight: weights.get(&option.id).copied().unwrap_or(0),
                voters: voters.get(&option.id).map(|v| v.len() as i32).unwrap_or(0),
                proposal_option_id: option.id,
                proposal_result_id: result_id,
            })
            .execute(conn)
            .context("Could not create the ProposalOptionResult!")?;
    }
    find(conn, result_id)
}

pub(crate) fn find(conn: &ConnType, id: i32) -> Result<ProposalResult> {
    let row = proposal_results::table
        .find(id)
        .first::<ProposalResultRow>(conn)
        .optional()
        .context("Could not load the ProposalResult!")?
        .ok_or_else(|| Error::not_found("ProposalResult", id))?;
    hydrate(conn, row)
}

pub(crate) fn find_latest(conn: &ConnType, proposal_id: i32) -> Result<Option<ProposalResult>> {
    proposal_results::table
        .filter(proposal_results::proposal_id.eq(proposal_id))
        .order_by(proposal_results::id.desc())
        .first::<ProposalResultRow>(conn)
        .optional()
        .context("Could not load the ProposalResult!")?
        .map(|row| hydrate(conn, row))
        .transpose()
}

fn hydrate(conn: &ConnType, row: ProposalResultRow) -> Result<ProposalResult> {
    let options = proposal_option_results::table
        .filter(proposal_option_results::proposal_result_id.eq(row.id))
        .order_by(proposal_option_results::proposal_option_id.asc())
        .load::<ProposalOptionResult>(conn)
        .context("Could not load the ProposalOptionResults!")?;
    Ok(ProposalResult::from_row(row, options))
}
