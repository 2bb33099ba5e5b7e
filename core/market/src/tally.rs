use agora_persistence::executor::{do_with_transaction, readonly_transaction, DbExecutor};

use crate::db::dao::{proposal, proposal_result};
use crate::db::model::ProposalResult;
use crate::error::{Error, Result};
use crate::hash::ContentHash;

/// Recomputes proposal results from the stored votes.
#[derive(Clone)]
pub struct ProposalTally {
    db: DbExecutor,
}

impl ProposalTally {
    pub fn new(db: DbExecutor) -> Self {
        ProposalTally { db }
    }

    /// Counts votes cast up to `block`, which defaults to the end of the
    /// voting window, and stores the result as a new snapshot.
    pub async fn recalculate(
        &self,
        proposal_hash: &ContentHash,
        block: Option<i64>,
    ) -> Result<ProposalResult> {
        let hash = proposal_hash.clone();
        do_with_transaction(&self.db.pool, "proposal_tally", move |conn| {
            let proposal = proposal::find_by_hash(conn, &hash)?
                .ok_or_else(|| Error::not_found("Proposal", &hash))?;
            let block = block.unwrap_or(proposal.block_end);

            let result = proposal_result::create_snapshot(conn, &proposal, block)?;
            match result.winner() {
                Some(winner) => log::info!(
                    "Proposal [{}] at block {}: option {} leads with weight {} of {}.",
                    proposal.hash,
                    block,
                    winner.proposal_option_id,
                    winner.weight,
                    result.total_weight().unwrap_or_default()
                ),
                None => log::info!(
                    "Proposal [{}] at block {}: no winner, total weight {}.",
                    proposal.hash,
                    block,
                    result.total_weight().unwrap_or_default()
                ),
            }
            Ok(result)
        })
        .await
    }

    pub async fn latest(&self, proposal_hash: &ContentHash) -> Result<Option<ProposalResult>> {
        let hash = proposal_hash.clone();
        readonly_transaction(&self.db.pool, "proposal_tally_latest", move |conn| {
            let proposal = proposal::find_by_hash(conn, &hash)?
                .ok_or_else(|| Error::not_found("Proposal", &hash))?;
            proposal_result::find_latest(conn, proposal.id)
        })
        .await
    }
}
