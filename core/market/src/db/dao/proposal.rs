use chrono::Utc;
use diesel::dsl::count_star;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use diesel::{ExpressionMethods, OptionalExtension, QueryDsl, RunQueryDsl};

use agora_persistence::executor::{
    do_with_transaction, last_insert_id, readonly_transaction, AsDao, ConnType, PoolType,
};

use crate::db::model::{
    Proposal, ProposalCreateRequest, ProposalOption, ProposalOptionCreateRequest, ProposalRow,
    ProposalUpdateRequest,
};
use crate::db::schema::{proposal_options, proposals, votes};
use crate::error::{DbContext, Error, Result};
use crate::hash::ContentHash;
use crate::protocol::validation::{Validate, ValidationError};

pub struct ProposalDao<'c> {
    pool: &'c PoolType,
}

impl<'c> AsDao<'c> for ProposalDao<'c> {
    fn as_dao(pool: &'c PoolType) -> Self {
        Self { pool }
    }
}

impl<'c> ProposalDao<'c> {
    /// Proposals are identified by their content hash. Creating the same
    /// proposal twice returns the stored one.
    pub async fn create(&self, request: ProposalCreateRequest) -> Result<Proposal> {
        request.validate()?;
        let hash = request.hash()?;
        do_with_transaction(self.pool, "proposal_create", move |conn| {
            match find_by_hash(conn, &hash)? {
                Some(proposal) => Ok(proposal),
                None => create(conn, &hash, &request),
            }
        })
        .await
    }

    pub async fn get(&self, id: i32) -> Result<Proposal> {
        readonly_transaction(self.pool, "proposal_get", move |conn| find(conn, id)).await
    }

    pub async fn get_by_hash(&self, hash: &ContentHash) -> Result<Proposal> {
        let hash = hash.clone();
        readonly_transaction(self.pool, "proposal_get_by_hash", move |conn| {
            find_by_hash(conn, &hash)?.ok_or_else(|| Error::not_found("Proposal", hash))
        })
        .await
    }

    pub async fn update(&self, id: i32, request: ProposalUpdateRequest) -> Result<Proposal> {
        request.validate()?;
        do_with_transaction(self.pool, "proposal_update", move |conn| {
            update(conn, id, &request)
        })
        .await
    }

    pub async fn destroy(&self, id: i32) -> Result<()> {
        do_with_transaction(self.pool, "proposal_destroy", move |conn| destroy(conn, id)).await
    }
}

pub(crate) fn create(
    conn: &ConnType,
    hash: &ContentHash,
    request: &ProposalCreateRequest,
) -> Result<Proposal> {
    match diesel::insert_into(proposals::table)
        .values(&request.to_new(hash.clone(), Utc::now().naive_utc()))
        .execute(conn)
    {
        Err(DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _)) => {
            return Err(Error::AlreadyExists {
                entity: "Proposal",
                id: hash.to_string(),
            })
        }
        result => result.context("Could not create the Proposal!")?,
    };
    let id = last_insert_id(conn).context("Could not create the Proposal!")?;

    create_options(conn, id, hash, &request.options)?;
    find(conn, id)
}

fn create_options(
    conn: &ConnType,
    proposal_id: i32,
    proposal_hash: &ContentHash,
    options: &[ProposalOptionCreateRequest],
) -> Result<()> {
    for option in options {
        diesel::insert_into(proposal_options::table)
            .values(&option.to_new(proposal_id, proposal_hash)?)
            .execute(conn)
            .context("Could not create the ProposalOption!")?;
    }
    Ok(())
}

pub(crate) fn find(conn: &ConnType, id: i32) -> Result<Proposal> {
    let row = proposals::table
        .find(id)
        .first::<ProposalRow>(conn)
        .optional()
        .context("Could not load the Proposal!")?
        .ok_or_else(|| Error::not_found("Proposal", id))?;
    hydrate(conn, row)
}

pub(crate) fn find_by_hash(conn: &ConnType, hash: &ContentHash) -> Result<Option<Proposal>> {
    proposals::table
        .filter(proposals::hash.eq(hash))
        .first::<ProposalRow>(conn)
        .optional()
        .context("Could not load the Proposal!")?
        .map(|row| hydrate(conn, row))
        .transpose()
}

fn hydrate(conn: &ConnType, row: ProposalRow) -> Result<Proposal> {
    let options = proposal_options::table
        .filter(proposal_options::proposal_id.eq(row.id))
        .order_by(proposal_options::option_id.asc())
        .load::<ProposalOption>(conn)
        .context("Could not load the ProposalOptions!")?;
    Ok(Proposal::from_row(row, options))
}

pub(crate) fn count_votes(conn: &ConnType, proposal_id: i32) -> Result<i64> {
    votes::table
        .inner_join(proposal_options::table)
        .filter(proposal_options::proposal_id.eq(proposal_id))
        .select(count_star())
        .first::<i64>(conn)
        .context("Could not count the Votes!")
}

/// Overwrites the scalars. Options are replaced only while nobody has voted,
/// since votes point at option rows.
pub(crate) fn update(conn: &ConnType, id: i32, request: &ProposalUpdateRequest) -> Result<Proposal> {
    let current = find(conn, id)?;
    if request.block_end < current.block_start {
        return Err(ValidationError::invalid(
            "proposal.blockEnd",
            format!(
                "block end {} is before block start {}",
                request.block_end, current.block_start
            ),
        )
        .into());
    }

    diesel::update(proposals::table.find(id))
        .set((
            proposals::block_end.eq(request.block_end),
            proposals::title.eq(&request.title),
            proposals::description.eq(&request.description),
            proposals::updated_at.eq(Utc::now().naive_utc()),
        ))
        .execute(conn)
        .context("Could not update the Proposal!")?;

    if let Some(options) = &request.options {
        if count_votes(conn, id)? > 0 {
            return Err(ValidationError::ProposalHasVotes(current.hash.to_string()).into());
        }
        diesel::delete(proposal_options::table.filter(proposal_options::proposal_id.eq(id)))
            .execute(conn)
            .context("Could not remove the ProposalOptions!")?;
        create_options(conn, id, &current.hash, options)?;
    }
    find(conn, id)
}

pub(crate) fn destroy(conn: &ConnType, id: i32) -> Result<()> {
    // Votes and results go with the options through cascades.
    diesel::delete(proposal_options::table.filter(proposal_options::proposal_id.eq(id)))
        .execute(conn)
        .context("Could not remove the ProposalOptions!")?;
    let deleted = diesel::delete(proposals::table.find(id))
        .execute(conn)
        .context("Could not remove the Proposal!")?;
    match deleted {
        0 => Err(Error::not_found("Proposal", id)),
        _ => Ok(()),
    }
}
