use diesel::{ExpressionMethods, OptionalExtension, QueryDsl, RunQueryDsl};

use agora_persistence::executor::{
    do_with_transaction, last_insert_id, readonly_transaction, AsDao, ConnType, PoolType,
};

use crate::db::model::{
    Escrow, EscrowCreateRequest, EscrowRatio, EscrowRatioCreateRequest, EscrowRow,
    EscrowUpdateRequest,
};
use crate::db::schema::{escrow_ratios, escrows};
use crate::error::{DbContext, Error, Result};
use crate::protocol::validation::Validate;

pub struct EscrowDao<'c> {
    pool: &'c PoolType,
}

impl<'c> AsDao<'c> for EscrowDao<'c> {
    fn as_dao(pool: &'c PoolType) -> Self {
        Self { pool }
    }
}

impl<'c> EscrowDao<'c> {
    pub async fn create(
        &self,
        payment_information_id: i32,
        request: EscrowCreateRequest,
    ) -> Result<Escrow> {
        request.validate()?;
        do_with_transaction(self.pool, "escrow_create", move |conn| {
            create(conn, payment_information_id, &request)
        })
        .await
    }

    pub async fn get(&self, id: i32) -> Result<Escrow> {
        readonly_transaction(self.pool, "escrow_get", move |conn| find(conn, id)).await
    }

    pub async fn update(&self, id: i32, request: EscrowUpdateRequest) -> Result<Escrow> {
        request.validate()?;
        do_with_transaction(self.pool, "escrow_update", move |conn| {
            update(conn, id, &request)
        })
        .await
    }

    pub async fn destroy(&self, id: i32) -> Result<()> {
        do_with_transaction(self.pool, "escrow_destroy", move |conn| destroy(conn, id)).await
    }
}

pub(crate) fn create(
    conn: &ConnType,
    payment_information_id: i32,
    request: &EscrowCreateRequest,
) -> Result<Escrow> {
    diesel::insert_into(escrows::table)
        .values(&request.to_new(payment_information_id))
        .execute(conn)
        .context("Could not create the Escrow!")?;
    let escrow_id = last_insert_id(conn).context("Could not create the Escrow!")?;

    create_ratio(conn, escrow_id, &request.ratio)?;
    find(conn, escrow_id)
}

pub(crate) fn find(conn: &ConnType, id: i32) -> Result<Escrow> {
    let row = escrows::table
        .find(id)
        .first::<EscrowRow>(conn)
        .optional()
        .context("Could not load the Escrow!")?
        .ok_or_else(|| Error::not_found("Escrow", id))?;
    hydrate(conn, row)
}

pub(crate) fn find_by_payment_information(
    conn: &ConnType,
    payment_information_id: i32,
) -> Result<Option<Escrow>> {
    escrows::table
        .filter(escrows::payment_information_id.eq(payment_information_id))
        .first::<EscrowRow>(conn)
        .optional()
        .context("Could not load the Escrow!")?
        .map(|row| hydrate(conn, row))
        .transpose()
}

fn hydrate(conn: &ConnType, row: EscrowRow) -> Result<Escrow> {
    let ratio = find_ratio(conn, row.id)?.ok_or_else(|| Error::not_found("EscrowRatio", row.id))?;
    Ok(Escrow::from_row(row, ratio))
}

/// Overwrites the scalars and replaces the ratio if the request carries one.
pub(crate) fn update(conn: &ConnType, id: i32, request: &EscrowUpdateRequest) -> Result<Escrow> {
    find(conn, id)?;

    diesel::update(escrows::table.find(id))
        .set((
            escrows::escrow_type.eq(request.escrow_type),
            escrows::seconds_to_lock.eq(request.seconds_to_lock),
        ))
        .execute(conn)
        .context("Could not update the Escrow!")?;

    if let Some(ratio) = &request.ratio {
        destroy_ratio(conn, id)?;
        create_ratio(conn, id, ratio)?;
    }
    find(conn, id)
}

pub(crate) fn destroy(conn: &ConnType, id: i32) -> Result<()> {
    destroy_ratio(conn, id)?;
    let deleted = diesel::delete(escrows::table.find(id))
        .execute(conn)
        .context("Could not remove the Escrow!")?;
    match deleted {
        0 => Err(Error::not_found("Escrow", id)),
        _ => Ok(()),
    }
}

pub(crate) fn create_ratio(
    conn: &ConnType,
    escrow_id: i32,
    request: &EscrowRatioCreateRequest,
) -> Result<EscrowRatio> {
    diesel::insert_into(escrow_ratios::table)
        .values(&request.clone().into_new(escrow_id))
        .execute(conn)
        .context("Could not create the EscrowRatio!")?;
    let id = last_insert_id(conn).context("Could not create the EscrowRatio!")?;

    escrow_ratios::table
        .find(id)
        .first::<EscrowRatio>(conn)
        .context("Could not load the EscrowRatio!")
}

pub(crate) fn find_ratio(conn: &ConnType, escrow_id: i32) -> Result<Option<EscrowRatio>> {
    escrow_ratios::table
        .filter(escrow_ratios::escrow_id.eq(escrow_id))
        .first::<EscrowRatio>(conn)
        .optional()
        .context("Could not load the EscrowRatio!")
}

fn destroy_ratio(conn: &ConnType, escrow_id: i32) -> Result<()> {
    diesel::delete(escrow_ratios::table.filter(escrow_ratios::escrow_id.eq(escrow_id)))
        .execute(conn)
        .context("Could not remove the EscrowRatio!")?;
    Ok(())
}
