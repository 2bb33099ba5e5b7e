//! Repositories of the rows owned by an action message.
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use diesel::{ExpressionMethods, OptionalExtension, QueryDsl, RunQueryDsl};

use agora_persistence::executor::ConnType;

use crate::db::model::{
    MessageData, MessageDataCreateRequest, MessageEscrow, MessageEscrowCreateRequest,
    MessageInfo, MessageInfoCreateRequest, MessageObject, MessageObjectCreateRequest,
};
use crate::db::schema::{message_datas, message_escrows, message_infos, message_objects};
use crate::error::{DbContext, Error, Result};

pub(crate) mod info {
    use super::*;

    pub(crate) fn create(
        conn: &ConnType,
        action_message_id: i32,
        request: &MessageInfoCreateRequest,
    ) -> Result<()> {
        diesel::insert_into(message_infos::table)
            .values(&request.to_new(action_message_id))
            .execute(conn)
            .context("Could not create the MessageInfo!")?;
        Ok(())
    }

    pub(crate) fn find(conn: &ConnType, action_message_id: i32) -> Result<Option<MessageInfo>> {
        message_infos::table
            .filter(message_infos::action_message_id.eq(action_message_id))
            .first::<MessageInfo>(conn)
            .optional()
            .context("Could not load the MessageInfo!")
    }

    pub(crate) fn destroy(conn: &ConnType, action_message_id: i32) -> Result<()> {
        diesel::delete(
            message_infos::table.filter(message_infos::action_message_id.eq(action_message_id)),
        )
        .execute(conn)
        .context("Could not remove the MessageInfo!")?;
        Ok(())
    }
}

pub(crate) mod escrow {
    use super::*;

    pub(crate) fn create(
        conn: &ConnType,
        action_message_id: i32,
        request: &MessageEscrowCreateRequest,
    ) -> Result<()> {
        diesel::insert_into(message_escrows::table)
            .values(&request.to_new(action_message_id))
            .execute(conn)
            .context("Could not create the MessageEscrow!")?;
        Ok(())
    }

    pub(crate) fn find(conn: &ConnType, action_message_id: i32) -> Result<Option<MessageEscrow>> {
        message_escrows::table
            .filter(message_escrows::action_message_id.eq(action_message_id))
            .first::<MessageEscrow>(conn)
            .optional()
            .context("Could not load the MessageEscrow!")
    }

    pub(crate) fn destroy(conn: &ConnType, action_message_id: i32) -> Result<()> {
        diesel::delete(
            message_escrows::table
                .filter(message_escrows::action_message_id.eq(action_message_id)),
        )
        .execute(conn)
        .context("Could not remove the MessageEscrow!")?;
        Ok(())
    }
}

pub(crate) mod data {
    use super::*;

    /// `msgid` is unique across all action messages. A duplicate is reported
    /// as `AlreadyExists`.
    pub(crate) fn create(
        conn: &ConnType,
        action_message_id: i32,
        request: &MessageDataCreateRequest,
    ) -> Result<()> {
        match diesel::insert_into(message_datas::table)
            .values(&request.to_new(action_message_id))
            .execute(conn)
        {
            Err(DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _)) => {
                Err(Error::AlreadyExists {
                    entity: "MessageData",
                    id: request.msgid.clone(),
                })
            }
            result => result.context("Could not create the MessageData!").map(|_| ()),
        }
    }

    pub(crate) fn find(conn: &ConnType, action_message_id: i32) -> Result<Option<MessageData>> {
        message_datas::table
            .filter(message_datas::action_message_id.eq(action_message_id))
            .first::<MessageData>(conn)
            .optional()
            .context("Could not load the MessageData!")
    }

    pub(crate) fn find_action_message_id(conn: &ConnType, msgid: &str) -> Result<Option<i32>> {
        message_datas::table
            .filter(message_datas::msgid.eq(msgid))
            .select(message_datas::action_message_id)
            .first::<i32>(conn)
            .optional()
            .context("Could not load the MessageData!")
    }

    pub(crate) fn destroy(conn: &ConnType, action_message_id: i32) -> Result<()> {
        diesel::delete(
            message_datas::table.filter(message_datas::action_message_id.eq(action_message_id)),
        )
        .execute(conn)
        .context("Could not remove the MessageData!")?;
        Ok(())
    }
}

pub(crate) mod objects {
    use super::*;

    pub(crate) fn create(
        conn: &ConnType,
        action_message_id: i32,
        requests: &[MessageObjectCreateRequest],
    ) -> Result<()> {
        for request in requests {
            diesel::insert_into(message_objects::table)
                .values(&request.to_new(action_message_id))
                .execute(conn)
                .context("Could not create the MessageObject!")?;
        }
        Ok(())
    }

    pub(crate) fn find(conn: &ConnType, action_message_id: i32) -> Result<Vec<MessageObject>> {
        message_objects::table
            .filter(message_objects::action_message_id.eq(action_message_id))
            .order_by(message_objects::id.asc())
            .load::<MessageObject>(conn)
            .context("Could not load the MessageObjects!")
    }

    pub(crate) fn destroy(conn: &ConnType, action_message_id: i32) -> Result<()> {
        diesel::delete(
            message_objects::table
                .filter(message_objects::action_message_id.eq(action_message_id)),
        )
        .execute(conn)
        .context("Could not remove the MessageObjects!")?;
        Ok(())
    }
}
