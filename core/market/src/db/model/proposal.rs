use chrono::NaiveDateTime;
use diesel::sql_types::Text;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use agora_diesel_utils::DbTextField;

use crate::db::schema::{
    proposal_option_results, proposal_options, proposal_results, proposals, votes,
};
use crate::hash::{ContentHash, HashableObjectType, HashingError};
use crate::protocol::validation::{Validate, ValidationError};

#[derive(
    DbTextField,
    strum_macros::EnumString,
    strum_macros::Display,
    AsExpression,
    FromSqlRow,
    Serialize,
    Deserialize,
    PartialEq,
    Eq,
    Debug,
    Clone,
    Copy,
)]
#[sql_type = "Text"]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProposalType {
    PublicVote,
    /// Vote on removing a listing item. Creating one flags the item.
    ItemVote,
}

#[derive(Clone, Debug, Queryable)]
pub(crate) struct ProposalRow {
    pub id: i32,
    pub hash: ContentHash,
    pub submitter: String,
    pub block_start: i64,
    pub block_end: i64,
    pub proposal_type: ProposalType,
    pub title: String,
    pub description: String,
    pub item: Option<ContentHash>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Clone, Debug, Insertable)]
#[table_name = "proposals"]
pub(crate) struct NewProposal {
    pub hash: ContentHash,
    pub submitter: String,
    pub block_start: i64,
    pub block_end: i64,
    pub proposal_type: ProposalType,
    pub title: String,
    pub description: String,
    pub item: Option<ContentHash>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Clone, Debug, PartialEq, Queryable, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProposalOption {
    pub id: i32,
    pub option_id: i32,
    pub description: String,
    pub hash: ContentHash,
    pub proposal_id: i32,
}

#[derive(Clone, Debug, Insertable)]
#[table_name = "proposal_options"]
pub(crate) struct NewProposalOption {
    pub option_id: i32,
    pub description: String,
    pub hash: ContentHash,
    pub proposal_id: i32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Proposal {
    pub id: i32,
    pub hash: ContentHash,
    pub submitter: String,
    pub block_start: i64,
    pub block_end: i64,
    #[serde(rename = "type")]
    pub proposal_type: ProposalType,
    pub title: String,
    pub description: String,
    pub item: Option<ContentHash>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    pub options: Vec<ProposalOption>,
}

impl Proposal {
    pub(crate) fn from_row(row: ProposalRow, options: Vec<ProposalOption>) -> Proposal {
        Proposal {
            id: row.id,
            hash: row.hash,
            submitter: row.submitter,
            block_start: row.block_start,
            block_end: row.block_end,
            proposal_type: row.proposal_type,
            title: row.title,
            description: row.description,
            item: row.item,
            created_at: row.created_at,
            updated_at: row.updated_at,
            options,
        }
    }

    pub fn option(&self, option_id: i32) -> Option<&ProposalOption> {
        self.options
            .iter()
            .find(|option| option.option_id == option_id)
    }

    pub fn is_open_at(&self, block: i64) -> bool {
        self.block_start <= block && block <= self.block_end
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProposalOptionCreateRequest {
    pub option_id: i32,
    pub description: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProposalCreateRequest {
    pub submitter: String,
    pub block_start: i64,
    pub block_end: i64,
    #[serde(rename = "type")]
    pub proposal_type: ProposalType,
    pub title: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item: Option<ContentHash>,
    pub options: Vec<ProposalOptionCreateRequest>,
}

/// `options` replaces all options, which is only allowed before the first vote.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProposalUpdateRequest {
    pub block_end: i64,
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub options: Option<Vec<ProposalOptionCreateRequest>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ProposalOptionContent<'a> {
    option_id: i32,
    description: &'a str,
    proposal_hash: &'a ContentHash,
}

impl ProposalCreateRequest {
    pub fn hash(&self) -> Result<ContentHash, HashingError> {
        ContentHash::generate(self, HashableObjectType::Proposal)
    }

    pub(crate) fn to_new(&self, hash: ContentHash, now: NaiveDateTime) -> NewProposal {
        NewProposal {
            hash,
            submitter: self.submitter.clone(),
            block_start: self.block_start,
            block_end: self.block_end,
            proposal_type: self.proposal_type,
            title: self.title.clone(),
            description: self.description.clone(),
            item: self.item.clone(),
            created_at: now,
            updated_at: now,
        }
    }
}

impl ProposalOptionCreateRequest {
    pub fn hash(&self, proposal_hash: &ContentHash) -> Result<ContentHash, HashingError> {
        let content = ProposalOptionContent {
            option_id: self.option_id,
            description: &self.description,
            proposal_hash,
        };
        ContentHash::generate(&content, HashableObjectType::ProposalOption)
    }

    pub(crate) fn to_new(
        &self,
        proposal_id: i32,
        proposal_hash: &ContentHash,
    ) -> Result<NewProposalOption, HashingError> {
        Ok(NewProposalOption {
            option_id: self.option_id,
            description: self.description.clone(),
            hash: self.hash(proposal_hash)?,
            proposal_id,
        })
    }
}

fn validate_options(options: &[ProposalOptionCreateRequest]) -> Result<(), ValidationError> {
    if options.is_empty() {
        return Err(ValidationError::invalid("proposal.options", "is empty"));
    }
    let mut seen = HashSet::new();
    for option in options {
        if !seen.insert(option.option_id) {
            return Err(ValidationError::invalid(
                "proposal.options",
                format!("option [{}] is duplicated", option.option_id),
            ));
        }
    }
    Ok(())
}

impl Validate for ProposalCreateRequest {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.block_start > self.block_end {
            return Err(ValidationError::invalid(
                "proposal.blockEnd",
                format!(
                    "block end {} is before block start {}",
                    self.block_end, self.block_start
                ),
            ));
        }
        if self.title.trim().is_empty() {
            return Err(ValidationError::invalid("proposal.title", "is empty"));
        }
        if self.proposal_type == ProposalType::ItemVote && self.item.is_none() {
            return Err(ValidationError::invalid(
                "proposal.item",
                "item vote needs a target listing item",
            ));
        }
        validate_options(&self.options)
    }
}

impl Validate for ProposalUpdateRequest {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.title.trim().is_empty() {
            return Err(ValidationError::invalid("proposal.title", "is empty"));
        }
        match &self.options {
            Some(options) => validate_options(options),
            None => Ok(()),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Queryable, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vote {
    pub id: i32,
    pub voter: String,
    /// Transport id of the message that cast the vote.
    pub msgid: String,
    pub block: i64,
    pub weight: i64,
    pub proposal_option_id: i32,
    pub created_at: NaiveDateTime,
}

#[derive(Clone, Debug, Insertable)]
#[table_name = "votes"]
pub(crate) struct NewVote {
    pub voter: String,
    pub msgid: String,
    pub block: i64,
    pub weight: i64,
    pub proposal_option_id: i32,
    pub created_at: NaiveDateTime,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteCreateRequest {
    pub voter: String,
    pub msgid: String,
    pub block: i64,
    pub weight: i64,
    pub proposal_option_id: i32,
}

impl VoteCreateRequest {
    pub(crate) fn to_new(&self, now: NaiveDateTime) -> NewVote {
        NewVote {
            voter: self.voter.clone(),
            msgid: self.msgid.clone(),
            block: self.block,
            weight: self.weight,
            proposal_option_id: self.proposal_option_id,
            created_at: now,
        }
    }
}

impl Validate for VoteCreateRequest {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.weight <= 0 {
            return Err(ValidationError::invalid(
                "vote.weight",
                format!("{} is not a positive weight", self.weight),
            ));
        }
        if self.voter.trim().is_empty() {
            return Err(ValidationError::invalid("vote.voter", "is empty"));
        }
        if self.msgid.trim().is_empty() {
            return Err(ValidationError::invalid("vote.msgid", "is empty"));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Queryable)]
pub(crate) struct ProposalResultRow {
    pub id: i32,
    pub block: i64,
    pub proposal_id: i32,
    pub created_at: NaiveDateTime,
}

#[derive(Clone, Debug, Insertable)]
#[table_name = "proposal_results"]
pub(crate) struct NewProposalResult {
    pub block: i64,
    pub proposal_id: i32,
    pub created_at: NaiveDateTime,
}

#[derive(Clone, Debug, PartialEq, Queryable, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProposalOptionResult {
    pub id: i32,
    pub weight: i64,
    pub voters: i32,
    pub proposal_option_id: i32,
    pub proposal_result_id: i32,
}

#[derive(Clone, Debug, Insertable)]
#[table_name = "proposal_option_results"]
pub(crate) struct NewProposalOptionResult {
    pub weight: i64,
    pub voters: i32,
    pub proposal_option_id: i32,
    pub proposal_result_id: i32,
}

/// Vote weights per option counted up to `block`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProposalResult {
    pub id: i32,
    pub block: i64,
    pub proposal_id: i32,
    pub created_at: NaiveDateTime,
    pub options: Vec<ProposalOptionResult>,
}

impl ProposalResult {
    pub(crate) fn from_row(
        row: ProposalResultRow,
        options: Vec<ProposalOptionResult>,
    ) -> ProposalResult {
        ProposalResult {
            id: row.id,
            block: row.block,
            proposal_id: row.proposal_id,
            created_at: row.created_at,
            options,
        }
    }

    /// `None` when the sum doesn't fit in an `i64`.
    pub fn total_weight(&self) -> Option<i64> {
        self.options
            .iter()
            .try_fold(0i64, |total, option| total.checked_add(option.weight))
    }

    /// Option with the strictly highest weight. Ties and empty tallies have no
    /// winner.
    pub fn winner(&self) -> Option<&ProposalOptionResult> {
        let top = self.options.iter().map(|option| option.weight).max()?;
        if top == 0 {
            return None;
        }
        let mut leaders = self.options.iter().filter(|option| option.weight == top);
        match (leaders.next(), leaders.next()) {
            (Some(winner), None) => Some(winner),
            _ => None,
        }
    }
}
