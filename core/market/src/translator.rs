//! Maps validated marketplace messages onto action-message records.
use crate::db::model::{ActionMessageCreateRequest, ActionType, MessageObjectCreateRequest};
use crate::hash::ContentHash;
use crate::protocol::{ActionEnvelope, MessagingData};

pub const PROPOSAL_HASH_KEY: &str = "proposalHash";

/// Action message recording a bid or escrow action on a listing item. The
/// transport envelope becomes the message data.
pub fn translate_action(envelope: &ActionEnvelope, listing_item_id: i32) -> ActionMessageCreateRequest {
    ActionMessageCreateRequest {
        action: envelope.action,
        nonce: envelope.nonce.clone(),
        accepted: envelope.accepted,
        listing_item_id,
        info: envelope.info.clone(),
        escrow: envelope.escrow.clone(),
        data: Some(envelope.data.to_create_request()),
        objects: envelope.objects.clone(),
    }
}

/// Action message recording that an item-vote proposal was opened against a
/// listing item.
pub fn translate_proposal(
    data: &MessagingData,
    listing_item_id: i32,
    proposal_hash: &ContentHash,
) -> ActionMessageCreateRequest {
    ActionMessageCreateRequest {
        action: ActionType::ProposalAdd,
        nonce: None,
        accepted: false,
        listing_item_id,
        info: None,
        escrow: None,
        data: Some(data.to_create_request()),
        objects: vec![MessageObjectCreateRequest::new(
            PROPOSAL_HASH_KEY,
            proposal_hash.to_string(),
        )],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::model::{MessageEscrowCreateRequest, MessageInfoCreateRequest};
    use crate::testing::{sample_messaging_data, sample_timestamp, BUYER, SAMPLE_ITEM_HASH, SELLER};
    use std::str::FromStr;

    #[test]
    fn test_translate_escrow_action() {
        let envelope = ActionEnvelope {
            data: sample_messaging_data("msg-lock", BUYER, SELLER),
            action: ActionType::Lock,
            item: ContentHash::from_str(SAMPLE_ITEM_HASH).unwrap(),
            nonce: Some("randomness".to_string()),
            accepted: true,
            info: Some(MessageInfoCreateRequest {
                address: Some("20 seventeen street".to_string()),
                memo: Some("Please deliver by 17 March 2017".to_string()),
            }),
            escrow: Some(MessageEscrowCreateRequest {
                escrow_type: "lock".to_string(),
                rawtx: "rawtx".to_string(),
            }),
            objects: vec![MessageObjectCreateRequest::new("colour", "black")],
        };

        let request = translate_action(&envelope, 7);

        assert_eq!(request.action, ActionType::Lock);
        assert_eq!(request.listing_item_id, 7);
        assert!(request.accepted);
        assert_eq!(request.nonce.as_deref(), Some("randomness"));
        assert_eq!(request.escrow, envelope.escrow);
        assert_eq!(request.info, envelope.info);
        assert_eq!(request.objects, envelope.objects);

        let data = request.data.unwrap();
        assert_eq!(data.msgid, "msg-lock");
        assert_eq!(data.from, BUYER);
        assert_eq!(data.to, SELLER);
        assert_eq!(data.received, sample_timestamp());
    }

    #[test]
    fn test_translate_proposal_keeps_proposal_hash() {
        let hash = ContentHash::from_str(SAMPLE_ITEM_HASH).unwrap();
        let request = translate_proposal(&sample_messaging_data("msg-p", BUYER, SELLER), 3, &hash);

        assert_eq!(request.action, ActionType::ProposalAdd);
        assert_eq!(request.objects.len(), 1);
        assert_eq!(request.objects[0].data_id, PROPOSAL_HASH_KEY);
        assert_eq!(request.objects[0].data_value, SAMPLE_ITEM_HASH);
    }
}
