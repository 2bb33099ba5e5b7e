use tempdir::TempDir;

use agora_market::db::dao::{FlaggedItemDao, ProposalDao, VoteDao};
use agora_market::db::model::{ActionType, Proposal, ProposalType, ProposalUpdateRequest};
use agora_market::processor::{Outcome, ProcessedMessage};
use agora_market::protocol::ValidationError;
use agora_market::testing::{
    ingest_listing, proposal_message, sample_listing_content, sample_proposal, test_market,
    vote_message, BUYER, SELLER,
};
use agora_market::translator::PROPOSAL_HASH_KEY;
use agora_market::{Error, MarketService};

const VOTER_A: &str = "pVoterAaaaaaaaaaaaaaaaaaaaaaaaaaaa";
const VOTER_B: &str = "pVoterBbbbbbbbbbbbbbbbbbbbbbbbbbbb";

async fn add_proposal(market: &MarketService, start: i64, end: i64) -> Proposal {
    match market
        .process(proposal_message("msg-proposal", SELLER, sample_proposal(start, end)))
        .await
        .unwrap()
    {
        ProcessedMessage::Proposal { proposal, .. } => proposal,
        other => panic!("Expected a proposal, got {:?}", other),
    }
}

#[tokio::test]
async fn test_add_proposal_is_idempotent() {
    let _ = env_logger::builder().is_test(true).try_init();
    let dir = TempDir::new("proposal").unwrap();
    let market = test_market(dir.path(), 1).unwrap();

    let first = market
        .process(proposal_message("msg-1", SELLER, sample_proposal(100, 200)))
        .await
        .unwrap();
    let second = market
        .process(proposal_message("msg-2", SELLER, sample_proposal(100, 200)))
        .await
        .unwrap();

    match (first, second) {
        (
            ProcessedMessage::Proposal {
                proposal: first,
                flagged: None,
                outcome: Outcome::AssembledNew,
            },
            ProcessedMessage::Proposal {
                proposal: second,
                flagged: None,
                outcome: Outcome::MatchedExisting,
            },
        ) => {
            assert_eq!(first, second);
            assert_eq!(first.submitter, SELLER);
            assert_eq!(first.proposal_type, ProposalType::PublicVote);
            assert_eq!(first.options.len(), 2);
            assert!(first.options.iter().all(|option| option.proposal_id == first.id));
            assert_ne!(first.options[0].hash, first.options[1].hash);
        }
        other => panic!("Unexpected outcomes {:?}", other),
    }
}

#[tokio::test]
async fn test_vote_replaces_earlier_vote() {
    let dir = TempDir::new("proposal").unwrap();
    let market = test_market(dir.path(), 1).unwrap();
    let proposal = add_proposal(&market, 100, 200).await;

    market
        .process(vote_message("msg-v1", VOTER_A, &proposal.hash, 0, 110, 5))
        .await
        .unwrap();
    let changed = market
        .process(vote_message("msg-v2", VOTER_A, &proposal.hash, 1, 120, 5))
        .await
        .unwrap();
    assert_eq!(changed.outcome(), Outcome::AssembledNew);

    let dao = market.db.as_dao::<VoteDao>();
    assert_eq!(dao.list(proposal.id, None).await.unwrap().len(), 2);

    let votes = dao.current(proposal.id, None).await.unwrap();
    assert_eq!(votes.len(), 1);
    assert_eq!(votes[0].voter, VOTER_A);
    assert_eq!(votes[0].msgid, "msg-v2");
    assert_eq!(Some(votes[0].proposal_option_id), proposal.option(1).map(|o| o.id));
    assert_eq!(votes[0].block, 120);
}

#[tokio::test]
async fn test_redelivered_vote_is_matched() {
    let dir = TempDir::new("proposal").unwrap();
    let market = test_market(dir.path(), 1).unwrap();
    let proposal = add_proposal(&market, 100, 200).await;

    let vote = vote_message("msg-v1", VOTER_A, &proposal.hash, 0, 110, 5);
    market.process(vote.clone()).await.unwrap();
    let again = market.process(vote).await.unwrap();

    assert_eq!(again.outcome(), Outcome::MatchedExisting);
}

#[tokio::test]
async fn test_redelivered_old_vote_keeps_current_choice() {
    let dir = TempDir::new("proposal").unwrap();
    let market = test_market(dir.path(), 1).unwrap();
    let proposal = add_proposal(&market, 100, 200).await;
    let no = proposal.option(1).unwrap().id;

    let first = vote_message("msg-v1", VOTER_A, &proposal.hash, 0, 110, 5);
    let first_vote = match market.process(first.clone()).await.unwrap() {
        ProcessedMessage::Vote { vote, .. } => vote,
        other => panic!("Expected a vote, got {:?}", other),
    };
    market
        .process(vote_message("msg-v2", VOTER_A, &proposal.hash, 1, 120, 5))
        .await
        .unwrap();

    match market.process(first).await.unwrap() {
        ProcessedMessage::Vote { vote, outcome, .. } => {
            assert_eq!(outcome, Outcome::MatchedExisting);
            assert_eq!(vote, first_vote);
        }
        other => panic!("Expected a vote, got {:?}", other),
    }

    let result = market.tally(&proposal.hash, None).await.unwrap();
    let winner = result.winner().unwrap();
    assert_eq!(winner.proposal_option_id, no);
    assert_eq!((winner.weight, winner.voters), (5, 1));
    assert_eq!(result.total_weight(), Some(5));
}

#[tokio::test]
async fn test_vote_older_than_current_is_rejected() {
    let dir = TempDir::new("proposal").unwrap();
    let market = test_market(dir.path(), 1).unwrap();
    let proposal = add_proposal(&market, 100, 200).await;

    market
        .process(vote_message("msg-v1", VOTER_A, &proposal.hash, 0, 150, 5))
        .await
        .unwrap();
    let result = market
        .process(vote_message("msg-v2", VOTER_A, &proposal.hash, 1, 120, 5))
        .await;

    match result {
        Err(Error::Validation(ValidationError::StaleVote { block, current })) => {
            assert_eq!((block, current), (120, 150))
        }
        other => panic!("Expected a stale vote, got {:?}", other),
    }
    let votes = market
        .db
        .as_dao::<VoteDao>()
        .list(proposal.id, None)
        .await
        .unwrap();
    assert_eq!(votes.len(), 1);
}

#[tokio::test]
async fn test_vote_outside_window_is_rejected() {
    let dir = TempDir::new("proposal").unwrap();
    let market = test_market(dir.path(), 1).unwrap();
    let proposal = add_proposal(&market, 100, 200).await;

    let result = market
        .process(vote_message("msg-v1", VOTER_A, &proposal.hash, 0, 201, 5))
        .await;

    match result {
        Err(Error::Validation(ValidationError::VoteOutsideWindow { block, start, end })) => {
            assert_eq!((block, start, end), (201, 100, 200))
        }
        other => panic!("Expected a vote outside the window, got {:?}", other),
    }
}

#[tokio::test]
async fn test_vote_on_unknown_option_is_not_found() {
    let dir = TempDir::new("proposal").unwrap();
    let market = test_market(dir.path(), 1).unwrap();
    let proposal = add_proposal(&market, 100, 200).await;

    let result = market
        .process(vote_message("msg-v1", VOTER_A, &proposal.hash, 7, 150, 5))
        .await;

    assert!(matches!(
        result,
        Err(Error::NotFound {
            entity: "ProposalOption",
            ..
        })
    ));
}

#[tokio::test]
async fn test_tally_counts_votes_up_to_block() {
    let dir = TempDir::new("proposal").unwrap();
    let market = test_market(dir.path(), 1).unwrap();
    let proposal = add_proposal(&market, 100, 200).await;
    let yes = proposal.option(0).unwrap().id;
    let no = proposal.option(1).unwrap().id;

    market
        .process(vote_message("msg-v1", VOTER_A, &proposal.hash, 0, 110, 5))
        .await
        .unwrap();
    market
        .process(vote_message("msg-v2", VOTER_B, &proposal.hash, 1, 150, 3))
        .await
        .unwrap();
    market
        .process(vote_message("msg-v3", BUYER, &proposal.hash, 1, 190, 4))
        .await
        .unwrap();

    let early = market.tally(&proposal.hash, Some(160)).await.unwrap();
    assert_eq!(early.block, 160);
    assert_eq!(early.total_weight(), Some(8));
    let winner = early.winner().unwrap();
    assert_eq!(winner.proposal_option_id, yes);

    let complete = market.tally(&proposal.hash, None).await.unwrap();
    assert_eq!(complete.block, 200);
    assert_eq!(complete.total_weight(), Some(12));
    let winner = complete.winner().unwrap();
    assert_eq!(winner.proposal_option_id, no);
    assert_eq!((winner.weight, winner.voters), (7, 2));
    assert_ne!(early.id, complete.id);

    assert_eq!(
        market.tally.latest(&proposal.hash).await.unwrap(),
        Some(complete)
    );
}

#[tokio::test]
async fn test_tally_at_past_block_counts_superseded_vote() {
    let dir = TempDir::new("proposal").unwrap();
    let market = test_market(dir.path(), 1).unwrap();
    let proposal = add_proposal(&market, 100, 200).await;
    let yes = proposal.option(0).unwrap().id;
    let no = proposal.option(1).unwrap().id;

    market
        .process(vote_message("msg-v1", VOTER_A, &proposal.hash, 0, 110, 5))
        .await
        .unwrap();
    market
        .process(vote_message("msg-v2", VOTER_A, &proposal.hash, 1, 180, 5))
        .await
        .unwrap();

    let past = market.tally(&proposal.hash, Some(150)).await.unwrap();
    assert_eq!(past.total_weight(), Some(5));
    assert_eq!(past.winner().unwrap().proposal_option_id, yes);

    let complete = market.tally(&proposal.hash, None).await.unwrap();
    assert_eq!(complete.total_weight(), Some(5));
    let winner = complete.winner().unwrap();
    assert_eq!(winner.proposal_option_id, no);
    assert_eq!(winner.voters, 1);
}

#[tokio::test]
async fn test_tally_weight_overflow_is_rejected() {
    let dir = TempDir::new("proposal").unwrap();
    let market = test_market(dir.path(), 1).unwrap();
    let proposal = add_proposal(&market, 100, 200).await;

    market
        .process(vote_message("msg-v1", VOTER_A, &proposal.hash, 0, 110, i64::MAX))
        .await
        .unwrap();
    market
        .process(vote_message("msg-v2", VOTER_B, &proposal.hash, 0, 120, i64::MAX))
        .await
        .unwrap();

    let result = market.tally(&proposal.hash, Some(115)).await.unwrap();
    assert_eq!(result.total_weight(), Some(i64::MAX));

    assert!(matches!(
        market.tally(&proposal.hash, None).await,
        Err(Error::Validation(ValidationError::WeightOverflow(_)))
    ));
    assert_eq!(market.tally.latest(&proposal.hash).await.unwrap(), Some(result));
}

#[tokio::test]
async fn test_tally_total_overflow_across_options_is_rejected() {
    let dir = TempDir::new("proposal").unwrap();
    let market = test_market(dir.path(), 1).unwrap();
    let proposal = add_proposal(&market, 100, 200).await;

    market
        .process(vote_message("msg-v1", VOTER_A, &proposal.hash, 0, 110, i64::MAX))
        .await
        .unwrap();
    market
        .process(vote_message("msg-v2", VOTER_B, &proposal.hash, 1, 120, 1))
        .await
        .unwrap();

    assert!(matches!(
        market.tally(&proposal.hash, None).await,
        Err(Error::Validation(ValidationError::WeightOverflow(_)))
    ));
    assert_eq!(market.tally.latest(&proposal.hash).await.unwrap(), None);
}

#[tokio::test]
async fn test_tie_has_no_winner() {
    let dir = TempDir::new("proposal").unwrap();
    let market = test_market(dir.path(), 1).unwrap();
    let proposal = add_proposal(&market, 100, 200).await;

    let empty = market.tally(&proposal.hash, None).await.unwrap();
    assert_eq!(empty.options.len(), 2);
    assert_eq!(empty.winner(), None);

    market
        .process(vote_message("msg-v1", VOTER_A, &proposal.hash, 0, 110, 5))
        .await
        .unwrap();
    market
        .process(vote_message("msg-v2", VOTER_B, &proposal.hash, 1, 120, 5))
        .await
        .unwrap();

    let tied = market.tally(&proposal.hash, None).await.unwrap();
    assert_eq!(tied.total_weight(), Some(10));
    assert_eq!(tied.winner(), None);
}

#[tokio::test]
async fn test_item_vote_flags_listing_item() {
    let dir = TempDir::new("proposal").unwrap();
    let market = test_market(dir.path(), 1).unwrap();
    let item = ingest_listing(&market, "msg-item", "Mountain bike").await.unwrap();

    let mut message = sample_proposal(100, 200);
    message.proposal_type = ProposalType::ItemVote;
    message.title = item.hash.to_string();
    message.item = Some(item.hash.clone());

    let processed = market
        .process(proposal_message("msg-flag", BUYER, message))
        .await
        .unwrap();
    let (proposal, flagged) = match processed {
        ProcessedMessage::Proposal {
            proposal,
            flagged: Some(flagged),
            outcome: Outcome::AssembledNew,
        } => (proposal, flagged),
        other => panic!("Expected a flagging proposal, got {:?}", other),
    };

    assert_eq!(flagged.listing_item_id, item.id);
    assert_eq!(flagged.proposal_id, Some(proposal.id));
    assert_eq!(
        market
            .db
            .as_dao::<FlaggedItemDao>()
            .find_by_listing_item(item.id)
            .await
            .unwrap(),
        Some(flagged)
    );

    let actions = market.action_messages(&item.hash).await.unwrap();
    assert_eq!(actions.len(), 1);
    assert_eq!(actions[0].action, ActionType::ProposalAdd);
    assert_eq!(actions[0].objects[0].data_id, PROPOSAL_HASH_KEY);
    assert_eq!(actions[0].objects[0].data_value, proposal.hash.to_string());
}

#[tokio::test]
async fn test_item_vote_on_unknown_item_writes_nothing() {
    let dir = TempDir::new("proposal").unwrap();
    let market = test_market(dir.path(), 1).unwrap();
    let item = ingest_listing(&market, "msg-item", "Mountain bike").await.unwrap();

    let mut message = sample_proposal(100, 200);
    message.proposal_type = ProposalType::ItemVote;
    message.item = Some(sample_listing_content("Never sent").hash().unwrap());
    let hash = message.clone().into_create_request(BUYER).hash().unwrap();

    let result = market
        .process(proposal_message("msg-flag", BUYER, message))
        .await;

    assert!(matches!(
        result,
        Err(Error::NotFound {
            entity: "ListingItem",
            ..
        })
    ));
    assert!(market.action_messages(&item.hash).await.unwrap().is_empty());
    assert!(market
        .db
        .as_dao::<ProposalDao>()
        .get_by_hash(&hash)
        .await
        .unwrap_err()
        .is_not_found());
}

#[tokio::test]
async fn test_options_are_locked_after_first_vote() {
    let dir = TempDir::new("proposal").unwrap();
    let market = test_market(dir.path(), 1).unwrap();
    let proposal = add_proposal(&market, 100, 200).await;
    let dao = market.db.as_dao::<ProposalDao>();

    let replacement = sample_proposal(100, 200).options;
    let update = ProposalUpdateRequest {
        block_end: 300,
        title: "Lower the market fee to 0.5%".to_string(),
        description: proposal.description.clone(),
        options: Some(replacement),
    };
    let updated = dao.update(proposal.id, update.clone()).await.unwrap();
    assert_eq!(updated.block_end, 300);
    assert_eq!(updated.options.len(), 2);
    assert_ne!(updated.options[0].id, proposal.options[0].id);

    market
        .process(vote_message("msg-v1", VOTER_A, &proposal.hash, 0, 250, 1))
        .await
        .unwrap();

    let result = dao.update(proposal.id, update).await;
    assert!(matches!(
        result,
        Err(Error::Validation(ValidationError::ProposalHasVotes(_)))
    ));
}
