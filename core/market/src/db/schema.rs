table! {
    listing_item_templates (id) {
        id -> Integer,
        hash -> Text,
        created_at -> Timestamp,
        updated_at -> Timestamp,
    }
}

table! {
    listing_items (id) {
        id -> Integer,
        hash -> Text,
        seller -> Text,
        market -> Text,
        listing_item_template_id -> Nullable<Integer>,
        posted_at -> Nullable<Timestamp>,
        received_at -> Timestamp,
        created_at -> Timestamp,
        updated_at -> Timestamp,
    }
}

table! {
    item_informations (id) {
        id -> Integer,
        title -> Text,
        short_description -> Text,
        long_description -> Text,
        category -> Text,
        listing_item_id -> Nullable<Integer>,
        listing_item_template_id -> Nullable<Integer>,
    }
}

table! {
    payment_informations (id) {
        id -> Integer,
        payment_type -> Text,
        listing_item_id -> Nullable<Integer>,
        listing_item_template_id -> Nullable<Integer>,
    }
}

table! {
    escrows (id) {
        id -> Integer,
        escrow_type -> Text,
        seconds_to_lock -> Integer,
        payment_information_id -> Integer,
    }
}

table! {
    escrow_ratios (id) {
        id -> Integer,
        buyer -> Integer,
        seller -> Integer,
        escrow_id -> Integer,
    }
}

table! {
    item_prices (id) {
        id -> Integer,
        currency -> Text,
        base_price -> Double,
        payment_information_id -> Integer,
    }
}

table! {
    shipping_prices (id) {
        id -> Integer,
        domestic -> Double,
        international -> Double,
        item_price_id -> Integer,
    }
}

table! {
    cryptocurrency_addresses (id) {
        id -> Integer,
        address_type -> Text,
        address -> Text,
        item_price_id -> Integer,
    }
}

table! {
    messaging_informations (id) {
        id -> Integer,
        protocol -> Text,
        public_key -> Text,
        listing_item_id -> Nullable<Integer>,
        listing_item_template_id -> Nullable<Integer>,
    }
}

table! {
    listing_item_objects (id) {
        id -> Integer,
        object_type -> Text,
        description -> Text,
        order_number -> Integer,
        listing_item_id -> Nullable<Integer>,
        listing_item_template_id -> Nullable<Integer>,
    }
}

table! {
    action_messages (id) {
        id -> Integer,
        action -> Text,
        nonce -> Nullable<Text>,
        accepted -> Bool,
        listing_item_id -> Integer,
        created_at -> Timestamp,
    }
}

table! {
    message_infos (id) {
        id -> Integer,
        address -> Nullable<Text>,
        memo -> Nullable<Text>,
        action_message_id -> Integer,
    }
}

table! {
    message_escrows (id) {
        id -> Integer,
        escrow_type -> Text,
        rawtx -> Text,
        action_message_id -> Integer,
    }
}

table! {
    message_datas (id) {
        id -> Integer,
        msgid -> Text,
        version -> Text,
        received -> Timestamp,
        sent -> Nullable<Timestamp>,
        sender -> Text,
        receiver -> Text,
        action_message_id -> Integer,
    }
}

table! {
    message_objects (id) {
        id -> Integer,
        data_id -> Text,
        data_value -> Text,
        action_message_id -> Integer,
    }
}

table! {
    bids (id) {
        id -> Integer,
        status -> Text,
        bidder -> Text,
        listing_item_id -> Integer,
        created_at -> Timestamp,
        updated_at -> Timestamp,
    }
}

table! {
    bid_datas (id) {
        id -> Integer,
        data_id -> Text,
        data_value -> Text,
        bid_id -> Integer,
    }
}

table! {
    proposals (id) {
        id -> Integer,
        hash -> Text,
        submitter -> Text,
        block_start -> BigInt,
        block_end -> BigInt,
        proposal_type -> Text,
        title -> Text,
        description -> Text,
        item -> Nullable<Text>,
        created_at -> Timestamp,
        updated_at -> Timestamp,
    }
}

table! {
    proposal_options (id) {
        id -> Integer,
        option_id -> Integer,
        description -> Text,
        hash -> Text,
        proposal_id -> Integer,
    }
}

table! {
    votes (id) {
        id -> Integer,
        voter -> Text,
        msgid -> Text,
        block -> BigInt,
        weight -> BigInt,
        proposal_option_id -> Integer,
        created_at -> Timestamp,
    }
}

table! {
    proposal_results (id) {
        id -> Integer,
        block -> BigInt,
        proposal_id -> Integer,
        created_at -> Timestamp,
    }
}

table! {
    proposal_option_results (id) {
        id -> Integer,
        weight -> BigInt,
        voters -> Integer,
        proposal_option_id -> Integer,
        proposal_result_id -> Integer,
    }
}

table! {
    flagged_items (id) {
        id -> Integer,
        listing_item_id -> Integer,
        proposal_id -> Nullable<Integer>,
        reason -> Nullable<Text>,
        created_at -> Timestamp,
    }
}

joinable!(action_messages -> listing_items (listing_item_id));
joinable!(message_datas -> action_messages (action_message_id));
joinable!(bids -> listing_items (listing_item_id));
joinable!(escrows -> payment_informations (payment_information_id));
joinable!(proposal_options -> proposals (proposal_id));
joinable!(votes -> proposal_options (proposal_option_id));

allow_tables_to_appear_in_same_query!(
    listing_items,
    action_messages,
    message_datas,
    message_escrows,
    bids,
    escrows,
    payment_informations,
    proposals,
    proposal_options,
    votes,
);
