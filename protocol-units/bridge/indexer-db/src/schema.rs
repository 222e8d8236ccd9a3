use diesel::prelude::*;

table! {
	networks (id) {
		id -> Int4,
		name -> Varchar,
		network_type -> Varchar,
		is_testnet -> Bool,
	}
}

table! {
	network_blocks (network_id) {
		network_id -> Int4,
		last_seen_block -> Int8,
	}
}

table! {
	network_nonces (network_id) {
		network_id -> Int4,
		nonce -> Int8,
	}
}

table! {
	tokens (id) {
		id -> Int8,
		short_name -> Varchar,
		long_name -> Varchar,
	}
}

table! {
	network_tokens (network_id, token_id) {
		network_id -> Int4,
		token_id -> Int8,
		contract_address -> Bytea,
		decimals -> Int2,
	}
}

table! {
	transactions (id) {
		id -> Int8,
		network_id -> Int4,
		tx_hash -> Bytea,
		sender -> Bytea,
		block_number -> Int8,
		seen_at -> Timestamptz,
	}
}

table! {
	token_transfers (id) {
		id -> Int8,
		triggering_tx -> Int8,
		outbound_tx -> Nullable<Int8>,
		token_id -> Int8,
		amount -> Bytea,
		status -> Varchar,
		sender_network_id -> Int4,
		sender_address -> Bytea,
		recipient_network_id -> Int4,
		recipient_address -> Bytea,
	}
}

joinable!(network_tokens -> tokens (token_id));

allow_tables_to_appear_in_same_query!(
	networks,
	network_blocks,
	network_nonces,
	tokens,
	network_tokens,
	transactions,
	token_transfers,
);
