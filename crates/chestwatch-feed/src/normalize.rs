use chestwatch_core::{ActivityKind, ActivityRecord, RawLogRecord, TokenAmount};

/// Map a decoded contract event onto the canonical feed record.
///
/// | event           | kind  | subject | amount         |
/// |-----------------|-------|---------|----------------|
/// | LockCreated     | Lock  | user    | amount         |
/// | LockClaimed     | Claim | user    | payout         |
/// | TokensPurchased | Buy   | buyer   | amountOfTokens |
/// | TokensSold      | Sell  | seller  | amountOfTokens |
pub fn normalize(raw: &RawLogRecord) -> ActivityRecord {
    let (kind, subject, base_units) = match raw {
        RawLogRecord::LockCreated { user, amount, .. } => (ActivityKind::Lock, *user, *amount),
        RawLogRecord::LockClaimed { user, payout, .. } => (ActivityKind::Claim, *user, *payout),
        RawLogRecord::TokensPurchased {
            buyer,
            amount_of_tokens,
            ..
        } => (ActivityKind::Buy, *buyer, *amount_of_tokens),
        RawLogRecord::TokensSold {
            seller,
            amount_of_tokens,
            ..
        } => (ActivityKind::Sell, *seller, *amount_of_tokens),
    };
    let meta = raw.meta();
    ActivityRecord {
        kind,
        subject,
        amount: TokenAmount::from_base_units(base_units),
        block_number: meta.block_number,
        transaction_ref: meta.transaction_hash,
    }
}
