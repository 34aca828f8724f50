#![deny(missing_docs)]

//! Off-chain client for the SPL stake pool program: account decoding,
//! instruction building, address derivation and withdrawal planning

pub mod amount;
pub mod client;
pub mod error;
pub mod inline_mpl_token_metadata;
pub mod instruction;
pub mod stake;
pub mod state;
pub mod withdraw;

// Re-exported so callers can build against the same sdk version
pub use solana_program;
use {solana_program::pubkey::Pubkey, std::num::NonZeroU32};

/// Seed prefix of the deposit authority
const AUTHORITY_DEPOSIT: &[u8] = b"deposit";

/// Seed prefix of the withdraw authority
const AUTHORITY_WITHDRAW: &[u8] = b"withdraw";

/// Seed prefix of transient stake accounts
const TRANSIENT_STAKE_SEED_PREFIX: &[u8] = b"transient";

/// Seed prefix of ephemeral stake accounts
const EPHEMERAL_STAKE_SEED_PREFIX: &[u8] = b"ephemeral";

/// Minimum amount of staked lamports required in a validator stake account to
/// allow for merges without a mismatch on credits observed
pub const MINIMUM_ACTIVE_STAKE: u64 = 1_000_000;

/// Minimum amount of lamports in the reserve
pub const MINIMUM_RESERVE_LAMPORTS: u64 = 0;

/// Maximum amount of validator stake accounts to update per
/// `UpdateValidatorListBalance` instruction, based on compute limits
pub const MAX_VALIDATORS_TO_UPDATE: usize = 5;

/// Maximum number of `WithdrawStake` instructions placed in one withdrawal,
/// bounded by the transaction size limit
pub const MAX_WITHDRAW_ACCOUNTS: usize = 5;

/// Get the minimum delegation required by a stake account in a stake pool
#[inline]
pub fn minimum_delegation(stake_program_minimum_delegation: u64) -> u64 {
    std::cmp::max(stake_program_minimum_delegation, MINIMUM_ACTIVE_STAKE)
}

/// Get the lamports a validator stake account must always keep: its
/// rent-exempt reserve plus the pool's minimum delegation
#[inline]
pub fn minimum_stake_lamports(stake_rent_exemption: u64) -> u64 {
    stake_rent_exemption.saturating_add(MINIMUM_ACTIVE_STAKE)
}

/// Get the lamports the reserve stake account must always keep
#[inline]
pub fn minimum_reserve_lamports(stake_rent_exemption: u64) -> u64 {
    stake_rent_exemption.saturating_add(MINIMUM_RESERVE_LAMPORTS)
}

/// Derive the pool's default stake deposit authority
pub fn find_deposit_authority_program_address(
    program_id: &Pubkey,
    stake_pool_address: &Pubkey,
) -> (Pubkey, u8) {
    Pubkey::find_program_address(
        &[stake_pool_address.as_ref(), AUTHORITY_DEPOSIT],
        program_id,
    )
}

/// Derive the authority owning all of the pool's stake and its mint
pub fn find_withdraw_authority_program_address(
    program_id: &Pubkey,
    stake_pool_address: &Pubkey,
) -> (Pubkey, u8) {
    Pubkey::find_program_address(
        &[stake_pool_address.as_ref(), AUTHORITY_WITHDRAW],
        program_id,
    )
}

/// Derive a validator's stake account in the pool, optionally with a non-zero
/// seed appended
pub fn find_stake_program_address(
    program_id: &Pubkey,
    vote_account_address: &Pubkey,
    stake_pool_address: &Pubkey,
    seed: Option<NonZeroU32>,
) -> (Pubkey, u8) {
    let seed = seed.map(|s| s.get().to_le_bytes());
    Pubkey::find_program_address(
        &[
            vote_account_address.as_ref(),
            stake_pool_address.as_ref(),
            seed.as_ref().map(|s| s.as_slice()).unwrap_or(&[]),
        ],
        program_id,
    )
}

/// Generates the transient stake program address for a validator's vote
/// account
pub fn find_transient_stake_program_address(
    program_id: &Pubkey,
    vote_account_address: &Pubkey,
    stake_pool_address: &Pubkey,
    seed: u64,
) -> (Pubkey, u8) {
    Pubkey::find_program_address(
        &[
            TRANSIENT_STAKE_SEED_PREFIX,
            vote_account_address.as_ref(),
            stake_pool_address.as_ref(),
            &seed.to_le_bytes(),
        ],
        program_id,
    )
}

/// Derive the ephemeral stake account used while redelegating or adding
/// stake to an in-flight transient account
pub fn find_ephemeral_stake_program_address(
    program_id: &Pubkey,
    stake_pool_address: &Pubkey,
    seed: u64,
) -> (Pubkey, u8) {
    Pubkey::find_program_address(
        &[
            EPHEMERAL_STAKE_SEED_PREFIX,
            stake_pool_address.as_ref(),
            &seed.to_le_bytes(),
        ],
        program_id,
    )
}

solana_program::declare_id!("SPoo1Ku8WFXoNDMHPsrGSTSG1Y47rzgn41SLUNakuHy");

/// Stake pool program deployed on devnet
pub mod devnet {
    solana_program::declare_id!("DPoo15wWDqpPJJtS2MUZ49aRxqz5ZaaJCJP4z8bLuib");
}

/// Pick the stake pool program id matching the cluster behind an RPC url
pub fn program_id_for_url(rpc_url: &str) -> Pubkey {
    if rpc_url.contains("devnet") {
        devnet::id()
    } else {
        id()
    }
}
