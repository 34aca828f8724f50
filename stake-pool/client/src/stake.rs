//! Native stake program types the pool records and workflows depend on

use {
    crate::error::{DecodeError, RecordType},
    borsh::{BorshDeserialize, BorshSchema, BorshSerialize},
    solana_program::{
        clock::{Epoch, UnixTimestamp},
        pubkey::Pubkey,
        stake::state::StakeStateV2,
    },
};

/// Size of a stake account
pub const STAKE_ACCOUNT_SPACE: usize = StakeStateV2::size_of();

/// Withdrawal restrictions on the pool's stake, as stored in the stake pool
/// account
#[derive(
    BorshSerialize, BorshDeserialize, BorshSchema, Clone, Copy, Debug, Default, PartialEq, Eq,
)]
pub struct Lockup {
    /// UnixTimestamp at which this stake will allow withdrawal, unless the
    ///   transaction is signed by the custodian
    pub unix_timestamp: UnixTimestamp,
    /// epoch height at which this stake will allow withdrawal, unless the
    ///   transaction is signed by the custodian
    pub epoch: Epoch,
    /// custodian signature on a transaction exempts the operation from
    ///  lockup constraints
    pub custodian: Pubkey,
}

impl Lockup {
    /// Serialized size
    pub const LEN: usize = 8 + 8 + 32;
}

/// Coarse state of a stake account, as far as withdrawals care
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StakeAccountKind {
    /// Uninitialized, or initialized without a delegation
    Undelegated,
    /// Delegated to the given vote account
    Delegated {
        /// Vote account the stake is delegated to
        voter: Pubkey,
    },
}

/// Inspect raw stake account data
pub fn stake_account_kind(data: &[u8]) -> Result<StakeAccountKind, DecodeError> {
    let stake_state = bincode::deserialize::<StakeStateV2>(data)
        .map_err(|err| DecodeError::new(RecordType::StakeAccount, 0, err))?;
    Ok(match stake_state {
        StakeStateV2::Stake(_, stake, _) => StakeAccountKind::Delegated {
            voter: stake.delegation.voter_pubkey,
        },
        _ => StakeAccountKind::Undelegated,
    })
}
