//! Instruction types

#![allow(clippy::too_many_arguments)]

use {
    crate::{
        error::{DecodeError, RecordType, StakePoolClientResult},
        find_deposit_authority_program_address, find_ephemeral_stake_program_address,
        find_stake_program_address, find_transient_stake_program_address,
        find_withdraw_authority_program_address,
        inline_mpl_token_metadata::{self, check_metadata_lengths, pda::find_metadata_account},
        state::{decode_exact, Fee, StakePool, ValidatorList, ValidatorStakeInfo},
        MAX_VALIDATORS_TO_UPDATE,
    },
    borsh::{BorshDeserialize, BorshSchema, BorshSerialize},
    num_enum::{IntoPrimitive, TryFromPrimitive},
    solana_program::{
        instruction::{AccountMeta, Instruction},
        program_error::ProgramError,
        pubkey::Pubkey,
        stake, system_program, sysvar,
    },
    std::num::NonZeroU32,
};

/// Defines which validator vote account is set during the
/// `SetPreferredValidator` instruction
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, BorshSchema)]
pub enum PreferredValidatorType {
    /// Set preferred validator for deposits
    Deposit,
    /// Set preferred validator for withdraws
    Withdraw,
}

/// Defines which authority to update in the `SetFundingAuthority`
/// instruction
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, BorshSchema)]
pub enum FundingType {
    /// Sets the stake deposit authority
    StakeDeposit,
    /// Sets the SOL deposit authority
    SolDeposit,
    /// Sets the SOL withdraw authority
    SolWithdraw,
}

/// Instructions supported by the StakePool program.
#[repr(C)]
#[derive(Clone, Debug, PartialEq, BorshSerialize, BorshDeserialize, BorshSchema)]
pub enum StakePoolInstruction {
    ///   Initializes a new StakePool.
    ///
    ///   0. `[w]` New StakePool to create.
    ///   1. `[s]` Manager
    ///   2. `[]` Staker
    ///   3. `[]` Stake pool withdraw authority
    ///   4. `[w]` Uninitialized validator stake list storage account
    ///   5. `[]` Reserve stake account must be initialized, have zero balance,
    ///      and staker / withdrawer authority set to pool withdraw authority.
    ///   6. `[w]` Pool token mint. Must have zero supply, owned by withdraw
    ///      authority.
    ///   7. `[w]` Pool account to deposit the generated fee for manager.
    ///   8. `[]` Token program id
    ///   9. `[]` (Optional) Deposit authority that must sign all deposits.
    ///      Defaults to the program address generated using
    ///      `find_deposit_authority_program_address`, making deposits
    ///      permissionless.
    Initialize {
        /// Fee assessed as percentage of perceived rewards
        fee: Fee,

        /// Fee charged per withdrawal as percentage of withdrawal
        withdrawal_fee: Fee,

        /// Fee charged per deposit as percentage of deposit
        deposit_fee: Fee,

        /// Percentage [0-100] of deposit_fee that goes to referrer
        referral_fee: u8,

        /// Maximum expected number of validators
        max_validators: u32,
    },

    ///   (Staker only) Adds stake account delegated to validator to the pool's
    ///   list of managed validators.
    ///
    ///   The stake account will have the rent-exempt amount plus
    ///   `max(
    ///     crate::MINIMUM_ACTIVE_STAKE,
    ///     solana_program::stake::tools::get_minimum_delegation()
    ///   )`.
    ///   It is funded from the stake pool reserve.
    ///
    ///   0. `[w]` Stake pool
    ///   1. `[s]` Staker
    ///   2. `[w]` Reserve stake account
    ///   3. `[]` Stake pool withdraw authority
    ///   4. `[w]` Validator stake list storage account
    ///   5. `[w]` Stake account to add to the pool
    ///   6. `[]` Validator this stake account will be delegated to
    ///   7. `[]` Rent sysvar
    ///   8. `[]` Clock sysvar
    ///   9. '[]' Stake history sysvar
    ///  10. '[]' Stake config sysvar
    ///  11. `[]` System program
    ///  12. `[]` Stake program
    ///
    ///  userdata: optional non-zero u32 seed used for generating the validator
    ///  stake address
    AddValidatorToPool(u32),

    ///   (Staker only) Removes validator from the pool, deactivating its stake
    ///
    ///   Only succeeds if the validator stake account has the minimum of
    ///   `max(crate::MINIMUM_ACTIVE_STAKE,
    ///   solana_program::stake::tools::get_minimum_delegation())`. plus the
    ///   rent-exempt amount.
    ///
    ///   0. `[w]` Stake pool
    ///   1. `[s]` Staker
    ///   2. `[]` Stake pool withdraw authority
    ///   3. `[w]` Validator stake list storage account
    ///   4. `[w]` Stake account to remove from the pool
    ///   5. `[w]` Transient stake account, to deactivate if necessary
    ///   6. `[]` Sysvar clock
    ///   7. `[]` Stake program id,
    RemoveValidatorFromPool,

    /// (Staker only) Decrease active stake on a validator, eventually moving it
    /// to the reserve
    ///
    /// Internally, this instruction splits a validator stake account into a
    /// transient stake account and deactivates it.
    ///
    ///  0. `[]` Stake pool
    ///  1. `[s]` Stake pool staker
    ///  2. `[]` Stake pool withdraw authority
    ///  3. `[w]` Validator list
    ///  4. `[w]` Canonical stake account to split from
    ///  5. `[w]` Transient stake account to receive split
    ///  6. `[]` Clock sysvar
    ///  7. `[]` Rent sysvar
    ///  8. `[]` System program
    ///  9. `[]` Stake program
    DecreaseValidatorStake {
        /// amount of lamports to split into the transient stake account
        lamports: u64,
        /// seed used to create transient stake account
        transient_stake_seed: u64,
    },

    /// (Staker only) Increase stake on a validator from the reserve account
    ///
    /// Internally, this instruction splits reserve stake into a transient stake
    /// account and delegate to the appropriate validator.
    /// `UpdateValidatorListBalance` will do the work of merging once it's
    /// ready.
    ///
    ///  0. `[]` Stake pool
    ///  1. `[s]` Stake pool staker
    ///  2. `[]` Stake pool withdraw authority
    ///  3. `[w]` Validator list
    ///  4. `[w]` Stake pool reserve stake
    ///  5. `[w]` Transient stake account
    ///  6. `[]` Validator stake account
    ///  7. `[]` Validator vote account to delegate to
    ///  8. '[]' Clock sysvar
    ///  9. '[]' Rent sysvar
    /// 10. `[]` Stake History sysvar
    /// 11. `[]` Stake Config sysvar
    /// 12. `[]` System program
    /// 13. `[]` Stake program
    IncreaseValidatorStake {
        /// amount of lamports to increase on the given validator
        lamports: u64,
        /// seed used to create transient stake account
        transient_stake_seed: u64,
    },

    /// (Staker only) Set the preferred deposit or withdraw stake account for
    /// the stake pool
    ///
    /// In order to avoid users abusing the stake pool as a free conversion
    /// between SOL staked on different validators, the staker can force all
    /// deposits and/or withdraws to go to one chosen account, or unset that
    /// account.
    ///
    /// 0. `[w]` Stake pool
    /// 1. `[s]` Stake pool staker
    /// 2. `[]` Validator list
    ///
    /// Fails if the validator is not part of the stake pool.
    SetPreferredValidator {
        /// Affected operation (deposit or withdraw)
        validator_type: PreferredValidatorType,
        /// Validator vote account that deposits or withdraws must go through,
        /// unset with None
        validator_vote_address: Option<Pubkey>,
    },

    ///  Updates balances of validator and transient stake accounts in the pool
    ///
    ///  While going through the pairs of validator and transient stake
    ///  accounts, if the transient stake is inactive, it is merged into the
    ///  reserve stake account. If the transient stake is active and has
    ///  matching credits observed, it is merged into the canonical
    ///  validator stake account. In all other states, nothing is done, and
    ///  the balance is simply added to the canonical stake account balance.
    ///
    ///  0. `[]` Stake pool
    ///  1. `[]` Stake pool withdraw authority
    ///  2. `[w]` Validator stake list storage account
    ///  3. `[w]` Reserve stake account
    ///  4. `[]` Sysvar clock
    ///  5. `[]` Sysvar stake history
    ///  6. `[]` Stake program
    ///  7. ..7+2N ` [] N pairs of validator and transient stake accounts
    UpdateValidatorListBalance {
        /// Index to start updating on the validator list
        start_index: u32,
        /// If true, don't try merging transient stake accounts into the reserve
        /// or validator stake account. Useful for testing or if a particular
        /// stake account is in a bad state, but we still want to update
        no_merge: bool,
    },

    ///   Updates total pool balance based on balances in the reserve and
    ///   validator list
    ///
    ///   0. `[w]` Stake pool
    ///   1. `[]` Stake pool withdraw authority
    ///   2. `[w]` Validator stake list storage account
    ///   3. `[]` Reserve stake account
    ///   4. `[w]` Account to receive pool fee tokens
    ///   5. `[w]` Pool mint account
    ///   6. `[]` Pool token program
    UpdateStakePoolBalance,

    ///   Cleans up validator stake account entries marked as `ReadyForRemoval`
    ///
    ///   0. `[]` Stake pool
    ///   1. `[w]` Validator stake list storage account
    CleanupRemovedValidatorEntries,

    ///   Deposit some stake into the pool. The output is a "pool" token
    ///   representing ownership into the pool. Inputs are converted to the
    ///   current ratio.
    ///
    ///   0. `[w]` Stake pool
    ///   1. `[w]` Validator stake list storage account
    ///   2. `[s]/[]` Stake pool deposit authority
    ///   3. `[]` Stake pool withdraw authority
    ///   4. `[w]` Stake account to join the pool (withdraw authority for the
    ///      stake account should be first set to the stake pool deposit
    ///      authority)
    ///   5. `[w]` Validator stake account for the stake account to be merged
    ///      with
    ///   6. `[w]` Reserve stake account, to withdraw rent exempt reserve
    ///   7. `[w]` User account to receive pool tokens
    ///   8. `[w]` Account to receive pool fee tokens
    ///   9. `[w]` Account to receive a portion of pool fee tokens as referral
    ///      fees
    ///   10. `[w]` Pool token mint account
    ///   11. '[]' Sysvar clock account
    ///   12. '[]' Sysvar stake history account
    ///   13. `[]` Pool token program id,
    ///   14. `[]` Stake program id,
    DepositStake,

    ///   Withdraw the token from the pool at the current ratio.
    ///
    ///   Succeeds if the stake account has enough SOL to cover the desired
    ///   amount of pool tokens, and if the withdrawal keeps the total
    ///   staked amount above the minimum of rent-exempt amount plus
    ///   `max(crate::MINIMUM_ACTIVE_STAKE,
    ///   solana_program::stake::tools::get_minimum_delegation())`.
    ///
    ///   When allowing withdrawals, the order of priority goes:
    ///
    ///   * preferred withdraw validator stake account (if set)
    ///   * validator stake accounts
    ///   * transient stake accounts
    ///   * reserve stake account OR totally remove validator stake accounts
    ///
    ///   A user can freely withdraw from a validator stake account, and if they
    ///   are all at the minimum, then they can withdraw from transient stake
    ///   accounts, and if they are all at minimum, then they can withdraw from
    ///   the reserve or remove any validator from the pool.
    ///
    ///   0. `[w]` Stake pool
    ///   1. `[w]` Validator stake list storage account
    ///   2. `[]` Stake pool withdraw authority
    ///   3. `[w]` Validator or reserve stake account to split
    ///   4. `[w]` Uninitialized stake account to receive withdrawal
    ///   5. `[]` User account to set as a new withdraw authority
    ///   6. `[s]` User transfer authority, for pool token account
    ///   7. `[w]` User account with pool tokens to burn from
    ///   8. `[w]` Account to receive pool fee tokens
    ///   9. `[w]` Pool token mint account
    ///  10. `[]` Sysvar clock account (required)
    ///  11. `[]` Pool token program id
    ///  12. `[]` Stake program id,
    ///
    ///  userdata: amount of pool tokens to withdraw
    WithdrawStake(u64),

    ///  (Manager only) Update manager
    ///
    ///  0. `[w]` StakePool
    ///  1. `[s]` Manager
    ///  2. `[s]` New manager
    ///  3. `[]` New manager fee account
    SetManager,

    ///  (Manager only) Update fee
    ///
    ///  0. `[w]` StakePool
    ///  1. `[s]` Manager
    SetFee {
        /// New fee value
        fee: u64,
    },

    ///  (Manager or staker only) Update staker
    ///
    ///  0. `[w]` StakePool
    ///  1. `[s]` Manager or current staker
    ///  2. '[]` New staker pubkey
    SetStaker,

    ///   Deposit SOL directly into the pool's reserve account. The output is a
    ///   "pool" token representing ownership into the pool. Inputs are
    ///   converted to the current ratio.
    ///
    ///   0. `[w]` Stake pool
    ///   1. `[]` Stake pool withdraw authority
    ///   2. `[w]` Reserve stake account, to deposit SOL
    ///   3. `[s]` Account providing the lamports to be deposited into the pool
    ///   4. `[w]` User account to receive pool tokens
    ///   5. `[w]` Account to receive fee tokens
    ///   6. `[w]` Account to receive a portion of fee as referral fees
    ///   7. `[w]` Pool token mint account
    ///   8. `[]` System program account
    ///   9. `[]` Token program id
    ///  10. `[s]` (Optional) Stake pool sol deposit authority.
    DepositSol(u64),

    ///  (Manager only) Update SOL deposit, stake deposit, or SOL withdrawal
    /// authority.
    ///
    ///  0. `[w]` StakePool
    ///  1. `[s]` Manager
    ///  2. '[]` New authority pubkey or none
    SetFundingAuthority(FundingType),

    ///   Withdraw SOL directly from the pool's reserve account. Fails if the
    ///   reserve does not have enough SOL.
    ///
    ///   0. `[w]` Stake pool
    ///   1. `[]` Stake pool withdraw authority
    ///   2. `[s]` User transfer authority, for pool token account
    ///   3. `[w]` User account to burn pool tokens
    ///   4. `[w]` Reserve stake account, to withdraw SOL
    ///   5. `[w]` Account receiving the lamports from the reserve, must be a
    ///      system account
    ///   6. `[w]` Account to receive pool fee tokens
    ///   7. `[w]` Pool token mint account
    ///   8. '[]' Clock sysvar
    ///   9. '[]' Stake history sysvar
    ///  10. `[]` Stake program account
    ///  11. `[]` Token program id
    ///  12. `[s]` (Optional) Stake pool sol withdraw authority
    WithdrawSol(u64),

    /// Create token metadata for the stake-pool token in the
    /// metaplex-token program
    /// 0. `[]` Stake pool
    /// 1. `[s]` Manager
    /// 2. `[]` Stake pool withdraw authority
    /// 3. `[]` Pool token mint account
    /// 4. `[s, w]` Payer for creation of token metadata account
    /// 5. `[w]` Token metadata account
    /// 6. `[]` Metadata program id
    /// 7. `[]` System program id
    CreateTokenMetadata {
        /// Token name
        name: String,
        /// Token symbol e.g. stkSOL
        symbol: String,
        /// URI of the uploaded metadata of the spl-token
        uri: String,
    },
    /// Update token metadata for the stake-pool token in the
    /// metaplex-token program
    ///
    /// 0. `[]` Stake pool
    /// 1. `[s]` Manager
    /// 2. `[]` Stake pool withdraw authority
    /// 3. `[w]` Token metadata account
    /// 4. `[]` Metadata program id
    UpdateTokenMetadata {
        /// Token name
        name: String,
        /// Token symbol e.g. stkSOL
        symbol: String,
        /// URI of the uploaded metadata of the spl-token
        uri: String,
    },

    /// (Staker only) Increase stake on a validator again in an epoch.
    ///
    /// Works regardless if the transient stake account exists.
    ///
    /// Internally, this instruction splits reserve stake into an ephemeral
    /// stake account, activates it, then merges or splits it into the
    /// transient stake account delegated to the appropriate validator.
    /// `UpdateValidatorListBalance` will do the work of merging once it's
    /// ready.
    ///
    ///  0. `[]` Stake pool
    ///  1. `[s]` Stake pool staker
    ///  2. `[]` Stake pool withdraw authority
    ///  3. `[w]` Validator list
    ///  4. `[w]` Stake pool reserve stake
    ///  5. `[w]` Uninitialized ephemeral stake account to receive stake
    ///  6. `[w]` Transient stake account
    ///  7. `[]` Validator stake account
    ///  8. `[]` Validator vote account to delegate to
    ///  9. '[]' Clock sysvar
    /// 10. `[]` Stake History sysvar
    /// 11. `[]` Stake Config sysvar
    /// 12. `[]` System program
    /// 13. `[]` Stake program
    IncreaseAdditionalValidatorStake {
        /// amount of lamports to increase on the given validator
        lamports: u64,
        /// seed used to create transient stake account
        transient_stake_seed: u64,
        /// seed used to create ephemeral account.
        ephemeral_stake_seed: u64,
    },

    /// (Staker only) Decrease active stake again from a validator, eventually
    /// moving it to the reserve
    ///
    /// Works regardless if the transient stake account already exists.
    ///
    ///  0. `[]` Stake pool
    ///  1. `[s]` Stake pool staker
    ///  2. `[]` Stake pool withdraw authority
    ///  3. `[w]` Validator list
    ///  4. `[w]` Reserve stake account, to fund rent exempt reserve
    ///  5. `[w]` Canonical stake account to split from
    ///  6. `[w]` Uninitialized ephemeral stake account to receive stake
    ///  7. `[w]` Transient stake account
    ///  8. `[]` Clock sysvar
    ///  9. '[]' Stake history sysvar
    /// 10. `[]` System program
    /// 11. `[]` Stake program
    DecreaseAdditionalValidatorStake {
        /// amount of lamports to split into the transient stake account
        lamports: u64,
        /// seed used to create transient stake account
        transient_stake_seed: u64,
        /// seed used to create ephemeral account.
        ephemeral_stake_seed: u64,
    },

    /// (Staker only) Decrease active stake on a validator, eventually moving it
    /// to the reserve
    ///
    /// Internally, this instruction:
    ///  * withdraws enough lamports to make the transient account rent-exempt
    ///  * splits from a validator stake account into a transient stake account
    ///  * deactivates the transient stake account
    ///
    ///  0. `[]` Stake pool
    ///  1. `[s]` Stake pool staker
    ///  2. `[]` Stake pool withdraw authority
    ///  3. `[w]` Validator list
    ///  4. `[w]` Reserve stake account, to fund rent exempt reserve
    ///  5. `[w]` Canonical stake account to split from
    ///  6. `[w]` Transient stake account to receive split
    ///  7. `[]` Clock sysvar
    ///  8. '[]' Stake history sysvar
    ///  9. `[]` System program
    /// 10. `[]` Stake program
    DecreaseValidatorStakeWithReserve {
        /// amount of lamports to split into the transient stake account
        lamports: u64,
        /// seed used to create transient stake account
        transient_stake_seed: u64,
    },

    /// (Staker only) Redelegate active stake on a validator, eventually moving
    /// it to another
    ///
    /// Internally, this instruction splits a validator stake account into its
    /// corresponding transient stake account, redelegates it to an ephemeral
    /// stake account, then merges that stake into the destination transient
    /// stake account.
    ///
    ///  0. `[]` Stake pool
    ///  1. `[s]` Stake pool staker
    ///  2. `[]` Stake pool withdraw authority
    ///  3. `[w]` Validator list
    ///  4. `[w]` Reserve stake account, to withdraw rent exempt reserve
    ///  5. `[w]` Source canonical stake account to split from
    ///  6. `[w]` Source transient stake account to receive split and be
    ///     redelegated
    ///  7. `[w]` Uninitialized ephemeral stake account to receive redelegation
    ///  8. `[w]` Destination transient stake account to receive ephemeral
    ///     stake by merge
    ///  9. `[]` Destination stake account to receive transient stake after
    ///     activation
    /// 10. `[]` Destination validator vote account
    /// 11. `[]` Clock sysvar
    /// 12. `[]` Stake History sysvar
    /// 13. `[]` Stake Config sysvar
    /// 14. `[]` System program
    /// 15. `[]` Stake program
    Redelegate {
        /// Amount of lamports to redelegate
        lamports: u64,
        /// Seed used to create source transient stake account
        source_transient_stake_seed: u64,
        /// Seed used to create destination ephemeral account.
        ephemeral_stake_seed: u64,
        /// Seed used to create destination transient stake account. If there is
        /// already transient stake, this must match the current seed, otherwise
        /// it can be anything
        destination_transient_stake_seed: u64,
    },

    ///   Deposit some stake into the pool, with a specified slippage
    ///   constraint. The output is a "pool" token representing ownership
    ///   into the pool. Inputs are converted at the current ratio.
    ///
    ///   Accounts as in `DepositStake`.
    DepositStakeWithSlippage {
        /// Minimum amount of pool tokens that must be received
        minimum_pool_tokens_out: u64,
    },

    ///   Withdraw the token from the pool at the current ratio, specifying a
    ///   minimum expected output lamport amount.
    ///
    ///   Accounts as in `WithdrawStake`.
    WithdrawStakeWithSlippage {
        /// Pool tokens to burn in exchange for lamports
        pool_tokens_in: u64,
        /// Minimum amount of lamports that must be received
        minimum_lamports_out: u64,
    },

    ///   Deposit SOL directly into the pool's reserve account, with a
    ///   specified slippage constraint.
    ///
    ///   Accounts as in `DepositSol`.
    DepositSolWithSlippage {
        /// Amount of lamports to deposit into the reserve
        lamports_in: u64,
        /// Minimum amount of pool tokens that must be received
        minimum_pool_tokens_out: u64,
    },

    ///   Withdraw SOL directly from the pool's reserve account, with a
    ///   specified slippage constraint.
    ///
    ///   Accounts as in `WithdrawSol`.
    WithdrawSolWithSlippage {
        /// Pool tokens to burn in exchange for lamports
        pool_tokens_in: u64,
        /// Minimum amount of lamports that must be received
        minimum_lamports_out: u64,
    },
}

/// Leading byte of every instruction, never renumbered
#[derive(Clone, Copy, Debug, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum StakePoolOpcode {
    /// [`StakePoolInstruction::Initialize`]
    Initialize = 0,
    /// [`StakePoolInstruction::AddValidatorToPool`]
    AddValidatorToPool = 1,
    /// [`StakePoolInstruction::RemoveValidatorFromPool`]
    RemoveValidatorFromPool = 2,
    /// [`StakePoolInstruction::DecreaseValidatorStake`]
    DecreaseValidatorStake = 3,
    /// [`StakePoolInstruction::IncreaseValidatorStake`]
    IncreaseValidatorStake = 4,
    /// [`StakePoolInstruction::SetPreferredValidator`]
    SetPreferredValidator = 5,
    /// [`StakePoolInstruction::UpdateValidatorListBalance`]
    UpdateValidatorListBalance = 6,
    /// [`StakePoolInstruction::UpdateStakePoolBalance`]
    UpdateStakePoolBalance = 7,
    /// [`StakePoolInstruction::CleanupRemovedValidatorEntries`]
    CleanupRemovedValidatorEntries = 8,
    /// [`StakePoolInstruction::DepositStake`]
    DepositStake = 9,
    /// [`StakePoolInstruction::WithdrawStake`]
    WithdrawStake = 10,
    /// [`StakePoolInstruction::SetManager`]
    SetManager = 11,
    /// [`StakePoolInstruction::SetFee`]
    SetFee = 12,
    /// [`StakePoolInstruction::SetStaker`]
    SetStaker = 13,
    /// [`StakePoolInstruction::DepositSol`]
    DepositSol = 14,
    /// [`StakePoolInstruction::SetFundingAuthority`]
    SetFundingAuthority = 15,
    /// [`StakePoolInstruction::WithdrawSol`]
    WithdrawSol = 16,
    /// [`StakePoolInstruction::CreateTokenMetadata`]
    CreateTokenMetadata = 17,
    /// [`StakePoolInstruction::UpdateTokenMetadata`]
    UpdateTokenMetadata = 18,
    /// [`StakePoolInstruction::IncreaseAdditionalValidatorStake`]
    IncreaseAdditionalValidatorStake = 19,
    /// [`StakePoolInstruction::DecreaseAdditionalValidatorStake`]
    DecreaseAdditionalValidatorStake = 20,
    /// [`StakePoolInstruction::DecreaseValidatorStakeWithReserve`]
    DecreaseValidatorStakeWithReserve = 21,
    /// [`StakePoolInstruction::Redelegate`]
    Redelegate = 22,
    /// [`StakePoolInstruction::DepositStakeWithSlippage`]
    DepositStakeWithSlippage = 23,
    /// [`StakePoolInstruction::WithdrawStakeWithSlippage`]
    WithdrawStakeWithSlippage = 24,
    /// [`StakePoolInstruction::DepositSolWithSlippage`]
    DepositSolWithSlippage = 25,
    /// [`StakePoolInstruction::WithdrawSolWithSlippage`]
    WithdrawSolWithSlippage = 26,
}

impl StakePoolInstruction {
    /// Unpacks a byte buffer into a [StakePoolInstruction]
    pub fn unpack(input: &[u8]) -> Result<Self, DecodeError> {
        let tag = *input.first().ok_or_else(|| {
            DecodeError::new(RecordType::Instruction, 0, "empty instruction data")
        })?;
        StakePoolOpcode::try_from(tag).map_err(|_| {
            DecodeError::new(RecordType::Instruction, 0, format!("unknown opcode {}", tag))
        })?;
        decode_exact(RecordType::Instruction, input)
    }

    /// Packs a [StakePoolInstruction] into a byte buffer
    pub fn pack(&self) -> Vec<u8> {
        borsh::to_vec(self).unwrap()
    }

    /// Leading byte this instruction is packed with
    pub fn opcode(&self) -> StakePoolOpcode {
        match self {
            Self::Initialize { .. } => StakePoolOpcode::Initialize,
            Self::AddValidatorToPool(_) => StakePoolOpcode::AddValidatorToPool,
            Self::RemoveValidatorFromPool => StakePoolOpcode::RemoveValidatorFromPool,
            Self::DecreaseValidatorStake { .. } => StakePoolOpcode::DecreaseValidatorStake,
            Self::IncreaseValidatorStake { .. } => StakePoolOpcode::IncreaseValidatorStake,
            Self::SetPreferredValidator { .. } => StakePoolOpcode::SetPreferredValidator,
            Self::UpdateValidatorListBalance { .. } => StakePoolOpcode::UpdateValidatorListBalance,
            Self::UpdateStakePoolBalance => StakePoolOpcode::UpdateStakePoolBalance,
            Self::CleanupRemovedValidatorEntries => StakePoolOpcode::CleanupRemovedValidatorEntries,
            Self::DepositStake => StakePoolOpcode::DepositStake,
            Self::WithdrawStake(_) => StakePoolOpcode::WithdrawStake,
            Self::SetManager => StakePoolOpcode::SetManager,
            Self::SetFee { .. } => StakePoolOpcode::SetFee,
            Self::SetStaker => StakePoolOpcode::SetStaker,
            Self::DepositSol(_) => StakePoolOpcode::DepositSol,
            Self::SetFundingAuthority(_) => StakePoolOpcode::SetFundingAuthority,
            Self::WithdrawSol(_) => StakePoolOpcode::WithdrawSol,
            Self::CreateTokenMetadata { .. } => StakePoolOpcode::CreateTokenMetadata,
            Self::UpdateTokenMetadata { .. } => StakePoolOpcode::UpdateTokenMetadata,
            Self::IncreaseAdditionalValidatorStake { .. } => {
                StakePoolOpcode::IncreaseAdditionalValidatorStake
            }
            Self::DecreaseAdditionalValidatorStake { .. } => {
                StakePoolOpcode::DecreaseAdditionalValidatorStake
            }
            Self::DecreaseValidatorStakeWithReserve { .. } => {
                StakePoolOpcode::DecreaseValidatorStakeWithReserve
            }
            Self::Redelegate { .. } => StakePoolOpcode::Redelegate,
            Self::DepositStakeWithSlippage { .. } => StakePoolOpcode::DepositStakeWithSlippage,
            Self::WithdrawStakeWithSlippage { .. } => StakePoolOpcode::WithdrawStakeWithSlippage,
            Self::DepositSolWithSlippage { .. } => StakePoolOpcode::DepositSolWithSlippage,
            Self::WithdrawSolWithSlippage { .. } => StakePoolOpcode::WithdrawSolWithSlippage,
        }
    }
}

/// Creates an 'initialize' instruction.
pub fn initialize(
    program_id: &Pubkey,
    stake_pool: &Pubkey,
    manager: &Pubkey,
    staker: &Pubkey,
    stake_pool_withdraw_authority: &Pubkey,
    validator_list: &Pubkey,
    reserve_stake: &Pubkey,
    pool_mint: &Pubkey,
    manager_pool_account: &Pubkey,
    token_program_id: &Pubkey,
    deposit_authority: Option<Pubkey>,
    fee: Fee,
    withdrawal_fee: Fee,
    deposit_fee: Fee,
    referral_fee: u8,
    max_validators: u32,
) -> Instruction {
    let init_data = StakePoolInstruction::Initialize {
        fee,
        withdrawal_fee,
        deposit_fee,
        referral_fee,
        max_validators,
    };
    let mut accounts = vec![
        AccountMeta::new(*stake_pool, false),
        AccountMeta::new_readonly(*manager, true),
        AccountMeta::new_readonly(*staker, false),
        AccountMeta::new_readonly(*stake_pool_withdraw_authority, false),
        AccountMeta::new(*validator_list, false),
        AccountMeta::new_readonly(*reserve_stake, false),
        AccountMeta::new(*pool_mint, false),
        AccountMeta::new(*manager_pool_account, false),
        AccountMeta::new_readonly(*token_program_id, false),
    ];
    if let Some(deposit_authority) = deposit_authority {
        accounts.push(AccountMeta::new_readonly(deposit_authority, true));
    }
    Instruction {
        program_id: *program_id,
        accounts,
        data: init_data.pack(),
    }
}

/// Creates `AddValidatorToPool` instruction (add new validator stake account to
/// the pool)
pub fn add_validator_to_pool(
    program_id: &Pubkey,
    stake_pool: &Pubkey,
    staker: &Pubkey,
    reserve: &Pubkey,
    stake_pool_withdraw: &Pubkey,
    validator_list: &Pubkey,
    stake: &Pubkey,
    validator: &Pubkey,
    seed: Option<NonZeroU32>,
) -> Instruction {
    #[allow(deprecated)]
    let accounts = vec![
        AccountMeta::new(*stake_pool, false),
        AccountMeta::new_readonly(*staker, true),
        AccountMeta::new(*reserve, false),
        AccountMeta::new_readonly(*stake_pool_withdraw, false),
        AccountMeta::new(*validator_list, false),
        AccountMeta::new(*stake, false),
        AccountMeta::new_readonly(*validator, false),
        AccountMeta::new_readonly(sysvar::rent::id(), false),
        AccountMeta::new_readonly(sysvar::clock::id(), false),
        AccountMeta::new_readonly(sysvar::stake_history::id(), false),
        AccountMeta::new_readonly(stake::config::id(), false),
        AccountMeta::new_readonly(system_program::id(), false),
        AccountMeta::new_readonly(stake::program::id(), false),
    ];
    let data = StakePoolInstruction::AddValidatorToPool(seed.map(|s| s.get()).unwrap_or(0));
    Instruction {
        program_id: *program_id,
        accounts,
        data: data.pack(),
    }
}

/// Creates `RemoveValidatorFromPool` instruction (remove validator stake
/// account from the pool)
pub fn remove_validator_from_pool(
    program_id: &Pubkey,
    stake_pool: &Pubkey,
    staker: &Pubkey,
    stake_pool_withdraw: &Pubkey,
    validator_list: &Pubkey,
    stake_account: &Pubkey,
    transient_stake_account: &Pubkey,
) -> Instruction {
    let accounts = vec![
        AccountMeta::new(*stake_pool, false),
        AccountMeta::new_readonly(*staker, true),
        AccountMeta::new_readonly(*stake_pool_withdraw, false),
        AccountMeta::new(*validator_list, false),
        AccountMeta::new(*stake_account, false),
        AccountMeta::new(*transient_stake_account, false),
        AccountMeta::new_readonly(sysvar::clock::id(), false),
        AccountMeta::new_readonly(stake::program::id(), false),
    ];
    Instruction {
        program_id: *program_id,
        accounts,
        data: StakePoolInstruction::RemoveValidatorFromPool.pack(),
    }
}

/// Creates `DecreaseValidatorStake` instruction (rebalance from validator
/// account to transient account)
pub fn decrease_validator_stake(
    program_id: &Pubkey,
    stake_pool: &Pubkey,
    staker: &Pubkey,
    stake_pool_withdraw_authority: &Pubkey,
    validator_list: &Pubkey,
    validator_stake: &Pubkey,
    transient_stake: &Pubkey,
    lamports: u64,
    transient_stake_seed: u64,
) -> Instruction {
    let accounts = vec![
        AccountMeta::new_readonly(*stake_pool, false),
        AccountMeta::new_readonly(*staker, true),
        AccountMeta::new_readonly(*stake_pool_withdraw_authority, false),
        AccountMeta::new(*validator_list, false),
        AccountMeta::new(*validator_stake, false),
        AccountMeta::new(*transient_stake, false),
        AccountMeta::new_readonly(sysvar::clock::id(), false),
        AccountMeta::new_readonly(sysvar::rent::id(), false),
        AccountMeta::new_readonly(system_program::id(), false),
        AccountMeta::new_readonly(stake::program::id(), false),
    ];
    let data = StakePoolInstruction::DecreaseValidatorStake {
        lamports,
        transient_stake_seed,
    };
    Instruction {
        program_id: *program_id,
        accounts,
        data: data.pack(),
    }
}

/// Creates `DecreaseAdditionalValidatorStake` instruction (rebalance from
/// validator account to transient account)
pub fn decrease_additional_validator_stake(
    program_id: &Pubkey,
    stake_pool: &Pubkey,
    staker: &Pubkey,
    stake_pool_withdraw_authority: &Pubkey,
    validator_list: &Pubkey,
    reserve_stake: &Pubkey,
    validator_stake: &Pubkey,
    ephemeral_stake: &Pubkey,
    transient_stake: &Pubkey,
    lamports: u64,
    transient_stake_seed: u64,
    ephemeral_stake_seed: u64,
) -> Instruction {
    let accounts = vec![
        AccountMeta::new_readonly(*stake_pool, false),
        AccountMeta::new_readonly(*staker, true),
        AccountMeta::new_readonly(*stake_pool_withdraw_authority, false),
        AccountMeta::new(*validator_list, false),
        AccountMeta::new(*reserve_stake, false),
        AccountMeta::new(*validator_stake, false),
        AccountMeta::new(*ephemeral_stake, false),
        AccountMeta::new(*transient_stake, false),
        AccountMeta::new_readonly(sysvar::clock::id(), false),
        AccountMeta::new_readonly(sysvar::stake_history::id(), false),
        AccountMeta::new_readonly(system_program::id(), false),
        AccountMeta::new_readonly(stake::program::id(), false),
    ];
    let data = StakePoolInstruction::DecreaseAdditionalValidatorStake {
        lamports,
        transient_stake_seed,
        ephemeral_stake_seed,
    };
    Instruction {
        program_id: *program_id,
        accounts,
        data: data.pack(),
    }
}

/// Creates `DecreaseValidatorStakeWithReserve` instruction (rebalance from
/// validator account to transient account)
pub fn decrease_validator_stake_with_reserve(
    program_id: &Pubkey,
    stake_pool: &Pubkey,
    staker: &Pubkey,
    stake_pool_withdraw_authority: &Pubkey,
    validator_list: &Pubkey,
    reserve_stake: &Pubkey,
    validator_stake: &Pubkey,
    transient_stake: &Pubkey,
    lamports: u64,
    transient_stake_seed: u64,
) -> Instruction {
    let accounts = vec![
        AccountMeta::new_readonly(*stake_pool, false),
        AccountMeta::new_readonly(*staker, true),
        AccountMeta::new_readonly(*stake_pool_withdraw_authority, false),
        AccountMeta::new(*validator_list, false),
        AccountMeta::new(*reserve_stake, false),
        AccountMeta::new(*validator_stake, false),
        AccountMeta::new(*transient_stake, false),
        AccountMeta::new_readonly(sysvar::clock::id(), false),
        AccountMeta::new_readonly(sysvar::stake_history::id(), false),
        AccountMeta::new_readonly(system_program::id(), false),
        AccountMeta::new_readonly(stake::program::id(), false),
    ];
    let data = StakePoolInstruction::DecreaseValidatorStakeWithReserve {
        lamports,
        transient_stake_seed,
    };
    Instruction {
        program_id: *program_id,
        accounts,
        data: data.pack(),
    }
}

/// Creates `IncreaseValidatorStake` instruction (rebalance from reserve account
/// to transient account)
pub fn increase_validator_stake(
    program_id: &Pubkey,
    stake_pool: &Pubkey,
    staker: &Pubkey,
    stake_pool_withdraw_authority: &Pubkey,
    validator_list: &Pubkey,
    reserve_stake: &Pubkey,
    transient_stake: &Pubkey,
    validator_stake: &Pubkey,
    validator: &Pubkey,
    lamports: u64,
    transient_stake_seed: u64,
) -> Instruction {
    #[allow(deprecated)]
    let accounts = vec![
        AccountMeta::new_readonly(*stake_pool, false),
        AccountMeta::new_readonly(*staker, true),
        AccountMeta::new_readonly(*stake_pool_withdraw_authority, false),
        AccountMeta::new(*validator_list, false),
        AccountMeta::new(*reserve_stake, false),
        AccountMeta::new(*transient_stake, false),
        AccountMeta::new_readonly(*validator_stake, false),
        AccountMeta::new_readonly(*validator, false),
        AccountMeta::new_readonly(sysvar::clock::id(), false),
        AccountMeta::new_readonly(sysvar::rent::id(), false),
        AccountMeta::new_readonly(sysvar::stake_history::id(), false),
        AccountMeta::new_readonly(stake::config::id(), false),
        AccountMeta::new_readonly(system_program::id(), false),
        AccountMeta::new_readonly(stake::program::id(), false),
    ];
    let data = StakePoolInstruction::IncreaseValidatorStake {
        lamports,
        transient_stake_seed,
    };
    Instruction {
        program_id: *program_id,
        accounts,
        data: data.pack(),
    }
}

/// Creates `IncreaseAdditionalValidatorStake` instruction (rebalance from
/// reserve account to transient account)
pub fn increase_additional_validator_stake(
    program_id: &Pubkey,
    stake_pool: &Pubkey,
    staker: &Pubkey,
    stake_pool_withdraw_authority: &Pubkey,
    validator_list: &Pubkey,
    reserve_stake: &Pubkey,
    ephemeral_stake: &Pubkey,
    transient_stake: &Pubkey,
    validator_stake: &Pubkey,
    validator: &Pubkey,
    lamports: u64,
    transient_stake_seed: u64,
    ephemeral_stake_seed: u64,
) -> Instruction {
    #[allow(deprecated)]
    let accounts = vec![
        AccountMeta::new_readonly(*stake_pool, false),
        AccountMeta::new_readonly(*staker, true),
        AccountMeta::new_readonly(*stake_pool_withdraw_authority, false),
        AccountMeta::new(*validator_list, false),
        AccountMeta::new(*reserve_stake, false),
        AccountMeta::new(*ephemeral_stake, false),
        AccountMeta::new(*transient_stake, false),
        AccountMeta::new_readonly(*validator_stake, false),
        AccountMeta::new_readonly(*validator, false),
        AccountMeta::new_readonly(sysvar::clock::id(), false),
        AccountMeta::new_readonly(sysvar::stake_history::id(), false),
        AccountMeta::new_readonly(stake::config::id(), false),
        AccountMeta::new_readonly(system_program::id(), false),
        AccountMeta::new_readonly(stake::program::id(), false),
    ];
    let data = StakePoolInstruction::IncreaseAdditionalValidatorStake {
        lamports,
        transient_stake_seed,
        ephemeral_stake_seed,
    };
    Instruction {
        program_id: *program_id,
        accounts,
        data: data.pack(),
    }
}

/// Creates `Redelegate` instruction (rebalance from one validator account to
/// another)
pub fn redelegate(
    program_id: &Pubkey,
    stake_pool: &Pubkey,
    staker: &Pubkey,
    stake_pool_withdraw_authority: &Pubkey,
    validator_list: &Pubkey,
    reserve_stake: &Pubkey,
    source_validator_stake: &Pubkey,
    source_transient_stake: &Pubkey,
    ephemeral_stake: &Pubkey,
    destination_transient_stake: &Pubkey,
    destination_validator_stake: &Pubkey,
    validator: &Pubkey,
    lamports: u64,
    source_transient_stake_seed: u64,
    ephemeral_stake_seed: u64,
    destination_transient_stake_seed: u64,
) -> Instruction {
    #[allow(deprecated)]
    let accounts = vec![
        AccountMeta::new_readonly(*stake_pool, false),
        AccountMeta::new_readonly(*staker, true),
        AccountMeta::new_readonly(*stake_pool_withdraw_authority, false),
        AccountMeta::new(*validator_list, false),
        AccountMeta::new(*reserve_stake, false),
        AccountMeta::new(*source_validator_stake, false),
        AccountMeta::new(*source_transient_stake, false),
        AccountMeta::new(*ephemeral_stake, false),
        AccountMeta::new(*destination_transient_stake, false),
        AccountMeta::new_readonly(*destination_validator_stake, false),
        AccountMeta::new_readonly(*validator, false),
        AccountMeta::new_readonly(sysvar::clock::id(), false),
        AccountMeta::new_readonly(sysvar::stake_history::id(), false),
        AccountMeta::new_readonly(stake::config::id(), false),
        AccountMeta::new_readonly(system_program::id(), false),
        AccountMeta::new_readonly(stake::program::id(), false),
    ];
    let data = StakePoolInstruction::Redelegate {
        lamports,
        source_transient_stake_seed,
        ephemeral_stake_seed,
        destination_transient_stake_seed,
    };
    Instruction {
        program_id: *program_id,
        accounts,
        data: data.pack(),
    }
}

/// Creates `SetPreferredDepositValidator` instruction
pub fn set_preferred_validator(
    program_id: &Pubkey,
    stake_pool_address: &Pubkey,
    staker: &Pubkey,
    validator_list_address: &Pubkey,
    validator_type: PreferredValidatorType,
    validator_vote_address: Option<Pubkey>,
) -> Instruction {
    let data = StakePoolInstruction::SetPreferredValidator {
        validator_type,
        validator_vote_address,
    };
    Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new(*stake_pool_address, false),
            AccountMeta::new_readonly(*staker, true),
            AccountMeta::new_readonly(*validator_list_address, false),
        ],
        data: data.pack(),
    }
}

/// Create an `AddValidatorToPool` instruction given an existing stake pool and
/// vote account
pub fn add_validator_to_pool_with_vote(
    program_id: &Pubkey,
    stake_pool: &StakePool,
    stake_pool_address: &Pubkey,
    vote_account_address: &Pubkey,
    seed: Option<NonZeroU32>,
) -> Instruction {
    let pool_withdraw_authority =
        find_withdraw_authority_program_address(program_id, stake_pool_address).0;
    let (stake_account_address, _) =
        find_stake_program_address(program_id, vote_account_address, stake_pool_address, seed);
    add_validator_to_pool(
        program_id,
        stake_pool_address,
        &stake_pool.staker,
        &stake_pool.reserve_stake,
        &pool_withdraw_authority,
        &stake_pool.validator_list,
        &stake_account_address,
        vote_account_address,
        seed,
    )
}

/// Create an `RemoveValidatorFromPool` instruction given an existing stake pool
/// and the validator's list entry
pub fn remove_validator_from_pool_with_vote(
    program_id: &Pubkey,
    stake_pool: &StakePool,
    stake_pool_address: &Pubkey,
    validator_stake_info: &ValidatorStakeInfo,
) -> Instruction {
    let vote_account_address = &validator_stake_info.vote_account_address;
    let pool_withdraw_authority =
        find_withdraw_authority_program_address(program_id, stake_pool_address).0;
    let (stake_account_address, _) =
        find_stake_program_address(program_id, vote_account_address, stake_pool_address, None);
    let (transient_stake_account, _) = find_transient_stake_program_address(
        program_id,
        vote_account_address,
        stake_pool_address,
        validator_stake_info.current_transient_stake_seed(),
    );
    remove_validator_from_pool(
        program_id,
        stake_pool_address,
        &stake_pool.staker,
        &pool_withdraw_authority,
        &stake_pool.validator_list,
        &stake_account_address,
        &transient_stake_account,
    )
}

/// Create an `IncreaseValidatorStake` instruction given an existing stake pool
/// and the validator's list entry, on a fresh transient stake account
pub fn increase_validator_stake_with_vote(
    program_id: &Pubkey,
    stake_pool: &StakePool,
    stake_pool_address: &Pubkey,
    validator_stake_info: &ValidatorStakeInfo,
    lamports: u64,
) -> Instruction {
    let vote_account_address = &validator_stake_info.vote_account_address;
    let transient_stake_seed = validator_stake_info.next_transient_stake_seed();
    let pool_withdraw_authority =
        find_withdraw_authority_program_address(program_id, stake_pool_address).0;
    let (transient_stake_address, _) = find_transient_stake_program_address(
        program_id,
        vote_account_address,
        stake_pool_address,
        transient_stake_seed,
    );
    let (validator_stake_address, _) =
        find_stake_program_address(program_id, vote_account_address, stake_pool_address, None);

    increase_validator_stake(
        program_id,
        stake_pool_address,
        &stake_pool.staker,
        &pool_withdraw_authority,
        &stake_pool.validator_list,
        &stake_pool.reserve_stake,
        &transient_stake_address,
        &validator_stake_address,
        vote_account_address,
        lamports,
        transient_stake_seed,
    )
}

/// Create an `IncreaseAdditionalValidatorStake` instruction given an existing
/// stake pool and the validator's list entry, adding to the transient stake
/// account in flight
pub fn increase_additional_validator_stake_with_vote(
    program_id: &Pubkey,
    stake_pool: &StakePool,
    stake_pool_address: &Pubkey,
    validator_stake_info: &ValidatorStakeInfo,
    lamports: u64,
    ephemeral_stake_seed: u64,
) -> Instruction {
    let vote_account_address = &validator_stake_info.vote_account_address;
    let transient_stake_seed = validator_stake_info.current_transient_stake_seed();
    let pool_withdraw_authority =
        find_withdraw_authority_program_address(program_id, stake_pool_address).0;
    let (ephemeral_stake_address, _) =
        find_ephemeral_stake_program_address(program_id, stake_pool_address, ephemeral_stake_seed);
    let (transient_stake_address, _) = find_transient_stake_program_address(
        program_id,
        vote_account_address,
        stake_pool_address,
        transient_stake_seed,
    );
    let (validator_stake_address, _) =
        find_stake_program_address(program_id, vote_account_address, stake_pool_address, None);

    increase_additional_validator_stake(
        program_id,
        stake_pool_address,
        &stake_pool.staker,
        &pool_withdraw_authority,
        &stake_pool.validator_list,
        &stake_pool.reserve_stake,
        &ephemeral_stake_address,
        &transient_stake_address,
        &validator_stake_address,
        vote_account_address,
        lamports,
        transient_stake_seed,
        ephemeral_stake_seed,
    )
}

/// Create a `DecreaseValidatorStakeWithReserve` instruction given an existing
/// stake pool and the validator's list entry, on a fresh transient stake
/// account
pub fn decrease_validator_stake_with_vote(
    program_id: &Pubkey,
    stake_pool: &StakePool,
    stake_pool_address: &Pubkey,
    validator_stake_info: &ValidatorStakeInfo,
    lamports: u64,
) -> Instruction {
    let vote_account_address = &validator_stake_info.vote_account_address;
    let transient_stake_seed = validator_stake_info.next_transient_stake_seed();
    let pool_withdraw_authority =
        find_withdraw_authority_program_address(program_id, stake_pool_address).0;
    let (validator_stake_address, _) =
        find_stake_program_address(program_id, vote_account_address, stake_pool_address, None);
    let (transient_stake_address, _) = find_transient_stake_program_address(
        program_id,
        vote_account_address,
        stake_pool_address,
        transient_stake_seed,
    );
    decrease_validator_stake_with_reserve(
        program_id,
        stake_pool_address,
        &stake_pool.staker,
        &pool_withdraw_authority,
        &stake_pool.validator_list,
        &stake_pool.reserve_stake,
        &validator_stake_address,
        &transient_stake_address,
        lamports,
        transient_stake_seed,
    )
}

/// Create a `DecreaseAdditionalValidatorStake` instruction given an existing
/// stake pool and the validator's list entry, adding to the transient stake
/// account in flight
pub fn decrease_additional_validator_stake_with_vote(
    program_id: &Pubkey,
    stake_pool: &StakePool,
    stake_pool_address: &Pubkey,
    validator_stake_info: &ValidatorStakeInfo,
    lamports: u64,
    ephemeral_stake_seed: u64,
) -> Instruction {
    let vote_account_address = &validator_stake_info.vote_account_address;
    let transient_stake_seed = validator_stake_info.current_transient_stake_seed();
    let pool_withdraw_authority =
        find_withdraw_authority_program_address(program_id, stake_pool_address).0;
    let (validator_stake_address, _) =
        find_stake_program_address(program_id, vote_account_address, stake_pool_address, None);
    let (ephemeral_stake_address, _) =
        find_ephemeral_stake_program_address(program_id, stake_pool_address, ephemeral_stake_seed);
    let (transient_stake_address, _) = find_transient_stake_program_address(
        program_id,
        vote_account_address,
        stake_pool_address,
        transient_stake_seed,
    );
    decrease_additional_validator_stake(
        program_id,
        stake_pool_address,
        &stake_pool.staker,
        &pool_withdraw_authority,
        &stake_pool.validator_list,
        &stake_pool.reserve_stake,
        &validator_stake_address,
        &ephemeral_stake_address,
        &transient_stake_address,
        lamports,
        transient_stake_seed,
        ephemeral_stake_seed,
    )
}

/// Creates `UpdateValidatorListBalance` instruction (update validator stake
/// account balances) for `len` entries of the list starting at `start_index`
pub fn update_validator_list_balance_chunk(
    program_id: &Pubkey,
    stake_pool: &Pubkey,
    stake_pool_withdraw_authority: &Pubkey,
    validator_list_address: &Pubkey,
    reserve_stake: &Pubkey,
    validator_list: &ValidatorList,
    len: usize,
    start_index: usize,
    no_merge: bool,
) -> Result<Instruction, ProgramError> {
    let mut accounts = vec![
        AccountMeta::new_readonly(*stake_pool, false),
        AccountMeta::new_readonly(*stake_pool_withdraw_authority, false),
        AccountMeta::new(*validator_list_address, false),
        AccountMeta::new(*reserve_stake, false),
        AccountMeta::new_readonly(sysvar::clock::id(), false),
        AccountMeta::new_readonly(sysvar::stake_history::id(), false),
        AccountMeta::new_readonly(stake::program::id(), false),
    ];
    let validator_list_subslice = validator_list
        .validators
        .get(start_index..start_index.saturating_add(len))
        .ok_or(ProgramError::InvalidInstructionData)?;
    accounts.extend(validator_list_subslice.iter().flat_map(|meta| {
        let (validator_stake_account, _) = find_stake_program_address(
            program_id,
            &meta.vote_account_address,
            stake_pool,
            None,
        );
        let (transient_stake_account, _) = find_transient_stake_program_address(
            program_id,
            &meta.vote_account_address,
            stake_pool,
            meta.current_transient_stake_seed(),
        );
        [
            AccountMeta::new(validator_stake_account, false),
            AccountMeta::new(transient_stake_account, false),
        ]
    }));
    let start_index = u32::try_from(start_index).map_err(|_| ProgramError::InvalidArgument)?;
    Ok(Instruction {
        program_id: *program_id,
        accounts,
        data: StakePoolInstruction::UpdateValidatorListBalance {
            start_index,
            no_merge,
        }
        .pack(),
    })
}

/// Creates `UpdateStakePoolBalance` instruction (pool balance from the stake
/// account list balances)
pub fn update_stake_pool_balance(
    program_id: &Pubkey,
    stake_pool: &Pubkey,
    withdraw_authority: &Pubkey,
    validator_list_storage: &Pubkey,
    reserve_stake: &Pubkey,
    manager_fee_account: &Pubkey,
    stake_pool_mint: &Pubkey,
    token_program_id: &Pubkey,
) -> Instruction {
    let accounts = vec![
        AccountMeta::new(*stake_pool, false),
        AccountMeta::new_readonly(*withdraw_authority, false),
        AccountMeta::new(*validator_list_storage, false),
        AccountMeta::new_readonly(*reserve_stake, false),
        AccountMeta::new(*manager_fee_account, false),
        AccountMeta::new(*stake_pool_mint, false),
        AccountMeta::new_readonly(*token_program_id, false),
    ];
    Instruction {
        program_id: *program_id,
        accounts,
        data: StakePoolInstruction::UpdateStakePoolBalance.pack(),
    }
}

/// Creates `CleanupRemovedValidatorEntries` instruction (removes entries from
/// the validator list)
pub fn cleanup_removed_validator_entries(
    program_id: &Pubkey,
    stake_pool: &Pubkey,
    validator_list_storage: &Pubkey,
) -> Instruction {
    let accounts = vec![
        AccountMeta::new_readonly(*stake_pool, false),
        AccountMeta::new(*validator_list_storage, false),
    ];
    Instruction {
        program_id: *program_id,
        accounts,
        data: StakePoolInstruction::CleanupRemovedValidatorEntries.pack(),
    }
}

/// Creates all `UpdateValidatorListBalance` and `UpdateStakePoolBalance`
/// instructions for fully updating a stake pool each epoch.
///
/// Returns the list balance instructions, `MAX_VALIDATORS_TO_UPDATE` entries
/// each, and the final instructions to run once they have all landed.
pub fn update_stake_pool(
    program_id: &Pubkey,
    stake_pool: &StakePool,
    validator_list: &ValidatorList,
    stake_pool_address: &Pubkey,
    no_merge: bool,
) -> (Vec<Instruction>, Vec<Instruction>) {
    let (withdraw_authority, _) =
        find_withdraw_authority_program_address(program_id, stake_pool_address);

    let update_list_instructions = validator_list
        .validators
        .chunks(MAX_VALIDATORS_TO_UPDATE)
        .enumerate()
        .map(|(i, chunk)| {
            // unwrap is safe here because the chunk is taken from the list itself
            update_validator_list_balance_chunk(
                program_id,
                stake_pool_address,
                &withdraw_authority,
                &stake_pool.validator_list,
                &stake_pool.reserve_stake,
                validator_list,
                chunk.len(),
                i.saturating_mul(MAX_VALIDATORS_TO_UPDATE),
                no_merge,
            )
            .unwrap()
        })
        .collect();

    let final_instructions = vec![
        update_stake_pool_balance(
            program_id,
            stake_pool_address,
            &withdraw_authority,
            &stake_pool.validator_list,
            &stake_pool.reserve_stake,
            &stake_pool.manager_fee_account,
            &stake_pool.pool_mint,
            &stake_pool.token_program_id,
        ),
        cleanup_removed_validator_entries(
            program_id,
            stake_pool_address,
            &stake_pool.validator_list,
        ),
    ];
    (update_list_instructions, final_instructions)
}

/// Creates instructions required to deposit into a stake pool, given a stake
/// account owned by the user. Without a custom deposit authority, the pool's
/// derived deposit authority is used and nothing extra has to sign.
///
/// With `minimum_pool_tokens_out`, the deposit fails unless at least that many
/// pool tokens are minted to the user.
pub fn deposit_stake(
    program_id: &Pubkey,
    stake_pool: &Pubkey,
    validator_list_storage: &Pubkey,
    stake_pool_deposit_authority: Option<&Pubkey>,
    stake_pool_withdraw_authority: &Pubkey,
    deposit_stake_address: &Pubkey,
    deposit_stake_withdraw_authority: &Pubkey,
    validator_stake_account: &Pubkey,
    reserve_stake_account: &Pubkey,
    pool_tokens_to: &Pubkey,
    manager_fee_account: &Pubkey,
    referrer_pool_tokens_account: &Pubkey,
    pool_mint: &Pubkey,
    token_program_id: &Pubkey,
    minimum_pool_tokens_out: Option<u64>,
) -> Vec<Instruction> {
    let mut instructions = vec![];
    let mut accounts = vec![
        AccountMeta::new(*stake_pool, false),
        AccountMeta::new(*validator_list_storage, false),
    ];
    let stake_pool_deposit_authority = match stake_pool_deposit_authority {
        Some(stake_pool_deposit_authority) => {
            accounts.push(AccountMeta::new_readonly(
                *stake_pool_deposit_authority,
                true,
            ));
            *stake_pool_deposit_authority
        }
        None => {
            let (stake_pool_deposit_authority, _) =
                find_deposit_authority_program_address(program_id, stake_pool);
            accounts.push(AccountMeta::new_readonly(
                stake_pool_deposit_authority,
                false,
            ));
            stake_pool_deposit_authority
        }
    };
    instructions.extend_from_slice(&[
        stake::instruction::authorize(
            deposit_stake_address,
            deposit_stake_withdraw_authority,
            &stake_pool_deposit_authority,
            stake::state::StakeAuthorize::Staker,
            None,
        ),
        stake::instruction::authorize(
            deposit_stake_address,
            deposit_stake_withdraw_authority,
            &stake_pool_deposit_authority,
            stake::state::StakeAuthorize::Withdrawer,
            None,
        ),
    ]);
    accounts.extend_from_slice(&[
        AccountMeta::new_readonly(*stake_pool_withdraw_authority, false),
        AccountMeta::new(*deposit_stake_address, false),
        AccountMeta::new(*validator_stake_account, false),
        AccountMeta::new(*reserve_stake_account, false),
        AccountMeta::new(*pool_tokens_to, false),
        AccountMeta::new(*manager_fee_account, false),
        AccountMeta::new(*referrer_pool_tokens_account, false),
        AccountMeta::new(*pool_mint, false),
        AccountMeta::new_readonly(sysvar::clock::id(), false),
        AccountMeta::new_readonly(sysvar::stake_history::id(), false),
        AccountMeta::new_readonly(*token_program_id, false),
        AccountMeta::new_readonly(stake::program::id(), false),
    ]);

    let data = match minimum_pool_tokens_out {
        Some(minimum_pool_tokens_out) => StakePoolInstruction::DepositStakeWithSlippage {
            minimum_pool_tokens_out,
        },
        None => StakePoolInstruction::DepositStake,
    };
    instructions.push(Instruction {
        program_id: *program_id,
        accounts,
        data: data.pack(),
    });
    instructions
}

/// Creates instruction required to deposit SOL directly into a stake pool.
pub fn deposit_sol(
    program_id: &Pubkey,
    stake_pool: &Pubkey,
    stake_pool_withdraw_authority: &Pubkey,
    reserve_stake_account: &Pubkey,
    lamports_from: &Pubkey,
    pool_tokens_to: &Pubkey,
    manager_fee_account: &Pubkey,
    referrer_pool_tokens_account: &Pubkey,
    pool_mint: &Pubkey,
    token_program_id: &Pubkey,
    sol_deposit_authority: Option<&Pubkey>,
    lamports_in: u64,
    minimum_pool_tokens_out: Option<u64>,
) -> Instruction {
    let mut accounts = vec![
        AccountMeta::new(*stake_pool, false),
        AccountMeta::new_readonly(*stake_pool_withdraw_authority, false),
        AccountMeta::new(*reserve_stake_account, false),
        AccountMeta::new(*lamports_from, true),
        AccountMeta::new(*pool_tokens_to, false),
        AccountMeta::new(*manager_fee_account, false),
        AccountMeta::new(*referrer_pool_tokens_account, false),
        AccountMeta::new(*pool_mint, false),
        AccountMeta::new_readonly(system_program::id(), false),
        AccountMeta::new_readonly(*token_program_id, false),
    ];
    if let Some(sol_deposit_authority) = sol_deposit_authority {
        accounts.push(AccountMeta::new_readonly(*sol_deposit_authority, true));
    }
    let data = match minimum_pool_tokens_out {
        Some(minimum_pool_tokens_out) => StakePoolInstruction::DepositSolWithSlippage {
            lamports_in,
            minimum_pool_tokens_out,
        },
        None => StakePoolInstruction::DepositSol(lamports_in),
    };
    Instruction {
        program_id: *program_id,
        accounts,
        data: data.pack(),
    }
}

/// Creates a 'WithdrawStake' instruction.
pub fn withdraw_stake(
    program_id: &Pubkey,
    stake_pool: &Pubkey,
    validator_list_storage: &Pubkey,
    stake_pool_withdraw: &Pubkey,
    stake_to_split: &Pubkey,
    stake_to_receive: &Pubkey,
    user_stake_authority: &Pubkey,
    user_transfer_authority: &Pubkey,
    user_pool_token_account: &Pubkey,
    manager_fee_account: &Pubkey,
    pool_mint: &Pubkey,
    token_program_id: &Pubkey,
    pool_tokens_in: u64,
    minimum_lamports_out: Option<u64>,
) -> Instruction {
    let accounts = vec![
        AccountMeta::new(*stake_pool, false),
        AccountMeta::new(*validator_list_storage, false),
        AccountMeta::new_readonly(*stake_pool_withdraw, false),
        AccountMeta::new(*stake_to_split, false),
        AccountMeta::new(*stake_to_receive, false),
        AccountMeta::new_readonly(*user_stake_authority, false),
        AccountMeta::new_readonly(*user_transfer_authority, true),
        AccountMeta::new(*user_pool_token_account, false),
        AccountMeta::new(*manager_fee_account, false),
        AccountMeta::new(*pool_mint, false),
        AccountMeta::new_readonly(sysvar::clock::id(), false),
        AccountMeta::new_readonly(*token_program_id, false),
        AccountMeta::new_readonly(stake::program::id(), false),
    ];
    let data = match minimum_lamports_out {
        Some(minimum_lamports_out) => StakePoolInstruction::WithdrawStakeWithSlippage {
            pool_tokens_in,
            minimum_lamports_out,
        },
        None => StakePoolInstruction::WithdrawStake(pool_tokens_in),
    };
    Instruction {
        program_id: *program_id,
        accounts,
        data: data.pack(),
    }
}

/// Creates instruction required to withdraw SOL directly from a stake pool.
pub fn withdraw_sol(
    program_id: &Pubkey,
    stake_pool: &Pubkey,
    stake_pool_withdraw_authority: &Pubkey,
    user_transfer_authority: &Pubkey,
    pool_tokens_from: &Pubkey,
    reserve_stake_account: &Pubkey,
    lamports_to: &Pubkey,
    manager_fee_account: &Pubkey,
    pool_mint: &Pubkey,
    token_program_id: &Pubkey,
    sol_withdraw_authority: Option<&Pubkey>,
    pool_tokens_in: u64,
    minimum_lamports_out: Option<u64>,
) -> Instruction {
    let mut accounts = vec![
        AccountMeta::new(*stake_pool, false),
        AccountMeta::new_readonly(*stake_pool_withdraw_authority, false),
        AccountMeta::new_readonly(*user_transfer_authority, true),
        AccountMeta::new(*pool_tokens_from, false),
        AccountMeta::new(*reserve_stake_account, false),
        AccountMeta::new(*lamports_to, false),
        AccountMeta::new(*manager_fee_account, false),
        AccountMeta::new(*pool_mint, false),
        AccountMeta::new_readonly(sysvar::clock::id(), false),
        AccountMeta::new_readonly(sysvar::stake_history::id(), false),
        AccountMeta::new_readonly(stake::program::id(), false),
        AccountMeta::new_readonly(*token_program_id, false),
    ];
    if let Some(sol_withdraw_authority) = sol_withdraw_authority {
        accounts.push(AccountMeta::new_readonly(*sol_withdraw_authority, true));
    }
    let data = match minimum_lamports_out {
        Some(minimum_lamports_out) => StakePoolInstruction::WithdrawSolWithSlippage {
            pool_tokens_in,
            minimum_lamports_out,
        },
        None => StakePoolInstruction::WithdrawSol(pool_tokens_in),
    };
    Instruction {
        program_id: *program_id,
        accounts,
        data: data.pack(),
    }
}

/// Creates a 'set manager' instruction.
pub fn set_manager(
    program_id: &Pubkey,
    stake_pool: &Pubkey,
    manager: &Pubkey,
    new_manager: &Pubkey,
    new_fee_receiver: &Pubkey,
) -> Instruction {
    let accounts = vec![
        AccountMeta::new(*stake_pool, false),
        AccountMeta::new_readonly(*manager, true),
        AccountMeta::new_readonly(*new_manager, true),
        AccountMeta::new_readonly(*new_fee_receiver, false),
    ];
    Instruction {
        program_id: *program_id,
        accounts,
        data: StakePoolInstruction::SetManager.pack(),
    }
}

/// Creates a 'set fee' instruction.
pub fn set_fee(program_id: &Pubkey, stake_pool: &Pubkey, manager: &Pubkey, fee: u64) -> Instruction {
    let accounts = vec![
        AccountMeta::new(*stake_pool, false),
        AccountMeta::new_readonly(*manager, true),
    ];
    Instruction {
        program_id: *program_id,
        accounts,
        data: StakePoolInstruction::SetFee { fee }.pack(),
    }
}

/// Creates a 'set staker' instruction.
pub fn set_staker(
    program_id: &Pubkey,
    stake_pool: &Pubkey,
    set_staker_authority: &Pubkey,
    new_staker: &Pubkey,
) -> Instruction {
    let accounts = vec![
        AccountMeta::new(*stake_pool, false),
        AccountMeta::new_readonly(*set_staker_authority, true),
        AccountMeta::new_readonly(*new_staker, false),
    ];
    Instruction {
        program_id: *program_id,
        accounts,
        data: StakePoolInstruction::SetStaker.pack(),
    }
}

/// Creates a 'SetFundingAuthority' instruction.
pub fn set_funding_authority(
    program_id: &Pubkey,
    stake_pool: &Pubkey,
    manager: &Pubkey,
    new_funding_authority: Option<&Pubkey>,
    funding_type: FundingType,
) -> Instruction {
    let mut accounts = vec![
        AccountMeta::new(*stake_pool, false),
        AccountMeta::new_readonly(*manager, true),
    ];
    if let Some(auth) = new_funding_authority {
        accounts.push(AccountMeta::new_readonly(*auth, false))
    }
    Instruction {
        program_id: *program_id,
        accounts,
        data: StakePoolInstruction::SetFundingAuthority(funding_type).pack(),
    }
}

/// Creates an instruction to update metadata in the mpl token metadata program
/// account for the pool token
pub fn update_token_metadata(
    program_id: &Pubkey,
    stake_pool: &Pubkey,
    manager: &Pubkey,
    pool_mint: &Pubkey,
    name: String,
    symbol: String,
    uri: String,
) -> StakePoolClientResult<Instruction> {
    check_metadata_lengths(&name, &symbol, &uri)?;
    let (stake_pool_withdraw_authority, _) =
        find_withdraw_authority_program_address(program_id, stake_pool);
    let (token_metadata, _) = find_metadata_account(pool_mint);

    let accounts = vec![
        AccountMeta::new_readonly(*stake_pool, false),
        AccountMeta::new_readonly(*manager, true),
        AccountMeta::new_readonly(stake_pool_withdraw_authority, false),
        AccountMeta::new(token_metadata, false),
        AccountMeta::new_readonly(inline_mpl_token_metadata::id(), false),
    ];

    Ok(Instruction {
        program_id: *program_id,
        accounts,
        data: StakePoolInstruction::UpdateTokenMetadata { name, symbol, uri }.pack(),
    })
}

/// Creates an instruction to create metadata using the mpl token metadata
/// program for the pool token
pub fn create_token_metadata(
    program_id: &Pubkey,
    stake_pool: &Pubkey,
    manager: &Pubkey,
    pool_mint: &Pubkey,
    payer: &Pubkey,
    name: String,
    symbol: String,
    uri: String,
) -> StakePoolClientResult<Instruction> {
    check_metadata_lengths(&name, &symbol, &uri)?;
    let (stake_pool_withdraw_authority, _) =
        find_withdraw_authority_program_address(program_id, stake_pool);
    let (token_metadata, _) = find_metadata_account(pool_mint);

    let accounts = vec![
        AccountMeta::new_readonly(*stake_pool, false),
        AccountMeta::new_readonly(*manager, true),
        AccountMeta::new_readonly(stake_pool_withdraw_authority, false),
        AccountMeta::new_readonly(*pool_mint, false),
        AccountMeta::new(*payer, true),
        AccountMeta::new(token_metadata, false),
        AccountMeta::new_readonly(inline_mpl_token_metadata::id(), false),
        AccountMeta::new_readonly(system_program::id(), false),
    ];

    Ok(Instruction {
        program_id: *program_id,
        accounts,
        data: StakePoolInstruction::CreateTokenMetadata { name, symbol, uri }.pack(),
    })
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::{error::StakePoolClientError, id, state::StakeStatus},
        test_case::test_case,
    };

    fn pool_with_list(len: u64) -> (Pubkey, StakePool, ValidatorList) {
        let stake_pool = StakePool {
            staker: Pubkey::new_unique(),
            validator_list: Pubkey::new_unique(),
            reserve_stake: Pubkey::new_unique(),
            pool_mint: Pubkey::new_unique(),
            manager_fee_account: Pubkey::new_unique(),
            token_program_id: spl_token::id(),
            ..StakePool::default()
        };
        let mut validator_list = ValidatorList::new(len as u32);
        validator_list.validators = (0..len)
            .map(|i| ValidatorStakeInfo {
                transient_seed_suffix_start: i * 10,
                status: StakeStatus::Active,
                vote_account_address: Pubkey::new_unique(),
                ..ValidatorStakeInfo::default()
            })
            .collect();
        (Pubkey::new_unique(), stake_pool, validator_list)
    }

    #[test]
    fn set_fee_payload() {
        let instruction = set_fee(&id(), &Pubkey::new_unique(), &Pubkey::new_unique(), 500);
        let mut expected = vec![12];
        expected.extend_from_slice(&500u64.to_le_bytes());
        assert_eq!(instruction.data, expected);
        assert!(instruction.accounts[0].is_writable);
        assert!(instruction.accounts[1].is_signer);
    }

    #[test_case(None, StakePoolOpcode::WithdrawStake; "plain")]
    #[test_case(Some(1), StakePoolOpcode::WithdrawStakeWithSlippage; "slippage")]
    fn withdraw_stake_slippage(minimum: Option<u64>, expected: StakePoolOpcode) {
        let key = Pubkey::new_unique();
        let instruction = withdraw_stake(
            &id(), &key, &key, &key, &key, &key, &key, &key, &key, &key, &key, &key, 42, minimum,
        );
        assert_eq!(instruction.data[0], u8::from(expected));
        let decoded = StakePoolInstruction::unpack(&instruction.data).unwrap();
        assert_eq!(decoded.opcode(), expected);
        assert_eq!(instruction.accounts.len(), 13);
    }

    #[test_case(None, StakePoolOpcode::DepositSol; "plain")]
    #[test_case(Some(7), StakePoolOpcode::DepositSolWithSlippage; "slippage")]
    fn deposit_sol_slippage(minimum: Option<u64>, expected: StakePoolOpcode) {
        let key = Pubkey::new_unique();
        let instruction =
            deposit_sol(&id(), &key, &key, &key, &key, &key, &key, &key, &key, &key, None, 5, minimum);
        assert_eq!(
            StakePoolInstruction::unpack(&instruction.data).unwrap().opcode(),
            expected
        );
        assert!(instruction.accounts[3].is_signer);
        assert_eq!(instruction.accounts.len(), 10);
    }

    #[test]
    fn withdraw_sol_with_authority() {
        let key = Pubkey::new_unique();
        let authority = Pubkey::new_unique();
        let instruction = withdraw_sol(
            &id(),
            &key,
            &key,
            &key,
            &key,
            &key,
            &key,
            &key,
            &key,
            &key,
            Some(&authority),
            10,
            Some(9),
        );
        let last = instruction.accounts.last().unwrap();
        assert_eq!(last.pubkey, authority);
        assert!(last.is_signer);
        assert!(!last.is_writable);
        assert_eq!(
            StakePoolInstruction::unpack(&instruction.data).unwrap(),
            StakePoolInstruction::WithdrawSolWithSlippage {
                pool_tokens_in: 10,
                minimum_lamports_out: 9,
            }
        );
    }

    #[test]
    fn deposit_stake_authorizes_pool() {
        let key = Pubkey::new_unique();
        let stake_pool = Pubkey::new_unique();
        let instructions = deposit_stake(
            &id(),
            &stake_pool,
            &key,
            None,
            &key,
            &key,
            &key,
            &key,
            &key,
            &key,
            &key,
            &key,
            &key,
            &key,
            None,
        );
        assert_eq!(instructions.len(), 3);
        assert_eq!(instructions[0].program_id, stake::program::id());
        assert_eq!(instructions[1].program_id, stake::program::id());
        let deposit = &instructions[2];
        let (deposit_authority, _) = find_deposit_authority_program_address(&id(), &stake_pool);
        assert_eq!(deposit.accounts[2].pubkey, deposit_authority);
        assert!(!deposit.accounts[2].is_signer);
        assert_eq!(deposit.data, vec![9]);

        let custom = Pubkey::new_unique();
        let instructions = deposit_stake(
            &id(),
            &stake_pool,
            &key,
            Some(&custom),
            &key,
            &key,
            &key,
            &key,
            &key,
            &key,
            &key,
            &key,
            &key,
            &key,
            Some(3),
        );
        assert_eq!(instructions[2].accounts[2].pubkey, custom);
        assert!(instructions[2].accounts[2].is_signer);
        assert_eq!(instructions[2].data[0], 23);
    }

    #[test]
    fn metadata_too_long_produces_nothing() {
        let key = Pubkey::new_unique();
        let err = create_token_metadata(
            &id(),
            &key,
            &key,
            &key,
            &key,
            "n".repeat(33),
            "SYM".to_string(),
            "uri".to_string(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            StakePoolClientError::MetadataFieldTooLong {
                field: "name",
                max: 32,
                actual: 33
            }
        ));
        assert!(update_token_metadata(
            &id(),
            &key,
            &key,
            &key,
            "name".to_string(),
            "s".repeat(11),
            "uri".to_string(),
        )
        .is_err());
    }

    #[test]
    fn metadata_instruction_round_trips() {
        let key = Pubkey::new_unique();
        let instruction = update_token_metadata(
            &id(),
            &key,
            &key,
            &key,
            "Pool".to_string(),
            "pSOL".to_string(),
            "https://example.com/pool.json".to_string(),
        )
        .unwrap();
        assert_eq!(
            StakePoolInstruction::unpack(&instruction.data).unwrap(),
            StakePoolInstruction::UpdateTokenMetadata {
                name: "Pool".to_string(),
                symbol: "pSOL".to_string(),
                uri: "https://example.com/pool.json".to_string(),
            }
        );
    }

    #[test]
    fn unpack_rejects_bad_input() {
        let err = StakePoolInstruction::unpack(&[]).unwrap_err();
        assert_eq!((err.record, err.offset), (RecordType::Instruction, 0));
        let err = StakePoolInstruction::unpack(&[27]).unwrap_err();
        assert_eq!(err.offset, 0);
        // WithdrawStake needs a full u64
        let err = StakePoolInstruction::unpack(&[10, 1, 2, 3]).unwrap_err();
        assert_eq!(err.offset, 1);
        let err = StakePoolInstruction::unpack(&[7, 0]).unwrap_err();
        assert_eq!(err.offset, 1);
    }

    #[test]
    fn preferred_validator_payload() {
        let vote = Pubkey::new_unique();
        let key = Pubkey::new_unique();
        let instruction = set_preferred_validator(
            &id(),
            &key,
            &key,
            &key,
            PreferredValidatorType::Withdraw,
            Some(vote),
        );
        assert_eq!(instruction.data[..3], [5u8, 1, 1]);
        assert_eq!(&instruction.data[3..], vote.as_ref());
        assert!(!instruction.accounts[2].is_writable);
    }

    #[test]
    fn update_stake_pool_chunks() {
        let (stake_pool_address, stake_pool, validator_list) = pool_with_list(12);
        let (update_list, final_instructions) =
            update_stake_pool(&id(), &stake_pool, &validator_list, &stake_pool_address, false);
        assert_eq!(update_list.len(), 3);
        assert_eq!(final_instructions.len(), 2);
        assert_eq!(update_list[0].accounts.len(), 7 + 2 * 5);
        assert_eq!(update_list[2].accounts.len(), 7 + 2 * 2);
        assert_eq!(
            StakePoolInstruction::unpack(&update_list[1].data).unwrap(),
            StakePoolInstruction::UpdateValidatorListBalance {
                start_index: 5,
                no_merge: false,
            }
        );

        let entry = &validator_list.validators[5];
        let (transient, _) = find_transient_stake_program_address(
            &id(),
            &entry.vote_account_address,
            &stake_pool_address,
            entry.transient_seed_suffix_start,
        );
        assert_eq!(update_list[1].accounts[8].pubkey, transient);
        assert_eq!(final_instructions[0].data, vec![7]);
        assert_eq!(final_instructions[1].data, vec![8]);
    }

    #[test]
    fn update_chunk_out_of_range() {
        let (stake_pool_address, stake_pool, validator_list) = pool_with_list(3);
        let key = Pubkey::new_unique();
        assert_eq!(
            update_validator_list_balance_chunk(
                &id(),
                &stake_pool_address,
                &key,
                &stake_pool.validator_list,
                &stake_pool.reserve_stake,
                &validator_list,
                2,
                2,
                false,
            )
            .unwrap_err(),
            ProgramError::InvalidInstructionData
        );
    }

    #[test]
    fn transient_seed_rule() {
        let (stake_pool_address, stake_pool, validator_list) = pool_with_list(2);
        let entry = &validator_list.validators[1];
        let vote = entry.vote_account_address;

        let increase =
            increase_validator_stake_with_vote(&id(), &stake_pool, &stake_pool_address, entry, 5);
        let (bumped, _) =
            find_transient_stake_program_address(&id(), &vote, &stake_pool_address, 11);
        assert_eq!(increase.accounts[5].pubkey, bumped);
        assert_eq!(
            StakePoolInstruction::unpack(&increase.data).unwrap(),
            StakePoolInstruction::IncreaseValidatorStake {
                lamports: 5,
                transient_stake_seed: 11,
            }
        );

        let additional = increase_additional_validator_stake_with_vote(
            &id(),
            &stake_pool,
            &stake_pool_address,
            entry,
            5,
            0,
        );
        let (current, _) =
            find_transient_stake_program_address(&id(), &vote, &stake_pool_address, 10);
        assert_eq!(additional.accounts[6].pubkey, current);

        let decrease =
            decrease_validator_stake_with_vote(&id(), &stake_pool, &stake_pool_address, entry, 5);
        assert_eq!(decrease.accounts[6].pubkey, bumped);
        assert_eq!(decrease.data[0], 21);

        let decrease_additional = decrease_additional_validator_stake_with_vote(
            &id(),
            &stake_pool,
            &stake_pool_address,
            entry,
            5,
            3,
        );
        assert_eq!(decrease_additional.accounts[7].pubkey, current);
    }

    #[test]
    fn add_validator_uses_seed() {
        let (stake_pool_address, stake_pool, _) = pool_with_list(0);
        let vote = Pubkey::new_unique();
        let seed = NonZeroU32::new(3);
        let instruction =
            add_validator_to_pool_with_vote(&id(), &stake_pool, &stake_pool_address, &vote, seed);
        let (stake, _) = find_stake_program_address(&id(), &vote, &stake_pool_address, seed);
        assert_eq!(instruction.accounts[5].pubkey, stake);
        assert_eq!(instruction.data, vec![1, 3, 0, 0, 0]);
        assert_eq!(instruction.accounts.len(), 13);
    }

    #[test]
    fn initialize_optional_deposit_authority() {
        let key = Pubkey::new_unique();
        let fee = Fee {
            denominator: 100,
            numerator: 2,
        };
        let build = |deposit_authority| {
            initialize(
                &id(),
                &key,
                &key,
                &key,
                &key,
                &key,
                &key,
                &key,
                &key,
                &key,
                deposit_authority,
                fee,
                fee,
                fee,
                10,
                50,
            )
        };
        assert_eq!(build(None).accounts.len(), 9);
        let with_authority = build(Some(Pubkey::new_unique()));
        assert_eq!(with_authority.accounts.len(), 10);
        assert!(with_authority.accounts[9].is_signer);
        assert_eq!(with_authority.data.len(), 1 + 16 * 3 + 1 + 4);
        assert_eq!(
            StakePoolInstruction::unpack(&with_authority.data)
                .unwrap()
                .opcode(),
            StakePoolOpcode::Initialize
        );
    }

    #[test]
    fn every_instruction_round_trips() {
        let fee = Fee {
            denominator: 100,
            numerator: 3,
        };
        // listed in opcode order
        let instructions = [
            StakePoolInstruction::Initialize {
                fee,
                withdrawal_fee: Fee {
                    denominator: 1_000,
                    numerator: 1,
                },
                deposit_fee: Fee::default(),
                referral_fee: 25,
                max_validators: 3_000,
            },
            StakePoolInstruction::AddValidatorToPool(7),
            StakePoolInstruction::RemoveValidatorFromPool,
            StakePoolInstruction::DecreaseValidatorStake {
                lamports: 1_500_000_000,
                transient_stake_seed: 9,
            },
            StakePoolInstruction::IncreaseValidatorStake {
                lamports: 2_000_000_000,
                transient_stake_seed: 10,
            },
            StakePoolInstruction::SetPreferredValidator {
                validator_type: PreferredValidatorType::Withdraw,
                validator_vote_address: Some(Pubkey::new_unique()),
            },
            StakePoolInstruction::UpdateValidatorListBalance {
                start_index: 15,
                no_merge: true,
            },
            StakePoolInstruction::UpdateStakePoolBalance,
            StakePoolInstruction::CleanupRemovedValidatorEntries,
            StakePoolInstruction::DepositStake,
            StakePoolInstruction::WithdrawStake(42),
            StakePoolInstruction::SetManager,
            StakePoolInstruction::SetFee { fee: 1_234 },
            StakePoolInstruction::SetStaker,
            StakePoolInstruction::DepositSol(5_000),
            StakePoolInstruction::SetFundingAuthority(FundingType::SolWithdraw),
            StakePoolInstruction::WithdrawSol(6_000),
            StakePoolInstruction::CreateTokenMetadata {
                name: "Staked SOL".to_string(),
                symbol: "sSOL".to_string(),
                uri: "https://example.com/ssol.json".to_string(),
            },
            StakePoolInstruction::UpdateTokenMetadata {
                name: "Staked SOL v2".to_string(),
                symbol: "sSOL2".to_string(),
                uri: String::new(),
            },
            StakePoolInstruction::IncreaseAdditionalValidatorStake {
                lamports: 3,
                transient_stake_seed: 4,
                ephemeral_stake_seed: 5,
            },
            StakePoolInstruction::DecreaseAdditionalValidatorStake {
                lamports: 6,
                transient_stake_seed: 7,
                ephemeral_stake_seed: 8,
            },
            StakePoolInstruction::DecreaseValidatorStakeWithReserve {
                lamports: 9,
                transient_stake_seed: 10,
            },
            StakePoolInstruction::Redelegate {
                lamports: 1,
                source_transient_stake_seed: 2,
                ephemeral_stake_seed: 3,
                destination_transient_stake_seed: 4,
            },
            StakePoolInstruction::DepositStakeWithSlippage {
                minimum_pool_tokens_out: 11,
            },
            StakePoolInstruction::WithdrawStakeWithSlippage {
                pool_tokens_in: 12,
                minimum_lamports_out: 13,
            },
            StakePoolInstruction::DepositSolWithSlippage {
                lamports_in: 14,
                minimum_pool_tokens_out: 15,
            },
            StakePoolInstruction::WithdrawSolWithSlippage {
                pool_tokens_in: 16,
                minimum_lamports_out: 17,
            },
        ];
        assert_eq!(instructions.len(), 27);
        for (opcode, instruction) in instructions.into_iter().enumerate() {
            let data = instruction.pack();
            assert_eq!(data[0], opcode as u8);
            assert_eq!(data[0], u8::from(instruction.opcode()));
            assert_eq!(
                StakePoolOpcode::try_from(opcode as u8).unwrap(),
                instruction.opcode()
            );
            assert_eq!(StakePoolInstruction::unpack(&data).unwrap(), instruction);
        }
    }
}
