//! State transition types

use {
    crate::{
        error::{DecodeError, RecordType},
        stake::Lockup,
    },
    borsh::{io, BorshDeserialize, BorshSchema, BorshSerialize},
    solana_program::pubkey::{Pubkey, PUBKEY_BYTES},
    std::{fmt, io::Read},
};

/// Enum representing the account type managed by the program
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, BorshDeserialize, BorshSerialize, BorshSchema,
)]
pub enum AccountType {
    /// If the account has not been initialized, the enum will be 0
    #[default]
    Uninitialized,
    /// Stake pool
    StakePool,
    /// Validator stake list
    ValidatorList,
}

impl AccountType {
    fn from_discriminant(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(Self::Uninitialized),
            1 => Some(Self::StakePool),
            2 => Some(Self::ValidatorList),
            _ => None,
        }
    }
}

/// Fee rate as a ratio, minted on `UpdateStakePoolBalance` as a proportion of
/// the rewards.
/// If either the numerator or the denominator is 0, the fee is considered to be
/// 0
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, BorshSerialize, BorshDeserialize, BorshSchema,
)]
pub struct Fee {
    /// denominator of the fee ratio
    pub denominator: u64,
    /// numerator of the fee ratio
    pub numerator: u64,
}

impl Fee {
    /// Serialized size
    pub const LEN: usize = 16;

    /// Applies the Fee's rates to a given amount, `amt`
    /// returning the amount to be subtracted from it as fees
    /// (0 if denominator is 0 or amt is 0),
    /// or None if overflow occurs
    #[inline]
    pub fn apply(&self, amt: u64) -> Option<u64> {
        if self.denominator == 0 {
            return Some(0);
        }
        u64::try_from(
            (amt as u128)
                .checked_mul(self.numerator as u128)?
                .checked_div(self.denominator as u128)?,
        )
        .ok()
    }
}

impl fmt::Display for Fee {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.numerator > 0 && self.denominator > 0 {
            write!(f, "{}/{}", self.numerator, self.denominator)
        } else {
            write!(f, "none")
        }
    }
}

/// Wrapper type that "counts down" epochs, which is Borsh-compatible with the
/// native `Option`
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, BorshSerialize, BorshDeserialize, BorshSchema,
)]
pub enum FutureEpoch<T> {
    /// Nothing is set
    #[default]
    None,
    /// Value is ready after the next epoch boundary
    One(T),
    /// Value is ready after two epoch boundaries
    Two(T),
}

impl<T> FutureEpoch<T> {
    /// Create a new value to be unlocked in two epochs
    pub fn new(value: T) -> Self {
        Self::Two(value)
    }

    /// Get the pending value, whichever epoch it becomes active in
    pub fn get(&self) -> Option<&T> {
        match self {
            Self::None => None,
            Self::One(value) | Self::Two(value) => Some(value),
        }
    }
}

impl<T> From<FutureEpoch<T>> for Option<T> {
    fn from(v: FutureEpoch<T>) -> Option<T> {
        match v {
            FutureEpoch::None => None,
            FutureEpoch::One(inner) | FutureEpoch::Two(inner) => Some(inner),
        }
    }
}

const OPTION_PUBKEY_LEN: usize = 1 + PUBKEY_BYTES;
const FUTURE_FEE_LEN: usize = 1 + Fee::LEN;

/// Initialized program details.
#[repr(C)]
#[derive(Clone, Debug, Default, PartialEq, BorshDeserialize, BorshSerialize, BorshSchema)]
pub struct StakePool {
    /// Account type, must be StakePool currently
    pub account_type: AccountType,

    /// Manager authority, allows for updating the staker, manager, and fee
    /// account
    pub manager: Pubkey,

    /// Staker authority, allows for adding and removing validators, and
    /// managing stake distribution
    pub staker: Pubkey,

    /// Stake deposit authority
    ///
    /// If a depositor pubkey is specified on initialization, then deposits must
    /// be signed by this authority. If no deposit authority is specified,
    /// then the stake pool will default to the result of:
    /// `Pubkey::find_program_address(
    ///     &[&stake_pool_address.as_ref(), b"deposit"],
    ///     program_id,
    /// )`
    pub stake_deposit_authority: Pubkey,

    /// Stake withdrawal authority bump seed
    /// for `create_program_address(&[state::StakePool account, "withdrawal"])`
    pub stake_withdraw_bump_seed: u8,

    /// Validator stake list storage account
    pub validator_list: Pubkey,

    /// Reserve stake account, holds deactivated stake
    pub reserve_stake: Pubkey,

    /// Pool Mint
    pub pool_mint: Pubkey,

    /// Manager fee account
    pub manager_fee_account: Pubkey,

    /// Pool token program id
    pub token_program_id: Pubkey,

    /// Total stake under management.
    /// Note that if `last_update_epoch` does not match the current epoch then
    /// this field may not be accurate
    pub total_lamports: u64,

    /// Total supply of pool tokens (should always match the supply in the Pool
    /// Mint)
    pub pool_token_supply: u64,

    /// Last epoch the `total_lamports` field was updated
    pub last_update_epoch: u64,

    /// Lockup that all stakes in the pool must have
    pub lockup: Lockup,

    /// Fee taken as a proportion of rewards each epoch
    pub epoch_fee: Fee,

    /// Fee for next epoch
    pub next_epoch_fee: FutureEpoch<Fee>,

    /// Preferred deposit validator vote account pubkey
    pub preferred_deposit_validator_vote_address: Option<Pubkey>,

    /// Preferred withdraw validator vote account pubkey
    pub preferred_withdraw_validator_vote_address: Option<Pubkey>,

    /// Fee assessed on stake deposits
    pub stake_deposit_fee: Fee,

    /// Fee assessed on withdrawals
    pub stake_withdrawal_fee: Fee,

    /// Future stake withdrawal fee, to be set for the following epoch
    pub next_stake_withdrawal_fee: FutureEpoch<Fee>,

    /// Fees paid out to referrers on referred stake deposits.
    /// Expressed as a percentage (0 - 100) of deposit fees.
    /// i.e. `stake_deposit_fee`% of stake deposited is collected as deposit
    /// fees for every deposit and `stake_referral_fee`% of the collected
    /// stake deposit fees is paid out to the referrer
    pub stake_referral_fee: u8,

    /// Toggles whether the `DepositSol` instruction requires a signature from
    /// this `sol_deposit_authority`
    pub sol_deposit_authority: Option<Pubkey>,

    /// Fee assessed on SOL deposits
    pub sol_deposit_fee: Fee,

    /// Fees paid out to referrers on referred SOL deposits.
    /// Expressed as a percentage (0 - 100) of SOL deposit fees.
    /// i.e. `sol_deposit_fee`% of SOL deposited is collected as deposit fees
    /// for every deposit and `sol_referral_fee`% of the collected SOL
    /// deposit fees is paid out to the referrer
    pub sol_referral_fee: u8,

    /// Toggles whether the `WithdrawSol` instruction requires a signature from
    /// the `deposit_authority`
    pub sol_withdraw_authority: Option<Pubkey>,

    /// Fee assessed on SOL withdrawals
    pub sol_withdrawal_fee: Fee,

    /// Future SOL withdrawal fee, to be set for the following epoch
    pub next_sol_withdrawal_fee: FutureEpoch<Fee>,

    /// Last epoch's total pool tokens, used only for APR estimation
    pub last_epoch_pool_token_supply: u64,

    /// Last epoch's total lamports, used only for APR estimation
    pub last_epoch_total_lamports: u64,
}

const STAKE_POOL_FIELDS_LEN: usize = 1 // account_type
    + PUBKEY_BYTES * 3 // manager, staker, stake_deposit_authority
    + 1 // stake_withdraw_bump_seed
    + PUBKEY_BYTES * 5 // validator_list, reserve_stake, pool_mint, manager_fee_account, token_program_id
    + 8 * 3 // total_lamports, pool_token_supply, last_update_epoch
    + Lockup::LEN
    + Fee::LEN // epoch_fee
    + FUTURE_FEE_LEN // next_epoch_fee
    + OPTION_PUBKEY_LEN * 2 // preferred validators
    + Fee::LEN * 2 // stake deposit and withdrawal fees
    + FUTURE_FEE_LEN // next_stake_withdrawal_fee
    + 1 // stake_referral_fee
    + OPTION_PUBKEY_LEN // sol_deposit_authority
    + Fee::LEN // sol_deposit_fee
    + 1 // sol_referral_fee
    + OPTION_PUBKEY_LEN // sol_withdraw_authority
    + Fee::LEN // sol_withdrawal_fee
    + FUTURE_FEE_LEN // next_sol_withdrawal_fee
    + 8 * 2; // last epoch pool token supply and total lamports

const _: () = assert!(StakePool::LEN == STAKE_POOL_FIELDS_LEN);

impl StakePool {
    /// Maximum serialized size, with every optional field present
    pub const LEN: usize = 611;

    /// Decode a stake pool account
    pub fn decode(data: &[u8]) -> Result<Self, DecodeError> {
        let stake_pool: Self = decode_prefix(RecordType::StakePool, data)?;
        if stake_pool.account_type != AccountType::StakePool {
            return Err(DecodeError::new(
                RecordType::StakePool,
                0,
                format!("unexpected account type {:?}", stake_pool.account_type),
            ));
        }
        Ok(stake_pool)
    }

    /// Encode into a buffer of exactly [`StakePool::LEN`] bytes
    pub fn encode(&self) -> io::Result<Vec<u8>> {
        let mut data = borsh::to_vec(self)?;
        data.resize(Self::LEN, 0);
        Ok(data)
    }

    /// calculate the pool tokens that should be minted for a deposit of
    /// `stake_lamports`
    #[inline]
    pub fn calc_pool_tokens_for_deposit(&self, stake_lamports: u64) -> Option<u64> {
        if self.total_lamports == 0 || self.pool_token_supply == 0 {
            return Some(stake_lamports);
        }
        u64::try_from(
            (stake_lamports as u128)
                .checked_mul(self.pool_token_supply as u128)?
                .checked_div(self.total_lamports as u128)?,
        )
        .ok()
    }

    /// calculate lamports amount on withdrawal
    #[inline]
    pub fn calc_lamports_withdraw_amount(&self, pool_tokens: u64) -> Option<u64> {
        let denominator = self.pool_token_supply as u128;
        if denominator == 0 {
            return None;
        }
        let numerator = (pool_tokens as u128).checked_mul(self.total_lamports as u128)?;
        if numerator < denominator {
            Some(0)
        } else {
            u64::try_from(numerator.checked_div(denominator)?).ok()
        }
    }

    /// calculate pool tokens to be deducted as withdrawal fees
    #[inline]
    pub fn calc_pool_tokens_stake_withdrawal_fee(&self, pool_tokens: u64) -> Option<u64> {
        self.stake_withdrawal_fee.apply(pool_tokens)
    }

    /// calculate pool tokens to be deducted as withdrawal fees
    #[inline]
    pub fn calc_pool_tokens_sol_withdrawal_fee(&self, pool_tokens: u64) -> Option<u64> {
        self.sol_withdrawal_fee.apply(pool_tokens)
    }

    /// calculate pool tokens to be deducted as stake deposit fees
    #[inline]
    pub fn calc_pool_tokens_stake_deposit_fee(&self, pool_tokens_minted: u64) -> Option<u64> {
        self.stake_deposit_fee.apply(pool_tokens_minted)
    }

    /// calculate pool tokens to be deducted from deposit fees as referral fees
    #[inline]
    pub fn calc_pool_tokens_stake_referral_fee(&self, stake_deposit_fee: u64) -> Option<u64> {
        referral_split(stake_deposit_fee, self.stake_referral_fee)
    }

    /// calculate pool tokens to be deducted as SOL deposit fees
    #[inline]
    pub fn calc_pool_tokens_sol_deposit_fee(&self, pool_tokens_minted: u64) -> Option<u64> {
        self.sol_deposit_fee.apply(pool_tokens_minted)
    }

    /// calculate pool tokens to be deducted from SOL deposit fees as referral
    /// fees
    #[inline]
    pub fn calc_pool_tokens_sol_referral_fee(&self, sol_deposit_fee: u64) -> Option<u64> {
        referral_split(sol_deposit_fee, self.sol_referral_fee)
    }

    /// Calculate the fee in pool tokens that goes to the manager
    ///
    /// This function assumes that `reward_lamports` has not already been added
    /// to the stake pool's `total_lamports`
    #[inline]
    pub fn calc_epoch_fee_amount(&self, reward_lamports: u64) -> Option<u64> {
        if reward_lamports == 0 {
            return Some(0);
        }
        let total_lamports = (self.total_lamports as u128).checked_add(reward_lamports as u128)?;
        let fee_lamports = self.epoch_fee.apply(reward_lamports)? as u128;
        if total_lamports == fee_lamports || self.pool_token_supply == 0 {
            Some(reward_lamports)
        } else {
            u64::try_from(
                (self.pool_token_supply as u128)
                    .checked_mul(fee_lamports)?
                    .checked_div(total_lamports.checked_sub(fee_lamports)?)?,
            )
            .ok()
        }
    }

    /// Check if StakePool is actually initialized as a stake pool
    pub fn is_valid(&self) -> bool {
        self.account_type == AccountType::StakePool
    }

    /// Check if StakePool is currently uninitialized
    pub fn is_uninitialized(&self) -> bool {
        self.account_type == AccountType::Uninitialized
    }

    /// Whether the totals are stale for `current_epoch` and an update must run
    /// before they can be trusted
    pub fn is_update_required(&self, current_epoch: u64) -> bool {
        self.last_update_epoch < current_epoch
    }
}

fn referral_split(fee: u64, referral_percentage: u8) -> Option<u64> {
    u64::try_from(
        (fee as u128)
            .checked_mul(referral_percentage as u128)?
            .checked_div(100u128)?,
    )
    .ok()
}

/// Status of the stake account in the validator list, for accounting
#[derive(
    Copy, Clone, Debug, Default, PartialEq, Eq, BorshDeserialize, BorshSerialize, BorshSchema,
)]
pub enum StakeStatus {
    /// Stake account is active, there may be a transient stake as well
    #[default]
    Active,
    /// Only transient stake account exists, when a transient stake is
    /// deactivating during validator removal
    DeactivatingTransient,
    /// No more validator stake accounts exist, entry ready for removal during
    /// `UpdateStakePoolBalance`
    ReadyForRemoval,
}

/// Information about a validator in the pool
#[repr(C)]
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, BorshDeserialize, BorshSerialize, BorshSchema,
)]
pub struct ValidatorStakeInfo {
    /// Amount of lamports on the validator stake account, including rent
    pub active_stake_lamports: u64,

    /// Amount of transient stake delegated to this validator
    pub transient_stake_lamports: u64,

    /// Last epoch the active and transient stake lamports fields were updated
    pub last_update_epoch: u64,

    /// Start of the validator transient account seed suffixes
    pub transient_seed_suffix_start: u64,

    /// End of the validator transient account seed suffixes
    pub transient_seed_suffix_end: u64,

    /// Status of the validator stake account
    pub status: StakeStatus,

    /// Validator vote account address
    pub vote_account_address: Pubkey,
}

impl ValidatorStakeInfo {
    /// Serialized size
    pub const LEN: usize = 8 * 5 + 1 + PUBKEY_BYTES;

    /// Get the total lamports on this validator (active and transient)
    pub fn stake_lamports(&self) -> Option<u64> {
        self.active_stake_lamports
            .checked_add(self.transient_stake_lamports)
    }

    /// Seed of the transient stake account currently in flight
    pub fn current_transient_stake_seed(&self) -> u64 {
        self.transient_seed_suffix_start
    }

    /// Seed for a new transient stake account, which must not collide with the
    /// one in flight
    pub fn next_transient_stake_seed(&self) -> u64 {
        self.transient_seed_suffix_start.saturating_add(1)
    }
}

/// Storage list for all validator stake accounts in the pool.
#[repr(C)]
#[derive(Clone, Debug, Default, PartialEq, BorshDeserialize, BorshSerialize, BorshSchema)]
pub struct ValidatorList {
    /// Data outside of the validator list, separated out for cheaper
    /// deserializations
    pub header: ValidatorListHeader,

    /// List of stake info for each validator in the pool
    pub validators: Vec<ValidatorStakeInfo>,
}

/// Helper type to deserialize just the start of a ValidatorList
#[repr(C)]
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, BorshDeserialize, BorshSerialize, BorshSchema,
)]
pub struct ValidatorListHeader {
    /// Account type, must be ValidatorList currently
    pub account_type: AccountType,

    /// Maximum allowable number of validators
    pub max_validators: u32,
}

impl ValidatorListHeader {
    /// Serialized size
    pub const LEN: usize = 1 + 4;
}

impl ValidatorList {
    /// Create an empty instance containing space for `max_validators`
    pub fn new(max_validators: u32) -> Self {
        Self {
            header: ValidatorListHeader {
                account_type: AccountType::ValidatorList,
                max_validators,
            },
            validators: Vec::with_capacity(max_validators as usize),
        }
    }

    /// Account size needed to hold `max_validators` entries
    pub fn size_with_max_validators(max_validators: usize) -> usize {
        ValidatorListHeader::LEN + 4 + max_validators * ValidatorStakeInfo::LEN
    }

    /// Decode a validator list account, reading exactly as many entries as
    /// its count says
    pub fn decode(data: &[u8]) -> Result<Self, DecodeError> {
        let header: ValidatorListHeader = decode_prefix(RecordType::ValidatorList, data)?;
        if header.account_type != AccountType::ValidatorList {
            return Err(DecodeError::new(
                RecordType::ValidatorList,
                0,
                format!("unexpected account type {:?}", header.account_type),
            ));
        }
        let count_bytes = data
            .get(ValidatorListHeader::LEN..ValidatorListHeader::LEN + 4)
            .ok_or_else(|| {
                DecodeError::new(
                    RecordType::ValidatorList,
                    ValidatorListHeader::LEN,
                    "missing validator count",
                )
            })?;
        let mut count = [0u8; 4];
        count.copy_from_slice(count_bytes);
        let count = u32::from_le_bytes(count) as usize;
        let required = count
            .checked_mul(ValidatorStakeInfo::LEN)
            .and_then(|len| len.checked_add(ValidatorListHeader::LEN + 4))
            .unwrap_or(usize::MAX);
        if data.len() < required {
            return Err(DecodeError::new(
                RecordType::ValidatorList,
                data.len(),
                format!(
                    "{} validators need {} bytes, only {} present",
                    count,
                    required,
                    data.len()
                ),
            ));
        }
        decode_prefix(RecordType::ValidatorList, data)
    }

    /// Encode into a buffer sized for the list's maximum validator count
    pub fn encode(&self) -> io::Result<Vec<u8>> {
        let mut data = borsh::to_vec(self)?;
        let len = Self::size_with_max_validators(self.header.max_validators as usize);
        if data.len() < len {
            data.resize(len, 0);
        }
        Ok(data)
    }

    /// Check if contains validator with particular pubkey
    pub fn contains(&self, vote_account_address: &Pubkey) -> bool {
        self.find(vote_account_address).is_some()
    }

    /// Check if contains validator with particular pubkey
    pub fn find(&self, vote_account_address: &Pubkey) -> Option<&ValidatorStakeInfo> {
        self.validators
            .iter()
            .find(|x| x.vote_account_address == *vote_account_address)
    }

    /// Check if the list has any active stake
    pub fn has_active_stake(&self) -> bool {
        self.validators.iter().any(|x| x.active_stake_lamports > 0)
    }
}

/// Any account the stake pool program owns
#[derive(Clone, Debug, PartialEq)]
pub enum StakePoolAccount {
    /// Allocated but not yet initialized
    Uninitialized,
    /// Stake pool
    StakePool(Box<StakePool>),
    /// Validator list
    ValidatorList(ValidatorList),
}

/// Decode any stake pool program account by its leading discriminant
pub fn decode_account(data: &[u8]) -> Result<StakePoolAccount, DecodeError> {
    let tag = *data
        .first()
        .ok_or_else(|| DecodeError::new(RecordType::AccountType, 0, "empty account data"))?;
    match AccountType::from_discriminant(tag) {
        Some(AccountType::Uninitialized) => Ok(StakePoolAccount::Uninitialized),
        Some(AccountType::StakePool) => {
            StakePool::decode(data).map(|pool| StakePoolAccount::StakePool(Box::new(pool)))
        }
        Some(AccountType::ValidatorList) => {
            ValidatorList::decode(data).map(StakePoolAccount::ValidatorList)
        }
        None => Err(DecodeError::new(
            RecordType::AccountType,
            0,
            format!("unknown account discriminant {}", tag),
        )),
    }
}

/// Reader over a byte slice that remembers how far it got. A short
/// `read_exact` consumes nothing, so the offset stays on the field that
/// failed.
struct OffsetReader<'a> {
    data: &'a [u8],
    offset: usize,
}

impl Read for OffsetReader<'_> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let remaining = &self.data[self.offset..];
        let len = remaining.len().min(buf.len());
        buf[..len].copy_from_slice(&remaining[..len]);
        self.offset += len;
        Ok(len)
    }

    fn read_exact(&mut self, buf: &mut [u8]) -> std::io::Result<()> {
        let remaining = &self.data[self.offset..];
        if remaining.len() < buf.len() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                format!("needed {} bytes, {} left", buf.len(), remaining.len()),
            ));
        }
        buf.copy_from_slice(&remaining[..buf.len()]);
        self.offset += buf.len();
        Ok(())
    }
}

/// Deserialize `T` from the start of `data`, ignoring anything after it
pub(crate) fn decode_prefix<T: BorshDeserialize>(
    record: RecordType,
    data: &[u8],
) -> Result<T, DecodeError> {
    let mut reader = OffsetReader { data, offset: 0 };
    T::deserialize_reader(&mut reader).map_err(|err| DecodeError::new(record, reader.offset, err))
}

/// Deserialize `T` from exactly all of `data`
pub(crate) fn decode_exact<T: BorshDeserialize>(
    record: RecordType,
    data: &[u8],
) -> Result<T, DecodeError> {
    let mut reader = OffsetReader { data, offset: 0 };
    let value = T::deserialize_reader(&mut reader)
        .map_err(|err| DecodeError::new(record, reader.offset, err))?;
    if reader.offset != data.len() {
        return Err(DecodeError::new(
            record,
            reader.offset,
            format!("{} unexpected trailing bytes", data.len() - reader.offset),
        ));
    }
    Ok(value)
}
