//! Planning of stake withdrawals: which pool stake accounts to split from,
//! how many pool tokens to burn against each, and where the stake goes

use {
    crate::{
        error::{StakePoolClientError, StakePoolClientResult},
        find_stake_program_address, find_transient_stake_program_address, minimum_reserve_lamports,
        minimum_stake_lamports,
        stake::StakeAccountKind,
        state::{StakePool, StakeStatus, ValidatorList, ValidatorStakeInfo},
        MAX_WITHDRAW_ACCOUNTS,
    },
    log::warn,
    solana_program::pubkey::Pubkey,
    std::cmp::Ordering,
};

/// A stake account to split from, and the pool tokens burnt for it
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WithdrawAccount {
    /// Stake account to split from
    pub stake_address: Pubkey,
    /// Validator the stake is delegated to, `None` for the reserve
    pub vote_address: Option<Pubkey>,
    /// Pool tokens to burn
    pub pool_amount: u64,
}

/// Caller ordering of candidate stake accounts within a priority class
pub type WithdrawComparator<'a> = &'a dyn Fn(&WithdrawAccount, &WithdrawAccount) -> Ordering;

/// Where withdrawn stake may come from
#[derive(Clone, Copy)]
pub enum WithdrawSource<'a> {
    /// The reserve stake account only
    Reserve,
    /// The validator the receiving stake account is already delegated to, so
    /// the withdrawn stake can be merged into it
    DelegatedReceiver {
        /// Vote account of the receiver's delegation
        voter: Pubkey,
    },
    /// One specific validator
    Validator(Pubkey),
    /// Any stake in the pool, in the program's priority order
    Any {
        /// Ordering within a priority class, list order if `None`
        comparator: Option<WithdrawComparator<'a>>,
        /// Do not gross up availability by the withdrawal fee
        skip_fee: bool,
    },
}

/// Stake account supplied by the user to receive the withdrawal
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReceiverStake {
    /// Address of the stake account
    pub address: Pubkey,
    /// Its current state
    pub kind: StakeAccountKind,
}

impl<'a> WithdrawSource<'a> {
    /// Pick the source from the caller's hints. The first hint that applies
    /// wins: reserve, then a delegated receiver, then an explicit validator.
    pub fn from_hints(
        use_reserve: bool,
        receiver: Option<&ReceiverStake>,
        vote_account_address: Option<Pubkey>,
        comparator: Option<WithdrawComparator<'a>>,
        skip_fee: bool,
    ) -> StakePoolClientResult<Self> {
        let delegated_voter = receiver.and_then(|receiver| match receiver.kind {
            StakeAccountKind::Delegated { voter } => Some(voter),
            StakeAccountKind::Undelegated => None,
        });
        match (use_reserve, delegated_voter, vote_account_address) {
            (true, _, _) => Ok(Self::Reserve),
            (false, Some(voter), Some(vote_account_address)) if voter != vote_account_address => {
                Err(StakePoolClientError::ConstraintMismatch {
                    field: "vote account of the receiving stake",
                    expected: Some(voter),
                    provided: vote_account_address,
                })
            }
            (false, Some(voter), _) => Ok(Self::DelegatedReceiver { voter }),
            (false, None, Some(vote_account_address)) => Ok(Self::Validator(vote_account_address)),
            (false, None, None) => Ok(Self::Any {
                comparator,
                skip_fee,
            }),
        }
    }
}

/// Everything the planner reads, fetched beforehand
#[derive(Clone, Copy, Debug)]
pub struct WithdrawContext<'a> {
    /// Stake pool program id
    pub program_id: Pubkey,
    /// Stake pool address
    pub stake_pool_address: Pubkey,
    /// Decoded stake pool
    pub stake_pool: &'a StakePool,
    /// Decoded validator list
    pub validator_list: &'a ValidatorList,
    /// Current lamports of the reserve stake account
    pub reserve_lamports: u64,
    /// Rent-exempt minimum of a stake account
    pub stake_rent_exemption: u64,
    /// Stake account supplied to receive the withdrawal, if any
    pub receiver: Option<ReceiverStake>,
}

/// Where one withdrawal lands
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StakeReceiver {
    /// Create a new stake account funded with `lamports` for rent
    CreateRentExempt {
        /// Lamports to fund the new account with
        lamports: u64,
    },
    /// Split into an existing, undelegated stake account
    Existing(Pubkey),
}

/// One withdrawal and its receiving stake account
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlannedWithdrawal {
    /// Stake account split from
    pub account: WithdrawAccount,
    /// Receiving stake account
    pub receiver: StakeReceiver,
}

/// The full withdrawal plan
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WithdrawPlan {
    /// Withdrawals in the order they should be sent
    pub withdrawals: Vec<PlannedWithdrawal>,
    /// Lamports needed to fund the receiving stake accounts to be created
    pub total_rent_free_balances: u64,
}

impl WithdrawPlan {
    /// Pool tokens burnt across all withdrawals
    pub fn pool_amount(&self) -> u64 {
        self.withdrawals
            .iter()
            .map(|withdrawal| withdrawal.account.pool_amount)
            .sum()
    }
}

/// Plan a withdrawal of `pool_amount` pool tokens from `source`
pub fn plan_withdrawal(
    ctx: &WithdrawContext,
    source: &WithdrawSource,
    pool_amount: u64,
) -> StakePoolClientResult<WithdrawPlan> {
    let mut accounts = match source {
        WithdrawSource::Reserve => vec![WithdrawAccount {
            stake_address: ctx.stake_pool.reserve_stake,
            vote_address: None,
            pool_amount,
        }],
        WithdrawSource::DelegatedReceiver { voter } => {
            vec![withdraw_from_validator(ctx, voter, pool_amount)?]
        }
        WithdrawSource::Validator(vote_account_address) => {
            vec![withdraw_from_validator(ctx, vote_account_address, pool_amount)?]
        }
        WithdrawSource::Any {
            comparator,
            skip_fee,
        } => withdraw_from_any(ctx, *comparator, *skip_fee, pool_amount)?,
    };

    if accounts.len() > MAX_WITHDRAW_ACCOUNTS {
        let dropped: u64 = accounts[MAX_WITHDRAW_ACCOUNTS..]
            .iter()
            .map(|account| account.pool_amount)
            .sum();
        warn!(
            "Withdrawal needs {} stake accounts, only the first {} fit in one transaction, \
             {} pool tokens left unwithdrawn",
            accounts.len(),
            MAX_WITHDRAW_ACCOUNTS,
            dropped
        );
        accounts.truncate(MAX_WITHDRAW_ACCOUNTS);
    }

    // an undelegated receiver can only take a single split, the rest get new accounts
    let mut existing_receiver = ctx.receiver.and_then(|receiver| match receiver.kind {
        StakeAccountKind::Undelegated => Some(receiver.address),
        StakeAccountKind::Delegated { .. } => None,
    });
    let mut total_rent_free_balances = 0u64;
    let withdrawals = accounts
        .into_iter()
        .map(|account| {
            let receiver = match existing_receiver.take() {
                Some(address) => StakeReceiver::Existing(address),
                None => {
                    total_rent_free_balances =
                        total_rent_free_balances.saturating_add(ctx.stake_rent_exemption);
                    StakeReceiver::CreateRentExempt {
                        lamports: ctx.stake_rent_exemption,
                    }
                }
            };
            PlannedWithdrawal { account, receiver }
        })
        .collect();

    Ok(WithdrawPlan {
        withdrawals,
        total_rent_free_balances,
    })
}

fn withdraw_from_validator(
    ctx: &WithdrawContext,
    vote_account_address: &Pubkey,
    pool_amount: u64,
) -> StakePoolClientResult<WithdrawAccount> {
    let validator = ctx
        .validator_list
        .find(vote_account_address)
        .ok_or(StakePoolClientError::ValidatorNotFound(*vote_account_address))?;
    let (stake_address, _) = find_stake_program_address(
        &ctx.program_id,
        vote_account_address,
        &ctx.stake_pool_address,
        None,
    );
    let available = available_pool_tokens(
        ctx.stake_pool,
        validator.active_stake_lamports,
        minimum_stake_lamports(ctx.stake_rent_exemption),
    )?;
    if pool_amount > available {
        return Err(StakePoolClientError::InsufficientWithdrawAvailability {
            stake_address,
            requested: pool_amount,
            available,
        });
    }
    Ok(WithdrawAccount {
        stake_address,
        vote_address: Some(*vote_account_address),
        pool_amount,
    })
}

fn withdraw_from_any(
    ctx: &WithdrawContext,
    comparator: Option<WithdrawComparator>,
    skip_fee: bool,
    pool_amount: u64,
) -> StakePoolClientResult<Vec<WithdrawAccount>> {
    let min_balance = minimum_stake_lamports(ctx.stake_rent_exemption);
    let preferred = ctx
        .stake_pool
        .preferred_withdraw_validator_vote_address;
    let active_validators = || {
        ctx.validator_list
            .validators
            .iter()
            .filter(|validator| validator.status == StakeStatus::Active)
    };

    let mut preferred_class = vec![];
    let mut active_class = vec![];
    let mut transient_class = vec![];
    for validator in active_validators() {
        let candidate = active_candidate(ctx, validator, min_balance)?;
        if Some(validator.vote_account_address) == preferred {
            preferred_class.extend(candidate);
        } else {
            active_class.extend(candidate);
        }
    }
    for validator in active_validators() {
        transient_class.extend(transient_candidate(ctx, validator, min_balance)?);
    }
    let reserve_available = available_pool_tokens(
        ctx.stake_pool,
        ctx.reserve_lamports,
        minimum_reserve_lamports(ctx.stake_rent_exemption),
    )?;
    let reserve_class = if reserve_available > 0 {
        vec![WithdrawAccount {
            stake_address: ctx.stake_pool.reserve_stake,
            vote_address: None,
            pool_amount: reserve_available,
        }]
    } else {
        vec![]
    };

    let mut result = vec![];
    let mut remaining = pool_amount;
    for mut class in [preferred_class, active_class, transient_class, reserve_class] {
        if let Some(comparator) = comparator {
            class.sort_by(|a, b| comparator(a, b));
        }
        for candidate in class {
            if remaining == 0 {
                break;
            }
            let available = if skip_fee {
                candidate.pool_amount
            } else {
                gross_up_for_fee(ctx.stake_pool, candidate.pool_amount)
            };
            let amount = available.min(remaining);
            remaining -= amount;
            result.push(WithdrawAccount {
                pool_amount: amount,
                ..candidate
            });
        }
    }

    if remaining > 0 {
        return Err(StakePoolClientError::NotEnoughStakeToWithdraw {
            requested: pool_amount,
            shortfall: remaining,
        });
    }
    Ok(result)
}

fn active_candidate(
    ctx: &WithdrawContext,
    validator: &ValidatorStakeInfo,
    min_balance: u64,
) -> StakePoolClientResult<Option<WithdrawAccount>> {
    let available =
        available_pool_tokens(ctx.stake_pool, validator.active_stake_lamports, min_balance)?;
    if available == 0 {
        return Ok(None);
    }
    let (stake_address, _) = find_stake_program_address(
        &ctx.program_id,
        &validator.vote_account_address,
        &ctx.stake_pool_address,
        None,
    );
    Ok(Some(WithdrawAccount {
        stake_address,
        vote_address: Some(validator.vote_account_address),
        pool_amount: available,
    }))
}

fn transient_candidate(
    ctx: &WithdrawContext,
    validator: &ValidatorStakeInfo,
    min_balance: u64,
) -> StakePoolClientResult<Option<WithdrawAccount>> {
    let available = available_pool_tokens(
        ctx.stake_pool,
        validator.transient_stake_lamports,
        min_balance,
    )?;
    if available == 0 {
        return Ok(None);
    }
    let (stake_address, _) = find_transient_stake_program_address(
        &ctx.program_id,
        &validator.vote_account_address,
        &ctx.stake_pool_address,
        validator.current_transient_stake_seed(),
    );
    Ok(Some(WithdrawAccount {
        stake_address,
        vote_address: Some(validator.vote_account_address),
        pool_amount: available,
    }))
}

/// Pool tokens that can be withdrawn from an account holding `lamports` that
/// must keep `min_balance`
fn available_pool_tokens(
    stake_pool: &StakePool,
    lamports: u64,
    min_balance: u64,
) -> StakePoolClientResult<u64> {
    stake_pool
        .calc_pool_tokens_for_deposit(lamports.saturating_sub(min_balance))
        .ok_or(StakePoolClientError::CalculationFailure)
}

/// The withdrawal fee is taken out of the burnt tokens, so the account can take
/// a proportionally larger burn
fn gross_up_for_fee(stake_pool: &StakePool, pool_tokens: u64) -> u64 {
    let fee = stake_pool.stake_withdrawal_fee;
    if fee.denominator == 0 || fee.numerator == 0 {
        return pool_tokens;
    }
    match fee.denominator.checked_sub(fee.numerator) {
        Some(net) if net > 0 => {
            let grossed = (pool_tokens as u128)
                .saturating_mul(fee.denominator as u128)
                .checked_div(net as u128)
                .unwrap_or(pool_tokens as u128);
            u64::try_from(grossed).unwrap_or(u64::MAX)
        }
        _ => pool_tokens,
    }
}
