//! Ledger access and the operation workflows built on top of it

use {
    crate::{
        amount::{amount_to_ui_amount, lamports_to_sol},
        error::{ProgramClientResult, StakePoolClientError, StakePoolClientResult},
        find_deposit_authority_program_address, find_ephemeral_stake_program_address,
        find_stake_program_address, find_transient_stake_program_address,
        find_withdraw_authority_program_address, instruction,
        stake::{stake_account_kind, StakeAccountKind, STAKE_ACCOUNT_SPACE},
        state::{Fee, StakePool, ValidatorList, ValidatorStakeInfo},
        withdraw::{
            plan_withdrawal, ReceiverStake, StakeReceiver, WithdrawComparator, WithdrawContext,
            WithdrawPlan, WithdrawSource,
        },
    },
    async_trait::async_trait,
    log::{debug, info, warn},
    solana_program::{
        instruction::Instruction, program_pack::Pack, pubkey::Pubkey, stake, system_instruction,
    },
    solana_rpc_client::nonblocking::rpc_client::RpcClient,
    solana_sdk::{
        account::Account,
        clock::Epoch,
        hash::Hash,
        signature::{Keypair, Signature},
        signer::{signers::Signers, Signer},
        transaction::Transaction,
    },
    spl_token::state::{Account as TokenAccount, Mint},
    std::{fmt, num::NonZeroU32, sync::Arc},
};

/// Basic trait for reading and writing the ledger
#[async_trait]
pub trait ProgramClient: Send + Sync {
    /// Fetch an account, `None` if it does not exist
    async fn get_account(&self, address: Pubkey) -> ProgramClientResult<Option<Account>>;

    /// Current epoch of the cluster
    async fn get_epoch(&self) -> ProgramClientResult<Epoch>;

    /// Rent-exempt minimum for an account of `data_len` bytes
    async fn get_minimum_balance_for_rent_exemption(
        &self,
        data_len: usize,
    ) -> ProgramClientResult<u64>;

    /// Blockhash to sign transactions with
    async fn get_latest_blockhash(&self) -> ProgramClientResult<Hash>;

    /// Submit a signed transaction
    async fn send_transaction(&self, transaction: &Transaction) -> ProgramClientResult<Signature>;
}

/// `ProgramClient` over the nonblocking RPC client. Commitment comes from the
/// wrapped client's configuration.
pub struct ProgramRpcClient {
    client: Arc<RpcClient>,
}

impl fmt::Debug for ProgramRpcClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgramRpcClient")
            .field("url", &self.client.url())
            .finish()
    }
}

impl ProgramRpcClient {
    /// Wrap an RPC client
    pub fn new(client: Arc<RpcClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ProgramClient for ProgramRpcClient {
    async fn get_account(&self, address: Pubkey) -> ProgramClientResult<Option<Account>> {
        Ok(self
            .client
            .get_account_with_commitment(&address, self.client.commitment())
            .await?
            .value)
    }

    async fn get_epoch(&self) -> ProgramClientResult<Epoch> {
        Ok(self.client.get_epoch_info().await?.epoch)
    }

    async fn get_minimum_balance_for_rent_exemption(
        &self,
        data_len: usize,
    ) -> ProgramClientResult<u64> {
        self.client
            .get_minimum_balance_for_rent_exemption(data_len)
            .await
            .map_err(Into::into)
    }

    async fn get_latest_blockhash(&self) -> ProgramClientResult<Hash> {
        self.client.get_latest_blockhash().await.map_err(Into::into)
    }

    async fn send_transaction(&self, transaction: &Transaction) -> ProgramClientResult<Signature> {
        self.client
            .send_and_confirm_transaction(transaction)
            .await
            .map_err(Into::into)
    }
}

/// Instructions for one operation, and the keypairs generated for it that
/// must sign alongside the caller's own signers
#[derive(Debug, Default)]
pub struct InstructionBundle {
    /// Instructions, in order
    pub instructions: Vec<Instruction>,
    /// Freshly generated keypairs the instructions require
    pub signers: Vec<Keypair>,
}

impl InstructionBundle {
    fn new(instructions: Vec<Instruction>) -> Self {
        Self {
            instructions,
            signers: vec![],
        }
    }

    /// Nothing to send
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }
}

/// A stake withdrawal ready to send, with the plan it was built from
#[derive(Debug)]
pub struct WithdrawStakeBundle {
    /// Approve, create, withdraw and merge instructions
    pub bundle: InstructionBundle,
    /// Withdrawal plan
    pub plan: WithdrawPlan,
}

/// Hints steering where a stake withdrawal is taken from
#[derive(Clone, Copy, Default)]
pub struct WithdrawStakeOptions<'a> {
    /// Take everything from the reserve
    pub use_reserve: bool,
    /// Take everything from this validator
    pub vote_account_address: Option<Pubkey>,
    /// Existing stake account to receive the withdrawal
    pub stake_receiver: Option<Pubkey>,
    /// Ordering of candidates within each priority class
    pub comparator: Option<WithdrawComparator<'a>>,
    /// Do not account for the withdrawal fee when sizing each withdrawal
    pub skip_fee: bool,
}

/// Instructions bringing a stake pool up to date with the current epoch
#[derive(Debug, Default)]
pub struct StakePoolUpdate {
    /// `UpdateValidatorListBalance` instructions, one per chunk of validators
    pub update_list_instructions: Vec<Instruction>,
    /// Pool balance update and cleanup, sent once all chunks have landed
    pub final_instructions: Vec<Instruction>,
}

impl StakePoolUpdate {
    /// Already up to date
    pub fn is_empty(&self) -> bool {
        self.update_list_instructions.is_empty() && self.final_instructions.is_empty()
    }
}

/// Human readable overview of a stake pool
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StakePoolInfo {
    /// Stake pool address
    pub address: Pubkey,
    /// Current epoch
    pub epoch: Epoch,
    /// The pool has not been updated this epoch
    pub update_required: bool,
    /// Total lamports under management, in SOL
    pub total_sol: String,
    /// Lamports in the reserve, in SOL
    pub reserve_sol: String,
    /// Pool token supply, in ui units of the pool mint
    pub pool_token_supply: String,
    /// Number of validators in the list
    pub validator_count: usize,
    /// Fee on epoch rewards
    pub epoch_fee: Fee,
    /// Fee on epoch rewards taking effect at a future epoch
    pub next_epoch_fee: Option<Fee>,
    /// Fee on stake deposits
    pub stake_deposit_fee: Fee,
    /// Fee on stake withdrawals
    pub stake_withdrawal_fee: Fee,
    /// Fee on SOL deposits
    pub sol_deposit_fee: Fee,
    /// Fee on SOL withdrawals
    pub sol_withdrawal_fee: Fee,
}

/// Reads stake pool accounts and builds instructions for a single stake pool
/// program
pub struct StakePoolClient<C> {
    client: Arc<C>,
    program_id: Pubkey,
}

impl<C> fmt::Debug for StakePoolClient<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StakePoolClient")
            .field("program_id", &self.program_id)
            .finish()
    }
}

impl<C: ProgramClient> StakePoolClient<C> {
    /// Create a client for the stake pool program at `program_id`
    pub fn new(client: Arc<C>, program_id: Pubkey) -> Self {
        Self { client, program_id }
    }

    /// Stake pool program id
    pub fn program_id(&self) -> &Pubkey {
        &self.program_id
    }

    async fn get_account(&self, address: &Pubkey) -> StakePoolClientResult<Account> {
        self.client
            .get_account(*address)
            .await
            .map_err(StakePoolClientError::Client)?
            .ok_or(StakePoolClientError::AccountNotFound(*address))
    }

    async fn get_program_account(&self, address: &Pubkey) -> StakePoolClientResult<Account> {
        let account = self.get_account(address).await?;
        if account.owner != self.program_id {
            return Err(StakePoolClientError::InvalidAccountOwner(*address));
        }
        Ok(account)
    }

    /// Fetch and decode a stake pool
    pub async fn get_stake_pool(&self, stake_pool_address: &Pubkey) -> StakePoolClientResult<StakePool> {
        let account = self.get_program_account(stake_pool_address).await?;
        Ok(StakePool::decode(&account.data)?)
    }

    /// Fetch and decode a validator list
    pub async fn get_validator_list(
        &self,
        validator_list_address: &Pubkey,
    ) -> StakePoolClientResult<ValidatorList> {
        let account = self.get_program_account(validator_list_address).await?;
        Ok(ValidatorList::decode(&account.data)?)
    }

    /// Fetch a stake pool and the validator list it points to
    pub async fn get_stake_pool_with_list(
        &self,
        stake_pool_address: &Pubkey,
    ) -> StakePoolClientResult<(StakePool, ValidatorList)> {
        let stake_pool = self.get_stake_pool(stake_pool_address).await?;
        let validator_list = self.get_validator_list(&stake_pool.validator_list).await?;
        Ok((stake_pool, validator_list))
    }

    /// Lamports held by an account
    pub async fn get_account_lamports(&self, address: &Pubkey) -> StakePoolClientResult<u64> {
        Ok(self.get_account(address).await?.lamports)
    }

    /// Rent-exempt minimum of a stake account
    pub async fn get_stake_account_rent_exemption(&self) -> StakePoolClientResult<u64> {
        self.client
            .get_minimum_balance_for_rent_exemption(STAKE_ACCOUNT_SPACE)
            .await
            .map_err(StakePoolClientError::Client)
    }

    async fn get_epoch(&self) -> StakePoolClientResult<Epoch> {
        self.client
            .get_epoch()
            .await
            .map_err(StakePoolClientError::Client)
    }

    /// Fetch a pool token account, checking it holds the pool's mint
    pub async fn get_pool_token_account(
        &self,
        stake_pool: &StakePool,
        token_account_address: &Pubkey,
    ) -> StakePoolClientResult<TokenAccount> {
        let account = self.get_account(token_account_address).await?;
        if account.owner != stake_pool.token_program_id {
            return Err(StakePoolClientError::InvalidAccountOwner(
                *token_account_address,
            ));
        }
        // Token-2022 extensions follow the base layout
        let base = account
            .data
            .get(..TokenAccount::LEN)
            .ok_or(StakePoolClientError::InvalidPoolMint(*token_account_address))?;
        let token_account = TokenAccount::unpack(base)?;
        if token_account.mint != stake_pool.pool_mint {
            return Err(StakePoolClientError::InvalidPoolMint(
                *token_account_address,
            ));
        }
        Ok(token_account)
    }

    async fn get_receiver_stake(&self, address: &Pubkey) -> StakePoolClientResult<ReceiverStake> {
        let account = self.get_account(address).await?;
        if account.owner != stake::program::id() {
            return Err(StakePoolClientError::InvalidAccountOwner(*address));
        }
        Ok(ReceiverStake {
            address: *address,
            kind: stake_account_kind(&account.data)?,
        })
    }

    fn find_validator<'a>(
        validator_list: &'a ValidatorList,
        vote_account_address: &Pubkey,
    ) -> StakePoolClientResult<&'a ValidatorStakeInfo> {
        validator_list
            .find(vote_account_address)
            .ok_or(StakePoolClientError::ValidatorNotFound(*vote_account_address))
    }

    /// Sign `instructions` with the payer, the bundle's generated keypairs
    /// and `signing_keypairs`, then send them in one transaction
    pub async fn send_bundle<S: Signers + ?Sized>(
        &self,
        bundle: &InstructionBundle,
        payer: &dyn Signer,
        signing_keypairs: &S,
    ) -> StakePoolClientResult<Signature> {
        let latest_blockhash = self
            .client
            .get_latest_blockhash()
            .await
            .map_err(StakePoolClientError::Client)?;

        let mut tx = Transaction::new_with_payer(&bundle.instructions, Some(&payer.pubkey()));
        tx.try_partial_sign(&[payer], latest_blockhash)
            .map_err(|error| StakePoolClientError::Client(error.into()))?;
        let generated: Vec<&Keypair> = bundle.signers.iter().collect();
        tx.try_partial_sign(&generated, latest_blockhash)
            .map_err(|error| StakePoolClientError::Client(error.into()))?;
        tx.try_sign(signing_keypairs, latest_blockhash)
            .map_err(|error| StakePoolClientError::Client(error.into()))?;

        self.client
            .send_transaction(&tx)
            .await
            .map_err(StakePoolClientError::Client)
    }

    /// Deposit SOL from `lamports_from` into the pool, minting pool tokens to
    /// `pool_token_receiver`. The referrer defaults to the receiver.
    #[allow(clippy::too_many_arguments)]
    pub async fn deposit_sol(
        &self,
        stake_pool_address: &Pubkey,
        lamports_from: &Pubkey,
        pool_token_receiver: &Pubkey,
        referrer_token_account: Option<&Pubkey>,
        sol_deposit_authority: Option<&Pubkey>,
        lamports: u64,
        minimum_pool_tokens_out: Option<u64>,
    ) -> StakePoolClientResult<InstructionBundle> {
        let stake_pool = self.get_stake_pool(stake_pool_address).await?;
        check_funding_authority(
            "SOL deposit authority",
            stake_pool.sol_deposit_authority,
            sol_deposit_authority,
        )?;
        self.get_pool_token_account(&stake_pool, pool_token_receiver)
            .await?;

        let (withdraw_authority, _) =
            find_withdraw_authority_program_address(&self.program_id, stake_pool_address);
        let deposit = instruction::deposit_sol(
            &self.program_id,
            stake_pool_address,
            &withdraw_authority,
            &stake_pool.reserve_stake,
            lamports_from,
            pool_token_receiver,
            &stake_pool.manager_fee_account,
            referrer_token_account.unwrap_or(pool_token_receiver),
            &stake_pool.pool_mint,
            &stake_pool.token_program_id,
            sol_deposit_authority,
            lamports,
            minimum_pool_tokens_out,
        );
        info!(
            "Depositing {} SOL into stake pool {}",
            lamports_to_sol(lamports.into()),
            stake_pool_address
        );
        Ok(InstructionBundle::new(vec![deposit]))
    }

    /// Burn `pool_amount` pool tokens for SOL from the reserve, paid to
    /// `lamports_to`
    #[allow(clippy::too_many_arguments)]
    pub async fn withdraw_sol(
        &self,
        stake_pool_address: &Pubkey,
        pool_token_account: &Pubkey,
        token_owner: &Pubkey,
        lamports_to: &Pubkey,
        sol_withdraw_authority: Option<&Pubkey>,
        pool_amount: u64,
        minimum_lamports_out: Option<u64>,
    ) -> StakePoolClientResult<InstructionBundle> {
        let stake_pool = self.get_stake_pool(stake_pool_address).await?;
        check_funding_authority(
            "SOL withdraw authority",
            stake_pool.sol_withdraw_authority,
            sol_withdraw_authority,
        )?;
        let token_account = self
            .get_pool_token_account(&stake_pool, pool_token_account)
            .await?;
        check_token_balance(&token_account, pool_amount)?;

        let user_transfer_authority = Keypair::new();
        let approve = approve_pool_tokens(
            &stake_pool,
            pool_token_account,
            &user_transfer_authority.pubkey(),
            token_owner,
            pool_amount,
        )?;
        let (withdraw_authority, _) =
            find_withdraw_authority_program_address(&self.program_id, stake_pool_address);
        let withdraw = instruction::withdraw_sol(
            &self.program_id,
            stake_pool_address,
            &withdraw_authority,
            &user_transfer_authority.pubkey(),
            pool_token_account,
            &stake_pool.reserve_stake,
            lamports_to,
            &stake_pool.manager_fee_account,
            &stake_pool.pool_mint,
            &stake_pool.token_program_id,
            sol_withdraw_authority,
            pool_amount,
            minimum_lamports_out,
        );
        Ok(InstructionBundle {
            instructions: vec![approve, withdraw],
            signers: vec![user_transfer_authority],
        })
    }

    /// Deposit an active stake account delegated to one of the pool's
    /// validators. `stake_withdraw_authority` must sign, along with the pool's
    /// custom deposit authority if it has one.
    pub async fn deposit_stake(
        &self,
        stake_pool_address: &Pubkey,
        stake_address: &Pubkey,
        stake_withdraw_authority: &Pubkey,
        pool_token_receiver: &Pubkey,
        referrer_token_account: Option<&Pubkey>,
        minimum_pool_tokens_out: Option<u64>,
    ) -> StakePoolClientResult<InstructionBundle> {
        let (stake_pool, validator_list) =
            self.get_stake_pool_with_list(stake_pool_address).await?;
        let stake = self.get_receiver_stake(stake_address).await?;
        let vote_account_address = match stake.kind {
            StakeAccountKind::Delegated { voter } => voter,
            StakeAccountKind::Undelegated => {
                return Err(StakePoolClientError::StakeNotDelegated(*stake_address))
            }
        };
        Self::find_validator(&validator_list, &vote_account_address)?;
        self.get_pool_token_account(&stake_pool, pool_token_receiver)
            .await?;

        let (validator_stake_address, _) = find_stake_program_address(
            &self.program_id,
            &vote_account_address,
            stake_pool_address,
            None,
        );
        let (withdraw_authority, _) =
            find_withdraw_authority_program_address(&self.program_id, stake_pool_address);
        let (default_deposit_authority, _) =
            find_deposit_authority_program_address(&self.program_id, stake_pool_address);
        let deposit_authority = (stake_pool.stake_deposit_authority != default_deposit_authority)
            .then_some(&stake_pool.stake_deposit_authority);

        info!(
            "Depositing stake {} into stake pool validator stake {}",
            stake_address, validator_stake_address
        );
        Ok(InstructionBundle::new(instruction::deposit_stake(
            &self.program_id,
            stake_pool_address,
            &stake_pool.validator_list,
            deposit_authority,
            &withdraw_authority,
            stake_address,
            stake_withdraw_authority,
            &validator_stake_address,
            &stake_pool.reserve_stake,
            pool_token_receiver,
            &stake_pool.manager_fee_account,
            referrer_token_account.unwrap_or(pool_token_receiver),
            &stake_pool.pool_mint,
            &stake_pool.token_program_id,
            minimum_pool_tokens_out,
        )))
    }

    /// Burn `pool_amount` pool tokens for stake. New stake accounts are
    /// funded by `fee_payer` and given to `token_owner`.
    pub async fn withdraw_stake(
        &self,
        stake_pool_address: &Pubkey,
        pool_token_account: &Pubkey,
        token_owner: &Pubkey,
        fee_payer: &Pubkey,
        pool_amount: u64,
        options: WithdrawStakeOptions<'_>,
    ) -> StakePoolClientResult<WithdrawStakeBundle> {
        let (stake_pool, validator_list) =
            self.get_stake_pool_with_list(stake_pool_address).await?;
        let token_account = self
            .get_pool_token_account(&stake_pool, pool_token_account)
            .await?;
        check_token_balance(&token_account, pool_amount)?;

        let receiver = match options.stake_receiver {
            Some(address) => Some(self.get_receiver_stake(&address).await?),
            None => None,
        };
        let source = WithdrawSource::from_hints(
            options.use_reserve,
            receiver.as_ref(),
            options.vote_account_address,
            options.comparator,
            options.skip_fee,
        )?;
        let ctx = WithdrawContext {
            program_id: self.program_id,
            stake_pool_address: *stake_pool_address,
            stake_pool: &stake_pool,
            validator_list: &validator_list,
            reserve_lamports: self.get_account_lamports(&stake_pool.reserve_stake).await?,
            stake_rent_exemption: self.get_stake_account_rent_exemption().await?,
            receiver,
        };
        let plan = plan_withdrawal(&ctx, &source, pool_amount)?;

        let user_transfer_authority = Keypair::new();
        let mut instructions = vec![approve_pool_tokens(
            &stake_pool,
            pool_token_account,
            &user_transfer_authority.pubkey(),
            token_owner,
            plan.pool_amount(),
        )?];
        let mut signers = vec![];
        let mut new_stake_accounts = vec![];
        let (withdraw_authority, _) =
            find_withdraw_authority_program_address(&self.program_id, stake_pool_address);

        for withdrawal in &plan.withdrawals {
            let sol_amount = stake_pool
                .calc_lamports_withdraw_amount(withdrawal.account.pool_amount)
                .ok_or(StakePoolClientError::CalculationFailure)?;
            info!(
                "Withdrawing from account {}, amount {} SOL, {} pool tokens",
                withdrawal.account.stake_address,
                lamports_to_sol(sol_amount.into()),
                withdrawal.account.pool_amount,
            );

            let stake_receiver = match withdrawal.receiver {
                StakeReceiver::Existing(address) => address,
                StakeReceiver::CreateRentExempt { lamports } => {
                    let stake_keypair = Keypair::new();
                    let address = stake_keypair.pubkey();
                    debug!("Creating account to receive stake {}", address);
                    instructions.push(system_instruction::create_account(
                        fee_payer,
                        &address,
                        lamports,
                        STAKE_ACCOUNT_SPACE as u64,
                        &stake::program::id(),
                    ));
                    signers.push(stake_keypair);
                    new_stake_accounts.push(address);
                    address
                }
            };

            instructions.push(instruction::withdraw_stake(
                &self.program_id,
                stake_pool_address,
                &stake_pool.validator_list,
                &withdraw_authority,
                &withdrawal.account.stake_address,
                &stake_receiver,
                token_owner,
                &user_transfer_authority.pubkey(),
                pool_token_account,
                &stake_pool.manager_fee_account,
                &stake_pool.pool_mint,
                &stake_pool.token_program_id,
                withdrawal.account.pool_amount,
                None,
            ));
        }

        if let Some(ReceiverStake {
            address,
            kind: StakeAccountKind::Delegated { .. },
        }) = receiver
        {
            for new_stake in &new_stake_accounts {
                instructions.extend(stake::instruction::merge(&address, new_stake, token_owner));
            }
        }

        signers.insert(0, user_transfer_authority);
        Ok(WithdrawStakeBundle {
            bundle: InstructionBundle {
                instructions,
                signers,
            },
            plan,
        })
    }

    /// Add a validator to the pool, funded from the reserve
    pub async fn add_validator_to_pool(
        &self,
        stake_pool_address: &Pubkey,
        vote_account_address: &Pubkey,
        seed: Option<NonZeroU32>,
    ) -> StakePoolClientResult<InstructionBundle> {
        let (stake_pool, validator_list) =
            self.get_stake_pool_with_list(stake_pool_address).await?;
        if validator_list.contains(vote_account_address) {
            warn!(
                "Stake pool already contains validator {}, ignoring",
                vote_account_address
            );
            return Ok(InstructionBundle::default());
        }
        Ok(InstructionBundle::new(vec![
            instruction::add_validator_to_pool_with_vote(
                &self.program_id,
                &stake_pool,
                stake_pool_address,
                vote_account_address,
                seed,
            ),
        ]))
    }

    /// Remove a validator from the pool
    pub async fn remove_validator_from_pool(
        &self,
        stake_pool_address: &Pubkey,
        vote_account_address: &Pubkey,
    ) -> StakePoolClientResult<InstructionBundle> {
        let (stake_pool, validator_list) =
            self.get_stake_pool_with_list(stake_pool_address).await?;
        let validator_stake_info = Self::find_validator(&validator_list, vote_account_address)?;
        Ok(InstructionBundle::new(vec![
            instruction::remove_validator_from_pool_with_vote(
                &self.program_id,
                &stake_pool,
                stake_pool_address,
                validator_stake_info,
            ),
        ]))
    }

    /// Move `lamports` from the reserve to a validator. With an ephemeral
    /// seed, the stake is added to the validator's transient stake already in
    /// flight; otherwise a fresh transient account is used.
    pub async fn increase_validator_stake(
        &self,
        stake_pool_address: &Pubkey,
        vote_account_address: &Pubkey,
        lamports: u64,
        ephemeral_stake_seed: Option<u64>,
    ) -> StakePoolClientResult<InstructionBundle> {
        let (stake_pool, validator_list) =
            self.get_stake_pool_with_list(stake_pool_address).await?;
        let validator_stake_info = Self::find_validator(&validator_list, vote_account_address)?;
        info!(
            "Increasing stake on {} by {} SOL",
            vote_account_address,
            lamports_to_sol(lamports.into())
        );
        let instruction = match ephemeral_stake_seed {
            Some(ephemeral_stake_seed) => {
                instruction::increase_additional_validator_stake_with_vote(
                    &self.program_id,
                    &stake_pool,
                    stake_pool_address,
                    validator_stake_info,
                    lamports,
                    ephemeral_stake_seed,
                )
            }
            None => instruction::increase_validator_stake_with_vote(
                &self.program_id,
                &stake_pool,
                stake_pool_address,
                validator_stake_info,
                lamports,
            ),
        };
        Ok(InstructionBundle::new(vec![instruction]))
    }

    /// Move `lamports` from a validator back to the reserve, with the same
    /// transient seed choice as [`Self::increase_validator_stake`]
    pub async fn decrease_validator_stake(
        &self,
        stake_pool_address: &Pubkey,
        vote_account_address: &Pubkey,
        lamports: u64,
        ephemeral_stake_seed: Option<u64>,
    ) -> StakePoolClientResult<InstructionBundle> {
        let (stake_pool, validator_list) =
            self.get_stake_pool_with_list(stake_pool_address).await?;
        let validator_stake_info = Self::find_validator(&validator_list, vote_account_address)?;
        info!(
            "Decreasing stake on {} by {} SOL",
            vote_account_address,
            lamports_to_sol(lamports.into())
        );
        let instruction = match ephemeral_stake_seed {
            Some(ephemeral_stake_seed) => {
                instruction::decrease_additional_validator_stake_with_vote(
                    &self.program_id,
                    &stake_pool,
                    stake_pool_address,
                    validator_stake_info,
                    lamports,
                    ephemeral_stake_seed,
                )
            }
            None => instruction::decrease_validator_stake_with_vote(
                &self.program_id,
                &stake_pool,
                stake_pool_address,
                validator_stake_info,
                lamports,
            ),
        };
        Ok(InstructionBundle::new(vec![instruction]))
    }

    /// Move `lamports` of active stake from one pool validator to another
    pub async fn redelegate(
        &self,
        stake_pool_address: &Pubkey,
        source_vote_account: &Pubkey,
        destination_vote_account: &Pubkey,
        lamports: u64,
        ephemeral_stake_seed: u64,
    ) -> StakePoolClientResult<InstructionBundle> {
        let (stake_pool, validator_list) =
            self.get_stake_pool_with_list(stake_pool_address).await?;
        let source = Self::find_validator(&validator_list, source_vote_account)?;
        let destination = Self::find_validator(&validator_list, destination_vote_account)?;

        let (withdraw_authority, _) =
            find_withdraw_authority_program_address(&self.program_id, stake_pool_address);
        let (source_validator_stake, _) = find_stake_program_address(
            &self.program_id,
            source_vote_account,
            stake_pool_address,
            None,
        );
        let (source_transient_stake, _) = find_transient_stake_program_address(
            &self.program_id,
            source_vote_account,
            stake_pool_address,
            source.next_transient_stake_seed(),
        );
        let (ephemeral_stake, _) = find_ephemeral_stake_program_address(
            &self.program_id,
            stake_pool_address,
            ephemeral_stake_seed,
        );
        // in-flight transient stake on the destination must be reused
        let destination_transient_stake_seed = if destination.transient_stake_lamports > 0 {
            destination.current_transient_stake_seed()
        } else {
            destination.next_transient_stake_seed()
        };
        let (destination_transient_stake, _) = find_transient_stake_program_address(
            &self.program_id,
            destination_vote_account,
            stake_pool_address,
            destination_transient_stake_seed,
        );
        let (destination_validator_stake, _) = find_stake_program_address(
            &self.program_id,
            destination_vote_account,
            stake_pool_address,
            None,
        );

        info!(
            "Redelegating {} SOL from {} to {}",
            lamports_to_sol(lamports.into()),
            source_vote_account,
            destination_vote_account
        );
        Ok(InstructionBundle::new(vec![instruction::redelegate(
            &self.program_id,
            stake_pool_address,
            &stake_pool.staker,
            &withdraw_authority,
            &stake_pool.validator_list,
            &stake_pool.reserve_stake,
            &source_validator_stake,
            &source_transient_stake,
            &ephemeral_stake,
            &destination_transient_stake,
            &destination_validator_stake,
            destination_vote_account,
            lamports,
            source.next_transient_stake_seed(),
            ephemeral_stake_seed,
            destination_transient_stake_seed,
        )]))
    }

    /// Bring the pool up to date with the current epoch. Nothing is returned
    /// when the pool was already updated this epoch, unless `force` is set.
    pub async fn update_stake_pool(
        &self,
        stake_pool_address: &Pubkey,
        force: bool,
        no_merge: bool,
    ) -> StakePoolClientResult<StakePoolUpdate> {
        let (stake_pool, validator_list) =
            self.get_stake_pool_with_list(stake_pool_address).await?;
        let epoch = self.get_epoch().await?;
        if !force && !stake_pool.is_update_required(epoch) {
            debug!("Stake pool {} already updated for epoch {}", stake_pool_address, epoch);
            return Ok(StakePoolUpdate::default());
        }
        let (update_list_instructions, final_instructions) = instruction::update_stake_pool(
            &self.program_id,
            &stake_pool,
            &validator_list,
            stake_pool_address,
            no_merge,
        );
        Ok(StakePoolUpdate {
            update_list_instructions,
            final_instructions,
        })
    }

    /// Create metadata for the pool mint, signed by the pool manager
    pub async fn create_token_metadata(
        &self,
        stake_pool_address: &Pubkey,
        payer: &Pubkey,
        name: String,
        symbol: String,
        uri: String,
    ) -> StakePoolClientResult<InstructionBundle> {
        let stake_pool = self.get_stake_pool(stake_pool_address).await?;
        Ok(InstructionBundle::new(vec![instruction::create_token_metadata(
            &self.program_id,
            stake_pool_address,
            &stake_pool.manager,
            &stake_pool.pool_mint,
            payer,
            name,
            symbol,
            uri,
        )?]))
    }

    /// Update metadata of the pool mint, signed by the pool manager
    pub async fn update_token_metadata(
        &self,
        stake_pool_address: &Pubkey,
        name: String,
        symbol: String,
        uri: String,
    ) -> StakePoolClientResult<InstructionBundle> {
        let stake_pool = self.get_stake_pool(stake_pool_address).await?;
        Ok(InstructionBundle::new(vec![instruction::update_token_metadata(
            &self.program_id,
            stake_pool_address,
            &stake_pool.manager,
            &stake_pool.pool_mint,
            name,
            symbol,
            uri,
        )?]))
    }

    /// Summarize a stake pool
    pub async fn stake_pool_info(
        &self,
        stake_pool_address: &Pubkey,
    ) -> StakePoolClientResult<StakePoolInfo> {
        let (stake_pool, validator_list) =
            self.get_stake_pool_with_list(stake_pool_address).await?;
        let epoch = self.get_epoch().await?;
        let reserve_lamports = self.get_account_lamports(&stake_pool.reserve_stake).await?;
        let mint_account = self.get_account(&stake_pool.pool_mint).await?;
        if mint_account.owner != stake_pool.token_program_id {
            return Err(StakePoolClientError::InvalidAccountOwner(
                stake_pool.pool_mint,
            ));
        }
        let mint = mint_account
            .data
            .get(..Mint::LEN)
            .ok_or(StakePoolClientError::InvalidPoolMint(stake_pool.pool_mint))
            .and_then(|base| Ok(Mint::unpack(base)?))?;

        Ok(StakePoolInfo {
            address: *stake_pool_address,
            epoch,
            update_required: stake_pool.is_update_required(epoch),
            total_sol: lamports_to_sol(stake_pool.total_lamports.into()),
            reserve_sol: lamports_to_sol(reserve_lamports.into()),
            pool_token_supply: amount_to_ui_amount(
                stake_pool.pool_token_supply.into(),
                mint.decimals,
            ),
            validator_count: validator_list.validators.len(),
            epoch_fee: stake_pool.epoch_fee,
            next_epoch_fee: stake_pool.next_epoch_fee.into(),
            stake_deposit_fee: stake_pool.stake_deposit_fee,
            stake_withdrawal_fee: stake_pool.stake_withdrawal_fee,
            sol_deposit_fee: stake_pool.sol_deposit_fee,
            sol_withdrawal_fee: stake_pool.sol_withdrawal_fee,
        })
    }
}

fn check_funding_authority(
    field: &'static str,
    expected: Option<Pubkey>,
    provided: Option<&Pubkey>,
) -> StakePoolClientResult<()> {
    match provided {
        Some(provided) if expected != Some(*provided) => {
            Err(StakePoolClientError::ConstraintMismatch {
                field,
                expected,
                provided: *provided,
            })
        }
        _ => Ok(()),
    }
}

fn check_token_balance(token_account: &TokenAccount, pool_amount: u64) -> StakePoolClientResult<()> {
    if token_account.amount < pool_amount {
        return Err(StakePoolClientError::InsufficientTokenBalance {
            requested: pool_amount,
            available: token_account.amount,
        });
    }
    Ok(())
}

fn approve_pool_tokens(
    stake_pool: &StakePool,
    pool_token_account: &Pubkey,
    delegate: &Pubkey,
    owner: &Pubkey,
    amount: u64,
) -> StakePoolClientResult<Instruction> {
    // Token-2022 shares the Approve encoding and account order
    let mut approve = spl_token::instruction::approve(
        &spl_token::id(),
        pool_token_account,
        delegate,
        owner,
        &[],
        amount,
    )?;
    approve.program_id = stake_pool.token_program_id;
    Ok(approve)
}

#[cfg(test)]
mod tests {
    use {super::*, crate::error::ErrorKind};

    #[test]
    fn funding_authority_checks() {
        let authority = Pubkey::new_unique();
        let other = Pubkey::new_unique();
        check_funding_authority("SOL withdraw authority", None, None).unwrap();
        check_funding_authority("SOL withdraw authority", Some(authority), None).unwrap();
        check_funding_authority("SOL withdraw authority", Some(authority), Some(&authority))
            .unwrap();

        let err = check_funding_authority("SOL withdraw authority", None, Some(&other))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConstraintMismatch);
        let err = check_funding_authority("SOL withdraw authority", Some(authority), Some(&other))
            .unwrap_err();
        match err {
            StakePoolClientError::ConstraintMismatch {
                expected, provided, ..
            } => {
                assert_eq!(expected, Some(authority));
                assert_eq!(provided, other);
            }
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn approve_targets_pool_token_program() {
        let stake_pool = StakePool {
            token_program_id: Pubkey::new_unique(),
            ..StakePool::default()
        };
        let approve = approve_pool_tokens(
            &stake_pool,
            &Pubkey::new_unique(),
            &Pubkey::new_unique(),
            &Pubkey::new_unique(),
            42,
        )
        .unwrap();
        assert_eq!(approve.program_id, stake_pool.token_program_id);
        assert_eq!(approve.accounts.len(), 3);
        assert!(approve.accounts[2].is_signer);
    }

    #[test]
    fn token_balance() {
        let token_account = TokenAccount {
            amount: 10,
            ..TokenAccount::default()
        };
        check_token_balance(&token_account, 10).unwrap();
        assert!(matches!(
            check_token_balance(&token_account, 11),
            Err(StakePoolClientError::InsufficientTokenBalance {
                requested: 11,
                available: 10
            })
        ));
    }
}
