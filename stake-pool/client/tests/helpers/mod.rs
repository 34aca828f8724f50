#![allow(dead_code)]

use {
    async_trait::async_trait,
    solana_program::{
        program_option::COption,
        program_pack::Pack,
        pubkey::Pubkey,
        rent::Rent,
        stake::{
            self,
            stake_flags::StakeFlags,
            state::{Delegation, Meta, Stake, StakeStateV2},
        },
    },
    solana_sdk::{
        account::Account,
        clock::Epoch,
        hash::Hash,
        signature::Signature,
        transaction::Transaction,
    },
    spl_stake_pool_client::{
        client::{ProgramClient, StakePoolClient},
        error::ProgramClientResult,
        find_deposit_authority_program_address, find_withdraw_authority_program_address, id,
        stake::STAKE_ACCOUNT_SPACE,
        state::{AccountType, Fee, StakePool, StakeStatus, ValidatorList, ValidatorStakeInfo},
    },
    spl_token::state::{Account as TokenAccount, AccountState, Mint},
    std::{
        collections::HashMap,
        sync::{Arc, Mutex},
    },
};

pub const CURRENT_EPOCH: Epoch = 10;
pub const MAX_TEST_VALIDATORS: u32 = 32;
pub const POOL_MINT_DECIMALS: u8 = 9;
pub const LAMPORTS_PER_SOL: u64 = 1_000_000_000;

/// In-memory ledger
pub struct MockClient {
    accounts: Mutex<HashMap<Pubkey, Account>>,
    sent: Mutex<Vec<Transaction>>,
    pub epoch: Epoch,
}

impl MockClient {
    pub fn new(epoch: Epoch) -> Self {
        Self {
            accounts: Mutex::new(HashMap::new()),
            sent: Mutex::new(vec![]),
            epoch,
        }
    }

    pub fn set_account(&self, address: Pubkey, account: Account) {
        self.accounts.lock().unwrap().insert(address, account);
    }

    pub fn sent_transactions(&self) -> Vec<Transaction> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl ProgramClient for MockClient {
    async fn get_account(&self, address: Pubkey) -> ProgramClientResult<Option<Account>> {
        Ok(self.accounts.lock().unwrap().get(&address).cloned())
    }

    async fn get_epoch(&self) -> ProgramClientResult<Epoch> {
        Ok(self.epoch)
    }

    async fn get_minimum_balance_for_rent_exemption(
        &self,
        data_len: usize,
    ) -> ProgramClientResult<u64> {
        Ok(Rent::default().minimum_balance(data_len))
    }

    async fn get_latest_blockhash(&self) -> ProgramClientResult<Hash> {
        Ok(Hash::default())
    }

    async fn send_transaction(&self, transaction: &Transaction) -> ProgramClientResult<Signature> {
        self.sent.lock().unwrap().push(transaction.clone());
        Ok(transaction.signatures[0])
    }
}

pub fn stake_rent_exemption() -> u64 {
    Rent::default().minimum_balance(STAKE_ACCOUNT_SPACE)
}

pub fn stake_account(voter: Option<Pubkey>, lamports: u64) -> Account {
    let meta = Meta {
        rent_exempt_reserve: stake_rent_exemption(),
        ..Meta::default()
    };
    let stake_state = match voter {
        Some(voter_pubkey) => StakeStateV2::Stake(
            meta,
            Stake {
                delegation: Delegation {
                    voter_pubkey,
                    stake: lamports.saturating_sub(meta.rent_exempt_reserve),
                    ..Delegation::default()
                },
                credits_observed: 0,
            },
            StakeFlags::empty(),
        ),
        None => StakeStateV2::Initialized(meta),
    };
    let mut data = vec![0; STAKE_ACCOUNT_SPACE];
    bincode::serialize_into(&mut data[..], &stake_state).unwrap();
    Account {
        lamports,
        data,
        owner: stake::program::id(),
        ..Account::default()
    }
}

pub fn token_account(mint: &Pubkey, owner: &Pubkey, amount: u64) -> Account {
    let token_account = TokenAccount {
        mint: *mint,
        owner: *owner,
        amount,
        delegate: COption::None,
        state: AccountState::Initialized,
        is_native: COption::None,
        delegated_amount: 0,
        close_authority: COption::None,
    };
    let mut data = vec![0; TokenAccount::LEN];
    TokenAccount::pack(token_account, &mut data).unwrap();
    Account {
        lamports: Rent::default().minimum_balance(TokenAccount::LEN),
        data,
        owner: spl_token::id(),
        ..Account::default()
    }
}

/// Addresses and decoded records of a stake pool, written into a
/// `MockClient` by `install`
pub struct StakePoolAccounts {
    pub stake_pool_address: Pubkey,
    pub validator_list_address: Pubkey,
    pub withdraw_authority: Pubkey,
    pub stake_pool: StakePool,
    pub validator_list: ValidatorList,
    pub reserve_lamports: u64,
}

impl StakePoolAccounts {
    pub fn new() -> Self {
        let stake_pool_address = Pubkey::new_unique();
        let validator_list_address = Pubkey::new_unique();
        let (withdraw_authority, stake_withdraw_bump_seed) =
            find_withdraw_authority_program_address(&id(), &stake_pool_address);
        let (stake_deposit_authority, _) =
            find_deposit_authority_program_address(&id(), &stake_pool_address);
        let reserve_lamports = 2 * LAMPORTS_PER_SOL;
        let stake_pool = StakePool {
            account_type: AccountType::StakePool,
            manager: Pubkey::new_unique(),
            staker: Pubkey::new_unique(),
            stake_deposit_authority,
            stake_withdraw_bump_seed,
            validator_list: validator_list_address,
            reserve_stake: Pubkey::new_unique(),
            pool_mint: Pubkey::new_unique(),
            manager_fee_account: Pubkey::new_unique(),
            token_program_id: spl_token::id(),
            total_lamports: reserve_lamports,
            pool_token_supply: reserve_lamports,
            last_update_epoch: CURRENT_EPOCH,
            epoch_fee: Fee {
                numerator: 1,
                denominator: 100,
            },
            ..StakePool::default()
        };
        Self {
            stake_pool_address,
            validator_list_address,
            withdraw_authority,
            stake_pool,
            validator_list: ValidatorList::new(MAX_TEST_VALIDATORS),
            reserve_lamports,
        }
    }

    /// Add an active validator; pool totals and supply grow one to one
    pub fn add_validator(
        &mut self,
        active_stake_lamports: u64,
        transient_stake_lamports: u64,
        transient_seed_suffix_start: u64,
    ) -> Pubkey {
        let vote_account_address = Pubkey::new_unique();
        self.validator_list.validators.push(ValidatorStakeInfo {
            active_stake_lamports,
            transient_stake_lamports,
            last_update_epoch: CURRENT_EPOCH,
            transient_seed_suffix_start,
            transient_seed_suffix_end: 0,
            status: StakeStatus::Active,
            vote_account_address,
        });
        let added = active_stake_lamports + transient_stake_lamports;
        self.stake_pool.total_lamports += added;
        self.stake_pool.pool_token_supply += added;
        vote_account_address
    }

    pub fn install(&self, client: &MockClient) {
        client.set_account(
            self.stake_pool_address,
            Account {
                lamports: 1,
                data: self.stake_pool.encode().unwrap(),
                owner: id(),
                ..Account::default()
            },
        );
        client.set_account(
            self.validator_list_address,
            Account {
                lamports: 1,
                data: self.validator_list.encode().unwrap(),
                owner: id(),
                ..Account::default()
            },
        );
        client.set_account(
            self.stake_pool.reserve_stake,
            stake_account(None, self.reserve_lamports),
        );

        let mint = Mint {
            mint_authority: COption::Some(self.withdraw_authority),
            supply: self.stake_pool.pool_token_supply,
            decimals: POOL_MINT_DECIMALS,
            is_initialized: true,
            freeze_authority: COption::None,
        };
        let mut data = vec![0; Mint::LEN];
        Mint::pack(mint, &mut data).unwrap();
        client.set_account(
            self.stake_pool.pool_mint,
            Account {
                lamports: Rent::default().minimum_balance(Mint::LEN),
                data,
                owner: spl_token::id(),
                ..Account::default()
            },
        );
    }

    /// Create a pool token account holding `amount` for `owner`
    pub fn install_token_account(&self, client: &MockClient, owner: &Pubkey, amount: u64) -> Pubkey {
        let address = Pubkey::new_unique();
        client.set_account(address, token_account(&self.stake_pool.pool_mint, owner, amount));
        address
    }
}

pub fn setup(stake_pool_accounts: &StakePoolAccounts) -> (Arc<MockClient>, StakePoolClient<MockClient>) {
    let client = Arc::new(MockClient::new(CURRENT_EPOCH));
    stake_pool_accounts.install(&client);
    let stake_pool_client = StakePoolClient::new(client.clone(), id());
    (client, stake_pool_client)
}
