mod helpers;

use {
    helpers::*,
    solana_program::{pubkey::Pubkey, rent::Rent},
    solana_sdk::account::Account,
    spl_stake_pool_client::{
        client::ProgramClient,
        error::{ErrorKind, RecordType, StakePoolClientError},
        find_stake_program_address, id,
        instruction::StakePoolOpcode,
        stake::STAKE_ACCOUNT_SPACE,
        state::Fee,
    },
};

#[tokio::test]
async fn get_stake_pool_with_list() {
    let mut stake_pool_accounts = StakePoolAccounts::new();
    stake_pool_accounts.add_validator(10 * LAMPORTS_PER_SOL, 0, 0);
    stake_pool_accounts.add_validator(5 * LAMPORTS_PER_SOL, LAMPORTS_PER_SOL, 3);
    let (_client, stake_pool_client) = setup(&stake_pool_accounts);

    let (stake_pool, validator_list) = stake_pool_client
        .get_stake_pool_with_list(&stake_pool_accounts.stake_pool_address)
        .await
        .unwrap();
    assert_eq!(stake_pool, stake_pool_accounts.stake_pool);
    assert_eq!(validator_list, stake_pool_accounts.validator_list);
    assert_eq!(
        stake_pool_client
            .get_account_lamports(&stake_pool.reserve_stake)
            .await
            .unwrap(),
        stake_pool_accounts.reserve_lamports
    );
    assert_eq!(
        stake_pool_client
            .get_stake_account_rent_exemption()
            .await
            .unwrap(),
        Rent::default().minimum_balance(STAKE_ACCOUNT_SPACE)
    );
}

#[tokio::test]
async fn fail_with_missing_account() {
    let stake_pool_accounts = StakePoolAccounts::new();
    let (_client, stake_pool_client) = setup(&stake_pool_accounts);
    let missing = Pubkey::new_unique();

    let err = stake_pool_client.get_stake_pool(&missing).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Lookup);
    assert!(matches!(err, StakePoolClientError::AccountNotFound(address) if address == missing));
}

#[tokio::test]
async fn fail_with_wrong_owner() {
    let stake_pool_accounts = StakePoolAccounts::new();
    let (client, stake_pool_client) = setup(&stake_pool_accounts);
    let address = Pubkey::new_unique();
    client.set_account(
        address,
        Account {
            lamports: 1,
            data: stake_pool_accounts.stake_pool.encode().unwrap(),
            owner: Pubkey::new_unique(),
            ..Account::default()
        },
    );

    let err = stake_pool_client.get_stake_pool(&address).await.unwrap_err();
    assert!(matches!(err, StakePoolClientError::InvalidAccountOwner(key) if key == address));
}

#[tokio::test]
async fn fail_with_list_as_pool() {
    let stake_pool_accounts = StakePoolAccounts::new();
    let (_client, stake_pool_client) = setup(&stake_pool_accounts);

    let err = stake_pool_client
        .get_stake_pool(&stake_pool_accounts.validator_list_address)
        .await
        .unwrap_err();
    match err {
        StakePoolClientError::Decode(err) => {
            assert_eq!(err.record, RecordType::StakePool);
            assert_eq!(err.offset, 0);
        }
        other => panic!("unexpected error {other}"),
    }
}

#[tokio::test]
async fn deposit_stake_into_validator() {
    let mut stake_pool_accounts = StakePoolAccounts::new();
    let vote = stake_pool_accounts.add_validator(10 * LAMPORTS_PER_SOL, 0, 0);
    let (client, stake_pool_client) = setup(&stake_pool_accounts);
    let user = Pubkey::new_unique();
    let pool_token_account = stake_pool_accounts.install_token_account(&client, &user, 0);
    let deposit_stake = Pubkey::new_unique();
    client.set_account(deposit_stake, stake_account(Some(vote), 3 * LAMPORTS_PER_SOL));

    let bundle = stake_pool_client
        .deposit_stake(
            &stake_pool_accounts.stake_pool_address,
            &deposit_stake,
            &user,
            &pool_token_account,
            None,
            None,
        )
        .await
        .unwrap();

    // authorize staker, authorize withdrawer, deposit
    assert_eq!(bundle.instructions.len(), 3);
    let deposit = &bundle.instructions[2];
    assert_eq!(deposit.program_id, id());
    assert_eq!(deposit.data, vec![u8::from(StakePoolOpcode::DepositStake)]);
    let (validator_stake, _) =
        find_stake_program_address(&id(), &vote, &stake_pool_accounts.stake_pool_address, None);
    assert!(deposit
        .accounts
        .iter()
        .any(|meta| meta.pubkey == validator_stake));
    assert!(deposit.accounts.iter().all(|meta| !meta.is_signer));
}

#[tokio::test]
async fn fail_deposit_undelegated_stake() {
    let mut stake_pool_accounts = StakePoolAccounts::new();
    stake_pool_accounts.add_validator(10 * LAMPORTS_PER_SOL, 0, 0);
    let (client, stake_pool_client) = setup(&stake_pool_accounts);
    let user = Pubkey::new_unique();
    let pool_token_account = stake_pool_accounts.install_token_account(&client, &user, 0);
    let deposit_stake = Pubkey::new_unique();
    client.set_account(deposit_stake, stake_account(None, 3 * LAMPORTS_PER_SOL));

    let err = stake_pool_client
        .deposit_stake(
            &stake_pool_accounts.stake_pool_address,
            &deposit_stake,
            &user,
            &pool_token_account,
            None,
            None,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, StakePoolClientError::StakeNotDelegated(address) if address == deposit_stake));
}

#[tokio::test]
async fn fail_deposit_stake_to_foreign_validator() {
    let mut stake_pool_accounts = StakePoolAccounts::new();
    stake_pool_accounts.add_validator(10 * LAMPORTS_PER_SOL, 0, 0);
    let (client, stake_pool_client) = setup(&stake_pool_accounts);
    let user = Pubkey::new_unique();
    let pool_token_account = stake_pool_accounts.install_token_account(&client, &user, 0);
    let deposit_stake = Pubkey::new_unique();
    let foreign = Pubkey::new_unique();
    client.set_account(
        deposit_stake,
        stake_account(Some(foreign), 3 * LAMPORTS_PER_SOL),
    );

    let err = stake_pool_client
        .deposit_stake(
            &stake_pool_accounts.stake_pool_address,
            &deposit_stake,
            &user,
            &pool_token_account,
            None,
            None,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, StakePoolClientError::ValidatorNotFound(vote) if vote == foreign));
}

#[tokio::test]
async fn token_metadata() {
    let stake_pool_accounts = StakePoolAccounts::new();
    let (_client, stake_pool_client) = setup(&stake_pool_accounts);
    let payer = Pubkey::new_unique();

    let bundle = stake_pool_client
        .create_token_metadata(
            &stake_pool_accounts.stake_pool_address,
            &payer,
            "Staked SOL".to_string(),
            "sSOL".to_string(),
            "https://example.com/ssol.json".to_string(),
        )
        .await
        .unwrap();
    let create = &bundle.instructions[0];
    assert_eq!(create.data[0], u8::from(StakePoolOpcode::CreateTokenMetadata));
    assert!(create
        .accounts
        .iter()
        .any(|meta| meta.pubkey == stake_pool_accounts.stake_pool.manager && meta.is_signer));

    let err = stake_pool_client
        .update_token_metadata(
            &stake_pool_accounts.stake_pool_address,
            "Staked SOL".to_string(),
            "TOOLONGSYMBOL".to_string(),
            String::new(),
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::LengthLimit);
}

#[tokio::test]
async fn stake_pool_info_summary() {
    let mut stake_pool_accounts = StakePoolAccounts::new();
    stake_pool_accounts.add_validator(10 * LAMPORTS_PER_SOL, 500_000_000, 0);
    stake_pool_accounts.stake_pool.last_update_epoch = CURRENT_EPOCH - 1;
    let (_client, stake_pool_client) = setup(&stake_pool_accounts);

    let info = stake_pool_client
        .stake_pool_info(&stake_pool_accounts.stake_pool_address)
        .await
        .unwrap();
    assert_eq!(info.epoch, CURRENT_EPOCH);
    assert!(info.update_required);
    assert_eq!(info.total_sol, "12.5");
    assert_eq!(info.reserve_sol, "2");
    assert_eq!(info.pool_token_supply, "12.5");
    assert_eq!(info.validator_count, 1);
    assert_eq!(
        info.epoch_fee,
        Fee {
            numerator: 1,
            denominator: 100
        }
    );
    assert_eq!(info.next_epoch_fee, None);
}

#[tokio::test]
async fn fail_info_with_foreign_mint_owner() {
    let stake_pool_accounts = StakePoolAccounts::new();
    let (client, stake_pool_client) = setup(&stake_pool_accounts);

    let pool_mint = stake_pool_accounts.stake_pool.pool_mint;
    let mut mint_account = client.get_account(pool_mint).await.unwrap().unwrap();
    mint_account.owner = Pubkey::new_unique();
    client.set_account(pool_mint, mint_account);

    let err = stake_pool_client
        .stake_pool_info(&stake_pool_accounts.stake_pool_address)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        StakePoolClientError::InvalidAccountOwner(address) if address == pool_mint
    ));
}
