mod helpers;

use {
    helpers::*,
    spl_stake_pool_client::{
        instruction::{StakePoolInstruction, StakePoolOpcode},
        MAX_VALIDATORS_TO_UPDATE,
    },
    test_case::test_case,
};

#[tokio::test]
async fn skip_when_already_updated() {
    let mut stake_pool_accounts = StakePoolAccounts::new();
    stake_pool_accounts.add_validator(10 * LAMPORTS_PER_SOL, 0, 0);
    let (_client, stake_pool_client) = setup(&stake_pool_accounts);

    let update = stake_pool_client
        .update_stake_pool(&stake_pool_accounts.stake_pool_address, false, false)
        .await
        .unwrap();
    assert!(update.is_empty());
}

#[tokio::test]
async fn force_update_in_same_epoch() {
    let mut stake_pool_accounts = StakePoolAccounts::new();
    stake_pool_accounts.add_validator(10 * LAMPORTS_PER_SOL, 0, 0);
    let (_client, stake_pool_client) = setup(&stake_pool_accounts);

    let update = stake_pool_client
        .update_stake_pool(&stake_pool_accounts.stake_pool_address, true, false)
        .await
        .unwrap();
    assert_eq!(update.update_list_instructions.len(), 1);
    assert_eq!(update.final_instructions.len(), 2);
}

#[test_case(0, 0 ; "empty list")]
#[test_case(1, 1 ; "single validator")]
#[test_case(5, 1 ; "one full chunk")]
#[test_case(7, 2 ; "partial second chunk")]
#[test_case(10, 2 ; "two full chunks")]
#[tokio::test]
async fn stale_pool_is_chunked(validators: usize, chunks: usize) {
    let mut stake_pool_accounts = StakePoolAccounts::new();
    stake_pool_accounts.stake_pool.last_update_epoch = CURRENT_EPOCH - 1;
    for _ in 0..validators {
        stake_pool_accounts.add_validator(10 * LAMPORTS_PER_SOL, 0, 0);
    }
    let (_client, stake_pool_client) = setup(&stake_pool_accounts);

    let update = stake_pool_client
        .update_stake_pool(&stake_pool_accounts.stake_pool_address, false, true)
        .await
        .unwrap();
    assert_eq!(update.update_list_instructions.len(), chunks);
    for (i, instruction) in update.update_list_instructions.iter().enumerate() {
        let start_index = (i * MAX_VALIDATORS_TO_UPDATE) as u32;
        assert_eq!(
            StakePoolInstruction::unpack(&instruction.data).unwrap(),
            StakePoolInstruction::UpdateValidatorListBalance {
                start_index,
                no_merge: true,
            }
        );
    }
    assert_eq!(
        update.final_instructions[0].data,
        vec![u8::from(StakePoolOpcode::UpdateStakePoolBalance)]
    );
    assert_eq!(
        update.final_instructions[1].data,
        vec![u8::from(StakePoolOpcode::CleanupRemovedValidatorEntries)]
    );
}
