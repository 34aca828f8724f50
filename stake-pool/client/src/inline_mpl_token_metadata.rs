//! Inlined MPL metadata constants to avoid a direct dependency on
//! `mpl-token-metadata`

use crate::error::{StakePoolClientError, StakePoolClientResult};

solana_program::declare_id!("metaqbxxUerdq28cj1RbAWkYQm3ybzjb6a8bt518x1s");

/// Maximum length of a token name, in bytes
pub const MAX_NAME_LENGTH: usize = 32;
/// Maximum length of a token symbol, in bytes
pub const MAX_SYMBOL_LENGTH: usize = 10;
/// Maximum length of a token uri, in bytes
pub const MAX_URI_LENGTH: usize = 200;

/// Check token metadata strings against the metadata program's limits
pub fn check_metadata_lengths(name: &str, symbol: &str, uri: &str) -> StakePoolClientResult<()> {
    for (field, value, max) in [
        ("name", name, MAX_NAME_LENGTH),
        ("symbol", symbol, MAX_SYMBOL_LENGTH),
        ("uri", uri, MAX_URI_LENGTH),
    ] {
        if value.len() > max {
            return Err(StakePoolClientError::MetadataFieldTooLong {
                field,
                max,
                actual: value.len(),
            });
        }
    }
    Ok(())
}

/// PDA creation helpers
pub mod pda {
    use {super::ID, solana_program::pubkey::Pubkey};
    const PREFIX: &str = "metadata";
    /// Helper to find a metadata account address
    pub fn find_metadata_account(mint: &Pubkey) -> (Pubkey, u8) {
        Pubkey::find_program_address(&[PREFIX.as_bytes(), ID.as_ref(), mint.as_ref()], &ID)
    }
}
