//! Error types

use {
    solana_program::{program_error::ProgramError, pubkey::Pubkey},
    std::fmt,
    thiserror::Error,
};

/// Error returned by a [`ProgramClient`](crate::client::ProgramClient)
pub type ProgramClientError = Box<dyn std::error::Error + Send + Sync>;

/// Result type for [`ProgramClient`](crate::client::ProgramClient) calls
pub type ProgramClientResult<T> = Result<T, ProgramClientError>;

/// Record or payload a decode was attempted on
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecordType {
    /// Leading account discriminant
    AccountType,
    /// Stake pool account
    StakePool,
    /// Validator list account
    ValidatorList,
    /// Stake pool instruction data
    Instruction,
    /// Native stake program account
    StakeAccount,
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            Self::AccountType => "account type",
            Self::StakePool => "stake pool",
            Self::ValidatorList => "validator list",
            Self::Instruction => "instruction",
            Self::StakeAccount => "stake account",
        };
        write!(f, "{}", name)
    }
}

/// Failure to decode on-chain bytes, with the position it happened at
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("failed to decode {record} at byte offset {offset}: {reason}")]
pub struct DecodeError {
    /// Record being decoded
    pub record: RecordType,
    /// Byte offset at which decoding stopped
    pub offset: usize,
    /// Underlying cause
    pub reason: String,
}

impl DecodeError {
    /// Create a new decode error
    pub fn new(record: RecordType, offset: usize, reason: impl ToString) -> Self {
        Self {
            record,
            offset,
            reason: reason.to_string(),
        }
    }
}

/// Broad class of a [`StakePoolClientError`], for callers that branch on it
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed, short or mistagged bytes
    Decode,
    /// Requested account or validator does not exist
    Lookup,
    /// Requested amount exceeds what can safely be withdrawn
    Availability,
    /// Caller-supplied address disagrees with on-chain state
    ConstraintMismatch,
    /// Metadata string longer than allowed
    LengthLimit,
    /// Invalid amount or failed arithmetic
    Amount,
    /// Ledger client or program failure
    Client,
}

/// Errors that may be returned by the stake pool client
#[derive(Debug, Error)]
pub enum StakePoolClientError {
    /// The ledger client failed
    #[error("client error: {0}")]
    Client(ProgramClientError),
    /// Building an instruction of another program failed
    #[error("program error: {0}")]
    Program(#[from] ProgramError),
    /// On-chain bytes could not be decoded
    #[error(transparent)]
    Decode(#[from] DecodeError),
    /// The account does not exist
    #[error("account {0} not found")]
    AccountNotFound(Pubkey),
    /// The vote account is not part of the validator list
    #[error("vote account {0} is not part of the stake pool")]
    ValidatorNotFound(Pubkey),
    /// A single stake account cannot cover the requested withdrawal
    #[error(
        "not enough lamports available for withdrawal from {stake_address}, \
         {requested} pool tokens asked, {available} available"
    )]
    InsufficientWithdrawAvailability {
        /// Stake account checked
        stake_address: Pubkey,
        /// Pool tokens requested
        requested: u64,
        /// Pool tokens that can be withdrawn from it
        available: u64,
    },
    /// All stake in the pool together cannot cover the requested withdrawal
    #[error(
        "no stake accounts found in this pool with enough balance to withdraw \
         {requested} pool tokens, short by {shortfall}"
    )]
    NotEnoughStakeToWithdraw {
        /// Pool tokens requested
        requested: u64,
        /// Pool tokens that could not be placed
        shortfall: u64,
    },
    /// The user's pool token account holds less than requested
    #[error(
        "not enough token balance to withdraw {requested} pool tokens, \
         maximum withdraw amount is {available} pool tokens"
    )]
    InsufficientTokenBalance {
        /// Pool tokens requested
        requested: u64,
        /// Pool tokens held
        available: u64,
    },
    /// A caller-supplied address does not match the decoded record
    #[error(
        "invalid {field}: expected {}, provided {provided}",
        .expected.map(|key| key.to_string()).unwrap_or_else(|| "none".to_string())
    )]
    ConstraintMismatch {
        /// Field of the on-chain record checked
        field: &'static str,
        /// Value held on-chain, `None` if unset
        expected: Option<Pubkey>,
        /// Value supplied by the caller
        provided: Pubkey,
    },
    /// The account is not owned by the expected program
    #[error("invalid account owner for {0}")]
    InvalidAccountOwner(Pubkey),
    /// The stake account is not delegated to any validator
    #[error("stake account {0} is not delegated")]
    StakeNotDelegated(Pubkey),
    /// The token account does not hold the pool's mint
    #[error("token account {0} does not hold the pool mint")]
    InvalidPoolMint(Pubkey),
    /// A token metadata field is too long
    #[error("token metadata {field} is {actual} bytes, maximum is {max}")]
    MetadataFieldTooLong {
        /// Field name
        field: &'static str,
        /// Maximum allowed length
        max: usize,
        /// Supplied length
        actual: usize,
    },
    /// An amount string could not be parsed
    #[error("invalid amount {0:?}")]
    InvalidAmount(String),
    /// Arithmetic overflow or division by zero
    #[error("calculation failure")]
    CalculationFailure,
}

impl StakePoolClientError {
    /// Broad class of the error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Decode(_) => ErrorKind::Decode,
            Self::AccountNotFound(_) | Self::ValidatorNotFound(_) => ErrorKind::Lookup,
            Self::InsufficientWithdrawAvailability { .. }
            | Self::NotEnoughStakeToWithdraw { .. }
            | Self::InsufficientTokenBalance { .. } => ErrorKind::Availability,
            Self::ConstraintMismatch { .. }
            | Self::InvalidAccountOwner(_)
            | Self::InvalidPoolMint(_)
            | Self::StakeNotDelegated(_) => ErrorKind::ConstraintMismatch,
            Self::MetadataFieldTooLong { .. } => ErrorKind::LengthLimit,
            Self::InvalidAmount(_) | Self::CalculationFailure => ErrorKind::Amount,
            Self::Client(_) | Self::Program(_) => ErrorKind::Client,
        }
    }
}

/// Result type for the stake pool client
pub type StakePoolClientResult<T> = Result<T, StakePoolClientError>;
