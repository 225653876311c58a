use solana_program::{
    decode_error::DecodeError,
    msg,
    program_error::{PrintProgramError, ProgramError},
};
use thiserror::Error;

/// Errors returned by the vault program.
///
/// Codes start at 6000 and are part of the client contract: wallets match on
/// the hex form (`0x1770` is `AlreadyClaimed`) when translating failures.
#[derive(Error, Debug, Copy, Clone, PartialEq, Eq)]
pub enum VaultError {
    /// Deposit was already settled by a claim or a refund
    #[error("Deposit already claimed")]
    AlreadyClaimed = 6000,

    /// SHA-256 of the provided secret does not match the stored claim hash
    #[error("Invalid secret code")]
    InvalidSecret = 6001,

    /// Amount does not cover the rent-exempt reserve plus the safety margin
    #[error("Amount too small")]
    AmountTooSmall = 6002,

    /// Claim attempted at or after `expires_at`
    #[error("Deposit expired")]
    DepositExpired = 6003,

    /// Refund attempted before `expires_at`, or on a deposit that never expires
    #[error("Deposit not expired yet")]
    NotExpiredYet = 6004,

    /// Signer does not match the depositor implied by the deposit address
    #[error("Unauthorized")]
    Unauthorized = 6006,

    /// Deposit address is already in use
    #[error("Deposit already initialized")]
    AlreadyInitialized = 6007,

    /// No deposit exists at the referenced address
    #[error("Deposit account not found")]
    AccountNotFound = 6008,

    /// Depositor cannot cover the reserve plus the amount
    #[error("Insufficient funds")]
    InsufficientFunds = 6009,

    /// Instruction data could not be decoded
    #[error("Invalid instruction")]
    InvalidInstruction = 6010,

    /// `expires_at` is negative or not in the future
    #[error("Invalid expiration")]
    InvalidExpiration = 6011,

    /// Arithmetic overflow
    #[error("Arithmetic overflow")]
    ArithmeticOverflow = 6012,

    /// Account is owned by the program but is not a deposit record
    #[error("Invalid account data")]
    InvalidAccountData = 6013,
}

impl VaultError {
    /// Map a raw custom error code back to its variant.
    pub fn from_code(code: u32) -> Option<Self> {
        let err = match code {
            6000 => VaultError::AlreadyClaimed,
            6001 => VaultError::InvalidSecret,
            6002 => VaultError::AmountTooSmall,
            6003 => VaultError::DepositExpired,
            6004 => VaultError::NotExpiredYet,
            6006 => VaultError::Unauthorized,
            6007 => VaultError::AlreadyInitialized,
            6008 => VaultError::AccountNotFound,
            6009 => VaultError::InsufficientFunds,
            6010 => VaultError::InvalidInstruction,
            6011 => VaultError::InvalidExpiration,
            6012 => VaultError::ArithmeticOverflow,
            6013 => VaultError::InvalidAccountData,
            _ => return None,
        };
        Some(err)
    }
}

impl From<VaultError> for ProgramError {
    fn from(e: VaultError) -> Self {
        ProgramError::Custom(e as u32)
    }
}

impl<T> DecodeError<T> for VaultError {
    fn type_of() -> &'static str {
        "VaultError"
    }
}

impl PrintProgramError for VaultError {
    fn print<E>(&self) {
        match self {
            VaultError::AlreadyClaimed => msg!("Error: Deposit was already claimed or refunded"),
            VaultError::InvalidSecret => msg!("Error: Secret does not match the claim hash"),
            VaultError::AmountTooSmall => msg!("Error: Amount is below the minimum deposit"),
            VaultError::DepositExpired => msg!("Error: Deposit has expired and can only be refunded"),
            VaultError::NotExpiredYet => msg!("Error: Deposit cannot be refunded yet"),
            VaultError::AlreadyInitialized => msg!("Error: Deposit address already in use"),
            VaultError::AccountNotFound => msg!("Error: Deposit account not found"),
            VaultError::Unauthorized => msg!("Error: Signer does not own this deposit"),
            VaultError::InsufficientFunds => msg!("Error: Insufficient funds for deposit"),
            VaultError::InvalidInstruction => msg!("Error: Invalid instruction data"),
            VaultError::InvalidExpiration => msg!("Error: Expiration must be zero or in the future"),
            VaultError::ArithmeticOverflow => msg!("Error: Arithmetic overflow occurred"),
            VaultError::InvalidAccountData => msg!("Error: Account is not a deposit record"),
        }
    }
}
