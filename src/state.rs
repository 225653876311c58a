use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{pubkey::Pubkey, rent::Rent};

use crate::{error::VaultError, utils::sighash};

/// Lamports required on top of the rent-exempt reserve for a deposit to be
/// accepted (one base signature fee).
pub const AMOUNT_SAFETY_MARGIN: u64 = 5_000;

/// Escrow record stored at `PDA("deposit", depositor, deposit_id)`.
///
/// Field order and widths are the wire layout read by clients; borsh writes
/// the struct as-is, so the serialized form is exactly [`Deposit::LEN`] bytes.
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq)]
pub struct Deposit {
    /// Account type tag, always [`Deposit::DISCRIMINATOR`]
    pub discriminator: [u8; 8],
    /// Wallet that funded the deposit and may refund it after expiry
    pub depositor: Pubkey,
    /// SHA-256 of the secret required to claim
    pub claim_hash: [u8; 32],
    /// Escrowed lamports, on top of the account's rent reserve
    pub amount: u64,
    /// Set once funds leave through a claim or a refund; never cleared
    pub claimed: bool,
    /// Bump seed used for PDA derivation
    pub bump: u8,
    /// Ledger time at creation, unix seconds
    pub created_at: i64,
    /// Absolute expiry in unix seconds, 0 for never
    pub expires_at: i64,
}

impl Deposit {
    /// Size of Deposit when serialized
    pub const LEN: usize = 8 + 32 + 32 + 8 + 1 + 1 + 8 + 8; // 98 bytes

    pub const DISCRIMINATOR: [u8; 8] = sighash(b"account:PrivateDeposit");

    pub const DEPOSITOR_OFFSET: usize = 8;
    pub const CLAIM_HASH_OFFSET: usize = 40;
    pub const AMOUNT_OFFSET: usize = 72;
    pub const CLAIMED_OFFSET: usize = 80;
    pub const BUMP_OFFSET: usize = 81;
    pub const CREATED_AT_OFFSET: usize = 82;
    pub const EXPIRES_AT_OFFSET: usize = 90;

    /// Smallest `amount` CreatePrivateDeposit accepts under `rent`.
    pub fn minimum_amount(rent: &Rent) -> Result<u64, VaultError> {
        rent.minimum_balance(Self::LEN)
            .checked_add(AMOUNT_SAFETY_MARGIN)
            .ok_or(VaultError::ArithmeticOverflow)
    }

    pub fn new(
        depositor: Pubkey,
        claim_hash: [u8; 32],
        amount: u64,
        bump: u8,
        created_at: i64,
        expires_at: i64,
    ) -> Self {
        Self {
            discriminator: Self::DISCRIMINATOR,
            depositor,
            claim_hash,
            amount,
            claimed: false,
            bump,
            created_at,
            expires_at,
        }
    }

    /// Decode a deposit from raw account data.
    ///
    /// Data must be exactly [`Deposit::LEN`] bytes and carry the deposit
    /// discriminator.
    pub fn unpack(data: &[u8]) -> Result<Self, VaultError> {
        if data.len() != Self::LEN {
            return Err(VaultError::InvalidAccountData);
        }
        if data[..8] != Self::DISCRIMINATOR {
            return Err(VaultError::InvalidAccountData);
        }
        Self::try_from_slice(data).map_err(|_| VaultError::InvalidAccountData)
    }

    /// Write the record into an account data buffer of at least `LEN` bytes.
    pub fn pack_into(&self, dst: &mut [u8]) -> Result<(), VaultError> {
        if dst.len() < Self::LEN {
            return Err(VaultError::InvalidAccountData);
        }
        let bytes = self.try_to_vec().map_err(|_| VaultError::InvalidAccountData)?;
        if bytes.len() != Self::LEN {
            return Err(VaultError::InvalidAccountData);
        }
        dst[..Self::LEN].copy_from_slice(&bytes);
        Ok(())
    }

    pub fn never_expires(&self) -> bool {
        self.expires_at == 0
    }

    /// Whether ledger time `now` is at or past the expiry.
    pub fn is_expired(&self, now: i64) -> bool {
        !self.never_expires() && now >= self.expires_at
    }

    /// Check the claim preconditions that do not depend on the secret.
    pub fn ensure_claimable(&self, now: i64) -> Result<(), VaultError> {
        if self.claimed {
            return Err(VaultError::AlreadyClaimed);
        }
        if self.is_expired(now) {
            return Err(VaultError::DepositExpired);
        }
        Ok(())
    }

    /// Check the refund preconditions.
    pub fn ensure_refundable(&self, now: i64) -> Result<(), VaultError> {
        if self.claimed {
            return Err(VaultError::AlreadyClaimed);
        }
        if !self.is_expired(now) {
            return Err(VaultError::NotExpiredYet);
        }
        Ok(())
    }

    /// Move the record to its terminal state. Fails if it is already there.
    pub fn settle(&mut self) -> Result<(), VaultError> {
        if self.claimed {
            return Err(VaultError::AlreadyClaimed);
        }
        self.claimed = true;
        Ok(())
    }
}
