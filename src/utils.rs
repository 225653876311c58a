use constant_time_eq::constant_time_eq_32;
use sha2_const_stable::Sha256;
use solana_program::{hash::hash, program_error::ProgramError, pubkey::Pubkey};

use crate::error::VaultError;

/// Seed prefix for deposit PDA derivation
pub const DEPOSIT_SEED: &[u8] = b"deposit";

/// First 8 bytes of SHA-256 over `preimage`, evaluated at compile time.
///
/// Used for `global:<instruction>` and `account:<Type>` tags.
pub const fn sighash(preimage: &[u8]) -> [u8; 8] {
    let digest = Sha256::new().update(preimage).finalize();
    [
        digest[0], digest[1], digest[2], digest[3], digest[4], digest[5], digest[6], digest[7],
    ]
}

/// Derive the deposit PDA from depositor and client-chosen deposit id
pub fn derive_deposit_pda(program_id: &Pubkey, depositor: &Pubkey, deposit_id: u64) -> (Pubkey, u8) {
    Pubkey::find_program_address(
        &[DEPOSIT_SEED, depositor.as_ref(), &deposit_id.to_le_bytes()],
        program_id,
    )
}

/// Verify a deposit address against its seeds and stored bump
pub fn verify_deposit_pda(
    program_id: &Pubkey,
    deposit: &Pubkey,
    depositor: &Pubkey,
    deposit_id: u64,
    bump: u8,
) -> Result<(), ProgramError> {
    let seeds = &[
        DEPOSIT_SEED,
        depositor.as_ref(),
        &deposit_id.to_le_bytes(),
        &[bump],
    ];

    let expected_pda = Pubkey::create_program_address(seeds, program_id)
        .map_err(|_| VaultError::AccountNotFound)?;

    if expected_pda != *deposit {
        return Err(VaultError::AccountNotFound.into());
    }

    Ok(())
}

/// SHA-256 of the secret's UTF-8 bytes
pub fn hash_secret(secret: &str) -> [u8; 32] {
    hash(secret.as_bytes()).to_bytes()
}

/// Compare the secret's digest to `claim_hash` over all 32 bytes.
pub fn secret_matches(secret: &str, claim_hash: &[u8; 32]) -> bool {
    constant_time_eq_32(&hash_secret(secret), claim_hash)
}

#[cfg(test)]
mod tests {
    use super::*;
    use solana_program::system_program;

    #[test]
    fn test_deposit_pda_derivation() {
        let program_id = crate::id();
        let depositor = Pubkey::new_unique();

        let (pda, bump) = derive_deposit_pda(&program_id, &depositor, 1_700_000_000_123);
        let (again, again_bump) = derive_deposit_pda(&program_id, &depositor, 1_700_000_000_123);
        assert_eq!((pda, bump), (again, again_bump));

        assert!(verify_deposit_pda(&program_id, &pda, &depositor, 1_700_000_000_123, bump).is_ok());
    }

    #[test]
    fn test_deposit_pda_distinct_pairs() {
        let program_id = crate::id();
        let alice = Pubkey::new_unique();
        let bob = Pubkey::new_unique();

        let (a1, _) = derive_deposit_pda(&program_id, &alice, 1);
        let (a2, _) = derive_deposit_pda(&program_id, &alice, 2);
        let (b1, _) = derive_deposit_pda(&program_id, &bob, 1);
        assert_ne!(a1, a2);
        assert_ne!(a1, b1);
        assert_ne!(a2, b1);
    }

    #[test]
    fn test_invalid_deposit_pda_verification() {
        let program_id = system_program::id();
        let depositor = Pubkey::new_unique();
        let wrong_pda = Pubkey::new_unique();

        let (_, bump) = derive_deposit_pda(&program_id, &depositor, 42);
        let verification = verify_deposit_pda(&program_id, &wrong_pda, &depositor, 42, bump);
        assert!(verification.is_err());
    }

    #[test]
    fn test_sighash_matches_client_discriminators() {
        assert_eq!(
            sighash(b"global:create_private_deposit"),
            [18, 31, 68, 39, 24, 0, 251, 139]
        );
        assert_eq!(
            sighash(b"global:claim_deposit"),
            [201, 106, 1, 224, 122, 144, 210, 155]
        );
        assert_eq!(
            sighash(b"global:refund_expired"),
            [118, 153, 164, 244, 40, 128, 242, 250]
        );
    }

    #[test]
    fn test_hash_secret() {
        assert_eq!(
            hex::encode(hash_secret("horse-battery")),
            "34f6d494e0336988df665feffc4d9c3d29ed5d268b7e38213c85aa4052c9e798"
        );
        assert!(secret_matches("horse-battery", &hash_secret("horse-battery")));
        assert!(!secret_matches("wrong-pass", &hash_secret("horse-battery")));
        assert!(!secret_matches("", &hash_secret("horse-battery")));
    }
}

/// Account validation utilities
use solana_program::{account_info::AccountInfo, system_program};

use crate::state::Deposit;

/// Verify that an account is a signer
pub fn verify_signer(account: &AccountInfo) -> Result<(), ProgramError> {
    if !account.is_signer {
        return Err(VaultError::Unauthorized.into());
    }
    Ok(())
}

/// Verify that an account is writable
pub fn verify_writable(account: &AccountInfo) -> Result<(), ProgramError> {
    if !account.is_writable {
        return Err(ProgramError::InvalidArgument);
    }
    Ok(())
}

/// Verify that the account is the system program
pub fn verify_system_program(account: &AccountInfo) -> Result<(), ProgramError> {
    if account.key != &system_program::id() {
        return Err(ProgramError::IncorrectProgramId);
    }
    Ok(())
}

/// Verify that a deposit address has not been initialized yet.
///
/// Lamports alone do not count: anyone can transfer to an address before
/// it is created.
pub fn verify_uninitialized_account(account: &AccountInfo) -> Result<(), ProgramError> {
    if account.owner != &system_program::id() || account.data_len() != 0 {
        return Err(VaultError::AlreadyInitialized.into());
    }
    Ok(())
}

/// Load the deposit record held by `account`.
pub fn load_deposit(account: &AccountInfo, program_id: &Pubkey) -> Result<Deposit, ProgramError> {
    if account.lamports() == 0 || account.data_is_empty() || account.owner != program_id {
        return Err(VaultError::AccountNotFound.into());
    }
    let data = account.try_borrow_data()?;
    Ok(Deposit::unpack(&data[..])?)
}
