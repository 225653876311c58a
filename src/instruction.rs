use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{
    instruction::{AccountMeta, Instruction},
    program_error::ProgramError,
    pubkey::Pubkey,
    system_program,
};

use crate::{
    error::VaultError,
    utils::{derive_deposit_pda, sighash},
};

pub const CREATE_PRIVATE_DEPOSIT_DISCRIMINATOR: [u8; 8] = sighash(b"global:create_private_deposit");
pub const CLAIM_DEPOSIT_DISCRIMINATOR: [u8; 8] = sighash(b"global:claim_deposit");
pub const REFUND_EXPIRED_DISCRIMINATOR: [u8; 8] = sighash(b"global:refund_expired");

#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq)]
pub struct CreatePrivateDepositArgs {
    /// Client-chosen id, usually a millisecond timestamp
    pub deposit_id: u64,
    /// Lamports to escrow
    pub amount: u64,
    /// SHA-256 of the secret
    pub claim_hash: [u8; 32],
    /// 0 for never, otherwise absolute unix seconds
    pub expires_at: i64,
}

#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq)]
pub struct ClaimDepositArgs {
    pub deposit_id: u64,
    pub secret: String,
}

#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq)]
pub struct RefundExpiredArgs {
    pub deposit_id: u64,
}

/// Instructions supported by the vault program.
///
/// On the wire each instruction is an 8-byte discriminator followed by its
/// borsh-encoded arguments (little-endian integers, u32-length-prefixed
/// strings).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VaultInstruction {
    /// Open a new escrow funded by the depositor
    ///
    /// Accounts expected:
    /// 0. [signer, writable] Depositor
    /// 1. [writable] Deposit account (PDA of depositor and deposit id)
    /// 2. [] System program
    CreatePrivateDeposit(CreatePrivateDepositArgs),

    /// Release the escrow to whoever presents the secret
    ///
    /// Accounts expected:
    /// 0. [signer, writable] Claimer
    /// 1. [writable] Deposit account
    /// 2. [] System program
    ClaimDeposit(ClaimDepositArgs),

    /// Return an expired, unclaimed escrow to its depositor
    ///
    /// Accounts expected:
    /// 0. [signer, writable] Depositor
    /// 1. [writable] Deposit account
    /// 2. [] System program
    RefundExpired(RefundExpiredArgs),
}

impl VaultInstruction {
    /// Parse instruction data
    pub fn unpack(input: &[u8]) -> Result<Self, ProgramError> {
        if input.len() < 8 {
            return Err(VaultError::InvalidInstruction.into());
        }
        let (tag, mut rest) = input.split_at(8);

        let instruction = match <[u8; 8]>::try_from(tag) {
            Ok(CREATE_PRIVATE_DEPOSIT_DISCRIMINATOR) => {
                Self::CreatePrivateDeposit(decode_args(&mut rest)?)
            }
            Ok(CLAIM_DEPOSIT_DISCRIMINATOR) => Self::ClaimDeposit(decode_args(&mut rest)?),
            Ok(REFUND_EXPIRED_DISCRIMINATOR) => Self::RefundExpired(decode_args(&mut rest)?),
            _ => return Err(VaultError::InvalidInstruction.into()),
        };
        Ok(instruction)
    }

    /// Encode into instruction data: the discriminator, then the borsh args
    pub fn pack(&self) -> Result<Vec<u8>, ProgramError> {
        let mut data = Vec::with_capacity(8 + 56);
        match self {
            Self::CreatePrivateDeposit(args) => {
                data.extend_from_slice(&CREATE_PRIVATE_DEPOSIT_DISCRIMINATOR);
                encode_args(args, &mut data)?;
            }
            Self::ClaimDeposit(args) => {
                data.extend_from_slice(&CLAIM_DEPOSIT_DISCRIMINATOR);
                encode_args(args, &mut data)?;
            }
            Self::RefundExpired(args) => {
                data.extend_from_slice(&REFUND_EXPIRED_DISCRIMINATOR);
                encode_args(args, &mut data)?;
            }
        }
        Ok(data)
    }
}

/// Parse instruction data into VaultInstruction
pub fn unpack(input: &[u8]) -> Result<VaultInstruction, ProgramError> {
    VaultInstruction::unpack(input)
}

fn encode_args<T: BorshSerialize>(args: &T, data: &mut Vec<u8>) -> Result<(), ProgramError> {
    args.serialize(data)
        .map_err(|e| ProgramError::BorshIoError(e.to_string()))
}

fn decode_args<T: BorshDeserialize>(rest: &mut &[u8]) -> Result<T, ProgramError> {
    T::deserialize(rest).map_err(|_| VaultError::InvalidInstruction.into())
}

fn deposit_accounts(caller: &Pubkey, deposit: &Pubkey) -> Vec<AccountMeta> {
    vec![
        AccountMeta::new(*caller, true),
        AccountMeta::new(*deposit, false),
        AccountMeta::new_readonly(system_program::id(), false),
    ]
}

/// Create a CreatePrivateDeposit instruction
pub fn create_private_deposit(
    program_id: &Pubkey,
    depositor: &Pubkey,
    deposit_id: u64,
    amount: u64,
    claim_hash: [u8; 32],
    expires_at: i64,
) -> Result<Instruction, ProgramError> {
    let (deposit, _) = derive_deposit_pda(program_id, depositor, deposit_id);
    let args = CreatePrivateDepositArgs {
        deposit_id,
        amount,
        claim_hash,
        expires_at,
    };

    Ok(Instruction {
        program_id: *program_id,
        accounts: deposit_accounts(depositor, &deposit),
        data: VaultInstruction::CreatePrivateDeposit(args).pack()?,
    })
}

/// Create a ClaimDeposit instruction. The depositor address comes from the
/// shared link and is only used to derive the deposit account.
pub fn claim_deposit(
    program_id: &Pubkey,
    claimer: &Pubkey,
    depositor: &Pubkey,
    deposit_id: u64,
    secret: &str,
) -> Result<Instruction, ProgramError> {
    let (deposit, _) = derive_deposit_pda(program_id, depositor, deposit_id);
    let args = ClaimDepositArgs {
        deposit_id,
        secret: secret.to_string(),
    };

    Ok(Instruction {
        program_id: *program_id,
        accounts: deposit_accounts(claimer, &deposit),
        data: VaultInstruction::ClaimDeposit(args).pack()?,
    })
}

/// Create a RefundExpired instruction
pub fn refund_expired(
    program_id: &Pubkey,
    depositor: &Pubkey,
    deposit_id: u64,
) -> Result<Instruction, ProgramError> {
    let (deposit, _) = derive_deposit_pda(program_id, depositor, deposit_id);

    Ok(Instruction {
        program_id: *program_id,
        accounts: deposit_accounts(depositor, &deposit),
        data: VaultInstruction::RefundExpired(RefundExpiredArgs { deposit_id }).pack()?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_layout() {
        let ix = VaultInstruction::CreatePrivateDeposit(CreatePrivateDepositArgs {
            deposit_id: 1_700_000_000_123,
            amount: 10_000_000,
            claim_hash: [9u8; 32],
            expires_at: 1_700_086_400,
        });
        let data = ix.pack().unwrap();

        assert_eq!(data.len(), 8 + 8 + 8 + 32 + 8);
        assert_eq!(&data[..8], &[18, 31, 68, 39, 24, 0, 251, 139]);
        assert_eq!(&data[8..16], &1_700_000_000_123u64.to_le_bytes());
        assert_eq!(&data[16..24], &10_000_000u64.to_le_bytes());
        assert_eq!(&data[24..56], &[9u8; 32]);
        assert_eq!(&data[56..64], &1_700_086_400i64.to_le_bytes());
        assert_eq!(unpack(&data).unwrap(), ix);
    }

    #[test]
    fn test_claim_secret_is_length_prefixed() {
        let ix = VaultInstruction::ClaimDeposit(ClaimDepositArgs {
            deposit_id: 7,
            secret: "horse-battery".to_string(),
        });
        let data = ix.pack().unwrap();

        assert_eq!(&data[..8], &[201, 106, 1, 224, 122, 144, 210, 155]);
        assert_eq!(&data[16..20], &13u32.to_le_bytes());
        assert_eq!(&data[20..], b"horse-battery");

        let args = ClaimDepositArgs {
            deposit_id: 7,
            secret: "horse-battery".to_string(),
        };
        assert_eq!(&data[8..], args.try_to_vec().unwrap().as_slice());
        assert_eq!(unpack(&data).unwrap(), ix);
    }

    #[test]
    fn test_refund_layout() {
        let data = VaultInstruction::RefundExpired(RefundExpiredArgs { deposit_id: 42 })
            .pack()
            .unwrap();
        assert_eq!(hex::encode(&data[..8]), "7699a4f42880f2fa");
        assert_eq!(&data[8..], &42u64.to_le_bytes());
    }

    #[test]
    fn test_unpack_empty_data() {
        assert_eq!(unpack(&[]), Err(VaultError::InvalidInstruction.into()));
    }

    #[test]
    fn test_unpack_unknown_discriminator() {
        let mut data = vec![0u8; 16];
        data[..8].copy_from_slice(&[1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(unpack(&data), Err(VaultError::InvalidInstruction.into()));
    }

    #[test]
    fn test_unpack_truncated_args() {
        let data = VaultInstruction::RefundExpired(RefundExpiredArgs { deposit_id: 42 })
            .pack()
            .unwrap();
        assert!(unpack(&data[..12]).is_err());
    }

    #[test]
    fn test_unpack_rejects_invalid_utf8_secret() {
        let mut data = CLAIM_DEPOSIT_DISCRIMINATOR.to_vec();
        data.extend_from_slice(&1u64.to_le_bytes());
        data.extend_from_slice(&2u32.to_le_bytes());
        data.extend_from_slice(&[0xff, 0xfe]);
        assert_eq!(unpack(&data), Err(VaultError::InvalidInstruction.into()));
    }

    #[test]
    fn test_builders_target_derived_account() {
        let program_id = crate::id();
        let depositor = Pubkey::new_unique();
        let claimer = Pubkey::new_unique();
        let (pda, _) = derive_deposit_pda(&program_id, &depositor, 99);

        let ix = claim_deposit(&program_id, &claimer, &depositor, 99, "s3cret").unwrap();
        assert_eq!(ix.accounts[0], AccountMeta::new(claimer, true));
        assert_eq!(ix.accounts[1], AccountMeta::new(pda, false));
        assert_eq!(ix.accounts[2], AccountMeta::new_readonly(system_program::id(), false));

        let ix = refund_expired(&program_id, &depositor, 99).unwrap();
        assert_eq!(ix.accounts[0], AccountMeta::new(depositor, true));
        assert_eq!(ix.accounts[1].pubkey, pda);
    }
}
