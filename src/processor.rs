use solana_program::{
    account_info::{next_account_info, AccountInfo},
    clock::Clock,
    entrypoint::ProgramResult,
    msg,
    program::{invoke, invoke_signed},
    program_error::ProgramError,
    pubkey::Pubkey,
    rent::Rent,
    system_instruction,
    sysvar::Sysvar,
};

use crate::{
    error::VaultError,
    instruction::{
        unpack, ClaimDepositArgs, CreatePrivateDepositArgs, RefundExpiredArgs, VaultInstruction,
    },
    state::Deposit,
    utils::{
        derive_deposit_pda, load_deposit, secret_matches, verify_deposit_pda,
        verify_signer, verify_system_program, verify_uninitialized_account, verify_writable,
        DEPOSIT_SEED,
    },
};

pub fn process_instruction(
    program_id: &Pubkey,
    accounts: &[AccountInfo],
    instruction_data: &[u8],
) -> ProgramResult {
    let instruction = unpack(instruction_data).map_err(|e| {
        msg!("Failed to decode instruction data ({} bytes)", instruction_data.len());
        e
    })?;

    match instruction {
        VaultInstruction::CreatePrivateDeposit(args) => {
            process_create_private_deposit(program_id, accounts, args)
        }
        VaultInstruction::ClaimDeposit(args) => process_claim_deposit(program_id, accounts, args),
        VaultInstruction::RefundExpired(args) => process_refund_expired(program_id, accounts, args),
    }
}

/// Move lamports out of a program-owned account.
fn move_lamports(from: &AccountInfo, to: &AccountInfo, amount: u64) -> ProgramResult {
    let from_balance = from
        .lamports()
        .checked_sub(amount)
        .ok_or(VaultError::ArithmeticOverflow)?;
    let to_balance = to
        .lamports()
        .checked_add(amount)
        .ok_or(VaultError::ArithmeticOverflow)?;

    **from.try_borrow_mut_lamports()? = from_balance;
    **to.try_borrow_mut_lamports()? = to_balance;
    Ok(())
}

/// Process CreatePrivateDeposit instruction
/// Allocates the deposit PDA, funds it and writes the record
pub fn process_create_private_deposit(
    program_id: &Pubkey,
    accounts: &[AccountInfo],
    args: CreatePrivateDepositArgs,
) -> ProgramResult {
    const OP: &str = "CreatePrivateDeposit";
    let account_info_iter = &mut accounts.iter();

    // Expected accounts:
    // 0. [signer, writable] Depositor
    // 1. [writable] Deposit account (PDA)
    // 2. [] System program
    let depositor_info = next_account_info(account_info_iter)?;
    let deposit_info = next_account_info(account_info_iter)?;
    let system_program_info = next_account_info(account_info_iter)?;

    verify_signer(depositor_info).map_err(|e| {
        msg!("{}: Depositor must be signer", OP);
        e
    })?;
    verify_writable(depositor_info)?;
    verify_writable(deposit_info)?;
    verify_system_program(system_program_info)?;

    let (deposit_pda, bump) = derive_deposit_pda(program_id, depositor_info.key, args.deposit_id);
    if deposit_pda != *deposit_info.key {
        msg!(
            "{}: Deposit PDA mismatch. Expected: {}, Got: {}",
            OP,
            deposit_pda,
            deposit_info.key
        );
        return Err(VaultError::Unauthorized.into());
    }

    verify_uninitialized_account(deposit_info).map_err(|e| {
        msg!("{}: Deposit {} already exists", OP, deposit_info.key);
        e
    })?;

    let rent = Rent::get()?;
    let reserve = rent.minimum_balance(Deposit::LEN);
    let minimum = Deposit::minimum_amount(&rent)?;
    if args.amount < minimum {
        msg!("{}: Amount {} below minimum {}", OP, args.amount, minimum);
        return Err(VaultError::AmountTooSmall.into());
    }

    let now = Clock::get()?.unix_timestamp;
    if args.expires_at < 0 || (args.expires_at != 0 && args.expires_at <= now) {
        msg!("{}: Expiration {} is not in the future (now {})", OP, args.expires_at, now);
        return Err(VaultError::InvalidExpiration.into());
    }

    // Lamports already sitting at the address count toward the reserve
    let reserve_due = reserve.saturating_sub(deposit_info.lamports());
    let required = reserve_due
        .checked_add(args.amount)
        .ok_or(VaultError::ArithmeticOverflow)?;
    if depositor_info.lamports() < required {
        msg!(
            "{}: Insufficient lamports. Required: {}, Available: {}",
            OP,
            required,
            depositor_info.lamports()
        );
        return Err(VaultError::InsufficientFunds.into());
    }

    let deposit_id_bytes = args.deposit_id.to_le_bytes();
    let deposit_seeds: &[&[u8]] = &[
        DEPOSIT_SEED,
        depositor_info.key.as_ref(),
        &deposit_id_bytes,
        &[bump],
    ];

    if deposit_info.lamports() == 0 {
        invoke_signed(
            &system_instruction::create_account(
                depositor_info.key,
                deposit_info.key,
                reserve,
                Deposit::LEN as u64,
                program_id,
            ),
            &[
                depositor_info.clone(),
                deposit_info.clone(),
                system_program_info.clone(),
            ],
            &[deposit_seeds],
        )
        .map_err(|e| {
            msg!("{}: Failed to create deposit account: {}", OP, e);
            e
        })?;
    } else {
        // create_account refuses addresses holding lamports
        if reserve_due > 0 {
            invoke(
                &system_instruction::transfer(depositor_info.key, deposit_info.key, reserve_due),
                &[
                    depositor_info.clone(),
                    deposit_info.clone(),
                    system_program_info.clone(),
                ],
            )?;
        }
        invoke_signed(
            &system_instruction::allocate(deposit_info.key, Deposit::LEN as u64),
            &[deposit_info.clone(), system_program_info.clone()],
            &[deposit_seeds],
        )?;
        invoke_signed(
            &system_instruction::assign(deposit_info.key, program_id),
            &[deposit_info.clone(), system_program_info.clone()],
            &[deposit_seeds],
        )
        .map_err(|e| {
            msg!("{}: Failed to assign pre-funded deposit account: {}", OP, e);
            e
        })?;
    }

    invoke(
        &system_instruction::transfer(depositor_info.key, deposit_info.key, args.amount),
        &[
            depositor_info.clone(),
            deposit_info.clone(),
            system_program_info.clone(),
        ],
    )
    .map_err(|e| {
        msg!("{}: Funding transfer failed: {}", OP, e);
        e
    })?;

    let deposit = Deposit::new(
        *depositor_info.key,
        args.claim_hash,
        args.amount,
        bump,
        now,
        args.expires_at,
    );
    let mut deposit_data = deposit_info.try_borrow_mut_data()?;
    deposit.pack_into(&mut deposit_data[..])?;

    msg!(
        "Deposit created. Depositor: {}, Deposit: {}, Id: {}, Amount: {}, Expires at: {}",
        depositor_info.key,
        deposit_info.key,
        args.deposit_id,
        args.amount,
        args.expires_at
    );

    Ok(())
}

/// Process ClaimDeposit instruction
/// Pays the escrowed amount to the signer holding the secret
pub fn process_claim_deposit(
    program_id: &Pubkey,
    accounts: &[AccountInfo],
    args: ClaimDepositArgs,
) -> ProgramResult {
    const OP: &str = "ClaimDeposit";
    let account_info_iter = &mut accounts.iter();

    // Expected accounts:
    // 0. [signer, writable] Claimer
    // 1. [writable] Deposit account
    // 2. [] System program
    let claimer_info = next_account_info(account_info_iter)?;
    let deposit_info = next_account_info(account_info_iter)?;
    let system_program_info = next_account_info(account_info_iter)?;

    verify_signer(claimer_info).map_err(|e| {
        msg!("{}: Claimer must be signer", OP);
        e
    })?;
    verify_writable(claimer_info)?;
    verify_writable(deposit_info)?;
    verify_system_program(system_program_info)?;

    let mut deposit = load_deposit(deposit_info, program_id).map_err(|e| {
        msg!("{}: No deposit at {}", OP, deposit_info.key);
        e
    })?;

    verify_deposit_pda(
        program_id,
        deposit_info.key,
        &deposit.depositor,
        args.deposit_id,
        deposit.bump,
    )
    .map_err(|e| {
        msg!("{}: Deposit id {} does not match {}", OP, args.deposit_id, deposit_info.key);
        e
    })?;

    let now = Clock::get()?.unix_timestamp;
    deposit.ensure_claimable(now).map_err(|e| {
        msg!("{}: Deposit {} not claimable: {}", OP, deposit_info.key, e);
        ProgramError::from(e)
    })?;

    if !secret_matches(&args.secret, &deposit.claim_hash) {
        msg!("{}: Secret does not match claim hash of {}", OP, deposit_info.key);
        return Err(VaultError::InvalidSecret.into());
    }

    deposit.settle()?;
    move_lamports(deposit_info, claimer_info, deposit.amount)?;

    let mut deposit_data = deposit_info.try_borrow_mut_data()?;
    deposit.pack_into(&mut deposit_data[..])?;

    msg!(
        "Deposit claimed. Deposit: {}, Claimer: {}, Amount: {}",
        deposit_info.key,
        claimer_info.key,
        deposit.amount
    );

    Ok(())
}

/// Process RefundExpired instruction
/// Returns the escrowed amount to its depositor once expired
pub fn process_refund_expired(
    program_id: &Pubkey,
    accounts: &[AccountInfo],
    args: RefundExpiredArgs,
) -> ProgramResult {
    const OP: &str = "RefundExpired";
    let account_info_iter = &mut accounts.iter();

    // Expected accounts:
    // 0. [signer, writable] Depositor
    // 1. [writable] Deposit account
    // 2. [] System program
    let depositor_info = next_account_info(account_info_iter)?;
    let deposit_info = next_account_info(account_info_iter)?;
    let system_program_info = next_account_info(account_info_iter)?;

    verify_signer(depositor_info).map_err(|e| {
        msg!("{}: Depositor must be signer", OP);
        e
    })?;
    verify_writable(depositor_info)?;
    verify_writable(deposit_info)?;
    verify_system_program(system_program_info)?;

    let mut deposit = load_deposit(deposit_info, program_id).map_err(|e| {
        msg!("{}: No deposit at {}", OP, deposit_info.key);
        e
    })?;

    let (expected_pda, _) = derive_deposit_pda(program_id, depositor_info.key, args.deposit_id);
    if expected_pda != *deposit_info.key || deposit.depositor != *depositor_info.key {
        msg!(
            "{}: Signer {} is not the depositor of {}",
            OP,
            depositor_info.key,
            deposit_info.key
        );
        return Err(VaultError::Unauthorized.into());
    }

    let now = Clock::get()?.unix_timestamp;
    deposit.ensure_refundable(now).map_err(|e| {
        msg!(
            "{}: Deposit {} not refundable at {} (expires at {}): {}",
            OP,
            deposit_info.key,
            now,
            deposit.expires_at,
            e
        );
        ProgramError::from(e)
    })?;

    deposit.settle()?;
    move_lamports(deposit_info, depositor_info, deposit.amount)?;

    let mut deposit_data = deposit_info.try_borrow_mut_data()?;
    deposit.pack_into(&mut deposit_data[..])?;

    msg!(
        "Deposit refunded. Deposit: {}, Depositor: {}, Amount: {}",
        deposit_info.key,
        depositor_info.key,
        deposit.amount
    );

    Ok(())
}
