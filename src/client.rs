//! Off-chain helpers for wallets and front ends.
//!
//! Nothing here runs inside the program. These are the values a client
//! sends to, or reads back from, a JSON-RPC endpoint: magic link codes,
//! decoded deposit accounts, `getProgramAccounts` filters and the endpoint
//! itself.

use base64::{
    engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD},
    Engine as _,
};
use solana_program::pubkey::Pubkey;
use std::str::FromStr;
use thiserror::Error;

use crate::{state::Deposit, utils::DEPOSIT_SEED};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    #[error("link is not valid base64url")]
    InvalidEncoding,

    #[error("link payload is not UTF-8")]
    InvalidUtf8,

    #[error("link must have the form deposit_id:depositor:secret")]
    MalformedLink,

    #[error("invalid deposit id: {0}")]
    InvalidDepositId(String),

    #[error("invalid depositor address: {0}")]
    InvalidDepositor(String),

    #[error("account data is not a deposit record")]
    InvalidAccountData,
}

/// Everything a claimer needs, shared out of band as a single token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MagicLink {
    pub deposit_id: u64,
    pub depositor: Pubkey,
    pub secret: String,
}

impl MagicLink {
    pub fn new(deposit_id: u64, depositor: Pubkey, secret: impl Into<String>) -> Self {
        Self {
            deposit_id,
            depositor,
            secret: secret.into(),
        }
    }

    /// Unpadded base64url of `deposit_id:depositor:secret`.
    pub fn encode(&self) -> String {
        let payload = format!("{}:{}:{}", self.deposit_id, self.depositor, self.secret);
        URL_SAFE_NO_PAD.encode(payload.as_bytes())
    }

    /// Parse a link code. Trailing `=` padding is tolerated and the secret
    /// keeps any `:` it contains.
    pub fn decode(code: &str) -> Result<Self, ClientError> {
        let raw = URL_SAFE_NO_PAD
            .decode(code.trim().trim_end_matches('='))
            .map_err(|_| ClientError::InvalidEncoding)?;
        let payload = String::from_utf8(raw).map_err(|_| ClientError::InvalidUtf8)?;

        let mut parts = payload.splitn(3, ':');
        let (Some(id), Some(depositor), Some(secret)) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(ClientError::MalformedLink);
        };
        if secret.is_empty() {
            return Err(ClientError::MalformedLink);
        }

        let deposit_id = id
            .parse::<u64>()
            .map_err(|_| ClientError::InvalidDepositId(id.to_string()))?;
        let depositor = Pubkey::from_str(depositor)
            .map_err(|_| ClientError::InvalidDepositor(depositor.to_string()))?;

        Ok(Self::new(deposit_id, depositor, secret))
    }

    pub fn deposit_address(&self, program_id: &Pubkey) -> Pubkey {
        crate::utils::derive_deposit_pda(program_id, &self.depositor, self.deposit_id).0
    }
}

/// Decode raw account bytes returned by `getAccountInfo`.
pub fn decode_deposit_account(data: &[u8]) -> Result<Deposit, ClientError> {
    Deposit::unpack(data).map_err(|_| ClientError::InvalidAccountData)
}

/// Decode the base64 `data[0]` field of an RPC account payload.
pub fn decode_base64_account(data: &str) -> Result<Deposit, ClientError> {
    let raw = STANDARD
        .decode(data.trim())
        .map_err(|_| ClientError::InvalidEncoding)?;
    decode_deposit_account(&raw)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DepositStatus {
    Active,
    Claimed,
    Expired,
}

impl DepositStatus {
    /// Status as seen at unix time `now`. A settled deposit reports
    /// `Claimed` whether it was claimed or refunded.
    pub fn classify(deposit: &Deposit, now: i64) -> Self {
        if deposit.claimed {
            DepositStatus::Claimed
        } else if deposit.is_expired(now) {
            DepositStatus::Expired
        } else {
            DepositStatus::Active
        }
    }
}

/// Byte offset of the depositor field, for `getProgramAccounts` memcmp.
pub const DEPOSITOR_OFFSET: usize = Deposit::DEPOSITOR_OFFSET;

/// A `memcmp` filter: match `bytes` (base58) at `offset`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemcmpFilter {
    pub offset: usize,
    pub bytes: String,
}

/// Filter selecting every deposit funded by `depositor`.
pub fn depositor_filter(depositor: &Pubkey) -> MemcmpFilter {
    MemcmpFilter {
        offset: DEPOSITOR_OFFSET,
        bytes: depositor.to_string(),
    }
}

/// Filter on account size, pairs with [`depositor_filter`].
pub const DEPOSIT_DATA_SIZE: usize = Deposit::LEN;

/// Recover the deposit id of a listed deposit.
///
/// The id is not stored, but clients use a millisecond timestamp taken just
/// before submission, so it sits close to `created_at * 1000`. Candidates
/// are tried outward from there (`+n`, then `-n`) up to `window_ms`, using
/// the stored bump so each try costs one hash.
pub fn recover_deposit_id(
    program_id: &Pubkey,
    deposit: &Deposit,
    deposit_address: &Pubkey,
    window_ms: u64,
) -> Option<u64> {
    let base = u64::try_from(deposit.created_at).ok()?.checked_mul(1000)?;

    let matches = |candidate: u64| {
        Pubkey::create_program_address(
            &[
                DEPOSIT_SEED,
                deposit.depositor.as_ref(),
                &candidate.to_le_bytes(),
                &[deposit.bump],
            ],
            program_id,
        )
        .map(|address| address == *deposit_address)
        .unwrap_or(false)
    };

    for offset in 0..=window_ms {
        if let Some(candidate) = base.checked_add(offset) {
            if matches(candidate) {
                return Some(candidate);
            }
        }
        if offset > 0 {
            if let Some(candidate) = base.checked_sub(offset) {
                if matches(candidate) {
                    return Some(candidate);
                }
            }
        }
    }
    None
}

/// `expires_at` for a deposit lasting `seconds` from `now`; 0 never expires.
pub fn expires_at_after(now: i64, seconds: u64) -> i64 {
    if seconds == 0 {
        return 0;
    }
    i64::try_from(seconds)
        .ok()
        .and_then(|s| now.checked_add(s))
        .unwrap_or(i64::MAX)
}

pub const PUBLIC_DEVNET_RPC: &str = "https://api.devnet.solana.com";
pub const QUICKNODE_RPC_ENV: &str = "PRIVYLINK_QUICKNODE_RPC";
pub const RPC_URL_ENV: &str = "PRIVYLINK_RPC_URL";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RpcProvider {
    QuickNode,
    Helius,
    Public,
}

impl RpcProvider {
    pub fn display_name(&self) -> &'static str {
        match self {
            RpcProvider::QuickNode => "QuickNode",
            RpcProvider::Helius => "Helius",
            RpcProvider::Public => "Public Devnet",
        }
    }
}

/// JSON-RPC endpoint selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RpcConfig {
    pub endpoint: String,
    pub provider: RpcProvider,
}

impl RpcConfig {
    /// Read [`QUICKNODE_RPC_ENV`] and [`RPC_URL_ENV`].
    pub fn from_env() -> Self {
        Self::resolve(
            std::env::var(QUICKNODE_RPC_ENV).ok().as_deref(),
            std::env::var(RPC_URL_ENV).ok().as_deref(),
        )
    }

    /// QuickNode if set and non-blank, then the configured URL unless it is
    /// still the `YOUR_` placeholder, then public devnet.
    pub fn resolve(quicknode: Option<&str>, rpc_url: Option<&str>) -> Self {
        if let Some(url) = quicknode.map(str::trim).filter(|url| !url.is_empty()) {
            return Self {
                endpoint: url.to_string(),
                provider: RpcProvider::QuickNode,
            };
        }
        if let Some(url) = rpc_url
            .map(str::trim)
            .filter(|url| !url.is_empty() && !url.contains("YOUR_"))
        {
            return Self {
                endpoint: url.to_string(),
                provider: RpcProvider::Helius,
            };
        }
        Self {
            endpoint: PUBLIC_DEVNET_RPC.to_string(),
            provider: RpcProvider::Public,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::{derive_deposit_pda, hash_secret};

    #[test]
    fn test_magic_link_round_trip() {
        let depositor = Pubkey::new_unique();
        let link = MagicLink::new(1_700_000_000_123, depositor, "horse-battery");
        let code = link.encode();

        assert!(!code.contains('='));
        assert!(!code.contains('+'));
        assert!(!code.contains('/'));
        assert_eq!(MagicLink::decode(&code).unwrap(), link);
    }

    #[test]
    fn test_magic_link_known_encoding() {
        let depositor = Pubkey::from_str("98WwJxc1aAeqGWuaouQntJYmdQEnELntf9BqKXD3o34W").unwrap();
        let link = MagicLink::new(42, depositor, "s");
        let expected = URL_SAFE_NO_PAD
            .encode("42:98WwJxc1aAeqGWuaouQntJYmdQEnELntf9BqKXD3o34W:s".as_bytes());
        assert_eq!(link.encode(), expected);
    }

    #[test]
    fn test_magic_link_accepts_padding_and_colons() {
        let depositor = Pubkey::new_unique();
        let payload = format!("7:{}:a:b:c", depositor);
        let padded = base64::engine::general_purpose::URL_SAFE.encode(payload.as_bytes());

        let link = MagicLink::decode(&padded).unwrap();
        assert_eq!(link.deposit_id, 7);
        assert_eq!(link.depositor, depositor);
        assert_eq!(link.secret, "a:b:c");
    }

    #[test]
    fn test_magic_link_rejects_garbage() {
        assert_eq!(MagicLink::decode("!!!"), Err(ClientError::InvalidEncoding));

        let missing = URL_SAFE_NO_PAD.encode(b"12:only-two");
        assert_eq!(MagicLink::decode(&missing), Err(ClientError::MalformedLink));

        let bad_id = URL_SAFE_NO_PAD.encode(format!("abc:{}:s", Pubkey::new_unique()));
        assert!(matches!(
            MagicLink::decode(&bad_id),
            Err(ClientError::InvalidDepositId(_))
        ));

        let bad_key = URL_SAFE_NO_PAD.encode(b"12:not-a-key:s");
        assert!(matches!(
            MagicLink::decode(&bad_key),
            Err(ClientError::InvalidDepositor(_))
        ));
    }

    #[test]
    fn test_decode_base64_account() {
        let deposit = Deposit::new(
            Pubkey::new_unique(),
            hash_secret("horse-battery"),
            10_000_000,
            253,
            1_700_000_000,
            0,
        );
        let mut data = vec![0u8; Deposit::LEN];
        deposit.pack_into(&mut data).unwrap();

        assert_eq!(decode_base64_account(&STANDARD.encode(&data)).unwrap(), deposit);
        assert_eq!(
            decode_deposit_account(&data[..40]),
            Err(ClientError::InvalidAccountData)
        );
    }

    #[test]
    fn test_status_classification() {
        let mut deposit = Deposit::new(Pubkey::new_unique(), [0u8; 32], 1, 255, 100, 200);
        assert_eq!(DepositStatus::classify(&deposit, 199), DepositStatus::Active);
        assert_eq!(DepositStatus::classify(&deposit, 200), DepositStatus::Expired);
        deposit.claimed = true;
        assert_eq!(DepositStatus::classify(&deposit, 150), DepositStatus::Claimed);
    }

    #[test]
    fn test_depositor_filter() {
        let depositor = Pubkey::new_unique();
        let filter = depositor_filter(&depositor);
        assert_eq!(filter.offset, 8);
        assert_eq!(filter.bytes, depositor.to_string());
    }

    #[test]
    fn test_recover_deposit_id() {
        let program_id = crate::id();
        let depositor = Pubkey::new_unique();
        let created_at = 1_700_000_000;

        for deposit_id in [created_at as u64 * 1000 + 137, created_at as u64 * 1000 - 58] {
            let (address, bump) = derive_deposit_pda(&program_id, &depositor, deposit_id);
            let deposit = Deposit::new(depositor, [0u8; 32], 1, bump, created_at, 0);

            assert_eq!(
                recover_deposit_id(&program_id, &deposit, &address, 500),
                Some(deposit_id)
            );
            assert_eq!(recover_deposit_id(&program_id, &deposit, &address, 10), None);
        }
    }

    #[test]
    fn test_expires_at_after() {
        assert_eq!(expires_at_after(1_000, 0), 0);
        assert_eq!(expires_at_after(1_000, 3_600), 4_600);
        assert_eq!(expires_at_after(i64::MAX - 1, 3_600), i64::MAX);
    }

    #[test]
    fn test_rpc_config_resolution() {
        let config = RpcConfig::resolve(Some("https://qn.example"), Some("https://h.example"));
        assert_eq!(config.provider, RpcProvider::QuickNode);
        assert_eq!(config.endpoint, "https://qn.example");

        let config = RpcConfig::resolve(Some("   "), Some("https://h.example"));
        assert_eq!(config.provider, RpcProvider::Helius);

        let config = RpcConfig::resolve(None, Some("https://rpc.helius.xyz/?api-key=YOUR_KEY"));
        assert_eq!(config.provider, RpcProvider::Public);
        assert_eq!(config.endpoint, PUBLIC_DEVNET_RPC);
        assert_eq!(config.provider.display_name(), "Public Devnet");
    }
}
