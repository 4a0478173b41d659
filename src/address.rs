//! CodeChain addresses.
//!
//! Both address kinds are bech32 strings without a separator: a three
//! character prefix (`c` or `t` for the network, `c`, then `c` for platform
//! accounts or `a` for asset owners) followed by the 5-bit encoded payload
//! and a six character checksum over prefix and payload.
//!
//! - Platform: `[version, account id (20 bytes)]`
//! - Asset: `[version, type, 32 bytes]`, where type `0` carries a lock script
//!   hash and type `1` a public key locked by the standard script.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Hash of the standard pay-to-public-key lock script
pub const STANDARD_LOCK_SCRIPT_HASH: [u8; 32] = [
    0xf4, 0x2a, 0x65, 0xea, 0x51, 0x8b, 0xa2, 0x36, 0xc0, 0x8b, 0x26, 0x1c, 0x34, 0xaf, 0x05, 0x21,
    0xfa, 0x3c, 0xd1, 0xaa, 0x50, 0x5e, 0x1c, 0x18, 0x98, 0x09, 0x19, 0xcb, 0x89, 0x45, 0xf8, 0xf3,
];

pub const ACCOUNT_ID_LEN: usize = 20;

const VERSION: u8 = 0;
const PREFIX_LEN: usize = 3;
const CHECKSUM_LEN: usize = 6;
const CHARSET: &[u8; 32] = b"qpzry9x8gf2tvdw0s3jn54khce6mua7l";
const GENERATOR: [u32; 5] = [0x3b6a57b2, 0x26508e6d, 0x1ea119fa, 0x3d4233dd, 0x2a1462b3];

const ASSET_TYPE_LOCK_SCRIPT_HASH: u8 = 0;
const ASSET_TYPE_STANDARD_PUBKEY: u8 = 1;
const ASSET_PAYLOAD_LEN: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    #[error("address: invalid length {0}")]
    InvalidLength(usize),

    #[error("address: invalid character '{0}'")]
    InvalidChar(char),

    #[error("address: invalid checksum")]
    InvalidChecksum,

    #[error("address: invalid padding")]
    InvalidPadding,

    #[error("address: expected a {expected} address but got prefix {found}")]
    InvalidPrefix { expected: &'static str, found: String },

    #[error("address: unsupported version {0}")]
    InvalidVersion(u8),

    #[error("address: unknown asset address type {0}")]
    InvalidType(u8),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Network {
    Mainnet,
    Testnet,
}

impl Network {
    fn from_char(c: char) -> Option<Self> {
        match c {
            'c' => Some(Network::Mainnet),
            't' => Some(Network::Testnet),
            _ => None,
        }
    }

    fn prefix(self, kind: char) -> String {
        let network = match self {
            Network::Mainnet => 'c',
            Network::Testnet => 't',
        };
        format!("{network}c{kind}")
    }
}

/// Address of a platform account (holds CCC, signs parcels)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformAddress {
    pub network: Network,
    pub account_id: [u8; ACCOUNT_ID_LEN],
}

impl PlatformAddress {
    pub fn new(network: Network, account_id: [u8; ACCOUNT_ID_LEN]) -> Self {
        Self { network, account_id }
    }

    /// Account id as lowercase hex without `0x`, the form the source is queried with
    pub fn account_id_hex(&self) -> String {
        hex::encode(self.account_id)
    }
}

impl FromStr for PlatformAddress {
    type Err = AddressError;

    fn from_str(address: &str) -> Result<Self, Self::Err> {
        let (network, payload) = decode(address, 'c', "platform")?;
        if payload.len() != 1 + ACCOUNT_ID_LEN {
            return Err(AddressError::InvalidLength(payload.len()));
        }
        if payload[0] != VERSION {
            return Err(AddressError::InvalidVersion(payload[0]));
        }

        let mut account_id = [0u8; ACCOUNT_ID_LEN];
        account_id.copy_from_slice(&payload[1..]);
        Ok(Self { network, account_id })
    }
}

impl fmt::Display for PlatformAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut payload = Vec::with_capacity(1 + ACCOUNT_ID_LEN);
        payload.push(VERSION);
        payload.extend_from_slice(&self.account_id);
        f.write_str(&encode(&self.network.prefix('c'), &payload))
    }
}

/// Address an asset output is locked to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetAddress {
    pub network: Network,
    pub lock_script_hash: [u8; 32],
    pub parameters: Vec<Vec<u8>>,
}

impl AssetAddress {
    /// An output spendable by the holder of `pubkey` through the standard script
    pub fn standard(network: Network, pubkey: [u8; ASSET_PAYLOAD_LEN]) -> Self {
        Self {
            network,
            lock_script_hash: STANDARD_LOCK_SCRIPT_HASH,
            parameters: vec![pubkey.to_vec()],
        }
    }

    pub fn from_lock_script_hash(network: Network, lock_script_hash: [u8; 32]) -> Self {
        Self {
            network,
            lock_script_hash,
            parameters: Vec::new(),
        }
    }

    /// The public key of a standard-script address, as lowercase hex.
    ///
    /// # Returns
    /// `None` for any other lock script: only standard outputs are indexed by key.
    pub fn standard_pubkey_hex(&self) -> Option<String> {
        if self.lock_script_hash != STANDARD_LOCK_SCRIPT_HASH {
            return None;
        }
        self.parameters.first().map(hex::encode)
    }
}

impl FromStr for AssetAddress {
    type Err = AddressError;

    fn from_str(address: &str) -> Result<Self, Self::Err> {
        let (network, payload) = decode(address, 'a', "asset")?;
        if payload.len() != 2 + ASSET_PAYLOAD_LEN {
            return Err(AddressError::InvalidLength(payload.len()));
        }
        if payload[0] != VERSION {
            return Err(AddressError::InvalidVersion(payload[0]));
        }

        let mut body = [0u8; ASSET_PAYLOAD_LEN];
        body.copy_from_slice(&payload[2..]);
        match payload[1] {
            ASSET_TYPE_LOCK_SCRIPT_HASH => Ok(Self::from_lock_script_hash(network, body)),
            ASSET_TYPE_STANDARD_PUBKEY => Ok(Self::standard(network, body)),
            other => Err(AddressError::InvalidType(other)),
        }
    }
}

impl fmt::Display for AssetAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut payload = Vec::with_capacity(2 + ASSET_PAYLOAD_LEN);
        payload.push(VERSION);
        match self.parameters.first() {
            Some(pubkey) if self.lock_script_hash == STANDARD_LOCK_SCRIPT_HASH => {
                payload.push(ASSET_TYPE_STANDARD_PUBKEY);
                payload.extend_from_slice(pubkey);
            }
            _ => {
                payload.push(ASSET_TYPE_LOCK_SCRIPT_HASH);
                payload.extend_from_slice(&self.lock_script_hash);
            }
        }
        f.write_str(&encode(&self.network.prefix('a'), &payload))
    }
}

/// Split an address into network and payload bytes, checking prefix and checksum.
fn decode(
    address: &str,
    kind: char,
    expected: &'static str,
) -> Result<(Network, Vec<u8>), AddressError> {
    if let Some(c) = address.chars().find(|c| !c.is_ascii()) {
        return Err(AddressError::InvalidChar(c));
    }
    if address.len() <= PREFIX_LEN + CHECKSUM_LEN {
        return Err(AddressError::InvalidLength(address.len()));
    }

    let address = address.to_ascii_lowercase();
    let (prefix, data) = address.split_at(PREFIX_LEN);
    let mut chars = prefix.chars();
    let network = match (chars.next().and_then(Network::from_char), chars.next(), chars.next()) {
        (Some(network), Some('c'), Some(k)) if k == kind => network,
        _ => {
            return Err(AddressError::InvalidPrefix {
                expected,
                found: prefix.to_string(),
            });
        }
    };

    let words = data
        .chars()
        .map(|c| {
            CHARSET
                .iter()
                .position(|&b| char::from(b) == c)
                .map(|i| i as u8)
                .ok_or(AddressError::InvalidChar(c))
        })
        .collect::<Result<Vec<u8>, _>>()?;

    let mut values = expand_prefix(prefix);
    values.extend_from_slice(&words);
    if polymod(&values) != 1 {
        return Err(AddressError::InvalidChecksum);
    }

    let payload = convert_bits(&words[..words.len() - CHECKSUM_LEN], 5, 8, false)?;
    Ok((network, payload))
}

fn encode(prefix: &str, payload: &[u8]) -> String {
    // 8-to-5 conversion with padding cannot fail.
    let words = convert_bits(payload, 8, 5, true).unwrap_or_default();

    let mut values = expand_prefix(prefix);
    values.extend_from_slice(&words);
    values.extend_from_slice(&[0; CHECKSUM_LEN]);
    let checksum = polymod(&values) ^ 1;

    let mut address = String::with_capacity(prefix.len() + words.len() + CHECKSUM_LEN);
    address.push_str(prefix);
    for word in words {
        address.push(char::from(CHARSET[usize::from(word)]));
    }
    for i in 0..CHECKSUM_LEN {
        let word = (checksum >> (5 * (CHECKSUM_LEN - 1 - i))) & 31;
        address.push(char::from(CHARSET[word as usize]));
    }
    address
}

fn expand_prefix(prefix: &str) -> Vec<u8> {
    let bytes = prefix.as_bytes();
    let mut values = Vec::with_capacity(bytes.len() * 2 + 1);
    values.extend(bytes.iter().map(|b| b >> 5));
    values.push(0);
    values.extend(bytes.iter().map(|b| b & 31));
    values
}

fn polymod(values: &[u8]) -> u32 {
    let mut checksum: u32 = 1;
    for &value in values {
        let top = checksum >> 25;
        checksum = ((checksum & 0x1ff_ffff) << 5) ^ u32::from(value);
        for (i, generator) in GENERATOR.iter().enumerate() {
            if (top >> i) & 1 == 1 {
                checksum ^= generator;
            }
        }
    }
    checksum
}

/// Regroup a bit stream from `from`-bit to `to`-bit values
fn convert_bits(data: &[u8], from: u32, to: u32, pad: bool) -> Result<Vec<u8>, AddressError> {
    let mut acc: u32 = 0;
    let mut bits: u32 = 0;
    let max_value: u32 = (1 << to) - 1;
    let max_acc: u32 = (1 << (from + to - 1)) - 1;
    let mut out = Vec::with_capacity(data.len() * from as usize / to as usize + 1);

    for &value in data {
        acc = ((acc << from) | u32::from(value)) & max_acc;
        bits += from;
        while bits >= to {
            bits -= to;
            out.push(((acc >> bits) & max_value) as u8);
        }
    }

    if pad {
        if bits > 0 {
            out.push(((acc << (to - bits)) & max_value) as u8);
        }
    } else if bits >= from || ((acc << (to - bits)) & max_value) != 0 {
        return Err(AddressError::InvalidPadding);
    }
    Ok(out)
}
