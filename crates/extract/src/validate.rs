//! Checksum and structural validation for extracted identifiers. Matches
//! that fail here are discarded, never emitted.

use sha2::{Digest, Sha256};
use sha3::Keccak256;

/// ISO 7064 mod 97-10 over a string where letters expand to 10..35.
/// Shared by IBAN (after rearrangement) and LEI.
fn mod97(s: &str) -> Option<u32> {
    let mut r: u32 = 0;
    for c in s.chars() {
        let (val, scale) = match c {
            '0'..='9' => (c as u32 - '0' as u32, 10),
            'A'..='Z' => (c as u32 - 'A' as u32 + 10, 100),
            _ => return None,
        };
        r = (r * scale + val) % 97;
    }
    Some(r)
}

/// IBAN: uppercase, spaces stripped by the caller. Country code + 2 check
/// digits + BBAN, first four chars moved to the end before mod 97.
pub fn iban(s: &str) -> bool {
    if s.len() < 15 || s.len() > 34 {
        return false;
    }
    let bytes = s.as_bytes();
    if !bytes[0].is_ascii_uppercase() || !bytes[1].is_ascii_uppercase() {
        return false;
    }
    if !bytes[2].is_ascii_digit() || !bytes[3].is_ascii_digit() {
        return false;
    }
    let rearranged = format!("{}{}", &s[4..], &s[..4]);
    mod97(&rearranged) == Some(1)
}

/// LEI: 20 uppercase alphanumerics, ISO 7064 check over the whole string.
pub fn lei(s: &str) -> bool {
    s.len() == 20
        && s.bytes()
            .all(|b| b.is_ascii_digit() || b.is_ascii_uppercase())
        && mod97(s) == Some(1)
}

/// Luhn over a decimal digit string (check digit included).
pub fn luhn(digits: &str) -> bool {
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return false;
    }
    let mut sum = 0u32;
    for (i, b) in digits.bytes().rev().enumerate() {
        let mut d = (b - b'0') as u32;
        if i % 2 == 1 {
            d *= 2;
            if d > 9 {
                d -= 9;
            }
        }
        sum += d;
    }
    sum % 10 == 0
}

/// ISIN: 2 letters + 9 alphanumerics + check digit; letters expand to
/// digits, then Luhn.
pub fn isin(s: &str) -> bool {
    if s.len() != 12 {
        return false;
    }
    let mut expanded = String::with_capacity(24);
    for c in s.chars() {
        match c {
            '0'..='9' => expanded.push(c),
            'A'..='Z' => expanded.push_str(&(c as u32 - 'A' as u32 + 10).to_string()),
            _ => return false,
        }
    }
    luhn(&expanded)
}

/// SIREN: 9 digits, Luhn.
pub fn siren(s: &str) -> bool {
    s.len() == 9 && luhn(s)
}

/// IMO number: 7 digits, weighted check (weights 7..2 over the first six).
pub fn imo(digits: &str) -> bool {
    if digits.len() != 7 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return false;
    }
    let d: Vec<u32> = digits.bytes().map(|b| (b - b'0') as u32).collect();
    let sum: u32 = d[..6]
        .iter()
        .zip([7u32, 6, 5, 4, 3, 2])
        .map(|(digit, weight)| digit * weight)
        .sum();
    sum % 10 == d[6]
}

/// Base58Check with the Bitcoin alphabet: 4-byte double-SHA256 checksum.
pub fn base58check(s: &str) -> bool {
    base58check_with(s, bs58::Alphabet::BITCOIN)
}

/// Base58Check with the Ripple alphabet (XRP classic addresses).
pub fn base58check_ripple(s: &str) -> bool {
    base58check_with(s, bs58::Alphabet::RIPPLE)
}

fn base58check_with(s: &str, alphabet: &bs58::Alphabet) -> bool {
    let Ok(decoded) = bs58::decode(s).with_alphabet(alphabet).into_vec() else {
        return false;
    };
    if decoded.len() < 5 {
        return false;
    }
    let (payload, checksum) = decoded.split_at(decoded.len() - 4);
    let digest = Sha256::digest(Sha256::digest(payload));
    digest[..4] == *checksum
}

const BECH32_CHARSET: &[u8] = b"qpzry9x8gf2tvdw0s3jn54khce6mua7l";
const BECH32M_CONST: u32 = 0x2bc8_30a3;

fn bech32_polymod(values: &[u8]) -> u32 {
    const GEN: [u32; 5] = [0x3b6a_57b2, 0x2650_8e6d, 0x1ea1_19fa, 0x3d42_33dd, 0x2a14_62b3];
    let mut chk: u32 = 1;
    for &v in values {
        let b = chk >> 25;
        chk = ((chk & 0x01ff_ffff) << 5) ^ (v as u32);
        for (i, g) in GEN.iter().enumerate() {
            if (b >> i) & 1 == 1 {
                chk ^= g;
            }
        }
    }
    chk
}

/// Segwit address checksum (BIP-173 bech32 and BIP-350 bech32m both
/// accepted). `expected_hrp` pins the human-readable part (`bc` for
/// Bitcoin, `ltc` for Litecoin).
pub fn bech32(addr: &str, expected_hrp: &str) -> bool {
    // Mixed case is invalid per BIP-173.
    if addr.bytes().any(|b| b.is_ascii_uppercase()) && addr.bytes().any(|b| b.is_ascii_lowercase())
    {
        return false;
    }
    let addr = addr.to_ascii_lowercase();
    let Some(sep) = addr.rfind('1') else {
        return false;
    };
    let (hrp, data) = (&addr[..sep], &addr[sep + 1..]);
    if hrp != expected_hrp || data.len() < 6 {
        return false;
    }

    let mut values: Vec<u8> = Vec::with_capacity(hrp.len() * 2 + 1 + data.len());
    for b in hrp.bytes() {
        values.push(b >> 5);
    }
    values.push(0);
    for b in hrp.bytes() {
        values.push(b & 0x1f);
    }
    for b in data.bytes() {
        let Some(pos) = BECH32_CHARSET.iter().position(|&c| c == b) else {
            return false;
        };
        values.push(pos as u8);
    }

    let chk = bech32_polymod(&values);
    chk == 1 || chk == BECH32M_CONST
}

/// EIP-55: mixed-case hex addresses must match the Keccak-256 casing;
/// single-case addresses carry no checksum and pass.
pub fn eth(addr: &str) -> bool {
    let Some(hex) = addr.strip_prefix("0x") else {
        return false;
    };
    if hex.len() != 40 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return false;
    }
    let has_upper = hex.bytes().any(|b| b.is_ascii_uppercase());
    let has_lower = hex.bytes().any(|b| b.is_ascii_lowercase());
    if !(has_upper && has_lower) {
        return true;
    }

    let hash = Keccak256::digest(hex.to_ascii_lowercase().as_bytes());
    for (i, c) in hex.bytes().enumerate() {
        if c.is_ascii_alphabetic() {
            let nibble = if i % 2 == 0 {
                hash[i / 2] >> 4
            } else {
                hash[i / 2] & 0x0f
            };
            if c.is_ascii_uppercase() != (nibble >= 8) {
                return false;
            }
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_iban() {
        assert!(iban("GB82WEST12345698765432"));
        assert!(iban("DE89370400440532013000"));
        assert!(!iban("GB82WEST12345698765433"));
        assert!(!iban("XX00"));
    }

    #[test]
    fn test_lei() {
        assert!(lei("5493001KJTIIGC8Y1R12"));
        assert!(!lei("5493001KJTIIGC8Y1R13"));
        assert!(!lei("5493001kjtiigc8y1r12"));
    }

    #[test]
    fn test_isin() {
        assert!(isin("US0378331005"));
        assert!(!isin("US0378331006"));
    }

    #[test]
    fn test_siren() {
        assert!(siren("732829320"));
        assert!(!siren("732829321"));
    }

    #[test]
    fn test_imo() {
        assert!(imo("9074729"));
        assert!(!imo("9074728"));
    }

    #[test]
    fn test_btc_base58check() {
        assert!(base58check("1A1zP1eP5QGefi2DMPTfTL5SLmv7DivfNa"));
        assert!(!base58check("1A1zP1eP5QGefi2DMPTfTL5SLmv7DivfNb"));
    }

    #[test]
    fn test_xrp_base58check() {
        assert!(base58check_ripple("rN7n7otQDd6FczFgLdSqtcsAUxDkw6fzRH"));
        assert!(!base58check_ripple("rN7n7otQDd6FczFgLdSqtcsAUxDkw6fzRI"));
    }

    #[test]
    fn test_bech32() {
        assert!(bech32("bc1qar0srrr7xfkvy5l643lydnw9re59gtzzwf5mdq", "bc"));
        assert!(!bech32("bc1qar0srrr7xfkvy5l643lydnw9re59gtzzwf5mdr", "bc"));
        assert!(!bech32("tb1qar0srrr7xfkvy5l643lydnw9re59gtzzwf5mdq", "bc"));
    }

    #[test]
    fn test_eth_eip55() {
        assert!(eth("0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed"));
        assert!(eth("0xde709f2102306220921060314715629080e2fb77"));
        assert!(!eth("0x5aaeb6053F3E94C9b9A09f33669435E7Ef1BeAed"));
        assert!(!eth("0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAe"));
    }
}
