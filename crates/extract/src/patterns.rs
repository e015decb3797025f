use std::collections::{BTreeMap, HashSet};

use regex::Regex;
use tracing::warn;

use dragnet_core::EntityKind;

use crate::validate;

/// One entity kind's compiled pattern. `capture` selects group 1 instead of
/// the whole match; `context` lists keywords that must appear near the
/// match for it to count (gates kinds whose shape alone is too generic).
struct KindPattern {
    kind: EntityKind,
    regex: Regex,
    capture: bool,
    context: Option<&'static [&'static str]>,
}

/// How far around a match the context gate looks, in bytes.
const CONTEXT_WINDOW: usize = 60;

pub struct PatternBank {
    patterns: Vec<KindPattern>,
}

impl PatternBank {
    pub fn new() -> Self {
        let mut patterns = Vec::new();
        let mut push = |kind: EntityKind,
                        pattern: &str,
                        capture: bool,
                        context: Option<&'static [&'static str]>| {
            match Regex::new(pattern) {
                Ok(regex) => patterns.push(KindPattern {
                    kind,
                    regex,
                    capture,
                    context,
                }),
                // A bad pattern costs one kind, never the bank.
                Err(e) => warn!(kind = %kind, error = %e, "pattern failed to compile, kind disabled"),
            }
        };

        push(
            EntityKind::Email,
            r"[A-Za-z0-9._%+\-]+@[A-Za-z0-9.\-]+\.[A-Za-z]{2,}",
            false,
            None,
        );
        push(
            EntityKind::PhoneIntl,
            r"\+[1-9][0-9][0-9 .\-()]{5,17}[0-9]",
            false,
            None,
        );
        push(
            EntityKind::PhoneUs,
            r"\(?[2-9][0-9]{2}\)?[ .\-][0-9]{3}[ .\-][0-9]{4}\b",
            false,
            None,
        );
        push(
            EntityKind::PhoneUk,
            r"\b0[1-9][0-9]{2,3} ?[0-9]{3} ?[0-9]{3,4}\b",
            false,
            None,
        );
        push(EntityKind::PhoneEu, r"\b00[1-9][0-9]{6,14}\b", false, None);
        push(EntityKind::Lei, r"\b[0-9A-Z]{18}[0-9]{2}\b", false, None);
        push(
            EntityKind::Iban,
            r"\b[A-Z]{2}[0-9]{2}(?: ?[A-Z0-9]{1,4}){3,9}\b",
            false,
            None,
        );
        push(
            EntityKind::Swift,
            r"\b[A-Z]{6}[A-Z0-9]{2}(?:[A-Z0-9]{3})?\b",
            false,
            Some(&["swift", "bic"]),
        );
        push(
            EntityKind::Vat,
            r"\b(?:ATU[0-9]{8}|BE0[0-9]{9}|DE[0-9]{9}|DK[0-9]{8}|EL[0-9]{9}|ES[A-Z0-9][0-9]{7}[A-Z0-9]|FI[0-9]{8}|FR[A-Z0-9]{2}[0-9]{9}|GB[0-9]{9}|HU[0-9]{8}|IE[0-9]{7}[A-Z]{1,2}|IT[0-9]{11}|LU[0-9]{8}|LV[0-9]{11}|NL[0-9]{9}B[0-9]{2}|PL[0-9]{10}|PT[0-9]{9}|SE[0-9]{12}|SI[0-9]{8}|SK[0-9]{10})\b",
            false,
            None,
        );
        push(EntityKind::Imo, r"\bIMO[ :]?([0-9]{7})\b", true, None);
        push(
            EntityKind::Mmsi,
            r"\b[0-9]{9}\b",
            false,
            Some(&["mmsi"]),
        );
        push(
            EntityKind::Isin,
            r"\b[A-Z]{2}[A-Z0-9]{9}[0-9]\b",
            false,
            None,
        );
        push(
            EntityKind::Duns,
            r"\b(?:[0-9]{2}-[0-9]{3}-[0-9]{4}|[0-9]{9})\b",
            false,
            Some(&["duns", "d-u-n-s"]),
        );
        // Lettered CRN prefixes are unambiguous; the all-digit form needs
        // registry context.
        push(
            EntityKind::UkCrn,
            r"\b(?:SC|NI|OC|SO|NC|FC|IP|RS)[0-9]{6}\b",
            false,
            None,
        );
        push(
            EntityKind::UkCrn,
            r"\b[0-9]{8}\b",
            false,
            Some(&[
                "company number",
                "company no",
                "companies house",
                "registered in england",
                "registration number",
            ]),
        );
        push(EntityKind::DeHrb, r"\bHRB ?([0-9]{1,6})\b", true, None);
        push(
            EntityKind::FrSiren,
            r"\b[0-9]{3} ?[0-9]{3} ?[0-9]{3}\b",
            false,
            Some(&["siren", "siret", "rcs"]),
        );
        push(
            EntityKind::Btc,
            r"\b[13][a-km-zA-HJ-NP-Z1-9]{25,34}\b",
            false,
            None,
        );
        push(
            EntityKind::BtcBech32,
            r"\bbc1[ac-hj-np-z02-9]{8,87}\b",
            false,
            None,
        );
        push(EntityKind::Eth, r"\b0x[a-fA-F0-9]{40}\b", false, None);
        push(
            EntityKind::Ltc,
            r"\b[LM][a-km-zA-HJ-NP-Z1-9]{26,33}\b",
            false,
            None,
        );
        push(
            EntityKind::Ltc,
            r"\bltc1[ac-hj-np-z02-9]{8,87}\b",
            false,
            None,
        );
        push(
            EntityKind::Xrp,
            r"\br[a-km-zA-HJ-NP-Z1-9]{24,34}\b",
            false,
            None,
        );
        push(
            EntityKind::Xmr,
            r"\b4[0-9AB][1-9A-HJ-NP-Za-km-z]{93}\b",
            false,
            None,
        );

        Self { patterns }
    }

    /// Apply the whole bank to capped text. Values are normalized,
    /// validated, deduplicated, and kept in first-seen order.
    pub fn extract(&self, text: &str) -> BTreeMap<EntityKind, Vec<String>> {
        let mut raw: BTreeMap<EntityKind, Vec<(usize, String)>> = BTreeMap::new();

        for kp in &self.patterns {
            if kp.capture {
                for caps in kp.regex.captures_iter(text) {
                    let (Some(whole), Some(group)) = (caps.get(0), caps.get(1)) else {
                        continue;
                    };
                    self.consider(kp, text, whole.start(), whole.end(), group.as_str(), &mut raw);
                }
            } else {
                for m in kp.regex.find_iter(text) {
                    self.consider(kp, text, m.start(), m.end(), m.as_str(), &mut raw);
                }
            }
        }

        let mut out = BTreeMap::new();
        for (kind, mut values) in raw {
            values.sort_by_key(|(offset, _)| *offset);
            let mut seen = HashSet::new();
            let list: Vec<String> = values
                .into_iter()
                .filter_map(|(_, v)| seen.insert(v.clone()).then_some(v))
                .collect();
            if !list.is_empty() {
                out.insert(kind, list);
            }
        }
        out
    }

    fn consider(
        &self,
        kp: &KindPattern,
        text: &str,
        start: usize,
        end: usize,
        matched: &str,
        raw: &mut BTreeMap<EntityKind, Vec<(usize, String)>>,
    ) {
        if let Some(keywords) = kp.context {
            if !has_context(text, start, end, keywords) {
                return;
            }
        }
        if let Some(value) = normalize_validate(kp.kind, matched) {
            raw.entry(kp.kind).or_default().push((start, value));
        }
    }
}

impl Default for PatternBank {
    fn default() -> Self {
        Self::new()
    }
}

fn floor_char_boundary(text: &str, mut idx: usize) -> usize {
    while idx > 0 && !text.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}

fn ceil_char_boundary(text: &str, mut idx: usize) -> usize {
    while idx < text.len() && !text.is_char_boundary(idx) {
        idx += 1;
    }
    idx
}

fn has_context(text: &str, start: usize, end: usize, keywords: &[&str]) -> bool {
    let lo = floor_char_boundary(text, start.saturating_sub(CONTEXT_WINDOW));
    let hi = ceil_char_boundary(text, (end + CONTEXT_WINDOW).min(text.len()));
    let window = text[lo..hi].to_ascii_lowercase();
    keywords.iter().any(|k| window.contains(k))
}

fn digits_only(s: &str) -> String {
    s.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Per-kind normalization + checksum validation. None means the match is
/// discarded.
fn normalize_validate(kind: EntityKind, raw: &str) -> Option<String> {
    match kind {
        EntityKind::Email => Some(raw.to_ascii_lowercase()),
        EntityKind::PhoneIntl => {
            let digits = digits_only(raw);
            (7..=15).contains(&digits.len()).then(|| format!("+{digits}"))
        }
        EntityKind::PhoneUs => {
            let digits = digits_only(raw);
            (digits.len() == 10).then(|| format!("+1{digits}"))
        }
        EntityKind::PhoneUk => {
            let digits = digits_only(raw);
            (10..=11).contains(&digits.len()).then(|| format!("+44{}", &digits[1..]))
        }
        EntityKind::PhoneEu => {
            let digits = digits_only(raw);
            (9..=17).contains(&digits.len()).then(|| format!("+{}", &digits[2..]))
        }
        EntityKind::Lei => validate::lei(raw).then(|| raw.to_string()),
        EntityKind::Iban => {
            let compact: String = raw
                .chars()
                .filter(|c| !c.is_whitespace())
                .collect::<String>()
                .to_ascii_uppercase();
            validate::iban(&compact).then_some(compact)
        }
        EntityKind::Swift => Some(raw.to_string()),
        EntityKind::Vat => Some(raw.to_string()),
        EntityKind::Imo => validate::imo(raw).then(|| format!("IMO{raw}")),
        EntityKind::Mmsi => Some(raw.to_string()),
        EntityKind::Isin => validate::isin(raw).then(|| raw.to_string()),
        EntityKind::Duns => Some(digits_only(raw)),
        EntityKind::UkCrn => Some(raw.to_string()),
        EntityKind::DeHrb => Some(format!("HRB{raw}")),
        EntityKind::FrSiren => {
            let digits = digits_only(raw);
            validate::siren(&digits).then_some(digits)
        }
        EntityKind::Btc => validate::base58check(raw).then(|| raw.to_string()),
        EntityKind::BtcBech32 => validate::bech32(raw, "bc").then(|| raw.to_ascii_lowercase()),
        EntityKind::Eth => validate::eth(raw).then(|| raw.to_ascii_lowercase()),
        EntityKind::Ltc => {
            if raw.starts_with("ltc1") {
                validate::bech32(raw, "ltc").then(|| raw.to_ascii_lowercase())
            } else {
                validate::base58check(raw).then(|| raw.to_string())
            }
        }
        EntityKind::Xrp => validate::base58check_ripple(raw).then(|| raw.to_string()),
        EntityKind::Xmr => Some(raw.to_string()),
        EntityKind::Person | EntityKind::Company => None,
    }
}
