use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::types::PageSource;

/// Entity kinds produced by the extraction engine. The serialized names are
/// the map keys of a record's `entities` object; `BTreeMap` keyed on this
/// enum keeps output key order stable across runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityKind {
    Email,
    PhoneIntl,
    PhoneUs,
    PhoneUk,
    PhoneEu,
    Person,
    Company,
    Lei,
    Iban,
    Swift,
    Vat,
    Imo,
    Mmsi,
    Isin,
    Duns,
    UkCrn,
    DeHrb,
    FrSiren,
    Btc,
    BtcBech32,
    Eth,
    Ltc,
    Xrp,
    Xmr,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Email => "EMAIL",
            EntityKind::PhoneIntl => "PHONE_INTL",
            EntityKind::PhoneUs => "PHONE_US",
            EntityKind::PhoneUk => "PHONE_UK",
            EntityKind::PhoneEu => "PHONE_EU",
            EntityKind::Person => "PERSON",
            EntityKind::Company => "COMPANY",
            EntityKind::Lei => "LEI",
            EntityKind::Iban => "IBAN",
            EntityKind::Swift => "SWIFT",
            EntityKind::Vat => "VAT",
            EntityKind::Imo => "IMO",
            EntityKind::Mmsi => "MMSI",
            EntityKind::Isin => "ISIN",
            EntityKind::Duns => "DUNS",
            EntityKind::UkCrn => "UK_CRN",
            EntityKind::DeHrb => "DE_HRB",
            EntityKind::FrSiren => "FR_SIREN",
            EntityKind::Btc => "BTC",
            EntityKind::BtcBech32 => "BTC_BECH32",
            EntityKind::Eth => "ETH",
            EntityKind::Ltc => "LTC",
            EntityKind::Xrp => "XRP",
            EntityKind::Xmr => "XMR",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TripwireCategory {
    Sanctions,
    Pep,
    Fraud,
    MoneyLaundering,
    Corruption,
    Litigation,
}

/// A curated risk term found in page text. Attached to the page; never
/// aborts processing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TripwireHit {
    pub category: TripwireCategory,
    pub term: String,
    pub span: [usize; 2],
}

/// A company name match with the jurisdiction its legal-form designator
/// implies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyMatch {
    pub name: String,
    pub jurisdiction: String,
}

/// The result of a successful fetch plus extraction. Serialized as one JSON
/// object per line; field declaration order is the wire order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page {
    pub url: String,
    pub depth: u32,
    pub source: PageSource,
    pub http_status: u16,
    pub content_type: String,
    pub len: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta_description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    pub internal_links: usize,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub outlinks: Vec<String>,
    pub entities: BTreeMap<EntityKind, Vec<String>>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub companies: Vec<CompanyMatch>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub tripwires: Vec<TripwireHit>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty", default)]
    pub binary_metadata: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "std::ops::Not::not", default)]
    pub partial_extraction: bool,
    pub content_hash: String,
    pub crawled_at: chrono::DateTime<chrono::Utc>,
}

/// Emitted when every tier failed for a URL (configurable, default on).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchFailure {
    pub url: String,
    pub depth: u32,
    /// Always the literal `failed`; distinguishes these lines from pages.
    pub source: FailedMarker,
    pub error: String,
    pub last_tier: PageSource,
    pub crawled_at: chrono::DateTime<chrono::Utc>,
}

/// Emitted for URLs classified `URL_ONLY`: the address is recorded, nothing
/// is fetched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UrlOnly {
    pub url: String,
    pub depth: u32,
    pub source: UrlOnlyMarker,
    pub crawled_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailedMarker {
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UrlOnlyMarker {
    UrlOnly,
}

/// The only artifact that crosses the process boundary: one JSON object per
/// line, UTF-8, no embedded newlines.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Record {
    Page(Box<Page>),
    Failure(FetchFailure),
    UrlOnly(UrlOnly),
}

impl Record {
    pub fn url(&self) -> &str {
        match self {
            Record::Page(p) => &p.url,
            Record::Failure(f) => &f.url,
            Record::UrlOnly(u) => &u.url,
        }
    }

    pub fn is_page(&self) -> bool {
        matches!(self, Record::Page(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_kind_wire_names() {
        assert_eq!(
            serde_json::to_string(&EntityKind::UkCrn).unwrap(),
            "\"UK_CRN\""
        );
        assert_eq!(
            serde_json::to_string(&EntityKind::BtcBech32).unwrap(),
            "\"BTC_BECH32\""
        );
        assert_eq!(
            serde_json::to_string(&EntityKind::PhoneIntl).unwrap(),
            "\"PHONE_INTL\""
        );
    }

    #[test]
    fn test_record_single_line() {
        let mut entities = BTreeMap::new();
        entities.insert(EntityKind::Email, vec!["info@example.com".to_string()]);
        let page = Page {
            url: "https://example.com/".into(),
            depth: 0,
            source: PageSource::Live,
            http_status: 200,
            content_type: "text/html".into(),
            len: 120,
            title: None,
            meta_description: None,
            text: Some("hello\nworld".into()),
            internal_links: 2,
            outlinks: vec![],
            entities,
            companies: vec![],
            tripwires: vec![],
            binary_metadata: BTreeMap::new(),
            partial_extraction: false,
            content_hash: "ab".into(),
            crawled_at: chrono::Utc::now(),
        };
        let line = serde_json::to_string(&Record::Page(Box::new(page))).unwrap();
        assert!(!line.contains('\n'), "embedded newline in record line");
        assert!(line.contains("\"source\":\"live\""));
        assert!(line.contains("\"EMAIL\""));
    }

    #[test]
    fn test_failure_record_source_marker() {
        let failure = FetchFailure {
            url: "https://dead.example/".into(),
            depth: 0,
            source: FailedMarker::Failed,
            error: "connect refused".into(),
            last_tier: PageSource::Render,
            crawled_at: chrono::Utc::now(),
        };
        let line = serde_json::to_string(&failure).unwrap();
        assert!(line.contains("\"source\":\"failed\""));
        assert!(line.contains("\"last_tier\":\"render\""));
    }
}
