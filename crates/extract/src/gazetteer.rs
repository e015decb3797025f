//! Bundled name gazetteer and legal-form designators. Data only; scoring
//! lives in `names` and `companies`.

/// Common given names, multi-region. Lowercase for case-folded lookup.
pub const FIRST_NAMES: &[&str] = &[
    "aaron", "adam", "adrian", "ahmed", "aisha", "alan", "albert", "alejandro", "alexander",
    "alexandra", "alice", "amanda", "amelia", "amir", "ana", "andrea", "andreas", "andrew",
    "andrey", "angela", "anna", "anne", "antonio", "arthur", "barbara", "benjamin", "bernard",
    "brian", "bruno", "carlos", "carmen", "carol", "catherine", "charles", "charlotte", "chen",
    "christian", "christina", "christopher", "claire", "claudia", "daniel", "david", "deborah",
    "dennis", "diana", "diego", "dmitry", "donald", "dorothy", "douglas", "edward", "elena",
    "elizabeth", "emily", "emma", "eric", "erik", "eva", "fatima", "felix", "fernando",
    "francesca", "francesco", "frank", "gabriel", "george", "giovanni", "grace", "gregory",
    "hans", "harold", "harry", "helen", "henry", "hiroshi", "ibrahim", "igor", "irina", "isabel",
    "ivan", "jack", "jacob", "james", "jan", "jane", "javier", "jean", "jennifer", "jessica",
    "joan", "johannes", "john", "jonathan", "jorge", "jose", "joseph", "juan", "julia", "julie",
    "karen", "karl", "katharina", "kathleen", "kenneth", "kevin", "laura", "lars", "laurent",
    "lena", "leo", "linda", "lisa", "luca", "lucas", "luis", "magnus", "marc", "marco",
    "margaret", "maria", "marie", "marina", "mario", "mark", "martin", "mary", "matteo",
    "matthew", "maximilian", "mehmet", "michael", "michelle", "miguel", "mohamed", "mohammed",
    "natalia", "nathan", "nicholas", "nicolas", "nikolai", "nina", "olga", "oliver", "olivia",
    "omar", "oscar", "pablo", "patricia", "patrick", "paul", "paulo", "pedro", "peter",
    "philip", "philippe", "pierre", "rachel", "rafael", "raymond", "rebecca", "richard",
    "robert", "roberto", "ronald", "rosa", "ruth", "ryan", "samuel", "sandra", "sara", "sarah",
    "scott", "sergey", "sofia", "sophie", "stefan", "stephen", "steven", "susan", "sven",
    "tatiana", "thomas", "timothy", "tobias", "victor", "victoria", "vladimir", "walter",
    "wei", "william", "xavier", "yuki", "yusuf", "zhang",
];

/// Common surnames, multi-region. Lowercase for case-folded lookup.
pub const LAST_NAMES: &[&str] = &[
    "adams", "ahmed", "ali", "allen", "anderson", "andersson", "baker", "bauer", "becker",
    "bell", "bennett", "berg", "bernard", "brown", "campbell", "carter", "chen", "clark",
    "collins", "cook", "cooper", "costa", "cox", "davies", "davis", "de vries", "dubois",
    "edwards", "evans", "fernandez", "ferrari", "fischer", "fontaine", "foster", "garcia",
    "gomez", "gonzalez", "gray", "green", "gruber", "hall", "hansen", "harris", "hernandez",
    "hill", "hoffmann", "howard", "hughes", "huang", "ivanov", "jackson", "jansen", "jensen",
    "johansson", "johnson", "jones", "kelly", "khan", "kim", "king", "klein", "koch",
    "kowalski", "kuznetsov", "lang", "larsen", "laurent", "lee", "lewis", "li", "lindberg",
    "liu", "lopez", "martin", "martinez", "meyer", "miller", "mitchell", "moore", "morales",
    "moreau", "morgan", "morris", "muller", "murphy", "nelson", "nguyen", "nielsen", "novak",
    "nowak", "o'brien", "o'connor", "parker", "patel", "perez", "peters", "petersen", "petrov",
    "phillips", "popov", "price", "reed", "richter", "rivera", "roberts", "robinson",
    "rodriguez", "rogers", "rossi", "russo", "sanchez", "sato", "schmidt", "schneider",
    "schulz", "scott", "silva", "singh", "smirnov", "smith", "sokolov", "sanders", "stewart",
    "suzuki", "tanaka", "taylor", "thompson", "torres", "turner", "van dijk", "vogel",
    "wagner", "walker", "wang", "ward", "watson", "weber", "white", "williams", "wilson",
    "wolf", "wood", "wright", "yamamoto", "young", "zhang", "zhao", "zimmermann",
];

/// Honorifics and role words that raise a person candidate's confidence
/// when they appear immediately before it.
pub const PERSON_CUES: &[&str] = &[
    "mr", "mrs", "ms", "dr", "prof", "sir", "madam", "herr", "frau", "ceo", "cfo", "cto",
    "coo", "chairman", "chairwoman", "director", "founder", "co-founder", "president",
    "partner", "attorney", "judge", "minister", "senator", "secretary", "treasurer",
    "manager", "owner", "principal",
];

/// Capitalized words that never start a person name; prunes sentence-initial
/// bigrams and navigation text.
pub const PERSON_STOPWORDS: &[&str] = &[
    "the", "this", "that", "these", "those", "a", "an", "and", "but", "for", "from", "with",
    "about", "into", "over", "under", "after", "before", "our", "your", "their", "his", "her",
    "its", "all", "any", "more", "most", "new", "old", "first", "last", "next", "privacy",
    "policy", "terms", "conditions", "contact", "home", "read", "click", "here", "learn",
    "news", "press", "media", "careers", "blog", "search", "login", "register", "subscribe",
    "monday", "tuesday", "wednesday", "thursday", "friday", "saturday", "sunday", "january",
    "february", "march", "april", "may", "june", "july", "august", "september", "october",
    "november", "december", "street", "avenue", "limited", "company", "group", "holdings",
    "united", "international", "national", "general", "public", "private",
];

/// Legal-form designators and the jurisdiction each implies. Uppercase,
/// dots stripped, for normalized comparison.
pub const LEGAL_FORMS: &[(&str, &str)] = &[
    ("LTD", "GB"),
    ("LIMITED", "GB"),
    ("PLC", "GB"),
    ("LLP", "GB"),
    ("LLC", "US"),
    ("INC", "US"),
    ("CORP", "US"),
    ("GMBH", "DE"),
    ("AG", "DE"),
    ("KG", "DE"),
    ("UG", "DE"),
    ("SARL", "FR"),
    ("SAS", "FR"),
    ("SA", "FR"),
    ("SRO", "CZ"),
    ("SPA", "IT"),
    ("SRL", "IT"),
    ("NV", "NL"),
    ("BV", "NL"),
    ("OY", "FI"),
    ("OYJ", "FI"),
    ("AB", "SE"),
    ("AS", "NO"),
    ("APS", "DK"),
    ("OOO", "RU"),
    ("ZAO", "RU"),
    ("PTY", "AU"),
    ("PTE", "SG"),
    ("KK", "JP"),
    ("SL", "ES"),
    ("LDA", "PT"),
    ("KFT", "HU"),
    ("ZRT", "HU"),
    ("SP Z OO", "PL"),
    ("DOO", "RS"),
    ("EOOD", "BG"),
];

pub fn jurisdiction_for(designator: &str) -> Option<&'static str> {
    let normalized: String = designator
        .chars()
        .filter(|c| *c != '.')
        .collect::<String>()
        .to_ascii_uppercase();
    LEGAL_FORMS
        .iter()
        .find(|(form, _)| *form == normalized)
        .map(|(_, code)| *code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_jurisdiction_lookup_strips_dots() {
        assert_eq!(jurisdiction_for("Ltd."), Some("GB"));
        assert_eq!(jurisdiction_for("S.r.o."), Some("CZ"));
        assert_eq!(jurisdiction_for("GmbH"), Some("DE"));
        assert_eq!(jurisdiction_for("Foo"), None);
    }

    #[test]
    fn test_gazetteer_is_lowercase() {
        assert!(FIRST_NAMES.iter().all(|n| *n == n.to_lowercase()));
        assert!(LAST_NAMES.iter().all(|n| *n == n.to_lowercase()));
    }
}
