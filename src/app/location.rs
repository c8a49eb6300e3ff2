use std::sync::LazyLock;

use regex::Regex;

use crate::app::types::Field;

/// City/state/country derived from the free-text location fragment of a
/// report. Every field is independently optional.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocationInfo {
    pub city: Field<String>,
    pub state: Field<String>,
    pub state_abbreviation: Field<String>,
    pub country: Field<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct StateInfo {
    state: &'static str,
    abbreviation: String,
    country: &'static str,
}

/// Fixed enumeration of the 50 US state codes plus DC, as one alternation.
static RE_US_STATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(A[KLRZ]|C[AOT]|D[CE]|FL|GA|HI|I[ADLN]|K[SY]|LA|M[ADEINOST]|N[CDEHJMVY]|O[HKR]|PA|RI|S[CD]|T[NX]|UT|V[AT]|W[AIVY])",
    )
    .expect("invalid regex: us state")
});

static RE_CA_PROVINCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(N[BLSTU]|[AMN]B|[BQ]C|ON|PE|SK)").expect("invalid regex: canadian province")
});

static RE_BRACKET_GROUP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\((.*?)\)").expect("invalid regex: bracket group"));

const US_STATES: [(&str, &str); 51] = [
    ("AK", "Alaska"),
    ("AL", "Alabama"),
    ("AR", "Arkansas"),
    ("AZ", "Arizona"),
    ("CA", "California"),
    ("CO", "Colorado"),
    ("CT", "Connecticut"),
    ("DC", "District of Columbia"),
    ("DE", "Delaware"),
    ("FL", "Florida"),
    ("GA", "Georgia"),
    ("HI", "Hawaii"),
    ("IA", "Iowa"),
    ("ID", "Idaho"),
    ("IL", "Illinois"),
    ("IN", "Indiana"),
    ("KS", "Kansas"),
    ("KY", "Kentucky"),
    ("LA", "Louisiana"),
    ("MA", "Massachusetts"),
    ("MD", "Maryland"),
    ("ME", "Maine"),
    ("MI", "Michigan"),
    ("MN", "Minnesota"),
    ("MO", "Missouri"),
    ("MS", "Mississippi"),
    ("MT", "Montana"),
    ("NC", "North Carolina"),
    ("ND", "North Dakota"),
    ("NE", "Nebraska"),
    ("NH", "New Hampshire"),
    ("NJ", "New Jersey"),
    ("NM", "New Mexico"),
    ("NV", "Nevada"),
    ("NY", "New York"),
    ("OH", "Ohio"),
    ("OK", "Oklahoma"),
    ("OR", "Oregon"),
    ("PA", "Pennsylvania"),
    ("RI", "Rhode Island"),
    ("SC", "South Carolina"),
    ("SD", "South Dakota"),
    ("TN", "Tennessee"),
    ("TX", "Texas"),
    ("UT", "Utah"),
    ("VA", "Virginia"),
    ("VT", "Vermont"),
    ("WA", "Washington"),
    ("WI", "Wisconsin"),
    ("WV", "West Virginia"),
    ("WY", "Wyoming"),
];

const CA_PROVINCES: [(&str, &str); 13] = [
    ("AB", "Alberta"),
    ("BC", "British Columbia"),
    ("MB", "Manitoba"),
    ("NB", "New Brunswick"),
    ("NL", "Newfoundland and Labrador"),
    ("NS", "Nova Scotia"),
    ("NT", "Northwest Territories"),
    ("NU", "Nunavut"),
    ("ON", "Ontario"),
    ("PE", "Prince Edward Island"),
    ("QC", "Quebec"),
    ("SK", "Saskatchewan"),
    ("YT", "Yukon"),
];

/// Colloquial, historical and non-ISO spellings seen in reports, checked
/// before the ISO table.
const COUNTRY_ALIASES: [(&str, &str); 30] = [
    ("usa", "USA"),
    ("us", "USA"),
    ("u.s.a.", "USA"),
    ("united states", "USA"),
    ("united states of america", "USA"),
    ("america", "USA"),
    ("uk", "United Kingdom"),
    ("u.k.", "United Kingdom"),
    ("great britain", "United Kingdom"),
    ("britain", "United Kingdom"),
    ("england", "United Kingdom"),
    ("scotland", "United Kingdom"),
    ("wales", "United Kingdom"),
    ("northern ireland", "United Kingdom"),
    ("holland", "Netherlands"),
    ("the netherlands", "Netherlands"),
    ("viet nam", "Vietnam"),
    ("burma", "Myanmar"),
    ("persia", "Iran"),
    ("czech republic", "Czechia"),
    ("czechoslovakia", "Czechia"),
    ("yugoslavia", "Serbia"),
    ("macedonia", "North Macedonia"),
    ("korea", "South Korea"),
    ("republic of korea", "South Korea"),
    ("russian federation", "Russia"),
    ("uae", "United Arab Emirates"),
    ("ivory coast", "Cote d'Ivoire"),
    ("cape verde", "Cabo Verde"),
    ("swaziland", "Eswatini"),
];

/// English short names of the ISO 3166 countries, matched case-insensitively.
const ISO_COUNTRY_NAMES: [&str; 198] = [
    "Afghanistan",
    "Albania",
    "Algeria",
    "Andorra",
    "Angola",
    "Antigua and Barbuda",
    "Argentina",
    "Armenia",
    "Australia",
    "Austria",
    "Azerbaijan",
    "Bahamas",
    "Bahrain",
    "Bangladesh",
    "Barbados",
    "Belarus",
    "Belgium",
    "Belize",
    "Benin",
    "Bhutan",
    "Bolivia",
    "Bosnia and Herzegovina",
    "Botswana",
    "Brazil",
    "Brunei",
    "Bulgaria",
    "Burkina Faso",
    "Burundi",
    "Cabo Verde",
    "Cambodia",
    "Cameroon",
    "Canada",
    "Central African Republic",
    "Chad",
    "Chile",
    "China",
    "Colombia",
    "Comoros",
    "Congo",
    "Costa Rica",
    "Cote d'Ivoire",
    "Croatia",
    "Cuba",
    "Cyprus",
    "Czechia",
    "Democratic Republic of the Congo",
    "Denmark",
    "Djibouti",
    "Dominica",
    "Dominican Republic",
    "Ecuador",
    "Egypt",
    "El Salvador",
    "Equatorial Guinea",
    "Eritrea",
    "Estonia",
    "Eswatini",
    "Ethiopia",
    "Fiji",
    "Finland",
    "France",
    "Gabon",
    "Gambia",
    "Georgia",
    "Germany",
    "Ghana",
    "Greece",
    "Greenland",
    "Grenada",
    "Guatemala",
    "Guinea",
    "Guinea-Bissau",
    "Guyana",
    "Haiti",
    "Honduras",
    "Hong Kong",
    "Hungary",
    "Iceland",
    "India",
    "Indonesia",
    "Iran",
    "Iraq",
    "Ireland",
    "Israel",
    "Italy",
    "Jamaica",
    "Japan",
    "Jordan",
    "Kazakhstan",
    "Kenya",
    "Kiribati",
    "Kuwait",
    "Kyrgyzstan",
    "Laos",
    "Latvia",
    "Lebanon",
    "Lesotho",
    "Liberia",
    "Libya",
    "Liechtenstein",
    "Lithuania",
    "Luxembourg",
    "Madagascar",
    "Malawi",
    "Malaysia",
    "Maldives",
    "Mali",
    "Malta",
    "Marshall Islands",
    "Mauritania",
    "Mauritius",
    "Mexico",
    "Micronesia",
    "Moldova",
    "Monaco",
    "Mongolia",
    "Montenegro",
    "Morocco",
    "Mozambique",
    "Myanmar",
    "Namibia",
    "Nauru",
    "Nepal",
    "Netherlands",
    "New Zealand",
    "Nicaragua",
    "Niger",
    "Nigeria",
    "North Korea",
    "North Macedonia",
    "Norway",
    "Oman",
    "Pakistan",
    "Palau",
    "Palestine",
    "Panama",
    "Papua New Guinea",
    "Paraguay",
    "Peru",
    "Philippines",
    "Poland",
    "Portugal",
    "Puerto Rico",
    "Qatar",
    "Romania",
    "Russia",
    "Rwanda",
    "Saint Kitts and Nevis",
    "Saint Lucia",
    "Saint Vincent and the Grenadines",
    "Samoa",
    "San Marino",
    "Sao Tome and Principe",
    "Saudi Arabia",
    "Senegal",
    "Serbia",
    "Seychelles",
    "Sierra Leone",
    "Singapore",
    "Slovakia",
    "Slovenia",
    "Solomon Islands",
    "Somalia",
    "South Africa",
    "South Korea",
    "South Sudan",
    "Spain",
    "Sri Lanka",
    "Sudan",
    "Suriname",
    "Sweden",
    "Switzerland",
    "Syria",
    "Taiwan",
    "Tajikistan",
    "Tanzania",
    "Thailand",
    "Timor-Leste",
    "Togo",
    "Tonga",
    "Trinidad and Tobago",
    "Tunisia",
    "Turkey",
    "Turkmenistan",
    "Tuvalu",
    "Uganda",
    "Ukraine",
    "United Arab Emirates",
    "United Kingdom",
    "Uruguay",
    "Uzbekistan",
    "Vanuatu",
    "Vatican City",
    "Venezuela",
    "Vietnam",
    "Yemen",
    "Zambia",
    "Zimbabwe",
];

/// Resolve a location fragment like `Springfield, IL ()` or `Paris (France)`
/// into city/state/country fields.
///
/// Explicit state or province abbreviations are higher-confidence signals
/// than free-text country names, so they win over bracket parsing.
pub fn resolve_location(location: &str) -> LocationInfo {
    let state = state_info(location);
    let country = match &state {
        Some(info) => Some(info.country.to_string()),
        None => country_from_location(location),
    };

    LocationInfo {
        city: Field::from_option(city_from_location(location)),
        state: Field::from_option(state.as_ref().map(|info| info.state.to_string())),
        state_abbreviation: Field::from_option(state.map(|info| info.abbreviation)),
        country: Field::from_option(country),
    }
}

/// First state/province abbreviation in the fragment, US checked before
/// Canada. A matched abbreviation the lookup table cannot resolve yields
/// `None` without falling back to the other table.
fn state_info(location: &str) -> Option<StateInfo> {
    if let Some(found) = RE_US_STATE.find(location) {
        let abbreviation = found.as_str();
        return US_STATES
            .iter()
            .find(|(code, _)| *code == abbreviation)
            .map(|(code, name)| StateInfo {
                state: name,
                abbreviation: code.to_string(),
                country: "USA",
            });
    }

    if let Some(found) = RE_CA_PROVINCE.find(location) {
        let abbreviation = found.as_str();
        return CA_PROVINCES
            .iter()
            .find(|(code, _)| *code == abbreviation)
            .map(|(code, name)| StateInfo {
                state: name,
                abbreviation: code.to_string(),
                country: "Canada",
            });
    }

    None
}

/// Canonical country name for a free-text candidate, or `None`. The alias
/// table is consulted before the ISO names.
pub fn valid_country_name(name: &str) -> Option<&'static str> {
    let cleaned = name
        .chars()
        .filter(|ch| !matches!(ch, '+' | ':' | ','))
        .collect::<String>()
        .trim()
        .to_lowercase();
    if cleaned.is_empty() {
        return None;
    }

    if let Some((_, canonical)) = COUNTRY_ALIASES.iter().find(|(alias, _)| *alias == cleaned) {
        return Some(canonical);
    }
    ISO_COUNTRY_NAMES
        .iter()
        .find(|candidate| candidate.to_lowercase() == cleaned)
        .copied()
}

fn country_from_location(location: &str) -> Option<String> {
    // The whole fragment may itself be a country name.
    if let Some(country) = valid_country_name(location) {
        return Some(country.to_string());
    }

    // Otherwise country data sits inside the last bracket group; a `/` or
    // `,` marks a secondary qualifier that is discarded.
    let bracket = RE_BRACKET_GROUP
        .captures_iter(location)
        .last()?
        .get(1)?
        .as_str();
    let candidate = if bracket.contains('/') {
        bracket.split('/').next().unwrap_or(bracket)
    } else if bracket.contains(',') {
        bracket.split(',').next().unwrap_or(bracket)
    } else {
        bracket
    };
    valid_country_name(candidate).map(str::to_string)
}

/// City is the text preceding the first `(`, reduced to its first `/`- or
/// `,`-delimited token. A fragment that is purely a country name has no
/// city.
fn city_from_location(location: &str) -> Option<String> {
    if let Some(idx) = location.find('(') {
        let prefix = location[..idx].trim();
        if prefix.is_empty() {
            return None;
        }
        return Some(first_token(prefix));
    }

    if location.contains('/') || location.contains(',') {
        return Some(first_token(location));
    }
    if valid_country_name(location).is_some() {
        return None;
    }
    let trimmed = location.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn first_token(text: &str) -> String {
    let token = if text.contains('/') {
        text.split('/').next().unwrap_or(text)
    } else if text.contains(',') {
        text.split(',').next().unwrap_or(text)
    } else {
        text
    };
    token.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parsed(value: &str) -> Field<String> {
        Field::Parsed(value.to_string())
    }

    #[test]
    fn us_state_abbreviation_wins() {
        let info = resolve_location("Springfield, IL ()");
        assert_eq!(info.city, parsed("Springfield"));
        assert_eq!(info.state, parsed("Illinois"));
        assert_eq!(info.state_abbreviation, parsed("IL"));
        assert_eq!(info.country, parsed("USA"));
    }

    #[test]
    fn canadian_province() {
        let info = resolve_location("Calgary, AB (Canada)");
        assert_eq!(info.city, parsed("Calgary"));
        assert_eq!(info.state, parsed("Alberta"));
        assert_eq!(info.state_abbreviation, parsed("AB"));
        assert_eq!(info.country, parsed("Canada"));
    }

    #[test]
    fn bracket_country_without_state() {
        let info = resolve_location("Paris (France)");
        assert_eq!(info.city, parsed("Paris"));
        assert_eq!(info.state, Field::Unparsed);
        assert_eq!(info.state_abbreviation, Field::Unparsed);
        assert_eq!(info.country, parsed("France"));
    }

    #[test]
    fn bracket_with_regional_qualifier() {
        let info = resolve_location("London (UK/England)");
        assert_eq!(info.city, parsed("London"));
        assert_eq!(info.country, parsed("United Kingdom"));
    }

    #[test]
    fn ontario_without_abbreviation_falls_back_to_country() {
        let info = resolve_location("Ontario, (Canada)");
        assert_eq!(info.city, parsed("Ontario"));
        assert_eq!(info.state, Field::Unparsed);
        assert_eq!(info.country, parsed("Canada"));
    }

    #[test]
    fn pure_country_fragment_has_no_city() {
        let info = resolve_location("Australia");
        assert_eq!(info.city, Field::Unparsed);
        assert_eq!(info.country, parsed("Australia"));
    }

    #[test]
    fn slash_keeps_first_token() {
        let info = resolve_location("Tampa/St. Petersburg, FL ()");
        assert_eq!(info.city, parsed("Tampa"));
        assert_eq!(info.state_abbreviation, parsed("FL"));
    }

    #[test]
    fn unknown_text_is_city_only() {
        let info = resolve_location("Somewhere remote");
        assert_eq!(info.city, parsed("Somewhere remote"));
        assert_eq!(info.country, Field::Unparsed);
    }

    #[test]
    fn alias_table_checked_before_iso() {
        assert_eq!(valid_country_name("england"), Some("United Kingdom"));
        assert_eq!(valid_country_name(" France "), Some("France"));
        assert_eq!(valid_country_name("u.s.a."), Some("USA"));
        assert_eq!(valid_country_name("atlantis"), None);
    }

    #[test]
    fn punctuation_stripped_before_lookup() {
        assert_eq!(valid_country_name("france,"), Some("France"));
        assert_eq!(valid_country_name("+canada:"), Some("Canada"));
    }

    #[test]
    fn country_tables_have_unique_entries() {
        let mut names = ISO_COUNTRY_NAMES.to_vec();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), ISO_COUNTRY_NAMES.len());

        let mut aliases: Vec<&str> = COUNTRY_ALIASES.iter().map(|(alias, _)| *alias).collect();
        aliases.sort_unstable();
        aliases.dedup();
        assert_eq!(aliases.len(), COUNTRY_ALIASES.len());
    }

    #[test]
    fn empty_fragment_resolves_nothing() {
        assert_eq!(resolve_location(""), LocationInfo::default());
    }
}
