//! US state catalogue used as the dashboard's selection values.

use serde::Serialize;

/// A selectable state: display name plus USPS code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct UsState {
    pub name: &'static str,
    pub code: &'static str,
}

const fn state(name: &'static str, code: &'static str) -> UsState {
    UsState { name, code }
}

/// All selectable states in display order
pub static STATES: [UsState; 51] = [
    state("Alabama", "AL"),
    state("Alaska", "AK"),
    state("Arizona", "AZ"),
    state("Arkansas", "AR"),
    state("California", "CA"),
    state("Colorado", "CO"),
    state("Connecticut", "CT"),
    state("Delaware", "DE"),
    state("District of Columbia", "DC"),
    state("Florida", "FL"),
    state("Georgia", "GA"),
    state("Hawaii", "HI"),
    state("Idaho", "ID"),
    state("Illinois", "IL"),
    state("Indiana", "IN"),
    state("Iowa", "IA"),
    state("Kansas", "KS"),
    state("Kentucky", "KY"),
    state("Louisiana", "LA"),
    state("Maine", "ME"),
    state("Maryland", "MD"),
    state("Massachusetts", "MA"),
    state("Michigan", "MI"),
    state("Minnesota", "MN"),
    state("Mississippi", "MS"),
    state("Missouri", "MO"),
    state("Montana", "MT"),
    state("Nebraska", "NE"),
    state("Nevada", "NV"),
    state("New Hampshire", "NH"),
    state("New Jersey", "NJ"),
    state("New Mexico", "NM"),
    state("New York", "NY"),
    state("North Carolina", "NC"),
    state("North Dakota", "ND"),
    state("Ohio", "OH"),
    state("Oklahoma", "OK"),
    state("Oregon", "OR"),
    state("Pennsylvania", "PA"),
    state("Rhode Island", "RI"),
    state("South Carolina", "SC"),
    state("South Dakota", "SD"),
    state("Tennessee", "TN"),
    state("Texas", "TX"),
    state("Utah", "UT"),
    state("Vermont", "VT"),
    state("Virginia", "VA"),
    state("Washington", "WA"),
    state("West Virginia", "WV"),
    state("Wisconsin", "WI"),
    state("Wyoming", "WY"),
];

/// Resolve a selection value (the state's display name)
pub fn lookup(name: &str) -> Option<&'static UsState> {
    STATES.iter().find(|s| s.name == name)
}

pub fn by_code(code: &str) -> Option<&'static UsState> {
    STATES.iter().find(|s| s.code == code)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_lookup_by_name_is_exact() {
        assert_eq!(lookup("California").map(|s| s.code), Some("CA"));
        assert_eq!(lookup("District of Columbia").map(|s| s.code), Some("DC"));
        assert!(lookup("california").is_none());
        assert!(lookup("CA").is_none());
    }

    #[test]
    fn test_codes_unique_and_reversible() {
        let codes: HashSet<_> = STATES.iter().map(|s| s.code).collect();
        assert_eq!(codes.len(), STATES.len());
        for state in STATES.iter() {
            assert_eq!(by_code(state.code), Some(state));
        }
    }
}
