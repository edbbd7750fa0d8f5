//! Derivation of PostgreSQL schema names and subdomains from usernames.

use once_cell::sync::Lazy;
use regex::Regex;

/// PostgreSQL identifier limit (NAMEDATALEN - 1).
pub const MAX_LABEL_LEN: usize = 63;

const FALLBACK_LABEL: &str = "tenant";

static SCHEMA_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z][a-z0-9_]{0,62}$").expect("valid regex"));

/// Namespaces that hold PostgreSQL catalogs or the shared tables.
const RESERVED_SCHEMAS: &[&str] = &["public", "information_schema"];

pub fn is_reserved_schema_name(value: &str) -> bool {
    value.starts_with("pg_") || RESERVED_SCHEMAS.contains(&value)
}

pub fn is_valid_schema_name(value: &str) -> bool {
    SCHEMA_NAME_RE.is_match(value) && !is_reserved_schema_name(value)
}

/// Canonical form of a host or domain: trimmed, lowercased, no trailing dot.
pub fn normalize_domain(raw: &str) -> String {
    raw.trim().trim_end_matches('.').to_ascii_lowercase()
}

pub fn is_valid_subdomain(value: &str) -> bool {
    !value.is_empty()
        && value.len() <= MAX_LABEL_LEN
        && value
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        && !value.starts_with('-')
        && !value.ends_with('-')
        && !value.contains("--")
}

fn truncate_ascii(s: &mut String, max: usize) {
    if s.len() > max {
        s.truncate(max);
    }
}

/// Lowercases the username and maps every character outside `[a-z0-9_]` to `_`.
/// Names not starting with a letter, or starting with the catalog prefix `pg_`,
/// get a `tenant_` prefix; trailing underscores are dropped after truncation.
pub fn generate_schema_name(username: &str) -> String {
    let mut name: String = username
        .to_lowercase()
        .chars()
        .map(|c| {
            if c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if !name.starts_with(|c: char| c.is_ascii_lowercase()) || name.starts_with("pg_") {
        name = format!("{FALLBACK_LABEL}_{name}");
    }
    truncate_ascii(&mut name, MAX_LABEL_LEN);
    let trimmed = name.trim_end_matches('_');
    trimmed.to_string()
}

/// Lowercases the username and maps every character outside `[a-z0-9-]` to `-`,
/// collapsing runs and trimming hyphens from both ends.
pub fn generate_subdomain(username: &str) -> String {
    let mut out = String::with_capacity(username.len());
    for c in username.to_lowercase().chars() {
        let c = if c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' {
            c
        } else {
            '-'
        };
        if c == '-' && out.ends_with('-') {
            continue;
        }
        out.push(c);
    }
    let mut sub = out.trim_matches('-').to_string();
    truncate_ascii(&mut sub, MAX_LABEL_LEN);
    let sub = sub.trim_end_matches('-');
    if sub.is_empty() {
        FALLBACK_LABEL.to_string()
    } else {
        sub.to_string()
    }
}

/// `base`, `base_1`, `base_2`, ...
pub fn schema_candidate(base: &str, attempt: u32) -> String {
    if attempt == 0 {
        return base.to_string();
    }
    let suffix = format!("_{attempt}");
    let mut head = base.to_string();
    truncate_ascii(&mut head, MAX_LABEL_LEN.saturating_sub(suffix.len()));
    format!("{}{suffix}", head.trim_end_matches('_'))
}

/// `base`, `base1`, `base2`, ...
pub fn subdomain_candidate(base: &str, attempt: u32) -> String {
    if attempt == 0 {
        return base.to_string();
    }
    let suffix = attempt.to_string();
    let mut head = base.to_string();
    truncate_ascii(&mut head, MAX_LABEL_LEN.saturating_sub(suffix.len()));
    format!("{}{suffix}", head.trim_end_matches('-'))
}

pub fn full_domain(subdomain: &str, base_domain: &str) -> String {
    format!("{subdomain}.{base_domain}")
}

#[cfg(test)]
mod tests {
    use super::*;

    const USERNAMES: &[&str] = &[
        "Jane.Doe!",
        "bob",
        "42isTheAnswer",
        "___",
        "",
        "!!!",
        "Ünïcödé User",
        "a-b-c",
        "trailing___",
        "x@y.com",
        "UPPER_lower_123",
        "--dash--start--",
        "İstanbul",
        "pg_catalog",
        "PG_Toast",
    ];

    #[test]
    fn jane_doe_example() {
        assert_eq!(generate_schema_name("Jane.Doe!"), "jane_doe");
        assert_eq!(schema_candidate("jane_doe", 1), "jane_doe_1");
        assert_eq!(schema_candidate("jane_doe", 2), "jane_doe_2");
        assert_eq!(generate_subdomain("Jane.Doe!"), "jane-doe");
        assert_eq!(subdomain_candidate("jane-doe", 1), "jane-doe1");
    }

    #[test]
    fn schema_names_always_valid() {
        for name in USERNAMES {
            let schema = generate_schema_name(name);
            assert!(is_valid_schema_name(&schema), "{name:?} -> {schema:?}");
            for attempt in [1, 9, 10, 12345] {
                let c = schema_candidate(&schema, attempt);
                assert!(is_valid_schema_name(&c), "{name:?} -> {c:?}");
            }
        }
    }

    #[test]
    fn subdomains_always_valid() {
        for name in USERNAMES {
            let sub = generate_subdomain(name);
            assert!(is_valid_subdomain(&sub), "{name:?} -> {sub:?}");
            for attempt in [1, 10, 999] {
                let c = subdomain_candidate(&sub, attempt);
                assert!(is_valid_subdomain(&c), "{name:?} -> {c:?}");
            }
        }
    }

    #[test]
    fn leading_digit_gets_prefix() {
        assert_eq!(generate_schema_name("42isTheAnswer"), "tenant_42istheanswer");
        assert_eq!(generate_schema_name(""), "tenant");
        assert_eq!(generate_schema_name("___"), "tenant");
    }

    #[test]
    fn long_names_are_capped() {
        let long = "a".repeat(200);
        assert_eq!(generate_schema_name(&long).len(), MAX_LABEL_LEN);
        assert_eq!(generate_subdomain(&long).len(), MAX_LABEL_LEN);
        let base = generate_schema_name(&long);
        let c = schema_candidate(&base, 7);
        assert_eq!(c.len(), MAX_LABEL_LEN);
        assert!(c.ends_with("_7"));
    }

    #[test]
    fn truncation_does_not_leave_trailing_hyphen() {
        let name = format!("{}.b", "a".repeat(62));
        let sub = generate_subdomain(&name);
        assert_eq!(sub, "a".repeat(62));
    }

    #[test]
    fn hyphen_runs_collapse() {
        assert_eq!(generate_subdomain("--dash--start--"), "dash-start");
        assert_eq!(generate_subdomain("x@y.com"), "x-y-com");
        assert_eq!(generate_subdomain("!!!"), "tenant");
    }

    #[test]
    fn schema_regex_matches_postgres_rules() {
        assert!(is_valid_schema_name("a"));
        assert!(is_valid_schema_name(&"a".repeat(63)));
        assert!(!is_valid_schema_name(&"a".repeat(64)));
        assert!(!is_valid_schema_name("1abc"));
        assert!(!is_valid_schema_name("abc-def"));
        assert!(!is_valid_schema_name("Abc"));
        assert!(!is_valid_schema_name(""));
    }

    #[test]
    fn reserved_namespaces_are_never_valid() {
        for name in ["public", "information_schema", "pg_catalog", "pg_temp_1", "pg_"] {
            assert!(is_reserved_schema_name(name), "{name}");
            assert!(!is_valid_schema_name(name), "{name}");
        }
        assert!(is_valid_schema_name("pg"));
        assert!(is_valid_schema_name("public_1"));
        assert_eq!(generate_schema_name("pg_catalog"), "tenant_pg_catalog");
    }

    #[test]
    fn domains_normalize_to_lowercase_without_root_dot() {
        assert_eq!(normalize_domain(" Club.Tabs.Example.org. "), "club.tabs.example.org");
        assert_eq!(normalize_domain("club.tabs.example.org"), "club.tabs.example.org");
    }
}
