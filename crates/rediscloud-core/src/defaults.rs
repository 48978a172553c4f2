//! Default back-substitution
//!
//! The API materialises defaults for fields the user left unset; echoing them
//! back into state would read as drift against an empty configuration. The
//! rules here normalise server defaults on Read: the open allow list is
//! elided (it means "unset"), the closed allow list is re-derived into its
//! canonical four-entry form, and write-only fields the API never returns
//! are preserved from stored state.

use crate::schema::{AttrMap, AttrValue, ResourceData};

/// Default-open allow list stored by the API when the subscription has
/// public endpoint access.
pub const OPEN_SOURCE_IPS: [&str; 1] = ["0.0.0.0/0"];

/// Default-closed allow list: RFC1918 ranges plus the CGNAT block.
pub const PRIVATE_SOURCE_IPS: [&str; 4] = [
    "10.0.0.0/8",
    "172.16.0.0/12",
    "192.168.0.0/16",
    "100.64.0.0/10",
];

/// Hashing policy the API applies when no regex rules are configured.
pub const DEFAULT_HASHING_POLICY: [&str; 2] = [".*\\{(?<tag>.*)\\}.*", "(?<tag>.*)"];

/// The allow list the API derives when the user configures none.
pub fn default_source_ips(public_endpoint_access: bool) -> Vec<String> {
    if public_endpoint_access {
        OPEN_SOURCE_IPS.iter().map(|s| s.to_string()).collect()
    } else {
        PRIVATE_SOURCE_IPS.iter().map(|s| s.to_string()).collect()
    }
}

fn same_set(a: &[String], b: &[&str]) -> bool {
    a.len() == b.len() && b.iter().all(|item| a.iter().any(|other| other == item))
}

/// Whether the observed allow list is exactly the applicable default.
pub fn is_default_source_ips(ips: &[String], public_endpoint_access: bool) -> bool {
    if public_endpoint_access {
        same_set(ips, &OPEN_SOURCE_IPS)
    } else {
        same_set(ips, &PRIVATE_SOURCE_IPS)
    }
}

pub fn is_default_hashing_policy(rules: &[String]) -> bool {
    rules.len() == DEFAULT_HASHING_POLICY.len()
        && rules
            .iter()
            .zip(DEFAULT_HASHING_POLICY.iter())
            .all(|(a, b)| a == b)
}

/// What Read does with a field the API normalised
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadRule {
    /// Reset to empty when the observed value is the server default and the
    /// user configured nothing.
    ElideWhenDefault,
    /// Replace a detected server default with its canonical derived form:
    /// the open allow list reads as unset, the closed allow list reads as
    /// the fixed private set.
    DeriveSourceIps,
    /// Keep the stored value; the API never echoes this field.
    PreserveFromState,
}

/// Context a default detector may need
#[derive(Debug, Clone, Copy, Default)]
pub struct ReadContext {
    pub public_endpoint_access: bool,
}

/// One back-substitution rule
pub struct DefaultRule {
    pub field: &'static str,
    pub rule: ReadRule,
    pub matches_default: fn(&AttrValue, &ReadContext) -> bool,
}

fn source_ips_is_default(value: &AttrValue, ctx: &ReadContext) -> bool {
    value
        .as_str_items()
        .is_some_and(|ips| is_default_source_ips(&ips, ctx.public_endpoint_access))
}

fn hashing_policy_is_default(value: &AttrValue, _ctx: &ReadContext) -> bool {
    value
        .as_str_items()
        .is_some_and(|rules| is_default_hashing_policy(&rules))
}

fn never(_value: &AttrValue, _ctx: &ReadContext) -> bool {
    false
}

/// The database Read rules, consulted by the generic post-processor.
pub const DATABASE_READ_RULES: [DefaultRule; 4] = [
    DefaultRule {
        field: "source_ips",
        rule: ReadRule::DeriveSourceIps,
        matches_default: source_ips_is_default,
    },
    DefaultRule {
        field: "hashing_policy",
        rule: ReadRule::ElideWhenDefault,
        matches_default: hashing_policy_is_default,
    },
    DefaultRule {
        field: "global_source_ips",
        rule: ReadRule::DeriveSourceIps,
        matches_default: source_ips_is_default,
    },
    DefaultRule {
        field: "remote_backup_storage_type",
        rule: ReadRule::PreserveFromState,
        matches_default: never,
    },
];

/// Apply the back-substitution table to freshly-read state.
///
/// Fields the user configured are left exactly as observed; only unset
/// fields get their server default normalised.
pub fn apply_read_rules(data: &ResourceData, observed: &mut AttrMap, ctx: &ReadContext) {
    for rule in &DATABASE_READ_RULES {
        match rule.rule {
            ReadRule::ElideWhenDefault | ReadRule::DeriveSourceIps => {
                if data.get_ok(rule.field).is_some() {
                    continue;
                }
                let Some(value) = observed.get(rule.field) else {
                    continue;
                };
                if !(rule.matches_default)(value, ctx) {
                    continue;
                }
                let normalised = match rule.rule {
                    ReadRule::ElideWhenDefault => AttrValue::Set(Vec::new()),
                    _ if ctx.public_endpoint_access => AttrValue::Set(Vec::new()),
                    _ => AttrValue::str_set(PRIVATE_SOURCE_IPS),
                };
                observed.insert(rule.field.to_string(), normalised);
            }
            ReadRule::PreserveFromState => {
                observed.remove(rule.field);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_allow_list_follows_endpoint_access() {
        assert_eq!(default_source_ips(true), vec!["0.0.0.0/0"]);
        assert_eq!(default_source_ips(false).len(), 4);
    }

    #[test]
    fn default_detection_is_order_insensitive() {
        let reordered = vec![
            "192.168.0.0/16".to_string(),
            "10.0.0.0/8".to_string(),
            "100.64.0.0/10".to_string(),
            "172.16.0.0/12".to_string(),
        ];
        assert!(is_default_source_ips(&reordered, false));
        assert!(!is_default_source_ips(&reordered, true));
        assert!(is_default_source_ips(&["0.0.0.0/0".to_string()], true));
    }

    #[test]
    fn partial_private_set_is_not_default() {
        let partial = vec!["10.0.0.0/8".to_string()];
        assert!(!is_default_source_ips(&partial, false));
    }

    #[test]
    fn open_default_is_elided_when_unconfigured() {
        let data = ResourceData::new(AttrMap::new());
        let mut observed = AttrMap::new();
        observed.insert("source_ips".to_string(), AttrValue::str_set(["0.0.0.0/0"]));
        let ctx = ReadContext {
            public_endpoint_access: true,
        };
        apply_read_rules(&data, &mut observed, &ctx);
        assert_eq!(observed["source_ips"], AttrValue::Set(Vec::new()));
    }

    #[test]
    fn closed_default_is_rederived_canonically() {
        let data = ResourceData::new(AttrMap::new());
        let mut observed = AttrMap::new();
        // API may report the set in any order.
        observed.insert(
            "source_ips".to_string(),
            AttrValue::str_set([
                "192.168.0.0/16",
                "100.64.0.0/10",
                "10.0.0.0/8",
                "172.16.0.0/12",
            ]),
        );
        let ctx = ReadContext {
            public_endpoint_access: false,
        };
        apply_read_rules(&data, &mut observed, &ctx);
        assert_eq!(observed["source_ips"], AttrValue::str_set(PRIVATE_SOURCE_IPS));
    }

    #[test]
    fn user_configured_value_is_untouched() {
        let mut config = AttrMap::new();
        config.insert("source_ips".to_string(), AttrValue::str_set(["0.0.0.0/0"]));
        let data = ResourceData::new(config);
        let mut observed = AttrMap::new();
        observed.insert("source_ips".to_string(), AttrValue::str_set(["0.0.0.0/0"]));
        let ctx = ReadContext {
            public_endpoint_access: true,
        };
        apply_read_rules(&data, &mut observed, &ctx);
        assert_eq!(observed["source_ips"], AttrValue::str_set(["0.0.0.0/0"]));
    }

    #[test]
    fn non_default_hashing_policy_is_kept() {
        let data = ResourceData::new(AttrMap::new());
        let mut observed = AttrMap::new();
        observed.insert(
            "hashing_policy".to_string(),
            AttrValue::str_list(["custom-(?<tag>.*)"]),
        );
        apply_read_rules(&data, &mut observed, &ReadContext::default());
        assert_eq!(
            observed["hashing_policy"],
            AttrValue::str_list(["custom-(?<tag>.*)"])
        );
    }

    #[test]
    fn default_hashing_policy_is_elided() {
        let data = ResourceData::new(AttrMap::new());
        let mut observed = AttrMap::new();
        observed.insert(
            "hashing_policy".to_string(),
            AttrValue::str_list(DEFAULT_HASHING_POLICY),
        );
        apply_read_rules(&data, &mut observed, &ReadContext::default());
        assert_eq!(observed["hashing_policy"], AttrValue::Set(Vec::new()));
    }

    #[test]
    fn write_only_fields_never_come_from_the_api() {
        let data = ResourceData::new(AttrMap::new());
        let mut observed = AttrMap::new();
        observed.insert(
            "remote_backup_storage_type".to_string(),
            AttrValue::str("aws-s3"),
        );
        apply_read_rules(&data, &mut observed, &ReadContext::default());
        assert!(!observed.contains_key("remote_backup_storage_type"));
    }
}
