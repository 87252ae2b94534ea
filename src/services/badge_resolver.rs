use crate::models::lookup::{BadgeLookup, BadgeScope};
use crate::services::irc_parser::NO_BADGES;

/// Resolve `moderator/1,subscriber/6` into image URLs, channel badges first.
/// Unknown or malformed pairs are dropped; order follows the tag.
pub fn resolve_badges<L: BadgeLookup + ?Sized>(badge_spec: &str, lookup: &L) -> Vec<String> {
    if badge_spec.is_empty() || badge_spec == NO_BADGES {
        return Vec::new();
    }

    badge_spec
        .split(',')
        .filter(|pair| !pair.is_empty())
        .filter_map(|pair| {
            let mut parts = pair.split('/');
            let set_id = parts.next().filter(|s| !s.is_empty())?;
            let version_id = parts.next().filter(|s| !s.is_empty())?;
            lookup
                .badge_url(set_id, version_id, BadgeScope::Channel)
                .or_else(|| lookup.badge_url(set_id, version_id, BadgeScope::Global))
                .map(|url| url.to_string())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::lookup::BadgeTables;

    fn tables() -> BadgeTables {
        let mut tables = BadgeTables::default();
        tables.global.insert("moderator", "1", "https://g/mod1");
        tables.global.insert("subscriber", "6", "https://g/sub6");
        tables.channel.insert("subscriber", "6", "https://c/sub6");
        tables.channel.insert("subscriber", "12", "https://c/sub12");
        tables
    }

    #[test]
    fn test_none_and_empty() {
        assert!(resolve_badges("(none)", &tables()).is_empty());
        assert!(resolve_badges("", &tables()).is_empty());
    }

    #[test]
    fn test_channel_precedence_and_order() {
        assert_eq!(
            resolve_badges("subscriber/6,moderator/1", &tables()),
            vec!["https://c/sub6", "https://g/mod1"]
        );
    }

    #[test]
    fn test_skips_malformed_and_unknown() {
        assert_eq!(
            resolve_badges("broken,,vip/1,/1,subscriber/,subscriber/12", &tables()),
            vec!["https://c/sub12"]
        );
    }

    #[test]
    fn test_empty_tables_degrade() {
        assert!(resolve_badges("moderator/1", &BadgeTables::default()).is_empty());
    }
}
