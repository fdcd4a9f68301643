//! Locale-aware time strings for toasts and chat entry tooltips.

use chrono::{DateTime, Local, Locale, TimeZone};

/// Map a BCP 47 tag (`zh-TW`, `en`) onto a chrono locale, defaulting to
/// `en_US` when the tag is unknown.
pub fn locale_from_tag(tag: &str) -> Locale {
    let normalized = tag.trim().replace('-', "_");
    if let Ok(locale) = Locale::try_from(normalized.as_str()) {
        return locale;
    }

    // Bare language: try the conventional region.
    let language = normalized.split('_').next().unwrap_or_default();
    let guess = match language {
        "zh" => "zh_TW",
        "ja" => "ja_JP",
        "ko" => "ko_KR",
        "fr" => "fr_FR",
        "de" => "de_DE",
        _ => "en_US",
    };
    Locale::try_from(guess).unwrap_or(Locale::en_US)
}

/// Short local wall-clock time, as shown in a gift toast.
pub fn local_time<Tz: TimeZone>(at: &DateTime<Tz>, locale: &str) -> String {
    at.with_timezone(&Local)
        .format_localized("%X", locale_from_tag(locale))
        .to_string()
}

/// Time with the local zone, as shown in a chat entry tooltip. The zone is
/// the IANA name from `TZ` when one is set, otherwise the UTC offset.
pub fn full_time<Tz: TimeZone>(at: &DateTime<Tz>, locale: &str) -> String {
    let zone = std::env::var("TZ").ok();
    full_time_in_zone(at, locale, zone.as_deref())
}

pub fn full_time_in_zone<Tz: TimeZone>(at: &DateTime<Tz>, locale: &str, zone: Option<&str>) -> String {
    let local = at.with_timezone(&Local);
    let time = local.format_localized("%X", locale_from_tag(locale));
    match zone.and_then(zone_name) {
        Some(name) => format!("{time} {name}"),
        None => format!("{time} {}", local.format("%:z")),
    }
}

/// `Asia/Taipei` and `UTC` are names; `:/etc/localtime` and POSIX rules
/// such as `CST-8` are not.
fn zone_name(tz: &str) -> Option<&str> {
    let tz = tz.trim();
    let is_name = !tz.is_empty()
        && !tz.starts_with(':')
        && !tz.starts_with('/')
        && tz.chars().all(|c| c.is_ascii_alphabetic() || matches!(c, '/' | '_' | '-' | '+'))
        && !tz.ends_with(|c: char| c == '-' || c == '+');
    is_name.then_some(tz)
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    #[test]
    fn test_locale_from_tag() {
        assert_eq!(locale_from_tag("zh-TW"), Locale::zh_TW);
        assert_eq!(locale_from_tag("ja"), Locale::ja_JP);
        assert_eq!(locale_from_tag("xx-YY"), Locale::en_US);
    }

    #[test]
    fn test_full_time_names_the_zone() {
        let now = Utc::now();
        let short = local_time(&now, "en-US");

        let named = full_time_in_zone(&now, "en-US", Some("Asia/Taipei"));
        assert_eq!(named, format!("{short} Asia/Taipei"));

        let offset = now.with_timezone(&Local).format("%:z").to_string();
        for zone in [None, Some(":/etc/localtime"), Some("CST-8"), Some("")] {
            assert_eq!(full_time_in_zone(&now, "en-US", zone), format!("{short} {offset}"));
        }
    }
}
