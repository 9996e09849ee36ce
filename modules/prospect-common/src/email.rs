use std::sync::LazyLock;

use regex::Regex;

/// Permissive address matcher, applied to raw HTML and model output alike.
pub static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[A-Za-z0-9._%+\-]+@[A-Za-z0-9.\-]+\.[A-Za-z]{2,}").expect("valid regex")
});

static FULL_EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+\-]+@[A-Za-z0-9.\-]+\.[A-Za-z]{2,}$").expect("valid regex")
});

/// Substrings that mark an address as unusable for outreach.
const BLOCKED_FRAGMENTS: &[&str] = &["noreply", "no-reply", "example"];

/// Regex hits on asset filenames such as `logo@2x.png`.
const IMAGE_EXTENSIONS: &[&str] = &[".png", ".jpg", ".jpeg", ".gif", ".svg", ".webp", ".bmp", ".ico"];

pub fn is_valid_email(address: &str) -> bool {
    FULL_EMAIL_RE.is_match(address)
}

/// True for no-reply mailboxes, placeholder addresses, and image-filename false positives.
pub fn is_blocked_email(address: &str) -> bool {
    let lower = address.to_lowercase();
    BLOCKED_FRAGMENTS.iter().any(|f| lower.contains(f))
        || IMAGE_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
}

/// Normalize an address for comparison: trimmed, lowercased, trailing dot removed.
pub fn normalize_email(address: &str) -> String {
    address.trim().trim_end_matches('.').to_lowercase()
}

/// Part before the `@`, lowercased.
pub fn local_part(address: &str) -> String {
    address
        .split('@')
        .next()
        .unwrap_or_default()
        .to_lowercase()
}

/// Bare host of a website URL, lowercased with any `www.` prefix removed.
/// Accepts inputs without a scheme (`acme.fr/contact`).
pub fn extract_domain(website: &str) -> Option<String> {
    let trimmed = website.trim();
    if trimmed.is_empty() {
        return None;
    }
    let with_scheme = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    };
    let parsed = url::Url::parse(&with_scheme).ok()?;
    let host = parsed.host_str()?.to_lowercase();
    let host = host.strip_prefix("www.").unwrap_or(&host).to_string();
    (!host.is_empty()).then_some(host)
}

/// Scheme + host root (`https://acme.fr/`) for a website URL.
pub fn site_root(website: &str) -> Option<url::Url> {
    let trimmed = website.trim();
    let with_scheme = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    };
    let mut parsed = url::Url::parse(&with_scheme).ok()?;
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return None;
    }
    parsed.set_path("/");
    parsed.set_query(None);
    parsed.set_fragment(None);
    Some(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blocks_noreply_and_placeholders() {
        assert!(is_blocked_email("noreply@acme.fr"));
        assert!(is_blocked_email("No-Reply@acme.fr"));
        assert!(is_blocked_email("jean@example.com"));
        assert!(!is_blocked_email("contact@acme.fr"));
    }

    #[test]
    fn blocks_image_filenames() {
        assert!(is_blocked_email("logo@2x.png"));
        assert!(is_blocked_email("hero@3x.WEBP"));
        assert!(!is_blocked_email("png@acme.fr"));
    }

    #[test]
    fn validates_full_addresses_only() {
        assert!(is_valid_email("rh@acme.fr"));
        assert!(!is_valid_email("rh at acme.fr"));
        assert!(!is_valid_email("mail rh@acme.fr"));
    }

    #[test]
    fn extracts_domain_without_www() {
        assert_eq!(extract_domain("https://www.acme.fr/contact").as_deref(), Some("acme.fr"));
        assert_eq!(extract_domain("acme.fr").as_deref(), Some("acme.fr"));
        assert_eq!(extract_domain("HTTP://Shop.Acme.FR").as_deref(), Some("shop.acme.fr"));
        assert_eq!(extract_domain(""), None);
    }

    #[test]
    fn site_root_drops_path() {
        let root = site_root("https://acme.fr/fr/accueil?x=1#top").unwrap();
        assert_eq!(root.as_str(), "https://acme.fr/");
        assert!(site_root("ftp://acme.fr").is_none());
    }

    #[test]
    fn local_part_is_lowercased() {
        assert_eq!(local_part("Recrutement@Acme.fr"), "recrutement");
    }
}
