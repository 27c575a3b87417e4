//! One-way masking of key material for the table view.
//!
//! Keys shaped like `<prefix>_<subprefix>_<rest>` with a recognized
//! public prefix keep both prefix segments and get a fixed-width mask,
//! so the length of the secret part is never revealed. Anything else
//! keeps its first three characters.

/// Character used to hide key material.
pub const MASK_CHAR: char = '*';

/// Public prefixes recognized when no configuration overrides them.
pub const DEFAULT_PUBLIC_PREFIXES: &[&str] = &["pk"];

/// Width of the mask after a recognized `<prefix>_<subprefix>_`.
const PREFIXED_MASK_LEN: usize = 6;

/// Leading characters left visible for unprefixed keys.
const VISIBLE_CHARS: usize = 3;

/// Mask a secret using the default public prefixes.
pub fn display_secret(secret: &str) -> String {
    mask_secret(secret, DEFAULT_PUBLIC_PREFIXES)
}

/// Mask a secret, treating any of `prefixes` as a public prefix token.
pub fn mask_secret<S: AsRef<str>>(secret: &str, prefixes: &[S]) -> String {
    if let Some((prefix, subprefix)) = split_public_prefix(secret, prefixes) {
        return format!("{prefix}_{subprefix}_{}", mask(PREFIXED_MASK_LEN));
    }

    let total = secret.chars().count();
    // Too short to keep a visible head.
    if total < VISIBLE_CHARS {
        return mask(total);
    }

    let visible: String = secret.chars().take(VISIBLE_CHARS).collect();
    format!("{visible}{}", mask(total - VISIBLE_CHARS))
}

fn split_public_prefix<'a, S: AsRef<str>>(
    secret: &'a str,
    prefixes: &[S],
) -> Option<(&'a str, &'a str)> {
    let mut parts = secret.splitn(3, '_');
    let prefix = parts.next()?;
    let subprefix = parts.next()?;
    // Only the separator matters; the remainder may be empty.
    parts.next()?;

    if subprefix.is_empty() {
        return None;
    }

    prefixes
        .iter()
        .any(|p| p.as_ref() == prefix)
        .then_some((prefix, subprefix))
}

fn mask(len: usize) -> String {
    std::iter::repeat(MASK_CHAR).take(len).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_prefix_keeps_both_segments() {
        assert_eq!(display_secret("pk_live_abc123"), "pk_live_******");
    }

    #[test]
    fn public_prefix_hides_remainder_length() {
        assert_eq!(
            display_secret("pk_test_a"),
            display_secret("pk_test_aaaaaaaaaaaaaaaaaaaaaaaa")
        );
    }

    #[test]
    fn unprefixed_keeps_first_three_chars() {
        assert_eq!(display_secret("sk9999"), "sk9***");
        assert_eq!(display_secret("sk_live_abc"), "sk_********");
    }

    #[test]
    fn incomplete_prefix_falls_back_to_default_rule() {
        assert_eq!(display_secret("pk_abc"), "pk_***");
        assert_eq!(display_secret("pk__abc"), "pk_****");
    }

    #[test]
    fn empty_remainder_still_gets_the_fixed_mask() {
        assert_eq!(display_secret("pk_live_"), "pk_live_******");
    }

    #[test]
    fn three_char_secret_follows_the_head_rule() {
        assert_eq!(display_secret("abc"), "abc");
    }

    #[test]
    fn shorter_secrets_are_fully_masked() {
        assert_eq!(display_secret("ab"), "**");
        assert_eq!(display_secret(""), "");
    }

    #[test]
    fn counts_characters_not_bytes() {
        assert_eq!(display_secret("clé-secrète"), "clé********");
    }

    #[test]
    fn custom_prefixes_are_recognized() {
        let prefixes = ["pk", "sk"];
        assert_eq!(mask_secret("sk_live_abcdef", &prefixes), "sk_live_******");
    }
}
