//! Email address normalization
//!
//! Addresses are canonicalized before they are stored or compared. Only the
//! domain part is case-folded: the local part of an address is
//! case-sensitive by RFC 5321, so `Taro@Example.COM` becomes
//! `Taro@example.com`.
//!
//! # Example
//!
//! ```
//! use orgauth_shared::email::normalize_email;
//!
//! assert_eq!(normalize_email("Taro@Example.COM"), "Taro@example.com");
//! assert_eq!(normalize_email(" user@HOST.jp "), "user@host.jp");
//! assert_eq!(normalize_email("not-an-address"), "not-an-address");
//! ```

/// Normalizes an email address by lowercasing its domain part
///
/// Surrounding whitespace is trimmed and the address is split at the last
/// `@`. Input without an `@` is returned unchanged (including whitespace),
/// so that validation can reject it later with the original value.
///
/// Normalization is idempotent: `normalize_email(&normalize_email(x)) ==
/// normalize_email(x)` for every `x`.
pub fn normalize_email(email: &str) -> String {
    match email.trim().rsplit_once('@') {
        Some((local, domain)) => format!("{}@{}", local, domain.to_lowercase()),
        None => email.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_is_lowercased() {
        assert_eq!(normalize_email("user@EXAMPLE.COM"), "user@example.com");
    }

    #[test]
    fn test_local_part_is_preserved() {
        assert_eq!(normalize_email("Yamada.Taro@Example.Co.JP"), "Yamada.Taro@example.co.jp");
    }

    #[test]
    fn test_whitespace_is_trimmed() {
        assert_eq!(normalize_email("  user@Example.com\n"), "user@example.com");
    }

    #[test]
    fn test_splits_at_last_at_sign() {
        assert_eq!(normalize_email("\"a@b\"@Example.COM"), "\"a@b\"@example.com");
    }

    #[test]
    fn test_without_at_sign_is_unchanged() {
        assert_eq!(normalize_email("plainaddress"), "plainaddress");
        assert_eq!(normalize_email(" spaced "), " spaced ");
        assert_eq!(normalize_email(""), "");
    }

    #[test]
    fn test_normalization_is_idempotent() {
        let inputs = vec![
            "user@EXAMPLE.COM",
            "  Mixed.Case@Sub.Domain.ORG  ",
            "no-at-sign",
            " padded-no-at ",
            "@ONLYDOMAIN",
            "trailing@",
            "unicode@ドメイン.JP",
            "a@b@C.D",
        ];

        for input in inputs {
            let once = normalize_email(input);
            let twice = normalize_email(&once);
            assert_eq!(once, twice, "normalization of '{}' should be idempotent", input);
        }
    }
}
