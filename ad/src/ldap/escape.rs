//! Escaping for DN components and search filters per RFC 4514 / RFC 4515.
//!
//! User-supplied values must never be spliced into a DN or filter raw, or a
//! crafted CN could rewrite the query.

/// Escapes a value for use as an attribute value inside a DN (RFC 4514)
pub fn escape_dn_value(value: &str) -> String {
    let last = value.chars().count().saturating_sub(1);
    let mut out = String::with_capacity(value.len());
    for (i, c) in value.chars().enumerate() {
        match c {
            '\\' | ',' | '+' | '"' | '<' | '>' | ';' | '=' => {
                out.push('\\');
                out.push(c);
            }
            '#' | ' ' if i == 0 => {
                out.push('\\');
                out.push(c);
            }
            ' ' if i == last => {
                out.push('\\');
                out.push(c);
            }
            '\0' => out.push_str("\\00"),
            '\n' => out.push_str("\\0A"),
            '\r' => out.push_str("\\0D"),
            _ => out.push(c),
        }
    }
    out
}

/// Escapes a value for use inside a search filter (RFC 4515)
pub fn escape_filter_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\5c"),
            '*' => out.push_str("\\2a"),
            '(' => out.push_str("\\28"),
            ')' => out.push_str("\\29"),
            '\0' => out.push_str("\\00"),
            _ => out.push(c),
        }
    }
    out
}

/// Splits a DN into its leading RDN and the parent DN at the first unescaped
/// comma. Escaped commas (as produced by `escape_dn_value`) stay inside the
/// RDN. None when the DN has no parent.
pub(crate) fn split_rdn(dn: &str) -> Option<(&str, &str)> {
    let mut chars = dn.char_indices();
    while let Some((i, c)) = chars.next() {
        match c {
            '\\' => {
                chars.next();
            }
            ',' => return Some((&dn[..i], &dn[i + 1..])),
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dn_value_special_chars() {
        assert_eq!(escape_dn_value("plain"), "plain");
        assert_eq!(escape_dn_value("a,b"), "a\\,b");
        assert_eq!(escape_dn_value("a+b=c"), "a\\+b\\=c");
        assert_eq!(escape_dn_value("say \"hi\""), "say \\\"hi\\\"");
        assert_eq!(escape_dn_value("<tag>"), "\\<tag\\>");
        assert_eq!(escape_dn_value("a;b"), "a\\;b");
        assert_eq!(escape_dn_value("back\\slash"), "back\\\\slash");
    }

    #[test]
    fn dn_value_leading_trailing() {
        assert_eq!(escape_dn_value(" lead"), "\\ lead");
        assert_eq!(escape_dn_value("trail "), "trail\\ ");
        assert_eq!(escape_dn_value("#hash"), "\\#hash");
        assert_eq!(escape_dn_value("in side"), "in side");
    }

    #[test]
    fn dn_value_control_chars() {
        assert_eq!(escape_dn_value("a\nb"), "a\\0Ab");
        assert_eq!(escape_dn_value("a\rb"), "a\\0Db");
        assert_eq!(escape_dn_value("a\0b"), "a\\00b");
    }

    #[test]
    fn filter_value_special_chars() {
        assert_eq!(escape_filter_value("plain"), "plain");
        assert_eq!(escape_filter_value("a*b"), "a\\2ab");
        assert_eq!(escape_filter_value("(cn=x)"), "\\28cn=x\\29");
        assert_eq!(escape_filter_value("back\\slash"), "back\\5cslash");
        assert_eq!(escape_filter_value("a\0b"), "a\\00b");
    }

    #[test]
    fn split_rdn_walks_escaped_commas() {
        assert_eq!(
            split_rdn("CN=eng,OU=Groups,DC=example,DC=com"),
            Some(("CN=eng", "OU=Groups,DC=example,DC=com"))
        );
        // a CN containing a comma is escaped in the DN and must stay in the RDN
        assert_eq!(
            split_rdn("CN=a\\,b,OU=Groups,DC=example,DC=com"),
            Some(("CN=a\\,b", "OU=Groups,DC=example,DC=com"))
        );
        assert_eq!(split_rdn("DC=com"), None);
    }

    #[test]
    fn filter_injection_is_neutralized() {
        let hostile = "*)(objectClass=*";
        assert_eq!(
            escape_filter_value(hostile),
            "\\2a\\29\\28objectClass=\\2a"
        );
    }
}
