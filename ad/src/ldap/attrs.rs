//! Search entry attribute extraction, including Active Directory's binary
//! objectGUID and objectSid encodings.

use ldap3::SearchEntry;

pub(crate) fn single(entry: &SearchEntry, name: &str) -> String {
    entry
        .attrs
        .get(name)
        .and_then(|v| v.first())
        .cloned()
        .unwrap_or_default()
}

pub(crate) fn multi(entry: &SearchEntry, name: &str) -> Vec<String> {
    entry.attrs.get(name).cloned().unwrap_or_default()
}

/// Binary attributes land in bin_attrs unless the server's bytes happen to be
/// valid UTF-8, in which case ldap3 files them under attrs as a string.
pub(crate) fn binary(entry: &SearchEntry, name: &str) -> Option<Vec<u8>> {
    if let Some(values) = entry.bin_attrs.get(name) {
        return values.first().cloned();
    }
    entry
        .attrs
        .get(name)
        .and_then(|v| v.first())
        .map(|s| s.clone().into_bytes())
}

/// Formats a 16-byte objectGUID as the canonical string form. The first three
/// fields are stored little-endian, the rest big-endian.
pub(crate) fn decode_guid(bytes: &[u8]) -> Option<String> {
    if bytes.len() != 16 {
        return None;
    }
    Some(format!(
        "{:02x}{:02x}{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}{:02x}{:02x}{:02x}{:02x}",
        bytes[3], bytes[2], bytes[1], bytes[0],
        bytes[5], bytes[4],
        bytes[7], bytes[6],
        bytes[8], bytes[9],
        bytes[10], bytes[11], bytes[12], bytes[13], bytes[14], bytes[15],
    ))
}

/// Formats a binary objectSid as the "S-1-..." SDDL string. Layout: revision
/// byte, sub-authority count, 48-bit big-endian authority, then count
/// little-endian u32 sub-authorities.
pub(crate) fn decode_sid(bytes: &[u8]) -> Option<String> {
    if bytes.len() < 8 {
        return None;
    }
    let revision = bytes[0];
    let count = bytes[1] as usize;
    if bytes.len() != 8 + 4 * count {
        return None;
    }
    let mut authority: u64 = 0;
    for &b in &bytes[2..8] {
        authority = (authority << 8) | u64::from(b);
    }
    let mut sid = format!("S-{}-{}", revision, authority);
    for i in 0..count {
        let offset = 8 + 4 * i;
        let sub = u32::from_le_bytes([
            bytes[offset],
            bytes[offset + 1],
            bytes[offset + 2],
            bytes[offset + 3],
        ]);
        sid.push_str(&format!("-{}", sub));
    }
    Some(sid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn entry_with(
        attrs: Vec<(&str, Vec<&str>)>,
        bin_attrs: Vec<(&str, Vec<Vec<u8>>)>,
    ) -> SearchEntry {
        SearchEntry {
            dn: "CN=test,DC=example,DC=com".to_string(),
            attrs: attrs
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.into_iter().map(String::from).collect()))
                .collect(),
            bin_attrs: bin_attrs
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect::<HashMap<_, _>>(),
        }
    }

    #[test]
    fn single_and_multi_extraction() {
        let entry = entry_with(
            vec![
                ("cn", vec!["engineers"]),
                ("member", vec!["CN=a,DC=x", "CN=b,DC=x"]),
            ],
            vec![],
        );
        assert_eq!(single(&entry, "cn"), "engineers");
        assert_eq!(single(&entry, "missing"), "");
        assert_eq!(multi(&entry, "member"), vec!["CN=a,DC=x", "CN=b,DC=x"]);
        assert!(multi(&entry, "missing").is_empty());
    }

    #[test]
    fn binary_prefers_bin_attrs() {
        let entry = entry_with(
            vec![("objectGUID", vec!["text"])],
            vec![("objectGUID", vec![vec![1, 2, 3]])],
        );
        assert_eq!(binary(&entry, "objectGUID"), Some(vec![1, 2, 3]));

        let entry = entry_with(vec![("objectGUID", vec!["ab"])], vec![]);
        assert_eq!(binary(&entry, "objectGUID"), Some(vec![b'a', b'b']));
    }

    #[test]
    fn guid_mixed_endian_layout() {
        let bytes = [
            0x67, 0x45, 0x23, 0x01, 0xAB, 0x89, 0xEF, 0xCD, 0x01, 0x23, 0x45, 0x67, 0x89, 0xAB,
            0xCD, 0xEF,
        ];
        assert_eq!(
            decode_guid(&bytes).unwrap(),
            "01234567-89ab-cdef-0123-456789abcdef"
        );
        assert_eq!(decode_guid(&bytes[..15]), None);
    }

    #[test]
    fn sid_builtin_administrators() {
        // S-1-5-32-544, the well-known BUILTIN\Administrators SID
        let bytes = [
            1, 2, 0, 0, 0, 0, 0, 5, 32, 0, 0, 0, 0x20, 0x02, 0, 0,
        ];
        assert_eq!(decode_sid(&bytes).unwrap(), "S-1-5-32-544");
    }

    #[test]
    fn sid_rejects_bad_lengths() {
        assert_eq!(decode_sid(&[1, 1, 0]), None);
        // count says two sub-authorities but only one is present
        assert_eq!(decode_sid(&[1, 2, 0, 0, 0, 0, 0, 5, 32, 0, 0, 0]), None);
    }
}
