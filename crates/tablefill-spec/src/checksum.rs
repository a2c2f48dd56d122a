use sha2::{Digest, Sha256};

/// SHA-256 (lower-case hex) over each table id followed by its column headers, every item
/// terminated by `\n`.
pub fn compute_checksum<'a, T, H>(tables: T) -> String
where
    T: IntoIterator<Item = (&'a str, H)>,
    H: IntoIterator<Item = &'a str>,
{
    let mut hasher = Sha256::new();
    for (id, headers) in tables {
        hasher.update(id.as_bytes());
        hasher.update(b"\n");
        for header in headers {
            hasher.update(header.as_bytes());
            hasher.update(b"\n");
        }
    }
    format!("{:x}", hasher.finalize())
}

pub fn checksums_match(declared: &str, computed: &str) -> bool {
    declared.trim().eq_ignore_ascii_case(computed)
}
