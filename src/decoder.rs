/// Best-effort recovery of human-readable text from raw transaction calldata.
///
/// Calldata is usually ABI-encoded and non-textual; this is a heuristic for
/// the case where a transaction carries raw UTF-8 data. Every failure mode
/// degrades to `None`. Malformed hex is an expected input, not a fault.
///
/// Keeps only printable ASCII (0x20-0x7E) and CJK Unified Ideographs
/// (U+4E00-U+9FA5). Invalid UTF-8 sequences are replaced during the lossy
/// decode and the replacement characters are dropped by the filter.
pub fn decode_payload(hex: &str) -> Option<String> {
    let stripped = hex.strip_prefix("0x")?;
    if stripped.is_empty()
        || stripped.len() % 2 != 0
        || !stripped.bytes().all(|b| b.is_ascii_hexdigit())
    {
        return None;
    }

    let bytes = stripped
        .as_bytes()
        .chunks(2)
        .map(|pair| {
            // Chunks are valid UTF-8 slices since the input is all hex digits
            std::str::from_utf8(pair)
                .ok()
                .and_then(|s| u8::from_str_radix(s, 16).ok())
        })
        .collect::<Option<Vec<u8>>>()?;

    let decoded = String::from_utf8_lossy(&bytes);
    let filtered: String = decoded.chars().filter(|c| is_printable(*c)).collect();

    if filtered.is_empty() {
        None
    } else {
        Some(filtered)
    }
}

fn is_printable(c: char) -> bool {
    matches!(c, ' '..='~' | '\u{4E00}'..='\u{9FA5}')
}
