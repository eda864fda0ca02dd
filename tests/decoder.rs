use info_indexer::decoder::decode_payload;

#[test]
fn empty_payload_yields_nothing() {
    // "0x" is the empty-data sentinel for plain value transfers
    assert_eq!(decode_payload("0x"), None);
}

#[test]
fn ascii_text_round_trips() {
    // bytes "hello"
    assert_eq!(decode_payload("0x68656c6c6f"), Some("hello".to_string()));
}

#[test]
fn cjk_text_round_trips() {
    // UTF-8 for "你好"
    assert_eq!(decode_payload("0xe4bda0e5a5bd"), Some("你好".to_string()));
}

#[test]
fn mixed_case_hex_digits_are_accepted() {
    assert_eq!(decode_payload("0x68656C6C6F"), Some("hello".to_string()));
}

#[test]
fn lone_continuation_byte_yields_nothing() {
    // 0xff is not valid UTF-8 on its own; the replacement character it turns
    // into is filtered out, leaving nothing printable
    assert_eq!(decode_payload("0xff"), None);
}

#[test]
fn missing_prefix_yields_nothing() {
    assert_eq!(decode_payload("68656c6c6f"), None);
    assert_eq!(decode_payload(""), None);
}

#[test]
fn odd_length_yields_nothing() {
    assert_eq!(decode_payload("0x686"), None);
}

#[test]
fn non_hex_characters_yield_nothing() {
    assert_eq!(decode_payload("0x68zz"), None);
    assert_eq!(decode_payload("0x0x68"), None);
    // Multi-byte characters in the hex portion must not panic the slicer
    assert_eq!(decode_payload("0x你好"), None);
}

#[test]
fn signed_pairs_are_not_valid_hex() {
    // from_str_radix would accept a leading sign; a pair is only valid as
    // two hex digits
    assert_eq!(decode_payload("0x68+5"), None);
    assert_eq!(decode_payload("0x68-0"), None);
    assert_eq!(decode_payload("0x+5"), None);
}

#[test]
fn control_characters_are_dropped() {
    // "\nhi\n" keeps only "hi"
    assert_eq!(decode_payload("0x0a68690a"), Some("hi".to_string()));
}

#[test]
fn binary_prefix_does_not_mask_text() {
    // A NUL and an invalid byte ahead of "hello"
    assert_eq!(decode_payload("0x00ff68656c6c6f"), Some("hello".to_string()));
}

#[test]
fn non_cjk_unicode_is_dropped() {
    // "😀" (F0 9F 98 80) falls outside both retained ranges
    assert_eq!(decode_payload("0xf09f9880"), None);
    // "héllo" keeps only the ASCII characters
    assert_eq!(decode_payload("0x68c3a96c6c6f"), Some("hllo".to_string()));
}

#[test]
fn every_single_byte_payload_is_handled() {
    for byte in 0u16..=255 {
        let hex = format!("0x{byte:02x}");
        if let Some(text) = decode_payload(&hex) {
            assert!(!text.is_empty(), "decoded text for {hex} must be non-empty");
            assert!(
                text.chars()
                    .all(|c| matches!(c, ' '..='~' | '\u{4E00}'..='\u{9FA5}')),
                "unexpected character in decode of {hex}: {text:?}"
            );
        }
    }
}

#[test]
fn arbitrary_blobs_never_produce_unprintable_output() {
    // Deterministic pseudo-random byte soup, including invalid UTF-8 runs
    let mut state: u32 = 0x2545_f491;
    for _ in 0..64 {
        let mut hex = String::from("0x");
        for _ in 0..32 {
            state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
            hex.push_str(&format!("{:02x}", (state >> 24) as u8));
        }
        if let Some(text) = decode_payload(&hex) {
            assert!(!text.is_empty());
            assert!(text
                .chars()
                .all(|c| matches!(c, ' '..='~' | '\u{4E00}'..='\u{9FA5}')));
        }
    }
}
