use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use veilkit_privacy::{decode_note, encode_note, generate_deposit_note, verify_note, NOTE_PREFIX};

#[test]
fn tampered_payload_fails_decode_or_verify() {
    let note = generate_deposit_note(3.0, "SOL").unwrap();
    let encoded = encode_note(&note).unwrap();
    let payload = encoded.strip_prefix(NOTE_PREFIX).unwrap();
    let json = URL_SAFE_NO_PAD.decode(payload).unwrap();

    // Swap the secret for another decimal value inside the JSON
    let text = String::from_utf8(json).unwrap();
    let tampered_text = text.replacen(&note.secret.to_decimal(), "12345", 1);
    assert_ne!(text, tampered_text);

    let tampered = format!("{NOTE_PREFIX}{}", URL_SAFE_NO_PAD.encode(tampered_text));
    match decode_note(&tampered) {
        Ok(decoded) => assert!(!verify_note(&decoded), "tampered note must not verify"),
        Err(_) => {} // malformed after tampering is also acceptable
    }
}

#[test]
fn truncated_string_fails() {
    let note = generate_deposit_note(3.0, "SOL").unwrap();
    let encoded = encode_note(&note).unwrap();
    let truncated = &encoded[..encoded.len() - 10];
    assert!(decode_note(truncated).is_err());
}

#[test]
fn foreign_prefix_fails() {
    let note = generate_deposit_note(3.0, "SOL").unwrap();
    let encoded = encode_note(&note).unwrap();
    let renamed = encoded.replacen("privacy-cash", "other-pool", 1);
    assert!(decode_note(&renamed).is_err());
}
