use veilkit_privacy::{decode_note, encode_note, generate_deposit_note, verify_note, MerkleTree};

#[test]
fn note_roundtrip_through_tree() {
    // Full deposit-side flow: note, commitment into the tree, proof, and the
    // note string a wallet would persist
    let note = generate_deposit_note(5.0, "SOL").unwrap();
    assert!(verify_note(&note));

    let mut tree = MerkleTree::new(20).unwrap();
    let index = tree.insert(note.commitment).unwrap();

    let mut stored = note.clone();
    stored.leaf_index = Some(index);

    let encoded = encode_note(&stored).unwrap();
    let recovered = decode_note(&encoded).unwrap();
    assert_eq!(recovered, stored);
    assert_eq!(recovered.leaf_index, Some(0));

    // The recovered note still proves membership
    let proof = tree.generate_proof(recovered.leaf_index.unwrap()).unwrap();
    assert!(MerkleTree::verify_proof(recovered.commitment, &proof));
    assert!(tree.is_known_root(proof.root));
}

#[test]
fn many_notes_distinct_commitments() {
    let notes: Vec<_> = (0..16)
        .map(|_| generate_deposit_note(1.0, "USDC").unwrap())
        .collect();

    for (i, a) in notes.iter().enumerate() {
        for b in notes.iter().skip(i + 1) {
            assert_ne!(a.commitment, b.commitment);
            assert_ne!(a.nullifier_hash, b.nullifier_hash);
        }
    }
}
