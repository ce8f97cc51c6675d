use rand_core::{OsRng, RngCore};

use crate::{
    blind_sum, commit,
    crypto::Digest,
    curve,
    mlsag::{self, RingShape},
    musig::{self, MuSigSession},
    schnorr, verify_commit_sum, BlindingFactor, BulletProof, BulletProofConfig, Commitment,
    KeyMaterial, ProveRequest, PublicKey, RangeProof, RangeProver,
};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn random_bytes() -> [u8; 32] {
    let mut out = [0u8; 32];
    OsRng.fill_bytes(&mut out);
    out
}

fn copy_blind(blind: &BlindingFactor) -> BlindingFactor {
    BlindingFactor::from_slice(&blind.to_bytes()).unwrap()
}

/// The secret side of a transaction: values and blinding factors.
struct Transaction {
    input_value: u64,
    input_blind: BlindingFactor,
    outputs: Vec<(u64, BlindingFactor)>,
    fee: u64,
}

impl Transaction {
    fn new(input_value: u64, output_values: &[u64]) -> Self {
        let outputs: Vec<_> = output_values
            .iter()
            .map(|v| (*v, BlindingFactor::random(&mut OsRng)))
            .collect();
        let fee = input_value - output_values.iter().sum::<u64>();
        Self {
            input_value,
            input_blind: BlindingFactor::random(&mut OsRng),
            outputs,
            fee,
        }
    }

    fn input(&self) -> Commitment {
        commit(self.input_value, &self.input_blind).unwrap()
    }

    /// The output commitments, with an unblinded fee at the end.
    fn outputs(&self) -> Vec<Commitment> {
        let mut out: Vec<_> = self
            .outputs
            .iter()
            .map(|(v, b)| commit(*v, b).unwrap())
            .collect();
        out.push(commit(self.fee, &BlindingFactor::zero()).unwrap());
        out
    }

    /// The blinding factor left over once inputs and outputs cancel.
    fn excess(&self) -> BlindingFactor {
        blind_sum([&self.input_blind], self.outputs.iter().map(|(_, b)| b))
    }
}

#[test]
fn test_confidential_transaction() {
    init_logging();
    let tx = Transaction::new(10_000, &[6_000, 3_900]);
    let input = tx.input();
    let outputs = tx.outputs();

    // The excess commits to zero, so it's a public key we can sign with.
    let excess = tx.excess();
    let excess_commit = commit(0, &excess).unwrap();
    let mut negatives = outputs.clone();
    negatives.push(excess_commit);
    assert!(verify_commit_sum(&[input], &negatives));
    assert!(!verify_commit_sum(&[input], &outputs));

    let excess_key = KeyMaterial::from_bytes(&excess.to_bytes()).unwrap();
    let kernel = curve::sha256(&[&b"kernel"[..], &tx.fee.to_be_bytes()[..]]);
    let signature = schnorr::sign(&kernel, &excess_key).unwrap();
    let excess_public = excess_commit.to_public_key().unwrap();
    assert!(schnorr::verify(&signature, &kernel, &excess_public));

    // Each output gets a range proof, from either prover.
    let provers: Vec<Box<dyn RangeProver>> = vec![
        Box::new(RangeProof::default()),
        Box::new(BulletProof::new(BulletProofConfig::default()).unwrap()),
    ];
    for prover in &provers {
        for ((value, blind), commitment) in tx.outputs.iter().zip(&outputs) {
            let request = ProveRequest::new(*value, blind, commitment).with_extra_commit(&kernel);
            let proof = prover.prove(&request).unwrap();
            assert!(prover.verify(commitment, &proof, &kernel, 0));
            assert!(!prover.verify(&input, &proof, &kernel, 0));
        }
    }
}

#[test]
fn test_rewinding_an_output() {
    init_logging();
    let tx = Transaction::new(500, &[420]);
    let outputs = tx.outputs();
    let (value, blind) = &tx.outputs[0];
    let nonce = random_bytes();

    let prover = RangeProof::default();
    let request = ProveRequest::new(*value, blind, &outputs[0])
        .with_nonce(&nonce)
        .with_message(b"memo: rent");
    let proof = prover.prove(&request).unwrap();

    let info = prover.rewind(&outputs[0], &proof, &nonce, &[]);
    assert!(info.success);
    assert_eq!(info.value, 420);
    assert_eq!(info.blind.to_bytes(), blind.to_bytes());
    assert_eq!(&info.message[..10], b"memo: rent");
    assert!(info.min <= 420 && 420 <= info.max);

    let other = random_bytes();
    assert!(!prover.rewind(&outputs[0], &proof, &other, &[]).success);
}

#[test]
fn test_ring_signed_transaction() {
    init_logging();
    let n_cols = 4;
    let index = 2;
    let shape = RingShape::new(n_cols, 2).unwrap();
    let tx = Transaction::new(7_000, &[5_000, 1_500]);
    let spend_key = KeyMaterial::generate().unwrap();

    // Decoys spend other inputs, with unrelated values.
    let mut spend_keys = Vec::new();
    let mut inputs = Vec::new();
    for col in 0..n_cols {
        if col == index {
            spend_keys.push(spend_key.public_key());
            inputs.push(tx.input());
        } else {
            spend_keys.push(KeyMaterial::generate().unwrap().public_key());
            let value = OsRng.next_u32() as u64;
            inputs.push(commit(value, &BlindingFactor::random(&mut OsRng)).unwrap());
        }
    }

    let mut blinds: Vec<_> = tx.outputs.iter().map(|(_, b)| copy_blind(b)).collect();
    blinds.push(copy_blind(&tx.input_blind));
    let prepared = mlsag::prepare(
        shape,
        &spend_keys,
        &inputs,
        &tx.outputs(),
        tx.outputs.len(),
        &blinds,
    )
    .unwrap();
    assert_eq!(prepared.blind_sum.to_bytes(), tx.excess().to_bytes());

    let secrets = [
        BlindingFactor::from_slice(&spend_key.secret_bytes()[..]).unwrap(),
        copy_blind(&prepared.blind_sum),
    ];
    let preimage = curve::sha256(&[&b"transaction"[..]]);
    let sig = mlsag::generate(&random_bytes(), &preimage, &prepared.ring, index, &secrets).unwrap();
    assert!(mlsag::verify(&preimage, &prepared.ring, &sig));

    let image = mlsag::key_image(&spend_key, &spend_key.public_key()).unwrap();
    assert_eq!(sig.key_images(), &[image]);
}

fn run_musig(keys: &[KeyMaterial], message: &[u8; 32]) -> (schnorr::Signature, PublicKey) {
    let publics: Vec<_> = keys.iter().map(|k| k.public_key()).collect();
    let (combined, key_set_hash): (PublicKey, Digest) =
        musig::combine_public_keys(&publics).unwrap();

    let n = keys.len() as u32;
    let mut sessions = Vec::new();
    let mut commitments = Vec::new();
    for (i, key) in keys.iter().enumerate() {
        let (session, commitment) = MuSigSession::initialize_signer(
            &random_bytes(),
            message,
            &combined,
            &key_set_hash,
            n,
            i as u32,
            key,
        )
        .unwrap();
        sessions.push(session);
        commitments.push(commitment);
    }
    let nonces: Vec<_> = sessions
        .iter_mut()
        .map(|s| s.reveal_nonce(&commitments).unwrap())
        .collect();
    let partials: Vec<_> = sessions
        .iter_mut()
        .map(|s| {
            s.combine_nonces(&nonces, None).unwrap();
            s.partial_sign().unwrap()
        })
        .collect();
    let signature = sessions[0].combine_partials(&partials, None).unwrap();
    (signature, combined)
}

#[test]
fn test_musig_signatures_batch_verify() {
    init_logging();
    let mut signatures = Vec::new();
    let mut messages = Vec::new();
    let mut publics = Vec::new();
    for n in 1..=3 {
        let keys: Vec<_> = (0..n).map(|_| KeyMaterial::generate().unwrap()).collect();
        let message = random_bytes();
        let (signature, combined) = run_musig(&keys, &message);
        signatures.push(signature);
        messages.push(message);
        publics.push(combined);
    }

    let single = KeyMaterial::generate().unwrap();
    let message = random_bytes();
    signatures.push(schnorr::sign(&message, &single).unwrap());
    messages.push(message);
    publics.push(single.public_key());

    let message_refs: Vec<&[u8]> = messages.iter().map(|m| &m[..]).collect();
    assert!(schnorr::verify_batch(&signatures, &message_refs, &publics));

    publics.swap(0, 1);
    assert!(!schnorr::verify_batch(&signatures, &message_refs, &publics));
}
