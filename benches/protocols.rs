use cait_zkp::{
    commit,
    mlsag::{self, RingShape},
    musig::{self, MuSigSession},
    schnorr, BlindingFactor, BulletProof, BulletProofConfig, KeyMaterial, PublicKey,
    ProveRequest, RangeProof, RangeProver,
};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rand_core::{OsRng, RngCore};

fn random_bytes() -> [u8; 32] {
    let mut out = [0u8; 32];
    OsRng.fill_bytes(&mut out);
    out
}

fn run_musig(keys: &[KeyMaterial], message: &[u8; 32]) -> schnorr::Signature {
    let publics: Vec<PublicKey> = keys.iter().map(|k| k.public_key()).collect();
    let (combined, key_set_hash) = musig::combine_public_keys(&publics).unwrap();

    let mut sessions = Vec::with_capacity(keys.len());
    let mut commitments = Vec::with_capacity(keys.len());
    for (i, key) in keys.iter().enumerate() {
        let (session, commitment) = MuSigSession::initialize_signer(
            &random_bytes(),
            message,
            &combined,
            &key_set_hash,
            keys.len() as u32,
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
    sessions[0].combine_partials(&partials, None).unwrap()
}

fn bench_range_proofs(c: &mut Criterion) {
    let value = 123_456_789;
    let blind = BlindingFactor::random(&mut OsRng);
    let commitment = commit(value, &blind).unwrap();
    let request = ProveRequest::new(value, &blind, &commitment);

    let legacy = RangeProof::default();
    c.bench_function("legacy range proof prove", |b| {
        b.iter(|| legacy.prove(black_box(&request)).unwrap())
    });
    let proof = legacy.prove(&request).unwrap();
    c.bench_function("legacy range proof verify", |b| {
        b.iter(|| legacy.verify(black_box(&commitment), black_box(&proof), &[], 0))
    });

    let bulletproof = BulletProof::new(BulletProofConfig::default()).unwrap();
    c.bench_function("bulletproof prove (64 bits)", |b| {
        b.iter(|| bulletproof.prove(black_box(&request)).unwrap())
    });
    let proof = bulletproof.prove(&request).unwrap();
    c.bench_function("bulletproof verify (64 bits)", |b| {
        b.iter(|| bulletproof.verify(black_box(&commitment), black_box(&proof), &[], 0))
    });
}

fn bench_signatures(c: &mut Criterion) {
    let key = KeyMaterial::generate().unwrap();
    let msg = random_bytes();
    c.bench_function("schnorr sign", |b| {
        b.iter(|| schnorr::sign(black_box(&msg), &key).unwrap())
    });

    let keys: Vec<_> = (0..16).map(|_| KeyMaterial::generate().unwrap()).collect();
    let msgs: Vec<[u8; 32]> = (0..16).map(|_| random_bytes()).collect();
    let sigs: Vec<_> = keys
        .iter()
        .zip(&msgs)
        .map(|(k, m)| schnorr::sign(m, k).unwrap())
        .collect();
    let publics: Vec<_> = keys.iter().map(|k| k.public_key()).collect();
    let msg_refs: Vec<&[u8]> = msgs.iter().map(|m| &m[..]).collect();
    c.bench_function("schnorr verify batch (16)", |b| {
        b.iter(|| schnorr::verify_batch(black_box(&sigs), &msg_refs, &publics))
    });

    let signers: Vec<_> = (0..3).map(|_| KeyMaterial::generate().unwrap()).collect();
    c.bench_function("musig (3 signers)", |b| {
        b.iter(|| run_musig(black_box(&signers), black_box(&msg)))
    });
}

fn bench_mlsag(c: &mut Criterion) {
    let n_cols = 8;
    let index = 5;
    let shape = RingShape::new(n_cols, 2).unwrap();
    let spend_key = KeyMaterial::generate().unwrap();

    let in_blind = BlindingFactor::random(&mut OsRng);
    let out_blind = BlindingFactor::random(&mut OsRng);
    let mut spend_keys = Vec::new();
    let mut inputs = Vec::new();
    for col in 0..n_cols {
        if col == index {
            spend_keys.push(spend_key.public_key());
            inputs.push(commit(100, &in_blind).unwrap());
        } else {
            spend_keys.push(KeyMaterial::generate().unwrap().public_key());
            inputs.push(commit(100, &BlindingFactor::random(&mut OsRng)).unwrap());
        }
    }
    let outputs = [commit(100, &out_blind).unwrap()];
    let blinds = [
        BlindingFactor::from_slice(&out_blind.to_bytes()).unwrap(),
        BlindingFactor::from_slice(&in_blind.to_bytes()).unwrap(),
    ];
    let prepared = mlsag::prepare(shape, &spend_keys, &inputs, &outputs, 1, &blinds).unwrap();
    let secrets = [
        BlindingFactor::from_slice(&spend_key.secret_bytes()[..]).unwrap(),
        BlindingFactor::from_slice(&prepared.blind_sum.to_bytes()).unwrap(),
    ];
    let preimage = random_bytes();
    let nonce = random_bytes();

    c.bench_function("mlsag generate (8x2)", |b| {
        b.iter(|| {
            mlsag::generate(
                black_box(&nonce),
                black_box(&preimage),
                &prepared.ring,
                index,
                &secrets,
            )
            .unwrap()
        })
    });
    let sig = mlsag::generate(&nonce, &preimage, &prepared.ring, index, &secrets).unwrap();
    c.bench_function("mlsag verify (8x2)", |b| {
        b.iter(|| mlsag::verify(black_box(&preimage), &prepared.ring, black_box(&sig)))
    });
}

criterion_group!(benches, bench_range_proofs, bench_signatures, bench_mlsag);
criterion_main!(benches);
