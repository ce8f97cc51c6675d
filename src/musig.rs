//! MuSig: several signers jointly producing a single Schnorr signature.
//!
//! The keys of the signers are combined into one public key, with each key
//! weighted by a coefficient derived from the hash of the whole ordered list,
//! so that nobody can cancel out the keys of the others.
//!
//! Signing proceeds in rounds, each of which is a stage of a [`MuSigSession`]:
//!
//! 1. Every signer initializes a session, getting a commitment to their nonce.
//! 2. Once all the commitments are exchanged, each signer reveals their nonce.
//! 3. The nonces are checked against the commitments, and combined.
//! 4. Each signer produces a partial signature.
//! 5. The partial signatures are combined into an ordinary Schnorr signature.
//!
//! Calling an operation at the wrong stage, or receiving a nonce which does
//! not match its commitment, aborts the session for good.
//!
//! The session id must never be reused with the same key. Two sessions with
//! the same id and message but different nonces from the other signers leak
//! the secret key. This isn't something a single session can check.
use std::fmt;

use k256::{ProjectivePoint, Scalar};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::{
    constants::MESSAGE_SIZE,
    crypto::{self, Digest},
    curve,
    error::{Error, MuSigError, Result},
    keys::{KeyMaterial, PublicKey},
    participants::ParticipantMap,
    schnorr::{self, Signature},
};

const NONCE_TAG: &[u8] = b"cait-zkp v0.1.0 musig nonce";

/// The coefficient the key of a given signer gets multiplied by.
fn coefficient(key_set_hash: &Digest, index: u32) -> Scalar {
    curve::reduce_bytes(&crypto::hash(&(key_set_hash, index)).to_bytes())
}

/// Combine an ordered list of public keys into a single key.
///
/// This also returns the hash of the list, which every session needs.
/// The order matters: permuting the keys produces a different combined key.
pub fn combine_public_keys(publics: &[PublicKey]) -> Result<(PublicKey, Digest)> {
    if publics.is_empty() {
        return Err(Error::BadParameters(
            "cannot combine an empty list of keys".to_owned(),
        ));
    }
    let n = u32::try_from(publics.len())
        .map_err(|_| Error::BadParameters("too many keys to combine".to_owned()))?;
    let key_set_hash = crypto::hash(publics);
    let combined: ProjectivePoint = publics
        .iter()
        .zip(0..n)
        .map(|(public, i)| public.to_projective() * coefficient(&key_set_hash, i))
        .sum();
    let combined = PublicKey::from_point(&combined).ok_or(Error::InvalidPoint)?;
    Ok((combined, key_set_hash))
}

/// Add `tweak * G` to a combined key.
///
/// A session run against the tweaked key, whose partial signatures are then
/// combined with the same tweak, produces a signature valid for the tweaked key.
pub fn tweak_public_key(combined: &PublicKey, tweak: &[u8; 32]) -> Result<PublicKey> {
    let tweak = curve::scalar_from_bytes(tweak).ok_or(Error::InvalidScalar)?;
    let point = combined.to_projective() + ProjectivePoint::GENERATOR * tweak;
    PublicKey::from_point(&point).ok_or(Error::InvalidPoint)
}

/// The contribution of a single signer to the final signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartialSignature(#[serde(with = "crate::serde::scalar_bytes")] Scalar);

impl PartialSignature {
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let bytes: &[u8; 32] = bytes
            .try_into()
            .map_err(|_| Error::length("partial signature", 32, bytes.len()))?;
        let s = curve::scalar_from_bytes(bytes).ok_or(Error::InvalidScalar)?;
        Ok(Self(s))
    }

    pub fn serialize(&self) -> [u8; 32] {
        curve::scalar_to_bytes(&self.0)
    }
}

/// Shift a partial signature by an adaptor secret.
///
/// The flag must be the one reported by the session which produced the partial
/// signature, since negating the combined nonce also negates the adaptor.
pub fn adapt_partial(
    partial: &PartialSignature,
    adaptor_secret: &[u8; 32],
    nonce_is_negated: bool,
) -> Result<PartialSignature> {
    let t = curve::scalar_from_bytes(adaptor_secret).ok_or(Error::InvalidScalar)?;
    let mut t = Zeroizing::new(t);
    if nonce_is_negated {
        *t = -*t;
    }
    Ok(PartialSignature(partial.0 + *t))
}

/// Recover the adaptor secret from a final signature and the unadapted partials.
pub fn extract_adaptor(
    signature: &Signature,
    partials: &[PartialSignature],
    nonce_is_negated: bool,
) -> Zeroizing<[u8; 32]> {
    let sum: Scalar = partials.iter().map(|p| p.0).sum();
    let mut t = Zeroizing::new(*signature.s() - sum);
    if nonce_is_negated {
        *t = -*t;
    }
    Zeroizing::new(curve::scalar_to_bytes(&t))
}

/// The stage a session is at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStage {
    Initialized,
    NonceCommitted,
    NoncesCombined,
    PartiallySigned,
    Combined,
    Aborted,
}

impl fmt::Display for SessionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionStage::Initialized => "initialized",
            SessionStage::NonceCommitted => "nonce committed",
            SessionStage::NoncesCombined => "nonces combined",
            SessionStage::PartiallySigned => "partially signed",
            SessionStage::Combined => "combined",
            SessionStage::Aborted => "aborted",
        };
        f.write_str(name)
    }
}

/// What every session knows about the signing ceremony.
#[derive(Debug, Clone)]
struct Context {
    message: [u8; MESSAGE_SIZE],
    combined: PublicKey,
    key_set_hash: Digest,
    n_signers: u32,
}

impl Context {
    fn new(
        msg32: &[u8],
        combined: &PublicKey,
        key_set_hash: &Digest,
        n_signers: u32,
    ) -> Result<Self> {
        let message = msg32
            .try_into()
            .map_err(|_| Error::length("message", MESSAGE_SIZE, msg32.len()))?;
        if n_signers == 0 {
            return Err(Error::BadParameters(
                "a session needs at least one signer".to_owned(),
            ));
        }
        Ok(Self {
            message,
            combined: *combined,
            key_set_hash: *key_set_hash,
            n_signers,
        })
    }
}

/// The secret state of the signer running a session.
struct SignerSecret {
    index: u32,
    /// The secret key, already multiplied by the signer's coefficient.
    key: Scalar,
    nonce: Scalar,
    public_nonce: PublicKey,
    commitment: Digest,
}

impl Zeroize for SignerSecret {
    fn zeroize(&mut self) {
        self.key.zeroize();
        self.nonce.zeroize();
    }
}

impl Drop for SignerSecret {
    fn drop(&mut self) {
        self.zeroize();
    }
}

impl ZeroizeOnDrop for SignerSecret {}

impl fmt::Debug for SignerSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignerSecret")
            .field("index", &self.index)
            .field("public_nonce", &self.public_nonce)
            .finish_non_exhaustive()
    }
}

/// The state once the combined nonce, and thus the challenge, is known.
#[derive(Debug)]
struct Signing {
    context: Context,
    signer: Option<SignerSecret>,
    nonces: Vec<PublicKey>,
    r: [u8; 32],
    nonce_is_negated: bool,
    challenge: Scalar,
}

#[derive(Debug)]
enum State {
    Initialized {
        context: Context,
        signer: SignerSecret,
    },
    NonceCommitted {
        context: Context,
        signer: Option<SignerSecret>,
        commitments: Vec<Digest>,
        nonces: ParticipantMap<PublicKey>,
    },
    NoncesCombined(Signing),
    PartiallySigned(Signing),
    Combined(Signature),
    Aborted(String),
}

impl State {
    fn stage(&self) -> SessionStage {
        match self {
            State::Initialized { .. } => SessionStage::Initialized,
            State::NonceCommitted { .. } => SessionStage::NonceCommitted,
            State::NoncesCombined(_) => SessionStage::NoncesCombined,
            State::PartiallySigned(_) => SessionStage::PartiallySigned,
            State::Combined(_) => SessionStage::Combined,
            State::Aborted(_) => SessionStage::Aborted,
        }
    }

    fn context(&self) -> Option<&Context> {
        match self {
            State::Initialized { context, .. } | State::NonceCommitted { context, .. } => {
                Some(context)
            }
            State::NoncesCombined(signing) | State::PartiallySigned(signing) => {
                Some(&signing.context)
            }
            State::Combined(_) | State::Aborted(_) => None,
        }
    }
}

/// A single party's view of a MuSig signing ceremony.
///
/// This is either a signer, holding a key and a secret nonce, or a verifier,
/// which only watches the public messages, checking partial signatures and
/// combining them.
#[derive(Debug)]
pub struct MuSigSession {
    state: State,
}

impl MuSigSession {
    /// Start a session as the signer at `index`, returning the nonce commitment to broadcast.
    ///
    /// The session id must be unique for each ceremony this key takes part in.
    pub fn initialize_signer(
        session_id: &[u8; 32],
        msg32: &[u8],
        combined: &PublicKey,
        key_set_hash: &Digest,
        n_signers: u32,
        index: u32,
        key: &KeyMaterial,
    ) -> Result<(Self, Digest)> {
        let context = Context::new(msg32, combined, key_set_hash, n_signers)?;
        if index >= n_signers {
            return Err(MuSigError::UnknownSigner(index).into());
        }

        let secret = key.secret_bytes();
        let digest = Zeroizing::new(curve::sha256(&[
            NONCE_TAG,
            session_id,
            &context.message,
            &combined.to_compressed(),
            key_set_hash.as_ref(),
            &secret[..],
        ]));
        let nonce = curve::reduce_bytes(&digest);
        let public_nonce = PublicKey::from_point(&(ProjectivePoint::GENERATOR * nonce))
            .ok_or_else(|| Error::ProofFailed("derived a zero nonce".to_owned()))?;
        let commitment = crypto::commit(&public_nonce);
        let signer = SignerSecret {
            index,
            key: coefficient(key_set_hash, index) * key.scalar(),
            nonce,
            public_nonce,
            commitment,
        };

        debug!("musig signer {index} of {n_signers} initialized");
        let state = State::Initialized { context, signer };
        Ok((Self { state }, commitment))
    }

    /// Start a session which holds no key, given the nonce commitments of every signer.
    pub fn initialize_verifier(
        msg32: &[u8],
        combined: &PublicKey,
        key_set_hash: &Digest,
        commitments: &[Digest],
    ) -> Result<Self> {
        let n_signers = u32::try_from(commitments.len())
            .map_err(|_| Error::BadParameters("too many signers".to_owned()))?;
        let context = Context::new(msg32, combined, key_set_hash, n_signers)?;
        debug!("musig verifier initialized for {n_signers} signers");
        Ok(Self {
            state: State::NonceCommitted {
                context,
                signer: None,
                commitments: commitments.to_vec(),
                nonces: ParticipantMap::new(commitments.len()),
            },
        })
    }

    pub fn stage(&self) -> SessionStage {
        self.state.stage()
    }

    /// Whether the combined nonce had to be negated, once it is known.
    ///
    /// This is needed to adapt partial signatures, or to extract an adaptor secret.
    pub fn nonce_is_negated(&self) -> Option<bool> {
        match &self.state {
            State::NoncesCombined(signing) | State::PartiallySigned(signing) => {
                Some(signing.nonce_is_negated)
            }
            _ => None,
        }
    }

    /// The final signature, once partial signatures have been combined.
    pub fn signature(&self) -> Option<Signature> {
        match &self.state {
            State::Combined(signature) => Some(*signature),
            _ => None,
        }
    }

    fn take(&mut self) -> State {
        std::mem::replace(&mut self.state, State::Aborted(String::new()))
    }

    fn abort<T>(&mut self, error: MuSigError) -> Result<T> {
        warn!("aborting musig session: {error}");
        self.state = State::Aborted(error.to_string());
        Err(error.into())
    }

    fn out_of_order<T>(&mut self, state: State, expected: SessionStage) -> Result<T> {
        if let State::Aborted(reason) = state {
            let error = MuSigError::SessionAborted(reason.clone());
            self.state = State::Aborted(reason);
            return Err(error.into());
        }
        let found = state.stage();
        self.abort(MuSigError::InvalidState { expected, found })
    }

    fn expect_signers(&self, found: usize) -> Result<()> {
        let expected = self.state.context().map_or(0, |c| c.n_signers as usize);
        if found != expected {
            return Err(Error::BadParameters(format!(
                "expected data from {expected} signers, found {found}"
            )));
        }
        Ok(())
    }

    /// Learn the nonce commitments of all signers, and reveal our own nonce.
    pub fn reveal_nonce(&mut self, commitments: &[Digest]) -> Result<PublicKey> {
        if matches!(self.state, State::Initialized { .. }) {
            self.expect_signers(commitments.len())?;
        }
        let (context, signer) = match self.take() {
            State::Initialized { context, signer } => (context, signer),
            other => return self.out_of_order(other, SessionStage::Initialized),
        };
        if commitments[signer.index as usize] != signer.commitment {
            return self.abort(MuSigError::NonceCommitmentMismatch(signer.index));
        }

        let public_nonce = signer.public_nonce;
        debug!("musig signer {} revealed its nonce", signer.index);
        self.state = State::NonceCommitted {
            nonces: ParticipantMap::new(commitments.len()),
            commitments: commitments.to_vec(),
            signer: Some(signer),
            context,
        };
        Ok(public_nonce)
    }

    /// Record the nonce of a single signer, checking it against their commitment.
    pub fn set_nonce(&mut self, index: u32, nonce: &PublicKey) -> Result<()> {
        let State::NonceCommitted {
            commitments,
            nonces,
            ..
        } = &mut self.state
        else {
            let state = self.take();
            return self.out_of_order(state, SessionStage::NonceCommitted);
        };
        let Some(commitment) = commitments.get(index as usize) else {
            return Err(MuSigError::UnknownSigner(index).into());
        };
        if crypto::commit(nonce) != *commitment {
            return self.abort(MuSigError::NonceCommitmentMismatch(index));
        }
        if nonces.get(index) == Some(nonce) {
            return Ok(());
        }
        nonces.put(index, *nonce)?;
        Ok(())
    }

    /// Combine the nonces of every signer, optionally adding an adaptor point.
    ///
    /// The nonces may be passed here in signer order, or one at a time through
    /// [`MuSigSession::set_nonce`] beforehand, in which case the list can be empty.
    /// This returns the combined nonce, before any negation.
    pub fn combine_nonces(
        &mut self,
        nonces: &[PublicKey],
        adaptor: Option<&PublicKey>,
    ) -> Result<PublicKey> {
        if !nonces.is_empty() && matches!(self.state, State::NonceCommitted { .. }) {
            self.expect_signers(nonces.len())?;
        }
        for (i, nonce) in (0u32..).zip(nonces) {
            self.set_nonce(i, nonce)?;
        }

        let (context, signer, nonces) = match self.take() {
            State::NonceCommitted {
                context,
                signer,
                nonces,
                ..
            } => (context, signer, nonces),
            other => return self.out_of_order(other, SessionStage::NonceCommitted),
        };
        let nonces = match nonces.into_vec() {
            Ok(nonces) => nonces,
            Err(error) => return self.abort(error),
        };

        let mut sum: ProjectivePoint = nonces.iter().map(|nonce| nonce.to_projective()).sum();
        if let Some(adaptor) = adaptor {
            sum += adaptor.to_projective();
        }
        let Some(combined_nonce) = PublicKey::from_point(&sum) else {
            return self.abort(MuSigError::SessionAborted(
                "combined nonce is the identity".to_owned(),
            ));
        };
        let nonce_is_negated = !curve::has_quad_y(combined_nonce.as_affine());
        let r = curve::x_bytes(combined_nonce.as_affine());
        let challenge = schnorr::challenge(&r, &context.combined, &context.message);

        debug!("musig nonces combined, negated: {nonce_is_negated}");
        self.state = State::NoncesCombined(Signing {
            context,
            signer,
            nonces,
            r,
            nonce_is_negated,
            challenge,
        });
        Ok(combined_nonce)
    }

    /// Produce our partial signature.
    ///
    /// The secret nonce is erased afterwards, so this can only happen once.
    pub fn partial_sign(&mut self) -> Result<PartialSignature> {
        let mut signing = match self.take() {
            State::NoncesCombined(signing) => signing,
            other => return self.out_of_order(other, SessionStage::NoncesCombined),
        };
        let Some(signer) = signing.signer.take() else {
            self.state = State::NoncesCombined(signing);
            return Err(MuSigError::NotASigner.into());
        };

        let mut k = Zeroizing::new(signer.nonce);
        if signing.nonce_is_negated {
            *k = -*k;
        }
        let partial = PartialSignature(*k + signing.challenge * signer.key);

        debug!("musig signer {} produced a partial signature", signer.index);
        self.state = State::PartiallySigned(signing);
        Ok(partial)
    }

    /// Check the partial signature of a given signer.
    ///
    /// This isn't needed to produce a valid signature, but identifies which
    /// signer misbehaved when the combined signature turns out to be invalid.
    pub fn verify_partial(
        &mut self,
        index: u32,
        partial: &PartialSignature,
        public: &PublicKey,
    ) -> Result<bool> {
        let signing = match &self.state {
            State::NoncesCombined(signing) | State::PartiallySigned(signing) => signing,
            _ => {
                let state = self.take();
                return self.out_of_order(state, SessionStage::NoncesCombined);
            }
        };
        let Some(nonce) = signing.nonces.get(index as usize) else {
            return Err(MuSigError::UnknownSigner(index).into());
        };

        let mut big_r = nonce.to_projective();
        if signing.nonce_is_negated {
            big_r = -big_r;
        }
        let e = signing.challenge * coefficient(&signing.context.key_set_hash, index);
        Ok(ProjectivePoint::GENERATOR * partial.0 == big_r + public.to_projective() * e)
    }

    /// Sum the partial signatures of every signer into a signature.
    ///
    /// The result should still be checked with [`schnorr::verify`] against the
    /// combined key: a bad partial signature makes for a bad signature.
    pub fn combine_partials(
        &mut self,
        partials: &[PartialSignature],
        tweak: Option<&[u8; 32]>,
    ) -> Result<Signature> {
        let tweak = tweak
            .map(|t| curve::scalar_from_bytes(t).ok_or(Error::InvalidScalar))
            .transpose()?;
        if self.state.context().is_some() {
            self.expect_signers(partials.len())?;
        }
        let signing = match self.take() {
            State::PartiallySigned(signing) => signing,
            State::NoncesCombined(signing) if signing.signer.is_none() => signing,
            other => return self.out_of_order(other, SessionStage::PartiallySigned),
        };

        let mut s: Scalar = partials.iter().map(|p| p.0).sum();
        if let Some(tweak) = tweak {
            s += signing.challenge * tweak;
        }
        let signature = Signature::new(signing.r, s);

        debug!("musig partial signatures combined");
        self.state = State::Combined(signature);
        Ok(signature)
    }
}

#[cfg(test)]
mod test {
    use rand_core::OsRng;

    use super::*;

    struct Ceremony {
        keys: Vec<KeyMaterial>,
        publics: Vec<PublicKey>,
        combined: PublicKey,
        key_set_hash: Digest,
        message: [u8; 32],
    }

    fn ceremony(n: usize) -> Ceremony {
        let keys: Vec<_> = (0..n)
            .map(|_| KeyMaterial::generate_with_rng(&mut OsRng).unwrap())
            .collect();
        let publics: Vec<_> = keys.iter().map(|k| k.public_key()).collect();
        let (combined, key_set_hash) = combine_public_keys(&publics).unwrap();
        Ceremony {
            keys,
            publics,
            combined,
            key_set_hash,
            message: curve::sha256(&[&b"musig test message"[..]]),
        }
    }

    fn session_id(i: usize) -> [u8; 32] {
        curve::sha256(&[&b"session"[..], &(i as u64).to_be_bytes()[..]])
    }

    /// Run the rounds up to combining nonces.
    fn sessions_with_nonces(
        c: &Ceremony,
        combined: &PublicKey,
        adaptor: Option<&PublicKey>,
    ) -> Vec<MuSigSession> {
        let n = c.keys.len() as u32;
        let mut sessions = Vec::new();
        let mut commitments = Vec::new();
        for (i, key) in c.keys.iter().enumerate() {
            let (session, commitment) = MuSigSession::initialize_signer(
                &session_id(i),
                &c.message,
                combined,
                &c.key_set_hash,
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
        for session in &mut sessions {
            session.combine_nonces(&nonces, adaptor).unwrap();
        }
        sessions
    }

    #[test]
    fn test_combining_keys_is_order_sensitive() {
        let c = ceremony(2);
        let reversed = [c.publics[1], c.publics[0]];
        let (other, other_hash) = combine_public_keys(&reversed).unwrap();
        assert_ne!(other, c.combined);
        assert_ne!(other_hash, c.key_set_hash);
        assert!(combine_public_keys(&[]).is_err());

        // Signing in the reversed order works under the reversed key only.
        let original = c.combined;
        let swapped = Ceremony {
            keys: c.keys.into_iter().rev().collect(),
            publics: reversed.to_vec(),
            combined: other,
            key_set_hash: other_hash,
            message: c.message,
        };
        let mut sessions = sessions_with_nonces(&swapped, &swapped.combined, None);
        let partials: Vec<_> = sessions
            .iter_mut()
            .map(|s| s.partial_sign().unwrap())
            .collect();
        let signature = sessions[0].combine_partials(&partials, None).unwrap();
        assert!(schnorr::verify(&signature, &swapped.message, &other));
        assert!(!schnorr::verify(&signature, &swapped.message, &original));
    }

    #[test]
    fn test_three_signers() {
        let c = ceremony(3);
        let mut sessions = sessions_with_nonces(&c, &c.combined, None);
        let partials: Vec<_> = sessions
            .iter_mut()
            .map(|s| s.partial_sign().unwrap())
            .collect();

        for (i, partial) in partials.iter().enumerate() {
            assert!(sessions[0]
                .verify_partial(i as u32, partial, &c.publics[i])
                .unwrap());
        }
        assert!(!sessions[0]
            .verify_partial(0, &partials[1], &c.publics[0])
            .unwrap());

        let signature = sessions[1].combine_partials(&partials, None).unwrap();
        assert_eq!(sessions[1].stage(), SessionStage::Combined);
        assert_eq!(sessions[1].signature(), Some(signature));
        assert!(schnorr::verify(&signature, &c.message, &c.combined));
    }

    #[test]
    fn test_single_signer() {
        let c = ceremony(1);
        let mut sessions = sessions_with_nonces(&c, &c.combined, None);
        let partial = sessions[0].partial_sign().unwrap();
        let signature = sessions[0].combine_partials(&[partial], None).unwrap();
        assert!(schnorr::verify(&signature, &c.message, &c.combined));
    }

    #[test]
    fn test_tweaked_key() {
        let c = ceremony(2);
        let tweak = curve::sha256(&[&b"tweak"[..]]);
        let tweaked = tweak_public_key(&c.combined, &tweak).unwrap();
        let mut sessions = sessions_with_nonces(&c, &tweaked, None);
        let partials: Vec<_> = sessions
            .iter_mut()
            .map(|s| s.partial_sign().unwrap())
            .collect();
        let signature = sessions[0]
            .combine_partials(&partials, Some(&tweak))
            .unwrap();
        assert!(schnorr::verify(&signature, &c.message, &tweaked));
        assert!(!schnorr::verify(&signature, &c.message, &c.combined));
    }

    #[test]
    fn test_nonce_mismatch_aborts() {
        let c = ceremony(2);
        let n = 2;
        let mut commitments = Vec::new();
        let mut sessions = Vec::new();
        for (i, key) in c.keys.iter().enumerate() {
            let (session, commitment) = MuSigSession::initialize_signer(
                &session_id(i),
                &c.message,
                &c.combined,
                &c.key_set_hash,
                n,
                i as u32,
                key,
            )
            .unwrap();
            sessions.push(session);
            commitments.push(commitment);
        }
        let nonce0 = sessions[0].reveal_nonce(&commitments).unwrap();
        let _ = sessions[1].reveal_nonce(&commitments).unwrap();

        // Signer 1 swaps in a different nonce after committing.
        let fake = KeyMaterial::generate().unwrap().public_key();
        let result = sessions[0].combine_nonces(&[nonce0, fake], None);
        assert_eq!(
            result,
            Err(MuSigError::NonceCommitmentMismatch(1).into())
        );
        assert_eq!(sessions[0].stage(), SessionStage::Aborted);

        // Aborted sessions stay that way.
        assert!(matches!(
            sessions[0].partial_sign(),
            Err(Error::MuSig(MuSigError::SessionAborted(_)))
        ));
        assert!(matches!(
            sessions[0].combine_nonces(&[], None),
            Err(Error::MuSig(MuSigError::SessionAborted(_)))
        ));
    }

    #[test]
    fn test_own_commitment_must_match() {
        let c = ceremony(2);
        let (mut session, _) = MuSigSession::initialize_signer(
            &session_id(0),
            &c.message,
            &c.combined,
            &c.key_set_hash,
            2,
            0,
            &c.keys[0],
        )
        .unwrap();
        let bogus = crypto::commit(&1u32);
        assert!(session.reveal_nonce(&[bogus, bogus]).is_err());
        assert_eq!(session.stage(), SessionStage::Aborted);
    }

    #[test]
    fn test_out_of_order_aborts() {
        let c = ceremony(2);
        let (mut session, commitment) = MuSigSession::initialize_signer(
            &session_id(0),
            &c.message,
            &c.combined,
            &c.key_set_hash,
            2,
            0,
            &c.keys[0],
        )
        .unwrap();
        assert_eq!(session.stage(), SessionStage::Initialized);
        assert_eq!(
            session.partial_sign(),
            Err(MuSigError::InvalidState {
                expected: SessionStage::NoncesCombined,
                found: SessionStage::Initialized,
            }
            .into())
        );
        assert_eq!(session.stage(), SessionStage::Aborted);
        assert!(session.reveal_nonce(&[commitment, commitment]).is_err());
    }

    #[test]
    fn test_bad_inputs_do_not_abort() {
        let c = ceremony(2);
        assert!(MuSigSession::initialize_signer(
            &session_id(0),
            &c.message[..31],
            &c.combined,
            &c.key_set_hash,
            2,
            0,
            &c.keys[0],
        )
        .is_err());
        assert_eq!(
            MuSigSession::initialize_signer(
                &session_id(0),
                &c.message,
                &c.combined,
                &c.key_set_hash,
                2,
                2,
                &c.keys[0],
            )
            .unwrap_err(),
            MuSigError::UnknownSigner(2).into()
        );

        let (mut session, commitment) = MuSigSession::initialize_signer(
            &session_id(0),
            &c.message,
            &c.combined,
            &c.key_set_hash,
            2,
            0,
            &c.keys[0],
        )
        .unwrap();
        assert!(session.reveal_nonce(&[commitment]).is_err());
        assert_eq!(session.stage(), SessionStage::Initialized);
    }

    #[test]
    fn test_missing_nonce_aborts() {
        let c = ceremony(2);
        let (mut session, commitment) = MuSigSession::initialize_signer(
            &session_id(0),
            &c.message,
            &c.combined,
            &c.key_set_hash,
            2,
            0,
            &c.keys[0],
        )
        .unwrap();
        let other = crypto::commit(&2u32);
        let nonce = session.reveal_nonce(&[commitment, other]).unwrap();
        session.set_nonce(0, &nonce).unwrap();
        session.set_nonce(0, &nonce).unwrap();
        assert_eq!(
            session.set_nonce(2, &nonce),
            Err(MuSigError::UnknownSigner(2).into())
        );
        assert_eq!(
            session.combine_nonces(&[], None),
            Err(MuSigError::MissingSigner(1).into())
        );
        assert_eq!(session.stage(), SessionStage::Aborted);
    }

    #[test]
    fn test_verifier_session() {
        let c = ceremony(3);
        let n = 3;
        let mut sessions = Vec::new();
        let mut commitments = Vec::new();
        for (i, key) in c.keys.iter().enumerate() {
            let (session, commitment) = MuSigSession::initialize_signer(
                &session_id(i),
                &c.message,
                &c.combined,
                &c.key_set_hash,
                n,
                i as u32,
                key,
            )
            .unwrap();
            sessions.push(session);
            commitments.push(commitment);
        }
        let mut verifier =
            MuSigSession::initialize_verifier(&c.message, &c.combined, &c.key_set_hash, &commitments)
                .unwrap();
        assert_eq!(verifier.stage(), SessionStage::NonceCommitted);

        let nonces: Vec<_> = sessions
            .iter_mut()
            .map(|s| s.reveal_nonce(&commitments).unwrap())
            .collect();
        // The verifier hears the nonces in some arbitrary order.
        for i in [2u32, 0, 1] {
            verifier.set_nonce(i, &nonces[i as usize]).unwrap();
        }
        let combined_nonce = verifier.combine_nonces(&[], None).unwrap();
        assert_eq!(verifier.partial_sign(), Err(MuSigError::NotASigner.into()));
        assert_eq!(verifier.stage(), SessionStage::NoncesCombined);

        let mut partials = Vec::new();
        for session in &mut sessions {
            assert_eq!(session.combine_nonces(&nonces, None).unwrap(), combined_nonce);
            partials.push(session.partial_sign().unwrap());
        }
        for (i, partial) in partials.iter().enumerate() {
            assert!(verifier
                .verify_partial(i as u32, partial, &c.publics[i])
                .unwrap());
        }
        let signature = verifier.combine_partials(&partials, None).unwrap();
        assert!(schnorr::verify(&signature, &c.message, &c.combined));
    }

    #[test]
    fn test_adaptor_signature() {
        let c = ceremony(2);
        let adaptor_key = KeyMaterial::generate().unwrap();
        let adaptor_point = adaptor_key.public_key();
        let mut sessions = sessions_with_nonces(&c, &c.combined, Some(&adaptor_point));
        let negated = sessions[0].nonce_is_negated().unwrap();
        assert_eq!(sessions[1].nonce_is_negated(), Some(negated));

        let partials: Vec<_> = sessions
            .iter_mut()
            .map(|s| s.partial_sign().unwrap())
            .collect();

        // Without the adaptor secret, the signature doesn't verify.
        let unadapted = sessions[0].combine_partials(&partials, None).unwrap();
        assert!(!schnorr::verify(&unadapted, &c.message, &c.combined));

        let secret = adaptor_key.secret_bytes();
        let adapted = adapt_partial(&partials[0], &secret, negated).unwrap();
        let signature = sessions[1]
            .combine_partials(&[adapted, partials[1]], None)
            .unwrap();
        assert!(schnorr::verify(&signature, &c.message, &c.combined));

        let extracted = extract_adaptor(&signature, &partials, negated);
        assert_eq!(&extracted[..], &secret[..]);
    }

    #[test]
    fn test_partial_signature_bytes() {
        let c = ceremony(2);
        let mut sessions = sessions_with_nonces(&c, &c.combined, None);
        let partial = sessions[0].partial_sign().unwrap();
        assert_eq!(
            PartialSignature::parse(&partial.serialize()).unwrap(),
            partial
        );
        assert!(PartialSignature::parse(&[0u8; 31]).is_err());

        let encoded = rmp_serde::to_vec(&partial).unwrap();
        let decoded: PartialSignature = rmp_serde::from_slice(&encoded).unwrap();
        assert_eq!(decoded, partial);
        assert!(PartialSignature::parse(&[0xff; 32]).is_err());
    }
}
