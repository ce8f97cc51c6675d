//! This module holds some utilities for working with the signers of a session.
//!
//! Signers are identified by their index in the ordered list of public keys,
//! and often you need to store one item for each of them, filling the slots
//! in as messages arrive.

use crate::error::MuSigError;

/// A map from signer indices to elements.
///
/// The idea is that you have one element for each signer.
#[derive(Debug, Clone)]
pub struct ParticipantMap<T> {
    data: Vec<Option<T>>,
}

impl<T> ParticipantMap<T> {
    /// Create an empty map for a given number of signers.
    pub fn new(size: usize) -> Self {
        Self {
            data: (0..size).map(|_| None).collect(),
        }
    }

    pub fn get(&self, signer: u32) -> Option<&T> {
        self.data.get(signer as usize)?.as_ref()
    }

    /// Place the data for a signer in this map.
    ///
    /// Each signer can only do this once.
    pub fn put(&mut self, signer: u32, data: T) -> Result<(), MuSigError> {
        let slot = self
            .data
            .get_mut(signer as usize)
            .ok_or(MuSigError::UnknownSigner(signer))?;
        if slot.is_some() {
            return Err(MuSigError::Duplicate(signer));
        }
        *slot = Some(data);
        Ok(())
    }

    /// Return the first signer we haven't heard from yet, if any.
    pub fn missing(&self) -> Option<u32> {
        self.data.iter().position(Option::is_none).map(|i| i as u32)
    }

    /// Convert a full map into a vector, in signer order.
    pub fn into_vec(self) -> Result<Vec<T>, MuSigError> {
        if let Some(signer) = self.missing() {
            return Err(MuSigError::MissingSigner(signer));
        }
        Ok(self.data.into_iter().flatten().collect())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_participant_map() {
        let mut map = ParticipantMap::new(3);
        assert_eq!(map.missing(), Some(0));

        map.put(1, "b").unwrap();
        assert_eq!(map.get(1), Some(&"b"));
        assert_eq!(map.get(0), None);
        assert_eq!(map.put(1, "c"), Err(MuSigError::Duplicate(1)));
        assert_eq!(map.put(3, "d"), Err(MuSigError::UnknownSigner(3)));

        map.put(0, "a").unwrap();
        assert_eq!(map.missing(), Some(2));
        assert_eq!(map.clone().into_vec(), Err(MuSigError::MissingSigner(2)));

        map.put(2, "c").unwrap();
        assert_eq!(map.missing(), None);
        assert_eq!(map.into_vec().unwrap(), vec!["a", "b", "c"]);
    }
}
