//! Public key pinning, spec §3 ("Public key pins entry") and invariant I5:
//! pinned keys are checked before any request body is sent.

use std::collections::HashMap;
use std::time::SystemTime;

#[derive(Clone, Debug)]
pub struct PinEntry {
	pub spki_sha256: Vec<[u8; 32]>,
	pub include_subdomains: bool,
	pub expiration: Option<SystemTime>,
}

#[derive(Debug, PartialEq, Eq)]
pub enum PinVerdict {
	/// No pins configured for this host; proceed normally.
	NotPinned,
	Matched,
	Mismatch,
}

#[derive(Default)]
pub struct PinStore {
	pins: HashMap<String, PinEntry>,
	pub bypass_for_local_trust_anchors: bool,
}

impl PinStore {
	pub fn new(bypass_for_local_trust_anchors: bool) -> Self {
		Self {
			pins: HashMap::new(),
			bypass_for_local_trust_anchors,
		}
	}

	pub fn add(&mut self, host: impl Into<String>, entry: PinEntry) {
		self.pins.insert(host.into().to_ascii_lowercase(), entry);
	}

	fn entry_for(&self, host: &str, now: SystemTime) -> Option<&PinEntry> {
		let host = host.to_ascii_lowercase();
		if let Some(entry) = self.pins.get(&host) {
			if entry.expiration.is_none_or(|exp| now < exp) {
				return Some(entry);
			}
			return None;
		}
		// Subdomain match: walk up the label chain looking for an entry
		// with `include_subdomains` set.
		let mut rest = host.as_str();
		while let Some((_, parent)) = rest.split_once('.') {
			if let Some(entry) = self.pins.get(parent) {
				if entry.include_subdomains && entry.expiration.is_none_or(|exp| now < exp) {
					return Some(entry);
				}
			}
			rest = parent;
		}
		None
	}

	/// `chain_spki` is the SPKI-SHA256 set of every certificate in the
	/// chain the peer presented; a pin matches if it intersects.
	/// `chain_anchored_to_local_trust_anchor` lets the caller report that
	/// the chain terminates at a user/admin-installed root, in which case
	/// `bypass_for_local_trust_anchors` may waive pinning entirely.
	pub fn verify(&self, host: &str, chain_spki: &[[u8; 32]], chain_anchored_to_local_trust_anchor: bool, now: SystemTime) -> PinVerdict {
		let Some(entry) = self.entry_for(host, now) else {
			return PinVerdict::NotPinned;
		};
		if self.bypass_for_local_trust_anchors && chain_anchored_to_local_trust_anchor {
			return PinVerdict::Matched;
		}
		if entry.spki_sha256.iter().any(|pinned| chain_spki.contains(pinned)) {
			PinVerdict::Matched
		} else {
			PinVerdict::Mismatch
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::time::Duration;

	fn spki(byte: u8) -> [u8; 32] {
		[byte; 32]
	}

	#[test]
	fn unpinned_host_passes_through() {
		let store = PinStore::new(false);
		assert_eq!(store.verify("example.com", &[spki(1)], false, SystemTime::now()), PinVerdict::NotPinned);
	}

	#[test]
	fn matching_spki_is_accepted() {
		let mut store = PinStore::new(false);
		store.add(
			"pinned.example",
			PinEntry {
				spki_sha256: vec![spki(0xAA)],
				include_subdomains: false,
				expiration: None,
			},
		);
		assert_eq!(
			store.verify("pinned.example", &[spki(0xAA)], false, SystemTime::now()),
			PinVerdict::Matched
		);
	}

	#[test]
	fn mismatched_spki_is_rejected_scenario_6() {
		let mut store = PinStore::new(false);
		store.add(
			"pinned.example",
			PinEntry {
				spki_sha256: vec![spki(0xAA)],
				include_subdomains: false,
				expiration: None,
			},
		);
		assert_eq!(
			store.verify("pinned.example", &[spki(0xBB)], false, SystemTime::now()),
			PinVerdict::Mismatch
		);
	}

	#[test]
	fn subdomain_inherits_pin_when_enabled() {
		let mut store = PinStore::new(false);
		store.add(
			"example.com",
			PinEntry {
				spki_sha256: vec![spki(0xAA)],
				include_subdomains: true,
				expiration: None,
			},
		);
		assert_eq!(
			store.verify("api.example.com", &[spki(0xAA)], false, SystemTime::now()),
			PinVerdict::Matched
		);
	}

	#[test]
	fn expired_pin_no_longer_applies() {
		let mut store = PinStore::new(false);
		store.add(
			"pinned.example",
			PinEntry {
				spki_sha256: vec![spki(0xAA)],
				include_subdomains: false,
				expiration: Some(SystemTime::now() - Duration::from_secs(1)),
			},
		);
		assert_eq!(
			store.verify("pinned.example", &[spki(0xBB)], false, SystemTime::now()),
			PinVerdict::NotPinned
		);
	}

	#[test]
	fn local_trust_anchor_bypass_waives_mismatch() {
		let mut store = PinStore::new(true);
		store.add(
			"pinned.example",
			PinEntry {
				spki_sha256: vec![spki(0xAA)],
				include_subdomains: false,
				expiration: None,
			},
		);
		assert_eq!(
			store.verify("pinned.example", &[spki(0xBB)], true, SystemTime::now()),
			PinVerdict::Matched
		);
	}
}
