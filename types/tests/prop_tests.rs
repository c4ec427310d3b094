use proptest::prelude::*;

use govlock_types::{Address, Hash32, Selector, Timestamp};

proptest! {
    /// Address display output always parses back to the same address.
    #[test]
    fn address_display_parses_back(bytes in prop::array::uniform20(0u8..)) {
        let addr = Address::new(bytes);
        let parsed: Address = addr.to_string().parse().unwrap();
        prop_assert_eq!(parsed, addr);
    }

    /// Hash32 display output always parses back to the same hash.
    #[test]
    fn hash_display_parses_back(bytes in prop::array::uniform32(0u8..)) {
        let hash = Hash32::new(bytes);
        let parsed: Hash32 = hash.to_string().parse().unwrap();
        prop_assert_eq!(parsed, hash);
    }

    /// Hash32::is_zero is true only for all-zero bytes.
    #[test]
    fn hash_is_zero_correct(bytes in prop::array::uniform32(0u8..)) {
        prop_assert_eq!(Hash32::new(bytes).is_zero(), bytes == [0u8; 32]);
    }

    /// Binary snapshots carry raw bytes, not hex strings.
    #[test]
    fn hash_bincode_is_raw(bytes in prop::array::uniform32(0u8..)) {
        let hash = Hash32::new(bytes);
        let encoded = bincode::serialize(&hash).unwrap();
        // 8-byte length prefix + 32 raw bytes
        prop_assert_eq!(encoded.len(), 40);
        let decoded: Hash32 = bincode::deserialize(&encoded).unwrap();
        prop_assert_eq!(decoded, hash);
    }

    /// Selectors read from a payload are exactly its first four bytes.
    #[test]
    fn selector_of_payload_is_prefix(payload in prop::collection::vec(any::<u8>(), 4..64)) {
        let sel = Selector::of_payload(&payload).unwrap();
        prop_assert_eq!(&sel.as_bytes()[..], &payload[..4]);
    }

    /// Timestamp ordering: new(a) <= new(b) iff a <= b.
    #[test]
    fn timestamp_ordering(a in 0u64..u64::MAX, b in 0u64..u64::MAX) {
        let ta = Timestamp::new(a);
        let tb = Timestamp::new(b);
        prop_assert_eq!(ta <= tb, a <= b);
        prop_assert_eq!(ta == tb, a == b);
    }

    /// remaining_from and elapsed_since mirror each other.
    #[test]
    fn timestamp_remaining_mirrors_elapsed(base in 0u64..1_000_000, offset in 0u64..1_000_000) {
        let earlier = Timestamp::new(base);
        let later = Timestamp::new(base + offset);
        prop_assert_eq!(later.remaining_from(earlier), offset);
        prop_assert_eq!(earlier.elapsed_since(later), offset);
        prop_assert_eq!(earlier.remaining_from(later), 0);
    }

    /// plus never overflows.
    #[test]
    fn timestamp_plus_saturates(base in any::<u64>(), secs in any::<u64>()) {
        let t = Timestamp::new(base).plus(secs);
        prop_assert_eq!(t.as_secs(), base.saturating_add(secs));
    }
}
