use proptest::prelude::*;

use govlock_codec::{hash_operation, hash_operation_batch, OperationCall};
use govlock_types::{Address, Hash32};

fn arb_call() -> impl Strategy<Value = OperationCall> {
    (
        prop::array::uniform20(any::<u8>()),
        any::<u128>(),
        prop::collection::vec(any::<u8>(), 0..80),
    )
        .prop_map(|(target, value, payload)| OperationCall {
            target: Address::new(target),
            value,
            payload,
        })
}

proptest! {
    /// Identical inputs always yield the same id.
    #[test]
    fn id_is_deterministic(call in arb_call(), pred in prop::array::uniform32(any::<u8>()), salt in prop::array::uniform32(any::<u8>())) {
        let a = call.id(Hash32::new(pred), Hash32::new(salt));
        let b = hash_operation(call.target, call.value, &call.payload, Hash32::new(pred), Hash32::new(salt));
        prop_assert_eq!(a, b);
    }

    /// Changing any single field changes the id.
    #[test]
    fn any_field_change_changes_id(
        call in arb_call(),
        pred in prop::array::uniform32(any::<u8>()),
        salt in prop::array::uniform32(any::<u8>()),
        flip in 0usize..5,
    ) {
        let (pred, salt) = (Hash32::new(pred), Hash32::new(salt));
        let base = call.id(pred, salt);
        let mut changed = call.clone();
        let (mut pred2, mut salt2) = (pred, salt);
        match flip {
            0 => {
                let mut t = *changed.target.as_bytes();
                t[0] ^= 1;
                changed.target = Address::new(t);
            }
            1 => changed.value = changed.value.wrapping_add(1),
            2 => changed.payload.push(0),
            3 => {
                let mut p = *pred.as_bytes();
                p[31] ^= 1;
                pred2 = Hash32::new(p);
            }
            _ => {
                let mut s = *salt.as_bytes();
                s[0] ^= 0x80;
                salt2 = Hash32::new(s);
            }
        }
        prop_assert_ne!(base, changed.id(pred2, salt2));
    }

    /// Batch ids depend on every element.
    #[test]
    fn batch_id_depends_on_every_call(
        calls in prop::collection::vec(arb_call(), 1..5),
        idx in any::<prop::sample::Index>(),
    ) {
        let salt = Hash32::from_low_u64(1);
        let base = hash_operation_batch(&calls, Hash32::ZERO, salt);
        let mut changed = calls.clone();
        let i = idx.index(changed.len());
        changed[i].value = changed[i].value.wrapping_add(1);
        prop_assert_ne!(base, hash_operation_batch(&changed, Hash32::ZERO, salt));
    }
}
