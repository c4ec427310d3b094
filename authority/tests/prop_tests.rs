use proptest::prelude::*;

use govlock_authority::{Authority, CapabilityRegistry};
use govlock_types::{Address, RoleId, Selector};

#[derive(Clone, Debug)]
enum Step {
    Grant(u8, u8),
    Revoke(u8, u8),
    Enable(u8, u8),
    Disable(u8, u8),
    Public(u8, bool),
    Burn(u8),
}

fn arb_step() -> impl Strategy<Value = Step> {
    prop_oneof![
        (0u8..4, 0u8..4).prop_map(|(u, r)| Step::Grant(u, r)),
        (0u8..4, 0u8..4).prop_map(|(u, r)| Step::Revoke(u, r)),
        (0u8..4, 0u8..4).prop_map(|(r, s)| Step::Enable(r, s)),
        (0u8..4, 0u8..4).prop_map(|(r, s)| Step::Disable(r, s)),
        (0u8..4, any::<bool>()).prop_map(|(s, on)| Step::Public(s, on)),
        (0u8..4).prop_map(Step::Burn),
    ]
}

fn target() -> Address {
    Address::from_label("target")
}

fn selector(i: u8) -> Selector {
    Selector::new([i, 0, 0, 1])
}

fn user(i: u8) -> Address {
    Address::repeat_byte(i + 1)
}

proptest! {
    /// Once burned, a pair stays uncallable whatever mutations follow.
    #[test]
    fn burn_is_monotonic(
        before in prop::collection::vec(arb_step(), 0..20),
        burned in 0u8..4,
        after in prop::collection::vec(arb_step(), 0..30),
    ) {
        let mut reg = CapabilityRegistry::new(Address::from_label("authority"), Address::ZERO);
        let apply = |reg: &mut CapabilityRegistry, step: &Step| {
            // errors from burned pairs are expected and ignored here
            let _ = match *step {
                Step::Grant(u, r) => { reg.set_user_role(user(u), RoleId::new(r), true); Ok(()) }
                Step::Revoke(u, r) => { reg.set_user_role(user(u), RoleId::new(r), false); Ok(()) }
                Step::Enable(r, s) => reg.set_role_capability(RoleId::new(r), target(), selector(s), true),
                Step::Disable(r, s) => reg.set_role_capability(RoleId::new(r), target(), selector(s), false),
                Step::Public(s, on) => reg.set_public_capability(target(), selector(s), on),
                Step::Burn(s) => { reg.burn_capability(target(), selector(s)); Ok(()) }
            };
        };
        for step in &before {
            apply(&mut reg, step);
        }
        reg.burn_capability(target(), selector(burned));
        for step in &after {
            apply(&mut reg, step);
            prop_assert!(reg.is_burned(target(), selector(burned)));
            for u in 0..4 {
                prop_assert!(!reg.can_call(user(u), target(), selector(burned)));
            }
        }
    }

    /// can_call agrees with the definition over the lens queries.
    #[test]
    fn can_call_matches_definition(steps in prop::collection::vec(arb_step(), 0..40)) {
        let mut reg = CapabilityRegistry::new(Address::from_label("authority"), Address::ZERO);
        for step in &steps {
            let _ = match *step {
                Step::Grant(u, r) => { reg.set_user_role(user(u), RoleId::new(r), true); Ok(()) }
                Step::Revoke(u, r) => { reg.set_user_role(user(u), RoleId::new(r), false); Ok(()) }
                Step::Enable(r, s) => reg.set_role_capability(RoleId::new(r), target(), selector(s), true),
                Step::Disable(r, s) => reg.set_role_capability(RoleId::new(r), target(), selector(s), false),
                Step::Public(s, on) => reg.set_public_capability(target(), selector(s), on),
                Step::Burn(s) => { reg.burn_capability(target(), selector(s)); Ok(()) }
            };
        }
        for u in 0..4 {
            for s in 0..4 {
                let expected = !reg.is_burned(target(), selector(s))
                    && (reg.is_public_capability(target(), selector(s))
                        || reg.roles_of(user(u)).into_iter().any(|r| {
                            reg.does_role_have_capability(r, target(), selector(s))
                        }));
                prop_assert_eq!(reg.can_call(user(u), target(), selector(s)), expected);
            }
        }
    }
}
