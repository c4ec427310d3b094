//! Turning operator input into addresses and selectors.

use anyhow::{anyhow, bail};
use govlock_authority::RegistryFunction;
use govlock_codec::FunctionSignature;
use govlock_governance::ContractBook;
use govlock_ledger::LedgerState;
use govlock_types::{Address, Selector};

/// A `0x` address, or the address derived from a label.
pub fn account(s: &str) -> anyhow::Result<Address> {
    if s.starts_with("0x") {
        return Ok(s.parse()?);
    }
    if s.is_empty() {
        bail!("empty account name");
    }
    Ok(Address::from_label(s))
}

/// A deployed contract by label (`lowsec`, `active_pool`, `authority`) or address.
pub fn contract(state: &LedgerState, book: &ContractBook, s: &str) -> anyhow::Result<Address> {
    if s.starts_with("0x") {
        let address: Address = s.parse()?;
        if state.kind_of(address).is_none() {
            bail!("no contract at {address}");
        }
        return Ok(address);
    }
    if s == "authority" || s == "registry" {
        return Ok(book.registry);
    }
    state
        .timelock_by_label(s)
        .map(|t| t.address())
        .or_else(|| state.target_by_label(s).map(|t| t.address()))
        .ok_or_else(|| anyhow!("unknown contract {s}"))
}

/// A function on `target`: `0x` selector, canonical signature, or bare name
/// of one of the target's functions.
pub fn selector(state: &LedgerState, target: Address, s: &str) -> anyhow::Result<Selector> {
    if s.starts_with("0x") {
        return Ok(s.parse()?);
    }
    if s.contains('(') {
        return Ok(FunctionSignature::parse(s)?.selector());
    }
    if let Some(t) = state.target(target) {
        return t
            .setter_named(s)
            .map(|(selector, _)| selector)
            .ok_or_else(|| anyhow!("{} has no function {s}", t.label()));
    }
    if state.registry(target).is_some() {
        return RegistryFunction::ALL
            .iter()
            .find(|f| f.name() == s)
            .map(|f| f.selector())
            .ok_or_else(|| anyhow!("the registry has no function {s}"));
    }
    bail!("cannot resolve {s} by name on {target}; pass a signature or selector")
}

#[cfg(test)]
mod tests {
    use super::*;
    use govlock_ledger::GenesisConfig;

    fn state() -> (LedgerState, ContractBook) {
        let state = GenesisConfig::preset().build().unwrap();
        let book = ContractBook::resolve(&state).unwrap();
        (state, book)
    }

    #[test]
    fn accounts_from_labels_and_hex() {
        assert_eq!(account("techops").unwrap(), Address::from_label("techops"));
        let hex = Address::repeat_byte(0xab).to_string();
        assert_eq!(account(&hex).unwrap(), Address::repeat_byte(0xab));
        assert!(account("0xnothex").is_err());
        assert!(account("").is_err());
    }

    #[test]
    fn contracts_by_label() {
        let (state, book) = state();
        assert_eq!(contract(&state, &book, "lowsec").unwrap(), book.lowsec);
        assert_eq!(contract(&state, &book, "active_pool").unwrap(), book.active_pool);
        assert_eq!(contract(&state, &book, "authority").unwrap(), book.registry);
        assert!(contract(&state, &book, "treasury").is_err());
        assert!(contract(&state, &book, &Address::repeat_byte(7).to_string()).is_err());
    }

    #[test]
    fn selectors_by_name_signature_and_hex() {
        let (state, book) = state();
        let expected = FunctionSignature::parse("setFeeBps(uint256)").unwrap().selector();
        assert_eq!(selector(&state, book.active_pool, "setFeeBps").unwrap(), expected);
        assert_eq!(
            selector(&state, book.active_pool, "setFeeBps(uint256)").unwrap(),
            expected
        );
        assert_eq!(
            selector(&state, book.active_pool, &expected.to_string()).unwrap(),
            expected
        );
        assert_eq!(
            selector(&state, book.registry, "burnCapability").unwrap(),
            RegistryFunction::BurnCapability.selector()
        );
        assert!(selector(&state, book.active_pool, "setBeta").is_err());
    }
}
