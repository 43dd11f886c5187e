use eunomia_primitives::conway::{
    AssetName, Certificate, DRep, TransactionOutput, Utxo, Value,
};
use eunomia_primitives::{
    Credential, FromCbor, Hash, KeyValuePairs, Reader, Set, ToCbor, TransactionInput,
};
use proptest::prelude::*;

fn arb_hash28() -> impl Strategy<Value = Hash<28>> {
    any::<[u8; 28]>().prop_map(Hash::new)
}

fn arb_hash32() -> impl Strategy<Value = Hash<32>> {
    any::<[u8; 32]>().prop_map(Hash::new)
}

fn arb_credential() -> impl Strategy<Value = Credential> {
    prop_oneof![
        arb_hash28().prop_map(Credential::KeyHash),
        arb_hash28().prop_map(Credential::ScriptHash),
    ]
}

fn arb_input() -> impl Strategy<Value = TransactionInput> {
    (arb_hash32(), any::<u64>()).prop_map(|(transaction_id, index)| TransactionInput {
        transaction_id,
        index,
    })
}

fn arb_drep() -> impl Strategy<Value = DRep> {
    prop_oneof![
        arb_hash28().prop_map(DRep::Key),
        arb_hash28().prop_map(DRep::Script),
        Just(DRep::Abstain),
        Just(DRep::NoConfidence),
    ]
}

fn arb_certificate() -> impl Strategy<Value = Certificate> {
    prop_oneof![
        arb_credential().prop_map(Certificate::StakeRegistration),
        arb_credential().prop_map(Certificate::StakeDeregistration),
        (arb_credential(), arb_hash28())
            .prop_map(|(c, p)| Certificate::StakeDelegation(c, p)),
        (arb_credential(), any::<u64>()).prop_map(|(c, d)| Certificate::Reg(c, d)),
        (arb_credential(), arb_drep()).prop_map(|(c, d)| Certificate::VoteDeleg(c, d)),
        (arb_credential(), arb_hash28(), arb_drep(), any::<u64>())
            .prop_map(|(c, p, d, coin)| Certificate::StakeVoteRegDeleg(c, p, d, coin)),
        (arb_credential(), arb_credential())
            .prop_map(|(cold, hot)| Certificate::AuthCommitteeHot(cold, hot)),
    ]
}

fn arb_value() -> impl Strategy<Value = Value> {
    let name = any::<[u8; 8]>().prop_map(|n| AssetName::try_from(n.to_vec()).unwrap());
    let inner = proptest::collection::btree_map(name, 1i64..1_000_000, 1..4usize)
        .prop_map(|m| KeyValuePairs::from(m.into_iter().collect::<Vec<_>>()));

    prop_oneof![
        any::<u64>().prop_map(Value::Coin),
        (
            any::<u64>(),
            proptest::collection::btree_map(arb_hash28(), inner, 1..3usize)
        )
            .prop_map(|(coin, assets)| {
                Value::Multiasset(coin, assets.into_iter().collect::<Vec<_>>().into())
            }),
    ]
}

fn roundtrips<T>(value: &T) -> bool
where
    T: FromCbor + ToCbor + PartialEq,
{
    let bytes = match value.to_cbor_bytes() {
        Ok(bytes) => bytes,
        Err(_) => return false,
    };

    // the canonical output must also survive a strict pass bit-exactly
    let mut strict = Reader::strict(&bytes);
    match T::from_cbor(&mut strict) {
        Ok(decoded) => {
            decoded == *value && decoded.to_cbor_bytes().map(|b| b == bytes).unwrap_or(false)
        }
        Err(_) => false,
    }
}

proptest! {
    #[test]
    fn inputs_roundtrip(input in arb_input()) {
        prop_assert!(roundtrips(&input));
    }

    #[test]
    fn credentials_roundtrip(credential in arb_credential()) {
        prop_assert!(roundtrips(&credential));
    }

    #[test]
    fn certificates_roundtrip(certificate in arb_certificate()) {
        prop_assert!(roundtrips(&certificate));
    }

    #[test]
    fn values_roundtrip(value in arb_value()) {
        prop_assert!(roundtrips(&value));
    }

    #[test]
    fn input_sets_canonicalize_insertions(inputs in proptest::collection::vec(arb_input(), 1..8)) {
        let forward: Set<TransactionInput> = inputs.clone().into();
        let mut reversed_items = inputs;
        reversed_items.reverse();
        let reversed: Set<TransactionInput> = reversed_items.into();

        prop_assert_eq!(forward.to_cbor_bytes().unwrap(), reversed.to_cbor_bytes().unwrap());
    }

    #[test]
    fn input_set_order_is_lexicographic_on_id_then_index(
        inputs in proptest::collection::vec(arb_input(), 2..8),
    ) {
        let set: Set<TransactionInput> = inputs.into();
        let bytes = set.to_cbor_bytes().unwrap();
        let decoded = Set::<TransactionInput>::from_cbor_bytes(&bytes).unwrap();

        let mut expected: Vec<TransactionInput> = decoded.to_vec();
        expected.sort();
        let decoded = Set::<TransactionInput>::from_cbor_bytes(&bytes).unwrap().to_vec();
        prop_assert_eq!(decoded, expected);
    }

    #[test]
    fn value_monoid_laws(a in arb_value(), b in arb_value()) {
        // keep coins small enough that the law side of the test never overflows
        let clamp = |v: Value| match v {
            Value::Coin(c) => Value::Coin(c % 1_000_000_000),
            Value::Multiasset(c, m) => Value::Multiasset(c % 1_000_000_000, m),
        };
        let a = clamp(a);
        let b = clamp(b);

        let ab = a.add(&b).unwrap();
        let ba = b.add(&a).unwrap();
        prop_assert_eq!(&ab, &ba);
        prop_assert_eq!(a.add(&Value::zero()).unwrap(), a.clone());
        prop_assert_eq!(ab.subtract(&b).unwrap(), a);
    }
}

#[test]
fn utxo_fixture_decodes_and_reencodes() {
    let bytes = hex::decode(concat!(
        "82825820bb217abaca60fc0ca68c1555eca6a96d2478547818ae76ce6836133f",
        "3cc546e001a200583900287a7e37219128cfb05322626daa8b19d1ad37c6779d",
        "21853f7b94177c16240714ea0e12b41a914f2945784ac494bb19573f0ca61a08",
        "afa801821af0078c21a2581c1ec85dcee27f2d90ec1f9a1e4ce74a667dc9be8b",
        "184463223f9c9601a14350584c05581c659f2917fb63f12b33667463ee575eea",
        "c1845bbc736b9c0bbc40ba82a14454534c410a"
    ))
    .unwrap();

    let utxo = Utxo::from_cbor_bytes(&bytes).unwrap();
    assert!(matches!(utxo.output, TransactionOutput::PostAlonzo(_)));
    assert_eq!(utxo.to_cbor_bytes().unwrap(), bytes);

    // a different trailing asset amount is a different utxo
    let other = hex::decode(concat!(
        "82825820bb217abaca60fc0ca68c1555eca6a96d2478547818ae76ce6836133f",
        "3cc546e001a200583900287a7e37219128cfb05322626daa8b19d1ad37c6779d",
        "21853f7b94177c16240714ea0e12b41a914f2945784ac494bb19573f0ca61a08",
        "afa801821af0078c21a2581c1ec85dcee27f2d90ec1f9a1e4ce74a667dc9be8b",
        "184463223f9c9601a14350584c05581c659f2917fb63f12b33667463ee575eea",
        "c1845bbc736b9c0bbc40ba82a14454534c420a"
    ))
    .unwrap();
    assert_ne!(Utxo::from_cbor_bytes(&other).unwrap(), utxo);
}
