use eunomia_codec::utils::{Bytes, Int, KeyValuePairs, Set};
use eunomia_codec::{FromCbor, Reader, ToCbor};
use proptest::prelude::*;

fn roundtrip<T>(value: &T) -> T
where
    T: FromCbor + ToCbor,
{
    let bytes = value.to_cbor_bytes().unwrap();
    let decoded = T::from_cbor_bytes(&bytes).unwrap();

    // the canonical writer output must survive a strict decode and
    // re-encode to the identical bytes
    let mut strict = Reader::strict(&bytes);
    let strict_decoded = T::from_cbor(&mut strict).unwrap();
    assert_eq!(strict_decoded.to_cbor_bytes().unwrap(), bytes);

    decoded
}

proptest! {
    #[test]
    fn uints(v: u64) {
        prop_assert_eq!(roundtrip(&v), v);
    }

    #[test]
    fn ints(v: i64) {
        prop_assert_eq!(roundtrip(&v), v);
    }

    #[test]
    fn wide_integers(v in Int::MIN..=Int::MAX) {
        let int = Int::try_from(v).unwrap();
        prop_assert_eq!(roundtrip(&int), int);
    }

    #[test]
    fn byte_strings(xs in proptest::collection::vec(any::<u8>(), 0..256)) {
        let bytes = Bytes::from(xs);
        prop_assert_eq!(roundtrip(&bytes), bytes);
    }

    #[test]
    fn text_strings(s in "\\PC{0,64}") {
        prop_assert_eq!(roundtrip(&s), s);
    }

    #[test]
    fn arrays(xs in proptest::collection::vec(any::<u64>(), 0..32)) {
        prop_assert_eq!(roundtrip(&xs), xs);
    }

    #[test]
    fn set_encoding_is_permutation_invariant(mut xs in proptest::collection::vec(any::<u64>(), 1..16)) {
        let a: Set<u64> = xs.clone().into();
        xs.reverse();
        let b: Set<u64> = xs.into();
        prop_assert_eq!(a.to_cbor_bytes().unwrap(), b.to_cbor_bytes().unwrap());
    }

    #[test]
    fn map_encoding_is_permutation_invariant(mut xs in proptest::collection::vec(any::<(u64, u64)>(), 1..16)) {
        xs.sort();
        xs.dedup_by_key(|(k, _)| *k);
        let a: KeyValuePairs<u64, u64> = xs.clone().into();
        xs.reverse();
        let b: KeyValuePairs<u64, u64> = xs.into();
        prop_assert_eq!(a.to_cbor_bytes().unwrap(), b.to_cbor_bytes().unwrap());
    }
}
