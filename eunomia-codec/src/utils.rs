use std::{fmt, ops::Deref};

use serde::{Deserialize, Serialize};

use crate::{CborType, Error, FromCbor, Reader, ToCbor, Writer};

/// CBOR tag marking a Conway-era set.
pub const TAG_SET: u64 = 258;

/// Owned byte string encoded as a CBOR byte string.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String")]
#[serde(try_from = "String")]
pub struct Bytes(Vec<u8>);

impl Bytes {
    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }
}

impl From<Vec<u8>> for Bytes {
    fn from(xs: Vec<u8>) -> Self {
        Bytes(xs)
    }
}

impl From<&[u8]> for Bytes {
    fn from(xs: &[u8]) -> Self {
        Bytes(xs.to_vec())
    }
}

impl From<Bytes> for Vec<u8> {
    fn from(b: Bytes) -> Self {
        b.0
    }
}

impl Deref for Bytes {
    type Target = Vec<u8>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl TryFrom<String> for Bytes {
    type Error = hex::FromHexError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Ok(Bytes(hex::decode(value)?))
    }
}

impl From<Bytes> for String {
    fn from(b: Bytes) -> Self {
        hex::encode(b.deref())
    }
}

impl fmt::Display for Bytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(&self.0))
    }
}

impl FromCbor for Bytes {
    fn from_cbor(r: &mut Reader) -> Result<Self, Error> {
        Ok(Bytes(r.read_byte_string()?))
    }
}

impl ToCbor for Bytes {
    fn to_cbor(&self, w: &mut Writer) -> Result<(), Error> {
        w.write_byte_string(&self.0)
    }
}

/// An integer in the full CBOR range `[-2^64, 2^64 - 1]`, wider than both
/// `u64` and `i64`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "i128")]
#[serde(try_from = "i128")]
pub struct Int(i128);

impl Int {
    pub const MIN: i128 = -(u64::MAX as i128) - 1;
    pub const MAX: i128 = u64::MAX as i128;
}

impl From<i64> for Int {
    fn from(x: i64) -> Self {
        Int(x as i128)
    }
}

impl From<u64> for Int {
    fn from(x: u64) -> Self {
        Int(x as i128)
    }
}

impl From<Int> for i128 {
    fn from(x: Int) -> Self {
        x.0
    }
}

impl TryFrom<i128> for Int {
    type Error = Error;

    fn try_from(value: i128) -> Result<Self, Error> {
        if (Int::MIN..=Int::MAX).contains(&value) {
            Ok(Int(value))
        } else {
            Err(Error::IntegerOutOfRange)
        }
    }
}

impl fmt::Display for Int {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromCbor for Int {
    fn from_cbor(r: &mut Reader) -> Result<Self, Error> {
        Ok(Int(r.read_integer()?))
    }
}

impl ToCbor for Int {
    fn to_cbor(&self, w: &mut Writer) -> Result<(), Error> {
        w.write_integer(self.0)
    }
}

fn default_use_tag() -> bool {
    true
}

/// Set of items with a deterministic wire form.
///
/// Iteration follows insertion order, but the encoder emits the elements
/// deduplicated and sorted by the byte order of their encodings, optionally
/// under tag 258. The tag presence is captured on decode and preserved on
/// re-encode so a decoded set is byte-isomorphic with its input; newly
/// constructed sets default to the Conway form (tagged).
#[derive(Debug, PartialEq, Eq, Clone, PartialOrd, Serialize, Deserialize)]
pub struct Set<T> {
    items: Vec<T>,
    #[serde(default = "default_use_tag")]
    use_tag: bool,
}

impl<T> Set<T> {
    pub fn new() -> Self {
        Set {
            items: Vec::new(),
            use_tag: true,
        }
    }

    pub fn use_tag(&self) -> bool {
        self.use_tag
    }

    pub fn set_use_tag(&mut self, use_tag: bool) {
        self.use_tag = use_tag;
    }

    pub fn push(&mut self, item: T) {
        self.items.push(item);
    }

    pub fn to_vec(self) -> Vec<T> {
        self.items
    }
}

impl<T> Default for Set<T> {
    fn default() -> Self {
        Set::new()
    }
}

impl<T> Deref for Set<T> {
    type Target = Vec<T>;

    fn deref(&self) -> &Self::Target {
        &self.items
    }
}

impl<T> From<Vec<T>> for Set<T> {
    fn from(items: Vec<T>) -> Self {
        Set {
            items,
            use_tag: true,
        }
    }
}

impl<'a, T> IntoIterator for &'a Set<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

fn decode_set_items<T>(r: &mut Reader) -> Result<(Vec<T>, bool), Error>
where
    T: FromCbor + PartialEq,
{
    let use_tag = r.peek_state()?.cbor_type == CborType::Tag;
    if use_tag {
        r.read_tag_expect(TAG_SET)?;
    }

    let len = r.read_start_array(None)?;
    let mut items: Vec<T> = match len {
        Some(n) => Vec::with_capacity(n.min(1024) as usize),
        None => Vec::new(),
    };

    let mut consumed = 0u64;
    while r.has_entries(len, consumed)? {
        let item = T::from_cbor(r)?;
        consumed += 1;

        if items.contains(&item) {
            if r.is_strict() {
                return Err(Error::DuplicateKey);
            }
            // lenient decode coalesces duplicates
            continue;
        }

        items.push(item);
    }
    r.read_end_array(len)?;

    Ok((items, use_tag))
}

fn encode_set_items<T: ToCbor>(items: &[T], use_tag: bool, w: &mut Writer) -> Result<(), Error> {
    let mut encoded: Vec<Vec<u8>> = items
        .iter()
        .map(|x| x.to_cbor_bytes())
        .collect::<Result<_, _>>()?;

    encoded.sort();
    encoded.dedup();

    if use_tag {
        w.write_tag(TAG_SET)?;
    }
    w.write_start_array(encoded.len() as u64)?;
    for item in encoded {
        w.write_encoded_value(&item)?;
    }

    Ok(())
}

impl<T: FromCbor + PartialEq> FromCbor for Set<T> {
    fn from_cbor(r: &mut Reader) -> Result<Self, Error> {
        let (items, use_tag) = decode_set_items(r)?;
        Ok(Set { items, use_tag })
    }
}

impl<T: ToCbor> ToCbor for Set<T> {
    fn to_cbor(&self, w: &mut Writer) -> Result<(), Error> {
        encode_set_items(&self.items, self.use_tag, w)
    }
}

/// [`Set`] that refuses to be empty, as required by most of the optional
/// set-valued transaction fields.
#[derive(Debug, PartialEq, Eq, Clone, PartialOrd, Serialize, Deserialize)]
pub struct NonEmptySet<T> {
    items: Vec<T>,
    #[serde(default = "default_use_tag")]
    use_tag: bool,
}

impl<T> NonEmptySet<T> {
    pub fn use_tag(&self) -> bool {
        self.use_tag
    }

    pub fn set_use_tag(&mut self, use_tag: bool) {
        self.use_tag = use_tag;
    }

    pub fn to_vec(self) -> Vec<T> {
        self.items
    }
}

impl<T> TryFrom<Vec<T>> for NonEmptySet<T> {
    type Error = Vec<T>;

    fn try_from(items: Vec<T>) -> Result<Self, Self::Error> {
        if items.is_empty() {
            Err(items)
        } else {
            Ok(NonEmptySet {
                items,
                use_tag: true,
            })
        }
    }
}

impl<T> Deref for NonEmptySet<T> {
    type Target = Vec<T>;

    fn deref(&self) -> &Self::Target {
        &self.items
    }
}

impl<'a, T> IntoIterator for &'a NonEmptySet<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl<T: FromCbor + PartialEq> FromCbor for NonEmptySet<T> {
    fn from_cbor(r: &mut Reader) -> Result<Self, Error> {
        let (items, use_tag) = decode_set_items(r)?;

        if items.is_empty() {
            return Err(Error::invariant("decoding empty set as NonEmptySet"));
        }

        Ok(NonEmptySet { items, use_tag })
    }
}

impl<T: ToCbor> ToCbor for NonEmptySet<T> {
    fn to_cbor(&self, w: &mut Writer) -> Result<(), Error> {
        encode_set_items(&self.items, self.use_tag, w)
    }
}

/// Ordered pairs of values with a deterministic wire form.
///
/// Iteration keeps insertion (decode) order; the encoder collects the pairs,
/// sorts them by the byte order of the encoded keys and emits a
/// definite-length map, so the encoding is independent of insertion order.
/// Duplicate keys are rejected in strict decode and resolved last-wins in
/// lenient decode.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(from = "Vec<(K, V)>", into = "Vec<(K, V)>")]
pub struct KeyValuePairs<K, V>
where
    K: Clone,
    V: Clone,
{
    pairs: Vec<(K, V)>,
}

impl<K: Clone, V: Clone> KeyValuePairs<K, V> {
    pub fn new() -> Self {
        KeyValuePairs { pairs: Vec::new() }
    }

    pub fn to_vec(self) -> Vec<(K, V)> {
        self.pairs
    }

    pub fn push(&mut self, key: K, value: V) {
        self.pairs.push((key, value));
    }

    pub fn lookup(&self, key: &K) -> Option<&V>
    where
        K: PartialEq,
    {
        self.pairs.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }
}

impl<K: Clone, V: Clone> Default for KeyValuePairs<K, V> {
    fn default() -> Self {
        KeyValuePairs::new()
    }
}

impl<K: Clone, V: Clone> From<Vec<(K, V)>> for KeyValuePairs<K, V> {
    fn from(pairs: Vec<(K, V)>) -> Self {
        KeyValuePairs { pairs }
    }
}

impl<K: Clone, V: Clone> From<KeyValuePairs<K, V>> for Vec<(K, V)> {
    fn from(kvp: KeyValuePairs<K, V>) -> Self {
        kvp.pairs
    }
}

impl<K: Clone, V: Clone> Deref for KeyValuePairs<K, V> {
    type Target = Vec<(K, V)>;

    fn deref(&self) -> &Self::Target {
        &self.pairs
    }
}

pub(crate) fn decode_map_pairs<K, V>(r: &mut Reader) -> Result<Vec<(K, V)>, Error>
where
    K: FromCbor + PartialEq,
    V: FromCbor,
{
    let len = r.read_start_map(None)?;
    let mut pairs: Vec<(K, V)> = match len {
        Some(n) => Vec::with_capacity(n.min(1024) as usize),
        None => Vec::new(),
    };

    let mut consumed = 0u64;
    while r.has_entries(len, consumed)? {
        let key = K::from_cbor(r)?;
        let value = V::from_cbor(r)?;
        consumed += 1;

        if let Some(slot) = pairs.iter_mut().find(|(k, _)| *k == key) {
            if r.is_strict() {
                return Err(Error::DuplicateKey);
            }
            // lenient decode keeps the last value for a repeated key
            slot.1 = value;
            continue;
        }

        pairs.push((key, value));
    }
    r.read_end_map(len)?;

    Ok(pairs)
}

pub(crate) fn encode_map_pairs<K, V>(pairs: &[(K, V)], w: &mut Writer) -> Result<(), Error>
where
    K: ToCbor,
    V: ToCbor,
{
    let entries = pairs
        .iter()
        .map(|(k, v)| Ok((k.to_cbor_bytes()?, v.to_cbor_bytes()?)))
        .collect::<Result<Vec<_>, Error>>()?;

    w.write_sorted_map(entries)
}

impl<K, V> FromCbor for KeyValuePairs<K, V>
where
    K: FromCbor + PartialEq + Clone,
    V: FromCbor + Clone,
{
    fn from_cbor(r: &mut Reader) -> Result<Self, Error> {
        Ok(KeyValuePairs {
            pairs: decode_map_pairs(r)?,
        })
    }
}

impl<K, V> ToCbor for KeyValuePairs<K, V>
where
    K: ToCbor + Clone,
    V: ToCbor + Clone,
{
    fn to_cbor(&self, w: &mut Writer) -> Result<(), Error> {
        encode_map_pairs(&self.pairs, w)
    }
}

/// [`KeyValuePairs`] that refuses to be empty.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(try_from = "Vec<(K, V)>", into = "Vec<(K, V)>")]
pub struct NonEmptyKeyValuePairs<K, V>
where
    K: Clone,
    V: Clone,
{
    pairs: Vec<(K, V)>,
}

impl<K: Clone, V: Clone> NonEmptyKeyValuePairs<K, V> {
    pub fn to_vec(self) -> Vec<(K, V)> {
        self.pairs
    }
}

impl<K: Clone, V: Clone> TryFrom<Vec<(K, V)>> for NonEmptyKeyValuePairs<K, V> {
    type Error = String;

    fn try_from(pairs: Vec<(K, V)>) -> Result<Self, Self::Error> {
        if pairs.is_empty() {
            Err("NonEmptyKeyValuePairs must contain at least one element".into())
        } else {
            Ok(NonEmptyKeyValuePairs { pairs })
        }
    }
}

impl<K: Clone, V: Clone> From<NonEmptyKeyValuePairs<K, V>> for Vec<(K, V)> {
    fn from(kvp: NonEmptyKeyValuePairs<K, V>) -> Self {
        kvp.pairs
    }
}

impl<K: Clone, V: Clone> Deref for NonEmptyKeyValuePairs<K, V> {
    type Target = Vec<(K, V)>;

    fn deref(&self) -> &Self::Target {
        &self.pairs
    }
}

impl<K, V> FromCbor for NonEmptyKeyValuePairs<K, V>
where
    K: FromCbor + PartialEq + Clone,
    V: FromCbor + Clone,
{
    fn from_cbor(r: &mut Reader) -> Result<Self, Error> {
        let pairs = decode_map_pairs(r)?;

        if pairs.is_empty() {
            return Err(Error::invariant(
                "decoding empty map as NonEmptyKeyValuePairs",
            ));
        }

        Ok(NonEmptyKeyValuePairs { pairs })
    }
}

impl<K, V> ToCbor for NonEmptyKeyValuePairs<K, V>
where
    K: ToCbor + Clone,
    V: ToCbor + Clone,
{
    fn to_cbor(&self, w: &mut Writer) -> Result<(), Error> {
        encode_map_pairs(&self.pairs, w)
    }
}

/// CBOR tag wrapping an item encoded inside a byte string (tag 24).
pub const TAG_ENCODED_CBOR: u64 = 24;

/// Wraps a struct so that it is encoded/decoded as cbor-in-bytes (tag 24).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(transparent)]
pub struct CborWrap<T>(pub T);

impl<T> CborWrap<T> {
    pub fn unwrap(self) -> T {
        self.0
    }
}

impl<T> Deref for CborWrap<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<T: FromCbor> FromCbor for CborWrap<T> {
    fn from_cbor(r: &mut Reader) -> Result<Self, Error> {
        r.read_tag_expect(TAG_ENCODED_CBOR)?;
        let cbor = r.read_byte_string()?;
        let wrapped = T::from_cbor_bytes(&cbor)?;

        Ok(CborWrap(wrapped))
    }
}

impl<T: ToCbor> ToCbor for CborWrap<T> {
    fn to_cbor(&self, w: &mut Writer) -> Result<(), Error> {
        w.write_tag(TAG_ENCODED_CBOR)?;
        w.write_byte_string(&self.0.to_cbor_bytes()?)
    }
}

/// Collects the present fields of an integer-keyed struct map so they can be
/// emitted through [`Writer::write_sorted_map`] in canonical key order.
#[derive(Debug, Default)]
pub struct MapEntries {
    entries: Vec<(Vec<u8>, Vec<u8>)>,
}

impl MapEntries {
    pub fn new() -> Self {
        MapEntries::default()
    }

    pub fn push<T: ToCbor>(&mut self, key: u64, value: &T) -> Result<(), Error> {
        self.entries.push((key.to_cbor_bytes()?, value.to_cbor_bytes()?));
        Ok(())
    }

    pub fn push_opt<T: ToCbor>(&mut self, key: u64, value: &Option<T>) -> Result<(), Error> {
        if let Some(value) = value {
            self.push(key, value)?;
        }
        Ok(())
    }

    pub fn write(self, w: &mut Writer) -> Result<(), Error> {
        w.write_sorted_map(self.entries)
    }
}

/// A value that may be a CBOR null or undefined on the wire.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(from = "Option<T>", into = "Option<T>")]
pub enum Nullable<T>
where
    T: Clone,
{
    Some(T),
    Null,
    Undefined,
}

impl<T: Clone> Nullable<T> {
    pub fn map<F, O>(self, f: F) -> Nullable<O>
    where
        O: Clone,
        F: Fn(T) -> O,
    {
        match self {
            Nullable::Some(x) => Nullable::Some(f(x)),
            Nullable::Null => Nullable::Null,
            Nullable::Undefined => Nullable::Undefined,
        }
    }
}

impl<T: Clone> From<Option<T>> for Nullable<T> {
    fn from(x: Option<T>) -> Self {
        match x {
            Some(x) => Nullable::Some(x),
            None => Nullable::Null,
        }
    }
}

impl<T: Clone> From<Nullable<T>> for Option<T> {
    fn from(x: Nullable<T>) -> Self {
        match x {
            Nullable::Some(x) => Some(x),
            _ => None,
        }
    }
}

impl<T: FromCbor + Clone> FromCbor for Nullable<T> {
    fn from_cbor(r: &mut Reader) -> Result<Self, Error> {
        let state = r.peek_state()?;

        if state.cbor_type == CborType::Simple {
            match state.value {
                22 => {
                    r.read_null()?;
                    return Ok(Nullable::Null);
                }
                23 => {
                    r.read_undefined()?;
                    return Ok(Nullable::Undefined);
                }
                _ => (),
            }
        }

        Ok(Nullable::Some(T::from_cbor(r)?))
    }
}

impl<T: ToCbor + Clone> ToCbor for Nullable<T> {
    fn to_cbor(&self, w: &mut Writer) -> Result<(), Error> {
        match self {
            Nullable::Some(x) => x.to_cbor(w),
            Nullable::Null => w.write_null(),
            Nullable::Undefined => w.write_undefined(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_tag_is_captured_and_preserved() {
        let tagged = hex::decode("d9010283010203").unwrap();
        let set = Set::<u64>::from_cbor_bytes(&tagged).unwrap();
        assert!(set.use_tag());
        assert_eq!(set.to_cbor_bytes().unwrap(), tagged);

        let legacy = hex::decode("83010203").unwrap();
        let set = Set::<u64>::from_cbor_bytes(&legacy).unwrap();
        assert!(!set.use_tag());
        assert_eq!(set.to_cbor_bytes().unwrap(), legacy);
    }

    #[test]
    fn new_sets_default_to_conway_form() {
        let set: Set<u64> = vec![2, 1].into();
        assert_eq!(set.to_cbor_hex().unwrap(), "d90102820102");
    }

    #[test]
    fn set_encoding_is_insertion_order_independent() {
        let a: Set<u64> = vec![3, 1, 2].into();
        let b: Set<u64> = vec![2, 3, 1].into();
        assert_eq!(a.to_cbor_bytes().unwrap(), b.to_cbor_bytes().unwrap());
    }

    #[test]
    fn set_duplicates_strict_vs_lenient() {
        let bytes = hex::decode("d9010283010102").unwrap();
        let set = Set::<u64>::from_cbor_bytes(&bytes).unwrap();
        assert_eq!(**set, vec![1, 2]);

        let mut strict = Reader::strict(&bytes);
        assert_eq!(Set::<u64>::from_cbor(&mut strict), Err(Error::DuplicateKey));
    }

    #[test]
    fn map_encoding_sorts_by_encoded_key() {
        let kvp: KeyValuePairs<u64, u64> = vec![(100, 0), (1, 0)].into();
        assert_eq!(kvp.to_cbor_hex().unwrap(), "a20100186400");
    }

    #[test]
    fn lenient_map_decode_keeps_last_duplicate() {
        // {1: 2, 1: 3}
        let bytes = hex::decode("a201020103").unwrap();
        let kvp = KeyValuePairs::<u64, u64>::from_cbor_bytes(&bytes).unwrap();
        assert_eq!(kvp.to_vec(), vec![(1, 3)]);

        let mut strict = Reader::strict(&bytes);
        assert_eq!(
            KeyValuePairs::<u64, u64>::from_cbor(&mut strict),
            Err(Error::DuplicateKey)
        );
    }

    #[test]
    fn empty_set_encodings() {
        let conway: Set<u64> = Set::new();
        assert_eq!(conway.to_cbor_hex().unwrap(), "d9010280");

        let mut legacy: Set<u64> = Set::new();
        legacy.set_use_tag(false);
        assert_eq!(legacy.to_cbor_hex().unwrap(), "80");
    }
}
