//! Type-erased auxiliary data attached to IR containers.
//!
//! Analysis results travel with the IR as entries of an [`AuxDataTable`]
//! keyed by string. Each entry is either *typed* (a live Rust value behind
//! [`ErasedAuxData`]) or *raw* (a type name plus encoded bytes, kept when the
//! shape is unknown to the reader). Raw entries re-encode byte-for-byte, and
//! become typed the first time they are read with a matching shape.
//!
//! Values are encoded with a small self-contained format: integers and
//! addresses as 8-byte little-endian, UUIDs as 16 raw bytes, strings and
//! containers prefixed with a u64 little-endian length, tuples concatenated.
//! Type names follow the grammar `name` or `name<sub,...>`, for example
//! `mapping<UUID,set<UUID>>`.

use std::any::Any;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use tracing::debug;
use uuid::Uuid;

use crate::core::addr::Addr;
use crate::core::block::Offset;
use crate::core::node::Extension;
use crate::error::{IrError, Result};

/// A value shape that can be stored in an AuxData table.
pub trait AuxDataType: Any + Clone + PartialEq + fmt::Debug + Send + Sync {
    /// Type name written next to the encoded bytes.
    fn type_name() -> String;

    /// Append the encoding of `self` to `out`.
    fn encode_to(&self, out: &mut Vec<u8>);

    /// Decode one value from the front of `input`, advancing it.
    fn decode_from(input: &mut &[u8]) -> Result<Self>;
}

/// Encode a single value.
pub fn encode_value<T: AuxDataType>(value: &T) -> Vec<u8> {
    let mut out = Vec::new();
    value.encode_to(&mut out);
    out
}

/// Decode a single value that must span all of `bytes`.
pub fn decode_value<T: AuxDataType>(bytes: &[u8]) -> Result<T> {
    let mut input = bytes;
    let value = T::decode_from(&mut input)?;
    if !input.is_empty() {
        return Err(IrError::malformed(format!(
            "{} trailing byte(s) after {} value",
            input.len(),
            T::type_name()
        )));
    }
    Ok(value)
}

fn take<'a>(input: &mut &'a [u8], count: usize, what: &str) -> Result<&'a [u8]> {
    if input.len() < count {
        return Err(IrError::malformed(format!(
            "truncated {}: need {} byte(s), have {}",
            what,
            count,
            input.len()
        )));
    }
    let (head, tail) = input.split_at(count);
    *input = tail;
    Ok(head)
}

fn read_u64(input: &mut &[u8]) -> Result<u64> {
    let bytes = take(input, 8, "integer")?;
    let mut buf = [0u8; 8];
    buf.copy_from_slice(bytes);
    Ok(u64::from_le_bytes(buf))
}

/// Read a container length; every element takes at least one byte, so a
/// length beyond the remaining input is rejected before allocating.
fn read_len(input: &mut &[u8]) -> Result<usize> {
    let len = read_u64(input)?;
    match usize::try_from(len) {
        Ok(len) if len <= input.len() => Ok(len),
        _ => Err(IrError::malformed(format!(
            "length {} exceeds remaining {} byte(s)",
            len,
            input.len()
        ))),
    }
}

fn write_len(out: &mut Vec<u8>, len: usize) {
    out.extend_from_slice(&(len as u64).to_le_bytes());
}

impl AuxDataType for u64 {
    fn type_name() -> String {
        "uint64_t".to_string()
    }

    fn encode_to(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.to_le_bytes());
    }

    fn decode_from(input: &mut &[u8]) -> Result<Self> {
        read_u64(input)
    }
}

impl AuxDataType for i64 {
    fn type_name() -> String {
        "int64_t".to_string()
    }

    fn encode_to(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.to_le_bytes());
    }

    fn decode_from(input: &mut &[u8]) -> Result<Self> {
        read_u64(input).map(|v| v as i64)
    }
}

impl AuxDataType for Addr {
    fn type_name() -> String {
        "Addr".to_string()
    }

    fn encode_to(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.value().to_le_bytes());
    }

    fn decode_from(input: &mut &[u8]) -> Result<Self> {
        read_u64(input).map(Addr::new)
    }
}

impl AuxDataType for Uuid {
    fn type_name() -> String {
        "UUID".to_string()
    }

    fn encode_to(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(self.as_bytes());
    }

    fn decode_from(input: &mut &[u8]) -> Result<Self> {
        let bytes = take(input, 16, "UUID")?;
        Uuid::from_slice(bytes).map_err(|e| IrError::malformed(e.to_string()))
    }
}

impl AuxDataType for String {
    fn type_name() -> String {
        "string".to_string()
    }

    fn encode_to(&self, out: &mut Vec<u8>) {
        write_len(out, self.len());
        out.extend_from_slice(self.as_bytes());
    }

    fn decode_from(input: &mut &[u8]) -> Result<Self> {
        let len = read_len(input)?;
        let bytes = take(input, len, "string")?;
        String::from_utf8(bytes.to_vec()).map_err(|e| IrError::malformed(e.to_string()))
    }
}

impl AuxDataType for Offset {
    fn type_name() -> String {
        "Offset".to_string()
    }

    fn encode_to(&self, out: &mut Vec<u8>) {
        self.element_id.encode_to(out);
        self.displacement.encode_to(out);
    }

    fn decode_from(input: &mut &[u8]) -> Result<Self> {
        let element_id = Uuid::decode_from(input)?;
        let displacement = u64::decode_from(input)?;
        Ok(Offset::new(element_id, displacement))
    }
}

impl<T: AuxDataType> AuxDataType for Vec<T> {
    fn type_name() -> String {
        format!("sequence<{}>", T::type_name())
    }

    fn encode_to(&self, out: &mut Vec<u8>) {
        write_len(out, self.len());
        for item in self {
            item.encode_to(out);
        }
    }

    fn decode_from(input: &mut &[u8]) -> Result<Self> {
        let len = read_len(input)?;
        let mut items = Vec::with_capacity(len);
        for _ in 0..len {
            items.push(T::decode_from(input)?);
        }
        Ok(items)
    }
}

impl<T: AuxDataType + Ord> AuxDataType for BTreeSet<T> {
    fn type_name() -> String {
        format!("set<{}>", T::type_name())
    }

    fn encode_to(&self, out: &mut Vec<u8>) {
        write_len(out, self.len());
        for item in self {
            item.encode_to(out);
        }
    }

    fn decode_from(input: &mut &[u8]) -> Result<Self> {
        let len = read_len(input)?;
        let mut items = BTreeSet::new();
        for _ in 0..len {
            items.insert(T::decode_from(input)?);
        }
        Ok(items)
    }
}

impl<K: AuxDataType + Ord, V: AuxDataType> AuxDataType for BTreeMap<K, V> {
    fn type_name() -> String {
        format!("mapping<{},{}>", K::type_name(), V::type_name())
    }

    fn encode_to(&self, out: &mut Vec<u8>) {
        write_len(out, self.len());
        for (key, value) in self {
            key.encode_to(out);
            value.encode_to(out);
        }
    }

    fn decode_from(input: &mut &[u8]) -> Result<Self> {
        let len = read_len(input)?;
        let mut map = BTreeMap::new();
        for _ in 0..len {
            let key = K::decode_from(input)?;
            let value = V::decode_from(input)?;
            map.insert(key, value);
        }
        Ok(map)
    }
}

impl<A: AuxDataType, B: AuxDataType> AuxDataType for (A, B) {
    fn type_name() -> String {
        format!("tuple<{},{}>", A::type_name(), B::type_name())
    }

    fn encode_to(&self, out: &mut Vec<u8>) {
        self.0.encode_to(out);
        self.1.encode_to(out);
    }

    fn decode_from(input: &mut &[u8]) -> Result<Self> {
        Ok((A::decode_from(input)?, B::decode_from(input)?))
    }
}

impl<A: AuxDataType, B: AuxDataType, C: AuxDataType> AuxDataType for (A, B, C) {
    fn type_name() -> String {
        format!(
            "tuple<{},{},{}>",
            A::type_name(),
            B::type_name(),
            C::type_name()
        )
    }

    fn encode_to(&self, out: &mut Vec<u8>) {
        self.0.encode_to(out);
        self.1.encode_to(out);
        self.2.encode_to(out);
    }

    fn decode_from(input: &mut &[u8]) -> Result<Self> {
        Ok((
            A::decode_from(input)?,
            B::decode_from(input)?,
            C::decode_from(input)?,
        ))
    }
}

/// Object-safe handle over any [`AuxDataType`].
pub trait ErasedAuxData: fmt::Debug + Send + Sync {
    fn shape(&self) -> String;
    fn to_bytes(&self) -> Vec<u8>;
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn clone_box(&self) -> Box<dyn ErasedAuxData>;
}

impl<T: AuxDataType> ErasedAuxData for T {
    fn shape(&self) -> String {
        <T as AuxDataType>::type_name()
    }

    fn to_bytes(&self) -> Vec<u8> {
        encode_value(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn clone_box(&self) -> Box<dyn ErasedAuxData> {
        Box::new(self.clone())
    }
}

/// An entry whose shape has not been decoded (or is unknown to this reader).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawAuxData {
    pub type_name: String,
    pub bytes: Vec<u8>,
}

impl RawAuxData {
    pub fn new(type_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            type_name: type_name.into(),
            bytes,
        }
    }
}

/// One AuxData table entry.
#[derive(Debug)]
pub enum AuxData {
    Typed(Box<dyn ErasedAuxData>),
    Raw(RawAuxData),
}

impl AuxData {
    pub fn new<T: AuxDataType>(value: T) -> Self {
        AuxData::Typed(Box::new(value))
    }

    pub fn type_name(&self) -> String {
        match self {
            AuxData::Typed(value) => value.shape(),
            AuxData::Raw(raw) => raw.type_name.clone(),
        }
    }

    pub fn is_raw(&self) -> bool {
        matches!(self, AuxData::Raw(_))
    }

    /// The (type name, bytes) pair this entry serializes to.
    pub fn to_raw(&self) -> RawAuxData {
        match self {
            AuxData::Typed(value) => RawAuxData::new(value.shape(), value.to_bytes()),
            AuxData::Raw(raw) => raw.clone(),
        }
    }
}

impl Clone for AuxData {
    fn clone(&self) -> Self {
        match self {
            AuxData::Typed(value) => AuxData::Typed(value.clone_box()),
            AuxData::Raw(raw) => AuxData::Raw(raw.clone()),
        }
    }
}

/// Entries compare by their serialized form, so a typed entry equals the raw
/// entry it encodes to.
impl PartialEq for AuxData {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (AuxData::Raw(a), AuxData::Raw(b)) => a == b,
            _ => self.to_raw() == other.to_raw(),
        }
    }
}

fn mismatch(key: &str, expected: String, found: String) -> IrError {
    IrError::TypeMismatch {
        key: key.to_string(),
        expected,
        found,
    }
}

/// String-keyed, heterogeneous table of AuxData entries. Keys iterate in
/// sorted order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuxDataTable {
    entries: BTreeMap<String, AuxData>,
    extensions: BTreeMap<String, Vec<Extension>>,
}

impl AuxDataTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `value` under `key`, returning the entry it replaced.
    pub fn insert<T: AuxDataType>(&mut self, key: impl Into<String>, value: T) -> Option<AuxData> {
        self.insert_entry(key.into(), AuxData::new(value))
    }

    pub fn insert_raw(&mut self, key: impl Into<String>, raw: RawAuxData) -> Option<AuxData> {
        self.insert_entry(key.into(), AuxData::Raw(raw))
    }

    fn insert_entry(&mut self, key: String, entry: AuxData) -> Option<AuxData> {
        self.extensions.remove(&key);
        self.entries.insert(key, entry)
    }

    /// Read the entry under `key` as a `T`.
    ///
    /// Absent keys give `Ok(None)`; an entry of another shape, or a raw
    /// entry whose bytes do not decode as `T`, gives `TypeMismatch`.
    pub fn get<T: AuxDataType>(&self, key: &str) -> Result<Option<T>> {
        match self.entries.get(key) {
            None => Ok(None),
            Some(AuxData::Typed(value)) => match value.as_any().downcast_ref::<T>() {
                Some(v) => Ok(Some(v.clone())),
                None => Err(mismatch(key, T::type_name(), value.shape())),
            },
            Some(AuxData::Raw(raw)) => {
                if raw.type_name != T::type_name() {
                    return Err(mismatch(key, T::type_name(), raw.type_name.clone()));
                }
                decode_value::<T>(&raw.bytes)
                    .map(Some)
                    .map_err(|_| mismatch(key, T::type_name(), raw.type_name.clone()))
            }
        }
    }

    /// Mutable access to the entry under `key`, decoding a raw entry in place.
    pub fn get_mut<T: AuxDataType>(&mut self, key: &str) -> Result<Option<&mut T>> {
        let Some(entry) = self.entries.get_mut(key) else {
            return Ok(None);
        };
        if let AuxData::Raw(raw) = entry {
            if raw.type_name != T::type_name() {
                return Err(mismatch(key, T::type_name(), raw.type_name.clone()));
            }
            let value: T = decode_value(&raw.bytes)
                .map_err(|_| mismatch(key, T::type_name(), raw.type_name.clone()))?;
            *entry = AuxData::new(value);
        }
        match entry {
            AuxData::Typed(value) => {
                let found = value.shape();
                value
                    .as_any_mut()
                    .downcast_mut::<T>()
                    .map(Some)
                    .ok_or_else(|| mismatch(key, T::type_name(), found))
            }
            AuxData::Raw(_) => Ok(None),
        }
    }

    pub fn entry(&self, key: &str) -> Option<&AuxData> {
        self.entries.get(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<AuxData> {
        self.extensions.remove(key);
        self.entries.remove(key)
    }

    /// Unknown wire fields carried by the entry under `key`.
    pub fn entry_extensions(&self, key: &str) -> &[Extension] {
        self.extensions
            .get(key)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub(crate) fn set_entry_extensions(&mut self, key: &str, extensions: Vec<Extension>) {
        if extensions.is_empty() || !self.entries.contains_key(key) {
            self.extensions.remove(key);
        } else {
            self.extensions.insert(key.to_string(), extensions);
        }
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &AuxData)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Decode every raw entry whose type name `schema` knows. Entries that
    /// fail to decode stay raw, as do entries whose bytes are not the
    /// canonical encoding of the decoded value (unsorted or duplicated set
    /// and mapping elements), so they re-encode unchanged.
    pub fn upgrade_with(&mut self, schema: &AuxSchema) {
        for (key, entry) in self.entries.iter_mut() {
            let AuxData::Raw(raw) = entry else {
                continue;
            };
            match schema.decode(raw) {
                Some(Ok(value)) if value.to_bytes() == raw.bytes => *entry = AuxData::Typed(value),
                Some(Ok(_)) => {
                    debug!(key = %key, type_name = %raw.type_name, "non-canonical aux data kept opaque")
                }
                Some(Err(err)) => {
                    debug!(key = %key, type_name = %raw.type_name, error = %err, "aux data kept opaque")
                }
                None => debug!(key = %key, type_name = %raw.type_name, "unregistered aux data shape"),
            }
        }
    }
}

type DecodeFn = fn(&[u8]) -> Result<Box<dyn ErasedAuxData>>;

fn decode_erased<T: AuxDataType>(bytes: &[u8]) -> Result<Box<dyn ErasedAuxData>> {
    decode_value::<T>(bytes).map(|value| Box::new(value) as Box<dyn ErasedAuxData>)
}

/// Registry of AuxData shapes that may be decoded eagerly, by type name.
#[derive(Clone, Default)]
pub struct AuxSchema {
    decoders: HashMap<String, DecodeFn>,
}

impl AuxSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shapes produced by common analyses.
    pub fn standard() -> Self {
        let mut schema = Self::new();
        schema
            .register::<Vec<Addr>>()
            .register::<BTreeMap<Uuid, String>>()
            .register::<BTreeMap<Uuid, u64>>()
            .register::<BTreeMap<Uuid, BTreeSet<Uuid>>>()
            .register::<BTreeMap<Offset, String>>()
            .register::<BTreeMap<Addr, u64>>()
            .register::<BTreeSet<Uuid>>();
        schema
    }

    pub fn register<T: AuxDataType>(&mut self) -> &mut Self {
        self.decoders.insert(T::type_name(), decode_erased::<T>);
        self
    }

    pub fn contains(&self, type_name: &str) -> bool {
        self.decoders.contains_key(type_name)
    }

    /// Decode `raw` if its shape is registered.
    pub fn decode(&self, raw: &RawAuxData) -> Option<Result<Box<dyn ErasedAuxData>>> {
        self.decoders
            .get(&raw.type_name)
            .map(|decode| decode(&raw.bytes))
    }
}

impl fmt::Debug for AuxSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.decoders.keys().collect();
        names.sort();
        f.debug_struct("AuxSchema").field("shapes", &names).finish()
    }
}
