use std::collections::VecDeque;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use thiserror::Error;

/// A single vendor entry within a [`Tracestate`].
///
/// The key is a short vendor or tenant identifier (e.g. a service name); the
/// value is an opaque payload, typically a base64 encoded span identifier.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct Member {
    /// Short vendor or tenant identifier.
    pub key: String,
    /// Opaque, already encoded payload.
    pub value: String,
}

impl Member {
    /// Creates a member from a key and an already encoded value.
    pub fn new<K, V>(key: K, value: V) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Member {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Creates a member whose value is the standard base64 encoding of the
    /// given raw span identifier.
    ///
    /// # Examples
    ///
    /// ```
    /// use tracestate_propagator::Member;
    ///
    /// let member = Member::from_span_id("svc_a", "spanId");
    /// assert_eq!(member.value, "c3Bhbklk");
    /// ```
    pub fn from_span_id<K, T>(key: K, span_id: T) -> Self
    where
        K: Into<String>,
        T: AsRef<[u8]>,
    {
        Member::new(key, STANDARD.encode(span_id.as_ref()))
    }

    /// Byte length this member occupies in the joined wire form, counting its
    /// `=` separator and trailing `,`.
    fn joined_len(&self) -> usize {
        self.key.len() + self.value.len() + 2
    }
}

impl<K, V> From<(K, V)> for Member
where
    K: Into<String>,
    V: Into<String>,
{
    fn from((key, value): (K, V)) -> Self {
        Member::new(key, value)
    }
}

/// An ordered sequence of vendor [`Member`]s carried alongside a distributed
/// trace, modeled after the [W3C Trace Context] `tracestate` header.
///
/// Position encodes recency: the most recently added member is always at
/// index 0, and eviction under a byte budget removes members strictly from
/// the tail. Duplicate keys from different producers are tolerated; no
/// dedup step exists.
///
/// All mutating operations return a new `Tracestate`, leaving `self`
/// untouched.
///
/// [W3C Trace Context]: https://www.w3.org/TR/trace-context/#tracestate-header
#[derive(Clone, Debug, Default, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct Tracestate(Option<VecDeque<Member>>);

impl Tracestate {
    /// The empty `Tracestate`, as a constant.
    pub const NONE: Tracestate = Tracestate(None);

    /// Validates that the given `Tracestate` member key is valid per the [W3 Spec].
    ///
    /// [W3 Spec]: https://www.w3.org/TR/trace-context/#key
    fn valid_key(key: &str) -> bool {
        if key.len() > 256 {
            return false;
        }

        let allowed_special = |b: u8| b == b'_' || b == b'-' || b == b'*' || b == b'/';
        let mut vendor_start = None;
        for (i, &b) in key.as_bytes().iter().enumerate() {
            if !(b.is_ascii_lowercase() || b.is_ascii_digit() || allowed_special(b) || b == b'@') {
                return false;
            }

            if i == 0 && (!b.is_ascii_lowercase() && !b.is_ascii_digit()) {
                return false;
            } else if b == b'@' {
                if vendor_start.is_some() || i + 14 < key.len() {
                    return false;
                }
                vendor_start = Some(i);
            } else if let Some(start) = vendor_start {
                if i == start + 1 && !(b.is_ascii_lowercase() || b.is_ascii_digit()) {
                    return false;
                }
            }
        }

        true
    }

    /// Validates that the given `Tracestate` member value is valid per the [W3 Spec].
    ///
    /// [W3 Spec]: https://www.w3.org/TR/trace-context/#value
    fn valid_value(value: &str) -> bool {
        if value.len() > 256 {
            return false;
        }

        !(value.contains(',') || value.contains('='))
    }

    /// Creates a new `Tracestate` from the given key-value collection,
    /// validating every entry against the W3C tracestate grammar.
    ///
    /// Entries are kept in iteration order, first entry at index 0.
    ///
    /// # Examples
    ///
    /// ```
    /// use tracestate_propagator::Tracestate;
    ///
    /// let kvs = vec![("foo", "bar"), ("apple", "banana")];
    /// let tracestate = Tracestate::from_key_value(kvs);
    ///
    /// assert!(tracestate.is_ok());
    /// assert_eq!(tracestate.unwrap().header(), String::from("foo=bar,apple=banana"))
    /// ```
    pub fn from_key_value<T, K, V>(entries: T) -> Result<Self, TracestateError>
    where
        T: IntoIterator<Item = (K, V)>,
        K: ToString,
        V: ToString,
    {
        let ordered = entries
            .into_iter()
            .map(|(key, value)| {
                let (key, value) = (key.to_string(), value.to_string());
                if !Tracestate::valid_key(key.as_str()) {
                    return Err(TracestateError::Key(key));
                }
                if !Tracestate::valid_value(value.as_str()) {
                    return Err(TracestateError::Value(value));
                }

                Ok(Member { key, value })
            })
            .collect::<Result<VecDeque<_>, TracestateError>>()?;

        if ordered.is_empty() {
            Ok(Tracestate(None))
        } else {
            Ok(Tracestate(Some(ordered)))
        }
    }

    /// Retrieves the value for a given key if any member carries it.
    ///
    /// With duplicate keys, the most recent (closest to the head) wins.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.as_ref().and_then(|kvs| {
            kvs.iter().find_map(|member| {
                if member.key.as_str() == key {
                    Some(member.value.as_str())
                } else {
                    None
                }
            })
        })
    }

    /// Returns the number of members.
    pub fn len(&self) -> usize {
        self.0.as_ref().map_or(0, VecDeque::len)
    }

    /// Returns `true` if there are no members.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns a new `Tracestate` with `(key, value)` inserted at index 0,
    /// all existing members shifted back by one position.
    ///
    /// No validation or dedup is performed: the contract here is purely
    /// about ordering and length, keys and values are assumed to be
    /// sanitized upstream. Use [`Tracestate::from_key_value`] when entries
    /// come from an untrusted producer.
    pub fn prepend<K, V>(&self, key: K, value: V) -> Tracestate
    where
        K: Into<String>,
        V: Into<String>,
    {
        let mut owned = self.clone();
        let kvs = owned.0.get_or_insert(VecDeque::with_capacity(1));

        kvs.push_front(Member::new(key, value));

        owned
    }

    /// Exact byte length of the serialized form: the sum of
    /// `key.len() + value.len() + 2` over all members, minus 1 for the
    /// trailing separator that does not appear in the final string.
    ///
    /// The empty state reports 0.
    pub fn measured_len(&self) -> usize {
        match self.0.as_ref() {
            Some(kvs) if !kvs.is_empty() => {
                kvs.iter().fold(0, |len, member| len + member.joined_len()) - 1
            }
            _ => 0,
        }
    }

    /// Returns a new `Tracestate` with trailing members removed until the
    /// serialized form fits within `max_len` bytes.
    ///
    /// Truncation granularity is whole members, and the head member is
    /// never evicted: when the newest member alone exceeds `max_len` it is
    /// kept as-is, the one permitted budget violation.
    pub fn evict_to_fit(&self, max_len: usize) -> Tracestate {
        let mut owned = self.clone();
        while owned.len() > 1 && owned.measured_len() > max_len {
            if let Some(kvs) = owned.0.as_mut() {
                kvs.pop_back();
            }
        }
        owned
    }

    /// Creates a new header string, delimiting each key and value with a `=`
    /// and each member with a `,`. The empty state serializes to `""`.
    pub fn header(&self) -> String {
        self.header_delimited("=", ",")
    }

    /// Creates a new header string, with the given key/value delimiter and
    /// member delimiter.
    pub fn header_delimited(&self, entry_delimiter: &str, list_delimiter: &str) -> String {
        self.0
            .as_ref()
            .map(|kvs| {
                kvs.iter()
                    .map(|member| format!("{}{}{}", member.key, entry_delimiter, member.value))
                    .collect::<Vec<String>>()
                    .join(list_delimiter)
            })
            .unwrap_or_default()
    }
}

impl FromIterator<Member> for Tracestate {
    fn from_iter<I: IntoIterator<Item = Member>>(iter: I) -> Self {
        let kvs = iter.into_iter().collect::<VecDeque<_>>();
        if kvs.is_empty() {
            Tracestate(None)
        } else {
            Tracestate(Some(kvs))
        }
    }
}

/// Error returned by `Tracestate` operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum TracestateError {
    /// The key is invalid.
    ///
    /// See <https://www.w3.org/TR/trace-context/#key> for requirement for keys.
    #[error("{0} is not a valid key in Tracestate, see https://www.w3.org/TR/trace-context/#key for more details")]
    Key(String),

    /// The value is invalid.
    ///
    /// See <https://www.w3.org/TR/trace-context/#value> for requirement for values.
    #[error("{0} is not a valid value in Tracestate, see https://www.w3.org/TR/trace-context/#value for more details")]
    Value(String),
}
