// Apartment listings as delivered by the search tool.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};

/// A single apartment listing.
///
/// Listings are immutable once received; a new search result replaces the
/// whole set. Every field except `id` falls back to an empty/zero value when
/// the backend omits it or sends `null`, the same defaults the search tool
/// fills in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Listing {
    pub id: String,
    #[serde(default, deserialize_with = "de_null_default")]
    pub title: String,
    #[serde(default, deserialize_with = "de_null_default")]
    pub description: String,
    /// District or neighbourhood.
    #[serde(default, deserialize_with = "de_null_default")]
    pub location: String,
    /// Contact address of the landlord or agent.
    #[serde(default, deserialize_with = "de_null_default")]
    pub contact: String,
    /// Monthly rent.
    #[serde(default, deserialize_with = "de_null_default")]
    pub price: f64,
    #[serde(default, deserialize_with = "de_whole_number_or_default")]
    pub rooms: u32,
    /// Floor area in square metres.
    #[serde(default, deserialize_with = "de_null_default")]
    pub size: f64,
    #[serde(default, deserialize_with = "de_whole_number_or_default")]
    pub floor: i32,
    #[serde(default, deserialize_with = "de_null_default")]
    pub availability: String,
    #[serde(default, deserialize_with = "de_null_default")]
    pub lat: f64,
    #[serde(default, deserialize_with = "de_null_default")]
    pub lng: f64,
}

impl Listing {
    /// A listing with only an id; everything else at its default.
    pub fn with_id(id: impl Into<String>) -> Self {
        Listing {
            id: id.into(),
            title: String::new(),
            description: String::new(),
            location: String::new(),
            contact: String::new(),
            price: 0.0,
            rooms: 0,
            size: 0.0,
            floor: 0,
            availability: String::new(),
            lat: 0.0,
            lng: 0.0,
        }
    }
}

// ---------------------------------------------------------------------------
// Lenient integer decoding
// ---------------------------------------------------------------------------

/// Decode an integer that the backend may have emitted as a JSON float
/// (`3.0`). Fractional or out-of-range values are rejected; `null` decodes
/// to zero.
fn de_whole_number_or_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: TryFrom<i64> + Default,
{
    Ok(de_opt_whole_number(deserializer)?.unwrap_or_default())
}

/// `null` decodes to the type's default.
fn de_null_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Optional variant of [`de_whole_number_or_default`]; `null` decodes to `None`.
pub(crate) fn de_opt_whole_number<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: TryFrom<i64>,
{
    match Option::<f64>::deserialize(deserializer)? {
        Some(n) => whole_number(n).map(Some).map_err(D::Error::custom),
        None => Ok(None),
    }
}

fn whole_number<T: TryFrom<i64>>(n: f64) -> Result<T, String> {
    if !n.is_finite() || n.fract() != 0.0 {
        return Err(format!("expected a whole number, got {n}"));
    }
    T::try_from(n as i64).map_err(|_| format!("{n} is out of range"))
}
