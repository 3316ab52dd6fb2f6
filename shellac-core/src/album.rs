use std::collections::HashMap;

use serde::Serialize;

use crate::error::{CatalogError, Result};

/// One catalog item. Records are provisioned out of band; this system only
/// ever reads them and increments `likes`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Album {
    pub id: String,
    pub title: String,
    pub artist: String,
    pub price: f64,
    pub likes: u64,
}

impl Album {
    /// Decode the field map of a stored album record.
    ///
    /// A missing field or an unparseable numeric means the stored record is
    /// corrupt. That is a server-side fault, never a caller error, so it maps
    /// to [`CatalogError::MalformedRecord`] and is never retried.
    pub fn from_fields(id: &str, fields: &HashMap<String, String>) -> Result<Self> {
        let title = required(id, fields, "title")?;
        let artist = required(id, fields, "artist")?;

        let price: f64 = required(id, fields, "price")?
            .parse()
            .map_err(|_| malformed(id, "price"))?;
        if !price.is_finite() || price < 0.0 {
            return Err(malformed(id, "price"));
        }

        let likes: u64 = required(id, fields, "likes")?
            .parse()
            .map_err(|_| malformed(id, "likes"))?;

        Ok(Self {
            id: id.to_string(),
            title: title.to_string(),
            artist: artist.to_string(),
            price,
            likes,
        })
    }
}

fn required<'a>(
    id: &str,
    fields: &'a HashMap<String, String>,
    name: &str,
) -> Result<&'a str> {
    fields.get(name).map(String::as_str).ok_or_else(|| {
        CatalogError::MalformedRecord(format!(
            "album {id}: missing field `{name}`"
        ))
    })
}

fn malformed(id: &str, field: &str) -> CatalogError {
    CatalogError::MalformedRecord(format!(
        "album {id}: invalid value for field `{field}`"
    ))
}
