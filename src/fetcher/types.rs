use std::fmt;

use serde::{Deserialize, Serialize};

use super::Record;

/// An artwork row as returned by the collection API.
/// Display fields are frequently null upstream, so all of them are optional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artwork {
    pub id: u64,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub place_of_origin: Option<String>,
    #[serde(default)]
    pub artist_display: Option<String>,
    #[serde(default)]
    pub inscriptions: Option<String>,
    #[serde(default)]
    pub date_start: Option<i32>,
    #[serde(default)]
    pub date_end: Option<i32>,
}

impl Artwork {
    /// Minimal artwork with only an id and a title.
    pub fn untitled(id: u64) -> Self {
        Self {
            id,
            title: Some(format!("Untitled #{}", id)),
            place_of_origin: None,
            artist_display: None,
            inscriptions: None,
            date_start: None,
            date_end: None,
        }
    }
}

impl Record for Artwork {
    type Id = u64;

    fn id(&self) -> u64 {
        self.id
    }
}

impl fmt::Display for Artwork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:>8}  {}", self.id, self.title.as_deref().unwrap_or("(untitled)"))?;
        if let Some(artist) = self.artist_display.as_deref() {
            // artist_display often spans lines ("Name\nCountry, 1850-1900")
            let first_line = artist.lines().next().unwrap_or_default();
            write!(f, " | {}", first_line)?;
        }
        match (self.date_start, self.date_end) {
            (Some(start), Some(end)) if start != end => write!(f, " ({}-{})", start, end),
            (Some(start), _) => write!(f, " ({})", start),
            _ => Ok(()),
        }
    }
}

/// Envelope of a collection listing response.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiResponse<T> {
    pub data: Vec<T>,
    pub pagination: Pagination,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Pagination {
    pub total: usize,
    #[serde(default)]
    pub limit: usize,
    #[serde(default)]
    pub offset: usize,
    #[serde(default)]
    pub total_pages: usize,
    #[serde(default)]
    pub current_page: usize,
}
