use crate::state::Region;
use serde::{Deserialize, Serialize};

/// Durable marker of sweep progress
///
/// A checkpoint names the last fully committed page of a (year, region)
/// pair. Page 0 means no page of that pair has been committed yet, so a
/// resumed run always continues at `page + 1`. Exactly one checkpoint
/// exists per sweep.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub year: i32,
    pub region: Region,
    pub page: u32,
}

impl Checkpoint {
    pub fn new(year: i32, region: Region, page: u32) -> Self {
        Self { year, region, page }
    }

    /// The checkpoint for a pair whose pages up to, but excluding, `page`
    /// are committed
    ///
    /// `page` 1 (or 0) yields page 0: nothing of the pair is committed.
    pub fn before_page(year: i32, region: Region, page: u32) -> Self {
        Self::new(year, region, page.saturating_sub(1))
    }

    /// The sentinel written once the whole range has been swept
    ///
    /// It lies past `end_year`, which tells the next run there is nothing
    /// left to do.
    pub fn completed(end_year: i32, first_region: Region) -> Self {
        Self::new(end_year + 1, first_region, 0)
    }

    /// Returns true if this checkpoint lies beyond the configured range
    pub fn is_past(&self, end_year: i32) -> bool {
        self.year > end_year
    }

    /// The first page a resumed run lists for this checkpoint's pair
    pub fn next_page(&self) -> u32 {
        self.page + 1
    }
}
