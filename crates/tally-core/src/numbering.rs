//! # Document Numbering
//!
//! Human-readable sequential document numbers, scoped per calendar day:
//! `{prefix}{YYYYMMDD}{NNN}` with the sequence starting at `001`.
//!
//! One series type covers every numbered document - sale invoices use the
//! `F` series, workshop service orders the `OT-` series. The sequence is
//! derived from the highest existing number for the day, which is only
//! race-free when the caller pairs it with a unique constraint and a
//! retry (see the sale repository).

use chrono::NaiveDate;

/// A per-day sequential number series with a fixed prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentSeries {
    prefix: String,
}

impl DocumentSeries {
    /// Creates a series with the given prefix.
    pub fn new(prefix: impl Into<String>) -> Self {
        DocumentSeries {
            prefix: prefix.into(),
        }
    }

    /// The sale invoice series: `F20260804001`.
    pub fn invoice() -> Self {
        DocumentSeries::new("F")
    }

    /// The workshop service-order series: `OT-20260804001`.
    pub fn service_order() -> Self {
        DocumentSeries::new("OT-")
    }

    /// The series prefix for one day, e.g. `F20260804`.
    ///
    /// This is also the `LIKE 'F20260804%'` pattern stem used to find the
    /// day's highest existing number.
    pub fn day_prefix(&self, date: NaiveDate) -> String {
        format!("{}{}", self.prefix, date.format("%Y%m%d"))
    }

    /// The first number of a day.
    pub fn first(&self, date: NaiveDate) -> String {
        format!("{}001", self.day_prefix(date))
    }

    /// The number following `last`, or the day's first number when there
    /// is no previous one.
    ///
    /// ## Example
    /// ```rust
    /// use chrono::NaiveDate;
    /// use tally_core::numbering::DocumentSeries;
    ///
    /// let series = DocumentSeries::invoice();
    /// let day = NaiveDate::from_ymd_opt(2026, 8, 4).unwrap();
    ///
    /// assert_eq!(series.next_after(day, None), "F20260804001");
    /// assert_eq!(series.next_after(day, Some("F20260804007")), "F20260804008");
    /// ```
    pub fn next_after(&self, date: NaiveDate, last: Option<&str>) -> String {
        let sequence = last
            .and_then(|number| self.sequence_of(date, number))
            .map(|seq| seq + 1)
            .unwrap_or(1);

        format!("{}{:03}", self.day_prefix(date), sequence)
    }

    /// Extracts the sequence from a number of this series for the given
    /// day. Returns None for numbers of other days, other series, or with
    /// a malformed sequence.
    pub fn sequence_of(&self, date: NaiveDate, number: &str) -> Option<u32> {
        number
            .strip_prefix(&self.day_prefix(date))
            .and_then(|digits| digits.parse::<u32>().ok())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 8, 4).unwrap()
    }

    #[test]
    fn test_first_of_day() {
        assert_eq!(DocumentSeries::invoice().first(day()), "F20260804001");
        assert_eq!(
            DocumentSeries::service_order().first(day()),
            "OT-20260804001"
        );
    }

    #[test]
    fn test_next_after_none_is_first() {
        assert_eq!(
            DocumentSeries::invoice().next_after(day(), None),
            "F20260804001"
        );
    }

    #[test]
    fn test_next_after_increments_and_pads() {
        let series = DocumentSeries::invoice();
        assert_eq!(
            series.next_after(day(), Some("F20260804001")),
            "F20260804002"
        );
        assert_eq!(
            series.next_after(day(), Some("F20260804099")),
            "F20260804100"
        );
    }

    #[test]
    fn test_next_after_widens_past_999() {
        // Padding widens instead of wrapping; uniqueness survives a very
        // busy day even though string ordering no longer does.
        let series = DocumentSeries::invoice();
        assert_eq!(
            series.next_after(day(), Some("F20260804999")),
            "F202608041000"
        );
        assert_eq!(
            series.next_after(day(), Some("F202608041000")),
            "F202608041001"
        );
    }

    #[test]
    fn test_next_after_ignores_foreign_numbers() {
        // A number from another day or series restarts the sequence
        let series = DocumentSeries::invoice();
        assert_eq!(
            series.next_after(day(), Some("F20260803017")),
            "F20260804001"
        );
        assert_eq!(
            series.next_after(day(), Some("OT-20260804004")),
            "F20260804001"
        );
    }

    #[test]
    fn test_sequence_of() {
        let series = DocumentSeries::invoice();
        assert_eq!(series.sequence_of(day(), "F20260804042"), Some(42));
        assert_eq!(series.sequence_of(day(), "F20260803042"), None);
        assert_eq!(series.sequence_of(day(), "F20260804xyz"), None);
    }
}
