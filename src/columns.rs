//! Header name resolution for the time-tracking sheet.
//!
//! Columns can appear in any order and under several case-insensitive
//! aliases; a field nobody matched is reported as absent (`None`) instead of
//! an out-of-range index.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Field {
    Date,
    Hours,
    Category,
    Task,
    Persons,
    Invoice,
    Status,
}

impl Field {
    pub const ALL: [Field; 7] = [
        Field::Date,
        Field::Hours,
        Field::Category,
        Field::Task,
        Field::Persons,
        Field::Invoice,
        Field::Status,
    ];

    /// Candidate header names, in priority order.
    pub fn aliases(self) -> &'static [&'static str] {
        match self {
            Field::Date => &["date"],
            Field::Hours => &["hours"],
            Field::Category => &["category"],
            Field::Task => &["task", "work", "task/work"],
            Field::Persons => &["persons"],
            Field::Invoice => &["invoice"],
            Field::Status => &["paid", "status"],
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Field::Date => "date",
            Field::Hours => "hours",
            Field::Category => "category",
            Field::Task => "task",
            Field::Persons => "persons",
            Field::Invoice => "invoice",
            Field::Status => "status",
        }
    }
}

/// Index of the first header matching any alias. Aliases are tried in order,
/// so an earlier alias wins even when a later one sits further left.
pub fn resolve_column<S: AsRef<str>>(headers: &[S], aliases: &[&str]) -> Option<usize> {
    let normalized: Vec<String> = headers
        .iter()
        .map(|h| h.as_ref().trim().to_lowercase())
        .collect();

    aliases.iter().find_map(|alias| {
        let alias = alias.trim().to_lowercase();
        normalized.iter().position(|h| *h == alias)
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ColumnMap {
    pub date: Option<usize>,
    pub hours: Option<usize>,
    pub category: Option<usize>,
    pub task: Option<usize>,
    pub persons: Option<usize>,
    pub invoice: Option<usize>,
    pub status: Option<usize>,
}

impl ColumnMap {
    pub fn from_headers<S: AsRef<str>>(headers: &[S]) -> Self {
        let find = |field: Field| resolve_column(headers, field.aliases());
        Self {
            date: find(Field::Date),
            hours: find(Field::Hours),
            category: find(Field::Category),
            task: find(Field::Task),
            persons: find(Field::Persons),
            invoice: find(Field::Invoice),
            status: find(Field::Status),
        }
    }

    pub fn get(&self, field: Field) -> Option<usize> {
        match field {
            Field::Date => self.date,
            Field::Hours => self.hours,
            Field::Category => self.category,
            Field::Task => self.task,
            Field::Persons => self.persons,
            Field::Invoice => self.invoice,
            Field::Status => self.status,
        }
    }

    /// Largest index among the columns that were found.
    pub fn max_index(&self) -> Option<usize> {
        Field::ALL.iter().filter_map(|f| self.get(*f)).max()
    }

    /// Fields that must be present for rows to be billable.
    pub fn missing_required(&self) -> Vec<Field> {
        [Field::Date, Field::Hours, Field::Task, Field::Status]
            .into_iter()
            .filter(|f| self.get(*f).is_none())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADERS: [&str; 7] = ["Date", "Hours", "Category", "Task/Work", "Persons", "Invoice", "Paid"];

    #[test]
    fn resolves_standard_layout() {
        let map = ColumnMap::from_headers(&HEADERS);
        assert_eq!(map.date, Some(0));
        assert_eq!(map.hours, Some(1));
        assert_eq!(map.category, Some(2));
        assert_eq!(map.task, Some(3));
        assert_eq!(map.persons, Some(4));
        assert_eq!(map.invoice, Some(5));
        assert_eq!(map.status, Some(6));
        assert_eq!(map.max_index(), Some(6));
        assert!(map.missing_required().is_empty());
    }

    #[test]
    fn mapping_ignores_case_whitespace_and_order() {
        let shuffled = ["  PAID ", "invoice", "persons", "TASK/WORK", "category", "HOURS", " date"];
        let base = ColumnMap::from_headers(&HEADERS);
        let map = ColumnMap::from_headers(&shuffled);

        for field in Field::ALL {
            let a = base.get(field).map(|i| HEADERS[i].trim().to_lowercase());
            let b = map.get(field).map(|i| shuffled[i].trim().to_lowercase());
            assert_eq!(a, b, "field {:?}", field);
        }
    }

    #[test]
    fn earlier_alias_wins_over_header_position() {
        // "status" is further left but "paid" comes first in the alias list
        let headers = ["Status", "Date", "Paid"];
        assert_eq!(resolve_column(&headers, Field::Status.aliases()), Some(2));

        let headers = ["Work", "Task"];
        assert_eq!(resolve_column(&headers, Field::Task.aliases()), Some(1));
    }

    #[test]
    fn status_alias_is_used_when_paid_absent() {
        let headers = ["date", "hours", "status"];
        assert_eq!(resolve_column(&headers, Field::Status.aliases()), Some(2));
    }

    #[test]
    fn unmatched_field_is_absent() {
        let map = ColumnMap::from_headers(&["Date", "Hours", "Task"]);
        assert_eq!(map.status, None);
        assert_eq!(map.invoice, None);
        assert_eq!(map.missing_required(), vec![Field::Status]);
        assert_eq!(map.max_index(), Some(2));
    }

    #[test]
    fn empty_header_row() {
        let headers: [&str; 0] = [];
        let map = ColumnMap::from_headers(&headers);
        assert_eq!(map, ColumnMap::default());
        assert_eq!(map.max_index(), None);
    }
}
