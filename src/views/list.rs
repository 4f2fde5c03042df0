use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::{consts::PAGE_SIZE, store::Record, utils::time::parse_instant};

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ViewState {
    Loading,
    Empty,
    Ready,
}

/// Case-insensitive substring match over one or more fields; any field may match.
#[derive(Debug, Clone, PartialEq)]
pub struct TextFilter {
    pub fields: Vec<String>,
    pub needle: String,
}

/// Inclusive bounds over one timestamp field. Rows without a readable timestamp never match.
#[derive(Debug, Clone, PartialEq)]
pub struct DateRange {
    pub field: String,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

/// Links a row offers. Read-only views only offer `view`.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct RowActions {
    pub view: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub edit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delete: Option<String>,
}

#[derive(Serialize, Debug, Clone)]
pub struct ListRow<T> {
    #[serde(flatten)]
    pub record: T,
    pub actions: RowActions,
}

#[derive(Serialize, Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<ListRow<T>>,
    pub page: usize,
    pub page_size: usize,
    pub total: usize,
    pub total_pages: usize,
    pub state: ViewState,
}

impl<T> Page<T> {
    pub fn map_records<U>(self, f: impl Fn(T) -> U) -> Page<U> {
        Page {
            items: self
                .items
                .into_iter()
                .map(|row| ListRow {
                    record: f(row.record),
                    actions: row.actions,
                })
                .collect(),
            page: self.page,
            page_size: self.page_size,
            total: self.total,
            total_pages: self.total_pages,
            state: self.state,
        }
    }
}

/// A loaded collection with its active filters, sliced into pages of [`PAGE_SIZE`].
#[derive(Debug, Clone)]
pub struct ListView<T> {
    base_path: String,
    manageable: bool,
    rows: Option<Vec<T>>,
    text: Option<TextFilter>,
    range: Option<DateRange>,
}

fn field_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

impl<T: Record> ListView<T> {
    /// A read-only view; row links are built as `<base_path>/<id>`.
    pub fn new(base_path: impl Into<String>) -> Self {
        Self {
            base_path: base_path.into(),
            manageable: false,
            rows: None,
            text: None,
            range: None,
        }
    }

    /// Rows also offer `<base_path>/<id>/edit` and a delete target.
    pub fn manageable(mut self) -> Self {
        self.manageable = true;
        self
    }

    pub fn load(mut self, rows: Vec<T>) -> Self {
        self.rows = Some(rows);
        self
    }

    /// A blank needle leaves the view unfiltered.
    pub fn text_filter<I, S>(mut self, fields: I, needle: Option<&str>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.text = needle
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(|needle| TextFilter {
                fields: fields.into_iter().map(Into::into).collect(),
                needle: needle.to_lowercase(),
            });
        self
    }

    pub fn date_range(
        mut self,
        field: &str,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Self {
        self.range = (from.is_some() || to.is_some()).then(|| DateRange {
            field: field.to_string(),
            from,
            to,
        });
        self
    }

    pub fn has_filters(&self) -> bool {
        self.text.is_some() || self.range.is_some()
    }

    fn matches(&self, row: &T) -> bool {
        if !self.has_filters() {
            return true;
        }
        let Ok(Value::Object(fields)) = serde_json::to_value(row) else {
            return false;
        };

        if let Some(text) = &self.text {
            let hit = text.fields.iter().any(|name| {
                fields
                    .get(name)
                    .and_then(field_text)
                    .is_some_and(|value| value.to_lowercase().contains(&text.needle))
            });
            if !hit {
                return false;
            }
        }

        if let Some(range) = &self.range {
            let Some(at) = fields
                .get(&range.field)
                .and_then(Value::as_str)
                .and_then(parse_instant)
            else {
                return false;
            };
            if range.from.is_some_and(|from| at < from) || range.to.is_some_and(|to| at > to) {
                return false;
            }
        }
        true
    }

    /// Matching rows in their original order.
    pub fn filtered(&self) -> Vec<&T> {
        self.rows
            .iter()
            .flatten()
            .filter(|row| self.matches(row))
            .collect()
    }

    pub fn state(&self) -> ViewState {
        match &self.rows {
            None => ViewState::Loading,
            Some(_) if self.filtered().is_empty() => ViewState::Empty,
            Some(_) => ViewState::Ready,
        }
    }

    fn actions_for(&self, id: i64) -> RowActions {
        let base = self.base_path.trim_end_matches('/');
        let view = format!("{base}/{id}");
        RowActions {
            edit: self.manageable.then(|| format!("{view}/edit")),
            delete: self.manageable.then(|| view.clone()),
            view,
        }
    }

    /// `page` is 1-based; 0 is read as 1. Pages past the end are empty but keep the totals.
    pub fn into_page(self, page: usize) -> Page<T> {
        let page = page.max(1);
        let state = self.state();
        let matching: Vec<T> = self.filtered().into_iter().cloned().collect();
        let total = matching.len();

        let items = matching
            .into_iter()
            .skip((page - 1) * PAGE_SIZE)
            .take(PAGE_SIZE)
            .map(|record| ListRow {
                actions: self.actions_for(record.id()),
                record,
            })
            .collect();

        Page {
            items,
            page,
            page_size: PAGE_SIZE,
            total,
            total_pages: total.div_ceil(PAGE_SIZE),
            state,
        }
    }
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    use super::*;

    #[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
    struct Row {
        id: i64,
        title: String,
        place: Option<String>,
        at: String,
    }

    impl Record for Row {
        const TABLE: &'static str = "rows";
        const NAME: &'static str = "Row";

        fn id(&self) -> i64 {
            self.id
        }
    }

    fn rows(n: i64) -> Vec<Row> {
        (1..=n)
            .map(|id| Row {
                id,
                title: if id % 3 == 0 { format!("Gala {id}") } else { format!("Talk {id}") },
                place: (id % 2 == 0).then(|| "Laxenburg".to_string()),
                at: format!("2025-01-{id:02}T10:00:00Z"),
            })
            .collect()
    }

    #[test]
    fn fresh_view_is_loading_until_rows_arrive() {
        let view = ListView::<Row>::new("/admin/rows");
        assert_eq!(view.state(), ViewState::Loading);
        assert_eq!(view.load(Vec::new()).state(), ViewState::Empty);
        assert_eq!(ListView::new("/x").load(rows(1)).state(), ViewState::Ready);
    }

    #[test]
    fn empty_filter_keeps_everything() {
        let view = ListView::new("/rows")
            .load(rows(12))
            .text_filter(["title"], Some("   "));
        assert!(!view.has_filters());
        assert_eq!(view.filtered().len(), 12);
    }

    #[test]
    fn filters_keep_input_order_and_combine() {
        let all = rows(20);
        let view = ListView::new("/rows")
            .load(all.clone())
            .text_filter(["title", "place"], Some("GALA"))
            .date_range("at", parse_instant("2025-01-05T00:00:00Z"), None);
        let ids: Vec<i64> = view.filtered().iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![6, 9, 12, 15, 18]);

        let positions: Vec<usize> = ids
            .iter()
            .map(|id| all.iter().position(|r| r.id == *id).unwrap())
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn text_filter_searches_any_listed_field() {
        let view = ListView::new("/rows")
            .load(rows(6))
            .text_filter(["title", "place"], Some("laxen"));
        let ids: Vec<i64> = view.filtered().iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![2, 4, 6]);
    }

    #[test]
    fn date_range_is_inclusive() {
        let view = ListView::new("/rows").load(rows(10)).date_range(
            "at",
            parse_instant("2025-01-03T10:00:00Z"),
            parse_instant("2025-01-05T10:00:00Z"),
        );
        let ids: Vec<i64> = view.filtered().iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![3, 4, 5]);
    }

    #[test]
    fn pages_hold_ten_rows_with_actions() {
        let page = ListView::new("/admin/rows").manageable().load(rows(23)).into_page(3);
        assert_eq!(page.total, 23);
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.items.len(), 3);
        assert_eq!(page.items[0].record.id, 21);
        assert_eq!(page.items[0].actions.view, "/admin/rows/21");
        assert_eq!(page.items[0].actions.edit.as_deref(), Some("/admin/rows/21/edit"));
        assert_eq!(page.items[0].actions.delete.as_deref(), Some("/admin/rows/21"));
    }

    #[test]
    fn read_only_rows_only_link_to_their_detail() {
        let page = ListView::new("/rows/").load(rows(2)).into_page(1);
        let actions = &page.items[0].actions;
        assert_eq!(actions.view, "/rows/1");
        assert_eq!(actions.edit, None);
        assert_eq!(actions.delete, None);
        let json = serde_json::to_value(actions).unwrap();
        assert_eq!(json, serde_json::json!({"view": "/rows/1"}));
    }

    #[test]
    fn out_of_range_page_is_empty_with_totals() {
        let page = ListView::new("/rows").load(rows(12)).into_page(5);
        assert!(page.items.is_empty());
        assert_eq!(page.total, 12);
        assert_eq!(page.total_pages, 2);
        assert_eq!(page.state, ViewState::Ready);

        let first = ListView::new("/rows").load(rows(12)).into_page(0);
        assert_eq!(first.page, 1);
        assert_eq!(first.items.len(), 10);
    }
}
