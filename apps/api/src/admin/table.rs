//! Admin table model: search, single-field sort, and pagination over the
//! full loaded record set. Nothing here touches the record store.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::models::student::StudentRecord;

pub const PAGE_SIZE_OPTIONS: [usize; 4] = [5, 10, 25, 50];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    Name,
    Email,
    Branch,
    Cgpa,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

/// Relative page move, applied after an explicit `page`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageStep {
    Next,
    Prev,
}

impl SortDirection {
    pub fn toggled(self) -> Self {
        match self {
            SortDirection::Asc => SortDirection::Desc,
            SortDirection::Desc => SortDirection::Asc,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortKey {
    pub field: SortField,
    pub direction: SortDirection,
}

fn compare(field: SortField, a: &StudentRecord, b: &StudentRecord) -> Ordering {
    match field {
        SortField::Name => a.name.cmp(&b.name),
        SortField::Email => a.email.cmp(&b.email),
        SortField::Branch => a.branch.label().cmp(b.branch.label()),
        SortField::Cgpa => a.cgpa.total_cmp(&b.cgpa),
    }
}

/// Case-insensitive substring match on name, email, and branch.
pub fn matches_search(record: &StudentRecord, needle_lower: &str) -> bool {
    needle_lower.is_empty()
        || record.name.to_lowercase().contains(needle_lower)
        || record.email.to_lowercase().contains(needle_lower)
        || record.branch.label().to_lowercase().contains(needle_lower)
}

pub fn page_count(rows: usize, page_size: usize) -> usize {
    rows.div_ceil(page_size.max(1))
}

/// Query string of the dashboard route. Applied in field order below.
///
/// Every request starts from a fresh `Dashboard`, so a client that changes
/// the page size sends the size it was showing as `prev_page_size`; when the
/// two differ, `page` and `step` are ignored and the view opens on page 1.
/// A changed `search` should likewise be sent without `page`.
#[derive(Debug, Default, Deserialize)]
pub struct DashboardQuery {
    pub page_size: Option<usize>,
    pub prev_page_size: Option<usize>,
    pub search: Option<String>,
    pub sort: Option<SortField>,
    pub dir: Option<SortDirection>,
    pub toggle: Option<SortField>,
    pub page: Option<usize>,
    pub step: Option<PageStep>,
}

impl DashboardQuery {
    fn page_size_changed(&self) -> bool {
        matches!(
            (self.page_size, self.prev_page_size),
            (Some(size), Some(prev)) if size != prev
        )
    }
}

#[derive(Debug, Serialize)]
pub struct DashboardView {
    pub rows: Vec<StudentRecord>,
    pub total_loaded: usize,
    pub total_filtered: usize,
    pub page: usize,
    pub page_size: usize,
    pub page_count: usize,
    pub has_prev: bool,
    pub has_next: bool,
    pub search: String,
    pub sort: Option<SortKey>,
    pub page_size_options: &'static [usize],
}

/// The dashboard's in-memory state.
#[derive(Debug, Clone)]
pub struct Dashboard {
    records: Vec<StudentRecord>,
    search: String,
    sort: Option<SortKey>,
    page: usize,
    page_size: usize,
}

impl Dashboard {
    pub fn new(page_size: usize) -> Self {
        Self {
            records: Vec::new(),
            search: String::new(),
            sort: None,
            page: 1,
            page_size: if PAGE_SIZE_OPTIONS.contains(&page_size) {
                page_size
            } else {
                PAGE_SIZE_OPTIONS[1]
            },
        }
    }

    /// Replaces the loaded list wholesale.
    pub fn load(&mut self, records: Vec<StudentRecord>) {
        self.records = records;
        self.page = self.page.clamp(1, self.last_page());
    }

    pub fn set_search(&mut self, search: &str) {
        self.search = search.trim().to_string();
        self.page = 1;
    }

    pub fn set_sort(&mut self, field: SortField, direction: SortDirection) {
        self.sort = Some(SortKey { field, direction });
    }

    /// Same field flips the direction; a new field starts ascending.
    pub fn toggle_sort(&mut self, field: SortField) {
        self.sort = Some(match self.sort {
            Some(key) if key.field == field => SortKey {
                field,
                direction: key.direction.toggled(),
            },
            _ => SortKey {
                field,
                direction: SortDirection::Asc,
            },
        });
    }

    pub fn set_page_size(&mut self, page_size: usize) -> Result<(), AppError> {
        if !PAGE_SIZE_OPTIONS.contains(&page_size) {
            return Err(AppError::Validation(format!(
                "Page size must be one of {PAGE_SIZE_OPTIONS:?}"
            )));
        }
        self.page_size = page_size;
        self.page = 1;
        Ok(())
    }

    pub fn set_page(&mut self, page: usize) {
        self.page = page.clamp(1, self.last_page());
    }

    pub fn next_page(&mut self) {
        self.set_page(self.page + 1);
    }

    pub fn prev_page(&mut self) {
        self.set_page(self.page.saturating_sub(1));
    }

    /// Loaded records matching the search, in display order.
    pub fn filtered(&self) -> Vec<&StudentRecord> {
        let needle = self.search.to_lowercase();
        let mut rows: Vec<&StudentRecord> = self
            .records
            .iter()
            .filter(|r| matches_search(r, &needle))
            .collect();
        if let Some(SortKey { field, direction }) = self.sort {
            // Stable sort: ties keep load order in both directions.
            rows.sort_by(|a, b| match direction {
                SortDirection::Asc => compare(field, a, b),
                SortDirection::Desc => compare(field, b, a),
            });
        }
        rows
    }

    pub fn page_count(&self) -> usize {
        page_count(self.filtered().len(), self.page_size)
    }

    fn last_page(&self) -> usize {
        self.page_count().max(1)
    }

    pub fn apply(&mut self, query: DashboardQuery) -> Result<(), AppError> {
        let keep_first_page = query.page_size_changed();
        if let Some(size) = query.page_size {
            self.set_page_size(size)?;
        }
        if let Some(search) = query.search.as_deref() {
            self.set_search(search);
        }
        if let Some(field) = query.sort {
            self.set_sort(field, query.dir.unwrap_or_default());
        }
        if let Some(field) = query.toggle {
            self.toggle_sort(field);
        }
        if keep_first_page {
            return Ok(());
        }
        if let Some(page) = query.page {
            self.set_page(page);
        }
        match query.step {
            Some(PageStep::Next) => self.next_page(),
            Some(PageStep::Prev) => self.prev_page(),
            None => {}
        }
        Ok(())
    }

    pub fn view(&self) -> DashboardView {
        let filtered = self.filtered();
        let total_filtered = filtered.len();
        let page_count = page_count(total_filtered, self.page_size);
        let page = self.page.clamp(1, page_count.max(1));
        let rows = filtered
            .into_iter()
            .skip((page - 1) * self.page_size)
            .take(self.page_size)
            .cloned()
            .collect();

        DashboardView {
            rows,
            total_loaded: self.records.len(),
            total_filtered,
            page,
            page_size: self.page_size,
            page_count,
            has_prev: page > 1,
            has_next: page < page_count,
            search: self.search.clone(),
            sort: self.sort,
            page_size_options: &PAGE_SIZE_OPTIONS,
        }
    }
}
