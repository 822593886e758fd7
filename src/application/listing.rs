//! Client-side view over a statically rendered post list.
//!
//! Filtering, windowing and month grouping are pure functions over the
//! parsed records; [`ListView`] owns the mutable view state and feeds every
//! change through one synchronous pass: filter, clamp, render, record history.

use std::{collections::BTreeMap, num::NonZeroUsize, ops::Range};

use time::format_description::well_known::Rfc3339;
use tracing::debug;
use url::Url;

use super::history::{HistoryMode, NavigationHistory, record};
use super::scroll::{ScrollGate, ScrollLoader, ScrollMetrics};
use crate::domain::posts::PostRecord;

pub const SEARCH_PARAM: &str = "search";
pub const YEAR_PARAM: &str = "year";
pub const PAGE_PARAM: &str = "page";
pub const SHOWN_PARAM: &str = "shown";

const OWNED_PARAMS: [&str; 4] = [SEARCH_PARAM, YEAR_PARAM, PAGE_PARAM, SHOWN_PARAM];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PagingMode {
    /// Fixed pages with prev/next.
    Paged { page_size: NonZeroUsize },
    /// A growing prefix revealed by "load more" or scrolling.
    Incremental {
        initial: NonZeroUsize,
        step: NonZeroUsize,
    },
}

/// Position within the filtered set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cursor {
    /// 1-based page number.
    Page(usize),
    /// Number of leading matches on display.
    Shown(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pager {
    Pages {
        current: usize,
        total: usize,
        has_prev: bool,
        has_next: bool,
    },
    LoadMore {
        shown: usize,
        total: usize,
        has_more: bool,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Window {
    pub range: Range<usize>,
    pub pager: Pager,
}

impl PagingMode {
    pub fn first_cursor(&self) -> Cursor {
        match self {
            PagingMode::Paged { .. } => Cursor::Page(1),
            PagingMode::Incremental { initial, .. } => Cursor::Shown(initial.get()),
        }
    }

    /// Pull `cursor` back inside the filtered set.
    ///
    /// Pages land in `[1, max(1, page_count)]`; shown counts land in
    /// `[min(initial, filtered), filtered]`. A cursor of the wrong kind for
    /// this mode is replaced by the first cursor.
    pub fn clamp(&self, cursor: Cursor, filtered: usize) -> Cursor {
        match (*self, cursor) {
            (PagingMode::Paged { page_size }, Cursor::Page(page)) => {
                Cursor::Page(page.clamp(1, page_count(filtered, page_size).max(1)))
            }
            (PagingMode::Incremental { initial, .. }, Cursor::Shown(shown)) => {
                Cursor::Shown(shown.max(initial.get()).min(filtered))
            }
            _ => self.clamp(self.first_cursor(), filtered),
        }
    }

    pub fn window(&self, cursor: Cursor, filtered: usize) -> Window {
        match (*self, self.clamp(cursor, filtered)) {
            (PagingMode::Paged { page_size }, Cursor::Page(page)) => {
                let total = page_count(filtered, page_size);
                let start = ((page - 1) * page_size.get()).min(filtered);
                let end = (start + page_size.get()).min(filtered);
                Window {
                    range: start..end,
                    pager: Pager::Pages {
                        current: page,
                        total,
                        has_prev: page > 1,
                        has_next: page < total,
                    },
                }
            }
            (_, Cursor::Shown(shown)) | (_, Cursor::Page(shown)) => Window {
                range: 0..shown,
                pager: Pager::LoadMore {
                    shown,
                    total: filtered,
                    has_more: shown < filtered,
                },
            },
        }
    }
}

fn page_count(filtered: usize, page_size: NonZeroUsize) -> usize {
    filtered.div_ceil(page_size.get())
}

/// Year and free-text filter. Matching is a case-insensitive, unanchored
/// substring test against the record's search text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListFilter {
    query: String,
    needle: String,
    year: Option<i32>,
}

impl ListFilter {
    pub fn new(query: &str, year: Option<i32>) -> Self {
        let query = query.trim().to_string();
        let needle = query.to_lowercase();
        Self {
            query,
            needle,
            year,
        }
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn year(&self) -> Option<i32> {
        self.year
    }

    pub fn is_active(&self) -> bool {
        !self.query.is_empty() || self.year.is_some()
    }

    pub fn matches(&self, record: &PostRecord) -> bool {
        self.year.is_none_or(|year| record.year == year)
            && (self.needle.is_empty() || record.search_text().contains(&self.needle))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewState {
    pub filter: ListFilter,
    pub cursor: Cursor,
}

impl ViewState {
    pub fn initial(mode: &PagingMode) -> Self {
        Self {
            filter: ListFilter::default(),
            cursor: mode.first_cursor(),
        }
    }

    /// Read `search`, `year` and the cursor parameter for `mode` from `url`.
    /// Unparseable values are ignored.
    pub fn from_url(url: &Url, mode: &PagingMode) -> Self {
        let mut query = String::new();
        let mut year = None;
        let mut cursor = mode.first_cursor();

        for (key, value) in url.query_pairs() {
            match (key.as_ref(), mode) {
                (SEARCH_PARAM, _) => query = value.into_owned(),
                (YEAR_PARAM, _) => year = value.trim().parse().ok(),
                (PAGE_PARAM, PagingMode::Paged { .. }) => {
                    if let Ok(page) = value.trim().parse() {
                        cursor = Cursor::Page(page);
                    }
                }
                (SHOWN_PARAM, PagingMode::Incremental { .. }) => {
                    if let Ok(shown) = value.trim().parse() {
                        cursor = Cursor::Shown(shown);
                    }
                }
                _ => {}
            }
        }

        Self {
            filter: ListFilter::new(&query, year),
            cursor,
        }
    }

    /// Write this state into `base`'s query string, keeping unrelated
    /// parameters and omitting defaults.
    pub fn to_url(&self, base: &Url, mode: &PagingMode) -> Url {
        let preserved: Vec<(String, String)> = base
            .query_pairs()
            .filter(|(key, _)| !OWNED_PARAMS.contains(&key.as_ref()))
            .map(|(key, value)| (key.into_owned(), value.into_owned()))
            .collect();

        let mut url = base.clone();
        url.set_query(None);
        {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in &preserved {
                pairs.append_pair(key, value);
            }
            if !self.filter.query().is_empty() {
                pairs.append_pair(SEARCH_PARAM, self.filter.query());
            }
            if let Some(year) = self.filter.year() {
                pairs.append_pair(YEAR_PARAM, &year.to_string());
            }
            match self.cursor {
                Cursor::Page(page) if page > 1 => {
                    pairs.append_pair(PAGE_PARAM, &page.to_string());
                }
                Cursor::Shown(shown) if Cursor::Shown(shown) != mode.first_cursor() => {
                    pairs.append_pair(SHOWN_PARAM, &shown.to_string());
                }
                _ => {}
            }
        }
        if url.query().is_some_and(str::is_empty) {
            url.set_query(None);
        }
        url
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostView {
    pub id: usize,
    pub title: String,
    pub href: Option<String>,
    pub date_text: String,
    pub datetime: String,
    pub month_key: String,
}

impl From<&PostRecord> for PostView {
    fn from(record: &PostRecord) -> Self {
        Self {
            id: record.id,
            title: record.title.clone(),
            href: record.href.clone(),
            date_text: record.date_text.clone(),
            datetime: record.published_at.format(&Rfc3339).unwrap_or_default(),
            month_key: record.month_key.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListRow {
    Heading { month_key: String, label: String },
    Post(PostView),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderedList {
    /// Nothing matched; shown instead of an empty container.
    Empty {
        query: String,
        year: Option<i32>,
        source_count: usize,
    },
    Items {
        rows: Vec<ListRow>,
        pager: Pager,
        matches: usize,
    },
}

impl RenderedList {
    pub fn is_empty(&self) -> bool {
        matches!(self, RenderedList::Empty { .. })
    }

    pub fn posts(&self) -> Vec<&PostView> {
        match self {
            RenderedList::Empty { .. } => Vec::new(),
            RenderedList::Items { rows, .. } => rows
                .iter()
                .filter_map(|row| match row {
                    ListRow::Post(post) => Some(post),
                    ListRow::Heading { .. } => None,
                })
                .collect(),
        }
    }

    pub fn headings(&self) -> Vec<&str> {
        match self {
            RenderedList::Empty { .. } => Vec::new(),
            RenderedList::Items { rows, .. } => rows
                .iter()
                .filter_map(|row| match row {
                    ListRow::Heading { month_key, .. } => Some(month_key.as_str()),
                    ListRow::Post(_) => None,
                })
                .collect(),
        }
    }

    pub fn pager(&self) -> Option<Pager> {
        match self {
            RenderedList::Empty { .. } => None,
            RenderedList::Items { pager, .. } => Some(*pager),
        }
    }
}

/// Insert a heading whenever the month changes from the previous record.
///
/// Input order is trusted: records are expected newest first, as the host
/// renders them. Unsorted input yields repeated headings rather than a
/// reordered list.
pub fn group_by_month(records: &[&PostRecord]) -> Vec<ListRow> {
    let mut rows = Vec::with_capacity(records.len() + records.len() / 4 + 1);
    let mut previous: Option<&str> = None;

    for record in records {
        if previous != Some(record.month_key.as_str()) {
            rows.push(ListRow::Heading {
                month_key: record.month_key.clone(),
                label: record.month_label.clone(),
            });
            previous = Some(record.month_key.as_str());
        }
        rows.push(ListRow::Post(PostView::from(*record)));
    }

    rows
}

/// Render `state` over `records` without touching either.
pub fn render(records: &[PostRecord], state: &ViewState, mode: &PagingMode) -> RenderedList {
    let matched: Vec<&PostRecord> = records
        .iter()
        .filter(|record| state.filter.matches(record))
        .collect();
    render_matched(&matched, state, mode, records.len())
}

fn render_matched(
    matched: &[&PostRecord],
    state: &ViewState,
    mode: &PagingMode,
    source_count: usize,
) -> RenderedList {
    if matched.is_empty() {
        return RenderedList::Empty {
            query: state.filter.query().to_string(),
            year: state.filter.year(),
            source_count,
        };
    }

    let window = mode.window(state.cursor, matched.len());
    RenderedList::Items {
        rows: group_by_month(&matched[window.range]),
        pager: window.pager,
        matches: matched.len(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct YearCount {
    pub year: i32,
    pub count: usize,
}

/// Distinct years, newest first, with their post counts.
pub fn year_counts(records: &[PostRecord]) -> Vec<YearCount> {
    let mut map: BTreeMap<i32, usize> = BTreeMap::new();
    for record in records {
        *map.entry(record.year).or_default() += 1;
    }
    map.into_iter()
        .rev()
        .map(|(year, count)| YearCount { year, count })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Filtering,
    Paging,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListCommand {
    Search(String),
    SelectYear(Option<i32>),
    /// Programmatic reset of the text query (closing the search box).
    ClearSearch,
    GoToPage(usize),
    NextPage,
    PrevPage,
    LoadMore,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScrollOutcome {
    Extended(RenderedList),
    /// A previous extension has not been acknowledged yet.
    Busy,
    Distant,
    Exhausted,
    NotIncremental,
}

/// One filter/paginate/render instance bound to a history.
pub struct ListView<H> {
    records: Vec<PostRecord>,
    mode: PagingMode,
    state: ViewState,
    matched: Vec<usize>,
    phase: Phase,
    history: H,
    scroll: ScrollLoader,
}

impl<H: NavigationHistory> ListView<H> {
    /// Build a view whose initial state comes from the history's current URL.
    pub fn new(records: Vec<PostRecord>, mode: PagingMode, history: H, threshold_px: f64) -> Self {
        let state = ViewState::from_url(history.current(), &mode);
        let mut view = Self {
            records,
            mode,
            state,
            matched: Vec::new(),
            phase: Phase::Idle,
            history,
            scroll: ScrollLoader::new(threshold_px),
        };
        view.refilter();
        view.state.cursor = view.mode.clamp(view.state.cursor, view.matched.len());
        view
    }

    pub fn state(&self) -> &ViewState {
        &self.state
    }

    pub fn mode(&self) -> PagingMode {
        self.mode
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn records(&self) -> &[PostRecord] {
        &self.records
    }

    pub fn matched_count(&self) -> usize {
        self.matched.len()
    }

    pub fn history(&self) -> &H {
        &self.history
    }

    pub fn history_mut(&mut self) -> &mut H {
        &mut self.history
    }

    pub fn year_counts(&self) -> Vec<YearCount> {
        year_counts(&self.records)
    }

    pub fn render(&self) -> RenderedList {
        let matched: Vec<&PostRecord> = self
            .matched
            .iter()
            .map(|&index| &self.records[index])
            .collect();
        render_matched(&matched, &self.state, &self.mode, self.records.len())
    }

    pub fn apply(&mut self, command: ListCommand) -> RenderedList {
        let history_mode = match command {
            ListCommand::Search(query) => {
                let year = self.state.filter.year();
                self.set_filter(ListFilter::new(&query, year));
                HistoryMode::Push
            }
            ListCommand::SelectYear(year) => {
                let query = self.state.filter.query().to_string();
                self.set_filter(ListFilter::new(&query, year));
                HistoryMode::Push
            }
            ListCommand::ClearSearch => {
                let year = self.state.filter.year();
                self.set_filter(ListFilter::new("", year));
                HistoryMode::Replace
            }
            ListCommand::GoToPage(page) => {
                self.move_to(|mode, cursor| match (mode, cursor) {
                    (PagingMode::Paged { .. }, Cursor::Page(_)) => Some(Cursor::Page(page)),
                    _ => None,
                });
                HistoryMode::Push
            }
            ListCommand::NextPage => {
                self.move_to(|mode, cursor| match (mode, cursor) {
                    (PagingMode::Paged { .. }, Cursor::Page(page)) => {
                        Some(Cursor::Page(page.saturating_add(1)))
                    }
                    _ => None,
                });
                HistoryMode::Push
            }
            ListCommand::PrevPage => {
                self.move_to(|mode, cursor| match (mode, cursor) {
                    (PagingMode::Paged { .. }, Cursor::Page(page)) => {
                        Some(Cursor::Page(page.saturating_sub(1)))
                    }
                    _ => None,
                });
                HistoryMode::Push
            }
            ListCommand::LoadMore => {
                self.move_to(|mode, cursor| match (mode, cursor) {
                    (PagingMode::Incremental { step, .. }, Cursor::Shown(shown)) => {
                        Some(Cursor::Shown(shown.saturating_add(step.get())))
                    }
                    _ => None,
                });
                HistoryMode::Push
            }
        };

        self.commit(history_mode)
    }

    /// Re-derive the view from a URL reached through back/forward.
    pub fn restore(&mut self, url: &Url) -> RenderedList {
        let target = ViewState::from_url(url, &self.mode);
        self.phase = Phase::Filtering;
        if target.filter != self.state.filter {
            self.state.filter = target.filter;
            self.refilter();
        }
        self.state.cursor = self.mode.clamp(target.cursor, self.matched.len());
        self.commit(HistoryMode::Skip)
    }

    /// React to a scroll or resize event in incremental mode.
    ///
    /// After [`ScrollOutcome::Extended`] the view stays busy until
    /// [`ListView::extension_rendered`] is called.
    pub fn on_scroll(&mut self, metrics: ScrollMetrics) -> ScrollOutcome {
        if !matches!(self.mode, PagingMode::Incremental { .. }) {
            return ScrollOutcome::NotIncremental;
        }
        if self.scroll.is_loading() {
            return ScrollOutcome::Busy;
        }
        if !self.has_more() {
            return ScrollOutcome::Exhausted;
        }

        match self.scroll.check(metrics) {
            ScrollGate::Extend => ScrollOutcome::Extended(self.apply(ListCommand::LoadMore)),
            ScrollGate::Busy => ScrollOutcome::Busy,
            ScrollGate::Distant => ScrollOutcome::Distant,
        }
    }

    pub fn extension_rendered(&mut self) {
        self.scroll.finish();
    }

    fn has_more(&self) -> bool {
        match self.state.cursor {
            Cursor::Shown(shown) => shown < self.matched.len(),
            Cursor::Page(page) => match self.mode {
                PagingMode::Paged { page_size } => page < page_count(self.matched.len(), page_size),
                PagingMode::Incremental { .. } => false,
            },
        }
    }

    fn set_filter(&mut self, filter: ListFilter) {
        self.phase = Phase::Filtering;
        if filter != self.state.filter {
            self.state.filter = filter;
            self.refilter();
            self.state.cursor = self.mode.first_cursor();
        }
        self.state.cursor = self.mode.clamp(self.state.cursor, self.matched.len());
    }

    fn move_to(&mut self, target: impl FnOnce(PagingMode, Cursor) -> Option<Cursor>) {
        self.phase = Phase::Paging;
        if let Some(cursor) = target(self.mode, self.state.cursor) {
            self.state.cursor = self.mode.clamp(cursor, self.matched.len());
        }
    }

    fn refilter(&mut self) {
        let filter = &self.state.filter;
        self.matched = self
            .records
            .iter()
            .enumerate()
            .filter(|(_, record)| filter.matches(record))
            .map(|(index, _)| index)
            .collect();
    }

    fn commit(&mut self, history_mode: HistoryMode) -> RenderedList {
        let rendered = self.render();
        let url = self.state.to_url(self.history.current(), &self.mode);

        debug!(
            target = "marginalia::listing",
            phase = ?self.phase,
            query = self.state.filter.query(),
            year = ?self.state.filter.year(),
            cursor = ?self.state.cursor,
            matches = self.matched.len(),
            history = ?history_mode,
            "list rendered"
        );

        record(&mut self.history, url, history_mode);
        self.phase = Phase::Idle;
        rendered
    }
}
