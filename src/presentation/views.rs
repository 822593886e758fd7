use askama::{Error as AskamaError, Template};
use thiserror::Error;
use url::Url;

use crate::application::listing::{
    Cursor, ListFilter, ListRow, Pager, PagingMode, RenderedList, ViewState, YearCount,
};

#[derive(Debug, Error)]
#[error("{public_message}")]
pub struct TemplateRenderError {
    pub(crate) source: &'static str,
    pub(crate) public_message: &'static str,
    #[source]
    pub(crate) error: AskamaError,
}

impl TemplateRenderError {
    pub fn new(source: &'static str, public_message: &'static str, error: AskamaError) -> Self {
        Self {
            source,
            public_message,
            error,
        }
    }

    pub fn origin(&self) -> &'static str {
        self.source
    }
}

pub fn render_template<T: Template>(template: T) -> Result<String, TemplateRenderError> {
    template.render().map_err(|err| {
        TemplateRenderError::new(
            "presentation::views::render_template",
            "Template rendering failed",
            err,
        )
    })
}

#[derive(Clone, Debug)]
pub struct RowView {
    pub is_heading: bool,
    pub month_key: String,
    pub label: String,
    pub title: String,
    pub has_href: bool,
    pub href: String,
    pub date_text: String,
    pub datetime: String,
}

#[derive(Clone, Debug, Default)]
pub struct PagerView {
    pub paged: bool,
    pub current: usize,
    pub total: usize,
    pub has_prev: bool,
    pub prev_href: String,
    pub has_next: bool,
    pub next_href: String,
    pub shown: usize,
    pub has_more: bool,
    pub more_href: String,
}

#[derive(Clone, Debug)]
pub struct YearButton {
    pub year: i32,
    pub count: usize,
    pub selected: bool,
    pub href: String,
}

#[derive(Clone, Debug)]
pub struct PostListView {
    pub query: String,
    pub matches: usize,
    pub is_empty: bool,
    pub empty_message: String,
    pub rows: Vec<RowView>,
    pub show_pager: bool,
    pub pager: PagerView,
    pub years: Vec<YearButton>,
    pub all_years_selected: bool,
    pub all_years_href: String,
}

impl PostListView {
    /// Build the template context for `rendered`. Pager and year links are
    /// derived from `state` against `base`.
    pub fn build(
        rendered: &RenderedList,
        state: &ViewState,
        mode: &PagingMode,
        base: &Url,
        years: &[YearCount],
    ) -> Self {
        let href_for = |filter: ListFilter, cursor: Cursor| {
            ViewState { filter, cursor }
                .to_url(base, mode)
                .to_string()
        };

        let selected_year = state.filter.year();
        let query = state.filter.query().to_string();
        let year_buttons = years
            .iter()
            .map(|entry| YearButton {
                year: entry.year,
                count: entry.count,
                selected: selected_year == Some(entry.year),
                href: href_for(ListFilter::new(&query, Some(entry.year)), mode.first_cursor()),
            })
            .collect();
        let all_years_href = href_for(ListFilter::new(&query, None), mode.first_cursor());

        let (rows, pager, matches, empty_message) = match rendered {
            RenderedList::Empty { query, year, .. } => {
                (Vec::new(), None, 0, empty_message(query, *year))
            }
            RenderedList::Items {
                rows,
                pager,
                matches,
            } => (
                rows.iter().map(row_view).collect(),
                Some(pager_view(*pager, state, mode, &href_for)),
                *matches,
                String::new(),
            ),
        };

        Self {
            query,
            matches,
            is_empty: rendered.is_empty(),
            empty_message,
            rows,
            show_pager: pager.is_some(),
            pager: pager.unwrap_or_default(),
            years: year_buttons,
            all_years_selected: selected_year.is_none(),
            all_years_href,
        }
    }
}

fn row_view(row: &ListRow) -> RowView {
    match row {
        ListRow::Heading { month_key, label } => RowView {
            is_heading: true,
            month_key: month_key.clone(),
            label: label.clone(),
            title: String::new(),
            has_href: false,
            href: String::new(),
            date_text: String::new(),
            datetime: String::new(),
        },
        ListRow::Post(post) => RowView {
            is_heading: false,
            month_key: post.month_key.clone(),
            label: String::new(),
            title: post.title.clone(),
            has_href: post.href.is_some(),
            href: post.href.clone().unwrap_or_default(),
            date_text: post.date_text.clone(),
            datetime: post.datetime.clone(),
        },
    }
}

fn pager_view(
    pager: Pager,
    state: &ViewState,
    mode: &PagingMode,
    href_for: &impl Fn(ListFilter, Cursor) -> String,
) -> PagerView {
    match pager {
        Pager::Pages {
            current,
            total,
            has_prev,
            has_next,
        } => PagerView {
            paged: true,
            current,
            total,
            has_prev,
            prev_href: if has_prev {
                href_for(state.filter.clone(), Cursor::Page(current - 1))
            } else {
                String::new()
            },
            has_next,
            next_href: if has_next {
                href_for(state.filter.clone(), Cursor::Page(current + 1))
            } else {
                String::new()
            },
            ..PagerView::default()
        },
        Pager::LoadMore {
            shown,
            total,
            has_more,
        } => PagerView {
            paged: false,
            total,
            shown,
            has_more,
            more_href: if has_more {
                let step = match mode {
                    PagingMode::Incremental { step, .. } => step.get(),
                    PagingMode::Paged { page_size } => page_size.get(),
                };
                href_for(state.filter.clone(), Cursor::Shown(shown.saturating_add(step)))
            } else {
                String::new()
            },
            ..PagerView::default()
        },
    }
}

fn empty_message(query: &str, year: Option<i32>) -> String {
    match (query.is_empty(), year) {
        (true, None) => "No posts yet.".to_string(),
        (false, None) => format!("No posts match \u{201c}{query}\u{201d}."),
        (true, Some(year)) => format!("No posts from {year}."),
        (false, Some(year)) => format!("No posts from {year} match \u{201c}{query}\u{201d}."),
    }
}

#[derive(Template)]
#[template(path = "post_list.html")]
pub struct PostListTemplate {
    pub view: PostListView,
}

pub fn render_post_list(view: PostListView) -> Result<String, TemplateRenderError> {
    render_template(PostListTemplate { view })
}

#[cfg(test)]
mod tests {
    use std::num::NonZeroUsize;

    use time::macros::datetime;

    use super::*;
    use crate::application::listing::render;
    use crate::domain::posts::PostRecord;

    fn records() -> Vec<PostRecord> {
        let now = datetime!(2026-01-15 12:00 UTC);
        vec![
            PostRecord::new(
                0,
                "Tea & <Biscuits>",
                Some("/tea/".into()),
                "",
                Some("2024-03-20"),
                now,
            ),
            PostRecord::new(
                1,
                "Spring",
                Some("/spring/".into()),
                "",
                Some("2024-03-02"),
                now,
            ),
            PostRecord::new(2, "Winter", None, "", Some("2024-02-11"), now),
        ]
    }

    fn paged(size: usize) -> PagingMode {
        PagingMode::Paged {
            page_size: NonZeroUsize::new(size).expect("non-zero"),
        }
    }

    fn base() -> Url {
        Url::parse("https://blog.example/blog/").expect("url")
    }

    #[test]
    fn renders_headings_posts_and_pager() {
        let mode = paged(2);
        let state = ViewState::initial(&mode);
        let records = records();
        let rendered = render(&records, &state, &mode);
        let years = crate::application::listing::year_counts(&records);

        let view = PostListView::build(&rendered, &state, &mode, &base(), &years);
        let html = render_post_list(view).expect("html");

        assert!(html.contains("March 2024"));
        assert!(html.contains("Tea &amp; &lt;Biscuits&gt;"));
        assert!(html.contains(r#"href="/spring/""#));
        assert!(html.contains("Page 1 of 2"));
        assert!(html.contains(r#"href="https://blog.example/blog/?page=2""#));
        assert!(html.contains(r#"aria-disabled="true""#));
        assert!(html.contains(r#"href="https://blog.example/blog/?year=2024""#));
    }

    #[test]
    fn empty_state_replaces_the_list() {
        let mode = paged(10);
        let state = ViewState {
            filter: ListFilter::new("nothing", Some(2024)),
            cursor: Cursor::Page(1),
        };
        let records = records();
        let rendered = render(&records, &state, &mode);

        let view = PostListView::build(&rendered, &state, &mode, &base(), &[]);
        assert!(view.is_empty);
        assert!(!view.show_pager);

        let html = render_post_list(view).expect("html");
        assert!(html.contains("No posts from 2024 match"));
        assert!(!html.contains("<ul class=\"blog-posts\">"));
    }

    #[test]
    fn load_more_link_advances_shown_count() {
        let mode = PagingMode::Incremental {
            initial: NonZeroUsize::new(1).expect("non-zero"),
            step: NonZeroUsize::new(1).expect("non-zero"),
        };
        let state = ViewState::initial(&mode);
        let rendered = render(&records(), &state, &mode);

        let view = PostListView::build(&rendered, &state, &mode, &base(), &[]);

        assert!(!view.pager.paged);
        assert!(view.pager.has_more);
        assert_eq!(view.pager.more_href, "https://blog.example/blog/?shown=2");
    }
}
