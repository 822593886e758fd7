//! Read post entries out of a server-rendered blog list.

use std::{cell::RefCell, rc::Rc};

use lol_html::{RewriteStrSettings, Selector, element, rewrite_str, text};
use thiserror::Error;
use time::OffsetDateTime;

use crate::domain::posts::PostRecord;

pub const DEFAULT_LIST_SELECTOR: &str = "ul.blog-posts";

#[derive(Debug, Error)]
pub enum ListParseError {
    #[error("invalid selector `{selector}`: {message}")]
    Selector { selector: String, message: String },
    #[error("failed to read post list: {message}")]
    Document { message: String },
}

/// Selectors locating the list and its entries.
///
/// Entries are the direct `li` children of the container; the first link in
/// an entry is its title and the first `time` element its date.
#[derive(Debug, Clone)]
pub struct ListSelectors {
    container: String,
    item: String,
    link: String,
    time: String,
}

impl ListSelectors {
    pub fn new(container: &str) -> Result<Self, ListParseError> {
        let container = container.trim().to_string();
        let selectors = Self {
            item: format!("{container} > li"),
            link: format!("{container} > li a"),
            time: format!("{container} > li time"),
            container,
        };
        for selector in [
            &selectors.container,
            &selectors.item,
            &selectors.link,
            &selectors.time,
        ] {
            validate(selector)?;
        }
        Ok(selectors)
    }

    pub fn container(&self) -> &str {
        &self.container
    }
}

impl Default for ListSelectors {
    fn default() -> Self {
        Self {
            container: DEFAULT_LIST_SELECTOR.to_string(),
            item: format!("{DEFAULT_LIST_SELECTOR} > li"),
            link: format!("{DEFAULT_LIST_SELECTOR} > li a"),
            time: format!("{DEFAULT_LIST_SELECTOR} > li time"),
        }
    }
}

fn validate(selector: &str) -> Result<(), ListParseError> {
    selector
        .parse::<Selector>()
        .map(|_| ())
        .map_err(|err| ListParseError::Selector {
            selector: selector.to_string(),
            message: err.to_string(),
        })
}

#[derive(Default)]
struct RawEntry {
    title: String,
    href: Option<String>,
    links: u32,
    date_text: String,
    datetime: Option<String>,
    times: u32,
}

#[derive(Default)]
struct ScanState {
    found_container: bool,
    entries: Vec<RawEntry>,
}

/// Parse every entry under the list container.
///
/// Returns `Ok(None)` when the page has no such list, which callers treat as
/// "nothing to enhance". Dates that cannot be parsed fall back to `now`.
pub fn parse_post_list(
    html: &str,
    selectors: &ListSelectors,
    now: OffsetDateTime,
) -> Result<Option<Vec<PostRecord>>, ListParseError> {
    let state = Rc::new(RefCell::new(ScanState::default()));

    rewrite_str(
        html,
        RewriteStrSettings {
            element_content_handlers: vec![
                element!(selectors.container.as_str(), {
                    let state = Rc::clone(&state);
                    move |_el| {
                        state.borrow_mut().found_container = true;
                        Ok(())
                    }
                }),
                element!(selectors.item.as_str(), {
                    let state = Rc::clone(&state);
                    move |_el| {
                        state.borrow_mut().entries.push(RawEntry::default());
                        Ok(())
                    }
                }),
                element!(selectors.link.as_str(), {
                    let state = Rc::clone(&state);
                    move |el| {
                        if let Some(entry) = state.borrow_mut().entries.last_mut() {
                            entry.links = entry.links.saturating_add(1);
                            if entry.links == 1 {
                                entry.href = el.get_attribute("href");
                            }
                        }
                        Ok(())
                    }
                }),
                text!(selectors.link.as_str(), {
                    let state = Rc::clone(&state);
                    move |t| {
                        if let Some(entry) = state.borrow_mut().entries.last_mut()
                            && entry.links == 1
                        {
                            entry.title.push_str(t.as_str());
                        }
                        Ok(())
                    }
                }),
                element!(selectors.time.as_str(), {
                    let state = Rc::clone(&state);
                    move |el| {
                        if let Some(entry) = state.borrow_mut().entries.last_mut() {
                            entry.times = entry.times.saturating_add(1);
                            if entry.times == 1 {
                                entry.datetime = el.get_attribute("datetime");
                            }
                        }
                        Ok(())
                    }
                }),
                text!(selectors.time.as_str(), {
                    let state = Rc::clone(&state);
                    move |t| {
                        if let Some(entry) = state.borrow_mut().entries.last_mut()
                            && entry.times == 1
                        {
                            entry.date_text.push_str(t.as_str());
                        }
                        Ok(())
                    }
                }),
            ],
            ..RewriteStrSettings::default()
        },
    )
    .map_err(|err| ListParseError::Document {
        message: err.to_string(),
    })?;

    let state = Rc::try_unwrap(state)
        .map(|cell| cell.into_inner())
        .unwrap_or_else(|rc| std::mem::take(&mut *rc.borrow_mut()));

    if !state.found_container {
        return Ok(None);
    }

    let records = state
        .entries
        .into_iter()
        .enumerate()
        .map(|(index, entry)| {
            PostRecord::new(
                index,
                collapse_whitespace(&entry.title),
                entry.href.filter(|href| !href.trim().is_empty()),
                collapse_whitespace(&entry.date_text),
                entry.datetime.as_deref(),
                now,
            )
        })
        .collect();

    Ok(Some(records))
}

fn collapse_whitespace(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}
