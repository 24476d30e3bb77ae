//! Static-HTML page used by tests.
//!
//! A fixture holds named documents. Clicking an element carrying
//! `data-goto="<name>"` switches the current document, and Escape follows
//! `data-escape` on `<body>`, which lets tests model "see more" toggles,
//! "show all" expansions and modals without a browser.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use ego_tree::iter::Edge;
use ego_tree::NodeId;
use scraper::{ElementRef, Html, Node, Selector};

use super::{Page, Region};

struct State {
    docs: HashMap<String, Rc<Html>>,
    current: RefCell<Rc<Html>>,
    url: RefCell<String>,
    events: RefCell<Vec<String>>,
    heights: RefCell<Vec<u64>>,
}

pub struct FixturePage {
    state: Rc<State>,
}

pub struct FixtureRegion {
    state: Rc<State>,
    doc: Rc<Html>,
    node: NodeId,
}

impl FixturePage {
    pub fn new(html: &str) -> Self {
        Self::with_states(html, &[])
    }

    /// `states` are extra documents reachable through `data-goto`.
    pub fn with_states(main: &str, states: &[(&str, &str)]) -> Self {
        let main_doc = Rc::new(Html::parse_document(main));
        let mut docs = HashMap::new();
        docs.insert("main".to_string(), Rc::clone(&main_doc));
        for (name, html) in states {
            docs.insert(name.to_string(), Rc::new(Html::parse_document(html)));
        }
        FixturePage {
            state: Rc::new(State {
                docs,
                current: RefCell::new(main_doc),
                url: RefCell::new("about:blank".to_string()),
                events: RefCell::new(Vec::new()),
                heights: RefCell::new(Vec::new()),
            }),
        }
    }

    pub fn from_file(name: &str) -> Self {
        let html = std::fs::read_to_string(format!("tests/fixtures/{}.html", name)).unwrap();
        Self::new(&html)
    }

    /// Heights reported by successive `scroll_to_bottom` calls; the last
    /// one repeats once the list runs out.
    pub fn set_scroll_heights(&self, heights: &[u64]) {
        *self.state.heights.borrow_mut() = heights.to_vec();
    }

    pub fn events(&self) -> Vec<String> {
        self.state.events.borrow().clone()
    }

    pub fn current_state(&self) -> String {
        let current = self.state.current.borrow();
        self.state
            .docs
            .iter()
            .find(|(_, d)| Rc::ptr_eq(d, &current))
            .map(|(k, _)| k.clone())
            .unwrap_or_default()
    }

    pub fn show(&self, name: &str) {
        self.state.goto(name);
    }
}

impl State {
    fn goto(&self, name: &str) {
        if let Some(doc) = self.docs.get(name) {
            *self.current.borrow_mut() = Rc::clone(doc);
        }
    }

    fn record(&self, event: String) {
        self.events.borrow_mut().push(event);
    }
}

impl FixtureRegion {
    fn element(&self) -> Result<ElementRef<'_>> {
        self.doc
            .tree
            .get(self.node)
            .and_then(ElementRef::wrap)
            .ok_or_else(|| anyhow!("stale fixture node"))
    }
}

/// Tags that start a new line in rendered text.
const BLOCK_TAGS: &[&str] = &[
    "address", "article", "aside", "br", "dd", "div", "dl", "dt", "footer", "form", "h1", "h2",
    "h3", "h4", "h5", "h6", "header", "li", "main", "nav", "ol", "p", "section", "table", "tr",
    "ul",
];

/// Text as a browser's `innerText` lays it out: block boundaries become
/// line breaks, runs of whitespace collapse.
fn rendered_text(el: ElementRef<'_>) -> String {
    let mut raw = String::new();
    for edge in el.traverse() {
        match edge {
            Edge::Open(node) => match node.value() {
                Node::Text(text) => raw.push_str(text),
                Node::Element(e) if BLOCK_TAGS.contains(&e.name()) => raw.push('\n'),
                _ => {}
            },
            Edge::Close(node) => {
                if let Node::Element(e) = node.value() {
                    if BLOCK_TAGS.contains(&e.name()) {
                        raw.push('\n');
                    }
                }
            }
        }
    }
    normalize_text(&raw)
}

fn normalize_text(raw: &str) -> String {
    raw.lines()
        .map(|l| l.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

impl Region for FixtureRegion {
    fn find_all(&self, css: &str) -> Result<Vec<Self>> {
        let selector = Selector::parse(css).map_err(|e| anyhow!("bad selector {}: {:?}", css, e))?;
        let el = self.element()?;
        Ok(el
            .select(&selector)
            .filter(|found| found.id() != self.node)
            .map(|found| FixtureRegion {
                state: Rc::clone(&self.state),
                doc: Rc::clone(&self.doc),
                node: found.id(),
            })
            .collect())
    }

    fn text(&self) -> Result<String> {
        let el = self.element()?;
        Ok(rendered_text(el))
    }

    fn attr(&self, name: &str) -> Result<Option<String>> {
        Ok(self.element()?.value().attr(name).map(str::to_string))
    }

    fn click(&self) -> Result<()> {
        let el = self.element()?;
        if el.value().attr("data-broken").is_some() {
            return Err(anyhow!("element detached"));
        }
        let label = el
            .value()
            .attr("id")
            .map(str::to_string)
            .unwrap_or_else(|| rendered_text(el));
        self.state.record(format!("click:{}", label));
        if let Some(target) = el.value().attr("data-goto") {
            self.state.goto(target);
        }
        Ok(())
    }

    fn type_text(&self, text: &str) -> Result<()> {
        let el = self.element()?;
        let id = el.value().attr("id").unwrap_or("?");
        self.state.record(format!("type:{}={}", id, text));
        Ok(())
    }
}

impl Page for FixturePage {
    type Region = FixtureRegion;

    fn navigate(&self, url: &str) -> Result<()> {
        if url.contains("unreachable") {
            return Err(anyhow!("net::ERR_NAME_NOT_RESOLVED"));
        }
        *self.state.url.borrow_mut() = url.to_string();
        self.state.record(format!("navigate:{}", url));
        Ok(())
    }

    fn current_url(&self) -> Result<String> {
        Ok(self.state.url.borrow().clone())
    }

    fn root(&self) -> Result<FixtureRegion> {
        let doc = Rc::clone(&self.state.current.borrow());
        let node = doc.root_element().id();
        Ok(FixtureRegion {
            state: Rc::clone(&self.state),
            doc,
            node,
        })
    }

    fn wait_for(&self, css: &str, timeout: Duration) -> Result<Option<FixtureRegion>> {
        let found = self.root()?.find_first(css)?;
        if found.is_none() {
            self.state.record(format!("timeout:{}:{}ms", css, timeout.as_millis()));
        }
        Ok(found)
    }

    fn settle(&self, timeout: Duration) -> Result<bool> {
        self.state.record(format!("settle:{}ms", timeout.as_millis()));
        Ok(true)
    }

    fn press_escape(&self) -> Result<()> {
        self.state.record("escape".to_string());
        let target = {
            let doc = self.state.current.borrow();
            let body = Selector::parse("body").map_err(|e| anyhow!("{:?}", e))?;
            doc.select(&body)
                .next()
                .and_then(|b| b.value().attr("data-escape"))
                .map(str::to_string)
        };
        if let Some(target) = target {
            self.state.goto(&target);
        }
        Ok(())
    }

    fn scroll_to_bottom(&self) -> Result<u64> {
        let mut heights = self.state.heights.borrow_mut();
        let h = if heights.len() > 1 {
            heights.remove(0)
        } else {
            heights.first().copied().unwrap_or(1000)
        };
        self.state.record(format!("scroll:{}", h));
        Ok(h)
    }

    fn pause(&self, duration: Duration) {
        self.state.record(format!("pause:{}ms", duration.as_millis()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_elements_break_lines() {
        let page = FixturePage::new(
            "<html><body><section id='s'><h1>Jo</h1><div>Passionate <b>about</b> Rust</div>\
             <span>a</span><span>b</span></section></body></html>",
        );
        let section = page.root().unwrap().find_first("#s").unwrap().unwrap();
        assert_eq!(section.text().unwrap(), "Jo\nPassionate about Rust\nab");
    }
}
