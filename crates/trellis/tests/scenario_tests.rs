//! Page-object scenarios against the in-memory DOM.
//!
//! User-defined page and component types, dialogs that appear late, frames,
//! and configuration loaded from disk.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::io::Write;
use std::thread;
use std::time::Duration;

use trellis::locator::predicate::{css_classes, id, text};
use trellis::mock::{ElementSpec, FixtureDom};
use trellis::prelude::*;

// =============================================================================
// PAGE OBJECTS
// =============================================================================

/// Row of the todo list, keyed by its title
#[derive(Debug, Clone)]
struct TodoRow(Component);

impl Locatable for TodoRow {
    fn component(&self) -> &Component {
        &self.0
    }
}

impl ComponentType for TodoRow {
    fn rules(rules: &mut RuleBuilder) {
        rules.tag().is("li");
        rules.css_classes().has("todo");
    }

    fn wrap(component: Component) -> Self {
        Self(component)
    }

    fn key(&self) -> TrellisResult<String> {
        self.title().text()
    }
}

impl Scoped for TodoRow {}

impl TodoRow {
    fn title(&self) -> GenericComponent {
        self.child(Locator::child("span", [css_classes(["title"])]))
            .expect("static locator")
    }

    fn done(&self) -> Checkbox {
        self.child(Locator::child("input", [])).expect("static locator")
    }
}

/// Confirmation dialog with a readiness hook
#[derive(Debug, Clone)]
struct ConfirmDialog(Component);

impl Locatable for ConfirmDialog {
    fn component(&self) -> &Component {
        &self.0
    }
}

impl ComponentType for ConfirmDialog {
    fn rules(rules: &mut RuleBuilder) {
        rules.tag().is("dialog");
    }

    fn wrap(component: Component) -> Self {
        Self(component)
    }
}

impl Scoped for ConfirmDialog {
    fn gates_children(&self) -> bool {
        true
    }

    fn additional_wait(&self) -> TrellisResult<()> {
        self.wait_for_animation()
    }
}

impl AnimationSettleable for ConfirmDialog {}
impl DialogScope for ConfirmDialog {}

impl ConfirmDialog {
    fn confirm(&self) -> Button {
        self.child(Locator::descendant("button", [text().is("Delete")]))
            .expect("static locator")
    }
}

struct TodoPage {
    page: Page,
}

impl PageType for TodoPage {
    fn wrap(page: Page) -> TrellisResult<Self> {
        Ok(Self { page })
    }

    fn page(&self) -> &Page {
        &self.page
    }

    fn additional_wait(&self) -> TrellisResult<()> {
        self.rows().first()?.wait_for_displayed()
    }
}

impl TodoPage {
    fn rows(&self) -> ComponentCollection<TodoRow> {
        self.page
            .collection(Locator::descendant("ul", [id("todos")]).then_child("li", []))
            .expect("static locator")
    }

    fn delete(&self) -> Button {
        self.page
            .component(Locator::descendant("button", [id("delete")]))
            .expect("static locator")
    }

    fn dialog(&self) -> ConfirmDialog {
        self.page
            .component(Locator::descendant("dialog", []))
            .expect("static locator")
    }
}

fn todo_dom() -> FixtureDom {
    let dom = FixtureDom::new();
    let row = |title: &str| {
        ElementSpec::new("li")
            .class("todo")
            .child(ElementSpec::new("input").attr("type", "checkbox"))
            .child(ElementSpec::new("span").class("title").text(title))
    };
    dom.append(
        &dom.document(),
        ElementSpec::new("main").children([
            ElementSpec::new("ul")
                .id("todos")
                .children([row("a"), row("b"), row("c")])
                .child(ElementSpec::new("li").class("separator")),
            ElementSpec::new("button").id("delete").text("Delete all"),
            ElementSpec::new("dialog")
                .hidden()
                .child(ElementSpec::new("p").text("Delete everything?"))
                .child(ElementSpec::new("button").text("Delete").disabled()),
        ]),
    )
    .unwrap();
    dom
}

fn session(dom: &FixtureDom, timeout_ms: u64) -> Session {
    Session::new(
        dom.clone(),
        TrellisConfig::default()
            .with_wait_timeout(timeout_ms)
            .with_poll_interval(10),
    )
}

// =============================================================================
// SCENARIOS
// =============================================================================

mod collection_scenarios {
    use super::*;

    #[test]
    fn test_rows_by_key_and_index() {
        let dom = todo_dom();
        let todos = Page::open::<TodoPage>(&session(&dom, 200)).unwrap();
        let rows = todos.rows();
        assert_eq!(rows.len().unwrap(), 3);
        assert_eq!(rows.by_key("b").unwrap().title().text().unwrap(), "b");
        assert!(matches!(
            rows.by_key("z"),
            Err(TrellisError::EntryNotFound(EntryKey::Key(_)))
        ));
        assert!(matches!(
            rows.at(5),
            Err(TrellisError::EntryNotFound(EntryKey::Index(5)))
        ));
    }

    #[test]
    fn test_row_children_are_scoped_to_the_row() {
        let dom = todo_dom();
        let todos = Page::open::<TodoPage>(&session(&dom, 200)).unwrap();
        let b = todos.rows().by_key("b").unwrap();
        b.done().check().unwrap();

        let checked = todos
            .rows()
            .filter(|row| row.done().is_checked())
            .unwrap();
        assert_eq!(checked.len(), 1);
        assert_eq!(checked[0].key().unwrap(), "b");
    }

    #[test]
    fn test_empty_list_is_unexpected_page() {
        let dom = FixtureDom::new();
        dom.append(&dom.document(), ElementSpec::new("ul").id("todos"))
            .unwrap();
        let err = Page::open::<TodoPage>(&session(&dom, 50)).err().unwrap();
        let TrellisError::UnexpectedPage { source, .. } = err else {
            panic!("unexpected {err}");
        };
        assert!(matches!(*source, TrellisError::EntryNotFound(EntryKey::Index(0))));
    }
}

mod dialog_scenarios {
    use super::*;

    #[test]
    fn test_child_blocks_until_dialog_is_displayed() {
        let dom = todo_dom();
        let todos = Page::open::<TodoPage>(&session(&dom, 1_000)).unwrap();
        todos.delete().click().unwrap();

        let dialog_handle = todos.dialog().find().unwrap();
        let confirm_handle = todos.dialog().confirm().component().try_resolve().unwrap();
        let writer = dom.clone();
        let opener = thread::spawn(move || {
            thread::sleep(Duration::from_millis(80));
            writer.set_displayed(&dialog_handle, true).unwrap();
            thread::sleep(Duration::from_millis(40));
            writer.set_enabled(&confirm_handle, true).unwrap();
        });

        let dialog = todos.dialog();
        dialog
            .within(|d| {
                d.confirm().click()?;
                writer_hide(&dom)
            })
            .unwrap();
        opener.join().unwrap();
        assert!(!dialog.is_displayed().unwrap());
    }

    fn writer_hide(dom: &FixtureDom) -> TrellisResult<()> {
        let dialog = dom.find_elements(None, &Locator::descendant("dialog", []).compile(false)?)?;
        dom.set_displayed(&dialog[0], false)
    }

    #[test]
    fn test_hidden_dialog_times_out_not_displayed() {
        let dom = todo_dom();
        let todos = Page::open::<TodoPage>(&session(&dom, 100)).unwrap();
        let err = todos.dialog().confirm().click().unwrap_err();
        let TrellisError::ComponentNotDisplayed {
            component,
            timeout_ms,
            ..
        } = err
        else {
            panic!("unexpected {err}");
        };
        assert_eq!(component, "ConfirmDialog");
        assert_eq!(timeout_ms, 100);
        assert!(dom.interactions().is_empty());
    }
}

mod frame_scenarios {
    use super::*;

    struct EditorContent {
        page: Page,
    }

    impl PageType for EditorContent {
        fn wrap(page: Page) -> TrellisResult<Self> {
            Ok(Self { page })
        }

        fn page(&self) -> &Page {
            &self.page
        }

        fn additional_wait(&self) -> TrellisResult<()> {
            self.body().wait_for_displayed()
        }
    }

    impl EditorContent {
        fn body(&self) -> Textbox {
            self.page
                .component(Locator::descendant("textarea", [id("body")]))
                .expect("static locator")
        }
    }

    #[test]
    fn test_type_inside_frame() {
        let dom = FixtureDom::new();
        let frame = dom
            .append(&dom.document(), ElementSpec::new("iframe").id("editor"))
            .unwrap();
        let inner = dom.frame_document(&frame).unwrap();
        let body = dom
            .append(&inner, ElementSpec::new("textarea").id("body"))
            .unwrap();

        let page = Page::new(session(&dom, 200));
        let editor: Frame = page.component(Locator::descendant("iframe", [id("editor")])).unwrap();
        editor
            .within(|content: &EditorContent| content.body().enter_text("hello"))
            .unwrap();
        assert_eq!(dom.frame_depth(), 0);
        assert_eq!(dom.attribute(&body, "value").unwrap().as_deref(), Some("hello"));

        dom.set_displayed(&body, false).unwrap();
        let err = editor
            .within(|content: &EditorContent| content.body().value())
            .unwrap_err();
        assert!(matches!(err, TrellisError::UnexpectedPage { .. }));
        assert_eq!(dom.frame_depth(), 0);
    }
}

mod config_scenarios {
    use super::*;

    #[test]
    fn test_session_uses_loaded_config() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "browser: firefox\nwait-timeout-ms: 60\npoll-interval-ms: 5").unwrap();
        let config = TrellisConfig::from_file(file.path()).unwrap();
        assert_eq!(config.browser, Browser::Firefox);

        let dom = FixtureDom::new();
        let page = Page::new(Session::new(dom, config));
        let missing: GenericComponent = page.component(Locator::descendant("nav", [])).unwrap();
        let err = missing.find().unwrap_err();
        assert_eq!(err.timeout_ms(), Some(60));
    }

    #[test]
    fn test_logging_init_is_idempotent() {
        let config = TrellisConfig::default();
        let first = trellis::logging::init(&config.log).unwrap();
        let second = trellis::logging::init(&config.log).unwrap();
        assert!(!(first && second));
    }
}
