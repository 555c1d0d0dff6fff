//! Component Collections (Feature 5)
//!
//! An ordered set of sibling components sharing one item locator. The
//! collection never caches: every call enumerates the matches again, and each
//! item re-resolves as "the n-th candidate passing the item rule".

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use tracing::debug;

use crate::component::{Component, ComponentType, Locatable, ScopeLink};
use crate::driver::Session;
use crate::locator::Locator;
use crate::result::{EntryKey, TrellisError, TrellisResult};

/// Lazily enumerated components of type `T`
pub struct ComponentCollection<T> {
    template: Component,
    _item: PhantomData<fn() -> T>,
}

impl<T> Clone for ComponentCollection<T> {
    fn clone(&self) -> Self {
        Self {
            template: self.template.clone(),
            _item: PhantomData,
        }
    }
}

impl<T> fmt::Debug for ComponentCollection<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentCollection")
            .field("template", &self.template)
            .finish()
    }
}

impl<T: ComponentType> ComponentCollection<T> {
    pub(crate) fn new(
        session: Session,
        locator: Locator,
        scope: Option<Arc<ScopeLink>>,
    ) -> TrellisResult<Self> {
        let template = Component::create::<T>(session, locator, scope)?;
        Ok(Self {
            template: template.component().clone(),
            _item: PhantomData,
        })
    }

    /// Item locator
    #[must_use]
    pub fn locator(&self) -> &Locator {
        self.template.locator()
    }

    fn enumerate(&self) -> TrellisResult<usize> {
        self.template.pass_scope_gates()?;
        if let Some(scope) = self.template.scope_component() {
            if self.template.is_scoped() {
                scope.find()?;
            }
        }
        let count = self.template.accepted()?.len();
        debug!(component = self.template.type_name(), count, "enumerated collection");
        Ok(count)
    }

    fn item(&self, index: usize) -> T {
        T::wrap(self.template.item(index))
    }

    /// Number of items currently present
    pub fn len(&self) -> TrellisResult<usize> {
        self.enumerate()
    }

    /// Whether no item is present
    pub fn is_empty(&self) -> TrellisResult<bool> {
        Ok(self.enumerate()? == 0)
    }

    /// Item at a zero-based position
    pub fn at(&self, index: usize) -> TrellisResult<T> {
        if index < self.enumerate()? {
            Ok(self.item(index))
        } else {
            Err(TrellisError::EntryNotFound(EntryKey::Index(index)))
        }
    }

    /// First item
    pub fn first(&self) -> TrellisResult<T> {
        self.at(0)
    }

    /// Last item
    pub fn last(&self) -> TrellisResult<T> {
        match self.enumerate()? {
            0 => Err(TrellisError::EntryNotFound(EntryKey::Index(0))),
            count => Ok(self.item(count - 1)),
        }
    }

    /// Every item, in document order
    pub fn all(&self) -> TrellisResult<Vec<T>> {
        Ok((0..self.enumerate()?).map(|index| self.item(index)).collect())
    }

    /// Items in document order, enumerated again before each step
    ///
    /// Items removed while iterating end the walk early instead of
    /// yielding positions that no longer exist. An enumeration failure is
    /// yielded once and ends the walk.
    #[must_use]
    pub fn iter(&self) -> Items<'_, T> {
        Items {
            collection: self,
            next: 0,
            done: false,
        }
    }

    /// First item whose key equals `key`, checked in order
    pub fn by_key(&self, key: &str) -> TrellisResult<T> {
        for item in self.iter() {
            let item = item?;
            if item.key()? == key {
                return Ok(item);
            }
        }
        Err(TrellisError::EntryNotFound(EntryKey::Key(key.to_string())))
    }

    /// Whether some item has the key
    pub fn contains_key(&self, key: &str) -> TrellisResult<bool> {
        match self.by_key(key) {
            Ok(_) => Ok(true),
            Err(TrellisError::EntryNotFound(_)) => Ok(false),
            Err(err) => Err(err),
        }
    }

    /// Visible text of every item
    pub fn texts(&self) -> TrellisResult<Vec<String>> {
        self.all()?.iter().map(Locatable::text).collect()
    }

    /// Items for which `predicate` holds
    pub fn filter<F>(&self, mut predicate: F) -> TrellisResult<Vec<T>>
    where
        F: FnMut(&T) -> TrellisResult<bool>,
    {
        let mut kept = Vec::new();
        for item in self.all()? {
            if predicate(&item)? {
                kept.push(item);
            }
        }
        Ok(kept)
    }
}

/// Live iterator over a [`ComponentCollection`]
#[derive(Debug)]
pub struct Items<'a, T> {
    collection: &'a ComponentCollection<T>,
    next: usize,
    done: bool,
}

impl<T: ComponentType> Iterator for Items<'_, T> {
    type Item = TrellisResult<T>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.collection.enumerate() {
            Ok(count) if self.next < count => {
                let item = self.collection.item(self.next);
                self.next += 1;
                Some(Ok(item))
            }
            Ok(_) => {
                self.done = true;
                None
            }
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
        }
    }
}

impl<T: ComponentType> std::iter::FusedIterator for Items<'_, T> {}

impl<'a, T: ComponentType> IntoIterator for &'a ComponentCollection<T> {
    type Item = TrellisResult<T>;
    type IntoIter = Items<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::component::{Button, GenericComponent};
    use crate::config::TrellisConfig;
    use crate::locator::predicate::{css_classes, id};
    use crate::mock::{ElementSpec, FixtureDom};
    use crate::scope::Page;

    fn menu() -> (FixtureDom, Page) {
        let dom = FixtureDom::new();
        dom.append(
            &dom.document(),
            ElementSpec::new("div")
                .id("menu")
                .child(ElementSpec::new("button").class("item").text("a"))
                .child(ElementSpec::new("a").class("item").text("not a button"))
                .child(ElementSpec::new("button").class("item").text("b"))
                .child(ElementSpec::new("button").class("item").text("c")),
        )
        .unwrap();
        let session = Session::new(
            dom.clone(),
            TrellisConfig::default()
                .with_wait_timeout(100)
                .with_poll_interval(10),
        );
        (dom, Page::new(session))
    }

    fn buttons(page: &Page) -> ComponentCollection<Button> {
        page.collection(Locator::descendant("div", [id("menu")]).then_child("*", [css_classes(["item"])]))
            .unwrap()
    }

    mod lookup_tests {
        use super::*;

        #[test]
        fn test_items_skip_rule_failures() {
            let (_, page) = menu();
            let buttons = buttons(&page);
            assert_eq!(buttons.len().unwrap(), 3);
            assert_eq!(buttons.texts().unwrap(), vec!["a", "b", "c"]);
            assert_eq!(buttons.at(1).unwrap().text().unwrap(), "b");
            assert_eq!(buttons.last().unwrap().text().unwrap(), "c");
        }

        #[test]
        fn test_missing_entries() {
            let (_, page) = menu();
            let buttons = buttons(&page);
            assert_eq!(buttons.by_key("b").unwrap().text().unwrap(), "b");
            assert!(matches!(
                buttons.by_key("z"),
                Err(TrellisError::EntryNotFound(EntryKey::Key(ref k))) if k == "z"
            ));
            assert!(matches!(
                buttons.at(5),
                Err(TrellisError::EntryNotFound(EntryKey::Index(5)))
            ));
            assert!(!buttons.contains_key("z").unwrap());
        }

        #[test]
        fn test_filter_and_empty() {
            let (_, page) = menu();
            let kept = buttons(&page)
                .filter(|b| Ok(b.text()? != "b"))
                .unwrap();
            assert_eq!(kept.len(), 2);

            let none: ComponentCollection<GenericComponent> =
                page.collection(Locator::descendant("table", [])).unwrap();
            assert!(none.is_empty().unwrap());
            assert!(none.first().is_err());
            assert!(none.last().is_err());
        }

        #[test]
        fn test_enumerates_again_after_changes() {
            let (dom, page) = menu();
            let buttons = buttons(&page);
            let a = buttons.first().unwrap().find().unwrap();
            dom.remove(&a).unwrap();
            assert_eq!(buttons.len().unwrap(), 2);
            assert_eq!(buttons.first().unwrap().text().unwrap(), "b");
            assert_eq!(buttons.by_key("c").unwrap().text().unwrap(), "c");
        }

        #[test]
        fn test_iter_sees_removals_mid_walk() {
            let (dom, page) = menu();
            let buttons = buttons(&page);
            let c = buttons.last().unwrap().find().unwrap();

            let mut items = buttons.iter();
            assert_eq!(items.next().unwrap().unwrap().text().unwrap(), "a");
            dom.remove(&c).unwrap();
            assert_eq!(items.next().unwrap().unwrap().text().unwrap(), "b");
            assert!(items.next().is_none());
            assert!(items.next().is_none());

            let keys: Vec<String> = (&buttons)
                .into_iter()
                .map(|item| item.and_then(|b| b.text()))
                .collect::<TrellisResult<_>>()
                .unwrap();
            assert_eq!(keys, vec!["a", "b"]);
        }
    }
}
