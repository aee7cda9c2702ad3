use std::collections::BTreeMap;

use wasm_bindgen::JsCast;
use web_sys::{Document, HtmlElement, HtmlInputElement};

use crate::error::DisplayError;

/// Everything the projector needs from the page, addressed by target id.
pub trait Surface {
    fn has_target(&self, id: &str) -> bool;

    /// Ids of every target starting with `prefix`.
    fn target_ids(&self, prefix: &str) -> Vec<String>;

    fn is_checkbox(&self, id: &str) -> bool;

    fn text(&self, id: &str) -> Option<String>;

    fn set_text(&mut self, id: &str, text: &str);

    fn set_checked(&mut self, id: &str, checked: bool);

    fn set_target_property(&mut self, id: &str, name: &str, value: &str);

    /// Sets a CSS custom property on the document root.
    fn set_root_property(&mut self, name: &str, value: &str);

    /// Current local date/time, as shown by the timestamp target.
    fn now(&self) -> String;
}

/// Targets found in the document, keyed by element id.
#[derive(Default)]
pub struct TargetRegistry {
    targets: BTreeMap<String, HtmlElement>,
}

impl TargetRegistry {
    pub fn scan(document: &Document) -> Result<Self, DisplayError> {
        let nodes = document.query_selector_all("[id]")?;
        let mut targets = BTreeMap::new();
        for i in 0..nodes.length() {
            let Some(node) = nodes.item(i) else {
                continue;
            };
            let Ok(element) = node.dyn_into::<HtmlElement>() else {
                continue;
            };
            let id = element.id();
            // first in document order wins, as with getElementById
            if !id.is_empty() {
                targets.entry(id).or_insert(element);
            }
        }
        Ok(Self { targets })
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    pub fn resolve(&self, id: &str) -> Option<&HtmlElement> {
        self.targets.get(id)
    }

    pub fn with_prefix<'a>(
        &'a self,
        prefix: &'a str,
    ) -> impl Iterator<Item = (&'a String, &'a HtmlElement)> + 'a {
        self.targets
            .range(prefix.to_string()..)
            .take_while(move |(id, _)| id.starts_with(prefix))
    }
}

/// [`Surface`] backed by the live document.
pub struct DomSurface {
    document: Document,
    registry: TargetRegistry,
}

impl DomSurface {
    pub fn new(document: Document) -> Result<Self, DisplayError> {
        let registry = TargetRegistry::scan(&document)?;
        Ok(Self { document, registry })
    }

    /// Re-scans the document, picking up targets added after startup.
    pub fn refresh(&mut self) -> Result<(), DisplayError> {
        self.registry = TargetRegistry::scan(&self.document)?;
        Ok(())
    }

    pub fn registry(&self) -> &TargetRegistry {
        &self.registry
    }
}

impl Surface for DomSurface {
    fn has_target(&self, id: &str) -> bool {
        self.registry.resolve(id).is_some()
    }

    fn target_ids(&self, prefix: &str) -> Vec<String> {
        self.registry
            .with_prefix(prefix)
            .map(|(id, _)| id.clone())
            .collect()
    }

    fn is_checkbox(&self, id: &str) -> bool {
        self.registry
            .resolve(id)
            .and_then(|el| el.dyn_ref::<HtmlInputElement>())
            .is_some_and(|input| input.type_() == "checkbox")
    }

    fn text(&self, id: &str) -> Option<String> {
        self.registry.resolve(id).map(|el| el.inner_text())
    }

    fn set_text(&mut self, id: &str, text: &str) {
        if let Some(el) = self.registry.resolve(id) {
            el.set_inner_text(text);
        }
    }

    fn set_checked(&mut self, id: &str, checked: bool) {
        if let Some(input) = self
            .registry
            .resolve(id)
            .and_then(|el| el.dyn_ref::<HtmlInputElement>())
        {
            input.set_checked(checked);
        }
    }

    fn set_target_property(&mut self, id: &str, name: &str, value: &str) {
        if let Some(el) = self.registry.resolve(id) {
            let _ = el.style().set_property(name, value);
        }
    }

    fn set_root_property(&mut self, name: &str, value: &str) {
        let Some(el) = self.document.document_element() else {
            return;
        };
        let Ok(html_el) = el.dyn_into::<HtmlElement>() else {
            return;
        };
        let _ = html_el.style().set_property(name, value);
    }

    fn now(&self) -> String {
        String::from(js_sys::Date::new_0().to_string())
    }
}
