//! `for`: renders one clone of the element per item.
//!
//! Items are keyed by identity: objects and arrays by reference, scalars by
//! type and text, object sources by property key. On every change the
//! existing clones are matched to the new items by key. A scalar with no
//! match takes over the unmatched scalar clone at its own position, which
//! keeps a clone alive across an in-place edit. Remaining clones are
//! destroyed, new ones are compiled, and the survivors are moved into
//! place walking backwards from the end anchor so that clones already in
//! order are not touched.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use indexmap::IndexMap;

use super::{Directive, DirectiveContext, DirectiveKind};
use crate::compiler::CompilerCore;
use crate::dom::Node;
use crate::error::CompileError;
use crate::expression::{LoopSource, LoopSpec, Scope};
use crate::observer::Data;
use crate::reactive::Watcher;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum ItemKey {
    Container(usize),
    Scalar(&'static str, String),
    Property(String),
}

impl ItemKey {
    fn of(item: &Data) -> Self {
        match item {
            Data::Object(object) => Self::Container(object.addr()),
            Data::Array(array) => Self::Container(array.addr()),
            scalar => Self::Scalar(scalar.type_name(), scalar.to_display()),
        }
    }
}

struct Item {
    key: ItemKey,
    value: Data,
    /// Property name when iterating an object.
    property: Option<String>,
}

/// One rendered clone.
struct Entry {
    key: ItemKey,
    node: Node,
    scope: Scope,
    directives: Vec<Box<dyn Directive>>,
}

impl Entry {
    /// The node currently occupying this entry's place in the document.
    fn position(&self) -> Node {
        if self.node.parent().is_some() {
            return self.node.clone();
        }
        self.directives
            .iter()
            .filter(|directive| directive.node().ptr_eq(&self.node))
            .find_map(|directive| directive.placeholder())
            .unwrap_or_else(|| self.node.clone())
    }

    fn destroy(self) {
        let position = self.position();
        for directive in &self.directives {
            directive.destroy();
        }
        position.remove();
        self.node.remove();
    }
}

struct List {
    core: Rc<CompilerCore>,
    scope: Scope,
    spec: LoopSpec,
    template: Node,
    anchor: Node,
    entries: RefCell<Vec<Entry>>,
    /// The container the current entries were built from.
    source: RefCell<Option<LoopSource>>,
}

fn same_source(a: &LoopSource, b: &LoopSource) -> bool {
    match (a, b) {
        (LoopSource::Array(a), LoopSource::Array(b)) => a.ptr_eq(b),
        (LoopSource::Object(a), LoopSource::Object(b)) => a.ptr_eq(b),
        _ => false,
    }
}

impl List {
    fn items(&self, value: &Data) -> (Vec<Item>, Option<LoopSource>) {
        match value {
            Data::Array(array) => {
                let items = array
                    .items_untracked()
                    .into_iter()
                    .map(|value| Item {
                        key: ItemKey::of(&value),
                        value,
                        property: None,
                    })
                    .collect();
                (items, Some(LoopSource::Array(array.clone())))
            }
            Data::Object(object) => {
                let items = object
                    .keys()
                    .into_iter()
                    .map(|key| Item {
                        key: ItemKey::Property(key.clone()),
                        value: object.get_untracked(&key),
                        property: Some(key),
                    })
                    .collect();
                (items, Some(LoopSource::Object(object.clone())))
            }
            Data::Null => (Vec::new(), None),
            other => {
                tracing::warn!(
                    expression = %self.spec.source.source(),
                    found = other.type_name(),
                    "loop source is not an array or object"
                );
                (Vec::new(), None)
            }
        }
    }

    fn locals(&self, index: usize, property: Option<&str>) -> IndexMap<String, Data> {
        let mut locals = IndexMap::new();
        locals.insert("$index".to_string(), Data::Number(index as f64));
        if let Some(property) = property {
            locals.insert("$key".to_string(), Data::string(property));
        }
        if let Some(index_alias) = &self.spec.index_alias {
            let value = match property {
                Some(property) => Data::string(property),
                None => Data::Number(index as f64),
            };
            locals.insert(index_alias.clone(), value);
        }
        locals
    }

    fn build(&self, index: usize, item: Item, source: &LoopSource) -> Entry {
        let locals = self.locals(index, item.property.as_deref());
        let scope = self
            .scope
            .iteration(&self.spec.alias, item.value, locals, source.clone());

        let node = self.template.clone_node(true);
        if let Some(parent) = self.anchor.parent() {
            parent.insert_before(&node, Some(&self.anchor));
        }
        let directives = self.core.compile_subtree(&node, true, &scope);

        Entry {
            key: item.key,
            node,
            scope,
            directives,
        }
    }

    fn rebind(&self, entry: &Entry, index: usize, item: Item) {
        for (name, value) in self.locals(index, item.property.as_deref()) {
            entry.scope.set_local(&name, value);
        }
        entry.scope.set_local(&self.spec.alias, item.value);
    }

    fn reconcile(&self, value: &Data) {
        let (items, source) = self.items(value);
        let old = std::mem::take(&mut *self.entries.borrow_mut());

        // Iteration scopes write back into their source, so clones built
        // from another container cannot be reused.
        let previous = self.source.replace(source.clone());
        let reusable = matches!((&previous, &source), (Some(a), Some(b)) if same_source(a, b));

        let mut pool: IndexMap<ItemKey, VecDeque<(usize, Entry)>> = IndexMap::new();
        let mut stale = Vec::new();
        for (position, entry) in old.into_iter().enumerate() {
            if reusable {
                pool.entry(entry.key.clone()).or_default().push_back((position, entry));
            } else {
                stale.push(entry);
            }
        }

        let mut slots: Vec<Option<Entry>> = items
            .iter()
            .map(|item| {
                pool.get_mut(&item.key)
                    .and_then(VecDeque::pop_front)
                    .map(|(_, entry)| entry)
            })
            .collect();

        let mut leftover: IndexMap<usize, Entry> = pool.into_values().flatten().collect();
        for (index, item) in items.iter().enumerate() {
            let scalar_in_place = slots[index].is_none()
                && matches!(item.key, ItemKey::Scalar(..))
                && leftover
                    .get(&index)
                    .is_some_and(|entry| matches!(entry.key, ItemKey::Scalar(..)));
            if scalar_in_place {
                slots[index] = leftover.shift_remove(&index);
            }
        }

        let mut next = Vec::with_capacity(items.len());
        let mut reused = 0usize;
        for (index, (item, slot)) in items.into_iter().zip(slots).enumerate() {
            let entry = match slot {
                Some(mut entry) => {
                    reused += 1;
                    entry.key = item.key.clone();
                    self.rebind(&entry, index, item);
                    entry
                }
                None => match &source {
                    Some(source) => self.build(index, item, source),
                    None => continue,
                },
            };
            next.push(entry);
        }

        stale.extend(leftover.into_values());
        tracing::debug!(
            expression = %self.spec.source.source(),
            items = next.len(),
            reused,
            removed = stale.len(),
            "list reconciled"
        );
        for entry in stale {
            entry.destroy();
        }

        self.reorder(&next);
        *self.entries.borrow_mut() = next;
    }

    fn reorder(&self, entries: &[Entry]) {
        let Some(parent) = self.anchor.parent() else {
            return;
        };

        let mut reference = self.anchor.clone();
        for entry in entries.iter().rev() {
            let position = entry.position();
            let in_place = position
                .next_sibling()
                .is_some_and(|next| next.ptr_eq(&reference));
            if !in_place {
                parent.insert_before(&position, Some(&reference));
            }
            reference = position;
        }
    }

    fn clear(&self) {
        for entry in self.entries.take() {
            entry.destroy();
        }
    }
}

struct ListDirective {
    node: Node,
    watcher: Rc<Watcher>,
    list: Rc<List>,
}

pub(super) fn create(context: &DirectiveContext<'_>) -> Result<Box<dyn Directive>, CompileError> {
    let spec = LoopSpec::parse(&context.descriptor.expression)?;
    let node = context.node.clone();

    let anchor = Node::comment(&context.descriptor.directive);
    node.replace_with(&anchor);

    let list = Rc::new(List {
        core: context.core.clone(),
        scope: context.scope.clone(),
        spec,
        template: node.clone(),
        anchor,
        entries: RefCell::new(Vec::new()),
        source: RefCell::new(None),
    });

    // Object sources are read entry by entry so a changed value reaches
    // the loop too.
    let getter_scope = context.scope.clone();
    let getter_source = list.spec.source.clone();
    let renderer = list.clone();
    let watcher = Watcher::new(
        context.core.runtime(),
        context.descriptor.expression.as_str(),
        move || {
            let value = getter_source.evaluate(&getter_scope)?;
            if let Data::Object(object) = &value {
                object.entries();
            }
            Ok(value)
        },
        move |value, _| renderer.reconcile(value),
    );
    list.reconcile(&watcher.value());

    Ok(Box::new(ListDirective { node, watcher, list }))
}

impl Directive for ListDirective {
    fn kind(&self) -> DirectiveKind {
        DirectiveKind::For
    }

    fn node(&self) -> &Node {
        &self.node
    }

    fn destroy(&self) {
        self.watcher.teardown();
        self.list.clear();
    }
}

#[cfg(test)]
mod tests {
    use crate::dom::element_from_html;
    use crate::observer::{Data, Value};
    use crate::{Compiler, CompilerOptions};
    use serde_json::json;

    fn compile(markup: &str, model: serde_json::Value) -> Compiler {
        let view = element_from_html(markup).unwrap();
        Compiler::new(CompilerOptions::new(view, Value::from(model))).unwrap()
    }

    #[test]
    fn one_clone_per_item() {
        let compiler = compile(
            r#"<ul><li v-for="item in items">{{ $index }}:{{ item.name }}</li></ul>"#,
            json!({"items": [{"name": "a"}, {"name": "b"}]}),
        );
        assert_eq!(compiler.element().inner_html(), "<li>0:a</li><li>1:b</li><!--v-for-->");

        let items = compiler.model().unwrap().array("items").unwrap();
        items.push(json!({"name": "c"}));
        assert_eq!(
            compiler.element().inner_html(),
            "<li>0:a</li><li>1:b</li><li>2:c</li><!--v-for-->"
        );

        items.shift();
        assert_eq!(compiler.element().inner_html(), "<li>0:b</li><li>1:c</li><!--v-for-->");
    }

    #[test]
    fn reorder_keeps_clones() {
        let compiler = compile(
            r#"<ul><li v-for="item in items">{{ item.id }}</li></ul>"#,
            json!({"items": [{"id": 1}, {"id": 2}, {"id": 3}]}),
        );
        let first = compiler.element().first_child().unwrap();

        compiler.model().unwrap().array("items").unwrap().reverse();
        assert_eq!(compiler.element().inner_html(), "<li>3</li><li>2</li><li>1</li><!--v-for-->");
        assert!(compiler.element().children()[2].ptr_eq(&first));
    }

    #[test]
    fn scalar_edit_in_place_keeps_clone() {
        let compiler = compile(
            r#"<ul><li v-for="n in list">{{ n }}</li></ul>"#,
            json!({"list": [1, 2, 3]}),
        );
        let second = compiler.element().children()[1].clone();

        compiler.model().unwrap().set("list.1", 20).unwrap();
        assert_eq!(compiler.element().inner_html(), "<li>1</li><li>20</li><li>3</li><!--v-for-->");
        assert!(compiler.element().children()[1].ptr_eq(&second));
        assert_eq!(compiler.runtime().active_watchers(), 4);
    }

    #[test]
    fn removed_items_release_watchers() {
        let compiler = compile(
            r#"<ul><li v-for="n in list">{{ n }}</li></ul>"#,
            json!({"list": [1, 2, 3]}),
        );
        assert_eq!(compiler.runtime().active_watchers(), 4);

        compiler.model().unwrap().array("list").unwrap().splice(0, 2, Vec::new());
        assert_eq!(compiler.runtime().active_watchers(), 2);
        assert_eq!(compiler.element().inner_html(), "<li>3</li><!--v-for-->");
    }

    #[test]
    fn index_alias_and_nested_loops() {
        let compiler = compile(
            r#"<div><p v-for="(row, r) in rows"><b v-for="cell in row.cells">{{ r }}{{ cell }}</b></p></div>"#,
            json!({"rows": [{"cells": ["a", "b"]}, {"cells": ["c"]}]}),
        );
        assert_eq!(
            compiler.element().inner_html(),
            "<p><b>0a</b><b>0b</b><!--v-for--></p><p><b>1c</b><!--v-for--></p><!--v-for-->"
        );
    }

    #[test]
    fn iterates_objects() {
        let compiler = compile(
            r#"<ul><li v-for="(value, key) in user">{{ key }}={{ value }}</li></ul>"#,
            json!({"user": {"name": "ada", "age": 36}}),
        );
        assert_eq!(
            compiler.element().inner_html(),
            "<li>name=ada</li><li>age=36</li><!--v-for-->"
        );

        compiler.model().unwrap().set("user.age", 37).unwrap();
        assert_eq!(
            compiler.element().inner_html(),
            "<li>name=ada</li><li>age=37</li><!--v-for-->"
        );
    }

    #[test]
    fn other_directives_compile_per_item() {
        let compiler = compile(
            r#"<ul><li v-for="item in items" v-if="item.on" v-bind:id="item.id">x</li></ul>"#,
            json!({"items": [{"id": "a", "on": true}, {"id": "b", "on": false}, {"id": "c", "on": true}]}),
        );
        assert_eq!(
            compiler.element().inner_html(),
            r#"<li id="a">x</li><!--v-if--><li id="c">x</li><!--v-for-->"#
        );

        let items = compiler.model().unwrap().array("items").unwrap();
        items.reverse();
        assert_eq!(
            compiler.element().inner_html(),
            r#"<li id="c">x</li><!--v-if--><li id="a">x</li><!--v-for-->"#
        );
    }

    #[test]
    fn replacing_the_source_rebuilds() {
        let compiler = compile(
            r#"<ul><li v-for="n in list">{{ n }}</li></ul>"#,
            json!({"list": [1, 2]}),
        );
        let model = compiler.model().unwrap();
        model.set("list", Value::from(json!([2, 3]))).unwrap();
        assert_eq!(compiler.element().inner_html(), "<li>2</li><li>3</li><!--v-for-->");

        model.set_data("list", Data::Null).unwrap();
        assert_eq!(compiler.element().inner_html(), "<!--v-for-->");
    }

    #[test]
    fn destroy_removes_clones() {
        let compiler = compile(r#"<ul><li v-for="n in list">{{ n }}</li></ul>"#, json!({"list": [1, 2]}));
        compiler.destroy();
        assert_eq!(compiler.runtime().active_watchers(), 0);
    }
}
