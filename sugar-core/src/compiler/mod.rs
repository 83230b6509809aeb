//! Template Compiler
//!
//! The compiler turns a view element and a plain model into a live binding.
//!
//! # Compilation Pass
//!
//! 1. The view's children are detached into a fragment so that nothing is
//!    rendered half bound.
//!
//! 2. `collect` walks the fragment in pre-order and queues every element
//!    with a directive attribute and every text node with a `{{ }}` marker.
//!    Descendants of `for`, `if` and `pre` elements are skipped; the owning
//!    directive compiles them later against its own scope.
//!
//! 3. The queue is drained in FIFO order. On an element carrying `for`
//!    alongside other directives only `for` is compiled; the rest stay on
//!    the element and are compiled once per item.
//!
//! 4. Once the queue is empty the fragment is reattached to the view.
//!
//! Template errors never abort a pass: the offending directive is logged
//! through `tracing` and skipped.

mod interpolation;
mod options;
mod queue;

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use indexmap::IndexMap;

pub use options::{CompilerOptions, ComputedDef, DEFAULT_PREFIX};
pub use queue::CompileQueue;

use crate::directives::{destroy_all, CustomUpdate, Descriptor, Directive, DirectiveContext, Registry};
use crate::dom::{self, Node};
use crate::error::CompileError;
use crate::expression::Scope;
use crate::observer::{Model, Observer};
use crate::reactive::Runtime;
use interpolation::TextBinding;

/// State shared by a compiler and every directive it creates.
pub struct CompilerCore {
    runtime: Rc<Runtime>,
    registry: Registry,
    customs: IndexMap<String, CustomUpdate>,
    /// Nodes registered by `el`, by name.
    els: RefCell<IndexMap<String, Node>>,
    prefix: String,
}

impl CompilerCore {
    fn new(runtime: Rc<Runtime>, customs: IndexMap<String, CustomUpdate>, prefix: String) -> Rc<Self> {
        Rc::new(Self {
            runtime,
            registry: Registry::standard(),
            customs,
            els: RefCell::new(IndexMap::new()),
            prefix,
        })
    }

    pub fn runtime(&self) -> &Rc<Runtime> {
        &self.runtime
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Full attribute name of a directive, e.g. `else` -> `v-else`.
    pub(crate) fn attr(&self, name: &str) -> String {
        format!("{}{}", self.prefix, name)
    }

    pub(crate) fn custom(&self, name: &str) -> Option<CustomUpdate> {
        self.customs.get(name).cloned()
    }

    pub(crate) fn register_el(&self, name: &str, node: &Node) {
        self.els.borrow_mut().insert(name.to_string(), node.clone());
    }

    /// Drop `name` if it still points at `node`.
    pub(crate) fn unregister_el(&self, name: &str, node: &Node) {
        let mut els = self.els.borrow_mut();
        if els.get(name).is_some_and(|registered| registered.ptr_eq(node)) {
            els.shift_remove(name);
        }
    }

    pub fn element_ref(&self, name: &str) -> Option<Node> {
        self.els.borrow().get(name).cloned()
    }

    /// Collect and compile `root`'s subtree against `scope`, returning the
    /// directives created. `root` itself is compiled only if `include_root`.
    pub(crate) fn compile_subtree(self: &Rc<Self>, root: &Node, include_root: bool, scope: &Scope) -> Vec<Box<dyn Directive>> {
        let mut queue = CompileQueue::new();
        self.collect(&mut queue, root, include_root, scope);
        tracing::debug!(queued = queue.len(), "compiling subtree");

        let mut directives = Vec::new();
        while let Some((node, scope)) = queue.pop() {
            self.compile_node(&node, &scope, &mut directives);
        }
        directives
    }

    fn collect(&self, queue: &mut CompileQueue, element: &Node, include_root: bool, scope: &Scope) {
        if include_root && self.has_directive(element) {
            queue.push(element.clone(), scope.clone());
            if self.is_late_compile(element) {
                return;
            }
        }

        for node in element.children() {
            if self.has_directive(&node) {
                queue.push(node.clone(), scope.clone());
            }
            if node.has_child_nodes() && !self.is_late_compile(&node) {
                self.collect(queue, &node, false, scope);
            }
        }
    }

    fn has_directive(&self, node: &Node) -> bool {
        if node.is_element() {
            node.attribute_names()
                .iter()
                .any(|name| name.starts_with(&self.prefix))
        } else if node.is_text() {
            interpolation::has_mustache(&node.text_content())
        } else {
            false
        }
    }

    /// Elements whose descendants are compiled by their own directive.
    fn is_late_compile(&self, node: &Node) -> bool {
        ["if", "for", "pre"]
            .iter()
            .any(|name| node.has_attribute(&self.attr(name)))
    }

    fn compile_node(self: &Rc<Self>, node: &Node, scope: &Scope, directives: &mut Vec<Box<dyn Directive>>) {
        if node.is_element() {
            self.compile_element(node, scope, directives);
        } else if node.is_text() {
            self.compile_text(node, scope, directives);
        }
    }

    fn compile_element(self: &Rc<Self>, node: &Node, scope: &Scope, directives: &mut Vec<Box<dyn Directive>>) {
        let mut attrs: Vec<(String, String)> = node
            .attributes()
            .into_iter()
            .filter(|(name, _)| name.starts_with(&self.prefix))
            .collect();

        let for_attr = self.attr("for");
        if let Some(position) = attrs.iter().position(|(name, _)| *name == for_attr) {
            tracing::debug!(deferred = attrs.len() - 1, "for compiles first, other directives run per item");
            attrs = vec![attrs.swap_remove(position)];
        }

        for (name, expression) in attrs {
            let descriptor = Descriptor::parse(&name, &expression, &self.prefix);
            node.remove_attribute(&name);

            if descriptor.kind.is_some_and(|kind| kind.is_marker()) {
                continue;
            }
            self.instantiate(node, &descriptor, scope, directives);
        }
    }

    fn compile_text(self: &Rc<Self>, node: &Node, scope: &Scope, directives: &mut Vec<Box<dyn Directive>>) {
        let binding = match interpolation::parse(&node.text_content()) {
            Ok(Some(binding)) => binding,
            Ok(None) => return,
            Err(error) => {
                tracing::warn!(%error, "text interpolation skipped");
                return;
            }
        };

        let descriptor = match binding {
            TextBinding::Text(expression) => Descriptor::parse(&self.attr("text"), &expression, &self.prefix),
            TextBinding::Html(expression) => Descriptor::parse(&self.attr("html"), &expression, &self.prefix),
        };
        self.instantiate(node, &descriptor, scope, directives);
    }

    fn instantiate(self: &Rc<Self>, node: &Node, descriptor: &Descriptor, scope: &Scope, directives: &mut Vec<Box<dyn Directive>>) {
        let context = DirectiveContext {
            core: self,
            node,
            descriptor,
            scope,
        };
        match self.registry.create(&context) {
            Ok(directive) => directives.push(directive),
            Err(error) => {
                tracing::warn!(directive = %descriptor.attr, expression = %descriptor.expression, %error, "directive skipped");
            }
        }
    }
}

impl std::fmt::Debug for CompilerCore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompilerCore")
            .field("prefix", &self.prefix)
            .field("registry", &self.registry)
            .field("els", &self.els.borrow().keys().collect::<Vec<_>>())
            .finish()
    }
}

/// A compiled view bound to its model.
pub struct Compiler {
    core: Rc<CompilerCore>,
    element: Node,
    fragment: Node,
    model: RefCell<Option<Model>>,
    directives: RefCell<Vec<Box<dyn Directive>>>,
    compiled: Cell<bool>,
}

impl Compiler {
    /// Observe the model, compile the view and attach the result.
    pub fn new(options: CompilerOptions) -> Result<Self, CompileError> {
        let CompilerOptions {
            view,
            model,
            computed,
            customs,
            methods,
            prefix,
        } = options;

        if !dom::is_element(&view) {
            let error = CompileError::InvalidView;
            tracing::warn!(%error, "compiler not created");
            return Err(error);
        }
        if !model.is_object() {
            let error = CompileError::InvalidModel(model.type_name());
            tracing::warn!(%error, "compiler not created");
            return Err(error);
        }

        let runtime = Runtime::new();
        let fragment = dom::node_to_fragment(&view);
        let model = Observer::new(&runtime).observe_model(model)?;
        for (name, definition) in computed {
            model.define_computed(&name, definition.getter, definition.setter);
        }

        let core = CompilerCore::new(runtime, customs, prefix);
        let scope = Scope::root(model.clone(), Rc::new(methods));

        let compiler = Self {
            core,
            element: view,
            fragment,
            model: RefCell::new(Some(model)),
            directives: RefCell::new(Vec::new()),
            compiled: Cell::new(false),
        };

        let directives = compiler.core.compile_subtree(&compiler.fragment, true, &scope);
        tracing::debug!(directives = directives.len(), "view compiled");
        *compiler.directives.borrow_mut() = directives;
        compiler.check_root();

        Ok(compiler)
    }

    /// Reattach the compiled fragment, once.
    fn check_root(&self) {
        if !self.compiled.replace(true) {
            self.element.append_child(&self.fragment);
        }
    }

    /// The observed model, until [`destroy`](Self::destroy).
    pub fn model(&self) -> Option<Model> {
        self.model.borrow().clone()
    }

    /// The view element.
    pub fn element(&self) -> &Node {
        &self.element
    }

    /// A node registered with `el`.
    pub fn element_ref(&self, name: &str) -> Option<Node> {
        self.core.element_ref(name)
    }

    pub fn is_compiled(&self) -> bool {
        self.compiled.get()
    }

    /// Number of top-level directives. Directives created inside `if`,
    /// `for` and `html` bodies are owned by those directives.
    pub fn directive_count(&self) -> usize {
        self.directives.borrow().len()
    }

    pub fn runtime(&self) -> &Rc<Runtime> {
        self.core.runtime()
    }

    /// Release the model, empty the view and tear down every directive.
    pub fn destroy(&self) {
        self.model.borrow_mut().take();
        dom::empty(&self.element);
        let directives = std::mem::take(&mut *self.directives.borrow_mut());
        tracing::debug!(directives = directives.len(), "destroying compiler");
        destroy_all(directives);
    }
}

impl std::fmt::Debug for Compiler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Compiler")
            .field("element", &self.element)
            .field("compiled", &self.is_compiled())
            .field("directives", &self.directive_count())
            .finish()
    }
}
