use std::ops::{Deref, DerefMut};

use crate::graph::SceneGraph;

/// Edit scope guard.
///
/// Opens an edit on the graph when created and closes it when dropped, on
/// every exit path including `?` and panics. Guards nest: only the outermost
/// guard opens and closes the edit, inner guards are pass-through.
///
/// ```rust,ignore
/// let mut scope = ScopedEdit::new(&mut graph);
/// let node = scope.create_node(NodeKind::Group, "group");
/// scope.add_child(scope.root(), node);
/// // edit closed here
/// ```
pub struct ScopedEdit<'a, G: SceneGraph + ?Sized> {
    graph: &'a mut G,
    owns_edit: bool,
}

impl<'a, G: SceneGraph + ?Sized> ScopedEdit<'a, G> {
    pub fn new(graph: &'a mut G) -> Self {
        let owns_edit = !graph.is_editing();
        if owns_edit {
            graph.begin_edit();
        }
        Self { graph, owns_edit }
    }

    /// Whether this guard opened the edit (and will close it).
    #[must_use]
    pub fn is_outermost(&self) -> bool {
        self.owns_edit
    }
}

impl<G: SceneGraph + ?Sized> Deref for ScopedEdit<'_, G> {
    type Target = G;

    fn deref(&self) -> &Self::Target {
        self.graph
    }
}

impl<G: SceneGraph + ?Sized> DerefMut for ScopedEdit<'_, G> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.graph
    }
}

impl<G: SceneGraph + ?Sized> Drop for ScopedEdit<'_, G> {
    fn drop(&mut self) {
        if self.owns_edit {
            self.graph.end_edit();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::NodeKind;
    use crate::memory::MemorySceneGraph;

    #[test]
    fn closes_on_drop() {
        let mut graph = MemorySceneGraph::new();
        {
            let mut scope = ScopedEdit::new(&mut graph);
            assert!(scope.is_editing());
            scope.create_node(NodeKind::Group, "a");
        }
        assert!(!graph.is_editing());
        assert_eq!(graph.stats().scopes_opened, 1);
        assert_eq!(graph.stats().scopes_closed, 1);
    }

    #[test]
    fn nested_guards_share_one_edit() {
        let mut graph = MemorySceneGraph::new();
        {
            let mut outer = ScopedEdit::new(&mut graph);
            {
                let inner = ScopedEdit::new(&mut *outer);
                assert!(!inner.is_outermost());
            }
            assert!(outer.is_editing());
        }
        assert_eq!(graph.stats().scopes_opened, 1);
        assert!(!graph.is_editing());
    }

    #[test]
    fn closes_on_early_error() {
        fn translate() -> Result<(), &'static str> {
            Err("translator failed")
        }

        fn failing(graph: &mut MemorySceneGraph) -> Result<(), &'static str> {
            let mut scope = ScopedEdit::new(graph);
            scope.create_node(NodeKind::Mesh, "m");
            translate()?;
            scope.create_node(NodeKind::Mesh, "unreached");
            Ok(())
        }

        let mut graph = MemorySceneGraph::new();
        assert!(failing(&mut graph).is_err());
        assert!(!graph.is_editing());
        assert_eq!(graph.stats().mutations_outside_edit, 0);
    }

    #[test]
    fn works_through_trait_objects() {
        let mut graph = MemorySceneGraph::new();
        let dyn_graph: &mut dyn SceneGraph = &mut graph;
        {
            let mut scope = ScopedEdit::new(dyn_graph);
            let root = scope.root();
            let node = scope.create_node(NodeKind::Group, "g");
            scope.add_child(root, node);
        }
        assert_eq!(graph.children(graph.root()).len(), 1);
    }
}
