use bridge_core::{Category, Result};
use bridge_scene::NodeKind;

use crate::host::{HostObject, HostScene, ObjectKind};
use crate::record::SceneObjectRecord;
use crate::translate::{ObjectTranslator, TranslateContext};

/// Empties become transform groups. Objects parented to an exported empty
/// attach under its node and use their local matrix.
pub struct EmptyTranslator;

/// Whether `obj` is parented to an empty, so its placements nest under the empty's node.
#[must_use]
pub fn parented_to_empty(host: &dyn HostScene, obj: &HostObject) -> bool {
    obj.parent
        .and_then(|p| host.object(p))
        .is_some_and(|p| p.kind == ObjectKind::Empty)
}

impl ObjectTranslator for EmptyTranslator {
    fn category(&self) -> Category {
        Category::Empty
    }

    fn export(&self, cx: &mut TranslateContext<'_>, obj: &HostObject, db_name: &str) -> Result<SceneObjectRecord> {
        let node = cx.graph.create_node(NodeKind::Group, db_name);
        let mut record = SceneObjectRecord::new(db_name, Category::Empty, node, obj.handle);
        self.update(cx, obj, &mut record)?;
        Ok(record)
    }

    fn update(&self, cx: &mut TranslateContext<'_>, obj: &HostObject, record: &mut SceneObjectRecord) -> Result<()> {
        // Nesting under a parent empty switches this to the local matrix.
        cx.graph.set_transform(record.node, &[obj.matrix_world], &[]);

        if obj.export_as_coordsys {
            cx.graph.add_coordinate_system(record.node);
        } else {
            cx.graph.remove_coordinate_system(record.node);
        }
        Ok(())
    }
}
