use bridge_core::{ParamList, Result, tokens};
use bridge_scene::{NodeId, NodeKind};
use glam::Mat4;

use crate::host::HostObject;
use crate::translate::TranslateContext;
use crate::translate::attributes;

/// Instance groups: one group node per placement, parenting the shared prototype.
pub struct GroupTranslator;

impl GroupTranslator {
    pub fn export(&self, cx: &mut TranslateContext<'_>, key: &str) -> NodeId {
        cx.graph.create_node(NodeKind::Group, key)
    }

    pub fn update_transform(&self, cx: &mut TranslateContext<'_>, group: NodeId, matrix: Mat4) {
        cx.graph.set_transform(group, &[matrix], &[]);
    }

    /// Per-placement attributes: the object attributes plus `identifier:id`.
    /// Returns the id so the caller can keep the id → name map.
    pub fn export_object_attributes(
        &self,
        cx: &mut TranslateContext<'_>,
        obj: &HostObject,
        group: NodeId,
        persistent_id: [i32; 2],
    ) -> Result<i32> {
        let mut attrs = cx.graph.attributes(group).cloned().unwrap_or_else(ParamList::new);
        attributes::apply_object_attributes(cx, obj, &mut attrs)?;
        attrs.set(tokens::IDENTIFIER_NAME, obj.name.as_str());
        let id = attributes::set_object_id(&mut attrs, persistent_id, obj);
        cx.graph.set_attributes(group, attrs);
        Ok(id)
    }
}
