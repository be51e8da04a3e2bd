use bridge_core::{BridgeError, Category, Result};
use bridge_scene::{NodeKind, ShaderDesc};

use crate::host::HostObject;
use crate::record::SceneObjectRecord;
use crate::translate::{ObjectTranslator, TranslateContext};

/// Light filters own a single transformed node; lights reference them by name.
pub struct LightFilterTranslator;

impl ObjectTranslator for LightFilterTranslator {
    fn category(&self) -> Category {
        Category::LightFilter
    }

    fn export(&self, cx: &mut TranslateContext<'_>, obj: &HostObject, db_name: &str) -> Result<SceneObjectRecord> {
        let node = cx.graph.create_node(NodeKind::LightFilter, db_name);
        let mut record = SceneObjectRecord::new(db_name, Category::LightFilter, node, obj.handle);
        if let Err(e) = self.update(cx, obj, &mut record) {
            cx.graph.delete_node(node);
            return Err(e);
        }
        Ok(record)
    }

    fn update(&self, cx: &mut TranslateContext<'_>, obj: &HostObject, record: &mut SceneObjectRecord) -> Result<()> {
        let Some(light) = obj.light.as_ref() else {
            return Err(BridgeError::translate(&record.db_name, "object has no light filter settings"));
        };
        let shader = ShaderDesc::new(&light.shader, &record.db_name).with_params(light.params.clone());
        cx.graph.set_shader(record.node, shader);
        cx.graph.set_transform(record.node, &[obj.matrix_world], &[]);
        Ok(())
    }
}
