use bridge_core::{BridgeError, Category, HostHandle, ParamValue, Result, tokens};
use bridge_scene::{NodeKind, ShaderDesc};

use crate::host::HostObject;
use crate::naming::db_name;
use crate::record::SceneObjectRecord;
use crate::translate::{ObjectTranslator, TranslateContext};

/// Renderer lights. Lights are placed through instance groups like geometry.
pub struct LightTranslator;

impl LightTranslator {
    /// Re-exports only the light's filter references.
    pub fn update_light_filters(
        &self,
        cx: &mut TranslateContext<'_>,
        obj: &HostObject,
        record: &SceneObjectRecord,
    ) -> Result<()> {
        let shader = light_shader(cx, obj, &record.db_name)?;
        cx.graph.set_shader(record.node, shader);
        Ok(())
    }
}

/// Filters of a light that still exist in the host.
#[must_use]
pub fn live_filters(cx: &TranslateContext<'_>, obj: &HostObject) -> Vec<HostHandle> {
    obj.light
        .as_ref()
        .map(|l| {
            l.filters
                .iter()
                .copied()
                .filter(|h| cx.host.object(*h).is_some_and(|f| !f.hide_viewport))
                .collect()
        })
        .unwrap_or_default()
}

fn light_shader(cx: &TranslateContext<'_>, obj: &HostObject, handle: &str) -> Result<ShaderDesc> {
    let Some(light) = obj.light.as_ref() else {
        return Err(BridgeError::translate(handle, "object has no light settings"));
    };
    let filter_names: Vec<String> = live_filters(cx, obj)
        .into_iter()
        .filter_map(|h| cx.host.object(h))
        .map(|f| db_name(&f.name, Category::LightFilter))
        .collect();

    let mut params = light.params.clone();
    params.set(tokens::LIGHT_FILTER_PARAM, ParamValue::StringArray(filter_names));
    Ok(ShaderDesc::new(&light.shader, handle).with_params(params))
}


impl ObjectTranslator for LightTranslator {
    fn category(&self) -> Category {
        Category::Light
    }

    fn export(&self, cx: &mut TranslateContext<'_>, obj: &HostObject, db_name: &str) -> Result<SceneObjectRecord> {
        let node = cx.graph.create_node(NodeKind::Light, db_name);
        let mut record = SceneObjectRecord::new(db_name, Category::Light, node, obj.handle);
        if let Err(e) = self.update(cx, obj, &mut record) {
            cx.graph.delete_node(node);
            return Err(e);
        }
        Ok(record)
    }

    fn update(&self, cx: &mut TranslateContext<'_>, obj: &HostObject, record: &mut SceneObjectRecord) -> Result<()> {
        let shader = light_shader(cx, obj, &record.db_name)?;
        cx.graph.set_shader(record.node, shader);
        record.is_frame_sensitive = obj.frame_sensitive;
        Ok(())
    }
}
