use bridge_core::{BridgeError, Category, ParamList, ParamValue, Result, SyncSettings, tokens};
use bridge_scene::{NodeKind, ShaderDesc};

use crate::host::{HostObject, SceneSettings};
use crate::record::SceneObjectRecord;
use crate::translate::{ObjectTranslator, TranslateContext};

/// Render and viewport cameras. A camera owns its node and carries its own transform.
pub struct CameraTranslator;

impl CameraTranslator {
    /// Updates the viewport camera: the regular update plus the viewport
    /// resolution option.
    pub fn update_viewport(
        &self,
        cx: &mut TranslateContext<'_>,
        obj: &HostObject,
        record: &mut SceneObjectRecord,
    ) -> Result<()> {
        self.update(cx, obj, record)?;
        let mut options = cx.graph.options().clone();
        options.set(
            tokens::RI_FORMAT_RESOLUTION,
            ParamValue::IntArray(viewport_resolution(cx.host.settings(), &cx.config.settings).to_vec()),
        );
        cx.graph.set_options(options);
        Ok(())
    }

    /// Transform only.
    pub fn update_transform(&self, cx: &mut TranslateContext<'_>, obj: &HostObject, record: &SceneObjectRecord) {
        cx.graph.set_transform(record.node, &[obj.matrix_world], &[]);
    }
}

#[must_use]
pub fn viewport_resolution(scene: &SceneSettings, settings: &SyncSettings) -> [i32; 2] {
    let scale = |v: u32| ((v as f32) * settings.viewport_res_mult).round().max(1.0) as i32;
    [scale(scene.resolution.0), scale(scene.resolution.1)]
}

impl ObjectTranslator for CameraTranslator {
    fn category(&self) -> Category {
        Category::Camera
    }

    fn export(&self, cx: &mut TranslateContext<'_>, obj: &HostObject, db_name: &str) -> Result<SceneObjectRecord> {
        let node = cx.graph.create_node(NodeKind::Camera, db_name);
        let mut record = SceneObjectRecord::new(db_name, Category::Camera, node, obj.handle);
        if let Err(e) = self.update(cx, obj, &mut record) {
            cx.graph.delete_node(node);
            return Err(e);
        }
        Ok(record)
    }

    fn update(&self, cx: &mut TranslateContext<'_>, obj: &HostObject, record: &mut SceneObjectRecord) -> Result<()> {
        let Some(camera) = obj.camera.as_ref() else {
            return Err(BridgeError::translate(&record.db_name, "object has no camera settings"));
        };
        let mut params = ParamList::new();
        params.set("fov", ParamValue::Float(camera.fov));
        params.set("nearClip", ParamValue::Float(camera.clip.0));
        params.set("farClip", ParamValue::Float(camera.clip.1));
        cx.graph
            .set_shader(record.node, ShaderDesc::new(&camera.projection, &record.db_name).with_params(params));
        self.update_transform(cx, obj, record);
        record.focus_object = camera.focus_object;
        Ok(())
    }
}
