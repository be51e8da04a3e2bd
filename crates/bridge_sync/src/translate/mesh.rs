use bridge_core::{BridgeError, Category, ParamValue, Result, normalize_time_samples};
use bridge_scene::NodeKind;

use crate::host::HostObject;
use crate::record::SceneObjectRecord;
use crate::translate::{ObjectTranslator, TranslateContext};

/// Primvar holding the points of deformation sample `index`.
#[must_use]
pub fn points_primvar(index: usize) -> String {
    if index == 0 { "P".to_owned() } else { format!("P:{index}") }
}

/// Polygon meshes (and curves, which the renderer draws as geometry).
pub struct MeshTranslator;

impl ObjectTranslator for MeshTranslator {
    fn category(&self) -> Category {
        Category::Mesh
    }

    fn export(&self, cx: &mut TranslateContext<'_>, obj: &HostObject, db_name: &str) -> Result<SceneObjectRecord> {
        let node = cx.graph.create_node(NodeKind::Mesh, db_name);
        let mut record = SceneObjectRecord::new(db_name, Category::Mesh, node, obj.handle);
        if let Err(e) = self.update(cx, obj, &mut record) {
            cx.graph.delete_node(node);
            return Err(e);
        }
        Ok(record)
    }

    fn update(&self, cx: &mut TranslateContext<'_>, obj: &HostObject, record: &mut SceneObjectRecord) -> Result<()> {
        let Some(mesh) = obj.mesh.as_ref() else {
            return Err(BridgeError::translate(&record.db_name, "object has no mesh data"));
        };

        let mut primvars = cx.graph.primvars(record.node).cloned().unwrap_or_default();
        primvars.set("P", ParamValue::PointArray(mesh.points.clone()));
        primvars.set("nvertices", ParamValue::IntArray(mesh.face_counts.clone()));
        primvars.set("vertices", ParamValue::IntArray(mesh.face_indices.clone()));
        cx.graph.set_primvars(record.node, primvars);
        record.is_frame_sensitive = obj.frame_sensitive;

        if cx.config.settings.motion_blur && !obj.deform_samples.is_empty() {
            let times: Vec<f32> = obj.deform_samples.iter().map(|s| s.time).collect();
            record.motion_times = normalize_time_samples(&times);
            for index in 0..record.motion_times.len() {
                self.export_deform_sample(cx, record, obj, index)?;
            }
            cx.graph.set_primvar_times(record.node, &record.motion_times);
        } else if !record.motion_times.is_empty() {
            record.motion_times.clear();
            cx.graph.set_primvar_times(record.node, &[]);
        }
        Ok(())
    }

    fn export_deform_sample(
        &self,
        cx: &mut TranslateContext<'_>,
        record: &mut SceneObjectRecord,
        obj: &HostObject,
        time_sample: usize,
    ) -> Result<()> {
        let mut samples: Vec<_> = obj.deform_samples.iter().filter(|s| s.time.is_finite()).collect();
        samples.sort_by(|a, b| a.time.total_cmp(&b.time));
        let Some(sample) = samples.get(time_sample) else {
            return Err(BridgeError::translate(
                &record.db_name,
                format!("no deformation sample {time_sample}"),
            ));
        };

        let mut primvars = cx.graph.primvars(record.node).cloned().unwrap_or_default();
        primvars.set(points_primvar(time_sample), ParamValue::PointArray(sample.points.clone()));
        cx.graph.set_primvars(record.node, primvars);
        Ok(())
    }
}
