use bridge_core::{Category, ParamValue, Result};
use bridge_scene::NodeKind;

use crate::host::HostObject;
use crate::record::SceneObjectRecord;
use crate::translate::{ObjectTranslator, TranslateContext};

/// Volumes are exported as bounded volume primitives.
pub struct VolumeTranslator;

/// `[xmin, xmax, ymin, ymax, zmin, zmax]` of the object's points, or a unit box.
fn bound(obj: &HostObject) -> Vec<f32> {
    let points = obj.mesh.as_ref().map(|m| m.points.as_slice()).unwrap_or_default();
    if points.is_empty() {
        return vec![-0.5, 0.5, -0.5, 0.5, -0.5, 0.5];
    }
    let mut min = [f32::MAX; 3];
    let mut max = [f32::MIN; 3];
    for p in points {
        for axis in 0..3 {
            min[axis] = min[axis].min(p[axis]);
            max[axis] = max[axis].max(p[axis]);
        }
    }
    vec![min[0], max[0], min[1], max[1], min[2], max[2]]
}

impl ObjectTranslator for VolumeTranslator {
    fn category(&self) -> Category {
        Category::Volume
    }

    fn export(&self, cx: &mut TranslateContext<'_>, obj: &HostObject, db_name: &str) -> Result<SceneObjectRecord> {
        let node = cx.graph.create_node(NodeKind::Volume, db_name);
        let mut record = SceneObjectRecord::new(db_name, Category::Volume, node, obj.handle);
        self.update(cx, obj, &mut record)?;
        Ok(record)
    }

    fn update(&self, cx: &mut TranslateContext<'_>, obj: &HostObject, record: &mut SceneObjectRecord) -> Result<()> {
        let mut primvars = cx.graph.primvars(record.node).cloned().unwrap_or_default();
        primvars.set("Ri:Bound", ParamValue::FloatArray(bound(obj)));
        cx.graph.set_primvars(record.node, primvars);
        record.is_frame_sensitive = obj.frame_sensitive;
        Ok(())
    }
}
