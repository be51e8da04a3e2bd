use bridge_core::{BridgeError, ParamValue, Result};
use bridge_scene::NodeKind;

use crate::host::{HostObject, ParticleSystem};
use crate::record::ParticleRecord;
use crate::translate::TranslateContext;

/// Emitter particle systems, exported as point clouds.
///
/// Instancer particle systems are not exported here; their placements come
/// through the instance enumeration like any other instance.
pub struct ParticlesTranslator;

impl ParticlesTranslator {
    pub fn export(
        &self,
        cx: &mut TranslateContext<'_>,
        obj: &HostObject,
        psys: &ParticleSystem,
        db_name: &str,
    ) -> Result<ParticleRecord> {
        let node = cx.graph.create_node(NodeKind::Points, db_name);
        let mut record = ParticleRecord {
            db_name: db_name.to_owned(),
            node,
            settings: psys.settings,
        };
        if let Err(e) = self.update(cx, obj, psys, &mut record) {
            cx.graph.delete_node(node);
            return Err(e);
        }
        Ok(record)
    }

    pub fn update(
        &self,
        cx: &mut TranslateContext<'_>,
        obj: &HostObject,
        psys: &ParticleSystem,
        record: &mut ParticleRecord,
    ) -> Result<()> {
        let Some(settings) = cx.host.particle_settings(psys.settings) else {
            return Err(BridgeError::MissingSource(format!(
                "particle settings '{}' on '{}'",
                psys.name, obj.name
            )));
        };
        let width = settings.width;

        let mut primvars = cx.graph.primvars(record.node).cloned().unwrap_or_default();
        primvars.set("P", ParamValue::PointArray(psys.points.clone()));
        primvars.set("constantwidth", ParamValue::Float(width));
        cx.graph.set_primvars(record.node, primvars);
        record.settings = psys.settings;
        Ok(())
    }
}
