use bridge_core::{Category, ParamValue, Result, tokens};
use bridge_scene::{NodeKind, ShaderDesc};

use crate::host::HostMaterial;
use crate::naming::db_name;
use crate::record::MaterialRecord;
use crate::translate::TranslateContext;

/// Materials become shading network nodes bound to prototypes.
pub struct MaterialTranslator;

impl MaterialTranslator {
    pub fn export(&self, cx: &mut TranslateContext<'_>, mat: &HostMaterial, name: &str) -> Result<MaterialRecord> {
        let node = cx.graph.create_node(NodeKind::Material, name);
        let mut record = MaterialRecord {
            db_name: name.to_owned(),
            node,
            handle: mat.handle,
            has_meshlight: false,
            is_frame_sensitive: false,
        };
        self.update(cx, mat, &mut record)?;
        Ok(record)
    }

    /// Re-exports the shading network. `has_meshlight` is updated; callers
    /// compare it against the previous value to detect an emissive toggle.
    pub fn update(&self, cx: &mut TranslateContext<'_>, mat: &HostMaterial, record: &mut MaterialRecord) -> Result<()> {
        let mut params = mat.params.clone();
        if mat.emissive {
            let filters: Vec<String> = mat
                .light_filters
                .iter()
                .filter_map(|h| cx.host.object(*h))
                .map(|f| db_name(&f.name, Category::LightFilter))
                .collect();
            params.set(tokens::LIGHT_FILTER_PARAM, ParamValue::StringArray(filters));
        }
        cx.graph
            .set_shader(record.node, ShaderDesc::new(&mat.bxdf, &record.db_name).with_params(params));
        record.has_meshlight = mat.emissive;
        record.is_frame_sensitive = mat.frame_sensitive;
        Ok(())
    }
}
