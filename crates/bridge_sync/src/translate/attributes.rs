//! Object primvar and attribute export shared by every translator.

use bridge_core::tokens;
use bridge_core::{BridgeError, InheritRule, ParamList, ParamValue, Result};
use bridge_scene::NodeId;

use crate::host::{HostObject, HostScene, LightRole};
use crate::naming::{object_id, sanitize};
use crate::translate::TranslateContext;

/// Walks the primvar rows of the property table and sets them on `node`.
///
/// Falsy values are skipped. An inheritable primvar whose value equals its
/// inherit sentinel takes the scene-level value of the same property.
pub fn export_object_primvars(cx: &mut TranslateContext<'_>, obj: &HostObject, node: NodeId) -> Result<()> {
    let mut primvars = cx.graph.primvars(node).cloned().unwrap_or_default();
    let scene_props = &cx.host.settings().properties;

    for (meta, ri_name) in cx.config.object_properties.primvars() {
        let Some(mut value) = obj.properties.get(&meta.name) else {
            continue;
        };
        if !value.is_truthy() {
            continue;
        }
        if let Some(rule @ InheritRule::Value(_)) = &meta.inherit
            && rule.inherits(value, &obj.properties)
            && let Some(scene_value) = scene_props.get(&meta.name)
        {
            value = scene_value;
        }
        let converted = meta
            .param_type
            .convert(value, meta.array_size)
            .map_err(|e| BridgeError::param(ri_name, e))?;
        primvars.set(ri_name, converted);
    }

    cx.graph.set_primvars(node, primvars);
    Ok(())
}

/// Computes and sets the object attributes of `node`.
pub fn export_object_attributes(cx: &mut TranslateContext<'_>, obj: &HostObject, node: NodeId) -> Result<()> {
    let mut attrs = cx.graph.attributes(node).cloned().unwrap_or_default();
    apply_object_attributes(cx, obj, &mut attrs)?;
    cx.graph.set_attributes(node, attrs);
    Ok(())
}

/// Attribute computation, separated from the graph round trip.
pub fn apply_object_attributes(cx: &TranslateContext<'_>, obj: &HostObject, attrs: &mut ParamList) -> Result<()> {
    for (meta, ri_name) in cx.config.object_properties.attributes() {
        let Some(value) = obj.properties.get(&meta.name) else {
            continue;
        };
        if meta.inherit.as_ref().is_some_and(|rule| rule.inherits(value, &obj.properties)) {
            attrs.remove(ri_name);
            continue;
        }
        let converted = meta
            .param_type
            .convert(value, meta.array_size)
            .map_err(|e| BridgeError::param(ri_name, e))?;
        attrs.set(ri_name, converted);
    }

    let (membership, lpe_groups) = grouping_membership(cx.host, obj);
    attrs.set(tokens::GROUPING_MEMBERSHIP, membership);
    if let Some(lpe) = lpe_groups {
        attrs.set(tokens::IDENTIFIER_LPEGROUP, lpe);
    }

    for (name, value) in light_linking_attributes(cx.host, obj) {
        attrs.set(name, value);
    }

    if let Some(color) = obj.color {
        attrs.set(tokens::USER_CS, ParamValue::Color(color));
    }

    for (name, value) in obj.user_attributes.iter() {
        attrs.set(format!("{}{name}", tokens::USER_PREFIX), value.clone());
    }
    Ok(())
}

/// `grouping:membership` and the optional `identifier:lpegroup` trace set string.
#[must_use]
pub fn grouping_membership(host: &dyn HostScene, obj: &HostObject) -> (String, Option<String>) {
    let mut membership = format!("World,{}", obj.name);
    let mut lpe = String::from("*");
    for group in &host.settings().object_groups {
        if group.members.contains(&obj.handle) {
            membership.push(',');
            membership.push_str(&group.name);
            lpe.push(',');
            lpe.push_str(&group.name);
        }
    }
    let lpe = (lpe != "*").then_some(lpe);
    (membership, lpe)
}

/// Light-linking attributes of an object.
///
/// With inverted linking, lights (and filters) whose link rule names the
/// object come first, followed by every unlinked light; nothing is written
/// when no rule names the object. Otherwise the object's own exclude and
/// filter subsets are written, possibly empty. Token lists are space-joined
/// and keep host order.
#[must_use]
pub fn light_linking_attributes(host: &dyn HostScene, obj: &HostObject) -> Vec<(&'static str, String)> {
    let settings = host.settings();
    let name_of = |h| host.object(h).map(|o| sanitize(&o.name));

    if settings.invert_light_linking {
        let mut remaining_lights: Vec<String> = host.lights().iter().map(|l| sanitize(&l.name)).collect();
        let mut remaining_filters: Vec<String> = host.light_filters().iter().map(|l| sanitize(&l.name)).collect();
        let mut lighting_subset = Vec::new();
        let mut lightfilter_subset = Vec::new();

        for link in &settings.light_links {
            let Some(light) = host.object(link.light) else {
                continue;
            };
            let Some(role) = light.light.as_ref().map(|l| l.role) else {
                continue;
            };
            let name = sanitize(&light.name);
            let found = link.members.contains(&obj.handle);
            let (subset, remaining) = match role {
                LightRole::Light => (&mut lighting_subset, &mut remaining_lights),
                LightRole::Filter => (&mut lightfilter_subset, &mut remaining_filters),
            };
            if found {
                subset.push(name.clone());
            }
            remaining.retain(|n| *n != name);
        }

        let mut out = Vec::new();
        if !lighting_subset.is_empty() {
            lighting_subset.extend(remaining_lights);
            out.push((tokens::LIGHTING_SUBSET, lighting_subset.join(" ")));
        }
        if !lightfilter_subset.is_empty() {
            lightfilter_subset.extend(remaining_filters);
            out.push((tokens::LIGHTFILTER_SUBSET, lightfilter_subset.join(" ")));
        }
        out
    } else {
        let exclude: Vec<String> = obj.lighting_excludesubset.iter().filter_map(|h| name_of(*h)).collect();
        let filters: Vec<String> = obj.lightfilter_subset.iter().filter_map(|h| name_of(*h)).collect();
        vec![
            (tokens::LIGHTING_EXCLUDESUBSET, exclude.join(" ")),
            (tokens::LIGHTFILTER_SUBSET, filters.join(" ")),
        ]
    }
}

/// Sets `identifier:id` for a placement and returns the id.
pub fn set_object_id(attrs: &mut ParamList, persistent_id: [i32; 2], obj: &HostObject) -> i32 {
    let id = object_id(persistent_id, &obj.name);
    attrs.set(tokens::IDENTIFIER_ID, id);
    id
}

#[cfg(test)]
mod tests {
    use bridge_core::{HostHandle, SyncConfig};
    use bridge_scene::{MemorySceneGraph, NodeKind, SceneGraph, ScopedEdit};

    use super::*;
    use crate::host::{HostSnapshot, LightLink, ObjectGroup};

    fn h(raw: u64) -> HostHandle {
        HostHandle::new(raw)
    }

    fn lit_scene() -> HostSnapshot {
        let mut host = HostSnapshot::new();
        host.add_object(HostObject::mesh(h(1), "Cube"));
        host.add_object(HostObject::light(h(10), "Key", "PxrRectLight"));
        host.add_object(HostObject::light(h(11), "Fill", "PxrRectLight"));
        host.add_object(HostObject::light(h(12), "Rim", "PxrRectLight"));
        host.add_object(HostObject::light_filter(h(20), "Blocker", "PxrBlockerLightFilter"));
        host
    }

    #[test]
    fn membership_includes_groups_in_order() {
        let mut host = lit_scene();
        host.edit_settings(|s| {
            s.object_groups = vec![
                ObjectGroup { name: "hero".into(), members: vec![h(1)] },
                ObjectGroup { name: "bg".into(), members: vec![h(2)] },
                ObjectGroup { name: "fx".into(), members: vec![h(1)] },
            ];
        });
        let obj = host.object(h(1)).unwrap().clone();
        let (membership, lpe) = grouping_membership(&host, &obj);
        assert_eq!(membership, "World,Cube,hero,fx");
        assert_eq!(lpe.as_deref(), Some("*,hero,fx"));
    }

    #[test]
    fn no_groups_means_no_lpegroup() {
        let host = lit_scene();
        let obj = host.object(h(1)).unwrap().clone();
        assert_eq!(grouping_membership(&host, &obj).1, None);
    }

    #[test]
    fn inverted_linking_lists_linked_then_rest() {
        let mut host = lit_scene();
        host.edit_settings(|s| {
            s.invert_light_linking = true;
            s.light_links = vec![
                LightLink { light: h(11), members: vec![h(1)] },
                LightLink { light: h(12), members: vec![] },
                LightLink { light: h(20), members: vec![h(1)] },
            ];
        });
        let obj = host.object(h(1)).unwrap().clone();
        let attrs = light_linking_attributes(&host, &obj);
        assert_eq!(
            attrs,
            vec![
                (tokens::LIGHTING_SUBSET, "Fill Key".to_owned()),
                (tokens::LIGHTFILTER_SUBSET, "Blocker".to_owned()),
            ]
        );
    }

    #[test]
    fn inverted_linking_without_rule_writes_nothing() {
        let mut host = lit_scene();
        host.edit_settings(|s| s.invert_light_linking = true);
        let obj = host.object(h(1)).unwrap().clone();
        assert!(light_linking_attributes(&host, &obj).is_empty());
    }

    #[test]
    fn exclude_mode_writes_possibly_empty_lists() {
        let mut host = lit_scene();
        host.edit_object(h(1), |o| o.lighting_excludesubset = vec![h(12), h(10)]);
        let obj = host.object(h(1)).unwrap().clone();
        let attrs = light_linking_attributes(&host, &obj);
        assert_eq!(
            attrs,
            vec![
                (tokens::LIGHTING_EXCLUDESUBSET, "Rim Key".to_owned()),
                (tokens::LIGHTFILTER_SUBSET, String::new()),
            ]
        );
    }

    #[test]
    fn table_driven_attributes_and_primvars() {
        let config = SyncConfig::from_json_str(
            r#"{ "object_properties": [
                { "name": "dice_rate", "type": "float", "primvar": "dice:micropolygonlength", "inherit": -1.0 },
                { "name": "matte", "type": "int", "attribute": "Ri:Matte" },
                { "name": "shade_rate", "type": "float", "attribute": "shade:rate", "inherit": -1.0 }
            ] }"#,
        )
        .unwrap();

        let mut host = lit_scene();
        host.edit_settings(|s| s.properties.set("dice_rate", 0.25_f32));
        host.edit_object(h(1), |o| {
            o.properties.set("dice_rate", -1.0_f32);
            o.properties.set("matte", true);
            o.properties.set("shade_rate", -1.0_f32);
            o.user_attributes.set("asset", "hero_cube");
            o.color = Some([1.0, 0.0, 0.0]);
        });
        let obj = host.object(h(1)).unwrap().clone();

        let mut graph = MemorySceneGraph::new();
        let mut scope = ScopedEdit::new(&mut graph);
        let node = scope.create_node(NodeKind::Group, "Cube");
        {
            let mut cx = TranslateContext::new(&mut *scope, &host, &config);
            export_object_primvars(&mut cx, &obj, node).unwrap();
            export_object_attributes(&mut cx, &obj, node).unwrap();
        }
        drop(scope);

        let primvars = graph.primvars(node).unwrap();
        assert_eq!(primvars.get("dice:micropolygonlength"), Some(&ParamValue::Float(0.25)));

        let attrs = graph.attributes(node).unwrap();
        assert_eq!(attrs.get("Ri:Matte"), Some(&ParamValue::Int(1)));
        assert!(!attrs.contains("shade:rate"), "inheriting attributes are removed");
        assert_eq!(attrs.get_str("user:asset"), Some("hero_cube"));
        assert_eq!(attrs.get(tokens::USER_CS), Some(&ParamValue::Color([1.0, 0.0, 0.0])));
        assert_eq!(attrs.get_str(tokens::GROUPING_MEMBERSHIP), Some("World,Cube"));
    }

    #[test]
    fn bad_property_type_is_an_error() {
        let config = SyncConfig::from_json_str(
            r#"{ "object_properties": [ { "name": "trace", "type": "float", "attribute": "trace:bias" } ] }"#,
        )
        .unwrap();
        let mut host = lit_scene();
        host.edit_object(h(1), |o| o.properties.set("trace", "not a number"));
        let obj = host.object(h(1)).unwrap().clone();

        let mut graph = MemorySceneGraph::new();
        let mut scope = ScopedEdit::new(&mut graph);
        let node = scope.create_node(NodeKind::Group, "Cube");
        let mut cx = TranslateContext::new(&mut *scope, &host, &config);
        let err = export_object_attributes(&mut cx, &obj, node).unwrap_err();
        assert!(matches!(err, BridgeError::Param { .. }));
    }
}
