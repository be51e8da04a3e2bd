//! Renderer attribute and option names written by the sync engine.

pub const GROUPING_MEMBERSHIP: &str = "grouping:membership";
pub const IDENTIFIER_LPEGROUP: &str = "identifier:lpegroup";
pub const IDENTIFIER_ID: &str = "identifier:id";
pub const IDENTIFIER_NAME: &str = "identifier:name";

pub const LIGHTING_SUBSET: &str = "lighting:subset";
pub const LIGHTING_EXCLUDESUBSET: &str = "lighting:excludesubset";
pub const LIGHTFILTER_SUBSET: &str = "lightfilter:subset";

pub const USER_CS: &str = "user:Cs";
pub const USER_PREFIX: &str = "user:";

pub const RI_FRAME: &str = "Ri:Frame";
pub const RI_CROPWINDOW: &str = "Ri:CropWindow";
pub const RI_FORMAT_RESOLUTION: &str = "Ri:FormatResolution";
pub const RI_SHUTTER: &str = "Ri:Shutter";

/// Light filter references on a light shader.
pub const LIGHT_FILTER_PARAM: &str = "lightFilter";
/// Sample filter channel selection used by the viewport.
pub const SELECTED_CHANNEL: &str = "selectedChannel";
