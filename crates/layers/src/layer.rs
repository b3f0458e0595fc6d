use std::fmt;
use std::str::FromStr;

use foundation::math::Projection;
use scene::World;
use scene::entity::NodeId;
use scene::prefabs::Globe;
use serde::Serialize;

use crate::error::LayerError;

/// The overlay datasets the viewer knows about.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LayerKind {
    Earthquakes,
    Volcanoes,
    Borders,
}

impl LayerKind {
    pub const ALL: [LayerKind; 3] = [
        LayerKind::Earthquakes,
        LayerKind::Volcanoes,
        LayerKind::Borders,
    ];

    pub fn name(self) -> &'static str {
        match self {
            LayerKind::Earthquakes => "earthquakes",
            LayerKind::Volcanoes => "volcanoes",
            LayerKind::Borders => "borders",
        }
    }

    /// Name of the renderable group node.
    pub fn group_name(self) -> &'static str {
        match self {
            LayerKind::Earthquakes => "EarthquakeMarkersGroup",
            LayerKind::Volcanoes => "VolcanoMarkersGroup",
            LayerKind::Borders => "CountryBordersGroup",
        }
    }

    pub(crate) fn index(self) -> usize {
        match self {
            LayerKind::Earthquakes => 0,
            LayerKind::Volcanoes => 1,
            LayerKind::Borders => 2,
        }
    }
}

impl fmt::Display for LayerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownLayer(pub String);

impl fmt::Display for UnknownLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown layer: {}", self.0)
    }
}

impl std::error::Error for UnknownLayer {}

impl FromStr for LayerKind {
    type Err = UnknownLayer;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LayerKind::ALL
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownLayer(s.to_string()))
    }
}

/// Where a layer builds its group.
pub struct BuildContext<'a> {
    pub world: &'a mut World,
    pub globe: &'a Globe,
    pub projection: &'a Projection,
}

/// A built renderable group: one node parented under the globe.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct LayerGroup {
    pub node: NodeId,
    pub count: usize,
}

/// A dataset overlay: turns fetched source text into a renderable group.
pub trait Layer {
    fn kind(&self) -> LayerKind;

    fn source_url(&self) -> &str;

    fn build(&self, source: &str, ctx: &mut BuildContext<'_>) -> Result<LayerGroup, LayerError>;
}

/// Spawns the layer's group node under the globe.
pub(crate) fn spawn_group(
    ctx: &mut BuildContext<'_>,
    kind: LayerKind,
) -> Result<NodeId, LayerError> {
    let group = ctx.world.spawn_named(kind.group_name());
    if let Err(err) = ctx.world.add_child(ctx.globe.node, group) {
        let _ = ctx.world.despawn_recursive(group);
        return Err(LayerError::Build(err));
    }
    Ok(group)
}
