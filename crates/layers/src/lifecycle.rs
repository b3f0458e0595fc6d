//! Per-layer load/toggle state machine.
//!
//! Each layer moves through `Unloaded -> Loading -> Loaded(Visible)` and then
//! flips between `Loaded(Visible)` and `Loaded(Hidden)` for the rest of the
//! session. A fetch is started only from `Unloaded`; toggles that arrive while
//! a load is in flight are ignored. Failed loads fall back to `Unloaded` so
//! the user can retry.

use std::cell::RefCell;

use foundation::math::Projection;
use runtime::event_bus::{EventBus, Severity};
use scene::World;
use scene::components::Visibility;
use scene::prefabs::Globe;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::borders::BorderLayer;
use crate::config::ViewerConfig;
use crate::earthquakes::EarthquakeLayer;
use crate::error::LayerError;
use crate::fetch::{DataFetcher, FetchError};
use crate::layer::{BuildContext, Layer, LayerGroup, LayerKind};
use crate::volcanoes::VolcanoLayer;

/// Identifies one in-flight load. Only the ticket handed out by the most
/// recent `Unloaded -> Loading` transition is accepted.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct LoadTicket {
    pub kind: LayerKind,
    generation: u64,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Presence {
    Visible,
    Hidden,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct LoadedLayer {
    pub group: LayerGroup,
    pub presence: Presence,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum LayerState {
    Unloaded,
    Loading(LoadTicket),
    Loaded(LoadedLayer),
}

impl LayerState {
    pub fn label(&self) -> &'static str {
        match self {
            LayerState::Unloaded => "unloaded",
            LayerState::Loading(_) => "loading",
            LayerState::Loaded(LoadedLayer {
                presence: Presence::Visible,
                ..
            }) => "visible",
            LayerState::Loaded(LoadedLayer {
                presence: Presence::Hidden,
                ..
            }) => "hidden",
        }
    }

    pub fn group(&self) -> Option<LayerGroup> {
        match self {
            LayerState::Loaded(loaded) => Some(loaded.group),
            _ => None,
        }
    }

    pub fn is_visible(&self) -> bool {
        matches!(
            self,
            LayerState::Loaded(LoadedLayer {
                presence: Presence::Visible,
                ..
            })
        )
    }
}

/// What a toggle request decided.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Toggle {
    /// The layer entered `Loading`; fetch its source and complete the load.
    Fetch(LoadTicket),
    /// A load is already in flight.
    Ignored,
    Shown,
    Hidden,
}

#[derive(Debug, Clone)]
pub struct LayerSlot {
    kind: LayerKind,
    state: LayerState,
    generation: u64,
    loads_started: u32,
}

impl LayerSlot {
    pub fn new(kind: LayerKind) -> Self {
        Self {
            kind,
            state: LayerState::Unloaded,
            generation: 0,
            loads_started: 0,
        }
    }

    pub fn kind(&self) -> LayerKind {
        self.kind
    }

    pub fn state(&self) -> &LayerState {
        &self.state
    }

    /// How many times this slot has entered `Loading`.
    pub fn loads_started(&self) -> u32 {
        self.loads_started
    }

    pub fn toggle(&mut self, world: &mut World) -> Toggle {
        let decision = match &mut self.state {
            LayerState::Unloaded => None,
            LayerState::Loading(_) => Some(Toggle::Ignored),
            LayerState::Loaded(loaded) => Some(match loaded.presence {
                Presence::Visible => {
                    world.set_visibility(loaded.group.node, Visibility::hidden());
                    loaded.presence = Presence::Hidden;
                    Toggle::Hidden
                }
                Presence::Hidden => {
                    world.set_visibility(loaded.group.node, Visibility::visible());
                    loaded.presence = Presence::Visible;
                    Toggle::Shown
                }
            }),
        };
        let decision = decision.unwrap_or_else(|| self.start_load());
        debug!(layer = %self.kind, ?decision, state = self.state.label(), "layer toggled");
        decision
    }

    fn start_load(&mut self) -> Toggle {
        self.generation += 1;
        self.loads_started += 1;
        let ticket = LoadTicket {
            kind: self.kind,
            generation: self.generation,
        };
        self.state = LayerState::Loading(ticket);
        Toggle::Fetch(ticket)
    }

    fn check_ticket(&self, ticket: LoadTicket) -> Result<(), LayerError> {
        match self.state {
            LayerState::Loading(current) if current == ticket => Ok(()),
            _ => Err(LayerError::StaleTicket(self.kind)),
        }
    }

    fn finish(&mut self, group: Option<LayerGroup>) {
        self.state = match group {
            Some(group) => LayerState::Loaded(LoadedLayer {
                group,
                presence: Presence::Visible,
            }),
            None => LayerState::Unloaded,
        };
    }

    /// Forgets any group and invalidates outstanding tickets.
    fn reset(&mut self) {
        self.generation += 1;
        self.state = LayerState::Unloaded;
    }
}

/// All layer slots of one page session, plus the projection they share and
/// the notices they raise.
pub struct LayerSession {
    projection: Projection,
    slots: Vec<LayerSlot>,
    layers: Vec<Box<dyn Layer>>,
    notices: EventBus,
}

impl LayerSession {
    pub fn new(projection: Projection, layers: Vec<Box<dyn Layer>>) -> Self {
        let slots = LayerKind::ALL.into_iter().map(LayerSlot::new).collect();
        Self {
            projection,
            slots,
            layers,
            notices: EventBus::new(),
        }
    }

    pub fn from_config(config: &ViewerConfig) -> Self {
        let layers: Vec<Box<dyn Layer>> = vec![
            Box::new(EarthquakeLayer::new(
                config.sources.earthquakes_url.clone(),
                config.markers.clone(),
            )),
            Box::new(VolcanoLayer::new(
                config.sources.volcanoes_url.clone(),
                config.markers.volcano_radius,
            )),
            Box::new(BorderLayer::new(config.sources.borders_url.clone())),
        ];
        Self::new(Projection::new(config.longitude_offset_deg), layers)
    }

    pub fn projection(&self) -> &Projection {
        &self.projection
    }

    /// First layer that is not `Unloaded`, if any.
    pub fn busy_layer(&self) -> Option<LayerKind> {
        self.slots
            .iter()
            .find(|slot| *slot.state() != LayerState::Unloaded)
            .map(LayerSlot::kind)
    }

    /// Changes the longitude offset. Every layer shares one projection, so
    /// this is refused once any layer has started loading.
    pub fn set_longitude_offset(&mut self, offset_deg: f64) -> Result<(), LayerError> {
        if let Some(kind) = self.busy_layer() {
            warn!(layer = %kind, offset_deg, "rejecting longitude offset change");
            return Err(LayerError::ProjectionLocked(kind));
        }
        self.projection.set_longitude_offset(offset_deg);
        Ok(())
    }

    pub fn slot(&self, kind: LayerKind) -> &LayerSlot {
        &self.slots[kind.index()]
    }

    pub fn state(&self, kind: LayerKind) -> &LayerState {
        self.slot(kind).state()
    }

    fn layer(&self, kind: LayerKind) -> Option<&dyn Layer> {
        self.layers
            .iter()
            .find(|layer| layer.kind() == kind)
            .map(|layer| layer.as_ref())
    }

    pub fn source_url(&self, kind: LayerKind) -> Option<&str> {
        self.layer(kind).map(|layer| layer.source_url())
    }

    pub fn toggle(&mut self, kind: LayerKind, world: &mut World) -> Toggle {
        if self.layer(kind).is_none() {
            warn!(layer = %kind, "toggle for a layer with no data source");
            return Toggle::Ignored;
        }
        self.slots[kind.index()].toggle(world)
    }

    /// Applies the outcome of the fetch started by `ticket`.
    ///
    /// On success the layer's group is built under the globe and shown. Any
    /// failure returns the layer to `Unloaded` and raises a notice. A ticket
    /// that is not the slot's current load is rejected without touching the
    /// slot.
    pub fn complete_load(
        &mut self,
        ticket: LoadTicket,
        result: Result<String, FetchError>,
        world: &mut World,
        globe: &Globe,
    ) -> Result<LayerGroup, LayerError> {
        let kind = ticket.kind;
        if let Err(err) = self.slots[kind.index()].check_ticket(ticket) {
            warn!(layer = %kind, "discarding stale load result");
            return Err(err);
        }

        let built = match result {
            Ok(source) => match self.layer(kind) {
                Some(layer) => {
                    let mut ctx = BuildContext {
                        world,
                        globe,
                        projection: &self.projection,
                    };
                    layer.build(&source, &mut ctx)
                }
                None => Err(LayerError::Malformed(format!("no data source for {kind}"))),
            },
            Err(err) => Err(LayerError::Fetch(err)),
        };

        match built {
            Ok(group) => {
                self.slots[kind.index()].finish(Some(group));
                info!(layer = %kind, count = group.count, "layer loaded");
                Ok(group)
            }
            Err(err) => {
                self.slots[kind.index()].finish(None);
                error!(layer = %kind, "layer load failed: {err}");
                let severity = match err {
                    LayerError::Empty => Severity::Warning,
                    _ => Severity::Error,
                };
                self.notices.emit(
                    severity,
                    kind.name(),
                    format!("Could not load {kind} data: {err}"),
                );
                Err(err)
            }
        }
    }

    /// Loaded groups, in layer order.
    pub fn groups(&self) -> impl Iterator<Item = (LayerKind, LayerGroup)> + '_ {
        self.slots
            .iter()
            .filter_map(|slot| slot.state().group().map(|group| (slot.kind(), group)))
    }

    pub fn notices(&self) -> &EventBus {
        &self.notices
    }

    pub fn notices_mut(&mut self) -> &mut EventBus {
        &mut self.notices
    }

    /// Returns every slot to `Unloaded`. Used after the scene is torn down.
    pub fn reset(&mut self) {
        for slot in &mut self.slots {
            slot.reset();
        }
    }
}

/// Owner of a session that [`drive_toggle`] can borrow between awaits.
pub trait ToggleHost {
    /// Runs the synchronous half of a toggle and reports where to fetch from.
    fn begin_toggle(&mut self, kind: LayerKind) -> (Toggle, Option<String>);

    fn finish_load(
        &mut self,
        ticket: LoadTicket,
        result: Result<String, FetchError>,
    ) -> Result<LayerGroup, LayerError>;
}

/// Runs one toggle to completion, fetching the layer's source if needed.
///
/// The host is borrowed only before and after the fetch, never across it, so
/// toggles issued while a fetch is pending observe `Loading` and are ignored.
pub async fn drive_toggle<H, F>(
    host: &RefCell<H>,
    kind: LayerKind,
    fetcher: &F,
) -> Result<Toggle, LayerError>
where
    H: ToggleHost,
    F: DataFetcher,
{
    let (toggle, url) = host.borrow_mut().begin_toggle(kind);
    let Toggle::Fetch(ticket) = toggle else {
        return Ok(toggle);
    };

    let result = match url {
        Some(url) => fetcher.fetch_text(&url).await,
        None => Err(FetchError::Network {
            url: String::new(),
            message: format!("no data source for {kind}"),
        }),
    };
    host.borrow_mut().finish_load(ticket, result)?;
    Ok(toggle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use scene::prefabs::{GlobeOptions, spawn_globe};

    const QUAKES: &str = "Date,Time,Latitude,Longitude,Depth,Magnitude,Location Source\n\
                          01/02/1965,13:44:18,19.246,145.616,131.6,6.0,ISCGEM\n\
                          01/04/1965,11:29:49,1.863,127.352,80.0,5.8,ISCGEM\n";

    fn setup() -> (LayerSession, World, Globe) {
        let mut world = World::new();
        let globe = spawn_globe(&mut world, &GlobeOptions::default());
        let session = LayerSession::from_config(&ViewerConfig::default());
        (session, world, globe)
    }

    #[test]
    fn unloaded_toggle_starts_exactly_one_load() {
        let (mut session, mut world, _globe) = setup();
        let first = session.toggle(LayerKind::Earthquakes, &mut world);
        assert!(matches!(first, Toggle::Fetch(_)));
        assert_eq!(session.state(LayerKind::Earthquakes).label(), "loading");

        let second = session.toggle(LayerKind::Earthquakes, &mut world);
        assert_eq!(second, Toggle::Ignored);
        assert_eq!(session.slot(LayerKind::Earthquakes).loads_started(), 1);
    }

    #[test]
    fn longitude_offset_is_locked_once_a_layer_loads() {
        let (mut session, mut world, globe) = setup();
        session.set_longitude_offset(0.0).expect("idle");
        assert_eq!(session.projection().longitude_offset_deg(), 0.0);

        let Toggle::Fetch(ticket) = session.toggle(LayerKind::Earthquakes, &mut world) else {
            panic!("expected fetch");
        };
        assert!(matches!(
            session.set_longitude_offset(90.0),
            Err(LayerError::ProjectionLocked(LayerKind::Earthquakes))
        ));
        session
            .complete_load(ticket, Ok(QUAKES.to_string()), &mut world, &globe)
            .expect("load");
        assert!(session.set_longitude_offset(90.0).is_err());
        assert_eq!(session.projection().longitude_offset_deg(), 0.0);

        session.reset();
        assert_eq!(session.busy_layer(), None);
        session.set_longitude_offset(90.0).expect("reset");
    }

    #[test]
    fn loaded_layer_flips_without_rebuilding() {
        let (mut session, mut world, globe) = setup();
        let Toggle::Fetch(ticket) = session.toggle(LayerKind::Earthquakes, &mut world) else {
            panic!("expected fetch");
        };
        let group = session
            .complete_load(ticket, Ok(QUAKES.to_string()), &mut world, &globe)
            .expect("load");
        assert_eq!(group.count, 2);
        assert!(session.state(LayerKind::Earthquakes).is_visible());
        let nodes = world.node_count();

        assert_eq!(session.toggle(LayerKind::Earthquakes, &mut world), Toggle::Hidden);
        assert!(!world.is_effectively_visible(group.node));
        assert_eq!(session.toggle(LayerKind::Earthquakes, &mut world), Toggle::Shown);
        assert!(world.is_effectively_visible(group.node));

        assert_eq!(world.node_count(), nodes);
        assert_eq!(session.slot(LayerKind::Earthquakes).loads_started(), 1);
    }

    #[test]
    fn ticket_is_accepted_once() {
        let (mut session, mut world, globe) = setup();
        let Toggle::Fetch(ticket) = session.toggle(LayerKind::Earthquakes, &mut world) else {
            panic!("expected fetch");
        };
        session
            .complete_load(ticket, Ok(QUAKES.to_string()), &mut world, &globe)
            .expect("load");
        let again = session.complete_load(ticket, Ok(QUAKES.to_string()), &mut world, &globe);
        assert!(matches!(again, Err(LayerError::StaleTicket(LayerKind::Earthquakes))));
        assert!(session.state(LayerKind::Earthquakes).is_visible());
    }

    #[test]
    fn ticket_for_other_layer_is_stale() {
        let (mut session, mut world, globe) = setup();
        let Toggle::Fetch(ticket) = session.toggle(LayerKind::Earthquakes, &mut world) else {
            panic!("expected fetch");
        };
        session.reset();
        let result = session.complete_load(ticket, Ok(QUAKES.to_string()), &mut world, &globe);
        assert!(matches!(result, Err(LayerError::StaleTicket(_))));
        assert_eq!(session.state(LayerKind::Earthquakes), &LayerState::Unloaded);
    }

    #[test]
    fn failed_fetch_returns_to_unloaded_with_notice() {
        let (mut session, mut world, globe) = setup();
        let Toggle::Fetch(ticket) = session.toggle(LayerKind::Volcanoes, &mut world) else {
            panic!("expected fetch");
        };
        let err = FetchError::Status {
            url: "/data/volcanoes.csv".to_string(),
            status: 404,
        };
        let result = session.complete_load(ticket, Err(err), &mut world, &globe);
        assert!(matches!(result, Err(LayerError::Fetch(_))));
        assert_eq!(session.state(LayerKind::Volcanoes), &LayerState::Unloaded);
        assert_eq!(session.notices().notices().len(), 1);
        assert_eq!(session.notices().notices()[0].source, "volcanoes");
        assert_eq!(session.notices().notices()[0].severity, Severity::Error);

        assert!(matches!(
            session.toggle(LayerKind::Volcanoes, &mut world),
            Toggle::Fetch(_)
        ));
        assert_eq!(session.slot(LayerKind::Volcanoes).loads_started(), 2);
    }

    #[test]
    fn empty_source_is_a_warning() {
        let (mut session, mut world, globe) = setup();
        let Toggle::Fetch(ticket) = session.toggle(LayerKind::Volcanoes, &mut world) else {
            panic!("expected fetch");
        };
        let result =
            session.complete_load(ticket, Ok("name,lat,lon\n".to_string()), &mut world, &globe);
        assert!(matches!(result, Err(LayerError::Empty)));
        assert_eq!(session.notices().notices()[0].severity, Severity::Warning);
        assert_eq!(session.state(LayerKind::Volcanoes), &LayerState::Unloaded);
    }

    #[test]
    fn malformed_geojson_raises_notice() {
        let (mut session, mut world, globe) = setup();
        let Toggle::Fetch(ticket) = session.toggle(LayerKind::Borders, &mut world) else {
            panic!("expected fetch");
        };
        let result =
            session.complete_load(ticket, Ok(r#"{"type": "Nope"}"#.to_string()), &mut world, &globe);
        assert!(matches!(result, Err(LayerError::Malformed(_))));
        assert_eq!(session.notices().notices().len(), 1);
    }

    #[test]
    fn groups_hang_under_the_globe() {
        let (mut session, mut world, globe) = setup();
        let Toggle::Fetch(ticket) = session.toggle(LayerKind::Earthquakes, &mut world) else {
            panic!("expected fetch");
        };
        let group = session
            .complete_load(ticket, Ok(QUAKES.to_string()), &mut world, &globe)
            .expect("load");
        assert_eq!(world.parent(group.node), Some(globe.node));
        assert_eq!(world.name(group.node), Some("EarthquakeMarkersGroup"));
        let groups: Vec<_> = session.groups().collect();
        assert_eq!(groups, vec![(LayerKind::Earthquakes, group)]);
    }
}
