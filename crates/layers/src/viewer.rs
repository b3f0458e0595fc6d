use foundation::GeoPoint;
use runtime::frame::Frame;
use scene::World;
use scene::camera::OrbitCamera;
use scene::picking::pick_screen;
use scene::prefabs::{Globe, GlobeOptions, mark_texture_failed, mark_texture_loaded, spawn_globe};
use scene::resources::DisposeReport;
use tracing::{error, info};

use crate::annotation::{Annotation, place_annotation};
use crate::config::ViewerConfig;
use crate::control::{ControlState, control_state};
use crate::error::LayerError;
use crate::fetch::FetchError;
use crate::layer::{LayerGroup, LayerKind};
use crate::lifecycle::{LayerSession, LoadTicket, Toggle, ToggleHost};
use crate::snapshot::SceneSnapshot;

/// Everything one page session owns: the scene, its camera, the layer
/// session and the current annotation.
pub struct Viewer {
    config: ViewerConfig,
    world: World,
    globe: Globe,
    camera: OrbitCamera,
    session: LayerSession,
    annotation: Option<Annotation>,
    frame: Frame,
}

impl Viewer {
    pub fn new(config: ViewerConfig) -> Self {
        let mut world = World::new();
        let globe = spawn_globe(
            &mut world,
            &GlobeOptions {
                texture_url: config.globe_texture_url.clone(),
                ..GlobeOptions::default()
            },
        );
        let camera = OrbitCamera::new(config.camera.orbit_settings());
        let session = LayerSession::from_config(&config);
        info!(
            longitude_offset = config.longitude_offset_deg,
            "viewer initialized"
        );
        Self {
            config,
            world,
            globe,
            camera,
            session,
            annotation: None,
            frame: Frame::default(),
        }
    }

    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn globe(&self) -> &Globe {
        &self.globe
    }

    pub fn camera(&self) -> &OrbitCamera {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut OrbitCamera {
        &mut self.camera
    }

    pub fn session(&self) -> &LayerSession {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut LayerSession {
        &mut self.session
    }

    pub fn annotation(&self) -> Option<&Annotation> {
        self.annotation.as_ref()
    }

    pub fn frame(&self) -> Frame {
        self.frame
    }

    pub fn toggle(&mut self, kind: LayerKind) -> Toggle {
        self.session.toggle(kind, &mut self.world)
    }

    pub fn complete_load(
        &mut self,
        ticket: LoadTicket,
        result: Result<String, FetchError>,
    ) -> Result<LayerGroup, LayerError> {
        self.session
            .complete_load(ticket, result, &mut self.world, &self.globe)
    }

    /// Refused once any layer has started loading, so every overlay keeps
    /// one longitude convention.
    pub fn set_longitude_offset(&mut self, offset_deg: f64) -> Result<(), LayerError> {
        self.session.set_longitude_offset(offset_deg)
    }

    pub fn control_state(&self, kind: LayerKind) -> ControlState {
        control_state(kind, self.session.state(kind))
    }

    pub fn set_globe_texture_loaded(&mut self, loaded: bool) {
        if loaded {
            mark_texture_loaded(&mut self.world, &self.globe);
        } else {
            mark_texture_failed(&mut self.world, &self.globe);
        }
    }

    /// One render-loop tick. Returns true while the camera is still settling.
    pub fn advance_frame(&mut self) -> bool {
        self.frame = self.frame.advance();
        self.session.notices_mut().set_frame(self.frame);
        self.camera.update()
    }

    /// Annotates the globe point under the pixel, replacing any previous
    /// annotation. Returns the clicked location, or `None` on a miss.
    pub fn on_double_click(&mut self, x_px: f64, y_px: f64) -> Option<GeoPoint> {
        let camera = &self.camera;
        let hit = pick_screen(&self.world, &self.globe, x_px, y_px, |x, y| {
            camera.ray_from_pixel(x, y)
        })?;
        match place_annotation(
            &mut self.world,
            &self.globe,
            self.session.projection(),
            &hit,
            self.annotation.take(),
        ) {
            Ok((annotation, _)) => {
                self.annotation = Some(annotation);
                Some(annotation.location)
            }
            Err(err) => {
                error!("annotation failed: {err}");
                None
            }
        }
    }

    pub fn snapshot(&self) -> SceneSnapshot {
        SceneSnapshot::extract(&self.world, &self.camera, self.frame)
    }

    /// Releases every scene resource. Layers return to `Unloaded`.
    pub fn teardown(&mut self) -> DisposeReport {
        self.annotation = None;
        self.session.reset();
        self.world.teardown()
    }
}

impl ToggleHost for Viewer {
    fn begin_toggle(&mut self, kind: LayerKind) -> (Toggle, Option<String>) {
        let toggle = self.toggle(kind);
        (toggle, self.session.source_url(kind).map(str::to_string))
    }

    fn finish_load(
        &mut self,
        ticket: LoadTicket,
        result: Result<String, FetchError>,
    ) -> Result<LayerGroup, LayerError> {
        self.complete_load(ticket, result)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};
    use std::collections::HashMap;
    use std::future::Future;
    use std::pin::Pin;
    use std::task::{Context, Poll};

    use foundation::math::{Projection, Vec3};
    use futures_util::future::join;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::fetch::DataFetcher;
    use crate::lifecycle::{LayerState, drive_toggle};

    const QUAKES: &str = "Date,Time,Latitude,Longitude,Depth,Magnitude,Location Source\n\
                          01/02/1965,13:44:18,19.246,145.616,131.6,6.0,ISCGEM\n\
                          01/04/1965,11:29:49,1.863,127.352,80.0,7.0,ISCGEM\n";

    const BORDERS: &str = r#"{"type": "FeatureCollection", "features": [
        {"type": "Feature", "properties": {"name": "A"},
         "geometry": {"type": "Polygon", "coordinates": [[[0, 0], [1, 0], [1, 1], [0, 0]]]}},
        {"type": "Feature", "properties": {"name": "B"},
         "geometry": {"type": "MultiPolygon", "coordinates": [
            [[[10, 10], [11, 10], [11, 11], [10, 10]]],
            [[[20, 20], [21, 20], [21, 21], [20, 20]]]
         ]}}
    ]}"#;

    /// Suspends once before completing, like a real network request.
    struct YieldOnce(bool);

    impl Future for YieldOnce {
        type Output = ();

        fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
            if self.0 {
                Poll::Ready(())
            } else {
                self.0 = true;
                cx.waker().wake_by_ref();
                Poll::Pending
            }
        }
    }

    #[derive(Default)]
    struct FakeFetcher {
        bodies: HashMap<String, Result<String, FetchError>>,
        calls: Cell<usize>,
    }

    impl FakeFetcher {
        fn with(mut self, url: &str, body: Result<&str, u16>) -> Self {
            let body = body.map(str::to_string).map_err(|status| FetchError::Status {
                url: url.to_string(),
                status,
            });
            self.bodies.insert(url.to_string(), body);
            self
        }
    }

    impl DataFetcher for FakeFetcher {
        async fn fetch_text(&self, url: &str) -> Result<String, FetchError> {
            self.calls.set(self.calls.get() + 1);
            YieldOnce(false).await;
            self.bodies
                .get(url)
                .cloned()
                .unwrap_or_else(|| Err(FetchError::Status { url: url.to_string(), status: 404 }))
        }
    }

    fn viewer() -> RefCell<Viewer> {
        RefCell::new(Viewer::new(ViewerConfig::default()))
    }

    #[test]
    fn interleaved_toggles_fetch_once() {
        let cell = viewer();
        let fetcher = FakeFetcher::default().with("./database.csv", Ok(QUAKES));
        let kind = LayerKind::Earthquakes;

        let (a, b) = pollster::block_on(join(
            drive_toggle(&cell, kind, &fetcher),
            drive_toggle(&cell, kind, &fetcher),
        ));
        assert!(matches!(a, Ok(Toggle::Fetch(_))));
        assert!(matches!(b, Ok(Toggle::Ignored)));
        assert_eq!(fetcher.calls.get(), 1);
        assert!(cell.borrow().session().state(kind).is_visible());

        let third = pollster::block_on(drive_toggle(&cell, kind, &fetcher));
        assert!(matches!(third, Ok(Toggle::Hidden)));
        assert_eq!(fetcher.calls.get(), 1);

        let fourth = pollster::block_on(drive_toggle(&cell, kind, &fetcher));
        assert!(matches!(fourth, Ok(Toggle::Shown)));
        assert_eq!(fetcher.calls.get(), 1);
    }

    #[test]
    fn two_rows_become_two_markers_at_projected_positions() {
        let cell = viewer();
        let fetcher = FakeFetcher::default().with("./database.csv", Ok(QUAKES));
        pollster::block_on(drive_toggle(&cell, LayerKind::Earthquakes, &fetcher)).expect("load");

        let viewer = cell.borrow();
        let group = viewer
            .session()
            .state(LayerKind::Earthquakes)
            .group()
            .expect("group");
        assert_eq!(group.count, 2);
        assert_eq!(viewer.world().parent(group.node), Some(viewer.globe().node));

        let markers = viewer.world().children(group.node);
        assert_eq!(markers.len(), 2);
        let projection = Projection::default();
        // Sorted by magnitude: the 7.0 quake comes first.
        let expected = [
            projection.project(GeoPoint::new(1.863, 127.352), 1.0).vec3(),
            projection.project(GeoPoint::new(19.246, 145.616), 1.0).vec3(),
        ];
        for (marker, expected) in markers.iter().zip(expected) {
            let transform = viewer.world().transform(*marker).expect("transform");
            assert!(transform.position.distance(expected) < 1e-12);
            // The disc faces the globe center.
            let facing = transform.rotation.rotate(Vec3::new(0.0, 0.0, 1.0));
            let inward = (Vec3::ZERO - expected).try_normalize().expect("inward");
            assert!(facing.distance(inward) < 1e-9);
        }
        let big = viewer.world().transform(markers[0]).expect("transform").scale;
        assert!((big - 0.004).abs() < 1e-12);
    }

    #[test]
    fn failed_fetch_then_retry() {
        let cell = viewer();
        let failing = FakeFetcher::default().with("/data/volcanoes.csv", Err(500));
        let result = pollster::block_on(drive_toggle(&cell, LayerKind::Volcanoes, &failing));
        assert!(matches!(result, Err(LayerError::Fetch(_))));
        assert_eq!(failing.calls.get(), 1);
        {
            let viewer = cell.borrow();
            assert_eq!(viewer.session().state(LayerKind::Volcanoes), &LayerState::Unloaded);
            assert_eq!(viewer.session().notices().notices().len(), 1);
        }

        let working = FakeFetcher::default().with("/data/volcanoes.csv", Ok("n,a,b\nEtna,37.7,15.0\n"));
        let retry = pollster::block_on(drive_toggle(&cell, LayerKind::Volcanoes, &working));
        assert!(matches!(retry, Ok(Toggle::Fetch(_))));
        assert_eq!(working.calls.get(), 1);
        assert!(cell.borrow().session().state(LayerKind::Volcanoes).is_visible());
    }

    #[test]
    fn layers_loaded_around_an_offset_change_stay_aligned() {
        let cell = viewer();
        let fetcher = FakeFetcher::default()
            .with(
                "./database.csv",
                Ok("Date,Time,Latitude,Longitude,Depth,Magnitude,Location Source\n\
                    01/02/1965,13:44:18,10,20,5,6.5,ISCGEM\n"),
            )
            .with("/data/volcanoes.csv", Ok("name,lat,lon\nSame,10,20\n"));

        pollster::block_on(drive_toggle(&cell, LayerKind::Earthquakes, &fetcher)).expect("quakes");
        let rejected = cell.borrow_mut().set_longitude_offset(0.0);
        assert!(matches!(rejected, Err(LayerError::ProjectionLocked(LayerKind::Earthquakes))));
        pollster::block_on(drive_toggle(&cell, LayerKind::Volcanoes, &fetcher)).expect("volcanoes");

        let viewer = cell.borrow();
        let first_marker = |kind: LayerKind| {
            let group = viewer.session().state(kind).group().expect("group");
            let marker = viewer.world().children(group.node)[0];
            viewer.world().transform(marker).expect("transform").position
        };
        let quake = first_marker(LayerKind::Earthquakes);
        let volcano = first_marker(LayerKind::Volcanoes);
        assert!(quake.distance(volcano) < 1e-12);
        assert_eq!(viewer.session().projection().longitude_offset_deg(), 90.0);
    }

    #[test]
    fn borders_draw_one_line_per_outer_ring() {
        let cell = viewer();
        let fetcher = FakeFetcher::default().with("/world_countries.json", Ok(BORDERS));
        pollster::block_on(drive_toggle(&cell, LayerKind::Borders, &fetcher)).expect("load");

        let viewer = cell.borrow();
        let snap = viewer.snapshot();
        assert_eq!(snap.lines.len(), 3);
        // All three lines share one material.
        let materials: std::collections::BTreeSet<u32> =
            snap.lines.iter().map(|l| l.material).collect();
        assert_eq!(materials.len(), 1);

        let first = &snap.geometries[&snap.lines[0].geometry];
        let scene::resources::Geometry::Polyline { points } = first else {
            panic!("border should be a polyline");
        };
        assert!((points[0].length() - 1.002).abs() < 1e-12);
    }

    #[test]
    fn hidden_layers_leave_the_snapshot() {
        let cell = viewer();
        let fetcher = FakeFetcher::default().with("./database.csv", Ok(QUAKES));
        pollster::block_on(drive_toggle(&cell, LayerKind::Earthquakes, &fetcher)).expect("load");
        assert_eq!(cell.borrow().snapshot().meshes.len(), 3);

        pollster::block_on(drive_toggle(&cell, LayerKind::Earthquakes, &fetcher)).expect("hide");
        let snap = cell.borrow().snapshot();
        assert_eq!(snap.meshes.len(), 1);
        assert!(snap.meshes.iter().all(|m| snap.geometries.contains_key(&m.geometry)));
    }

    #[test]
    fn double_click_annotates_and_replaces() {
        let mut viewer = Viewer::new(ViewerConfig::default());
        viewer.camera_mut().set_viewport(800.0, 600.0);

        let location = viewer.on_double_click(400.0, 300.0).expect("hit");
        assert!(location.latitude.abs() < 1e-9);
        let first = *viewer.annotation().expect("annotation");

        viewer.on_double_click(400.0, 300.0).expect("hit");
        let second = *viewer.annotation().expect("annotation");
        assert!(!viewer.world().contains(first.node));
        assert!(viewer.world().contains(second.node));

        // Only the latest stick and star remain.
        assert_eq!(viewer.snapshot().lines.len(), 2);

        assert_eq!(viewer.on_double_click(0.0, 0.0), None);
    }

    #[test]
    fn teardown_releases_each_resource_once() {
        let cell = viewer();
        let fetcher = FakeFetcher::default()
            .with("./database.csv", Ok(QUAKES))
            .with("/world_countries.json", Ok(BORDERS));
        pollster::block_on(drive_toggle(&cell, LayerKind::Earthquakes, &fetcher)).expect("quakes");
        pollster::block_on(drive_toggle(&cell, LayerKind::Borders, &fetcher)).expect("borders");
        cell.borrow_mut().camera_mut().set_viewport(800.0, 600.0);
        cell.borrow_mut().on_double_click(400.0, 300.0).expect("hit");

        let mut viewer = cell.borrow_mut();
        // Globe: sphere + material + texture. Quakes: disc + material.
        // Borders: three lines + material. Annotation: two lines + two materials.
        let report = viewer.teardown();
        assert_eq!(report.geometries, 1 + 1 + 3 + 2);
        assert_eq!(report.materials, 1 + 1 + 1 + 2);
        assert_eq!(report.textures, 1);
        assert_eq!(viewer.world().resources().geometry_count(), 0);
        assert_eq!(viewer.world().node_count(), 0);
        assert_eq!(viewer.session().state(LayerKind::Earthquakes), &LayerState::Unloaded);

        assert_eq!(viewer.teardown().geometries, 0);
    }

    #[test]
    fn frames_advance_and_stamp_notices() {
        let mut viewer = Viewer::new(ViewerConfig::default());
        viewer.advance_frame();
        viewer.advance_frame();
        assert_eq!(viewer.frame().index, 2);
        let Toggle::Fetch(ticket) = viewer.toggle(LayerKind::Borders) else {
            panic!("expected fetch");
        };
        let _ = viewer.complete_load(ticket, Ok("{}".to_string()));
        assert_eq!(viewer.session().notices().notices()[0].frame_index, 2);
        assert_eq!(viewer.snapshot().frame, 2);
    }

    #[test]
    fn texture_failure_uses_fallback_color() {
        let mut viewer = Viewer::new(ViewerConfig::default());
        viewer.set_globe_texture_loaded(false);
        let snap = viewer.snapshot();
        let globe_material = &snap.materials[&snap.meshes[0].material];
        assert_eq!(globe_material.material.color, scene::prefabs::GLOBE_FALLBACK_COLOR);
        assert_eq!(globe_material.map, None);
        assert_eq!(snap.meshes[0].node, viewer.globe().node.index());
    }
}
