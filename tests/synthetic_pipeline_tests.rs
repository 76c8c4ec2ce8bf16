use rangefinder_bridge::sensor::{Scene, SyntheticRangeFinder};
use rangefinder_bridge::transport::{ArtifactKind, ArtifactSink, FrameSummary};
use rangefinder_bridge::*;

const TIMESTEP_MS: u32 = 32;

/// Keeps only JSON summaries, the way a network transport would.
#[derive(Default)]
struct SummarySink {
    lines: Vec<String>,
    subscribers: usize,
}

impl SummarySink {
    fn summaries(&self) -> Vec<FrameSummary> {
        self.lines
            .iter()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    fn record(&mut self, summary: FrameSummary) -> Result<()> {
        let line = serde_json::to_string(&summary).map_err(|e| BridgeError::Transport(e.to_string()))?;
        self.lines.push(line);
        Ok(())
    }
}

impl ArtifactSink for SummarySink {
    fn publish_image(&mut self, image: &DepthImage) -> Result<()> {
        self.record(FrameSummary::from_image(image))
    }

    fn publish_camera_info(&mut self, info: &CameraInfo) -> Result<()> {
        self.record(FrameSummary::from_camera_info(info))
    }

    fn publish_point_cloud(&mut self, cloud: &PointCloud) -> Result<()> {
        self.record(FrameSummary::from_point_cloud(cloud))
    }

    fn image_subscriber_count(&self) -> usize {
        self.subscribers
    }
}

fn run_ticks(
    adapter: &mut RangeFinderAdapter<SyntheticRangeFinder, SummarySink>,
    now_ms: &mut u64,
    ticks: usize,
) -> Vec<StepOutcome> {
    (0..ticks)
        .map(|_| {
            *now_ms += u64::from(TIMESTEP_MS);
            adapter.sensor_mut().advance(TIMESTEP_MS);
            adapter.step(*now_ms)
        })
        .collect()
}

#[test]
fn test_consumer_lifecycle_drives_device() {
    let sensor = SyntheticRangeFinder::new(8, 6, 1.0, Scene::Plane { distance: 2.5 });
    let mut adapter =
        RangeFinderAdapter::init(Some(sensor), SummarySink::default(), RangeFinderConfig::new("rf"), TIMESTEP_MS, 0)
            .unwrap();
    let mut now_ms = 0;

    // Nobody listening: device stays off
    let outcomes = run_ticks(&mut adapter, &mut now_ms, 3);
    assert!(outcomes.iter().all(|o| *o == StepOutcome::Idle));
    assert!(!adapter.sensor().is_enabled());

    // A consumer connects: enable, then frames flow once the device sampled
    adapter.sink_mut().subscribers = 1;
    let outcomes = run_ticks(&mut adapter, &mut now_ms, 4);
    assert_eq!(outcomes[0], StepOutcome::Idle);
    assert!(adapter.sensor().is_enabled());
    assert_eq!(&outcomes[1..], [StepOutcome::Published; 3]);

    // The consumer leaves
    adapter.sink_mut().subscribers = 0;
    let outcomes = run_ticks(&mut adapter, &mut now_ms, 3);
    assert_eq!(outcomes, [StepOutcome::Published, StepOutcome::Idle, StepOutcome::Idle]);
    assert!(!adapter.sensor().is_enabled());

    let summaries = adapter.sink().summaries();
    assert_eq!(summaries[0].kind, ArtifactKind::CameraInfo);
    let images = summaries.iter().filter(|s| s.kind == ArtifactKind::DepthImage).count();
    let clouds = summaries.iter().filter(|s| s.kind == ArtifactKind::PointCloud).count();
    assert_eq!(images, 4);
    assert_eq!(clouds, 4);
}

#[test]
fn test_synthetic_plane_projects_to_principal_ray() {
    let sensor = SyntheticRangeFinder::new(8, 6, 1.0, Scene::Plane { distance: 2.5 });
    let mut config = RangeFinderConfig::new("rf");
    config.always_on = true;
    let mut adapter = RangeFinderAdapter::init(Some(sensor), SummarySink::default(), config, TIMESTEP_MS, 0).unwrap();

    let mut now_ms = 0;
    let outcomes = run_ticks(&mut adapter, &mut now_ms, 1);
    assert_eq!(outcomes, [StepOutcome::Published]);

    let cloud_summary = adapter
        .sink()
        .summaries()
        .into_iter()
        .find(|s| s.kind == ArtifactKind::PointCloud)
        .unwrap();
    assert_eq!(cloud_summary.center, Some([2.5, 0.0, 0.0]));
    assert_eq!(cloud_summary.finite_range, Some((2.5, 2.5)));
    assert_eq!(cloud_summary.bytes, 8 * 6 * 12);
}

#[test]
fn test_out_of_range_pixels_stay_in_cloud() {
    let scene = Scene::Ramp { near: 1.0, far: 10.0 };
    let sensor = SyntheticRangeFinder::new(4, 1, 1.0, scene).with_max_range(5.0);
    let mut config = RangeFinderConfig::new("rf");
    config.always_on = true;
    let mut adapter = RangeFinderAdapter::init(Some(sensor), SummarySink::default(), config, TIMESTEP_MS, 0).unwrap();

    let mut now_ms = 0;
    run_ticks(&mut adapter, &mut now_ms, 1);

    let cloud = adapter.point_cloud();
    assert_eq!(cloud.len(), 4);
    assert_eq!(cloud.point(0).unwrap()[0], 1.0);
    assert_eq!(cloud.point(1).unwrap()[0], 4.0);
    assert!(cloud.point(2).unwrap()[0].is_infinite());
    assert!(cloud.point(3).unwrap()[0].is_infinite());
    assert!(!cloud.is_dense);

    let image = adapter.depth_image();
    assert_eq!(image.pixel(3, 0), Some(f32::INFINITY));
}
