use std::cell::Cell;

use unlogo::{
    Correspondence, Feature, FeatureEngine, FeatureSet, FilterConfig, FrameFilter, FrameReport,
    Homography, ImageView, Keypoint, MarkId, MarkSource, OwnedImage, Overlay, Unlogo, UnlogoError,
    UnlogoResult,
};

const WIDTH: usize = 160;
const HEIGHT: usize = 120;
const STRIDE: usize = WIDTH * 3 + 8;
const REF_SIZE: usize = 40;
const BACKGROUND: u8 = 40;
const OVERLAY_BGR: [u8; 3] = [0, 255, 0];

const REFERENCE_POINTS: [(f32, f32); 12] = [
    (3.0, 4.0),
    (35.0, 6.0),
    (12.0, 30.0),
    (28.0, 33.0),
    (20.0, 12.0),
    (7.0, 19.0),
    (31.0, 21.0),
    (16.0, 37.0),
    (24.0, 2.0),
    (2.0, 36.0),
    (37.0, 38.0),
    (18.0, 25.0),
];

/// Engine that "sees" the mark whenever pixel (0, 0) of the frame is white,
/// at a fixed translation.
#[derive(Debug)]
struct Scripted {
    placement: Homography,
    frame_extractions: Cell<usize>,
}

impl Scripted {
    fn new() -> Self {
        Self {
            placement: Homography::translation(50.0, 30.0),
            frame_extractions: Cell::new(0),
        }
    }

    fn features(points: impl Iterator<Item = (f32, f32)>) -> FeatureSet {
        FeatureSet::new(
            points
                .enumerate()
                .map(|(i, (x, y))| Feature {
                    keypoint: Keypoint {
                        x,
                        y,
                        score: 1.0,
                        angle: 0.0,
                    },
                    descriptor: [i as u8; 32],
                })
                .collect(),
        )
    }
}

impl FeatureEngine for Scripted {
    fn extract(&self, image: ImageView<'_>) -> UnlogoResult<FeatureSet> {
        if image.width() == REF_SIZE {
            return Ok(Self::features(REFERENCE_POINTS.iter().copied()));
        }
        self.frame_extractions.set(self.frame_extractions.get() + 1);
        if image.get(0, 0) != Some(255) {
            return Ok(FeatureSet::default());
        }
        Ok(Self::features(REFERENCE_POINTS.iter().map(|&(x, y)| {
            let p = self
                .placement
                .project(f64::from(x), f64::from(y))
                .expect("translation is affine");
            (p[0] as f32, p[1] as f32)
        })))
    }

    fn correspond(&self, reference: &FeatureSet, frame: &FeatureSet) -> Vec<Correspondence> {
        (0..reference.len().min(frame.len()))
            .map(|i| Correspondence {
                reference: i,
                frame: i,
                distance: 0,
            })
            .collect()
    }
}

fn source() -> MarkSource {
    MarkSource {
        name: "logo".to_string(),
        reference: OwnedImage::filled(REF_SIZE, REF_SIZE, &[200]).unwrap(),
        overlay: Overlay::opaque(OwnedImage::filled(20, 20, &OVERLAY_BGR).unwrap()),
    }
}

fn filter_with(config: FilterConfig) -> Unlogo<Scripted> {
    Unlogo::with_sources(config, Scripted::new(), vec![source()]).unwrap()
}

fn frame(mark_present: bool) -> Vec<u8> {
    let mut data = vec![BACKGROUND; STRIDE * HEIGHT];
    // Row padding carries a recognisable value.
    for y in 0..HEIGHT {
        data[y * STRIDE + WIDTH * 3..(y + 1) * STRIDE].fill(7);
    }
    if mark_present {
        data[..3].fill(255);
    }
    data
}

fn run(filter: &mut Unlogo<Scripted>, input: &[u8], output: &mut [u8]) -> UnlogoResult<FrameReport> {
    filter.process(
        [Some(output), None, None, None],
        [STRIDE, 0, 0, 0],
        [Some(input), None, None, None],
        [STRIDE, 0, 0, 0],
        WIDTH,
        HEIGHT,
    )
}

fn ghost(filter: &Unlogo<Scripted>) -> u32 {
    filter.registry().get(MarkId(0)).unwrap().track().ghost_frames()
}

fn pixel(buf: &[u8], x: usize, y: usize) -> [u8; 3] {
    let i = y * STRIDE + x * 3;
    [buf[i], buf[i + 1], buf[i + 2]]
}

#[test]
fn visible_mark_on_frame_zero_is_confirmed_and_drawn() {
    let mut filter = filter_with(FilterConfig::default());
    let input = frame(true);
    let mut output = vec![0u8; input.len()];

    let report = run(&mut filter, &input, &mut output).unwrap();
    assert_eq!(report.frame_index, 0);
    assert!(report.detection_ran);
    assert_eq!(report.detected.len(), 1);
    assert_eq!(report.detected[0].mark, MarkId(0));
    assert_eq!(report.detected[0].inliers, REFERENCE_POINTS.len());
    assert_eq!(report.active, vec![MarkId(0)]);
    assert_eq!(ghost(&filter), 0);

    let track = filter.registry().get(MarkId(0)).unwrap().track();
    let [x, y] = track.position().unwrap();
    assert!((x - 70.0).abs() < 1e-6 && (y - 50.0).abs() < 1e-6);

    // Reference 40x40 at (50, 30), overlay stretched over it.
    assert_eq!(pixel(&output, 50, 30), OVERLAY_BGR);
    assert_eq!(pixel(&output, 89, 69), OVERLAY_BGR);
    assert_eq!(pixel(&output, 49, 30), [BACKGROUND; 3]);
    assert_eq!(pixel(&output, 90, 69), [BACKGROUND; 3]);
    assert_eq!(pixel(&output, 0, 0), [255; 3]);
    // Padding is not part of the image and is left alone.
    assert_eq!(output[WIDTH * 3], 0);
    assert_eq!(filter.frame_index(), 1);
}

#[test]
fn absent_mark_coasts_between_scheduled_detections() {
    let mut filter = filter_with(FilterConfig::default());
    let mut output = vec![0u8; STRIDE * HEIGHT];
    run(&mut filter, &frame(true), &mut output).unwrap();
    assert_eq!(ghost(&filter), 0);

    let absent = frame(false);
    for idx in 1..=9u32 {
        let report = run(&mut filter, &absent, &mut output).unwrap();
        assert!(!report.detection_ran, "frame {idx}");
        assert_eq!(ghost(&filter), idx);
        assert_eq!(report.active, vec![MarkId(0)]);
        // Still drawn from the last placement.
        assert_eq!(pixel(&output, 60, 40), OVERLAY_BGR);
    }
    assert_eq!(filter.engine().frame_extractions.get(), 1);

    // Frame 10 is scheduled; the mark is not found, so it keeps decaying.
    let report = run(&mut filter, &absent, &mut output).unwrap();
    assert!(report.detection_ran);
    assert!(report.detected.is_empty());
    assert_eq!(ghost(&filter), 10);
    assert_eq!(filter.engine().frame_extractions.get(), 2);
}

#[test]
fn mark_is_dropped_once_past_the_allowance_and_recovered_later() {
    let mut filter = filter_with(FilterConfig {
        ghost_frames_allowed: 3,
        ..FilterConfig::default()
    });
    let mut output = vec![0u8; STRIDE * HEIGHT];
    run(&mut filter, &frame(true), &mut output).unwrap();

    let absent = frame(false);
    for _ in 1..=3 {
        let report = run(&mut filter, &absent, &mut output).unwrap();
        assert_eq!(report.active, vec![MarkId(0)]);
    }

    // Counter reaches 4 > 3: excluded and no longer painted.
    let report = run(&mut filter, &absent, &mut output).unwrap();
    assert!(!report.detection_ran);
    assert_eq!(ghost(&filter), 4);
    assert!(report.active.is_empty());
    assert_eq!(pixel(&output, 60, 40), [BACKGROUND; 3]);

    // Nothing on screen: the next frame detects even off-schedule.
    let report = run(&mut filter, &absent, &mut output).unwrap();
    assert_eq!(report.frame_index, 5);
    assert!(report.detection_ran);
    assert_eq!(ghost(&filter), 5);

    let report = run(&mut filter, &frame(true), &mut output).unwrap();
    assert!(report.detection_ran);
    assert_eq!(ghost(&filter), 0);
    assert_eq!(report.active, vec![MarkId(0)]);
    assert_eq!(pixel(&output, 60, 40), OVERLAY_BGR);
}

#[test]
fn detection_runs_exactly_on_policy_frames() {
    let interval = 4u64;
    let mut filter = filter_with(FilterConfig {
        matching_interval: interval,
        ..FilterConfig::default()
    });
    let mut output = vec![0u8; STRIDE * HEIGHT];
    let present = frame(true);
    let absent = frame(false);

    // Mark visible on 0..6, then gone for good.
    let mut previous_active = 0usize;
    for idx in 0..80u64 {
        let input = if idx < 6 { &present } else { &absent };
        let report = run(&mut filter, input, &mut output).unwrap();
        let expected = idx == 0 || idx % interval == 0 || previous_active == 0;
        assert_eq!(report.detection_ran, expected, "frame {idx}");
        assert_eq!(unlogo::should_detect(idx, interval, previous_active), expected);
        previous_active = report.active.len();
    }
    // Last confirmation on frame 4; counter 75 by frame 79.
    assert_eq!(ghost(&filter), 75);
}

#[test]
fn tracking_frames_are_idempotent() {
    let mut filter = filter_with(FilterConfig::default());
    let mut output = vec![0u8; STRIDE * HEIGHT];
    run(&mut filter, &frame(true), &mut output).unwrap();

    let input = frame(true);
    let mut first = vec![0u8; STRIDE * HEIGHT];
    let mut second = vec![0u8; STRIDE * HEIGHT];
    let a = run(&mut filter, &input, &mut first).unwrap();
    let b = run(&mut filter, &input, &mut second).unwrap();
    assert!(!a.detection_ran && !b.detection_ran);
    assert_eq!(a.active, b.active);
    assert_eq!(first, second);
}

#[test]
fn empty_input_fails_without_touching_anything() {
    let mut filter = filter_with(FilterConfig::default());
    let mut output = vec![0u8; STRIDE * HEIGHT];
    run(&mut filter, &frame(true), &mut output).unwrap();

    let mut sentinel = vec![0xAB; STRIDE * HEIGHT];
    let err = run(&mut filter, &[], &mut sentinel).unwrap_err();
    assert_eq!(err, UnlogoError::EmptyFrame);
    assert!(sentinel.iter().all(|&b| b == 0xAB));

    let err = filter
        .process(
            [Some(sentinel.as_mut_slice()), None, None, None],
            [STRIDE, 0, 0, 0],
            [None, None, None, None],
            [0; 4],
            WIDTH,
            HEIGHT,
        )
        .unwrap_err();
    assert_eq!(err, UnlogoError::EmptyFrame);
    assert!(sentinel.iter().all(|&b| b == 0xAB));

    // Frame counter and track did not move.
    assert_eq!(filter.frame_index(), 1);
    assert_eq!(ghost(&filter), 0);
}

#[test]
fn short_input_is_rejected_before_any_write() {
    let mut filter = filter_with(FilterConfig::default());
    let input = frame(true);
    let mut sentinel = vec![0xCD; STRIDE * HEIGHT];
    let err = run(&mut filter, &input[..STRIDE * 10], &mut sentinel).unwrap_err();
    assert!(matches!(err, UnlogoError::BufferTooSmall { .. }));
    assert!(sentinel.iter().all(|&b| b == 0xCD));
    assert_eq!(filter.frame_index(), 0);
    assert!(filter.registry().get(MarkId(0)).unwrap().track().transform().is_none());
}

#[test]
fn close_is_idempotent_and_final() {
    let mut filter = filter_with(FilterConfig::default());
    let mut output = vec![0u8; STRIDE * HEIGHT];
    run(&mut filter, &frame(true), &mut output).unwrap();
    assert_eq!(filter.registry().len(), 1);

    filter.close();
    assert!(filter.registry().is_empty());
    filter.close();
    assert!(filter.is_closed());
    assert!(filter.registry().is_empty());
    assert_eq!(filter.frame_index(), 1);
    assert_eq!(
        run(&mut filter, &frame(true), &mut output).unwrap_err(),
        UnlogoError::Closed
    );
}

#[test]
fn overlay_layout_must_match_the_frame_format() {
    let mut bad = source();
    bad.overlay = Overlay::opaque(OwnedImage::filled(20, 20, &[1, 2, 3, 4]).unwrap());
    let err = Unlogo::with_sources(FilterConfig::default(), Scripted::new(), vec![bad]).unwrap_err();
    assert_eq!(err, UnlogoError::ChannelMismatch { expected: 3, got: 4 });
}

#[test]
fn zero_interval_is_a_configuration_error() {
    let err = Unlogo::with_sources(
        FilterConfig {
            matching_interval: 0,
            ..FilterConfig::default()
        },
        Scripted::new(),
        vec![source()],
    )
    .unwrap_err();
    assert!(matches!(err, UnlogoError::InvalidConfig(_)));
}

#[test]
fn odd_argument_count_fails_before_loading() {
    assert_eq!(
        unlogo::parse_mark_args("logo.png:blank.png:other.png").unwrap_err(),
        UnlogoError::MalformedArguments { count: 3 }
    );
    #[cfg(feature = "image-io")]
    assert_eq!(
        Unlogo::open(FilterConfig::default(), "logo.png:blank.png:other.png").unwrap_err(),
        UnlogoError::MalformedArguments { count: 3 }
    );
}

const FIRST_TAG: u8 = 200;
const SECOND_TAG: u8 = 100;
const SECOND_BGR: [u8; 3] = [255, 0, 0];

/// Engine for two marks told apart by reference brightness. The first is
/// visible when frame pixel (0, 0) is white, the second when (1, 0) is.
#[derive(Debug)]
struct TwoMarks;

fn tagged(tag: u8, offset: (f32, f32)) -> impl Iterator<Item = Feature> {
    REFERENCE_POINTS
        .iter()
        .enumerate()
        .map(move |(i, &(x, y))| {
            let mut descriptor = [0u8; 32];
            descriptor[0] = tag;
            descriptor[1] = i as u8;
            Feature {
                keypoint: Keypoint {
                    x: x + offset.0,
                    y: y + offset.1,
                    score: 1.0,
                    angle: 0.0,
                },
                descriptor,
            }
        })
}

impl FeatureEngine for TwoMarks {
    fn extract(&self, image: ImageView<'_>) -> UnlogoResult<FeatureSet> {
        if image.width() == REF_SIZE {
            let tag = image.get(0, 0).unwrap_or(0);
            return Ok(FeatureSet::new(tagged(tag, (0.0, 0.0)).collect()));
        }
        let mut features = Vec::new();
        if image.get(0, 0) == Some(255) {
            features.extend(tagged(FIRST_TAG, (50.0, 30.0)));
        }
        if image.get(1, 0) == Some(255) {
            features.extend(tagged(SECOND_TAG, (100.0, 60.0)));
        }
        Ok(FeatureSet::new(features))
    }

    fn correspond(&self, reference: &FeatureSet, frame: &FeatureSet) -> Vec<Correspondence> {
        reference
            .descriptors()
            .enumerate()
            .filter_map(|(i, d)| {
                frame
                    .descriptors()
                    .position(|f| f == d)
                    .map(|j| Correspondence {
                        reference: i,
                        frame: j,
                        distance: 0,
                    })
            })
            .collect()
    }
}

fn two_mark_filter(config: FilterConfig) -> Unlogo<TwoMarks> {
    let mark = |name: &str, tag: u8, bgr: [u8; 3]| MarkSource {
        name: name.to_string(),
        reference: OwnedImage::filled(REF_SIZE, REF_SIZE, &[tag]).unwrap(),
        overlay: Overlay::opaque(OwnedImage::filled(20, 20, &bgr).unwrap()),
    };
    let sources = vec![
        mark("first", FIRST_TAG, OVERLAY_BGR),
        mark("second", SECOND_TAG, SECOND_BGR),
    ];
    Unlogo::with_sources(config, TwoMarks, sources).unwrap()
}

fn two_mark_frame(first: bool, second: bool) -> Vec<u8> {
    let mut data = frame(first);
    if second {
        data[3..6].fill(255);
    }
    data
}

fn ghosts<E: FeatureEngine>(filter: &Unlogo<E>) -> Vec<u32> {
    filter
        .registry()
        .iter()
        .map(|(_, mark)| mark.track().ghost_frames())
        .collect()
}

#[test]
fn one_detection_pass_confirms_one_mark_and_decays_the_other() {
    let mut filter = two_mark_filter(FilterConfig {
        matching_interval: 3,
        ..FilterConfig::default()
    });
    let mut output = vec![0u8; STRIDE * HEIGHT];

    let report = run_two(&mut filter, &two_mark_frame(true, true), &mut output);
    assert_eq!(report.detected.len(), 2);
    assert_eq!(ghosts(&filter), vec![0, 0]);
    assert_eq!(pixel(&output, 60, 40), OVERLAY_BGR);
    assert_eq!(pixel(&output, 110, 70), SECOND_BGR);

    let first_only = two_mark_frame(true, false);
    for _ in 1..3 {
        let report = run_two(&mut filter, &first_only, &mut output);
        assert!(!report.detection_ran);
    }
    assert_eq!(ghosts(&filter), vec![2, 2]);

    // Frame 3 is scheduled: only the first mark is found.
    let report = run_two(&mut filter, &first_only, &mut output);
    assert!(report.detection_ran);
    let found: Vec<_> = report.detected.iter().map(|d| d.mark).collect();
    assert_eq!(found, vec![MarkId(0)]);
    assert_eq!(ghosts(&filter), vec![0, 3]);
    assert_eq!(report.active, vec![MarkId(0), MarkId(1)]);

    // The missing mark keeps its last placement and is still drawn there.
    let second = filter.registry().get(MarkId(1)).unwrap().track();
    let [x, y] = second.position().unwrap();
    assert!((x - 120.0).abs() < 1e-6 && (y - 80.0).abs() < 1e-6);
    assert_eq!(pixel(&output, 110, 70), SECOND_BGR);
}

fn run_two(filter: &mut Unlogo<TwoMarks>, input: &[u8], output: &mut [u8]) -> FrameReport {
    filter
        .process(
            [Some(output), None, None, None],
            [STRIDE, 0, 0, 0],
            [Some(input), None, None, None],
            [STRIDE, 0, 0, 0],
            WIDTH,
            HEIGHT,
        )
        .unwrap()
}
