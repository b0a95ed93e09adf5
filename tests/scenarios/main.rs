use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use trackshell::model::graph::SpotGraph;
use trackshell::model::selection::SelectionUpdateMode;
use trackshell::registries::algorithm::settings_from;
use trackshell::registries::{
    AlgorithmCategory, AlgorithmRegistry, AlgorithmStrategy, DefaultsContext, SettingValue,
    SettingsMap,
};
use trackshell::{
    CancelToken, DeletionReport, ExecutionContext, ExecutionResult, GraphListener, Model,
    SelectionTransaction, StrategyError, TrackingSession, TrackshellConfig, VERSION,
};

/// Detector placing `SPOTS_PER_FRAME` spots in every timepoint.
struct RowDetector;

impl AlgorithmStrategy for RowDetector {
    fn name(&self) -> &str {
        "Row detector"
    }

    fn default_settings(&self, ctx: &DefaultsContext) -> SettingsMap {
        settings_from([
            ("RADIUS", Some(SettingValue::Double(5.0))),
            ("SPOTS_PER_FRAME", Some(SettingValue::Int(3))),
            ("MAX_TIMEPOINT", Some(SettingValue::Int(i64::from(ctx.num_timepoints) - 1))),
        ])
    }

    fn run(&self, ctx: &ExecutionContext, settings: &SettingsMap) -> Result<(), StrategyError> {
        let per_frame = settings
            .get("SPOTS_PER_FRAME")
            .and_then(SettingValue::as_int)
            .ok_or_else(|| StrategyError::Failed("SPOTS_PER_FRAME unset".to_string()))?;
        let last = settings.get("MAX_TIMEPOINT").and_then(SettingValue::as_int).unwrap_or(0);
        let radius = settings.get("RADIUS").and_then(SettingValue::as_double).unwrap_or(1.0);
        for frame in 0..=last {
            ctx.cancel.check()?;
            ctx.model.edit_graph(|data| {
                for column in 0..per_frame {
                    data.add_spot(frame as u32, [column as f64 * 10.0, 0.0, 0.0], radius);
                }
            });
        }
        Ok(())
    }
}

/// Linker joining each spot to the spot with the same x in the next frame.
struct ColumnLinker;

impl AlgorithmStrategy for ColumnLinker {
    fn name(&self) -> &str {
        "Column linker"
    }

    fn default_settings(&self, _ctx: &DefaultsContext) -> SettingsMap {
        settings_from([("LINKING_MAX_DISTANCE", Some(SettingValue::Double(1.0)))])
    }

    fn run(&self, ctx: &ExecutionContext, _settings: &SettingsMap) -> Result<(), StrategyError> {
        ctx.model.edit_graph(|data| {
            let spots: Vec<_> = data
                .graph()
                .spots()
                .map(|(key, spot)| (key, spot.frame, spot.position[0]))
                .collect();
            for (source, frame, x) in &spots {
                if let Some((target, _, _)) = spots
                    .iter()
                    .find(|(_, other_frame, other_x)| *other_frame == frame + 1 && other_x == x)
                {
                    data.add_link(*source, *target, 0.0);
                }
            }
        });
        Ok(())
    }
}

#[derive(Default)]
struct CountingListener {
    calls: AtomicUsize,
}

impl GraphListener for CountingListener {
    fn graph_changed(&self, _graph: &SpotGraph) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

fn tracked_session(num_timepoints: u32) -> TrackingSession {
    let context = DefaultsContext { num_timepoints };
    let mut registry = AlgorithmRegistry::with_builtin_variants(context);
    registry.register(AlgorithmCategory::Detector, Arc::new(RowDetector));
    registry.register(AlgorithmCategory::Linker, Arc::new(ColumnLinker));

    let mut config = TrackshellConfig::default();
    config.tracking.default_detector = "Row detector".to_string();
    config.tracking.default_linker = "Column linker".to_string();
    config.tracking.num_timepoints = num_timepoints;

    let model = Arc::new(Model::with_max_undo_steps(config.undo.max_steps));
    TrackingSession::new(model, Arc::new(registry), &config.tracking).unwrap()
}

#[test]
fn scenarios_binary_smoke_runs() {
    assert!(!VERSION.is_empty());
}

#[test]
fn track_edit_undo_and_tag_scenario() {
    let session = tracked_session(5);
    let model = session.model().clone();

    assert_eq!(session.run(&CancelToken::new()), ExecutionResult::Success);
    let summary = model.summary();
    assert_eq!((summary.spots, summary.links, summary.tracks), (15, 12, 3));
    let after_tracking = model.checkpoint_count();

    // Delete the middle spot of the first track.
    let middle = {
        let data = model.read();
        data.graph()
            .spots()
            .find(|(_, spot)| spot.frame == 2 && spot.position[0] == 0.0)
            .map(|(key, _)| key)
            .unwrap()
    };
    let listener = Arc::new(CountingListener::default());
    model.add_graph_listener(listener.clone());
    model.select_spots([middle], SelectionUpdateMode::Replace);

    let report = SelectionTransaction::new(&model).delete_selection();

    assert_eq!(report, DeletionReport { spots_removed: 1, links_removed: 2 });
    assert_eq!(listener.calls.load(Ordering::SeqCst), 1);
    assert_eq!(model.checkpoint_count(), after_tracking + 1);
    assert_eq!(model.summary().tracks, 4);

    assert!(model.undo());
    assert_eq!(model.summary().spots, 15);
    assert!(model.redo());
    assert_eq!(model.summary().spots, 14);

    // Tag every spot of the last frame.
    model.create_tag_set("Fruits", &["Apple", "Banana", "Kiwi"]);
    model.set_tag_color("Fruits", "Kiwi", 0, 200, 0).unwrap();
    let last_frame: Vec<_> = model
        .read()
        .graph()
        .spots()
        .filter(|(_, spot)| spot.frame == 4)
        .map(|(key, _)| key)
        .collect();
    model.select_spots(last_frame.clone(), SelectionUpdateMode::Replace);

    let transaction = SelectionTransaction::new(&model);
    let tagged = transaction.tag_selection_with("Fruits", "Kiwi").unwrap();
    assert_eq!(tagged.spots_tagged, 3);
    assert!(transaction.tag_selection_with("Persons", "Tobias").is_err());
    transaction.clear_selection();

    let data = model.read();
    for key in &last_frame {
        assert_eq!(data.tags().spot_tag("Fruits", *key).unwrap().label, "Kiwi");
    }
    assert!(model.describe_tags().contains("    - Kiwi"));
    assert!(model.selection().is_empty());
}

#[test]
fn reconfigure_detector_scenario() {
    let mut session = tracked_session(3);

    session.set_detector_setting("RADIUS", 8.0).unwrap();
    assert!(session.set_detector_setting("RADIUS", "large").is_err());
    assert!(session.set_detector_setting("QUALITY", 1.0).is_err());

    session.use_detector("Advanced DoG detector").unwrap();
    session.set_detector_setting("ADD_BEHAVIOR", "DONTADD").unwrap();
    assert_eq!(
        session.detector().get_parameter("RADIUS"),
        Some(&SettingValue::Double(8.0))
    );
    assert_eq!(
        session.detector().get_parameter("MAX_TIMEPOINT"),
        Some(&SettingValue::Int(2))
    );

    // The catalogue entry has no backend: the run fails as data.
    assert!(matches!(
        session.run(&CancelToken::new()),
        ExecutionResult::Failed(_)
    ));
    assert_eq!(session.model().checkpoint_count(), 0);

    session.use_detector("Row detector").unwrap();
    assert_eq!(
        session.detector().get_parameter("SPOTS_PER_FRAME"),
        Some(&SettingValue::Int(3))
    );
    session.reset_detector_settings();
    assert_eq!(
        session.detector().get_parameter("RADIUS"),
        Some(&SettingValue::Double(5.0))
    );

    let catalogue = session
        .detector()
        .registry()
        .describe(AlgorithmCategory::Detector);
    assert!(catalogue.contains(" 2: 'Advanced DoG detector'"));
    assert!(catalogue.contains(" 3: 'Row detector'"));
}
