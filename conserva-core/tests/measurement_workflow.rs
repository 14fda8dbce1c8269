//! Measurement Workflow Tests
//!
//! Drives the measurement session and layer manager together the way the
//! editor does:
//! - Committing completed measurements to the active layer
//! - Locked-layer rejection
//! - Calibration followed by measurement
//! - Undo/redo over committed annotations

use conserva_core::{
    Calibration, History, Key, LayerManager, MeasureOutcome, MeasureSession, MeasurementKind,
    Point, Shape, Style, Tool, Unit,
};

/// Commit a completed measurement the way the editor does.
fn commit(
    outcome: MeasureOutcome,
    manager: &mut LayerManager,
    history: &mut History,
) -> Option<String> {
    let MeasureOutcome::Completed(measurement) = outcome else {
        return None;
    };
    let label = measurement.label.clone();
    let before = manager.layers().to_vec();
    if manager.add_to_active(measurement.into_object(Style::default())) {
        history.snapshot(&before);
    }
    Some(label)
}

fn click_all(session: &mut MeasureSession, points: &[(f64, f64)]) -> MeasureOutcome {
    let mut last = MeasureOutcome::Ignored;
    for &(x, y) in points {
        last = session.click(Point::new(x, y));
    }
    last
}

// ============================================================================
// Commit Path
// ============================================================================

#[test]
fn test_distance_commit_appends_annotation() {
    let mut manager = LayerManager::new();
    let mut history = History::new();
    let mut session = MeasureSession::new(Calibration::pixels());

    session.select_tool(Tool::Measure(MeasurementKind::Distance));
    let outcome = click_all(&mut session, &[(0.0, 0.0), (3.0, 4.0)]);
    let label = commit(outcome, &mut manager, &mut history).expect("completed");

    assert_eq!(label, "5 px");
    let layer = manager.active_layer().expect("active layer");
    assert_eq!(layer.object_count(), 1);
    match &layer.objects[0].shape {
        Shape::Measurement { kind, label, .. } => {
            assert_eq!(*kind, MeasurementKind::Distance);
            assert_eq!(label, "5 px");
        }
        other => panic!("Expected measurement, got {other:?}"),
    }
    assert!(history.can_undo());
}

#[test]
fn test_locked_layer_drops_committed_measurement() {
    let mut manager = LayerManager::new();
    let mut history = History::new();
    let mut session = MeasureSession::new(Calibration::pixels());
    let id = manager.layers()[0].id.clone();
    manager.toggle_lock(&id);

    session.select_tool(Tool::Measure(MeasurementKind::Angle));
    let outcome = click_all(&mut session, &[(1.0, 0.0), (0.0, 0.0), (0.0, 1.0)]);
    assert!(commit(outcome, &mut manager, &mut history).is_some());

    assert_eq!(manager.layers()[0].object_count(), 0);
    assert!(!history.can_undo());
    assert_eq!(session.tool(), Tool::Idle);
}

#[test]
fn test_area_commit_and_undo_redo() {
    let mut manager = LayerManager::new();
    let mut history = History::new();
    let mut session = MeasureSession::new(Calibration::pixels());

    session.select_tool(Tool::Measure(MeasurementKind::Area));
    click_all(&mut session, &[(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)]);
    let label = commit(session.key(Key::Enter), &mut manager, &mut history).expect("completed");
    assert_eq!(label, "1 px² (perimeter 4 px)");

    let committed = manager.layers().to_vec();
    let restored = history.undo(manager.layers()).expect("undo");
    manager.replace_layers(restored);
    assert_eq!(manager.layers()[0].object_count(), 0);

    let redone = history.redo(manager.layers()).expect("redo");
    manager.replace_layers(redone);
    assert_eq!(manager.layers(), committed.as_slice());
}

// ============================================================================
// Calibration
// ============================================================================

#[test]
fn test_calibrated_measurement_reports_real_units() {
    let mut session = MeasureSession::new(Calibration::pixels());

    session.select_tool(Tool::Calibrating);
    let captured = click_all(&mut session, &[(100.0, 100.0), (300.0, 100.0)]);
    assert_eq!(
        captured,
        MeasureOutcome::ReferenceCaptured {
            pixel_distance: 200.0
        }
    );
    session
        .apply_known_distance(10.0, Unit::Cm)
        .expect("calibration");

    session.select_tool(Tool::Measure(MeasurementKind::Distance));
    let MeasureOutcome::Completed(m) = click_all(&mut session, &[(0.0, 0.0), (0.0, 200.0)]) else {
        panic!("distance should auto-complete");
    };
    assert_eq!(m.label, "10.00 cm");
    assert_eq!(m.unit, Unit::Cm);
}

#[test]
fn test_calibration_does_not_commit_annotation() {
    let mut manager = LayerManager::new();
    let mut history = History::new();
    let mut session = MeasureSession::new(Calibration::pixels());

    session.select_tool(Tool::Calibrating);
    let outcome = click_all(&mut session, &[(0.0, 0.0), (50.0, 0.0)]);
    assert!(commit(outcome, &mut manager, &mut history).is_none());
    assert_eq!(manager.layers()[0].object_count(), 0);
}

#[test]
fn test_angle_is_unaffected_by_scale() {
    let mut session = MeasureSession::new(Calibration::new(0.1, Unit::Mm).expect("valid"));
    session.select_tool(Tool::Measure(MeasurementKind::Angle));
    let MeasureOutcome::Completed(m) =
        click_all(&mut session, &[(10.0, 0.0), (0.0, 0.0), (10.0, 10.0)])
    else {
        panic!("angle should auto-complete");
    };
    assert_eq!(m.label, "45.0°");
}
