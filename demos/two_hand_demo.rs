//! Two-hand scaling and menu selection demo.
//!
//! The right hand pinches a cube, the left hand pinches too, and pulling the
//! hands apart scales the cube. Then the left hand opens the menu, points at
//! an item and confirms it with a thumbs up.
//!
//! Run with: cargo run --example two_hand_demo

use glam::{Quat, Vec3};
use hand_gesture_agent::{
    config::Config,
    core::{
        menu::MenuItem, ClassifierAdapter, GesturePipeline, InteractableObject, MenuNavigator,
        PipelineEvent, TemplateModel,
    },
    tracking::{parse_script, HandPose, ScriptedTracker},
};

fn main() {
    println!("Two-Hand Demo");
    println!("=============");
    println!();

    let config = Config::default();
    let labels = config.labels.clone();
    let classifier = ClassifierAdapter::new(
        Box::new(TemplateModel::from_reference_poses(&labels)),
        labels,
    );

    let items = ["Undo", "Copy", "Paste", "Delete", "Close"]
        .iter()
        .map(|name| {
            let label = name.to_string();
            MenuItem::new(name.to_lowercase(), *name)
                .with_callback(Box::new(move || println!("  -> {label} activated")))
        })
        .collect();
    let menu = MenuNavigator::with_items(config.menu.clone(), items);

    let mut pipeline = GesturePipeline::new(&config, classifier).with_menu(menu);
    let cube = pipeline.add_object(InteractableObject::new(
        "cube",
        ScriptedTracker::RIGHT_HOME + Vec3::new(0.0, 0.0, 0.06),
    ));

    let right = parse_script("pinch:0.6,pinch:0.6:0.2/0/0,open_hand:2.0").expect("right script");
    let left = parse_script("pinch:0.6,pinch:0.6:-0.2/0/0,open_hand:0.5,thumbs_up:1.5")
        .expect("left script");
    let tracker = ScriptedTracker::new(left, right, config.tick_rate_hz);

    // Tilt the left hand so it points at the second menu segment.
    let tilt = Quat::from_rotation_x(-0.6);

    for mut frame in tracker {
        if frame.timestamp > 1.8 {
            frame.left = tilted(&frame.left, tilt);
        }
        for event in pipeline.tick(&frame) {
            match event {
                PipelineEvent::ScaleSessionStarted { baseline_distance, .. } => {
                    println!("[{:.2}s] scaling from {baseline_distance:.3} m", frame.timestamp)
                }
                PipelineEvent::ScaleSessionEnded { .. } => {
                    if let Some(object) = pipeline.interaction().object(cube) {
                        println!(
                            "[{:.2}s] scaling done, scale {:.2}",
                            frame.timestamp, object.scale.x
                        );
                    }
                }
                other => println!("[{:.2}s] {other:?}", frame.timestamp),
            }
        }
    }

    println!();
    println!("{}", pipeline.stats().summary());
}

/// Rotate a pose about its wrist.
fn tilted(pose: &HandPose, rotation: Quat) -> HandPose {
    let Some(wrist) = pose.joints.first().copied() else {
        return pose.clone();
    };
    HandPose {
        joints: pose
            .joints
            .iter()
            .map(|j| wrist + rotation * (*j - wrist))
            .collect(),
        ..pose.clone()
    }
}
