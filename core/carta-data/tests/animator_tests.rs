mod common;

use carta_data::selection::{CHANNEL, IMAGE};
use carta_data::{Animator, AnimatorType, Controller};
use carta_object::{ObjectError, ObjectRegistry};
use carta_state::SnapshotView;
use carta_types::ObjectPath;
use common::{controller_with_images, registry};
use pretty_assertions::assert_eq;

fn axis<'a>(registry: &'a ObjectRegistry, animator: &ObjectPath, kind: &str) -> &'a AnimatorType {
    let path = registry
        .get_as::<Animator>(animator)
        .unwrap()
        .animator_path(kind)
        .unwrap()
        .clone();
    registry.get_as::<AnimatorType>(&path).unwrap()
}

fn add_image_axis(registry: &mut ObjectRegistry, animator: &ObjectPath) -> ObjectPath {
    registry
        .dispatch(animator, "addAnimator", "type:image", None)
        .unwrap()
        .parse()
        .unwrap()
}

// ── Animator types ────────────────────────────────────────────────

#[test]
fn new_animator_has_channel_axis_only() {
    let mut registry = registry();
    let animator = registry.create(Animator::CLASS_NAME).unwrap();

    let owner = registry.get_as::<Animator>(&animator).unwrap();
    assert!(owner.animator_path(CHANNEL).is_some());
    assert!(owner.animator_path(IMAGE).is_none());

    let channel = axis(&registry, &animator, CHANNEL);
    assert_eq!(channel.kind(), CHANNEL);
    assert_eq!(channel.frame(), 0);
    assert_eq!(channel.upper_bound(), 0);
}

#[test]
fn add_animator_returns_path_and_publishes_it() {
    let mut registry = registry();
    let animator = registry.create(Animator::CLASS_NAME).unwrap();

    let image = add_image_axis(&mut registry, &animator);
    assert!(registry.get_as::<AnimatorType>(&image).is_some());

    let snapshot = registry.snapshot(SnapshotView::Preferences);
    let published = &snapshot[animator.as_str()]["animators"];
    assert_eq!(published[IMAGE], image.as_str());
    assert!(published[CHANNEL].is_string());
}

#[test]
fn add_animator_twice_reuses_existing_axis() {
    let mut registry = registry();
    let animator = registry.create(Animator::CLASS_NAME).unwrap();
    let first = add_image_axis(&mut registry, &animator);
    let before = registry.live_count();

    let second = add_image_axis(&mut registry, &animator);
    assert_eq!(first, second);
    assert_eq!(registry.live_count(), before);
}

#[test]
fn unknown_animator_type_is_rejected() {
    let mut registry = registry();
    let animator = registry.create(Animator::CLASS_NAME).unwrap();

    let result = registry.dispatch(&animator, "addAnimator", "type:stokes", None).unwrap();
    assert_eq!(result, "Unrecognized animation initialization type=stokes");

    let result = registry.dispatch(&animator, "removeAnimator", "type:stokes", None).unwrap();
    assert_eq!(result, "Error removing animator; unrecognized type=stokes");
}

#[test]
fn removed_animator_is_hidden_but_kept() {
    let mut registry = registry();
    let animator = registry.create(Animator::CLASS_NAME).unwrap();
    let image = add_image_axis(&mut registry, &animator);

    let result = registry.dispatch(&animator, "removeAnimator", "type:image", None).unwrap();
    assert_eq!(result, "");
    assert!(registry.get_as::<AnimatorType>(&image).unwrap().is_removed());
    let snapshot = registry.snapshot(SnapshotView::Preferences);
    assert!(snapshot[animator.as_str()]["animators"].get(IMAGE).is_none());

    assert_eq!(add_image_axis(&mut registry, &animator), image);
    assert!(!registry.get_as::<AnimatorType>(&image).unwrap().is_removed());
}

#[test]
fn destroying_animator_destroys_its_axes() {
    let mut registry = registry();
    let animator = registry.create(Animator::CLASS_NAME).unwrap();
    add_image_axis(&mut registry, &animator);
    assert_eq!(registry.live_count(), 3);

    registry.destroy_path(&animator).unwrap();
    assert_eq!(registry.live_count(), 0);
}

// ── Frame bounds ──────────────────────────────────────────────────

#[test]
fn linking_sets_upper_bounds_from_controller() {
    let mut registry = registry();
    let animator = registry.create(Animator::CLASS_NAME).unwrap();
    add_image_axis(&mut registry, &animator);
    let controller = controller_with_images(&mut registry, &[1, 4, 8]);

    assert!(registry.link(&animator, &controller).unwrap());

    assert_eq!(axis(&registry, &animator, IMAGE).upper_bound(), 2);
    assert_eq!(axis(&registry, &animator, CHANNEL).upper_bound(), 7);
}

#[test]
fn loading_an_image_updates_bounds_and_frame() {
    let mut registry = registry();
    let animator = registry.create(Animator::CLASS_NAME).unwrap();
    add_image_axis(&mut registry, &animator);
    let controller = controller_with_images(&mut registry, &[2]);
    registry.link(&animator, &controller).unwrap();

    registry
        .dispatch(&controller, "loadImage", "name:cube.fits,channels:16", None)
        .unwrap();

    let image = axis(&registry, &animator, IMAGE);
    assert_eq!(image.upper_bound(), 1);
    assert_eq!(image.frame(), 1);
    assert_eq!(axis(&registry, &animator, CHANNEL).upper_bound(), 15);
}

#[test]
fn image_bound_uses_largest_linked_controller() {
    let mut registry = registry();
    let animator = registry.create(Animator::CLASS_NAME).unwrap();
    add_image_axis(&mut registry, &animator);
    let small = controller_with_images(&mut registry, &[1]);
    let large = controller_with_images(&mut registry, &[1, 1, 1, 1]);
    registry.link(&animator, &small).unwrap();
    registry.link(&animator, &large).unwrap();
    assert_eq!(axis(&registry, &animator, IMAGE).upper_bound(), 3);

    registry.unlink(&animator, &large).unwrap();
    assert_eq!(axis(&registry, &animator, IMAGE).upper_bound(), 0);
}

#[test]
fn set_frame_outside_bounds_is_rejected() {
    let mut registry = registry();
    let animator = registry.create(Animator::CLASS_NAME).unwrap();
    let image = add_image_axis(&mut registry, &animator);
    let controller = controller_with_images(&mut registry, &[1, 1]);
    registry.link(&animator, &controller).unwrap();

    let result = registry.dispatch(&image, "setFrame", "frame:5", None).unwrap();
    assert_eq!(result, "Animation frame 5 out of range [0,1]");
    assert_eq!(registry.get_as::<AnimatorType>(&image).unwrap().frame(), 0);
}

#[test]
fn image_frame_moves_linked_controllers() {
    let mut registry = registry();
    let animator = registry.create(Animator::CLASS_NAME).unwrap();
    let image = add_image_axis(&mut registry, &animator);
    let controller = controller_with_images(&mut registry, &[1, 6]);
    registry.link(&animator, &controller).unwrap();
    assert_eq!(axis(&registry, &animator, CHANNEL).upper_bound(), 5);

    registry.dispatch(&image, "setFrame", "frame:1", None).unwrap();
    let result = registry.dispatch(&image, "setFrame", "frame:0", None).unwrap();
    assert_eq!(result, "");

    let view = registry.get_as::<Controller>(&controller).unwrap();
    assert_eq!(view.selected_image(), Some(0));
    assert_eq!(view.channel_high_key(), 0);
    assert_eq!(axis(&registry, &animator, CHANNEL).upper_bound(), 0);
}

#[test]
fn channel_frame_moves_linked_controllers() {
    let mut registry = registry();
    let animator = registry.create(Animator::CLASS_NAME).unwrap();
    let controller = controller_with_images(&mut registry, &[10]);
    registry.link(&animator, &controller).unwrap();
    let channel = registry
        .get_as::<Animator>(&animator)
        .unwrap()
        .animator_path(CHANNEL)
        .unwrap()
        .clone();

    let result = registry.dispatch(&channel, "setFrame", "frame:7", None).unwrap();
    assert_eq!(result, "");
    assert_eq!(registry.get_as::<Controller>(&controller).unwrap().channel_frame(), 7);
}

#[test]
fn playback_settings_are_validated() {
    let mut registry = registry();
    let animator = registry.create(Animator::CLASS_NAME).unwrap();
    let image = add_image_axis(&mut registry, &animator);

    assert_eq!(
        registry.dispatch(&image, "setFrameRate", "frameRate:0", None).unwrap(),
        "Frame rate must be a positive integer: frameRate:0"
    );
    assert_eq!(registry.dispatch(&image, "setFrameStep", "frameStep:3", None).unwrap(), "");
    assert_eq!(registry.dispatch(&image, "setEndBehavior", "endBehavior:reverse", None).unwrap(), "");
    assert_eq!(
        registry.dispatch(&image, "setEndBehavior", "endBehavior:bounce", None).unwrap(),
        "Unrecognized animation end behavior: bounce"
    );

    let snapshot = registry.snapshot(SnapshotView::Preferences);
    assert_eq!(snapshot[image.as_str()]["frameStep"], 3);
    assert_eq!(snapshot[image.as_str()]["endBehavior"], "Reverse");
}

#[test]
fn animator_only_links_to_controllers() {
    let mut registry = registry();
    let animator = registry.create(Animator::CLASS_NAME).unwrap();
    let other = registry.create(Animator::CLASS_NAME).unwrap();

    assert!(matches!(
        registry.link(&animator, &other),
        Err(ObjectError::InvalidTarget(_))
    ));
}
