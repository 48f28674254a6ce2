use bevy::math::DVec2;
use bevy::prelude::*;
use bevy::window::PrimaryWindow;
use std::collections::HashMap;

use crate::config::AppConfig;
use crate::geo::{GeoPoint, Projection};
use crate::render::{trail_alpha, viewport_to_world, RenderSink};

/// Length from the marker centre to its nose, in pixels.
const MARKER_SIZE: f32 = 9.0;
const BOUNDS_COLOR: Color = Color::srgba(0.5, 0.6, 0.7, 0.35);
const LABEL_FONT_SIZE: f32 = 11.0;
const LABEL_OFFSET: Vec2 = Vec2::new(0.0, -22.0);
const LABEL_Z: f32 = 10.0;

/// Text label following a rendered aircraft.
#[derive(Component)]
pub struct MarkerLabel {
    pub id: String,
}

/// Camera, viewport tracking and drawing of the render list.
pub struct MapPlugin;

impl Plugin for MapPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<RenderSink>()
            .add_systems(Startup, setup_map)
            .add_systems(
                Update,
                (
                    sync_viewport,
                    (draw_bounds, draw_aircraft, sync_labels).after(sync_viewport),
                ),
            );
    }
}

pub fn setup_map(mut commands: Commands, projection: Res<Projection>) {
    commands.spawn(Camera2d);
    let bounds = projection.bounds();
    info!(
        "Map covers lat {:.1}..{:.1}, lon {:.1}..{:.1}",
        bounds.south, bounds.north, bounds.west, bounds.east
    );
}

/// Keep the projection's viewport in step with the primary window.
pub fn sync_viewport(windows: Query<&Window, With<PrimaryWindow>>, mut projection: ResMut<Projection>) {
    let Ok(window) = windows.single() else {
        return;
    };
    let (width, height) = (window.width() as f64, window.height() as f64);
    if projection.set_viewport(width, height) {
        debug!("Viewport resized to {}x{}", width, height);
    }
}

pub fn draw_bounds(mut gizmos: Gizmos, projection: Res<Projection>) {
    let b = *projection.bounds();
    let corners = [
        GeoPoint::new(b.north, b.west),
        GeoPoint::new(b.north, b.east),
        GeoPoint::new(b.south, b.east),
        GeoPoint::new(b.south, b.west),
    ]
    .map(|p| viewport_to_world(projection.project(p), projection.viewport()));

    for i in 0..corners.len() {
        gizmos.line_2d(corners[i], corners[(i + 1) % corners.len()], BOUNDS_COLOR);
    }
}

/// Draw fading trails and oriented markers for the latest tick.
pub fn draw_aircraft(
    mut gizmos: Gizmos,
    sink: Res<RenderSink>,
    projection: Res<Projection>,
    config: Res<AppConfig>,
) {
    let viewport = projection.viewport();
    let to_world = |p: DVec2| viewport_to_world(p, viewport);

    for item in sink.items() {
        if config.trail.enabled && item.trail.len() >= 2 {
            let segments = item.trail.len() - 1;
            for (i, pair) in item.trail.windows(2).enumerate() {
                let alpha = trail_alpha(i, segments, config.trail.head_alpha, config.trail.tail_alpha);
                gizmos.line_2d(to_world(pair[0]), to_world(pair[1]), item.color.with_alpha(alpha));
            }
        }

        let center = to_world(item.position);
        let [nose, left, right] = marker_points(center, item.heading.screen_angle() as f32);
        gizmos.line_2d(nose, left, item.color);
        gizmos.line_2d(left, right, item.color);
        gizmos.line_2d(right, nose, item.color);
    }
}

/// Spawn, move and despawn labels so there is exactly one per render item.
pub fn sync_labels(
    mut commands: Commands,
    sink: Res<RenderSink>,
    projection: Res<Projection>,
    mut labels: Query<(Entity, &MarkerLabel, &mut Text2d, &mut Transform)>,
) {
    if !sink.is_changed() {
        return;
    }
    let viewport = projection.viewport();
    let mut pending: HashMap<&str, usize> = sink
        .items()
        .iter()
        .enumerate()
        .map(|(i, item)| (item.id.as_str(), i))
        .collect();

    for (entity, label, mut text, mut transform) in labels.iter_mut() {
        let Some(index) = pending.remove(label.id.as_str()) else {
            commands.entity(entity).despawn();
            continue;
        };
        let item = &sink.items()[index];
        let position = viewport_to_world(item.position, viewport) + LABEL_OFFSET;
        transform.translation = position.extend(LABEL_Z);
        let content = label_text(item);
        if **text != content {
            **text = content;
        }
    }

    for index in pending.into_values() {
        let item = &sink.items()[index];
        let position = viewport_to_world(item.position, viewport) + LABEL_OFFSET;
        commands.spawn((
            Name::new(format!("Label: {}", item.label)),
            Text2d::new(label_text(item)),
            TextFont {
                font_size: LABEL_FONT_SIZE,
                ..default()
            },
            TextColor(item.color),
            Transform::from_translation(position.extend(LABEL_Z)),
            MarkerLabel { id: item.id.clone() },
        ));
    }
}

fn label_text(item: &crate::render::RenderItem) -> String {
    format!("{}\n{}", item.label, item.readout.label())
}

/// Arrowhead triangle around `center` pointing along `angle` (radians,
/// counter-clockwise from +x).
pub fn marker_points(center: Vec2, angle: f32) -> [Vec2; 3] {
    let forward = Vec2::from_angle(angle);
    let wing = 140f32.to_radians();
    [
        center + forward * MARKER_SIZE,
        center + Vec2::from_angle(angle + wing) * MARKER_SIZE * 0.7,
        center + Vec2::from_angle(angle - wing) * MARKER_SIZE * 0.7,
    ]
}
