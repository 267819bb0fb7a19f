use nalgebra::Vector3;

use super::{GameEvent, GameSession, SessionState};
use crate::game::impact_events::impact_damage_for;
use crate::game::input::HeldKeys;
use crate::game::parcel::ParcelEvent;
use crate::game::scene::{EffectKind, SceneSink};

/// Executes simulation phases for one tick.
/// Ordered so forces from this tick's input are consumed by this tick's step,
/// and contact damage always comes from the step that just ran:
/// input -> physics -> contacts -> parcel -> scoring -> sync -> outcome.
pub(super) fn run_tick_phases(
    session: &mut GameSession,
    keys: HeldKeys,
    facing: Vector3<f32>,
    dt: f32,
    scene: &mut dyn SceneSink,
) {
    session.elapsed += dt;

    // Player input becomes forces/impulses on the ragdoll.
    session.courier.apply_input(&mut session.physics, keys, dt, facing);

    // Step physics in fixed sub-steps.
    let physics_config = &session.config.physics;
    session.last_substeps = session.physics.step(
        physics_config.timestep,
        dt,
        physics_config.max_substeps,
    );

    if let Some(parcel) = session.parcel.as_mut() {
        // Collision damage from contacts that began during this step.
        if let Some(body) = parcel.body_handle() {
            let damage = impact_damage_for(
                session.physics.contact_events(),
                body,
                session.config.parcel.impact_damage_threshold,
                session.config.parcel.impact_damage_multiplier,
            );
            for amount in damage {
                parcel.take_damage(&mut session.physics, amount);
            }
        }

        // Fall damage. A hard landing can also hit above, so one landing may
        // count twice; that stacking is intended.
        parcel.update(&mut session.physics);
    }

    // Stunt detection and live score terms.
    if let Some(sample) = session.courier.aerial_sample(&session.physics) {
        if session.scoring.update_aerial_detection(&sample, dt) {
            session.events.push(GameEvent::StuntLanded {
                stunts: session.scoring.aerial_stunts(),
            });
        }
    }
    if let Some(parcel) = session.parcel.as_ref() {
        session.scoring.update_integrity(parcel.health(), parcel.max_health());
    }
    session.scoring.update_time_bonus(session.elapsed);

    // Sync physics poses back to the scene.
    session.courier.update(&session.physics, scene);
    if let Some(parcel) = session.parcel.as_ref() {
        parcel.sync_visual(&session.physics, scene);
    }
    if let Some(torso) = session.courier.position(&session.physics) {
        scene.follow_camera(torso);
    }

    forward_parcel_events(session, scene);
    resolve_outcome(session);
}

/// Turn queued parcel events into game events and scene effects.
fn forward_parcel_events(session: &mut GameSession, scene: &mut dyn SceneSink) {
    let Some(parcel) = session.parcel.as_mut() else {
        return;
    };
    let position = parcel.position(&session.physics);

    for event in parcel.drain_events() {
        match event {
            ParcelEvent::Damaged { amount, health } => {
                if let Some(position) = position {
                    scene.spawn_effect(EffectKind::DamageSparks, position);
                }
                session.events.push(GameEvent::ParcelDamaged { amount, health });
            }
            ParcelEvent::Detached => {
                log::info!("[Session] Parcel knocked loose");
                session.events.push(GameEvent::ParcelDetached);
            }
            ParcelEvent::Exploded => {
                if let Some(position) = position {
                    scene.spawn_effect(EffectKind::Explosion, position);
                }
                session.events.push(GameEvent::ParcelExploded { position });
            }
        }
    }
}

/// Failure once the parcel is gone; delivery once the courier reaches the zone
/// with the parcel intact. Either way the level stops simulating.
fn resolve_outcome(session: &mut GameSession) {
    let exploded = session.parcel.as_ref().map_or(true, |p| p.is_exploded());
    if exploded {
        session.state = SessionState::Failed;
        log::info!("[Session] Level failed after {:.1}s", session.elapsed);
        return;
    }

    let Some(position) = session.courier.position(&session.physics) else {
        return;
    };
    if session.level_builder.check_delivery_reached(&position) {
        let score = session.scoring.breakdown();
        session.final_score = Some(score);
        session.state = SessionState::Delivered;
        log::info!(
            "[Session] Delivered in {:.1}s for {} points",
            session.elapsed,
            score.final_score
        );
        session.events.push(GameEvent::DeliveryReached { score });
    }
}
