use rapier3d::prelude::RigidBodyHandle;
use std::collections::HashSet;

use super::physics::ContactEvent;

/// Unordered pair of touching bodies, stored in a canonical order so
/// (a, b) and (b, a) hash the same.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BodyPair(pub RigidBodyHandle, pub RigidBodyHandle);

impl BodyPair {
    pub fn new(a: RigidBodyHandle, b: RigidBodyHandle) -> Self {
        if a.into_raw_parts() <= b.into_raw_parts() {
            Self(a, b)
        } else {
            Self(b, a)
        }
    }
}

/// Pairs touching now that were not touching after the previous sub-step.
pub fn began_contacts(current: &HashSet<BodyPair>, previous: &HashSet<BodyPair>) -> Vec<BodyPair> {
    current
        .iter()
        .filter(|pair| !previous.contains(pair))
        .copied()
        .collect()
}

/// Damage amounts for every contact involving `body` whose impact speed exceeds
/// `threshold`. Each qualifying contact yields `(speed - threshold) * multiplier`.
pub fn impact_damage_for(
    contacts: &[ContactEvent],
    body: RigidBodyHandle,
    threshold: f32,
    multiplier: f32,
) -> Vec<f32> {
    contacts
        .iter()
        .filter(|contact| contact.involves(body))
        .filter(|contact| contact.impact_speed > threshold)
        .map(|contact| (contact.impact_speed - threshold) * multiplier)
        .collect()
}
