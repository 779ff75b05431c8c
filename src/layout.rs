use std::collections::HashMap;

use eframe::egui::{Vec2, vec2};

use crate::directory::Member;

pub const RING_RADIUS: f32 = 400.0;
const SCATTER_BASE_DISTANCE: f32 = 300.0;
const SCATTER_DISTANCE_RANGE: u32 = 400;
const SCATTER_SPREAD: u32 = 1200;
const SEED_DIGITS: usize = 8;

/// How a member's stable fields map onto the canvas.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum LayoutPolicy {
    /// Everyone on one ring, placed by their stored angle.
    #[default]
    Ring,
    /// A cloud around the origin, derived from the member id alone.
    Scatter,
}

impl LayoutPolicy {
    pub fn label(self) -> &'static str {
        match self {
            Self::Ring => "ring",
            Self::Scatter => "scatter",
        }
    }

    pub fn position(self, member: &Member) -> Vec2 {
        match self {
            Self::Ring => ring_position(member.layout_seed_angle),
            Self::Scatter => scatter_position(&member.id),
        }
    }
}

pub fn ring_position(angle_degrees: f32) -> Vec2 {
    let angle = angle_degrees.to_radians();
    vec2(angle.cos(), angle.sin()) * RING_RADIUS
}

/// Reads the first eight hex digits of the id as the seed. Ids that do not
/// carry enough hex digits fall back to an FNV-1a hash of the whole id.
pub fn layout_seed(id: &str) -> u32 {
    let digits = id
        .chars()
        .filter(char::is_ascii_hexdigit)
        .take(SEED_DIGITS)
        .collect::<String>();

    if digits.len() == SEED_DIGITS
        && let Ok(seed) = u32::from_str_radix(&digits, 16)
    {
        return seed;
    }

    fnv1a(id)
}

pub fn scatter_position(id: &str) -> Vec2 {
    let seed = layout_seed(id);
    let angle = ((seed % 360) as f32).to_radians();
    let distance = SCATTER_BASE_DISTANCE + ((seed >> 8) % SCATTER_DISTANCE_RANGE) as f32;
    let drift = (SCATTER_SPREAD / 2) as f32 - (seed % SCATTER_SPREAD) as f32;

    vec2(angle.cos() * distance, angle.sin() * distance + drift)
}

fn fnv1a(value: &str) -> u32 {
    value.bytes().fold(0x811c_9dc5_u32, |hash, byte| {
        (hash ^ u32::from(byte)).wrapping_mul(0x0100_0193)
    })
}

/// Positions memoized per member-list revision and policy. Only the cache is
/// invalidated on refresh; nothing here touches the viewport.
#[derive(Debug, Default)]
pub struct PositionCache {
    key: Option<(u64, LayoutPolicy)>,
    positions: HashMap<String, Vec2>,
}

impl PositionCache {
    pub fn refresh<'a>(
        &mut self,
        revision: u64,
        policy: LayoutPolicy,
        members: impl IntoIterator<Item = &'a Member>,
    ) -> bool {
        if self.key == Some((revision, policy)) {
            return false;
        }

        self.positions = members
            .into_iter()
            .map(|member| (member.id.clone(), policy.position(member)))
            .collect();
        self.key = Some((revision, policy));
        true
    }

    pub fn get(&self, member_id: &str) -> Option<Vec2> {
        self.positions.get(member_id).copied()
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use proptest::prelude::*;

    use super::*;

    fn member(id: &str, angle: f32) -> Member {
        Member {
            id: id.to_owned(),
            handle: format!("user_{id}"),
            photo_url: None,
            bio_text: "privacy is a right".to_owned(),
            joined_at: Utc::now(),
            layout_seed_angle: angle,
        }
    }

    #[test]
    fn ring_places_zero_angle_on_positive_x_axis() {
        let position = LayoutPolicy::Ring.position(&member("a1", 0.0));
        assert_eq!(position, vec2(400.0, 0.0));
    }

    #[test]
    fn ring_keeps_every_member_on_the_radius() {
        for angle in [12.5_f32, 90.0, 181.0, 359.9] {
            let position = ring_position(angle);
            assert!((position.length() - RING_RADIUS).abs() < 1e-3);
        }
    }

    #[test]
    fn seed_reads_leading_hex_digits_of_uuid() {
        assert_eq!(
            layout_seed("0000012c-aaaa-4bbb-8ccc-dddddddddddd"),
            0x0000_012c
        );
    }

    #[test]
    fn short_ids_fall_back_to_a_stable_hash() {
        assert_eq!(layout_seed("a1"), layout_seed("a1"));
        assert_ne!(layout_seed("a1"), layout_seed("a2"));
    }

    #[test]
    fn scatter_follows_seed_arithmetic() {
        // seed 300: angle 300 deg, distance 300 + 1, drift 600 - 300
        let position = scatter_position("0000012c-0000-4000-8000-000000000000");
        let angle = 300.0_f32.to_radians();
        assert!((position.x - angle.cos() * 301.0).abs() < 1e-3);
        assert!((position.y - (angle.sin() * 301.0 + 300.0)).abs() < 1e-3);
    }

    #[test]
    fn recomputing_an_unchanged_member_set_is_bit_identical() {
        let members = vec![member("a1", 0.0), member("b2", 137.5), member("c3", 275.0)];
        for policy in [LayoutPolicy::Ring, LayoutPolicy::Scatter] {
            let mut first = PositionCache::default();
            let mut second = PositionCache::default();
            first.refresh(1, policy, &members);
            second.refresh(1, policy, &members);

            for member in &members {
                let a = first.get(&member.id).unwrap();
                let b = second.get(&member.id).unwrap();
                assert_eq!(a.x.to_bits(), b.x.to_bits());
                assert_eq!(a.y.to_bits(), b.y.to_bits());
            }
        }
    }

    #[test]
    fn cache_recomputes_only_when_revision_or_policy_changes() {
        let members = vec![member("a1", 0.0)];
        let mut cache = PositionCache::default();

        assert!(cache.refresh(1, LayoutPolicy::Ring, &members));
        assert!(!cache.refresh(1, LayoutPolicy::Ring, &members));
        assert!(cache.refresh(1, LayoutPolicy::Scatter, &members));

        let grown = vec![member("a1", 0.0), member("b2", 90.0)];
        assert!(cache.refresh(2, LayoutPolicy::Scatter, &grown));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn removed_members_leave_no_stale_position() {
        let mut cache = PositionCache::default();
        cache.refresh(1, LayoutPolicy::Ring, &[member("a1", 0.0), member("b2", 90.0)]);
        cache.refresh(2, LayoutPolicy::Ring, &[member("b2", 90.0)]);

        assert!(cache.get("a1").is_none());
        assert!(cache.get("b2").is_some());
    }

    proptest! {
        #[test]
        fn layout_is_deterministic(id in "[0-9a-f-]{0,40}", angle in -720.0_f32..720.0) {
            let subject = member(&id, angle);
            for policy in [LayoutPolicy::Ring, LayoutPolicy::Scatter] {
                let a = policy.position(&subject);
                let b = policy.position(&subject);
                prop_assert_eq!(a.x.to_bits(), b.x.to_bits());
                prop_assert_eq!(a.y.to_bits(), b.y.to_bits());
            }
        }

        #[test]
        fn scatter_stays_inside_its_envelope(id in ".{0,40}") {
            let position = scatter_position(&id);
            prop_assert!(position.x.abs() <= 700.0);
            prop_assert!(position.y.abs() <= 700.0 + 600.0);
        }
    }
}
