//! Proximity collisions and program swapping
//!
//! Two actors collide when their centres are closer than the configured
//! distance. A colliding pair trades programs and both restart from the top.
//! Each actor takes part in at most one swap per tick.

use serde::Serialize;
use std::collections::HashSet;

use super::actor::{Actor, ActorId};
use super::timer::TimerQueue;

/// Unordered actor pair, stored with the smaller id first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct CollisionPair(pub ActorId, pub ActorId);

impl CollisionPair {
    /// Normalize the pair ordering
    pub fn new(a: ActorId, b: ActorId) -> Self {
        if a <= b { Self(a, b) } else { Self(b, a) }
    }

    /// Whether `id` is one of the two actors
    pub fn involves(&self, id: ActorId) -> bool {
        self.0 == id || self.1 == id
    }
}

/// All pairs closer than `distance`, in scan order
pub fn find_collisions(actors: &[Actor], distance: f64) -> Vec<CollisionPair> {
    let mut pairs = Vec::new();
    for (i, a) in actors.iter().enumerate() {
        for b in &actors[i + 1..] {
            let gap = (a.x - b.x).hypot(a.y - b.y);
            if gap < distance {
                pairs.push(CollisionPair::new(a.id, b.id));
            }
        }
    }
    pairs
}

/// Keep the first pair for every actor, dropping later pairs that reuse one
///
/// `busy` holds actors that already swapped during the current tick and is
/// extended with every actor selected here.
pub fn select_swaps(pairs: &[CollisionPair], busy: &mut HashSet<ActorId>) -> Vec<CollisionPair> {
    let mut selected = Vec::new();

    for pair in pairs {
        if busy.contains(&pair.0) || busy.contains(&pair.1) {
            continue;
        }
        busy.insert(pair.0);
        busy.insert(pair.1);
        selected.push(*pair);
    }
    selected
}

/// Detect collisions and swap programs; returns the pairs that swapped
pub fn resolve_collisions(
    actors: &mut [Actor],
    distance: f64,
    busy: &mut HashSet<ActorId>,
    timers: &mut TimerQueue,
) -> Vec<CollisionPair> {
    let swaps = select_swaps(&find_collisions(actors, distance), busy);
    for pair in &swaps {
        if let Some((a, b)) = pair_mut(actors, pair.0, pair.1) {
            swap_programs(a, b, timers);
        }
    }
    swaps
}

/// Trade programs and restart both actors from the top
pub fn swap_programs(a: &mut Actor, b: &mut Actor, timers: &mut TimerQueue) {
    std::mem::swap(&mut a.program, &mut b.program);
    for actor in [a, b] {
        if let Some(timer) = actor.reset_run_state() {
            timers.cancel(timer);
        }
    }
}

/// Borrow two distinct actors mutably
pub fn pair_mut(actors: &mut [Actor], a: ActorId, b: ActorId) -> Option<(&mut Actor, &mut Actor)> {
    let i = actors.iter().position(|actor| actor.id == a)?;
    let j = actors.iter().position(|actor| actor.id == b)?;
    match i.cmp(&j) {
        std::cmp::Ordering::Less => {
            let (left, right) = actors.split_at_mut(j);
            Some((&mut left[i], &mut right[0]))
        }
        std::cmp::Ordering::Greater => {
            let (left, right) = actors.split_at_mut(i);
            Some((&mut right[0], &mut left[j]))
        }
        std::cmp::Ordering::Equal => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::actor::{Bubble, BubbleKind};
    use crate::runtime::command::Command;
    use std::time::Duration;

    fn actor(id: u32, x: f64, y: f64, program: Vec<Command>) -> Actor {
        Actor::new(ActorId(id), format!("Sprite {id}"))
            .at(x, y)
            .with_program(program)
    }

    #[test]
    fn test_threshold_is_strict() {
        let actors = vec![
            actor(1, 0.0, 0.0, vec![]),
            actor(2, 40.0, 0.0, vec![]),
            actor(3, 0.0, 39.9, vec![]),
        ];
        assert_eq!(
            find_collisions(&actors, 40.0),
            vec![CollisionPair(ActorId(1), ActorId(3))]
        );
    }

    #[test]
    fn test_pair_is_normalized() {
        let actors = vec![actor(7, 0.0, 0.0, vec![]), actor(2, 1.0, 1.0, vec![])];
        let pairs = find_collisions(&actors, 40.0);
        assert_eq!(pairs, vec![CollisionPair(ActorId(2), ActorId(7))]);
        assert!(pairs[0].involves(ActorId(7)));
    }

    #[test]
    fn test_swap_resets_both_actors() {
        let mut timers = TimerQueue::new();
        let mut a = actor(1, 0.0, 0.0, vec![Command::move_by(1.0)]);
        let mut b = actor(2, 30.0, 0.0, vec![Command::turn(5), Command::turn(5)]);
        a.cursor.pc = 1;
        b.cursor.loop_counters.insert(0, 3);
        let handle = timers.arm(ActorId(2), BubbleKind::Speech, Duration::from_secs(1));
        b.bubble = Some(Bubble {
            kind: BubbleKind::Speech,
            text: "hi".into(),
            timer: Some(handle),
        });

        swap_programs(&mut a, &mut b, &mut timers);

        assert_eq!(a.program, vec![Command::turn(5), Command::turn(5)]);
        assert_eq!(b.program, vec![Command::move_by(1.0)]);
        assert!(a.cursor.is_reset() && b.cursor.is_reset());
        assert!(b.bubble.is_none());
        assert!(timers.is_empty());
    }

    #[test]
    fn test_actor_swaps_at_most_once_per_pass() {
        let mut timers = TimerQueue::new();
        let mut actors = vec![
            actor(1, 0.0, 0.0, vec![Command::move_by(1.0)]),
            actor(2, 10.0, 0.0, vec![Command::move_by(2.0)]),
            actor(3, 20.0, 0.0, vec![Command::move_by(3.0)]),
        ];

        let mut busy = HashSet::new();
        let swapped = resolve_collisions(&mut actors, 40.0, &mut busy, &mut timers);

        assert_eq!(swapped, vec![CollisionPair(ActorId(1), ActorId(2))]);
        assert_eq!(actors[0].program, vec![Command::move_by(2.0)]);
        assert_eq!(actors[1].program, vec![Command::move_by(1.0)]);
        assert_eq!(actors[2].program, vec![Command::move_by(3.0)]);

        // a second pass in the same tick leaves the busy actors alone
        let again = resolve_collisions(&mut actors, 40.0, &mut busy, &mut timers);
        assert!(again.is_empty());
        assert_eq!(actors[0].program, vec![Command::move_by(2.0)]);
    }

    #[test]
    fn test_select_swaps_dedupes_pairs() {
        let p = CollisionPair::new(ActorId(2), ActorId(1));
        let q = CollisionPair::new(ActorId(3), ActorId(4));
        let mut busy = HashSet::new();
        assert_eq!(select_swaps(&[p, p, q], &mut busy), vec![p, q]);
        assert_eq!(busy.len(), 4);
    }

    #[test]
    fn test_pair_mut_rejects_same_actor() {
        let mut actors = vec![actor(1, 0.0, 0.0, vec![]), actor(2, 0.0, 0.0, vec![])];
        assert!(pair_mut(&mut actors, ActorId(1), ActorId(1)).is_none());
        assert!(pair_mut(&mut actors, ActorId(1), ActorId(9)).is_none());
        let (b, a) = pair_mut(&mut actors, ActorId(2), ActorId(1)).unwrap();
        assert_eq!((b.id, a.id), (ActorId(2), ActorId(1)));
    }
}
