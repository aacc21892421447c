use std::collections::btree_map::{BTreeMap, Entry};

use log::debug;
use serde::Serialize;

use super::state::{Kinematics, SimState};

// ---------------------------------------------------------------------------
// Event keys
// ---------------------------------------------------------------------------

/// Named flight events. Each serializes as its single-character code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum EventKey {
    /// Horizontal speed passed circular orbit speed.
    #[serde(rename = "o")]
    Orbital,
    /// Vertical speed crossed zero (apoapsis on ascent, hover on descent).
    #[serde(rename = "v")]
    Vertical,
    /// Horizontal speed nulled.
    #[serde(rename = "h")]
    Horizontal,
    /// Ground contact.
    #[serde(rename = "s")]
    Surface,
    /// Only reserve stages remain.
    #[serde(rename = "b")]
    Burnout,
    /// Maneuver burn started.
    #[serde(rename = "0")]
    BurnStart,
}

impl EventKey {
    pub const ALL: [EventKey; 6] = [
        EventKey::Orbital,
        EventKey::Vertical,
        EventKey::Horizontal,
        EventKey::Surface,
        EventKey::Burnout,
        EventKey::BurnStart,
    ];

    pub fn code(self) -> char {
        match self {
            EventKey::Orbital => 'o',
            EventKey::Vertical => 'v',
            EventKey::Horizontal => 'h',
            EventKey::Surface => 's',
            EventKey::Burnout => 'b',
            EventKey::BurnStart => '0',
        }
    }

    pub fn from_code(code: char) -> Option<Self> {
        EventKey::ALL.into_iter().find(|k| k.code() == code)
    }
}

// ---------------------------------------------------------------------------
// EventMap: write-once record of the first state per key
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct EventMap(BTreeMap<EventKey, SimState>);

impl EventMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store the state for `key` unless one is already present.
    /// `encode` only runs on first capture. Returns whether it was stored.
    pub fn record(&mut self, key: EventKey, encode: impl FnOnce() -> SimState) -> bool {
        match self.0.entry(key) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                let state = slot.insert(encode());
                debug!("captured '{}' at t={:.1}s alt={:.0}m", key.code(), state.time, state.altitude);
                true
            }
        }
    }

    pub fn get(&self, key: EventKey) -> Option<&SimState> {
        self.0.get(&key)
    }

    pub fn contains(&self, key: EventKey) -> bool {
        self.0.contains_key(&key)
    }

    pub fn contains_all(&self, keys: &[EventKey]) -> bool {
        keys.iter().all(|&k| self.contains(k))
    }

    pub fn iter(&self) -> impl Iterator<Item = (EventKey, &SimState)> {
        self.0.iter().map(|(&k, s)| (k, s))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Codes of the captured keys, e.g. `"ovb"`.
    pub fn codes(&self) -> String {
        self.0.keys().map(|k| k.code()).collect()
    }
}

// ---------------------------------------------------------------------------
// Profiles: which events a run watches for, and when it is finished
// ---------------------------------------------------------------------------

pub type Trigger = fn(&Kinematics) -> bool;

/// Strategy injected into the shared step loop: the trigger table checked
/// after every step and the predicate that ends the run.
#[derive(Clone, Copy)]
pub struct Profile {
    pub name: &'static str,
    pub triggers: &'static [(EventKey, Trigger)],
    pub terminal: fn(&EventMap) -> bool,
}

fn orbital_speed_reached(p: &Kinematics) -> bool {
    p.orbital_velocity.is_some_and(|v| p.hs > v)
}

fn falling(p: &Kinematics) -> bool {
    p.vs <= 0.0
}

fn rising(p: &Kinematics) -> bool {
    p.vs >= 0.0
}

fn stopped_horizontally(p: &Kinematics) -> bool {
    p.hs <= 0.0
}

fn on_ground(p: &Kinematics) -> bool {
    p.clearance() <= 0.0
}

fn burnt_out(p: &Kinematics) -> bool {
    p.burnt_out()
}

fn ascent_done(events: &EventMap) -> bool {
    events.contains_all(&[EventKey::Orbital, EventKey::Vertical, EventKey::Burnout])
}

fn retro_done(events: &EventMap) -> bool {
    events.contains_all(&[EventKey::Horizontal, EventKey::Vertical])
        || events.contains(EventKey::Surface)
}

fn maneuver_done(events: &EventMap) -> bool {
    events.contains(EventKey::Burnout)
}

impl Profile {
    /// Ascent to orbit: orbital speed, apoapsis, burnout.
    pub const ASCENT: Profile = Profile {
        name: "ascent",
        triggers: &[
            (EventKey::Orbital, orbital_speed_reached as Trigger),
            (EventKey::Vertical, falling as Trigger),
            (EventKey::Burnout, burnt_out as Trigger),
        ],
        terminal: ascent_done,
    };

    /// Retro-propulsive descent: horizontal and vertical zero, touchdown, burnout.
    pub const RETRO: Profile = Profile {
        name: "retro",
        triggers: &[
            (EventKey::Horizontal, stopped_horizontally as Trigger),
            (EventKey::Vertical, rising as Trigger),
            (EventKey::Surface, on_ground as Trigger),
            (EventKey::Burnout, burnt_out as Trigger),
        ],
        terminal: retro_done,
    };

    /// Maneuver burn: the burn start is recorded by the runner, burnout here.
    pub const MANEUVER: Profile = Profile {
        name: "maneuver",
        triggers: &[(EventKey::Burnout, burnt_out as Trigger)],
        terminal: maneuver_done,
    };

    /// Check every trigger against `kinematics`, recording newly fired keys.
    pub fn capture(&self, events: &mut EventMap, kinematics: &Kinematics, encode: impl Fn() -> SimState) {
        for &(key, fired) in self.triggers {
            if !events.contains(key) && fired(kinematics) {
                events.record(key, &encode);
            }
        }
    }

    pub fn is_done(&self, events: &EventMap) -> bool {
        (self.terminal)(events)
    }
}
