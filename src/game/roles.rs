use std::collections::HashMap;

use rand::seq::IndexedRandom;
use rand::Rng;

use crate::error::GameError;
use crate::types::{GameMode, Role, UserId};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RoundAssignment {
    pub location: String,
    /// Location shown to the Fake Civilian, if one was designated.
    pub decoy: Option<String>,
    pub roles: HashMap<UserId, Role>,
}

impl RoundAssignment {
    pub fn role_of(&self, player: UserId) -> Option<Role> {
        self.roles.get(&player).copied()
    }

    pub fn count(&self, role: Role) -> usize {
        self.roles.values().filter(|assigned| **assigned == role).count()
    }
}

pub fn assign_roles<R: Rng>(
    rng: &mut R,
    players: &[UserId],
    mode: GameMode,
    pool: &[String],
) -> Result<RoundAssignment, GameError> {
    let location = pool.choose(rng).cloned().ok_or(GameError::NoLocations)?;

    let spies: Vec<UserId> = match mode {
        GameMode::DoubleSpy => players.choose_multiple(rng, 2).copied().collect(),
        _ => players.choose(rng).copied().into_iter().collect(),
    };

    let wants_fake = match mode {
        GameMode::FakeCivilian => true,
        GameMode::Chaos => rng.random_bool(0.5),
        GameMode::Classic | GameMode::DoubleSpy => false,
    };

    let mut fake_civilian = None;
    let mut decoy = None;
    if wants_fake {
        let decoys: Vec<&String> = pool.iter().filter(|name| **name != location).collect();
        let candidates: Vec<UserId> = players
            .iter()
            .copied()
            .filter(|player| !spies.contains(player))
            .collect();
        // A pool with a single location leaves nothing to mislead with.
        if let (Some(name), Some(player)) = (decoys.choose(rng), candidates.choose(rng)) {
            decoy = Some((*name).clone());
            fake_civilian = Some(*player);
        }
    }

    let roles = players
        .iter()
        .map(|player| {
            let role = if spies.contains(player) {
                Role::Spy
            } else if fake_civilian == Some(*player) {
                Role::FakeCivilian
            } else {
                Role::Civilian
            };
            (*player, role)
        })
        .collect();

    Ok(RoundAssignment {
        location,
        decoy,
        roles,
    })
}
