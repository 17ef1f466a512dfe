use std::collections::HashMap;

use crate::types::{Role, UserId};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Vote {
    pub voter: UserId,
    pub accused: UserId,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Verdict {
    NoVotes,
    CiviliansWin { accused: UserId },
    SpiesWin { accused: UserId },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Resolution {
    pub verdict: Verdict,
    pub spies: Vec<UserId>,
    pub fake_civilians: Vec<UserId>,
    pub civilians: Vec<UserId>,
    pub breakdown: Vec<Vote>,
}

/// Most-accused player. Ties go to whichever tied player received a vote first.
pub fn tally(votes: &[Vote]) -> Option<UserId> {
    let mut counts: Vec<(UserId, usize)> = Vec::new();
    for vote in votes {
        match counts.iter_mut().find(|(accused, _)| *accused == vote.accused) {
            Some((_, count)) => *count += 1,
            None => counts.push((vote.accused, 1)),
        }
    }

    let mut best: Option<(UserId, usize)> = None;
    for (accused, count) in counts {
        if best.map(|(_, top)| count > top).unwrap_or(true) {
            best = Some((accused, count));
        }
    }
    best.map(|(accused, _)| accused)
}

pub fn resolve(players: &[UserId], roles: &HashMap<UserId, Role>, votes: &[Vote]) -> Resolution {
    let with_role = |wanted: Role| -> Vec<UserId> {
        players
            .iter()
            .copied()
            .filter(|player| roles.get(player) == Some(&wanted))
            .collect()
    };

    let verdict = match tally(votes) {
        None => Verdict::NoVotes,
        Some(accused) if roles.get(&accused) == Some(&Role::Spy) => {
            Verdict::CiviliansWin { accused }
        }
        Some(accused) => Verdict::SpiesWin { accused },
    };

    Resolution {
        verdict,
        spies: with_role(Role::Spy),
        fake_civilians: with_role(Role::FakeCivilian),
        civilians: with_role(Role::Civilian),
        breakdown: votes.to_vec(),
    }
}
