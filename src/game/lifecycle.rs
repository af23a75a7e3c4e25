//! Round and Session Lifecycle
//!
//! Starting a game, scoring a cleared board, and deciding between the next
//! round and the end of the session.

use crate::game::board;
use crate::game::error::GameError;
use crate::game::events::{GameEvent, Outbound};
use crate::game::player::{ConnectionId, Player};
use crate::game::session::{FlipState, Phase, Session};
use crate::game::turn;

/// How a cleared round was decided.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoundOutcome {
    /// Several active players share the top score.
    Tied(Vec<ConnectionId>),
    /// One active player has the top score.
    Won(ConnectionId),
}

/// Decide a round from the active players' round scores.
///
/// A tie needs two active players with equal scores where that shared
/// score is also the maximum. `None` when nobody is active.
pub fn decide_round(roster: &[Player]) -> Option<RoundOutcome> {
    let active: Vec<&Player> = roster.iter().filter(|p| p.is_active).collect();
    let max = active.iter().map(|p| p.round_score).max()?;

    let tied = active.iter().enumerate().any(|(i, a)| {
        active[i + 1..]
            .iter()
            .any(|b| a.round_score == b.round_score && a.round_score == max)
    });

    let top: Vec<ConnectionId> = active
        .iter()
        .filter(|p| p.round_score == max)
        .map(|p| p.id)
        .collect();

    if tied {
        Some(RoundOutcome::Tied(top))
    } else {
        top.first().map(|id| RoundOutcome::Won(*id))
    }
}

impl Session {
    /// Start a game with everyone currently in the roster.
    ///
    /// `pair_count` and `max_rounds` fall back to the session defaults.
    pub fn start_game(
        &mut self,
        requester: ConnectionId,
        pair_count: Option<usize>,
        max_rounds: Option<u32>,
    ) -> Result<Vec<Outbound>, GameError> {
        if self.phase == Phase::InProgress {
            return Err(GameError::GameInProgress);
        }

        let pair_count = pair_count.unwrap_or(self.config.default_pair_count);
        board::validate_pair_count(pair_count)?;

        let max_rounds = max_rounds.unwrap_or(self.config.default_max_rounds);
        if max_rounds == 0 {
            return Err(GameError::InvalidConfiguration(
                "a session needs at least one round".to_string(),
            ));
        }

        if self.player(&requester).is_none() {
            return Err(GameError::NotInSession);
        }

        if self.roster.len() < 2 {
            return Err(GameError::NotEnoughPlayers);
        }

        self.pair_count = pair_count;
        self.max_rounds = max_rounds;
        self.round_index = 1;
        self.board = self.deal_board(self.round_index)?;

        let fresh: Vec<Player> = self
            .roster
            .iter()
            .map(|p| Player {
                round_score: 0,
                session_score: 0,
                ..p.clone()
            })
            .collect();
        self.roster = turn::start_turns(&fresh, &mut self.rng);
        self.phase = Phase::InProgress;
        self.flip_state = FlipState::AwaitingFirstFlip;

        Ok(vec![
            Outbound::broadcast(GameEvent::BoardStarted { board: self.board.clone() }),
            self.roster_event(),
        ])
    }

    /// Score a cleared board and move to the next round or end the session.
    pub(crate) fn complete_round(&mut self) -> Result<Vec<Outbound>, GameError> {
        let mut events = Vec::new();

        let outcome = decide_round(&self.roster);
        let winners: Vec<ConnectionId> = match &outcome {
            Some(RoundOutcome::Tied(ids)) => ids.clone(),
            Some(RoundOutcome::Won(id)) => vec![*id],
            None => Vec::new(),
        };

        self.roster = self
            .roster
            .iter()
            .map(|p| Player {
                session_score: p.session_score + u32::from(winners.contains(&p.id)),
                ..p.clone()
            })
            .collect();

        let winner_snapshots: Vec<Player> = self
            .roster
            .iter()
            .filter(|p| winners.contains(&p.id))
            .cloned()
            .collect();

        match outcome {
            Some(RoundOutcome::Tied(_)) => {
                events.push(Outbound::broadcast(GameEvent::RoundTied { players: winner_snapshots }));
            }
            Some(RoundOutcome::Won(_)) => {
                if let Some(player) = winner_snapshots.into_iter().next() {
                    events.push(Outbound::broadcast(GameEvent::RoundWon { player }));
                }
            }
            None => {}
        }

        self.round_index += 1;

        if self.round_index > self.max_rounds {
            events.push(self.roster_event());
            events.push(Outbound::broadcast(GameEvent::SessionFinished));
            self.finish();
            events.push(self.roster_event());
            return Ok(events);
        }

        let next_board = self.deal_board(self.round_index)?;
        self.board = next_board;
        self.flip_state = FlipState::AwaitingFirstFlip;
        self.roster = self
            .roster
            .iter()
            .map(|p| Player {
                round_score: 0,
                ..p.clone()
            })
            .collect();

        events.push(Outbound::broadcast(GameEvent::BoardStarted { board: self.board.clone() }));
        events.push(self.roster_event());
        events.push(Outbound::broadcast(GameEvent::RoundAdvanced {
            round_index: self.round_index,
            max_rounds: self.max_rounds,
        }));
        Ok(events)
    }

    /// Close a completed session: scores zeroed, departed players dropped,
    /// back to the lobby.
    fn finish(&mut self) {
        let mut roster: Vec<Player> = self
            .roster
            .iter()
            .filter(|p| p.is_active)
            .map(|p| Player {
                round_score: 0,
                session_score: 0,
                has_turn: false,
                ..p.clone()
            })
            .collect();

        if !roster.iter().any(|p| p.is_host) {
            if let Some(first) = roster.first_mut() {
                first.is_host = true;
            }
        }

        self.roster = roster;
        self.clear_game();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::session::fixtures::*;

    fn play_out_round(session: &mut Session) -> Vec<Outbound> {
        let mut last = Vec::new();
        let start_round = session.round_index();
        let start_gen = session.generation();
        while session.round_index() == start_round && session.generation() == start_gen {
            let actor = holder(session);
            let (a, b) = matching_pair(session);
            session.flip(actor, a).unwrap();
            last = session.flip(actor, b).unwrap().events;
        }
        last
    }

    fn scored(scores: &[(u32, bool)]) -> Vec<Player> {
        scores
            .iter()
            .enumerate()
            .map(|(i, (score, active))| {
                let mut p = Player::new(conn(i as u8 + 1), addr(i as u8 + 1), format!("P{}", i), i == 0);
                p.round_score = *score;
                p.is_active = *active;
                p
            })
            .collect()
    }

    #[test]
    fn test_decide_outright_win() {
        let roster = scored(&[(3, true), (1, true), (0, true)]);
        assert_eq!(decide_round(&roster), Some(RoundOutcome::Won(conn(1))));
    }

    #[test]
    fn test_decide_tie_at_top() {
        let roster = scored(&[(2, true), (2, true), (1, true)]);
        assert_eq!(decide_round(&roster), Some(RoundOutcome::Tied(vec![conn(1), conn(2)])));
    }

    #[test]
    fn test_lower_tie_is_not_a_tie() {
        let roster = scored(&[(1, true), (1, true), (4, true)]);
        assert_eq!(decide_round(&roster), Some(RoundOutcome::Won(conn(3))));
    }

    #[test]
    fn test_inactive_players_ignored() {
        let roster = scored(&[(5, false), (2, true), (1, true)]);
        assert_eq!(decide_round(&roster), Some(RoundOutcome::Won(conn(2))));

        let roster = scored(&[(2, false), (2, true), (1, true)]);
        assert_eq!(decide_round(&roster), Some(RoundOutcome::Won(conn(2))));

        assert_eq!(decide_round(&scored(&[(1, false)])), None);
    }

    #[test]
    fn test_start_requires_two_players() {
        let mut session = lobby(1);
        assert_eq!(session.start_game(conn(1), Some(4), Some(1)), Err(GameError::NotEnoughPlayers));
        assert_eq!(session.phase(), Phase::WaitingForPlayers);
        assert!(session.board().is_empty());
    }

    #[test]
    fn test_start_rejects_bad_configuration() {
        let mut session = lobby(2);
        assert!(matches!(
            session.start_game(conn(1), Some(1), None),
            Err(GameError::InvalidConfiguration(_))
        ));
        assert!(matches!(
            session.start_game(conn(1), Some(26), None),
            Err(GameError::InvalidConfiguration(_))
        ));
        assert!(matches!(
            session.start_game(conn(1), Some(4), Some(0)),
            Err(GameError::InvalidConfiguration(_))
        ));
        assert_eq!(session.phase(), Phase::WaitingForPlayers);
    }

    #[test]
    fn test_start_by_stranger() {
        let mut session = lobby(2);
        assert_eq!(session.start_game(conn(9), None, None), Err(GameError::NotInSession));
    }

    #[test]
    fn test_start_twice() {
        let mut session = started(2, 4, 1);
        assert_eq!(session.start_game(conn(1), None, None), Err(GameError::GameInProgress));
    }

    #[test]
    fn test_start_game_broadcasts_board_and_roster() {
        let mut session = lobby(2);
        let events = session.start_game(conn(1), Some(2), Some(3)).unwrap();

        assert_eq!(events.len(), 2);
        match &events[0].event {
            GameEvent::BoardStarted { board } => assert_eq!(board.len(), 4),
            other => panic!("unexpected {:?}", other),
        }
        assert!(matches!(events[1].event, GameEvent::Roster { .. }));

        assert_eq!(session.phase(), Phase::InProgress);
        assert_eq!(session.pair_count(), 2);
        assert_eq!(session.max_rounds(), 3);
        assert_eq!(session.round_index(), 1);
        assert_eq!(session.roster().iter().filter(|p| p.has_turn).count(), 1);
    }

    #[test]
    fn test_round_win_advances() {
        let mut session = started(2, 2, 3);
        let events = play_out_round(&mut session);

        let wins = events.iter().filter(|e| matches!(e.event, GameEvent::RoundWon { .. })).count();
        let ties = events.iter().filter(|e| matches!(e.event, GameEvent::RoundTied { .. })).count();
        assert_eq!(wins + ties, 1);
        assert!(events.iter().any(|e| e.event == GameEvent::RoundAdvanced { round_index: 2, max_rounds: 3 }));

        // Matching keeps the turn, so one player swept the round
        assert_eq!(wins, 1);
        assert_eq!(session.round_index(), 2);
        assert_eq!(session.board().len(), 4);
        assert!(session.board().iter().all(|c| !c.is_flipped && !c.is_matched));
        assert!(session.roster().iter().all(|p| p.round_score == 0));
        assert_eq!(session.roster().iter().map(|p| p.session_score).sum::<u32>(), 1);
    }

    #[test]
    fn test_tie_on_final_round_finishes_session() {
        let mut session = started(2, 2, 1);

        // First pair to one player, second pair to the other
        let actor = holder(&session);
        let (a, b) = matching_pair(&session);
        session.flip(actor, a).unwrap();
        session.flip(actor, b).unwrap();
        for p in session.roster.iter_mut() {
            p.has_turn = p.id != actor;
        }

        let other = holder(&session);
        let (c, d) = matching_pair(&session);
        session.flip(other, c).unwrap();
        let events = session.flip(other, d).unwrap().events;

        let tied = events
            .iter()
            .find_map(|e| match &e.event {
                GameEvent::RoundTied { players } => Some(players.clone()),
                _ => None,
            })
            .unwrap();
        assert_eq!(tied.len(), 2);
        assert!(tied.iter().all(|p| p.session_score == 1));
        assert!(!events.iter().any(|e| matches!(e.event, GameEvent::RoundWon { .. })));
        assert!(events.iter().any(|e| e.event == GameEvent::SessionFinished));

        assert_eq!(session.phase(), Phase::WaitingForPlayers);
        assert_eq!(session.round_index(), 1);
        assert!(session.board().is_empty());
        assert!(session.roster().iter().all(|p| p.round_score == 0 && p.session_score == 0));
        assert_eq!(session.roster().len(), 2);
    }

    #[test]
    fn test_finish_prunes_departed_players() {
        let mut session = started(3, 2, 1);
        let leaver = session.roster().iter().find(|p| !p.has_turn && !p.is_host).unwrap().id;
        session.leave(leaver);

        play_out_round(&mut session);

        assert_eq!(session.phase(), Phase::WaitingForPlayers);
        assert_eq!(session.roster().len(), 2);
        assert!(session.player(&leaver).is_none());
        assert_eq!(session.roster().iter().filter(|p| p.is_host).count(), 1);
        assert!(session.roster().iter().all(|p| !p.has_turn));
    }

    #[test]
    fn test_full_session_of_three_rounds() {
        let mut session = started(2, 3, 3);
        let gen = session.generation();

        play_out_round(&mut session);
        play_out_round(&mut session);
        let events = play_out_round(&mut session);

        assert!(events.iter().any(|e| e.event == GameEvent::SessionFinished));
        assert_eq!(session.generation(), gen + 1);

        // Lobby can start again with the same players
        assert!(session.start_game(conn(1), Some(2), Some(1)).is_ok());
    }

    #[test]
    fn test_random_playthroughs_hold_invariants() {
        use rand::rngs::StdRng;
        use rand::{Rng, SeedableRng};

        for seed in 0..20u64 {
            let mut rng = StdRng::seed_from_u64(seed);
            let mut session = started(3, 4, 2);
            let mut finished = false;

            for _ in 0..2_000 {
                let actor = if rng.gen_bool(0.9) {
                    holder(&session)
                } else {
                    conn(rng.gen_range(1..=3))
                };
                let position = rng.gen_range(0..session.board().len() + 2);

                let Ok(outcome) = session.flip(actor, position) else {
                    continue;
                };
                if outcome.events.iter().any(|e| e.event == GameEvent::SessionFinished) {
                    finished = true;
                    break;
                }
                if let Some(ticket) = outcome.pending {
                    session.resolve_mismatch(ticket);
                }

                let holders: Vec<_> = session.roster().iter().filter(|p| p.has_turn).collect();
                assert_eq!(holders.len(), 1);
                assert!(holders[0].is_active);

                let matched = session.board().iter().filter(|c| c.is_matched).count();
                let scored: u32 = session.roster().iter().map(|p| p.round_score).sum();
                assert_eq!(matched, 2 * scored as usize);
            }

            assert!(finished, "seed {} never finished", seed);
            assert_eq!(session.phase(), Phase::WaitingForPlayers);
            assert!(session.roster().iter().all(|p| p.round_score == 0 && p.session_score == 0));
        }
    }
}
