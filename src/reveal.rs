//! Paced reveal of a year's entities.
//!
//! In auto mode the sequence announces one entity, waits [`REVEAL_DELAY`]
//! seconds, reveals it, and moves on to the next. When the queue is empty it
//! reports the year as complete and, if a later year remains, asks for it after
//! [`YEAR_TRANSITION_DELAY`] seconds. All waits are scaled by the speed
//! multiplier; a multiplier of zero holds the sequence where it is.
//!
//! Manual mode stops the automatic queue. Entities are then revealed one at a
//! time through [`RevealSequence::select`].

use crate::dataset::{EmissionsDataset, EntityRecord};
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

/// Seconds between announcing an entity and revealing it.
pub const REVEAL_DELAY: f32 = 2.0;

/// Seconds between completing a year and moving to the next.
pub const YEAR_TRANSITION_DELAY: f32 = 5.0;

/// How entities are revealed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RevealMode {
    /// Entities are revealed one after another on a timer.
    #[default]
    Auto,
    /// Entities are revealed only when selected.
    Manual,
}

/// Something the driver of the sequence should act on.
#[derive(Debug, Clone, PartialEq)]
pub enum RevealEvent {
    /// The entity is about to be revealed.
    Announced(EntityRecord),
    /// The entity should be added to the particle system.
    Revealed(EntityRecord),
    /// Every entity of the year has been revealed.
    Completed { year: i32 },
    /// Load the given year next.
    NextYear(i32),
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Phase {
    /// Waiting before announcing the next entity.
    Idle,
    /// The front entity was announced; waiting to reveal it.
    Announced { remaining: f32 },
    /// Queue empty; waiting to move to the next year.
    Transition { remaining: f32 },
    Finished,
}

/// Reveal state for one year.
#[derive(Debug, Clone)]
pub struct RevealSequence {
    year: i32,
    final_year: i32,
    queue: VecDeque<EntityRecord>,
    revealed: HashSet<Arc<str>>,
    mode: RevealMode,
    phase: Phase,
    cancelled: bool,
}

impl RevealSequence {
    /// Queue every entity of `dataset`, in dataset order.
    ///
    /// `final_year` is the last year the sequence will ask to move on to.
    pub fn new(dataset: &EmissionsDataset, final_year: i32) -> Self {
        Self {
            year: dataset.year(),
            final_year,
            queue: dataset.entities().iter().cloned().collect(),
            revealed: HashSet::new(),
            mode: RevealMode::Auto,
            phase: Phase::Idle,
            cancelled: false,
        }
    }

    /// Advance the timers by `delta` seconds and return what happened.
    pub fn advance(&mut self, delta: f32, speed_multiplier: f32) -> Vec<RevealEvent> {
        let mut events = Vec::new();
        if self.cancelled || self.mode == RevealMode::Manual {
            return events;
        }
        if !(speed_multiplier.is_finite() && speed_multiplier > 0.0) {
            return events;
        }
        let mut budget = delta.max(0.0);

        loop {
            match self.phase {
                Phase::Finished => break,
                Phase::Idle => {
                    self.queue.retain(|e| !self.revealed.contains(&e.id));
                    match self.queue.front() {
                        Some(entity) => {
                            events.push(RevealEvent::Announced(entity.clone()));
                            self.phase = Phase::Announced {
                                remaining: REVEAL_DELAY / speed_multiplier,
                            };
                        }
                        None => {
                            events.push(RevealEvent::Completed { year: self.year });
                            self.phase = if self.year < self.final_year {
                                Phase::Transition {
                                    remaining: YEAR_TRANSITION_DELAY / speed_multiplier,
                                }
                            } else {
                                Phase::Finished
                            };
                        }
                    }
                }
                Phase::Announced { remaining } => {
                    if budget < remaining {
                        self.phase = Phase::Announced {
                            remaining: remaining - budget,
                        };
                        break;
                    }
                    budget -= remaining;
                    if let Some(entity) = self.queue.pop_front() {
                        self.revealed.insert(entity.id.clone());
                        events.push(RevealEvent::Revealed(entity));
                    }
                    self.phase = Phase::Idle;
                }
                Phase::Transition { remaining } => {
                    if budget < remaining {
                        self.phase = Phase::Transition {
                            remaining: remaining - budget,
                        };
                        break;
                    }
                    events.push(RevealEvent::NextYear(self.year + 1));
                    self.phase = Phase::Finished;
                }
            }
        }

        events
    }

    /// Reveal `entity` now, unless it was already revealed.
    ///
    /// Works in both modes. The entity is dropped from the automatic queue.
    pub fn select(&mut self, entity: &EntityRecord) -> Option<RevealEvent> {
        if self.cancelled || !self.revealed.insert(entity.id.clone()) {
            return None;
        }
        if matches!(self.phase, Phase::Announced { .. })
            && self.queue.front().is_some_and(|e| e.id == entity.id)
        {
            self.phase = Phase::Idle;
        }
        self.queue.retain(|e| e.id != entity.id);
        Some(RevealEvent::Revealed(entity.clone()))
    }

    /// Switch reveal mode. Manual mode drops the pending automatic queue.
    pub fn set_mode(&mut self, mode: RevealMode) {
        if mode == RevealMode::Manual {
            self.queue.clear();
            self.phase = Phase::Finished;
        }
        self.mode = mode;
    }

    /// Stop producing events. Used when the year's data is replaced.
    pub fn cancel(&mut self) {
        self.cancelled = true;
    }

    /// Whether [`cancel`](Self::cancel) was called.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    /// Whether the sequence has nothing more to do.
    pub fn is_finished(&self) -> bool {
        self.cancelled || self.phase == Phase::Finished
    }

    /// Current reveal mode.
    pub fn mode(&self) -> RevealMode {
        self.mode
    }

    /// Year being revealed.
    pub fn year(&self) -> i32 {
        self.year
    }

    /// Entities still waiting in the automatic queue.
    pub fn remaining(&self) -> usize {
        self.queue.len()
    }

    /// Whether `id` has been revealed.
    pub fn is_revealed(&self, id: &str) -> bool {
        self.revealed.contains(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{Company, PeriodEmissions, ReportingPeriod};

    fn dataset(year: i32, names: &[&str]) -> EmissionsDataset {
        let companies: Vec<Company> = names
            .iter()
            .enumerate()
            .map(|(i, name)| Company {
                wikidata_id: format!("Q{i}"),
                name: name.to_string(),
                description: None,
                reporting_periods: vec![ReportingPeriod {
                    start_date: format!("{year}-01-01"),
                    end_date: format!("{year}-12-31"),
                    report_url: None,
                    emissions: Some(PeriodEmissions {
                        calculated_total_emissions: Some(100_000.0),
                        stated_total_emissions: None,
                    }),
                }],
                tags: Vec::new(),
            })
            .collect();
        EmissionsDataset::from_companies(&companies, year).unwrap()
    }

    fn revealed_names(events: &[RevealEvent]) -> Vec<String> {
        events
            .iter()
            .filter_map(|e| match e {
                RevealEvent::Revealed(r) => Some(r.display_name.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_paced_reveal() {
        let mut seq = RevealSequence::new(&dataset(2022, &["A", "B"]), 2022);

        let events = seq.advance(0.0, 1.0);
        assert!(matches!(&events[..], [RevealEvent::Announced(e)] if e.display_name == "A"));

        assert!(seq.advance(1.5, 1.0).is_empty());

        let events = seq.advance(0.5, 1.0);
        assert_eq!(revealed_names(&events), vec!["A"]);
        assert!(matches!(events.last(), Some(RevealEvent::Announced(e)) if e.display_name == "B"));

        let events = seq.advance(2.0, 1.0);
        assert_eq!(revealed_names(&events), vec!["B"]);
        assert_eq!(events.last(), Some(&RevealEvent::Completed { year: 2022 }));
        assert!(seq.is_finished());
        assert!(seq.advance(10.0, 1.0).is_empty());
    }

    #[test]
    fn test_speed_scales_delay() {
        let mut seq = RevealSequence::new(&dataset(2022, &["A"]), 2022);
        seq.advance(0.0, 2.0);
        let events = seq.advance(1.0, 2.0);
        assert_eq!(revealed_names(&events), vec!["A"]);
    }

    #[test]
    fn test_zero_speed_holds() {
        let mut seq = RevealSequence::new(&dataset(2022, &["A"]), 2022);
        assert!(seq.advance(100.0, 0.0).is_empty());
        assert_eq!(seq.remaining(), 1);
    }

    #[test]
    fn test_next_year() {
        let mut seq = RevealSequence::new(&dataset(2021, &["A"]), 2023);
        let events = seq.advance(2.0, 1.0);
        assert_eq!(events.last(), Some(&RevealEvent::Completed { year: 2021 }));

        assert!(seq.advance(4.0, 1.0).is_empty());
        assert_eq!(seq.advance(1.0, 1.0), vec![RevealEvent::NextYear(2022)]);
        assert!(seq.is_finished());
    }

    #[test]
    fn test_manual_mode() {
        let data = dataset(2022, &["A", "B"]);
        let mut seq = RevealSequence::new(&data, 2022);
        seq.set_mode(RevealMode::Manual);
        assert_eq!(seq.mode(), RevealMode::Manual);
        assert_eq!(seq.year(), 2022);
        assert!(seq.advance(10.0, 1.0).is_empty());

        let b = data.entities()[1].clone();
        assert_eq!(seq.select(&b), Some(RevealEvent::Revealed(b.clone())));
        assert_eq!(seq.select(&b), None);
        assert!(seq.is_revealed(&b.id));
    }

    #[test]
    fn test_select_skips_queue() {
        let data = dataset(2022, &["A", "B"]);
        let mut seq = RevealSequence::new(&data, 2022);
        seq.select(&data.entities()[1].clone());

        let events = seq.advance(10.0, 1.0);
        assert_eq!(revealed_names(&events), vec!["A"]);
    }

    #[test]
    fn test_cancel() {
        let data = dataset(2022, &["A"]);
        let mut seq = RevealSequence::new(&data, 2022);
        seq.cancel();
        assert!(seq.is_cancelled());
        assert!(seq.advance(10.0, 1.0).is_empty());
        assert_eq!(seq.select(&data.entities()[0].clone()), None);
        assert!(seq.is_finished());
    }
}
