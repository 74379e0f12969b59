//! Print lifecycle state machine.
//!
//! The printer offers no event feed, so the lifecycle is inferred from
//! successive status snapshots. [`transition`] is a pure function over the
//! previous [`PrintSession`] and the latest [`PrinterSnapshot`]; it returns the
//! next session together with the side effects the runner must perform, in
//! order.

use crate::printer::{PrinterSnapshot, StatusCode};

/// Recorded printer state. Only `P` and `I` observations change it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PrinterState {
    #[default]
    Idle,
    Printing,
}

/// Bookkeeping for the print currently being recorded.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PrintSession {
    /// Print name, fetched once per session.
    pub name: Option<String>,
    /// Sequence number of the next still.
    pub image_counter: u64,
    /// Z-change events ignored so far.
    pub skipped: u32,
    /// Z position at the last recorded change. Not cleared between prints.
    pub last_z: Option<f64>,
    pub last_status: PrinterState,
}

impl PrintSession {
    /// Clear per-print bookkeeping after the video has been assembled.
    fn reset(&mut self) {
        self.name = None;
        self.image_counter = 0;
        self.skipped = 0;
    }
}

/// Side effect requested by a transition.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Look up the print name and store it in the session.
    FetchPrintName,
    /// Capture, watermark and save still number `index`.
    Capture { index: u64 },
    /// A Z change was ignored; `skipped` of `of` are now used up.
    Skip { skipped: u32, of: u32 },
    /// Assemble `frames` stills into a video named after `name`, then delete them.
    AssembleVideo { name: String, frames: u64 },
}

/// Advance the session by one observation.
///
/// * `P` records `Printing`, requests the print name if it is not known yet,
///   and on a Z change either captures or consumes one of `skip_count` skips.
/// * `I` after `Printing` requests video assembly and resets the session.
/// * Anything else leaves the session untouched.
///
/// Z values are compared exactly; a value that moves away and back counts as
/// two changes.
pub fn transition(
    mut session: PrintSession,
    snapshot: &PrinterSnapshot,
    skip_count: u32,
) -> (PrintSession, Vec<Action>) {
    let mut actions = Vec::new();

    match snapshot.status {
        StatusCode::Printing => {
            session.last_status = PrinterState::Printing;

            if session.name.is_none() {
                actions.push(Action::FetchPrintName);
            }

            if session.last_z != Some(snapshot.z) {
                session.last_z = Some(snapshot.z);

                if session.skipped >= skip_count {
                    actions.push(Action::Capture {
                        index: session.image_counter,
                    });
                    session.image_counter += 1;
                } else {
                    session.skipped += 1;
                    actions.push(Action::Skip {
                        skipped: session.skipped,
                        of: skip_count,
                    });
                }
            }
        }
        StatusCode::Idle => {
            if session.last_status == PrinterState::Printing {
                session.last_status = PrinterState::Idle;
                actions.push(Action::AssembleVideo {
                    name: session.name.clone().unwrap_or_default(),
                    frames: session.image_counter,
                });
                session.reset();
            }
        }
        StatusCode::Other(_) => {}
    }

    (session, actions)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn printing(z: f64) -> PrinterSnapshot {
        PrinterSnapshot::new(StatusCode::Printing, z)
    }

    fn idle() -> PrinterSnapshot {
        PrinterSnapshot::new(StatusCode::Idle, 0.0)
    }

    /// Feed observations through the machine, naming the print as soon as asked.
    fn run(observations: &[PrinterSnapshot], skip_count: u32) -> (PrintSession, Vec<Action>) {
        let mut session = PrintSession::default();
        let mut all = Vec::new();
        for snapshot in observations {
            let (next, actions) = transition(session, snapshot, skip_count);
            session = next;
            if actions.contains(&Action::FetchPrintName) {
                session.name = Some("benchy".to_string());
            }
            all.extend(actions);
        }
        (session, all)
    }

    fn captures(actions: &[Action]) -> Vec<u64> {
        actions
            .iter()
            .filter_map(|a| match a {
                Action::Capture { index } => Some(*index),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn idle_printer_does_nothing() {
        let (session, actions) = run(&[idle(), idle(), idle()], 0);
        assert!(actions.is_empty());
        assert_eq!(session, PrintSession::default());
    }

    #[test]
    fn first_print_observation_fetches_name_then_captures() {
        let (session, actions) = transition(PrintSession::default(), &printing(0.2), 0);
        assert_eq!(
            actions,
            vec![Action::FetchPrintName, Action::Capture { index: 0 }]
        );
        assert_eq!(session.last_status, PrinterState::Printing);
        assert_eq!(session.image_counter, 1);
        assert_eq!(session.last_z, Some(0.2));
    }

    #[test]
    fn name_is_fetched_once_per_session() {
        let (_, actions) = run(&[printing(0.2), printing(0.4), printing(0.6)], 0);
        let fetches = actions
            .iter()
            .filter(|a| **a == Action::FetchPrintName)
            .count();
        assert_eq!(fetches, 1);
    }

    #[test]
    fn unchanged_z_does_not_capture() {
        let (_, actions) = run(&[printing(0.2), printing(0.2), printing(0.2)], 0);
        assert_eq!(captures(&actions), vec![0]);
    }

    #[test]
    fn z_returning_to_previous_value_counts_twice() {
        let (_, actions) = run(&[printing(0.2), printing(0.4), printing(0.2)], 0);
        assert_eq!(captures(&actions), vec![0, 1, 2]);
    }

    #[test]
    fn skips_count_z_changes_not_cycles() {
        let observations = [
            printing(0.2),
            printing(0.2),
            printing(0.2),
            printing(0.4),
            printing(0.6),
            printing(0.8),
        ];
        let (session, actions) = run(&observations, 2);
        assert_eq!(captures(&actions), vec![0, 1]);
        assert_eq!(session.skipped, 2);
        assert!(actions.contains(&Action::Skip { skipped: 1, of: 2 }));
        assert!(actions.contains(&Action::Skip { skipped: 2, of: 2 }));
    }

    #[test]
    fn completion_assembles_once_and_resets() {
        let observations = [printing(0.2), printing(0.4), idle(), idle()];
        let (session, actions) = run(&observations, 0);

        let assemblies: Vec<_> = actions
            .iter()
            .filter(|a| matches!(a, Action::AssembleVideo { .. }))
            .collect();
        assert_eq!(
            assemblies,
            vec![&Action::AssembleVideo {
                name: "benchy".to_string(),
                frames: 2
            }]
        );
        assert_eq!(session.name, None);
        assert_eq!(session.image_counter, 0);
        assert_eq!(session.skipped, 0);
        assert_eq!(session.last_status, PrinterState::Idle);
    }

    #[test]
    fn next_session_numbers_from_zero_and_skips_again() {
        let observations = [
            printing(0.2),
            printing(0.4),
            idle(),
            printing(0.3),
            printing(0.5),
        ];
        let (_, actions) = run(&observations, 1);
        assert_eq!(captures(&actions), vec![0, 0]);
        let fetches = actions
            .iter()
            .filter(|a| **a == Action::FetchPrintName)
            .count();
        assert_eq!(fetches, 2);
    }

    #[test]
    fn last_z_survives_reset() {
        let observations = [printing(0.2), idle(), printing(0.2), printing(0.4)];
        let (_, actions) = run(&observations, 0);
        assert_eq!(captures(&actions), vec![0, 0]);
    }

    #[test]
    fn other_status_keeps_print_alive() {
        let paused = PrinterSnapshot::new(StatusCode::Other("S".to_string()), 5.0);
        let observations = [printing(0.2), paused.clone(), paused, idle()];
        let (_, actions) = run(&observations, 0);
        assert_eq!(captures(&actions), vec![0]);
        assert!(actions.iter().any(|a| matches!(
            a,
            Action::AssembleVideo { frames: 1, .. }
        )));
    }

    #[test]
    fn z_changes_while_idle_are_ignored() {
        let observations = [
            PrinterSnapshot::new(StatusCode::Idle, 1.0),
            PrinterSnapshot::new(StatusCode::Idle, 2.0),
        ];
        let (session, actions) = run(&observations, 0);
        assert!(actions.is_empty());
        assert_eq!(session.last_z, None);
    }
}
