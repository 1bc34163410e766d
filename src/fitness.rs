//! Fitness evaluation.
//!
//! Hard constraint: no professor, group or room may be booked twice in the
//! same (day, time slot). Soft constraint: a group's classes on one day
//! should be contiguous. Both feed a single score in (0, 1].

use crate::chromosome::ClassSession;
use crate::context::RunContext;
use crate::data::UnmetConstraint;
use itertools::Itertools;
use std::collections::{HashMap, HashSet};

/// Weight of one idle slot relative to one clash.
pub const GAP_PENALTY: f64 = 0.1;

/// Clash and gap counts for one timetable, with the resulting score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitnessReport {
    pub clashes: usize,
    /// Net idle slots summed over every group and day. A day with doubled-up
    /// sessions counts negative; the group clashes it causes always weigh more.
    pub gaps: i64,
    pub fitness: f64,
}

#[derive(Default)]
struct SlotOccupancy<'a> {
    professors: HashSet<&'a str>,
    groups: HashSet<&'a str>,
    rooms: HashSet<&'a str>,
}

/// Scores a schedule. Pure: the same sessions always give the same value.
pub fn evaluate(sessions: &[ClassSession<'_>]) -> f64 {
    assess(sessions).fitness
}

pub fn assess(sessions: &[ClassSession<'_>]) -> FitnessReport {
    let clashes = count_clashes(sessions);
    let gaps = count_gaps(sessions);
    FitnessReport {
        clashes,
        gaps,
        fitness: 1.0 / (1.0 + clashes as f64 + gaps as f64 * GAP_PENALTY),
    }
}

/// One clash per dimension already taken in the session's slot, so a
/// session can contribute up to three.
fn count_clashes(sessions: &[ClassSession<'_>]) -> usize {
    let mut occupied: HashMap<(usize, usize), SlotOccupancy<'_>> = HashMap::new();
    let mut clashes = 0;

    for session in sessions {
        let slot = occupied.entry((session.day, session.time_slot)).or_default();
        if !slot.professors.insert(session.professor.prof_id.as_str()) {
            clashes += 1;
        }
        if !slot.groups.insert(session.group.group_id.as_str()) {
            clashes += 1;
        }
        if !slot.rooms.insert(session.room.room_id.as_str()) {
            clashes += 1;
        }
    }
    clashes
}

/// Idle slots between a group's first and last class of each day.
fn count_gaps(sessions: &[ClassSession<'_>]) -> i64 {
    daily_slots(sessions)
        .values()
        .filter(|slots| slots.len() > 1)
        .map(|slots| idle_slots(slots))
        .sum()
}

fn daily_slots<'s>(sessions: &[ClassSession<'s>]) -> HashMap<(&'s str, usize), Vec<usize>> {
    sessions
        .iter()
        .map(|s| ((s.group.group_id.as_str(), s.day), s.time_slot))
        .into_group_map()
}

/// `(last - first + 1) - count`, negative when sessions share a slot.
fn idle_slots(slots: &[usize]) -> i64 {
    let (first, last) = slots
        .iter()
        .minmax()
        .into_option()
        .map_or((0, 0), |(a, b)| (*a, *b));
    (last - first + 1) as i64 - slots.len() as i64
}

/// Human-readable list of what the timetable still gets wrong.
pub fn unmet_constraints(
    ctx: &RunContext<'_>,
    sessions: &[ClassSession<'_>],
) -> Vec<UnmetConstraint> {
    let mut unmet = Vec::new();

    let by_slot = sessions
        .iter()
        .map(|s| ((s.day, s.time_slot), s))
        .into_group_map();
    for ((day, time_slot), booked) in by_slot.into_iter().sorted_by_key(|(key, _)| *key) {
        let when = format!("{} {}", ctx.days[day], ctx.time_slots[time_slot]);
        let double_booked = |label: &str, ids: Vec<&str>| {
            ids.into_iter()
                .counts()
                .into_iter()
                .filter(|(_, n)| *n > 1)
                .sorted()
                .map(|(id, n)| UnmetConstraint {
                    constraint_type: format!("{label} Clash"),
                    description: format!("{label} {id} is booked {n} times at {when}."),
                })
                .collect::<Vec<_>>()
        };
        unmet.extend(double_booked(
            "Professor",
            booked.iter().map(|s| s.professor.prof_id.as_str()).collect(),
        ));
        unmet.extend(double_booked(
            "Group",
            booked.iter().map(|s| s.group.group_id.as_str()).collect(),
        ));
        unmet.extend(double_booked(
            "Room",
            booked.iter().map(|s| s.room.room_id.as_str()).collect(),
        ));
    }

    for ((group_id, day), slots) in daily_slots(sessions).into_iter().sorted() {
        if slots.len() < 2 {
            continue;
        }
        let gaps = idle_slots(&slots);
        if gaps > 0 {
            unmet.push(UnmetConstraint {
                constraint_type: "Idle Gap".to_string(),
                description: format!(
                    "Group {group_id} has {gaps} idle slot(s) between classes on {}.",
                    ctx.days[day]
                ),
            });
        }
    }

    unmet
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chromosome::random_timetable;
    use crate::context::tests::small_input;
    use crate::data::TimetableInput;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn place<'a>(
        ctx: &RunContext<'a>,
        gene: usize,
        room: usize,
        day: usize,
        time_slot: usize,
    ) -> ClassSession<'a> {
        let obligation = ctx.template[gene];
        ClassSession {
            group: obligation.group,
            subject: obligation.subject,
            professor: obligation.professor,
            room: &ctx.rooms[room],
            day,
            time_slot,
        }
    }

    #[test]
    fn conflict_free_schedule_scores_one() {
        let input = small_input();
        let ctx = RunContext::new(&input).unwrap();
        let sessions = [place(&ctx, 0, 0, 0, 0), place(&ctx, 1, 1, 0, 1)];

        let report = assess(&sessions);
        assert_eq!(report, FitnessReport { clashes: 0, gaps: 0, fitness: 1.0 });
        assert!(unmet_constraints(&ctx, &sessions).is_empty());
    }

    #[test]
    fn shared_professor_in_one_slot_is_one_clash() {
        let input = small_input();
        let ctx = RunContext::new(&input).unwrap();
        // different groups and rooms, same professor P1
        let sessions = [place(&ctx, 0, 0, 1, 1), place(&ctx, 1, 1, 1, 1)];

        let report = assess(&sessions);
        assert_eq!(report.clashes, 1);
        assert_eq!(report.gaps, 0);
        assert_eq!(report.fitness, 0.5);

        let unmet = unmet_constraints(&ctx, &sessions);
        assert_eq!(unmet.len(), 1);
        assert_eq!(
            unmet[0].to_string(),
            "[Professor Clash] Professor P1 is booked 2 times at Tuesday 10:00-11:00."
        );
    }

    #[test]
    fn clashes_in_several_dimensions_add_up() {
        let input = small_input();
        let ctx = RunContext::new(&input).unwrap();
        // the same gene twice: professor, group and room all collide
        let sessions = [place(&ctx, 0, 0, 0, 0), place(&ctx, 0, 0, 0, 0)];

        let report = assess(&sessions);
        assert_eq!(report.clashes, 3);
        assert_eq!(report.gaps, -1);
        assert_eq!(evaluate(&sessions), 1.0 / (1.0 + 3.0 - 0.1));
    }

    fn four_slot_input() -> TimetableInput {
        let mut input = small_input();
        input.time_slots = ["08", "09", "10", "11"].map(String::from).to_vec();
        input.subjects[0].weekly_hours = 3;
        input
    }

    #[test]
    fn idle_slots_within_a_day_are_penalised() {
        let input = four_slot_input();
        let ctx = RunContext::new(&input).unwrap();
        // G1 at 08 and 11 on Monday: two idle slots in between
        let sessions = [
            place(&ctx, 0, 0, 0, 0),
            place(&ctx, 1, 0, 0, 3),
            place(&ctx, 2, 0, 1, 0),
            place(&ctx, 3, 1, 1, 1),
        ];

        let report = assess(&sessions);
        assert_eq!(report.clashes, 0);
        assert_eq!(report.gaps, 2);
        assert!((report.fitness - 1.0 / 1.2).abs() < 1e-12);

        let unmet = unmet_constraints(&ctx, &sessions);
        assert_eq!(unmet.len(), 1);
        assert_eq!(unmet[0].constraint_type, "Idle Gap");
        assert!(unmet[0].description.contains("Group G1 has 2 idle slot(s)"));
    }

    #[test]
    fn contiguous_days_have_no_gaps() {
        let input = four_slot_input();
        let ctx = RunContext::new(&input).unwrap();
        let sessions = [
            place(&ctx, 0, 0, 0, 1),
            place(&ctx, 1, 0, 0, 2),
            place(&ctx, 2, 0, 0, 3),
            place(&ctx, 3, 1, 1, 0),
        ];
        assert_eq!(assess(&sessions).gaps, 0);
    }

    #[test]
    fn doubled_up_day_offsets_a_gapped_day() {
        let mut input = small_input();
        input.time_slots = ["08", "09", "10"].map(String::from).to_vec();
        input.subjects[0].weekly_hours = 2;
        input.subjects[1].weekly_hours = 2;
        let ctx = RunContext::new(&input).unwrap();
        let sessions = [
            // G1 twice at Monday 08: professor and group clash, net gap -1
            place(&ctx, 0, 0, 0, 0),
            place(&ctx, 1, 1, 0, 0),
            // G2 at Tuesday 08 and 10: one idle slot
            place(&ctx, 2, 0, 1, 0),
            place(&ctx, 3, 0, 1, 2),
        ];

        let report = assess(&sessions);
        assert_eq!(report.clashes, 2);
        assert_eq!(report.gaps, 0);
        assert_eq!(report.fitness, 1.0 / 3.0);

        let unmet = unmet_constraints(&ctx, &sessions);
        assert!(unmet.iter().any(|u| u.description.contains("Group G2 has 1 idle slot(s)")));
    }

    #[test]
    fn doubled_up_day_alone_scores_negative_gaps() {
        let input = small_input();
        let ctx = RunContext::new(&input).unwrap();
        // same gene twice in one slot, different rooms: two clashes, net gap -1
        let sessions = [place(&ctx, 0, 0, 0, 0), place(&ctx, 0, 1, 0, 0)];

        let report = assess(&sessions);
        assert_eq!((report.clashes, report.gaps), (2, -1));
        assert!(report.fitness > 0.0 && report.fitness <= 1.0);
        assert_eq!(report.fitness, 1.0 / (1.0 + 2.0 - 0.1));
    }

    proptest! {
        #[test]
        fn fitness_is_in_unit_interval(seed in any::<u64>(), hours in 1u32..6) {
            let mut input = small_input();
            input.subjects[0].weekly_hours = hours;
            let ctx = RunContext::new(&input).unwrap();
            let mut rng = StdRng::seed_from_u64(seed);
            let timetable = random_timetable(&ctx, &mut rng);

            let fitness = evaluate(&timetable.sessions);
            prop_assert!(fitness > 0.0 && fitness <= 1.0);
            prop_assert_eq!(fitness, evaluate(&timetable.sessions));
        }
    }
}
