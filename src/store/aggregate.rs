//! Derived course statistics.
//!
//! `sessionCount` and `totalHours` on a course are a cache over the session
//! collection. These functions are the only place that writes them.

use std::collections::HashMap;

use crate::models::{Course, Session};

/// Rounds to two decimal places.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn hours(session: &Session) -> f64 {
    if session.duration_hours.is_finite() && session.duration_hours > 0.0 {
        session.duration_hours
    } else {
        0.0
    }
}

/// Session count and rounded total hours for one course.
pub fn course_stats(sessions: &[Session], course_id: &str) -> (u32, f64) {
    let (count, total) = sessions
        .iter()
        .filter(|s| s.course_id == course_id)
        .fold((0u32, 0.0f64), |(count, total), s| (count + 1, total + hours(s)));
    (count, round2(total))
}

/// Returns `courses` with the stats of `target_course_id` re-derived from
/// `sessions`. Every other course is returned unchanged.
pub fn recompute_course_stats(
    courses: &[Course],
    sessions: &[Session],
    target_course_id: &str,
) -> Vec<Course> {
    let (count, total) = course_stats(sessions, target_course_id);
    courses
        .iter()
        .map(|course| {
            if course.id == target_course_id {
                Course {
                    session_count: count,
                    total_hours: total,
                    ..course.clone()
                }
            } else {
                course.clone()
            }
        })
        .collect()
}

/// Re-derives the stats of every course in one pass over `sessions`.
pub fn recompute_all_course_stats(courses: &[Course], sessions: &[Session]) -> Vec<Course> {
    let mut totals: HashMap<&str, (u32, f64)> = HashMap::new();
    for session in sessions {
        let entry = totals.entry(session.course_id.as_str()).or_default();
        entry.0 += 1;
        entry.1 += hours(session);
    }

    courses
        .iter()
        .map(|course| {
            let (count, total) = totals.get(course.id.as_str()).copied().unwrap_or_default();
            Course {
                session_count: count,
                total_hours: round2(total),
                ..course.clone()
            }
        })
        .collect()
}
