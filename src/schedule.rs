//! # Schedule Builder
//!
//! Assigns a duration to every token.
//!
//! ## Timing Policies
//! - **Fixed**: every token lasts one step.
//! - **DigitRuns**: consecutive digit-typed tokens form a run that shares a
//!   total duration `T(n)` so long date-like clusters do not ring out:
//!
//! | run length `n` | `T(n)` in steps                    |
//! |----------------|------------------------------------|
//! | 1, 2           | 1.0                                |
//! | 3              | 1.25                               |
//! | 4              | 1.5                                |
//! | 5+             | `min(1.75, 1 + 0.15 * (n - 2))`    |
//!
//! The run total is split evenly across its tokens. Letters, rests and
//! control tokens always take exactly one step. A typed zero that sounds
//! (chroma tone or tick) is still a digit and joins the run it sits in.

use serde::{Deserialize, Serialize};

use crate::lexer::Token;

/// Step duration policy for a toy
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "kebab-case")]
pub enum StepTiming {
    Fixed {
        #[serde(rename = "step-ms")]
        step_ms: f64,
    },
    DigitRuns {
        #[serde(rename = "step-ms")]
        step_ms: f64,
    },
}

impl StepTiming {
    pub fn step_ms(&self) -> f64 {
        match self {
            StepTiming::Fixed { step_ms } | StepTiming::DigitRuns { step_ms } => *step_ms,
        }
    }
}

impl Default for StepTiming {
    fn default() -> Self {
        StepTiming::Fixed { step_ms: 250.0 }
    }
}

/// One token and how long it occupies the timeline
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleItem {
    pub token: Token,
    pub duration_ms: f64,
}

/// Total length of a digit run, in steps
pub fn run_steps(n: usize) -> f64 {
    match n {
        0 => 0.0,
        1 | 2 => 1.0,
        3 => 1.25,
        4 => 1.5,
        n => (1.0 + 0.15 * (n as f64 - 2.0)).min(1.75),
    }
}

/// Build the schedule for a token list.
///
/// A zero tokenized as a rest is not audible, so it breaks its run.
pub fn build_schedule(tokens: &[Token], timing: StepTiming) -> Vec<ScheduleItem> {
    let step = timing.step_ms();
    let mut durations = vec![step; tokens.len()];

    if let StepTiming::DigitRuns { .. } = timing {
        let mut i = 0;
        while i < tokens.len() {
            if !tokens[i].is_digit_derived() {
                i += 1;
                continue;
            }
            let start = i;
            while i < tokens.len() && tokens[i].is_digit_derived() {
                i += 1;
            }
            let n = i - start;
            let each = run_steps(n) * step / n as f64;
            for d in &mut durations[start..i] {
                *d = each;
            }
        }
    }

    tokens
        .iter()
        .cloned()
        .zip(durations)
        .map(|(token, duration_ms)| ScheduleItem { token, duration_ms })
        .collect()
}

/// Sum of all durations in a schedule
pub fn total_duration_ms(schedule: &[ScheduleItem]) -> f64 {
    schedule.iter().map(|item| item.duration_ms).sum()
}

/// Start offset of every item (prefix sums, first entry is zero)
pub fn start_offsets(schedule: &[ScheduleItem]) -> Vec<f64> {
    let mut offsets = Vec::with_capacity(schedule.len());
    let mut t = 0.0;
    for item in schedule {
        offsets.push(t);
        t += item.duration_ms;
    }
    offsets
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::{tokenize, ZeroPolicy};
    use approx::assert_relative_eq;

    const STEP: f64 = 260.0;

    fn durations(input: &str, zero_policy: ZeroPolicy, timing: StepTiming) -> Vec<f64> {
        build_schedule(&tokenize(input, zero_policy), timing)
            .iter()
            .map(|i| i.duration_ms)
            .collect()
    }

    #[test]
    fn test_run_table() {
        assert_eq!(run_steps(1), 1.0);
        assert_eq!(run_steps(2), 1.0);
        assert_eq!(run_steps(3), 1.25);
        assert_eq!(run_steps(4), 1.5);
        assert_relative_eq!(run_steps(5), 1.45);
        assert_relative_eq!(run_steps(6), 1.6);
        assert_relative_eq!(run_steps(7), 1.75);
        assert_eq!(run_steps(40), 1.75);
    }

    #[test]
    fn test_fixed_step() {
        let d = durations("2025 HI", ZeroPolicy::Chromatic, StepTiming::Fixed { step_ms: 250.0 });
        assert_eq!(d, vec![250.0; 7]);
    }

    #[test]
    fn test_digit_run_split_evenly() {
        let timing = StepTiming::DigitRuns { step_ms: STEP };
        // "1225": run of four digits shares 1.5 steps
        let d = durations("1225", ZeroPolicy::Ticks, timing);
        for each in &d {
            assert_relative_eq!(*each, 1.5 * STEP / 4.0);
        }
        assert_relative_eq!(d.iter().sum::<f64>(), 1.5 * STEP);
    }

    #[test]
    fn test_runs_broken_by_rests() {
        let timing = StepTiming::DigitRuns { step_ms: STEP };
        let d = durations("12-345", ZeroPolicy::Ticks, timing);
        assert_relative_eq!(d[0], STEP / 2.0);
        assert_relative_eq!(d[1], STEP / 2.0);
        assert_eq!(d[2], STEP);
        assert_relative_eq!(d[3], 1.25 * STEP / 3.0);
        assert_relative_eq!(d[5], 1.25 * STEP / 3.0);
    }

    #[test]
    fn test_letters_never_compressed() {
        let timing = StepTiming::DigitRuns { step_ms: STEP };
        let d = durations("AB12", ZeroPolicy::Chromatic, timing);
        assert_eq!(d[0], STEP);
        assert_eq!(d[1], STEP);
        assert_relative_eq!(d[2], STEP / 2.0);
    }

    #[test]
    fn test_sounding_zero_joins_run() {
        let timing = StepTiming::DigitRuns { step_ms: STEP };
        for policy in [ZeroPolicy::Chromatic, ZeroPolicy::Ticks] {
            let d = durations("12012", policy, timing);
            assert_eq!(d.len(), 5);
            for each in &d {
                assert_relative_eq!(*each, 1.45 * STEP / 5.0);
            }
        }
    }

    #[test]
    fn test_rest_zero_breaks_run() {
        let timing = StepTiming::DigitRuns { step_ms: STEP };
        let d = durations("12012", ZeroPolicy::Rest, timing);
        assert_relative_eq!(d[0], STEP / 2.0);
        assert_eq!(d[2], STEP);
        assert_relative_eq!(d[4], STEP / 2.0);
    }

    #[test]
    fn test_control_tokens_take_a_step() {
        let timing = StepTiming::DigitRuns { step_ms: STEP };
        let d = durations("+12#", ZeroPolicy::Chromatic, timing);
        assert_eq!(d[0], STEP);
        assert_eq!(d[3], STEP);
    }

    #[test]
    fn test_offsets_and_total() {
        let schedule = build_schedule(&tokenize("123", ZeroPolicy::Rest), StepTiming::Fixed { step_ms: 100.0 });
        assert_eq!(start_offsets(&schedule), vec![0.0, 100.0, 200.0]);
        assert_eq!(total_duration_ms(&schedule), 300.0);
        assert!(start_offsets(&[]).is_empty());
    }
}
