//! Gesture scripts: a JSON array of steps replayed against a knob.
//!
//! ```json
//! [{"down": [80, 50]}, {"move": [50, 80]}, {"up": [50, 80]}, "tick", {"set_value": 0.25}]
//! ```

#[cfg(test)]
#[path = "script_test.rs"]
mod script_test;

use knob::{ConfigError, Knob, KnobEvent, KnobOptions, Point, Rect};
use serde::Deserialize;

/// One scripted host action.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    /// Pointer pressed on the knob at `[x, y]`.
    Down([f64; 2]),
    /// Pointer moved anywhere at `[x, y]`.
    Move([f64; 2]),
    /// Pointer released anywhere at `[x, y]`.
    Up([f64; 2]),
    /// Let the host's next turn run (settles `End → Idle`).
    Tick,
    /// Push a value from outside.
    SetValue(f64),
    /// Merge an options patch and rebuild the knob.
    SetOptions(KnobOptions),
    /// Detach from the target.
    Detach,
}

pub fn parse_script(json: &str) -> Result<Vec<Step>, serde_json::Error> {
    serde_json::from_str(json)
}

/// Apply one step and return the events it produced.
pub fn run_step(knob: &mut Knob, step: &Step) -> Result<Vec<KnobEvent>, ConfigError> {
    let events = match step {
        Step::Down([x, y]) => knob.pointer_down(Point::new(*x, *y)),
        Step::Move([x, y]) => knob.pointer_move(Point::new(*x, *y)),
        Step::Up([x, y]) => knob.pointer_up(Point::new(*x, *y)),
        Step::Tick => knob.tick(),
        Step::SetValue(value) => knob.set_value(*value),
        Step::SetOptions(patch) => {
            // Settle a pending Idle here so it is reported with this step.
            let settled = knob.tick();
            knob.set_options(patch)?;
            settled
        }
        Step::Detach => {
            if knob.detach().is_none() {
                tracing::debug!("detach on a detached knob");
            }
            Vec::new()
        }
    };
    Ok(events)
}

// --- Argument parsing ---

fn numbers<const N: usize>(input: &str) -> Result<[f64; N], String> {
    let parts: Vec<&str> = input.split(',').map(str::trim).collect();
    if parts.len() != N {
        return Err(format!("expected {N} comma-separated numbers, got `{input}`"));
    }
    let mut out = [0.0; N];
    for (slot, part) in out.iter_mut().zip(parts) {
        *slot = part.parse::<f64>().map_err(|err| format!("`{part}`: {err}"))?;
    }
    Ok(out)
}

/// `x,y`
pub fn parse_point(input: &str) -> Result<Point, String> {
    let [x, y] = numbers::<2>(input)?;
    Ok(Point::new(x, y))
}

/// `left,top,width,height`
pub fn parse_rect(input: &str) -> Result<Rect, String> {
    let [left, top, width, height] = numbers::<4>(input)?;
    Ok(Rect::new(left, top, width, height))
}
