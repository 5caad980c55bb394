// Step sequencer
//
// 1 = campaign type, 2 = recipients, 3 = template, 4 = settings, 5 = review & send.

use serde::Serialize;

pub const FIRST_STEP: u8 = 1;
pub const LAST_STEP: u8 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StepSequencer {
    step: u8,
    max_step_reached: u8,
}

impl Default for StepSequencer {
    fn default() -> Self {
        Self::new()
    }
}

impl StepSequencer {
    pub fn new() -> Self {
        Self {
            step: FIRST_STEP,
            max_step_reached: FIRST_STEP,
        }
    }

    /// Editing an existing campaign: the type is fixed, so start on recipients with every step
    /// reachable.
    pub fn for_existing_campaign() -> Self {
        Self {
            step: 2,
            max_step_reached: LAST_STEP,
        }
    }

    pub fn step(&self) -> u8 {
        self.step
    }

    pub fn max_step_reached(&self) -> u8 {
        self.max_step_reached
    }

    pub fn is_last(&self) -> bool {
        self.step == LAST_STEP
    }

    pub fn advance(&mut self) {
        if self.step < LAST_STEP {
            self.step += 1;
        }
        self.max_step_reached = self.max_step_reached.max(self.step);
    }

    pub fn retreat(&mut self) {
        if self.step > FIRST_STEP {
            self.step -= 1;
        }
    }

    /// Deep-link to a visited step. Anything past the furthest step reached is ignored.
    pub fn jump_to(&mut self, step: u8) -> bool {
        if step < FIRST_STEP || step > self.max_step_reached {
            return false;
        }
        self.step = step;
        true
    }
}
