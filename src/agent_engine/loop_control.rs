/// Step budget for one run.
#[derive(Debug, Clone)]
pub struct LoopController {
    max_steps: usize,
    steps: usize,
}

impl LoopController {
    pub fn new(max_steps: usize) -> Self {
        Self {
            max_steps,
            steps: 0,
        }
    }

    /// Counts the step about to run and returns its 1-based number.
    pub fn record_step(&mut self) -> usize {
        self.steps += 1;
        self.steps
    }

    pub fn steps(&self) -> usize {
        self.steps
    }

    pub fn should_stop(&self) -> bool {
        self.steps >= self.max_steps
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stops_after_max_steps() {
        let mut ctrl = LoopController::new(2);
        assert!(!ctrl.should_stop());
        assert_eq!(ctrl.record_step(), 1);
        assert!(!ctrl.should_stop());
        assert_eq!(ctrl.record_step(), 2);
        assert!(ctrl.should_stop());
        assert_eq!(ctrl.steps(), 2);
    }

    #[test]
    fn zero_budget_never_runs() {
        assert!(LoopController::new(0).should_stop());
    }
}
