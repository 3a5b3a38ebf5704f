use super::{ButtonId, ButtonLevels, ButtonPanel};

/// No-hardware panel used during bring-up and in tests: reports whatever
/// levels were last set.
#[derive(Default, Debug, Clone, Copy)]
pub struct MockButtons {
    levels: ButtonLevels,
}

impl MockButtons {
    pub const fn new() -> Self {
        Self {
            levels: ButtonLevels::RELEASED,
        }
    }

    pub fn press(&mut self, id: ButtonId) {
        self.levels = self.levels.with(id, true);
    }

    pub fn release(&mut self, id: ButtonId) {
        self.levels = self.levels.with(id, false);
    }

    pub fn release_all(&mut self) {
        self.levels = ButtonLevels::RELEASED;
    }
}

impl ButtonPanel for MockButtons {
    type Error = core::convert::Infallible;

    fn sample(&mut self) -> Result<ButtonLevels, Self::Error> {
        Ok(self.levels)
    }
}
