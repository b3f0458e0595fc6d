use serde::Serialize;

/// One tick of the render loop.
///
/// Notices are stamped with `index`; camera damping is applied once per tick.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Frame {
    pub index: u64,
}

impl Frame {
    pub fn new(index: u64) -> Self {
        Self { index }
    }

    pub fn advance(self) -> Self {
        Self::new(self.index.saturating_add(1))
    }
}
