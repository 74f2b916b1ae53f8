/// Generational handle: `(index, generation)`.
///
/// A handle is only equal to another if both the slot and the generation
/// match, so a released-and-reissued slot never aliases its predecessor.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Handle(u32, u32);

impl Handle {
    pub fn new(index: u32, generation: u32) -> Self {
        Handle(index, generation)
    }

    pub fn index(self) -> u32 {
        self.0
    }

    pub fn generation(self) -> u32 {
        self.1
    }
}

/// Issues generational handles and recycles released slots.
#[derive(Debug, Default, Clone)]
pub struct HandleAllocator {
    generations: Vec<u32>,
    live: Vec<bool>,
    free: Vec<u32>,
}

impl HandleAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allocate(&mut self) -> Handle {
        if let Some(index) = self.free.pop() {
            let slot = index as usize;
            self.live[slot] = true;
            return Handle::new(index, self.generations[slot]);
        }
        let index = self.generations.len() as u32;
        self.generations.push(0);
        self.live.push(true);
        Handle::new(index, 0)
    }

    /// Releases `handle`. Returns `false` if it was already released or stale.
    pub fn release(&mut self, handle: Handle) -> bool {
        if !self.is_live(handle) {
            return false;
        }
        let slot = handle.index() as usize;
        self.live[slot] = false;
        self.generations[slot] = self.generations[slot].wrapping_add(1);
        self.free.push(handle.index());
        true
    }

    pub fn is_live(&self, handle: Handle) -> bool {
        let slot = handle.index() as usize;
        self.live.get(slot).copied().unwrap_or(false)
            && self.generations[slot] == handle.generation()
    }

    pub fn live_count(&self) -> usize {
        self.live.iter().filter(|l| **l).count()
    }
}
