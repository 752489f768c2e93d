//! One-shot continuations: "when this condition holds, run this once".

type Condition<C> = Box<dyn Fn(&C) -> bool>;
type Action<C> = Box<dyn FnOnce(&mut C)>;

struct Reaction<C> {
    condition: Condition<C>,
    action: Action<C>,
}

/// Pending continuations over a context `C`.
///
/// The owner evaluates them after each state transition with `take_ready`
/// and runs the returned actions against itself.
pub struct Reactions<C> {
    pending: Vec<Reaction<C>>,
}

impl<C> Reactions<C> {
    pub fn new() -> Self {
        Self {
            pending: Vec::new(),
        }
    }

    /// Register `action` to run once `condition` becomes true.
    pub fn when(
        &mut self,
        condition: impl Fn(&C) -> bool + 'static,
        action: impl FnOnce(&mut C) + 'static,
    ) {
        self.pending.push(Reaction {
            condition: Box::new(condition),
            action: Box::new(action),
        });
    }

    /// Remove and return the actions whose condition holds for `context`,
    /// in registration order.
    pub fn take_ready(&mut self, context: &C) -> Vec<Action<C>> {
        let (ready, waiting): (Vec<_>, Vec<_>) = std::mem::take(&mut self.pending)
            .into_iter()
            .partition(|r| (r.condition)(context));
        self.pending = waiting;
        ready.into_iter().map(|r| r.action).collect()
    }

    /// Append continuations registered elsewhere (e.g. while actions ran).
    pub fn append(&mut self, other: &mut Reactions<C>) {
        self.pending.append(&mut other.pending);
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

impl<C> Default for Reactions<C> {
    fn default() -> Self {
        Self::new()
    }
}
