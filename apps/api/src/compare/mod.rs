// Side-by-side candidate comparison: the selection state machine and the
// session store that runs its fetches.

pub mod handlers;
pub mod selection;
pub mod session;
