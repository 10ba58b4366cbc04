//! The built-in `wait` behavior.

use crate::error::BehaviorError;
use crate::event::{BehaviorId, ElementRef, Event, EventArgs};
use crate::manager::EventManager;

/// Do nothing for `n_steps` ticks.
///
/// With `n_steps > 1` the behavior queues itself for the next tick with
/// `n_steps - 1`; at `n_steps <= 1` the chain ends. Every self-rescheduling
/// behavior follows this pattern.
///
/// `n_steps` is read from the `n_steps` keyword or the first positional
/// argument.
pub fn wait<T>(
    _tissue: &mut T,
    manager: &mut EventManager<T>,
    element: ElementRef,
    args: &EventArgs,
) -> Result<(), BehaviorError> {
    let n_steps = args.u64_arg(&BehaviorId::WAIT, 0, "n_steps")?;
    if n_steps > 1 {
        manager.append(
            Event::new(BehaviorId::WAIT)
                .on(element)
                .with_args(EventArgs::new().arg(n_steps.saturating_sub(1))),
        );
    }
    Ok(())
}
