use std::{cell::RefCell, convert::Infallible, rc::Rc};

use super::{promises, IntoInput, Slots};
use crate::futures::promise::{Outcome, Promise, Resolver};

/// Fulfill with the outcome of every input, in input order, once all have
/// settled. Never rejects.
///
/// An empty input fulfills with an empty `Vec`.
pub fn all_settled<I, T, E>(inputs: I) -> Promise<Vec<Outcome<T, E>>, Infallible>
where
    I: IntoIterator,
    I::Item: IntoInput<Value = T, Error = E>,
    T: Clone + 'static,
    E: Clone + 'static,
{
    let inputs = promises(inputs);

    Promise::new(|resolver| {
        if inputs.is_empty() {
            resolver.fulfill(Vec::new());
            return Ok(());
        }

        let slots = Rc::new(RefCell::new(Slots::new(inputs.len())));

        for (idx, input) in inputs.iter().enumerate() {
            let (ok_slots, err_slots) = (slots.clone(), slots.clone());
            let (on_ok, on_err) = (resolver.clone(), resolver.clone());

            input.observe(
                move |value| record(&ok_slots, &on_ok, idx, Outcome::Fulfilled(value)),
                move |reason| record(&err_slots, &on_err, idx, Outcome::Rejected(reason)),
            );
        }

        Ok(())
    })
}

fn record<T, E>(
    slots: &RefCell<Slots<Outcome<T, E>>>,
    resolver: &Resolver<Vec<Outcome<T, E>>, Infallible>,
    idx: usize,
    outcome: Outcome<T, E>,
) where
    T: Clone + 'static,
    E: Clone + 'static,
{
    let done = slots.borrow_mut().fill(idx, outcome);
    if let Some(outcomes) = done {
        resolver.fulfill(outcomes);
    }
}
