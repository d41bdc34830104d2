use std::{cell::RefCell, rc::Rc};

use super::{promises, IntoInput, Slots};
use crate::{error::AggregateError, futures::promise::Promise};

/// Fulfill with the first value observed. Reject once every input has
/// rejected, with all the reasons in input order.
///
/// An empty input rejects with an empty [AggregateError].
pub fn any<I, T, E>(inputs: I) -> Promise<T, AggregateError<E>>
where
    I: IntoIterator,
    I::Item: IntoInput<Value = T, Error = E>,
    T: Clone + 'static,
    E: Clone + 'static,
{
    let inputs = promises(inputs);

    Promise::new(|resolver| {
        if inputs.is_empty() {
            resolver.reject(AggregateError::new(Vec::new()));
            return Ok(());
        }

        let reasons = Rc::new(RefCell::new(Slots::new(inputs.len())));

        for (idx, input) in inputs.iter().enumerate() {
            let reasons = reasons.clone();
            let on_ok = resolver.clone();
            let on_err = resolver.clone();

            input.observe(
                move |value| on_ok.fulfill(value),
                move |reason| {
                    let done = reasons.borrow_mut().fill(idx, reason);
                    if let Some(reasons) = done {
                        on_err.reject(AggregateError::new(reasons));
                    }
                },
            );
        }

        Ok(())
    })
}
