use std::{cell::RefCell, rc::Rc};

use super::{promises, IntoInput, Slots};
use crate::futures::promise::Promise;

/// Fulfill with every input's value, in input order, once all have fulfilled.
/// Reject with the first rejection observed.
///
/// An empty input fulfills with an empty `Vec`.
pub fn all<I, T, E>(inputs: I) -> Promise<Vec<T>, E>
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
            let slots = slots.clone();
            let on_ok = resolver.clone();
            let on_err = resolver.clone();

            input.observe(
                move |value| {
                    let done = slots.borrow_mut().fill(idx, value);
                    if let Some(values) = done {
                        on_ok.fulfill(values);
                    }
                },
                move |reason| on_err.reject(reason),
            );
        }

        Ok(())
    })
}
