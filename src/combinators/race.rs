use super::{promises, IntoInput};
use crate::futures::promise::Promise;

/// Settle the same way as the first input to settle.
///
/// An empty input never settles. Pass a
/// [Timer::reject_after](crate::futures::timer::Timer::reject_after) promise
/// as one of the inputs to bound the wait.
pub fn race<I, T, E>(inputs: I) -> Promise<T, E>
where
    I: IntoIterator,
    I::Item: IntoInput<Value = T, Error = E>,
    T: Clone + 'static,
    E: Clone + 'static,
{
    let inputs = promises(inputs);

    Promise::new(|resolver| {
        for input in inputs.iter() {
            let on_ok = resolver.clone();
            let on_err = resolver.clone();

            input.observe(
                move |value| on_ok.fulfill(value),
                move |reason| on_err.reject(reason),
            );
        }

        Ok(())
    })
}
