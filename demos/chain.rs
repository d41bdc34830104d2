use std::time::Duration;

use log::info;
use pledge::{
    futures::{promise::Promise, timer::Timer},
    task::Executor,
};

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let first = Promise::<String, String>::new(|resolver| {
        Timer::schedule_after(Duration::from_secs(1), move || {
            resolver.fulfill("first promise fulfilled".to_string())
        });
        Ok(())
    });

    let second = Promise::<String, String>::new(|resolver| {
        Timer::schedule_after(Duration::from_millis(500), move || {
            resolver.reject("second promise rejected".to_string())
        });
        Ok(())
    });

    first
        .and_then(|v| {
            println!("{v}");
            Ok("next value".to_string())
        })
        .and_then(|v| {
            println!("{v}");
            Ok(())
        })
        .recover_with(|e| {
            eprintln!("{e}");
            Ok::<_, String>(())
        });

    second
        .and_then(|v| {
            println!("never printed: {v}");
            Ok(())
        })
        .recover_with(|e| {
            eprintln!("{e}");
            Ok::<_, String>(())
        })
        .finally_run(|| info!("cleanup after second at {:?}", Timer::now()));

    // The same thing, written with `async`/`.await`.
    let total = Executor::block_on(async {
        let (short, long) = (Duration::from_millis(200), Duration::from_millis(300));
        let a = Timer::resolve_after::<u32, String>(short, 20).await?;
        let b = Timer::resolve_after::<u32, String>(long, 22).await?;
        Ok::<_, String>(a + b)
    })?;

    println!("async total: {total:?}, virtual time {:?}", Timer::now());

    Ok(())
}
